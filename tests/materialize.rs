use memtree::config::{CollectionConfiguration, IndexSpec, ValueIndexSpec, ValueType};
use memtree::core::ns;
use memtree::memtree::{ExternalAttribute, ExternalNode, ExternalRef, NodeKind};
use memtree::storage::{BrokerEvent, MemoryBroker, NodeId, StoredKind, TargetDocument, Txn};
use memtree::{Attribute, Error, Materializer, QName, StorageError, StoreSummary, TransientDocument, TreeBuilder};
use std::sync::Arc;

fn store(broker: &mut MemoryBroker, doc: &TransientDocument, id: u32) -> memtree::Result<StoreSummary> {
    let txn = Txn::begin();
    let mut target = TargetDocument::new(id, "/db/test");
    Materializer::new(broker, &txn, doc, &mut target).store()
}

fn describe(broker: &MemoryBroker, doc: u32) -> Vec<String> {
    broker
        .nodes(doc)
        .map(|n| match n.kind {
            StoredKind::Element => n.name.as_ref().map(|q| q.lexical().into_owned()).unwrap_or_default(),
            StoredKind::Attribute => format!("@{}", n.name.as_ref().map(|q| q.local_name()).unwrap_or("")),
            StoredKind::Text => format!("{:?}", n.value),
            StoredKind::CData => format!("cdata({})", n.value),
            StoredKind::Comment => format!("comment({})", n.value),
            StoredKind::ProcessingInstruction => format!("pi({})", n.value),
        })
        .collect()
}

fn store_order(broker: &MemoryBroker) -> Vec<NodeId> {
    broker
        .events()
        .iter()
        .filter_map(|e| match e {
            BrokerEvent::Store { node_id, .. } => Some(node_id.clone()),
            _ => None,
        })
        .collect()
}

#[derive(Debug)]
struct Stub {
    kind: NodeKind,
    name: Option<QName>,
    value: String,
    attributes: Vec<ExternalAttribute>,
    children: Vec<ExternalRef>,
}

impl ExternalNode for Stub {
    fn kind(&self) -> NodeKind {
        self.kind
    }
    fn name(&self) -> Option<QName> {
        self.name.clone()
    }
    fn string_value(&self) -> String {
        if self.children.is_empty() {
            self.value.clone()
        } else {
            self.children.iter().map(|c| c.string_value()).collect()
        }
    }
    fn children(&self) -> Vec<ExternalRef> {
        self.children.clone()
    }
    fn attributes(&self) -> Vec<ExternalAttribute> {
        self.attributes.clone()
    }
}

fn leaf(kind: NodeKind, value: &str) -> ExternalRef {
    Arc::new(Stub {
        kind,
        name: None,
        value: value.to_owned(),
        attributes: Vec::new(),
        children: Vec::new(),
    })
}

fn element(name: &str, children: Vec<ExternalRef>) -> ExternalRef {
    Arc::new(Stub {
        kind: NodeKind::Element,
        name: Some(QName::local(name)),
        value: String::new(),
        attributes: Vec::new(),
        children,
    })
}

fn build_round_trip_tree() -> TreeBuilder {
    // <a x="1"><b>hello</b><!--c--></a>
    let mut b = TreeBuilder::new();
    b.start_document();
    b.start_element(&QName::local("a"), &[Attribute::new(QName::local("x"), "1")])
        .unwrap();
    b.start_element(&QName::local("b"), &[]).unwrap();
    b.characters("hello").unwrap();
    b.end_element().unwrap();
    b.comment("c").unwrap();
    b.end_element().unwrap();
    b.end_document();
    b
}

#[test]
fn round_trip_produces_wrapped_document_order() {
    let builder = build_round_trip_tree();
    let mut broker = MemoryBroker::new();
    let summary = store(&mut broker, builder.document().unwrap(), 1).unwrap();

    assert_eq!(
        describe(&broker, 1),
        vec!["exist:temp", "a", "@x", "b", "\"hello\"", "comment(c)"]
    );
    assert_eq!(summary.nodes_stored, 6);
    assert_eq!(summary.coalesced, 0);

    let a = broker.node(1, &NodeId::from_components(vec![1, 1])).unwrap();
    assert_eq!(a.child_count, 2);
    assert_eq!(a.attribute_count, 1);

    let wrapper = broker.node(1, &NodeId::root()).unwrap();
    assert_eq!(wrapper.name, Some(QName::new("temp", ns::EXIST, Some("exist"))));
    assert_eq!(wrapper.child_count, 1);
}

#[test]
fn store_calls_follow_document_order() {
    let builder = build_round_trip_tree();
    let mut broker = MemoryBroker::new();
    store(&mut broker, builder.document().unwrap(), 1).unwrap();

    let order = store_order(&broker);
    let mut sorted = order.clone();
    sorted.sort();
    assert_eq!(order, sorted);
    assert_eq!(order[0], NodeId::root());

    // elements close in post order
    let closed: Vec<_> = broker
        .events()
        .iter()
        .filter_map(|e| match e {
            BrokerEvent::EndElement { node_id, .. } => Some(node_id.to_string()),
            _ => None,
        })
        .collect();
    assert_eq!(closed, vec!["1.1.2", "1.1", "1"]);
}

#[test]
fn empty_tree_stores_only_wrapper() {
    let mut builder = TreeBuilder::new();
    builder.start_document();
    builder.end_document();
    let mut broker = MemoryBroker::new();
    let summary = store(&mut broker, builder.document().unwrap(), 1).unwrap();

    assert_eq!(summary.nodes_stored, 1);
    assert_eq!(describe(&broker, 1), vec!["exist:temp"]);
    assert_eq!(broker.node(1, &NodeId::root()).unwrap().child_count, 0);
    assert_eq!(broker.events().len(), 2);
}

#[test]
fn multiple_top_level_nodes_become_wrapper_children() {
    let mut builder = TreeBuilder::new();
    builder.start_document();
    builder.start_element(&QName::local("p"), &[]).unwrap();
    builder.end_element().unwrap();
    builder.characters("between").unwrap();
    builder.start_element(&QName::local("q"), &[]).unwrap();
    builder.end_element().unwrap();

    let mut broker = MemoryBroker::new();
    store(&mut broker, builder.document().unwrap(), 1).unwrap();
    assert_eq!(describe(&broker, 1), vec!["exist:temp", "p", "\"between\"", "q"]);
    assert_eq!(broker.node(1, &NodeId::root()).unwrap().child_count, 3);
}

#[test]
fn adjacent_external_text_is_coalesced_when_stored() {
    // the external element itself holds two adjacent text nodes
    let external = element(
        "e",
        vec![leaf(NodeKind::Text, "one"), leaf(NodeKind::Text, "two"), leaf(NodeKind::CData, "raw")],
    );
    let mut builder = TreeBuilder::new();
    builder.start_document();
    builder.start_element(&QName::local("root"), &[]).unwrap();
    builder.add_reference_node(external).unwrap();
    builder.end_element().unwrap();

    let mut broker = MemoryBroker::new();
    let summary = store(&mut broker, builder.document().unwrap(), 1).unwrap();

    assert_eq!(summary.coalesced, 1);
    assert_eq!(
        describe(&broker, 1),
        vec!["exist:temp", "root", "e", "\"onetwo\"", "cdata(raw)"]
    );
    assert!(broker
        .events()
        .iter()
        .any(|e| matches!(e, BrokerEvent::Append { text, .. } if text == "two")));
    let e = broker.node(1, &NodeId::from_components(vec![1, 1, 1])).unwrap();
    assert_eq!(e.child_count, 2);
}

#[test]
fn reference_flattening_matches_individual_references() {
    let p = element("p", vec![leaf(NodeKind::Text, "x")]);
    let q = element("q", Vec::new());
    let document: ExternalRef = Arc::new(Stub {
        kind: NodeKind::Document,
        name: None,
        value: String::new(),
        attributes: Vec::new(),
        children: vec![p.clone(), q.clone()],
    });

    let mut flattened = TreeBuilder::new();
    flattened.start_document();
    flattened.add_reference_node(document).unwrap();

    let mut individual = TreeBuilder::new();
    individual.start_document();
    individual.add_reference_node(p).unwrap();
    individual.add_reference_node(q).unwrap();

    let mut left = MemoryBroker::new();
    let mut right = MemoryBroker::new();
    store(&mut left, flattened.document().unwrap(), 1).unwrap();
    store(&mut right, individual.document().unwrap(), 1).unwrap();
    assert_eq!(describe(&left, 1), describe(&right, 1));
    assert_eq!(describe(&left, 1), vec!["exist:temp", "p", "\"x\"", "q"]);
}

#[test]
fn stored_document_can_be_referenced_from_another_tree() {
    let builder = build_round_trip_tree();
    let mut broker = MemoryBroker::new();
    let txn = Txn::begin();
    let mut first = TargetDocument::new(1, "/db/test");
    Materializer::new(&mut broker, &txn, builder.document().unwrap(), &mut first)
        .store()
        .unwrap();

    // reference the stored <a> (below the wrapper) from a new tree
    let snapshot = broker.snapshot(&first);
    let wrapper = snapshot.children().remove(0);
    let a = wrapper.children().remove(0);
    assert_eq!(a.attributes().len(), 1);

    let mut copy = TreeBuilder::new();
    copy.start_document();
    copy.start_element(&QName::local("copy"), &[]).unwrap();
    copy.add_reference_node(a).unwrap();
    copy.end_element().unwrap();

    let mut second = TargetDocument::new(2, "/db/test");
    Materializer::new(&mut broker, &txn, copy.document().unwrap(), &mut second)
        .store()
        .unwrap();
    assert_eq!(
        describe(&broker, 2),
        vec!["exist:temp", "copy", "a", "@x", "b", "\"hello\"", "comment(c)"]
    );
}

#[test]
fn namespace_declarations_are_recorded_on_the_element() {
    let mut builder = TreeBuilder::new();
    builder.start_document();
    builder
        .start_element(&QName::new("a", "urn:x", Some("x")), &[])
        .unwrap();
    assert!(!builder.namespace_node_for("x", "urn:x").unwrap());
    assert!(builder.namespace_node_for("y", "urn:y").unwrap());
    builder.end_element().unwrap();

    let mut broker = MemoryBroker::new();
    store(&mut broker, builder.document().unwrap(), 1).unwrap();
    let a = broker.node(1, &NodeId::from_components(vec![1, 1])).unwrap();
    assert_eq!(a.namespaces, vec![("y".to_owned(), "urn:y".to_owned())]);
}

#[test]
fn default_namespace_on_unnamespaced_element_is_a_well_formedness_error() {
    let mut builder = TreeBuilder::new();
    builder.start_document();
    builder.start_element(&QName::local("a"), &[]).unwrap();
    let err = builder.namespace_node_for("", "").unwrap_err();
    assert!(err.is_well_formedness());
    assert!(matches!(err, Error::Namespace { .. }));
}

#[test]
fn storage_failures_propagate_unchanged() {
    let builder = build_round_trip_tree();
    let mut broker = MemoryBroker::new();
    broker.fail_after(3);
    let err = store(&mut broker, builder.document().unwrap(), 1).unwrap_err();
    assert!(matches!(err, Error::Storage(StorageError::Io(_))));
    assert_eq!(broker.node_count(1), 3);

    let mut broker = MemoryBroker::new();
    let mut txn = Txn::begin();
    txn.commit();
    let mut target = TargetDocument::new(1, "/db/test");
    let err = Materializer::new(&mut broker, &txn, builder.document().unwrap(), &mut target)
        .store()
        .unwrap_err();
    assert!(matches!(err, Error::Storage(StorageError::TransactionNotActive(_))));
}

#[test]
fn index_notified_when_configured_element_closes() {
    let builder = build_round_trip_tree();
    let mut broker = MemoryBroker::new();
    broker.register_collection(
        "/db",
        CollectionConfiguration {
            index: Some(IndexSpec {
                index_depth: 2,
                create: vec![ValueIndexSpec::new("//a/b", ValueType::String)],
            }),
        },
    );
    store(&mut broker, builder.document().unwrap(), 1).unwrap();

    let entries = broker.index_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].value, "hello");
    assert_eq!(entries[0].node_id.to_string(), "1.1.2");
    // wrapper and <a> are within the structural index depth
    assert_eq!(broker.structural_entries(1).count(), 2);
}

#[test]
fn element_names_are_interned_in_broker_symbols() {
    let builder = build_round_trip_tree();
    let mut broker = MemoryBroker::new();
    store(&mut broker, builder.document().unwrap(), 1).unwrap();
    use memtree::storage::StorageBroker;
    let symbols = broker.symbols();
    assert!(symbols.lookup(&QName::local("a")).is_some());
    assert!(symbols.lookup(&QName::local("x")).is_some());
    assert!(symbols.lookup(&QName::wrapper()).is_some());
}
