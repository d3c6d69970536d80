//! Owned construction events
//!
//! A query evaluator can record the events it produces and replay them
//! into a builder later, or into several builders.

use super::builder::{Attribute, TreeBuilder};
use super::node::NodeNumber;
use super::reference::ExternalRef;
use crate::core::QName;
use crate::error::Result;

/// An attribute carried by an owned start-element event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnedAttribute {
    pub name: QName,
    pub value: String,
    pub type_hint: String,
}

impl OwnedAttribute {
    pub fn new(name: QName, value: impl Into<String>) -> Self {
        OwnedAttribute {
            name,
            value: value.into(),
            type_hint: "CDATA".to_owned(),
        }
    }

    fn as_attribute(&self) -> Attribute<'_> {
        Attribute::new(self.name.clone(), &self.value).with_type(&self.type_hint)
    }
}

/// One builder call
#[derive(Debug, Clone)]
pub enum BuildEvent {
    StartDocument { explicit: bool },
    EndDocument,
    StartElement {
        name: QName,
        attributes: Vec<OwnedAttribute>,
    },
    EndElement,
    Characters(String),
    CData(String),
    Comment(String),
    ProcessingInstruction {
        target: String,
        data: Option<String>,
    },
    Namespace { prefix: String, uri: String },
    Attribute { name: QName, value: String },
    Reference(ExternalRef),
    DocumentType {
        name: String,
        public_id: Option<String>,
        system_id: Option<String>,
    },
}

impl TreeBuilder {
    /// Apply a single event, returning the node it created or extended
    pub fn apply(&mut self, event: &BuildEvent) -> Result<Option<NodeNumber>> {
        match event {
            BuildEvent::StartDocument { explicit } => {
                self.start_document_explicit(*explicit);
                Ok(None)
            }
            BuildEvent::EndDocument => {
                self.end_document();
                Ok(None)
            }
            BuildEvent::StartElement { name, attributes } => {
                let attrs: Vec<Attribute<'_>> = attributes.iter().map(OwnedAttribute::as_attribute).collect();
                self.start_element(name, &attrs).map(Some)
            }
            BuildEvent::EndElement => self.end_element().map(|_| None),
            BuildEvent::Characters(text) => self.characters(text).map(Some),
            BuildEvent::CData(text) => self.cdata_section(text).map(Some),
            BuildEvent::Comment(text) => self.comment(text).map(Some),
            BuildEvent::ProcessingInstruction { target, data } => {
                self.processing_instruction(target, data.as_deref()).map(Some)
            }
            BuildEvent::Namespace { prefix, uri } => self.namespace_node_for(prefix, uri).map(|_| None),
            BuildEvent::Attribute { name, value } => self.add_attribute(name, value).map(|_| None),
            BuildEvent::Reference(node) => self.add_reference_node(node.clone()),
            BuildEvent::DocumentType {
                name,
                public_id,
                system_id,
            } => self
                .document_type(name, public_id.as_deref(), system_id.as_deref())
                .map(|_| None),
        }
    }

    /// Apply events in order, stopping at the first failure
    pub fn replay<'e>(&mut self, events: impl IntoIterator<Item = &'e BuildEvent>) -> Result<()> {
        for event in events {
            self.apply(event)?;
        }
        Ok(())
    }
}
