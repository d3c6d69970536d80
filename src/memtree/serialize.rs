//! XML serialization of transient trees
//!
//! Uses an explicit stack so deep trees cannot overflow the call stack.
//! Reference nodes are serialized by reading through to the external node.

use super::document::TransientDocument;
use super::node::{NodeKind, NodeNumber};
use super::reference::ExternalRef;

enum StackEntry {
    Enter(NodeNumber),
    Close(NodeNumber),
    EnterExternal(ExternalRef),
    CloseExternal(String),
}

/// Serialize the whole document (every top-level node, no XML declaration)
pub fn serialize_document(doc: &TransientDocument) -> String {
    serialize_node(doc, NodeNumber::DOCUMENT)
}

/// Serialize one node and its subtree
pub fn serialize_node(doc: &TransientDocument, nr: NodeNumber) -> String {
    let mut buf = String::with_capacity(doc.chars_len() + 64);
    let mut stack: Vec<StackEntry> = Vec::with_capacity(64);
    stack.push(StackEntry::Enter(nr));

    while let Some(entry) = stack.pop() {
        match entry {
            StackEntry::Close(id) => {
                if let Some(name) = doc.name(id) {
                    buf.push_str("</");
                    buf.push_str(&name.lexical());
                    buf.push('>');
                }
            }
            StackEntry::CloseExternal(name) => {
                buf.push_str("</");
                buf.push_str(&name);
                buf.push('>');
            }
            StackEntry::Enter(current) => {
                let Some(kind) = doc.kind(current) else {
                    continue;
                };
                match kind {
                    NodeKind::Document => {
                        let children: Vec<_> = doc.children(current).collect();
                        stack.extend(children.into_iter().rev().map(StackEntry::Enter));
                    }
                    NodeKind::Element => {
                        let name = doc.name(current).map(|n| n.lexical()).unwrap_or_default();
                        buf.push('<');
                        buf.push_str(&name);
                        for ns in doc.namespaces(current) {
                            buf.push(' ');
                            buf.push_str(&ns.lexical());
                            buf.push_str("=\"");
                            escape_xml_to_buf(ns.namespace_uri(), &mut buf);
                            buf.push('"');
                        }
                        for attr in doc.attributes(current) {
                            buf.push(' ');
                            buf.push_str(&attr.name.lexical());
                            buf.push_str("=\"");
                            escape_xml_to_buf(attr.value, &mut buf);
                            buf.push('"');
                        }

                        let children: Vec<_> = doc.children(current).collect();
                        if children.is_empty() {
                            buf.push_str("/>");
                        } else {
                            buf.push('>');
                            stack.push(StackEntry::Close(current));
                            stack.extend(children.into_iter().rev().map(StackEntry::Enter));
                        }
                    }
                    NodeKind::Reference => {
                        if let Some(node) = doc.reference(current) {
                            stack.push(StackEntry::EnterExternal(node.clone()));
                        }
                    }
                    _ => {
                        let name = doc.name(current).map(|n| n.lexical().into_owned());
                        write_leaf(kind, name.as_deref(), doc.text(current).unwrap_or(""), &mut buf);
                    }
                }
            }
            StackEntry::EnterExternal(node) => match node.kind() {
                NodeKind::Document => {
                    stack.extend(node.children().into_iter().rev().map(StackEntry::EnterExternal));
                }
                NodeKind::Element => {
                    let name = node.name().map(|n| n.lexical().into_owned()).unwrap_or_default();
                    buf.push('<');
                    buf.push_str(&name);
                    for (prefix, uri) in node.namespaces() {
                        buf.push_str(" xmlns");
                        if !prefix.is_empty() {
                            buf.push(':');
                            buf.push_str(&prefix);
                        }
                        buf.push_str("=\"");
                        escape_xml_to_buf(&uri, &mut buf);
                        buf.push('"');
                    }
                    for attr in node.attributes() {
                        buf.push(' ');
                        buf.push_str(&attr.name.lexical());
                        buf.push_str("=\"");
                        escape_xml_to_buf(&attr.value, &mut buf);
                        buf.push('"');
                    }
                    let children = node.children();
                    if children.is_empty() {
                        buf.push_str("/>");
                    } else {
                        buf.push('>');
                        stack.push(StackEntry::CloseExternal(name));
                        stack.extend(children.into_iter().rev().map(StackEntry::EnterExternal));
                    }
                }
                kind => {
                    let name = node.name().map(|n| n.lexical().into_owned());
                    write_leaf(kind, name.as_deref(), &node.string_value(), &mut buf);
                }
            },
        }
    }

    buf
}

fn write_leaf(kind: NodeKind, name: Option<&str>, content: &str, buf: &mut String) {
    match kind {
        NodeKind::Text => escape_xml_to_buf(content, buf),
        NodeKind::CData => {
            buf.push_str("<![CDATA[");
            buf.push_str(content);
            buf.push_str("]]>");
        }
        NodeKind::Comment => {
            buf.push_str("<!--");
            buf.push_str(content);
            buf.push_str("-->");
        }
        NodeKind::ProcessingInstruction => {
            buf.push_str("<?");
            buf.push_str(name.unwrap_or(""));
            if !content.is_empty() {
                buf.push(' ');
                buf.push_str(content);
            }
            buf.push_str("?>");
        }
        _ => {}
    }
}

/// Escape XML special characters to buffer
#[inline]
fn escape_xml_to_buf(s: &str, buf: &mut String) {
    for c in s.chars() {
        match c {
            '&' => buf.push_str("&amp;"),
            '<' => buf.push_str("&lt;"),
            '>' => buf.push_str("&gt;"),
            '"' => buf.push_str("&quot;"),
            _ => buf.push(c),
        }
    }
}
