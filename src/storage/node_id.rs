//! Dynamic level numbering (DLN) node identifiers
//!
//! A node id is the path of sibling ordinals from the root, e.g. `1.3.2`
//! for the second child of the third child of the root. Comparing ids
//! lexicographically yields document order, and a new child or following
//! sibling can always be numbered without touching existing ids.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NodeId(Vec<u32>);

impl NodeId {
    /// Id of the document node itself (no components)
    pub const DOCUMENT: NodeId = NodeId(Vec::new());

    /// Id of the first top-level node
    pub fn root() -> Self {
        NodeId(vec![1])
    }

    pub fn from_components(components: Vec<u32>) -> Self {
        NodeId(components)
    }

    /// Id of the first child of this node
    pub fn new_child(&self) -> Self {
        let mut levels = Vec::with_capacity(self.0.len() + 1);
        levels.extend_from_slice(&self.0);
        levels.push(1);
        NodeId(levels)
    }

    /// Id of the following sibling
    pub fn next_sibling(&self) -> Self {
        let mut levels = self.0.clone();
        if let Some(last) = levels.last_mut() {
            *last += 1;
        }
        NodeId(levels)
    }

    /// Id of the parent, or None for the document node
    pub fn parent(&self) -> Option<Self> {
        let (_, parent) = self.0.split_last()?;
        Some(NodeId(parent.to_vec()))
    }

    /// Nesting depth; top-level nodes are on level 1
    #[inline]
    pub fn level(&self) -> usize {
        self.0.len()
    }

    /// True if `self` is a proper descendant of `other`
    pub fn is_descendant_of(&self, other: &NodeId) -> bool {
        self.0.len() > other.0.len() && self.0.starts_with(&other.0)
    }

    #[inline]
    pub fn components(&self) -> &[u32] {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for (i, n) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", n)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbering() {
        let root = NodeId::root();
        let child = root.new_child();
        let sibling = child.next_sibling();
        assert_eq!(child.to_string(), "1.1");
        assert_eq!(sibling.to_string(), "1.2");
        assert_eq!(sibling.parent(), Some(root.clone()));
        assert_eq!(root.parent(), Some(NodeId::DOCUMENT));
        assert_eq!(NodeId::DOCUMENT.parent(), None);
        assert_eq!(sibling.level(), 2);
    }

    #[test]
    fn test_order_is_document_order() {
        let a = NodeId::root();
        let a1 = a.new_child();
        let a1x = a1.new_child();
        let a2 = a1.next_sibling();
        let mut ids = vec![a2.clone(), a1x.clone(), a.clone(), a1.clone()];
        ids.sort();
        assert_eq!(ids, vec![a.clone(), a1.clone(), a1x.clone(), a2.clone()]);
        assert!(a1x.is_descendant_of(&a));
        assert!(!a2.is_descendant_of(&a1));
    }
}
