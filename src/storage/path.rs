//! Structural paths
//!
//! The chain of element names from the stored root down to the element
//! currently being written. Index configurations are matched against it.

use crate::core::QName;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodePath {
    components: Vec<QName>,
}

impl NodePath {
    pub fn new() -> Self {
        NodePath::default()
    }

    pub fn add_component(&mut self, name: QName) {
        self.components.push(name);
    }

    pub fn remove_last_component(&mut self) -> Option<QName> {
        self.components.pop()
    }

    #[inline]
    pub fn components(&self) -> &[QName] {
        &self.components
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn last(&self) -> Option<&QName> {
        self.components.last()
    }

    pub fn clear(&mut self) {
        self.components.clear();
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for name in &self.components {
            write!(f, "/{}", name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_pop_display() {
        let mut path = NodePath::new();
        path.add_component(QName::wrapper());
        path.add_component(QName::local("a"));
        assert_eq!(path.to_string(), "/exist:temp/a");
        assert_eq!(path.remove_last_component(), Some(QName::local("a")));
        assert_eq!(path.len(), 1);
    }
}
