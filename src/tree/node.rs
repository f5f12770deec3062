//! Arena node representation
//!
//! Nodes live in a `Vec` indexed by their id. Parent and child links are
//! plain ids, validated once when the tree is built.

use std::fmt;

/// Node identifier: dense index in `[0, node_count)`
pub type NodeId = usize;

/// Single node of a validated tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub(super) id: NodeId,
    pub(super) parent: Option<NodeId>,
    /// Direct children, ascending by id
    pub(super) children: Vec<NodeId>,
    pub(super) depth: usize,
}

impl Node {
    pub(super) fn new(id: NodeId, parent: Option<NodeId>) -> Self {
        Self {
            id,
            parent,
            children: Vec::new(),
            depth: 0,
        }
    }

    /// Node id
    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Parent id, `None` for the root
    #[inline]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Direct children in ascending id order
    #[inline]
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Number of direct children (the arity of this node's barrier)
    #[inline]
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Distance from the root (root = 0)
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Check if leaf (no children)
    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Check if root (no parent)
    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parent {
            Some(parent) => write!(f, "node {} (parent {}", self.id, parent)?,
            None => write!(f, "node {} (root", self.id)?,
        }
        match self.children.len() {
            0 => write!(f, ", leaf)"),
            1 => write!(f, ", 1 child)"),
            n => write!(f, ", {} children)", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let mut root = Node::new(0, None);
        root.children = vec![1, 2];
        assert_eq!(root.to_string(), "node 0 (root, 2 children)");

        let leaf = Node::new(2, Some(0));
        assert_eq!(leaf.to_string(), "node 2 (parent 0, leaf)");
        assert!(leaf.is_leaf());
        assert!(!leaf.is_root());
    }
}
