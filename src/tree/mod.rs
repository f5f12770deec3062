//! Static tree model
//!
//! Built once from `(child, parent)` records, where a record with
//! `child == parent` marks the root. Construction validates the whole shape
//! so that every per-node barrier arity computed from it is exact: a child
//! count that disagrees with the real edges would leave a barrier waiting
//! forever.

mod node;
mod parse;

pub use node::{Node, NodeId};
pub use parse::{parse_edges, parse_tree};

use std::collections::VecDeque;
use std::fmt;
use thiserror::Error;

/// Maximum number of nodes accepted unless configured otherwise
pub const DEFAULT_CAPACITY: usize = 100;

/// One `(child, parent)` record of a tree definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    /// Node being defined
    pub child: NodeId,
    /// Its parent (equal to `child` for the root record)
    pub parent: NodeId,
}

impl Edge {
    /// Create a parent-child record
    pub fn new(child: NodeId, parent: NodeId) -> Self {
        Self { child, parent }
    }

    /// Create the self-referential record designating `id` as root
    pub fn root(id: NodeId) -> Self {
        Self {
            child: id,
            parent: id,
        }
    }

    /// Whether this record designates the root
    #[inline]
    pub fn is_root(&self) -> bool {
        self.child == self.parent
    }
}

impl From<(NodeId, NodeId)> for Edge {
    fn from((child, parent): (NodeId, NodeId)) -> Self {
        Self::new(child, parent)
    }
}

/// Errors raised while building a tree
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// Shape or syntax of the definition is invalid
    #[error("malformed tree: {0}")]
    Malformed(#[from] MalformedTree),

    /// More records than the configured capacity
    #[error("tree has {nodes} nodes but capacity is {capacity}")]
    CapacityExceeded {
        /// Number of records in the definition
        nodes: usize,
        /// Configured maximum
        capacity: usize,
    },
}

impl TreeError {
    /// True for every variant except capacity overflow
    pub fn is_malformed(&self) -> bool {
        matches!(self, TreeError::Malformed(_))
    }
}

/// Reasons a tree definition is rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedTree {
    /// Definition contains no records at all
    #[error("empty tree definition")]
    Empty,

    /// No record with `child == parent`
    #[error("no root record (a pair with child == parent)")]
    MissingRoot,

    /// More than one record with `child == parent`
    #[error("multiple root records: {first} and {second}")]
    MultipleRoots {
        /// Root declared first
        first: NodeId,
        /// Second root declaration
        second: NodeId,
    },

    /// The same child id appears in two records
    #[error("node {0} is defined more than once")]
    DuplicateNode(NodeId),

    /// A parent id that no record defines
    #[error("node {child} names parent {parent}, which is not defined")]
    DanglingParent {
        /// Child naming the parent
        child: NodeId,
        /// Undefined parent id
        parent: NodeId,
    },

    /// Node ids must be dense in `[0, nodes)`
    #[error("node id {id} is outside the dense range 0..{nodes}")]
    IdOutOfRange {
        /// Offending id
        id: NodeId,
        /// Number of records
        nodes: usize,
    },

    /// A node that cannot be reached from the root lies on a cycle
    #[error("node {0} is not reachable from the root (parent links form a cycle)")]
    Cycle(NodeId),

    /// Token that is not a non-negative integer
    #[error("invalid token '{token}' at position {position}")]
    BadToken {
        /// 1-based token index in the input
        position: usize,
        /// Token text
        token: String,
    },

    /// Input ended before the declared number of records
    #[error("expected {expected} records, found {found}")]
    Truncated {
        /// Declared record count
        expected: usize,
        /// Complete records read
        found: usize,
    },

    /// Tokens after the declared records
    #[error("unexpected trailing input '{token}' after {records} records")]
    TrailingInput {
        /// Declared record count
        records: usize,
        /// First extra token
        token: String,
    },
}

/// Validated, immutable rooted tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tree {
    nodes: Vec<Node>,
    root: NodeId,
    height: usize,
}

impl Tree {
    /// Create builder with the default capacity
    pub fn builder() -> TreeBuilder {
        TreeBuilder::new()
    }

    /// Build from `(child, parent)` pairs with the default capacity
    pub fn build<I>(pairs: I) -> Result<Self, TreeError>
    where
        I: IntoIterator<Item = (NodeId, NodeId)>,
    {
        Self::build_with_capacity(pairs, DEFAULT_CAPACITY)
    }

    /// Build from `(child, parent)` pairs with an explicit capacity
    pub fn build_with_capacity<I>(pairs: I, capacity: usize) -> Result<Self, TreeError>
    where
        I: IntoIterator<Item = (NodeId, NodeId)>,
    {
        Self::builder()
            .capacity(capacity)
            .edges(pairs.into_iter().map(Edge::from))
            .build()
    }

    /// Root id
    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a valid tree has a root
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node by id
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Parent of `id`; `None` for the root or an unknown id
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(Node::parent)
    }

    /// Children of `id`; empty for leaves and unknown ids
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(Node::children).unwrap_or(&[])
    }

    /// Child count of `id`
    pub fn child_count(&self, id: NodeId) -> usize {
        self.children(id).len()
    }

    /// Whether `id` is a leaf
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(Node::is_leaf)
    }

    /// Iterate all nodes in id order
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Leaf ids in ascending order
    pub fn leaves(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|node| node.is_leaf())
            .map(Node::id)
            .collect()
    }

    /// Internal node ids in ascending order
    pub fn internal_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|node| !node.is_leaf())
            .map(Node::id)
            .collect()
    }

    /// Internal nodes ordered deepest first, ties broken by id
    ///
    /// This is a valid completion order for the reduction: every node comes
    /// after all of its internal descendants.
    pub fn internal_nodes_bottom_up(&self) -> Vec<NodeId> {
        let mut ids = self.internal_nodes();
        ids.sort_by_key(|&id| (std::cmp::Reverse(self.nodes[id].depth), id));
        ids
    }

    /// Longest root-to-leaf path, in edges
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }
}

impl fmt::Display for Tree {
    /// Summary line, then one indented line per node in id order
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} nodes, root {}, height {}, {} leaves",
            self.len(),
            self.root,
            self.height,
            self.leaves().len()
        )?;
        for node in &self.nodes {
            write!(f, "\n  {}", node)?;
        }
        Ok(())
    }
}

/// Builder for trees (fluent API)
#[derive(Debug)]
pub struct TreeBuilder {
    capacity: usize,
    edges: Vec<Edge>,
}

impl TreeBuilder {
    /// Create new builder
    pub fn new() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            edges: Vec::new(),
        }
    }

    /// Set maximum node count
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Add a `(child, parent)` record
    pub fn edge(mut self, child: NodeId, parent: NodeId) -> Self {
        self.edges.push(Edge::new(child, parent));
        self
    }

    /// Add the root record
    pub fn root(mut self, id: NodeId) -> Self {
        self.edges.push(Edge::root(id));
        self
    }

    /// Add many records
    pub fn edges<I>(mut self, edges: I) -> Self
    where
        I: IntoIterator<Item = Edge>,
    {
        self.edges.extend(edges);
        self
    }

    /// Validate the records and build the tree
    pub fn build(self) -> Result<Tree, TreeError> {
        let count = self.edges.len();
        if count > self.capacity {
            return Err(TreeError::CapacityExceeded {
                nodes: count,
                capacity: self.capacity,
            });
        }
        if count == 0 {
            return Err(MalformedTree::Empty.into());
        }

        // 1. Every record defines one node; ids must be dense and unique
        let mut defined = vec![false; count];
        let mut parents: Vec<Option<NodeId>> = vec![None; count];
        let mut root = None;
        for edge in &self.edges {
            if edge.child >= count {
                return Err(MalformedTree::IdOutOfRange {
                    id: edge.child,
                    nodes: count,
                }
                .into());
            }
            if defined[edge.child] {
                return Err(MalformedTree::DuplicateNode(edge.child).into());
            }
            defined[edge.child] = true;

            if edge.is_root() {
                if let Some(first) = root {
                    return Err(MalformedTree::MultipleRoots {
                        first,
                        second: edge.child,
                    }
                    .into());
                }
                root = Some(edge.child);
            } else {
                parents[edge.child] = Some(edge.parent);
            }
        }
        let root = root.ok_or(MalformedTree::MissingRoot)?;

        // 2. Every parent must be a defined node. Ids are dense and unique,
        //    so all of [0, count) is defined at this point.
        let mut nodes: Vec<Node> = (0..count).map(|id| Node::new(id, parents[id])).collect();
        for child in 0..count {
            if let Some(parent) = parents[child] {
                if parent >= count {
                    return Err(MalformedTree::DanglingParent { child, parent }.into());
                }
                nodes[parent].children.push(child);
            }
        }

        // 3. Breadth-first from the root; anything unreached sits on a cycle
        let mut visited = vec![false; count];
        let mut queue = VecDeque::from([root]);
        visited[root] = true;
        let mut height = 0;
        while let Some(id) = queue.pop_front() {
            let depth = nodes[id].depth;
            height = height.max(depth);
            for i in 0..nodes[id].children.len() {
                let child = nodes[id].children[i];
                visited[child] = true;
                nodes[child].depth = depth + 1;
                queue.push_back(child);
            }
        }
        if let Some(unreached) = visited.iter().position(|seen| !seen) {
            return Err(MalformedTree::Cycle(unreached).into());
        }

        Ok(Tree {
            nodes,
            root,
            height,
        })
    }
}
