//! Tree definition text format
//!
//! Whitespace-separated non-negative integers: the record count `N`, then
//! exactly `N` pairs `child parent`. Line breaks carry no meaning.
//!
//! ```text
//! 3
//! 1 0
//! 2 0
//! 0 0
//! ```

use super::{Edge, MalformedTree, NodeId, Tree, TreeError};

/// Parse records without building the tree
///
/// The declared count is checked against `capacity` before any pair is read.
pub fn parse_edges(text: &str, capacity: usize) -> Result<Vec<Edge>, TreeError> {
    let mut tokens = text.split_whitespace().enumerate();

    let expected = match tokens.next() {
        Some((index, token)) => parse_id(index, token)?,
        None => return Err(MalformedTree::Empty.into()),
    };
    if expected > capacity {
        return Err(TreeError::CapacityExceeded {
            nodes: expected,
            capacity,
        });
    }

    let mut edges = Vec::with_capacity(expected);
    while edges.len() < expected {
        let truncated = || MalformedTree::Truncated {
            expected,
            found: edges.len(),
        };
        let (index, token) = tokens.next().ok_or_else(truncated)?;
        let child = parse_id(index, token)?;
        let (index, token) = tokens.next().ok_or_else(truncated)?;
        let parent = parse_id(index, token)?;
        edges.push(Edge::new(child, parent));
    }

    if let Some((_, token)) = tokens.next() {
        return Err(MalformedTree::TrailingInput {
            records: expected,
            token: token.to_string(),
        }
        .into());
    }

    Ok(edges)
}

/// Parse and validate a tree definition
pub fn parse_tree(text: &str, capacity: usize) -> Result<Tree, TreeError> {
    let edges = parse_edges(text, capacity)?;
    Tree::builder().capacity(capacity).edges(edges).build()
}

fn parse_id(index: usize, token: &str) -> Result<NodeId, MalformedTree> {
    token.parse().map_err(|_| MalformedTree::BadToken {
        position: index + 1,
        token: token.to_string(),
    })
}
