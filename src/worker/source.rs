//! Leaf value sources
//!
//! A leaf asks its source for exactly one value when its worker runs. Leaves
//! run concurrently and in no particular order, so sources must be `Sync`.

use std::collections::HashMap;
use std::fmt;
use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};
use std::num::ParseIntError;

use parking_lot::Mutex;
use thiserror::Error;

use crate::tree::NodeId;

/// A leaf could not obtain its value
#[derive(Error, Debug)]
pub enum LeafInputError {
    /// Input was not an integer
    #[error("invalid value '{input}': {source}")]
    Parse {
        /// Text that failed to parse
        input: String,
        /// Underlying parse failure
        #[source]
        source: ParseIntError,
    },

    /// Source holds no value for this leaf
    #[error("no value supplied")]
    Missing,

    /// Interactive input ended first
    #[error("input closed before a value was supplied")]
    Closed,

    /// Reading or prompting failed
    #[error("failed to read value: {0}")]
    Io(#[from] io::Error),
}

/// Batch values file could not be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValuesError {
    /// Line is not `node value`
    #[error("line {line}: expected '<node> <value>', found '{text}'")]
    BadLine {
        /// 1-based line number
        line: usize,
        /// Line content
        text: String,
    },

    /// Node listed twice
    #[error("line {line}: node {node} already has a value")]
    Duplicate {
        /// 1-based line number of the second entry
        line: usize,
        /// Node id
        node: NodeId,
    },
}

/// Source of leaf values
pub trait LeafSource: Sync {
    /// Produce the value for leaf `node`
    fn value_for(&self, node: NodeId) -> Result<i64, LeafInputError>;
}

impl<F> LeafSource for F
where
    F: Fn(NodeId) -> Result<i64, LeafInputError> + Sync,
{
    fn value_for(&self, node: NodeId) -> Result<i64, LeafInputError> {
        self(node)
    }
}

/// Parse one leaf value, surrounding whitespace ignored
pub fn parse_value(input: &str) -> Result<i64, LeafInputError> {
    let trimmed = input.trim();
    trimmed.parse().map_err(|source| LeafInputError::Parse {
        input: trimmed.to_string(),
        source,
    })
}

/// Fixed id → value table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixedValues {
    values: HashMap<NodeId, i64>,
}

impl FixedValues {
    /// Create empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the value of `node`, returning the previous one
    pub fn insert(&mut self, node: NodeId, value: i64) -> Option<i64> {
        self.values.insert(node, value)
    }

    /// Value of `node`, if any
    pub fn get(&self, node: NodeId) -> Option<i64> {
        self.values.get(&node).copied()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Parse a values file: one `node value` pair per line
    ///
    /// Blank lines and lines starting with `#` are skipped.
    pub fn parse(text: &str) -> Result<Self, ValuesError> {
        let mut values = Self::new();
        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            let content = raw.trim();
            if content.is_empty() || content.starts_with('#') {
                continue;
            }

            let bad_line = || ValuesError::BadLine {
                line,
                text: content.to_string(),
            };
            let mut fields = content.split_whitespace();
            let (Some(node), Some(value), None) = (fields.next(), fields.next(), fields.next())
            else {
                return Err(bad_line());
            };
            let node: NodeId = node.parse().map_err(|_| bad_line())?;
            let value: i64 = value.parse().map_err(|_| bad_line())?;

            if values.insert(node, value).is_some() {
                return Err(ValuesError::Duplicate { line, node });
            }
        }
        Ok(values)
    }
}

impl FromIterator<(NodeId, i64)> for FixedValues {
    fn from_iter<T: IntoIterator<Item = (NodeId, i64)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl LeafSource for FixedValues {
    fn value_for(&self, node: NodeId) -> Result<i64, LeafInputError> {
        self.get(node).ok_or(LeafInputError::Missing)
    }
}

struct PromptIo<R, W> {
    reader: R,
    writer: W,
}

/// Interactive source: prompts for each leaf and reads one line
///
/// Prompt and read happen under one lock so concurrent leaves never
/// interleave their prompts.
pub struct PromptedValues<R, W> {
    io: Mutex<PromptIo<R, W>>,
}

impl<R, W> PromptedValues<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    /// Prompt on `writer`, read answers from `reader`
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            io: Mutex::new(PromptIo { reader, writer }),
        }
    }

    /// Give back the reader and writer
    pub fn into_inner(self) -> (R, W) {
        let io = self.io.into_inner();
        (io.reader, io.writer)
    }
}

impl PromptedValues<BufReader<Stdin>, Stdout> {
    /// Prompt on stdout, read from stdin
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R, W> LeafSource for PromptedValues<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn value_for(&self, node: NodeId) -> Result<i64, LeafInputError> {
        let mut guard = self.io.lock();
        let PromptIo { reader, writer } = &mut *guard;

        write!(writer, "Leaf node {} :: Enter an integer: ", node)?;
        writer.flush()?;

        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Err(LeafInputError::Closed);
        }
        parse_value(&line)
    }
}

impl<R, W> fmt::Debug for PromptedValues<R, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromptedValues").finish_non_exhaustive()
    }
}
