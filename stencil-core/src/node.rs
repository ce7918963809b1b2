//! Node catalog and tree-walking execution engine
//!
//! A compiled program is an immutable [`FormatNode`] tree. Control nodes
//! (sequencing, repetition, cursor moves) are shared by every front-end;
//! the leaves are front-end specific instructions implementing
//! [`Instruction`] for that front-end's execution state. Each leaf performs
//! the read, convert and write stages of one directive or conversion.

use crate::error::FormatError;
use crate::value::Value;
use crate::Result;
use std::borrow::Cow;

/// Per-invocation cursor positions
///
/// The source range is `source_start..source_end` over the argument list
/// (pack, printf) or the input bytes (unpack).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    /// Next source element to read
    pub source_position: usize,
    /// First readable source element
    pub source_start: usize,
    /// One past the last readable source element
    pub source_end: usize,
    /// Next output offset to write
    pub output_position: usize,
}

impl Cursor {
    /// Cursor over a source of `source_len` elements
    pub fn new(source_len: usize) -> Self {
        Self {
            source_position: 0,
            source_start: 0,
            source_end: source_len,
            output_position: 0,
        }
    }

    /// Source elements left to read
    pub fn remaining(&self) -> usize {
        self.source_end.saturating_sub(self.source_position)
    }

    /// Whether the source is exhausted
    pub fn at_end(&self) -> bool {
        self.source_position >= self.source_end
    }
}

/// Mutable state one execution threads through the tree
pub trait ExecutionState {
    /// Shared view of the cursor
    fn cursor(&self) -> &Cursor;

    /// Mutable view of the cursor
    fn cursor_mut(&mut self) -> &mut Cursor;

    /// Move the output cursor to an absolute position
    fn seek_output(&mut self, position: usize) -> Result<()>;
}

/// A leaf operation executable against state `S`
pub trait Instruction<S: ExecutionState> {
    /// Run the operation, advancing the cursor
    fn execute(&self, state: &mut S) -> Result<()>;
}

/// One node of a compiled program
#[derive(Debug, Clone, PartialEq)]
pub enum FormatNode<I> {
    /// Execute children in order
    Sequence(Vec<FormatNode<I>>),

    /// Execute `body` exactly `count` times
    FixedRepeat {
        /// Number of iterations
        count: usize,
        /// Repeated node
        body: Box<FormatNode<I>>,
    },

    /// Execute the body while source remains
    StarRepeat(Box<FormatNode<I>>),

    /// Seek the source cursor to an offset from `source_start`
    SetSourcePosition(usize),

    /// Seek the output cursor to an absolute offset
    SetOutputPosition(usize),

    /// Skip one source element, or jump to the end
    AdvanceSourcePosition {
        /// Jump to `source_end` instead of stepping once
        to_end: bool,
    },

    /// Step the source back one element, or back by the remaining count
    ReverseSourcePosition {
        /// Step back by `source_end - source_position` instead of one
        remaining: bool,
    },

    /// Step the output cursor back one byte
    ReverseOutputPosition,

    /// Front-end specific leaf
    Op(I),
}

impl<I> FormatNode<I> {
    /// A node that does nothing
    pub fn empty() -> Self {
        FormatNode::Sequence(Vec::new())
    }

    /// Wrap nodes in a sequence, collapsing the single-child case
    pub fn sequence(mut nodes: Vec<FormatNode<I>>) -> Self {
        if nodes.len() == 1 {
            if let Some(node) = nodes.pop() {
                return node;
            }
        }
        FormatNode::Sequence(nodes)
    }

    /// Repeat `body` `count` times
    ///
    /// Single-node bodies with `count <= unroll_limit` are unrolled into a
    /// sequence; anything else becomes a bounded loop.
    pub fn fixed_repeat(count: usize, body: FormatNode<I>, unroll_limit: usize) -> Self
    where
        I: Clone,
    {
        match count {
            0 => FormatNode::empty(),
            1 => body,
            n if n <= unroll_limit && body.node_count() == 1 => FormatNode::Sequence(vec![body; n]),
            n => FormatNode::FixedRepeat {
                count: n,
                body: Box::new(body),
            },
        }
    }

    /// Repeat `body` while source remains
    pub fn star_repeat(body: FormatNode<I>) -> Self {
        FormatNode::StarRepeat(Box::new(body))
    }

    /// Total number of nodes in this tree
    pub fn node_count(&self) -> usize {
        match self {
            FormatNode::Sequence(children) => 1 + children.iter().map(Self::node_count).sum::<usize>(),
            FormatNode::FixedRepeat { body, .. } | FormatNode::StarRepeat(body) => 1 + body.node_count(),
            _ => 1,
        }
    }

    /// Execute this tree against `state`
    ///
    /// The first failure aborts the whole execution.
    pub fn execute<S>(&self, state: &mut S) -> Result<()>
    where
        S: ExecutionState,
        I: Instruction<S>,
    {
        match self {
            FormatNode::Sequence(children) => {
                for child in children {
                    child.execute(state)?;
                }
                Ok(())
            }
            FormatNode::FixedRepeat { count, body } => {
                for _ in 0..*count {
                    body.execute(state)?;
                }
                Ok(())
            }
            FormatNode::StarRepeat(body) => loop {
                let before = state.cursor().source_position;
                if before >= state.cursor().source_end {
                    return Ok(());
                }
                body.execute(state)?;
                if state.cursor().source_position == before {
                    return Ok(());
                }
            },
            FormatNode::SetSourcePosition(offset) => {
                let cursor = state.cursor_mut();
                let target = cursor.source_start + offset;
                if target > cursor.source_end {
                    return Err(FormatError::out_of_range("@ outside of string"));
                }
                cursor.source_position = target;
                Ok(())
            }
            FormatNode::SetOutputPosition(position) => state.seek_output(*position),
            FormatNode::AdvanceSourcePosition { to_end } => {
                let cursor = state.cursor_mut();
                if *to_end {
                    cursor.source_position = cursor.source_end;
                } else if cursor.source_position >= cursor.source_end {
                    return Err(FormatError::out_of_range("x outside of string"));
                } else {
                    cursor.source_position += 1;
                }
                Ok(())
            }
            FormatNode::ReverseSourcePosition { remaining } => {
                let cursor = state.cursor_mut();
                let step = if *remaining { cursor.remaining() } else { 1 };
                if cursor.source_position < cursor.source_start + step {
                    return Err(FormatError::out_of_range("X outside of string"));
                }
                cursor.source_position -= step;
                Ok(())
            }
            FormatNode::ReverseOutputPosition => {
                let position = state.cursor().output_position;
                if position == 0 {
                    return Err(FormatError::out_of_range("X outside of string"));
                }
                state.seek_output(position - 1)
            }
            FormatNode::Op(op) => op.execute(state),
        }
    }
}

/// Read the argument at the source cursor and advance past it
pub(crate) fn read_next<'a>(args: &'a [Value], cursor: &mut Cursor) -> Result<&'a Value> {
    if cursor.at_end() {
        return Err(FormatError::TooFewArguments);
    }
    let value = args
        .get(cursor.source_position)
        .ok_or(FormatError::TooFewArguments)?;
    cursor.source_position += 1;
    Ok(value)
}

/// Pad `body` to `width` display columns with spaces, left or right justified
///
/// `measured` is the display width of `body`.
pub(crate) fn justify(body: &[u8], measured: usize, width: Option<usize>, left: bool) -> Cow<'_, [u8]> {
    match width {
        Some(width) if width > measured => {
            let pad = width - measured;
            let mut out = Vec::with_capacity(body.len() + pad);
            if left {
                out.extend_from_slice(body);
                out.resize(body.len() + pad, b' ');
            } else {
                out.resize(pad, b' ');
                out.extend_from_slice(body);
            }
            Cow::Owned(out)
        }
        _ => Cow::Borrowed(body),
    }
}
