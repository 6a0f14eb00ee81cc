// SPDX-License-Identifier: MIT OR Apache-2.0
//! Errors raised by track editing and evaluation.

use crate::block::BlockId;
use crate::time::Rational;
use cutline_graph::GraphError;

/// Result type for sequencer operations
pub type Result<T> = std::result::Result<T, SequencerError>;

/// Error raised when an edit or query cannot be carried out
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SequencerError {
    /// Graph ownership error
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Block has not been registered with the graph
    #[error("Block not registered with the graph: {0}")]
    BlockNotFound(BlockId),

    /// Block is already linked into a chain
    #[error("Block already linked: {0}")]
    AlreadyLinked(BlockId),

    /// Block is not part of this track's chain
    #[error("Block not in track: {0}")]
    NotInTrack(BlockId),

    /// The two blocks are not directly linked
    #[error("Blocks not adjacent: {before} -> {after}")]
    NotAdjacent {
        /// Earlier block
        before: BlockId,
        /// Later block
        after: BlockId,
    },

    /// Linking would make the chain loop back on itself
    #[error("Linking {before} -> {after} would form a cycle")]
    Cycle {
        /// Earlier block
        before: BlockId,
        /// Later block
        after: BlockId,
    },

    /// The track's terminal block cannot be edited as content
    #[error("Track end cannot be edited: {0}")]
    TrackEnd(BlockId),

    /// The cached block order no longer matches the chain
    #[error("Block cache is stale at index {0}; refresh the track")]
    StaleCache(usize),

    /// No block starts at the requested placement time
    #[error("No insertion point at {0}")]
    NoInsertionPoint(Rational),

    /// Splice point lies outside the outer block
    #[error("Splice point {time} outside block {block}")]
    SpliceOutOfRange {
        /// Outer block
        block: BlockId,
        /// Requested splice point
        time: Rational,
    },

    /// Inner block does not fit in the rest of the outer block
    #[error("Block {inner} is too long to splice into {outer}")]
    SpliceOverflow {
        /// Inner block
        inner: BlockId,
        /// Outer block
        outer: BlockId,
    },

    /// A block's link is not matched by its neighbour's opposite link
    #[error("Block {block} links to {neighbour}, which does not link back")]
    BrokenLink {
        /// Block holding the link
        block: BlockId,
        /// Block it points at
        neighbour: BlockId,
    },

    /// A block time no longer fits in a `Rational`
    #[error("Time arithmetic overflowed at block {0}")]
    TimeOverflow(BlockId),

    /// Walking the chain ran off its end; blocks are not contiguous
    #[error("Chain is not contiguous around {time}")]
    ChainBroken {
        /// Time being resolved
        time: Rational,
    },

    /// Track not found in the sequence
    #[error("Track not found: {0:?}")]
    TrackNotFound(crate::track::TrackId),

    /// Track ports cannot be connected
    #[error("Cannot link track {0:?} to itself")]
    TrackSelfLink(crate::track::TrackId),
}
