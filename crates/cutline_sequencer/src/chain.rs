// SPDX-License-Identifier: MIT OR Apache-2.0
//! Linking primitives for block chains.
//!
//! Every change to a link or a length goes through this module so that the
//! in/out points of all later blocks are recomputed immediately. A block with
//! no `previous` starts at zero.

use crate::block::{Block, BlockId};
use crate::error::{Result, SequencerError};
use crate::time::Rational;
use cutline_graph::Graph;
use std::collections::HashSet;

/// The graph that owns timeline blocks
pub type BlockGraph = Graph<Block>;

/// Look up a registered block
pub fn block(graph: &BlockGraph, id: BlockId) -> Result<&Block> {
    graph.node(id).ok_or(SequencerError::BlockNotFound(id))
}

fn block_mut(graph: &mut BlockGraph, id: BlockId) -> Result<&mut Block> {
    graph.node_mut(id).ok_or(SequencerError::BlockNotFound(id))
}

/// Link `before` directly in front of `after`.
///
/// Both ends must be free and the link may not close a loop.
pub fn connect_blocks(graph: &mut BlockGraph, before: BlockId, after: BlockId) -> Result<()> {
    if before == after {
        return Err(SequencerError::Cycle { before, after });
    }
    if block(graph, before)?.next.is_some() {
        return Err(SequencerError::AlreadyLinked(before));
    }
    if block(graph, after)?.previous.is_some() {
        return Err(SequencerError::AlreadyLinked(after));
    }

    // `after` heads its own chain, so a loop means `before` is downstream of it
    let mut cursor = block(graph, after)?.next;
    while let Some(id) = cursor {
        if id == before {
            return Err(SequencerError::Cycle { before, after });
        }
        cursor = block(graph, id)?.next;
    }

    block_mut(graph, before)?.next = Some(after);
    block_mut(graph, after)?.previous = Some(before);
    retime(graph, after)
}

/// Break the link between `before` and `after`
pub fn disconnect_blocks(graph: &mut BlockGraph, before: BlockId, after: BlockId) -> Result<()> {
    let linked = block(graph, before)?.next == Some(after)
        && block(graph, after)?.previous == Some(before);
    if !linked {
        return Err(SequencerError::NotAdjacent { before, after });
    }

    block_mut(graph, before)?.next = None;
    block_mut(graph, after)?.previous = None;
    retime(graph, after)
}

/// Change a block's length, shifting every later block.
///
/// Returns `false` when the block refuses the change (track ends).
pub fn set_block_length(graph: &mut BlockGraph, id: BlockId, length: Rational) -> Result<bool> {
    if !block_mut(graph, id)?.set_length(length)? {
        return Ok(false);
    }
    if let Some(next) = block(graph, id)?.next {
        retime(graph, next)?;
    }
    Ok(true)
}

/// First block of the chain containing `id`
pub fn head_of(graph: &BlockGraph, id: BlockId) -> Result<BlockId> {
    let mut current = id;
    while let Some(previous) = block(graph, current)?.previous {
        current = previous;
    }
    Ok(current)
}

/// Last block of the chain containing `id`
pub fn tail_of(graph: &BlockGraph, id: BlockId) -> Result<BlockId> {
    let mut current = id;
    while let Some(next) = block(graph, current)?.next {
        current = next;
    }
    Ok(current)
}

/// Check that every link is mirrored by its neighbour and that no chain loops,
/// then recompute the times of every chain from its head.
///
/// Links restored from a file bypass [`connect_blocks`], so they are checked
/// here before anything walks them.
pub fn validate_and_retime(graph: &mut BlockGraph) -> Result<()> {
    let ids: Vec<BlockId> = graph.node_ids().collect();
    for &id in &ids {
        let current = block(graph, id)?;
        if let Some(next) = current.next {
            if block(graph, next)?.previous != Some(id) {
                return Err(broken_link(id, next));
            }
        }
        if let Some(previous) = current.previous {
            if block(graph, previous)?.next != Some(id) {
                return Err(broken_link(id, previous));
            }
        }
    }

    // With mirrored links every chain is either a path from a head or a loop
    let mut visited = HashSet::with_capacity(ids.len());
    for &id in &ids {
        if block(graph, id)?.previous.is_some() {
            continue;
        }
        retime(graph, id)?;
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            visited.insert(current);
            cursor = block(graph, current)?.next;
        }
    }

    if let Some(&after) = ids.iter().find(|id| !visited.contains(*id)) {
        let before = block(graph, after)?.previous.unwrap_or(after);
        tracing::error!(%before, %after, "block chain loops back on itself");
        return Err(SequencerError::Cycle { before, after });
    }
    Ok(())
}

fn broken_link(block: BlockId, neighbour: BlockId) -> SequencerError {
    tracing::error!(%block, %neighbour, "one-sided block link");
    SequencerError::BrokenLink { block, neighbour }
}

/// Recompute in/out points from `start` to the end of its chain
fn retime(graph: &mut BlockGraph, start: BlockId) -> Result<()> {
    let mut time = match block(graph, start)?.previous {
        Some(previous) => block(graph, previous)?.out_point(),
        None => Rational::ZERO,
    };

    let mut cursor = Some(start);
    while let Some(id) = cursor {
        let current = block_mut(graph, id)?;
        current.set_in_point(time)?;
        time = current.out_point();
        cursor = current.next;
    }
    Ok(())
}
