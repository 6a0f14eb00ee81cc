// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tracks: ordered, gapless chains of blocks.
//!
//! A track is represented in the graph by its terminal [`BlockKind::End`]
//! block. Content is linked in front of that block, so walking `previous`
//! from the end visits every block latest-first, and the end block's in point
//! is the length of all content on the track.
//!
//! Editing operations relink the chain right away but leave the cached block
//! order alone. Call [`Track::refresh`] after a batch of edits to rebuild the
//! cache and collect the resulting [`TrackEvent`]s.
//!
//! [`BlockKind::End`]: crate::block::BlockKind::End

use crate::block::{Block, BlockId, Texture};
use crate::chain::{self, BlockGraph};
use crate::error::{Result, SequencerError};
use crate::event::TrackEvent;
use crate::time::Rational;
use cutline_graph::{GraphNode, Port, PortType};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Unique identifier for a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(pub Uuid);

impl TrackId {
    /// Create a new random track ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of evaluating a track at one time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackFrame {
    /// Track that was evaluated
    pub track: TrackId,
    /// Block that was active, or the track end past the last block
    pub block: BlockId,
    /// Rendered output
    pub texture: Texture,
}

/// Outcome of [`Track::place_block`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Block already started at the requested time
    Unchanged,
    /// Block became the first block
    Prepended,
    /// Block was added after all content, behind a new gap if needed
    Appended {
        /// Gap inserted to reach the requested time
        gap: Option<BlockId>,
    },
    /// Block was inserted in front of the block starting at the requested time
    Inserted,
}

/// A track in the sequencer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// Unique track ID
    pub id: TrackId,
    /// Track name
    pub name: String,
    /// Whether the track is muted
    pub muted: bool,
    /// Terminal block representing this track in the graph
    end: BlockId,
    /// Connection point for the last block
    block_input: Port,
    /// Connection point for a following track
    track_input: Port,
    /// Connection point identifying this track
    track_output: Port,
    next_track: Option<TrackId>,
    /// Blocks in time order as of the last refresh
    block_cache: Vec<BlockId>,
    current_block: BlockId,
}

impl Track {
    /// Create a new empty track, registering its end block with the graph
    pub fn new(graph: &mut BlockGraph, name: impl Into<String>) -> Self {
        let name = name.into();
        let end = graph.add_node(Block::end(name.clone()));
        Self {
            id: TrackId::new(),
            name,
            muted: false,
            end,
            block_input: Port::input("block_in", PortType::Block),
            track_input: Port::input("track_in", PortType::Track),
            track_output: Port::output("track_out", PortType::Track),
            next_track: None,
            block_cache: Vec::new(),
            current_block: end,
        }
    }

    /// Terminal block of this track
    pub fn end_block(&self) -> BlockId {
        self.end
    }

    /// Total length of the content, i.e. the end block's in point
    pub fn in_point(&self, graph: &BlockGraph) -> Result<Rational> {
        Ok(chain::block(graph, self.end)?.in_point())
    }

    /// Block linked directly in front of the end block
    pub fn attached_block(&self, graph: &BlockGraph) -> Option<BlockId> {
        graph.node(self.end).and_then(Block::previous)
    }

    /// Track connected to this track's input
    pub fn next_track(&self) -> Option<TrackId> {
        self.next_track
    }

    pub(crate) fn set_next_track(&mut self, track: Option<TrackId>) {
        self.next_track = track;
    }

    /// Value this track publishes on its output
    pub fn track_output(&self) -> TrackId {
        self.id
    }

    /// Input port accepting the last block
    pub fn block_input_port(&self) -> &Port {
        &self.block_input
    }

    /// Input port accepting a following track
    pub fn track_input_port(&self) -> &Port {
        &self.track_input
    }

    /// Output port identifying this track
    pub fn track_output_port(&self) -> &Port {
        &self.track_output
    }

    /// Blocks in time order as of the last refresh
    pub fn blocks(&self) -> &[BlockId] {
        &self.block_cache
    }

    /// Block resolved by the most recent [`process`](Self::process)
    pub fn current_block(&self) -> BlockId {
        self.current_block
    }

    /// Rebuild the cached block order from the chain.
    ///
    /// Returns one `BlockAdded` per block that was not cached before and one
    /// `BlockRemoved` per cached block that is no longer linked. A chain that
    /// loops back on itself is an error and leaves the cache untouched.
    pub fn refresh(&mut self, graph: &BlockGraph) -> Result<Vec<TrackEvent>> {
        let mut detected = Vec::with_capacity(self.block_cache.len());
        let mut seen = HashSet::with_capacity(self.block_cache.len());
        let mut previous = self.attached_block(graph);
        while let Some(id) = previous {
            if !seen.insert(id) {
                let after = detected.last().copied().unwrap_or(self.end);
                tracing::error!(track = ?self.id, block = %id, "block chain loops back on itself");
                return Err(SequencerError::Cycle { before: id, after });
            }
            detected.push(id);
            previous = chain::block(graph, id)?.previous();
        }
        detected.reverse();

        let old: HashSet<BlockId> = self.block_cache.iter().copied().collect();
        let new = seen;

        let mut events = Vec::new();
        for &block in detected.iter().filter(|b| !old.contains(*b)) {
            tracing::trace!(track = ?self.id, %block, "block added");
            events.push(TrackEvent::BlockAdded { track: self.id, block });
        }
        for &block in self.block_cache.iter().filter(|b| !new.contains(*b)) {
            tracing::trace!(track = ?self.id, %block, "block removed");
            events.push(TrackEvent::BlockRemoved { track: self.id, block });
        }

        if self.current_block != self.end && !new.contains(&self.current_block) {
            self.current_block = self.end;
        }
        self.block_cache = detected;
        Ok(events)
    }

    /// Replay `BlockAdded` for every cached block, for observers that need
    /// to catch up without the chain changing.
    pub fn generate_block_events(&self) -> Vec<TrackEvent> {
        self.block_cache
            .iter()
            .map(|&block| TrackEvent::BlockAdded { track: self.id, block })
            .collect()
    }

    /// Resolve the block active at `time` and render it.
    ///
    /// At or past the end of all content the result is empty and the end
    /// block becomes current. Running off the chain means the blocks are not
    /// contiguous, which is reported as [`SequencerError::ChainBroken`].
    pub fn process(&mut self, graph: &BlockGraph, time: Rational) -> Result<TrackFrame> {
        if time >= self.in_point(graph)? {
            self.current_block = self.end;
            return Ok(TrackFrame {
                track: self.id,
                block: self.end,
                texture: Texture::Empty,
            });
        }

        let broken = || {
            tracing::error!(track = ?self.id, %time, "ran off the block chain");
            SequencerError::ChainBroken { time }
        };

        let mut current = self.attached_block(graph).ok_or_else(broken)?;
        let mut block = chain::block(graph, current)?;
        // A walk longer than the graph can only be going round a loop
        let mut steps = graph.node_count();

        while time < block.in_point() {
            current = block.previous().filter(|_| steps > 0).ok_or_else(broken)?;
            block = chain::block(graph, current)?;
            steps -= 1;
        }

        while time >= block.out_point() {
            current = block.next().filter(|_| steps > 0).ok_or_else(broken)?;
            block = chain::block(graph, current)?;
            steps -= 1;
        }

        let texture = block.render(time)?;
        self.current_block = current;
        Ok(TrackFrame {
            track: self.id,
            block: current,
            texture,
        })
    }

    /// Link `block` as the earliest block
    pub fn prepend_block(&mut self, graph: &mut BlockGraph, block: BlockId) -> Result<()> {
        self.add_block_to_graph(graph, block)?;
        ensure_unlinked(graph, block)?;

        match self.attached_block(graph) {
            None => self.connect_block_internal(graph, block)?,
            Some(attached) => {
                let head = chain::head_of(graph, attached)?;
                chain::connect_blocks(graph, block, head)?;
            }
        }
        tracing::debug!(track = ?self.id, %block, "prepended block");
        Ok(())
    }

    /// Link `block` as the latest block, just before the track end
    pub fn append_block(&mut self, graph: &mut BlockGraph, block: BlockId) -> Result<()> {
        self.add_block_to_graph(graph, block)?;
        ensure_unlinked(graph, block)?;

        match self.attached_block(graph) {
            None => self.connect_block_internal(graph, block)?,
            Some(attached) => self.insert_block_between_blocks(graph, block, attached, self.end)?,
        }
        tracing::debug!(track = ?self.id, %block, "appended block");
        Ok(())
    }

    /// Insert `block` so it becomes the block at cache position `index`.
    ///
    /// Indices at or past the end append.
    pub fn insert_block_at_index(
        &mut self,
        graph: &mut BlockGraph,
        block: BlockId,
        index: usize,
    ) -> Result<()> {
        self.add_block_to_graph(graph, block)?;
        ensure_unlinked(graph, block)?;

        if self.attached_block(graph).is_none() {
            // Nothing connected, so the index doesn't matter
            self.connect_block_internal(graph, block)
        } else if index == 0 {
            self.prepend_block(graph, block)
        } else if index >= self.block_cache.len() {
            self.append_block(graph, block)
        } else {
            let before = self.block_cache[index - 1];
            let after = self.block_cache[index];
            if chain::block(graph, before)?.next() != Some(after) {
                tracing::error!(track = ?self.id, index, "block cache out of date");
                return Err(SequencerError::StaleCache(index));
            }
            self.insert_block_between_blocks(graph, block, before, after)
        }
    }

    /// Insert `block` between two linked blocks
    pub fn insert_block_between_blocks(
        &mut self,
        graph: &mut BlockGraph,
        block: BlockId,
        before: BlockId,
        after: BlockId,
    ) -> Result<()> {
        self.add_block_to_graph(graph, block)?;
        ensure_unlinked(graph, block)?;

        chain::disconnect_blocks(graph, before, after)?;
        chain::connect_blocks(graph, before, block)?;
        chain::connect_blocks(graph, block, after)?;
        tracing::debug!(track = ?self.id, %block, %before, %after, "inserted block");
        Ok(())
    }

    /// Insert `block` directly after `before`
    pub fn insert_block_after(
        &mut self,
        graph: &mut BlockGraph,
        block: BlockId,
        before: BlockId,
    ) -> Result<()> {
        let after = chain::block(graph, before)?
            .next()
            .ok_or(SequencerError::NotInTrack(before))?;
        self.insert_block_between_blocks(graph, block, before, after)
    }

    /// Unlink `block` and fill its place with a gap of the same length.
    ///
    /// Returns the gap. The removed block stays in the graph.
    pub fn remove_block(&mut self, graph: &mut BlockGraph, block: BlockId) -> Result<BlockId> {
        self.ensure_in_track(graph, block)?;

        let removed = chain::block(graph, block)?;
        let previous = removed.previous();
        let next = removed.next();
        let length = removed.length();
        let gap = graph.add_node(Block::gap(length));

        self.ripple_remove_block(graph, block)?;

        match (previous, next) {
            (None, _) => self.prepend_block(graph, gap)?,
            (Some(previous), Some(next)) => self.insert_block_between_blocks(graph, gap, previous, next)?,
            (Some(_), None) => return Err(SequencerError::NotInTrack(block)),
        }
        tracing::debug!(track = ?self.id, %block, %gap, "replaced block with gap");
        Ok(gap)
    }

    /// Unlink `block` and close the hole, pulling later blocks earlier
    pub fn ripple_remove_block(&mut self, graph: &mut BlockGraph, block: BlockId) -> Result<()> {
        self.ensure_in_track(graph, block)?;

        let removed = chain::block(graph, block)?;
        let previous = removed.previous();
        let next = removed.next();

        if let Some(previous) = previous {
            chain::disconnect_blocks(graph, previous, block)?;
        }
        if let Some(next) = next {
            chain::disconnect_blocks(graph, block, next)?;
        }
        if let (Some(previous), Some(next)) = (previous, next) {
            chain::connect_blocks(graph, previous, next)?;
        }
        tracing::debug!(track = ?self.id, %block, "ripple removed block");
        Ok(())
    }

    /// Cut `block` in two at `time`.
    ///
    /// `block` keeps `[in, time)` and a copy holding `[time, out)` is linked
    /// after it. Times outside the open range `(in, out)` leave the track
    /// untouched and return `None`.
    pub fn split_block(
        &mut self,
        graph: &mut BlockGraph,
        block: BlockId,
        time: Rational,
    ) -> Result<Option<BlockId>> {
        self.ensure_in_track(graph, block)?;

        let original = chain::block(graph, block)?;
        if time <= original.in_point() || time >= original.out_point() {
            tracing::debug!(%block, %time, "split point outside block, nothing to do");
            return Ok(None);
        }

        let overflow = || SequencerError::TimeOverflow(block);
        let head_length = time.checked_sub(original.in_point()).ok_or_else(overflow)?;
        let tail_length = original.length().checked_sub(head_length).ok_or_else(overflow)?;
        let tail = original.copy_from(head_length, tail_length)?;

        chain::set_block_length(graph, block, head_length)?;
        let tail = graph.add_node(tail);
        self.insert_block_after(graph, tail, block)?;
        Ok(Some(tail))
    }

    /// Embed `inner` inside `outer`, starting at `inner_in`.
    ///
    /// `outer` is cut back to end at `inner_in`, `inner` follows it, and a
    /// copy of `outer` fills the rest of its original span. Returns that copy.
    pub fn splice_block(
        &mut self,
        graph: &mut BlockGraph,
        inner: BlockId,
        outer: BlockId,
        inner_in: Rational,
    ) -> Result<BlockId> {
        self.add_block_to_graph(graph, inner)?;
        ensure_unlinked(graph, inner)?;
        self.ensure_in_track(graph, outer)?;

        let original = chain::block(graph, outer)?;
        if inner_in < original.in_point() || inner_in >= original.out_point() {
            return Err(SequencerError::SpliceOutOfRange { block: outer, time: inner_in });
        }

        let overflow = || SequencerError::TimeOverflow(outer);
        let head_length = inner_in.checked_sub(original.in_point()).ok_or_else(overflow)?;
        let inner_length = chain::block(graph, inner)?.length();
        let covered = head_length.checked_add(inner_length).ok_or_else(overflow)?;
        let tail_length = original.length().checked_sub(covered).ok_or_else(overflow)?;
        if tail_length.is_negative() {
            return Err(SequencerError::SpliceOverflow { inner, outer });
        }
        let tail = original.copy_from(covered, tail_length)?;

        chain::set_block_length(graph, outer, head_length)?;
        self.insert_block_after(graph, inner, outer)?;
        let tail = graph.add_node(tail);
        self.insert_block_after(graph, tail, inner)?;
        tracing::debug!(track = ?self.id, %inner, %outer, %inner_in, "spliced block");
        Ok(tail)
    }

    /// Put `block` on the track starting at `start`.
    ///
    /// Past the end of the track a gap is added to reach `start`. Inside the
    /// track a block must already start exactly at `start`; otherwise
    /// [`SequencerError::NoInsertionPoint`] is returned and nothing changes.
    /// A block that is already linked can only be "placed" where it already
    /// is.
    pub fn place_block(
        &mut self,
        graph: &mut BlockGraph,
        block: BlockId,
        start: Rational,
    ) -> Result<Placement> {
        self.add_block_to_graph(graph, block)?;

        if chain::block(graph, block)?.is_connected() {
            self.ensure_in_track(graph, block)?;
            if chain::block(graph, block)?.in_point() == start {
                return Ok(Placement::Unchanged);
            }
            return Err(SequencerError::AlreadyLinked(block));
        }

        if start.is_zero() {
            self.prepend_block(graph, block)?;
            return Ok(Placement::Prepended);
        }

        let track_in = self.in_point(graph)?;
        if start >= track_in {
            let gap = if start > track_in {
                let length = start
                    .checked_sub(track_in)
                    .ok_or(SequencerError::TimeOverflow(self.end))?;
                let gap = graph.add_node(Block::gap(length));
                self.append_block(graph, gap)?;
                Some(gap)
            } else {
                None
            };
            self.append_block(graph, block)?;
            return Ok(Placement::Appended { gap });
        }

        let mut insertion = None;
        for pair in self.block_cache.windows(2) {
            if chain::block(graph, pair[1])?.in_point() == start {
                insertion = Some((pair[0], pair[1]));
                break;
            }
        }

        if let Some((previous, comparison)) = insertion {
            // Cheaper than insert_block_at_index since both neighbours are known
            self.insert_block_between_blocks(graph, block, previous, comparison)?;
            return Ok(Placement::Inserted);
        }

        tracing::warn!(track = ?self.id, %block, %start, "no block starts at placement time");
        Err(SequencerError::NoInsertionPoint(start))
    }

    /// Check `block` is registered with the graph and is not the track end
    fn add_block_to_graph(&self, graph: &BlockGraph, block: BlockId) -> Result<()> {
        if !graph.contains(block) {
            return Err(SequencerError::BlockNotFound(block));
        }
        if block == self.end {
            return Err(SequencerError::TrackEnd(block));
        }
        Ok(())
    }

    fn connect_block_internal(&self, graph: &mut BlockGraph, block: BlockId) -> Result<()> {
        chain::connect_blocks(graph, block, self.end)
    }

    /// Check `block` is content linked into this track
    fn ensure_in_track(&self, graph: &BlockGraph, block: BlockId) -> Result<()> {
        self.add_block_to_graph(graph, block)?;
        if chain::tail_of(graph, block)? != self.end {
            return Err(SequencerError::NotInTrack(block));
        }
        Ok(())
    }
}

fn ensure_unlinked(graph: &BlockGraph, block: BlockId) -> Result<()> {
    if chain::block(graph, block)?.is_connected() {
        return Err(SequencerError::AlreadyLinked(block));
    }
    Ok(())
}
