// SPDX-License-Identifier: MIT OR Apache-2.0
//! Block definitions for tracks.
//!
//! A block is a time-bounded unit of track content. Blocks are owned by the
//! graph; their `previous`/`next` links are plain ids and never own the
//! neighbour they point at.

use crate::error::{Result, SequencerError};
use crate::time::Rational;
use cutline_graph::{GraphNode, NodeId};
use serde::{Deserialize, Serialize};

/// Identifier of a block inside the owning graph
pub type BlockId = NodeId;

/// Media referenced by a clip block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipSource {
    /// Asset path of the media
    pub path: String,
    /// Offset into the media at which this clip starts
    pub media_in: Rational,
}

impl ClipSource {
    /// Create a source starting at the beginning of the media
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            media_in: Rational::ZERO,
        }
    }

    /// Start playback at a later point in the media
    pub fn with_media_in(mut self, media_in: Rational) -> Self {
        self.media_in = media_in;
        self
    }
}

/// Kind of block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    /// Terminal marker of a track
    End,
    /// Explicit empty space
    Gap,
    /// Media clip
    Clip(ClipSource),
}

impl BlockKind {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::End => "Track",
            Self::Gap => "Gap",
            Self::Clip(_) => "Clip",
        }
    }

    /// Graph type identifier
    pub fn type_id(&self) -> &'static str {
        match self {
            Self::End => "org.cutline.track",
            Self::Gap => "org.cutline.gap",
            Self::Clip(_) => "org.cutline.clip",
        }
    }

    /// Skip `offset` worth of content, used for the later half of a split
    fn advance(&mut self, offset: Rational) -> Option<()> {
        if let Self::Clip(source) = self {
            source.media_in = source.media_in.checked_add(offset)?;
        }
        Some(())
    }
}

/// Rendered output of a block at one point in time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Texture {
    /// Nothing to show
    Empty,
    /// A frame of media
    Frame {
        /// Asset path of the media
        source: String,
        /// Time within the media
        media_time: Rational,
    },
}

impl Texture {
    /// Whether there is nothing to show
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// A block of track content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    /// Unique block ID
    pub id: BlockId,
    /// Block name
    pub name: String,
    /// Block kind and content
    pub kind: BlockKind,
    length: Rational,
    in_point: Rational,
    out_point: Rational,
    pub(crate) previous: Option<BlockId>,
    pub(crate) next: Option<BlockId>,
}

impl Block {
    /// Create a new unlinked block
    pub fn new(name: impl Into<String>, kind: BlockKind, length: Rational) -> Self {
        let length = match kind {
            BlockKind::End => Rational::ZERO,
            _ => length,
        };
        Self {
            id: BlockId::new(),
            name: name.into(),
            kind,
            length,
            in_point: Rational::ZERO,
            out_point: length,
            previous: None,
            next: None,
        }
    }

    /// Create a clip block
    pub fn clip(name: impl Into<String>, source: ClipSource, length: Rational) -> Self {
        Self::new(name, BlockKind::Clip(source), length)
    }

    /// Create a gap block
    pub fn gap(length: Rational) -> Self {
        Self::new(BlockKind::Gap.name(), BlockKind::Gap, length)
    }

    /// Create the terminal block of a track
    pub fn end(name: impl Into<String>) -> Self {
        Self::new(name, BlockKind::End, Rational::ZERO)
    }

    /// Duplicate this block with a fresh identity and the given length.
    ///
    /// The copy is unlinked; its times are those of a lone block.
    pub fn copy(&self, length: Rational) -> Self {
        Self::new(self.name.clone(), self.kind.clone(), length)
    }

    /// Duplicate this block for the content starting `offset` into it
    pub(crate) fn copy_from(&self, offset: Rational, length: Rational) -> Result<Self> {
        let mut copy = self.copy(length);
        copy.kind
            .advance(offset)
            .ok_or(SequencerError::TimeOverflow(self.id))?;
        Ok(copy)
    }

    /// Whether this is a track's terminal block
    pub fn is_end(&self) -> bool {
        matches!(self.kind, BlockKind::End)
    }

    /// Time at which this block starts
    pub fn in_point(&self) -> Rational {
        self.in_point
    }

    /// Time at which this block ends
    pub fn out_point(&self) -> Rational {
        self.out_point
    }

    /// Duration of this block
    pub fn length(&self) -> Rational {
        self.length
    }

    /// Earlier neighbour
    pub fn previous(&self) -> Option<BlockId> {
        self.previous
    }

    /// Later neighbour
    pub fn next(&self) -> Option<BlockId> {
        self.next
    }

    /// Whether `time` falls inside `[in, out)`
    pub fn contains(&self, time: Rational) -> bool {
        self.in_point <= time && time < self.out_point
    }

    /// Change the duration; terminal blocks keep a zero length.
    ///
    /// Only this block's own out point moves. Use
    /// [`set_block_length`](crate::chain::set_block_length) to keep later
    /// blocks in a chain up to date.
    pub(crate) fn set_length(&mut self, length: Rational) -> Result<bool> {
        if self.is_end() {
            tracing::debug!(block = %self.id, "ignoring length change on track end");
            return Ok(false);
        }
        self.out_point = self.end_after(self.in_point, length)?;
        self.length = length;
        Ok(true)
    }

    pub(crate) fn set_in_point(&mut self, in_point: Rational) -> Result<()> {
        self.out_point = self.end_after(in_point, self.length)?;
        self.in_point = in_point;
        Ok(())
    }

    fn end_after(&self, start: Rational, length: Rational) -> Result<Rational> {
        start
            .checked_add(length)
            .ok_or(SequencerError::TimeOverflow(self.id))
    }

    /// Render this block's output at `time`
    pub fn render(&self, time: Rational) -> Result<Texture> {
        match &self.kind {
            BlockKind::End | BlockKind::Gap => Ok(Texture::Empty),
            BlockKind::Clip(source) => {
                let media_time = time
                    .checked_sub(self.in_point)
                    .and_then(|offset| source.media_in.checked_add(offset))
                    .ok_or(SequencerError::TimeOverflow(self.id))?;
                Ok(Texture::Frame {
                    source: source.path.clone(),
                    media_time,
                })
            }
        }
    }
}

impl GraphNode for Block {
    fn id(&self) -> NodeId {
        self.id
    }

    fn type_id(&self) -> &'static str {
        self.kind.type_id()
    }

    fn is_connected(&self) -> bool {
        self.previous.is_some() || self.next.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(value: i64) -> Rational {
        Rational::from_integer(value)
    }

    #[test]
    fn test_new_block_times() {
        let block = Block::clip("shot", ClipSource::new("a.mov"), secs(4));
        assert_eq!(block.in_point(), secs(0));
        assert_eq!(block.out_point(), secs(4));
        assert!(block.contains(secs(0)));
        assert!(!block.contains(secs(4)));
        assert!(!block.is_connected());
    }

    #[test]
    fn test_end_block_length_is_fixed() {
        let mut end = Block::end("V1");
        assert_eq!(end.length(), secs(0));
        assert!(!end.set_length(secs(3)).unwrap());
        assert_eq!(end.length(), secs(0));
        assert_eq!(Block::new("x", BlockKind::End, secs(9)).length(), secs(0));
    }

    #[test]
    fn test_copy_has_new_identity() {
        let block = Block::clip("shot", ClipSource::new("a.mov"), secs(4));
        let copy = block.copy(secs(2));
        assert_ne!(copy.id, block.id);
        assert_eq!(copy.kind, block.kind);
        assert_eq!(copy.name, block.name);
        assert_eq!(copy.length(), secs(2));
    }

    #[test]
    fn test_copy_from_advances_media() {
        let block = Block::clip("shot", ClipSource::new("a.mov").with_media_in(secs(10)), secs(4));
        let tail = block.copy_from(secs(3), secs(1)).unwrap();
        assert_eq!(
            tail.kind,
            BlockKind::Clip(ClipSource::new("a.mov").with_media_in(secs(13)))
        );

        // Gaps have no content to advance
        assert_eq!(Block::gap(secs(2)).copy_from(secs(1), secs(1)).unwrap().kind, BlockKind::Gap);
    }

    #[test]
    fn test_render() {
        let mut block = Block::clip("shot", ClipSource::new("a.mov").with_media_in(secs(1)), secs(4));
        block.set_in_point(secs(10)).unwrap();
        assert_eq!(
            block.render(secs(12)).unwrap(),
            Texture::Frame {
                source: "a.mov".to_string(),
                media_time: secs(3),
            }
        );
        assert!(Block::gap(secs(1)).render(secs(0)).unwrap().is_empty());
    }

    #[test]
    fn test_overflowing_times_are_errors() {
        let mut block = Block::clip("shot", ClipSource::new("a.mov"), secs(4));
        assert_eq!(
            block.set_in_point(secs(i64::MAX)).unwrap_err(),
            SequencerError::TimeOverflow(block.id)
        );
        // A failed update leaves the block as it was
        assert_eq!(block.in_point(), secs(0));
        assert_eq!(block.out_point(), secs(4));

        let late = Block::clip("late", ClipSource::new("a.mov").with_media_in(secs(i64::MAX)), secs(4));
        assert!(late.render(secs(1)).is_err());
        assert!(late.copy_from(secs(1), secs(3)).is_err());
    }
}
