// SPDX-License-Identifier: MIT OR Apache-2.0
//! Track sequencer for Cutline.
//!
//! This crate models the tracks of a non-linear editing timeline:
//! - Exact rational timestamps
//! - Clip, gap and track-end blocks owned by a node graph
//! - Gapless block chains with live in/out points
//! - Structural edits (insert, remove, ripple, split, splice, place)
//! - Time resolution for playback and rendering
//!
//! ## Architecture
//!
//! Blocks live in a [`BlockGraph`] and point at their neighbours by id. A
//! [`Track`] owns nothing but a handle to its end block and a cached view of
//! the chain in front of it, rebuilt by [`Track::refresh`], which reports
//! what changed as [`TrackEvent`]s.

pub mod time;
pub mod block;
pub mod chain;
pub mod error;
pub mod event;
pub mod track;
pub mod sequence;
pub mod settings;

pub use time::{Rational, ParseRationalError, RationalError};
pub use block::{Block, BlockId, BlockKind, ClipSource, Texture};
pub use chain::{BlockGraph, connect_blocks, disconnect_blocks, set_block_length};
pub use error::{Result, SequencerError};
pub use event::{TrackEvent, TrackObserver, dispatch};
pub use track::{Track, TrackId, TrackFrame, Placement};
pub use sequence::{Sequence, SequenceId, PlaybackState, PlaybackController};
pub use settings::{SequencerSettings, PersistError, SETTINGS_FILE};
