// SPDX-License-Identifier: MIT OR Apache-2.0
//! Change notifications emitted when a track's block order is rebuilt.

use crate::block::BlockId;
use crate::track::TrackId;
use serde::{Deserialize, Serialize};

/// A block entered or left a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackEvent {
    /// Block is now part of the track
    BlockAdded {
        /// Track that changed
        track: TrackId,
        /// Block that appeared
        block: BlockId,
    },
    /// Block is no longer part of the track
    BlockRemoved {
        /// Track that changed
        track: TrackId,
        /// Block that disappeared
        block: BlockId,
    },
}

impl TrackEvent {
    /// Block this event is about
    pub fn block(&self) -> BlockId {
        match self {
            Self::BlockAdded { block, .. } | Self::BlockRemoved { block, .. } => *block,
        }
    }

    /// Track this event is about
    pub fn track(&self) -> TrackId {
        match self {
            Self::BlockAdded { track, .. } | Self::BlockRemoved { track, .. } => *track,
        }
    }

    /// Whether this is an addition
    pub fn is_added(&self) -> bool {
        matches!(self, Self::BlockAdded { .. })
    }
}

/// Receiver of track change notifications, e.g. a timeline widget
pub trait TrackObserver {
    /// Called once per event, in emission order
    fn on_track_event(&mut self, event: &TrackEvent);
}

impl<F: FnMut(&TrackEvent)> TrackObserver for F {
    fn on_track_event(&mut self, event: &TrackEvent) {
        self(event);
    }
}

/// Deliver events to an observer
pub fn dispatch(events: &[TrackEvent], observer: &mut impl TrackObserver) {
    for event in events {
        observer.on_track_event(event);
    }
}
