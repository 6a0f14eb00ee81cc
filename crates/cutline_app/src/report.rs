// SPDX-License-Identifier: MIT OR Apache-2.0
//! Plain-text layout of sequences and evaluated frames.

use cutline_sequencer::{
    BlockId, BlockKind, Rational, Result, Sequence, SequencerError, Texture, TrackFrame,
};
use std::fmt::Write;

/// One line per block, grouped by track
pub fn describe_sequence(sequence: &Sequence) -> Result<String> {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} ({} tracks, {}s @ {} fps)",
        sequence.name,
        sequence.track_count(),
        sequence.duration(),
        sequence.frame_rate
    );

    for track in sequence.tracks() {
        let length = track.in_point(sequence.graph())?;
        let mut flags = String::new();
        if track.muted {
            flags.push_str(" muted");
        }
        if let Some(next) = track.next_track().and_then(|id| sequence.track(id)) {
            let _ = write!(flags, " -> {}", next.name);
        }
        let _ = writeln!(out, "  {} [{}s]{}", track.name, length, flags);

        for &id in track.blocks() {
            let block = sequence
                .graph()
                .node(id)
                .ok_or(SequencerError::BlockNotFound(id))?;
            let detail = match &block.kind {
                BlockKind::Clip(source) => format!("{} +{}", source.path, source.media_in),
                BlockKind::Gap | BlockKind::End => String::new(),
            };
            let _ = writeln!(
                out,
                "    {:>8} .. {:<8} {:<5} {:<12} {}",
                block.in_point().to_string(),
                block.out_point().to_string(),
                block.kind.name(),
                block.name,
                detail
            );
        }
    }
    Ok(out)
}

/// Active block and texture on every unmuted track at `time`
pub fn describe_frames(sequence: &mut Sequence, time: Rational) -> Result<String> {
    let frames = sequence.process_all(time)?;
    let mut out = String::new();
    let _ = writeln!(out, "@ {time}s");
    for frame in &frames {
        let track = sequence.track(frame.track).map_or("?", |t| t.name.as_str());
        let _ = writeln!(out, "  {track}: {}", describe_frame(sequence, frame));
    }
    Ok(out)
}

/// Compact single-line form used while playing
pub fn describe_track_frames(sequence: &Sequence, frames: &[TrackFrame]) -> String {
    frames
        .iter()
        .map(|frame| describe_frame(sequence, frame))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn describe_frame(sequence: &Sequence, frame: &TrackFrame) -> String {
    let name = block_name(sequence, frame.block);
    match &frame.texture {
        Texture::Empty => format!("{name} (empty)"),
        Texture::Frame { source, media_time } => format!("{name} {source}@{media_time}"),
    }
}

fn block_name(sequence: &Sequence, id: BlockId) -> &str {
    sequence.graph().node(id).map_or("?", |block| block.name.as_str())
}
