// SPDX-License-Identifier: MIT OR Apache-2.0
//! Demo sequence exercising the editing operations.

use cutline_sequencer::{
    dispatch, Block, ClipSource, Rational, Result, Sequence, SequencerSettings, TrackEvent,
};

/// Build a two-track sequence through a series of edits
pub fn build_demo(settings: &SequencerSettings) -> Result<Sequence> {
    let (sequence, events) = edit_demo(settings)?;
    dispatch(&events, &mut |event: &TrackEvent| {
        tracing::debug!(track = ?event.track(), block = %event.block(), added = event.is_added(), "track changed");
    });
    Ok(sequence)
}

/// Run the demo edits, returning the sequence and every refresh event
fn edit_demo(settings: &SequencerSettings) -> Result<(Sequence, Vec<TrackEvent>)> {
    let mut sequence = Sequence::with_settings("Demo", settings);
    let video = sequence.add_track("V1");
    let music = sequence.add_track("A1");

    let interview = sequence.add_block(Block::clip(
        "Interview",
        ClipSource::new("media/interview.mov"),
        Rational::from_integer(8),
    ));
    let broll = sequence.add_block(Block::clip(
        "B-Roll",
        ClipSource::new("media/broll.mov").with_media_in(Rational::from_integer(12)),
        Rational::from_integer(4),
    ));
    let logo = sequence.add_block(Block::clip(
        "Logo",
        ClipSource::new("media/logo.png"),
        Rational::new(3, 2),
    ));
    let score = sequence.add_block(Block::clip(
        "Score",
        ClipSource::new("media/score.wav"),
        Rational::from_integer(6),
    ));

    let mut events = Vec::new();
    {
        let (track, graph) = sequence.edit(video)?;
        track.append_block(graph, interview)?;
        track.append_block(graph, broll)?;
        events.extend(track.refresh(graph)?);

        track.split_block(graph, interview, Rational::from_integer(3))?;
        track.splice_block(graph, logo, broll, Rational::from_integer(9))?;
    }
    {
        let (track, graph) = sequence.edit(music)?;
        track.place_block(graph, score, Rational::from_integer(2))?;
    }
    sequence.link_tracks(video, Some(music))?;

    events.extend(sequence.refresh_all()?);
    Ok((sequence, events))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_reports_every_block() {
        let (mut sequence, events) = edit_demo(&SequencerSettings::default()).unwrap();

        let mut reported = Vec::new();
        dispatch(&events, &mut |event: &TrackEvent| {
            assert!(event.is_added());
            reported.push(event.block());
        });

        // Interview and B-Roll come from the refresh before the cuts
        let mut on_tracks: Vec<_> = sequence.tracks().flat_map(|t| t.blocks().to_vec()).collect();
        on_tracks.sort();
        reported.sort();
        assert_eq!(reported, on_tracks);
        assert!(sequence.refresh_all().unwrap().is_empty());
    }

    #[test]
    fn test_demo_layout() {
        let sequence = build_demo(&SequencerSettings::default()).unwrap();
        let tracks: Vec<_> = sequence.tracks().collect();

        // Interview split in two, B-Roll cut around the logo
        assert_eq!(tracks[0].blocks().len(), 5);
        // Gap in front of the score
        assert_eq!(tracks[1].blocks().len(), 2);
        assert_eq!(sequence.duration(), Rational::from_integer(12));
        assert_eq!(tracks[0].next_track(), Some(tracks[1].id));
    }
}
