//! MIDI track construction: one note/CC track per patch, channel-assigned in
//! declaration order (see DESIGN.md Open Question (c) — the C++ original
//! assigns channels by iterating an alphabetically-ordered `std::map`, which
//! we deliberately do not reproduce), plus the shared tempo map every
//! consumer needs to write the meta tempo track (spec.md §6).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ast::{Document, PatchDefinition};
use crate::expander::seq::PlayOccurrence;
use crate::expander::{evaluate_lane, AutomationLane};
use crate::timebase::TempoMap;

fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    v.max(lo).min(hi)
}

/// A single MIDI note event, in absolute samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidiNote {
    pub channel: u8,
    pub note: u8,
    pub velocity: u8,
    pub start_sample: u64,
    pub end_sample: u64,
}

/// A single MIDI CC value at an absolute sample position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidiCcPoint {
    pub channel: u8,
    pub cc: u8,
    pub sample: u64,
    pub value: u8,
}

/// One patch's MIDI data: its assigned channel, notes, and CC automation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidiTrackData {
    pub patch: String,
    pub channel: u8,
    pub notes: Vec<MidiNote>,
    pub cc_points: Vec<MidiCcPoint>,
}

/// Everything the (external) Standard MIDI File writer needs: one track per
/// patch plus the tempo-map points for the shared meta tempo track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MidiTable {
    pub tracks: Vec<MidiTrackData>,
    pub tempo_points: Vec<(f64, f64)>,
}

/// Maps a `{node_id}.{param}` automation key to a CC number, or `None` if the
/// parameter has no MIDI-CC equivalent.
fn param_to_cc(param: &str) -> Option<u8> {
    match param {
        "cutoff" => Some(74),
        "gain" => Some(7),
        _ => Some(1),
    }
}

/// Scales an automation value to the MIDI `[0, 127]` range for the given CC.
/// CC74 uses a log-scaled cutoff (20Hz-20kHz), CC7 a linear `[-60, 12]` dB
/// range, everything else a generic linear `[0, 1]` range.
fn param_value_to_cc(controller: u8, value: f64) -> u8 {
    let normalized = match controller {
        74 => {
            let hz = value.clamp(20.0, 20000.0);
            (hz / 20.0).log10() / (20000.0_f64 / 20.0).log10()
        }
        7 => (value.clamp(-60.0, 12.0) + 60.0) / 72.0,
        _ => value.clamp(0.0, 1.0),
    };
    (clamp(normalized, 0.0, 1.0) * 127.0).round() as u8
}

fn midi_to_note(midi: i32) -> u8 {
    midi.clamp(0, 127) as u8
}

/// Builds per-patch MIDI tracks from the expansion's plays/automation,
/// assigning channels `0..=15` by the patch's position in
/// `document.patches` (declaration order, wrapping at 16 patches).
pub fn build_midi_table(
    document: &Document,
    tempo_map: &TempoMap,
    plays: &[PlayOccurrence],
    automation: &BTreeMap<String, BTreeMap<String, AutomationLane>>,
    block_size: u32,
    total_samples: u64,
) -> MidiTable {
    let mut tracks: Vec<MidiTrackData> = document
        .patches
        .iter()
        .enumerate()
        .map(|(index, patch): (usize, &PatchDefinition)| MidiTrackData {
            patch: patch.name.clone(),
            channel: (index % 16) as u8,
            notes: Vec::new(),
            cc_points: Vec::new(),
        })
        .collect();

    let track_index: BTreeMap<&str, usize> = tracks
        .iter()
        .enumerate()
        .map(|(i, t)| (t.patch.as_str(), i))
        .collect();

    for play in plays {
        let Some(&idx) = track_index.get(play.patch.as_str()) else {
            continue;
        };
        let channel = tracks[idx].channel;
        let start_sample = play.start_sample.min(total_samples);
        let end_sample = (play.start_sample + play.dur_samples.max(1))
            .min(total_samples)
            .max(start_sample + 1);
        for pitch in &play.pitches {
            tracks[idx].notes.push(MidiNote {
                channel,
                note: midi_to_note(pitch.midi),
                velocity: (clamp(play.velocity, 0.0, 1.0) * 127.0).round() as u8,
                start_sample,
                end_sample,
            });
        }
    }

    for (patch_name, lanes) in automation {
        let Some(&idx) = track_index.get(patch_name.as_str()) else {
            continue;
        };
        let channel = tracks[idx].channel;
        for (key, lane) in lanes {
            let param = key.split('.').next_back().unwrap_or(key);
            let Some(cc) = param_to_cc(param) else {
                continue;
            };
            let step = u64::from(block_size).max(1);
            let mut sample = 0;
            while sample <= total_samples {
                let value = evaluate_lane(lane, sample);
                tracks[idx].cc_points.push(MidiCcPoint {
                    channel,
                    cc,
                    sample,
                    value: param_value_to_cc(cc, value),
                });
                sample += step;
            }
        }
    }

    for track in &mut tracks {
        track.notes.sort_by(|a, b| a.start_sample.cmp(&b.start_sample).then(a.note.cmp(&b.note)));
        track.cc_points.sort_by_key(|p| p.sample);
    }

    MidiTable {
        tracks,
        tempo_points: tempo_map.points.iter().map(|p| (p.at_seconds, p.bpm)).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Document, GlobalsDefinition};
    use crate::expander::pitch::ResolvedPitch;
    use crate::timebase::build_tempo_map;

    fn patch(name: &str) -> PatchDefinition {
        PatchDefinition {
            name: name.to_string(),
            ..PatchDefinition::default()
        }
    }

    #[test]
    fn channels_assigned_in_declaration_order_not_alphabetical() {
        let mut doc = Document::new("1");
        doc.patches.push(patch("zebra"));
        doc.patches.push(patch("alpha"));
        let map = build_tempo_map(&GlobalsDefinition::default());
        let table = build_midi_table(&doc, &map, &[], &BTreeMap::new(), 256, 0);
        assert_eq!(table.tracks[0].patch, "zebra");
        assert_eq!(table.tracks[0].channel, 0);
        assert_eq!(table.tracks[1].patch, "alpha");
        assert_eq!(table.tracks[1].channel, 1);
    }

    #[test]
    fn play_occurrence_becomes_note_on_matching_track() {
        let mut doc = Document::new("1");
        doc.patches.push(patch("kick"));
        let plays = vec![PlayOccurrence {
            patch: "kick".to_string(),
            start_sample: 0,
            dur_samples: 100,
            velocity: 1.0,
            pitches: vec![ResolvedPitch {
                frequency: 110.0,
                midi: 45,
            }],
        }];
        let map = build_tempo_map(&GlobalsDefinition::default());
        let table = build_midi_table(&doc, &map, &plays, &BTreeMap::new(), 256, 1000);
        assert_eq!(table.tracks[0].notes.len(), 1);
        assert_eq!(table.tracks[0].notes[0].note, 45);
        assert_eq!(table.tracks[0].notes[0].velocity, 127);
        assert!(table.tracks[0].notes[0].end_sample > table.tracks[0].notes[0].start_sample);
    }

    #[test]
    fn cc7_gain_maps_linear_range_endpoints() {
        assert_eq!(param_value_to_cc(7, -60.0), 0);
        assert_eq!(param_value_to_cc(7, 12.0), 127);
    }

    #[test]
    fn unknown_patch_in_plays_is_skipped() {
        let doc = Document::new("1");
        let plays = vec![PlayOccurrence {
            patch: "ghost".to_string(),
            start_sample: 0,
            dur_samples: 10,
            velocity: 1.0,
            pitches: vec![],
        }];
        let map = build_tempo_map(&GlobalsDefinition::default());
        let table = build_midi_table(&doc, &map, &plays, &BTreeMap::new(), 256, 10);
        assert!(table.tracks.is_empty());
    }

    #[test]
    fn note_samples_are_clamped_to_total_samples() {
        let mut doc = Document::new("1");
        doc.patches.push(patch("kick"));
        let plays = vec![PlayOccurrence {
            patch: "kick".to_string(),
            start_sample: 90,
            dur_samples: 1000,
            velocity: 1.0,
            pitches: vec![ResolvedPitch {
                frequency: 110.0,
                midi: 45,
            }],
        }];
        let map = build_tempo_map(&GlobalsDefinition::default());
        let table = build_midi_table(&doc, &map, &plays, &BTreeMap::new(), 256, 100);
        let note = &table.tracks[0].notes[0];
        assert_eq!(note.start_sample, 90);
        assert_eq!(note.end_sample, 100);
        assert!(note.end_sample >= note.start_sample + 1);
    }

    #[test]
    fn tempo_points_carry_through_from_tempo_map() {
        let doc = Document::new("1");
        let map = build_tempo_map(&GlobalsDefinition::default());
        let table = build_midi_table(&doc, &map, &[], &BTreeMap::new(), 256, 0);
        assert_eq!(table.tempo_points[0], (0.0, 60.0));
    }
}
