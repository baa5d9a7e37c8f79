//! Piecewise-constant tempo map and unit conversions.
//!
//! The map is a sorted list of `(at_seconds, bpm)` breakpoints; everything
//! between two breakpoints runs at the earlier one's tempo. All beats/seconds
//! conversions walk the map segment by segment rather than closed-form, since
//! the map may have arbitrarily many points.

use crate::ast::{GlobalsDefinition, UnitNumber};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoMapPoint {
    pub at_seconds: f64,
    pub bpm: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TempoMap {
    pub points: Vec<TempoMapPoint>,
}

impl TempoMap {
    fn first_bpm(&self) -> f64 {
        self.points.first().map(|p| p.bpm).unwrap_or(60.0)
    }
}

/// Converts a unit number to seconds given a reference tempo, for units that
/// don't depend on the tempo map's shape (`s`, `ms`, `min`, `h`, `beats`).
///
/// A unit outside that recognized set is preserved and surfaced by
/// `validator::validate` as a warning (spec.md §3); here, the incompatible
/// context just falls back to treating the magnitude as already-seconds
/// rather than panicking.
pub fn seconds_from_unit(value: &UnitNumber, bpm: f64) -> f64 {
    match value.unit.as_str() {
        "" | "s" => value.value,
        "ms" => value.value / 1000.0,
        "min" => value.value * 60.0,
        "h" => value.value * 3600.0,
        "beats" => value.value * 60.0 / bpm,
        _ => value.value,
    }
}

/// Builds the sorted tempo map from `globals.tempo`/`globals.tempo_map`.
///
/// Each explicit point's `at` may itself be in beats, which is resolved by
/// walking the map built so far (an explicit point's beat position is
/// relative to the start of the piece, not to the previous point).
pub fn build_tempo_map(globals: &GlobalsDefinition) -> TempoMap {
    let base_bpm = globals.tempo.unwrap_or(60.0);
    let mut points = vec![TempoMapPoint {
        at_seconds: 0.0,
        bpm: base_bpm,
    }];

    for point in &globals.tempo_map {
        let at_seconds = if point.at.unit == "beats" {
            let mut remaining_beats = point.at.value;
            let mut resolved = 0.0;
            for i in 0..points.len() {
                let bpm = points[i].bpm;
                let seg_start = points[i].at_seconds;
                let seg_end = points
                    .get(i + 1)
                    .map(|p| p.at_seconds)
                    .unwrap_or(f64::INFINITY);
                let seg_len = seg_end - seg_start;
                let seg_beats = if seg_len.is_infinite() {
                    f64::INFINITY
                } else {
                    seg_len * bpm / 60.0
                };
                if remaining_beats <= seg_beats {
                    resolved = seg_start + remaining_beats * 60.0 / bpm;
                    break;
                }
                remaining_beats -= seg_beats;
            }
            resolved
        } else {
            seconds_from_unit(&point.at, base_bpm)
        };
        points.push(TempoMapPoint {
            at_seconds,
            bpm: point.bpm,
        });
    }

    points.sort_by(|a, b| {
        a.at_seconds
            .partial_cmp(&b.at_seconds)
            .unwrap()
            .then(a.bpm.partial_cmp(&b.bpm).unwrap())
    });

    TempoMap { points }
}

/// Beats since the start of the piece → absolute seconds, walking segments.
pub fn beats_to_seconds(beats: f64, tempo_map: &TempoMap) -> f64 {
    if beats <= 0.0 {
        return 0.0;
    }
    let mut remaining = beats;
    for i in 0..tempo_map.points.len() {
        let bpm = tempo_map.points[i].bpm;
        let start = tempo_map.points[i].at_seconds;
        let end = tempo_map
            .points
            .get(i + 1)
            .map(|p| p.at_seconds)
            .unwrap_or(f64::INFINITY);
        let seg_seconds = end - start;
        let seg_beats = if seg_seconds.is_infinite() {
            f64::INFINITY
        } else {
            seg_seconds * bpm / 60.0
        };
        if remaining <= seg_beats {
            return start + remaining * 60.0 / bpm;
        }
        remaining -= seg_beats;
    }
    let last = tempo_map.points.last().expect("tempo map always has a point");
    last.at_seconds + remaining * 60.0 / last.bpm
}

/// Absolute seconds → beats since the start of the piece.
pub fn seconds_to_beats(seconds: f64, tempo_map: &TempoMap) -> f64 {
    if seconds <= 0.0 {
        return 0.0;
    }
    let mut beats = 0.0;
    for i in 0..tempo_map.points.len() {
        let bpm = tempo_map.points[i].bpm;
        let start = tempo_map.points[i].at_seconds;
        let end = tempo_map
            .points
            .get(i + 1)
            .map(|p| p.at_seconds)
            .unwrap_or(f64::INFINITY);
        if seconds <= start {
            break;
        }
        let seg_end = seconds.min(end);
        let seg_seconds = (seg_end - start).max(0.0);
        beats += seg_seconds * bpm / 60.0;
        if seconds <= end {
            break;
        }
    }
    beats
}

/// Resolves any unit number to absolute seconds: `beats` walks the tempo
/// map, everything else is a flat conversion against the initial tempo.
pub fn to_seconds(value: &UnitNumber, tempo_map: &TempoMap) -> f64 {
    if value.unit == "beats" {
        beats_to_seconds(value.value, tempo_map)
    } else {
        seconds_from_unit(value, tempo_map.first_bpm())
    }
}

/// An offset relative to an anchor point in seconds (used for `dur`, where
/// the duration itself may be expressed in beats that should track whatever
/// tempo is in effect at the anchor).
pub fn offset_seconds_from(anchor_seconds: f64, offset: &UnitNumber, tempo_map: &TempoMap) -> f64 {
    if offset.unit == "beats" {
        let anchor_beats = seconds_to_beats(anchor_seconds, tempo_map);
        let end_seconds = beats_to_seconds(anchor_beats + offset.value, tempo_map);
        end_seconds - anchor_seconds
    } else {
        seconds_from_unit(offset, tempo_map.first_bpm())
    }
}

pub fn to_samples(value: &UnitNumber, tempo_map: &TempoMap, sample_rate: u32) -> u64 {
    let seconds = to_seconds(value, tempo_map);
    (seconds * f64::from(sample_rate)).round() as u64
}

pub fn round_up_to_block(samples: u64, block_size: u32) -> u64 {
    if block_size == 0 {
        return samples;
    }
    let block = u64::from(block_size);
    let rem = samples % block;
    if rem == 0 {
        samples
    } else {
        samples + (block - rem)
    }
}
