//! Stochastic `seq` step expansion: euclidean gating, probability draws,
//! swing/jitter, pitch picking, burst follow-ups, and the rolling
//! events-per-minute cap.

use std::collections::{BTreeMap, VecDeque};

use crate::rng::Pcg32;
use crate::value::ParamValue;

use super::pitch::ResolvedPitch;

/// Builds an `n`-step Euclidean rhythm with `k` pulses, rotated by `rotation`
/// steps. Bresenham-style distribution: step `i` is active iff
/// `(i*k) % n < k`.
pub fn build_euclidean_pattern(pulses: i32, steps: i32, rotation: i32) -> Vec<bool> {
    if steps <= 0 {
        return Vec::new();
    }
    let pulses = pulses.clamp(0, steps);
    let mut out: Vec<bool> = (0..steps).map(|i| (i * pulses) % steps < pulses).collect();
    let mut rotation = rotation % steps;
    if rotation < 0 {
        rotation += steps;
    }
    out.rotate_left(rotation as usize);
    out
}

/// Whether step `step_index` is active, given an optional `pattern` field
/// value: a string/identifier gate pattern (`x`/`X`/`*`/`1` = on), an
/// `euclid(k, n, rot)` call (cached into `euclid_cache` on first use), or
/// `None` (always active).
pub fn seq_step_active(pattern: Option<&ParamValue>, step_index: usize, euclid_cache: &mut Vec<bool>) -> bool {
    let Some(pattern) = pattern else {
        return true;
    };
    match pattern {
        ParamValue::String(s) | ParamValue::Identifier(s) => {
            if s.is_empty() {
                return true;
            }
            let chars: Vec<char> = s.chars().collect();
            let ch = chars[step_index % chars.len()];
            matches!(ch, 'x' | 'X' | '*' | '1')
        }
        ParamValue::Call(call) if call.callee == "euclid" => {
            if euclid_cache.is_empty() {
                let k = call.args.first().and_then(ParamValue::try_number).unwrap_or(0.0).round() as i32;
                let n = call.args.get(1).and_then(ParamValue::try_number).unwrap_or(1.0).round() as i32;
                let rot = call.args.get(2).and_then(ParamValue::try_number).unwrap_or(0.0).round() as i32;
                *euclid_cache = build_euclidean_pattern(k, n, rot);
            }
            if euclid_cache.is_empty() {
                false
            } else {
                euclid_cache[step_index % euclid_cache.len()]
            }
        }
        _ => true,
    }
}

/// Weights for pitch picking, padded with `1.0` up to `expected_count`.
pub fn parse_weights(fields: &BTreeMap<String, ParamValue>, expected_count: usize) -> Vec<f64> {
    let mut out: Vec<f64> = fields
        .get("weights")
        .and_then(ParamValue::as_list)
        .map(|list| list.iter().map(|v| v.as_number_or(0.0).max(0.0)).collect())
        .unwrap_or_default();
    if out.len() < expected_count {
        out.resize(expected_count, 1.0);
    }
    out
}

/// Picks an index into a pitch list: `cycle` walks round-robin, `weighted`
/// draws proportionally, anything else (including `uniform`) draws flat.
pub fn pick_pitch_index(strategy: &str, step_index: usize, weights: &[f64], rng: &mut Pcg32) -> usize {
    if strategy == "cycle" {
        if weights.is_empty() {
            return 0;
        }
        return step_index % weights.len();
    }
    if strategy == "weighted" && !weights.is_empty() {
        let total: f64 = weights.iter().map(|w| w.max(0.0)).sum();
        if total <= 0.0 {
            return 0;
        }
        let needle = rng.uniform(0.0, total);
        let mut running = 0.0;
        for (i, w) in weights.iter().enumerate() {
            running += w.max(0.0);
            if needle <= running {
                return i;
            }
        }
        return weights.len() - 1;
    }
    if weights.is_empty() {
        return 0;
    }
    (rng.next_uint() as usize) % weights.len()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BurstConfig {
    pub probability: f64,
    pub count: i32,
    pub spread_seconds: f64,
}

/// A single scheduled hit, resolved to absolute sample position.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayOccurrence {
    pub patch: String,
    pub start_sample: u64,
    pub dur_samples: u64,
    pub velocity: f64,
    pub pitches: Vec<ResolvedPitch>,
}

/// Appends a hit to `plays` unless the rolling 60-second window already holds
/// `max_events_per_minute` entries for this stream.
#[allow(clippy::too_many_arguments)]
pub fn add_seq_hit(
    plays: &mut Vec<PlayOccurrence>,
    rolling_times: &mut VecDeque<f64>,
    absolute_seconds: f64,
    start_sample: u64,
    dur_samples: u64,
    patch: &str,
    velocity: f64,
    pitch: ResolvedPitch,
    max_events_per_minute: i32,
) {
    while let Some(&front) = rolling_times.front() {
        if absolute_seconds - front > 60.0 {
            rolling_times.pop_front();
        } else {
            break;
        }
    }
    if max_events_per_minute > 0 && rolling_times.len() as i32 >= max_events_per_minute {
        return;
    }
    rolling_times.push_back(absolute_seconds);
    plays.push(PlayOccurrence {
        patch: patch.to_string(),
        start_sample,
        dur_samples,
        velocity,
        pitches: vec![pitch],
    });
}
