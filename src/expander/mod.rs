//! Deterministic schedule expansion: turns a parsed, validated [`Document`]
//! into absolute-sample play occurrences and per-patch automation lanes.
//!
//! Everything here is driven by the tempo map and the `seed`; the same
//! inputs always walk the same `Pcg32` draws in the same order, so the
//! resulting schedule is bit-reproducible.

pub mod directives;
pub mod pitch;
pub mod seq;

use std::collections::{BTreeMap, VecDeque};

use crate::ast::{Document, SectionEvent};
use crate::rng::{hash64_from_parts, Pcg32};
use crate::timebase::{self, TempoMap};
use crate::value::ParamValue;

use directives::{density_from_preset, resolve_section_constraints, silence_probability};
use pitch::{resolve_pitch_value, ResolvedPitch};
use seq::{add_seq_hit, parse_weights, pick_pitch_index, seq_step_active, BurstConfig, PlayOccurrence};

/// A piecewise-linear/step/exp/smooth automation curve, already resolved to
/// absolute sample positions.
#[derive(Debug, Clone, Default)]
pub struct AutomationLane {
    pub curve: String,
    pub points: Vec<(u64, f64)>,
}

/// Evaluates a lane at `sample`, clamping to the first/last point and
/// interpolating by `lane.curve` between segment endpoints.
pub fn evaluate_lane(lane: &AutomationLane, sample: u64) -> f64 {
    if lane.points.is_empty() {
        return 0.0;
    }
    let first = lane.points.first().unwrap();
    if sample <= first.0 {
        return first.1;
    }
    let last = lane.points.last().unwrap();
    if sample >= last.0 {
        return last.1;
    }
    for window in lane.points.windows(2) {
        let (x0, y0) = window[0];
        let (x1, y1) = window[1];
        if sample < x0 || sample > x1 {
            continue;
        }
        let t = (sample - x0) as f64 / (x1 - x0) as f64;
        return match lane.curve.as_str() {
            "step" => y0,
            "exp" => {
                let s0 = y0.max(0.0001);
                let s1 = y1.max(0.0001);
                s0 * (s1 / s0).powf(t)
            }
            "smooth" => {
                let s = t * t * (3.0 - 2.0 * t);
                y0 + (y1 - y0) * s
            }
            _ => y0 + (y1 - y0) * t,
        };
    }
    last.1
}

#[derive(Debug, Clone, Default)]
pub struct ExpansionResult {
    pub plays: Vec<PlayOccurrence>,
    /// patch name -> (`node_id.param` -> lane)
    pub automation: BTreeMap<String, BTreeMap<String, AutomationLane>>,
    pub timeline_end: u64,
}

fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    v.max(lo).min(hi)
}

fn param_as_seconds(value: &ParamValue, tempo_map: &TempoMap) -> f64 {
    timebase::to_seconds(&value.as_unit_or("s"), tempo_map)
}

fn field_seconds_or(fields: &BTreeMap<String, ParamValue>, key: &str, fallback: f64, tempo_map: &TempoMap) -> f64 {
    fields.get(key).map(|v| param_as_seconds(v, tempo_map)).unwrap_or(fallback)
}

fn field_number_or(fields: &BTreeMap<String, ParamValue>, key: &str, fallback: f64) -> f64 {
    fields.get(key).map(|v| v.as_number_or(fallback)).unwrap_or(fallback)
}

fn field_text_or(fields: &BTreeMap<String, ParamValue>, key: &str, fallback: &str) -> String {
    fields.get(key).map(ParamValue::as_text).unwrap_or_else(|| fallback.to_string())
}

fn seq_pitch_list(fields: &BTreeMap<String, ParamValue>) -> Vec<ParamValue> {
    match fields.get("pitch") {
        None => vec![ParamValue::Identifier("C4".to_string())],
        Some(ParamValue::List(list)) => list.clone(),
        Some(other) => vec![other.clone()],
    }
}

fn parse_burst(fields: &BTreeMap<String, ParamValue>, tempo_map: &TempoMap) -> BurstConfig {
    let Some(obj) = fields.get("burst").and_then(ParamValue::as_object) else {
        return BurstConfig::default();
    };
    BurstConfig {
        probability: obj.get("prob").map(|v| clamp(v.as_number_or(0.0), 0.0, 1.0)).unwrap_or(0.0),
        count: obj.get("count").map(|v| v.as_number_or(0.0).round() as i32).unwrap_or(0),
        spread_seconds: obj.get("spread").map(|v| param_as_seconds(v, tempo_map)).unwrap_or(0.0),
    }
}

/// Expands every section's `play`/`seq` statements into absolute-sample
/// occurrences and every `automate` statement into a resolved lane.
pub fn expand_score(document: &Document, tempo_map: &TempoMap, sample_rate: u32, seed: u64) -> ExpansionResult {
    let mut out = ExpansionResult::default();

    for section in &document.sections {
        let constraints = resolve_section_constraints(section);
        let density = density_from_preset(&constraints.density);
        let silence_prob = silence_probability(&constraints.silence);

        let section_start = timebase::to_samples(&section.at, tempo_map, sample_rate);
        let section_dur = timebase::to_samples(&section.dur, tempo_map, sample_rate);
        out.timeline_end = out.timeline_end.max(section_start + section_dur);

        for event in &section.events {
            match event {
                SectionEvent::Play(play) => {
                    let start_sample = timebase::to_samples(&play.at, tempo_map, sample_rate);
                    let dur_samples = timebase::to_samples(&play.dur, tempo_map, sample_rate).max(1);
                    let mut pitches: Vec<ResolvedPitch> =
                        play.pitch_values.iter().map(resolve_pitch_value).collect();
                    if pitches.is_empty() {
                        pitches.push(resolve_pitch_value(&ParamValue::Identifier("C4".to_string())));
                    }
                    out.timeline_end = out.timeline_end.max(start_sample + dur_samples);
                    out.plays.push(PlayOccurrence {
                        patch: play.patch.clone(),
                        start_sample,
                        dur_samples,
                        velocity: clamp(play.vel, 0.0, 1.5),
                        pitches,
                    });
                }
                SectionEvent::Automate(automate) => {
                    let parts: Vec<&str> = automate.target.split('.').collect();
                    if parts.len() < 4 || parts[0] != "patch" {
                        continue;
                    }
                    let patch_name = parts[1].to_string();
                    let key = format!("{}.{}", parts[2], parts[3]);
                    let mut points: Vec<(u64, f64)> = automate
                        .points
                        .iter()
                        .map(|(time, value)| (timebase::to_samples(time, tempo_map, sample_rate), value.as_number_or(0.0)))
                        .collect();
                    points.sort_by_key(|p| p.0);
                    out.automation.entry(patch_name).or_default().insert(
                        key,
                        AutomationLane {
                            curve: automate.curve.clone(),
                            points,
                        },
                    );
                }
                SectionEvent::Seq(seq) => {
                    let fields = &seq.fields;
                    let at_s = fields
                        .get("at")
                        .map(|v| param_as_seconds(v, tempo_map))
                        .unwrap_or(section_start as f64 / f64::from(sample_rate));
                    let dur_s = fields
                        .get("dur")
                        .map(|v| param_as_seconds(v, tempo_map))
                        .unwrap_or(section_dur as f64 / f64::from(sample_rate));

                    let rate_s = (field_seconds_or(fields, "rate", 1.0, tempo_map) * density.rate_multiplier).max(0.001);
                    let prob = clamp(field_number_or(fields, "prob", 1.0) * density.prob_multiplier, 0.0, 1.0);
                    let velocity = clamp(field_number_or(fields, "vel", 0.8), 0.0, 1.0);
                    let jitter_s = field_seconds_or(fields, "jitter", 0.0, tempo_map).max(0.0);
                    let swing = clamp(field_number_or(fields, "swing", 0.5), 0.0, 1.0);
                    let seq_max = field_number_or(fields, "max", f64::from(density.max_events_per_minute)).round() as i32;
                    let max_per_minute = seq_max.min(density.max_events_per_minute);
                    let event_len_s = (rate_s * 0.9).clamp(0.030, 0.35);

                    let pitch_values = seq_pitch_list(fields);
                    let mut weights = parse_weights(fields, pitch_values.len());
                    if weights.is_empty() {
                        weights.resize(pitch_values.len(), 1.0);
                    }

                    let pick = field_text_or(fields, "pick", "uniform");
                    let pattern = fields.get("pattern");
                    let mut euclid_pattern = Vec::new();
                    let burst = parse_burst(fields, tempo_map);

                    let mut rng = Pcg32::new(hash64_from_parts(seed, &["seq", &section.name, &seq.patch]));
                    let mut rolling_times: VecDeque<f64> = VecDeque::new();
                    let step_count = (dur_s / rate_s).max(0.0).floor() as usize;

                    for step in 0..step_count {
                        if !seq_step_active(pattern, step, &mut euclid_pattern) {
                            continue;
                        }
                        if rng.next_unit() >= prob {
                            continue;
                        }
                        if silence_prob > 0.0 && rng.next_unit() < silence_prob {
                            continue;
                        }

                        let mut time_s = at_s + step as f64 * rate_s;
                        if step % 2 == 1 {
                            time_s += (swing - 0.5) * rate_s;
                        }
                        let jitter = clamp(rng.uniform(-jitter_s, jitter_s), -0.49 * rate_s, 0.49 * rate_s);
                        time_s += jitter;
                        time_s = clamp(time_s, at_s, at_s + dur_s);

                        let pick_index = pick_pitch_index(&pick, step, &weights, &mut rng);
                        let pitch = resolve_pitch_value(&pitch_values[pick_index % pitch_values.len()]);
                        let start_sample = (time_s * f64::from(sample_rate)).round() as u64;
                        let event_len_samples = ((event_len_s * f64::from(sample_rate)).round() as i64).max(1) as u64;

                        add_seq_hit(
                            &mut out.plays,
                            &mut rolling_times,
                            time_s,
                            start_sample,
                            event_len_samples,
                            &seq.patch,
                            velocity,
                            pitch,
                            max_per_minute,
                        );

                        if burst.count > 1 && rng.next_unit() < burst.probability {
                            let spread = if burst.spread_seconds > 0.0 {
                                burst.spread_seconds
                            } else {
                                rate_s * 0.8
                            };
                            for i in 1..burst.count {
                                let burst_t = time_s + spread * (f64::from(i) / f64::from(burst.count));
                                let burst_start = (burst_t * f64::from(sample_rate)).round() as u64;
                                add_seq_hit(
                                    &mut out.plays,
                                    &mut rolling_times,
                                    burst_t,
                                    burst_start,
                                    event_len_samples,
                                    &seq.patch,
                                    velocity,
                                    pitch,
                                    max_per_minute,
                                );
                            }
                        }
                    }
                    out.timeline_end = out
                        .timeline_end
                        .max(((at_s + dur_s + event_len_s) * f64::from(sample_rate)).round() as u64);
                }
            }
        }
    }

    out.plays.sort_by(|a, b| a.start_sample.cmp(&b.start_sample).then(a.patch.cmp(&b.patch)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::*;

    fn tempo_map_60bpm() -> TempoMap {
        timebase::build_tempo_map(&GlobalsDefinition::default())
    }

    #[test]
    fn evaluate_lane_clamps_outside_range() {
        let lane = AutomationLane {
            curve: "linear".to_string(),
            points: vec![(100, 0.0), (200, 1.0)],
        };
        assert_eq!(evaluate_lane(&lane, 0), 0.0);
        assert_eq!(evaluate_lane(&lane, 1000), 1.0);
        assert_eq!(evaluate_lane(&lane, 150), 0.5);
    }

    #[test]
    fn evaluate_lane_step_holds_left_value() {
        let lane = AutomationLane {
            curve: "step".to_string(),
            points: vec![(0, 10.0), (100, 20.0)],
        };
        assert_eq!(evaluate_lane(&lane, 50), 10.0);
    }

    #[test]
    fn expand_score_single_play_produces_one_occurrence() {
        let mut doc = Document::new("1");
        doc.sections.push(SectionDefinition {
            name: "intro".to_string(),
            at: UnitNumber::new(0.0, "s"),
            dur: UnitNumber::new(1.0, "s"),
            directives: Default::default(),
            events: vec![SectionEvent::Play(PlayEvent {
                patch: "kick".to_string(),
                at: UnitNumber::new(0.0, "s"),
                dur: UnitNumber::new(0.2, "s"),
                vel: 0.9,
                pitch_values: vec![ParamValue::Identifier("C4".to_string())],
                params: Default::default(),
            })],
        });
        let map = tempo_map_60bpm();
        let result = expand_score(&doc, &map, 48000, 1);
        assert_eq!(result.plays.len(), 1);
        assert_eq!(result.plays[0].patch, "kick");
    }

    #[test]
    fn expand_score_is_deterministic_for_same_seed() {
        let mut doc = Document::new("1");
        let mut fields = BTreeMap::new();
        fields.insert("rate".to_string(), ParamValue::Unit(crate::value::UnitNumber::new(0.25, "s")));
        fields.insert("prob".to_string(), ParamValue::Number(0.7));
        doc.sections.push(SectionDefinition {
            name: "groove".to_string(),
            at: UnitNumber::new(0.0, "s"),
            dur: UnitNumber::new(8.0, "s"),
            directives: Default::default(),
            events: vec![SectionEvent::Seq(SeqEvent {
                patch: "hat".to_string(),
                fields,
            })],
        });
        let map = tempo_map_60bpm();
        let a = expand_score(&doc, &map, 48000, 42);
        let b = expand_score(&doc, &map, 48000, 42);
        let a_starts: Vec<u64> = a.plays.iter().map(|p| p.start_sample).collect();
        let b_starts: Vec<u64> = b.plays.iter().map(|p| p.start_sample).collect();
        assert_eq!(a_starts, b_starts);
        assert!(!a_starts.is_empty());
    }
}
