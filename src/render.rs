//! Per-occurrence voice synthesis: sums a patch's oscillators (plus optional
//! noise/sample-player layers), applies the ADSR envelope, a 5ms anti-click
//! fade, a one-pole filter (with optional cutoff automation), and gain
//! (with optional gain automation), accumulating into the patch's stem.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use crate::expander::seq::PlayOccurrence;
use crate::expander::{evaluate_lane, AutomationLane};
use crate::program::{Envelope, Oscillator, PatchProgram};
use crate::rng::{hash64_from_parts, Pcg32};

fn db_to_linear(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    v.max(lo).min(hi)
}

fn envelope_value(env: &Envelope, t: f64, note_dur: f64) -> f64 {
    if !env.enabled {
        return 1.0;
    }
    let attack = env.attack.max(0.0001);
    let decay = env.decay.max(0.0001);
    let release = env.release.max(0.0001);

    if t < attack {
        return clamp(t / attack, 0.0, 1.0);
    }
    if t < attack + decay {
        let dt = (t - attack) / decay;
        return 1.0 + (env.sustain - 1.0) * dt;
    }
    if t < note_dur {
        return env.sustain;
    }
    if t < note_dur + release {
        let rt = (t - note_dur) / release;
        return env.sustain * (1.0 - clamp(rt, 0.0, 1.0));
    }
    0.0
}

fn osc_sample(osc: &Oscillator, phase: f64) -> f64 {
    let norm = phase - phase.floor();
    match osc.osc_type.as_str() {
        "osc_sine" => (2.0 * PI * norm).sin(),
        "osc_saw_blep" => 2.0 * norm - 1.0,
        "osc_tri_blep" => 4.0 * (norm - 0.5).abs() - 1.0,
        "osc_pulse_blep" => {
            if norm < osc.pulse_width {
                1.0
            } else {
                -1.0
            }
        }
        _ => (2.0 * PI * norm).sin(),
    }
}

/// Renders one `play` occurrence (all of its simultaneous pitches) into
/// `stem`, accumulating rather than overwriting.
pub fn render_play_to_stem(
    stem: &mut [f32],
    play: &PlayOccurrence,
    program: &PatchProgram,
    automation: &BTreeMap<String, AutomationLane>,
    sample_rate: u32,
    seed: u64,
) {
    let stem_samples = stem.len() as u64;
    if play.start_sample >= stem_samples {
        return;
    }
    let base_gain = db_to_linear(program.gain_db) * play.velocity;
    let fade_samples = (f64::from(sample_rate) * 0.005).round() as u64;

    for (pitch_index, pitch) in play.pitches.iter().enumerate() {
        let mut phases = vec![0.0_f64; program.oscillators.len()];
        let mut filter_state = 0.0_f64;
        let mut noise_rng = Pcg32::new(hash64_from_parts(
            seed,
            &[
                "voice",
                &play.patch,
                &play.start_sample.to_string(),
                &pitch_index.to_string(),
            ],
        ));

        for i in 0..play.dur_samples {
            let abs_sample = play.start_sample + i;
            if abs_sample >= stem_samples {
                break;
            }
            let t = i as f64 / f64::from(sample_rate);
            let note_dur = play.dur_samples as f64 / f64::from(sample_rate);
            let mut env = envelope_value(&program.env, t, note_dur);

            if i < fade_samples && fade_samples > 0 {
                env *= i as f64 / fade_samples as f64;
            }
            if play.dur_samples > fade_samples && i > play.dur_samples - fade_samples && fade_samples > 0 {
                let rem = play.dur_samples - i;
                env *= rem as f64 / fade_samples as f64;
            }

            let mut sample = 0.0;
            for (osc_idx, osc) in program.oscillators.iter().enumerate() {
                let freq = if osc.freq > 0.0 { osc.freq } else { pitch.frequency };
                phases[osc_idx] += freq / f64::from(sample_rate);
                sample += osc_sample(osc, phases[osc_idx]);
            }
            if program.noise_white {
                sample += noise_rng.uniform(-1.0, 1.0) * 0.25;
            }
            if program.sample_player {
                let decay = (-t * 20.0).exp();
                sample += noise_rng.uniform(-1.0, 1.0) * decay * 0.6;
            }
            if !program.oscillators.is_empty() {
                sample /= program.oscillators.len() as f64;
            }

            let mut cutoff = program.filter.cutoff_hz;
            if !program.filter_node_id.is_empty() {
                let key = format!("{}.cutoff", program.filter_node_id);
                if let Some(lane) = automation.get(&key) {
                    cutoff = evaluate_lane(lane, abs_sample).max(20.0);
                }
            }

            if program.filter.enabled {
                let alpha = clamp(1.0 - (-2.0 * PI * cutoff / f64::from(sample_rate)).exp(), 0.0, 1.0);
                filter_state += alpha * (sample - filter_state);
                sample = if program.filter.mode == "hp" {
                    sample - filter_state
                } else {
                    filter_state
                };
            }

            let mut gain = base_gain;
            if !program.gain_node_id.is_empty() {
                let key = format!("{}.gain", program.gain_node_id);
                if let Some(lane) = automation.get(&key) {
                    gain = db_to_linear(evaluate_lane(lane, abs_sample)) * play.velocity;
                }
            }

            stem[abs_sample as usize] += (sample * env * gain) as f32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expander::pitch::ResolvedPitch;

    fn occurrence(start: u64, dur: u64) -> PlayOccurrence {
        PlayOccurrence {
            patch: "kick".to_string(),
            start_sample: start,
            dur_samples: dur,
            velocity: 1.0,
            pitches: vec![ResolvedPitch {
                frequency: 110.0,
                midi: 45,
            }],
        }
    }

    #[test]
    fn render_accumulates_nonzero_signal_within_duration() {
        let mut stem = vec![0.0f32; 4800];
        let program = PatchProgram {
            oscillators: vec![Oscillator {
                osc_type: "osc_sine".to_string(),
                freq: 0.0,
                pulse_width: 0.5,
            }],
            ..PatchProgram::default()
        };
        let play = occurrence(0, 2400);
        render_play_to_stem(&mut stem, &play, &program, &BTreeMap::new(), 48000, 1);
        assert!(stem[1200].abs() > 0.0 || stem[1199].abs() > 0.0);
    }

    #[test]
    fn render_past_stem_end_does_not_panic() {
        let mut stem = vec![0.0f32; 10];
        let program = PatchProgram::default();
        let play = occurrence(5, 100);
        render_play_to_stem(&mut stem, &play, &program, &BTreeMap::new(), 48000, 1);
    }

    #[test]
    fn envelope_value_disabled_is_always_one() {
        let env = Envelope {
            enabled: false,
            ..Envelope::default()
        };
        assert_eq!(envelope_value(&env, 0.0, 1.0), 1.0);
        assert_eq!(envelope_value(&env, 100.0, 1.0), 1.0);
    }

    #[test]
    fn envelope_value_releases_after_note_end() {
        let env = Envelope {
            enabled: true,
            attack: 0.01,
            decay: 0.01,
            sustain: 0.5,
            release: 0.1,
        };
        let note_dur = 0.5;
        assert!(envelope_value(&env, note_dur + 0.2, note_dur) < 0.5);
        assert_eq!(envelope_value(&env, note_dur + 1.0, note_dur), 0.0);
    }
}
