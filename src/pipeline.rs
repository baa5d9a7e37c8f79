//! Top-level orchestration: source text in, fully rendered output out.
//!
//! `render` is the single public entry point a CLI or test harness calls. It
//! never touches the filesystem — writing stems/MIDI/metadata to disk is an
//! external collaborator's job (see `OutputsDefinition`).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ast::TailPolicy;
use crate::error::{AuroraError, RenderError, ValidationWarning};
use crate::expander::seq::PlayOccurrence;
use crate::midi::{build_midi_table, MidiTable};
use crate::mix::{accumulate_send, mix_master, process_bus_stem};
use crate::program::{build_bus_program, build_patch_program};
use crate::render::render_play_to_stem;
use crate::timebase::{build_tempo_map, round_up_to_block, to_samples};
use crate::value::UnitNumber;
use crate::{expander, parser, validator};

/// Knobs a caller can override; everything else comes from the document.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    pub seed: u64,
    pub sample_rate_override: Option<u32>,
}

/// Render-wide facts that don't belong to any one stem.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderMetadata {
    pub sample_rate: u32,
    pub block_size: u32,
    pub total_samples: u64,
    pub duration_seconds: f64,
}

/// One rendered stem: a name (patch or bus) and its mono sample buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioStem {
    pub name: String,
    pub samples: Vec<f32>,
}

/// Everything `render` produces.
#[derive(Debug, Clone)]
pub struct RenderOutput {
    pub patch_stems: Vec<AudioStem>,
    pub bus_stems: Vec<AudioStem>,
    pub master: Vec<f32>,
    pub midi: MidiTable,
    pub metadata: RenderMetadata,
    pub warnings: Vec<ValidationWarning>,
}

/// Parses, validates, expands, and renders `source` into audio stems, a
/// master mix, and per-patch MIDI tracks.
pub fn render(source: &str, options: RenderOptions) -> Result<RenderOutput, AuroraError> {
    let document = parser::parse(source)?;

    let validation = validator::validate(&document);
    if !validation.is_ok() {
        return Err(AuroraError::Validation(validation.errors));
    }
    let mut warnings = validation.warnings;

    let sample_rate = options.sample_rate_override.unwrap_or(document.globals.sr);
    let block_size = document.globals.block;
    let tempo_map = build_tempo_map(&document.globals);

    let expansion = expander::expand_score(&document, &tempo_map, sample_rate, options.seed);

    let TailPolicy::Fixed { seconds: tail_seconds } = document.globals.tail_policy;
    let tail_samples = to_samples(&UnitNumber::new(tail_seconds, "s"), &tempo_map, sample_rate);
    let total_samples =
        round_up_to_block(expansion.timeline_end + tail_samples, block_size.max(1)).max(u64::from(block_size.max(1)));

    let mut known_patches: BTreeMap<&str, ()> = BTreeMap::new();
    for patch in &document.patches {
        known_patches.insert(patch.name.as_str(), ());
    }

    let mut patch_buffers: BTreeMap<String, Vec<f32>> = document
        .patches
        .iter()
        .map(|p| (p.name.clone(), vec![0.0_f32; total_samples as usize]))
        .collect();

    let mut valid_plays: Vec<PlayOccurrence> = Vec::with_capacity(expansion.plays.len());
    for play in &expansion.plays {
        if !known_patches.contains_key(play.patch.as_str()) {
            warnings.push(ValidationWarning::new(
                crate::error::WarningCode::UnknownPatchReference,
                RenderError::UnknownPatch(play.patch.clone()).to_string(),
            ));
            continue;
        }
        valid_plays.push(play.clone());
    }

    for patch in &document.patches {
        let program = build_patch_program(patch);
        let empty = BTreeMap::new();
        let automation = expansion.automation.get(&patch.name).unwrap_or(&empty);
        let buffer = patch_buffers.get_mut(&patch.name).expect("buffer seeded above");
        for play in valid_plays.iter().filter(|p| p.patch == patch.name) {
            render_play_to_stem(buffer, play, &program, automation, sample_rate, options.seed);
        }
    }

    let mut bus_buffers: BTreeMap<String, Vec<f32>> = document
        .buses
        .iter()
        .map(|b| (b.name.clone(), vec![0.0_f32; total_samples as usize]))
        .collect();

    for patch in &document.patches {
        let Some(send) = &patch.send else { continue };
        if let Some(bus_buf) = bus_buffers.get_mut(&send.bus) {
            let patch_buf = &patch_buffers[&patch.name];
            accumulate_send(bus_buf, patch_buf, send.amount_db);
        }
    }

    for bus in &document.buses {
        let program = build_bus_program(bus);
        if let Some(buf) = bus_buffers.get_mut(&bus.name) {
            process_bus_stem(buf, &program, sample_rate);
        }
    }

    let patch_stems: Vec<AudioStem> = document
        .patches
        .iter()
        .map(|p| AudioStem {
            name: p.name.clone(),
            samples: patch_buffers[&p.name].clone(),
        })
        .collect();

    let bus_stems: Vec<AudioStem> = document
        .buses
        .iter()
        .map(|b| AudioStem {
            name: b.name.clone(),
            samples: bus_buffers[&b.name].clone(),
        })
        .collect();

    let patch_slices: Vec<&[f32]> = patch_stems.iter().map(|s| s.samples.as_slice()).collect();
    let bus_slices: Vec<&[f32]> = bus_stems.iter().map(|s| s.samples.as_slice()).collect();
    let master = mix_master(&patch_slices, &bus_slices, total_samples as usize);

    let midi = build_midi_table(&document, &tempo_map, &valid_plays, &expansion.automation, block_size, total_samples);

    let metadata = RenderMetadata {
        sample_rate,
        block_size,
        total_samples,
        duration_seconds: total_samples as f64 / f64::from(sample_rate),
    };

    Ok(RenderOutput {
        patch_stems,
        bus_stems,
        master,
        midi,
        metadata,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_SCORE: &str = r#"
        aurora { version: "1" }
        globals { sr: 48000, block: 256, tempo: 120 }
        patch kick {
            out_stem: "kick",
            graph: {
                nodes: [
                    { id: "osc1", type: "osc_sine", params: { freq: 110 } }
                ],
                out: "osc1"
            }
        }
        section intro {
            at: 0s, dur: 1s,
            events: [
                { kind: "play", patch: "kick", at: 0s, dur: 0.2s, vel: 0.9, pitch: ["C4"] }
            ]
        }
    "#;

    #[test]
    fn render_minimal_score_produces_one_patch_stem_and_master() {
        let out = render(MINIMAL_SCORE, RenderOptions::default()).expect("renders");
        assert_eq!(out.patch_stems.len(), 1);
        assert_eq!(out.patch_stems[0].name, "kick");
        assert!(!out.master.is_empty());
        assert_eq!(out.master.len(), out.patch_stems[0].samples.len());
    }

    #[test]
    fn render_is_deterministic_across_runs() {
        let a = render(MINIMAL_SCORE, RenderOptions { seed: 7, sample_rate_override: None }).unwrap();
        let b = render(MINIMAL_SCORE, RenderOptions { seed: 7, sample_rate_override: None }).unwrap();
        assert_eq!(a.master, b.master);
    }

    #[test]
    fn invalid_document_surfaces_validation_error() {
        let bad = r#"aurora { version: "1" } globals { sr: 48000, block: 256 }"#;
        let err = render(bad, RenderOptions::default()).unwrap_err();
        assert_eq!(crate::error::exit_code(&err), 5);
    }
}
