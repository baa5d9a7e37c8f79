//! End-to-end scenarios from the score language down to rendered buffers,
//! mirroring the documented testable properties: determinism, block
//! alignment, density caps, euclidean rhythms, MIDI consistency, and
//! master clipping.

use aurora::pipeline::RenderOptions;
use aurora::{error, pipeline};

fn header() -> &'static str {
    r#"aurora { version: "1" }"#
}

#[test]
fn silence_scenario_produces_one_block_of_zeros() {
    let source = format!(
        r#"{header}
        globals {{ sr: 48000, block: 256, tempo: 60, tail_policy: {{ fixed_seconds: 0 }} }}
        patch sine {{
            out_stem: "sine",
            graph: {{ nodes: [ {{ id: "osc1", type: "osc_sine", params: {{}} }} ], out: "osc1" }}
        }}
        section only {{ at: 0s, dur: 0s, events: [] }}
        "#,
        header = header()
    );
    let out = pipeline::render(&source, RenderOptions::default()).expect("renders");
    assert_eq!(out.metadata.total_samples, 256);
    assert!(out.master.iter().all(|&s| s == 0.0));
    assert_eq!(out.midi.tracks.len(), 1);
    assert!(out.midi.tracks[0].notes.is_empty());
}

#[test]
fn single_play_note_on_at_zero_and_expected_note_number() {
    let source = format!(
        r#"{header}
        globals {{ sr: 48000, block: 256, tempo: 60 }}
        patch pad {{
            out_stem: "pad",
            graph: {{ nodes: [ {{ id: "osc1", type: "osc_sine", params: {{}} }} ], out: "osc1" }}
        }}
        section intro {{
            at: 0s, dur: 1s,
            events: [ {{ kind: "play", patch: "pad", at: 0s, dur: 0.5s, vel: 1.0, pitch: ["A4"] }} ]
        }}
        "#,
        header = header()
    );
    let out = pipeline::render(&source, RenderOptions::default()).expect("renders");
    let track = &out.midi.tracks[0];
    assert_eq!(track.notes.len(), 1);
    assert_eq!(track.notes[0].note, 69);
    assert_eq!(track.notes[0].start_sample, 0);
    assert_eq!(out.patch_stems[0].samples[0], 0.0);
}

#[test]
fn deterministic_seq_is_byte_identical_across_runs() {
    let source = format!(
        r#"{header}
        globals {{ sr: 48000, block: 256, tempo: 60 }}
        patch hat {{
            out_stem: "hat",
            graph: {{ nodes: [ {{ id: "osc1", type: "noise_white", params: {{}} }} ], out: "osc1" }}
        }}
        section groove {{
            at: 0s, dur: 4s,
            events: [ {{ kind: "seq", patch: "hat", rate: 0.25s, dur: 4s, prob: 0.5, pitch: ["C4", "E4", "G4"], pick: "uniform" }} ]
        }}
        "#,
        header = header()
    );
    let a = pipeline::render(&source, RenderOptions { seed: 42, sample_rate_override: None }).unwrap();
    let b = pipeline::render(&source, RenderOptions { seed: 42, sample_rate_override: None }).unwrap();
    assert_eq!(a.master, b.master);
    assert_eq!(a.midi.tracks[0].notes, b.midi.tracks[0].notes);
}

#[test]
fn euclid_pattern_yields_three_hits_in_eight_steps() {
    let source = format!(
        r#"{header}
        globals {{ sr: 48000, block: 256, tempo: 60 }}
        patch hat {{
            out_stem: "hat",
            graph: {{ nodes: [ {{ id: "osc1", type: "noise_white", params: {{}} }} ], out: "osc1" }}
        }}
        section groove {{
            at: 0s, dur: 2s,
            events: [ {{ kind: "seq", patch: "hat", rate: 0.25s, dur: 2s, prob: 1, pattern: euclid(3, 8, 0), pitch: ["C4"] }} ]
        }}
        "#,
        header = header()
    );
    let out = pipeline::render(&source, RenderOptions { seed: 7, sample_rate_override: None }).unwrap();
    assert_eq!(out.midi.tracks[0].notes.len(), 3);
}

#[test]
fn master_never_exceeds_unit_amplitude() {
    let source = format!(
        r#"{header}
        globals {{ sr: 48000, block: 256, tempo: 60 }}
        patch loud1 {{
            out_stem: "loud1",
            graph: {{
                nodes: [
                    {{ id: "osc1", type: "osc_sine", params: {{}} }},
                    {{ id: "gain1", type: "gain", params: {{ gain: 12 }} }}
                ],
                out: "gain1"
            }}
        }}
        patch loud2 {{
            out_stem: "loud2",
            graph: {{
                nodes: [
                    {{ id: "osc1", type: "osc_sine", params: {{}} }},
                    {{ id: "gain1", type: "gain", params: {{ gain: 12 }} }}
                ],
                out: "gain1"
            }}
        }}
        section intro {{
            at: 0s, dur: 1s,
            events: [
                {{ kind: "play", patch: "loud1", at: 0s, dur: 0.5s, vel: 1.5, pitch: ["A4"] }},
                {{ kind: "play", patch: "loud2", at: 0s, dur: 0.5s, vel: 1.5, pitch: ["A4"] }}
            ]
        }}
        "#,
        header = header()
    );
    let out = pipeline::render(&source, RenderOptions::default()).unwrap();
    assert!(out.master.iter().all(|&s| (-1.0..=1.0).contains(&s)));
}

#[test]
fn total_samples_is_block_aligned() {
    let source = format!(
        r#"{header}
        globals {{ sr: 48000, block: 256, tempo: 60 }}
        patch pad {{
            out_stem: "pad",
            graph: {{ nodes: [ {{ id: "osc1", type: "osc_sine", params: {{}} }} ], out: "osc1" }}
        }}
        section intro {{
            at: 0s, dur: 1s,
            events: [ {{ kind: "play", patch: "pad", at: 0s, dur: 0.37s, vel: 1.0, pitch: ["C4"] }} ]
        }}
        "#,
        header = header()
    );
    let out = pipeline::render(&source, RenderOptions::default()).unwrap();
    assert_eq!(out.metadata.total_samples % u64::from(out.metadata.block_size), 0);
}

#[test]
fn invalid_document_maps_to_validation_exit_code() {
    let source = format!("{} globals {{ sr: 48000, block: 256 }}", header());
    let err = pipeline::render(&source, RenderOptions::default()).unwrap_err();
    assert_eq!(error::exit_code(&err), 5);
}

#[test]
fn malformed_source_maps_to_parse_exit_code() {
    let err = pipeline::render("not a valid document {{{", RenderOptions::default()).unwrap_err();
    assert_eq!(error::exit_code(&err), 4);
}
