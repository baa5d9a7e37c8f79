//! Declarative tree produced by the parser.
//!
//! Field-for-field port of the score language's grammar: a `Document` is the
//! fully parsed (but not yet expanded or scheduled) source file.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::ParamValue;

/// A number with a unit, as it appears in source (`2s`, `4 beats`, `-6dB`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitNumber {
    pub value: f64,
    pub unit: String,
}

impl UnitNumber {
    pub fn new(value: f64, unit: impl Into<String>) -> Self {
        Self {
            value,
            unit: unit.into(),
        }
    }

    pub fn zero() -> Self {
        Self::new(0.0, "")
    }
}

/// A single point in an explicit `tempo_map` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoPoint {
    pub at: UnitNumber,
    pub bpm: f64,
}

/// The `assets {}` block: sample directory and name-to-path table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetsDefinition {
    pub samples_dir: String,
    pub samples: BTreeMap<String, String>,
}

/// The `outputs {}` block: directory and filename layout for the (external)
/// writer stage. Aurora never touches the filesystem itself; this is parsed
/// and carried through purely as metadata for that collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputsDefinition {
    pub stems_dir: String,
    pub midi_dir: String,
    pub mix_dir: String,
    pub meta_dir: String,
    pub master: String,
    pub render_json: String,
}

impl Default for OutputsDefinition {
    fn default() -> Self {
        Self {
            stems_dir: "renders/stems".to_string(),
            midi_dir: "renders/midi".to_string(),
            mix_dir: "renders/mix".to_string(),
            meta_dir: "renders/meta".to_string(),
            master: "master.wav".to_string(),
            render_json: "render.json".to_string(),
        }
    }
}

/// How long to keep rendering after the last scheduled event ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TailPolicy {
    Fixed { seconds: f64 },
}

impl Default for TailPolicy {
    fn default() -> Self {
        TailPolicy::Fixed { seconds: 0.0 }
    }
}

/// The `globals {}` block: sample rate, block size, tempo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalsDefinition {
    pub sr: u32,
    pub block: u32,
    pub tempo: Option<f64>,
    pub tempo_map: Vec<TempoPoint>,
    pub tail_policy: TailPolicy,
}

impl Default for GlobalsDefinition {
    fn default() -> Self {
        Self {
            sr: 48000,
            block: 256,
            tempo: None,
            tempo_map: Vec::new(),
            tail_policy: TailPolicy::default(),
        }
    }
}

/// One node in a signal graph (`osc`, `env_adsr`, `filter_lp`, `gain`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub node_type: String,
    pub params: BTreeMap<String, ParamValue>,
}

/// An edge between two graph nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphConnection {
    pub from: String,
    pub to: String,
    pub rate: String,
    pub map: BTreeMap<String, ParamValue>,
}

/// The `graph {}` block inside a patch or bus: nodes, connections, and the
/// node id that produces the final output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDefinition {
    pub nodes: Vec<GraphNode>,
    pub connections: Vec<GraphConnection>,
    pub out: String,
}

/// A patch's send to a bus (`send bus "reverb" -6dB`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendDefinition {
    pub bus: String,
    pub amount_db: f64,
}

/// Binaural-beat configuration on a patch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinauralDefinition {
    pub enabled: bool,
    pub shift_hz: f64,
    pub mix: f64,
}

impl Default for BinauralDefinition {
    fn default() -> Self {
        Self {
            enabled: false,
            shift_hz: 0.0,
            mix: 1.0,
        }
    }
}

/// A `patch NAME {}` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchDefinition {
    pub name: String,
    pub poly: u32,
    pub voice_steal: String,
    pub mono: bool,
    pub legato: bool,
    pub retrig: String,
    pub binaural: BinauralDefinition,
    pub out_stem: String,
    pub send: Option<SendDefinition>,
    pub graph: GraphDefinition,
}

impl Default for PatchDefinition {
    fn default() -> Self {
        Self {
            name: String::new(),
            poly: 8,
            voice_steal: "oldest".to_string(),
            mono: false,
            legato: false,
            retrig: "always".to_string(),
            binaural: BinauralDefinition::default(),
            out_stem: String::new(),
            send: None,
            graph: GraphDefinition::default(),
        }
    }
}

/// A `bus NAME {}` block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusDefinition {
    pub name: String,
    pub out_stem: String,
    pub graph: GraphDefinition,
}

/// A single explicit `play` statement inside a section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayEvent {
    pub patch: String,
    pub at: UnitNumber,
    pub dur: UnitNumber,
    pub vel: f64,
    pub pitch_values: Vec<ParamValue>,
    pub params: BTreeMap<String, ParamValue>,
}

/// An `automate` statement: a named target plus a curve of (time, value) points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutomateEvent {
    pub target: String,
    pub curve: String,
    pub points: Vec<(UnitNumber, ParamValue)>,
}

/// A `seq` block: stochastic event generation over a section's span.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeqEvent {
    pub patch: String,
    pub fields: BTreeMap<String, ParamValue>,
}

/// The three statement kinds a section body may contain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SectionEvent {
    Play(PlayEvent),
    Automate(AutomateEvent),
    Seq(SeqEvent),
}

/// A `section NAME at T dur D {}` block, already flattened from any
/// `pattern`/`repeat`/`loop` it was expanded from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionDefinition {
    pub name: String,
    pub at: UnitNumber,
    pub dur: UnitNumber,
    pub directives: BTreeMap<String, ParamValue>,
    pub events: Vec<SectionEvent>,
}

/// The fully parsed source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub version: String,
    pub assets: AssetsDefinition,
    pub outputs: OutputsDefinition,
    pub globals: GlobalsDefinition,
    pub buses: Vec<BusDefinition>,
    pub patches: Vec<PatchDefinition>,
    pub sections: Vec<SectionDefinition>,
}

impl Document {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            assets: AssetsDefinition::default(),
            outputs: OutputsDefinition::default(),
            globals: GlobalsDefinition::default(),
            buses: Vec::new(),
            patches: Vec::new(),
            sections: Vec::new(),
        }
    }
}
