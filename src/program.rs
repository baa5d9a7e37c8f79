//! Linearizes a patch's or bus's signal graph into a flat DSP program the
//! renderer can walk sample-by-sample, instead of re-walking the node graph
//! per sample.

use crate::ast::{BusDefinition, PatchDefinition, SendDefinition};
use crate::value::ParamValue;

fn node_param_number(params: &std::collections::BTreeMap<String, ParamValue>, key: &str, fallback: f64) -> f64 {
    params.get(key).map(|v| v.as_number_or(fallback)).unwrap_or(fallback)
}

fn node_param_text(params: &std::collections::BTreeMap<String, ParamValue>, key: &str, fallback: &str) -> String {
    params.get(key).map(ParamValue::as_text).unwrap_or_else(|| fallback.to_string())
}

fn node_param_hz_or_number(params: &std::collections::BTreeMap<String, ParamValue>, key: &str, fallback: f64) -> f64 {
    match params.get(key) {
        Some(ParamValue::Unit(u)) if u.is_hz() => u.value,
        Some(other) => other.as_number_or(fallback),
        None => fallback,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Oscillator {
    pub osc_type: String,
    pub freq: f64,
    pub pulse_width: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub enabled: bool,
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
}

impl Default for Envelope {
    fn default() -> Self {
        Self {
            enabled: false,
            attack: 0.01,
            decay: 0.1,
            sustain: 0.8,
            release: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatchFilter {
    pub enabled: bool,
    pub mode: String,
    pub cutoff_hz: f64,
}

impl Default for PatchFilter {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: "lp".to_string(),
            cutoff_hz: 1500.0,
        }
    }
}

/// A flattened per-patch DSP program: which oscillators to sum, whether
/// noise/sample synthesis contributes, envelope/filter/gain settings, and
/// the node ids automation lanes key off of.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchProgram {
    pub filter_node_id: String,
    pub gain_node_id: String,
    pub oscillators: Vec<Oscillator>,
    pub noise_white: bool,
    pub sample_player: bool,
    pub env: Envelope,
    pub filter: PatchFilter,
    pub gain_db: f64,
    pub send: Option<SendDefinition>,
}

impl Default for PatchProgram {
    fn default() -> Self {
        Self {
            filter_node_id: String::new(),
            gain_node_id: String::new(),
            oscillators: Vec::new(),
            noise_white: false,
            sample_player: false,
            env: Envelope::default(),
            filter: PatchFilter::default(),
            gain_db: -6.0,
            send: None,
        }
    }
}

pub fn build_patch_program(patch: &PatchDefinition) -> PatchProgram {
    let mut program = PatchProgram {
        send: patch.send.clone(),
        ..PatchProgram::default()
    };

    for node in &patch.graph.nodes {
        if node.node_type.starts_with("osc_") {
            program.oscillators.push(Oscillator {
                osc_type: node.node_type.clone(),
                freq: node_param_hz_or_number(&node.params, "freq", 0.0),
                pulse_width: node_param_number(&node.params, "pw", 0.5),
            });
        } else if node.node_type == "noise_white" || node.node_type == "noise_pink" {
            program.noise_white = true;
        } else if node.node_type == "sample_player" || node.node_type == "sample_slice" {
            program.sample_player = true;
        } else if node.node_type == "env_adsr" {
            program.env.enabled = true;
            if let Some(a) = node.params.get("a") {
                program.env.attack = a.as_unit_or("s").value;
            }
            if let Some(d) = node.params.get("d") {
                program.env.decay = d.as_unit_or("s").value;
            }
            program.env.sustain = node_param_number(&node.params, "s", 0.8);
            if let Some(r) = node.params.get("r") {
                program.env.release = r.as_unit_or("s").value;
            }
        } else if node.node_type == "svf" || node.node_type == "biquad" {
            program.filter.enabled = true;
            program.filter_node_id = node.id.clone();
            let mode_fallback = node_param_text(&node.params, "type", "lp");
            program.filter.mode = node_param_text(&node.params, "mode", &mode_fallback);
            if node.params.contains_key("cutoff") {
                program.filter.cutoff_hz = node_param_hz_or_number(&node.params, "cutoff", program.filter.cutoff_hz);
            } else if node.params.contains_key("freq") {
                program.filter.cutoff_hz = node_param_hz_or_number(&node.params, "freq", program.filter.cutoff_hz);
            }
        } else if node.node_type == "gain" {
            program.gain_node_id = node.id.clone();
            if let Some(g) = node.params.get("gain") {
                program.gain_db = match g {
                    ParamValue::Unit(u) if u.unit == "dB" => u.value,
                    other => other.as_number_or(program.gain_db),
                };
            }
        }
    }

    if program.oscillators.is_empty() && !program.noise_white && !program.sample_player {
        program.oscillators.push(Oscillator {
            osc_type: "osc_sine".to_string(),
            freq: 110.0,
            pulse_width: 0.5,
        });
    }
    program
}

/// A flattened bus program: a single feedback-delay-line processor serves
/// both `reverb_algo` and `delay` node types (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BusProgram {
    pub has_reverb: bool,
    pub mix: f64,
    pub decay: f64,
    pub predelay_seconds: f64,
}

impl Default for BusProgram {
    fn default() -> Self {
        Self {
            has_reverb: false,
            mix: 0.3,
            decay: 4.0,
            predelay_seconds: 0.02,
        }
    }
}

pub fn build_bus_program(bus: &BusDefinition) -> BusProgram {
    let mut program = BusProgram::default();
    for node in &bus.graph.nodes {
        if node.node_type == "reverb_algo" {
            program.has_reverb = true;
            program.mix = node_param_number(&node.params, "mix", program.mix).clamp(0.0, 1.0);
            if let Some(d) = node.params.get("decay") {
                program.decay = d.as_unit_or("s").value.max(0.1);
            }
            if let Some(p) = node.params.get("predelay") {
                program.predelay_seconds = p.as_unit_or("s").value.max(0.0);
            }
        } else if node.node_type == "delay" {
            program.has_reverb = true;
            if let Some(t) = node.params.get("time") {
                program.predelay_seconds = t.as_unit_or("s").value.max(0.001);
            }
            program.mix = node_param_number(&node.params, "mix", 0.35).clamp(0.0, 1.0);
            program.decay = (node_param_number(&node.params, "fb", 0.5) * 8.0).max(0.1);
        }
    }
    program
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{GraphDefinition, GraphNode};
    use std::collections::BTreeMap;

    fn node(id: &str, node_type: &str, params: BTreeMap<String, ParamValue>) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            node_type: node_type.to_string(),
            params,
        }
    }

    #[test]
    fn patch_without_any_voice_node_falls_back_to_sine() {
        let patch = PatchDefinition {
            graph: GraphDefinition {
                nodes: vec![node("gain1", "gain", BTreeMap::new())],
                connections: vec![],
                out: "gain1".to_string(),
            },
            ..PatchDefinition::default()
        };
        let program = build_patch_program(&patch);
        assert_eq!(program.oscillators.len(), 1);
        assert_eq!(program.oscillators[0].osc_type, "osc_sine");
        assert_eq!(program.oscillators[0].freq, 110.0);
    }

    #[test]
    fn env_adsr_reads_unit_numbers() {
        let mut params = BTreeMap::new();
        params.insert("a".to_string(), ParamValue::Unit(crate::value::UnitNumber::new(5.0, "ms")));
        let patch = PatchDefinition {
            graph: GraphDefinition {
                nodes: vec![node("env1", "env_adsr", params)],
                connections: vec![],
                out: "env1".to_string(),
            },
            ..PatchDefinition::default()
        };
        let program = build_patch_program(&patch);
        assert!(program.env.enabled);
        assert_eq!(program.env.attack, 5.0);
    }

    #[test]
    fn delay_node_maps_feedback_to_decay() {
        let mut params = BTreeMap::new();
        params.insert("fb".to_string(), ParamValue::Number(0.5));
        let bus = BusDefinition {
            name: "delay_bus".to_string(),
            out_stem: "delay".to_string(),
            graph: GraphDefinition {
                nodes: vec![node("d1", "delay", params)],
                connections: vec![],
                out: "d1".to_string(),
            },
        };
        let program = build_bus_program(&bus);
        assert!(program.has_reverb);
        assert_eq!(program.decay, 4.0);
        assert_eq!(program.mix, 0.35);
    }
}
