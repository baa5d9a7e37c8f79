//! Section directive resolution: density/silence packs and overrides.

use crate::ast::SectionDefinition;
use crate::value::ParamValue;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeqDensity {
    pub rate_multiplier: f64,
    pub prob_multiplier: f64,
    pub max_events_per_minute: i32,
}

impl Default for SeqDensity {
    fn default() -> Self {
        Self {
            rate_multiplier: 1.0,
            prob_multiplier: 1.0,
            max_events_per_minute: 32,
        }
    }
}

pub fn density_from_preset(preset: &str) -> SeqDensity {
    match preset {
        "very_low" => SeqDensity {
            rate_multiplier: 0.5,
            prob_multiplier: 0.6,
            max_events_per_minute: 8,
        },
        "low" => SeqDensity {
            rate_multiplier: 0.75,
            prob_multiplier: 0.8,
            max_events_per_minute: 16,
        },
        "high" => SeqDensity {
            rate_multiplier: 1.25,
            prob_multiplier: 1.15,
            max_events_per_minute: 64,
        },
        _ => SeqDensity::default(),
    }
}

pub fn silence_probability(preset: &str) -> f64 {
    match preset {
        "long" => 0.60,
        "medium" => 0.35,
        "short" => 0.15,
        _ => 0.0,
    }
}

#[derive(Debug, Clone, Default)]
pub struct SectionConstraints {
    pub density: String,
    pub silence: String,
}

pub fn resolve_section_constraints(section: &SectionDefinition) -> SectionConstraints {
    let mut state = SectionConstraints {
        density: "medium".to_string(),
        silence: String::new(),
    };

    if let Some(pack) = section.directives.get("pack").map(ParamValue::as_text) {
        match pack.as_str() {
            "resist_resolution" => {
                state.density = "low".to_string();
                state.silence = "medium".to_string();
            }
            "long_breath" => {
                state.density = "very_low".to_string();
                state.silence = "long".to_string();
            }
            "sparse_events" => {
                state.density = "very_low".to_string();
            }
            "monolithic_decl" => {
                state.density = "low".to_string();
                state.silence = "long".to_string();
            }
            _ => {}
        }
    }
    if let Some(density) = section.directives.get("density").map(ParamValue::as_text) {
        state.density = density;
    }
    if let Some(silence) = section.directives.get("silence").map(ParamValue::as_text) {
        state.silence = silence;
    }
    state
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::UnitNumber;
    use std::collections::BTreeMap;

    fn section_with_directive(key: &str, value: ParamValue) -> SectionDefinition {
        let mut directives = BTreeMap::new();
        directives.insert(key.to_string(), value);
        SectionDefinition {
            name: "s".to_string(),
            at: UnitNumber::zero(),
            dur: UnitNumber::new(1.0, "s"),
            directives,
            events: vec![],
        }
    }

    #[test]
    fn pack_sets_both_density_and_silence() {
        let section = section_with_directive("pack", ParamValue::Identifier("resist_resolution".to_string()));
        let state = resolve_section_constraints(&section);
        assert_eq!(state.density, "low");
        assert_eq!(state.silence, "medium");
    }

    #[test]
    fn explicit_density_overrides_pack() {
        let mut directives = BTreeMap::new();
        directives.insert("pack".to_string(), ParamValue::Identifier("long_breath".to_string()));
        directives.insert("density".to_string(), ParamValue::Identifier("high".to_string()));
        let section = SectionDefinition {
            name: "s".to_string(),
            at: UnitNumber::zero(),
            dur: UnitNumber::new(1.0, "s"),
            directives,
            events: vec![],
        };
        let state = resolve_section_constraints(&section);
        assert_eq!(state.density, "high");
        assert_eq!(state.silence, "long");
    }

    #[test]
    fn density_presets_match_exact_multipliers() {
        let low = density_from_preset("low");
        assert_eq!(low.rate_multiplier, 0.75);
        assert_eq!(low.max_events_per_minute, 16);
        assert_eq!(silence_probability("short"), 0.15);
    }
}
