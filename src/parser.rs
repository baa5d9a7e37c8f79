//! Recursive-descent parser: tokens -> [`ast::Document`].
//!
//! The grammar is uniform: every block is `KEYWORD IDENT? { object-body }`,
//! and every value inside an object or list is one of the
//! [`ParamValue`](crate::value::ParamValue) literal forms. Section-level
//! constructs (`play`/`trigger`/`gate`/`set`/`automate`/`seq`/`repeat`/`use`)
//! are themselves objects tagged by a `kind` field rather than bespoke
//! statement syntax, so the same
//! `parse_value`/`parse_object_body` pair drives the whole language; reusable
//! `pattern { }` blocks and `use` entries are expanded into concrete
//! sections after parsing, in this module, before the document is returned.

use std::collections::BTreeMap;

use crate::ast::*;
use crate::error::{AuroraError, ParseError};
use crate::lexer::{self, Token, TokenKind};
use crate::value::{Call, ParamValue};

pub fn parse(source: &str) -> Result<Document, AuroraError> {
    let tokens = lexer::tokenize(source)?;
    let mut parser = Parser::new(tokens);
    parser.parse_document().map_err(AuroraError::from)
}

struct Pattern {
    at: UnitNumber,
    dur: UnitNumber,
    directives: BTreeMap<String, ParamValue>,
    events: Vec<SectionEvent>,
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
    patterns: BTreeMap<String, Pattern>,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            position: 0,
            patterns: BTreeMap::new(),
        }
    }

    fn at_end(&self) -> bool {
        self.peek().kind == TokenKind::End
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or_else(|| self.tokens.last().unwrap())
    }

    fn consume(&mut self) -> Token {
        let t = self.peek().clone();
        if !self.at_end() {
            self.position += 1;
        }
        t
    }

    fn match_symbol(&mut self, symbol: char) -> bool {
        let t = self.peek();
        if t.kind == TokenKind::Symbol && t.text.len() == 1 && t.text.chars().next() == Some(symbol) {
            self.consume();
            true
        } else {
            false
        }
    }

    fn match_identifier(&mut self, identifier: &str) -> bool {
        let t = self.peek();
        if t.kind == TokenKind::Identifier && t.text == identifier {
            self.consume();
            true
        } else {
            false
        }
    }

    fn expect_symbol(&mut self, symbol: char, context: &str) -> Result<(), ParseError> {
        if self.match_symbol(symbol) {
            Ok(())
        } else {
            let t = self.peek();
            Err(ParseError::new(
                t.line,
                t.column,
                format!("expected '{symbol}' in {context}"),
            ))
        }
    }

    fn expect_identifier_like(&mut self, context: &str) -> Result<String, ParseError> {
        let t = self.peek().clone();
        if t.kind == TokenKind::Identifier || t.kind == TokenKind::String {
            self.consume();
            Ok(t.text)
        } else {
            Err(ParseError::new(t.line, t.column, format!("expected identifier in {context}")))
        }
    }

    fn parse_value(&mut self) -> Result<ParamValue, ParseError> {
        let t = self.peek().clone();
        match t.kind {
            TokenKind::String => {
                self.consume();
                Ok(ParamValue::String(t.text))
            }
            TokenKind::Number => {
                self.consume();
                let (value, unit) = lexer::split_number_unit(&t.text)
                    .ok_or_else(|| ParseError::new(t.line, t.column, format!("invalid numeric literal: {}", t.text)))?;
                if unit.is_empty() {
                    Ok(ParamValue::Number(value))
                } else {
                    Ok(ParamValue::Unit(crate::value::UnitNumber::new(value, unit)))
                }
            }
            TokenKind::Identifier => {
                self.consume();
                if t.text == "true" {
                    return Ok(ParamValue::Bool(true));
                }
                if t.text == "false" {
                    return Ok(ParamValue::Bool(false));
                }
                if self.match_symbol('(') {
                    let mut args = Vec::new();
                    if !self.match_symbol(')') {
                        loop {
                            args.push(self.parse_value()?);
                            if self.match_symbol(')') {
                                break;
                            }
                            self.expect_symbol(',', "call arguments")?;
                        }
                    }
                    return Ok(ParamValue::Call(Call { callee: t.text, args }));
                }
                Ok(ParamValue::Identifier(t.text))
            }
            TokenKind::Symbol if t.text == "{" => {
                self.consume();
                let mut object = BTreeMap::new();
                if !self.match_symbol('}') {
                    loop {
                        let key_token = self.peek().clone();
                        if !matches!(
                            key_token.kind,
                            TokenKind::Identifier | TokenKind::String | TokenKind::Number
                        ) {
                            return Err(ParseError::new(key_token.line, key_token.column, "expected object key"));
                        }
                        self.consume();
                        self.expect_symbol(':', "object key/value pair")?;
                        let value = self.parse_value()?;
                        object.insert(key_token.text, value);
                        if self.match_symbol('}') {
                            break;
                        }
                        self.match_symbol(',');
                    }
                }
                Ok(ParamValue::Object(object))
            }
            TokenKind::Symbol if t.text == "[" => {
                self.consume();
                let mut list = Vec::new();
                if !self.match_symbol(']') {
                    loop {
                        list.push(self.parse_value()?);
                        if self.match_symbol(']') {
                            break;
                        }
                        self.expect_symbol(',', "list literal")?;
                    }
                }
                Ok(ParamValue::List(list))
            }
            _ => Err(ParseError::new(t.line, t.column, "expected value literal")),
        }
    }

    fn parse_object_body(&mut self) -> Result<BTreeMap<String, ParamValue>, ParseError> {
        self.expect_symbol('{', "object body")?;
        let mut object = BTreeMap::new();
        if self.match_symbol('}') {
            return Ok(object);
        }
        loop {
            let key_token = self.peek().clone();
            if !matches!(
                key_token.kind,
                TokenKind::Identifier | TokenKind::String | TokenKind::Number
            ) {
                return Err(ParseError::new(key_token.line, key_token.column, "expected object key"));
            }
            self.consume();
            self.expect_symbol(':', "object key/value pair")?;
            let value = self.parse_value()?;
            object.insert(key_token.text, value);
            if self.match_symbol('}') {
                break;
            }
            self.match_symbol(',');
        }
        Ok(object)
    }

    fn parse_document(&mut self) -> Result<Document, ParseError> {
        let mut document = Document::new("");
        while !self.at_end() {
            if self.match_identifier("aurora") {
                let body = self.parse_object_body()?;
                document.version = field_string(&body, "version").unwrap_or_default();
            } else if self.match_identifier("assets") {
                let body = self.parse_object_body()?;
                document.assets = parse_assets(&body);
            } else if self.match_identifier("outputs") {
                let body = self.parse_object_body()?;
                document.outputs = parse_outputs(&body);
            } else if self.match_identifier("globals") {
                let body = self.parse_object_body()?;
                document.globals = parse_globals(&body)?;
            } else if self.match_identifier("bus") {
                let name = self.expect_identifier_like("bus name")?;
                let body = self.parse_object_body()?;
                document.buses.push(parse_bus(name, &body)?);
            } else if self.match_identifier("patch") {
                let name = self.expect_identifier_like("patch name")?;
                let body = self.parse_object_body()?;
                document.patches.push(parse_patch(name, &body)?);
            } else if self.match_identifier("pattern") {
                let name = self.expect_identifier_like("pattern name")?;
                let body = self.parse_object_body()?;
                let pattern = self.parse_pattern(&body)?;
                self.patterns.insert(name, pattern);
            } else if self.match_identifier("section") {
                let name = self.expect_identifier_like("section name")?;
                let body = self.parse_object_body()?;
                document.sections.push(self.parse_section(name, &body)?);
            } else if self.match_identifier("score") {
                let body = self.parse_object_body()?;
                let mut expanded = self.expand_score(&body)?;
                document.sections.append(&mut expanded);
            } else {
                let t = self.peek();
                return Err(ParseError::new(t.line, t.column, format!("unexpected top-level token: {}", t.text)));
            }
        }
        if document.version.is_empty() {
            let t = self.tokens.first().cloned().unwrap_or(Token {
                kind: TokenKind::End,
                text: String::new(),
                line: 1,
                column: 1,
            });
            return Err(ParseError::new(t.line, t.column, "missing aurora { version: \"...\" } header"));
        }
        Ok(document)
    }

    /// `score { sections: [ {...} | {use: NAME, at: T, repeat: N} | {use: NAME, at: T, loop_for: D} ] }`
    fn expand_score(&mut self, body: &BTreeMap<String, ParamValue>) -> Result<Vec<SectionDefinition>, ParseError> {
        let mut out = Vec::new();
        let entries = body
            .get("sections")
            .and_then(ParamValue::as_list)
            .map(<[ParamValue]>::to_vec)
            .unwrap_or_default();
        for entry in entries {
            let obj = entry
                .as_object()
                .cloned()
                .ok_or_else(|| ParseError::new(0, 0, "score.sections entries must be objects"))?;
            if let Some(use_name) = field_string(&obj, "use") {
                out.extend(self.expand_pattern_use(&use_name, &obj)?);
            } else {
                let name = field_string(&obj, "name").unwrap_or_default();
                out.push(self.parse_section(name, &obj)?);
            }
        }
        Ok(out)
    }

    fn expand_pattern_use(
        &self,
        pattern_name: &str,
        use_obj: &BTreeMap<String, ParamValue>,
    ) -> Result<Vec<SectionDefinition>, ParseError> {
        let pattern = self
            .patterns
            .get(pattern_name)
            .ok_or_else(|| ParseError::new(0, 0, format!("use references undefined pattern '{pattern_name}'")))?;
        let at = field_unit(use_obj, "at", "s").unwrap_or_else(UnitNumber::zero);
        let span = compute_span(&pattern.at, &pattern.dur);

        let repeats: Vec<UnitNumber> = if let Some(count) = use_obj.get("repeat").and_then(ParamValue::try_number) {
            (0..count.round().max(0.0) as u64)
                .map(|i| add_units(&at, &mul_unit(&span, i as f64)))
                .collect::<Result<Vec<_>, _>>()?
        } else if let Some(loop_dur) = use_obj.get("loop_for") {
            let loop_unit = loop_dur.as_unit_or("s");
            let mut offsets = Vec::new();
            let mut elapsed = 0.0;
            let mut i = 0u64;
            while elapsed < loop_unit.value {
                offsets.push(add_units(&at, &mul_unit(&span, i as f64))?);
                elapsed += span.value;
                i += 1;
            }
            offsets
        } else {
            vec![at.clone()]
        };

        let mut out = Vec::with_capacity(repeats.len());
        for (i, offset) in repeats.into_iter().enumerate() {
            let shift = add_units(&offset, &UnitNumber::new(-pattern.at.value, pattern.at.unit.clone()))?;
            let events = pattern
                .events
                .iter()
                .map(|event| shift_section_event(event, &shift))
                .collect::<Result<Vec<_>, _>>()?;
            out.push(SectionDefinition {
                name: format!("{pattern_name}#{i}"),
                at: offset,
                dur: pattern.dur.clone(),
                directives: pattern.directives.clone(),
                events,
            });
        }
        Ok(out)
    }
}

fn field_string(obj: &BTreeMap<String, ParamValue>, key: &str) -> Option<String> {
    obj.get(key).map(ParamValue::as_text)
}

fn field_unit(obj: &BTreeMap<String, ParamValue>, key: &str, default_unit: &str) -> Option<UnitNumber> {
    obj.get(key).map(|v| {
        let u = v.as_unit_or(default_unit);
        UnitNumber::new(u.value, u.unit)
    })
}

fn field_number(obj: &BTreeMap<String, ParamValue>, key: &str, fallback: f64) -> f64 {
    obj.get(key).map(|v| v.as_number_or(fallback)).unwrap_or(fallback)
}

fn field_bool(obj: &BTreeMap<String, ParamValue>, key: &str, fallback: bool) -> bool {
    match obj.get(key) {
        Some(ParamValue::Bool(b)) => *b,
        _ => fallback,
    }
}

fn field_object(obj: &BTreeMap<String, ParamValue>, key: &str) -> BTreeMap<String, ParamValue> {
    obj.get(key).and_then(ParamValue::as_object).cloned().unwrap_or_default()
}

fn field_list(obj: &BTreeMap<String, ParamValue>, key: &str) -> Vec<ParamValue> {
    obj.get(key).and_then(ParamValue::as_list).map(<[ParamValue]>::to_vec).unwrap_or_default()
}

/// Adds two unit numbers; an empty unit on either side is a wildcard that
/// takes on the other side's unit.
pub fn add_units(a: &UnitNumber, b: &UnitNumber) -> Result<UnitNumber, ParseError> {
    if a.unit.is_empty() {
        Ok(UnitNumber::new(a.value + b.value, b.unit.clone()))
    } else if b.unit.is_empty() {
        Ok(UnitNumber::new(a.value + b.value, a.unit.clone()))
    } else if a.unit == b.unit {
        Ok(UnitNumber::new(a.value + b.value, a.unit.clone()))
    } else {
        Err(ParseError::new(
            0,
            0,
            format!("cannot add mismatched time units '{}' and '{}'", a.unit, b.unit),
        ))
    }
}

pub fn mul_unit(a: &UnitNumber, scalar: f64) -> UnitNumber {
    UnitNumber::new(a.value * scalar, a.unit.clone())
}

/// `span = at + dur`, using the wildcard-aware `add_units`.
pub fn compute_span(at: &UnitNumber, dur: &UnitNumber) -> UnitNumber {
    add_units(at, dur).unwrap_or_else(|_| dur.clone())
}

fn shift_section_event(event: &SectionEvent, offset: &UnitNumber) -> Result<SectionEvent, ParseError> {
    Ok(match event {
        SectionEvent::Play(play) => SectionEvent::Play(PlayEvent {
            at: add_units(&play.at, offset)?,
            ..play.clone()
        }),
        SectionEvent::Automate(automate) => SectionEvent::Automate(AutomateEvent {
            points: automate
                .points
                .iter()
                .map(|(t, v)| Ok((add_units(t, offset)?, v.clone())))
                .collect::<Result<Vec<_>, ParseError>>()?,
            ..automate.clone()
        }),
        SectionEvent::Seq(seq) => {
            let mut fields = seq.fields.clone();
            if let Some(at_value) = fields.get("at") {
                let at = at_value.as_unit_or("s");
                let shifted = add_units(&UnitNumber::new(at.value, at.unit), offset)?;
                fields.insert(
                    "at".to_string(),
                    ParamValue::Unit(crate::value::UnitNumber::new(shifted.value, shifted.unit)),
                );
            }
            SectionEvent::Seq(SeqEvent {
                patch: seq.patch.clone(),
                fields,
            })
        }
    })
}

/// The span an in-section `repeat`/`use` block shifts by: the furthest a
/// contained event reaches past the start of the block (spec.md §4.2),
/// `max(play.at+dur, seq.at+dur, automation point range)`.
fn events_body_span(events: &[SectionEvent]) -> UnitNumber {
    let mut span = UnitNumber::zero();
    for event in events {
        let candidate = match event {
            SectionEvent::Play(play) => compute_span(&play.at, &play.dur),
            SectionEvent::Seq(seq) => {
                let at = field_unit(&seq.fields, "at", "s").unwrap_or_else(UnitNumber::zero);
                let dur = field_unit(&seq.fields, "dur", "s").unwrap_or_else(UnitNumber::zero);
                compute_span(&at, &dur)
            }
            SectionEvent::Automate(automate) => automate
                .points
                .iter()
                .map(|(t, _)| t.clone())
                .fold(UnitNumber::zero(), |max, t| if t.value > max.value { t } else { max }),
        };
        if candidate.value > span.value {
            span = candidate;
        }
    }
    span
}

fn parse_assets(obj: &BTreeMap<String, ParamValue>) -> AssetsDefinition {
    let samples = field_object(obj, "samples")
        .into_iter()
        .map(|(k, v)| (k, v.as_text()))
        .collect();
    AssetsDefinition {
        samples_dir: field_string(obj, "samples_dir").unwrap_or_default(),
        samples,
    }
}

fn parse_outputs(obj: &BTreeMap<String, ParamValue>) -> OutputsDefinition {
    let defaults = OutputsDefinition::default();
    OutputsDefinition {
        stems_dir: field_string(obj, "stems_dir").unwrap_or(defaults.stems_dir),
        midi_dir: field_string(obj, "midi_dir").unwrap_or(defaults.midi_dir),
        mix_dir: field_string(obj, "mix_dir").unwrap_or(defaults.mix_dir),
        meta_dir: field_string(obj, "meta_dir").unwrap_or(defaults.meta_dir),
        master: field_string(obj, "master").unwrap_or(defaults.master),
        render_json: field_string(obj, "render_json").unwrap_or(defaults.render_json),
    }
}

fn parse_globals(obj: &BTreeMap<String, ParamValue>) -> Result<GlobalsDefinition, ParseError> {
    let defaults = GlobalsDefinition::default();
    let tempo_map = field_list(obj, "tempo_map")
        .into_iter()
        .map(|v| {
            let point_obj = v.as_object().cloned().unwrap_or_default();
            TempoPoint {
                at: field_unit(&point_obj, "at", "beats").unwrap_or_else(UnitNumber::zero),
                bpm: field_number(&point_obj, "bpm", 60.0),
            }
        })
        .collect();
    let tail_policy = match field_object(obj, "tail_policy").get("fixed_seconds") {
        Some(v) => TailPolicy::Fixed {
            seconds: v.as_number_or(0.0),
        },
        None => TailPolicy::default(),
    };
    Ok(GlobalsDefinition {
        sr: field_number(obj, "sr", defaults.sr as f64) as u32,
        block: field_number(obj, "block", defaults.block as f64) as u32,
        tempo: obj.get("tempo").and_then(ParamValue::try_number),
        tempo_map,
        tail_policy,
    })
}

fn parse_graph(obj: &BTreeMap<String, ParamValue>) -> GraphDefinition {
    let graph_obj = field_object(obj, "graph");
    let nodes = field_list(&graph_obj, "nodes")
        .into_iter()
        .filter_map(|n| n.as_object().cloned())
        .map(|node_obj| GraphNode {
            id: field_string(&node_obj, "id").unwrap_or_default(),
            node_type: field_string(&node_obj, "type").unwrap_or_default(),
            params: field_object(&node_obj, "params"),
        })
        .collect();
    let connections = field_list(&graph_obj, "connect")
        .into_iter()
        .filter_map(|c| c.as_object().cloned())
        .map(|conn_obj| GraphConnection {
            from: field_string(&conn_obj, "from").unwrap_or_default(),
            to: field_string(&conn_obj, "to").unwrap_or_default(),
            rate: field_string(&conn_obj, "rate").unwrap_or_else(|| "audio".to_string()),
            map: field_object(&conn_obj, "map"),
        })
        .collect();
    GraphDefinition {
        nodes,
        connections,
        out: field_string(&graph_obj, "out").unwrap_or_default(),
    }
}

fn parse_bus(name: String, obj: &BTreeMap<String, ParamValue>) -> Result<BusDefinition, ParseError> {
    Ok(BusDefinition {
        name,
        out_stem: field_string(obj, "out_stem").unwrap_or_default(),
        graph: parse_graph(obj),
    })
}

fn parse_patch(name: String, obj: &BTreeMap<String, ParamValue>) -> Result<PatchDefinition, ParseError> {
    let defaults = PatchDefinition::default();
    let binaural_obj = field_object(obj, "binaural");
    let send = obj.get("send").and_then(ParamValue::as_object).map(|s| SendDefinition {
        bus: field_string(s, "bus").unwrap_or_default(),
        amount_db: field_number(s, "amount_db", 0.0),
    });
    Ok(PatchDefinition {
        name,
        poly: field_number(obj, "poly", defaults.poly as f64) as u32,
        voice_steal: field_string(obj, "voice_steal").unwrap_or(defaults.voice_steal),
        mono: field_bool(obj, "mono", defaults.mono),
        legato: field_bool(obj, "legato", defaults.legato),
        retrig: field_string(obj, "retrig").unwrap_or(defaults.retrig),
        binaural: BinauralDefinition {
            enabled: field_bool(&binaural_obj, "enabled", false),
            shift_hz: field_number(&binaural_obj, "shift_hz", 0.0),
            mix: field_number(&binaural_obj, "mix", 1.0),
        },
        out_stem: field_string(obj, "out_stem").unwrap_or_default(),
        send,
        graph: parse_graph(obj),
    })
}

/// A `play`/`trigger`/`gate` event, differing only in the `dur` default
/// (spec.md §4.2): `play` has none, `trigger` defaults to 10ms, `gate` to 250ms.
fn parse_play_like(event_obj: &BTreeMap<String, ParamValue>, default_dur: UnitNumber) -> PlayEvent {
    PlayEvent {
        patch: field_string(event_obj, "patch").unwrap_or_default(),
        at: field_unit(event_obj, "at", "s").unwrap_or_else(UnitNumber::zero),
        dur: field_unit(event_obj, "dur", "s").unwrap_or(default_dur),
        vel: field_number(event_obj, "vel", 1.0),
        pitch_values: field_list(event_obj, "pitch"),
        params: field_object(event_obj, "params"),
    }
}

impl Parser {
    fn parse_events(&self, obj: &BTreeMap<String, ParamValue>) -> Result<Vec<SectionEvent>, ParseError> {
        let mut events = Vec::new();
        for entry in field_list(obj, "events") {
            let event_obj = entry
                .as_object()
                .cloned()
                .ok_or_else(|| ParseError::new(0, 0, "section events must be objects"))?;
            let kind = field_string(&event_obj, "kind").unwrap_or_default();
            match kind.as_str() {
                "play" => events.push(SectionEvent::Play(parse_play_like(&event_obj, UnitNumber::zero()))),
                "trigger" => events.push(SectionEvent::Play(parse_play_like(&event_obj, UnitNumber::new(0.010, "s")))),
                "gate" => events.push(SectionEvent::Play(parse_play_like(&event_obj, UnitNumber::new(0.250, "s")))),
                "set" => {
                    let target = field_string(&event_obj, "target").unwrap_or_default();
                    let at = field_unit(&event_obj, "at", "s").unwrap_or_else(UnitNumber::zero);
                    let value = event_obj.get("value").cloned().unwrap_or(ParamValue::Null);
                    events.push(SectionEvent::Automate(AutomateEvent {
                        target,
                        curve: "step".to_string(),
                        points: vec![(at, value)],
                    }));
                }
                "automate" => {
                    let points = field_list(&event_obj, "points")
                        .into_iter()
                        .filter_map(|p| p.as_list().map(<[ParamValue]>::to_vec))
                        .filter(|pair| pair.len() == 2)
                        .map(|pair| (pair[0].as_unit_or("s"), pair[1].clone()))
                        .map(|(u, v)| (UnitNumber::new(u.value, u.unit), v))
                        .collect();
                    events.push(SectionEvent::Automate(AutomateEvent {
                        target: field_string(&event_obj, "target").unwrap_or_default(),
                        curve: field_string(&event_obj, "curve").unwrap_or_else(|| "linear".to_string()),
                        points,
                    }));
                }
                "seq" => {
                    let mut fields = event_obj.clone();
                    fields.remove("kind");
                    let patch = field_string(&fields, "patch").unwrap_or_default();
                    fields.remove("patch");
                    events.push(SectionEvent::Seq(SeqEvent { patch, fields }));
                }
                "repeat" => {
                    let count = event_obj.get("count").and_then(ParamValue::try_number).unwrap_or(1.0).max(1.0) as u64;
                    let body = self.parse_events(&event_obj)?;
                    let span = events_body_span(&body);
                    for i in 0..count {
                        let shift = mul_unit(&span, i as f64);
                        for event in &body {
                            events.push(shift_section_event(event, &shift)?);
                        }
                    }
                }
                "use" => {
                    let pattern_name = field_string(&event_obj, "pattern").unwrap_or_default();
                    let count = event_obj.get("count").and_then(ParamValue::try_number).unwrap_or(1.0).max(1.0) as u64;
                    let pattern = self.patterns.get(&pattern_name).ok_or_else(|| {
                        ParseError::new(0, 0, format!("use references undefined pattern '{pattern_name}'"))
                    })?;
                    let span = compute_span(&pattern.at, &pattern.dur);
                    let body = pattern.events.clone();
                    for i in 0..count {
                        let shift = mul_unit(&span, i as f64);
                        for event in &body {
                            events.push(shift_section_event(event, &shift)?);
                        }
                    }
                }
                other => {
                    return Err(ParseError::new(0, 0, format!("unknown section event kind '{other}'")));
                }
            }
        }
        Ok(events)
    }

    fn parse_section(&self, name: String, obj: &BTreeMap<String, ParamValue>) -> Result<SectionDefinition, ParseError> {
        let at = field_unit(obj, "at", "s").unwrap_or_else(UnitNumber::zero);
        let dur = field_unit(obj, "dur", "s").unwrap_or_else(UnitNumber::zero);
        let events = self.parse_events(obj)?;
        if at.value == 0.0 && dur.value == 0.0 && events.is_empty() && obj.get("dur").is_none() {
            return Err(ParseError::new(0, 0, format!("section '{name}' has zero span")));
        }
        Ok(SectionDefinition {
            name,
            at,
            dur,
            directives: field_object(obj, "directives"),
            events,
        })
    }

    fn parse_pattern(&self, obj: &BTreeMap<String, ParamValue>) -> Result<Pattern, ParseError> {
        Ok(Pattern {
            at: field_unit(obj, "at", "s").unwrap_or_else(UnitNumber::zero),
            dur: field_unit(obj, "dur", "s").unwrap_or_else(UnitNumber::zero),
            directives: field_object(obj, "directives"),
            events: self.parse_events(obj)?,
        })
    }
}
