//! Typed entity extraction from normalized clause text.
//!
//! Numbers are typed individually by looking at the tokens in front of them,
//! so one clause can carry a distance, a feed rate and a step size at once.

use crate::fuzzy::similarity;
use machine_link::{Axis, ProbeKind, SpindleDirection};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::intent::Intent;

/// Which axes a command addresses.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum AxisSelection {
    Single(Axis),
    XY,
    XYZ,
}

impl AxisSelection {
    pub fn axes(&self) -> &'static [Axis] {
        match self {
            AxisSelection::Single(Axis::X) => &[Axis::X],
            AxisSelection::Single(Axis::Y) => &[Axis::Y],
            AxisSelection::Single(Axis::Z) => &[Axis::Z],
            AxisSelection::XY => &[Axis::X, Axis::Y],
            AxisSelection::XYZ => &[Axis::X, Axis::Y, Axis::Z],
        }
    }
}

/// Jog direction words. The Y sign of forward/back depends on the machine's
/// home corner and is resolved during synthesis, not here.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum MoveDirection {
    Up,
    Down,
    Left,
    Right,
    Forward,
    Back,
}

/// Speed words scale the effective feed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum SpeedModifier {
    Creep,
    Slow,
    Medium,
    Normal,
    Fast,
}

impl SpeedModifier {
    pub fn multiplier(&self) -> f64 {
        match self {
            SpeedModifier::Creep => 0.05,
            SpeedModifier::Slow => 0.1,
            SpeedModifier::Medium => 0.5,
            SpeedModifier::Normal => 1.0,
            SpeedModifier::Fast => 3.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum EntityType {
    Axis,
    Direction,
    Distance,
    FeedRate,
    StepSize,
    SpindleRpm,
    ToolNumber,
    Coordinate,
    SpeedModifier,
    ProbeType,
    Workspace,
    SpindleDirection,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum EntityValue {
    Axis(AxisSelection),
    Direction(MoveDirection),
    Number(f64),
    Integer(i64),
    Coordinate { axis: Axis, value: f64 },
    Modifier(SpeedModifier),
    Probe(ProbeKind),
    Spindle(SpindleDirection),
    Text(String),
}

/// One extracted parameter, with the byte span it was matched from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityType,
    pub value: EntityValue,
    pub span: (usize, usize),
    pub confidence: f32,
}

impl Entity {
    pub fn as_number(&self) -> Option<f64> {
        match self.value {
            EntityValue::Number(n) => Some(n),
            EntityValue::Integer(i) => Some(i as f64),
            EntityValue::Coordinate { value, .. } => Some(value),
            _ => None,
        }
    }
}

/// Map a token to a direction, if it is one. Shared with the classifier's
/// bare-direction fallback.
pub fn direction_word(word: &str) -> Option<MoveDirection> {
    match word {
        "up" => Some(MoveDirection::Up),
        "down" => Some(MoveDirection::Down),
        "left" => Some(MoveDirection::Left),
        "right" => Some(MoveDirection::Right),
        "forward" | "forwards" => Some(MoveDirection::Forward),
        "back" | "backward" | "backwards" => Some(MoveDirection::Back),
        _ => None,
    }
}

fn modifier_word(word: &str) -> Option<SpeedModifier> {
    match word {
        "creep" | "crawl" => Some(SpeedModifier::Creep),
        "slow" | "slowly" => Some(SpeedModifier::Slow),
        "medium" => Some(SpeedModifier::Medium),
        "normal" => Some(SpeedModifier::Normal),
        "fast" | "quick" | "quickly" | "rapid" => Some(SpeedModifier::Fast),
        _ => None,
    }
}

#[derive(Clone, Copy, Debug)]
struct Token<'a> {
    text: &'a str,
    start: usize,
    end: usize,
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"\S+").expect("invalid built-in pattern - this is a bug"));
    re.find_iter(text)
        .map(|m| Token {
            text: m.as_str(),
            start: m.start(),
            end: m.end(),
        })
        .collect()
}

/// Extract all typed entities from a normalized clause, using the classified
/// intent for context where a bare number is otherwise ambiguous.
pub fn extract(text: &str, intent: Intent) -> Vec<Entity> {
    let tokens = tokenize(text);
    let mut entities = Vec::new();

    extract_axis(&tokens, &mut entities);
    extract_directions(&tokens, &mut entities);
    extract_numbers(&tokens, intent, &mut entities);
    extract_modifier(&tokens, &mut entities);

    match intent {
        Intent::Probe | Intent::SetProbeType => extract_probe_type(&tokens, &mut entities),
        Intent::SetWorkspace => extract_workspace(&tokens, &mut entities),
        Intent::SpindleOn | Intent::SetSpindleSpeed => {
            extract_spindle_direction(&tokens, &mut entities);
        }
        _ => {}
    }

    entities
}

/// Longest known axis token first; at most one axis entity per clause.
fn extract_axis(tokens: &[Token<'_>], entities: &mut Vec<Entity>) {
    // Compound selections outrank single letters wherever they appear.
    for t in tokens {
        let sel = match t.text {
            "xyz" | "all" | "everything" => Some(AxisSelection::XYZ),
            "xy" => Some(AxisSelection::XY),
            _ => None,
        };
        if let Some(sel) = sel {
            entities.push(Entity {
                kind: EntityType::Axis,
                value: EntityValue::Axis(sel),
                span: (t.start, t.end),
                confidence: 0.9,
            });
            return;
        }
    }
    for t in tokens {
        let axis = match t.text {
            "x" => Some(Axis::X),
            "y" => Some(Axis::Y),
            "z" => Some(Axis::Z),
            _ => None,
        };
        if let Some(axis) = axis {
            entities.push(Entity {
                kind: EntityType::Axis,
                value: EntityValue::Axis(AxisSelection::Single(axis)),
                span: (t.start, t.end),
                confidence: 0.9,
            });
            return;
        }
    }
    // Fuzzy fallback for the compound words only; single letters are too
    // short to fuzz meaningfully.
    for t in tokens {
        if t.text.len() >= 2 && similarity(t.text, "all") >= 0.8 {
            entities.push(Entity {
                kind: EntityType::Axis,
                value: EntityValue::Axis(AxisSelection::XYZ),
                span: (t.start, t.end),
                confidence: 0.75,
            });
            return;
        }
    }
}

fn extract_directions(tokens: &[Token<'_>], entities: &mut Vec<Entity>) {
    for t in tokens {
        if let Some(dir) = direction_word(t.text) {
            entities.push(Entity {
                kind: EntityType::Direction,
                value: EntityValue::Direction(dir),
                span: (t.start, t.end),
                confidence: 0.8,
            });
        }
    }
}

/// Type every numeric literal independently, left to right, by inspecting
/// the tokens that precede it.
fn extract_numbers(tokens: &[Token<'_>], intent: Intent, entities: &mut Vec<Entity>) {
    let mut intent_default_used = false;

    for (i, t) in tokens.iter().enumerate() {
        let Ok(value) = t.text.parse::<f64>() else {
            continue;
        };
        let prev = i.checked_sub(1).map(|j| tokens[j].text);
        let prev2 = i.checked_sub(2).map(|j| tokens[j].text);

        let typed = match (prev2, prev) {
            (Some("feed"), Some("rate")) => Some(EntityType::FeedRate),
            (_, Some("feed" | "speed")) => Some(EntityType::FeedRate),
            (Some("step"), Some("size")) => Some(EntityType::StepSize),
            (_, Some("step")) => Some(EntityType::StepSize),
            (_, Some("rpm" | "spindle")) => Some(EntityType::SpindleRpm),
            (_, Some("tool" | "t")) => Some(EntityType::ToolNumber),
            (_, Some("x")) => Some(EntityType::Coordinate),
            (_, Some("y")) => Some(EntityType::Coordinate),
            (_, Some("z")) => Some(EntityType::Coordinate),
            _ => None,
        };

        let kind = typed.unwrap_or_else(|| {
            // The first number a setting intent does not otherwise claim
            // defaults to that setting's type.
            let default = if intent_default_used {
                None
            } else {
                match intent {
                    Intent::SetFeed => Some(EntityType::FeedRate),
                    Intent::SetStep => Some(EntityType::StepSize),
                    Intent::SetSpindleSpeed | Intent::SpindleOn => Some(EntityType::SpindleRpm),
                    Intent::ToolChange => Some(EntityType::ToolNumber),
                    _ => None,
                }
            };
            if default.is_some() {
                intent_default_used = true;
            }
            default.unwrap_or(EntityType::Distance)
        });

        let entity_value = match kind {
            EntityType::ToolNumber => EntityValue::Integer(value as i64),
            EntityType::Coordinate => {
                let axis = match prev {
                    Some("x") => Axis::X,
                    Some("y") => Axis::Y,
                    _ => Axis::Z,
                };
                EntityValue::Coordinate { axis, value }
            }
            _ => EntityValue::Number(value),
        };

        entities.push(Entity {
            kind,
            value: entity_value,
            span: (t.start, t.end),
            confidence: 0.9,
        });
    }
}

fn extract_modifier(tokens: &[Token<'_>], entities: &mut Vec<Entity>) {
    for t in tokens {
        if let Some(m) = modifier_word(t.text) {
            entities.push(Entity {
                kind: EntityType::SpeedModifier,
                value: EntityValue::Modifier(m),
                span: (t.start, t.end),
                confidence: 0.85,
            });
            return; // at most one
        }
    }
}

fn extract_probe_type(tokens: &[Token<'_>], entities: &mut Vec<Entity>) {
    for t in tokens {
        let kind = match t.text {
            "corner" => Some(ProbeKind::Corner),
            "center" | "centre" => Some(ProbeKind::Center),
            "z" => Some(ProbeKind::ZTouch),
            _ => None,
        };
        if let Some(kind) = kind {
            entities.push(Entity {
                kind: EntityType::ProbeType,
                value: EntityValue::Probe(kind),
                span: (t.start, t.end),
                confidence: 0.8,
            });
            return;
        }
    }
}

fn extract_workspace(tokens: &[Token<'_>], entities: &mut Vec<Entity>) {
    static G5X: OnceLock<Regex> = OnceLock::new();
    let g5x = G5X.get_or_init(|| {
        Regex::new(r"^g5[4-9]$").expect("invalid built-in pattern - this is a bug")
    });
    for t in tokens {
        let ws = if g5x.is_match(t.text) {
            Some(t.text.to_uppercase())
        } else {
            ordinal_workspace(t.text).map(str::to_string)
        };
        if let Some(ws) = ws {
            entities.push(Entity {
                kind: EntityType::Workspace,
                value: EntityValue::Text(ws),
                span: (t.start, t.end),
                confidence: 0.8,
            });
            return;
        }
    }
}

fn ordinal_workspace(word: &str) -> Option<&'static str> {
    match word {
        "first" => Some("G54"),
        "second" => Some("G55"),
        "third" => Some("G56"),
        "fourth" => Some("G57"),
        "fifth" => Some("G58"),
        "sixth" => Some("G59"),
        _ => None,
    }
}

fn extract_spindle_direction(tokens: &[Token<'_>], entities: &mut Vec<Entity>) {
    for t in tokens {
        let dir = match t.text {
            "clockwise" | "cw" => Some(SpindleDirection::Clockwise),
            "counterclockwise" | "anticlockwise" | "ccw" | "reverse" => {
                Some(SpindleDirection::CounterClockwise)
            }
            _ => None,
        };
        if let Some(dir) = dir {
            entities.push(Entity {
                kind: EntityType::SpindleDirection,
                value: EntityValue::Spindle(dir),
                span: (t.start, t.end),
                confidence: 0.8,
            });
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(entities: &[Entity]) -> Vec<EntityType> {
        entities.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn numbers_are_typed_by_preceding_tokens() {
        let e = extract("move right 500 at feed rate 6000 step 10", Intent::Jog);
        let nums: Vec<(EntityType, f64)> = e
            .iter()
            .filter_map(|e| e.as_number().map(|n| (e.kind, n)))
            .collect();
        assert_eq!(
            nums,
            vec![
                (EntityType::Distance, 500.0),
                (EntityType::FeedRate, 6000.0),
                (EntityType::StepSize, 10.0),
            ]
        );
    }

    #[test]
    fn at_most_one_axis_and_compounds_win() {
        let e = extract("zero all", Intent::Zero);
        assert_eq!(
            e.iter().filter(|e| e.kind == EntityType::Axis).count(),
            1
        );
        assert_eq!(e[0].value, EntityValue::Axis(AxisSelection::XYZ));

        let e = extract("home x", Intent::Home);
        assert_eq!(
            e[0].value,
            EntityValue::Axis(AxisSelection::Single(machine_link::Axis::X))
        );
    }

    #[test]
    fn multiple_directions_are_kept_in_order() {
        let e = extract("move left 50 and forward 50", Intent::Jog);
        let dirs: Vec<MoveDirection> = e
            .iter()
            .filter_map(|e| match e.value {
                EntityValue::Direction(d) => Some(d),
                _ => None,
            })
            .collect();
        assert_eq!(dirs, vec![MoveDirection::Left, MoveDirection::Forward]);
    }

    #[test]
    fn axis_adjacent_number_is_a_coordinate() {
        let e = extract("move to x 50 y 20", Intent::MoveAbsolute);
        let coords: Vec<(machine_link::Axis, f64)> = e
            .iter()
            .filter_map(|e| match e.value {
                EntityValue::Coordinate { axis, value } => Some((axis, value)),
                _ => None,
            })
            .collect();
        assert_eq!(
            coords,
            vec![(machine_link::Axis::X, 50.0), (machine_link::Axis::Y, 20.0)]
        );
    }

    #[test]
    fn setting_intents_claim_the_first_bare_number() {
        let e = extract("set feed to 3000", Intent::SetFeed);
        assert!(kinds(&e).contains(&EntityType::FeedRate));

        let e = extract("5", Intent::SetStep);
        assert_eq!(e[0].kind, EntityType::StepSize);
    }

    #[test]
    fn speed_modifier_is_single() {
        let e = extract("jog left slow and fast", Intent::Jog);
        let mods: Vec<&Entity> = e
            .iter()
            .filter(|e| e.kind == EntityType::SpeedModifier)
            .collect();
        assert_eq!(mods.len(), 1);
        assert_eq!(mods[0].value, EntityValue::Modifier(SpeedModifier::Slow));
    }

    #[test]
    fn probe_type_only_for_probe_intents() {
        let e = extract("probe corner", Intent::Probe);
        assert!(e
            .iter()
            .any(|e| e.value == EntityValue::Probe(ProbeKind::Corner)));

        let e = extract("jog corner", Intent::Jog);
        assert!(!kinds(&e).contains(&EntityType::ProbeType));
    }

    #[test]
    fn workspace_from_g_code_or_ordinal() {
        let e = extract("workspace g55", Intent::SetWorkspace);
        assert_eq!(e.last().map(|e| &e.value), Some(&EntityValue::Text("G55".to_string())));

        let e = extract("use the third workspace", Intent::SetWorkspace);
        assert_eq!(e.last().map(|e| &e.value), Some(&EntityValue::Text("G56".to_string())));
    }

    #[test]
    fn spindle_direction_words() {
        let e = extract("spindle on reverse at 8000", Intent::SpindleOn);
        assert!(e
            .iter()
            .any(|e| e.value == EntityValue::Spindle(SpindleDirection::CounterClockwise)));
        assert!(e
            .iter()
            .any(|e| e.kind == EntityType::SpindleRpm && e.as_number() == Some(8000.0)));
    }
}
