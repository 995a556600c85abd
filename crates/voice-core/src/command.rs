//! Command synthesis: intent + entities + session settings become a concrete
//! machine command descriptor, or a refusal.
//!
//! All values leaving this module are canonical (mm, mm/min). Destructive
//! operations are refused here rather than downstream so a bad parse can
//! never reach the machine link.

use crate::entities::{
    AxisSelection, Entity, EntityType, EntityValue, MoveDirection, SpeedModifier,
};
use crate::history::History;
use crate::intent::{matches_job_start, Intent};
use crate::settings::{SessionSettings, Units};
use crate::ParseResult;
use machine_link::{
    AbsoluteTarget, Axis, JogVector, MachineSnapshot, ProbeKind, SpindleDirection,
};
use serde::{Deserialize, Serialize};

/// Effective feed is clamped to what the hardware tolerates.
pub const FEED_MIN_MM_MIN: f64 = 10.0;
pub const FEED_MAX_MM_MIN: f64 = 50_000.0;
const STEP_MIN_MM: f64 = 0.01;
const STEP_MAX_MM: f64 = 1_000.0;
const DEFAULT_SPINDLE_RPM: f64 = 12_000.0;

/// Broad command class, used for the confirmation gate, settle delays and
/// history rules.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum CommandKind {
    Jog,
    Move,
    Home,
    Zero,
    Probe,
    Spindle,
    Tool,
    Stop,
    Pause,
    Resume,
    Unlock,
    Setting,
    Query,
}

impl CommandKind {
    /// Whether the confirmation gate applies when confirmation is enabled.
    /// Stop must never wait; queries and settings produce no motion.
    pub fn requires_confirmation(&self) -> bool {
        !matches!(
            self,
            CommandKind::Stop | CommandKind::Query | CommandKind::Setting
        )
    }
}

/// What actually gets dispatched for a descriptor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum CommandPayload {
    Jog { vector: JogVector, feed_mm_min: f64 },
    AbsoluteMove(AbsoluteTarget),
    Raw(String),
    SoftReset,
    CycleStart,
    Probe(ProbeKind),
    /// Queries execute by being spoken.
    Speak(String),
    /// Settings mutations have already happened; nothing to send.
    None,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandDescriptor {
    pub kind: CommandKind,
    /// Human description, used for confirmation prompts and logs.
    pub description: String,
    pub payload: CommandPayload,
    /// For jogs: the vector an undo would have to reverse.
    pub undo_vector: Option<JogVector>,
}

/// Outcome of synthesis for one clause.
#[derive(Clone, Debug, PartialEq)]
pub enum Synthesis {
    Command(CommandDescriptor),
    /// Understood, but refused (safety gate, missing history, missing value).
    Blocked(String),
    /// Not understood at all.
    Rejected(String),
}

/// Job-start phrasing is intercepted before classification; it either maps
/// to a bare cycle-start (when explicitly allowed) or is refused outright.
/// The core never streams a program.
pub fn intercept_job_start(text: &str, settings: &SessionSettings) -> Option<Synthesis> {
    if !matches_job_start(text) {
        return None;
    }
    if settings.allow_job_start {
        tracing::info!("job start phrasing accepted, mapping to cycle start");
        Some(Synthesis::Command(CommandDescriptor {
            kind: CommandKind::Resume,
            description: "cycle start".to_string(),
            payload: CommandPayload::CycleStart,
            undo_vector: None,
        }))
    } else {
        tracing::warn!("job start phrasing refused, allow_job_start is off");
        Some(Synthesis::Blocked(
            "starting a job by voice is disabled".to_string(),
        ))
    }
}

/// Turn a parsed clause into a dispatchable descriptor. Setting intents
/// mutate `settings` immediately; the caller persists the snapshot when it
/// changed.
pub fn synthesize(
    parse: &ParseResult,
    settings: &mut SessionSettings,
    snapshot: &MachineSnapshot,
    history: &History,
) -> Synthesis {
    match parse.intent {
        Intent::Jog | Intent::MoveAbsolute => synthesize_motion(parse, settings),
        Intent::Stop => Synthesis::Command(CommandDescriptor {
            kind: CommandKind::Stop,
            description: "emergency stop".to_string(),
            payload: CommandPayload::SoftReset,
            undo_vector: None,
        }),
        Intent::Pause => raw(CommandKind::Pause, "feed hold", "!"),
        Intent::Resume => Synthesis::Command(CommandDescriptor {
            kind: CommandKind::Resume,
            description: "resume".to_string(),
            payload: CommandPayload::CycleStart,
            undo_vector: None,
        }),
        Intent::JobStart => {
            intercept_job_start(&parse.text, settings).unwrap_or_else(|| {
                Synthesis::Blocked("starting a job by voice is disabled".to_string())
            })
        }
        Intent::Home => synthesize_home(parse),
        Intent::Zero => synthesize_zero(parse),
        Intent::GotoZero => raw(CommandKind::Move, "move to work zero", "G90 G0 X0 Y0"),
        Intent::Unlock => raw(CommandKind::Unlock, "unlock controller", "$X"),
        Intent::Probe => {
            let kind = first_probe_kind(&parse.entities).unwrap_or(settings.probe_type);
            Synthesis::Command(CommandDescriptor {
                kind: CommandKind::Probe,
                description: format!("start {kind} probe"),
                payload: CommandPayload::Probe(kind),
                undo_vector: None,
            })
        }
        Intent::SpindleOn => {
            let rpm = first_number(&parse.entities, EntityType::SpindleRpm)
                .unwrap_or(DEFAULT_SPINDLE_RPM);
            let code = match first_spindle_direction(&parse.entities) {
                Some(SpindleDirection::CounterClockwise) => "M4",
                _ => "M3",
            };
            raw(
                CommandKind::Spindle,
                &format!("spindle on at {rpm:.0} rpm"),
                &format!("{code} S{rpm:.0}"),
            )
        }
        Intent::SpindleOff => raw(CommandKind::Spindle, "spindle off", "M5"),
        Intent::SetSpindleSpeed => match first_number(&parse.entities, EntityType::SpindleRpm) {
            Some(rpm) => raw(
                CommandKind::Setting,
                &format!("spindle speed {rpm:.0} rpm"),
                &format!("S{rpm:.0}"),
            ),
            None => Synthesis::Blocked("no spindle speed given".to_string()),
        },
        Intent::ToolChange => match first_integer(&parse.entities, EntityType::ToolNumber) {
            Some(n) => raw(
                CommandKind::Tool,
                &format!("change to tool {n}"),
                &format!("T{n} M6"),
            ),
            None => Synthesis::Blocked("no tool number given".to_string()),
        },
        Intent::SetFeed => match first_number(&parse.entities, EntityType::FeedRate) {
            Some(v) => {
                let mm = settings
                    .units
                    .to_mm(v)
                    .clamp(FEED_MIN_MM_MIN, FEED_MAX_MM_MIN);
                settings.feed_mm_min = mm;
                applied(format!(
                    "feed set to {:.0} {} per minute",
                    settings.units.from_mm(mm),
                    settings.units.label()
                ))
            }
            None => Synthesis::Blocked("no feed value given".to_string()),
        },
        Intent::SetStep => match first_number(&parse.entities, EntityType::StepSize) {
            Some(v) => {
                let mm = settings.units.to_mm(v).clamp(STEP_MIN_MM, STEP_MAX_MM);
                settings.step_mm = mm;
                applied(format!(
                    "step set to {} {}",
                    trim_float(settings.units.from_mm(mm)),
                    settings.units.label()
                ))
            }
            None => Synthesis::Blocked("no step value given".to_string()),
        },
        Intent::SetUnits => synthesize_units(parse, settings),
        Intent::SetWorkspace => match first_text(&parse.entities, EntityType::Workspace) {
            Some(ws) => {
                settings.workspace = ws.clone();
                Synthesis::Command(CommandDescriptor {
                    kind: CommandKind::Setting,
                    description: format!("workspace {ws}"),
                    payload: CommandPayload::Raw(ws),
                    undo_vector: None,
                })
            }
            None => Synthesis::Blocked("no workspace given".to_string()),
        },
        Intent::SetProbeType => match first_probe_kind(&parse.entities) {
            Some(kind) => {
                settings.probe_type = kind;
                applied(format!("default probe set to {kind}"))
            }
            None => Synthesis::Blocked("no probe type given".to_string()),
        },
        Intent::ConfirmationOn => {
            settings.require_confirmation = true;
            applied("confirmation required".to_string())
        }
        Intent::ConfirmationOff => {
            settings.require_confirmation = false;
            applied("confirmation disabled".to_string())
        }
        Intent::WakeWordOn => {
            settings.wake_word_enabled = true;
            applied(format!("wake word \"{}\" enabled", settings.wake_word))
        }
        Intent::WakeWordOff => {
            settings.wake_word_enabled = false;
            applied("wake word disabled".to_string())
        }
        Intent::QueryPosition => speak(format!(
            "position x {} y {} z {} {}",
            trim_float(settings.units.from_mm(snapshot.position.x)),
            trim_float(settings.units.from_mm(snapshot.position.y)),
            trim_float(settings.units.from_mm(snapshot.position.z)),
            settings.units.label()
        )),
        Intent::QueryStatus => speak(format!("machine is {}", snapshot.state)),
        Intent::QueryFeed => {
            // Live telemetry reports the feed actually running; the session
            // setting only answers when the machine has reported nothing.
            let feed = if snapshot.feed_mm_min > 0.0 {
                snapshot.feed_mm_min
            } else {
                settings.feed_mm_min
            };
            speak(format!(
                "feed is {:.0} {} per minute",
                settings.units.from_mm(feed),
                settings.units.label()
            ))
        }
        Intent::QueryStep => speak(format!(
            "step is {} {}",
            trim_float(settings.units.from_mm(settings.step_mm)),
            settings.units.label()
        )),
        Intent::QueryDistance => speak(format!(
            "distance from zero x {} y {} z {} {}",
            trim_float(settings.units.from_mm(snapshot.position.x)),
            trim_float(settings.units.from_mm(snapshot.position.y)),
            trim_float(settings.units.from_mm(snapshot.position.z)),
            settings.units.label()
        )),
        Intent::QueryTravel => speak(format!(
            "travel used x {} y {} z {} {}",
            trim_float(settings.units.from_mm(snapshot.travel_mm.x)),
            trim_float(settings.units.from_mm(snapshot.travel_mm.y)),
            trim_float(settings.units.from_mm(snapshot.travel_mm.z)),
            settings.units.label()
        )),
        Intent::Undo => match history.last_jog() {
            Some(vector) => {
                let inverse = vector.inverse();
                Synthesis::Command(CommandDescriptor {
                    kind: CommandKind::Jog,
                    description: format!("undo last jog ({inverse})"),
                    payload: CommandPayload::Jog {
                        vector: inverse,
                        feed_mm_min: settings.feed_mm_min,
                    },
                    undo_vector: None,
                })
            }
            None => Synthesis::Blocked("nothing to undo".to_string()),
        },
        Intent::Repeat => match history.last_executed() {
            Some(d) => Synthesis::Command(d.clone()),
            None => Synthesis::Blocked("nothing to repeat".to_string()),
        },
        Intent::Confirm => Synthesis::Rejected("nothing awaiting confirmation".to_string()),
        Intent::Cancel => Synthesis::Rejected("nothing to cancel".to_string()),
        Intent::Unknown => Synthesis::Rejected("command not recognized".to_string()),
    }
}

/// Relative jog or absolute move, depending on what the clause carried.
fn synthesize_motion(parse: &ParseResult, settings: &mut SessionSettings) -> Synthesis {
    let directions: Vec<&Entity> = parse
        .entities
        .iter()
        .filter(|e| e.kind == EntityType::Direction)
        .collect();
    let coordinates: Vec<&Entity> = parse
        .entities
        .iter()
        .filter(|e| e.kind == EntityType::Coordinate)
        .collect();

    // An inline step size updates the persistent setting without touching
    // the current move's distance.
    if let Some(step) = first_number(&parse.entities, EntityType::StepSize) {
        settings.step_mm = settings.units.to_mm(step).clamp(STEP_MIN_MM, STEP_MAX_MM);
    }

    let feed = effective_feed(parse, settings);

    if directions.is_empty() && !coordinates.is_empty() {
        let mut target = AbsoluteTarget {
            feed_mm_min: feed,
            ..AbsoluteTarget::default()
        };
        for c in &coordinates {
            if let EntityValue::Coordinate { axis, value } = c.value {
                let mm = settings.units.to_mm(value);
                match axis {
                    Axis::X => target.x = Some(mm),
                    Axis::Y => target.y = Some(mm),
                    Axis::Z => target.z = Some(mm),
                }
            }
        }
        let description = format!(
            "move to{}{}{} at F{feed:.0}",
            target.x.map(|v| format!(" x {}", trim_float(v))).unwrap_or_default(),
            target.y.map(|v| format!(" y {}", trim_float(v))).unwrap_or_default(),
            target.z.map(|v| format!(" z {}", trim_float(v))).unwrap_or_default(),
        );
        return Synthesis::Command(CommandDescriptor {
            kind: CommandKind::Move,
            description,
            payload: CommandPayload::AbsoluteMove(target),
            undo_vector: None,
        });
    }

    if directions.is_empty() {
        return Synthesis::Blocked("no direction or coordinate given".to_string());
    }

    // Pair each direction with the first unconsumed distance that appears
    // after it in the clause; a direction without one moves by the step
    // setting.
    let mut distances: Vec<(&Entity, bool)> = parse
        .entities
        .iter()
        .filter(|e| e.kind == EntityType::Distance)
        .map(|e| (e, false))
        .collect();
    let mut vector = JogVector::default();
    for dir_entity in &directions {
        let EntityValue::Direction(dir) = dir_entity.value else {
            continue;
        };
        let mut magnitude = settings.step_mm;
        for (dist, consumed) in distances.iter_mut() {
            if !*consumed && dist.span.0 >= dir_entity.span.1 {
                if let Some(v) = dist.as_number() {
                    magnitude = settings.units.to_mm(v);
                    *consumed = true;
                    break;
                }
            }
        }
        let (axis, sign) = direction_offset(dir, settings);
        vector.add_axis(axis, sign * magnitude);
    }

    if vector.is_zero() {
        return Synthesis::Blocked("jog distance is zero".to_string());
    }

    Synthesis::Command(CommandDescriptor {
        kind: CommandKind::Jog,
        description: format!("jog {vector} at F{feed:.0}"),
        payload: CommandPayload::Jog {
            vector,
            feed_mm_min: feed,
        },
        undo_vector: Some(vector),
    })
}

/// Left/right are invariant; forward/back flip with the home corner.
fn direction_offset(dir: MoveDirection, settings: &SessionSettings) -> (Axis, f64) {
    let forward_sign = if settings.home_corner.is_back() {
        -1.0
    } else {
        1.0
    };
    match dir {
        MoveDirection::Up => (Axis::Z, 1.0),
        MoveDirection::Down => (Axis::Z, -1.0),
        MoveDirection::Left => (Axis::X, -1.0),
        MoveDirection::Right => (Axis::X, 1.0),
        MoveDirection::Forward => (Axis::Y, forward_sign),
        MoveDirection::Back => (Axis::Y, -forward_sign),
    }
}

fn effective_feed(parse: &ParseResult, settings: &SessionSettings) -> f64 {
    let base = first_number(&parse.entities, EntityType::FeedRate)
        .map(|v| settings.units.to_mm(v))
        .unwrap_or(settings.feed_mm_min);
    let multiplier = parse
        .entities
        .iter()
        .find_map(|e| match e.value {
            EntityValue::Modifier(m) => Some(m.multiplier()),
            _ => None,
        })
        .unwrap_or(SpeedModifier::Normal.multiplier());
    (base * multiplier).clamp(FEED_MIN_MM_MIN, FEED_MAX_MM_MIN)
}

fn synthesize_home(parse: &ParseResult) -> Synthesis {
    match first_axis(&parse.entities) {
        Some(AxisSelection::Single(a)) => raw(
            CommandKind::Home,
            &format!("home {a}"),
            &format!("$H{a}"),
        ),
        _ => raw(CommandKind::Home, "home all axes", "$H"),
    }
}

fn synthesize_zero(parse: &ParseResult) -> Synthesis {
    let axes = first_axis(&parse.entities)
        .unwrap_or(AxisSelection::XYZ)
        .axes();
    let zeroed: Vec<String> = axes.iter().map(|a| format!("{a}0")).collect();
    let names: Vec<String> = axes.iter().map(|a| a.to_string()).collect();
    raw(
        CommandKind::Zero,
        &format!("zero {}", names.join(" ")),
        &format!("G10 L20 P0 {}", zeroed.join(" ")),
    )
}

fn synthesize_units(parse: &ParseResult, settings: &mut SessionSettings) -> Synthesis {
    let text = parse.text.as_str();
    let units = if text.contains("imperial") || text.contains("inch") {
        Units::Imperial
    } else if text.contains("metric") || text.contains("millimeter") {
        Units::Metric
    } else {
        return Synthesis::Blocked("say metric or imperial".to_string());
    };
    settings.units = units;
    applied(format!("units set to {}", units.label()))
}

fn raw(kind: CommandKind, description: &str, command: &str) -> Synthesis {
    Synthesis::Command(CommandDescriptor {
        kind,
        description: description.to_string(),
        payload: CommandPayload::Raw(command.to_string()),
        undo_vector: None,
    })
}

fn applied(description: String) -> Synthesis {
    Synthesis::Command(CommandDescriptor {
        kind: CommandKind::Setting,
        description,
        payload: CommandPayload::None,
        undo_vector: None,
    })
}

fn speak(text: String) -> Synthesis {
    Synthesis::Command(CommandDescriptor {
        kind: CommandKind::Query,
        description: text.clone(),
        payload: CommandPayload::Speak(text),
        undo_vector: None,
    })
}

fn first_number(entities: &[Entity], kind: EntityType) -> Option<f64> {
    entities
        .iter()
        .find(|e| e.kind == kind)
        .and_then(Entity::as_number)
}

fn first_integer(entities: &[Entity], kind: EntityType) -> Option<i64> {
    entities.iter().find(|e| e.kind == kind).and_then(|e| match e.value {
        EntityValue::Integer(i) => Some(i),
        EntityValue::Number(n) => Some(n as i64),
        _ => None,
    })
}

fn first_text(entities: &[Entity], kind: EntityType) -> Option<String> {
    entities.iter().find(|e| e.kind == kind).and_then(|e| match &e.value {
        EntityValue::Text(t) => Some(t.clone()),
        _ => None,
    })
}

fn first_axis(entities: &[Entity]) -> Option<AxisSelection> {
    entities.iter().find_map(|e| match e.value {
        EntityValue::Axis(sel) => Some(sel),
        _ => None,
    })
}

fn first_probe_kind(entities: &[Entity]) -> Option<ProbeKind> {
    entities.iter().find_map(|e| match e.value {
        EntityValue::Probe(k) => Some(k),
        _ => None,
    })
}

fn first_spindle_direction(entities: &[Entity]) -> Option<SpindleDirection> {
    entities.iter().find_map(|e| match e.value {
        EntityValue::Spindle(d) => Some(d),
        _ => None,
    })
}

/// Format a float without trailing zeros ("50", "2.5", "0.125").
fn trim_float(v: f64) -> String {
    let s = format!("{v:.3}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() || s == "-" {
        "0".to_string()
    } else {
        s.to_string()
    }
}
