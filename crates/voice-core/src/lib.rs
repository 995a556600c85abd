//! voice-core: voice command understanding and execution for CNC control
//!
//! This crate turns noisy speech-recognizer transcripts into verified,
//! bounded, safety-gated machine commands:
//! - Text normalization (homophone repair, spoken-number conversion)
//! - Intent classification with fuzzy matching and safety disambiguation
//! - Context-sensitive entity extraction
//! - Command synthesis with canonical units and feed clamping
//! - A confirmation dialog state machine with wake-word arming
//! - Compound-utterance chaining with settle delays, plus undo/repeat history
//!
//! The parsing stages are pure functions; only [`Session`] holds state and
//! talks to the [`machine_link::MachineLink`] collaborator.

pub mod normalize;
pub use normalize::{ends_with_trigger, normalize, split_clauses};

pub mod fuzzy;
pub use fuzzy::similarity;

mod intent;
pub use intent::{classify, Classification, Intent};

mod entities;
pub use entities::{
    extract, AxisSelection, Entity, EntityType, EntityValue, MoveDirection, SpeedModifier,
};

mod settings;
pub use settings::{HomeCorner, MemoryStore, SessionSettings, SettingsStore, Units};

mod command;
pub use command::{
    intercept_job_start, synthesize, CommandDescriptor, CommandKind, CommandPayload, Synthesis,
};

mod history;
pub use history::History;

mod speech;
pub use speech::{MockSpeech, SpeechSink};

mod session;
pub use session::{Session, SessionOutcome, StopHandle, Timing};

mod error;
pub use error::{Result, VoiceError};

/// Parse of a single clause: the classified intent plus extracted entities.
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub intent: Intent,
    pub confidence: f32,
    /// The normalized clause text the parse came from.
    pub text: String,
    pub entities: Vec<Entity>,
    /// Runner-up intents for diagnostics, best first, at most three.
    pub alternatives: Vec<(Intent, f32)>,
}

/// Classify and extract in one step.
pub fn parse_clause(text: &str) -> ParseResult {
    let c = classify(text);
    let entities = extract(text, c.intent);
    ParseResult {
        intent: c.intent,
        confidence: c.confidence,
        text: text.to_string(),
        entities,
        alternatives: c.alternatives,
    }
}
