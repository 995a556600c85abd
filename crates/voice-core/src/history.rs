//! Repeat and undo bookkeeping.

use crate::command::{CommandDescriptor, CommandKind};
use crate::intent::Intent;
use machine_link::JogVector;

/// Tracks the last executed command (for "repeat") and the last jog vector
/// (for "undo"). Only successfully dispatched commands may be recorded.
#[derive(Debug, Default)]
pub struct History {
    last_executed: Option<CommandDescriptor>,
    last_jog: Option<JogVector>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful dispatch. Repeat, undo and query commands never
    /// become the repeat target; executing an undo consumes the jog record
    /// so a second consecutive undo is rejected.
    pub fn record(&mut self, intent: Intent, descriptor: &CommandDescriptor) {
        if intent == Intent::Undo {
            self.last_jog = None;
            return;
        }
        if let Some(vector) = descriptor.undo_vector {
            self.last_jog = Some(vector);
        }
        let repeatable = !matches!(intent, Intent::Repeat)
            && descriptor.kind != CommandKind::Query;
        if repeatable {
            self.last_executed = Some(descriptor.clone());
        }
    }

    pub fn last_executed(&self) -> Option<&CommandDescriptor> {
        self.last_executed.as_ref()
    }

    pub fn last_jog(&self) -> Option<JogVector> {
        self.last_jog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandPayload;

    fn jog_descriptor(x: f64, y: f64) -> CommandDescriptor {
        let vector = JogVector { x, y, z: 0.0 };
        CommandDescriptor {
            kind: CommandKind::Jog,
            description: format!("jog {vector}"),
            payload: CommandPayload::Jog {
                vector,
                feed_mm_min: 1000.0,
            },
            undo_vector: Some(vector),
        }
    }

    #[test]
    fn jog_records_undo_vector() {
        let mut h = History::new();
        h.record(Intent::Jog, &jog_descriptor(20.0, -10.0));
        assert_eq!(h.last_jog(), Some(JogVector { x: 20.0, y: -10.0, z: 0.0 }));
        assert!(h.last_executed().is_some());
    }

    #[test]
    fn undo_consumes_the_jog_record() {
        let mut h = History::new();
        h.record(Intent::Jog, &jog_descriptor(5.0, 0.0));
        h.record(Intent::Undo, &jog_descriptor(-5.0, 0.0));
        assert_eq!(h.last_jog(), None);
        // The repeat target is untouched by undo.
        assert!(h.last_executed().is_some());
    }

    #[test]
    fn non_jog_commands_leave_undo_history_alone() {
        let mut h = History::new();
        h.record(Intent::Jog, &jog_descriptor(5.0, 0.0));

        let raw = CommandDescriptor {
            kind: CommandKind::Spindle,
            description: "spindle off".to_string(),
            payload: CommandPayload::Raw("M5".to_string()),
            undo_vector: None,
        };
        h.record(Intent::SpindleOff, &raw);
        assert_eq!(h.last_jog(), Some(JogVector { x: 5.0, y: 0.0, z: 0.0 }));
        assert_eq!(h.last_executed().map(|d| d.kind), Some(CommandKind::Spindle));
    }

    #[test]
    fn queries_are_not_repeatable() {
        let mut h = History::new();
        let query = CommandDescriptor {
            kind: CommandKind::Query,
            description: "report position".to_string(),
            payload: CommandPayload::Speak("at x 0".to_string()),
            undo_vector: None,
        };
        h.record(Intent::QueryPosition, &query);
        assert!(h.last_executed().is_none());
    }
}
