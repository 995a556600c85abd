//! Session settings snapshot and the persistence seam.
//!
//! Everything is stored canonically in millimeters / mm-per-min; the units
//! preference only affects how spoken input is interpreted and how replies
//! are formatted.

use crate::Result;
use machine_link::ProbeKind;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

pub const MM_PER_INCH: f64 = 25.4;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum Units {
    Metric,
    Imperial,
}

impl Units {
    /// Convert an operator-spoken value in these units to canonical mm.
    pub fn to_mm(&self, value: f64) -> f64 {
        match self {
            Units::Metric => value,
            Units::Imperial => value * MM_PER_INCH,
        }
    }

    /// Convert a canonical mm value for display in these units.
    pub fn from_mm(&self, mm: f64) -> f64 {
        match self {
            Units::Metric => mm,
            Units::Imperial => mm / MM_PER_INCH,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Units::Metric => "millimeters",
            Units::Imperial => "inches",
        }
    }
}

/// Where the machine homes to. Decides which way "forward" points: with the
/// home corner at the back, forward is toward the operator (-Y); at the
/// front it is away (+Y). Left/right are invariant.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum HomeCorner {
    BackLeft,
    BackRight,
    FrontLeft,
    FrontRight,
}

impl HomeCorner {
    pub fn is_back(&self) -> bool {
        matches!(self, HomeCorner::BackLeft | HomeCorner::BackRight)
    }
}

/// The per-session settings snapshot. Loaded at session start, mutated by
/// setting intents, persisted through [`SettingsStore`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    pub feed_mm_min: f64,
    pub step_mm: f64,
    pub probe_type: ProbeKind,
    pub home_corner: HomeCorner,
    pub units: Units,
    pub require_confirmation: bool,
    pub allow_job_start: bool,
    pub wake_word_enabled: bool,
    pub wake_word: String,
    pub workspace: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            feed_mm_min: 1000.0,
            step_mm: 1.0,
            probe_type: ProbeKind::ZTouch,
            home_corner: HomeCorner::BackLeft,
            units: Units::Metric,
            require_confirmation: true,
            allow_job_start: false,
            wake_word_enabled: false,
            wake_word: "hey machine".to_string(),
            workspace: "G54".to_string(),
        }
    }
}

/// Key-value persistence for the settings snapshot. The session loads once
/// at startup and writes after every mutation; failures are non-fatal.
pub trait SettingsStore: Send {
    fn load(&mut self) -> Result<Option<SessionSettings>>;
    fn save(&mut self, settings: &SessionSettings) -> Result<()>;
}

/// In-memory store for tests and ephemeral sessions. Tests keep a handle to
/// the saved snapshot and inspect it after the session takes the store.
#[derive(Default)]
pub struct MemoryStore {
    saved: Arc<Mutex<Option<SessionSettings>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the last saved snapshot.
    pub fn saved_handle(&self) -> Arc<Mutex<Option<SessionSettings>>> {
        Arc::clone(&self.saved)
    }
}

impl SettingsStore for MemoryStore {
    fn load(&mut self) -> Result<Option<SessionSettings>> {
        match self.saved.lock() {
            Ok(saved) => Ok(saved.clone()),
            Err(_) => Ok(None),
        }
    }

    fn save(&mut self, settings: &SessionSettings) -> Result<()> {
        if let Ok(mut saved) = self.saved.lock() {
            *saved = Some(settings.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn imperial_round_trip() {
        let u = Units::Imperial;
        let mm = u.to_mm(2.0);
        assert!((mm - 50.8).abs() < 1e-9);
        assert!((u.from_mm(mm) - 2.0).abs() < 1e-9);
    }

    #[test]
    fn metric_is_identity() {
        assert_eq!(Units::Metric.to_mm(5.0), 5.0);
        assert_eq!(Units::Metric.from_mm(5.0), 5.0);
    }

    #[test]
    fn defaults_are_safe() {
        let s = SessionSettings::default();
        assert!(s.require_confirmation);
        assert!(!s.allow_job_start);
        assert!(!s.wake_word_enabled);
    }

    #[test]
    fn memory_store_round_trip() {
        let mut store = MemoryStore::new();
        assert!(store.load().ok().flatten().is_none());

        let mut s = SessionSettings::default();
        s.feed_mm_min = 2500.0;
        store.save(&s).ok();
        assert_eq!(store.load().ok().flatten(), Some(s));
    }
}
