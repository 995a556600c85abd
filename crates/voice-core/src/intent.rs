//! Intent classification over a fixed English phrase set.
//!
//! Each intent carries a set of trigger phrases. An exact (word-boundary)
//! phrase hit scores 1.0; a fuzzy window match scores `similarity * 0.95` so
//! fuzzy can never outrank exact. Safety-priority rules then reorder the
//! candidates before the winner is picked.

use crate::entities::direction_word;
use crate::fuzzy::similarity;
use serde::{Deserialize, Serialize};

/// Everything the operator can ask for, as a closed set. Command synthesis
/// matches exhaustively on this, so an unhandled combination is a compile
/// error rather than a runtime surprise.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Intent {
    Jog,
    MoveAbsolute,
    Stop,
    Cancel,
    Confirm,
    Pause,
    Resume,
    JobStart,
    Home,
    Zero,
    GotoZero,
    Unlock,
    Probe,
    SpindleOn,
    SpindleOff,
    SetSpindleSpeed,
    ToolChange,
    SetFeed,
    SetStep,
    SetUnits,
    SetWorkspace,
    SetProbeType,
    ConfirmationOn,
    ConfirmationOff,
    WakeWordOn,
    WakeWordOff,
    QueryPosition,
    QueryStatus,
    QueryFeed,
    QueryStep,
    QueryDistance,
    QueryTravel,
    Undo,
    Repeat,
    Unknown,
}

/// Classifier output: winner plus up to three runner-ups for diagnostics.
#[derive(Clone, Debug)]
pub struct Classification {
    pub intent: Intent,
    pub confidence: f32,
    pub alternatives: Vec<(Intent, f32)>,
}

/// Trigger phrases per intent, matched against normalized text. Declaration
/// order is the final tie-breaker, after score and matched-phrase length.
const PHRASES: &[(Intent, &[&str])] = &[
    (Intent::Stop, &["stop", "halt", "freeze", "emergency stop", "estop"]),
    (
        Intent::Cancel,
        &["cancel", "never mind", "nevermind", "forget it", "scratch that", "no"],
    ),
    (
        Intent::Confirm,
        &["yes", "confirm", "confirmed", "affirmative", "go ahead", "proceed", "yep", "yeah", "do it"],
    ),
    (Intent::Undo, &["undo", "undo that", "take it back", "reverse that"]),
    (Intent::Repeat, &["repeat", "repeat that", "again", "do that again", "same again"]),
    (
        Intent::JobStart,
        &[
            "start job",
            "start the job",
            "run job",
            "run the job",
            "run program",
            "start program",
            "run file",
            "start cutting",
        ],
    ),
    (Intent::Pause, &["pause", "feed hold", "hold on", "wait"]),
    (Intent::Resume, &["resume", "continue", "unpause", "keep going"]),
    (Intent::GotoZero, &["go to zero", "goto zero", "return to zero", "move to zero"]),
    (
        Intent::Zero,
        &["zero", "set zero", "zero out", "set work zero", "touch off"],
    ),
    (Intent::Home, &["home", "go home", "home all", "homing"]),
    (Intent::Unlock, &["unlock", "clear alarm", "reset alarm"]),
    (Intent::SetProbeType, &["probe type", "set probe type", "default probe"]),
    (Intent::Probe, &["probe", "probing", "run probe", "touch plate"]),
    (
        Intent::SpindleOff,
        &["spindle off", "stop spindle", "turn off spindle", "spindle stop"],
    ),
    (
        Intent::SpindleOn,
        &["spindle on", "start spindle", "turn on spindle", "spindle start"],
    ),
    (
        Intent::SetSpindleSpeed,
        &["spindle speed", "set spindle speed", "set rpm", "rpm"],
    ),
    (Intent::ToolChange, &["tool change", "change tool", "tool swap", "load tool"]),
    (
        Intent::QueryPosition,
        &["where are we", "current position", "what is the position", "report position", "position"],
    ),
    (
        Intent::QueryStatus,
        &["machine status", "what is the status", "report status", "status"],
    ),
    (
        Intent::QueryFeed,
        &["what is the feed", "current feed", "report feed"],
    ),
    (
        Intent::QueryStep,
        &["what is the step", "current step", "report step"],
    ),
    (
        Intent::QueryDistance,
        &["distance from zero", "how far from zero", "distance to zero"],
    ),
    (
        Intent::QueryTravel,
        &["travel used", "total travel", "how much travel"],
    ),
    (Intent::SetFeed, &["set feed", "feed rate", "set feed rate", "feed"]),
    (Intent::SetStep, &["set step", "step size", "set step size", "step"]),
    (
        Intent::SetUnits,
        &["set units", "use metric", "use imperial", "use inches", "use millimeters", "metric units", "imperial units", "switch to metric", "switch to imperial"],
    ),
    (
        Intent::SetWorkspace,
        &["workspace", "work offset", "coordinate system"],
    ),
    (
        Intent::ConfirmationOn,
        &["confirmation on", "enable confirmation", "require confirmation"],
    ),
    (
        Intent::ConfirmationOff,
        &["confirmation off", "disable confirmation", "no confirmation"],
    ),
    (Intent::WakeWordOn, &["wake word on", "enable wake word"]),
    (Intent::WakeWordOff, &["wake word off", "disable wake word"]),
    (Intent::MoveAbsolute, &["move to", "go to", "absolute"]),
    (Intent::Jog, &["jog", "move", "go", "shift", "nudge", "travel"]),
];

/// Exact match scores 1.0; fuzzy is penalized so it can never win a tie
/// against an exact hit.
const FUZZY_PENALTY: f32 = 0.95;
/// Similarity cutoffs; short phrases need the stricter one.
const FUZZY_CUTOFF_PHRASE: f32 = 0.75;
const FUZZY_CUTOFF_SHORT: f32 = 0.8;
/// Confidence assigned when only a bare direction word was recognized.
const DIRECTION_FALLBACK: f32 = 0.7;

#[derive(Clone, Copy, Debug)]
struct Scored {
    intent: Intent,
    raw: f32,
    phrase_len: usize,
}

fn matched(scored: &[Scored], intent: Intent) -> bool {
    scored.iter().any(|s| s.intent == intent)
}

/// True when the utterance textually matches job-start phrasing. Checked
/// before classification so an unauthorized job start can never slip
/// through as a fuzzy match on something else.
pub(crate) fn matches_job_start(text: &str) -> bool {
    let words: Vec<&str> = text.split_whitespace().collect();
    PHRASES
        .iter()
        .find(|(i, _)| *i == Intent::JobStart)
        .map(|(_, phrases)| {
            phrases
                .iter()
                .any(|p| phrase_score(&words, p) == Some(1.0))
        })
        .unwrap_or(false)
}

/// Classify a normalized clause.
pub fn classify(text: &str) -> Classification {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Classification {
            intent: Intent::Unknown,
            confidence: 0.0,
            alternatives: Vec::new(),
        };
    }

    let mut scored: Vec<Scored> = Vec::new();
    for (intent, phrases) in PHRASES {
        if let Some((raw, phrase_len)) = best_phrase_score(&words, phrases) {
            scored.push(Scored {
                intent: *intent,
                raw,
                phrase_len,
            });
        }
    }

    // Rule 2: a bare direction word with no recognized motion intent is a
    // jog, at a deliberately low floor. Suppressed when a stop/cancel word
    // matched; safety words must never be downgraded into motion.
    if !matched(&scored, Intent::Jog)
        && !matched(&scored, Intent::MoveAbsolute)
        && !matched(&scored, Intent::Stop)
        && !matched(&scored, Intent::Cancel)
        && words.iter().any(|w| direction_word(w).is_some())
    {
        scored.push(Scored {
            intent: Intent::Jog,
            raw: DIRECTION_FALLBACK,
            phrase_len: 0,
        });
    }

    // Rule 1: stop always beats a co-matching cancel.
    if matched(&scored, Intent::Stop) && matched(&scored, Intent::Cancel) {
        if let Some(s) = scored.iter_mut().find(|s| s.intent == Intent::Stop) {
            s.raw += 0.1;
        }
    }

    // Rule 3: inline feed/step parameters inside a jog utterance must not
    // hijack classification. Boost applied to the ordering score only; the
    // reported confidence stays within [0, 1].
    let jog_raw = scored
        .iter()
        .find(|s| s.intent == Intent::Jog)
        .map(|s| s.raw);
    if let Some(jog_raw) = jog_raw {
        let mut boost = 0.0;
        for competitor in [Intent::SetFeed, Intent::SetStep] {
            if scored
                .iter()
                .any(|s| s.intent == competitor && jog_raw >= s.raw)
            {
                boost += 0.15;
            }
        }
        if boost > 0.0 {
            if let Some(s) = scored.iter_mut().find(|s| s.intent == Intent::Jog) {
                s.raw += boost;
            }
        }
    }

    if scored.is_empty() {
        tracing::debug!(text, "no intent matched");
        return Classification {
            intent: Intent::Unknown,
            confidence: 0.0,
            alternatives: Vec::new(),
        };
    }

    scored.sort_by(|a, b| {
        b.raw
            .partial_cmp(&a.raw)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.phrase_len.cmp(&a.phrase_len))
    });

    let winner = scored[0];
    let alternatives: Vec<(Intent, f32)> = scored[1..]
        .iter()
        .take(3)
        .map(|s| (s.intent, s.raw.min(1.0)))
        .collect();

    tracing::debug!(
        text,
        intent = ?winner.intent,
        confidence = winner.raw.min(1.0),
        "classified"
    );

    Classification {
        intent: winner.intent,
        confidence: winner.raw.min(1.0),
        alternatives,
    }
}

/// Best score across an intent's phrase set, with the matched phrase length
/// for tie-breaking (longer phrases are more specific).
fn best_phrase_score(words: &[&str], phrases: &[&str]) -> Option<(f32, usize)> {
    let mut best: Option<(f32, usize)> = None;
    for phrase in phrases {
        let score = phrase_score(words, phrase);
        if let Some(score) = score {
            let candidate = (score, phrase.len());
            match best {
                Some((b, bl)) if b > score || (b == score && bl >= phrase.len()) => {}
                _ => best = Some(candidate),
            }
        }
    }
    best
}

fn phrase_score(words: &[&str], phrase: &str) -> Option<f32> {
    let parts: Vec<&str> = phrase.split_whitespace().collect();
    if parts.is_empty() || parts.len() > words.len() {
        return None;
    }
    // Exact word-sequence containment.
    if words.windows(parts.len()).any(|w| w == parts.as_slice()) {
        return Some(1.0);
    }
    // Fuzzy, against same-length word windows. Very short phrases are too
    // noisy to fuzz.
    if phrase.len() < 4 {
        return None;
    }
    let cutoff = if parts.len() == 1 {
        FUZZY_CUTOFF_SHORT
    } else {
        FUZZY_CUTOFF_PHRASE
    };
    let mut best: Option<f32> = None;
    for window in words.windows(parts.len()) {
        let joined = window.join(" ");
        let sim = similarity(&joined, phrase);
        if sim >= cutoff {
            let s = sim * FUZZY_PENALTY;
            if best.map_or(true, |b| s > b) {
                best = Some(s);
            }
        }
    }
    best
}
