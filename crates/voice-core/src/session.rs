//! The per-screen voice session: dialog state machine, chain scheduler,
//! history, and dispatch to the machine link.
//!
//! Utterances are handled one at a time; the owning task must serialize
//! calls. Motion never reaches the link unless confirmation is disabled or
//! an explicit confirm phrase arrived, with one exception: stop executes
//! immediately from any state.

use crate::command::{
    intercept_job_start, synthesize, CommandDescriptor, CommandKind, CommandPayload, Synthesis,
};
use crate::history::History;
use crate::intent::{classify, Intent};
use crate::normalize::{normalize, split_clauses};
use crate::settings::{SessionSettings, SettingsStore};
use crate::speech::SpeechSink;
use crate::parse_clause;
use machine_link::{JogRequest, MachineLink, MachineSnapshot};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Delays and timeouts, injectable so tests run in milliseconds.
#[derive(Clone, Copy, Debug)]
pub struct Timing {
    /// How long a wake-word arm stays live.
    pub wake_arm: Duration,
    /// Settle time after a jog or move before the next queued dispatch.
    pub settle_motion: Duration,
    /// Settle time after starting a probe.
    pub settle_probe: Duration,
    /// Settle time after everything else.
    pub settle_default: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            wake_arm: Duration::from_secs(10),
            settle_motion: Duration::from_millis(1500),
            settle_probe: Duration::from_secs(30),
            settle_default: Duration::from_millis(500),
        }
    }
}

impl Timing {
    /// Millisecond-scale timings for tests.
    pub fn fast() -> Self {
        Self {
            wake_arm: Duration::from_millis(20),
            settle_motion: Duration::from_millis(1),
            settle_probe: Duration::from_millis(1),
            settle_default: Duration::from_millis(1),
        }
    }

    fn settle(&self, kind: CommandKind) -> Duration {
        match kind {
            CommandKind::Jog | CommandKind::Move => self.settle_motion,
            CommandKind::Probe => self.settle_probe,
            _ => self.settle_default,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DialogState {
    Idle,
    WakeArmed { deadline: Instant },
    AwaitingConfirmation,
    ExecutingChain,
}

/// What handling one utterance amounted to.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionOutcome {
    /// Wake word required and absent; nothing was done.
    Ignored,
    /// Wake word recognized alone; the next utterance is a command.
    WakeArmed,
    Executed { count: usize },
    AwaitingConfirmation { description: String },
    Canceled,
    Reprompted,
    Stopped,
    Blocked { reason: String },
    NotRecognized,
    ChainRejected { index: usize, clause: String },
    /// The link refused a dispatch; nothing after it ran.
    Failed { reason: String },
}

/// Cancels the remaining queue from outside the session, e.g. when the
/// recognizer hears a stop while a chain is executing.
#[derive(Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    fn take(&self) -> bool {
        self.flag.swap(false, Ordering::SeqCst)
    }
}

pub struct Session<L: MachineLink> {
    link: L,
    speech: Box<dyn SpeechSink>,
    store: Option<Box<dyn SettingsStore>>,
    settings: SessionSettings,
    snapshot: MachineSnapshot,
    state: DialogState,
    queue: Vec<(Intent, CommandDescriptor)>,
    history: History,
    timing: Timing,
    stop: StopHandle,
    probe_active: bool,
}

impl<L: MachineLink> Session<L> {
    pub fn new(link: L, speech: Box<dyn SpeechSink>) -> Self {
        Self {
            link,
            speech,
            store: None,
            settings: SessionSettings::default(),
            snapshot: MachineSnapshot::default(),
            state: DialogState::Idle,
            queue: Vec::new(),
            history: History::new(),
            timing: Timing::default(),
            stop: StopHandle::default(),
            probe_active: false,
        }
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Attach a persistence store; an existing snapshot in the store wins
    /// over whatever the session was constructed with.
    pub fn attach_store(&mut self, mut store: Box<dyn SettingsStore>) {
        match store.load() {
            Ok(Some(loaded)) => self.settings = loaded,
            Ok(None) => {}
            Err(e) => warn!("settings load failed: {e}"),
        }
        self.store = Some(store);
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut SessionSettings {
        &mut self.settings
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn is_awaiting_confirmation(&self) -> bool {
        self.state == DialogState::AwaitingConfirmation
    }

    /// Clonable handle that cancels the remaining chain.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Telemetry is pushed in by the status feed; the core never polls.
    pub fn update_telemetry(&mut self, snapshot: MachineSnapshot) {
        self.snapshot = snapshot;
    }

    /// Handle one final transcript from the recognizer.
    pub async fn handle_utterance(&mut self, raw: &str) -> SessionOutcome {
        let now = Instant::now();
        if let DialogState::WakeArmed { deadline } = self.state {
            if now >= deadline {
                info!("wake arm expired");
                self.state = DialogState::Idle;
            }
        }

        let mut text = normalize(raw);
        if text.is_empty() {
            return SessionOutcome::NotRecognized;
        }

        if self.state == DialogState::AwaitingConfirmation {
            return self.handle_confirmation_reply(&text).await;
        }

        match self.state {
            DialogState::Idle if self.settings.wake_word_enabled => {
                let wake = self.settings.wake_word.clone();
                if text == wake {
                    self.state = DialogState::WakeArmed {
                        deadline: now + self.timing.wake_arm,
                    };
                    self.speech.say("listening");
                    return SessionOutcome::WakeArmed;
                }
                if let Some(rest) = text
                    .strip_prefix(wake.as_str())
                    .filter(|r| r.starts_with([',', ' ']))
                {
                    // Wake word plus an inline command: skip arming.
                    text = rest.trim_start_matches([',', ' ']).to_string();
                    if text.is_empty() {
                        return SessionOutcome::NotRecognized;
                    }
                } else {
                    // Stop must remain reachable even without the wake word.
                    if classify(&text).intent == Intent::Stop {
                        return self.execute_stop().await;
                    }
                    return SessionOutcome::Ignored;
                }
            }
            DialogState::WakeArmed { .. } => {
                // Consume the arm; the utterance is the command.
                self.state = DialogState::Idle;
            }
            _ => {}
        }

        self.handle_command_text(&text).await
    }

    async fn handle_confirmation_reply(&mut self, text: &str) -> SessionOutcome {
        let c = classify(text);
        match c.intent {
            Intent::Stop => self.execute_stop().await,
            Intent::Confirm => {
                info!("confirmed, executing {} queued command(s)", self.queue.len());
                self.execute_queue().await
            }
            Intent::Cancel => {
                self.queue.clear();
                self.state = DialogState::Idle;
                self.speech.say("canceled");
                SessionOutcome::Canceled
            }
            _ => {
                // Never guess on an ambiguous reply to a motion gate.
                self.speech.say("say confirm or cancel");
                SessionOutcome::Reprompted
            }
        }
    }

    async fn handle_command_text(&mut self, text: &str) -> SessionOutcome {
        let saved = self.settings.clone();

        // Job-start phrasing is checked on the whole utterance, before any
        // classification, so it cannot hide inside a chain.
        let queue = if let Some(s) = intercept_job_start(text, &self.settings) {
            match s {
                Synthesis::Command(d) => vec![(Intent::JobStart, d)],
                Synthesis::Blocked(reason) => {
                    self.speech.say(&reason);
                    return SessionOutcome::Blocked { reason };
                }
                Synthesis::Rejected(reason) => {
                    self.speech.say(&reason);
                    return SessionOutcome::NotRecognized;
                }
            }
        } else {
            let clauses = split_clauses(text);
            let multi = clauses.len() > 1;
            let mut queue = Vec::with_capacity(clauses.len());
            for (index, clause) in clauses.iter().enumerate() {
                let parse = parse_clause(clause);
                if parse.intent == Intent::Stop {
                    return self.execute_stop().await;
                }
                match synthesize(&parse, &mut self.settings, &self.snapshot, &self.history) {
                    Synthesis::Command(d) => queue.push((parse.intent, d)),
                    Synthesis::Blocked(reason) => {
                        // No partial execution: one bad clause rejects the
                        // whole chain, and its settings side effects too.
                        self.settings = saved;
                        return if multi {
                            self.speech
                                .say(&format!("clause {} blocked: {reason}", index + 1));
                            SessionOutcome::ChainRejected {
                                index,
                                clause: clause.clone(),
                            }
                        } else {
                            self.speech.say(&reason);
                            SessionOutcome::Blocked { reason }
                        };
                    }
                    Synthesis::Rejected(reason) => {
                        self.settings = saved;
                        return if multi {
                            self.speech
                                .say(&format!("clause {} not recognized", index + 1));
                            SessionOutcome::ChainRejected {
                                index,
                                clause: clause.clone(),
                            }
                        } else {
                            self.speech.say(&reason);
                            SessionOutcome::NotRecognized
                        };
                    }
                }
            }
            queue
        };

        if queue.is_empty() {
            return SessionOutcome::NotRecognized;
        }

        let needs_confirmation = self.settings.require_confirmation
            && queue.iter().any(|(_, d)| d.kind.requires_confirmation());

        self.queue = queue;
        let outcome = if needs_confirmation {
            let description = if self.queue.len() == 1 {
                self.queue[0].1.description.clone()
            } else {
                format!("{} commands", self.queue.len())
            };
            self.state = DialogState::AwaitingConfirmation;
            self.speech.say(&format!("confirm: {description}"));
            SessionOutcome::AwaitingConfirmation { description }
        } else {
            self.execute_queue().await
        };

        self.persist_settings(&saved);
        outcome
    }

    /// Drain the queue strictly in order with per-kind settle delays.
    async fn execute_queue(&mut self) -> SessionOutcome {
        self.state = DialogState::ExecutingChain;
        let queue = std::mem::take(&mut self.queue);
        let total = queue.len();
        let mut prev_kind: Option<CommandKind> = None;

        for (i, (intent, descriptor)) in queue.into_iter().enumerate() {
            if let Some(kind) = prev_kind {
                tokio::time::sleep(self.timing.settle(kind)).await;
            }
            if self.stop.take() {
                info!("chain canceled at {}/{}", i, total);
                self.state = DialogState::Idle;
                self.speech.say("chain canceled");
                return SessionOutcome::Stopped;
            }
            info!(command = %descriptor.description, "dispatching {}/{}", i + 1, total);
            if let Err(e) = self.dispatch(&descriptor) {
                warn!("dispatch failed: {e}");
                self.state = DialogState::Idle;
                self.speech
                    .say(&format!("{} failed, try again", descriptor.description));
                return SessionOutcome::Failed {
                    reason: e.to_string(),
                };
            }
            self.history.record(intent, &descriptor);
            if total > 1 {
                self.speech.say(&format!("{} of {} done", i + 1, total));
            }
            prev_kind = Some(descriptor.kind);
        }

        self.state = DialogState::Idle;
        SessionOutcome::Executed { count: total }
    }

    fn dispatch(&mut self, descriptor: &CommandDescriptor) -> machine_link::Result<()> {
        match &descriptor.payload {
            CommandPayload::Jog {
                vector,
                feed_mm_min,
            } => self.link.send_jog(&JogRequest {
                vector: *vector,
                feed_mm_min: *feed_mm_min,
            }),
            CommandPayload::AbsoluteMove(target) => self.link.send_absolute_move(target),
            CommandPayload::Raw(command) => self.link.send_raw_command(command),
            CommandPayload::SoftReset => self.link.send_soft_reset(),
            CommandPayload::CycleStart => self.link.send_cycle_start(),
            CommandPayload::Probe(kind) => {
                self.link.start_probe(*kind)?;
                self.probe_active = true;
                Ok(())
            }
            CommandPayload::Speak(reply) => {
                self.speech.say(reply);
                Ok(())
            }
            CommandPayload::None => Ok(()),
        }
    }

    /// Stop bypasses every gate: clear any pending work, reset the
    /// controller, abort a running probe.
    async fn execute_stop(&mut self) -> SessionOutcome {
        self.queue.clear();
        self.stop.take();
        self.state = DialogState::Idle;

        let result = self.link.send_soft_reset();
        if self.probe_active {
            if let Err(e) = self.link.stop_probe() {
                warn!("probe stop failed: {e}");
            }
            self.probe_active = false;
        }
        match result {
            Ok(()) => {
                let descriptor = CommandDescriptor {
                    kind: CommandKind::Stop,
                    description: "emergency stop".to_string(),
                    payload: CommandPayload::SoftReset,
                    undo_vector: None,
                };
                self.history.record(Intent::Stop, &descriptor);
                self.speech.say("stopped");
                SessionOutcome::Stopped
            }
            Err(e) => {
                warn!("soft reset failed: {e}");
                self.speech.say("stop failed, check the machine");
                SessionOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    fn persist_settings(&mut self, before: &SessionSettings) {
        if self.settings == *before {
            return;
        }
        if let Some(store) = &mut self.store {
            if let Err(e) = store.save(&self.settings) {
                warn!("settings save failed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MemoryStore;
    use crate::speech::MockSpeech;
    use machine_link::{MockLink, SentCommand};
    use std::sync::Mutex;

    fn session(confirm: bool) -> (Session<MockLink>, Arc<Mutex<Vec<SentCommand>>>) {
        let link = MockLink::new();
        let log = link.log_handle();
        let mut settings = SessionSettings::default();
        settings.require_confirmation = confirm;
        settings.feed_mm_min = 1000.0;
        let session = Session::new(link, Box::new(MockSpeech::new()))
            .with_timing(Timing::fast())
            .with_settings(settings);
        (session, log)
    }

    fn sent(log: &Arc<Mutex<Vec<SentCommand>>>) -> Vec<SentCommand> {
        log.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn jog_executes_immediately_without_confirmation() {
        let (mut s, log) = session(false);
        let outcome = s.handle_utterance("jog left 5").await;
        assert_eq!(outcome, SessionOutcome::Executed { count: 1 });
        assert_eq!(sent(&log).len(), 1);
        match &sent(&log)[0] {
            SentCommand::Jog(j) => assert_eq!(j.vector.x, -5.0),
            other => panic!("expected jog, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn confirmation_gates_motion() {
        let (mut s, log) = session(true);
        let outcome = s.handle_utterance("jog left 5").await;
        assert!(matches!(
            outcome,
            SessionOutcome::AwaitingConfirmation { .. }
        ));
        assert!(s.is_awaiting_confirmation());
        assert!(sent(&log).is_empty());

        let outcome = s.handle_utterance("confirm").await;
        assert_eq!(outcome, SessionOutcome::Executed { count: 1 });
        assert_eq!(sent(&log).len(), 1);
        assert!(!s.is_awaiting_confirmation());
    }

    #[tokio::test]
    async fn cancel_discards_pending_command() {
        let (mut s, log) = session(true);
        s.handle_utterance("jog left 5").await;
        let outcome = s.handle_utterance("cancel").await;
        assert_eq!(outcome, SessionOutcome::Canceled);
        assert!(sent(&log).is_empty());
        assert!(!s.is_awaiting_confirmation());
    }

    #[tokio::test]
    async fn ambiguous_reply_reprompts_without_dispatch() {
        let (mut s, log) = session(true);
        s.handle_utterance("jog left 5").await;
        let outcome = s.handle_utterance("banana").await;
        assert_eq!(outcome, SessionOutcome::Reprompted);
        assert!(s.is_awaiting_confirmation());
        assert!(sent(&log).is_empty());
    }

    #[tokio::test]
    async fn setting_mutations_reach_the_attached_store() {
        let (mut s, _log) = session(false);
        let store = MemoryStore::new();
        let saved = store.saved_handle();
        s.attach_store(Box::new(store));
        assert!(saved.lock().unwrap().is_none());

        let outcome = s.handle_utterance("set feed to 2000").await;
        assert_eq!(outcome, SessionOutcome::Executed { count: 1 });
        let snapshot = saved.lock().unwrap().clone().unwrap();
        assert_eq!(snapshot.feed_mm_min, 2000.0);

        s.handle_utterance("set step to 0.5").await;
        let snapshot = saved.lock().unwrap().clone().unwrap();
        assert_eq!(snapshot.step_mm, 0.5);
        assert_eq!(snapshot.feed_mm_min, 2000.0);
    }

    #[tokio::test]
    async fn stop_bypasses_confirmation_state() {
        let (mut s, log) = session(true);
        s.handle_utterance("jog left 5").await;
        let outcome = s.handle_utterance("stop").await;
        assert_eq!(outcome, SessionOutcome::Stopped);
        assert_eq!(sent(&log), vec![SentCommand::SoftReset]);
        assert!(!s.is_awaiting_confirmation());

        // The pending jog is gone: confirm now has nothing to run.
        let outcome = s.handle_utterance("confirm").await;
        assert_ne!(outcome, SessionOutcome::Executed { count: 1 });
        assert_eq!(sent(&log).len(), 1);
    }

    #[tokio::test]
    async fn queries_and_settings_skip_the_gate() {
        let (mut s, log) = session(true);
        let outcome = s.handle_utterance("set feed to 2000").await;
        assert_eq!(outcome, SessionOutcome::Executed { count: 1 });
        assert_eq!(s.settings().feed_mm_min, 2000.0);

        let outcome = s.handle_utterance("what is the feed").await;
        assert_eq!(outcome, SessionOutcome::Executed { count: 1 });
        // Neither touched the link.
        assert!(sent(&log).is_empty());
    }

    #[tokio::test]
    async fn chain_is_atomic() {
        let (mut s, log) = session(false);
        let outcome = s
            .handle_utterance("jog up then probe z then bogus clause")
            .await;
        assert_eq!(
            outcome,
            SessionOutcome::ChainRejected {
                index: 2,
                clause: "bogus clause".to_string()
            }
        );
        assert!(sent(&log).is_empty());
    }

    #[tokio::test]
    async fn chain_executes_in_order_with_progress() {
        let (mut s, log) = session(false);
        let outcome = s.handle_utterance("jog up then zero z").await;
        assert_eq!(outcome, SessionOutcome::Executed { count: 2 });
        let sent = sent(&log);
        assert!(matches!(sent[0], SentCommand::Jog(_)));
        assert_eq!(sent[1], SentCommand::Raw("G10 L20 P0 Z0".to_string()));
    }

    #[tokio::test]
    async fn chain_failure_rolls_back_settings_side_effects() {
        let (mut s, _log) = session(false);
        let step_before = s.settings().step_mm;
        let outcome = s
            .handle_utterance("move right 5 step 10 then bogus clause")
            .await;
        assert!(matches!(outcome, SessionOutcome::ChainRejected { .. }));
        assert_eq!(s.settings().step_mm, step_before);
    }

    #[tokio::test]
    async fn link_failure_is_not_recorded_as_history() {
        let link = MockLink::new();
        let fail = link.fail_handle();
        let mut settings = SessionSettings::default();
        settings.require_confirmation = false;
        let mut s = Session::new(link, Box::new(MockSpeech::new()))
            .with_timing(Timing::fast())
            .with_settings(settings);

        fail.store(true, Ordering::SeqCst);
        let outcome = s.handle_utterance("jog left 5").await;
        assert!(matches!(outcome, SessionOutcome::Failed { .. }));
        assert!(s.history().last_jog().is_none());

        // The session is back in idle and usable.
        let outcome = s.handle_utterance("jog left 5").await;
        assert_eq!(outcome, SessionOutcome::Executed { count: 1 });
        assert!(s.history().last_jog().is_some());
    }

    #[tokio::test]
    async fn undo_then_undo_again_is_blocked() {
        let (mut s, log) = session(false);
        s.handle_utterance("move right 20 and back 10").await;
        let outcome = s.handle_utterance("undo").await;
        assert_eq!(outcome, SessionOutcome::Executed { count: 1 });
        let sent = sent(&log);
        match (&sent[0], &sent[1]) {
            (SentCommand::Jog(a), SentCommand::Jog(b)) => {
                assert_eq!(b.vector, a.vector.inverse());
            }
            other => panic!("expected two jogs, got {other:?}"),
        }

        let outcome = s.handle_utterance("undo").await;
        assert!(matches!(outcome, SessionOutcome::Blocked { .. }));
    }

    #[tokio::test]
    async fn repeat_reissues_the_last_descriptor() {
        let (mut s, log) = session(false);
        s.handle_utterance("jog left 5").await;
        let outcome = s.handle_utterance("repeat").await;
        assert_eq!(outcome, SessionOutcome::Executed { count: 1 });
        let sent = sent(&log);
        assert_eq!(sent[0], sent[1]);
    }

    #[tokio::test]
    async fn job_start_is_blocked_by_default() {
        let (mut s, log) = session(false);
        let outcome = s.handle_utterance("start job").await;
        assert!(matches!(outcome, SessionOutcome::Blocked { .. }));
        assert!(sent(&log).is_empty());
    }

    #[tokio::test]
    async fn allowed_job_start_maps_to_cycle_start_only() {
        let link = MockLink::new();
        let log = link.log_handle();
        let mut settings = SessionSettings::default();
        settings.require_confirmation = false;
        settings.allow_job_start = true;
        let mut s = Session::new(link, Box::new(MockSpeech::new()))
            .with_timing(Timing::fast())
            .with_settings(settings);

        let outcome = s.handle_utterance("start job").await;
        assert_eq!(outcome, SessionOutcome::Executed { count: 1 });
        assert_eq!(*log.lock().unwrap(), vec![SentCommand::CycleStart]);
    }

    #[tokio::test]
    async fn wake_word_arms_and_expires() {
        let link = MockLink::new();
        let log = link.log_handle();
        let mut settings = SessionSettings::default();
        settings.require_confirmation = false;
        settings.wake_word_enabled = true;
        settings.wake_word = "hey machine".to_string();
        let mut s = Session::new(link, Box::new(MockSpeech::new()))
            .with_timing(Timing::fast())
            .with_settings(settings);

        // Without the wake word nothing happens.
        assert_eq!(s.handle_utterance("jog left 5").await, SessionOutcome::Ignored);

        // Wake word alone arms; the next utterance is the command.
        assert_eq!(
            s.handle_utterance("hey machine").await,
            SessionOutcome::WakeArmed
        );
        assert_eq!(
            s.handle_utterance("jog left 5").await,
            SessionOutcome::Executed { count: 1 }
        );
        assert_eq!(sent(&log).len(), 1);

        // Arm again, let it expire, and the command is ignored again.
        s.handle_utterance("hey machine").await;
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(s.handle_utterance("jog left 5").await, SessionOutcome::Ignored);
    }

    #[tokio::test]
    async fn wake_word_with_inline_command_skips_arming() {
        let link = MockLink::new();
        let log = link.log_handle();
        let mut settings = SessionSettings::default();
        settings.require_confirmation = false;
        settings.wake_word_enabled = true;
        settings.wake_word = "hey machine".to_string();
        let mut s = Session::new(link, Box::new(MockSpeech::new()))
            .with_timing(Timing::fast())
            .with_settings(settings);

        assert_eq!(
            s.handle_utterance("hey machine jog left 5").await,
            SessionOutcome::Executed { count: 1 }
        );
        assert_eq!(sent(&log).len(), 1);
    }

    #[tokio::test]
    async fn stop_is_reachable_without_wake_word() {
        let link = MockLink::new();
        let log = link.log_handle();
        let mut settings = SessionSettings::default();
        settings.wake_word_enabled = true;
        let mut s = Session::new(link, Box::new(MockSpeech::new()))
            .with_timing(Timing::fast())
            .with_settings(settings);

        assert_eq!(s.handle_utterance("stop").await, SessionOutcome::Stopped);
        assert_eq!(sent(&log), vec![SentCommand::SoftReset]);
    }

    #[tokio::test]
    async fn messy_transcript_flows_end_to_end() {
        let (mut s, log) = session(false);
        let outcome = s
            .handle_utterance("Move ex left twenty five point five, execute")
            .await;
        assert_eq!(outcome, SessionOutcome::Executed { count: 1 });
        match &sent(&log)[0] {
            SentCommand::Jog(j) => {
                assert_eq!(j.vector.x, -25.5);
                assert_eq!(j.feed_mm_min, 1000.0);
            }
            other => panic!("expected jog, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn imperial_units_convert_spoken_distances() {
        let (mut s, log) = session(false);
        assert_eq!(
            s.handle_utterance("set units to inches").await,
            SessionOutcome::Executed { count: 1 }
        );
        s.handle_utterance("move right two").await;
        match &sent(&log)[0] {
            SentCommand::Jog(j) => assert!((j.vector.x - 50.8).abs() < 1e-9),
            other => panic!("expected jog, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stop_handle_cancels_remaining_chain() {
        let (mut s, log) = session(false);
        let handle = s.stop_handle();
        handle.trigger();
        // The flag is checked before every dispatch, so the whole chain is
        // abandoned before anything reaches the link.
        let outcome = s.handle_utterance("jog up then jog down").await;
        assert_eq!(outcome, SessionOutcome::Stopped);
        assert!(sent(&log).is_empty());
    }
}
