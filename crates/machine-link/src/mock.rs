use crate::{AbsoluteTarget, JogRequest, LinkError, MachineLink, ProbeKind, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Everything a `MockLink` has been asked to send, in order.
#[derive(Clone, Debug, PartialEq)]
pub enum SentCommand {
    Jog(JogRequest),
    AbsoluteMove(AbsoluteTarget),
    Raw(String),
    SoftReset,
    CycleStart,
    ProbeStart(ProbeKind),
    ProbeStop,
}

/// In-process recording link. Tests keep a handle to the log and inspect it
/// after driving the session; `fail_next` makes the next send report a
/// transport error.
#[derive(Default)]
pub struct MockLink {
    log: Arc<Mutex<Vec<SentCommand>>>,
    fail_next: Arc<AtomicBool>,
}

impl MockLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle to the sent-command log.
    pub fn log_handle(&self) -> Arc<Mutex<Vec<SentCommand>>> {
        Arc::clone(&self.log)
    }

    /// Shared handle that, when set, fails exactly one subsequent send.
    pub fn fail_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.fail_next)
    }

    fn record(&mut self, cmd: SentCommand) -> Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(LinkError::Io("mock transport failure".to_string()));
        }
        if let Ok(mut log) = self.log.lock() {
            log.push(cmd);
        }
        Ok(())
    }
}

impl MachineLink for MockLink {
    fn send_jog(&mut self, jog: &JogRequest) -> Result<()> {
        self.record(SentCommand::Jog(*jog))
    }

    fn send_absolute_move(&mut self, target: &AbsoluteTarget) -> Result<()> {
        self.record(SentCommand::AbsoluteMove(*target))
    }

    fn send_raw_command(&mut self, command: &str) -> Result<()> {
        self.record(SentCommand::Raw(command.to_string()))
    }

    fn send_soft_reset(&mut self) -> Result<()> {
        self.record(SentCommand::SoftReset)
    }

    fn send_cycle_start(&mut self) -> Result<()> {
        self.record(SentCommand::CycleStart)
    }

    fn start_probe(&mut self, kind: ProbeKind) -> Result<()> {
        self.record(SentCommand::ProbeStart(kind))
    }

    fn stop_probe(&mut self) -> Result<()> {
        self.record(SentCommand::ProbeStop)
    }
}
