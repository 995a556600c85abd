use crate::{AbsoluteTarget, JogRequest, ProbeKind, Result};

/// A minimal blocking interface to the machine controller.
///
/// Callers hand over canonical, already unit-converted payloads; the backend
/// owns wire encoding and delivery acknowledgement. A returned error means
/// the command was not accepted and must not be treated as executed.
pub trait MachineLink: Send {
    /// Issue a relative jog.
    fn send_jog(&mut self, jog: &JogRequest) -> Result<()>;

    /// Issue an absolute positioning move.
    fn send_absolute_move(&mut self, target: &AbsoluteTarget) -> Result<()>;

    /// Send a raw controller command (G-code or realtime byte).
    fn send_raw_command(&mut self, command: &str) -> Result<()>;

    /// Soft-reset the controller, halting all motion immediately.
    fn send_soft_reset(&mut self) -> Result<()>;

    /// Cycle-start / resume a held job.
    fn send_cycle_start(&mut self) -> Result<()>;

    /// Begin a probe cycle.
    fn start_probe(&mut self, kind: ProbeKind) -> Result<()>;

    /// Abort a probe cycle in progress.
    fn stop_probe(&mut self) -> Result<()>;
}
