//! machine-link: command delivery abstractions for a CNC controller
//!
//! This crate provides the traits and types the voice core uses to talk to a
//! physical machine. Payloads are canonical (millimeters, mm/min); wire
//! encoding and delivery acknowledgement belong to the backend. The default
//! build enables a `mock` backend so binaries compile on any host without a
//! serial connection.

mod types;
pub use types::{
    AbsoluteTarget, Axis, JogRequest, JogVector, MachineSnapshot, MachineState, Position,
    ProbeKind, SpindleDirection,
};

mod error;
pub use error::{LinkError, Result};

mod traits;
pub use traits::MachineLink;

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockLink, SentCommand};
