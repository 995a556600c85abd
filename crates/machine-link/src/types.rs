use core::fmt;
use serde::{Deserialize, Serialize};

/// A single machine axis.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Axis::X => write!(f, "X"),
            Axis::Y => write!(f, "Y"),
            Axis::Z => write!(f, "Z"),
        }
    }
}

/// Signed per-axis offsets in millimeters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JogVector {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl JogVector {
    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    /// The jog that exactly reverses this one.
    pub fn inverse(&self) -> Self {
        Self {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }

    pub fn add_axis(&mut self, axis: Axis, mm: f64) {
        match axis {
            Axis::X => self.x += mm,
            Axis::Y => self.y += mm,
            Axis::Z => self.z += mm,
        }
    }
}

impl fmt::Display for JogVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, v) in [("X", self.x), ("Y", self.y), ("Z", self.z)] {
            if v != 0.0 {
                if !first {
                    write!(f, " ")?;
                }
                write!(f, "{name}{v:+.3}")?;
                first = false;
            }
        }
        if first {
            write!(f, "X+0.000")?;
        }
        Ok(())
    }
}

/// A relative jog, already unit-converted to canonical mm / mm-per-min.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct JogRequest {
    pub vector: JogVector,
    pub feed_mm_min: f64,
}

/// Absolute positioning target; `None` axes are left where they are.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AbsoluteTarget {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub feed_mm_min: f64,
}

/// Probe cycle variants the controller knows how to run.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ProbeKind {
    ZTouch,
    Corner,
    Center,
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeKind::ZTouch => write!(f, "z-touch"),
            ProbeKind::Corner => write!(f, "corner"),
            ProbeKind::Center => write!(f, "center"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum SpindleDirection {
    Clockwise,
    CounterClockwise,
}

/// Controller activity states as reported by the status feed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum MachineState {
    Idle,
    Run,
    Hold,
    Jog,
    Alarm,
    Home,
    Check,
    Door,
    Sleep,
    Unknown,
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MachineState::Idle => "idle",
            MachineState::Run => "running",
            MachineState::Hold => "holding",
            MachineState::Jog => "jogging",
            MachineState::Alarm => "alarm",
            MachineState::Home => "homing",
            MachineState::Check => "check",
            MachineState::Door => "door open",
            MachineState::Sleep => "sleeping",
            MachineState::Unknown => "unknown",
        };
        write!(f, "{s}")
    }
}

/// A work-coordinate position in millimeters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Telemetry pushed in by the status feed. The voice core never polls; the
/// owning session just holds the most recent snapshot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MachineSnapshot {
    pub position: Position,
    pub state: MachineState,
    pub feed_mm_min: f64,
    /// Cumulative per-axis travel since power-on, in mm.
    pub travel_mm: JogVector,
}

impl Default for MachineSnapshot {
    fn default() -> Self {
        Self {
            position: Position::default(),
            state: MachineState::Unknown,
            feed_mm_min: 0.0,
            travel_mm: JogVector::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jog_vector_inverse_negates_each_axis() {
        let v = JogVector {
            x: 20.0,
            y: -10.0,
            z: 0.0,
        };
        let inv = v.inverse();
        assert_eq!(inv.x, -20.0);
        assert_eq!(inv.y, 10.0);
        assert_eq!(inv.z, 0.0);
    }

    #[test]
    fn jog_vector_display_skips_zero_axes() {
        let v = JogVector {
            x: -50.0,
            y: 0.0,
            z: 5.0,
        };
        assert_eq!(v.to_string(), "X-50.000 Z+5.000");
    }
}
