use core::fmt;
use thiserror::Error;

/// A failure reported by the transport layer.
///
/// Carries the transport's own error code and message. Primitives of a
/// [`Transport`](crate::Transport) return this instead of a bare status flag.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (code {code})")]
pub struct Fault {
    /// Transport specific error number.
    pub code: i32,
    /// Human readable description of the failure.
    pub message: String,
}

impl Fault {
    /// Creates a new fault from an error code and message.
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Optional device features gated on the family code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    /// Real-time clock counter and oscillator control.
    Clock,
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feature::Clock => write!(f, "clock features"),
        }
    }
}

/// Host-side 1-Wire error type.
#[derive(Debug, Error)]
pub enum OneWireError {
    /// Malformed input at the API boundary.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The adapter at `path` could not be acquired.
    #[error("failed to open 1-Wire port '{path}': {fault}")]
    Transport {
        /// Path handed to [`Port::open`](crate::Port::open).
        path: String,
        /// Failure reported by the adapter.
        #[source]
        fault: Fault,
    },
    /// A bus transaction failed.
    #[error("1-Wire I/O error: {0}")]
    Io(#[source] Fault),
    /// The port is closed (or was never opened).
    #[error("1-Wire port is not active")]
    InvalidState,
    /// The device family lacks the requested feature.
    #[error("device family 0x{family:02X} lacks {feature}")]
    UnsupportedFeature {
        /// Family code of the device.
        family: u8,
        /// The feature that was requested.
        feature: Feature,
    },
    /// Another transaction is already in progress on this port.
    #[error("1-Wire port is busy")]
    BusInUse,
}

impl From<Fault> for OneWireError {
    fn from(fault: Fault) -> Self {
        Self::Io(fault)
    }
}

impl OneWireError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
