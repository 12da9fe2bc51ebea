//! Error types for the register engine.
//!
//! [`DigitizerError`] is the single error type surfaced by the library. Every
//! error is terminal for the current run: there is no retry or partial-success
//! path, the orchestrator propagates the first classified failure after the
//! device session has been released.
//!
//! [`classify`] maps the transport status-code domain onto [`FailureKind`]
//! with a fixed diagnostic per code. It is only ever invoked on a known-failed
//! cycle or transaction; handing it a success status is reported as an
//! internal logic error rather than silently ignored.

use crate::registers::RegisterScope;
use crate::transport::CommStatus;
use thiserror::Error;

/// Convenience alias for results using the library error type.
pub type DigiResult<T> = std::result::Result<T, DigitizerError>;

/// Named failure kind for each non-success transport status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// VME bus error during a cycle.
    VmeBusError,
    /// Communication error.
    CommError,
    /// Unspecified error.
    GenericError,
    /// Invalid parameter.
    InvalidParam,
    /// Invalid link type.
    InvalidLinkType,
    /// Invalid device handle.
    InvalidHandle,
    /// Communication timeout.
    CommTimeout,
    /// Requested device could not be opened.
    DeviceNotFound,
    /// Maximum number of devices exceeded.
    MaxDevicesExceeded,
    /// Device already open.
    DeviceAlreadyOpen,
    /// Function not supported.
    NotSupported,
    /// No boards controlled by that bridge.
    UnusedBridge,
    /// Communication terminated by the device.
    Terminated,
}

impl FailureKind {
    /// Fixed diagnostic string for this failure kind.
    pub fn message(self) -> &'static str {
        match self {
            FailureKind::VmeBusError => "VME bus error during cycle",
            FailureKind::CommError => "communication error",
            FailureKind::GenericError => "unspecified error",
            FailureKind::InvalidParam => "invalid parameter",
            FailureKind::InvalidLinkType => "invalid link type",
            FailureKind::InvalidHandle => "invalid device handle",
            FailureKind::CommTimeout => "communication timeout",
            FailureKind::DeviceNotFound => "unable to open requested device",
            FailureKind::MaxDevicesExceeded => "maximum number of devices exceeded",
            FailureKind::DeviceAlreadyOpen => "device already open",
            FailureKind::NotSupported => "not supported function",
            FailureKind::UnusedBridge => "there are no boards controlled by that bridge",
            FailureKind::Terminated => "communication terminated by device",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Map a transport status to its failure kind.
///
/// Total over the 13 failure codes. A [`CommStatus::Success`] reaching this
/// function means failure handling was invoked on a success path and yields
/// [`DigitizerError::InternalLogic`].
pub fn classify(status: CommStatus) -> DigiResult<FailureKind> {
    match status {
        CommStatus::Success => Err(DigitizerError::InternalLogic {
            context: "error classifier invoked on a success status",
        }),
        CommStatus::VmeBusError => Ok(FailureKind::VmeBusError),
        CommStatus::CommError => Ok(FailureKind::CommError),
        CommStatus::GenericError => Ok(FailureKind::GenericError),
        CommStatus::InvalidParam => Ok(FailureKind::InvalidParam),
        CommStatus::InvalidLinkType => Ok(FailureKind::InvalidLinkType),
        CommStatus::InvalidHandle => Ok(FailureKind::InvalidHandle),
        CommStatus::CommTimeout => Ok(FailureKind::CommTimeout),
        CommStatus::DeviceNotFound => Ok(FailureKind::DeviceNotFound),
        CommStatus::MaxDevicesError => Ok(FailureKind::MaxDevicesExceeded),
        CommStatus::DeviceAlreadyOpen => Ok(FailureKind::DeviceAlreadyOpen),
        CommStatus::NotSupported => Ok(FailureKind::NotSupported),
        CommStatus::UnusedBridge => Ok(FailureKind::UnusedBridge),
        CommStatus::Terminated => Ok(FailureKind::Terminated),
    }
}

/// Primary error type for the digitizer register engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DigitizerError {
    /// The multi-transfer buffer is full.
    ///
    /// This is a programming-contract violation, not an environmental error:
    /// the register map grew past the hardware batch limit without the
    /// capacity constant being updated. The phase aborts rather than
    /// silently truncating the batch.
    #[error(
        "multi-transfer capacity exceeded: {capacity} entries already staged \
         (register map growth requires updating the transfer capacity)"
    )]
    CapacityExceeded {
        /// Configured batch capacity.
        capacity: usize,
    },

    /// Opening the device session failed.
    #[error("failed to open digitizer #{module}: {kind}")]
    OpenFailed {
        /// Module number of the digitizer.
        module: usize,
        /// Classified transport failure.
        kind: FailureKind,
    },

    /// A single read cycle within a batch failed.
    #[error("error in read back from address {address:#06x} ({scope} registers): {kind}")]
    CycleFailed {
        /// Phase in which the cycle failed.
        scope: RegisterScope,
        /// Physical register address of the failing cycle.
        address: u32,
        /// Classified transport failure.
        kind: FailureKind,
    },

    /// The transaction as a whole failed although every cycle succeeded.
    #[error("overall error in readback of {scope} registers: {kind}")]
    AggregateFailed {
        /// Phase in which the transaction failed.
        scope: RegisterScope,
        /// Classified transport failure.
        kind: FailureKind,
    },

    /// Failure handling was reached on a success path.
    #[error("internal logic error: {context}")]
    InternalLogic {
        /// Description of the violated expectation.
        context: &'static str,
    },

    /// Configuration or register-map validation failed.
    #[error("configuration error: {0}")]
    Config(String),
}
