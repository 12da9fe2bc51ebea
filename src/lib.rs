//! Register configuration and readback verification for CAEN Vx1730
//! multi-channel waveform digitizers.
//!
//! The crate owns the batched register access and verification engine: it
//! derives physical register addresses for the three addressing scopes
//! (board-wide, channel-pair, per-channel), packs them into bounded batch
//! transfers, issues one batched read per phase through a [`Transport`]
//! backend, and classifies every possible transport failure deterministically.
//! The transport driver itself is an external collaborator; [`MockTransport`]
//! stands in for it in tests and mock runs.
//!
//! # Usage
//!
//! ```rust
//! use digitizer_daq::{DigitizerConfig, MockTransport, Vx1730Digitizer};
//!
//! let config = DigitizerConfig::default();
//! let mut digitizer = Vx1730Digitizer::new(&config, MockTransport::new())?;
//! digitizer.configure_registers()?;
//! # Ok::<(), digitizer_daq::DigitizerError>(())
//! ```

pub mod config;
pub mod digitizer;
pub mod error;
pub mod registers;
pub mod session;
pub mod transaction;
pub mod transport;

pub use config::DigitizerConfig;
pub use digitizer::Vx1730Digitizer;
pub use error::{classify, DigiResult, DigitizerError, FailureKind};
pub use registers::{
    ChannelRegister, ChannelTopology, CommonRegister, GroupRegister, RegisterScope,
};
pub use session::DeviceSession;
pub use transaction::{MultiTransaction, TransactionOutcome, MULTI_RW_CAPACITY, READBACK_SENTINEL};
pub use transport::{CommStatus, LinkType, MockTransport, Transport};
