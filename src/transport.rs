//! Bus transport abstraction for the digitizer link.
//!
//! The physical link driver (optical link or USB bridge, CAENComm-style) is an
//! external collaborator. This module pins down the three primitives the core
//! consumes (`open`, `multi_read32`, `close`) together with the full status
//! code domain those primitives can report, and provides [`MockTransport`] so
//! the register engine can be exercised without hardware.

use std::collections::HashMap;

/// Status code returned by every transport primitive.
///
/// The numeric values match the CAENComm error-code domain; `from_raw` is the
/// single entry point for an FFI binding layer that receives raw `i32`s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum CommStatus {
    /// Operation completed.
    Success = 0,
    /// VME bus error during the cycle.
    VmeBusError = -1,
    /// Communication error.
    CommError = -2,
    /// Unspecified error.
    GenericError = -3,
    /// Invalid parameter.
    InvalidParam = -4,
    /// Invalid link type.
    InvalidLinkType = -5,
    /// Invalid device handle.
    InvalidHandle = -6,
    /// Communication timeout.
    CommTimeout = -7,
    /// Unable to open the requested device.
    DeviceNotFound = -8,
    /// Maximum number of devices exceeded.
    MaxDevicesError = -9,
    /// Device already open.
    DeviceAlreadyOpen = -10,
    /// Function not supported by this device.
    NotSupported = -11,
    /// No boards controlled by that bridge.
    UnusedBridge = -12,
    /// Communication terminated by the device.
    Terminated = -13,
}

impl CommStatus {
    /// All status codes the transport can report, success included.
    pub const ALL: [CommStatus; 14] = [
        CommStatus::Success,
        CommStatus::VmeBusError,
        CommStatus::CommError,
        CommStatus::GenericError,
        CommStatus::InvalidParam,
        CommStatus::InvalidLinkType,
        CommStatus::InvalidHandle,
        CommStatus::CommTimeout,
        CommStatus::DeviceNotFound,
        CommStatus::MaxDevicesError,
        CommStatus::DeviceAlreadyOpen,
        CommStatus::NotSupported,
        CommStatus::UnusedBridge,
        CommStatus::Terminated,
    ];

    /// Raw CAENComm-compatible value.
    pub fn raw(self) -> i32 {
        self as i32
    }

    /// Decode a raw status value; `None` for codes outside the domain.
    pub fn from_raw(raw: i32) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.raw() == raw)
    }

    /// True for [`CommStatus::Success`].
    pub fn is_success(self) -> bool {
        self == CommStatus::Success
    }
}

/// Link type used to open the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkType {
    /// CONET optical link (the default for Vx1730 crates).
    OpticalLink,
    /// USB bridge.
    Usb,
}

/// Opaque handle to an open device, issued by [`Transport::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Handle(pub(crate) i32);

/// Synchronous bus transport consumed by the register engine.
///
/// Calls are blocking; timeouts are owned by the implementation, not by the
/// core. The core issues no transport calls beyond these three.
pub trait Transport {
    /// Open the device at `device_index` over `link`.
    fn open(&mut self, link: LinkType, device_index: u32) -> Result<Handle, CommStatus>;

    /// Batched 32-bit register read.
    ///
    /// Fills `readback[i]` and `cycle_status[i]` for each `addresses[i]` and
    /// returns the aggregate status for the transaction as a whole. All three
    /// slices have the same length.
    fn multi_read32(
        &mut self,
        handle: Handle,
        addresses: &[u32],
        readback: &mut [u32],
        cycle_status: &mut [CommStatus],
    ) -> CommStatus;

    /// Release the device handle.
    fn close(&mut self, handle: Handle) -> CommStatus;
}

/// Mock transport for testing without hardware.
///
/// Serves register values from a programmable table and supports scripted
/// failures: per-address cycle errors, an aggregate-status override, and a
/// forced open failure. Open/close calls are counted so tests can verify the
/// session lifecycle.
#[derive(Debug, Default)]
pub struct MockTransport {
    registers: HashMap<u32, u32>,
    cycle_failures: HashMap<u32, CommStatus>,
    aggregate_override: Option<CommStatus>,
    open_failure: Option<CommStatus>,
    read_batches: Vec<Vec<u32>>,
    open_count: usize,
    close_count: usize,
    opened: bool,
}

impl MockTransport {
    /// Create a mock with an empty register table (all reads return 0).
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload a register value.
    pub fn set_register(&mut self, address: u32, value: u32) {
        self.registers.insert(address, value);
    }

    /// Fail every read cycle touching `address` with `status`.
    pub fn fail_cycle(&mut self, address: u32, status: CommStatus) {
        self.cycle_failures.insert(address, status);
    }

    /// Force the aggregate status of every transaction to `status`.
    pub fn fail_aggregate(&mut self, status: CommStatus) {
        self.aggregate_override = Some(status);
    }

    /// Make the next `open` fail with `status`.
    pub fn fail_open(&mut self, status: CommStatus) {
        self.open_failure = Some(status);
    }

    /// Address lists of every `multi_read32` issued, in call order.
    pub fn read_batches(&self) -> &[Vec<u32>] {
        &self.read_batches
    }

    /// Number of successful `open` calls so far.
    pub fn open_count(&self) -> usize {
        self.open_count
    }

    /// Number of `close` calls so far.
    pub fn close_count(&self) -> usize {
        self.close_count
    }
}

impl Transport for MockTransport {
    fn open(&mut self, link: LinkType, device_index: u32) -> Result<Handle, CommStatus> {
        if let Some(status) = self.open_failure.take() {
            return Err(status);
        }
        if self.opened {
            return Err(CommStatus::DeviceAlreadyOpen);
        }
        tracing::debug!(?link, device_index, "mock transport open");
        self.opened = true;
        self.open_count += 1;
        Ok(Handle(self.open_count as i32))
    }

    fn multi_read32(
        &mut self,
        handle: Handle,
        addresses: &[u32],
        readback: &mut [u32],
        cycle_status: &mut [CommStatus],
    ) -> CommStatus {
        if !self.opened || handle.0 != self.open_count as i32 {
            return CommStatus::InvalidHandle;
        }
        self.read_batches.push(addresses.to_vec());
        for (i, &addr) in addresses.iter().enumerate() {
            match self.cycle_failures.get(&addr) {
                Some(&status) => {
                    // Failed cycles leave the readback slot untouched, like a
                    // real bridge that aborts the cycle.
                    cycle_status[i] = status;
                }
                None => {
                    readback[i] = self.registers.get(&addr).copied().unwrap_or(0);
                    cycle_status[i] = CommStatus::Success;
                }
            }
        }
        self.aggregate_override.unwrap_or(CommStatus::Success)
    }

    fn close(&mut self, handle: Handle) -> CommStatus {
        self.close_count += 1;
        if !self.opened || handle.0 != self.open_count as i32 {
            return CommStatus::InvalidHandle;
        }
        self.opened = false;
        CommStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_raw() {
        for status in CommStatus::ALL {
            assert_eq!(CommStatus::from_raw(status.raw()), Some(status));
        }
    }

    #[test]
    fn out_of_domain_raw_is_rejected() {
        assert_eq!(CommStatus::from_raw(-14), None);
        assert_eq!(CommStatus::from_raw(1), None);
    }

    #[test]
    fn mock_serves_programmed_registers() {
        let mut mock = MockTransport::new();
        mock.set_register(0x8000, 0x0001_0000);

        let handle = mock.open(LinkType::OpticalLink, 0).unwrap();
        let addresses = [0x8000, 0x8004];
        let mut readback = [0u32; 2];
        let mut statuses = [CommStatus::Success; 2];

        let aggregate = mock.multi_read32(handle, &addresses, &mut readback, &mut statuses);
        assert!(aggregate.is_success());
        assert_eq!(readback, [0x0001_0000, 0]);
        assert_eq!(mock.close(handle), CommStatus::Success);
    }

    #[test]
    fn mock_rejects_stale_handle() {
        let mut mock = MockTransport::new();
        let handle = mock.open(LinkType::Usb, 0).unwrap();
        assert_eq!(mock.close(handle), CommStatus::Success);

        let mut readback = [0u32; 1];
        let mut statuses = [CommStatus::Success; 1];
        let aggregate = mock.multi_read32(handle, &[0x8000], &mut readback, &mut statuses);
        assert_eq!(aggregate, CommStatus::InvalidHandle);
    }

    #[test]
    fn mock_scripts_cycle_failures() {
        let mut mock = MockTransport::new();
        mock.fail_cycle(0x8004, CommStatus::VmeBusError);

        let handle = mock.open(LinkType::OpticalLink, 0).unwrap();
        let mut readback = [0u32; 2];
        let mut statuses = [CommStatus::Success; 2];
        let aggregate = mock.multi_read32(handle, &[0x8000, 0x8004], &mut readback, &mut statuses);

        assert!(aggregate.is_success());
        assert_eq!(statuses[0], CommStatus::Success);
        assert_eq!(statuses[1], CommStatus::VmeBusError);
    }
}
