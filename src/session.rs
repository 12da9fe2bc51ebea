//! Device session lifetime management.
//!
//! A [`DeviceSession`] borrows the transport for the duration of one
//! orchestration run. The handle is released exactly once: either through the
//! explicit [`DeviceSession::close`] at the end of a successful run, or by the
//! `Drop` backstop when a phase aborts with an error. Scoped release keeps the
//! handle from leaking on any exit path without close calls scattered across
//! error branches.

use crate::error::{classify, DigiResult, DigitizerError};
use crate::transaction::MultiTransaction;
use crate::transport::{CommStatus, Handle, LinkType, Transport};

/// One open transport handle, released on drop.
#[derive(Debug)]
pub struct DeviceSession<'t, T: Transport> {
    transport: &'t mut T,
    handle: Handle,
    module: usize,
    closed: bool,
}

impl<'t, T: Transport> DeviceSession<'t, T> {
    /// Open the device and wrap the handle in a session guard.
    ///
    /// An open failure is terminal: it is classified and surfaced as
    /// [`DigitizerError::OpenFailed`], no retry.
    pub fn open(
        transport: &'t mut T,
        link: LinkType,
        device_index: u32,
        module: usize,
    ) -> DigiResult<Self> {
        tracing::info!(module, ?link, device_index, "opening digitizer");
        match transport.open(link, device_index) {
            Ok(handle) => {
                tracing::info!(module, "successfully opened digitizer");
                Ok(Self {
                    transport,
                    handle,
                    module,
                    closed: false,
                })
            }
            Err(status) => {
                let kind = classify(status)?;
                tracing::error!(module, %kind, "failed to open digitizer");
                Err(DigitizerError::OpenFailed { module, kind })
            }
        }
    }

    /// Issue one batched read bound to this session's handle.
    ///
    /// Fills the transaction's readback and status lanes in place and returns
    /// the aggregate status.
    pub fn multi_read32(&mut self, txn: &mut MultiTransaction) -> CommStatus {
        let (addresses, readback, statuses) = txn.result_lanes();
        self.transport
            .multi_read32(self.handle, addresses, readback, statuses)
    }

    /// Close the session explicitly.
    ///
    /// A failed close is logged and swallowed; the handle is gone either way
    /// and the run's outcome is decided by the phases, not the close.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let status = self.transport.close(self.handle);
        if status.is_success() {
            tracing::info!(module = self.module, "closed digitizer");
        } else {
            tracing::warn!(module = self.module, raw = status.raw(),
                "close reported a failure; handle released anyway");
        }
    }
}

impl<T: Transport> Drop for DeviceSession<'_, T> {
    fn drop(&mut self) {
        self.release();
    }
}
