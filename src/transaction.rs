//! Batched multi-transfer buffer, execution and readback validation.
//!
//! One [`MultiTransaction`] holds the four parallel lanes of a batched
//! transfer: addresses, write data, readback values and per-cycle statuses.
//! The lanes share one logical length bounded by the hardware batch limit
//! [`MULTI_RW_CAPACITY`]; the buffer is allocated once and reused across
//! phases.

use crate::error::{classify, DigiResult, DigitizerError};
use crate::registers::RegisterScope;
use crate::session::DeviceSession;
use crate::transport::{CommStatus, Transport};

/// Hardware-imposed maximum number of cycles in one batched transfer.
pub const MULTI_RW_CAPACITY: usize = 320;

/// Pattern written to every readback slot before a transfer.
///
/// Distinguishable from any register reset value, so a transport that reports
/// success without actually filling a slot shows up in the readback log.
pub const READBACK_SENTINEL: u32 = 0x1234_5678;

/// Fixed-capacity batch transfer buffer.
#[derive(Debug)]
pub struct MultiTransaction {
    addresses: Vec<u32>,
    write_data: Vec<u32>,
    readback: Vec<u32>,
    cycle_status: Vec<CommStatus>,
    capacity: usize,
}

impl MultiTransaction {
    /// Create a buffer with the hardware batch capacity.
    pub fn new() -> Self {
        Self::with_capacity(MULTI_RW_CAPACITY)
    }

    /// Create a buffer with an explicit capacity (tests use small ones).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            addresses: Vec::with_capacity(capacity),
            write_data: Vec::with_capacity(capacity),
            readback: Vec::with_capacity(capacity),
            cycle_status: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Hard ceiling on the number of cycles per transfer.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of cycles currently staged.
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// True when no cycles are staged.
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    /// Stage a read cycle for `address`; returns its index within the batch.
    pub fn append(&mut self, address: u32) -> DigiResult<usize> {
        self.append_write(address, 0)
    }

    /// Stage a cycle with explicit write data.
    ///
    /// Fails with [`DigitizerError::CapacityExceeded`] once the batch is full;
    /// the batch is never silently truncated.
    pub fn append_write(&mut self, address: u32, data: u32) -> DigiResult<usize> {
        if self.addresses.len() == self.capacity {
            return Err(DigitizerError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        let index = self.addresses.len();
        self.addresses.push(address);
        self.write_data.push(data);
        self.readback.push(READBACK_SENTINEL);
        self.cycle_status.push(CommStatus::Success);
        Ok(index)
    }

    /// Clear all lanes for the next phase. Capacity (and the underlying
    /// allocations) are retained.
    pub fn reset(&mut self) {
        self.addresses.clear();
        self.write_data.clear();
        self.readback.clear();
        self.cycle_status.clear();
    }

    /// Rewrite every readback slot with [`READBACK_SENTINEL`].
    pub fn arm_readback(&mut self) {
        for slot in &mut self.readback {
            *slot = READBACK_SENTINEL;
        }
    }

    /// Staged addresses, in cycle order.
    pub fn addresses(&self) -> &[u32] {
        &self.addresses
    }

    /// Readback values from the last transfer.
    pub fn readback(&self) -> &[u32] {
        &self.readback
    }

    /// Per-cycle statuses from the last transfer.
    pub fn cycle_status(&self) -> &[CommStatus] {
        &self.cycle_status
    }

    /// Mutable access for the transport layer to fill results in place.
    pub(crate) fn result_lanes(&mut self) -> (&[u32], &mut [u32], &mut [CommStatus]) {
        (&self.addresses, &mut self.readback, &mut self.cycle_status)
    }
}

impl Default for MultiTransaction {
    fn default() -> Self {
        Self::new()
    }
}

/// Whole-transaction result of one batched transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionOutcome {
    /// Status of the transfer as a whole, distinct from per-cycle statuses.
    pub aggregate: CommStatus,
}

/// Issue one batched read for the staged addresses.
///
/// Readback slots are re-armed with the sentinel first; results land in the
/// transaction's readback and status lanes. Single attempt, no retries.
pub fn execute_read<T: Transport>(
    session: &mut DeviceSession<'_, T>,
    txn: &mut MultiTransaction,
) -> TransactionOutcome {
    txn.arm_readback();
    let aggregate = session.multi_read32(txn);
    TransactionOutcome { aggregate }
}

/// Validate a completed transfer.
///
/// Walks per-cycle statuses in address order and fails on the first failing
/// entry; a single bus error invalidates trust in the whole batch, so later
/// entries are not examined. Only when every cycle succeeded is the aggregate
/// status checked; an aggregate failure is phase-wide and carries no address.
pub fn validate_readback(
    scope: RegisterScope,
    txn: &MultiTransaction,
    outcome: TransactionOutcome,
) -> DigiResult<()> {
    for (&address, &status) in txn.addresses().iter().zip(txn.cycle_status()) {
        if !status.is_success() {
            let kind = classify(status)?;
            tracing::error!(%scope, address = format_args!("{address:#06x}"), %kind,
                raw = status.raw(), "read cycle failed");
            return Err(DigitizerError::CycleFailed {
                scope,
                address,
                kind,
            });
        }
    }
    if !outcome.aggregate.is_success() {
        let kind = classify(outcome.aggregate)?;
        tracing::error!(%scope, %kind, raw = outcome.aggregate.raw(), "aggregate readback failure");
        return Err(DigitizerError::AggregateFailed { scope, kind });
    }
    Ok(())
}
