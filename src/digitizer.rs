//! Phase orchestration for Vx1730 register configuration readback.
//!
//! [`Vx1730Digitizer`] sequences the three register phases (common, group,
//! individual) against one open device session. Each phase stages every
//! register address in its scope into the shared batch buffer, fires a single
//! batched read, validates the per-cycle and aggregate outcomes, and logs the
//! readback table. The first failure aborts the entire run; no partially
//! verified configuration is treated as safe. The session guard releases the
//! handle whichever way the run ends.

use crate::config::DigitizerConfig;
use crate::error::DigiResult;
use crate::registers::{
    validate_register_map, ChannelRegister, ChannelTopology, CommonRegister, GroupRegister,
    RegisterScope,
};
use crate::session::DeviceSession;
use crate::transaction::{execute_read, validate_readback, MultiTransaction};
use crate::transport::{LinkType, Transport};

/// Register configuration/readback engine for one digitizer module.
pub struct Vx1730Digitizer<T: Transport> {
    module_number: usize,
    topology: ChannelTopology,
    link: LinkType,
    device_index: u32,
    transport: T,
    // One buffer reused across all phases; bounded by the batch capacity.
    txn: MultiTransaction,
    // Logging context carried by every event this engine emits, injected at
    // construction instead of reaching for process-wide state.
    span: tracing::Span,
}

impl<T: Transport> Vx1730Digitizer<T> {
    /// Build the engine from configuration and a transport backend.
    ///
    /// Validates the channel topology and the register map before any bus
    /// traffic is possible.
    pub fn new(config: &DigitizerConfig, transport: T) -> DigiResult<Self> {
        let topology = config.topology();
        topology.validate()?;
        validate_register_map()?;
        Ok(Self {
            module_number: config.module_number,
            topology,
            link: config.link,
            device_index: config.device_index,
            transport,
            txn: MultiTransaction::new(),
            span: tracing::info_span!("digitizer", module = config.module_number),
        })
    }

    /// Module number this engine reports in diagnostics.
    pub fn module_number(&self) -> usize {
        self.module_number
    }

    /// Open the device, run all three phases in order, close the device.
    ///
    /// Phases are logically independent reads; the common → group →
    /// individual order is fixed for diagnostic consistency. Any failure
    /// aborts the run, with the session released before the error is
    /// surfaced.
    pub fn configure_registers(&mut self) -> DigiResult<()> {
        let Self {
            module_number,
            topology,
            link,
            device_index,
            transport,
            txn,
            span,
        } = self;
        let _guard = span.enter();
        let module = *module_number;

        let mut session = DeviceSession::open(transport, *link, *device_index, module)?;
        for scope in [
            RegisterScope::Common,
            RegisterScope::Group,
            RegisterScope::Individual,
        ] {
            run_phase(scope, &mut session, txn, topology, module)?;
        }
        session.close();
        tracing::info!(module, "register readback complete for all scopes");
        Ok(())
    }

    /// Consume the engine and hand the transport back (used by tests to
    /// inspect mock state after a run).
    pub fn into_transport(self) -> T {
        self.transport
    }
}

fn run_phase<T: Transport>(
    scope: RegisterScope,
    session: &mut DeviceSession<'_, T>,
    txn: &mut MultiTransaction,
    topology: &ChannelTopology,
    module: usize,
) -> DigiResult<()> {
    txn.reset();
    match scope {
        RegisterScope::Common => fill_common(txn)?,
        RegisterScope::Group => fill_group(txn, topology)?,
        RegisterScope::Individual => fill_individual(txn, topology)?,
    }
    tracing::debug!(module, %scope, cycles = txn.len(), "issuing batched readback");

    let outcome = execute_read(session, txn);
    validate_readback(scope, txn, outcome)?;

    log_readback_table(scope, txn, module);
    Ok(())
}

/// Stage every board-wide register, in the bring-up order (including the
/// duplicated `DisableExtTrig` entry, see [`CommonRegister::READBACK_ORDER`]).
fn fill_common(txn: &mut MultiTransaction) -> DigiResult<()> {
    for kind in CommonRegister::READBACK_ORDER {
        txn.append(kind.address())?;
    }
    Ok(())
}

/// Stage every channel-pair register for every group, pair-major.
fn fill_group(txn: &mut MultiTransaction, topology: &ChannelTopology) -> DigiResult<()> {
    for channel in topology.pair_leaders() {
        for kind in GroupRegister::ALL {
            txn.append(kind.address(topology, channel))?;
        }
    }
    Ok(())
}

/// Stage every per-channel register for every channel, channel-major.
fn fill_individual(txn: &mut MultiTransaction, topology: &ChannelTopology) -> DigiResult<()> {
    for channel in topology.channels() {
        for kind in ChannelRegister::ALL {
            txn.append(kind.address(topology, channel))?;
        }
    }
    Ok(())
}

fn log_readback_table(scope: RegisterScope, txn: &MultiTransaction, module: usize) {
    tracing::info!(module, %scope, "register readback");
    tracing::info!("  addr |   read");
    for (&address, &value) in txn.addresses().iter().zip(txn.readback()) {
        tracing::info!("{address:#06x} | {value:#010x}");
    }
}
