//! End-to-end register readback scenarios against the mock transport.

use digitizer_daq::{
    ChannelRegister, CommStatus, CommonRegister, DigitizerConfig, DigitizerError, GroupRegister,
    MockTransport, RegisterScope, Vx1730Digitizer,
};

fn sixteen_channel_config() -> DigitizerConfig {
    DigitizerConfig {
        module_number: 0,
        channel_start: 0,
        channel_count: 16,
        ..DigitizerConfig::default()
    }
}

/// Scenario A: with topology {start: 0, count: 16} the group phase resolves
/// exactly pair_count x group-kind addresses, anchored at the configured
/// bases.
#[test]
fn group_phase_resolves_every_pair() {
    let mut digitizer =
        Vx1730Digitizer::new(&sixteen_channel_config(), MockTransport::new()).unwrap();
    digitizer.configure_registers().unwrap();

    let mock = digitizer.into_transport();
    let batches = mock.read_batches();
    assert_eq!(batches.len(), 3, "one batch per phase");

    let group_batch = &batches[1];
    assert_eq!(group_batch.len(), 8 * GroupRegister::ALL.len());
    assert_eq!(group_batch[0], GroupRegister::RecordLength.base());
    assert_eq!(
        group_batch[GroupRegister::ALL.len()],
        GroupRegister::RecordLength.base() + GroupRegister::RecordLength.stride()
    );

    // Common batch carries the duplicated DisableExtTrig entry; individual
    // covers every channel.
    assert_eq!(batches[0].len(), 18);
    assert_eq!(batches[2].len(), 16 * ChannelRegister::ALL.len());
}

/// Scenario B: an aggregate failure with all-clean cycles must still fail the
/// phase, phase-wide rather than address-specific.
#[test]
fn aggregate_failure_with_clean_cycles_fails_the_phase() {
    let mut mock = MockTransport::new();
    mock.fail_aggregate(CommStatus::CommError);

    let mut digitizer = Vx1730Digitizer::new(&sixteen_channel_config(), mock).unwrap();
    let err = digitizer.configure_registers().unwrap_err();
    match err {
        DigitizerError::AggregateFailed { scope, kind } => {
            assert_eq!(scope, RegisterScope::Common);
            assert_eq!(kind.message(), "communication error");
        }
        other => panic!("expected aggregate failure, got {other:?}"),
    }
}

/// Scenario C: the session is released exactly once even when the first phase
/// fails right after open.
#[test]
fn session_released_once_on_early_phase_failure() {
    let mut mock = MockTransport::new();
    mock.fail_cycle(CommonRegister::BoardConfig.address(), CommStatus::CommTimeout);

    let mut digitizer = Vx1730Digitizer::new(&sixteen_channel_config(), mock).unwrap();
    assert!(digitizer.configure_registers().is_err());

    let mock = digitizer.into_transport();
    assert_eq!(mock.open_count(), 1);
    assert_eq!(mock.close_count(), 1, "no double close, no leaked handle");
}

/// When several cycles fail, the first failing entry in address order is the
/// one reported.
#[test]
fn first_failing_cycle_wins() {
    let mut mock = MockTransport::new();
    mock.fail_cycle(
        CommonRegister::GlobalTrgMask.address(),
        CommStatus::VmeBusError,
    );
    mock.fail_cycle(
        CommonRegister::ReadoutCtrl.address(),
        CommStatus::GenericError,
    );

    let mut digitizer = Vx1730Digitizer::new(&sixteen_channel_config(), mock).unwrap();
    let err = digitizer.configure_registers().unwrap_err();
    match err {
        DigitizerError::CycleFailed { address, kind, .. } => {
            // GlobalTrgMask is staged before ReadoutCtrl in the common list.
            assert_eq!(address, CommonRegister::GlobalTrgMask.address());
            assert_eq!(kind.message(), "VME bus error during cycle");
        }
        other => panic!("expected cycle failure, got {other:?}"),
    }
}

/// An open failure aborts before any batch is issued and never touches close.
#[test]
fn open_failure_aborts_without_traffic() {
    let mut mock = MockTransport::new();
    mock.fail_open(CommStatus::MaxDevicesError);

    let mut digitizer = Vx1730Digitizer::new(&sixteen_channel_config(), mock).unwrap();
    let err = digitizer.configure_registers().unwrap_err();
    assert!(matches!(err, DigitizerError::OpenFailed { module: 0, .. }));

    let mock = digitizer.into_transport();
    assert!(mock.read_batches().is_empty());
    assert_eq!(mock.close_count(), 0);
}

/// A later phase failure still reports its own scope.
#[test]
fn individual_phase_failure_reports_individual_scope() {
    let config = DigitizerConfig {
        channel_start: 0,
        channel_count: 4,
        ..DigitizerConfig::default()
    };
    let mut mock = MockTransport::new();
    let topology = config.topology();
    let failing = ChannelRegister::TrgThreshold.address(&topology, 3);
    mock.fail_cycle(failing, CommStatus::Terminated);

    let mut digitizer = Vx1730Digitizer::new(&config, mock).unwrap();
    let err = digitizer.configure_registers().unwrap_err();
    match err {
        DigitizerError::CycleFailed {
            scope, address, ..
        } => {
            assert_eq!(scope, RegisterScope::Individual);
            assert_eq!(address, failing);
        }
        other => panic!("expected cycle failure, got {other:?}"),
    }

    let mock = digitizer.into_transport();
    assert_eq!(mock.close_count(), 1);
}

/// Readback values flow through from the transport to the transaction lanes.
#[test]
fn readback_values_come_from_the_device() {
    let mut mock = MockTransport::new();
    mock.set_register(CommonRegister::BoardConfig.address(), 0x0001_0110);
    mock.set_register(CommonRegister::ChanEnMask.address(), 0x0000_FFFF);

    let mut digitizer = Vx1730Digitizer::new(&sixteen_channel_config(), mock).unwrap();
    digitizer.configure_registers().unwrap();
}
