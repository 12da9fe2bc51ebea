//! Vx1730 register map and address resolution.
//!
//! Registers come in three addressing scopes: board-wide (common), per
//! channel-pair (group) and per-channel (individual). Each kind maps to
//! exactly one base address, and for the channel-indexed scopes one stride;
//! resolution is pure arithmetic over those tables.
//!
//! The tables are the hardware register map. Any mismatch corrupts the device
//! configuration silently, so [`validate_register_map`] asserts their internal
//! consistency at startup: within a scope no two kinds may overlap anywhere in
//! the stride range.

use crate::error::{DigiResult, DigitizerError};

/// Addressing scope of a register; also the phase tag in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterScope {
    /// One instance per board.
    Common,
    /// One instance per channel pair.
    Group,
    /// One instance per channel.
    Individual,
}

impl std::fmt::Display for RegisterScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            RegisterScope::Common => "common",
            RegisterScope::Group => "group",
            RegisterScope::Individual => "individual",
        })
    }
}

/// Channel range served by one digitizer module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelTopology {
    /// First channel index handled by this module.
    pub channel_start: usize,
    /// Number of channels; must be even (channels are paired into groups).
    pub channel_count: usize,
}

impl ChannelTopology {
    /// Check the pairing invariant.
    pub fn validate(&self) -> DigiResult<()> {
        if self.channel_count == 0 {
            return Err(DigitizerError::Config(
                "channel_count must be nonzero".into(),
            ));
        }
        if self.channel_count % 2 != 0 {
            return Err(DigitizerError::Config(format!(
                "channel_count must be even for channel-pair registers, got {}",
                self.channel_count
            )));
        }
        Ok(())
    }

    /// Channel indices served by this module, in order.
    pub fn channels(&self) -> std::ops::Range<usize> {
        self.channel_start..self.channel_start + self.channel_count
    }

    /// Even channel indices, one per channel pair.
    pub fn pair_leaders(&self) -> impl Iterator<Item = usize> {
        self.channels().step_by(2)
    }

    /// Number of channel pairs.
    pub fn pair_count(&self) -> usize {
        self.channel_count / 2
    }
}

impl Default for ChannelTopology {
    fn default() -> Self {
        Self {
            channel_start: 0,
            channel_count: 16,
        }
    }
}

/// Board-wide registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum CommonRegister {
    BoardConfig,
    AggregateOrg,
    AcquisitionCtrl,
    GlobalTrgMask,
    TrgOutEnMask,
    FrontIoCtrl,
    ChanEnMask,
    SetMonitorDac,
    MonitorDacMode,
    MemBuffAlmtFullLvl,
    RunStrtStpDelay,
    DisableExtTrig,
    FrontLvdsIoNew,
    ReadoutCtrl,
    InterruptStatId,
    InterruptEventNum,
    AggregateNumPerBlt,
}

impl CommonRegister {
    /// Every board-wide register kind.
    pub const ALL: [CommonRegister; 17] = [
        CommonRegister::BoardConfig,
        CommonRegister::AggregateOrg,
        CommonRegister::AcquisitionCtrl,
        CommonRegister::GlobalTrgMask,
        CommonRegister::TrgOutEnMask,
        CommonRegister::FrontIoCtrl,
        CommonRegister::ChanEnMask,
        CommonRegister::SetMonitorDac,
        CommonRegister::MonitorDacMode,
        CommonRegister::MemBuffAlmtFullLvl,
        CommonRegister::RunStrtStpDelay,
        CommonRegister::DisableExtTrig,
        CommonRegister::FrontLvdsIoNew,
        CommonRegister::ReadoutCtrl,
        CommonRegister::InterruptStatId,
        CommonRegister::InterruptEventNum,
        CommonRegister::AggregateNumPerBlt,
    ];

    /// Board-wide registers in the order the readback batch issues them.
    ///
    /// `DisableExtTrig` appears twice, exactly as the board bring-up sequence
    /// this map was taken from issues it. The duplication is suspected to be
    /// an upstream configuration-table error; it is preserved until hardware
    /// intent is confirmed rather than silently dropped.
    pub const READBACK_ORDER: [CommonRegister; 18] = [
        CommonRegister::BoardConfig,
        CommonRegister::AggregateOrg,
        CommonRegister::AcquisitionCtrl,
        CommonRegister::GlobalTrgMask,
        CommonRegister::TrgOutEnMask,
        CommonRegister::FrontIoCtrl,
        CommonRegister::ChanEnMask,
        CommonRegister::SetMonitorDac,
        CommonRegister::MonitorDacMode,
        CommonRegister::MemBuffAlmtFullLvl,
        CommonRegister::RunStrtStpDelay,
        CommonRegister::DisableExtTrig,
        CommonRegister::DisableExtTrig,
        CommonRegister::FrontLvdsIoNew,
        CommonRegister::ReadoutCtrl,
        CommonRegister::InterruptStatId,
        CommonRegister::InterruptEventNum,
        CommonRegister::AggregateNumPerBlt,
    ];

    /// Physical address of this register. Board-wide registers have a single
    /// instance, so no channel arithmetic applies.
    pub const fn address(self) -> u32 {
        match self {
            CommonRegister::BoardConfig => 0x8000,
            CommonRegister::AggregateOrg => 0x800C,
            CommonRegister::AcquisitionCtrl => 0x8100,
            CommonRegister::GlobalTrgMask => 0x810C,
            CommonRegister::TrgOutEnMask => 0x8110,
            CommonRegister::FrontIoCtrl => 0x811C,
            CommonRegister::ChanEnMask => 0x8120,
            CommonRegister::SetMonitorDac => 0x8138,
            CommonRegister::MonitorDacMode => 0x8144,
            CommonRegister::MemBuffAlmtFullLvl => 0x816C,
            CommonRegister::RunStrtStpDelay => 0x8170,
            CommonRegister::DisableExtTrig => 0x817C,
            CommonRegister::FrontLvdsIoNew => 0x81A0,
            CommonRegister::ReadoutCtrl => 0xEF00,
            CommonRegister::InterruptStatId => 0xEF14,
            CommonRegister::InterruptEventNum => 0xEF18,
            CommonRegister::AggregateNumPerBlt => 0xEF1C,
        }
    }
}

/// Registers with one instance per channel pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum GroupRegister {
    RecordLength,
    EventsPerAggregate,
    LocalTrgManage,
    TriggerValMask,
}

impl GroupRegister {
    /// Every channel-pair register kind.
    pub const ALL: [GroupRegister; 4] = [
        GroupRegister::RecordLength,
        GroupRegister::EventsPerAggregate,
        GroupRegister::LocalTrgManage,
        GroupRegister::TriggerValMask,
    ];

    /// Base address of the first group's instance.
    pub const fn base(self) -> u32 {
        match self {
            GroupRegister::RecordLength => 0x1024,
            GroupRegister::EventsPerAggregate => 0x1034,
            GroupRegister::LocalTrgManage => 0x1084,
            GroupRegister::TriggerValMask => 0x1180,
        }
    }

    /// Address offset between successive groups.
    pub const fn stride(self) -> u32 {
        0x0200
    }

    /// Resolve the address for the pair containing `channel`.
    ///
    /// `channel` is an even iteration index in `topology.channels()`; the
    /// group index is `(channel - channel_start) / 2`.
    pub fn address(self, topology: &ChannelTopology, channel: usize) -> u32 {
        let group = (channel - topology.channel_start) / 2;
        self.base() + self.stride() * group as u32
    }
}

/// Registers with one instance per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ChannelRegister {
    InputDynamicRange,
    PreTrg,
    CfdSettings,
    ShortGate,
    LongGate,
    GateOffset,
    TrgThreshold,
    FixedBaseline,
    ShapedTrgWidth,
    TrgHoldOff,
    PsdCutThreshold,
    DppAlgorithmCtrl,
    DcOffset,
    VetoExtension,
}

impl ChannelRegister {
    /// Every per-channel register kind.
    pub const ALL: [ChannelRegister; 14] = [
        ChannelRegister::InputDynamicRange,
        ChannelRegister::PreTrg,
        ChannelRegister::CfdSettings,
        ChannelRegister::ShortGate,
        ChannelRegister::LongGate,
        ChannelRegister::GateOffset,
        ChannelRegister::TrgThreshold,
        ChannelRegister::FixedBaseline,
        ChannelRegister::ShapedTrgWidth,
        ChannelRegister::TrgHoldOff,
        ChannelRegister::PsdCutThreshold,
        ChannelRegister::DppAlgorithmCtrl,
        ChannelRegister::DcOffset,
        ChannelRegister::VetoExtension,
    ];

    /// Base address of channel 0's instance.
    pub const fn base(self) -> u32 {
        match self {
            ChannelRegister::InputDynamicRange => 0x1028,
            ChannelRegister::PreTrg => 0x1038,
            ChannelRegister::CfdSettings => 0x103C,
            ChannelRegister::ShortGate => 0x1054,
            ChannelRegister::LongGate => 0x1058,
            ChannelRegister::GateOffset => 0x105C,
            ChannelRegister::TrgThreshold => 0x1060,
            ChannelRegister::FixedBaseline => 0x1064,
            ChannelRegister::ShapedTrgWidth => 0x1070,
            ChannelRegister::TrgHoldOff => 0x1074,
            ChannelRegister::PsdCutThreshold => 0x1078,
            ChannelRegister::DppAlgorithmCtrl => 0x1080,
            ChannelRegister::DcOffset => 0x1098,
            ChannelRegister::VetoExtension => 0x10D4,
        }
    }

    /// Address offset between successive channels.
    pub const fn stride(self) -> u32 {
        0x0100
    }

    /// Resolve the address for `channel`.
    pub fn address(self, topology: &ChannelTopology, channel: usize) -> u32 {
        self.base() + self.stride() * (channel - topology.channel_start) as u32
    }
}

/// Verify the register map is internally consistent.
///
/// Within each scope, no two kinds may resolve to the same address for any
/// channel/group index: bases must be distinct, and for the strided scopes
/// incongruent modulo the (shared) stride.
pub fn validate_register_map() -> DigiResult<()> {
    check_distinct_bases(
        RegisterScope::Common,
        &CommonRegister::ALL.map(|r| r.address()),
        None,
    )?;
    check_distinct_bases(
        RegisterScope::Group,
        &GroupRegister::ALL.map(|r| r.base()),
        Some(GroupRegister::RecordLength.stride()),
    )?;
    check_distinct_bases(
        RegisterScope::Individual,
        &ChannelRegister::ALL.map(|r| r.base()),
        Some(ChannelRegister::InputDynamicRange.stride()),
    )?;
    Ok(())
}

fn check_distinct_bases(scope: RegisterScope, bases: &[u32], stride: Option<u32>) -> DigiResult<()> {
    for (i, &a) in bases.iter().enumerate() {
        for &b in &bases[i + 1..] {
            let overlap = match stride {
                // Strided kinds collide iff their bases are congruent mod the
                // stride (both sequences then share every aligned slot).
                Some(stride) => a % stride == b % stride,
                None => a == b,
            };
            if overlap {
                return Err(DigitizerError::Config(format!(
                    "{scope} register map overlap: bases {a:#06x} and {b:#06x}"
                )));
            }
        }
    }
    Ok(())
}
