//! Analog Group Acquisition
//!
//! Group-based conversion over the ADC units. A group is a ranked list of
//! input channels converted as one round on its owning unit, either polled
//! through [`Adc::read_group`] or streamed by DMA into a caller-owned result
//! buffer.
//!
//! The engine owns its configuration by value. Hardware access goes through
//! [`AdcHardware`] and [`DmaHardware`], so the same engine drives the chip
//! on target and the in-memory register files in host tests.
//!
//! Interrupt sources are routed through tables built at [`Adc::init`]:
//! ADC unit to groups (the active group wins) and DMA channel to group.

use core::sync::atomic::AtomicU16;

use heapless::Vec;

use crate::config::{ADC_MAX_GROUPS, ADC_MAX_GROUP_CHANNELS};
use crate::hal::dma::{
    DmaChannel, DmaHardware, Direction, ElementSize, Priority, Transfer, TransferMode,
    DMA_CHANNEL_COUNT,
};
use crate::types::{HalError, HalResult, VersionInfo};

/// Number of ADC units on the chip
pub const ADC_UNIT_COUNT: usize = 2;

/// Highest analog input channel number (16 and 17 are internal sources)
pub const ADC_MAX_CHANNEL: u8 = 17;

/// Numeric group identifier (equal to its index in the configuration)
pub type GroupId = u8;

/// ADC hardware unit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdcUnit {
    /// ADC1
    Adc1,
    /// ADC2
    Adc2,
}

impl AdcUnit {
    /// All units in index order
    pub const ALL: [Self; ADC_UNIT_COUNT] = [Self::Adc1, Self::Adc2];

    /// Table index of this unit
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Adc1 => 0,
            Self::Adc2 => 1,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for AdcUnit {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Adc1 => defmt::write!(f, "ADC1"),
            Self::Adc2 => defmt::write!(f, "ADC2"),
        }
    }
}

/// Sampling time of one channel in ADC clock cycles
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SampleTime {
    /// 1.5 cycles
    #[default]
    Cycles1_5,
    /// 7.5 cycles
    Cycles7_5,
    /// 13.5 cycles
    Cycles13_5,
    /// 28.5 cycles
    Cycles28_5,
    /// 41.5 cycles
    Cycles41_5,
    /// 55.5 cycles
    Cycles55_5,
    /// 71.5 cycles
    Cycles71_5,
    /// 239.5 cycles
    Cycles239_5,
}

impl SampleTime {
    /// Register encoding (SMPx field)
    #[must_use]
    pub const fn bits(self) -> u8 {
        match self {
            Self::Cycles1_5 => 0,
            Self::Cycles7_5 => 1,
            Self::Cycles13_5 => 2,
            Self::Cycles28_5 => 3,
            Self::Cycles41_5 => 4,
            Self::Cycles55_5 => 5,
            Self::Cycles71_5 => 6,
            Self::Cycles239_5 => 7,
        }
    }
}

/// Conversion mode of a group
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ConversionMode {
    /// Convert one round, then stop
    #[default]
    OneShot,
    /// Restart the round as soon as it ends
    Continuous,
}

/// What starts a conversion round
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TriggerSource {
    /// Started by software
    #[default]
    Software,
    /// Started by an external (timer/EXTI) event
    Hardware,
}

/// Result alignment in the 16-bit data register
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Alignment {
    /// 12-bit value in bits 0..=11
    #[default]
    Right,
    /// 12-bit value in bits 4..=15
    Left,
}

/// Streaming buffer fill mode
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferMode {
    /// Fill the buffer once
    Linear,
    /// Refill the buffer every round
    Circular,
}

impl BufferMode {
    const fn transfer_mode(self) -> TransferMode {
        match self {
            Self::Linear => TransferMode::Normal,
            Self::Circular => TransferMode::Circular,
        }
    }
}

/// Conversion status of a group
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum GroupStatus {
    /// Never started
    #[default]
    Idle,
    /// Started, results pending
    Busy,
    /// A full polled round has been read
    Completed,
}

#[cfg(feature = "embedded")]
impl defmt::Format for GroupStatus {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Idle => defmt::write!(f, "IDLE"),
            Self::Busy => defmt::write!(f, "BUSY"),
            Self::Completed => defmt::write!(f, "COMPLETED"),
        }
    }
}

/// Power state requested for a group's unit
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PowerState {
    /// Unit disabled
    Off,
    /// Unit enabled
    On,
    /// Accepted; no register effect on this chip
    LowPower,
}

/// One channel of a group
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelDef {
    /// Analog input channel number
    pub channel: u8,
    /// Sampling time
    pub sample_time: SampleTime,
    /// 1-based position in the conversion sequence
    pub rank: u8,
}

impl ChannelDef {
    /// Build a channel entry
    #[must_use]
    pub const fn new(channel: u8, rank: u8, sample_time: SampleTime) -> Self {
        Self {
            channel,
            sample_time,
            rank,
        }
    }
}

/// DMA binding of a streaming group
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Streaming {
    /// DMA channel servicing the owning unit
    pub dma: DmaChannel,
    /// Fill mode of the result buffer
    pub mode: BufferMode,
}

/// Static definition of an acquisition group
#[derive(Clone, Debug)]
pub struct GroupDef {
    /// Group identifier
    pub id: GroupId,
    /// Owning unit
    pub unit: AdcUnit,
    /// One-shot or continuous
    pub conversion: ConversionMode,
    /// Software or hardware start
    pub trigger: TriggerSource,
    /// Result alignment
    pub alignment: Alignment,
    /// Group priority (recorded; the unit has no arbitration)
    pub priority: u8,
    /// Channels in configuration order
    pub channels: Vec<ChannelDef, ADC_MAX_GROUP_CHANNELS>,
    /// DMA binding, `None` for polled groups
    pub streaming: Option<Streaming>,
    /// End-of-conversion callback
    pub on_conversion: Option<fn(GroupId)>,
    /// Transfer-complete callback
    pub on_transfer: Option<fn(GroupId)>,
}

impl GroupDef {
    /// One-shot, software-triggered, right-aligned, polled group with no channels
    #[must_use]
    pub const fn new(id: GroupId, unit: AdcUnit) -> Self {
        Self {
            id,
            unit,
            conversion: ConversionMode::OneShot,
            trigger: TriggerSource::Software,
            alignment: Alignment::Right,
            priority: 0,
            channels: Vec::new(),
            streaming: None,
            on_conversion: None,
            on_transfer: None,
        }
    }

    /// Set the conversion mode
    #[must_use]
    pub fn conversion(mut self, mode: ConversionMode) -> Self {
        self.conversion = mode;
        self
    }

    /// Set the trigger source
    #[must_use]
    pub fn trigger(mut self, trigger: TriggerSource) -> Self {
        self.trigger = trigger;
        self
    }

    /// Set the result alignment
    #[must_use]
    pub fn alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    /// Set the group priority
    #[must_use]
    pub fn priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Stream results through a DMA channel
    #[must_use]
    pub fn streaming(mut self, dma: DmaChannel, mode: BufferMode) -> Self {
        self.streaming = Some(Streaming { dma, mode });
        self
    }

    /// Install the end-of-conversion callback
    #[must_use]
    pub fn on_conversion(mut self, callback: fn(GroupId)) -> Self {
        self.on_conversion = Some(callback);
        self
    }

    /// Install the transfer-complete callback
    #[must_use]
    pub fn on_transfer(mut self, callback: fn(GroupId)) -> Self {
        self.on_transfer = Some(callback);
        self
    }

    /// Append a channel
    ///
    /// # Errors
    ///
    /// `InvalidId` for a channel number the unit does not have,
    /// `PreconditionUnmet` when the group is full.
    pub fn with_channel(mut self, channel: ChannelDef) -> HalResult<Self> {
        if channel.channel > ADC_MAX_CHANNEL {
            return Err(HalError::InvalidId);
        }
        self.channels
            .push(channel)
            .map_err(|_| HalError::PreconditionUnmet)?;
        Ok(self)
    }

    /// Number of channels
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Check for a group without channels
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Check that ranks are exactly 1..=N, each once
    #[must_use]
    pub fn ranks_are_permutation(&self) -> bool {
        let n = self.channels.len();
        let mut seen = [false; ADC_MAX_GROUP_CHANNELS];
        for def in &self.channels {
            let rank = usize::from(def.rank);
            if rank == 0 || rank > n || seen[rank - 1] {
                return false;
            }
            seen[rank - 1] = true;
        }
        true
    }

    /// Configuration slot holding the given rank
    #[must_use]
    pub fn slot_of_rank(&self, rank: u8) -> Option<usize> {
        self.channels.iter().position(|def| def.rank == rank)
    }

    /// Unit-level setup derived from this group
    #[must_use]
    pub fn unit_setup(&self) -> UnitSetup {
        UnitSetup {
            scan: self.channels.len() > 1,
            continuous: self.conversion == ConversionMode::Continuous,
            alignment: self.alignment,
            sequence_length: self.sequence_length(),
        }
    }

    fn sequence_length(&self) -> u8 {
        u8::try_from(self.channels.len()).unwrap_or(u8::MAX)
    }

    const fn is_streaming(&self) -> bool {
        self.streaming.is_some()
    }
}

/// Unit configuration applied at init
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitSetup {
    /// Scan over the whole sequence (more than one channel)
    pub scan: bool,
    /// Continuous conversion
    pub continuous: bool,
    /// Result alignment
    pub alignment: Alignment,
    /// Number of ranks in the regular sequence
    pub sequence_length: u8,
}

/// Configuration bound by [`Adc::init`]
#[derive(Clone, Debug, Default)]
pub struct AdcConfig {
    /// Groups, indexed by id
    pub groups: Vec<GroupDef, ADC_MAX_GROUPS>,
    /// Invoked once at the end of a successful init
    pub on_init: Option<fn()>,
}

impl AdcConfig {
    /// Empty configuration
    #[must_use]
    pub const fn new() -> Self {
        Self {
            groups: Vec::new(),
            on_init: None,
        }
    }

    /// Append a group
    ///
    /// # Errors
    ///
    /// `InvalidId` when the group id is not the next index,
    /// `PreconditionUnmet` when the table is full, the group has no channels
    /// or its ranks are not a permutation of 1..=N.
    pub fn add_group(&mut self, group: GroupDef) -> HalResult<()> {
        if usize::from(group.id) != self.groups.len() {
            return Err(HalError::InvalidId);
        }
        if group.is_empty() || !group.ranks_are_permutation() {
            return Err(HalError::PreconditionUnmet);
        }
        self.groups
            .push(group)
            .map_err(|_| HalError::PreconditionUnmet)
    }

    /// Install the init-complete hook
    #[must_use]
    pub fn on_init(mut self, callback: fn()) -> Self {
        self.on_init = Some(callback);
        self
    }
}

/// Register file of the ADC units
pub trait AdcHardware {
    /// Return a unit to its reset state
    fn reset(&mut self, unit: AdcUnit);

    /// Apply scan, continuous, alignment and sequence length
    fn configure(&mut self, unit: AdcUnit, setup: UnitSetup);

    /// Power the unit on or off
    fn set_powered(&mut self, unit: AdcUnit, on: bool);

    /// Run reset-calibration and calibration to completion
    fn calibrate(&mut self, unit: AdcUnit);

    /// Place a channel at a rank of the regular sequence
    fn configure_channel(&mut self, unit: AdcUnit, channel: u8, rank: u8, sample_time: SampleTime);

    /// Start a regular conversion by software
    fn start_conversion(&mut self, unit: AdcUnit);

    /// End-of-conversion flag
    fn end_of_conversion(&self, unit: AdcUnit) -> bool;

    /// Read the data register
    fn read_data(&mut self, unit: AdcUnit) -> u16;

    /// Clear the end-of-conversion flag
    fn clear_end_of_conversion(&mut self, unit: AdcUnit);

    /// Enable or disable the end-of-conversion interrupt
    fn set_end_of_conversion_interrupt(&mut self, unit: AdcUnit, enabled: bool);

    /// Enable or disable conversion start on the external trigger
    fn set_external_trigger(&mut self, unit: AdcUnit, enabled: bool);

    /// Enable or disable the DMA request line
    fn set_dma_request(&mut self, unit: AdcUnit, enabled: bool);

    /// Bus address of the data register
    fn data_register_address(&self, unit: AdcUnit) -> u32;
}

/// Group acquisition engine
pub struct Adc<'a, H, D> {
    hw: H,
    dma: D,
    config: Option<AdcConfig>,
    buffers: [Option<&'a [AtomicU16]>; ADC_MAX_GROUPS],
    status: [GroupStatus; ADC_MAX_GROUPS],
    unit_groups: [Vec<GroupId, ADC_MAX_GROUPS>; ADC_UNIT_COUNT],
    active: [Option<GroupId>; ADC_UNIT_COUNT],
    dma_groups: [Option<GroupId>; DMA_CHANNEL_COUNT],
}

fn lookup(config: Option<&AdcConfig>, id: GroupId) -> HalResult<&GroupDef> {
    let config = config.ok_or(HalError::NotInitialized)?;
    config
        .groups
        .get(usize::from(id))
        .ok_or(HalError::InvalidId)
}

impl<'a, H, D> Adc<'a, H, D>
where
    H: AdcHardware,
    D: DmaHardware<'a>,
{
    /// Engine with no bound configuration
    pub fn new(hw: H, dma: D) -> Self {
        Self {
            hw,
            dma,
            config: None,
            buffers: [None; ADC_MAX_GROUPS],
            status: [GroupStatus::Idle; ADC_MAX_GROUPS],
            unit_groups: [Vec::new(), Vec::new()],
            active: [None; ADC_UNIT_COUNT],
            dma_groups: [None; DMA_CHANNEL_COUNT],
        }
    }

    /// Bind a configuration and bring up every owning unit
    ///
    /// Each group configures and calibrates its unit; with several groups on
    /// one unit the last group's setup is left in the registers until a
    /// group is started.
    ///
    /// # Errors
    ///
    /// `PreconditionUnmet` when already initialized, when the configuration
    /// has no group or when two streaming groups share a DMA channel.
    pub fn init(&mut self, config: AdcConfig) -> HalResult<()> {
        if self.config.is_some() {
            warn!("adc: init while initialized");
            return Err(HalError::PreconditionUnmet);
        }
        if config.groups.is_empty() {
            warn!("adc: init without groups");
            return Err(HalError::PreconditionUnmet);
        }

        let mut unit_groups: [Vec<GroupId, ADC_MAX_GROUPS>; ADC_UNIT_COUNT] =
            [Vec::new(), Vec::new()];
        let mut dma_groups = [None; DMA_CHANNEL_COUNT];
        for group in &config.groups {
            if let Some(streaming) = group.streaming {
                let slot = &mut dma_groups[streaming.dma.index()];
                if slot.is_some() {
                    warn!("adc: dma channel bound twice");
                    return Err(HalError::PreconditionUnmet);
                }
                *slot = Some(group.id);
            }
            // Capacity equals the group table, so this cannot overflow.
            let _ = unit_groups[group.unit.index()].push(group.id);
        }

        for group in &config.groups {
            self.hw.reset(group.unit);
            self.hw.configure(group.unit, group.unit_setup());
            self.hw.set_powered(group.unit, true);
            self.hw.calibrate(group.unit);
            debug!("adc: group {} bound, {} channels", group.id, group.len());
        }

        self.unit_groups = unit_groups;
        self.dma_groups = dma_groups;
        self.active = [None; ADC_UNIT_COUNT];
        self.status = [GroupStatus::Idle; ADC_MAX_GROUPS];
        self.buffers = [None; ADC_MAX_GROUPS];

        let on_init = config.on_init;
        self.config = Some(config);
        if let Some(callback) = on_init {
            callback();
        }
        Ok(())
    }

    /// Return every configured unit to reset state and drop the configuration
    ///
    /// # Errors
    ///
    /// `NotInitialized` when no configuration is bound.
    pub fn deinit(&mut self) -> HalResult<()> {
        let config = self.config.take().ok_or(HalError::NotInitialized)?;
        for group in &config.groups {
            if let Some(streaming) = group.streaming {
                self.dma.set_enabled(streaming.dma, false);
                self.dma.set_complete_interrupt(streaming.dma, false);
            }
        }
        for unit in AdcUnit::ALL {
            if !self.unit_groups[unit.index()].is_empty() {
                self.hw.reset(unit);
            }
        }
        self.unit_groups = [Vec::new(), Vec::new()];
        self.dma_groups = [None; DMA_CHANNEL_COUNT];
        self.active = [None; ADC_UNIT_COUNT];
        self.status = [GroupStatus::Idle; ADC_MAX_GROUPS];
        self.buffers = [None; ADC_MAX_GROUPS];
        debug!("adc: deinit");
        Ok(())
    }

    /// Attach the caller-owned result buffer of a group
    ///
    /// # Errors
    ///
    /// `NotInitialized`, `InvalidId` for an unknown group, or
    /// `PreconditionUnmet` when the buffer has fewer slots than the group
    /// has channels.
    pub fn register_result_buffer(&mut self, id: GroupId, buffer: &'a [AtomicU16]) -> HalResult<()> {
        let group = lookup(self.config.as_ref(), id)?;
        if buffer.len() < group.len() {
            warn!("adc: group {} buffer too short", id);
            return Err(HalError::PreconditionUnmet);
        }
        self.buffers[usize::from(id)] = Some(buffer);
        Ok(())
    }

    /// Start a conversion round (and the streaming transfer, if bound)
    ///
    /// # Errors
    ///
    /// `NotInitialized`, `InvalidId`, or `PreconditionUnmet` when no result
    /// buffer is registered.
    pub fn start_group_conversion(&mut self, id: GroupId) -> HalResult<()> {
        let group = lookup(self.config.as_ref(), id)?;
        let Some(buffer) = self.buffers[usize::from(id)] else {
            warn!("adc: group {} started without buffer", id);
            return Err(HalError::PreconditionUnmet);
        };

        // Groups sharing a unit share its scan/sequence registers.
        self.hw.configure(group.unit, group.unit_setup());

        if let Some(streaming) = group.streaming {
            self.dma.set_enabled(streaming.dma, false);
            self.dma.configure(
                streaming.dma,
                Transfer {
                    direction: Direction::PeripheralToMemory,
                    mode: streaming.mode.transfer_mode(),
                    element: ElementSize::HalfWord,
                    peripheral_increment: false,
                    memory_increment: true,
                    priority: Priority::High,
                    peripheral_address: self.hw.data_register_address(group.unit),
                    target: &buffer[..group.len()],
                },
            );
            self.dma
                .set_complete_interrupt(streaming.dma, group.on_transfer.is_some());
            self.dma.set_enabled(streaming.dma, true);
            self.hw.set_dma_request(group.unit, true);
            debug!("adc: group {} streaming armed", id);
        }

        for def in &group.channels {
            self.hw
                .configure_channel(group.unit, def.channel, def.rank, def.sample_time);
        }

        match group.trigger {
            TriggerSource::Software => self.hw.start_conversion(group.unit),
            TriggerSource::Hardware => self.hw.set_external_trigger(group.unit, true),
        }

        self.status[usize::from(id)] = GroupStatus::Busy;
        self.active[group.unit.index()] = Some(id);
        Ok(())
    }

    /// Conversion status; unknown groups report `Idle`
    #[must_use]
    pub fn get_group_status(&self, id: GroupId) -> GroupStatus {
        match lookup(self.config.as_ref(), id) {
            Ok(_) => self.status[usize::from(id)],
            Err(_) => GroupStatus::Idle,
        }
    }

    /// Read one polled round into `out`, in configuration order
    ///
    /// Busy-waits on the end-of-conversion flag for each rank. Must not be
    /// called from interrupt context.
    ///
    /// # Errors
    ///
    /// `NotInitialized`, `InvalidId`, or `PreconditionUnmet` when `out` is
    /// too short, the group streams, was never started, or is one-shot and
    /// its round has already been read.
    pub fn read_group(&mut self, id: GroupId, out: &mut [u16]) -> HalResult<()> {
        let group = lookup(self.config.as_ref(), id)?;
        let status = self.status[usize::from(id)];
        let exhausted =
            group.conversion == ConversionMode::OneShot && status == GroupStatus::Completed;
        if out.len() < group.len()
            || group.is_streaming()
            || status == GroupStatus::Idle
            || exhausted
        {
            warn!("adc: group {} not readable", id);
            return Err(HalError::PreconditionUnmet);
        }

        for rank in 1..=group.sequence_length() {
            while !self.hw.end_of_conversion(group.unit) {
                core::hint::spin_loop();
            }
            let value = self.hw.read_data(group.unit);
            if let Some(slot) = group.slot_of_rank(rank) {
                out[slot] = value;
            }
        }

        self.status[usize::from(id)] = GroupStatus::Completed;
        trace!("adc: group {} read", id);
        Ok(())
    }

    /// Arm the end-of-conversion interrupt of the group's unit
    ///
    /// # Errors
    ///
    /// `NotInitialized` or `InvalidId`.
    pub fn enable_group_notification(&mut self, id: GroupId) -> HalResult<()> {
        let unit = lookup(self.config.as_ref(), id)?.unit;
        self.hw.set_end_of_conversion_interrupt(unit, true);
        Ok(())
    }

    /// Disarm the end-of-conversion interrupt of the group's unit
    ///
    /// # Errors
    ///
    /// `NotInitialized` or `InvalidId`.
    pub fn disable_group_notification(&mut self, id: GroupId) -> HalResult<()> {
        let unit = lookup(self.config.as_ref(), id)?.unit;
        self.hw.set_end_of_conversion_interrupt(unit, false);
        Ok(())
    }

    /// Let the external trigger start conversions of the group's unit
    ///
    /// # Errors
    ///
    /// `NotInitialized` or `InvalidId`.
    pub fn enable_hardware_trigger(&mut self, id: GroupId) -> HalResult<()> {
        let unit = lookup(self.config.as_ref(), id)?.unit;
        self.hw.set_external_trigger(unit, true);
        Ok(())
    }

    /// Stop external-trigger starts of the group's unit
    ///
    /// # Errors
    ///
    /// `NotInitialized` or `InvalidId`.
    pub fn disable_hardware_trigger(&mut self, id: GroupId) -> HalResult<()> {
        let unit = lookup(self.config.as_ref(), id)?.unit;
        self.hw.set_external_trigger(unit, false);
        Ok(())
    }

    /// Tear down the streaming path of a group
    ///
    /// Stops the DMA channel, disables its completion interrupt and drops
    /// the unit's DMA request line. The result buffer keeps its last values.
    ///
    /// # Errors
    ///
    /// `NotInitialized`, `InvalidId`, or `PreconditionUnmet` for a polled
    /// group.
    pub fn disable_streaming_transfer(&mut self, id: GroupId) -> HalResult<()> {
        let group = lookup(self.config.as_ref(), id)?;
        let Some(streaming) = group.streaming else {
            return Err(HalError::PreconditionUnmet);
        };
        self.dma.set_enabled(streaming.dma, false);
        self.dma.set_complete_interrupt(streaming.dma, false);
        self.hw.set_dma_request(group.unit, false);
        debug!("adc: group {} streaming stopped", id);
        Ok(())
    }

    /// Power the group's unit on or off
    ///
    /// # Errors
    ///
    /// `NotInitialized` or `InvalidId`.
    pub fn set_power_state(&mut self, id: GroupId, state: PowerState) -> HalResult<()> {
        let unit = lookup(self.config.as_ref(), id)?.unit;
        match state {
            PowerState::Off => self.hw.set_powered(unit, false),
            PowerState::On => self.hw.set_powered(unit, true),
            PowerState::LowPower => {}
        }
        Ok(())
    }

    /// End-of-conversion interrupt of one unit
    ///
    /// Clears the flag, then runs the conversion callback of the group last
    /// started on the unit (the first group on the unit if none was
    /// started). Returns the group served.
    pub fn on_end_of_conversion(&mut self, unit: AdcUnit) -> Option<GroupId> {
        let config = self.config.as_ref()?;
        self.hw.clear_end_of_conversion(unit);
        let index = unit.index();
        let Some(id) = self.active[index].or_else(|| self.unit_groups[index].first().copied())
        else {
            warn!("adc: eoc on unbound unit");
            return None;
        };
        if let Some(callback) = config.groups.get(usize::from(id)).and_then(|g| g.on_conversion) {
            callback(id);
        }
        Some(id)
    }

    /// Transfer-complete interrupt of one DMA channel
    ///
    /// Does nothing unless the channel's completion flag is set. Clears the
    /// flag, then runs the transfer callback of the group bound to the
    /// channel. Returns the group served.
    pub fn on_transfer_complete(&mut self, channel: DmaChannel) -> Option<GroupId> {
        let config = self.config.as_ref()?;
        if !self.dma.transfer_complete(channel) {
            return None;
        }
        self.dma.clear_transfer_complete(channel);
        let Some(id) = self.dma_groups[channel.index()] else {
            warn!("adc: transfer complete on unbound channel");
            return None;
        };
        if let Some(callback) = config.groups.get(usize::from(id)).and_then(|g| g.on_transfer) {
            callback(id);
        }
        Some(id)
    }

    /// Module version
    #[must_use]
    pub const fn version_info(&self) -> VersionInfo {
        VersionInfo {
            vendor_id: 1,
            module_id: 123,
            major: 1,
            minor: 0,
            patch: 0,
        }
    }

    /// Check for a bound configuration
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.config.is_some()
    }

    /// Number of configured groups (0 when uninitialized)
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.config.as_ref().map_or(0, |c| c.groups.len())
    }

    /// Registered result buffer of a group
    #[must_use]
    pub fn result_buffer(&self, id: GroupId) -> Option<&'a [AtomicU16]> {
        self.buffers.get(usize::from(id)).copied().flatten()
    }

    /// ADC register file
    pub const fn hardware(&self) -> &H {
        &self.hw
    }

    /// ADC register file, mutably
    pub fn hardware_mut(&mut self) -> &mut H {
        &mut self.hw
    }

    /// DMA register file
    pub const fn dma(&self) -> &D {
        &self.dma
    }

    /// DMA register file, mutably
    pub fn dma_mut(&mut self) -> &mut D {
        &mut self.dma
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_channel_group() -> GroupDef {
        GroupDef::new(0, AdcUnit::Adc1)
            .with_channel(ChannelDef::new(0, 2, SampleTime::Cycles55_5))
            .and_then(|g| g.with_channel(ChannelDef::new(1, 1, SampleTime::Cycles55_5)))
            .unwrap()
    }

    #[test]
    fn rank_permutation_check() {
        let group = two_channel_group();
        assert!(group.ranks_are_permutation());
        assert_eq!(group.slot_of_rank(1), Some(1));
        assert_eq!(group.slot_of_rank(2), Some(0));

        let duplicate = GroupDef::new(0, AdcUnit::Adc1)
            .with_channel(ChannelDef::new(0, 1, SampleTime::Cycles1_5))
            .and_then(|g| g.with_channel(ChannelDef::new(1, 1, SampleTime::Cycles1_5)))
            .unwrap();
        assert!(!duplicate.ranks_are_permutation());
    }

    #[test]
    fn channel_number_is_bounded() {
        let result = GroupDef::new(0, AdcUnit::Adc1)
            .with_channel(ChannelDef::new(18, 1, SampleTime::Cycles1_5));
        assert_eq!(result.err(), Some(HalError::InvalidId));
    }

    #[test]
    fn add_group_checks_id_and_ranks() {
        let mut config = AdcConfig::new();
        let misplaced = GroupDef {
            id: 1,
            ..two_channel_group()
        };
        assert_eq!(config.add_group(misplaced), Err(HalError::InvalidId));
        assert_eq!(
            config.add_group(GroupDef::new(0, AdcUnit::Adc1)),
            Err(HalError::PreconditionUnmet)
        );
        assert_eq!(config.add_group(two_channel_group()), Ok(()));
    }

    #[test]
    fn unit_setup_from_group() {
        let setup = two_channel_group()
            .conversion(ConversionMode::Continuous)
            .unit_setup();
        assert!(setup.scan);
        assert!(setup.continuous);
        assert_eq!(setup.sequence_length, 2);
        assert_eq!(setup.alignment, Alignment::Right);
    }
}
