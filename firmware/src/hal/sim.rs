//! In-memory register files
//!
//! Host-side stand-ins for the ADC, DMA, timer and GPIO register files.
//! They keep just enough state to observe what the engines write and to
//! inject what the hardware would report: converted values, completion
//! flags and pending timer interrupts. Every register write bumps a
//! counter so tests can assert that a rejected call had no effect.

use std::collections::VecDeque;
use std::sync::atomic::Ordering;
use std::vec::Vec;

use crate::hal::adc::{AdcHardware, AdcUnit, SampleTime, UnitSetup, ADC_MAX_CHANNEL, ADC_UNIT_COUNT};
use crate::hal::dma::{DmaChannel, DmaHardware, Transfer, TransferMode, DMA_CHANNEL_COUNT};
use crate::hal::gpio::{DigitalIo, DioChannel, DIO_CHANNEL_COUNT};
use crate::hal::timer::{
    OutputCompare, TimeBase, TimerChannel, TimerFlags, TimerHardware, TimerId, TIMER_COUNT,
};
use crate::types::Level;

const SEQUENCE_SLOTS: usize = 16;
const INPUT_COUNT: usize = ADC_MAX_CHANNEL as usize + 1;

/// State of one simulated ADC unit
#[derive(Clone, Debug, Default)]
pub struct SimAdcUnit {
    /// Last applied unit setup
    pub setup: Option<UnitSetup>,
    /// Unit powered
    pub powered: bool,
    /// Calibration runs since the last reset
    pub calibrations: u32,
    /// Resets to power-on state
    pub resets: u32,
    /// Regular sequence: `(channel, sample time)` at each rank
    pub sequence: [Option<(u8, SampleTime)>; SEQUENCE_SLOTS],
    /// End-of-conversion interrupt enabled
    pub eoc_interrupt: bool,
    /// External trigger enabled
    pub external_trigger: bool,
    /// DMA request line enabled
    pub dma_request: bool,
    /// Software starts
    pub starts: u32,
    /// End-of-conversion flag clears
    pub eoc_clears: u32,
    inputs: [u16; INPUT_COUNT],
    pending: VecDeque<u16>,
}

impl SimAdcUnit {
    fn sequence_length(&self) -> usize {
        self.setup
            .map_or(0, |setup| usize::from(setup.sequence_length).min(SEQUENCE_SLOTS))
    }

    /// Values of one conversion round, in rank order
    #[must_use]
    pub fn round(&self) -> Vec<u16> {
        self.sequence[..self.sequence_length()]
            .iter()
            .map(|slot| slot.map_or(0, |(channel, _)| self.inputs[usize::from(channel)]))
            .collect()
    }

    fn continuous(&self) -> bool {
        self.setup.is_some_and(|setup| setup.continuous)
    }
}

/// Simulated ADC units
#[derive(Clone, Debug, Default)]
pub struct SimAdc {
    units: [SimAdcUnit; ADC_UNIT_COUNT],
    writes: usize,
}

impl SimAdc {
    /// Units in reset state with all inputs at zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the code an input channel converts to
    pub fn set_input(&mut self, unit: AdcUnit, channel: u8, value: u16) {
        if let Some(slot) = self.units[unit.index()].inputs.get_mut(usize::from(channel)) {
            *slot = value;
        }
    }

    /// State of one unit
    #[must_use]
    pub fn unit(&self, unit: AdcUnit) -> &SimAdcUnit {
        &self.units[unit.index()]
    }

    /// Values one round of the unit's sequence would produce
    #[must_use]
    pub fn round(&self, unit: AdcUnit) -> Vec<u16> {
        self.units[unit.index()].round()
    }

    /// Total register writes
    #[must_use]
    pub const fn writes(&self) -> usize {
        self.writes
    }

    fn unit_mut(&mut self, unit: AdcUnit) -> &mut SimAdcUnit {
        self.writes += 1;
        &mut self.units[unit.index()]
    }
}

impl AdcHardware for SimAdc {
    fn reset(&mut self, unit: AdcUnit) {
        let state = self.unit_mut(unit);
        let inputs = state.inputs;
        let resets = state.resets + 1;
        *state = SimAdcUnit {
            inputs,
            resets,
            ..SimAdcUnit::default()
        };
    }

    fn configure(&mut self, unit: AdcUnit, setup: UnitSetup) {
        self.unit_mut(unit).setup = Some(setup);
    }

    fn set_powered(&mut self, unit: AdcUnit, on: bool) {
        self.unit_mut(unit).powered = on;
    }

    fn calibrate(&mut self, unit: AdcUnit) {
        self.unit_mut(unit).calibrations += 1;
    }

    fn configure_channel(&mut self, unit: AdcUnit, channel: u8, rank: u8, sample_time: SampleTime) {
        let state = self.unit_mut(unit);
        if let Some(slot) = usize::from(rank)
            .checked_sub(1)
            .and_then(|index| state.sequence.get_mut(index))
        {
            *slot = Some((channel, sample_time));
        }
    }

    fn start_conversion(&mut self, unit: AdcUnit) {
        let state = self.unit_mut(unit);
        state.starts += 1;
        let round = state.round();
        state.pending.extend(round);
    }

    fn end_of_conversion(&self, unit: AdcUnit) -> bool {
        !self.units[unit.index()].pending.is_empty()
    }

    fn read_data(&mut self, unit: AdcUnit) -> u16 {
        let state = &mut self.units[unit.index()];
        let value = state.pending.pop_front().unwrap_or(0);
        if state.pending.is_empty() && state.continuous() && state.starts > 0 {
            let round = state.round();
            state.pending.extend(round);
        }
        value
    }

    fn clear_end_of_conversion(&mut self, unit: AdcUnit) {
        self.unit_mut(unit).eoc_clears += 1;
    }

    fn set_end_of_conversion_interrupt(&mut self, unit: AdcUnit, enabled: bool) {
        self.unit_mut(unit).eoc_interrupt = enabled;
    }

    fn set_external_trigger(&mut self, unit: AdcUnit, enabled: bool) {
        self.unit_mut(unit).external_trigger = enabled;
    }

    fn set_dma_request(&mut self, unit: AdcUnit, enabled: bool) {
        self.unit_mut(unit).dma_request = enabled;
    }

    fn data_register_address(&self, unit: AdcUnit) -> u32 {
        match unit {
            AdcUnit::Adc1 => 0x4001_244C,
            AdcUnit::Adc2 => 0x4001_284C,
        }
    }
}

/// State of one simulated DMA channel
#[derive(Clone, Copy, Debug, Default)]
pub struct SimDmaChannel<'a> {
    /// Last programmed transfer
    pub transfer: Option<Transfer<'a>>,
    /// Channel running
    pub enabled: bool,
    /// Transfer-complete interrupt enabled
    pub complete_interrupt: bool,
    /// Transfer-complete flag
    pub complete: bool,
    /// Times the channel was programmed
    pub configurations: u32,
}

/// Simulated DMA controller
#[derive(Clone, Debug, Default)]
pub struct SimDma<'a> {
    channels: [SimDmaChannel<'a>; DMA_CHANNEL_COUNT],
    writes: usize,
}

impl<'a> SimDma<'a> {
    /// Controller with every channel disabled
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// State of one channel
    #[must_use]
    pub fn channel(&self, channel: DmaChannel) -> &SimDmaChannel<'a> {
        &self.channels[channel.index()]
    }

    /// Run one transfer round: write `values` into the target and raise the
    /// completion flag
    ///
    /// A normal-mode channel disables itself afterwards. Returns `false`
    /// (and writes nothing) when the channel is not running.
    pub fn complete_transfer(&mut self, channel: DmaChannel, values: &[u16]) -> bool {
        let state = &mut self.channels[channel.index()];
        let Some(transfer) = state.transfer.filter(|_| state.enabled) else {
            return false;
        };
        for (slot, &value) in transfer.target.iter().zip(values) {
            slot.store(value, Ordering::Relaxed);
        }
        state.complete = true;
        if transfer.mode == TransferMode::Normal {
            state.enabled = false;
        }
        true
    }

    /// Total register writes
    #[must_use]
    pub const fn writes(&self) -> usize {
        self.writes
    }

    fn channel_mut(&mut self, channel: DmaChannel) -> &mut SimDmaChannel<'a> {
        self.writes += 1;
        &mut self.channels[channel.index()]
    }
}

impl<'a> DmaHardware<'a> for SimDma<'a> {
    fn configure(&mut self, channel: DmaChannel, transfer: Transfer<'a>) {
        let state = self.channel_mut(channel);
        state.transfer = Some(transfer);
        state.configurations += 1;
    }

    fn set_enabled(&mut self, channel: DmaChannel, enabled: bool) {
        self.channel_mut(channel).enabled = enabled;
    }

    fn set_complete_interrupt(&mut self, channel: DmaChannel, enabled: bool) {
        self.channel_mut(channel).complete_interrupt = enabled;
    }

    fn transfer_complete(&self, channel: DmaChannel) -> bool {
        self.channels[channel.index()].complete
    }

    fn clear_transfer_complete(&mut self, channel: DmaChannel) {
        self.channel_mut(channel).complete = false;
    }
}

/// State of one simulated timer
#[derive(Clone, Copy, Debug, Default)]
pub struct SimTimer {
    /// Last programmed time base
    pub base: Option<TimeBase>,
    /// Period register
    pub period: u16,
    /// Compare registers
    pub compare: [u16; 4],
    /// Output compare setups
    pub outputs: [Option<OutputCompare>; 4],
    /// Counter running
    pub running: bool,
    /// Enabled interrupt sources
    pub interrupts: TimerFlags,
    /// Pending interrupt flags
    pub pending: TimerFlags,
}

/// Simulated timers
#[derive(Clone, Debug, Default)]
pub struct SimTimers {
    timers: [SimTimer; TIMER_COUNT],
    writes: usize,
}

impl SimTimers {
    /// Timers in reset state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// State of one timer
    #[must_use]
    pub fn timer(&self, timer: TimerId) -> &SimTimer {
        &self.timers[timer.index()]
    }

    /// Compare register of one channel
    #[must_use]
    pub fn compare_of(&self, timer: TimerId, channel: TimerChannel) -> u16 {
        self.timers[timer.index()].compare[channel.index()]
    }

    /// Output setup of one channel
    #[must_use]
    pub fn output_of(&self, timer: TimerId, channel: TimerChannel) -> Option<OutputCompare> {
        self.timers[timer.index()].outputs[channel.index()]
    }

    /// Raise pending flags, as the counter would
    pub fn raise(&mut self, timer: TimerId, flags: TimerFlags) {
        self.timers[timer.index()].pending |= flags;
    }

    /// Total register writes
    #[must_use]
    pub const fn writes(&self) -> usize {
        self.writes
    }

    fn timer_mut(&mut self, timer: TimerId) -> &mut SimTimer {
        self.writes += 1;
        &mut self.timers[timer.index()]
    }
}

impl TimerHardware for SimTimers {
    fn init_time_base(&mut self, timer: TimerId, base: TimeBase) {
        let state = self.timer_mut(timer);
        state.base = Some(base);
        state.period = base.period;
    }

    fn period(&self, timer: TimerId) -> u16 {
        self.timers[timer.index()].period
    }

    fn set_period(&mut self, timer: TimerId, period: u16) {
        self.timer_mut(timer).period = period;
    }

    fn compare(&self, timer: TimerId, channel: TimerChannel) -> u16 {
        self.compare_of(timer, channel)
    }

    fn set_compare(&mut self, timer: TimerId, channel: TimerChannel, value: u16) {
        self.timer_mut(timer).compare[channel.index()] = value;
    }

    fn configure_output(&mut self, timer: TimerId, channel: TimerChannel, output: OutputCompare) {
        let state = self.timer_mut(timer);
        state.outputs[channel.index()] = Some(output);
        state.compare[channel.index()] = output.pulse;
    }

    fn set_counter_enabled(&mut self, timer: TimerId, enabled: bool) {
        self.timer_mut(timer).running = enabled;
    }

    fn set_interrupts(&mut self, timer: TimerId, sources: TimerFlags, enabled: bool) {
        let state = self.timer_mut(timer);
        state.interrupts = if enabled {
            state.interrupts | sources
        } else {
            state.interrupts.without(sources)
        };
    }

    fn pending(&self, timer: TimerId) -> TimerFlags {
        self.timers[timer.index()].pending
    }

    fn clear_pending(&mut self, timer: TimerId, flags: TimerFlags) {
        let state = self.timer_mut(timer);
        state.pending = state.pending.without(flags);
    }
}

/// Simulated pin levels
#[derive(Clone, Debug)]
pub struct SimPins {
    levels: [Level; DIO_CHANNEL_COUNT],
    writes: usize,
}

impl SimPins {
    /// Every pin low
    #[must_use]
    pub const fn new() -> Self {
        Self {
            levels: [Level::Low; DIO_CHANNEL_COUNT],
            writes: 0,
        }
    }

    /// Force a pin level, as an external driver would
    pub fn set(&mut self, channel: DioChannel, level: Level) {
        if let Some(slot) = self.levels.get_mut(channel.index()) {
            *slot = level;
        }
    }

    /// Total writes through [`DigitalIo::write`]
    #[must_use]
    pub const fn writes(&self) -> usize {
        self.writes
    }
}

impl Default for SimPins {
    fn default() -> Self {
        Self::new()
    }
}

impl DigitalIo for SimPins {
    fn read(&self, channel: DioChannel) -> Level {
        self.levels.get(channel.index()).copied().unwrap_or(Level::Low)
    }

    fn write(&mut self, channel: DioChannel, level: Level) {
        self.writes += 1;
        self.set(channel, level);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuous_unit_keeps_producing() {
        let mut adc = SimAdc::new();
        adc.set_input(AdcUnit::Adc1, 4, 77);
        adc.configure(
            AdcUnit::Adc1,
            UnitSetup {
                scan: false,
                continuous: true,
                alignment: crate::hal::adc::Alignment::Right,
                sequence_length: 1,
            },
        );
        adc.configure_channel(AdcUnit::Adc1, 4, 1, SampleTime::Cycles1_5);
        adc.start_conversion(AdcUnit::Adc1);

        for _ in 0..3 {
            assert!(adc.end_of_conversion(AdcUnit::Adc1));
            assert_eq!(adc.read_data(AdcUnit::Adc1), 77);
        }
    }

    #[test]
    fn clearing_one_flag_keeps_the_rest() {
        let mut timers = SimTimers::new();
        let cc1 = TimerFlags::compare(TimerChannel::Ch1);
        timers.raise(TimerId::Tim3, cc1 | TimerFlags::UPDATE);
        timers.clear_pending(TimerId::Tim3, cc1);
        assert_eq!(timers.pending(TimerId::Tim3), TimerFlags::UPDATE);
    }
}
