//! PWM Actuation
//!
//! Duty-cycle outputs on general-purpose timer channels. Duty cycles are
//! unsigned 1.15 fixed point where 0x8000 is 100%; the compare value of a
//! channel is always derived from the period currently in its timer.
//!
//! Period and compare values are never shadowed in RAM, so operations on
//! one channel must not interleave (interrupt handlers only dispatch).

use core::fmt;

use fixed::types::U1F15;
use heapless::Vec;

use crate::config::PWM_MAX_CHANNELS;
use crate::hal::gpio::{DigitalIo, DioChannel};
use crate::hal::timer::{
    OutputCompare, TimeBase, TimerChannel, TimerFlags, TimerHardware, TimerId, TIMER_COUNT,
};
use crate::types::{HalError, HalResult, Level, VersionInfo};

/// Logical channel number (index into the configuration)
pub type PwmChannelId = u8;

/// PWM duty cycle, 0x0000 (0%) to 0x8000 (100%)
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct DutyCycle(U1F15);

impl DutyCycle {
    /// 0% duty cycle
    pub const ZERO: Self = Self(U1F15::from_bits(0));

    /// 100% duty cycle
    pub const FULL: Self = Self(U1F15::from_bits(Self::FULL_BITS));

    /// 50% duty cycle
    pub const HALF: Self = Self(U1F15::from_bits(Self::FULL_BITS / 2));

    const FULL_BITS: u16 = 0x8000;

    /// Create from the raw 1.15 value (saturates at 100%)
    #[must_use]
    pub const fn from_raw(value: u16) -> Self {
        let bits = if value > Self::FULL_BITS {
            Self::FULL_BITS
        } else {
            value
        };
        Self(U1F15::from_bits(bits))
    }

    /// Create from percentage (0-100)
    #[must_use]
    pub fn from_percent(percent: u8) -> Self {
        let value = (u32::from(percent.min(100)) * u32::from(Self::FULL_BITS)) / 100;
        Self::from_raw(value as u16)
    }

    /// Raw 1.15 value
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0.to_bits()
    }

    /// Percentage, rounded to nearest
    #[must_use]
    pub fn as_percent(self) -> u8 {
        ((u32::from(self.raw()) * 100 + u32::from(Self::FULL_BITS / 2)) >> 15) as u8
    }

    /// Compare value for a timer period: `(period * duty) >> 15`
    #[must_use]
    pub fn compare_for(self, period: u16) -> u16 {
        ((u32::from(period) * u32::from(self.raw())) >> 15) as u16
    }
}

impl Default for DutyCycle {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for DutyCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.as_percent())
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for DutyCycle {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{}%", self.as_percent());
    }
}

/// Period behaviour of a channel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ChannelClass {
    /// Period may be changed at runtime
    #[default]
    VariablePeriod,
    /// Period fixed at init
    FixedPeriod,
    /// Period fixed at init, phase-shifted output
    FixedPeriodShifted,
}

/// Edge(s) a notification is requested for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeNotification {
    /// Period start
    Rising,
    /// Compare match
    Falling,
    /// Both
    Both,
}

impl EdgeNotification {
    /// Interrupt sources armed on the channel's timer
    #[must_use]
    pub const fn sources(self, channel: TimerChannel) -> TimerFlags {
        let compare = TimerFlags::compare(channel);
        match self {
            Self::Falling => compare,
            Self::Rising | Self::Both => TimerFlags::from_bits(compare.bits() | TimerFlags::UPDATE.bits()),
        }
    }
}

/// Static configuration of one PWM channel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PwmChannelConfig {
    /// Owning timer
    pub timer: TimerId,
    /// Compare channel of the timer
    pub channel: TimerChannel,
    /// Period class
    pub class: ChannelClass,
    /// Period programmed at init, in timer ticks
    pub default_period: u16,
    /// Duty cycle programmed at init
    pub default_duty: DutyCycle,
    /// Polarity applied when the output is idled
    pub idle_state: Level,
    /// Active level of the output
    pub polarity: Level,
    /// Report events of this channel to the shared callback
    pub notification_enable: bool,
    /// Pin carrying the output, sampled by [`Pwm::get_output_state`]
    pub output_pin: Option<DioChannel>,
}

impl PwmChannelConfig {
    /// Variable-period, active-high, idle-low channel without notification
    #[must_use]
    pub const fn new(timer: TimerId, channel: TimerChannel, period: u16, duty: DutyCycle) -> Self {
        Self {
            timer,
            channel,
            class: ChannelClass::VariablePeriod,
            default_period: period,
            default_duty: duty,
            idle_state: Level::Low,
            polarity: Level::High,
            notification_enable: false,
            output_pin: None,
        }
    }
}

/// Actuation set bound by [`Pwm::init`]
#[derive(Clone, Debug, Default)]
pub struct PwmConfig {
    /// Channels, indexed by logical channel number
    pub channels: Vec<PwmChannelConfig, PWM_MAX_CHANNELS>,
    /// Timer clock prescaler (divider minus one)
    pub prescaler: u16,
    /// Shared notification callback, called with the logical channel number
    pub notification: Option<fn(PwmChannelId)>,
}

impl PwmConfig {
    /// Empty actuation set with the given prescaler
    #[must_use]
    pub const fn new(prescaler: u16) -> Self {
        Self {
            channels: Vec::new(),
            prescaler,
            notification: None,
        }
    }

    /// Append a channel, returning its logical number
    ///
    /// # Errors
    ///
    /// `PreconditionUnmet` when the set is full or the timer channel is
    /// already used.
    pub fn add_channel(&mut self, channel: PwmChannelConfig) -> HalResult<PwmChannelId> {
        let duplicate = self
            .channels
            .iter()
            .any(|c| c.timer == channel.timer && c.channel == channel.channel);
        if duplicate {
            return Err(HalError::PreconditionUnmet);
        }
        let id = self.channels.len() as PwmChannelId;
        self.channels
            .push(channel)
            .map_err(|_| HalError::PreconditionUnmet)?;
        Ok(id)
    }

    /// Install the shared notification callback
    #[must_use]
    pub fn on_notification(mut self, callback: fn(PwmChannelId)) -> Self {
        self.notification = Some(callback);
        self
    }
}

/// Channels notified by one timer event
pub type Notified = Vec<PwmChannelId, 4>;

/// PWM actuation engine
pub struct Pwm<T> {
    hw: T,
    config: Option<PwmConfig>,
    timer_channels: [Vec<PwmChannelId, 4>; TIMER_COUNT],
    armed: [TimerFlags; PWM_MAX_CHANNELS],
}

fn lookup(config: Option<&PwmConfig>, id: PwmChannelId) -> HalResult<&PwmChannelConfig> {
    let config = config.ok_or(HalError::NotInitialized)?;
    config
        .channels
        .get(usize::from(id))
        .ok_or(HalError::InvalidId)
}

impl<T: TimerHardware> Pwm<T> {
    /// Engine with no bound configuration
    pub fn new(hw: T) -> Self {
        Self {
            hw,
            config: None,
            timer_channels: [Vec::new(), Vec::new(), Vec::new()],
            armed: [TimerFlags::NONE; PWM_MAX_CHANNELS],
        }
    }

    /// Program period and initial compare of every channel, then start its
    /// timer
    ///
    /// Channels sharing a timer share its period register; the last
    /// channel's default period is the one left running.
    ///
    /// # Errors
    ///
    /// `PreconditionUnmet` when already initialized (registers are left
    /// untouched), when the set is empty, or when two entries name the
    /// same timer channel.
    pub fn init(&mut self, config: PwmConfig) -> HalResult<()> {
        if self.config.is_some() {
            warn!("pwm: init while initialized");
            return Err(HalError::PreconditionUnmet);
        }
        if config.channels.is_empty() {
            return Err(HalError::PreconditionUnmet);
        }

        let mut timer_channels: [Vec<PwmChannelId, 4>; TIMER_COUNT] =
            [Vec::new(), Vec::new(), Vec::new()];
        for (index, channel) in config.channels.iter().enumerate() {
            let id = index as PwmChannelId;
            let slot = &mut timer_channels[channel.timer.index()];
            if slot
                .iter()
                .any(|&other| config.channels[usize::from(other)].channel == channel.channel)
            {
                warn!("pwm: timer channel bound twice");
                return Err(HalError::PreconditionUnmet);
            }
            // At most four distinct channels per timer fit.
            let _ = slot.push(id);
        }

        for channel in &config.channels {
            self.hw.init_time_base(
                channel.timer,
                TimeBase {
                    period: channel.default_period,
                    prescaler: config.prescaler,
                },
            );
            let pulse = channel.default_duty.compare_for(channel.default_period);
            self.hw.configure_output(
                channel.timer,
                channel.channel,
                OutputCompare::pwm(channel.polarity, pulse),
            );
            self.hw.set_counter_enabled(channel.timer, true);
        }

        debug!("pwm: {} channels running", config.channels.len());
        self.timer_channels = timer_channels;
        self.armed = [TimerFlags::NONE; PWM_MAX_CHANNELS];
        self.config = Some(config);
        Ok(())
    }

    /// Idle every channel, stop its timer and drop the configuration
    ///
    /// # Errors
    ///
    /// `NotInitialized` when no configuration is bound.
    pub fn deinit(&mut self) -> HalResult<()> {
        let config = self.config.take().ok_or(HalError::NotInitialized)?;
        for (index, channel) in config.channels.iter().enumerate() {
            let armed = self.armed[index];
            if !armed.is_empty() {
                self.hw.set_interrupts(channel.timer, armed, false);
            }
            self.hw.configure_output(
                channel.timer,
                channel.channel,
                OutputCompare::reset(channel.idle_state),
            );
            self.hw.set_counter_enabled(channel.timer, false);
        }
        self.timer_channels = [Vec::new(), Vec::new(), Vec::new()];
        self.armed = [TimerFlags::NONE; PWM_MAX_CHANNELS];
        debug!("pwm: deinit");
        Ok(())
    }

    /// Change the duty cycle against the timer's current period
    ///
    /// # Errors
    ///
    /// `NotInitialized` or `InvalidId`.
    pub fn set_duty_cycle(&mut self, id: PwmChannelId, duty: DutyCycle) -> HalResult<()> {
        let channel = lookup(self.config.as_ref(), id)?;
        let period = self.hw.period(channel.timer);
        self.hw
            .set_compare(channel.timer, channel.channel, duty.compare_for(period));
        Ok(())
    }

    /// Rewrite the period, then the compare value
    ///
    /// # Errors
    ///
    /// `NotInitialized`, `InvalidId`, or `PreconditionUnmet` unless the
    /// channel is variable-period.
    pub fn set_period_and_duty(
        &mut self,
        id: PwmChannelId,
        period: u16,
        duty: DutyCycle,
    ) -> HalResult<()> {
        let channel = lookup(self.config.as_ref(), id)?;
        if channel.class != ChannelClass::VariablePeriod {
            warn!("pwm: channel {} has a fixed period", id);
            return Err(HalError::PreconditionUnmet);
        }
        self.hw.set_period(channel.timer, period);
        self.hw
            .set_compare(channel.timer, channel.channel, duty.compare_for(period));
        Ok(())
    }

    /// Zero the compare value and re-apply the idle polarity
    ///
    /// # Errors
    ///
    /// `NotInitialized` or `InvalidId`.
    pub fn set_output_to_idle(&mut self, id: PwmChannelId) -> HalResult<()> {
        let channel = lookup(self.config.as_ref(), id)?;
        self.hw.configure_output(
            channel.timer,
            channel.channel,
            OutputCompare::pwm(channel.idle_state, 0),
        );
        Ok(())
    }

    /// Sample the output pin of a channel
    ///
    /// Unknown channels, an uninitialized engine and channels without an
    /// output pin read `Low`.
    pub fn get_output_state<P: DigitalIo>(&self, id: PwmChannelId, pins: &P) -> Level {
        lookup(self.config.as_ref(), id)
            .ok()
            .and_then(|channel| channel.output_pin)
            .map_or(Level::Low, |pin| pins.read(pin))
    }

    /// Arm the events of a channel
    ///
    /// The compare match is armed for every edge kind; rising and both also
    /// arm the timer's shared rollover event. Re-arming replaces the
    /// previous edge selection.
    ///
    /// # Errors
    ///
    /// `NotInitialized` or `InvalidId`.
    pub fn enable_notification(&mut self, id: PwmChannelId, edge: EdgeNotification) -> HalResult<()> {
        let channel = *lookup(self.config.as_ref(), id)?;
        let index = usize::from(id);
        let sources = edge.sources(channel.channel);
        let dropped = self.armed[index].without(sources);
        self.armed[index] = sources;
        if dropped.contains(TimerFlags::UPDATE) && !self.rollover_armed(channel.timer) {
            self.hw.set_interrupts(channel.timer, TimerFlags::UPDATE, false);
        }
        self.hw.set_interrupts(channel.timer, sources, true);
        Ok(())
    }

    /// Disarm the events of a channel
    ///
    /// The shared rollover event stays armed while another channel of the
    /// same timer still uses it.
    ///
    /// # Errors
    ///
    /// `NotInitialized` or `InvalidId`.
    pub fn disable_notification(&mut self, id: PwmChannelId) -> HalResult<()> {
        let channel = *lookup(self.config.as_ref(), id)?;
        let index = usize::from(id);
        let previous = self.armed[index];
        self.armed[index] = TimerFlags::NONE;

        let mut sources = TimerFlags::compare(channel.channel);
        if previous.contains(TimerFlags::UPDATE) && !self.rollover_armed(channel.timer) {
            sources |= TimerFlags::UPDATE;
        }
        self.hw.set_interrupts(channel.timer, sources, false);
        Ok(())
    }

    /// Shared interrupt handler of one timer
    ///
    /// Pending flags are sampled once and cleared once after every channel
    /// of the timer has been checked. A channel fires when its own compare
    /// flag or the timer's rollover flag is pending and its notification is
    /// enabled; the callback runs at most once per channel. Returns the
    /// channels notified.
    pub fn on_timer_event(&mut self, timer: TimerId) -> Notified {
        let mut notified = Notified::new();
        let pending = self.hw.pending(timer);
        if pending.is_empty() {
            return notified;
        }

        if let Some(config) = self.config.as_ref() {
            for &id in &self.timer_channels[timer.index()] {
                let Some(channel) = config.channels.get(usize::from(id)) else {
                    continue;
                };
                if !channel.notification_enable {
                    continue;
                }
                let hit = pending & (TimerFlags::compare(channel.channel) | TimerFlags::UPDATE);
                if hit.is_empty() {
                    continue;
                }
                if let Some(callback) = config.notification {
                    callback(id);
                }
                let _ = notified.push(id);
            }
        } else {
            warn!("pwm: timer event while uninitialized");
        }

        self.hw.clear_pending(timer, pending);
        notified
    }

    fn rollover_armed(&self, timer: TimerId) -> bool {
        self.timer_channels[timer.index()]
            .iter()
            .any(|&id| self.armed[usize::from(id)].contains(TimerFlags::UPDATE))
    }

    /// Module version
    #[must_use]
    pub const fn version_info(&self) -> VersionInfo {
        VersionInfo {
            vendor_id: 0x1234,
            module_id: 0xABCD,
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

    /// Number of configured channels (0 when uninitialized)
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.config.as_ref().map_or(0, |c| c.channels.len())
    }

    /// Interrupt sources currently armed for a channel
    #[must_use]
    pub fn armed_sources(&self, id: PwmChannelId) -> TimerFlags {
        self.armed
            .get(usize::from(id))
            .copied()
            .unwrap_or(TimerFlags::NONE)
    }

    /// Timer register file
    pub const fn hardware(&self) -> &T {
        &self.hw
    }

    /// Timer register file, mutably
    pub fn hardware_mut(&mut self) -> &mut T {
        &mut self.hw
    }
}
