//! Timer Register Model
//!
//! Identifies the general-purpose timers and their capture/compare
//! channels, and defines the register-file seam the actuation engine
//! drives. Period and compare values live only in these registers.

use core::ops::{BitAnd, BitOr, BitOrAssign};

use crate::types::Level;

/// Number of general-purpose timers handled by the actuation engine
pub const TIMER_COUNT: usize = 3;

/// General-purpose timer instance
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerId {
    /// TIM2
    Tim2,
    /// TIM3
    Tim3,
    /// TIM4
    Tim4,
}

impl TimerId {
    /// All timers in index order
    pub const ALL: [Self; TIMER_COUNT] = [Self::Tim2, Self::Tim3, Self::Tim4];

    /// Table index of this timer
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Tim2 => 0,
            Self::Tim3 => 1,
            Self::Tim4 => 2,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for TimerId {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Tim2 => defmt::write!(f, "TIM2"),
            Self::Tim3 => defmt::write!(f, "TIM3"),
            Self::Tim4 => defmt::write!(f, "TIM4"),
        }
    }
}

/// Capture/compare channel of a timer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerChannel {
    /// CH1
    Ch1,
    /// CH2
    Ch2,
    /// CH3
    Ch3,
    /// CH4
    Ch4,
}

impl TimerChannel {
    /// All channels in index order
    pub const ALL: [Self; 4] = [Self::Ch1, Self::Ch2, Self::Ch3, Self::Ch4];

    /// Build from the 1-based channel number printed on the datasheet
    #[must_use]
    pub const fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(Self::Ch1),
            2 => Some(Self::Ch2),
            3 => Some(Self::Ch3),
            4 => Some(Self::Ch4),
            _ => None,
        }
    }

    /// 1-based channel number
    #[must_use]
    pub const fn number(self) -> u8 {
        self.index() as u8 + 1
    }

    /// 0-based register index
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Ch1 => 0,
            Self::Ch2 => 1,
            Self::Ch3 => 2,
            Self::Ch4 => 3,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for TimerChannel {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "CH{}", self.number());
    }
}

/// Interrupt status/enable bits of one timer
///
/// Bit layout follows the status register: bit 0 is the shared update
/// (period rollover) flag, bits 1..=4 are the per-channel compare flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimerFlags(u8);

impl TimerFlags {
    /// No flag
    pub const NONE: Self = Self(0);

    /// Shared period-rollover flag
    pub const UPDATE: Self = Self(0x01);

    const MASK: u8 = 0x1F;

    /// Compare-match flag of one channel
    #[must_use]
    pub const fn compare(channel: TimerChannel) -> Self {
        Self(1 << channel.number())
    }

    /// Build from raw status bits (undefined bits are dropped)
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::MASK)
    }

    /// Raw status bits
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Check that every flag of `other` is set in `self`
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Check that at least one flag of `other` is set in `self`
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Check for an empty set
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Flags of `self` that are not in `other`
    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl BitOr for TimerFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for TimerFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for TimerFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for TimerFlags {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Flags({=u8:#x})", self.0);
    }
}

/// Output compare mode
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Compare has no effect on the output (reset state)
    #[default]
    Frozen,
    /// Output active while counter < compare
    Pwm1,
}

/// Output compare setup for one timer channel
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutputCompare {
    /// Compare mode
    pub mode: OutputMode,
    /// Output driver enabled
    pub enabled: bool,
    /// Active level of the output
    pub polarity: Level,
    /// Compare value
    pub pulse: u16,
    /// Compare register preload
    pub preload: bool,
}

impl OutputCompare {
    /// PWM mode 1 with preload, output enabled
    #[must_use]
    pub const fn pwm(polarity: Level, pulse: u16) -> Self {
        Self {
            mode: OutputMode::Pwm1,
            enabled: true,
            polarity,
            pulse,
            preload: true,
        }
    }

    /// Reset-state output compare with the given polarity
    #[must_use]
    pub const fn reset(polarity: Level) -> Self {
        Self {
            mode: OutputMode::Frozen,
            enabled: false,
            polarity,
            pulse: 0,
            preload: false,
        }
    }
}

/// Counter time base of one timer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeBase {
    /// Auto-reload (period) value in ticks
    pub period: u16,
    /// Clock prescaler (divider minus one)
    pub prescaler: u16,
}

/// Register file of the general-purpose timers
///
/// Implementations write straight to hardware; the actuation engine keeps
/// no copy of period or compare values.
pub trait TimerHardware {
    /// Program counter mode, period and prescaler
    fn init_time_base(&mut self, timer: TimerId, base: TimeBase);

    /// Current period (auto-reload) register
    fn period(&self, timer: TimerId) -> u16;

    /// Write the period register
    fn set_period(&mut self, timer: TimerId, period: u16);

    /// Current compare register of one channel
    fn compare(&self, timer: TimerId, channel: TimerChannel) -> u16;

    /// Write the compare register of one channel
    fn set_compare(&mut self, timer: TimerId, channel: TimerChannel, value: u16);

    /// Apply an output compare setup to one channel
    fn configure_output(&mut self, timer: TimerId, channel: TimerChannel, output: OutputCompare);

    /// Start or stop the counter
    fn set_counter_enabled(&mut self, timer: TimerId, enabled: bool);

    /// Enable or disable the given interrupt sources
    fn set_interrupts(&mut self, timer: TimerId, sources: TimerFlags, enabled: bool);

    /// Pending interrupt flags
    fn pending(&self, timer: TimerId) -> TimerFlags;

    /// Clear the given pending flags, leaving the others untouched
    fn clear_pending(&mut self, timer: TimerId, flags: TimerFlags);
}
