//! GPIO Abstractions
//!
//! Digital channel identifiers and the pin-level seam the engines use.
//! Pin multiplexing and electrical setup belong to the port layer; this
//! module only reads and writes levels of already configured pins.

use crate::types::Level;

/// Number of addressable digital channels (ports A..D, 16 pins each)
pub const DIO_CHANNEL_COUNT: usize = 64;

/// GPIO port
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GpioPort {
    /// Port A
    A,
    /// Port B
    B,
    /// Port C
    C,
    /// Port D
    D,
}

impl GpioPort {
    const fn index(self) -> u8 {
        match self {
            Self::A => 0,
            Self::B => 1,
            Self::C => 2,
            Self::D => 3,
        }
    }

    const fn from_index(index: u8) -> Self {
        match index {
            0 => Self::A,
            1 => Self::B,
            2 => Self::C,
            _ => Self::D,
        }
    }
}

/// Digital channel: `port * 16 + pin`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DioChannel(u8);

impl DioChannel {
    /// Build a channel from port and pin (pin is taken modulo 16)
    #[must_use]
    pub const fn new(port: GpioPort, pin: u8) -> Self {
        Self(port.index() * 16 + (pin & 0x0F))
    }

    /// Port of this channel
    #[must_use]
    pub const fn port(self) -> GpioPort {
        GpioPort::from_index(self.0 / 16)
    }

    /// Pin number within the port
    #[must_use]
    pub const fn pin(self) -> u8 {
        self.0 % 16
    }

    /// Flat channel index
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for DioChannel {
    fn format(&self, f: defmt::Formatter) {
        let port = match self.port() {
            GpioPort::A => 'A',
            GpioPort::B => 'B',
            GpioPort::C => 'C',
            GpioPort::D => 'D',
        };
        defmt::write!(f, "P{}{}", port, self.pin());
    }
}

/// Level access to configured pins
pub trait DigitalIo {
    /// Sample the logic level of a pin
    fn read(&self, channel: DioChannel) -> Level;

    /// Drive an output pin
    fn write(&mut self, channel: DioChannel, level: Level);
}

/// Binary LED state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LedState {
    /// LED is off
    #[default]
    Off,
    /// LED is on
    On,
}

impl LedState {
    /// Pin level that produces this state
    #[must_use]
    pub const fn level(self) -> Level {
        match self {
            Self::Off => Level::Low,
            Self::On => Level::High,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for LedState {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Off => defmt::write!(f, "OFF"),
            Self::On => defmt::write!(f, "ON"),
        }
    }
}
