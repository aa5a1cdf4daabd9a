//! Hardware Abstraction Layer
//!
//! The acquisition and actuation engines and the register-file traits they
//! drive. `stm32` implements the traits on the STM32F103 peripherals;
//! `sim` implements them in memory for host tests.

pub mod adc;
pub mod dma;
pub mod gpio;
pub mod pwm;
pub mod timer;

#[cfg(feature = "std")]
pub mod sim;

#[cfg(feature = "embedded")]
pub mod stm32;
