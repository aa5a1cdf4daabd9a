//! Fan and LED Controller Firmware Library
//!
//! Sampling and actuation core for an STM32F103 board that reads an LM35
//! temperature sensor and a potentiometer, and drives a cooling fan and a
//! dimmable LED from them in a closed loop.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    CONTROL FAÇADE (iohw)                     │
//! │  temperature → fan duty  │  potentiometer → LED duty/enable  │
//! ├─────────────────────────────────────────────────────────────┤
//! │                 UNIT CONVERSION (thermal)                    │
//! │        LM35 scaling  │  fan curve  │  LED cutoff             │
//! ├──────────────────────────────┬──────────────────────────────┤
//! │   ACQUISITION ENGINE (adc)   │   ACTUATION ENGINE (pwm)      │
//! │ groups │ status │ DMA stream │ duty math │ event dispatch    │
//! ├──────────────────────────────┴──────────────────────────────┤
//! │            REGISTER FILES (stm32 on target, sim on host)     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Design Principles
//!
//! - **Owned configuration**: each engine is an explicitly constructed
//!   instance that owns its configuration by value
//! - **Registers behind traits**: the engines only talk to
//!   `AdcHardware`, `DmaHardware`, `TimerHardware` and `DigitalIo`
//! - **Explicit results**: every fallible operation returns `HalResult`
//!   and leaves the hardware untouched when it fails
//! - **No unsafe in library code**

#![cfg_attr(feature = "embedded", no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[macro_use]
mod log;

// Re-export dependencies needed by the application (only in embedded mode)
#[cfg(feature = "embedded")]
pub use embassy_executor;
#[cfg(feature = "embedded")]
pub use embassy_stm32;
#[cfg(feature = "embedded")]
pub use embassy_time;

/// Hardware Abstraction Layer
///
/// Acquisition and actuation engines over register-file traits.
pub mod hal;

/// Unit conversion and control curves
pub mod thermal;

/// Control façade
pub mod iohw;

/// Reference board configuration
pub mod board;

/// Shared types used across modules
pub mod types;

/// System configuration and constants
pub mod config;

/// Prelude module for common imports
pub mod prelude {
    //! Convenient re-exports for common types and traits.

    pub use crate::config::*;
    pub use crate::types::*;

    pub use crate::hal::adc::{Adc, AdcHardware, GroupId, GroupStatus};
    pub use crate::hal::dma::{DmaHardware, SampleBuffer};
    pub use crate::hal::gpio::{DigitalIo, LedState};
    pub use crate::hal::pwm::{DutyCycle, Pwm, PwmChannelId};
    pub use crate::hal::timer::TimerHardware;
    pub use crate::iohw::IoHwAb;

    // Embassy
    #[cfg(feature = "embedded")]
    pub use embassy_time::{Duration, Instant, Timer};

    // Logging
    #[cfg(feature = "embedded")]
    pub use defmt::{debug, error, info, trace, warn};
}
