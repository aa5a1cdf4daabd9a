//! System configuration and hardware constants
//!
//! Compile-time constants for the fan/LED controller board (STM32F103C8).
//! Pin mappings, converter scaling, control thresholds and engine
//! capacities are centralized here.

/// System clock frequency (HSI, no PLL)
pub const SYSTEM_CLOCK_HZ: u32 = 8_000_000;

/// Largest 12-bit ADC code
pub const ADC_MAX_CODE: u16 = 4095;

/// ADC reference voltage in millivolts
pub const ADC_VREF_MV: u32 = 3300;

/// LM35 output slope in millivolts per degree Celsius
pub const LM35_MV_PER_DEGREE: u32 = 10;

/// Temperature where the fan starts ramping (°C)
pub const FAN_LOW_THRESHOLD_C: u16 = 30;

/// Temperature where the fan runs at full speed (°C)
pub const FAN_HIGH_THRESHOLD_C: u16 = 80;

/// Potentiometer code above which the indicator LED is switched off
pub const LED_ENABLE_CUTOFF: u16 = 2000;

/// PWM timer prescaler: 8 MHz / 8 = 1 µs tick
pub const PWM_PRESCALER: u16 = 8 - 1;

/// PWM period in ticks (1 kHz at a 1 µs tick)
///
/// Both outputs live on TIM2 and share its period register.
pub const PWM_PERIOD_TICKS: u16 = 999;

/// Maximum number of acquisition groups
pub const ADC_MAX_GROUPS: usize = 4;

/// Maximum channels in one acquisition group (regular sequence length)
pub const ADC_MAX_GROUP_CHANNELS: usize = 16;

/// Slots in the streaming result buffer of group 0
pub const ADC_GROUP0_BUFFER_SIZE: usize = 4;

/// Maximum number of PWM channels (4 on each of TIM2..TIM4)
pub const PWM_MAX_CHANNELS: usize = 12;

/// Interval of the status log task in milliseconds
pub const STATUS_LOG_INTERVAL_MS: u64 = 1000;

/// Pin assignments
pub mod pins {
    //! Pin assignments matching the schematic

    use crate::hal::gpio::{DioChannel, GpioPort};

    /// Potentiometer wiper (ADC1 channel 0)
    pub const POT_ADC: &str = "PA0";

    /// LM35 output (ADC1 channel 1)
    pub const LM35_ADC: &str = "PA1";

    /// Fan PWM output (TIM2 CH3)
    pub const FAN_PWM: &str = "PA2";

    /// LED PWM output (TIM2 CH4)
    pub const LED_PWM: &str = "PA3";

    /// Indicator LED
    pub const LED_ENABLE_PIN: &str = "PC13";

    /// Fan PWM output as a digital channel
    pub const FAN_OUTPUT: DioChannel = DioChannel::new(GpioPort::A, 2);

    /// LED PWM output as a digital channel
    pub const LED_OUTPUT: DioChannel = DioChannel::new(GpioPort::A, 3);

    /// Indicator LED as a digital channel
    pub const LED_ENABLE: DioChannel = DioChannel::new(GpioPort::C, 13);
}

/// ADC input channels
pub mod adc {
    //! ADC1 input channel assignments

    /// Potentiometer input channel
    pub const POT_CHANNEL: u8 = 0;

    /// LM35 input channel
    pub const LM35_CHANNEL: u8 = 1;
}

/// DMA channel assignments
pub mod dma {
    //! DMA channel assignments for streaming acquisition

    use crate::hal::dma::DmaChannel;

    /// ADC1 request line (fixed on DMA1 channel 1)
    pub const ADC1: DmaChannel = DmaChannel::Ch1;
}

/// Timer assignments
pub mod timers {
    //! Hardware timer assignments

    use crate::hal::timer::{TimerChannel, TimerId};

    /// PWM timer for both outputs
    pub const PWM: TimerId = TimerId::Tim2;

    /// Fan compare channel
    pub const FAN_CHANNEL: TimerChannel = TimerChannel::Ch3;

    /// LED compare channel
    pub const LED_CHANNEL: TimerChannel = TimerChannel::Ch4;
}
