//! Reference board configuration
//!
//! Static configuration records of the fan/LED controller: one streaming
//! acquisition group on ADC1 (potentiometer rank 1, LM35 rank 2), two
//! PWM channels on TIM2 and the profiles tying them together.

use crate::config::{adc, dma, pins, timers, ADC_MAX_CODE, PWM_PERIOD_TICKS, PWM_PRESCALER};
use crate::hal::adc::{
    AdcConfig, AdcUnit, Alignment, BufferMode, ChannelDef, ConversionMode, GroupDef, GroupId,
    SampleTime, TriggerSource,
};
use crate::hal::gpio::DioChannel;
use crate::hal::pwm::{ChannelClass, DutyCycle, PwmChannelConfig, PwmChannelId, PwmConfig};
use crate::hal::timer::TimerChannel;
use crate::iohw::{Actuator, IoHwAbConfig, Potentiometer, Profiles, TemperatureSensor};
use crate::thermal::{FanCurve, LedCutoff, SensorScale};
use crate::types::{HalResult, Level};

/// Sensor group
pub const SENSOR_GROUP: GroupId = 0;

/// Fan PWM channel
pub const FAN: PwmChannelId = 0;

/// LED PWM channel
pub const LED: PwmChannelId = 1;

/// Result-buffer slot of the potentiometer (configuration order)
pub const POT_SLOT: usize = 0;

/// Result-buffer slot of the LM35 (configuration order)
pub const LM35_SLOT: usize = 1;

/// Sensor group: continuous, software-triggered, circular DMA
///
/// # Errors
///
/// Only if the capacities in `config` are too small for the board.
pub fn adc_config() -> HalResult<AdcConfig> {
    let sensors = GroupDef::new(SENSOR_GROUP, AdcUnit::Adc1)
        .conversion(ConversionMode::Continuous)
        .trigger(TriggerSource::Software)
        .alignment(Alignment::Right)
        .priority(1)
        .streaming(dma::ADC1, BufferMode::Circular)
        .with_channel(ChannelDef::new(adc::POT_CHANNEL, 1, SampleTime::Cycles55_5))?
        .with_channel(ChannelDef::new(adc::LM35_CHANNEL, 2, SampleTime::Cycles55_5))?;

    let mut config = AdcConfig::new();
    config.add_group(sensors)?;
    Ok(config)
}

fn output(channel: TimerChannel, pin: DioChannel) -> PwmChannelConfig {
    PwmChannelConfig {
        class: ChannelClass::VariablePeriod,
        idle_state: Level::Low,
        polarity: Level::High,
        notification_enable: false,
        output_pin: Some(pin),
        ..PwmChannelConfig::new(timers::PWM, channel, PWM_PERIOD_TICKS, DutyCycle::ZERO)
    }
}

/// Fan on TIM2 CH3 and LED on TIM2 CH4, both starting at 0%
///
/// # Errors
///
/// Only if the capacities in `config` are too small for the board.
pub fn pwm_config() -> HalResult<PwmConfig> {
    let mut config = PwmConfig::new(PWM_PRESCALER);
    config.add_channel(output(timers::FAN_CHANNEL, pins::FAN_OUTPUT))?;
    config.add_channel(output(timers::LED_CHANNEL, pins::LED_OUTPUT))?;
    Ok(config)
}

/// Sensor and actuator profiles
#[must_use]
pub const fn profiles() -> Profiles {
    Profiles {
        group: SENSOR_GROUP,
        temperature: TemperatureSensor {
            slot: LM35_SLOT,
            scale: SensorScale::LM35,
            curve: FanCurve::DEFAULT,
        },
        fan: Actuator { channel: FAN },
        potentiometer: Potentiometer {
            slot: POT_SLOT,
            min: 0,
            max: ADC_MAX_CODE,
            led_cutoff: LedCutoff::DEFAULT,
        },
        led: Actuator { channel: LED },
        led_pin: pins::LED_ENABLE,
    }
}

/// Complete façade configuration
///
/// # Errors
///
/// Only if the capacities in `config` are too small for the board.
pub fn iohw_config() -> HalResult<IoHwAbConfig> {
    Ok(IoHwAbConfig {
        adc: adc_config()?,
        pwm: pwm_config()?,
        profiles: profiles(),
    })
}

/// Board on the STM32 register files
#[cfg(feature = "embedded")]
pub type Board = crate::iohw::IoHwAb<
    'static,
    crate::hal::stm32::Stm32Adc,
    crate::hal::stm32::Stm32Dma,
    crate::hal::stm32::Stm32Timers,
    crate::hal::stm32::Stm32Pins,
>;

/// Board on the in-memory register files
#[cfg(feature = "std")]
pub type SimBoard<'a> = crate::iohw::IoHwAb<
    'a,
    crate::hal::sim::SimAdc,
    crate::hal::sim::SimDma<'a>,
    crate::hal::sim::SimTimers,
    crate::hal::sim::SimPins,
>;

/// Uninitialized board on fresh in-memory register files
#[cfg(feature = "std")]
#[must_use]
pub fn sim_board(buffer: &[core::sync::atomic::AtomicU16]) -> SimBoard<'_> {
    use crate::hal::adc::Adc;
    use crate::hal::pwm::Pwm;
    use crate::hal::sim::{SimAdc, SimDma, SimPins, SimTimers};

    SimBoard::new(
        Adc::new(SimAdc::new(), SimDma::new()),
        Pwm::new(SimTimers::new()),
        SimPins::new(),
        buffer,
    )
}
