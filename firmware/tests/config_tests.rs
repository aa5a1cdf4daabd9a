//! Configuration and Constants Tests
//!
//! Tests to verify the board constants are consistent and the reference
//! configuration records are accepted by the engines.
//! Run with: cargo test --test config_tests

use fanctl_firmware::board::{self, FAN, LED, LM35_SLOT, POT_SLOT, SENSOR_GROUP};
use fanctl_firmware::config::*;
use fanctl_firmware::hal::adc::{
    AdcUnit, BufferMode, ConversionMode, SampleTime, TriggerSource, ADC_MAX_CHANNEL,
};
use fanctl_firmware::hal::gpio::GpioPort;
use fanctl_firmware::hal::pwm::{ChannelClass, DutyCycle};
use fanctl_firmware::hal::timer::{TimerChannel, TimerId};
use fanctl_firmware::thermal::{FanCurve, Temperature};
use fanctl_firmware::types::Level;

// =============================================================================
// Clock and Timer Tests
// =============================================================================

#[test]
fn system_clock_valid() {
    // HSI without PLL
    assert_eq!(SYSTEM_CLOCK_HZ, 8_000_000);
}

#[test]
fn pwm_runs_at_one_kilohertz() {
    let tick_hz = SYSTEM_CLOCK_HZ / (u32::from(PWM_PRESCALER) + 1);
    assert_eq!(tick_hz, 1_000_000);
    assert_eq!(tick_hz / (u32::from(PWM_PERIOD_TICKS) + 1), 1_000);
}

#[test]
fn pwm_outputs_share_one_timer() {
    assert_eq!(timers::PWM, TimerId::Tim2);
    assert_ne!(timers::FAN_CHANNEL, timers::LED_CHANNEL);
}

// =============================================================================
// Converter Tests
// =============================================================================

#[test]
fn converter_is_twelve_bit() {
    assert_eq!(ADC_MAX_CODE, (1 << 12) - 1);
    assert_eq!(ADC_VREF_MV, 3300);
}

#[test]
fn sensor_inputs_are_distinct_external_channels() {
    assert_ne!(adc::POT_CHANNEL, adc::LM35_CHANNEL);
    assert!(adc::POT_CHANNEL < 16 && adc::LM35_CHANNEL < 16);
    assert!(ADC_MAX_CHANNEL >= 16);
}

#[test]
fn lm35_full_scale_reading() {
    // 3.3 V at the input reads 330 °C
    assert_eq!(Temperature::from_lm35_code(ADC_MAX_CODE).celsius(), 330);
}

#[test]
fn result_buffer_fits_group() {
    assert!(ADC_GROUP0_BUFFER_SIZE >= 2);
    assert!(ADC_GROUP0_BUFFER_SIZE <= ADC_MAX_GROUP_CHANNELS);
}

// =============================================================================
// Control Threshold Tests
// =============================================================================

#[test]
fn fan_ramp_is_ordered() {
    assert!(FAN_LOW_THRESHOLD_C < FAN_HIGH_THRESHOLD_C);
    assert_eq!(FanCurve::DEFAULT, FanCurve::new(30, 80));
}

#[test]
fn led_cutoff_within_range() {
    assert!(LED_ENABLE_CUTOFF > 0);
    assert!(LED_ENABLE_CUTOFF < ADC_MAX_CODE);
}

// =============================================================================
// Pin Tests
// =============================================================================

#[test]
fn pin_names_match_channels() {
    assert_eq!(pins::POT_ADC, "PA0");
    assert_eq!(pins::LM35_ADC, "PA1");
    assert_eq!(pins::FAN_PWM, "PA2");
    assert_eq!(pins::LED_PWM, "PA3");
    assert_eq!(pins::LED_ENABLE_PIN, "PC13");

    assert_eq!(pins::FAN_OUTPUT.port(), GpioPort::A);
    assert_eq!(pins::FAN_OUTPUT.pin(), 2);
    assert_eq!(pins::LED_OUTPUT.pin(), 3);
    assert_eq!(pins::LED_ENABLE.port(), GpioPort::C);
    assert_eq!(pins::LED_ENABLE.pin(), 13);
}

#[test]
fn pins_are_distinct() {
    let all = [pins::FAN_OUTPUT, pins::LED_OUTPUT, pins::LED_ENABLE];
    for (i, a) in all.iter().enumerate() {
        for b in &all[i + 1..] {
            assert_ne!(a.index(), b.index());
        }
    }
}

// =============================================================================
// Board Configuration Tests
// =============================================================================

#[test]
fn sensor_group_layout() {
    let config = board::adc_config().unwrap();
    assert_eq!(config.groups.len(), 1);

    let group = &config.groups[usize::from(SENSOR_GROUP)];
    assert_eq!(group.unit, AdcUnit::Adc1);
    assert_eq!(group.conversion, ConversionMode::Continuous);
    assert_eq!(group.trigger, TriggerSource::Software);
    assert!(group.ranks_are_permutation());

    let streaming = group.streaming.expect("sensor group streams");
    assert_eq!(streaming.dma, dma::ADC1);
    assert_eq!(streaming.mode, BufferMode::Circular);

    let pot = group.channels[POT_SLOT];
    assert_eq!((pot.channel, pot.rank), (adc::POT_CHANNEL, 1));
    let lm35 = group.channels[LM35_SLOT];
    assert_eq!((lm35.channel, lm35.rank), (adc::LM35_CHANNEL, 2));
    assert!(group
        .channels
        .iter()
        .all(|c| c.sample_time == SampleTime::Cycles55_5));
}

#[test]
fn sensor_group_unit_setup() {
    let config = board::adc_config().unwrap();
    let setup = config.groups[0].unit_setup();
    assert!(setup.scan);
    assert!(setup.continuous);
    assert_eq!(setup.sequence_length, 2);
}

#[test]
fn pwm_channel_layout() {
    let config = board::pwm_config().unwrap();
    assert_eq!(config.prescaler, PWM_PRESCALER);
    assert_eq!(config.channels.len(), 2);
    assert!(config.notification.is_none());

    let fan = config.channels[usize::from(FAN)];
    assert_eq!((fan.timer, fan.channel), (TimerId::Tim2, TimerChannel::Ch3));
    assert_eq!(fan.output_pin, Some(pins::FAN_OUTPUT));

    let led = config.channels[usize::from(LED)];
    assert_eq!((led.timer, led.channel), (TimerId::Tim2, TimerChannel::Ch4));
    assert_eq!(led.output_pin, Some(pins::LED_OUTPUT));

    for channel in &config.channels {
        assert_eq!(channel.class, ChannelClass::VariablePeriod);
        assert_eq!(channel.default_period, PWM_PERIOD_TICKS);
        assert_eq!(channel.default_duty, DutyCycle::ZERO);
        assert_eq!(channel.polarity, Level::High);
        assert_eq!(channel.idle_state, Level::Low);
    }
}

#[test]
fn profiles_point_at_board_resources() {
    let profiles = board::profiles();
    assert_eq!(profiles.group, SENSOR_GROUP);
    assert_eq!(profiles.temperature.slot, LM35_SLOT);
    assert_eq!(profiles.potentiometer.slot, POT_SLOT);
    assert_eq!(profiles.potentiometer.max, ADC_MAX_CODE);
    assert_eq!(profiles.fan.channel, FAN);
    assert_eq!(profiles.led.channel, LED);
    assert_eq!(profiles.led_pin, pins::LED_ENABLE);
    assert!(profiles.temperature.slot < ADC_GROUP0_BUFFER_SIZE);
}

#[test]
fn full_configuration_builds() {
    assert!(board::iohw_config().is_ok());
}
