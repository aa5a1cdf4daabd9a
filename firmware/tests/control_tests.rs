//! Control Loop Tests
//!
//! End-to-end tests of the fan and LED control steps on the reference
//! board configuration, with sensor rounds delivered through the
//! simulated DMA channel.
//! Run with: cargo test --test control_tests

use fanctl_firmware::board::{self, sim_board, SimBoard, FAN, LED, SENSOR_GROUP};
use fanctl_firmware::config::{dma, pins, timers, ADC_GROUP0_BUFFER_SIZE};
use fanctl_firmware::hal::adc::{AdcUnit, GroupStatus};
use fanctl_firmware::hal::dma::SampleBuffer;
use fanctl_firmware::hal::gpio::{DigitalIo, LedState};
use fanctl_firmware::hal::pwm::DutyCycle;
use fanctl_firmware::iohw::LedControl;
use fanctl_firmware::types::{HalError, Level};

type Samples = SampleBuffer<ADC_GROUP0_BUFFER_SIZE>;

fn powered(samples: &Samples) -> SimBoard<'_> {
    let mut board = sim_board(samples.slots());
    board.init(board::iohw_config().unwrap()).unwrap();
    board
}

/// Deliver one streamed round: potentiometer, then LM35
fn deliver(board: &mut SimBoard<'_>, pot: u16, lm35: u16) {
    assert!(board
        .adc_mut()
        .dma_mut()
        .complete_transfer(dma::ADC1, &[pot, lm35]));
    assert!(board.adc_mut().on_transfer_complete(dma::ADC1).is_some());
}

fn fan_compare(board: &SimBoard<'_>) -> u16 {
    board
        .pwm()
        .hardware()
        .compare_of(timers::PWM, timers::FAN_CHANNEL)
}

fn led_compare(board: &SimBoard<'_>) -> u16 {
    board
        .pwm()
        .hardware()
        .compare_of(timers::PWM, timers::LED_CHANNEL)
}

// =============================================================================
// Bring-up Tests
// =============================================================================

#[test]
fn init_starts_streaming_group() {
    let samples = Samples::new();
    let board = powered(&samples);

    assert!(board.is_initialized());
    assert_eq!(board.adc().get_group_status(SENSOR_GROUP), GroupStatus::Busy);
    let channel = board.adc().dma().channel(dma::ADC1);
    assert!(channel.enabled);
    assert_eq!(channel.transfer.map(|t| t.len()), Some(2));
    assert!(board.adc().hardware().unit(AdcUnit::Adc1).dma_request);
}

#[test]
fn init_leaves_outputs_at_zero() {
    let samples = Samples::new();
    let board = powered(&samples);

    assert_eq!(fan_compare(&board), 0);
    assert_eq!(led_compare(&board), 0);
    assert_eq!(board.pwm().hardware().timer(timers::PWM).period, 999);
    assert!(board.pwm().hardware().timer(timers::PWM).running);
}

#[test]
fn second_init_is_rejected() {
    let samples = Samples::new();
    let mut board = powered(&samples);
    assert_eq!(
        board.init(board::iohw_config().unwrap()),
        Err(HalError::PreconditionUnmet)
    );
}

#[test]
fn failed_init_leaves_engines_down_and_can_be_retried() {
    let samples = Samples::new();
    let mut board = sim_board(samples.slots());
    let mut config = board::iohw_config().unwrap();
    config.profiles.group = 5;

    assert_eq!(board.init(config), Err(HalError::InvalidId));
    assert!(!board.is_initialized());
    assert!(!board.adc().is_initialized());
    assert!(!board.pwm().is_initialized());

    assert_eq!(board.init(board::iohw_config().unwrap()), Ok(()));
    assert_eq!(board.adc().get_group_status(SENSOR_GROUP), GroupStatus::Busy);
}

#[test]
fn steps_before_init_report_not_initialized() {
    let samples = Samples::new();
    let mut board = sim_board(samples.slots());

    assert_eq!(board.temperature(), Err(HalError::NotInitialized));
    assert_eq!(board.control_fan_from_temperature(), Err(HalError::NotInitialized));
    assert_eq!(board.control_led_brightness(), Err(HalError::NotInitialized));
    assert_eq!(board.set_fan_speed(50), Err(HalError::NotInitialized));
    assert_eq!(board.set_led_state(LedState::On), Err(HalError::NotInitialized));
}

// =============================================================================
// Fan Control Tests
// =============================================================================

#[test]
fn hot_sensor_runs_fan_at_full_speed() {
    let samples = Samples::new();
    let mut board = powered(&samples);
    // 1055 * 3300 / 4095 / 10 = 85 °C
    deliver(&mut board, 0, 1055);

    assert_eq!(board.temperature().map(|t| t.celsius()), Ok(85));
    assert_eq!(board.control_fan_from_temperature(), Ok(100));
    assert_eq!(fan_compare(&board), 999);
}

#[test]
fn mid_ramp_sensor_runs_fan_at_half_speed() {
    let samples = Samples::new();
    let mut board = powered(&samples);
    // 683 * 3300 / 4095 / 10 = 55 °C
    deliver(&mut board, 0, 683);

    assert_eq!(board.control_fan_from_temperature(), Ok(50));
    assert_eq!(fan_compare(&board), DutyCycle::HALF.compare_for(999));
    assert_eq!(fan_compare(&board), 499);
}

#[test]
fn cold_sensor_stops_fan() {
    let samples = Samples::new();
    let mut board = powered(&samples);
    // 248 -> 19 °C
    deliver(&mut board, 0, 248);
    board.set_fan_speed(100).unwrap();

    assert_eq!(board.control_fan_from_temperature(), Ok(0));
    assert_eq!(fan_compare(&board), 0);
}

#[test]
fn fan_follows_new_rounds() {
    let samples = Samples::new();
    let mut board = powered(&samples);

    deliver(&mut board, 0, 1055);
    assert_eq!(board.control_fan_from_temperature(), Ok(100));
    deliver(&mut board, 0, 683);
    assert_eq!(board.control_fan_from_temperature(), Ok(50));
}

#[test]
fn fan_speed_above_full_is_rejected() {
    let samples = Samples::new();
    let mut board = powered(&samples);
    board.set_fan_speed(40).unwrap();
    let before = fan_compare(&board);

    assert_eq!(board.set_fan_speed(101), Err(HalError::PreconditionUnmet));
    assert_eq!(fan_compare(&board), before);
}

#[test]
fn fan_step_leaves_led_channel_alone() {
    let samples = Samples::new();
    let mut board = powered(&samples);
    deliver(&mut board, 0, 1055);
    board.control_fan_from_temperature().unwrap();
    assert_eq!(led_compare(&board), 0);
}

// =============================================================================
// LED Control Tests
// =============================================================================

#[test]
fn high_pot_switches_indicator_off_but_keeps_brightness() {
    let samples = Samples::new();
    let mut board = powered(&samples);
    deliver(&mut board, 2500, 0);

    assert_eq!(
        board.control_led_brightness(),
        Ok(LedControl {
            enable: LedState::Off,
            brightness: 61,
        })
    );
    assert_eq!(board.pins().read(pins::LED_ENABLE), Level::Low);
    assert_eq!(led_compare(&board), DutyCycle::from_percent(61).compare_for(999));
}

#[test]
fn low_pot_switches_indicator_on() {
    let samples = Samples::new();
    let mut board = powered(&samples);
    deliver(&mut board, 1000, 0);

    let step = board.control_led_brightness().unwrap();
    assert_eq!(step.enable, LedState::On);
    assert_eq!(step.brightness, 24);
    assert_eq!(board.pins().read(pins::LED_ENABLE), Level::High);
}

#[test]
fn cutoff_is_exclusive() {
    let samples = Samples::new();
    let mut board = powered(&samples);

    deliver(&mut board, 2000, 0);
    assert_eq!(board.control_led_brightness().map(|s| s.enable), Ok(LedState::On));
    deliver(&mut board, 2001, 0);
    assert_eq!(board.control_led_brightness().map(|s| s.enable), Ok(LedState::Off));
}

#[test]
fn full_travel_gives_full_brightness() {
    let samples = Samples::new();
    let mut board = powered(&samples);
    deliver(&mut board, 4095, 0);

    assert_eq!(board.potentiometer_percent(), Ok(100));
    board.control_led_brightness().unwrap();
    assert_eq!(led_compare(&board), 999);
}

#[test]
fn manual_led_state_drives_enable_pin() {
    let samples = Samples::new();
    let mut board = powered(&samples);

    board.set_led_state(LedState::On).unwrap();
    assert_eq!(board.pins().read(pins::LED_ENABLE), Level::High);
    board.set_led_state(LedState::Off).unwrap();
    assert_eq!(board.pins().read(pins::LED_ENABLE), Level::Low);
}

// =============================================================================
// Control Cycle Tests
// =============================================================================

#[test]
fn one_cycle_drives_both_outputs() {
    let samples = Samples::new();
    let mut board = powered(&samples);

    // Same round as the hardware would stream it: rank 1 pot, rank 2 LM35
    let hw = board.adc_mut().hardware_mut();
    hw.set_input(AdcUnit::Adc1, 0, 2500);
    hw.set_input(AdcUnit::Adc1, 1, 683);
    let round = board.adc().hardware().round(AdcUnit::Adc1);
    assert_eq!(round, vec![2500, 683]);
    deliver(&mut board, round[0], round[1]);

    assert_eq!(board.control_fan_from_temperature(), Ok(50));
    assert_eq!(board.control_led_brightness().map(|s| s.brightness), Ok(61));
    assert_eq!(fan_compare(&board), 499);
    assert_eq!(led_compare(&board), 609);
    assert_eq!(board.pwm().get_output_state(FAN, board.pins()), Level::Low);
    assert!(board.pwm().channel_count() > usize::from(LED));
}

#[test]
fn samples_are_read_from_shared_buffer() {
    let samples = Samples::new();
    let mut board = powered(&samples);
    deliver(&mut board, 1234, 683);

    assert_eq!(samples.get(board::POT_SLOT), Some(1234));
    assert_eq!(samples.get(board::LM35_SLOT), Some(683));
    // Slots past the group length are never written
    assert_eq!(samples.get(2), Some(0));
}
