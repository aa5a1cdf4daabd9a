//! Types Module Tests
//!
//! Tests for shared types (HalError, Level, LedState, VersionInfo, thermal units)
//! Run with: cargo test --test types_tests

use fanctl_firmware::hal::gpio::{DioChannel, GpioPort, LedState};
use fanctl_firmware::thermal::{code_to_percent, FanCurve, LedCutoff, SensorScale, Temperature};
use fanctl_firmware::types::{HalError, Level, VersionInfo};

// =============================================================================
// HalError Tests
// =============================================================================

#[test]
fn test_error_display() {
    assert_eq!(HalError::InvalidId.to_string(), "invalid id");
    assert_eq!(HalError::NotInitialized.to_string(), "not initialized");
    assert_eq!(HalError::PreconditionUnmet.to_string(), "precondition unmet");
}

// =============================================================================
// Level and LedState Tests
// =============================================================================

#[test]
fn test_level_helpers() {
    assert_eq!(Level::default(), Level::Low);
    assert_eq!(Level::from_bool(true), Level::High);
    assert!(Level::High.is_high());
}

#[test]
fn test_led_state_levels() {
    assert_eq!(LedState::default(), LedState::Off);
    assert_eq!(LedState::On.level(), Level::High);
    assert_eq!(LedState::Off.level(), Level::Low);
}

// =============================================================================
// Digital Channel Tests
// =============================================================================

#[test]
fn test_dio_channel_layout() {
    let pc13 = DioChannel::new(GpioPort::C, 13);
    assert_eq!(pc13.index(), 2 * 16 + 13);
    assert_eq!(pc13.port(), GpioPort::C);
    assert_eq!(pc13.pin(), 13);
}

// =============================================================================
// VersionInfo Tests
// =============================================================================

#[test]
fn test_version_display() {
    let version = VersionInfo {
        vendor_id: 0x1234,
        module_id: 0xABCD,
        major: 1,
        minor: 0,
        patch: 0,
    };
    assert_eq!(version.to_string(), "1234:ABCD v1.0.0");
}

// =============================================================================
// Thermal Unit Tests
// =============================================================================

#[test]
fn test_lm35_millivolts() {
    assert_eq!(SensorScale::LM35.millivolts(4095), 3300);
    assert_eq!(SensorScale::LM35.millivolts(0), 0);
}

#[test]
fn test_temperature_from_code_truncates() {
    assert_eq!(Temperature::from_lm35_code(1055).celsius(), 85);
    assert_eq!(Temperature::from_lm35_code(683).celsius(), 55);
    assert_eq!(Temperature::from_lm35_code(12).celsius(), 0);
}

#[test]
fn test_degenerate_scale_reads_zero() {
    let scale = SensorScale {
        full_scale_mv: 3300,
        max_code: 0,
        mv_per_degree: 0,
    };
    assert_eq!(Temperature::from_code(1000, scale).celsius(), 0);
}

#[test]
fn test_fan_curve_ramp() {
    let curve = FanCurve::DEFAULT;
    assert_eq!(curve.percent(Temperature::from_celsius(29)), 0);
    assert_eq!(curve.percent(Temperature::from_celsius(30)), 0);
    assert_eq!(curve.percent(Temperature::from_celsius(55)), 50);
    assert_eq!(curve.percent(Temperature::from_celsius(79)), 98);
    assert_eq!(curve.percent(Temperature::from_celsius(80)), 100);
}

#[test]
fn test_code_to_percent() {
    assert_eq!(code_to_percent(2500, 4095), 61);
    assert_eq!(code_to_percent(5000, 4095), 100);
    assert_eq!(code_to_percent(10, 0), 0);
}

#[test]
fn test_led_cutoff() {
    assert_eq!(LedCutoff::DEFAULT.state(2000), LedState::On);
    assert_eq!(LedCutoff::DEFAULT.state(2001), LedState::Off);
    assert_eq!(LedCutoff(100).state(0), LedState::On);
}
