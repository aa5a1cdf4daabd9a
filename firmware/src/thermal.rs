//! Unit Conversion
//!
//! Raw ADC codes to engineering units, and the control curves that turn
//! those units into actuator commands. All arithmetic is integer and
//! truncating, matching what the control loop applies.

use crate::config::{
    ADC_MAX_CODE, ADC_VREF_MV, FAN_HIGH_THRESHOLD_C, FAN_LOW_THRESHOLD_C, LED_ENABLE_CUTOFF,
    LM35_MV_PER_DEGREE,
};
use crate::hal::gpio::LedState;
use crate::hal::pwm::DutyCycle;

/// Analog front-end scaling of a linear sensor
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SensorScale {
    /// Reference voltage in millivolts
    pub full_scale_mv: u32,
    /// Code at full scale
    pub max_code: u16,
    /// Sensor output per degree, in millivolts
    pub mv_per_degree: u32,
}

impl SensorScale {
    /// LM35 on a 12-bit converter with a 3.3 V reference
    pub const LM35: Self = Self {
        full_scale_mv: ADC_VREF_MV,
        max_code: ADC_MAX_CODE,
        mv_per_degree: LM35_MV_PER_DEGREE,
    };

    /// Millivolts represented by a code
    #[must_use]
    pub fn millivolts(&self, code: u16) -> u32 {
        if self.max_code == 0 {
            return 0;
        }
        u32::from(code) * self.full_scale_mv / u32::from(self.max_code)
    }
}

/// Temperature in whole degrees Celsius
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Temperature {
    degrees: u16,
}

impl Temperature {
    /// Create from degrees Celsius
    #[must_use]
    pub const fn from_celsius(degrees: u16) -> Self {
        Self { degrees }
    }

    /// Convert a sensor code: `(code * full_scale_mV / max_code) / mV_per_degree`
    #[must_use]
    pub fn from_code(code: u16, scale: SensorScale) -> Self {
        let degrees = scale
            .millivolts(code)
            .checked_div(scale.mv_per_degree)
            .unwrap_or(0);
        Self {
            degrees: u16::try_from(degrees).unwrap_or(u16::MAX),
        }
    }

    /// Convert an LM35 code
    #[must_use]
    pub fn from_lm35_code(code: u16) -> Self {
        Self::from_code(code, SensorScale::LM35)
    }

    /// Degrees Celsius
    #[must_use]
    pub const fn celsius(self) -> u16 {
        self.degrees
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Temperature {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "{=u16} C", self.degrees);
    }
}

/// Linear fan ramp between two temperatures
///
/// 0% below `low`, 100% at or above `high`, linear in between.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FanCurve {
    /// Temperature where the ramp starts
    pub low: u16,
    /// Temperature where the fan reaches full speed
    pub high: u16,
}

impl FanCurve {
    /// 30 °C to 80 °C ramp of the reference board
    pub const DEFAULT: Self = Self {
        low: FAN_LOW_THRESHOLD_C,
        high: FAN_HIGH_THRESHOLD_C,
    };

    /// Create a ramp
    #[must_use]
    pub const fn new(low: u16, high: u16) -> Self {
        Self { low, high }
    }

    /// Fan speed in percent
    #[must_use]
    pub fn percent(&self, temperature: Temperature) -> u8 {
        let t = temperature.celsius();
        if t >= self.high {
            100
        } else if t < self.low {
            0
        } else {
            // low <= t < high, so the span is non-zero
            let span = u32::from(self.high - self.low);
            (u32::from(t - self.low) * 100 / span) as u8
        }
    }

    /// Fan duty cycle
    #[must_use]
    pub fn duty(&self, temperature: Temperature) -> DutyCycle {
        DutyCycle::from_percent(self.percent(temperature))
    }
}

impl Default for FanCurve {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Map a code onto 0-100% of `max_code`
#[must_use]
pub fn code_to_percent(code: u16, max_code: u16) -> u8 {
    if max_code == 0 {
        return 0;
    }
    let percent = u32::from(code.min(max_code)) * 100 / u32::from(max_code);
    percent as u8
}

/// On/off LED decision from the raw potentiometer code
///
/// The LED is switched off above the cutoff. This is a single comparison
/// on the raw code and is independent of the brightness duty.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LedCutoff(pub u16);

impl LedCutoff {
    /// Cutoff of the reference board
    pub const DEFAULT: Self = Self(LED_ENABLE_CUTOFF);

    /// LED state for a raw code
    #[must_use]
    pub const fn state(self, code: u16) -> LedState {
        if code > self.0 {
            LedState::Off
        } else {
            LedState::On
        }
    }
}

impl Default for LedCutoff {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lm35_conversion_truncates() {
        assert_eq!(Temperature::from_lm35_code(0).celsius(), 0);
        assert_eq!(Temperature::from_lm35_code(683).celsius(), 55);
        assert_eq!(Temperature::from_lm35_code(1055).celsius(), 85);
        assert_eq!(Temperature::from_lm35_code(4095).celsius(), 330);
    }

    #[test]
    fn fan_curve_edges() {
        let curve = FanCurve::DEFAULT;
        assert_eq!(curve.percent(Temperature::from_celsius(29)), 0);
        assert_eq!(curve.percent(Temperature::from_celsius(30)), 0);
        assert_eq!(curve.percent(Temperature::from_celsius(55)), 50);
        assert_eq!(curve.percent(Temperature::from_celsius(80)), 100);
        assert_eq!(curve.percent(Temperature::from_celsius(85)), 100);
    }

    #[test]
    fn degenerate_curve_is_a_step() {
        let step = FanCurve::new(40, 40);
        assert_eq!(step.percent(Temperature::from_celsius(39)), 0);
        assert_eq!(step.percent(Temperature::from_celsius(40)), 100);
    }

    #[test]
    fn percent_mapping() {
        assert_eq!(code_to_percent(2500, 4095), 61);
        assert_eq!(code_to_percent(4095, 4095), 100);
        assert_eq!(code_to_percent(5000, 4095), 100);
        assert_eq!(code_to_percent(10, 0), 0);
    }

    #[test]
    fn led_cutoff_is_strict() {
        let cutoff = LedCutoff::DEFAULT;
        assert_eq!(cutoff.state(2000), LedState::On);
        assert_eq!(cutoff.state(2001), LedState::Off);
    }
}
