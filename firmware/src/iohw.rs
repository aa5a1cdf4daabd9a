//! I/O Hardware Abstraction
//!
//! The control façade of the board: reads the streamed sensor codes,
//! converts them to engineering units and re-drives the PWM outputs.
//! One control cycle is [`IoHwAb::control_fan_from_temperature`] followed by
//! [`IoHwAb::control_led_brightness`].
//!
//! Sensor values are taken from the streaming result buffer one slot at a
//! time; the two sensors are not sampled as a consistent pair.

use core::sync::atomic::AtomicU16;

use crate::hal::adc::{Adc, AdcConfig, AdcHardware, GroupId};
use crate::hal::dma::{read_slot, DmaHardware};
use crate::hal::gpio::{DigitalIo, DioChannel, LedState};
use crate::hal::pwm::{DutyCycle, Pwm, PwmChannelId, PwmConfig};
use crate::hal::timer::TimerHardware;
use crate::thermal::{code_to_percent, FanCurve, LedCutoff, SensorScale, Temperature};
use crate::types::{HalError, HalResult};

/// Temperature sensor profile
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TemperatureSensor {
    /// Slot of the sensor in the group's result buffer
    pub slot: usize,
    /// Analog scaling
    pub scale: SensorScale,
    /// Fan ramp thresholds
    pub curve: FanCurve,
}

/// Potentiometer profile
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Potentiometer {
    /// Slot of the wiper in the group's result buffer
    pub slot: usize,
    /// Code at the low end of travel
    pub min: u16,
    /// Code at the high end of travel
    pub max: u16,
    /// Raw-code cutoff of the indicator LED
    pub led_cutoff: LedCutoff,
}

/// Actuator profile
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Actuator {
    /// Logical PWM channel driving the actuator
    pub channel: PwmChannelId,
}

/// Sensor and actuator profiles of the board
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Profiles {
    /// Acquisition group streaming both sensors
    pub group: GroupId,
    /// Temperature sensor
    pub temperature: TemperatureSensor,
    /// Cooling fan
    pub fan: Actuator,
    /// Brightness potentiometer
    pub potentiometer: Potentiometer,
    /// Dimmable LED
    pub led: Actuator,
    /// Indicator LED pin
    pub led_pin: DioChannel,
}

/// Everything [`IoHwAb::init`] binds
#[derive(Clone, Debug)]
pub struct IoHwAbConfig {
    /// Acquisition configuration
    pub adc: AdcConfig,
    /// Actuation configuration
    pub pwm: PwmConfig,
    /// Sensor and actuator profiles
    pub profiles: Profiles,
}

/// Result of one LED control step
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LedControl {
    /// Indicator LED state written
    pub enable: LedState,
    /// Brightness applied to the dimmable LED (percent)
    pub brightness: u8,
}

/// Control façade over the acquisition and actuation engines
pub struct IoHwAb<'a, A, D, T, P> {
    adc: Adc<'a, A, D>,
    pwm: Pwm<T>,
    pins: P,
    buffer: &'a [AtomicU16],
    profiles: Option<Profiles>,
}

impl<'a, A, D, T, P> IoHwAb<'a, A, D, T, P>
where
    A: AdcHardware,
    D: DmaHardware<'a>,
    T: TimerHardware,
    P: DigitalIo,
{
    /// Façade over uninitialized engines, streaming into `buffer`
    pub fn new(adc: Adc<'a, A, D>, pwm: Pwm<T>, pins: P, buffer: &'a [AtomicU16]) -> Self {
        Self {
            adc,
            pwm,
            pins,
            buffer,
            profiles: None,
        }
    }

    /// Bring up both engines, then register the result buffer and start
    /// the sensor group
    ///
    /// # Errors
    ///
    /// `PreconditionUnmet` when already initialized, otherwise the first
    /// engine failure. On failure both engines are left uninitialized.
    pub fn init(&mut self, config: IoHwAbConfig) -> HalResult<()> {
        if self.profiles.is_some() {
            return Err(HalError::PreconditionUnmet);
        }
        let group = config.profiles.group;
        self.adc.init(config.adc)?;
        if let Err(e) = self.start(config.pwm, group) {
            warn!("iohw: init failed, rolling back");
            let _ = self.adc.deinit();
            if self.pwm.is_initialized() {
                let _ = self.pwm.deinit();
            }
            return Err(e);
        }
        self.profiles = Some(config.profiles);
        debug!("iohw: up, streaming group {}", group);
        Ok(())
    }

    fn start(&mut self, pwm: PwmConfig, group: GroupId) -> HalResult<()> {
        self.pwm.init(pwm)?;
        self.adc.register_result_buffer(group, self.buffer)?;
        self.adc.start_group_conversion(group)
    }

    fn profiles(&self) -> HalResult<&Profiles> {
        self.profiles.as_ref().ok_or(HalError::NotInitialized)
    }

    fn sample(&self, slot: usize) -> HalResult<u16> {
        read_slot(self.buffer, slot).ok_or(HalError::InvalidId)
    }

    /// Drive the indicator LED
    ///
    /// # Errors
    ///
    /// `NotInitialized`.
    pub fn set_led_state(&mut self, state: LedState) -> HalResult<()> {
        let pin = self.profiles()?.led_pin;
        self.pins.write(pin, state.level());
        Ok(())
    }

    /// Current temperature from the streamed sensor code
    ///
    /// # Errors
    ///
    /// `NotInitialized`, or `InvalidId` when the sensor slot is outside the
    /// result buffer.
    pub fn temperature(&self) -> HalResult<Temperature> {
        let sensor = self.profiles()?.temperature;
        let code = self.sample(sensor.slot)?;
        Ok(Temperature::from_code(code, sensor.scale))
    }

    /// Set the fan speed in percent
    ///
    /// # Errors
    ///
    /// `NotInitialized`, `PreconditionUnmet` above 100%, or the actuation
    /// engine's failure.
    pub fn set_fan_speed(&mut self, percent: u8) -> HalResult<()> {
        let fan = self.profiles()?.fan;
        if percent > 100 {
            return Err(HalError::PreconditionUnmet);
        }
        self.pwm
            .set_duty_cycle(fan.channel, DutyCycle::from_percent(percent))
    }

    /// One fan control step; returns the speed applied
    ///
    /// # Errors
    ///
    /// As [`Self::temperature`] and [`Self::set_fan_speed`].
    pub fn control_fan_from_temperature(&mut self) -> HalResult<u8> {
        let curve = self.profiles()?.temperature.curve;
        let percent = curve.percent(self.temperature()?);
        self.set_fan_speed(percent)?;
        Ok(percent)
    }

    /// Potentiometer position in percent of travel
    ///
    /// # Errors
    ///
    /// `NotInitialized` or `InvalidId` (slot outside the buffer).
    pub fn potentiometer_percent(&self) -> HalResult<u8> {
        let pot = self.profiles()?.potentiometer;
        let code = self.sample(pot.slot)?;
        Ok(code_to_percent(code.saturating_sub(pot.min), pot.max.saturating_sub(pot.min)))
    }

    /// One LED control step
    ///
    /// Writes the indicator LED from the raw-code cutoff and the dimmable
    /// LED from the potentiometer percentage. The two decisions are taken
    /// independently and may disagree.
    ///
    /// # Errors
    ///
    /// As [`Self::potentiometer_percent`], or the actuation engine's
    /// failure.
    pub fn control_led_brightness(&mut self) -> HalResult<LedControl> {
        let profiles = *self.profiles()?;
        let code = self.sample(profiles.potentiometer.slot)?;
        let enable = profiles.potentiometer.led_cutoff.state(code);
        self.set_led_state(enable)?;

        let brightness = self.potentiometer_percent()?;
        self.pwm
            .set_duty_cycle(profiles.led.channel, DutyCycle::from_percent(brightness))?;
        Ok(LedControl { enable, brightness })
    }

    /// Check for bound profiles
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.profiles.is_some()
    }

    /// Acquisition engine
    pub const fn adc(&self) -> &Adc<'a, A, D> {
        &self.adc
    }

    /// Acquisition engine, mutably (interrupt forwarding)
    pub fn adc_mut(&mut self) -> &mut Adc<'a, A, D> {
        &mut self.adc
    }

    /// Actuation engine
    pub const fn pwm(&self) -> &Pwm<T> {
        &self.pwm
    }

    /// Actuation engine, mutably (interrupt forwarding)
    pub fn pwm_mut(&mut self) -> &mut Pwm<T> {
        &mut self.pwm
    }

    /// Pin access
    pub const fn pins(&self) -> &P {
        &self.pins
    }

    /// Pin access, mutably
    pub fn pins_mut(&mut self) -> &mut P {
        &mut self.pins
    }
}
