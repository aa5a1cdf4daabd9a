//! STM32F103 Register Files
//!
//! Implements the register-file traits on the ADC v1, BDMA, general-purpose
//! timer and GPIO v1 blocks through the `embassy_stm32` PAC. Construct each
//! backend once, after the application owns the peripherals; clocks and
//! pin modes are set up by the caller.

use core::sync::atomic::AtomicU16;

use embassy_stm32::pac;
use embassy_stm32::pac::adc::vals::SampleTime as PacSampleTime;
use embassy_stm32::pac::bdma::vals as dma_vals;
use embassy_stm32::pac::timer::vals::Ocm;

use crate::hal::adc::{AdcHardware, AdcUnit, Alignment, SampleTime, UnitSetup};
use crate::hal::dma::{
    DmaChannel, DmaHardware, Direction, ElementSize, Priority, Transfer, TransferMode,
};
use crate::hal::gpio::{DigitalIo, DioChannel, GpioPort};
use crate::hal::timer::{
    OutputCompare, OutputMode, TimeBase, TimerChannel, TimerFlags, TimerHardware, TimerId,
};
use crate::types::Level;

/// EXTSEL value selecting the SWSTART bit as external trigger
const EXTSEL_SWSTART: u8 = 0b111;

const fn adc_block(unit: AdcUnit) -> pac::adc::Adc {
    match unit {
        AdcUnit::Adc1 => pac::ADC1,
        AdcUnit::Adc2 => pac::ADC2,
    }
}

/// ADC1 and ADC2
pub struct Stm32Adc {
    _private: (),
}

impl Stm32Adc {
    /// Take over both ADC units
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }
}

impl AdcHardware for Stm32Adc {
    fn reset(&mut self, unit: AdcUnit) {
        let adc = adc_block(unit);
        adc.cr1().write(|_| {});
        adc.cr2().write(|_| {});
        adc.sqr1().write(|_| {});
        adc.sqr2().write(|_| {});
        adc.sqr3().write(|_| {});
        adc.smpr1().write(|_| {});
        adc.smpr2().write(|_| {});
        adc.sr().write(|_| {});
    }

    fn configure(&mut self, unit: AdcUnit, setup: UnitSetup) {
        let adc = adc_block(unit);
        adc.cr1().modify(|w| w.set_scan(setup.scan));
        adc.cr2().modify(|w| {
            w.set_cont(setup.continuous);
            w.set_align(setup.alignment == Alignment::Left);
            w.set_extsel(EXTSEL_SWSTART);
            w.set_exttrig(false);
        });
        adc.sqr1()
            .modify(|w| w.set_l(setup.sequence_length.saturating_sub(1)));
    }

    fn set_powered(&mut self, unit: AdcUnit, on: bool) {
        adc_block(unit).cr2().modify(|w| w.set_adon(on));
    }

    fn calibrate(&mut self, unit: AdcUnit) {
        let adc = adc_block(unit);
        adc.cr2().modify(|w| w.set_rstcal(true));
        while adc.cr2().read().rstcal() {}
        adc.cr2().modify(|w| w.set_cal(true));
        while adc.cr2().read().cal() {}
    }

    fn configure_channel(&mut self, unit: AdcUnit, channel: u8, rank: u8, sample_time: SampleTime) {
        let adc = adc_block(unit);
        let smp = PacSampleTime::from_bits(sample_time.bits());
        if channel < 10 {
            adc.smpr2().modify(|w| w.set_smp(usize::from(channel), smp));
        } else {
            adc.smpr1().modify(|w| w.set_smp(usize::from(channel - 10), smp));
        }

        let Some(slot) = usize::from(rank).checked_sub(1) else {
            return;
        };
        match slot {
            0..=5 => adc.sqr3().modify(|w| w.set_sq(slot, channel)),
            6..=11 => adc.sqr2().modify(|w| w.set_sq(slot - 6, channel)),
            12..=15 => adc.sqr1().modify(|w| w.set_sq(slot - 12, channel)),
            _ => {}
        }
    }

    fn start_conversion(&mut self, unit: AdcUnit) {
        let adc = adc_block(unit);
        adc.cr2().modify(|w| {
            w.set_exttrig(true);
            w.set_swstart(true);
        });
    }

    fn end_of_conversion(&self, unit: AdcUnit) -> bool {
        adc_block(unit).sr().read().eoc()
    }

    fn read_data(&mut self, unit: AdcUnit) -> u16 {
        adc_block(unit).dr().read().data()
    }

    fn clear_end_of_conversion(&mut self, unit: AdcUnit) {
        adc_block(unit).sr().modify(|w| w.set_eoc(false));
    }

    fn set_end_of_conversion_interrupt(&mut self, unit: AdcUnit, enabled: bool) {
        adc_block(unit).cr1().modify(|w| w.set_eocie(enabled));
    }

    fn set_external_trigger(&mut self, unit: AdcUnit, enabled: bool) {
        adc_block(unit).cr2().modify(|w| w.set_exttrig(enabled));
    }

    fn set_dma_request(&mut self, unit: AdcUnit, enabled: bool) {
        adc_block(unit).cr2().modify(|w| w.set_dma(enabled));
    }

    fn data_register_address(&self, unit: AdcUnit) -> u32 {
        adc_block(unit).dr().as_ptr() as u32
    }
}

/// DMA1 channels 1..=7
pub struct Stm32Dma {
    _private: (),
}

impl Stm32Dma {
    /// Take over DMA1
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }
}

const fn dma_size(element: ElementSize) -> dma_vals::Size {
    match element {
        ElementSize::Byte => dma_vals::Size::BITS8,
        ElementSize::HalfWord => dma_vals::Size::BITS16,
        ElementSize::Word => dma_vals::Size::BITS32,
    }
}

const fn dma_priority(priority: Priority) -> dma_vals::Pl {
    match priority {
        Priority::Low => dma_vals::Pl::LOW,
        Priority::Medium => dma_vals::Pl::MEDIUM,
        Priority::High => dma_vals::Pl::HIGH,
        Priority::VeryHigh => dma_vals::Pl::VERYHIGH,
    }
}

impl<'a> DmaHardware<'a> for Stm32Dma {
    fn configure(&mut self, channel: DmaChannel, transfer: Transfer<'a>) {
        let ch = pac::DMA1.ch(channel.index());
        let target: *const AtomicU16 = transfer.target.as_ptr();
        ch.par().write_value(transfer.peripheral_address);
        ch.mar().write_value(target as u32);
        ch.ndtr()
            .write(|w| w.set_ndt(u16::try_from(transfer.len()).unwrap_or(u16::MAX)));
        ch.cr().write(|w| {
            w.set_dir(match transfer.direction {
                Direction::PeripheralToMemory => dma_vals::Dir::FROM_PERIPHERAL,
                Direction::MemoryToPeripheral => dma_vals::Dir::FROM_MEMORY,
            });
            w.set_circ(transfer.mode == TransferMode::Circular);
            w.set_pinc(transfer.peripheral_increment);
            w.set_minc(transfer.memory_increment);
            w.set_psize(dma_size(transfer.element));
            w.set_msize(dma_size(transfer.element));
            w.set_pl(dma_priority(transfer.priority));
        });
    }

    fn set_enabled(&mut self, channel: DmaChannel, enabled: bool) {
        pac::DMA1
            .ch(channel.index())
            .cr()
            .modify(|w| w.set_en(enabled));
    }

    fn set_complete_interrupt(&mut self, channel: DmaChannel, enabled: bool) {
        pac::DMA1
            .ch(channel.index())
            .cr()
            .modify(|w| w.set_tcie(enabled));
    }

    fn transfer_complete(&self, channel: DmaChannel) -> bool {
        pac::DMA1.isr().read().tcif(channel.index())
    }

    fn clear_transfer_complete(&mut self, channel: DmaChannel) {
        pac::DMA1
            .ifcr()
            .write(|w| w.set_tcif(channel.index(), true));
    }
}

const fn timer_block(timer: TimerId) -> pac::timer::TimGp16 {
    match timer {
        TimerId::Tim2 => pac::TIM2,
        TimerId::Tim3 => pac::TIM3,
        TimerId::Tim4 => pac::TIM4,
    }
}

/// TIM2, TIM3 and TIM4
pub struct Stm32Timers {
    _private: (),
}

impl Stm32Timers {
    /// Take over the general-purpose timers
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }
}

impl TimerHardware for Stm32Timers {
    fn init_time_base(&mut self, timer: TimerId, base: TimeBase) {
        let tim = timer_block(timer);
        tim.psc().write_value(base.prescaler);
        tim.arr().write(|w| w.set_arr(base.period));
        // Load the prescaler now, then drop the update flag this raises.
        tim.egr().write(|w| w.set_ug(true));
        tim.sr().modify(|w| w.set_uif(false));
    }

    fn period(&self, timer: TimerId) -> u16 {
        timer_block(timer).arr().read().arr()
    }

    fn set_period(&mut self, timer: TimerId, period: u16) {
        timer_block(timer).arr().write(|w| w.set_arr(period));
    }

    fn compare(&self, timer: TimerId, channel: TimerChannel) -> u16 {
        timer_block(timer).ccr(channel.index()).read().ccr()
    }

    fn set_compare(&mut self, timer: TimerId, channel: TimerChannel, value: u16) {
        timer_block(timer)
            .ccr(channel.index())
            .write(|w| w.set_ccr(value));
    }

    fn configure_output(&mut self, timer: TimerId, channel: TimerChannel, output: OutputCompare) {
        let tim = timer_block(timer);
        let n = channel.index();
        tim.ccmr_output(n / 2).modify(|w| {
            w.set_ocm(
                n % 2,
                match output.mode {
                    OutputMode::Frozen => Ocm::FROZEN,
                    OutputMode::Pwm1 => Ocm::PWM_MODE1,
                },
            );
            w.set_ocpe(n % 2, output.preload);
        });
        tim.ccr(n).write(|w| w.set_ccr(output.pulse));
        tim.ccer().modify(|w| {
            w.set_cce(n, output.enabled);
            w.set_ccp(n, output.polarity == Level::Low);
        });
    }

    fn set_counter_enabled(&mut self, timer: TimerId, enabled: bool) {
        let tim = timer_block(timer);
        tim.cr1().modify(|w| {
            w.set_arpe(true);
            w.set_cen(enabled);
        });
    }

    fn set_interrupts(&mut self, timer: TimerId, sources: TimerFlags, enabled: bool) {
        let mask = u32::from(sources.bits());
        timer_block(timer).dier().modify(|w| {
            if enabled {
                w.0 |= mask;
            } else {
                w.0 &= !mask;
            }
        });
    }

    fn pending(&self, timer: TimerId) -> TimerFlags {
        let status = timer_block(timer).sr().read().0;
        TimerFlags::from_bits((status & 0x1F) as u8)
    }

    fn clear_pending(&mut self, timer: TimerId, flags: TimerFlags) {
        // Status bits are rc_w0: writing 1 leaves a flag untouched.
        let mask = u32::from(flags.bits());
        timer_block(timer).sr().modify(|w| w.0 = !mask);
    }
}

const fn gpio_block(port: GpioPort) -> pac::gpio::Gpio {
    match port {
        GpioPort::A => pac::GPIOA,
        GpioPort::B => pac::GPIOB,
        GpioPort::C => pac::GPIOC,
        GpioPort::D => pac::GPIOD,
    }
}

/// Ports A..D
pub struct Stm32Pins {
    _private: (),
}

impl Stm32Pins {
    /// Access already configured pins
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }
}

impl DigitalIo for Stm32Pins {
    fn read(&self, channel: DioChannel) -> Level {
        let idr = gpio_block(channel.port()).idr().read().0;
        Level::from_bool(idr & (1 << channel.pin()) != 0)
    }

    fn write(&mut self, channel: DioChannel, level: Level) {
        let pin = usize::from(channel.pin());
        gpio_block(channel.port()).bsrr().write(|w| {
            if level.is_high() {
                w.set_bs(pin, true);
            } else {
                w.set_br(pin, true);
            }
        });
    }
}
