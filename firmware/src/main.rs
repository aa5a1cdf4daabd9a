//! Fan and LED Controller Main Application
//!
//! Entry point for the STM32F103 controller firmware. Brings up clocks and
//! pins, binds the board configuration and runs the control loop: one fan
//! step, then one LED step, forever.

#![no_std]
#![no_main]

use core::cell::RefCell;
use core::sync::atomic::{AtomicU32, Ordering};

use cortex_m::peripheral::NVIC;
use embassy_executor::Spawner;
use embassy_futures::yield_now;
use embassy_stm32::gpio::{self, Output, Speed};
use embassy_stm32::interrupt;
use embassy_stm32::pac;
use embassy_stm32::pac::gpio::vals::{CnfIn, CnfOut, Mode};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use {defmt_rtt as _, panic_probe as _};

use fanctl_firmware::board::{self, Board};
use fanctl_firmware::hal::adc::AdcUnit;
use fanctl_firmware::hal::stm32::{Stm32Adc, Stm32Dma, Stm32Pins, Stm32Timers};
use fanctl_firmware::hal::timer::TimerId;
use fanctl_firmware::prelude::*;

/// Streaming result buffer of the sensor group
static SAMPLES: SampleBuffer<ADC_GROUP0_BUFFER_SIZE> = SampleBuffer::new();

/// Board shared between the control loop and the interrupt handlers
static BOARD: Mutex<CriticalSectionRawMutex, RefCell<Option<Board>>> =
    Mutex::new(RefCell::new(None));

/// Completed DMA rounds of the sensor group
static TRANSFER_ROUNDS: AtomicU32 = AtomicU32::new(0);

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Fan controller firmware v{}", env!("CARGO_PKG_VERSION"));

    // HSI 8 MHz, no PLL: timers and ADC run from the reset clock tree
    let p = embassy_stm32::init(embassy_stm32::Config::default());

    enable_clocks();
    configure_pins();

    // Indicator LED (PC13), held for the lifetime of the firmware
    let _led = Output::new(p.PC13, gpio::Level::High, Speed::Low);

    let mut board: Board = IoHwAb::new(
        Adc::new(Stm32Adc::new(), Stm32Dma::new()),
        Pwm::new(Stm32Timers::new()),
        Stm32Pins::new(),
        SAMPLES.slots(),
    );
    match board::iohw_config().and_then(|config| board.init(config)) {
        Ok(()) => info!(
            "ADC {} / PWM {} up",
            board.adc().version_info(),
            board.pwm().version_info()
        ),
        Err(e) => warn!("Board init failed: {}", e),
    }
    BOARD.lock(|cell| *cell.borrow_mut() = Some(board));

    // SAFETY: the handlers below only touch BOARD through its mutex
    unsafe {
        NVIC::unmask(pac::Interrupt::TIM2);
        NVIC::unmask(pac::Interrupt::ADC1_2);
    }

    if spawner.spawn(status_task()).is_err() {
        warn!("Status task not spawned");
    }

    info!("Entering control loop");
    loop {
        BOARD.lock(|cell| {
            let mut guard = cell.borrow_mut();
            let Some(board) = guard.as_mut() else {
                return;
            };
            // DMA1 channel 1 belongs to embassy's interrupt table; poll it.
            if board.adc_mut().on_transfer_complete(dma::ADC1).is_some() {
                TRANSFER_ROUNDS.fetch_add(1, Ordering::Relaxed);
            }
            if let Err(e) = board.control_fan_from_temperature() {
                trace!("Fan step skipped: {}", e);
            }
            if let Err(e) = board.control_led_brightness() {
                trace!("LED step skipped: {}", e);
            }
        });
        yield_now().await;
    }
}

/// Status task: logs the sensor readings once per interval
#[embassy_executor::task]
async fn status_task() {
    loop {
        Timer::after(Duration::from_millis(STATUS_LOG_INTERVAL_MS)).await;
        BOARD.lock(|cell| {
            let guard = cell.borrow();
            let Some(board) = guard.as_ref() else {
                return;
            };
            if let (Ok(temperature), Ok(pot)) =
                (board.temperature(), board.potentiometer_percent())
            {
                info!(
                    "{} pot {}% rounds {}",
                    temperature,
                    pot,
                    TRANSFER_ROUNDS.load(Ordering::Relaxed)
                );
            }
        });
    }
}

/// Clocks embassy leaves off: ADC1 and TIM2
fn enable_clocks() {
    pac::RCC.apb2enr().modify(|w| w.set_adc1en(true));
    pac::RCC.apb1enr().modify(|w| w.set_tim2en(true));
}

/// Analog inputs on PA0/PA1, TIM2 CH3/CH4 outputs on PA2/PA3
fn configure_pins() {
    let gpioa = pac::GPIOA;
    gpioa.cr(0).modify(|w| {
        for pin in [0, 1] {
            w.set_mode(pin, Mode::INPUT);
            w.set_cnf_in(pin, CnfIn::ANALOG);
        }
        for pin in [2, 3] {
            w.set_mode(pin, Mode::OUTPUT50MHZ);
            w.set_cnf_out(pin, CnfOut::ALTPUSHPULL);
        }
    });
}

/// TIM2 interrupt: compare and rollover events of both PWM channels
#[interrupt]
fn TIM2() {
    BOARD.lock(|cell| {
        if let Some(board) = cell.borrow_mut().as_mut() {
            board.pwm_mut().on_timer_event(TimerId::Tim2);
        }
    });
}

/// ADC1/ADC2 shared interrupt: end of conversion
#[interrupt]
fn ADC1_2() {
    BOARD.lock(|cell| {
        if let Some(board) = cell.borrow_mut().as_mut() {
            for unit in AdcUnit::ALL {
                if board.adc().hardware().end_of_conversion(unit) {
                    board.adc_mut().on_end_of_conversion(unit);
                }
            }
        }
    });
}
