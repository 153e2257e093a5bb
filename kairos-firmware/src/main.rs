//! Kairos demo firmware
//!
//! Brings the clock tree up, starts the tick timer and blinks the LED named
//! in board.toml. Log lines carry the tick timestamp in microseconds.
//!
//! The chip is chosen with exactly one Cargo feature:
//!
//! - `stm32g07x` (default) - `thumbv6m-none-eabi`
//! - `stm32f103` - `thumbv7m-none-eabi`

#![no_std]
#![no_main]

#[cfg(all(feature = "stm32g07x", feature = "stm32f103"))]
compile_error!("features `stm32g07x` and `stm32f103` are mutually exclusive");

#[cfg(not(any(feature = "stm32g07x", feature = "stm32f103")))]
compile_error!("select a chip with `--features stm32g07x` or `--features stm32f103`");

#[cfg(feature = "stm32f103")]
use kairos_hal_stm32f1 as chip;
#[cfg(all(feature = "stm32g07x", not(feature = "stm32f103")))]
use kairos_hal_stm32g0 as chip;

use core::convert::Infallible;

use cortex_m_rt::entry;
use defmt::*;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use kairos_hal::{PinConfig, PinDriver, TimeUnit};
use {defmt_rtt as _, panic_probe as _};

/// Board constants generated from board.toml
mod board {
    include!(concat!(env!("OUT_DIR"), "/board.rs"));
}

const _: () = core::assert!(
    chip::has_port(board::LED.port()),
    "board.toml LED is on a GPIO port this chip does not have"
);

timestamp!("{=u64:us}", chip::ticks());

/// Drive a pin high for `on_ms`, then low
///
/// Written against `embedded-hal` only, the way a peripheral driver would use
/// the HAL. GPIO writes cannot fail on these chips.
fn pulse<P, D>(pin: &mut P, delay: &mut D, on_ms: u32)
where
    P: OutputPin<Error = Infallible>,
    D: DelayNs,
{
    pin.set_high().unwrap_or_else(|never| match never {});
    delay.delay_ms(on_ms);
    pin.set_low().unwrap_or_else(|never| match never {});
}

#[entry]
fn main() -> ! {
    chip::device_init();

    let clock = chip::runtime::CLOCK;
    info!(
        "Kairos up: SYSCLK {=u32} Hz, tick timer {=u32} Hz",
        clock.sysclk_hz(),
        clock.timer_clock_hz()
    );

    let gpio = chip::gpio();
    let mut led = gpio.pin(board::LED);
    led.configure(PinConfig::OUTPUT);
    info!("LED on {}", board::LED);

    let mut delay = chip::delay();
    let mut toggles: u32 = 0;

    loop {
        pulse(&mut led, &mut delay, board::BLINK_MS);
        chip::sleep_ticks(TimeUnit::from(board::BLINK_MS) * 1_000);

        toggles = toggles.wrapping_add(1);
        if board::HEARTBEAT != 0 && toggles % board::HEARTBEAT == 0 {
            info!(
                "heartbeat: {=u32} blinks, wakeup pending {=bool}",
                toggles,
                chip::wakeup_pending()
            );
            chip::take_wakeup();
        }
    }
}
