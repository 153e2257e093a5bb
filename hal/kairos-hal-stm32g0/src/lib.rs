//! STM32G07x variant of the Kairos HAL
//!
//! Supplies the register tables, pin table and bit encodings for the
//! STM32G07x family and implements the `kairos-hal` contracts over them:
//!
//! - [`gpio::Gpio`] - MODER/OTYPER/OSPEEDR/PUPDR pin configuration, BSRR/BRR
//!   output, IDR input
//! - [`clock::ClockTree`] - HSI16 + PLL bring-up to 64 MHz
//! - [`runtime`] - TIM3 tick source and the device entry points
//!
//! # Features
//!
//! - `defmt` - Enable debug formatting and bring-up logging
//! - `rt` - Provide the device vector table for `cortex-m-rt`

#![no_std]
#![deny(unsafe_code)]

pub mod clock;
pub mod gpio;
pub mod pac;
pub mod pins;
pub mod runtime;

#[cfg(feature = "rt")]
mod vectors;

pub use clock::{ClockConfig, ClockTree};
pub use gpio::{has_port, Gpio};
pub use runtime::{
    delay, device_init, gpio, init_with, sleep_ticks, take_wakeup, ticks, wakeup_pending, Parts,
};
