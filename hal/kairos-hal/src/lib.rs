//! Kairos Hardware Abstraction Layer
//!
//! This crate holds everything about GPIO control and timekeeping that does
//! not depend on a particular chip. Chip-variant crates supply the register
//! tables and bit encodings and implement the contracts defined here.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  Application (kairos-firmware, etc.)    │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  kairos-hal (this crate)                │
//! │  Register, Pin, PinDriver, TickCounter  │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  kairos-hal-  │       │  kairos-hal-  │
//! │    stm32g0    │       │    stm32f1    │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! Exactly one variant crate is linked into a firmware image. The choice is
//! made with Cargo features at build time; nothing here dispatches at runtime.
//!
//! # Modules
//!
//! - [`register`] - Register capability surface and MMIO cell
//! - [`pin`] - Pin identifiers and the `port_pins!` table macro
//! - [`gpio`] - Pin configuration contract and pin handles
//! - [`clock`] - Bus prescalers and ready-flag polling
//! - [`interrupt`] - Handler registration and dispatch
//! - [`timer`] - General-purpose timer registers and the tick driver
//! - [`time`] - Tick counter, sleep and delay
//! - [`error`] - Fatal error path

#![no_std]
#![deny(unsafe_code)]

pub mod clock;
pub mod error;
pub mod gpio;
pub mod interrupt;
pub mod pin;
pub mod register;
pub mod time;
pub mod timer;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export key types at crate root for convenience
pub use error::{fatal, FatalError};
pub use gpio::{InputPin, Mode, OutputPin, PinConfig, PinDriver, PinHandle, Pull, Speed};
pub use interrupt::{Handler, InterruptContext, InterruptRegistry, Irq};
pub use pin::Pin;
pub use register::{ClockGate, Register, Volatile};
pub use time::{sleep_ticks, Delay, TickCounter, TickSource, TickState, TimeUnit};
pub use timer::{GeneralPurposeTimer, TickConfig, TickDriver, TickTiming};
