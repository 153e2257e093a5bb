//! Tick counter, sleep and delay
//!
//! The counter advances once per tick period from the timer interrupt and is
//! read everywhere else. Single writer, many readers: the interrupt handler
//! is the only caller of [`TickCounter::advance`]. Readers may see the value
//! from just before or just after an increment, never a torn one, because
//! the 64-bit count is a `portable-atomic` word (critical-section fallback on
//! cores without 64-bit atomics).

use core::hint::spin_loop;

use portable_atomic::{AtomicU64, AtomicU8, Ordering};

use crate::error::{fatal, FatalError};

/// Time in microseconds
pub type TimeUnit = u64;

/// Tick rate of the counter (one tick per millisecond)
pub const TICK_HZ: u32 = 1_000;

/// Microseconds per tick
pub const TICK_MICROS: TimeUnit = 1_000_000 / TICK_HZ as TimeUnit;

/// Lifecycle of the tick subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum TickState {
    /// Timer not yet programmed
    Uninitialized = 0,
    /// Prescaler and reload loaded, interrupt not yet enabled
    Configured = 1,
    /// Update interrupt enabled; the counter advances
    Running = 2,
}

impl TickState {
    const fn from_u8(value: u8) -> Self {
        match value {
            1 => TickState::Configured,
            2 => TickState::Running,
            _ => TickState::Uninitialized,
        }
    }
}

/// Something that counts ticks
pub trait TickSource {
    /// Current tick count
    fn now(&self) -> u64;

    /// Whether the count is advancing
    fn is_running(&self) -> bool;
}

/// Process-wide tick state
///
/// Lives in a `static` in each variant crate; never torn down.
pub struct TickCounter {
    ticks: AtomicU64,
    wakeup: AtomicU8,
    state: AtomicU8,
}

impl Default for TickCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl TickCounter {
    pub const fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            wakeup: AtomicU8::new(0),
            state: AtomicU8::new(TickState::Uninitialized as u8),
        }
    }

    pub fn state(&self) -> TickState {
        TickState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub(crate) fn set_state(&self, state: TickState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Count one elapsed tick period and raise the wakeup flag
    ///
    /// Interrupt context only.
    pub fn advance(&self) {
        self.ticks.fetch_add(1, Ordering::Release);
        self.wakeup.store(1, Ordering::Release);
    }

    /// Completed tick periods since the timer started
    pub fn count(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    /// Microseconds since the timer started, at tick resolution
    pub fn micros(&self) -> TimeUnit {
        self.count().wrapping_mul(TICK_MICROS)
    }

    /// Check whether a tick happened since the flag was last taken
    pub fn wakeup_pending(&self) -> bool {
        self.wakeup.load(Ordering::Acquire) != 0
    }

    /// Consume the wakeup flag, returning whether it was set
    pub fn take_wakeup(&self) -> bool {
        self.wakeup.swap(0, Ordering::AcqRel) != 0
    }
}

impl TickSource for TickCounter {
    fn now(&self) -> u64 {
        self.count()
    }

    fn is_running(&self) -> bool {
        self.state() == TickState::Running
    }
}

/// Ticks needed to cover `duration` microseconds, rounded up
pub const fn ticks_for(duration: TimeUnit) -> u64 {
    duration.div_ceil(TICK_MICROS)
}

/// Busy-wait for at least `duration` microseconds
///
/// Spins on the tick count; nothing else runs in the foreground meanwhile.
/// The elapsed count is a wrapping difference, so a counter wrap during the
/// sleep is harmless. Sleeping on a source that is not running would never
/// return and is fatal instead.
pub fn sleep_ticks<S: TickSource + ?Sized>(source: &S, duration: TimeUnit) {
    if !source.is_running() {
        fatal(FatalError::TickNotRunning);
    }

    let target = ticks_for(duration);
    let start = source.now();
    while source.now().wrapping_sub(start) < target {
        spin_loop();
    }
}

/// `embedded-hal` delay backed by the tick counter
///
/// Resolution is one tick; every delay is rounded up to whole ticks.
pub struct Delay<'a, S: TickSource> {
    source: &'a S,
}

impl<'a, S: TickSource> Delay<'a, S> {
    pub const fn new(source: &'a S) -> Self {
        Self { source }
    }
}

impl<S: TickSource> embedded_hal::delay::DelayNs for Delay<'_, S> {
    fn delay_ns(&mut self, ns: u32) {
        sleep_ticks(self.source, TimeUnit::from(ns).div_ceil(1_000));
    }

    fn delay_us(&mut self, us: u32) {
        sleep_ticks(self.source, TimeUnit::from(us));
    }

    fn delay_ms(&mut self, ms: u32) {
        sleep_ticks(self.source, TimeUnit::from(ms) * 1_000);
    }
}
