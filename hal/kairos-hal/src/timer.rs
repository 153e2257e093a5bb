//! General-purpose timer registers and the tick driver
//!
//! Both supported chips use TIM3 as the tick source and its register layout
//! is the same on both, so the block and the driver live here. The variant
//! crates only supply the base address, the clock gate and the IRQ number.
//!
//! Start-up sequence (see [`TickDriver::start`]):
//!
//! ```text
//! gate on -> CR1 up/edge/div1 -> PSC, ARR -> UG -> clear UIF
//!         -> Configured -> CEN -> UIE -> register IRQ -> Running
//! ```

use core::fmt;

use crate::interrupt::{Handler, InterruptRegistry, Irq};
use crate::register::{ClockGate, Register};
use crate::time::{TickCounter, TickState};

/// TIMx register block (TIM2/TIM3 layout, up to ARR)
#[repr(C)]
#[derive(Default)]
pub struct GeneralPurposeTimer<R> {
    pub cr1: R,   // 0x00
    pub cr2: R,   // 0x04
    pub smcr: R,  // 0x08
    pub dier: R,  // 0x0C
    pub sr: R,    // 0x10
    pub egr: R,   // 0x14
    pub ccmr1: R, // 0x18
    pub ccmr2: R, // 0x1C
    pub ccer: R,  // 0x20
    pub cnt: R,   // 0x24
    pub psc: R,   // 0x28
    pub arr: R,   // 0x2C
}

/// Counter enable
pub const CR1_CEN: u32 = 1 << 0;
/// Direction (set = down-counting)
pub const CR1_DIR: u32 = 1 << 4;
/// Center-aligned mode selection
pub const CR1_CMS: u32 = 0b11 << 5;
/// Clock division
pub const CR1_CKD: u32 = 0b11 << 8;
/// Update interrupt enable
pub const DIER_UIE: u32 = 1 << 0;
/// Update interrupt flag (rc_w0)
pub const SR_UIF: u32 = 1 << 0;
/// Update generation
pub const EGR_UG: u32 = 1 << 0;

/// Largest count a 16-bit PSC or ARR can divide by
const MAX_DIVISOR: u32 = 1 << 16;

/// Tick rate that cannot be produced by the timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimingError {
    /// Tick rate of zero
    ZeroRate,
    /// Tick rate above the timer clock
    TooFast,
    /// Timer clock is not a whole multiple of the tick rate
    Inexact,
    /// Tick period longer than PSC and ARR together can count
    TooSlow,
}

impl fmt::Display for TimingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            TimingError::ZeroRate => "tick rate is zero",
            TimingError::TooFast => "tick rate above timer clock",
            TimingError::Inexact => "timer clock not a multiple of tick rate",
            TimingError::TooSlow => "tick period too long for 16-bit prescaler and reload",
        };
        f.write_str(msg)
    }
}

/// Prescaler and auto-reload values for one tick period
///
/// Register values, i.e. one less than the divisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickTiming {
    pub prescaler: u16,
    pub reload: u16,
}

impl TickTiming {
    /// Derive the timing for `tick_hz` from a timer clocked at `timer_clock_hz`
    ///
    /// Picks the smallest prescaler that divides the period exactly and
    /// leaves a reload that fits 16 bits, which keeps the counter resolution
    /// as fine as possible. Meant for `const` items so a bad rate fails the
    /// build.
    pub const fn derive(timer_clock_hz: u32, tick_hz: u32) -> Result<Self, TimingError> {
        if tick_hz == 0 {
            return Err(TimingError::ZeroRate);
        }
        if tick_hz > timer_clock_hz {
            return Err(TimingError::TooFast);
        }
        if timer_clock_hz % tick_hz != 0 {
            return Err(TimingError::Inexact);
        }

        let counts = timer_clock_hz / tick_hz;
        let mut divisor = 1;
        while divisor <= MAX_DIVISOR {
            if counts % divisor == 0 && counts / divisor <= MAX_DIVISOR {
                return Ok(TickTiming {
                    prescaler: (divisor - 1) as u16,
                    reload: (counts / divisor - 1) as u16,
                });
            }
            divisor += 1;
        }
        Err(TimingError::TooSlow)
    }

    /// Update rate these values produce from `timer_clock_hz`
    pub const fn tick_hz(self, timer_clock_hz: u32) -> u32 {
        timer_clock_hz / ((self.prescaler as u32 + 1) * (self.reload as u32 + 1))
    }
}

/// Everything [`TickDriver::start`] needs besides the registers
#[derive(Debug, Clone, Copy)]
pub struct TickConfig {
    pub timing: TickTiming,
    pub irq: Irq,
    pub priority: u8,
}

/// Drives a [`TickCounter`] from a timer's update interrupt
pub struct TickDriver<'a, R: Register> {
    timer: &'a GeneralPurposeTimer<R>,
    counter: &'a TickCounter,
}

impl<'a, R: Register> TickDriver<'a, R> {
    pub const fn new(timer: &'a GeneralPurposeTimer<R>, counter: &'a TickCounter) -> Self {
        Self { timer, counter }
    }

    pub fn counter(&self) -> &'a TickCounter {
        self.counter
    }

    /// Program the timer and start counting
    ///
    /// Must run after clock bring-up: `config.timing` assumes the final
    /// timer clock. `handler` is what the vector table calls for
    /// `config.irq`; it is expected to end up in [`TickDriver::on_interrupt`].
    pub fn start<G: Register, I: InterruptRegistry>(
        &self,
        gate: &ClockGate<'_, G>,
        config: &TickConfig,
        registry: &I,
        handler: Handler,
    ) {
        let timer = self.timer;

        gate.enable();

        // Up-counting, edge-aligned, no clock division
        timer.cr1.write_field(CR1_DIR | CR1_CMS | CR1_CKD, 0);
        timer.psc.set(u32::from(config.timing.prescaler));
        timer.arr.set(u32::from(config.timing.reload));

        // PSC is buffered; force an update so it applies to the first period.
        // The update also raises UIF, which must not count as a tick.
        timer.egr.set(EGR_UG);
        timer.sr.set(!SR_UIF);
        self.counter.set_state(TickState::Configured);

        timer.cr1.set_bits(CR1_CEN);
        timer.dier.set_bits(DIER_UIE);

        registry
            .register(config.irq, handler)
            .set_priority(config.priority)
            .enable();
        self.counter.set_state(TickState::Running);

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "tick timer running: psc={=u16} arr={=u16} irq={=u16}",
            config.timing.prescaler,
            config.timing.reload,
            config.irq.number()
        );
    }

    /// Service the update interrupt
    ///
    /// Returns whether a tick was counted. An entry without UIF set (e.g. a
    /// spurious re-entry after the flag was already cleared) changes nothing.
    pub fn on_interrupt(&self) -> bool {
        if !self.timer.sr.has_bits(SR_UIF) {
            return false;
        }
        // rc_w0: writing 1 leaves the other flags alone
        self.timer.sr.set(!SR_UIF);
        self.counter.advance();
        true
    }
}
