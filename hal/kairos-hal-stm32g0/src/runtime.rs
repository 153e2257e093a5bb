//! Device entry points
//!
//! [`device_init`] brings the clock tree up and starts TIM3 as the 1 kHz
//! tick source. Everything else here reads the tick state it leaves behind.

use portable_atomic::{AtomicBool, Ordering};

use kairos_hal::interrupt::{HandlerTable, Nvic};
use kairos_hal::time::{self, TICK_HZ};
use kairos_hal::{
    fatal, ClockGate, Delay, FatalError, GeneralPurposeTimer, Handler, InterruptContext,
    InterruptRegistry, Irq, Register, TickConfig, TickCounter, TickDriver, TickTiming, TimeUnit,
    Volatile,
};

use crate::clock::{ClockConfig, ClockTree};
use crate::gpio::Gpio;
use crate::pac::{self, rcc, Flash, Rcc};

/// Clock configuration applied by [`device_init`]
pub const CLOCK: ClockConfig = ClockConfig::DEFAULT.checked();

/// Device interrupts on G07x
pub const IRQ_COUNT: usize = 32;

pub const TIM3_IRQ: Irq = Irq(16);
pub const TICK_PRIORITY: u8 = 0xC0;

pub const TICK_TIMING: TickTiming = match TickTiming::derive(CLOCK.timer_clock_hz(), TICK_HZ) {
    Ok(timing) => timing,
    Err(_) => panic!("tick rate not reachable from the TIM3 clock"),
};

pub const TICK_CONFIG: TickConfig = TickConfig {
    timing: TICK_TIMING,
    irq: TIM3_IRQ,
    priority: TICK_PRIORITY,
};

/// Tick state, advanced only by [`handle_tim3`]
pub static TICKS: TickCounter = TickCounter::new();

/// Handlers behind the vector table
pub static HANDLERS: HandlerTable<IRQ_COUNT> = HandlerTable::new();

static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Register blocks touched by device init
pub struct Parts<'a, R: Register> {
    pub rcc: &'a Rcc<R>,
    pub flash: &'a Flash<R>,
    pub tim3: &'a GeneralPurposeTimer<R>,
}

impl Parts<'static, Volatile> {
    #[allow(unsafe_code)]
    pub fn hardware() -> Self {
        // SAFETY: fixed MMIO addresses; access goes through `Register` only.
        unsafe {
            Parts {
                rcc: pac::rcc(),
                flash: pac::flash(),
                tim3: pac::tim3(),
            }
        }
    }
}

/// Clock bring-up followed by tick timer start, over any register type
pub fn init_with<R: Register, I: InterruptRegistry>(
    parts: &Parts<'_, R>,
    registry: &I,
    counter: &TickCounter,
    handler: Handler,
) {
    ClockTree::new(parts.rcc, parts.flash).bring_up(&CLOCK);

    let gate = ClockGate::new(&parts.rcc.apbenr1, rcc::APBENR1_TIM3EN);
    TickDriver::new(parts.tim3, counter).start(&gate, &TICK_CONFIG, registry, handler);
}

fn claim(flag: &AtomicBool) {
    if flag.swap(true, Ordering::AcqRel) {
        fatal(FatalError::AlreadyInitialized);
    }
}

/// Bring up clocks and start the tick timer
///
/// Call once, first thing after reset. A second call is fatal.
pub fn device_init() {
    claim(&INITIALIZED);
    init_with(&Parts::hardware(), &Nvic::new(&HANDLERS), &TICKS, handle_tim3);
}

/// TIM3 update interrupt
#[allow(unsafe_code)]
pub fn handle_tim3(_: InterruptContext) {
    // SAFETY: fixed MMIO address; access goes through `Register` only.
    let tim3 = unsafe { pac::tim3() };
    TickDriver::new(tim3, &TICKS).on_interrupt();
}

/// Microseconds since the tick timer started
pub fn ticks() -> TimeUnit {
    TICKS.micros()
}

/// Busy-wait for at least `duration` microseconds
pub fn sleep_ticks(duration: TimeUnit) {
    time::sleep_ticks(&TICKS, duration);
}

/// `embedded-hal` delay on the device tick
pub fn delay() -> Delay<'static, TickCounter> {
    Delay::new(&TICKS)
}

pub fn wakeup_pending() -> bool {
    TICKS.wakeup_pending()
}

pub fn take_wakeup() -> bool {
    TICKS.take_wakeup()
}

/// GPIO driver over the real ports
pub fn gpio() -> Gpio<'static, Volatile> {
    Gpio::hardware()
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use kairos_hal::mock::{MockInterrupts, MockRegister};
    use kairos_hal::timer::SR_UIF;
    use kairos_hal::TickState;
    use std::sync::OnceLock;

    #[test]
    fn test_tick_timing_for_64_mhz() {
        assert_eq!(CLOCK.timer_clock_hz(), 64_000_000);
        assert_eq!(TICK_TIMING.prescaler, 0);
        assert_eq!(TICK_TIMING.reload, 63_999);
    }

    #[test]
    #[should_panic(expected = "device already initialized")]
    fn test_second_init_is_fatal() {
        let flag = AtomicBool::new(false);
        claim(&flag);
        claim(&flag);
    }

    static COUNTER: TickCounter = TickCounter::new();
    static TIM3: OnceLock<GeneralPurposeTimer<MockRegister>> = OnceLock::new();

    fn on_tim3(_: InterruptContext) {
        if let Some(tim3) = TIM3.get() {
            TickDriver::new(tim3, &COUNTER).on_interrupt();
        }
    }

    #[test]
    fn test_init_with_mock_device() {
        let rcc = Rcc::mock();
        let flash = Flash::<MockRegister>::default();
        let tim3 = TIM3.get_or_init(GeneralPurposeTimer::default);
        let registry = MockInterrupts::new();

        let parts = Parts {
            rcc: &rcc,
            flash: &flash,
            tim3,
        };
        init_with(&parts, &registry, &COUNTER, on_tim3);

        assert_eq!(COUNTER.state(), TickState::Running);
        assert!(rcc.apbenr1.has_bits(rcc::APBENR1_TIM3EN));
        assert_eq!(tim3.arr.raw(), 63_999);

        // Timer only starts once SYSCLK runs from the PLL
        let switch = rcc.cfgr.writes()[1].seq;
        let timer_gate = rcc
            .apbenr1
            .first_write_where(|v| v & rcc::APBENR1_TIM3EN != 0)
            .unwrap();
        assert!(switch < timer_gate);

        let line = registry.registration(TIM3_IRQ).unwrap();
        assert_eq!(line.priority, Some(TICK_PRIORITY));
        assert!(line.enabled);

        for _ in 0..1000 {
            tim3.sr.poke(SR_UIF);
            registry.fire(TIM3_IRQ);
        }
        assert_eq!(COUNTER.micros(), 1_000_000);
        assert!(COUNTER.take_wakeup());
    }

    static DEVICE_TIM3: OnceLock<GeneralPurposeTimer<MockRegister>> = OnceLock::new();

    fn on_device_tim3(_: InterruptContext) {
        if let Some(tim3) = DEVICE_TIM3.get() {
            TickDriver::new(tim3, &TICKS).on_interrupt();
        }
    }

    #[test]
    fn test_entry_points_over_device_ticks() {
        use embedded_hal::delay::DelayNs;

        let rcc = Rcc::mock();
        let flash = Flash::<MockRegister>::default();
        let tim3 = DEVICE_TIM3.get_or_init(GeneralPurposeTimer::default);
        let registry = MockInterrupts::new();

        let parts = Parts {
            rcc: &rcc,
            flash: &flash,
            tim3,
        };
        init_with(&parts, &registry, &TICKS, on_device_tim3);

        for _ in 0..1000 {
            tim3.sr.poke(SR_UIF);
            registry.fire(TIM3_IRQ);
        }
        assert_eq!(ticks(), 1_000_000);
        assert!(wakeup_pending());
        assert!(take_wakeup());
        assert!(!wakeup_pending());

        sleep_ticks(0);
        assert_eq!(ticks(), 1_000_000);

        // Another thread plays the timer interrupt while the foreground sleeps
        let stop = AtomicBool::new(false);
        let (slept, delayed) = std::thread::scope(|scope| {
            scope.spawn(|| {
                while !stop.load(Ordering::Acquire) {
                    TICKS.advance();
                    std::thread::yield_now();
                }
            });

            let start = ticks();
            sleep_ticks(5_000);
            let slept = ticks() - start;

            let start = ticks();
            delay().delay_ms(2);
            let delayed = ticks() - start;

            stop.store(true, Ordering::Release);
            (slept, delayed)
        });

        assert!(slept >= 5_000);
        assert!(delayed >= 2_000);
        assert!(take_wakeup());
    }
}
