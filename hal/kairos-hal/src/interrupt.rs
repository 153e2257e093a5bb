//! Interrupt handler registration
//!
//! Drivers register a plain function for an IRQ number, then set its
//! priority and enable it:
//!
//! ```ignore
//! registry.register(TIM3_IRQ, on_tick).set_priority(0xC0).enable();
//! ```
//!
//! On the target, [`Nvic`] stores handlers in a [`HandlerTable`] and the
//! variant crate's vector table sends every device interrupt through
//! [`HandlerTable::dispatch`]. Tests use `mock::MockInterrupts` instead.

use core::cell::Cell;

use critical_section::Mutex;

use crate::error::{fatal, FatalError};

/// Device interrupt number (position in the vector table after the 16
/// core exceptions)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Irq(pub u16);

impl Irq {
    pub const fn number(self) -> u16 {
        self.0
    }
}

// SAFETY: `Irq` values come from the variant crates' vector tables and only
// name interrupts that exist on the selected chip.
#[allow(unsafe_code)]
unsafe impl cortex_m::interrupt::InterruptNumber for Irq {
    fn number(self) -> u16 {
        self.0
    }
}

/// Token passed to a handler identifying the interrupt being served
#[derive(Debug, Clone, Copy)]
pub struct InterruptContext {
    irq: Irq,
}

impl InterruptContext {
    pub(crate) const fn new(irq: Irq) -> Self {
        Self { irq }
    }

    pub fn irq(&self) -> Irq {
        self.irq
    }
}

/// Interrupt handler
pub type Handler = fn(InterruptContext);

/// Where interrupt handlers get registered
pub trait InterruptRegistry {
    /// Install `handler` for `irq`, replacing any previous one
    fn bind(&self, irq: Irq, handler: Handler);

    /// Set the priority of `irq` (lower value = more urgent)
    fn set_priority(&self, irq: Irq, priority: u8);

    /// Unmask `irq` at the interrupt controller
    fn enable(&self, irq: Irq);

    /// Install `handler` and return a handle for priority and enable
    fn register(&self, irq: Irq, handler: Handler) -> Interrupt<'_, Self>
    where
        Self: Sized,
    {
        self.bind(irq, handler);
        Interrupt {
            registry: self,
            irq,
        }
    }
}

/// A registered interrupt line
pub struct Interrupt<'a, R: InterruptRegistry> {
    registry: &'a R,
    irq: Irq,
}

impl<R: InterruptRegistry> Interrupt<'_, R> {
    pub fn irq(&self) -> Irq {
        self.irq
    }

    pub fn set_priority(&self, priority: u8) -> &Self {
        self.registry.set_priority(self.irq, priority);
        self
    }

    pub fn enable(&self) {
        self.registry.enable(self.irq);
    }
}

/// Handler slots indexed by IRQ number
pub struct HandlerTable<const N: usize> {
    slots: [Mutex<Cell<Option<Handler>>>; N],
}

impl<const N: usize> Default for HandlerTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> HandlerTable<N> {
    pub const fn new() -> Self {
        Self {
            slots: [const { Mutex::new(Cell::new(None)) }; N],
        }
    }

    /// Store `handler` for `irq`
    ///
    /// An IRQ number past the table is a wiring mistake and is fatal.
    pub fn install(&self, irq: Irq, handler: Handler) {
        let slot = self
            .slots
            .get(irq.0 as usize)
            .unwrap_or_else(|| fatal(FatalError::UnknownInterrupt(irq)));
        critical_section::with(|cs| slot.borrow(cs).set(Some(handler)));
    }

    /// Run the handler for `irq`
    ///
    /// The slot is read inside a critical section; the handler itself runs
    /// outside it so equal-priority masking is left to the NVIC. Returns
    /// `false` for an IRQ with no handler.
    pub fn dispatch(&self, irq: Irq) -> bool {
        let handler = self
            .slots
            .get(irq.0 as usize)
            .and_then(|slot| critical_section::with(|cs| slot.borrow(cs).get()));

        match handler {
            Some(handler) => {
                handler(InterruptContext::new(irq));
                true
            }
            None => {
                #[cfg(feature = "defmt")]
                defmt::warn!("unhandled IRQ {=u16}", irq.0);
                false
            }
        }
    }
}

/// NVIC-backed registry
///
/// Priorities are written as full bytes; the NVIC ignores the low bits the
/// core does not implement (M0+ keeps 2 bits, M3 keeps 4).
pub struct Nvic<'a, const N: usize> {
    table: &'a HandlerTable<N>,
}

impl<'a, const N: usize> Nvic<'a, N> {
    pub const fn new(table: &'a HandlerTable<N>) -> Self {
        Self { table }
    }
}

#[allow(unsafe_code)]
impl<const N: usize> InterruptRegistry for Nvic<'_, N> {
    fn bind(&self, irq: Irq, handler: Handler) {
        self.table.install(irq, handler);
    }

    fn set_priority(&self, irq: Irq, priority: u8) {
        // SAFETY: only called from single-threaded init before the line is
        // unmasked, so no priority-based critical section can be broken.
        unsafe {
            let mut core = cortex_m::Peripherals::steal();
            core.NVIC.set_priority(irq, priority);
        }
    }

    fn enable(&self, irq: Irq) {
        // SAFETY: a handler is installed for `irq` before it is unmasked.
        unsafe { cortex_m::peripheral::NVIC::unmask(irq) }
    }
}
