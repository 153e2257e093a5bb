//! Device vector table
//!
//! Every device interrupt enters the same trampoline, which looks up the
//! active vector and dispatches through [`HANDLERS`].

use cortex_m::peripheral::scb::VectActive;
use cortex_m::peripheral::SCB;
use kairos_hal::Irq;

use crate::runtime::{HANDLERS, IRQ_COUNT};

type Vector = unsafe extern "C" fn();

extern "C" fn dispatch() {
    if let VectActive::Interrupt { irqn } = SCB::vect_active() {
        HANDLERS.dispatch(Irq(u16::from(irqn)));
    }
}

#[doc(hidden)]
#[allow(unsafe_code)]
#[link_section = ".vector_table.interrupts"]
#[no_mangle]
pub static __INTERRUPTS: [Vector; IRQ_COUNT] = [dispatch as Vector; IRQ_COUNT];
