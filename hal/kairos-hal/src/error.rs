//! Fatal error path
//!
//! Programming errors (a pin on a port the chip does not have, sleeping
//! before the tick timer runs) have no recovery: carrying on would write to
//! an unrelated peripheral or hang. They end in [`fatal`], which logs and
//! panics. Firmware builds with `panic = "abort"` and `panic-probe`, so this
//! is the terminate path, kept apart from ordinary `Result` returns.

use core::fmt;

use crate::interrupt::Irq;
use crate::pin::Pin;

/// Unrecoverable configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FatalError {
    /// Operation on the `Pin::NONE` sentinel
    NoPin,
    /// Pin's port index does not exist on this chip
    UnknownPort(Pin),
    /// Sleep requested before the tick timer was started
    TickNotRunning,
    /// Device initialization ran more than once
    AlreadyInitialized,
    /// Interrupt number beyond the handler table
    UnknownInterrupt(Irq),
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FatalError::NoPin => f.write_str("operation on NoPin"),
            FatalError::UnknownPort(pin) => write!(f, "unknown port {} for pin {}", pin.port(), pin),
            FatalError::TickNotRunning => f.write_str("sleep before tick timer started"),
            FatalError::AlreadyInitialized => f.write_str("device already initialized"),
            FatalError::UnknownInterrupt(irq) => write!(f, "no handler slot for IRQ {}", irq.number()),
        }
    }
}

/// Report a programming error and stop
#[cold]
#[inline(never)]
#[track_caller]
pub fn fatal(err: FatalError) -> ! {
    #[cfg(feature = "defmt")]
    defmt::error!("fatal: {}", err);

    panic!("{}", err)
}
