//! Host-side mocks for register blocks and interrupt registration
//!
//! [`MockRegister`] stores a word and logs every write with a global
//! sequence number, so tests can check both the final register contents and
//! the order in which different registers were written. A register can
//! "mirror" one field into another on read, which stands in for hardware
//! status bits that follow a control bit (`HSIRDY` after `HSION`, `SWS`
//! after `SW`).
//!
//! [`MockInterrupts`] records handler registrations and can fire them.

extern crate std;

use core::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::vec::Vec;

use crate::interrupt::{Handler, InterruptContext, InterruptRegistry, Irq};
use crate::register::Register;

/// Global write counter shared by every mock register
static SEQUENCE: AtomicUsize = AtomicUsize::new(0);

/// A logged register write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Write {
    /// Position in the global write order
    pub seq: usize,
    /// Word written
    pub value: u32,
}

#[derive(Debug, Clone, Copy)]
struct Mirror {
    source: u32,
    shift: u32,
}

/// In-memory register with a write log
pub struct MockRegister {
    value: AtomicU32,
    mirrors: [Option<Mirror>; 2],
    writes: Mutex<Vec<Write>>,
}

impl Default for MockRegister {
    fn default() -> Self {
        Self::new(0)
    }
}

impl MockRegister {
    /// Create a register holding `reset`
    pub const fn new(reset: u32) -> Self {
        Self {
            value: AtomicU32::new(reset),
            mirrors: [None, None],
            writes: Mutex::new(Vec::new()),
        }
    }

    /// Reads report the bits under `source` copied `shift` places left
    ///
    /// The destination field is `source << shift`; whatever was stored
    /// there is replaced on every read. At most two mirrors per register.
    pub fn mirror(mut self, source: u32, shift: u32) -> Self {
        let slot = self
            .mirrors
            .iter_mut()
            .find(|m| m.is_none())
            .expect("at most two mirrors per mock register");
        *slot = Some(Mirror { source, shift });
        self
    }

    /// Stored word, without mirrors applied
    pub fn raw(&self) -> u32 {
        self.value.load(Ordering::SeqCst)
    }

    /// Change the stored word as hardware would, without logging a write
    pub fn poke(&self, value: u32) {
        self.value.store(value, Ordering::SeqCst);
    }

    /// Every write so far, oldest first
    pub fn writes(&self) -> Vec<Write> {
        self.writes.lock().unwrap().clone()
    }

    /// Number of writes so far
    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    /// Most recent write, if any
    pub fn last_write(&self) -> Option<Write> {
        self.writes.lock().unwrap().last().copied()
    }

    /// Sequence number of the first write whose value satisfies `pred`
    pub fn first_write_where(&self, pred: impl Fn(u32) -> bool) -> Option<usize> {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .find(|w| pred(w.value))
            .map(|w| w.seq)
    }
}

impl Register for MockRegister {
    fn get(&self) -> u32 {
        let raw = self.raw();
        self.mirrors.iter().flatten().fold(raw, |value, m| {
            let field = m.source << m.shift;
            (value & !field) | ((raw & m.source) << m.shift)
        })
    }

    fn set(&self, value: u32) {
        self.value.store(value, Ordering::SeqCst);
        let seq = SEQUENCE.fetch_add(1, Ordering::SeqCst);
        self.writes.lock().unwrap().push(Write { seq, value });
    }
}

/// One recorded interrupt registration
#[derive(Debug, Clone, Copy)]
pub struct Registration {
    pub irq: Irq,
    pub handler: Handler,
    pub priority: Option<u8>,
    pub enabled: bool,
}

/// Interrupt registry that records instead of touching the NVIC
#[derive(Default)]
pub struct MockInterrupts {
    lines: Mutex<Vec<Registration>>,
}

impl MockInterrupts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registration for `irq`, if one was made
    pub fn registration(&self, irq: Irq) -> Option<Registration> {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.irq == irq)
            .copied()
    }

    /// Run the handler registered for `irq`
    ///
    /// Returns `false` if nothing is registered or the line is not enabled.
    pub fn fire(&self, irq: Irq) -> bool {
        match self.registration(irq) {
            Some(r) if r.enabled => {
                (r.handler)(InterruptContext::new(irq));
                true
            }
            _ => false,
        }
    }

    fn update(&self, irq: Irq, f: impl FnOnce(&mut Registration)) {
        let mut lines = self.lines.lock().unwrap();
        if let Some(r) = lines.iter_mut().find(|r| r.irq == irq) {
            f(r);
        }
    }
}

impl InterruptRegistry for MockInterrupts {
    fn bind(&self, irq: Irq, handler: Handler) {
        let mut lines = self.lines.lock().unwrap();
        lines.retain(|r| r.irq != irq);
        lines.push(Registration {
            irq,
            handler,
            priority: None,
            enabled: false,
        });
    }

    fn set_priority(&self, irq: Irq, priority: u8) {
        self.update(irq, |r| r.priority = Some(priority));
    }

    fn enable(&self, irq: Irq) {
        self.update(irq, |r| r.enabled = true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_are_ordered_across_registers() {
        let a = MockRegister::new(0);
        let b = MockRegister::new(0);

        a.set(1);
        b.set(2);
        a.set(3);

        let a_writes = a.writes();
        let b_writes = b.writes();
        assert_eq!(a_writes.len(), 2);
        assert!(a_writes[0].seq < b_writes[0].seq);
        assert!(b_writes[0].seq < a_writes[1].seq);
        assert_eq!(a.last_write().map(|w| w.value), Some(3));
    }

    #[test]
    fn test_mirror_follows_source() {
        // Bit 8 mirrored into bit 10, bit 24 into bit 25
        let reg = MockRegister::new(0).mirror(1 << 8, 2).mirror(1 << 24, 1);
        assert_eq!(reg.get(), 0);

        reg.set_bits(1 << 8);
        assert_eq!(reg.get(), (1 << 8) | (1 << 10));

        reg.set_bits(1 << 24);
        assert_eq!(reg.get(), (1 << 8) | (1 << 10) | (1 << 24) | (1 << 25));

        reg.clear_bits(1 << 8);
        assert_eq!(reg.get(), (1 << 24) | (1 << 25));
    }

    #[test]
    fn test_poke_is_not_logged() {
        let reg = MockRegister::new(0);
        reg.poke(0xAA);
        assert_eq!(reg.get(), 0xAA);
        assert_eq!(reg.write_count(), 0);
    }

    fn noop(_: InterruptContext) {}

    #[test]
    fn test_mock_interrupts_fire_only_when_enabled() {
        let registry = MockInterrupts::new();
        let irq = Irq(7);

        let line = registry.register(irq, noop);
        assert!(!registry.fire(irq));

        line.set_priority(0x40).enable();
        let r = registry.registration(irq).unwrap();
        assert_eq!(r.priority, Some(0x40));
        assert!(r.enabled);
        assert!(registry.fire(irq));
        assert!(!registry.fire(Irq(8)));
    }
}
