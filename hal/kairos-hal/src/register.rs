//! Register capability surface
//!
//! Everything in the workspace touches hardware through the five operations
//! of [`Register`]. Register blocks are `#[repr(C)]` structs generic over the
//! register type, so the same driver code runs against [`Volatile`] cells at
//! fixed MMIO addresses on the target and against mock registers on the host.

use core::cell::UnsafeCell;
use core::ptr;

/// A 32-bit hardware register
pub trait Register {
    /// Read the full register word
    fn get(&self) -> u32;

    /// Write the full register word
    fn set(&self, value: u32);

    /// Set every bit in `mask`, leaving the others untouched
    fn set_bits(&self, mask: u32) {
        self.set(self.get() | mask);
    }

    /// Clear every bit in `mask`, leaving the others untouched
    fn clear_bits(&self, mask: u32) {
        self.set(self.get() & !mask);
    }

    /// Check whether any bit in `mask` is set
    fn has_bits(&self, mask: u32) -> bool {
        self.get() & mask != 0
    }

    /// Replace the bits under `mask` with `value` in a single write
    ///
    /// Bits of `value` outside `mask` are ignored.
    fn write_field(&self, mask: u32, value: u32) {
        self.set((self.get() & !mask) | (value & mask));
    }
}

/// Memory-mapped register cell
///
/// Only ever obtained by casting a peripheral base address to a register
/// block; there is no safe constructor.
#[repr(transparent)]
pub struct Volatile(UnsafeCell<u32>);

// SAFETY: a `Volatile` lives at a fixed MMIO address and is only accessed
// through single volatile loads and stores; sharing a reference between
// thread mode and an interrupt handler cannot tear a 32-bit access.
#[allow(unsafe_code)]
unsafe impl Sync for Volatile {}

#[allow(unsafe_code)]
impl Register for Volatile {
    #[inline(always)]
    fn get(&self) -> u32 {
        // SAFETY: the cell points at a readable, aligned 32-bit register.
        unsafe { ptr::read_volatile(self.0.get()) }
    }

    #[inline(always)]
    fn set(&self, value: u32) {
        // SAFETY: the cell points at a writable, aligned 32-bit register.
        unsafe { ptr::write_volatile(self.0.get(), value) }
    }
}

/// One peripheral clock-enable bit
///
/// Enabling is a plain bit set, so it is safe to repeat.
pub struct ClockGate<'a, R: Register> {
    register: &'a R,
    mask: u32,
}

impl<'a, R: Register> ClockGate<'a, R> {
    /// Describe the gate at `mask` within an enable register
    pub const fn new(register: &'a R, mask: u32) -> Self {
        Self { register, mask }
    }

    /// Turn the peripheral clock on
    pub fn enable(&self) {
        self.register.set_bits(self.mask);
    }

    /// Check whether the peripheral clock is on
    pub fn is_enabled(&self) -> bool {
        self.register.has_bits(self.mask)
    }
}
