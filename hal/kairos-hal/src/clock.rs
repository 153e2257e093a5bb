//! Clock-tree helpers shared by the STM32 variants
//!
//! The bring-up sequence itself lives in each variant crate because the
//! register layout differs. What is common: the AHB/APB prescaler encodings,
//! the flash wait-state table shape, and polling a hardware ready flag.

use core::fmt;
use core::hint::spin_loop;

use crate::register::Register;

/// AHB (HCLK) prescaler, encoded as the `HPRE` field value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AhbPrescaler {
    Div1 = 0b0000,
    Div2 = 0b1000,
    Div4 = 0b1001,
    Div8 = 0b1010,
    Div16 = 0b1011,
    Div64 = 0b1100,
    Div128 = 0b1101,
    Div256 = 0b1110,
    Div512 = 0b1111,
}

impl AhbPrescaler {
    pub const fn bits(self) -> u32 {
        self as u32
    }

    pub const fn divisor(self) -> u32 {
        match self {
            AhbPrescaler::Div1 => 1,
            AhbPrescaler::Div2 => 2,
            AhbPrescaler::Div4 => 4,
            AhbPrescaler::Div8 => 8,
            AhbPrescaler::Div16 => 16,
            AhbPrescaler::Div64 => 64,
            AhbPrescaler::Div128 => 128,
            AhbPrescaler::Div256 => 256,
            AhbPrescaler::Div512 => 512,
        }
    }
}

/// APB (PCLK) prescaler, encoded as the `PPRE` field value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ApbPrescaler {
    Div1 = 0b000,
    Div2 = 0b100,
    Div4 = 0b101,
    Div8 = 0b110,
    Div16 = 0b111,
}

impl ApbPrescaler {
    pub const fn bits(self) -> u32 {
        self as u32
    }

    pub const fn divisor(self) -> u32 {
        match self {
            ApbPrescaler::Div1 => 1,
            ApbPrescaler::Div2 => 2,
            ApbPrescaler::Div4 => 4,
            ApbPrescaler::Div8 => 8,
            ApbPrescaler::Div16 => 16,
        }
    }

    /// Clock seen by timers on this bus
    ///
    /// STM32 timers run at twice the bus clock whenever the APB prescaler
    /// divides.
    pub const fn timer_clock(self, pclk_hz: u32) -> u32 {
        match self {
            ApbPrescaler::Div1 => pclk_hz,
            _ => pclk_hz * 2,
        }
    }
}

/// Invalid clock configuration
///
/// Reported at compile time when a variant validates its configuration in
/// a `const` item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockError {
    /// A PLL factor is outside its register range
    PllFactor,
    /// PLL VCO frequency out of range
    VcoRange,
    /// Resulting SYSCLK above the chip maximum
    SysclkTooHigh,
    /// A bus clock above its maximum
    BusClockTooHigh,
    /// Flash latency too small for HCLK
    FlashLatency,
}

impl fmt::Display for ClockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ClockError::PllFactor => "PLL factor out of range",
            ClockError::VcoRange => "PLL VCO frequency out of range",
            ClockError::SysclkTooHigh => "SYSCLK above chip maximum",
            ClockError::BusClockTooHigh => "bus clock above maximum",
            ClockError::FlashLatency => "flash latency too small for HCLK",
        };
        f.write_str(msg)
    }
}

/// Minimum flash wait states for `hclk_hz`
///
/// `steps` lists the highest HCLK supported at 0, 1, 2... wait states.
/// Returns `None` if HCLK exceeds the last step.
pub const fn min_flash_latency(hclk_hz: u32, steps: &[u32]) -> Option<u8> {
    let mut ws = 0;
    while ws < steps.len() {
        if hclk_hz <= steps[ws] {
            return Some(ws as u8);
        }
        ws += 1;
    }
    None
}

/// Spin until any bit of `mask` reads set
///
/// No timeout: a flag that never asserts hangs here. During bring-up that
/// is the intended fail-stop.
pub fn wait_for<R: Register>(register: &R, mask: u32) {
    while !register.has_bits(mask) {
        spin_loop();
    }
}

/// Spin until the field under `mask` equals `expected`
pub fn wait_for_field<R: Register>(register: &R, mask: u32, expected: u32) {
    while register.get() & mask != expected {
        spin_loop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockRegister;

    #[test]
    fn test_prescaler_divisors() {
        assert_eq!(AhbPrescaler::Div1.divisor(), 1);
        assert_eq!(AhbPrescaler::Div512.divisor(), 512);
        assert_eq!(AhbPrescaler::Div2.bits(), 0b1000);
        assert_eq!(ApbPrescaler::Div16.divisor(), 16);
        assert_eq!(ApbPrescaler::Div2.bits(), 0b100);
    }

    #[test]
    fn test_timer_clock_doubles_when_divided() {
        assert_eq!(ApbPrescaler::Div1.timer_clock(64_000_000), 64_000_000);
        assert_eq!(ApbPrescaler::Div2.timer_clock(32_000_000), 64_000_000);
    }

    #[test]
    fn test_min_flash_latency() {
        const STEPS: [u32; 3] = [24_000_000, 48_000_000, 64_000_000];
        assert_eq!(min_flash_latency(16_000_000, &STEPS), Some(0));
        assert_eq!(min_flash_latency(24_000_000, &STEPS), Some(0));
        assert_eq!(min_flash_latency(24_000_001, &STEPS), Some(1));
        assert_eq!(min_flash_latency(64_000_000, &STEPS), Some(2));
        assert_eq!(min_flash_latency(72_000_000, &STEPS), None);
    }

    #[test]
    fn test_wait_for_returns_once_flag_set() {
        // Ready bit 1 follows enable bit 0
        let reg = MockRegister::new(0).mirror(1 << 0, 1);
        reg.set_bits(1 << 0);
        wait_for(&reg, 1 << 1);
        assert!(reg.has_bits(1 << 1));
    }

    #[test]
    fn test_wait_for_field() {
        let reg = MockRegister::new(0b1000_0000).mirror(0b11, 2);
        reg.write_field(0b11, 0b10);
        wait_for_field(&reg, 0b1100, 0b1000);
        assert_eq!(reg.get() & 0b1100, 0b1000);
    }
}
