//! STM32F103 register blocks and base addresses (RM0008)

use kairos_hal::{GeneralPurposeTimer, Volatile};

pub const RCC_BASE: usize = 0x4002_1000;
pub const FLASH_BASE: usize = 0x4002_2000;
pub const TIM3_BASE: usize = 0x4000_0400;

/// GPIO port base addresses by port index (A-G on the APB2 bus)
pub const GPIO_BASES: [Option<usize>; 8] = [
    Some(0x4001_0800), // A
    Some(0x4001_0C00), // B
    Some(0x4001_1000), // C
    Some(0x4001_1400), // D
    Some(0x4001_1800), // E
    Some(0x4001_1C00), // F
    Some(0x4001_2000), // G
    None,
];

/// Reset and clock control
#[repr(C)]
#[derive(Default)]
pub struct Rcc<R> {
    pub cr: R,       // 0x00
    pub cfgr: R,     // 0x04
    pub cir: R,      // 0x08
    pub apb2rstr: R, // 0x0C
    pub apb1rstr: R, // 0x10
    pub ahbenr: R,   // 0x14
    pub apb2enr: R,  // 0x18
    pub apb1enr: R,  // 0x1C
    pub bdcr: R,     // 0x20
    pub csr: R,      // 0x24
}

pub mod rcc {
    pub const CR_HSION: u32 = 1 << 0;
    pub const CR_HSIRDY: u32 = 1 << 1;
    pub const CR_PLLON: u32 = 1 << 24;
    pub const CR_PLLRDY: u32 = 1 << 25;

    pub const CFGR_SW: u32 = 0b11;
    pub const CFGR_SWS: u32 = 0b11 << 2;
    pub const CFGR_HPRE: u32 = 0b1111 << 4;
    pub const CFGR_PPRE1: u32 = 0b111 << 8;
    pub const CFGR_PPRE2: u32 = 0b111 << 11;
    /// Set = HSE, clear = HSI/2
    pub const CFGR_PLLSRC: u32 = 1 << 16;
    pub const CFGR_PLLXTPRE: u32 = 1 << 17;
    pub const CFGR_PLLMUL: u32 = 0b1111 << 18;
    pub const SW_PLL: u32 = 0b10;

    pub const APB2ENR_AFIOEN: u32 = 1 << 0;
    /// IOPAEN; port N is this shifted left by N
    pub const APB2ENR_IOPAEN: u32 = 1 << 2;
    pub const APB1ENR_TIM3EN: u32 = 1 << 1;
    pub const APB1ENR_PWREN: u32 = 1 << 28;
}

/// Flash memory interface (ACR only)
#[repr(C)]
#[derive(Default)]
pub struct Flash<R> {
    pub acr: R, // 0x00
}

pub mod flash {
    pub const ACR_LATENCY: u32 = 0b111;
    pub const ACR_PRFTBE: u32 = 1 << 4;
}

/// One GPIO port
#[repr(C)]
#[derive(Default)]
pub struct Port<R> {
    pub crl: R,  // 0x00
    pub crh: R,  // 0x04
    pub idr: R,  // 0x08
    pub odr: R,  // 0x0C
    pub bsrr: R, // 0x10
    pub brr: R,  // 0x14
    pub lckr: R, // 0x18
}

/// RCC at its fixed address
///
/// # Safety
///
/// Caller must not create aliasing owners that assume exclusive access; the
/// HAL only ever shares these through `&` and the [`Register`] operations.
///
/// [`Register`]: kairos_hal::Register
#[allow(unsafe_code)]
pub unsafe fn rcc() -> &'static Rcc<Volatile> {
    &*(RCC_BASE as *const Rcc<Volatile>)
}

/// Flash interface at its fixed address
///
/// # Safety
///
/// See [`rcc`].
#[allow(unsafe_code)]
pub unsafe fn flash() -> &'static Flash<Volatile> {
    &*(FLASH_BASE as *const Flash<Volatile>)
}

/// TIM3 at its fixed address
///
/// # Safety
///
/// See [`rcc`].
#[allow(unsafe_code)]
pub unsafe fn tim3() -> &'static GeneralPurposeTimer<Volatile> {
    &*(TIM3_BASE as *const GeneralPurposeTimer<Volatile>)
}

/// GPIO port `index`, if the chip has it
///
/// # Safety
///
/// See [`rcc`].
#[allow(unsafe_code)]
pub unsafe fn port(index: usize) -> Option<&'static Port<Volatile>> {
    match GPIO_BASES.get(index) {
        Some(Some(base)) => Some(&*(*base as *const Port<Volatile>)),
        _ => None,
    }
}
