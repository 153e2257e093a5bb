//! STM32G07x register blocks and base addresses (RM0444)
//!
//! Only the registers the HAL touches are named; everything else in a block
//! is padding so offsets line up with the reference manual.

use kairos_hal::{GeneralPurposeTimer, Volatile};

pub const RCC_BASE: usize = 0x4002_1000;
pub const FLASH_BASE: usize = 0x4002_2000;
pub const TIM3_BASE: usize = 0x4000_0400;

/// IOPORT base addresses by port index. G07x has no port E.
pub const GPIO_BASES: [Option<usize>; 8] = [
    Some(0x5000_0000), // A
    Some(0x5000_0400), // B
    Some(0x5000_0800), // C
    Some(0x5000_0C00), // D
    None,              // E
    Some(0x5000_1400), // F
    None,
    None,
];

/// Reset and clock control
#[repr(C)]
#[derive(Default)]
pub struct Rcc<R> {
    pub cr: R,      // 0x00
    pub icscr: R,   // 0x04
    pub cfgr: R,    // 0x08
    pub pllcfgr: R, // 0x0C
    _reserved0: [R; 2],
    pub cier: R,     // 0x18
    pub cifr: R,     // 0x1C
    pub cicr: R,     // 0x20
    pub ioprstr: R,  // 0x24
    pub ahbrstr: R,  // 0x28
    pub apbrstr1: R, // 0x2C
    pub apbrstr2: R, // 0x30
    pub iopenr: R,   // 0x34
    pub ahbenr: R,   // 0x38
    pub apbenr1: R,  // 0x3C
    pub apbenr2: R,  // 0x40
}

pub mod rcc {
    pub const CR_HSION: u32 = 1 << 8;
    pub const CR_HSIRDY: u32 = 1 << 10;
    pub const CR_PLLON: u32 = 1 << 24;
    pub const CR_PLLRDY: u32 = 1 << 25;

    pub const CFGR_SW: u32 = 0b111;
    pub const CFGR_SWS: u32 = 0b111 << 3;
    pub const CFGR_HPRE: u32 = 0b1111 << 8;
    pub const CFGR_PPRE: u32 = 0b111 << 12;
    pub const SW_PLLRCLK: u32 = 0b010;

    pub const PLLCFGR_PLLSRC: u32 = 0b11;
    pub const PLLCFGR_PLLM: u32 = 0b111 << 4;
    pub const PLLCFGR_PLLN: u32 = 0x7F << 8;
    pub const PLLCFGR_PLLREN: u32 = 1 << 28;
    pub const PLLCFGR_PLLR: u32 = 0b111 << 29;
    pub const PLLSRC_HSI16: u32 = 0b10;

    pub const APBENR1_TIM3EN: u32 = 1 << 1;
    pub const APBENR1_PWREN: u32 = 1 << 28;
    pub const APBENR2_SYSCFGEN: u32 = 1 << 0;
}

/// Embedded flash interface (ACR only)
#[repr(C)]
#[derive(Default)]
pub struct Flash<R> {
    pub acr: R, // 0x00
}

pub mod flash {
    pub const ACR_LATENCY: u32 = 0b111;
}

/// One GPIO port
#[repr(C)]
#[derive(Default)]
pub struct Port<R> {
    pub moder: R,   // 0x00
    pub otyper: R,  // 0x04
    pub ospeedr: R, // 0x08
    pub pupdr: R,   // 0x0C
    pub idr: R,     // 0x10
    pub odr: R,     // 0x14
    pub bsrr: R,    // 0x18
    pub lckr: R,    // 0x1C
    pub afrl: R,    // 0x20
    pub afrh: R,    // 0x24
    pub brr: R,     // 0x28
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

/// FLASH interface at its fixed address
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
