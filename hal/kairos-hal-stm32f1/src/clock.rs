//! Clock-tree bring-up for STM32F103
//!
//! HSI/2 feeds the PLL, the PLL drives SYSCLK. Without an external crystal
//! the ceiling is 64 MHz (4 MHz x 16). APB1 is limited to 36 MHz and runs
//! at half speed; TIM3 sits on APB1 and gets the doubled timer clock back.

use kairos_hal::clock::{
    min_flash_latency, wait_for, wait_for_field, AhbPrescaler, ApbPrescaler, ClockError,
};
use kairos_hal::{ClockGate, Register, Volatile};

use crate::pac::{self, flash, rcc, Flash, Rcc};

/// HSI oscillator frequency
pub const HSI_HZ: u32 = 8_000_000;

/// PLL input when sourced from HSI (always divided by 2)
pub const PLL_IN_HZ: u32 = HSI_HZ / 2;

pub const SYSCLK_MAX_HZ: u32 = 72_000_000;
pub const PCLK1_MAX_HZ: u32 = 36_000_000;
pub const PCLK2_MAX_HZ: u32 = 72_000_000;

/// Highest HCLK for 0, 1 and 2 flash wait states
pub const FLASH_LATENCY_STEPS: [u32; 3] = [24_000_000, 48_000_000, 72_000_000];

const PLL_OUT_MIN_HZ: u32 = 16_000_000;

/// PLL multiplier, bus prescalers and flash latency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockConfig {
    /// PLLMUL, 2..=16
    pub pllmul: u8,
    pub ahb: AhbPrescaler,
    pub apb1: ApbPrescaler,
    pub apb2: ApbPrescaler,
    pub flash_latency: u8,
}

impl ClockConfig {
    /// 4 MHz x 16 = 64 MHz, APB1 at 32 MHz, 2 wait states
    pub const DEFAULT: ClockConfig = ClockConfig {
        pllmul: 16,
        ahb: AhbPrescaler::Div1,
        apb1: ApbPrescaler::Div2,
        apb2: ApbPrescaler::Div1,
        flash_latency: 2,
    };

    pub const fn sysclk_hz(&self) -> u32 {
        PLL_IN_HZ * self.pllmul as u32
    }

    pub const fn hclk_hz(&self) -> u32 {
        self.sysclk_hz() / self.ahb.divisor()
    }

    pub const fn pclk1_hz(&self) -> u32 {
        self.hclk_hz() / self.apb1.divisor()
    }

    pub const fn pclk2_hz(&self) -> u32 {
        self.hclk_hz() / self.apb2.divisor()
    }

    /// TIM3 clock (APB1 timers)
    pub const fn timer_clock_hz(&self) -> u32 {
        self.apb1.timer_clock(self.pclk1_hz())
    }

    pub const fn validate(&self) -> Result<(), ClockError> {
        if self.pllmul < 2 || self.pllmul > 16 {
            return Err(ClockError::PllFactor);
        }
        if self.sysclk_hz() < PLL_OUT_MIN_HZ {
            return Err(ClockError::VcoRange);
        }
        if self.sysclk_hz() > SYSCLK_MAX_HZ {
            return Err(ClockError::SysclkTooHigh);
        }
        if self.pclk1_hz() > PCLK1_MAX_HZ || self.pclk2_hz() > PCLK2_MAX_HZ {
            return Err(ClockError::BusClockTooHigh);
        }
        match min_flash_latency(self.hclk_hz(), &FLASH_LATENCY_STEPS) {
            Some(min) if min <= self.flash_latency => Ok(()),
            _ => Err(ClockError::FlashLatency),
        }
    }

    /// Return the configuration if valid, otherwise fail const evaluation
    pub const fn checked(self) -> Self {
        match self.validate() {
            Ok(()) => self,
            Err(ClockError::PllFactor) => panic!("PLL multiplier out of range"),
            Err(ClockError::VcoRange) => panic!("PLL output below 16 MHz"),
            Err(ClockError::SysclkTooHigh) => panic!("SYSCLK above chip maximum"),
            Err(ClockError::BusClockTooHigh) => panic!("APB clock above maximum"),
            Err(ClockError::FlashLatency) => panic!("flash latency too small for HCLK"),
        }
    }

    /// PLLSRC, PLLXTPRE and PLLMUL as they sit in CFGR
    ///
    /// PLLSRC clear selects HSI/2. PLLMUL stores the factor minus 2; x16
    /// has two encodings and the lower one is used.
    pub const fn pll_bits(&self) -> u32 {
        (self.pllmul as u32 - 2) << 18
    }
}

const PLL_FIELDS: u32 = rcc::CFGR_PLLSRC | rcc::CFGR_PLLXTPRE | rcc::CFGR_PLLMUL;
const APB_FIELDS: u32 = rcc::CFGR_PPRE1 | rcc::CFGR_PPRE2;
const APB_SAFE: u32 = ApbPrescaler::Div16.bits();

/// The RCC and flash registers bring-up writes
pub struct ClockTree<'a, R: Register> {
    rcc: &'a Rcc<R>,
    flash: &'a Flash<R>,
}

impl ClockTree<'static, Volatile> {
    #[allow(unsafe_code)]
    pub fn hardware() -> Self {
        // SAFETY: fixed MMIO addresses; access goes through `Register` only.
        unsafe { Self::new(pac::rcc(), pac::flash()) }
    }
}

impl<'a, R: Register> ClockTree<'a, R> {
    pub const fn new(rcc: &'a Rcc<R>, flash: &'a Flash<R>) -> Self {
        Self { rcc, flash }
    }

    /// Switch SYSCLK to the PLL as described by `config`
    ///
    /// Runs once, before anything that depends on a clock frequency. The
    /// order of the steps is fixed.
    pub fn bring_up(&self, config: &ClockConfig) {
        let rcc = self.rcc;

        ClockGate::new(&rcc.apb2enr, rcc::APB2ENR_AFIOEN).enable();
        ClockGate::new(&rcc.apb1enr, rcc::APB1ENR_PWREN).enable();

        let latency = u32::from(config.flash_latency);
        self.flash.acr.write_field(
            flash::ACR_LATENCY | flash::ACR_PRFTBE,
            latency | flash::ACR_PRFTBE,
        );
        wait_for_field(&self.flash.acr, flash::ACR_LATENCY, latency);

        rcc.cr.set_bits(rcc::CR_HSION);
        wait_for(&rcc.cr, rcc::CR_HSIRDY);
        #[cfg(feature = "defmt")]
        defmt::debug!("HSI ready");

        rcc.cfgr.write_field(PLL_FIELDS, config.pll_bits());
        rcc.cr.set_bits(rcc::CR_PLLON);
        wait_for(&rcc.cr, rcc::CR_PLLRDY);
        #[cfg(feature = "defmt")]
        defmt::debug!("PLL locked at {=u32} Hz", config.sysclk_hz());

        // APB1 tops out at 36 MHz; hold both buses at /16 across the switch
        rcc.cfgr.write_field(
            rcc::CFGR_HPRE | APB_FIELDS,
            config.ahb.bits() << 4 | APB_SAFE << 8 | APB_SAFE << 11,
        );

        rcc.cfgr.write_field(rcc::CFGR_SW, rcc::SW_PLL);
        wait_for_field(&rcc.cfgr, rcc::CFGR_SWS, rcc::SW_PLL << 2);

        rcc.cfgr.write_field(
            APB_FIELDS,
            config.apb1.bits() << 8 | config.apb2.bits() << 11,
        );

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "SYSCLK {=u32} Hz, PCLK1 {=u32} Hz, PCLK2 {=u32} Hz",
            config.sysclk_hz(),
            config.pclk1_hz(),
            config.pclk2_hz()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_hal::mock::MockRegister;

    #[test]
    fn test_default_frequencies() {
        let config = ClockConfig::DEFAULT;
        assert_eq!(config.sysclk_hz(), 64_000_000);
        assert_eq!(config.hclk_hz(), 64_000_000);
        assert_eq!(config.pclk1_hz(), 32_000_000);
        assert_eq!(config.pclk2_hz(), 64_000_000);
        assert_eq!(config.timer_clock_hz(), 64_000_000);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_pll_bits() {
        assert_eq!(ClockConfig::DEFAULT.pll_bits(), 0b1110 << 18);
        assert_eq!(ClockConfig { pllmul: 9, ..ClockConfig::DEFAULT }.pll_bits(), 0b0111 << 18);
    }

    #[test]
    fn test_validate_rejects() {
        let base = ClockConfig::DEFAULT;
        assert_eq!(
            ClockConfig { pllmul: 17, ..base }.validate(),
            Err(ClockError::PllFactor)
        );
        assert_eq!(
            ClockConfig { pllmul: 3, ..base }.validate(),
            Err(ClockError::VcoRange)
        );
        assert_eq!(
            ClockConfig { apb1: ApbPrescaler::Div1, ..base }.validate(),
            Err(ClockError::BusClockTooHigh)
        );
        assert_eq!(
            ClockConfig { flash_latency: 1, ..base }.validate(),
            Err(ClockError::FlashLatency)
        );
    }

    #[test]
    fn test_bring_up_ordering() {
        let rcc = Rcc::mock();
        let flash = Flash::<MockRegister>::default();
        ClockTree::new(&rcc, &flash).bring_up(&ClockConfig::DEFAULT);

        let afio = rcc
            .apb2enr
            .first_write_where(|v| v & rcc::APB2ENR_AFIOEN != 0)
            .unwrap();
        let pwr = rcc
            .apb1enr
            .first_write_where(|v| v & rcc::APB1ENR_PWREN != 0)
            .unwrap();
        let latency = flash.acr.first_write_where(|v| v & 0b111 == 2).unwrap();
        let hsi = rcc
            .cr
            .first_write_where(|v| v & rcc::CR_HSION != 0)
            .unwrap();
        let pll_on = rcc
            .cr
            .first_write_where(|v| v & rcc::CR_PLLON != 0)
            .unwrap();

        // PLL factors, HPRE with APB held at /16, SW, PPRE1/PPRE2
        let cfgr = rcc.cfgr.writes();
        assert_eq!(cfgr.len(), 4);
        assert_eq!(cfgr[0].value & PLL_FIELDS, 0b1110 << 18);

        assert!(afio < pwr);
        assert!(pwr < latency);
        assert!(latency < hsi);
        assert!(hsi < cfgr[0].seq);
        assert!(cfgr[0].seq < pll_on);
        assert!(pll_on < cfgr[1].seq);
        assert!(cfgr[1].seq < cfgr[2].seq);
        assert!(cfgr[2].seq < cfgr[3].seq);
    }

    /// Divisor encoded in a PPRE field
    fn apb_divisor(field: u32) -> u32 {
        if field & 0b100 == 0 {
            1
        } else {
            1 << ((field & 0b11) + 1)
        }
    }

    #[test]
    fn test_apb_within_limits_across_switch() {
        let rcc = Rcc::mock();
        let flash = Flash::<MockRegister>::default();
        ClockTree::new(&rcc, &flash).bring_up(&ClockConfig::DEFAULT);

        let writes = rcc.cfgr.writes();
        let switch = writes
            .iter()
            .find(|w| w.value & rcc::CFGR_SW == rcc::SW_PLL)
            .unwrap();
        let hclk = ClockConfig::DEFAULT.sysclk_hz() / ahb_divisor(switch.value);
        let pclk1 = hclk / apb_divisor((switch.value & rcc::CFGR_PPRE1) >> 8);
        let pclk2 = hclk / apb_divisor((switch.value & rcc::CFGR_PPRE2) >> 11);

        assert!(pclk1 <= PCLK1_MAX_HZ, "PCLK1 {} Hz at the switch", pclk1);
        assert!(pclk2 <= PCLK2_MAX_HZ);

        // Every write after the switch keeps APB1 in range too
        for write in writes.iter().filter(|w| w.seq > switch.seq) {
            let ppre1 = (write.value & rcc::CFGR_PPRE1) >> 8;
            assert!(hclk / apb_divisor(ppre1) <= PCLK1_MAX_HZ);
        }
    }

    /// Divisor encoded in the HPRE field, up to /16
    fn ahb_divisor(cfgr: u32) -> u32 {
        let hpre = (cfgr & rcc::CFGR_HPRE) >> 4;
        if hpre & 0b1000 == 0 {
            1
        } else {
            1 << ((hpre & 0b111) + 1)
        }
    }

    #[test]
    fn test_bring_up_final_state() {
        let rcc = Rcc::mock();
        let flash = Flash::<MockRegister>::default();
        // PLLMUL left at x9 and PLLSRC at HSE by a bootloader
        rcc.cfgr.poke(rcc::CFGR_PLLSRC | 0b0111 << 18);

        ClockTree::new(&rcc, &flash).bring_up(&ClockConfig::DEFAULT);

        assert_eq!(flash.acr.raw(), 2 | flash::ACR_PRFTBE);
        assert!(rcc.cr.has_bits(rcc::CR_PLLRDY));

        let cfgr = rcc.cfgr.get();
        assert_eq!(cfgr & PLL_FIELDS, 0b1110 << 18);
        assert_eq!(cfgr & rcc::CFGR_SWS, rcc::SW_PLL << 2);
        assert_eq!(cfgr & rcc::CFGR_HPRE, 0);
        assert_eq!(cfgr & rcc::CFGR_PPRE1, 0b100 << 8);
        assert_eq!(cfgr & rcc::CFGR_PPRE2, 0);
    }
}
