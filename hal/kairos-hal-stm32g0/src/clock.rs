//! Clock-tree bring-up for STM32G07x
//!
//! HSI16 feeds the PLL; PLLRCLK becomes SYSCLK. The default configuration
//! gives 64 MHz on SYSCLK, HCLK, PCLK and the TIM3 kernel clock.

use kairos_hal::clock::{
    min_flash_latency, wait_for, wait_for_field, AhbPrescaler, ApbPrescaler, ClockError,
};
use kairos_hal::{ClockGate, Register, Volatile};

use crate::pac::{self, flash, rcc, Flash, Rcc};

/// HSI16 oscillator frequency
pub const HSI_HZ: u32 = 16_000_000;

/// SYSCLK ceiling in voltage range 1
pub const SYSCLK_MAX_HZ: u32 = 64_000_000;

/// Highest HCLK for 0, 1 and 2 flash wait states (range 1)
pub const FLASH_LATENCY_STEPS: [u32; 3] = [24_000_000, 48_000_000, 64_000_000];

const VCO_IN_MIN_HZ: u32 = 2_660_000;
const VCO_IN_MAX_HZ: u32 = 16_000_000;
const VCO_MIN_HZ: u32 = 64_000_000;
const VCO_MAX_HZ: u32 = 344_000_000;

/// PLL factors, bus prescalers and flash latency
///
/// Factors are the real divisors and multiplier, not register values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ClockConfig {
    /// PLLM input divider, 1..=8
    pub pllm: u8,
    /// PLLN VCO multiplier, 8..=86
    pub plln: u8,
    /// PLLR output divider, 2..=8
    pub pllr: u8,
    pub ahb: AhbPrescaler,
    pub apb: ApbPrescaler,
    pub flash_latency: u8,
}

impl ClockConfig {
    /// 16 MHz / 1 * 8 / 2 = 64 MHz, buses undivided, 2 wait states
    pub const DEFAULT: ClockConfig = ClockConfig {
        pllm: 1,
        plln: 8,
        pllr: 2,
        ahb: AhbPrescaler::Div1,
        apb: ApbPrescaler::Div1,
        flash_latency: 2,
    };

    pub const fn vco_hz(&self) -> u32 {
        HSI_HZ / self.pllm as u32 * self.plln as u32
    }

    pub const fn sysclk_hz(&self) -> u32 {
        self.vco_hz() / self.pllr as u32
    }

    pub const fn hclk_hz(&self) -> u32 {
        self.sysclk_hz() / self.ahb.divisor()
    }

    pub const fn pclk_hz(&self) -> u32 {
        self.hclk_hz() / self.apb.divisor()
    }

    /// TIM3 kernel clock
    pub const fn timer_clock_hz(&self) -> u32 {
        self.apb.timer_clock(self.pclk_hz())
    }

    pub const fn validate(&self) -> Result<(), ClockError> {
        if self.pllm < 1 || self.pllm > 8 || self.plln < 8 || self.plln > 86 {
            return Err(ClockError::PllFactor);
        }
        if self.pllr < 2 || self.pllr > 8 {
            return Err(ClockError::PllFactor);
        }
        let vco_in = HSI_HZ / self.pllm as u32;
        if vco_in < VCO_IN_MIN_HZ || vco_in > VCO_IN_MAX_HZ {
            return Err(ClockError::VcoRange);
        }
        if self.vco_hz() < VCO_MIN_HZ || self.vco_hz() > VCO_MAX_HZ {
            return Err(ClockError::VcoRange);
        }
        if self.sysclk_hz() > SYSCLK_MAX_HZ {
            return Err(ClockError::SysclkTooHigh);
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
            Err(ClockError::PllFactor) => panic!("PLL factor out of range"),
            Err(ClockError::VcoRange) => panic!("PLL VCO frequency out of range"),
            Err(ClockError::SysclkTooHigh) => panic!("SYSCLK above chip maximum"),
            Err(ClockError::BusClockTooHigh) => panic!("bus clock above maximum"),
            Err(ClockError::FlashLatency) => panic!("flash latency too small for HCLK"),
        }
    }

    /// PLLSRC, PLLM, PLLN and PLLR as they sit in PLLCFGR
    pub const fn pllcfgr_bits(&self) -> u32 {
        rcc::PLLSRC_HSI16
            | (self.pllm as u32 - 1) << 4
            | (self.plln as u32) << 8
            | (self.pllr as u32 - 1) << 29
    }
}

const PLLCFGR_FIELDS: u32 =
    rcc::PLLCFGR_PLLSRC | rcc::PLLCFGR_PLLM | rcc::PLLCFGR_PLLN | rcc::PLLCFGR_PLLR;

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
    /// Runs once, before anything that depends on a clock frequency. Each
    /// step waits for the hardware to confirm the previous one; the order
    /// cannot change.
    pub fn bring_up(&self, config: &ClockConfig) {
        let rcc = self.rcc;

        ClockGate::new(&rcc.apbenr2, rcc::APBENR2_SYSCFGEN).enable();
        ClockGate::new(&rcc.apbenr1, rcc::APBENR1_PWREN).enable();

        // Wait states before the clock goes up
        let latency = u32::from(config.flash_latency);
        self.flash.acr.write_field(flash::ACR_LATENCY, latency);
        wait_for_field(&self.flash.acr, flash::ACR_LATENCY, latency);

        rcc.cr.set_bits(rcc::CR_HSION);
        wait_for(&rcc.cr, rcc::CR_HSIRDY);
        #[cfg(feature = "defmt")]
        defmt::debug!("HSI16 ready");

        rcc.pllcfgr.write_field(PLLCFGR_FIELDS, config.pllcfgr_bits());
        rcc.cr.set_bits(rcc::CR_PLLON);
        rcc.pllcfgr.set_bits(rcc::PLLCFGR_PLLREN);
        wait_for(&rcc.cr, rcc::CR_PLLRDY);
        #[cfg(feature = "defmt")]
        defmt::debug!("PLL locked at {=u32} Hz", config.sysclk_hz());

        rcc.cfgr.write_field(rcc::CFGR_HPRE, config.ahb.bits() << 8);

        rcc.cfgr.write_field(rcc::CFGR_SW, rcc::SW_PLLRCLK);
        wait_for_field(&rcc.cfgr, rcc::CFGR_SWS, rcc::SW_PLLRCLK << 3);

        rcc.cfgr.write_field(rcc::CFGR_PPRE, config.apb.bits() << 12);

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "SYSCLK {=u32} Hz, HCLK {=u32} Hz, PCLK {=u32} Hz",
            config.sysclk_hz(),
            config.hclk_hz(),
            config.pclk_hz()
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
        assert_eq!(config.vco_hz(), 128_000_000);
        assert_eq!(config.sysclk_hz(), 64_000_000);
        assert_eq!(config.hclk_hz(), 64_000_000);
        assert_eq!(config.pclk_hz(), 64_000_000);
        assert_eq!(config.timer_clock_hz(), 64_000_000);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_default_pllcfgr_bits() {
        // SRC = HSI16, M = /1, N = 8, R = /2
        assert_eq!(ClockConfig::DEFAULT.pllcfgr_bits(), 0x2000_0802);
    }

    #[test]
    fn test_validate_rejects() {
        let base = ClockConfig::DEFAULT;
        assert_eq!(
            ClockConfig { plln: 87, ..base }.validate(),
            Err(ClockError::PllFactor)
        );
        assert_eq!(
            ClockConfig { pllr: 1, ..base }.validate(),
            Err(ClockError::PllFactor)
        );
        // 16 MHz * 24 = 384 MHz VCO
        assert_eq!(
            ClockConfig { plln: 24, pllr: 8, ..base }.validate(),
            Err(ClockError::VcoRange)
        );
        // 16 * 10 / 2 = 80 MHz
        assert_eq!(
            ClockConfig { plln: 10, ..base }.validate(),
            Err(ClockError::SysclkTooHigh)
        );
        assert_eq!(
            ClockConfig { flash_latency: 1, ..base }.validate(),
            Err(ClockError::FlashLatency)
        );
        // 32 MHz HCLK is fine with 1 wait state
        assert_eq!(
            ClockConfig { ahb: AhbPrescaler::Div2, flash_latency: 1, ..base }.validate(),
            Ok(())
        );
    }

    #[test]
    fn test_bring_up_ordering() {
        let rcc = Rcc::mock();
        let flash = Flash::<MockRegister>::default();
        ClockTree::new(&rcc, &flash).bring_up(&ClockConfig::DEFAULT);

        let gates = rcc
            .apbenr2
            .first_write_where(|v| v & rcc::APBENR2_SYSCFGEN != 0)
            .unwrap();
        let pwr = rcc
            .apbenr1
            .first_write_where(|v| v & rcc::APBENR1_PWREN != 0)
            .unwrap();
        let latency = flash.acr.first_write_where(|v| v & 0b111 == 2).unwrap();
        let hsi = rcc
            .cr
            .first_write_where(|v| v & rcc::CR_HSION != 0)
            .unwrap();
        let pll_cfg = rcc
            .pllcfgr
            .first_write_where(|v| v & PLLCFGR_FIELDS == 0x2000_0802)
            .unwrap();
        let pll_on = rcc
            .cr
            .first_write_where(|v| v & rcc::CR_PLLON != 0)
            .unwrap();
        let writes = rcc.cfgr.writes();
        assert_eq!(writes.len(), 3);
        let (hpre, sw, ppre) = (writes[0].seq, writes[1].seq, writes[2].seq);

        assert!(gates < pwr);
        assert!(pwr < latency);
        assert!(latency < hsi);
        assert!(hsi < pll_cfg);
        assert!(pll_cfg < pll_on);
        assert!(pll_on < hpre);
        assert!(hpre < sw);
        assert!(sw < ppre);
        assert!(latency < sw);
    }

    #[test]
    fn test_bring_up_final_state() {
        let rcc = Rcc::mock();
        let flash = Flash::<MockRegister>::default();
        ClockTree::new(&rcc, &flash).bring_up(&ClockConfig::DEFAULT);

        assert!(rcc.cr.has_bits(rcc::CR_HSIRDY));
        assert!(rcc.cr.has_bits(rcc::CR_PLLRDY));
        assert_eq!(flash.acr.raw() & flash::ACR_LATENCY, 2);

        let pllcfgr = rcc.pllcfgr.raw();
        assert_eq!(pllcfgr & rcc::PLLCFGR_PLLSRC, rcc::PLLSRC_HSI16);
        assert_eq!((pllcfgr & rcc::PLLCFGR_PLLM) >> 4, 0);
        // Reset value had PLLN = 16
        assert_eq!((pllcfgr & rcc::PLLCFGR_PLLN) >> 8, 8);
        assert_eq!((pllcfgr & rcc::PLLCFGR_PLLR) >> 29, 1);
        assert!(pllcfgr & rcc::PLLCFGR_PLLREN != 0);

        let cfgr = rcc.cfgr.get();
        assert_eq!(cfgr & rcc::CFGR_SW, rcc::SW_PLLRCLK);
        assert_eq!(cfgr & rcc::CFGR_SWS, rcc::SW_PLLRCLK << 3);
        assert_eq!(cfgr & (rcc::CFGR_HPRE | rcc::CFGR_PPRE), 0);
    }
}
