//! GPIO for STM32F103
//!
//! Each pin owns a 4-bit `CNF[1:0]:MODE[1:0]` nibble, in CRL for offsets
//! 0-7 and CRH for 8-15. There is no pull register: a pulled input uses the
//! pull-capable input mode and the ODR bit picks the direction. Driven pins
//! default to the 2 MHz output mode.

use kairos_hal::pin::MAX_PORTS;
use kairos_hal::{fatal, ClockGate, FatalError, Mode, Pin, PinConfig, PinDriver, Pull, Speed};
use kairos_hal::{Register, Volatile};

use crate::pac::{self, rcc, Port, Rcc};

/// MODE[1:0] for a driven pin
pub const fn output_mode(speed: Option<Speed>) -> u32 {
    match speed {
        Some(Speed::Medium) => 0b01,
        Some(Speed::Low) | None => 0b10,
        Some(Speed::High) => 0b11,
    }
}

/// CNF:MODE nibble for a mode, pull and output speed
pub const fn nibble(mode: Mode, pull: Pull, speed: Option<Speed>) -> u32 {
    let cnf = match mode {
        Mode::Input => match pull {
            Pull::None => 0b01,
            Pull::Up | Pull::Down => 0b10,
        },
        Mode::Analog | Mode::OutputPushPull => 0b00,
        Mode::OutputOpenDrain => 0b01,
        Mode::AltPushPull => 0b10,
        Mode::AltOpenDrain => 0b11,
    };
    if mode.is_output() {
        (cnf << 2) | output_mode(speed)
    } else {
        cnf << 2
    }
}

const NIBBLE_MASK: u32 = 0b1111;

/// Whether the chip has GPIO port `port`
pub const fn has_port(port: u8) -> bool {
    (port as usize) < pac::GPIO_BASES.len() && pac::GPIO_BASES[port as usize].is_some()
}

/// GPIO driver over the APB2 port gates and the port register blocks
pub struct Gpio<'a, R: Register> {
    rcc: &'a Rcc<R>,
    ports: [Option<&'a Port<R>>; MAX_PORTS as usize],
}

impl Gpio<'static, Volatile> {
    /// Driver over the real peripherals
    #[allow(unsafe_code)]
    pub fn hardware() -> Self {
        // SAFETY: fixed MMIO addresses; access goes through `Register` only.
        unsafe {
            Self::new(
                pac::rcc(),
                core::array::from_fn(|index| pac::port(index)),
            )
        }
    }
}

impl<'a, R: Register> Gpio<'a, R> {
    pub const fn new(rcc: &'a Rcc<R>, ports: [Option<&'a Port<R>>; MAX_PORTS as usize]) -> Self {
        Self { rcc, ports }
    }

    /// Port registers for `pin`
    pub fn try_resolve(&self, pin: Pin) -> Result<&'a Port<R>, FatalError> {
        if pin.is_none() {
            return Err(FatalError::NoPin);
        }
        self.ports
            .get(pin.port() as usize)
            .copied()
            .flatten()
            .ok_or(FatalError::UnknownPort(pin))
    }

    fn resolve(&self, pin: Pin) -> &'a Port<R> {
        self.try_resolve(pin).unwrap_or_else(|err| fatal(err))
    }

    /// APB2ENR gate for the pin's port
    fn gate(&self, pin: Pin) -> ClockGate<'a, R> {
        ClockGate::new(&self.rcc.apb2enr, rcc::APB2ENR_IOPAEN << pin.port())
    }
}

impl<R: Register> PinDriver for Gpio<'_, R> {
    fn configure(&self, pin: Pin, config: PinConfig) {
        let port = self.resolve(pin);
        self.gate(pin).enable();

        let offset = pin.offset();
        let control = if offset < 8 { &port.crl } else { &port.crh };
        let shift = u32::from(offset % 8) * 4;
        control.write_field(
            NIBBLE_MASK << shift,
            nibble(config.mode, config.pull, config.speed) << shift,
        );

        if config.mode == Mode::Input {
            match config.pull {
                Pull::Up => port.bsrr.set(pin.mask()),
                Pull::Down => port.bsrr.set(pin.mask() << 16),
                Pull::None => {}
            }
        }

        #[cfg(feature = "defmt")]
        defmt::trace!("{} configured as {}", pin, config);
    }

    fn set(&self, pin: Pin, high: bool) {
        let port = self.resolve(pin);
        if high {
            port.bsrr.set(pin.mask());
        } else {
            port.bsrr.set(pin.mask() << 16);
        }
    }

    fn get(&self, pin: Pin) -> bool {
        self.resolve(pin).idr.has_bits(pin.mask())
    }
}
