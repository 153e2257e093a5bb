//! GPIO for STM32G07x
//!
//! Each pin owns a 2-bit field in MODER, OSPEEDR and PUPDR and one bit in
//! OTYPER. Modes are encoded as a byte: the low two bits are the MODER
//! value and bit 4 selects open-drain.

use kairos_hal::pin::MAX_PORTS;
use kairos_hal::{fatal, ClockGate, FatalError, Mode, Pin, PinConfig, PinDriver, Pull, Speed};
use kairos_hal::{Register, Volatile};

use crate::pac::{self, Port, Rcc};

/// Mode byte for each requested mode
pub const fn mode_bits(mode: Mode) -> u8 {
    match mode {
        Mode::Input => 0x00,
        Mode::OutputPushPull => 0x01,
        Mode::OutputOpenDrain => 0x11,
        Mode::AltPushPull => 0x02,
        Mode::AltOpenDrain => 0x12,
        Mode::Analog => 0x03,
    }
}

/// PUPDR field value
pub const fn pull_bits(pull: Pull) -> u32 {
    match pull {
        Pull::None => 0b00,
        Pull::Up => 0b01,
        Pull::Down => 0b10,
    }
}

/// OSPEEDR value for driven pins unless a speed is requested
pub const SPEED_HIGH: u32 = 0b10;

/// OSPEEDR field value
pub const fn speed_bits(speed: Option<Speed>) -> u32 {
    match speed {
        Some(Speed::Low) => 0b00,
        Some(Speed::Medium) => 0b01,
        Some(Speed::High) | None => SPEED_HIGH,
    }
}

const MODER_MASK: u32 = 0b11;
const OTYPER_OPEN_DRAIN: u8 = 0x10;

/// Whether the chip has GPIO port `port`
pub const fn has_port(port: u8) -> bool {
    (port as usize) < pac::GPIO_BASES.len() && pac::GPIO_BASES[port as usize].is_some()
}

/// GPIO driver over the RCC port gates and the port register blocks
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

    /// IOPENR gate for the pin's port
    fn gate(&self, pin: Pin) -> ClockGate<'a, R> {
        ClockGate::new(&self.rcc.iopenr, 1 << pin.port())
    }
}

impl<R: Register> PinDriver for Gpio<'_, R> {
    fn configure(&self, pin: Pin, config: PinConfig) {
        let port = self.resolve(pin);
        self.gate(pin).enable();

        let offset = u32::from(pin.offset());
        let shift = offset * 2;
        let field = MODER_MASK << shift;
        let bits = mode_bits(config.mode);

        port.moder
            .write_field(field, (u32::from(bits) & MODER_MASK) << shift);
        if config.mode.is_output() {
            port.ospeedr
                .write_field(field, speed_bits(config.speed) << shift);
            port.otyper.write_field(
                pin.mask(),
                u32::from(bits & OTYPER_OPEN_DRAIN != 0) << offset,
            );
        }
        port.pupdr.write_field(field, pull_bits(config.pull) << shift);

        #[cfg(feature = "defmt")]
        defmt::trace!("{} configured as {}", pin, config);
    }

    fn set(&self, pin: Pin, high: bool) {
        let port = self.resolve(pin);
        if high {
            port.bsrr.set(pin.mask());
        } else {
            port.brr.set(pin.mask());
        }
    }

    fn get(&self, pin: Pin) -> bool {
        self.resolve(pin).idr.has_bits(pin.mask())
    }
}
