//! GPIO pin abstractions
//!
//! [`PinDriver`] is the contract every chip variant implements: configure a
//! pin, drive it, read it. The mode and pull requested here are symbolic;
//! each variant owns the table that turns them into register bits.

use core::convert::Infallible;

use crate::pin::Pin;

/// Requested pin mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Digital input
    Input,
    /// General-purpose output, push-pull
    OutputPushPull,
    /// General-purpose output, open-drain
    OutputOpenDrain,
    /// Alternate function, push-pull
    AltPushPull,
    /// Alternate function, open-drain
    AltOpenDrain,
    /// Analog (ADC/DAC, lowest leakage)
    Analog,
}

impl Mode {
    /// Every mode, for table-driven code and tests
    pub const ALL: [Mode; 6] = [
        Mode::Input,
        Mode::OutputPushPull,
        Mode::OutputOpenDrain,
        Mode::AltPushPull,
        Mode::AltOpenDrain,
        Mode::Analog,
    ];

    /// Check if the pin drives its line in this mode
    pub const fn is_output(self) -> bool {
        matches!(
            self,
            Mode::OutputPushPull | Mode::OutputOpenDrain | Mode::AltPushPull | Mode::AltOpenDrain
        )
    }

    /// Check if the output stage is open-drain
    pub const fn is_open_drain(self) -> bool {
        matches!(self, Mode::OutputOpenDrain | Mode::AltOpenDrain)
    }
}

/// Requested pull resistor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pull {
    /// Floating
    #[default]
    None,
    /// Pull-up
    Up,
    /// Pull-down
    Down,
}

impl Pull {
    pub const ALL: [Pull; 3] = [Pull::None, Pull::Up, Pull::Down];
}

/// Output slew rate for driven pins
///
/// Each variant maps these onto its own speed encoding. Ignored for inputs
/// and analog pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Speed {
    Low,
    Medium,
    High,
}

impl Speed {
    pub const ALL: [Speed; 3] = [Speed::Low, Speed::Medium, Speed::High];
}

/// Pin configuration request
///
/// Only consulted during [`PinDriver::configure`]; nothing keeps it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PinConfig {
    pub mode: Mode,
    pub pull: Pull,
    /// `None` leaves the choice to the variant's default for the mode
    pub speed: Option<Speed>,
}

impl PinConfig {
    /// Push-pull output, no pull
    pub const OUTPUT: PinConfig = PinConfig::new(Mode::OutputPushPull, Pull::None);
    /// Floating input
    pub const INPUT: PinConfig = PinConfig::new(Mode::Input, Pull::None);
    /// Input with pull-up
    pub const INPUT_PULL_UP: PinConfig = PinConfig::new(Mode::Input, Pull::Up);
    /// Input with pull-down
    pub const INPUT_PULL_DOWN: PinConfig = PinConfig::new(Mode::Input, Pull::Down);
    /// Analog
    pub const ANALOG: PinConfig = PinConfig::new(Mode::Analog, Pull::None);

    pub const fn new(mode: Mode, pull: Pull) -> Self {
        Self {
            mode,
            pull,
            speed: None,
        }
    }

    /// Same request with an explicit output speed
    pub const fn with_speed(self, speed: Speed) -> Self {
        Self {
            speed: Some(speed),
            ..self
        }
    }
}

/// Pin control contract
///
/// Implemented once per chip variant over that variant's register layout.
/// All methods end in [`fatal`](crate::fatal) if the pin's port does not
/// exist on the chip.
///
/// `set` and `get` do not check how the pin is configured. Driving an input
/// or reading an analog pin is the caller's mistake to avoid.
pub trait PinDriver {
    /// Enable the port clock and program the pin's mode and pull
    ///
    /// Only the bit-fields belonging to `pin` change; other pins sharing the
    /// same registers keep their configuration.
    fn configure(&self, pin: Pin, config: PinConfig);

    /// Drive the pin high or low with one write to a set/reset register
    fn set(&self, pin: Pin, high: bool);

    /// Read the pin's input level
    fn get(&self, pin: Pin) -> bool;

    /// Drive the pin high
    fn high(&self, pin: Pin) {
        self.set(pin, true);
    }

    /// Drive the pin low
    fn low(&self, pin: Pin) {
        self.set(pin, false);
    }

    /// Bind a pin to this driver
    fn pin(&self, pin: Pin) -> PinHandle<'_, Self>
    where
        Self: Sized,
    {
        PinHandle::new(self, pin)
    }
}

/// Digital output pin
pub trait OutputPin {
    /// Set the pin high (logic 1)
    fn set_high(&mut self);

    /// Set the pin low (logic 0)
    fn set_low(&mut self);

    /// Set the pin to a specific state
    fn set_state(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
    }
}

/// Digital input pin
pub trait InputPin {
    /// Check if the pin reads high (logic 1)
    fn is_high(&self) -> bool;

    /// Check if the pin reads low (logic 0)
    fn is_low(&self) -> bool {
        !self.is_high()
    }
}

/// A pin bound to the driver that controls it
///
/// Gives the pin-first API higher layers use (`led.configure(..)`,
/// `led.high()`) and adapts to the `embedded-hal` digital traits.
pub struct PinHandle<'a, D: PinDriver> {
    driver: &'a D,
    pin: Pin,
}

impl<D: PinDriver> Clone for PinHandle<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D: PinDriver> Copy for PinHandle<'_, D> {}

impl<'a, D: PinDriver> PinHandle<'a, D> {
    pub fn new(driver: &'a D, pin: Pin) -> Self {
        Self { driver, pin }
    }

    /// The pin this handle controls
    pub fn id(&self) -> Pin {
        self.pin
    }

    pub fn configure(&self, config: PinConfig) {
        self.driver.configure(self.pin, config);
    }

    pub fn set(&self, high: bool) {
        self.driver.set(self.pin, high);
    }

    pub fn get(&self) -> bool {
        self.driver.get(self.pin)
    }

    pub fn high(&self) {
        self.driver.high(self.pin);
    }

    pub fn low(&self) {
        self.driver.low(self.pin);
    }
}

impl<D: PinDriver> OutputPin for PinHandle<'_, D> {
    fn set_high(&mut self) {
        self.high();
    }

    fn set_low(&mut self) {
        self.low();
    }
}

impl<D: PinDriver> InputPin for PinHandle<'_, D> {
    fn is_high(&self) -> bool {
        self.get()
    }
}

impl<D: PinDriver> embedded_hal::digital::ErrorType for PinHandle<'_, D> {
    type Error = Infallible;
}

impl<D: PinDriver> embedded_hal::digital::OutputPin for PinHandle<'_, D> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.low();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high();
        Ok(())
    }
}

impl<D: PinDriver> embedded_hal::digital::InputPin for PinHandle<'_, D> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.get())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.get())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pin::PORT_A;
    use core::cell::Cell;

    /// Records the last call so the provided methods can be checked
    #[derive(Default)]
    struct Recorder {
        level: Cell<Option<(Pin, bool)>>,
        config: Cell<Option<(Pin, PinConfig)>>,
    }

    impl PinDriver for Recorder {
        fn configure(&self, pin: Pin, config: PinConfig) {
            self.config.set(Some((pin, config)));
        }

        fn set(&self, pin: Pin, high: bool) {
            self.level.set(Some((pin, high)));
        }

        fn get(&self, pin: Pin) -> bool {
            matches!(self.level.get(), Some((p, true)) if p == pin)
        }
    }

    #[test]
    fn test_high_and_low_forward_to_set() {
        let driver = Recorder::default();
        let pin = Pin::new(PORT_A, 5);

        driver.high(pin);
        assert_eq!(driver.level.get(), Some((pin, true)));

        driver.low(pin);
        assert_eq!(driver.level.get(), Some((pin, false)));
    }

    #[test]
    fn test_handle_forwards_to_driver() {
        let driver = Recorder::default();
        let pin = Pin::new(PORT_A, 9);
        let led = driver.pin(pin);

        led.configure(PinConfig::OUTPUT);
        assert_eq!(driver.config.get(), Some((pin, PinConfig::OUTPUT)));

        led.high();
        assert!(led.get());
        led.low();
        assert!(!led.get());
        assert_eq!(led.id(), pin);
    }

    #[test]
    fn test_handle_embedded_hal_traits() {
        use embedded_hal::digital::{InputPin as HalInput, OutputPin as HalOutput};

        let driver = Recorder::default();
        let mut handle = driver.pin(Pin::new(PORT_A, 0));

        HalOutput::set_high(&mut handle).unwrap();
        assert_eq!(HalInput::is_high(&mut handle), Ok(true));
        HalOutput::set_low(&mut handle).unwrap();
        assert_eq!(HalInput::is_low(&mut handle), Ok(true));
    }

    #[test]
    fn test_handle_writes_are_infallible() {
        fn blink<P: embedded_hal::digital::OutputPin<Error = Infallible>>(pin: &mut P) {
            pin.set_high().unwrap_or_else(|never| match never {});
            pin.set_low().unwrap_or_else(|never| match never {});
        }

        let driver = Recorder::default();
        let pin = Pin::new(PORT_A, 4);
        blink(&mut driver.pin(pin));
        assert_eq!(driver.level.get(), Some((pin, false)));
    }

    #[test]
    fn test_set_state() {
        let driver = Recorder::default();
        let mut handle = driver.pin(Pin::new(PORT_A, 1));

        OutputPin::set_state(&mut handle, true);
        assert!(InputPin::is_high(&handle));
        OutputPin::set_state(&mut handle, false);
        assert!(InputPin::is_low(&handle));
    }

    #[test]
    fn test_with_speed_keeps_mode_and_pull() {
        let config = PinConfig::new(Mode::AltPushPull, Pull::Up).with_speed(Speed::Medium);

        assert_eq!(config.mode, Mode::AltPushPull);
        assert_eq!(config.pull, Pull::Up);
        assert_eq!(config.speed, Some(Speed::Medium));
        assert_eq!(PinConfig::OUTPUT.speed, None);
    }

    #[test]
    fn test_mode_classification() {
        assert!(Mode::OutputPushPull.is_output());
        assert!(Mode::AltOpenDrain.is_output());
        assert!(!Mode::Input.is_output());
        assert!(!Mode::Analog.is_output());
        assert!(Mode::OutputOpenDrain.is_open_drain());
        assert!(!Mode::AltPushPull.is_open_drain());
    }
}
