//! Pin identifiers
//!
//! A [`Pin`] is `port * 16 + offset`. Port A is 0, port B is 1 and so on.
//! Which ports exist is decided by the chip variant; this type only carries
//! the number.

use core::fmt;
use core::str::FromStr;

/// Number of pins per GPIO port
pub const PINS_PER_PORT: u8 = 16;

/// Highest port letter a pin name may use (port H, index 7)
pub const MAX_PORTS: u8 = 8;

pub const PORT_A: u8 = 0;
pub const PORT_B: u8 = 1;
pub const PORT_C: u8 = 2;
pub const PORT_D: u8 = 3;
pub const PORT_E: u8 = 4;
pub const PORT_F: u8 = 5;
pub const PORT_G: u8 = 6;
pub const PORT_H: u8 = 7;

/// GPIO pin identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pin(u8);

impl Pin {
    /// Sentinel meaning "no pin connected"
    pub const NONE: Pin = Pin(0xFF);

    /// Build a pin from its port index and offset within the port
    ///
    /// Panics (at compile time when used in a `const`) if `offset` is 16 or
    /// more.
    pub const fn new(port: u8, offset: u8) -> Self {
        assert!(offset < PINS_PER_PORT, "pin offset out of range");
        Pin(port * PINS_PER_PORT + offset)
    }

    /// Build a pin from its raw encoded value
    pub const fn from_raw(raw: u8) -> Self {
        Pin(raw)
    }

    /// Raw encoded value
    pub const fn raw(self) -> u8 {
        self.0
    }

    /// Port index (`pin / 16`)
    pub const fn port(self) -> u8 {
        self.0 / PINS_PER_PORT
    }

    /// Offset within the port (`pin % 16`)
    pub const fn offset(self) -> u8 {
        self.0 % PINS_PER_PORT
    }

    /// Single-bit mask for this pin in a per-port register
    pub const fn mask(self) -> u32 {
        1 << self.offset()
    }

    /// Check for the "no pin" sentinel
    pub const fn is_none(self) -> bool {
        self.0 == Self::NONE.0
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return f.write_str("NoPin");
        }
        let port = (b'A' + self.port()) as char;
        write!(f, "P{}{}", port, self.offset())
    }
}

/// Error when parsing a pin name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinParseError {
    /// Name does not start with 'P'
    MissingPrefix,
    /// Port letter outside A-H
    InvalidPort,
    /// Offset missing, not a number, or 16 and above
    InvalidOffset,
}

impl fmt::Display for PinParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinParseError::MissingPrefix => f.write_str("pin name must start with 'P'"),
            PinParseError::InvalidPort => f.write_str("port letter must be A-H"),
            PinParseError::InvalidOffset => f.write_str("pin offset must be 0-15"),
        }
    }
}

/// Parse a pin name from config
///
/// Accepts "PA0" through "PH15", case-insensitive, surrounding whitespace
/// ignored.
impl FromStr for Pin {
    type Err = PinParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().as_bytes();

        let rest = match s.split_first() {
            Some((b'P' | b'p', rest)) => rest,
            _ => return Err(PinParseError::MissingPrefix),
        };

        let (port, digits) = rest.split_first().ok_or(PinParseError::InvalidPort)?;
        let port = port.to_ascii_uppercase();
        if !(b'A'..b'A' + MAX_PORTS).contains(&port) {
            return Err(PinParseError::InvalidPort);
        }

        if digits.is_empty() || digits.len() > 2 {
            return Err(PinParseError::InvalidOffset);
        }
        let mut offset: u8 = 0;
        for &d in digits {
            if !d.is_ascii_digit() {
                return Err(PinParseError::InvalidOffset);
            }
            offset = offset * 10 + (d - b'0');
        }
        if offset >= PINS_PER_PORT {
            return Err(PinParseError::InvalidOffset);
        }

        Ok(Pin::new(port - b'A', offset))
    }
}

/// Declare the pin constants of one port
///
/// Offsets are assigned in order starting from 0:
///
/// ```
/// use kairos_hal::pin::{Pin, PORT_B};
/// kairos_hal::port_pins!(PORT_B; PB0, PB1, PB2);
/// assert_eq!(PB2, Pin::new(PORT_B, 2));
/// ```
#[macro_export]
macro_rules! port_pins {
    ($port:expr; $($name:ident),+ $(,)?) => {
        $crate::port_pins!(@emit $port, 0u8; $($name),+);
    };
    (@emit $port:expr, $offset:expr; $name:ident $(, $rest:ident)*) => {
        pub const $name: $crate::pin::Pin = $crate::pin::Pin::new($port, $offset);
        $crate::port_pins!(@emit $port, $offset + 1; $($rest),*);
    };
    (@emit $port:expr, $offset:expr;) => {};
}
