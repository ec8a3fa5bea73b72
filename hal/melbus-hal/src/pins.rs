//! Pin assignment for the three bus lines
//!
//! Boards name pins as a port letter and a bit number ("PD2", "PB10").
//! The assignment is fixed at init; the only runtime check is that no two
//! lines share a pin.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::gpio::Line;

/// Highest port letter accepted
const LAST_PORT: char = 'K';

/// Number of ports `A..=LAST_PORT`
const PORT_COUNT: usize = 11;

/// Pins per port
const PINS_PER_PORT: u8 = 16;

/// Errors from pin parsing and assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinError {
    /// Pin string could not be parsed
    InvalidPin,
    /// Two lines were assigned the same pin
    DuplicatePin(Line),
}

/// A port/bit pin identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PinId {
    /// Port letter, `'A'..='K'`
    pub port: char,
    /// Bit within the port, `0..16`
    pub pin: u8,
}

impl PinId {
    pub const fn new(port: char, pin: u8) -> Self {
        Self { port, pin }
    }

    /// Bit mask of this pin within its port register
    ///
    /// `None` when the pin number does not fit a port.
    pub const fn mask(&self) -> Option<u16> {
        if self.pin < PINS_PER_PORT {
            Some(1 << self.pin)
        } else {
            None
        }
    }

    fn port_index(&self) -> Option<usize> {
        if ('A'..=LAST_PORT).contains(&self.port) && self.pin < PINS_PER_PORT {
            Some(self.port as usize - 'A' as usize)
        } else {
            None
        }
    }
}

/// Parse a pin string from config
///
/// Supports formats:
/// - "PD2" -> Port D, Pin 2
/// - "pb10" -> Port B, Pin 10
pub fn parse_pin_string(s: &str) -> Option<PinId> {
    let s = s.trim();
    let mut chars = s.chars();

    if !matches!(chars.next(), Some('P') | Some('p')) {
        return None;
    }

    let port = chars.next()?.to_ascii_uppercase();
    if !('A'..=LAST_PORT).contains(&port) {
        return None;
    }

    let pin: u8 = chars.as_str().parse().ok()?;
    if pin >= PINS_PER_PORT {
        return None;
    }

    Some(PinId { port, pin })
}

/// Pin allocator to track pin usage
struct PinAllocator {
    /// Bitmask of allocated pins per port
    allocated: [u16; PORT_COUNT],
}

impl PinAllocator {
    fn new() -> Self {
        Self {
            allocated: [0; PORT_COUNT],
        }
    }

    /// Returns `Ok(false)` if the pin was already taken
    fn allocate(&mut self, pin: PinId) -> Result<bool, PinError> {
        let port = pin.port_index().ok_or(PinError::InvalidPin)?;
        let mask = pin.mask().ok_or(PinError::InvalidPin)?;
        if self.allocated[port] & mask != 0 {
            return Ok(false);
        }
        self.allocated[port] |= mask;
        Ok(true)
    }
}

/// Line-to-pin mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LineMap {
    pub clock: PinId,
    pub data: PinId,
    pub busy: PinId,
}

impl LineMap {
    pub const fn new(clock: PinId, data: PinId, busy: PinId) -> Self {
        Self { clock, data, busy }
    }

    /// Build a map from config strings
    pub fn parse(clock: &str, data: &str, busy: &str) -> Result<Self, PinError> {
        let map = Self {
            clock: parse_pin_string(clock).ok_or(PinError::InvalidPin)?,
            data: parse_pin_string(data).ok_or(PinError::InvalidPin)?,
            busy: parse_pin_string(busy).ok_or(PinError::InvalidPin)?,
        };
        map.validate()?;
        Ok(map)
    }

    /// Pin assigned to a line
    pub fn pin(&self, line: Line) -> PinId {
        match line {
            Line::Clock => self.clock,
            Line::Data => self.data,
            Line::Busy => self.busy,
        }
    }

    /// Check that every pin is valid and used once
    ///
    /// The error names the first line whose pin was already taken.
    pub fn validate(&self) -> Result<(), PinError> {
        let mut alloc = PinAllocator::new();
        for line in Line::ALL {
            if !alloc.allocate(self.pin(line))? {
                return Err(PinError::DuplicatePin(line));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pin_string() {
        assert_eq!(parse_pin_string("PD2"), Some(PinId::new('D', 2)));
        assert_eq!(parse_pin_string("pb10"), Some(PinId::new('B', 10)));
        assert_eq!(parse_pin_string(" PA0 "), Some(PinId::new('A', 0)));
        assert_eq!(parse_pin_string("PK15"), Some(PinId::new('K', 15)));

        // Invalid
        assert_eq!(parse_pin_string("PD16"), None);
        assert_eq!(parse_pin_string("PZ1"), None);
        assert_eq!(parse_pin_string("D2"), None);
        assert_eq!(parse_pin_string("P"), None);
        assert_eq!(parse_pin_string(""), None);
    }

    #[test]
    fn test_line_map_parse() {
        let map = LineMap::parse("PD3", "PD4", "PD5").unwrap();
        assert_eq!(map.pin(Line::Clock), PinId::new('D', 3));
        assert_eq!(map.pin(Line::Data), PinId::new('D', 4));
        assert_eq!(map.pin(Line::Busy), PinId::new('D', 5));
        assert_eq!(map.data.mask(), Some(0b1_0000));
    }

    #[test]
    fn test_mask_out_of_range() {
        assert_eq!(PinId::new('D', 15).mask(), Some(0x8000));
        assert_eq!(PinId::new('D', 16).mask(), None);
        assert_eq!(PinId::new('D', 20).mask(), None);
    }

    #[test]
    fn test_duplicate_pin_rejected() {
        let result = LineMap::parse("PD3", "PD4", "PD3");
        assert_eq!(result, Err(PinError::DuplicatePin(Line::Busy)));
    }

    #[test]
    fn test_same_bit_different_port_allowed() {
        assert!(LineMap::parse("PB3", "PC3", "PD3").is_ok());
    }

    #[test]
    fn test_invalid_pin_rejected() {
        assert_eq!(
            LineMap::parse("PD3", "XX", "PD5"),
            Err(PinError::InvalidPin)
        );

        let map = LineMap::new(PinId::new('Q', 1), PinId::new('D', 4), PinId::new('D', 5));
        assert_eq!(map.validate(), Err(PinError::InvalidPin));
    }
}
