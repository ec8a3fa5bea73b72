//! Transceiver configuration
//!
//! Everything here is fixed at init. [`NodeConfig::validate`] is called by
//! [`crate::Transceiver::new`] so an engine never runs on a bad config.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use melbus_hal::{LineMap, PinError};
use melbus_protocol::{FrameLayout, UnitFormat};

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Bits per unit outside 1-8
    InvalidBitsPerUnit,
    /// Frame layout limits are inconsistent
    InvalidFrameLimit,
    /// Two lines share a pin
    DuplicatePin,
    /// A pin name could not be parsed or is out of range
    InvalidPin,
}

impl From<PinError> for ConfigError {
    fn from(err: PinError) -> Self {
        match err {
            PinError::InvalidPin => ConfigError::InvalidPin,
            PinError::DuplicatePin(_) => ConfigError::DuplicatePin,
        }
    }
}

/// What to do with frames addressed to another node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ObserverPolicy {
    /// Capture them and deliver as observer frames
    Snoop,
    /// Stop listening until BUSY is released
    #[default]
    Ignore,
}

/// Clock timing when this node masters the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MasterTiming {
    /// Time CLOCK is held at each level
    pub half_period_ns: u32,
    /// Pause between bytes with CLOCK high
    pub byte_gap_ns: u32,
}

impl Default for MasterTiming {
    fn default() -> Self {
        Self {
            half_period_ns: 10_000,
            byte_gap_ns: 20_000,
        }
    }
}

/// Node configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeConfig {
    /// This node's bus address
    pub address: u8,
    /// Bits per unit and their order
    pub unit: UnitFormat,
    /// Frame termination and checksum
    pub layout: FrameLayout,
    pub observer: ObserverPolicy,
    /// Mask the tick timer interrupt while BUSY is asserted
    pub mask_timer_during_frames: bool,
    /// Abort a frame whose clock stalls this long
    pub watchdog_ms: Option<u32>,
    pub master: MasterTiming,
    /// Pin assignment, checked when present
    pub lines: Option<LineMap>,
}

impl NodeConfig {
    /// 8-bit MSB-first units, busy-delimited frames, foreign frames ignored
    ///
    /// The address has no default; it depends on the device being emulated.
    pub const fn new(address: u8) -> Self {
        Self {
            address,
            unit: UnitFormat::MELBUS,
            layout: FrameLayout::MELBUS,
            observer: ObserverPolicy::Ignore,
            mask_timer_during_frames: true,
            watchdog_ms: None,
            master: MasterTiming {
                half_period_ns: 10_000,
                byte_gap_ns: 20_000,
            },
            lines: None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.unit.is_valid() {
            return Err(ConfigError::InvalidBitsPerUnit);
        }
        if !self.layout.is_valid() {
            return Err(ConfigError::InvalidFrameLimit);
        }
        if let Some(lines) = &self.lines {
            lines.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use melbus_hal::PinId;
    use melbus_protocol::{BitOrder, LengthRule};

    #[test]
    fn test_new_is_valid() {
        let config = NodeConfig::new(0x50);
        assert_eq!(config.address, 0x50);
        assert_eq!(config.master, MasterTiming::default());
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_bits_per_unit_checked() {
        let mut config = NodeConfig::new(0x50);
        config.unit = UnitFormat::new(0, BitOrder::MsbFirst);
        assert_eq!(config.validate(), Err(ConfigError::InvalidBitsPerUnit));

        config.unit = UnitFormat::new(7, BitOrder::LsbFirst);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_frame_limit_checked() {
        let mut config = NodeConfig::new(0x50);
        config.layout.length = LengthRule::Fixed(200);
        assert_eq!(config.validate(), Err(ConfigError::InvalidFrameLimit));
    }

    #[test]
    fn test_line_map_checked() {
        let mut config = NodeConfig::new(0x50);
        let pin = PinId::new('D', 2);
        config.lines = Some(LineMap::new(pin, PinId::new('D', 3), pin));
        assert_eq!(config.validate(), Err(ConfigError::DuplicatePin));

        config.lines = Some(LineMap::new(pin, PinId::new('D', 3), PinId::new('Z', 0)));
        assert_eq!(config.validate(), Err(ConfigError::InvalidPin));
    }
}
