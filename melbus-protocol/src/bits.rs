//! Bit order within a transfer unit
//!
//! MELBUS moves 8-bit units, most significant bit first. Both are kept
//! configurable so the same sampler can serve bench setups and variants.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Order in which the bits of a unit appear on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum BitOrder {
    #[default]
    MsbFirst,
    LsbFirst,
}

/// Width and bit order of one transfer unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UnitFormat {
    /// Bits per unit, 1-8
    pub bits: u8,
    pub order: BitOrder,
}

impl Default for UnitFormat {
    fn default() -> Self {
        Self::MELBUS
    }
}

impl UnitFormat {
    /// 8 bits, MSB first
    pub const MELBUS: Self = Self {
        bits: 8,
        order: BitOrder::MsbFirst,
    };

    pub const fn new(bits: u8, order: BitOrder) -> Self {
        Self { bits, order }
    }

    /// Whether the width fits a byte
    pub const fn is_valid(&self) -> bool {
        self.bits >= 1 && self.bits <= 8
    }

    /// Mask of the bits a unit can carry
    pub const fn mask(&self) -> u8 {
        if self.bits >= 8 {
            0xFF
        } else {
            (1u8 << self.bits) - 1
        }
    }

    /// Bit position inside the value for the `index`-th bit on the wire
    #[inline]
    const fn position(&self, index: u8) -> u8 {
        match self.order {
            BitOrder::MsbFirst => self.bits - 1 - index,
            BitOrder::LsbFirst => index,
        }
    }

    /// The `index`-th bit of `value` as it goes out on the wire
    #[inline]
    pub const fn bit(&self, value: u8, index: u8) -> bool {
        (value >> self.position(index)) & 1 != 0
    }

    /// Merge a received bit into the accumulator
    #[inline]
    pub const fn place(&self, acc: u8, index: u8, bit: bool) -> u8 {
        if bit {
            acc | (1 << self.position(index))
        } else {
            acc
        }
    }

    /// Iterate the wire bits of one unit
    pub fn bits_of(&self, value: u8) -> UnitBits {
        UnitBits {
            format: *self,
            value,
            index: 0,
        }
    }
}

/// Iterator over the wire bits of one unit
#[derive(Debug, Clone)]
pub struct UnitBits {
    format: UnitFormat,
    value: u8,
    index: u8,
}

impl Iterator for UnitBits {
    type Item = bool;

    fn next(&mut self) -> Option<bool> {
        if self.index >= self.format.bits {
            return None;
        }
        let bit = self.format.bit(self.value, self.index);
        self.index += 1;
        Some(bit)
    }
}
