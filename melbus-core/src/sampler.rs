//! Bit clock sampler
//!
//! One call per rising clock edge. Receiving, the edge samples DATA into
//! the accumulator. Transmitting, the edge means the master just sampled
//! the bit on the wire, so the next one is put out for the following edge.

use melbus_hal::Level;
use melbus_protocol::UnitFormat;

/// Bit counter and shift registers for one unit
#[derive(Debug, Clone)]
pub struct BitClockSampler {
    format: UnitFormat,
    /// Bits done in the current unit, `0..format.bits`
    count: u8,
    acc: u8,
    tx: u8,
}

impl BitClockSampler {
    pub const fn new(format: UnitFormat) -> Self {
        Self {
            format,
            count: 0,
            acc: 0,
            tx: 0,
        }
    }

    pub fn format(&self) -> UnitFormat {
        self.format
    }

    /// Drop any partial unit
    pub fn reset(&mut self) {
        self.count = 0;
        self.acc = 0;
    }

    pub fn bit_count(&self) -> u8 {
        self.count
    }

    /// Whether part of a received unit is held
    pub fn in_progress(&self) -> bool {
        self.count != 0
    }

    /// Shift in one sampled bit, returning the unit once it is complete
    #[inline]
    pub fn sample(&mut self, level: Level) -> Option<u8> {
        self.acc = self.format.place(self.acc, self.count, level.is_high());
        self.count += 1;
        if self.count < self.format.bits {
            return None;
        }
        let unit = self.acc;
        self.reset();
        Some(unit)
    }

    /// Start sending `value`; returns the level of its first bit
    #[inline]
    pub fn load(&mut self, value: u8) -> Level {
        self.tx = value;
        self.count = 0;
        Level::from_bit(self.format.bit(value, 0))
    }

    /// The master sampled the current bit
    ///
    /// Returns the level for the next bit, or `None` once the whole unit
    /// has been sampled.
    #[inline]
    pub fn advance(&mut self) -> Option<Level> {
        self.count += 1;
        if self.count >= self.format.bits {
            self.count = 0;
            return None;
        }
        Some(Level::from_bit(self.format.bit(self.tx, self.count)))
    }
}
