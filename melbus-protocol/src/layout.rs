//! Frame termination and integrity rules
//!
//! On the head unit bus a frame normally ends when BUSY is released. Some
//! exchanges carry their own length or a trailing check byte instead; the
//! layout names which rule applies so the assembler can close a frame (or
//! reject it) without knowing any command vocabulary.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::frame::{FrameError, MAX_FRAME_LEN};

/// How the end of a frame is recognised
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LengthRule {
    /// The frame is whatever arrives until BUSY is released
    #[default]
    BusyDelimited,
    /// The frame is complete after exactly this many bytes
    Fixed(u8),
    /// The byte at `index` counts the bytes that follow it, then `extra`
    /// trailing bytes (a checksum, for example) close the frame
    LengthByte { index: u8, extra: u8 },
}

/// Trailing check byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Checksum {
    #[default]
    None,
    /// XOR of every preceding byte
    Xor8,
    /// Wrapping sum of every preceding byte
    Sum8,
}

impl Checksum {
    /// Check value over `bytes`
    pub fn compute(&self, bytes: &[u8]) -> u8 {
        match self {
            Checksum::None => 0,
            Checksum::Xor8 => bytes.iter().fold(0, |acc, &b| acc ^ b),
            Checksum::Sum8 => bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b)),
        }
    }

    /// Whether the last byte of `frame` checks the bytes before it
    pub fn verify(&self, frame: &[u8]) -> bool {
        match (self, frame.split_last()) {
            (Checksum::None, _) => true,
            (_, Some((&last, body))) if !body.is_empty() => self.compute(body) == last,
            _ => false,
        }
    }
}

/// Where a frame stands after the latest byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Progress {
    /// More bytes are expected
    Incomplete,
    /// Length reached and checksum (if any) is good
    Complete,
    /// The frame cannot become valid
    Invalid(FrameError),
}

/// Termination and integrity rules for received frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameLayout {
    /// Longest acceptable frame, address included
    pub max_len: u8,
    pub length: LengthRule,
    pub checksum: Checksum,
}

impl Default for FrameLayout {
    fn default() -> Self {
        Self::MELBUS
    }
}

impl FrameLayout {
    /// Busy-delimited frames, no checksum
    pub const MELBUS: Self = Self {
        max_len: MAX_FRAME_LEN as u8,
        length: LengthRule::BusyDelimited,
        checksum: Checksum::None,
    };

    /// Whether the limits are consistent with the frame buffer
    pub fn is_valid(&self) -> bool {
        let max = self.max_len as usize;
        if max == 0 || max > MAX_FRAME_LEN {
            return false;
        }
        match self.length {
            LengthRule::BusyDelimited => true,
            LengthRule::Fixed(n) => n >= 1 && n <= self.max_len,
            LengthRule::LengthByte { index, extra } => {
                index < self.max_len && (index as usize + 1 + extra as usize) <= max
            }
        }
    }

    /// Evaluate a frame after a byte was appended
    ///
    /// Cheap enough for the clock interrupt: constant time until the frame
    /// completes, then one pass for the checksum.
    pub fn progress(&self, bytes: &[u8]) -> Progress {
        let len = bytes.len();
        if len > self.max_len as usize {
            return Progress::Invalid(FrameError::Overflow);
        }

        match self.length {
            LengthRule::BusyDelimited => Progress::Incomplete,
            LengthRule::Fixed(n) => {
                if len == n as usize {
                    self.finish(bytes)
                } else {
                    Progress::Incomplete
                }
            }
            LengthRule::LengthByte { index, extra } => {
                let index = index as usize;
                let Some(&count) = bytes.get(index) else {
                    return Progress::Incomplete;
                };
                let total = index + 1 + count as usize + extra as usize;
                if total > self.max_len as usize {
                    Progress::Invalid(FrameError::LengthMismatch)
                } else if len == total {
                    self.finish(bytes)
                } else {
                    Progress::Incomplete
                }
            }
        }
    }

    /// Evaluate a frame that BUSY release cut off
    ///
    /// Only busy-delimited frames legitimately end this way; for the other
    /// rules a complete frame was already closed by [`Self::progress`].
    pub fn close(&self, bytes: &[u8]) -> Result<(), FrameError> {
        match self.length {
            LengthRule::BusyDelimited => {
                if self.checksum.verify(bytes) {
                    Ok(())
                } else {
                    Err(FrameError::InvalidChecksum)
                }
            }
            LengthRule::Fixed(_) | LengthRule::LengthByte { .. } => Err(FrameError::Truncated),
        }
    }

    fn finish(&self, bytes: &[u8]) -> Progress {
        if self.checksum.verify(bytes) {
            Progress::Complete
        } else {
            Progress::Invalid(FrameError::InvalidChecksum)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_delimited_never_completes_early() {
        let layout = FrameLayout::MELBUS;
        assert_eq!(layout.progress(&[0x50, 0x01, 0x02]), Progress::Incomplete);
        assert_eq!(layout.close(&[0x50, 0x01, 0x02]), Ok(()));
    }

    #[test]
    fn test_overflow_detected() {
        let layout = FrameLayout {
            max_len: 2,
            ..FrameLayout::MELBUS
        };
        assert_eq!(
            layout.progress(&[1, 2, 3]),
            Progress::Invalid(FrameError::Overflow)
        );
    }

    #[test]
    fn test_fixed_length() {
        let layout = FrameLayout {
            length: LengthRule::Fixed(2),
            ..FrameLayout::MELBUS
        };
        assert_eq!(layout.progress(&[0x50]), Progress::Incomplete);
        assert_eq!(layout.progress(&[0x50, 0x1E]), Progress::Complete);
        assert_eq!(layout.close(&[0x50]), Err(FrameError::Truncated));
    }

    #[test]
    fn test_length_byte_with_checksum() {
        // address, count=2, two bytes, xor
        let layout = FrameLayout {
            max_len: 16,
            length: LengthRule::LengthByte { index: 1, extra: 1 },
            checksum: Checksum::Xor8,
        };
        let body = [0x50, 0x02, 0x10, 0x20];
        let sum = Checksum::Xor8.compute(&body);

        assert_eq!(layout.progress(&body[..1]), Progress::Incomplete);
        assert_eq!(layout.progress(&body), Progress::Incomplete);
        assert_eq!(
            layout.progress(&[0x50, 0x02, 0x10, 0x20, sum]),
            Progress::Complete
        );
        assert_eq!(
            layout.progress(&[0x50, 0x02, 0x10, 0x20, sum ^ 0xFF]),
            Progress::Invalid(FrameError::InvalidChecksum)
        );
    }

    #[test]
    fn test_length_byte_beyond_limit() {
        let layout = FrameLayout {
            max_len: 8,
            length: LengthRule::LengthByte { index: 1, extra: 0 },
            checksum: Checksum::None,
        };
        assert_eq!(
            layout.progress(&[0x50, 0x20]),
            Progress::Invalid(FrameError::LengthMismatch)
        );
    }

    #[test]
    fn test_checksums() {
        assert_eq!(Checksum::Xor8.compute(&[0x0F, 0xF0]), 0xFF);
        assert_eq!(Checksum::Sum8.compute(&[0xFF, 0x02]), 0x01);
        assert!(Checksum::Sum8.verify(&[0xFF, 0x02, 0x01]));
        assert!(!Checksum::Sum8.verify(&[0x01]));
        assert!(Checksum::None.verify(&[]));
    }

    #[test]
    fn test_busy_delimited_checksum_on_close() {
        let layout = FrameLayout {
            checksum: Checksum::Xor8,
            ..FrameLayout::MELBUS
        };
        assert_eq!(layout.close(&[0x50, 0x01, 0x51]), Ok(()));
        assert_eq!(
            layout.close(&[0x50, 0x01, 0x00]),
            Err(FrameError::InvalidChecksum)
        );
    }

    #[test]
    fn test_layout_validity() {
        assert!(FrameLayout::MELBUS.is_valid());
        assert!(!FrameLayout {
            max_len: 0,
            ..FrameLayout::MELBUS
        }
        .is_valid());
        assert!(!FrameLayout {
            length: LengthRule::Fixed(0),
            ..FrameLayout::MELBUS
        }
        .is_valid());
        assert!(!FrameLayout {
            max_len: 4,
            length: LengthRule::LengthByte { index: 3, extra: 1 },
            checksum: Checksum::None,
        }
        .is_valid());
    }
}
