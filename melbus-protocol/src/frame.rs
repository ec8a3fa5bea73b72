//! MELBUS frame container
//!
//! Frame format:
//! - ADDRESS (1 byte): the node the head unit is talking to
//! - PAYLOAD (0-63 bytes): command and arguments, meaning defined above
//!   this layer
//!
//! How long a frame is and whether it ends in a checksum is decided by
//! [`crate::FrameLayout`].

use heapless::Vec;

use crate::bits::UnitFormat;

/// Largest frame the assembler will hold, address included
pub const MAX_FRAME_LEN: usize = 64;

/// Errors that can occur while assembling or checking a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameError {
    /// More bytes arrived than the frame buffer holds
    Overflow,
    /// Frame ended at a different length than its layout requires
    LengthMismatch,
    /// Checksum byte does not match the preceding bytes
    InvalidChecksum,
    /// BUSY was released before the frame was complete
    Truncated,
    /// Bytes handed to a constructor exceed [`MAX_FRAME_LEN`]
    PayloadTooLarge,
}

/// An ordered run of bytes clocked during one busy period
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Frame {
    bytes: Vec<u8, MAX_FRAME_LEN>,
}

impl Frame {
    /// Create an empty frame
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Create a frame from raw bytes, address first
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        let mut frame = Self::new();
        frame
            .bytes
            .extend_from_slice(bytes)
            .map_err(|_| FrameError::PayloadTooLarge)?;
        Ok(frame)
    }

    /// Create a frame from an address and the bytes that follow it
    pub fn with_address(address: u8, payload: &[u8]) -> Result<Self, FrameError> {
        let mut frame = Self::new();
        frame.push(address).map_err(|_| FrameError::PayloadTooLarge)?;
        frame
            .bytes
            .extend_from_slice(payload)
            .map_err(|_| FrameError::PayloadTooLarge)?;
        Ok(frame)
    }

    /// Append one received byte
    #[inline]
    pub fn push(&mut self, byte: u8) -> Result<(), FrameError> {
        self.bytes.push(byte).map_err(|_| FrameError::Overflow)
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// First byte, if any has arrived
    pub fn address(&self) -> Option<u8> {
        self.bytes.first().copied()
    }

    /// Everything after the address
    pub fn payload(&self) -> &[u8] {
        self.bytes.get(1..).unwrap_or(&[])
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.bytes.is_full()
    }

    /// Wire bits of the whole frame in transmission order
    pub fn wire_bits(&self, format: UnitFormat) -> impl Iterator<Item = bool> + '_ {
        self.bytes.iter().flat_map(move |&b| format.bits_of(b))
    }
}
