//! MELBUS frame protocol
//!
//! Wire-level vocabulary shared by the transceiver and whoever consumes its
//! frames. Nothing here touches hardware.
//!
//! # Protocol Overview
//!
//! A frame is everything clocked while BUSY is held low:
//! ```text
//!  BUSY  ‾‾‾‾\____________________________________________/‾‾‾‾
//!  CLOCK      ‾\_/‾\_/‾ ... ‾\_/‾    ‾\_/‾ ... ‾\_/‾
//!  DATA       │ ADDRESS (8 bits) │  │ PAYLOAD bytes ... │
//! ```
//!
//! Bits are sampled on the rising clock edge, most significant bit first.
//! The first byte addresses a node; the node it names may answer inside
//! the same busy period by driving DATA for a staged number of bytes.
//!
//! Frame termination and an optional checksum are described by
//! [`FrameLayout`]; no command byte meanings are defined at this layer.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod bits;
pub mod frame;
pub mod layout;
pub mod reply;

pub use bits::{BitOrder, UnitFormat};
pub use frame::{Frame, FrameError, MAX_FRAME_LEN};
pub use layout::{Checksum, FrameLayout, LengthRule, Progress};
pub use reply::{Reply, ReplyError, ReplyTable, MAX_COMMAND_LEN, MAX_REPLY_LEN};
