//! Interrupt-driven MELBUS transceiver
//!
//! This crate turns clock edges into frames and staged replies into clock
//! edges. It depends only on the capability traits in `melbus-hal`:
//!
//! - Bit clock sampler: one bit per rising edge, MSB-first by default
//! - Frame assembler: frame boundaries, address matching, reply start
//! - Transfer direction: DATA is driven only while BUSY is asserted
//! - [`Transceiver`]: owns the lines and the clock interrupt
//! - [`SharedTransceiver`]: critical-section cell shared with the handler
//! - Master-mode transmit, stall watchdog and counters
//!
//! Completed frames go upward through an `embassy-sync` channel; nothing
//! in this crate blocks or allocates.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

// Must come first so the macros are visible to the other modules
mod fmt;

pub mod assembler;
pub mod config;
pub mod direction;
pub mod master;
pub mod sampler;
pub mod shared;
pub mod stats;
pub mod transceiver;
pub mod watchdog;

#[cfg(test)]
mod testing;

pub use assembler::{Delivery, FrameAssembler, Phase, Role};
pub use config::{ConfigError, MasterTiming, NodeConfig, ObserverPolicy};
pub use direction::TransferDirection;
pub use master::MasterError;
pub use sampler::BitClockSampler;
pub use shared::SharedTransceiver;
pub use stats::Stats;
pub use transceiver::{
    BusTransition, DeliveryChannel, DeliverySender, Transceiver, DELIVERY_DEPTH, REPLY_SLOTS,
};
pub use watchdog::Watchdog;

pub use melbus_protocol::{Frame, FrameError, Reply, ReplyError};
