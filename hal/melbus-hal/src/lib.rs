//! MELBUS Hardware Abstraction Layer
//!
//! This crate defines the two hardware capabilities the MELBUS transceiver
//! is built on: three open-drain bus lines and an edge interrupt for the
//! clock line. Chip-specific code implements the traits; the transceiver in
//! `melbus-core` never touches a register directly.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  melbus-core (sampler, assembler)       │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  melbus-hal (this crate - traits)       │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┼───────────┐
//!         ▼           ▼           ▼
//! ┌────────────┐ ┌──────────┐ ┌──────────┐
//! │ embedded-  │ │  NVIC    │ │ sim (host│
//! │ hal pins   │ │  source  │ │  tests)  │
//! └────────────┘ └──────────┘ └──────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::BusLine`], [`gpio::LineDriver`] - Line direction and level
//! - [`interrupt::InterruptSource`] - Enable/disable/clear for edge and timer interrupts
//! - [`pins::LineMap`] - Pin assignment for the three lines

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod interrupt;
pub mod open_drain;
pub mod pins;

#[cfg(feature = "sim")]
pub mod sim;

// Re-export key traits at crate root for convenience
pub use gpio::{BusLine, Direction, Level, Line, LineDriver, MelbusPins};
pub use interrupt::{InterruptSource, NoInterrupt};
pub use open_drain::OpenDrainLine;
pub use pins::{LineMap, PinError, PinId};
