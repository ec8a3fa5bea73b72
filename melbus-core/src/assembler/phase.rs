//! Frame phases
//!
//! The phase is a pure function of the previous phase and an event; the
//! assembler decides which event happened.

use super::events::AssemblerEvent;

/// Where the current busy period stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    /// No frame is being assembled
    #[default]
    Idle,
    /// Waiting for the address byte
    Address,
    /// Receiving bytes after the address
    Payload,
    /// Clocking out a staged reply
    Responding,
}

impl Phase {
    /// Whether clock edges are being consumed
    pub fn is_active(&self) -> bool {
        !matches!(self, Phase::Idle)
    }

    /// Whether this node drives DATA in this phase
    pub fn drives_data(&self) -> bool {
        matches!(self, Phase::Responding)
    }

    pub fn transition(self, event: AssemblerEvent) -> Self {
        use AssemblerEvent::*;
        use Phase::*;

        match (self, event) {
            (Idle, BusActive) => Address,

            (Address, AddressMatched) => Payload,
            (Address, AddressForeign) => Payload,
            (Address, AddressIgnored) => Idle,

            (Payload, ReplyOwed) => Responding,
            (Responding, ReplySent) => Payload,

            (Address | Payload | Responding, FrameComplete) => Idle,

            // Any frame ends on these
            (_, Violation) => Idle,
            (_, BusReleased) => Idle,
            (_, Stalled) => Idle,

            _ => self,
        }
    }
}
