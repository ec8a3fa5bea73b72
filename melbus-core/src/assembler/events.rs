//! Events that move the assembler between phases

/// Assembler events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AssemblerEvent {
    /// BUSY asserted, a new frame begins
    BusActive,

    // Address byte outcomes
    /// The address names this node
    AddressMatched,
    /// The address names another node and foreign frames are captured
    AddressForeign,
    /// The address names another node and foreign frames are ignored
    AddressIgnored,

    // Reply phase
    /// A staged reply matches the command received so far
    ReplyOwed,
    /// The last reply byte was sampled by the head unit
    ReplySent,

    // Frame end
    /// The layout's length rule closed the frame
    FrameComplete,
    /// Length or checksum violation, or buffer overflow
    Violation,
    /// BUSY released
    BusReleased,
    /// The stall watchdog gave up on the frame
    Stalled,
}
