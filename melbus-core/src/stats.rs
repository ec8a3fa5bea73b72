//! Transceiver counters

/// Counters kept by the engine
///
/// All counters wrap. They are updated from the clock interrupt and read
/// from the main line through [`crate::Transceiver::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Stats {
    /// Frames addressed to this node and delivered
    pub frames: u32,
    /// Foreign frames delivered as observer
    pub observed: u32,
    /// Replies clocked out to the end
    pub replies: u32,
    /// Frames dropped for a length or checksum violation
    pub framing_errors: u32,
    /// Frames cut short by BUSY release
    pub truncated: u32,
    /// Frames longer than the buffer or layout limit
    pub overflows: u32,
    /// Frames dropped because the delivery queue was full
    pub dropped_full: u32,
    /// Frames aborted by the stall watchdog
    pub watchdog_aborts: u32,
    /// Replies not sent because BUSY was not asserted
    pub refused_drives: u32,
    /// Frames sent in master mode
    pub master_frames: u32,
}

#[inline]
pub(crate) fn bump(counter: &mut u32) {
    *counter = counter.wrapping_add(1);
}
