//! Transceiver shared between the clock interrupt and the main line
//!
//! Every access happens inside a critical section, so the main line can
//! never observe the bit counter, accumulator or direction flag halfway
//! through an edge. Main-line closures must stay short: the clock is not
//! serviced while they run.
//!
//! The handler acknowledges the edge through the clock source before
//! anything else, so a source whose edge flag lives in a peripheral must
//! clear it there (see `NvicInterrupt::with_acknowledge`).
//!
//! ```ignore
//! // Clock source: NvicInterrupt::with_acknowledge(Interrupt::EXTI2, clear_exti2)
//! static MELBUS: SharedTransceiver<Node> = SharedTransceiver::new();
//!
//! #[interrupt]
//! fn EXTI2() {
//!     MELBUS.on_clock_edge();
//! }
//!
//! loop {
//!     MELBUS.with(|t| t.service(elapsed_ms));
//!     if let Ok(delivery) = FRAMES.try_receive() { /* interpret */ }
//! }
//! ```

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use melbus_hal::{InterruptSource, LineDriver};

use crate::transceiver::Transceiver;

pub struct SharedTransceiver<T> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<Option<T>>>,
}

impl<T> Default for SharedTransceiver<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SharedTransceiver<T> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(None)),
        }
    }

    /// Install the transceiver, returning any previous one
    pub fn install(&self, value: T) -> Option<T> {
        self.inner.lock(|cell| cell.borrow_mut().replace(value))
    }

    /// Remove the transceiver
    pub fn take(&self) -> Option<T> {
        self.inner.lock(|cell| cell.borrow_mut().take())
    }

    /// Run `f` with the transceiver inside a critical section
    ///
    /// Returns `None` when nothing is installed or when called from inside
    /// another `with` on the same value.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        self.inner
            .lock(|cell| cell.try_borrow_mut().ok()?.as_mut().map(f))
    }
}

impl<'a, P, C, T> SharedTransceiver<Transceiver<'a, P, C, T>>
where
    P: LineDriver,
    C: InterruptSource,
    T: InterruptSource,
{
    /// Clock edge interrupt entry point
    #[inline]
    pub fn on_clock_edge(&self) {
        self.with(Transceiver::on_clock_edge);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NodeConfig;
    use crate::testing::{transceiver, HeadUnit};
    use crate::transceiver::DeliveryChannel;
    use melbus_hal::sim::SimBus;

    #[test]
    fn test_empty_cell() {
        let shared: SharedTransceiver<u32> = SharedTransceiver::new();
        assert_eq!(shared.with(|v| *v), None);
        assert_eq!(shared.install(7), None);
        assert_eq!(shared.with(|v| *v + 1), Some(8));
        assert_eq!(shared.take(), Some(7));
        assert_eq!(shared.take(), None);
    }

    #[test]
    fn test_nested_access_is_refused() {
        let shared: SharedTransceiver<u32> = SharedTransceiver::new();
        shared.install(1);
        let inner = shared.with(|_| shared.with(|v| *v));
        assert_eq!(inner, Some(None));
    }

    #[test]
    fn test_edges_through_shared_cell() {
        let bus = SimBus::new();
        let channel = DeliveryChannel::new();
        let shared = SharedTransceiver::new();
        shared.install(transceiver(&bus, &channel, NodeConfig::new(0x50)));
        shared.with(|t| t.init());

        let hu = HeadUnit::new(&bus);
        hu.assert_busy();
        for byte in [0x50u8, 0x42] {
            for bit in melbus_protocol::UnitFormat::MELBUS.bits_of(byte) {
                shared.with(|t| {
                    hu.clock(t, Some(bit));
                });
            }
        }
        hu.release_busy();
        shared.with(|t| t.service(1));

        assert_eq!(channel.try_receive().unwrap().frame.as_slice(), &[0x50, 0x42]);
    }
}
