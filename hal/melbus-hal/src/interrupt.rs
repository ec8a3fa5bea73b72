//! Interrupt source control
//!
//! The clock line edge interrupt paces the whole transceiver. It needs
//! mask and unmask, discarding a latched edge, and acknowledging an edge
//! once the handler runs.

/// A maskable interrupt source
pub trait InterruptSource {
    /// Unmask the interrupt
    fn enable(&mut self);

    /// Mask the interrupt
    fn disable(&mut self);

    /// Discard a latched, not yet serviced event
    fn clear_pending(&mut self);

    /// Whether the interrupt is currently unmasked
    fn is_enabled(&self) -> bool;

    /// Acknowledge the event being serviced
    ///
    /// Called first in the handler. Sources that latch the edge in a
    /// peripheral flag (an EXTI pending bit, a GPIO interrupt status
    /// register) clear it here, or the vector is taken again at once.
    fn acknowledge(&mut self) {}

    /// Unmask after a pause without servicing anything latched meanwhile
    ///
    /// The latch is cleared before unmasking: on most controllers an
    /// unmasked source with its flag set is dispatched at once.
    fn rearm(&mut self) {
        self.clear_pending();
        self.enable();
    }
}

/// Placeholder for an interrupt that does not exist on the board
#[derive(Debug, Default, Clone, Copy)]
pub struct NoInterrupt;

impl InterruptSource for NoInterrupt {
    fn enable(&mut self) {}

    fn disable(&mut self) {}

    fn clear_pending(&mut self) {}

    fn is_enabled(&self) -> bool {
        false
    }
}

#[cfg(feature = "cortex-m")]
pub use nvic::NvicInterrupt;

#[cfg(feature = "cortex-m")]
mod nvic {
    use super::InterruptSource;
    use cortex_m::interrupt::InterruptNumber;
    use cortex_m::peripheral::NVIC;

    /// Interrupt line masked at the NVIC
    ///
    /// Suitable when the clock pin has a dedicated vector (for example an
    /// EXTI line of its own) so masking the vector masks only the clock.
    /// When the edge is also latched in the peripheral, build it with
    /// [`NvicInterrupt::with_acknowledge`] so that latch is cleared too.
    pub struct NvicInterrupt<I, A = fn()> {
        irq: I,
        ack: A,
    }

    fn no_latch() {}

    impl<I: InterruptNumber + Copy> NvicInterrupt<I> {
        /// Wrap an interrupt number with no peripheral latch. The line
        /// starts masked.
        pub fn new(irq: I) -> Self {
            NVIC::mask(irq);
            Self { irq, ack: no_latch }
        }
    }

    impl<I: InterruptNumber + Copy, A: FnMut()> NvicInterrupt<I, A> {
        /// Wrap an interrupt number whose edge flag `ack` clears, for
        /// example by writing the line's bit to EXTI_PR. The line starts
        /// masked.
        pub fn with_acknowledge(irq: I, ack: A) -> Self {
            NVIC::mask(irq);
            Self { irq, ack }
        }
    }

    impl<I: InterruptNumber + Copy, A: FnMut()> InterruptSource for NvicInterrupt<I, A> {
        #[allow(unsafe_code)]
        fn enable(&mut self) {
            // SAFETY: the transceiver owns this vector and no mask-based
            // critical section relies on it staying masked.
            unsafe { NVIC::unmask(self.irq) }
        }

        fn disable(&mut self) {
            NVIC::mask(self.irq);
        }

        /// Peripheral flag first, or the NVIC pends again right away
        fn clear_pending(&mut self) {
            (self.ack)();
            NVIC::unpend(self.irq);
        }

        fn is_enabled(&self) -> bool {
            NVIC::is_enabled(self.irq)
        }

        fn acknowledge(&mut self) {
            (self.ack)();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        enabled: bool,
        pending: bool,
        order: [u8; 4],
        calls: usize,
    }

    impl InterruptSource for Recorder {
        fn enable(&mut self) {
            self.enabled = true;
            self.order[self.calls] = b'e';
            self.calls += 1;
        }

        fn disable(&mut self) {
            self.enabled = false;
        }

        fn clear_pending(&mut self) {
            self.pending = false;
            self.order[self.calls] = b'c';
            self.calls += 1;
        }

        fn is_enabled(&self) -> bool {
            self.enabled
        }
    }

    #[test]
    fn test_rearm_clears_before_enabling() {
        let mut irq = Recorder {
            pending: true,
            ..Default::default()
        };
        irq.rearm();

        assert!(irq.enabled);
        assert!(!irq.pending);
        assert_eq!(&irq.order[..2], b"ce");
    }

    #[test]
    fn test_acknowledge_defaults_to_nothing() {
        let mut irq = Recorder::default();
        irq.acknowledge();
        assert_eq!(irq.calls, 0);
    }

    #[test]
    fn test_no_interrupt_is_inert() {
        let mut irq = NoInterrupt;
        irq.enable();
        assert!(!irq.is_enabled());
    }
}
