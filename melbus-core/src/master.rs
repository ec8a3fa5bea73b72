//! Master-mode transmit
//!
//! A node that wants the head unit's attention can take the bus itself:
//! assert BUSY, generate the clock, send a frame, release everything. The
//! clock edge interrupt is masked for the duration because every rising
//! edge this node makes would otherwise land in its own handler.

use embedded_hal::delay::DelayNs;
use melbus_hal::{Direction, InterruptSource, Level, Line, LineDriver};

use crate::stats::bump;
use crate::transceiver::Transceiver;

/// Errors from master-mode transmit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MasterError {
    /// Another node holds BUSY, or a frame is in progress
    BusBusy,
    /// More bytes than the frame layout allows
    FrameTooLong,
    /// Nothing to send
    EmptyFrame,
}

impl<'a, P, C, T> Transceiver<'a, P, C, T>
where
    P: LineDriver,
    C: InterruptSource,
    T: InterruptSource,
{
    /// Send `bytes` as bus master
    ///
    /// Blocks for the whole frame. Must be called from the main line with
    /// the bus idle; the clock edge interrupt is re-armed with the edges
    /// from this node's own clocking discarded.
    pub fn transmit_as_master<D: DelayNs>(
        &mut self,
        bytes: &[u8],
        delay: &mut D,
    ) -> Result<(), MasterError> {
        if bytes.is_empty() {
            return Err(MasterError::EmptyFrame);
        }
        if bytes.len() > self.config.layout.max_len as usize {
            return Err(MasterError::FrameTooLong);
        }
        if self.bus_active || self.pins.read(Line::Busy).is_low() {
            return Err(MasterError::BusBusy);
        }

        self.clock_irq.disable();
        if self.config.mask_timer_during_frames {
            self.timer.disable();
        }
        debug!("master frame, {=usize} bytes", bytes.len());

        let timing = self.config.master;
        let format = self.config.unit;

        self.pins.assert_low(Line::Busy);
        // Latches high before switching, so neither line glitches low
        for line in [Line::Clock, Line::Data] {
            self.pins.write(line, Level::High);
            self.pins.set_direction(line, Direction::Output);
        }

        for &byte in bytes {
            for bit in format.bits_of(byte) {
                self.pins.write(Line::Clock, Level::Low);
                self.pins.write(Line::Data, Level::from_bit(bit));
                delay.delay_ns(timing.half_period_ns);
                self.pins.write(Line::Clock, Level::High);
                delay.delay_ns(timing.half_period_ns);
            }
            delay.delay_ns(timing.byte_gap_ns);
        }

        self.pins.release(Line::Data);
        self.pins.release(Line::Clock);
        self.pins.release(Line::Busy);

        if self.config.mask_timer_during_frames {
            self.timer.enable();
        }
        self.clock_irq.rearm();
        bump(&mut self.stats.master_frames);
        Ok(())
    }
}
