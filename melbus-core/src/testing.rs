//! Head unit stand-in for scenario tests

use melbus_hal::sim::{SimBus, SimInterrupt, SimIrq, SimLine};
use melbus_hal::{Level, Line, MelbusPins};
use melbus_protocol::UnitFormat;

use crate::config::NodeConfig;
use crate::transceiver::{DeliveryChannel, Transceiver};

pub(crate) type SimPins<'a> = MelbusPins<SimLine<'a>, SimLine<'a>, SimLine<'a>>;

pub(crate) type SimTransceiver<'a> =
    Transceiver<'a, SimPins<'a>, SimInterrupt<'a>, SimInterrupt<'a>>;

pub(crate) fn pins(bus: &SimBus) -> SimPins<'_> {
    MelbusPins::new(
        bus.line(Line::Clock),
        bus.line(Line::Data),
        bus.line(Line::Busy),
    )
}

pub(crate) fn transceiver<'a>(
    bus: &'a SimBus,
    channel: &'a DeliveryChannel,
    config: NodeConfig,
) -> SimTransceiver<'a> {
    Transceiver::new(
        pins(bus),
        bus.irq(SimIrq::Clock),
        bus.irq(SimIrq::Timer),
        config,
        channel.sender(),
    )
    .unwrap()
}

/// Drives the remote side of the simulated bus
///
/// Bits are written, then sampled on the rising edge before the node's
/// interrupt runs, as a real master samples right at the edge.
pub(crate) struct HeadUnit<'b> {
    bus: &'b SimBus,
    format: UnitFormat,
}

impl<'b> HeadUnit<'b> {
    pub fn new(bus: &'b SimBus) -> Self {
        Self {
            bus,
            format: UnitFormat::MELBUS,
        }
    }

    pub fn assert_busy(&self) {
        self.bus.remote(Line::Busy, Level::Low);
    }

    pub fn release_busy(&self) {
        self.bus.remote(Line::Data, Level::High);
        self.bus.remote(Line::Busy, Level::High);
    }

    /// One clock period; `None` leaves DATA released for the node to drive
    pub fn clock(&self, t: &mut SimTransceiver<'_>, drive: Option<bool>) -> bool {
        self.bus.remote(Line::Clock, Level::Low);
        self.bus
            .remote(Line::Data, drive.map_or(Level::High, Level::from_bit));
        self.bus.remote(Line::Clock, Level::High);
        let sampled = self.bus.level(Line::Data).is_high();
        if self.bus.remote_edge() {
            t.on_clock_edge();
        }
        sampled
    }

    pub fn write_byte(&self, t: &mut SimTransceiver<'_>, byte: u8) {
        for bit in self.format.bits_of(byte) {
            self.clock(t, Some(bit));
        }
    }

    pub fn read_byte(&self, t: &mut SimTransceiver<'_>) -> u8 {
        (0..self.format.bits).fold(0, |acc, i| {
            let bit = self.clock(t, None);
            self.format.place(acc, i, bit)
        })
    }

    /// A whole busy period, closed by the main line seeing the release
    pub fn send_frame(&self, t: &mut SimTransceiver<'_>, bytes: &[u8]) {
        self.assert_busy();
        for &byte in bytes {
            self.write_byte(t, byte);
        }
        self.release_busy();
        t.poll_bus();
    }
}
