//! Transfer direction
//!
//! DATA is an input except while this node clocks out a reply. The switch
//! to output is the one place the bus ownership rule is enforced: it is
//! refused unless BUSY is asserted.

use melbus_hal::{Direction, Level, Line, LineDriver};

/// Who drives DATA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferDirection {
    /// The head unit drives DATA, this node samples
    #[default]
    Receiving,
    /// This node drives DATA
    Transmitting,
}

impl TransferDirection {
    pub fn is_transmitting(&self) -> bool {
        matches!(self, TransferDirection::Transmitting)
    }
}

/// Switch DATA to output and drive `first`
///
/// Returns `false`, leaving DATA untouched, when BUSY is released.
#[inline]
pub(crate) fn enter_transmit<P: LineDriver>(pins: &mut P, first: Level) -> bool {
    if pins.read(Line::Busy).is_high() {
        return false;
    }
    pins.set_direction(Line::Data, Direction::Output);
    pins.write(Line::Data, first);
    true
}

/// Release DATA back to input
#[inline]
pub(crate) fn enter_receive<P: LineDriver>(pins: &mut P) {
    pins.release(Line::Data);
}

#[cfg(test)]
mod tests {
    use super::*;
    use melbus_hal::sim::SimBus;
    use melbus_hal::MelbusPins;

    #[test]
    fn test_transmit_refused_without_busy() {
        let bus = SimBus::new();
        let mut pins = MelbusPins::new(
            bus.line(Line::Clock),
            bus.line(Line::Data),
            bus.line(Line::Busy),
        );
        pins.release_all();

        assert!(!enter_transmit(&mut pins, Level::Low));
        assert_eq!(bus.direction(Line::Data), Direction::Input);
        assert_eq!(bus.data_violations(), 0);
    }

    #[test]
    fn test_transmit_and_release() {
        let bus = SimBus::new();
        let mut pins = MelbusPins::new(
            bus.line(Line::Clock),
            bus.line(Line::Data),
            bus.line(Line::Busy),
        );
        pins.release_all();
        bus.remote(Line::Busy, Level::Low);

        assert!(enter_transmit(&mut pins, Level::Low));
        assert_eq!(bus.level(Line::Data), Level::Low);

        enter_receive(&mut pins);
        assert_eq!(bus.direction(Line::Data), Direction::Input);
        assert_eq!(bus.level(Line::Data), Level::High);
        assert_eq!(bus.data_violations(), 0);
    }
}
