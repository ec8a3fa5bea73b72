//! `BusLine` over an `embedded-hal` open-drain pin
//!
//! Most HALs expose an open-drain output that can also be read back. On
//! such a pin "input" is the released state (latch high, the pull-up or
//! another node decides the level) and "output" means this node may pull
//! the line low. Any board whose HAL implements the `embedded-hal` 1.0
//! digital traits can be wired to the transceiver through this adapter.

use embedded_hal::digital::{InputPin, OutputPin};

use crate::gpio::{BusLine, Direction, Level};

/// Open-drain pin presented as a switchable bus line
pub struct OpenDrainLine<P> {
    pin: P,
    direction: Direction,
    latch: Level,
}

impl<P> OpenDrainLine<P>
where
    P: OutputPin + InputPin,
{
    /// Wrap a pin already configured as open-drain. The line is released.
    pub fn new(mut pin: P) -> Self {
        let _ = pin.set_high();
        Self {
            pin,
            direction: Direction::Input,
            latch: Level::High,
        }
    }

    /// Give the pin back
    pub fn free(self) -> P {
        self.pin
    }

    fn apply(&mut self) {
        // Only an output with a low latch actually pulls the line
        let pull_low = self.direction == Direction::Output && self.latch.is_low();
        let _ = if pull_low {
            self.pin.set_low()
        } else {
            self.pin.set_high()
        };
    }
}

impl<P> BusLine for OpenDrainLine<P>
where
    P: OutputPin + InputPin,
{
    fn set_direction(&mut self, direction: Direction) {
        if self.direction != direction {
            self.direction = direction;
            self.apply();
        }
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn write(&mut self, level: Level) {
        self.latch = level;
        if self.direction == Direction::Output {
            self.apply();
        }
    }

    fn read(&mut self) -> Level {
        match self.direction {
            Direction::Output => self.latch,
            // A failed read is treated as released
            Direction::Input => match self.pin.is_low() {
                Ok(true) => Level::Low,
                _ => Level::High,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType;

    /// Open-drain pin with a remote node that may pull the wire low
    struct WiredPin {
        driving_low: bool,
        remote_low: bool,
        writes: u32,
    }

    impl ErrorType for WiredPin {
        type Error = Infallible;
    }

    impl OutputPin for WiredPin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.driving_low = true;
            self.writes += 1;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.driving_low = false;
            self.writes += 1;
            Ok(())
        }
    }

    impl InputPin for WiredPin {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(!(self.driving_low || self.remote_low))
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            Ok(self.driving_low || self.remote_low)
        }
    }

    fn wired() -> WiredPin {
        WiredPin {
            driving_low: false,
            remote_low: false,
            writes: 0,
        }
    }

    #[test]
    fn test_starts_released() {
        let mut line = OpenDrainLine::new(wired());
        assert_eq!(line.direction(), Direction::Input);
        assert_eq!(line.read(), Level::High);
    }

    #[test]
    fn test_input_reads_remote_driver() {
        let mut pin = wired();
        pin.remote_low = true;
        let mut line = OpenDrainLine::new(pin);
        assert_eq!(line.read(), Level::Low);
    }

    #[test]
    fn test_latch_only_drives_as_output() {
        let mut line = OpenDrainLine::new(wired());
        line.write(Level::Low);
        assert!(!line.pin.driving_low);

        line.set_direction(Direction::Output);
        assert!(line.pin.driving_low);

        line.set_direction(Direction::Input);
        assert!(!line.pin.driving_low);
    }

    #[test]
    fn test_set_direction_is_idempotent() {
        let mut line = OpenDrainLine::new(wired());
        line.set_direction(Direction::Output);
        let writes = line.pin.writes;

        line.set_direction(Direction::Output);
        assert_eq!(line.pin.writes, writes);
        assert_eq!(line.direction(), Direction::Output);
    }
}
