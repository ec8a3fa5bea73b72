//! Bus line abstractions
//!
//! MELBUS uses three open-drain lines. Each one is switched between input
//! (released, the pull-up holds it high unless another node pulls it low)
//! and output (driven by this node).

/// One of the three MELBUS lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Line {
    /// Bit clock, driven by the bus master
    Clock,
    /// Serial data
    Data,
    /// Active-low bus ownership signal
    Busy,
}

impl Line {
    /// All lines in a fixed order
    pub const ALL: [Line; 3] = [Line::Clock, Line::Data, Line::Busy];

    /// Index into per-line tables
    pub const fn index(self) -> usize {
        match self {
            Line::Clock => 0,
            Line::Data => 1,
            Line::Busy => 2,
        }
    }
}

/// Pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    Input,
    Output,
}

/// Logic level on a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Low,
    High,
}

impl Level {
    /// Level for a data bit (1 = high)
    pub const fn from_bit(bit: bool) -> Self {
        if bit {
            Level::High
        } else {
            Level::Low
        }
    }

    pub const fn is_high(self) -> bool {
        matches!(self, Level::High)
    }

    pub const fn is_low(self) -> bool {
        matches!(self, Level::Low)
    }
}

/// A single bus line
///
/// Implementations wrap whatever the target uses for pin control. All
/// operations are infallible: a register write cannot fail, and misuse
/// (writing while the line is an input) is the caller's contract to uphold.
pub trait BusLine {
    /// Switch the pin direction
    ///
    /// Must be idempotent and touch nothing but the direction.
    fn set_direction(&mut self, direction: Direction);

    /// Current pin direction
    fn direction(&self) -> Direction;

    /// Set the output latch
    ///
    /// Drives the line while the direction is `Output`. Writing `High` to
    /// an input only presets the latch (the released level, a pull-up on
    /// some parts); writing `Low` to an input is a contract violation.
    fn write(&mut self, level: Level);

    /// Read the line
    ///
    /// As an input this is the bus level. As an output the result is
    /// implementation-defined and must not drive protocol decisions.
    /// Takes `&mut self` because `embedded-hal` input reads do.
    fn read(&mut self) -> Level;
}

/// Access to all three lines by name
pub trait LineDriver {
    fn set_direction(&mut self, line: Line, direction: Direction);

    fn direction(&self, line: Line) -> Direction;

    fn write(&mut self, line: Line, level: Level);

    fn read(&mut self, line: Line) -> Level;

    /// Put the line back to input with the output latch high
    ///
    /// The latch is set high first so the next switch to output never
    /// glitches the line low.
    fn release(&mut self, line: Line) {
        self.write(line, Level::High);
        self.set_direction(line, Direction::Input);
    }

    /// Pull the line low as an output
    fn assert_low(&mut self, line: Line) {
        self.set_direction(line, Direction::Output);
        self.write(line, Level::Low);
    }
}

/// The three MELBUS lines bundled into one driver
pub struct MelbusPins<C, D, B> {
    pub clock: C,
    pub data: D,
    pub busy: B,
}

impl<C, D, B> MelbusPins<C, D, B>
where
    C: BusLine,
    D: BusLine,
    B: BusLine,
{
    pub fn new(clock: C, data: D, busy: B) -> Self {
        Self { clock, data, busy }
    }

    /// Release every line to its idle (input, pulled-up) state
    pub fn release_all(&mut self) {
        for line in Line::ALL {
            self.release(line);
        }
    }
}

impl<C, D, B> LineDriver for MelbusPins<C, D, B>
where
    C: BusLine,
    D: BusLine,
    B: BusLine,
{
    #[inline]
    fn set_direction(&mut self, line: Line, direction: Direction) {
        match line {
            Line::Clock => self.clock.set_direction(direction),
            Line::Data => self.data.set_direction(direction),
            Line::Busy => self.busy.set_direction(direction),
        }
    }

    #[inline]
    fn direction(&self, line: Line) -> Direction {
        match line {
            Line::Clock => self.clock.direction(),
            Line::Data => self.data.direction(),
            Line::Busy => self.busy.direction(),
        }
    }

    #[inline]
    fn write(&mut self, line: Line, level: Level) {
        match line {
            Line::Clock => self.clock.write(level),
            Line::Data => self.data.write(level),
            Line::Busy => self.busy.write(level),
        }
    }

    #[inline]
    fn read(&mut self, line: Line) -> Level {
        match line {
            Line::Clock => self.clock.read(),
            Line::Data => self.data.read(),
            Line::Busy => self.busy.read(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeLine {
        direction: Direction,
        latch: Level,
    }

    impl FakeLine {
        fn new() -> Self {
            Self {
                direction: Direction::Input,
                latch: Level::Low,
            }
        }
    }

    impl BusLine for FakeLine {
        fn set_direction(&mut self, direction: Direction) {
            self.direction = direction;
        }

        fn direction(&self) -> Direction {
            self.direction
        }

        fn write(&mut self, level: Level) {
            self.latch = level;
        }

        fn read(&mut self) -> Level {
            match self.direction {
                Direction::Output => self.latch,
                Direction::Input => Level::High,
            }
        }
    }

    fn pins() -> MelbusPins<FakeLine, FakeLine, FakeLine> {
        MelbusPins::new(FakeLine::new(), FakeLine::new(), FakeLine::new())
    }

    #[test]
    fn test_routes_by_line() {
        let mut pins = pins();
        pins.assert_low(Line::Busy);

        assert_eq!(pins.direction(Line::Busy), Direction::Output);
        assert_eq!(pins.read(Line::Busy), Level::Low);
        assert_eq!(pins.direction(Line::Data), Direction::Input);
        assert_eq!(pins.direction(Line::Clock), Direction::Input);
    }

    #[test]
    fn test_release_sets_latch_high_before_input() {
        let mut pins = pins();
        pins.assert_low(Line::Data);
        pins.release(Line::Data);

        assert_eq!(pins.data.latch, Level::High);
        assert_eq!(pins.data.direction, Direction::Input);
        assert_eq!(pins.read(Line::Data), Level::High);
    }

    #[test]
    fn test_release_all() {
        let mut pins = pins();
        pins.assert_low(Line::Clock);
        pins.assert_low(Line::Busy);
        pins.release_all();

        for line in Line::ALL {
            assert_eq!(pins.direction(line), Direction::Input);
        }
    }

    #[test]
    fn test_level_helpers() {
        assert_eq!(Level::from_bit(true), Level::High);
        assert_eq!(Level::from_bit(false), Level::Low);
        assert!(Level::High.is_high());
        assert!(Level::Low.is_low());
    }

    #[test]
    fn test_line_index_is_unique() {
        assert_eq!(Line::Clock.index(), 0);
        assert_eq!(Line::Data.index(), 1);
        assert_eq!(Line::Busy.index(), 2);
    }
}
