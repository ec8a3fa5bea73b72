//! Simulated MELBUS wiring for host tests
//!
//! [`SimBus`] models three wired-AND lines with pull-ups: a line reads low
//! when either this node (output, latch low) or the remote head unit pulls
//! it. It also models the clock edge interrupt latch and a tick timer, and
//! keeps counters for the invariants tests care about:
//!
//! - DATA driven while BUSY is released on the bus
//! - an interrupt unmasked with a stale edge still latched
//! - an edge dispatched before the previous one was acknowledged
//! - bits clocked out by this node when it drives CLOCK itself
//!
//! Everything lives in `Cell`s so the line handles, the interrupt handles
//! and the test harness can all borrow the bus at once.

use core::cell::Cell;

use crate::gpio::{BusLine, Direction, Level, Line};
use crate::interrupt::InterruptSource;

/// Maximum number of bits captured from self-clocked transfers
pub const CAPTURE_BITS: usize = 1024;

/// Which simulated interrupt source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimIrq {
    /// Clock line edge interrupt
    Clock,
    /// General purpose tick timer
    Timer,
}

impl SimIrq {
    const fn index(self) -> usize {
        match self {
            SimIrq::Clock => 0,
            SimIrq::Timer => 1,
        }
    }
}

/// Shared state of the simulated bus
pub struct SimBus {
    remote_low: [Cell<bool>; 3],
    direction: [Cell<Direction>; 3],
    latch: [Cell<Level>; 3],
    direction_changes: [Cell<u32>; 3],
    irq_enabled: [Cell<bool>; 2],
    irq_pending: [Cell<bool>; 2],
    stale_dispatches: Cell<u32>,
    /// Dispatched edge not yet acknowledged by the handler
    in_service: [Cell<bool>; 2],
    unacknowledged: Cell<u32>,
    self_dispatches: Cell<u32>,
    data_violations: Cell<u32>,
    captured: [Cell<bool>; CAPTURE_BITS],
    captured_len: Cell<usize>,
    captured_busy_high: Cell<u32>,
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBus {
    /// All lines released, all interrupts masked
    pub fn new() -> Self {
        Self {
            remote_low: core::array::from_fn(|_| Cell::new(false)),
            direction: core::array::from_fn(|_| Cell::new(Direction::Input)),
            latch: core::array::from_fn(|_| Cell::new(Level::Low)),
            direction_changes: core::array::from_fn(|_| Cell::new(0)),
            irq_enabled: core::array::from_fn(|_| Cell::new(false)),
            irq_pending: core::array::from_fn(|_| Cell::new(false)),
            stale_dispatches: Cell::new(0),
            in_service: core::array::from_fn(|_| Cell::new(false)),
            unacknowledged: Cell::new(0),
            self_dispatches: Cell::new(0),
            data_violations: Cell::new(0),
            captured: core::array::from_fn(|_| Cell::new(false)),
            captured_len: Cell::new(0),
            captured_busy_high: Cell::new(0),
        }
    }

    /// Handle for one line
    pub fn line(&self, line: Line) -> SimLine<'_> {
        SimLine { bus: self, line }
    }

    /// Handle for one interrupt source
    pub fn irq(&self, irq: SimIrq) -> SimInterrupt<'_> {
        SimInterrupt { bus: self, irq }
    }

    /// Wired level of a line
    pub fn level(&self, line: Line) -> Level {
        let i = line.index();
        let local_low =
            self.direction[i].get() == Direction::Output && self.latch[i].get() == Level::Low;
        if local_low || self.remote_low[i].get() {
            Level::Low
        } else {
            Level::High
        }
    }

    /// The remote head unit pulls (`Low`) or releases (`High`) a line
    pub fn remote(&self, line: Line, level: Level) {
        self.remote_low[line.index()].set(level.is_low());
    }

    /// Whether the remote side is pulling the line low
    pub fn remote_is_low(&self, line: Line) -> bool {
        self.remote_low[line.index()].get()
    }

    /// Direction this node has configured for a line
    pub fn direction(&self, line: Line) -> Direction {
        self.direction[line.index()].get()
    }

    /// Number of actual direction changes on a line
    pub fn direction_changes(&self, line: Line) -> u32 {
        self.direction_changes[line.index()].get()
    }

    /// A clock edge produced by the remote master
    ///
    /// Returns `true` when the edge interrupt would run now. Otherwise the
    /// edge is latched as pending, as the controller would.
    pub fn remote_edge(&self) -> bool {
        self.edge()
    }

    pub fn irq_enabled(&self, irq: SimIrq) -> bool {
        self.irq_enabled[irq.index()].get()
    }

    pub fn irq_pending(&self, irq: SimIrq) -> bool {
        self.irq_pending[irq.index()].get()
    }

    /// Times an interrupt was unmasked with an edge still latched
    pub fn stale_dispatches(&self) -> u32 {
        self.stale_dispatches.get()
    }

    /// Times an edge was dispatched while the previous one was still
    /// unacknowledged
    pub fn unacknowledged_dispatches(&self) -> u32 {
        self.unacknowledged.get()
    }

    /// Whether the last dispatched edge is still unacknowledged
    pub fn in_service(&self, irq: SimIrq) -> bool {
        self.in_service[irq.index()].get()
    }

    /// Times this node's own clocking reached its unmasked edge interrupt
    pub fn self_dispatches(&self) -> u32 {
        self.self_dispatches.get()
    }

    /// Times DATA was switched to output, or driven low, with BUSY released
    pub fn data_violations(&self) -> u32 {
        self.data_violations.get()
    }

    /// Bits sampled on rising edges of a clock this node generated
    pub fn captured_bits(&self) -> impl Iterator<Item = bool> + '_ {
        self.captured[..self.captured_len.get()]
            .iter()
            .map(Cell::get)
    }

    pub fn captured_len(&self) -> usize {
        self.captured_len.get()
    }

    /// Self-clocked bits that were captured while BUSY was released
    pub fn captured_busy_high(&self) -> u32 {
        self.captured_busy_high.get()
    }

    fn edge(&self) -> bool {
        let clock = SimIrq::Clock.index();
        if self.irq_enabled[clock].get() {
            if self.in_service[clock].replace(true) {
                self.unacknowledged.set(self.unacknowledged.get() + 1);
            }
            true
        } else {
            self.irq_pending[clock].set(true);
            false
        }
    }

    /// Called when DATA becomes an output or is driven low
    fn check_data_drive(&self) {
        if self.level(Line::Busy).is_high() {
            self.data_violations.set(self.data_violations.get() + 1);
        }
    }

    fn capture(&self) {
        let len = self.captured_len.get();
        if len < CAPTURE_BITS {
            self.captured[len].set(self.level(Line::Data).is_high());
            self.captured_len.set(len + 1);
        }
        if self.level(Line::Busy).is_high() {
            self.captured_busy_high.set(self.captured_busy_high.get() + 1);
        }
    }
}

/// One simulated line
pub struct SimLine<'a> {
    bus: &'a SimBus,
    line: Line,
}

impl BusLine for SimLine<'_> {
    fn set_direction(&mut self, direction: Direction) {
        let i = self.line.index();
        if self.bus.direction[i].get() == direction {
            return;
        }
        let before = self.bus.level(self.line);
        self.bus.direction[i].set(direction);
        self.bus.direction_changes[i].set(self.bus.direction_changes[i].get() + 1);
        if self.line == Line::Data && direction == Direction::Output {
            self.bus.check_data_drive();
        }
        self.after_change(before);
    }

    fn direction(&self) -> Direction {
        self.bus.direction[self.line.index()].get()
    }

    fn write(&mut self, level: Level) {
        let before = self.bus.level(self.line);
        self.bus.latch[self.line.index()].set(level);
        if self.line == Line::Data && level.is_low() && self.direction() == Direction::Output {
            self.bus.check_data_drive();
        }
        self.after_change(before);
    }

    fn read(&mut self) -> Level {
        match self.direction() {
            Direction::Output => self.bus.latch[self.line.index()].get(),
            Direction::Input => self.bus.level(self.line),
        }
    }
}

impl SimLine<'_> {
    fn after_change(&self, before: Level) {
        // A rising clock edge made by this node: the remote samples DATA
        // and the local edge interrupt sees it as well.
        if self.line == Line::Clock
            && before.is_low()
            && self.bus.level(Line::Clock).is_high()
            && !self.bus.remote_is_low(Line::Clock)
        {
            self.bus.capture();
            if self.bus.edge() {
                self.bus
                    .self_dispatches
                    .set(self.bus.self_dispatches.get() + 1);
            }
        }
    }
}

/// One simulated interrupt source
pub struct SimInterrupt<'a> {
    bus: &'a SimBus,
    irq: SimIrq,
}

impl InterruptSource for SimInterrupt<'_> {
    fn enable(&mut self) {
        let i = self.irq.index();
        if !self.bus.irq_enabled[i].get() && self.bus.irq_pending[i].get() {
            self.bus
                .stale_dispatches
                .set(self.bus.stale_dispatches.get() + 1);
            self.bus.irq_pending[i].set(false);
        }
        self.bus.irq_enabled[i].set(true);
    }

    fn disable(&mut self) {
        self.bus.irq_enabled[self.irq.index()].set(false);
    }

    fn clear_pending(&mut self) {
        self.bus.irq_pending[self.irq.index()].set(false);
    }

    fn is_enabled(&self) -> bool {
        self.bus.irq_enabled[self.irq.index()].get()
    }

    fn acknowledge(&mut self) {
        self.bus.in_service[self.irq.index()].set(false);
    }
}
