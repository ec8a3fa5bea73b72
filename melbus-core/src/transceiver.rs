//! The transceiver device handle
//!
//! One value owns the three lines, the clock edge interrupt and an
//! optional tick timer. It runs in two contexts:
//!
//! - [`Transceiver::on_clock_edge`] from the clock edge interrupt, once
//!   per rising edge. Never blocks, never logs.
//! - [`Transceiver::service`] (or just [`Transceiver::poll_bus`]) from the
//!   main loop, always inside a critical section that masks the clock
//!   interrupt. See [`crate::SharedTransceiver`].
//!
//! After [`Transceiver::init`] the clock interrupt stays armed while the bus
//! is idle. The first edge seen with BUSY asserted opens a frame, and the
//! first edge seen with BUSY released closes it, whichever context gets
//! there first. When a frame is finished early (ignored, dropped or closed
//! by its length) the interrupt is masked until BUSY is released, and the
//! release re-arms it with the latched edge cleared.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Sender};
use melbus_hal::{InterruptSource, Line, LineDriver, NoInterrupt};
use melbus_protocol::{FrameError, Reply, ReplyError};

use crate::assembler::{Action, Delivery, FrameAssembler, Phase, Role};
use crate::config::{ConfigError, NodeConfig};
use crate::direction::{self, TransferDirection};
use crate::sampler::BitClockSampler;
use crate::stats::{bump, Stats};
use crate::watchdog::Watchdog;

/// Frames that can wait for the interpreter
pub const DELIVERY_DEPTH: usize = 4;

/// Replies that can be staged at once
pub const REPLY_SLOTS: usize = 8;

/// Queue of completed frames
pub type DeliveryChannel = Channel<CriticalSectionRawMutex, Delivery, DELIVERY_DEPTH>;

/// Producer side of a [`DeliveryChannel`]
pub type DeliverySender<'a> = Sender<'a, CriticalSectionRawMutex, Delivery, DELIVERY_DEPTH>;

/// BUSY change seen by the main line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusTransition {
    /// BUSY was asserted
    Active,
    /// BUSY was released
    Idle,
}

pub struct Transceiver<'a, P, C, T = NoInterrupt> {
    pub(crate) pins: P,
    pub(crate) clock_irq: C,
    pub(crate) timer: T,
    pub(crate) config: NodeConfig,
    sampler: BitClockSampler,
    assembler: FrameAssembler<REPLY_SLOTS>,
    direction: TransferDirection,
    pub(crate) bus_active: bool,
    /// Clock edges handled, wrapping
    edges: u32,
    watchdog: Watchdog,
    pub(crate) stats: Stats,
    /// Latest dropped-frame reason, for the main line to report
    fault: Option<FrameError>,
    deliveries: DeliverySender<'a>,
}

impl<'a, P, C, T> Transceiver<'a, P, C, T>
where
    P: LineDriver,
    C: InterruptSource,
    T: InterruptSource,
{
    /// Create a transceiver
    ///
    /// Nothing is touched until [`Self::init`]. Pass [`NoInterrupt`] as the
    /// timer when the board has no tick interrupt worth masking.
    pub fn new(
        pins: P,
        clock_irq: C,
        timer: T,
        config: NodeConfig,
        deliveries: DeliverySender<'a>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            pins,
            clock_irq,
            timer,
            sampler: BitClockSampler::new(config.unit),
            assembler: FrameAssembler::new(&config),
            direction: TransferDirection::Receiving,
            bus_active: false,
            edges: 0,
            watchdog: Watchdog::new(config.watchdog_ms),
            stats: Stats::default(),
            fault: None,
            deliveries,
            config,
        })
    }

    /// Idle every line, then arm the clock interrupt
    ///
    /// If BUSY is already asserted the frame in flight is not joined; the
    /// interrupt stays masked until it is released.
    pub fn init(&mut self) {
        self.clock_irq.disable();
        for line in Line::ALL {
            self.pins.release(line);
        }
        self.direction = TransferDirection::Receiving;
        self.sampler.reset();
        self.assembler.abort();

        self.bus_active = self.pins.read(Line::Busy).is_low();
        if self.bus_active {
            warn!("bus busy at init, waiting for release");
        } else {
            self.clock_irq.rearm();
        }
        info!("melbus node {=u8:#x} ready", self.config.address);
    }

    /// Clock edge interrupt handler body
    pub fn on_clock_edge(&mut self) {
        self.clock_irq.acknowledge();
        let busy_released = self.pins.read(Line::Busy).is_high();
        if !self.bus_active {
            if busy_released {
                return;
            }
            self.open_frame();
        } else if busy_released {
            // Released since the last edge; this edge is outside the frame
            self.close_frame();
            return;
        }
        if !self.assembler.phase().is_active() {
            return;
        }
        self.edges = self.edges.wrapping_add(1);

        if self.direction.is_transmitting() {
            self.transmit_edge();
        } else {
            self.receive_edge();
        }
    }

    /// Check BUSY for a bus transition
    ///
    /// Called by [`Self::service`], or from a BUSY pin change interrupt on
    /// boards that have one.
    pub fn poll_bus(&mut self) -> Option<BusTransition> {
        let busy_low = self.pins.read(Line::Busy).is_low();
        match (self.bus_active, busy_low) {
            (false, true) => {
                self.open_frame();
                Some(BusTransition::Active)
            }
            (true, false) => {
                self.close_frame();
                Some(BusTransition::Idle)
            }
            _ => None,
        }
    }

    /// Main line housekeeping
    ///
    /// Polls BUSY, reports dropped frames and runs the stall watchdog.
    /// `elapsed_ms` is the time since the previous call.
    pub fn service(&mut self, elapsed_ms: u32) -> Option<BusTransition> {
        let transition = self.poll_bus();
        if let Some(transition) = transition {
            trace!("bus {}", transition);
        }

        if let Some(err) = self.fault.take() {
            warn!("frame dropped: {}", err);
        }

        let active = self.bus_active && self.assembler.phase().is_active();
        if self.watchdog.update(self.edges, active, elapsed_ms) {
            warn!("clock stalled, aborting frame");
            bump(&mut self.stats.watchdog_aborts);
            self.pause();
            self.assembler.abort();
        }
        transition
    }

    pub fn stage_reply(&mut self, reply: Reply) -> Result<(), ReplyError> {
        self.assembler.stage_reply(reply)
    }

    pub fn withdraw_reply(&mut self, command: &[u8]) -> bool {
        self.assembler.withdraw_reply(command)
    }

    pub fn clear_replies(&mut self) {
        self.assembler.clear_replies();
    }

    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn phase(&self) -> Phase {
        self.assembler.phase()
    }

    pub fn role(&self) -> Role {
        self.assembler.role()
    }

    pub fn direction(&self) -> TransferDirection {
        self.direction
    }

    pub fn is_bus_active(&self) -> bool {
        self.bus_active
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Latest dropped-frame reason not yet reported by [`Self::service`]
    pub fn last_fault(&self) -> Option<FrameError> {
        self.fault
    }

    /// Release the hardware
    pub fn free(mut self) -> (P, C, T) {
        self.clock_irq.disable();
        for line in Line::ALL {
            self.pins.release(line);
        }
        (self.pins, self.clock_irq, self.timer)
    }

    fn receive_edge(&mut self) {
        let level = self.pins.read(Line::Data);
        if let Some(byte) = self.sampler.sample(level) {
            let action = self.assembler.on_byte(byte);
            self.apply(action);
        }
    }

    fn transmit_edge(&mut self) {
        if let Some(level) = self.sampler.advance() {
            self.pins.write(Line::Data, level);
            return;
        }
        match self.assembler.next_reply_byte() {
            Some(byte) => {
                let level = self.sampler.load(byte);
                self.pins.write(Line::Data, level);
            }
            None => {
                direction::enter_receive(&mut self.pins);
                self.direction = TransferDirection::Receiving;
                bump(&mut self.stats.replies);
                let action = self.assembler.reply_done();
                self.apply(action);
            }
        }
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::Continue => {}
            Action::Respond(first) => {
                let level = self.sampler.load(first);
                if direction::enter_transmit(&mut self.pins, level) {
                    self.direction = TransferDirection::Transmitting;
                    self.assembler.reply_started();
                } else {
                    bump(&mut self.stats.refused_drives);
                    self.sampler.reset();
                    if self.assembler.cancel_reply() == Action::Stop {
                        self.pause();
                    }
                }
            }
            Action::Stop => self.pause(),
            Action::Abort(err) => {
                self.record_fault(err);
                self.pause();
            }
        }
        self.forward_ready();
    }

    /// Stop consuming edges until BUSY is released
    fn pause(&mut self) {
        self.clock_irq.disable();
        if self.direction.is_transmitting() {
            direction::enter_receive(&mut self.pins);
            self.direction = TransferDirection::Receiving;
        }
        self.sampler.reset();
    }

    fn open_frame(&mut self) {
        self.bus_active = true;
        self.direction = TransferDirection::Receiving;
        self.sampler.reset();
        self.assembler.begin();
        self.watchdog.restart(self.edges);
        if self.config.mask_timer_during_frames {
            self.timer.disable();
        }
    }

    fn close_frame(&mut self) {
        self.clock_irq.disable();
        let partial_unit = !self.direction.is_transmitting() && self.sampler.in_progress();
        if self.direction.is_transmitting() {
            direction::enter_receive(&mut self.pins);
            self.direction = TransferDirection::Receiving;
        }
        self.sampler.reset();

        if let Err(err) = self.assembler.release(partial_unit) {
            self.record_fault(err);
        }
        self.forward_ready();

        self.bus_active = false;
        if self.config.mask_timer_during_frames {
            self.timer.enable();
        }
        self.clock_irq.rearm();
    }

    fn record_fault(&mut self, err: FrameError) {
        match err {
            FrameError::Overflow => bump(&mut self.stats.overflows),
            FrameError::Truncated => bump(&mut self.stats.truncated),
            _ => bump(&mut self.stats.framing_errors),
        }
        self.fault = Some(err);
    }

    fn forward_ready(&mut self) {
        let Some(delivery) = self.assembler.take_ready() else {
            return;
        };
        let role = delivery.role;
        match self.deliveries.try_send(delivery) {
            Ok(()) => match role {
                Role::Addressed => bump(&mut self.stats.frames),
                Role::Observer => bump(&mut self.stats.observed),
            },
            Err(_) => bump(&mut self.stats.dropped_full),
        }
    }
}
