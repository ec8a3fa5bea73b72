//! Frame assembler and bus arbiter
//!
//! Consumes the bytes the sampler completes, tracks frame boundaries,
//! decides from the address byte whether this node is addressed, and
//! starts a staged reply when the command calls for one. Completed frames
//! are parked in a single slot until the transceiver forwards them.
//!
//! All methods taking bytes run in the clock interrupt and do constant
//! work per byte apart from the reply table scan and a checksum pass at
//! frame end.

pub mod events;
pub mod phase;

pub use events::AssemblerEvent;
pub use phase::Phase;

use heapless::Vec;
use melbus_protocol::{
    Frame, FrameError, FrameLayout, Progress, Reply, ReplyError, ReplyTable, MAX_REPLY_LEN,
};

use crate::config::{NodeConfig, ObserverPolicy};

/// This node's part in the current frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Role {
    /// The frame is addressed to this node
    #[default]
    Addressed,
    /// The frame is for another node and is only listened to
    Observer,
}

/// A completed frame handed upward
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Delivery {
    pub role: Role,
    pub frame: Frame,
    /// Reply bytes clocked out during the frame
    pub replied: u8,
}

/// What the transceiver must do after a byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    /// Keep sampling
    Continue,
    /// Start transmitting with this byte on the very next edge
    Respond(u8),
    /// Nothing more to do until BUSY is released
    Stop,
    /// The frame was dropped
    Abort(FrameError),
}

pub struct FrameAssembler<const R: usize> {
    address: u8,
    layout: FrameLayout,
    observer: ObserverPolicy,
    phase: Phase,
    role: Role,
    frame: Frame,
    replies: ReplyTable<R>,
    tx: Vec<u8, MAX_REPLY_LEN>,
    tx_pos: usize,
    replied: u8,
    /// Some staged command may still match the payload
    match_open: bool,
    /// The reply in progress withdraws its entry once it goes out
    one_shot: bool,
    /// The length rule already closed the frame
    closed: bool,
    ready: Option<Delivery>,
}

impl<const R: usize> FrameAssembler<R> {
    pub fn new(config: &NodeConfig) -> Self {
        Self {
            address: config.address,
            layout: config.layout,
            observer: config.observer,
            phase: Phase::Idle,
            role: Role::Addressed,
            frame: Frame::new(),
            replies: ReplyTable::new(),
            tx: Vec::new(),
            tx_pos: 0,
            replied: 0,
            match_open: false,
            one_shot: false,
            closed: false,
            ready: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Bytes received so far in the current frame
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    /// Stage a reply
    ///
    /// Takes effect from the next frame on; the match state of a frame in
    /// progress is not recomputed.
    pub fn stage_reply(&mut self, reply: Reply) -> Result<(), ReplyError> {
        self.replies.stage(reply)
    }

    pub fn withdraw_reply(&mut self, command: &[u8]) -> bool {
        self.replies.withdraw(command)
    }

    pub fn clear_replies(&mut self) {
        self.replies.clear();
    }

    /// BUSY was asserted
    pub fn begin(&mut self) {
        self.reset_frame();
        self.match_open = !self.replies.is_empty();
        self.phase = Phase::Idle.transition(AssemblerEvent::BusActive);
    }

    /// A whole unit arrived
    pub(crate) fn on_byte(&mut self, byte: u8) -> Action {
        if !matches!(self.phase, Phase::Address | Phase::Payload) {
            return Action::Stop;
        }
        if self.frame.push(byte).is_err() {
            return self.fail(FrameError::Overflow);
        }

        if self.phase == Phase::Address {
            let event = if byte == self.address {
                self.role = Role::Addressed;
                AssemblerEvent::AddressMatched
            } else if self.observer == ObserverPolicy::Snoop {
                self.role = Role::Observer;
                AssemblerEvent::AddressForeign
            } else {
                AssemblerEvent::AddressIgnored
            };
            self.phase = self.phase.transition(event);
            if event == AssemblerEvent::AddressIgnored {
                self.frame.clear();
                return Action::Stop;
            }
        }

        match self.layout.progress(self.frame.as_slice()) {
            Progress::Invalid(err) => self.fail(err),
            Progress::Complete => {
                self.closed = true;
                match self.lookup_reply() {
                    Some(first) => Action::Respond(first),
                    None => {
                        self.complete();
                        Action::Stop
                    }
                }
            }
            Progress::Incomplete => match self.lookup_reply() {
                Some(first) => Action::Respond(first),
                None => Action::Continue,
            },
        }
    }

    /// The current reply byte was fully sampled; the next one, if any
    pub(crate) fn next_reply_byte(&mut self) -> Option<u8> {
        self.replied = self.replied.saturating_add(1);
        let next = self.tx.get(self.tx_pos).copied();
        if next.is_some() {
            self.tx_pos += 1;
        }
        next
    }

    /// The first reply bit is on the wire
    pub(crate) fn reply_started(&mut self) {
        if core::mem::take(&mut self.one_shot) {
            self.replies.withdraw(self.frame.payload());
        }
    }

    /// The reply ran out
    pub(crate) fn reply_done(&mut self) -> Action {
        self.tx.clear();
        self.phase = self.phase.transition(AssemblerEvent::ReplySent);
        if self.closed {
            self.complete();
            Action::Stop
        } else {
            Action::Continue
        }
    }

    /// The reply could not be started
    ///
    /// A one-shot reply stays staged for the next frame.
    pub(crate) fn cancel_reply(&mut self) -> Action {
        self.one_shot = false;
        self.replied = 0;
        self.reply_done()
    }

    /// BUSY was released
    ///
    /// `partial_unit` is set when some bits of an unfinished unit were
    /// sampled. A frame that was already closed, dropped or ignored
    /// produces nothing here.
    pub fn release(&mut self, partial_unit: bool) -> Result<(), FrameError> {
        let phase = self.phase;
        self.phase = phase.transition(AssemblerEvent::BusReleased);

        let result = match phase {
            Phase::Idle => Ok(()),
            Phase::Address if self.frame.is_empty() && !partial_unit => Ok(()),
            Phase::Responding => Err(FrameError::Truncated),
            _ if partial_unit => Err(FrameError::Truncated),
            _ => self.layout.close(self.frame.as_slice()),
        };

        match result {
            Ok(()) if phase.is_active() && !self.frame.is_empty() => self.park(),
            _ => self.reset_frame(),
        }
        result
    }

    /// Drop the frame in progress
    pub fn abort(&mut self) {
        self.phase = self.phase.transition(AssemblerEvent::Stalled);
        self.reset_frame();
    }

    /// Completed frame waiting to be forwarded
    pub fn take_ready(&mut self) -> Option<Delivery> {
        self.ready.take()
    }

    fn lookup_reply(&mut self) -> Option<u8> {
        if self.role != Role::Addressed || !self.match_open {
            return None;
        }
        let command = self.frame.payload();
        if command.is_empty() {
            return None;
        }

        match self.replies.find(command) {
            Some(reply) => {
                self.match_open = false;
                let first = *reply.bytes().first()?;
                self.tx = Vec::from_slice(reply.bytes()).ok()?;
                self.one_shot = reply.is_one_shot();
                self.tx_pos = 1;
                self.replied = 0;
                self.phase = self.phase.transition(AssemblerEvent::ReplyOwed);
                Some(first)
            }
            None => {
                self.match_open = self.replies.has_prefix(command);
                None
            }
        }
    }

    fn complete(&mut self) {
        self.phase = self.phase.transition(AssemblerEvent::FrameComplete);
        self.park();
    }

    fn park(&mut self) {
        self.ready = Some(Delivery {
            role: self.role,
            frame: core::mem::take(&mut self.frame),
            replied: self.replied,
        });
        self.reset_frame();
    }

    fn fail(&mut self, err: FrameError) -> Action {
        self.phase = self.phase.transition(AssemblerEvent::Violation);
        self.reset_frame();
        Action::Abort(err)
    }

    fn reset_frame(&mut self) {
        self.frame.clear();
        self.role = Role::Addressed;
        self.tx.clear();
        self.tx_pos = 0;
        self.replied = 0;
        self.match_open = false;
        self.one_shot = false;
        self.closed = false;
    }
}
