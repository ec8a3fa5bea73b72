//! Staged replies
//!
//! When this node is addressed, the first reply bit is due on the clock
//! edge right after the last command bit. There is no time to ask the
//! application; the reply has to be staged beforehand. The interpreter
//! stages `(command bytes -> reply bytes)` entries from the main line and
//! the assembler matches the bytes following the address against them
//! from the clock interrupt.

use heapless::Vec;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Longest command (bytes after the address) that can trigger a reply
pub const MAX_COMMAND_LEN: usize = 8;

/// Longest reply that can be staged
pub const MAX_REPLY_LEN: usize = 32;

/// Errors while staging a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReplyError {
    /// No free slot in the table
    TableFull,
    /// Command longer than [`MAX_COMMAND_LEN`]
    CommandTooLong,
    /// Reply longer than [`MAX_REPLY_LEN`]
    ReplyTooLong,
    /// Command or reply has no bytes
    Empty,
}

/// One staged reply
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reply {
    command: Vec<u8, MAX_COMMAND_LEN>,
    bytes: Vec<u8, MAX_REPLY_LEN>,
    /// Withdraw the entry after it has been sent once
    one_shot: bool,
}

impl Reply {
    /// Reply sent every time `command` is received
    pub fn new(command: &[u8], bytes: &[u8]) -> Result<Self, ReplyError> {
        Self::build(command, bytes, false)
    }

    /// Reply sent the next time `command` is received, then withdrawn
    pub fn once(command: &[u8], bytes: &[u8]) -> Result<Self, ReplyError> {
        Self::build(command, bytes, true)
    }

    fn build(command: &[u8], bytes: &[u8], one_shot: bool) -> Result<Self, ReplyError> {
        if command.is_empty() || bytes.is_empty() {
            return Err(ReplyError::Empty);
        }
        Ok(Self {
            command: Vec::from_slice(command).map_err(|_| ReplyError::CommandTooLong)?,
            bytes: Vec::from_slice(bytes).map_err(|_| ReplyError::ReplyTooLong)?,
            one_shot,
        })
    }

    pub fn command(&self) -> &[u8] {
        &self.command
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn is_one_shot(&self) -> bool {
        self.one_shot
    }
}

/// Fixed-capacity table of staged replies
#[derive(Debug, Clone, Default)]
pub struct ReplyTable<const N: usize> {
    entries: Vec<Reply, N>,
}

impl<const N: usize> ReplyTable<N> {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Stage a reply, replacing any entry for the same command
    pub fn stage(&mut self, reply: Reply) -> Result<(), ReplyError> {
        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|e| e.command == reply.command)
        {
            *existing = reply;
            return Ok(());
        }
        self.entries.push(reply).map_err(|_| ReplyError::TableFull)
    }

    /// Remove the entry for a command. Returns whether one existed.
    pub fn withdraw(&mut self, command: &[u8]) -> bool {
        match self.entries.iter().position(|e| e.command.as_slice() == command) {
            Some(index) => {
                self.entries.swap_remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether any staged command starts with `prefix`
    ///
    /// Lets the assembler stop comparing once no entry can match.
    pub fn has_prefix(&self, prefix: &[u8]) -> bool {
        self.entries.iter().any(|e| e.command.starts_with(prefix))
    }

    /// Entry for an exact command match
    ///
    /// One-shot entries stay staged until [`Self::withdraw`] is called for
    /// them.
    pub fn find(&self, command: &[u8]) -> Option<&Reply> {
        self.entries.iter().find(|e| e.command.as_slice() == command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_and_find() {
        let mut table = ReplyTable::<4>::new();
        table.stage(Reply::new(&[0x1E], &[0xAA, 0x55]).unwrap()).unwrap();

        assert_eq!(table.find(&[0x1E]).unwrap().bytes(), &[0xAA, 0x55]);
        assert!(table.find(&[0x1F]).is_none());
    }

    #[test]
    fn test_one_shot_stays_until_withdrawn() {
        let mut table = ReplyTable::<4>::new();
        table.stage(Reply::once(&[0x01, 0x02], &[0x03]).unwrap()).unwrap();

        assert!(table.find(&[0x01, 0x02]).unwrap().is_one_shot());
        assert!(table.find(&[0x01, 0x02]).is_some());
        assert!(table.withdraw(&[0x01, 0x02]));
        assert!(table.is_empty());
    }

    #[test]
    fn test_stage_replaces_same_command() {
        let mut table = ReplyTable::<1>::new();
        table.stage(Reply::new(&[0x1E], &[0x01]).unwrap()).unwrap();
        table.stage(Reply::new(&[0x1E], &[0x02]).unwrap()).unwrap();

        assert_eq!(table.len(), 1);
        assert_eq!(table.find(&[0x1E]).unwrap().bytes(), &[0x02]);
    }

    #[test]
    fn test_table_full() {
        let mut table = ReplyTable::<1>::new();
        table.stage(Reply::new(&[0x01], &[0x01]).unwrap()).unwrap();
        assert_eq!(
            table.stage(Reply::new(&[0x02], &[0x01]).unwrap()),
            Err(ReplyError::TableFull)
        );
    }

    #[test]
    fn test_prefix_matching() {
        let mut table = ReplyTable::<2>::new();
        table.stage(Reply::new(&[0x10, 0x20], &[0x01]).unwrap()).unwrap();

        assert!(table.has_prefix(&[]));
        assert!(table.has_prefix(&[0x10]));
        assert!(!table.has_prefix(&[0x11]));
        assert!(table.find(&[0x10]).is_none());
    }

    #[test]
    fn test_withdraw() {
        let mut table = ReplyTable::<2>::new();
        table.stage(Reply::new(&[0x10], &[0x01]).unwrap()).unwrap();
        assert!(table.withdraw(&[0x10]));
        assert!(!table.withdraw(&[0x10]));
    }

    #[test]
    fn test_reply_limits() {
        assert_eq!(Reply::new(&[], &[1]), Err(ReplyError::Empty));
        assert_eq!(Reply::new(&[1], &[]), Err(ReplyError::Empty));
        assert_eq!(
            Reply::new(&[0u8; MAX_COMMAND_LEN + 1], &[1]),
            Err(ReplyError::CommandTooLong)
        );
        assert_eq!(
            Reply::new(&[1], &[0u8; MAX_REPLY_LEN + 1]),
            Err(ReplyError::ReplyTooLong)
        );
    }
}
