//! Stalled frame watchdog
//!
//! The bus has no timeouts of its own: a frame ends when BUSY is released.
//! If the head unit stops clocking halfway through a frame and keeps BUSY
//! asserted, the engine would wait forever, so the main line can give up
//! after a configured time without clock edges.

/// Edge-progress watchdog
#[derive(Debug, Clone)]
pub struct Watchdog {
    timeout_ms: Option<u32>,
    /// Time since the edge count last moved (ms)
    stalled_ms: u32,
    last_edges: u32,
}

impl Watchdog {
    /// `None` disables the watchdog
    pub const fn new(timeout_ms: Option<u32>) -> Self {
        Self {
            timeout_ms,
            stalled_ms: 0,
            last_edges: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.timeout_ms.is_some()
    }

    /// Start counting from `edges`
    pub fn restart(&mut self, edges: u32) {
        self.last_edges = edges;
        self.stalled_ms = 0;
    }

    /// Advance time
    ///
    /// # Arguments
    /// - `edges`: clock edges handled so far (wrapping)
    /// - `active`: a frame is in progress
    /// - `delta_ms`: time elapsed since the last update
    ///
    /// Returns `true` once when the frame should be aborted.
    pub fn update(&mut self, edges: u32, active: bool, delta_ms: u32) -> bool {
        let Some(timeout) = self.timeout_ms else {
            return false;
        };
        if !active || edges != self.last_edges {
            self.restart(edges);
            return false;
        }

        self.stalled_ms = self.stalled_ms.saturating_add(delta_ms);
        if self.stalled_ms >= timeout {
            self.stalled_ms = 0;
            return true;
        }
        false
    }
}
