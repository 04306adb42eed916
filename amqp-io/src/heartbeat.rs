//! Heartbeat keep-alive bookkeeping
//!
//! The client sends a heartbeat after half of the negotiated interval without
//! any outgoing traffic and presumes the peer dead after twice the interval
//! without any incoming traffic, the same margins AMQP 0-9-1 recommends.

use tokio::time::Instant;

/// Frame type octet of a heartbeat frame
pub const FRAME_HEARTBEAT: u8 = 8;

/// Octet terminating every AMQP 0-9-1 frame
pub const FRAME_END: u8 = 0xCE;

/// A heartbeat frame: type 8, channel 0, payload size 0, frame-end
pub const HEARTBEAT_FRAME: [u8; 8] = [FRAME_HEARTBEAT, 0, 0, 0, 0, 0, 0, FRAME_END];

/// Action the heartbeat check decided on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatAction {
    /// Nothing to do
    None,

    /// A heartbeat frame is (or was) due
    Heartbeat,

    /// The peer is presumed dead and the socket is (or was) reconnected
    Reconnect,
}

/// Tracks the instants of the last successful read and write
#[derive(Debug, Clone)]
pub struct Heartbeat {
    interval: u16,
    initial_interval: u16,
    last_read: Option<Instant>,
    last_write: Option<Instant>,
}

impl Heartbeat {
    /// Creates a monitor with the interval in seconds. 0 disables monitoring
    pub fn new(interval: u16) -> Self {
        Self {
            interval,
            initial_interval: interval,
            last_read: None,
            last_write: None,
        }
    }

    /// Current interval in seconds, 0 while disabled
    pub fn interval(&self) -> u16 {
        self.interval
    }

    /// Whether the interval is non-zero
    pub fn is_enabled(&self) -> bool {
        self.interval != 0
    }

    /// Instant of the last recorded read
    pub fn last_read(&self) -> Option<Instant> {
        self.last_read
    }

    /// Instant of the last recorded write
    pub fn last_write(&self) -> Option<Instant> {
        self.last_write
    }

    /// Records a successful read at `now`
    pub fn on_read(&mut self, now: Instant) {
        self.last_read = Some(now);
    }

    /// Records a successful write at `now`
    pub fn on_write(&mut self, now: Instant) {
        self.last_write = Some(now);
    }

    /// Forgets both timestamps
    pub fn reset(&mut self) {
        self.last_read = None;
        self.last_write = None;
    }

    /// Sets the interval to 0 until [`Heartbeat::reenable`]
    pub fn disable(&mut self) {
        self.interval = 0;
    }

    /// Restores the configured interval.
    ///
    /// Recorded timestamps are moved to `now` so that the time spent disabled
    /// does not count as staleness
    pub fn reenable(&mut self, now: Instant) {
        self.interval = self.initial_interval;
        if self.last_read.is_some() {
            self.last_read = Some(now);
        }
        if self.last_write.is_some() {
            self.last_write = Some(now);
        }
    }

    /// Decides what the transport should do at `now`.
    ///
    /// Nothing happens until both a read and a write have been recorded.
    /// A dead peer takes precedence over a due heartbeat
    pub fn check(&self, now: Instant) -> HeartbeatAction {
        let (last_read, last_write) = match (self.interval, self.last_read, self.last_write) {
            (0, _, _) => return HeartbeatAction::None,
            (_, Some(last_read), Some(last_write)) => (last_read, last_write),
            _ => return HeartbeatAction::None,
        };

        let interval = f64::from(self.interval);
        let read_staleness = staleness_secs(now, last_read);
        let write_staleness = staleness_secs(now, last_write);

        if read_staleness > interval * 2.0 {
            HeartbeatAction::Reconnect
        } else if write_staleness > interval / 2.0 {
            HeartbeatAction::Heartbeat
        } else {
            HeartbeatAction::None
        }
    }
}

/// Elapsed time rounded to whole seconds
fn staleness_secs(now: Instant, then: Instant) -> f64 {
    now.saturating_duration_since(then).as_secs_f64().round()
}
