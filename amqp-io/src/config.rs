//! Transport configuration

use std::time::Duration;

/// Default AMQP 0-9-1 port
pub const DEFAULT_PORT: u16 = 5672;

/// Default timeout for connect, read and write
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Configuration consumed by [`crate::Transport`] at construction
///
/// A zero duration means "wait indefinitely".
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use amqp_io::Config;
///
/// let config = Config::new("localhost", 5672)
///     .read_timeout(Duration::from_secs(130))
///     .heartbeat(60)
///     .keepalive(true);
/// assert_eq!(config.heartbeat, 60);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Broker host name or address
    pub host: String,

    /// Broker port
    pub port: u16,

    /// Timeout of the raw connect. Falls back to the larger of the read and
    /// write timeouts when unset
    pub connect_timeout: Option<Duration>,

    /// Timeout of a single receive
    pub read_timeout: Duration,

    /// Timeout of a single send
    pub write_timeout: Duration,

    /// Passed through to the socket as `SO_KEEPALIVE`
    pub keepalive: bool,

    /// Heartbeat interval in seconds, 0 disables monitoring
    pub heartbeat: u16,

    /// Upgrade the connection to TLS right after the raw connect
    pub tls: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::new("localhost", DEFAULT_PORT)
    }
}

impl Config {
    /// Creates a configuration with 3 second timeouts, no heartbeat and no TLS
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout: Some(DEFAULT_TIMEOUT),
            read_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
            keepalive: false,
            heartbeat: 0,
            tls: false,
        }
    }

    /// Sets the connect timeout. `None` falls back to the read and write timeouts
    pub fn connect_timeout(mut self, timeout: impl Into<Option<Duration>>) -> Self {
        self.connect_timeout = timeout.into();
        self
    }

    /// Sets the read timeout
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Sets the write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Sets both the read and the write timeout
    pub fn read_write_timeout(self, timeout: Duration) -> Self {
        self.read_timeout(timeout).write_timeout(timeout)
    }

    /// Enables `SO_KEEPALIVE`
    pub fn keepalive(mut self, keepalive: bool) -> Self {
        self.keepalive = keepalive;
        self
    }

    /// Sets the heartbeat interval in seconds
    pub fn heartbeat(mut self, seconds: u16) -> Self {
        self.heartbeat = seconds;
        self
    }

    /// Enables the TLS upgrade
    pub fn tls(mut self, enabled: bool) -> Self {
        self.tls = enabled;
        self
    }

    /// Effective connect timeout, `None` meaning no timeout
    pub fn effective_connect_timeout(&self) -> Option<Duration> {
        match self.connect_timeout {
            Some(timeout) => bounded(timeout),
            None => bounded(std::cmp::max(self.read_timeout, self.write_timeout)),
        }
    }

    /// Effective read timeout, `None` meaning no timeout
    pub fn effective_read_timeout(&self) -> Option<Duration> {
        bounded(self.read_timeout)
    }

    /// Effective write timeout, `None` meaning no timeout
    pub fn effective_write_timeout(&self) -> Option<Duration> {
        bounded(self.write_timeout)
    }

    /// Whether a non-zero read timeout would expire before a silent peer is
    /// declared dead by the heartbeat check
    pub(crate) fn read_timeout_shorter_than_heartbeat(&self) -> bool {
        self.heartbeat != 0
            && !self.read_timeout.is_zero()
            && self.read_timeout < Duration::from_secs(u64::from(self.heartbeat) * 2)
    }
}

fn bounded(duration: Duration) -> Option<Duration> {
    match duration.is_zero() {
        true => None,
        false => Some(duration),
    }
}
