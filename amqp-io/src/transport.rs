//! Byte transport between the AMQP protocol layer and the broker
//!
//! The [`Transport`] owns a single socket and the bytes received but not yet
//! consumed. Every [`Transport::read`] first runs the heartbeat check, which
//! may write a heartbeat frame or, if the peer has been silent for too long,
//! tear the socket down and connect a new one before the read proceeds.

use std::{fmt, time::Duration};

use bytes::{Bytes, BytesMut};
use tokio::time::Instant;

use crate::{
    config::Config,
    error::Error,
    heartbeat::{Heartbeat, HeartbeatAction, HEARTBEAT_FRAME},
    socket::{Connector, Socket},
    tcp::TcpConnector,
};

/// A single connection to the broker
///
/// The transport is not internally synchronized. Every operation takes
/// `&mut self`, so a transport has exactly one caller at a time; share it
/// between tasks only behind an external lock or an owning task.
///
/// # Example
///
/// ```rust,no_run
/// use amqp_io::{Config, Transport};
///
/// # async fn run() -> Result<(), amqp_io::Error> {
/// let config = Config::new("localhost", 5672).heartbeat(60);
/// let mut transport = Transport::new(config);
/// transport.connect().await?;
///
/// transport.write(b"AMQP\x00\x00\x09\x01").await?;
/// let frame_header = transport.read(7).await?;
/// # Ok(())
/// # }
/// ```
pub struct Transport<C: Connector = TcpConnector> {
    config: Config,
    connector: C,
    socket: Option<C::Socket>,
    buffer: BytesMut,
    heartbeat: Heartbeat,
}

impl<C: Connector> fmt::Debug for Transport<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transport")
            .field("config", &self.config)
            .field("connected", &self.is_connected())
            .field("buffered", &self.buffer.len())
            .field("heartbeat", &self.heartbeat)
            .finish()
    }
}

impl Transport<TcpConnector> {
    /// Creates a disconnected transport over TCP
    pub fn new(config: Config) -> Self {
        let connector = TcpConnector::new(config.keepalive);
        Self::with_connector(config, connector)
    }
}

impl<C: Connector> Transport<C> {
    /// Creates a disconnected transport whose sockets are opened by `connector`
    pub fn with_connector(config: Config, connector: C) -> Self {
        if config.read_timeout_shorter_than_heartbeat() {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                read_timeout = ?config.read_timeout,
                heartbeat = config.heartbeat,
                "read timeout is shorter than twice the heartbeat interval"
            );
            #[cfg(feature = "log")]
            log::warn!(
                "read timeout {:?} is shorter than twice the heartbeat interval {}s",
                config.read_timeout,
                config.heartbeat
            );
        }

        Self {
            heartbeat: Heartbeat::new(config.heartbeat),
            config,
            connector,
            socket: None,
            buffer: BytesMut::new(),
        }
    }

    /// The configuration the transport was created with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The underlying socket, `None` when disconnected
    pub fn socket(&self) -> Option<&C::Socket> {
        self.socket.as_ref()
    }

    /// Mutable access to the underlying socket
    pub fn socket_mut(&mut self) -> Option<&mut C::Socket> {
        self.socket.as_mut()
    }

    /// Whether the transport owns a socket
    pub fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    /// Current heartbeat interval in seconds, 0 when monitoring is disabled
    pub fn heartbeat(&self) -> u16 {
        self.heartbeat.interval()
    }

    /// Instant of the last successful read
    pub fn last_read(&self) -> Option<Instant> {
        self.heartbeat.last_read()
    }

    /// Instant of the last successful write
    pub fn last_write(&self) -> Option<Instant> {
        self.heartbeat.last_write()
    }

    /// Number of received bytes not yet returned by [`Transport::read`]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Opens the socket and, if configured, upgrades it to TLS
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(host = %self.config.host, port = self.config.port)))]
    pub async fn connect(&mut self) -> Result<(), Error> {
        if self.socket.is_some() {
            return Err(Error::AlreadyConnected);
        }

        let timeout = self.config.effective_connect_timeout();
        let mut socket = self
            .connector
            .connect(&self.config.host, self.config.port, timeout)
            .await
            .map_err(Error::Connection)?;

        if self.config.tls {
            socket
                .enable_encryption(&self.config.host)
                .await
                .map_err(Error::Connection)?;
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(tls = self.config.tls, "connected");
        #[cfg(feature = "log")]
        log::debug!(
            "connected to {}:{} (tls: {})",
            self.config.host,
            self.config.port,
            self.config.tls
        );

        self.socket = Some(socket);
        Ok(())
    }

    /// Closes the socket and connects a new one.
    ///
    /// Unread buffered bytes are discarded and heartbeat monitoring stays
    /// disabled until [`Transport::reenable_heartbeat`] is called
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    pub async fn reconnect(&mut self) -> Result<(), Error> {
        self.close();
        self.connect().await
    }

    /// Returns exactly `len` bytes, waiting for the socket as long as needed.
    ///
    /// The heartbeat check runs first, so this may write a heartbeat frame or
    /// reconnect the socket before any data is read
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(len = len)))]
    pub async fn read(&mut self, len: usize) -> Result<Bytes, Error> {
        if self.socket.is_none() {
            return Err(Error::NotConnected);
        }
        self.check_heartbeat().await?;

        let timeout = self.config.effective_read_timeout();
        loop {
            if len <= self.buffer.len() {
                let data = self.buffer.split_to(len).freeze();
                self.heartbeat.on_read(Instant::now());
                return Ok(data);
            }

            let socket = self.socket.as_mut().ok_or(Error::NotConnected)?;
            if !socket.is_connected() {
                return Err(Error::ConnectionLost);
            }

            let received = socket
                .recv(&mut self.buffer, timeout)
                .await
                .map_err(Error::Receive)?;
            if received == 0 {
                tokio::task::yield_now().await;
            }
        }
    }

    /// Sends the whole buffer
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(len = buf.len())))]
    pub async fn write(&mut self, buf: &[u8]) -> Result<(), Error> {
        let timeout = self.config.effective_write_timeout();
        let socket = self.socket.as_mut().ok_or(Error::NotConnected)?;

        let sent = socket.send(buf, timeout).await.map_err(Error::Send)?;
        if sent == 0 && !socket.is_connected() {
            return Err(Error::ConnectionLost);
        }

        self.heartbeat.on_write(Instant::now());
        Ok(())
    }

    /// Releases the socket, forgets the read/write instants, drops unread
    /// bytes and disables heartbeat monitoring. Safe to call repeatedly
    pub fn close(&mut self) {
        self.heartbeat.disable();
        if let Some(mut socket) = self.socket.take() {
            socket.close();

            #[cfg(feature = "tracing")]
            tracing::debug!(host = %self.config.host, port = self.config.port, "closed");
            #[cfg(feature = "log")]
            log::debug!("closed connection to {}:{}", self.config.host, self.config.port);
        }
        self.heartbeat.reset();
        self.buffer.clear();
    }

    /// Runs the heartbeat check without reading.
    ///
    /// Reconnects if nothing was read for more than twice the interval,
    /// otherwise writes a heartbeat frame if nothing was written for more
    /// than half of the interval. Returns the action taken
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    pub async fn check_heartbeat(&mut self) -> Result<HeartbeatAction, Error> {
        let action = self.heartbeat.check(Instant::now());
        match action {
            HeartbeatAction::None => {}
            HeartbeatAction::Reconnect => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    heartbeat = self.heartbeat.interval(),
                    "missed heartbeats from the server, reconnecting"
                );
                #[cfg(feature = "log")]
                log::warn!(
                    "missed heartbeats from the server, reconnecting to {}:{}",
                    self.config.host,
                    self.config.port
                );

                self.reconnect().await?;
            }
            HeartbeatAction::Heartbeat => {
                #[cfg(feature = "tracing")]
                tracing::trace!("sending heartbeat");
                #[cfg(feature = "log")]
                log::trace!("sending heartbeat");

                self.write(&HEARTBEAT_FRAME).await?;
            }
        }
        Ok(action)
    }

    /// Liveness poll for callers waiting without reading.
    ///
    /// This backend does not multiplex sockets: it only runs the heartbeat
    /// check and always reports readiness. `timeout` is ignored
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all))]
    pub async fn select(&mut self, _timeout: Option<Duration>) -> Result<bool, Error> {
        self.check_heartbeat().await?;
        Ok(true)
    }

    /// Suspends heartbeat monitoring, e.g. during a long blocking consume
    pub fn disable_heartbeat(&mut self) -> &mut Self {
        self.heartbeat.disable();
        self
    }

    /// Restores the configured heartbeat interval.
    ///
    /// Recorded read/write instants are refreshed so that the suspended time
    /// does not count against the peer
    pub fn reenable_heartbeat(&mut self) -> &mut Self {
        self.heartbeat.reenable(Instant::now());
        self
    }
}

impl<C: Connector> Drop for Transport<C> {
    fn drop(&mut self) {
        self.close();
    }
}
