//! [`Socket`] implementation over `tokio::net::TcpStream`

use std::{io, time::Duration};

use async_trait::async_trait;
use bytes::BytesMut;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{lookup_host, TcpSocket as RawSocket, TcpStream},
};

use crate::{
    socket::{with_timeout, Connector, Socket},
    tls::TlsConnector,
};

/// Capacity reserved in the read buffer before each receive
pub const RECV_CHUNK_SIZE: usize = 8 * 1024;

/// Plain or TLS wrapped stream
pub(crate) enum Stream {
    Tcp(TcpStream),
    #[cfg(feature = "rustls")]
    Rustls(Box<tokio_rustls::client::TlsStream<TcpStream>>),
    #[cfg(feature = "native-tls")]
    NativeTls(Box<tokio_native_tls::TlsStream<TcpStream>>),
}

impl Stream {
    async fn read_buf(&mut self, buf: &mut BytesMut) -> io::Result<usize> {
        match self {
            Stream::Tcp(stream) => stream.read_buf(buf).await,
            #[cfg(feature = "rustls")]
            Stream::Rustls(stream) => stream.read_buf(buf).await,
            #[cfg(feature = "native-tls")]
            Stream::NativeTls(stream) => stream.read_buf(buf).await,
        }
    }

    async fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        match self {
            Stream::Tcp(stream) => stream.write_all(buf).await,
            #[cfg(feature = "rustls")]
            Stream::Rustls(stream) => {
                stream.write_all(buf).await?;
                stream.flush().await
            }
            #[cfg(feature = "native-tls")]
            Stream::NativeTls(stream) => {
                stream.write_all(buf).await?;
                stream.flush().await
            }
        }
    }

    fn is_encrypted(&self) -> bool {
        !matches!(self, Stream::Tcp(_))
    }
}

/// Opens [`TcpSocket`]s
#[derive(Debug, Clone, Default)]
pub struct TcpConnector {
    keepalive: bool,
    tls_connector: Option<TlsConnector>,
}

impl TcpConnector {
    /// `keepalive` sets `SO_KEEPALIVE` on every socket opened by the connector
    pub fn new(keepalive: bool) -> Self {
        Self {
            keepalive,
            tls_connector: None,
        }
    }

    /// Uses a custom connector instead of [`TlsConnector::default_connector`]
    pub fn with_tls_connector(mut self, connector: TlsConnector) -> Self {
        self.tls_connector = Some(connector);
        self
    }

    async fn open(&self, host: &str, port: u16) -> io::Result<TcpStream> {
        let mut last_err = None;
        for addr in lookup_host((host, port)).await? {
            let socket = match addr {
                std::net::SocketAddr::V4(_) => RawSocket::new_v4()?,
                std::net::SocketAddr::V6(_) => RawSocket::new_v6()?,
            };
            socket.set_keepalive(self.keepalive)?;
            match socket.connect(addr).await {
                Ok(stream) => return Ok(stream),
                Err(err) => last_err = Some(err),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{}:{} did not resolve to any address", host, port),
            )
        }))
    }
}

#[async_trait]
impl Connector for TcpConnector {
    type Socket = TcpSocket;

    async fn connect(
        &mut self,
        host: &str,
        port: u16,
        timeout: Option<Duration>,
    ) -> io::Result<TcpSocket> {
        let stream = with_timeout(timeout, "connect", self.open(host, port)).await?;
        Ok(TcpSocket {
            stream: Some(Stream::Tcp(stream)),
            connected: true,
            tls_connector: self.tls_connector.clone(),
        })
    }
}

/// A TCP connection, optionally upgraded to TLS
pub struct TcpSocket {
    stream: Option<Stream>,
    connected: bool,
    tls_connector: Option<TlsConnector>,
}

impl std::fmt::Debug for TcpSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpSocket")
            .field("connected", &self.connected)
            .field("encrypted", &self.is_encrypted())
            .finish()
    }
}

impl TcpSocket {
    /// Whether the connection has been upgraded to TLS
    pub fn is_encrypted(&self) -> bool {
        self.stream.as_ref().map_or(false, Stream::is_encrypted)
    }

    /// The raw TCP stream, if the connection has not been upgraded to TLS
    pub fn tcp_stream(&self) -> Option<&TcpStream> {
        match self.stream.as_ref()? {
            Stream::Tcp(stream) => Some(stream),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }

    fn on_io_error(&mut self, err: &io::Error) {
        if is_disconnect(err) {
            self.connected = false;
        }
    }
}

#[async_trait]
impl Socket for TcpSocket {
    async fn send(&mut self, buf: &[u8], timeout: Option<Duration>) -> io::Result<usize> {
        let stream = match (self.connected, self.stream.as_mut()) {
            (true, Some(stream)) => stream,
            _ => return Ok(0),
        };

        match with_timeout(timeout, "send", stream.write_all(buf)).await {
            Ok(()) => Ok(buf.len()),
            Err(err) => {
                self.on_io_error(&err);
                Err(err)
            }
        }
    }

    async fn recv(&mut self, buf: &mut BytesMut, timeout: Option<Duration>) -> io::Result<usize> {
        let stream = match (self.connected, self.stream.as_mut()) {
            (true, Some(stream)) => stream,
            _ => return Ok(0),
        };

        buf.reserve(RECV_CHUNK_SIZE);
        match with_timeout(timeout, "recv", stream.read_buf(buf)).await {
            Ok(0) => {
                // end of stream
                self.connected = false;
                Ok(0)
            }
            Ok(n) => Ok(n),
            Err(err) => {
                self.on_io_error(&err);
                Err(err)
            }
        }
    }

    async fn enable_encryption(&mut self, domain: &str) -> io::Result<()> {
        let tcp_stream = match self.stream.take() {
            Some(Stream::Tcp(stream)) => stream,
            #[allow(unreachable_patterns)]
            Some(stream) => {
                self.stream = Some(stream);
                return Err(io::Error::new(
                    io::ErrorKind::Other,
                    "Connection is already encrypted",
                ));
            }
            None => return Err(io::ErrorKind::NotConnected.into()),
        };

        #[allow(unused_assignments)]
        let connector = match &self.tls_connector {
            Some(connector) => connector.clone(),
            None => TlsConnector::default_connector()?,
        };
        match connector.connect(domain, tcp_stream).await {
            Ok(stream) => {
                self.stream = Some(stream);
                Ok(())
            }
            Err(err) => {
                // the raw stream was consumed by the failed handshake
                self.connected = false;
                Err(err)
            }
        }
    }

    fn close(&mut self) {
        self.stream = None;
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

fn is_disconnect(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::UnexpectedEof
    )
}
