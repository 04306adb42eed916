//! Abstraction over the socket owned by a [`crate::Transport`]

use std::{future::Future, io, time::Duration};

use async_trait::async_trait;
use bytes::BytesMut;

/// Creates connected sockets
#[async_trait]
pub trait Connector: Send {
    /// Socket type produced by this connector
    type Socket: Socket;

    /// Opens a connection to `host:port`. A `timeout` of `None` waits indefinitely
    async fn connect(
        &mut self,
        host: &str,
        port: u16,
        timeout: Option<Duration>,
    ) -> io::Result<Self::Socket>;
}

/// A connected, cooperatively scheduled socket
#[async_trait]
pub trait Socket: Send {
    /// Sends the whole buffer and returns the number of bytes sent.
    ///
    /// Implementations backed by a primitive with partial-write semantics must
    /// loop until every byte is written or an error occurs. Returning `Ok(0)`
    /// for a non-empty buffer is only allowed when the socket is no longer
    /// connected
    async fn send(&mut self, buf: &[u8], timeout: Option<Duration>) -> io::Result<usize>;

    /// Receives whatever is available and appends it to `buf`.
    ///
    /// `Ok(0)` is a transient empty receive. A socket that hit end of stream
    /// must report `false` from [`Socket::is_connected`] afterwards
    async fn recv(&mut self, buf: &mut BytesMut, timeout: Option<Duration>) -> io::Result<usize>;

    /// Upgrades the connection to TLS in place
    async fn enable_encryption(&mut self, domain: &str) -> io::Result<()>;

    /// Releases the connection. Calling it more than once is harmless
    fn close(&mut self);

    /// Whether the peer is still believed to be connected
    fn is_connected(&self) -> bool;
}

/// Runs an io future bounded by an optional timeout.
///
/// An elapsed timeout is reported as `io::ErrorKind::TimedOut`
pub(crate) async fn with_timeout<F, T>(
    timeout: Option<Duration>,
    op: &'static str,
    fut: F,
) -> io::Result<T>
where
    F: Future<Output = io::Result<T>>,
{
    match timeout {
        Some(duration) => match tokio::time::timeout(duration, fut).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("{} timed out after {:?}", op, duration),
            )),
        },
        None => fut.await,
    }
}

#[cfg(test)]
mod tests {
    use std::{io, time::Duration};

    use super::with_timeout;

    #[tokio::test(start_paused = true)]
    async fn elapsed_timeout_is_reported_as_timed_out() {
        let result: io::Result<()> = with_timeout(Some(Duration::from_secs(1)), "recv", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert!(err.to_string().starts_with("recv timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn no_timeout_waits_indefinitely() {
        let result = with_timeout(None, "send", async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(7usize)
        })
        .await;

        assert_eq!(result.unwrap(), 7);
    }
}
