//! Errors raised by the transport

use std::io;

/// Errors associated with [`crate::Transport`]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The raw connect or the TLS upgrade that follows it failed
    #[error("Error connecting to server: {0}")]
    Connection(#[source] io::Error),

    /// The socket reported that it is no longer connected
    #[error("Broken pipe or closed connection")]
    ConnectionLost,

    /// The socket failed to receive data
    #[error("Error receiving data: {0}")]
    Receive(#[source] io::Error),

    /// The socket failed to send data
    #[error("Error sending data: {0}")]
    Send(#[source] io::Error),

    /// Attempted to read or write before `connect()` or after `close()`
    #[error("Transport is not connected")]
    NotConnected,

    /// Attempted to connect a transport that already owns a socket
    #[error("Transport is already connected")]
    AlreadyConnected,
}

impl Error {
    /// Native OS error code carried by the underlying `io::Error`, if any
    pub fn code(&self) -> Option<i32> {
        self.io_error().and_then(io::Error::raw_os_error)
    }

    /// The underlying `io::Error`, if any
    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            Error::Connection(err) | Error::Receive(err) | Error::Send(err) => Some(err),
            Error::ConnectionLost | Error::NotConnected | Error::AlreadyConnected => None,
        }
    }

    /// Whether the error was caused by an operation running out of time
    pub fn is_timeout(&self) -> bool {
        matches!(self.io_error(), Some(err) if err.kind() == io::ErrorKind::TimedOut)
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::Error;

    #[test]
    fn native_error_code_is_exposed() {
        let err = Error::Connection(io::Error::from_raw_os_error(111));
        assert_eq!(err.code(), Some(111));
        assert!(err.to_string().starts_with("Error connecting to server"));

        assert_eq!(Error::ConnectionLost.code(), None);
    }

    #[test]
    fn timeout_is_detected_from_error_kind() {
        let err = Error::Receive(io::Error::new(io::ErrorKind::TimedOut, "recv timed out"));
        assert!(err.is_timeout());

        let err = Error::Send(io::ErrorKind::BrokenPipe.into());
        assert!(!err.is_timeout());
    }
}
