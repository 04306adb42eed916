#![deny(missing_docs, missing_debug_implementations)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Socket transport for AMQP 0-9-1 clients
//!
//! [`Transport`] moves raw bytes between the protocol layer and the broker
//! over a single socket and keeps the connection alive with AMQP heartbeats:
//!
//! - a heartbeat frame is written when nothing has been written for more
//!   than half of the heartbeat interval
//! - the socket is reconnected when nothing has been read for more than
//!   twice the heartbeat interval
//!
//! Both checks run at the start of every [`Transport::read`] and on
//! [`Transport::check_heartbeat`]. Frame encoding and connection negotiation
//! are left to the layer above.
//!
//! # Feature flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `"rustls"` | TLS upgrade with `tokio-rustls`, trusting `webpki-roots` by default |
//! | `"native-tls"` | TLS upgrade with `tokio-native-tls` |
//! | `"tracing"` | Logs with `tracing` |
//! | `"log"` | Logs with `log` |

pub mod config;
pub mod error;
pub mod heartbeat;
pub mod socket;
pub mod tcp;
pub mod tls;
pub mod transport;

pub use config::Config;
pub use error::Error;
pub use heartbeat::{HeartbeatAction, HEARTBEAT_FRAME};
pub use socket::{Connector, Socket};
pub use tcp::{TcpConnector, TcpSocket};
pub use tls::TlsConnector;
pub use transport::Transport;
