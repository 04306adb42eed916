//! In-place TLS upgrade of a raw TCP connection
//!
//! TLS support is only enabled by selecting one of the following feature flags
//!
//! 1. `"rustls"`: enables TLS support with `tokio-rustls`
//! 2. `"native-tls"`: enables TLS support with `tokio-native-tls`
//!
//! When both are enabled, `"rustls"` provides the default connector.

use std::{fmt, io};

use tokio::net::TcpStream;

use crate::tcp::Stream;

/// Connector used by [`crate::TcpSocket::enable_encryption`]
///
/// # Custom connector with feature `"rustls"` enabled
///
/// ```rust,ignore
/// let config = rustls::ClientConfig::builder()
///     .with_root_certificates(root_cert_store)
///     .with_no_client_auth();
/// let connector = tokio_rustls::TlsConnector::from(Arc::new(config));
/// let connector = TcpConnector::new(false).with_tls_connector(TlsConnector::Rustls(connector));
/// ```
#[derive(Clone)]
pub enum TlsConnector {
    /// A `tokio_rustls::TlsConnector`
    #[cfg(feature = "rustls")]
    Rustls(tokio_rustls::TlsConnector),

    /// A `tokio_native_tls::TlsConnector`
    #[cfg(feature = "native-tls")]
    NativeTls(tokio_native_tls::TlsConnector),
}

impl fmt::Debug for TlsConnector {
    #[allow(unused_variables)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            #[cfg(feature = "rustls")]
            TlsConnector::Rustls(_) => f.write_str("TlsConnector::Rustls"),
            #[cfg(feature = "native-tls")]
            TlsConnector::NativeTls(_) => f.write_str("TlsConnector::NativeTls"),
        }
    }
}

impl TlsConnector {
    /// The connector used when none is supplied.
    ///
    /// With `"rustls"` this trusts the `webpki-roots` certificates. Fails with
    /// `io::ErrorKind::Unsupported` when no TLS feature is enabled
    pub fn default_connector() -> io::Result<Self> {
        new_default_connector()
    }

    #[allow(unused_variables)]
    pub(crate) async fn connect(&self, domain: &str, stream: TcpStream) -> io::Result<Stream> {
        match *self {
            #[cfg(feature = "rustls")]
            TlsConnector::Rustls(ref connector) => {
                let server_name = librustls::pki_types::ServerName::try_from(domain.to_owned())
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
                let tls_stream = connector.connect(server_name, stream).await?;
                Ok(Stream::Rustls(Box::new(tls_stream)))
            }
            #[cfg(feature = "native-tls")]
            TlsConnector::NativeTls(ref connector) => {
                let tls_stream = connector
                    .connect(domain, stream)
                    .await
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
                Ok(Stream::NativeTls(Box::new(tls_stream)))
            }
        }
    }
}

#[cfg(feature = "rustls")]
fn new_default_connector() -> io::Result<TlsConnector> {
    use std::sync::Arc;

    let mut root_cert_store = librustls::RootCertStore::empty();
    root_cert_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let provider = Arc::new(librustls::crypto::ring::default_provider());
    let config = librustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
        .with_root_certificates(root_cert_store)
        .with_no_client_auth();
    let connector = tokio_rustls::TlsConnector::from(Arc::new(config));
    Ok(TlsConnector::Rustls(connector))
}

#[cfg(all(feature = "native-tls", not(feature = "rustls")))]
fn new_default_connector() -> io::Result<TlsConnector> {
    let connector = libnative_tls::TlsConnector::new()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    Ok(TlsConnector::NativeTls(tokio_native_tls::TlsConnector::from(
        connector,
    )))
}

#[cfg(not(any(feature = "rustls", feature = "native-tls")))]
fn new_default_connector() -> io::Result<TlsConnector> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        r#"TLS requires the "rustls" or "native-tls" feature"#,
    ))
}
