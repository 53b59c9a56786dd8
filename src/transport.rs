//! The client's byte stream: plain TCP or TLS.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tracing::{info, warn};

use crate::error::{IngestError, Result};

#[cfg(feature = "tls")]
use tokio_rustls::client::TlsStream;

/// A connected stream to the IRC server.
#[allow(clippy::large_enum_variant)]
pub enum Transport {
    /// Plaintext TCP connection.
    Tcp(TcpStream),
    /// TLS-encrypted connection.
    #[cfg(feature = "tls")]
    Tls(TlsStream<TcpStream>),
}

impl Transport {
    /// Connect to `host:port`, wrapping the socket in TLS when `secure`.
    pub async fn connect(host: &str, port: u16, secure: bool) -> Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        if let Err(e) = Self::enable_keepalive(&stream) {
            warn!(error = %e, "failed to enable TCP keepalive");
        }
        info!(host = %host, port, secure, "connected");

        if secure {
            Self::upgrade(stream, host).await
        } else {
            Ok(Self::Tcp(stream))
        }
    }

    fn enable_keepalive(stream: &TcpStream) -> io::Result<()> {
        use socket2::{SockRef, TcpKeepalive};

        let sock = SockRef::from(stream);
        let keepalive = TcpKeepalive::new()
            .with_time(Duration::from_secs(120))
            .with_interval(Duration::from_secs(30));

        sock.set_tcp_keepalive(&keepalive)
    }

    #[cfg(feature = "tls")]
    async fn upgrade(stream: TcpStream, host: &str) -> Result<Self> {
        use std::sync::Arc;

        use tokio_rustls::rustls::pki_types::ServerName;
        use tokio_rustls::rustls::{ClientConfig, RootCertStore};
        use tokio_rustls::TlsConnector;

        let mut roots = RootCertStore::empty();
        let certs = rustls_native_certs::load_native_certs();
        for e in &certs.errors {
            warn!(error = %e, "error loading native certs");
        }
        for cert in certs.certs {
            if let Err(e) = roots.add(cert) {
                warn!(error = %e, "failed to add root cert");
            }
        }
        if roots.is_empty() {
            return Err(IngestError::Tls("no usable root certificates".to_string()));
        }

        let config = ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();
        let connector = TlsConnector::from(Arc::new(config));
        let server_name = ServerName::try_from(host.to_string())
            .map_err(|e| IngestError::Tls(format!("invalid server name {host:?}: {e}")))?;

        let tls = connector
            .connect(server_name, stream)
            .await
            .map_err(|e| IngestError::Tls(e.to_string()))?;
        info!(host = %host, "TLS established");
        Ok(Self::Tls(tls))
    }

    #[cfg(not(feature = "tls"))]
    async fn upgrade(_stream: TcpStream, _host: &str) -> Result<Self> {
        Err(IngestError::Tls(
            "built without the `tls` feature".to_string(),
        ))
    }

    pub fn is_tls(&self) -> bool {
        !matches!(self, Self::Tcp(_))
    }
}

impl AsyncRead for Transport {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Transport::Tcp(stream) => Pin::new(stream).poll_read(cx, buf),
            #[cfg(feature = "tls")]
            Transport::Tls(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Transport {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Transport::Tcp(stream) => Pin::new(stream).poll_write(cx, buf),
            #[cfg(feature = "tls")]
            Transport::Tls(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Transport::Tcp(stream) => Pin::new(stream).poll_flush(cx),
            #[cfg(feature = "tls")]
            Transport::Tls(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Transport::Tcp(stream) => Pin::new(stream).poll_shutdown(cx),
            #[cfg(feature = "tls")]
            Transport::Tls(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_plain_connect_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 6];
            sock.read_exact(&mut buf).await.unwrap();
            buf
        });

        let mut transport = Transport::connect("127.0.0.1", port, false).await.unwrap();
        assert!(!transport.is_tls());
        transport.write_all(b"PING\r\n").await.unwrap();

        assert_eq!(&server.await.unwrap(), b"PING\r\n");
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = Transport::connect("127.0.0.1", port, false).await;
        assert!(matches!(result, Err(IngestError::Io(_))));
    }
}
