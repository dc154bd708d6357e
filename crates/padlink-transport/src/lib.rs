// QUIC transport configuration and primitives for the bridge connection.
use anyhow::{Context, Result, anyhow};
use quinn::{Endpoint, RecvStream, SendStream, VarInt};
use std::net::SocketAddr;
use std::sync::Arc;

/// Transport-level configuration defaults.
///
/// ```
/// use padlink_transport::TransportConfig;
///
/// let config = TransportConfig::default();
/// assert!(config.max_streams > 0);
/// ```
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub max_streams: u16,
}

impl Default for TransportConfig {
    fn default() -> Self {
        // One long-lived event stream plus short-lived request streams;
        // the cap only has to be comfortably above the in-flight count.
        Self { max_streams: 256 }
    }
}

impl TransportConfig {
    fn quinn_transport_config(&self) -> quinn::TransportConfig {
        let mut config = quinn::TransportConfig::default();
        let streams = VarInt::from_u32(self.max_streams as u32);
        config.max_concurrent_bidi_streams(streams);
        config
    }
}

/// Client endpoint used to dial the bridge backend.
///
/// ```no_run
/// use padlink_transport::{Dialer, TransportConfig};
/// use quinn::ClientConfig;
///
/// fn tls_config() -> ClientConfig {
///     // Provide a real TLS config when wiring this up.
///     unimplemented!()
/// }
///
/// let _dialer = Dialer::bind(tls_config(), TransportConfig::default()).expect("bind");
/// ```
#[derive(Debug)]
pub struct Dialer {
    endpoint: Endpoint,
}

impl Dialer {
    pub fn bind(mut tls: quinn::ClientConfig, transport: TransportConfig) -> Result<Self> {
        tls.transport_config(Arc::new(transport.quinn_transport_config()));
        let bind_addr: SocketAddr = "0.0.0.0:0".parse().expect("wildcard bind addr");
        let mut endpoint = Endpoint::client(bind_addr).context("bind QUIC client endpoint")?;
        endpoint.set_default_client_config(tls);
        Ok(Self { endpoint })
    }

    pub async fn connect(&self, addr: SocketAddr, server_name: &str) -> Result<BridgeConnection> {
        let connecting = self
            .endpoint
            .connect(addr, server_name)
            .context("initiate bridge connection")?;
        let connection = connecting.await.context("establish bridge connection")?;
        Ok(BridgeConnection { inner: connection })
    }
}

/// Server endpoint. The adapter itself never listens; this exists for
/// harnesses and tests that stand in for the backend.
#[derive(Debug)]
pub struct Listener {
    endpoint: Endpoint,
}

impl Listener {
    pub fn bind(
        addr: SocketAddr,
        mut tls: quinn::ServerConfig,
        transport: TransportConfig,
    ) -> Result<Self> {
        tls.transport_config(Arc::new(transport.quinn_transport_config()));
        let endpoint = Endpoint::server(tls, addr).context("bind QUIC server endpoint")?;
        Ok(Self { endpoint })
    }

    pub async fn accept(&self) -> Result<BridgeConnection> {
        let connecting = self
            .endpoint
            .accept()
            .await
            .ok_or_else(|| anyhow!("server endpoint closed"))?;
        let connection = connecting.await.context("accept bridge connection")?;
        Ok(BridgeConnection { inner: connection })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.endpoint.local_addr().context("read local address")
    }
}

/// Live connection handle. Cloning is cheap and shares the connection, so
/// the heartbeat task and request callers can hold their own copies.
#[derive(Debug, Clone)]
pub struct BridgeConnection {
    inner: quinn::Connection,
}

impl BridgeConnection {
    /// Open a bidirectional stream to the peer.
    pub async fn open_bi(&self) -> Result<(SendStream, RecvStream)> {
        self.inner.open_bi().await.context("open bidi stream")
    }

    /// Accept the next bidirectional stream from the peer.
    pub async fn accept_bi(&self) -> Result<(SendStream, RecvStream)> {
        self.inner.accept_bi().await.context("accept bidi stream")
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.inner.remote_address()
    }

    /// Close the connection immediately. Pending operations on either side
    /// observe a connection error rather than end-of-stream.
    pub fn close(&self, reason: &str) {
        self.inner.close(VarInt::from_u32(0), reason.as_bytes());
    }
}
