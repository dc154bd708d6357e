// Connection manager for the bridge backend.
use anyhow::{Context, Result, anyhow, bail};
use bytes::BytesMut;
use padlink_transport::{BridgeConnection, Dialer, TransportConfig};
use padlink_wire::{ApiKind, Message};
use quinn::{RecvStream, SendStream};
use tracing::debug;

use crate::config::PuppetConfig;
use crate::wire_io::{read_message, write_message};

/// Owns the dialed connection and the send half of the event stream.
///
/// `dial`/`open_event_stream`/`close_*` all take `&mut self`; concurrent
/// lifecycle calls on one adapter are a caller bug the borrow checker
/// rejects. The guards here are idempotency checks, not locks.
#[derive(Default)]
pub(crate) struct Link {
    // The endpoint must outlive its connections, so it lives here.
    dialer: Option<Dialer>,
    connection: Option<BridgeConnection>,
    event_send: Option<SendStream>,
}

impl Link {
    /// Dial the backend. A dial failure is returned immediately; no retries.
    pub(crate) async fn dial(&mut self, config: &PuppetConfig) -> Result<()> {
        let dialer = Dialer::bind(config.tls.clone(), TransportConfig::default())?;
        let addr = tokio::net::lookup_host(config.endpoint.as_str())
            .await
            .with_context(|| format!("resolve backend endpoint {}", config.endpoint))?
            .next()
            .ok_or_else(|| anyhow!("backend endpoint {} resolved to no addresses", config.endpoint))?;
        let connection = dialer.connect(addr, &config.server_name).await?;
        debug!(endpoint = %config.endpoint, "bridge connection established");
        self.dialer = Some(dialer);
        self.connection = Some(connection);
        Ok(())
    }

    pub(crate) fn connection(&self) -> Result<&BridgeConnection> {
        self.connection
            .as_ref()
            .ok_or_else(|| anyhow!("connection not initialized"))
    }

    /// Open the single event stream and authenticate with `token`. Returns
    /// the receive half; the send half stays here until `close_event_stream`.
    pub(crate) async fn open_event_stream(&mut self, token: &str) -> Result<RecvStream> {
        if self.event_send.is_some() {
            bail!("event stream already open");
        }
        let connection = self.connection()?;
        let (mut send, recv) = connection.open_bi().await.context("open event stream")?;
        write_message(
            &mut send,
            Message::Init {
                token: token.to_string(),
            },
        )
        .await
        .context("send event stream init")?;
        self.event_send = Some(send);
        Ok(recv)
    }

    /// Finish the send half of the event stream. The read side terminates on
    /// its own, via end-of-stream or a transport error in the read loop.
    pub(crate) fn close_event_stream(&mut self) -> Result<()> {
        debug!("close event stream");
        let Some(mut send) = self.event_send.take() else {
            bail!("no event stream");
        };
        if let Err(err) = send.finish() {
            debug!(error = %err, "finish event stream send half");
        }
        Ok(())
    }

    /// Tear down the connection.
    pub(crate) fn close(&mut self) -> Result<()> {
        let Some(connection) = self.connection.take() else {
            bail!("connection not initialized");
        };
        connection.close("puppet stop");
        self.dialer = None;
        Ok(())
    }
}

/// One unary round trip on a short-lived stream. Transport errors come back
/// unmodified; the caller decides whether they are fatal.
pub(crate) async fn request(
    connection: &BridgeConnection,
    api_kind: ApiKind,
    payload: &str,
) -> Result<String> {
    let (mut send, mut recv) = connection.open_bi().await.context("open request stream")?;
    write_message(
        &mut send,
        Message::Request {
            api_kind,
            payload: payload.to_string(),
        },
    )
    .await
    .with_context(|| format!("send {api_kind} request"))?;
    send.finish().context("finish request stream")?;

    let mut scratch = BytesMut::with_capacity(16 * 1024);
    match read_message(&mut recv, &mut scratch).await? {
        Some(Message::Response { payload }) => Ok(payload),
        Some(Message::Error { message }) => Err(anyhow!("backend error: {message}")),
        Some(other) => Err(anyhow!("unexpected response to {api_kind}: {other:?}")),
        None => Err(anyhow!("response stream closed before {api_kind} reply")),
    }
}
