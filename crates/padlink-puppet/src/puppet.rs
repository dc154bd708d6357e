// Adapter lifecycle: start, keepalive, stop.
use anyhow::{Context, Result};
use padlink_wire::ApiKind;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::cache::{ContactCache, MessageCache};
use crate::config::PuppetConfig;
use crate::dispatcher::run_event_loop;
use crate::event::{PuppetEvent, PuppetHandle};
use crate::link::{self, Link};
use crate::payload::{ContactPayload, MediaData, MessagePayload, RichMediaRequest};
use crate::session::Session;
use crate::translate::Translator;

/// The event-stream adapter.
///
/// Owns the backend connection, the session identity, and the payload
/// caches. `start`/`stop` take `&mut self`, so one adapter instance cannot
/// be started and stopped concurrently.
pub struct Puppet {
    config: PuppetConfig,
    handle: Arc<dyn PuppetHandle>,
    session: Arc<Session>,
    contacts: Arc<ContactCache>,
    messages: Arc<MessageCache>,
    link: Link,
    reader: Option<JoinHandle<()>>,
    heartbeat: Option<JoinHandle<()>>,
}

impl Puppet {
    pub fn new(mut config: PuppetConfig, handle: Arc<dyn PuppetHandle>) -> Self {
        config.fill_fallbacks();
        config.install();
        Self {
            config,
            handle,
            session: Arc::new(Session::new()),
            contacts: Arc::new(ContactCache::new()),
            messages: Arc::new(MessageCache::new()),
            link: Link::default(),
            reader: None,
            heartbeat: None,
        }
    }

    /// Dial the backend, open the event stream, nudge the login flow, and
    /// start the keepalive. Errors here mean the adapter never became
    /// usable and are returned to the caller.
    pub async fn start(&mut self) -> Result<()> {
        info!(endpoint = %self.config.endpoint, "puppet start");
        self.link
            .dial(&self.config)
            .await
            .context("puppet start rejected")?;
        let recv = self
            .link
            .open_event_stream(&self.config.token)
            .await
            .context("puppet start rejected")?;

        let translator = Arc::new(Translator::new(
            Arc::clone(&self.session),
            Arc::clone(&self.contacts),
            Arc::clone(&self.messages),
            Arc::clone(&self.handle),
        ));
        self.reader = Some(tokio::spawn(run_event_loop(recv, translator)));

        // The backend answers the nudge with pushed events (QR code or
        // login success), which flow through the normal translation path.
        let connection = self.link.connection()?.clone();
        match self.session.current() {
            Some(identity) => {
                link::request(&connection, ApiKind::AutoLogin, &identity)
                    .await
                    .context("puppet start rejected")?;
            }
            None => {
                link::request(&connection, ApiKind::RequestQrcode, "")
                    .await
                    .context("puppet start rejected")?;
            }
        }

        let interval = self.config.heartbeat_interval;
        self.heartbeat = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately; consume it so the
            // heartbeat fires one full period after start.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                // Keepalive failures are never escalated; only the event
                // stream's own error path triggers a reset.
                let _ = link::request(&connection, ApiKind::Heartbeat, "").await;
            }
        }));

        Ok(())
    }

    /// Emit a local logout when logged in, then close the stream and the
    /// connection. Closure errors are logged, not propagated.
    pub async fn stop(&mut self) {
        info!("puppet stop");
        if let Some(contact_id) = self.session.current() {
            self.handle.emit(PuppetEvent::Logout {
                contact_id,
                reason: "puppet stop".to_string(),
            });
            self.session.clear();
            self.handle.set_identity("");
        }

        if let Some(heartbeat) = self.heartbeat.take() {
            heartbeat.abort();
        }
        if let Err(err) = self.link.close_event_stream() {
            warn!(error = %err, "stop: close event stream");
        }
        if let Err(err) = self.link.close() {
            warn!(error = %err, "stop: close connection");
        }
        // The reader observes the locally closed connection and exits
        // without emitting a reset.
        if let Some(reader) = self.reader.take() {
            let _ = reader.await;
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_logged_in()
    }

    /// The logged-in contact id, when any.
    pub fn identity(&self) -> Option<String> {
        self.session.current()
    }

    pub async fn contact(&self, user_name: &str) -> Option<ContactPayload> {
        self.contacts.load(user_name).await
    }

    pub async fn message(&self, message_id: &str) -> Option<MessagePayload> {
        self.messages.load(message_id).await
    }

    /// Resolve a rich-media attachment through the unary request path.
    pub async fn load_rich_media(&self, request: &RichMediaRequest) -> Result<MediaData> {
        let connection = self.link.connection()?.clone();
        let payload = serde_json::to_string(request).context("encode media request")?;
        let response = link::request(&connection, ApiKind::GetMessageMedia, &payload)
            .await
            .context("load rich media")?;
        Ok(serde_json::from_str(&response).unwrap_or_else(|err| {
            warn!(error = %err, "media response decode failed, returning defaults");
            MediaData::default()
        }))
    }
}
