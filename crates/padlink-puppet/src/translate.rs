// Translation from backend stream events to puppet events.
//
// Two fixed tables drive the mapping: response type -> event kind
// (`event_kind`) and response type -> payload shape (`StreamPayload::decode`).
// Both are plain matches over the enum, so they are immutable and need no
// synchronization under concurrent translation tasks.
use padlink_wire::ResponseType;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::cache::{ContactCache, MessageCache};
use crate::event::{EventKind, PuppetEvent, PuppetHandle, ScanStatus};
use crate::payload::{
    AutoLoginPayload, ContactModifyPayload, ContactPayload, LogoutPayload, MessagePayload,
    QrcodeEventPayload, QrcodeLoginPayload, ScanEventPayload,
};
use crate::session::Session;

// Payloads the backend uses in place of a JSON document to signal a
// token-level failure. Another instance connecting elsewhere kills this one.
const SENTINEL_PAYLOADS: [&str; 2] = ["EXPIRED_TOKEN", "INVALID_TOKEN"];

/// One event as read off the stream; transient.
#[derive(Debug, Clone)]
pub(crate) struct InboundEvent {
    pub(crate) response_type: ResponseType,
    pub(crate) data: String,
    pub(crate) trace_id: String,
    pub(crate) request_id: String,
    pub(crate) uin: String,
}

/// The event kind a response type maps to. `None` plus a non-cache type
/// means the type is unsupported and the event is dropped.
pub(crate) fn event_kind(response_type: ResponseType) -> Option<EventKind> {
    match response_type {
        ResponseType::LoginQrcode | ResponseType::QrcodeScan => Some(EventKind::Scan),
        ResponseType::QrcodeLogin | ResponseType::AutoLogin | ResponseType::AccountLogin => {
            Some(EventKind::Login)
        }
        ResponseType::AccountLogout => Some(EventKind::Logout),
        ResponseType::MessageReceive => Some(EventKind::Message),
        ResponseType::ContactList
        | ResponseType::ContactModify
        | ResponseType::Unknown => None,
    }
}

// Response types that only feed the caches and never emit outward.
fn is_cache_only(response_type: ResponseType) -> bool {
    matches!(
        response_type,
        ResponseType::ContactList | ResponseType::ContactModify
    )
}

/// Typed view of a decoded event payload.
enum StreamPayload {
    Qrcode(QrcodeEventPayload),
    Scan(ScanEventPayload),
    Login(QrcodeLoginPayload),
    AutoLogin(AutoLoginPayload),
    Logout(LogoutPayload),
    Message(MessagePayload),
    Contact(ContactPayload),
    ContactModify(ContactModifyPayload),
}

impl StreamPayload {
    fn decode(response_type: ResponseType, data: &str) -> Option<Self> {
        match response_type {
            ResponseType::LoginQrcode => Some(Self::Qrcode(decode_or_default(response_type, data))),
            ResponseType::QrcodeScan => Some(Self::Scan(decode_or_default(response_type, data))),
            ResponseType::QrcodeLogin => Some(Self::Login(decode_or_default(response_type, data))),
            // Account logins arrive in the auto-login shape.
            ResponseType::AutoLogin | ResponseType::AccountLogin => {
                Some(Self::AutoLogin(decode_or_default(response_type, data)))
            }
            ResponseType::AccountLogout => {
                Some(Self::Logout(decode_or_default(response_type, data)))
            }
            ResponseType::MessageReceive => {
                Some(Self::Message(decode_or_default(response_type, data)))
            }
            ResponseType::ContactList => {
                Some(Self::Contact(decode_or_default(response_type, data)))
            }
            ResponseType::ContactModify => {
                Some(Self::ContactModify(decode_or_default(response_type, data)))
            }
            ResponseType::Unknown => None,
        }
    }
}

// A failed decode degrades to the default-valued payload instead of dropping
// the event; the raw document may be partial but the pipeline keeps moving.
fn decode_or_default<T: DeserializeOwned + Default>(response_type: ResponseType, data: &str) -> T {
    match serde_json::from_str(data) {
        Ok(value) => value,
        Err(err) => {
            warn!(
                response_type = %response_type,
                error = %err,
                data,
                "payload decode failed, continuing with defaults"
            );
            metrics::counter!("padlink_payload_decode_errors_total").increment(1);
            T::default()
        }
    }
}

/// Applies cache/session side effects and projects the outward event.
/// Shared by every translation task.
pub(crate) struct Translator {
    session: Arc<Session>,
    contacts: Arc<ContactCache>,
    messages: Arc<MessageCache>,
    handle: Arc<dyn PuppetHandle>,
}

impl Translator {
    pub(crate) fn new(
        session: Arc<Session>,
        contacts: Arc<ContactCache>,
        messages: Arc<MessageCache>,
        handle: Arc<dyn PuppetHandle>,
    ) -> Self {
        Self {
            session,
            contacts,
            messages,
            handle,
        }
    }

    pub(crate) async fn process(&self, event: InboundEvent) {
        if let Some(out) = self.translate(event).await {
            metrics::counter!("padlink_events_emitted_total", "kind" => out.name()).increment(1);
            self.handle.emit(out);
        }
    }

    pub(crate) fn emit_reset(&self, reason: String) {
        metrics::counter!("padlink_events_emitted_total", "kind" => "reset").increment(1);
        self.handle.emit(PuppetEvent::Reset { reason });
    }

    async fn translate(&self, event: InboundEvent) -> Option<PuppetEvent> {
        if event.response_type != ResponseType::ContactList {
            debug!(
                response_type = %event.response_type,
                trace_id = %event.trace_id,
                request_id = %event.request_id,
                uin = %event.uin,
                "stream event"
            );
        }

        if SENTINEL_PAYLOADS.contains(&event.data.as_str()) {
            warn!(sentinel = %event.data, "token error from backend, dropping event");
            metrics::counter!("padlink_events_dropped_total", "reason" => "sentinel").increment(1);
            return None;
        }

        let kind = event_kind(event.response_type);
        if kind.is_none() && !is_cache_only(event.response_type) {
            warn!(response_type = %event.response_type, "unsupported response type, dropping event");
            metrics::counter!("padlink_events_dropped_total", "reason" => "unsupported")
                .increment(1);
            return None;
        }

        let payload = StreamPayload::decode(event.response_type, &event.data)?;
        match payload {
            StreamPayload::Qrcode(qrcode) => Some(PuppetEvent::Scan {
                status: ScanStatus::Unknown,
                qrcode: qrcode.qr_code_id,
                data: Some(qrcode.qr_code),
            }),
            StreamPayload::Scan(scan) => Some(PuppetEvent::Scan {
                status: ScanStatus::from_code(scan.status),
                qrcode: scan.qr_code_id,
                data: None,
            }),
            StreamPayload::Login(login) => {
                self.contacts
                    .store(login.user_name.clone(), login.to_self_contact())
                    .await;
                self.session.set(&login.user_name);
                self.handle.set_identity(&login.user_name);
                Some(PuppetEvent::Login {
                    contact_id: login.user_name,
                })
            }
            StreamPayload::AutoLogin(auto) => {
                let user_name = auto.wechat_user.user_name;
                self.session.set(&user_name);
                self.handle.set_identity(&user_name);
                Some(PuppetEvent::Login {
                    contact_id: user_name,
                })
            }
            StreamPayload::Logout(logout) => {
                self.session.clear();
                self.handle.set_identity("");
                Some(PuppetEvent::Logout {
                    contact_id: logout.uin,
                    reason: event.data,
                })
            }
            StreamPayload::Message(message) => {
                let message_id = message.msg_id.clone();
                self.messages.store(message_id.clone(), message).await;
                Some(PuppetEvent::Message { message_id })
            }
            StreamPayload::Contact(contact) => {
                self.contacts
                    .store(contact.user_name.clone(), contact)
                    .await;
                None
            }
            StreamPayload::ContactModify(modify) => {
                let contact = modify.to_contact();
                self.contacts
                    .store(contact.user_name.clone(), contact)
                    .await;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PayloadCache;
    use crate::payload::{ContactGender, ContactKind};
    use crate::tests::RecordingHandle;

    fn translator() -> (Translator, Arc<RecordingHandle>) {
        let handle = RecordingHandle::new();
        let translator = Translator::new(
            Arc::new(Session::new()),
            Arc::new(PayloadCache::new()),
            Arc::new(PayloadCache::new()),
            handle.clone(),
        );
        (translator, handle)
    }

    fn inbound(response_type: ResponseType, data: &str) -> InboundEvent {
        InboundEvent {
            response_type,
            data: data.to_string(),
            trace_id: "trace".to_string(),
            request_id: "request".to_string(),
            uin: "uin".to_string(),
        }
    }

    #[test]
    fn table_covers_every_supported_kind() {
        let expected = [
            (ResponseType::LoginQrcode, EventKind::Scan),
            (ResponseType::QrcodeScan, EventKind::Scan),
            (ResponseType::QrcodeLogin, EventKind::Login),
            (ResponseType::AutoLogin, EventKind::Login),
            (ResponseType::AccountLogin, EventKind::Login),
            (ResponseType::AccountLogout, EventKind::Logout),
            (ResponseType::MessageReceive, EventKind::Message),
        ];
        for (response_type, kind) in expected {
            assert_eq!(event_kind(response_type), Some(kind), "{response_type}");
        }
        assert_eq!(event_kind(ResponseType::ContactList), None);
        assert_eq!(event_kind(ResponseType::Unknown), None);
    }

    #[tokio::test]
    async fn supported_types_emit_matching_events() {
        let (translator, handle) = translator();
        translator
            .process(inbound(
                ResponseType::QrcodeScan,
                r#"{"Status":2,"QrCodeId":"qr-1"}"#,
            ))
            .await;
        translator
            .process(inbound(
                ResponseType::MessageReceive,
                r#"{"MsgId":"m1","Content":"hello"}"#,
            ))
            .await;
        let events = handle.recorded();
        assert_eq!(
            events[0],
            PuppetEvent::Scan {
                status: ScanStatus::Confirmed,
                qrcode: "qr-1".to_string(),
                data: None,
            }
        );
        assert_eq!(
            events[1],
            PuppetEvent::Message {
                message_id: "m1".to_string()
            }
        );
    }

    #[tokio::test]
    async fn message_receive_caches_the_full_payload() {
        let (translator, handle) = translator();
        translator
            .process(inbound(
                ResponseType::MessageReceive,
                r#"{"MsgId":"m1","FromUserName":"wxid_a","MsgType":1,"Content":"hi"}"#,
            ))
            .await;
        let cached = translator.messages.load("m1").await.expect("cached");
        assert_eq!(cached.content, "hi");
        assert_eq!(
            handle.recorded(),
            vec![PuppetEvent::Message {
                message_id: "m1".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn unsupported_type_emits_nothing_and_mutates_nothing() {
        let (translator, handle) = translator();
        translator
            .process(inbound(ResponseType::Unknown, r#"{"Whatever":1}"#))
            .await;
        assert!(handle.recorded().is_empty());
        assert!(translator.contacts.is_empty().await);
        assert!(translator.messages.is_empty().await);
        assert!(!translator.session.is_logged_in());
    }

    #[tokio::test]
    async fn sentinel_payloads_are_dropped_silently() {
        let (translator, handle) = translator();
        translator.session.set("wxid_self");
        for sentinel in ["EXPIRED_TOKEN", "INVALID_TOKEN"] {
            translator
                .process(inbound(ResponseType::MessageReceive, sentinel))
                .await;
        }
        assert!(handle.recorded().is_empty());
        assert!(translator.session.is_logged_in());
        assert!(translator.messages.is_empty().await);
    }

    #[tokio::test]
    async fn decode_failure_degrades_to_default_payload() {
        let (translator, handle) = translator();
        translator
            .process(inbound(ResponseType::MessageReceive, "{not json"))
            .await;
        // The event still flows, projected from the default payload.
        assert_eq!(
            handle.recorded(),
            vec![PuppetEvent::Message {
                message_id: String::new()
            }]
        );
    }

    #[tokio::test]
    async fn login_sets_session_and_caches_self_contact() {
        let (translator, handle) = translator();
        translator
            .process(inbound(
                ResponseType::QrcodeLogin,
                r#"{"UserName":"wxid_self","NickName":"Me","HeadImgUrl":"http://img"}"#,
            ))
            .await;
        assert!(translator.session.is_logged_in());
        assert_eq!(handle.identity(), "wxid_self");
        let contact = translator.contacts.load("wxid_self").await.expect("cached");
        assert_eq!(contact.contact_type, ContactKind::Myself);
        assert_eq!(contact.sex, ContactGender::Unknown);
        assert_eq!(
            handle.recorded(),
            vec![PuppetEvent::Login {
                contact_id: "wxid_self".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn auto_login_sets_identity_from_nested_user() {
        let (translator, handle) = translator();
        translator
            .process(inbound(
                ResponseType::AutoLogin,
                r#"{"WechatUser":{"UserName":"wxid_self"},"Online":true}"#,
            ))
            .await;
        assert_eq!(
            translator.session.current().as_deref(),
            Some("wxid_self")
        );
        assert_eq!(
            handle.recorded(),
            vec![PuppetEvent::Login {
                contact_id: "wxid_self".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn logout_clears_session_and_carries_raw_reason() {
        let (translator, handle) = translator();
        translator.session.set("wxid_self");
        translator
            .process(inbound(
                ResponseType::AccountLogout,
                r#"{"Uin":"u1","Message":"kicked"}"#,
            ))
            .await;
        assert!(!translator.session.is_logged_in());
        assert_eq!(handle.identity(), "");
        assert_eq!(
            handle.recorded(),
            vec![PuppetEvent::Logout {
                contact_id: "u1".to_string(),
                reason: r#"{"Uin":"u1","Message":"kicked"}"#.to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn contact_list_updates_cache_without_emitting() {
        let (translator, handle) = translator();
        translator
            .process(inbound(
                ResponseType::ContactList,
                r#"{"UserName":"wxid_a","NickName":"Ada"}"#,
            ))
            .await;
        assert!(handle.recorded().is_empty());
        let contact = translator.contacts.load("wxid_a").await.expect("cached");
        assert_eq!(contact.nick_name, "Ada");
    }

    #[tokio::test]
    async fn reprocessing_a_contact_entry_is_idempotent_latest_wins() {
        let (translator, _handle) = translator();
        translator
            .process(inbound(
                ResponseType::ContactList,
                r#"{"UserName":"wxid_a","NickName":"Ada"}"#,
            ))
            .await;
        translator
            .process(inbound(
                ResponseType::ContactList,
                r#"{"UserName":"wxid_a","NickName":"Ada Lovelace"}"#,
            ))
            .await;
        assert_eq!(translator.contacts.len().await, 1);
        let contact = translator.contacts.load("wxid_a").await.expect("cached");
        assert_eq!(contact.nick_name, "Ada Lovelace");
    }

    #[tokio::test]
    async fn contact_modify_upserts_canonical_shape_without_emitting() {
        let (translator, handle) = translator();
        translator
            .process(inbound(
                ResponseType::ContactModify,
                r#"{"UserName":"wxid_b","NickName":"Bo","HeadImgUrl":"http://b","Sex":1}"#,
            ))
            .await;
        assert!(handle.recorded().is_empty());
        let contact = translator.contacts.load("wxid_b").await.expect("cached");
        assert_eq!(contact.big_head_url, "http://b");
        assert_eq!(contact.sex, ContactGender::Male);
    }

    #[tokio::test]
    async fn concurrent_translation_tasks_do_not_lose_updates() {
        let (translator, handle) = translator();
        let translator = Arc::new(translator);
        let mut tasks = Vec::new();
        for index in 0..32 {
            let translator = Arc::clone(&translator);
            tasks.push(tokio::spawn(async move {
                translator
                    .process(inbound(
                        ResponseType::MessageReceive,
                        &format!(r#"{{"MsgId":"m{index}"}}"#),
                    ))
                    .await;
                translator
                    .process(inbound(
                        ResponseType::ContactList,
                        &format!(r#"{{"UserName":"wxid_{index}"}}"#),
                    ))
                    .await;
            }));
        }
        for task in tasks {
            task.await.expect("task join");
        }
        assert_eq!(translator.messages.len().await, 32);
        assert_eq!(translator.contacts.len().await, 32);
        assert_eq!(handle.recorded().len(), 32);
    }
}
