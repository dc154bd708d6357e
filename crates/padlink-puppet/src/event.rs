// Outward event vocabulary and the host-framework boundary.
use serde::{Deserialize, Serialize};

/// QR scan lifecycle in the puppet vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Unknown,
    Cancel,
    Waiting,
    Scanned,
    Confirmed,
    Timeout,
}

impl ScanStatus {
    /// Map a backend scan status code into the puppet vocabulary.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Waiting,
            1 => Self::Scanned,
            2 => Self::Confirmed,
            3 => Self::Cancel,
            4 => Self::Timeout,
            _ => Self::Unknown,
        }
    }
}

/// Events the adapter emits to its host. Each variant carries only the
/// minimal projection the host needs; full payloads stay in the caches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PuppetEvent {
    Scan {
        status: ScanStatus,
        qrcode: String,
        data: Option<String>,
    },
    Login {
        contact_id: String,
    },
    Logout {
        contact_id: String,
        reason: String,
    },
    Message {
        message_id: String,
    },
    Reset {
        reason: String,
    },
}

impl PuppetEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Scan { .. } => "scan",
            Self::Login { .. } => "login",
            Self::Logout { .. } => "logout",
            Self::Message { .. } => "message",
            Self::Reset { .. } => "reset",
        }
    }
}

/// The event kind a backend response type translates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Scan,
    Login,
    Logout,
    Message,
}

/// Narrow view of the host puppet framework.
///
/// The host owns contact/message CRUD, QR-login orchestration, and event
/// fan-out; the adapter only ever emits events and mirrors the session
/// identity into it. `emit` is called from concurrent translation tasks and
/// must not assume receipt order across distinct events.
pub trait PuppetHandle: Send + Sync + 'static {
    fn emit(&self, event: PuppetEvent);
    fn set_identity(&self, contact_id: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scan_status_maps_backend_codes() {
        assert_eq!(ScanStatus::from_code(0), ScanStatus::Waiting);
        assert_eq!(ScanStatus::from_code(1), ScanStatus::Scanned);
        assert_eq!(ScanStatus::from_code(2), ScanStatus::Confirmed);
        assert_eq!(ScanStatus::from_code(3), ScanStatus::Cancel);
        assert_eq!(ScanStatus::from_code(4), ScanStatus::Timeout);
        assert_eq!(ScanStatus::from_code(99), ScanStatus::Unknown);
    }

    #[test]
    fn event_names_match_the_host_vocabulary() {
        assert_eq!(
            PuppetEvent::Login {
                contact_id: "wxid".into()
            }
            .name(),
            "login"
        );
        assert_eq!(
            PuppetEvent::Reset {
                reason: "gone".into()
            }
            .name(),
            "reset"
        );
    }
}
