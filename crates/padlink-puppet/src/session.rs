// Logged-in identity for one adapter instance.
use std::sync::RwLock;

/// Current session identity. Empty means logged out.
///
/// Mutated by translation tasks, read by the host through the adapter, so the
/// string sits behind a lock with short critical sections.
#[derive(Debug, Default)]
pub struct Session {
    identity: RwLock<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, contact_id: &str) {
        let mut guard = self.identity.write().expect("session lock");
        guard.clear();
        guard.push_str(contact_id);
    }

    pub fn clear(&self) {
        self.identity.write().expect("session lock").clear();
    }

    /// The identity, or `None` when logged out.
    pub fn current(&self) -> Option<String> {
        let guard = self.identity.read().expect("session lock");
        if guard.is_empty() {
            None
        } else {
            Some(guard.clone())
        }
    }

    pub fn is_logged_in(&self) -> bool {
        !self.identity.read().expect("session lock").is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::Session;

    #[test]
    fn starts_logged_out() {
        let session = Session::new();
        assert!(!session.is_logged_in());
        assert_eq!(session.current(), None);
    }

    #[test]
    fn set_and_clear_flip_login_state() {
        let session = Session::new();
        session.set("wxid_self");
        assert!(session.is_logged_in());
        assert_eq!(session.current().as_deref(), Some("wxid_self"));
        session.clear();
        assert!(!session.is_logged_in());
        assert_eq!(session.current(), None);
    }
}
