// ── Identity seam ──
//
// The sync client only needs to know whether someone is signed in, and
// who. How they signed in is the provider's business.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// A signed-in operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub uid: String,
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl Principal {
    /// Principal keyed by email, as built from a configured operator.
    pub fn from_email(email: &str) -> Self {
        Self {
            uid: email.to_ascii_lowercase(),
            email: email.to_owned(),
            display_name: None,
        }
    }

    /// Fixed principal used in demo mode.
    pub fn demo() -> Self {
        Self {
            uid: "demo".into(),
            email: "demo@coop.local".into(),
            display_name: Some("Demo Operator".into()),
        }
    }

    /// `display_name`, falling back to `email`.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.email)
    }
}

/// Source of the current principal.
pub trait IdentityProvider: Send + Sync {
    fn current(&self) -> Option<Principal>;

    /// Sign-in changes. Dropping the receiver unsubscribes.
    fn subscribe(&self) -> watch::Receiver<Option<Principal>>;
}

/// In-memory session: sign in and out explicitly.
pub struct SessionIdentity {
    tx: watch::Sender<Option<Principal>>,
}

impl SessionIdentity {
    /// A session with nobody signed in.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// A session with `principal` already signed in.
    pub fn signed_in(principal: Principal) -> Self {
        let session = Self::new();
        session.sign_in(principal);
        session
    }

    pub fn sign_in(&self, principal: Principal) {
        self.tx.send_replace(Some(principal));
    }

    pub fn sign_out(&self) {
        self.tx.send_replace(None);
    }
}

impl Default for SessionIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for SessionIdentity {
    fn current(&self) -> Option<Principal> {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<Principal>> {
        self.tx.subscribe()
    }
}
