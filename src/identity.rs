// File: ./src/identity.rs
//! Who is scanning. The real provider (OAuth session) lives outside this crate.
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque user identifier handed out by the authentication provider.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// File-name safe form: the readable `[A-Za-z0-9_-]` part of the id followed by
    /// the base64url encoding of the whole id, so distinct ids never share a file.
    /// Empty for an empty id.
    pub fn file_stem(&self) -> String {
        if self.0.is_empty() {
            return String::new();
        }
        let readable: String = self
            .0
            .chars()
            .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect();
        format!("{}.{}", readable, URL_SAFE_NO_PAD.encode(self.0.as_bytes()))
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub trait IdentityProvider {
    /// `None` means the caller is not authenticated.
    fn current_user(&self) -> Option<UserId>;
}

/// Identity fixed at construction, typically from the config file.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(Option<UserId>);

impl StaticIdentity {
    pub fn new(user: Option<UserId>) -> Self {
        Self(user)
    }

    pub fn anonymous() -> Self {
        Self(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_user(&self) -> Option<UserId> {
        self.0.clone()
    }
}
