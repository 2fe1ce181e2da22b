//! Caller identity attached to a single request.

use serde::{Deserialize, Serialize};

/// Verified user reference produced by an identity verifier.
///
/// Absent (`None` at call sites) for anonymous callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    /// Stable provider-issued user ID. Used for upvote dedup.
    pub id: String,
    /// Verified email, when the provider exposes one.
    #[serde(default)]
    pub email: Option<String>,
}

impl CallerIdentity {
    pub fn new(id: impl Into<String>, email: Option<String>) -> Self {
        Self {
            id: id.into(),
            email,
        }
    }

    /// Name shown next to comments written by this caller.
    ///
    /// Prefers the verified email and falls back to the user ID.
    pub fn display_name(&self) -> &str {
        self.email
            .as_deref()
            .filter(|email| !email.trim().is_empty())
            .unwrap_or(self.id.as_str())
    }
}
