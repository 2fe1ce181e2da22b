//! Caller identity resolution.
//!
//! Requests carry an opaque token in the `authtoken` header. The token is
//! exchanged with an [`IdentityVerifier`] for a [`CallerIdentity`]. A token
//! that is present but cannot be verified rejects the request; it never
//! downgrades the caller to anonymous.

use async_trait::async_trait;
use blog_core::CallerIdentity;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Header carrying the identity token.
pub const AUTH_TOKEN_HEADER: &str = "authtoken";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    #[error("token header is empty or not valid text")]
    MalformedToken,

    #[error("token is not recognized")]
    UnknownToken,

    #[error("no identity verifier is configured")]
    NotConfigured,
}

/// Exchanges an opaque token for a verified caller identity.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<CallerIdentity, VerifyError>;
}

#[derive(Error, Debug)]
pub enum TokenFileError {
    #[error("failed to read tokens file `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid tokens file `{path}`: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("tokens file `{path}` maps token `{token}` to an empty user id")]
    EmptyUserId { path: PathBuf, token: String },
}

/// Verifier backed by a static token table.
///
/// The file is a JSON object mapping each token to `{ "id", "email" }`:
///
/// ```json
/// { "dev-token-1": { "id": "u1", "email": "a@x.com" } }
/// ```
#[derive(Debug, Default, Clone)]
pub struct TokenFileVerifier {
    tokens: HashMap<String, CallerIdentity>,
}

impl TokenFileVerifier {
    pub fn from_entries<I, T>(entries: I) -> Self
    where
        I: IntoIterator<Item = (T, CallerIdentity)>,
        T: Into<String>,
    {
        Self {
            tokens: entries
                .into_iter()
                .map(|(token, identity)| (token.into(), identity))
                .collect(),
        }
    }

    /// Loads the token table from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, TokenFileError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| TokenFileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let tokens: HashMap<String, CallerIdentity> =
            serde_json::from_str(&text).map_err(|source| TokenFileError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        if let Some((token, _)) = tokens
            .iter()
            .find(|(_, identity)| identity.id.trim().is_empty())
        {
            return Err(TokenFileError::EmptyUserId {
                path: path.to_path_buf(),
                token: token.clone(),
            });
        }

        Ok(Self { tokens })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl IdentityVerifier for TokenFileVerifier {
    async fn verify(&self, token: &str) -> Result<CallerIdentity, VerifyError> {
        self.tokens
            .get(token)
            .cloned()
            .ok_or(VerifyError::UnknownToken)
    }
}
