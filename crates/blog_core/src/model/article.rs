//! Article domain model.
//!
//! # Responsibility
//! - Define the persisted article document and its comment entries.
//! - Provide the read projection (`ArticleView`) with derived flags.
//!
//! # Invariants
//! - `name` is stable and never renamed once seeded.
//! - `upvote_ids` has set semantics: no duplicates, order is insertion order.
//! - `upvotes >= upvote_ids.len()`; equality holds in dedup-only deployments.
//! - `comments` is append-only and keeps insertion order.

use crate::model::identity::CallerIdentity;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

static ARTICLE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").expect("valid article name regex"));

/// One reader comment attached to an article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    /// Author label: verified email/ID, or client-supplied name in open mode.
    pub posted_by: String,
    pub text: String,
}

impl Comment {
    pub fn new(posted_by: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            posted_by: posted_by.into(),
            text: text.into(),
        }
    }
}

/// Canonical article document.
///
/// Serialized with the external camelCase field names
/// (`name`, `upvotes`, `upvoteIds`, `comments`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    /// Unique lookup key (URL slug).
    pub name: String,
    pub upvotes: u64,
    /// Identities that already upvoted in dedup mode.
    #[serde(default)]
    pub upvote_ids: Vec<String>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

/// Validation failures for article documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleValidationError {
    /// Name is not a lowercase dash-separated slug.
    InvalidName(String),
    /// The same identity appears twice in `upvote_ids`.
    DuplicateUpvoter(String),
    /// Counter is lower than the number of recorded upvoters.
    UpvotesBelowUpvoters { upvotes: u64, upvoters: usize },
}

impl Display for ArticleValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName(name) => write!(f, "invalid article name `{name}`"),
            Self::DuplicateUpvoter(id) => write!(f, "duplicate upvoter `{id}`"),
            Self::UpvotesBelowUpvoters { upvotes, upvoters } => write!(
                f,
                "upvotes ({upvotes}) cannot be lower than recorded upvoters ({upvoters})"
            ),
        }
    }
}

impl Error for ArticleValidationError {}

impl Article {
    /// Creates an article with no upvotes and no comments.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            upvotes: 0,
            upvote_ids: Vec::new(),
            comments: Vec::new(),
        }
    }

    /// Returns whether `user_id` already upvoted this article.
    pub fn has_upvoted(&self, user_id: &str) -> bool {
        self.upvote_ids.iter().any(|id| id == user_id)
    }

    /// Derived flag: a known caller who has not upvoted yet.
    ///
    /// Anonymous callers can never upvote through this flag.
    pub fn can_upvote(&self, caller: Option<&CallerIdentity>) -> bool {
        caller.is_some_and(|caller| !self.has_upvoted(&caller.id))
    }

    /// Checks document invariants before persistence.
    ///
    /// # Errors
    /// - `InvalidName` when `name` is not a slug.
    /// - `DuplicateUpvoter` when `upvote_ids` breaks set semantics.
    /// - `UpvotesBelowUpvoters` when the counter trails the upvoter set.
    pub fn validate(&self) -> Result<(), ArticleValidationError> {
        if !is_valid_article_name(&self.name) {
            return Err(ArticleValidationError::InvalidName(self.name.clone()));
        }

        let mut seen = HashSet::with_capacity(self.upvote_ids.len());
        for id in &self.upvote_ids {
            if !seen.insert(id.as_str()) {
                return Err(ArticleValidationError::DuplicateUpvoter(id.clone()));
            }
        }

        if self.upvotes < self.upvote_ids.len() as u64 {
            return Err(ArticleValidationError::UpvotesBelowUpvoters {
                upvotes: self.upvotes,
                upvoters: self.upvote_ids.len(),
            });
        }

        Ok(())
    }

    /// Builds the per-request read projection.
    pub fn into_view(self, caller: Option<&CallerIdentity>) -> ArticleView {
        let can_upvote = self.can_upvote(caller);
        ArticleView {
            article: self,
            can_upvote,
        }
    }
}

/// Article state returned to callers, including request-scoped flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleView {
    #[serde(flatten)]
    pub article: Article,
    /// Computed fresh on every read; never persisted.
    pub can_upvote: bool,
}

/// Returns whether `name` is a valid article slug.
pub fn is_valid_article_name(name: &str) -> bool {
    ARTICLE_NAME_RE.is_match(name)
}
