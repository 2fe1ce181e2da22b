//! Article use-case service.
//!
//! # Responsibility
//! - Provide read/upvote/comment entry points for transport layers.
//! - Enforce the upvote policy and derive `can_upvote` per request.
//!
//! # Invariants
//! - In `Dedup` mode one identity adds at most one upvote per article.
//! - Mutations return state read back from the store after the write.
//! - The service never creates or deletes articles.

use crate::model::article::{ArticleView, Comment};
use crate::model::identity::CallerIdentity;
use crate::repo::article_repo::{ArticleRepository, RepoError};
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// How `upvote` treats repeated calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpvotePolicy {
    /// Any caller may upvote, repeatedly; no identity tracking.
    Counter,
    /// One upvote per verified identity; anonymous calls are no-ops.
    #[default]
    Dedup,
}

impl UpvotePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Dedup => "dedup",
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for article use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Target article does not exist. Terminal; retrying will not help.
    ArticleNotFound(String),
    /// Persistence-layer failure, propagated as-is.
    Repo(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ArticleNotFound(name) => write!(f, "article not found: {name}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::ArticleNotFound(_) => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(name) => Self::ArticleNotFound(name),
            other => Self::Repo(other),
        }
    }
}

/// Article service facade over repository implementations.
pub struct ArticleService<R: ArticleRepository> {
    repo: R,
    policy: UpvotePolicy,
}

impl<R: ArticleRepository> ArticleService<R> {
    /// Creates a service using the provided repository and upvote policy.
    pub fn new(repo: R, policy: UpvotePolicy) -> Self {
        Self { repo, policy }
    }

    pub fn policy(&self) -> UpvotePolicy {
        self.policy
    }

    /// Gets one article with `can_upvote` derived for `caller`.
    ///
    /// # Errors
    /// - `ArticleNotFound` when no article has this name.
    pub fn get_article(
        &self,
        name: &str,
        caller: Option<&CallerIdentity>,
    ) -> ServiceResult<ArticleView> {
        self.repo
            .get_article(name)?
            .map(|article| article.into_view(caller))
            .ok_or_else(|| ServiceError::ArticleNotFound(name.to_string()))
    }

    /// Upvotes one article according to the configured policy.
    ///
    /// In `Dedup` mode an anonymous caller, or one who already upvoted,
    /// leaves the article unchanged and still gets its current state back.
    ///
    /// # Errors
    /// - `ArticleNotFound` when no article has this name.
    pub fn upvote(
        &self,
        name: &str,
        caller: Option<&CallerIdentity>,
    ) -> ServiceResult<ArticleView> {
        match (self.policy, caller) {
            (UpvotePolicy::Counter, _) => self.repo.increment_upvotes(name)?,
            (UpvotePolicy::Dedup, Some(caller)) => {
                let recorded = self.repo.record_upvote(name, &caller.id)?;
                debug!(
                    "event=article_upvote module=service policy=dedup article={} recorded={}",
                    name, recorded
                );
            }
            (UpvotePolicy::Dedup, None) => {}
        }

        self.get_article(name, caller)
    }

    /// Appends one comment and returns the updated article.
    ///
    /// `posted_by` must already be resolved; see [`resolve_comment_author`].
    ///
    /// # Errors
    /// - `ArticleNotFound` when no article has this name.
    pub fn add_comment(
        &self,
        name: &str,
        posted_by: &str,
        text: &str,
        caller: Option<&CallerIdentity>,
    ) -> ServiceResult<ArticleView> {
        self.repo
            .append_comment(name, &Comment::new(posted_by, text))?;
        self.get_article(name, caller)
    }
}

/// Picks the author recorded for a new comment.
///
/// A verified identity always wins over the client-supplied value, so a
/// signed-in caller cannot post under someone else's name. The client value
/// is used only for anonymous callers and must be non-blank.
pub fn resolve_comment_author(
    caller: Option<&CallerIdentity>,
    client_supplied: Option<&str>,
) -> Option<String> {
    if let Some(caller) = caller {
        return Some(caller.display_name().to_string());
    }

    client_supplied
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::{resolve_comment_author, ServiceError, UpvotePolicy};
    use crate::model::identity::CallerIdentity;
    use crate::repo::article_repo::RepoError;

    #[test]
    fn verified_identity_overrides_client_author() {
        let caller = CallerIdentity::new("u1", Some("a@x.com".to_string()));
        assert_eq!(
            resolve_comment_author(Some(&caller), Some("someone-else")).as_deref(),
            Some("a@x.com")
        );
    }

    #[test]
    fn anonymous_author_must_be_non_blank() {
        assert_eq!(
            resolve_comment_author(None, Some("  shaun ")).as_deref(),
            Some("shaun")
        );
        assert_eq!(resolve_comment_author(None, Some("   ")), None);
        assert_eq!(resolve_comment_author(None, None), None);
    }

    #[test]
    fn repo_not_found_maps_to_article_not_found() {
        let err = ServiceError::from(RepoError::NotFound("ghost".to_string()));
        assert!(matches!(err, ServiceError::ArticleNotFound(name) if name == "ghost"));
    }

    #[test]
    fn default_policy_is_dedup() {
        assert_eq!(UpvotePolicy::default(), UpvotePolicy::Dedup);
        assert_eq!(UpvotePolicy::Counter.as_str(), "counter");
    }
}
