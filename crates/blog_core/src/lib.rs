//! Core domain logic for the blog article service.
//! This crate is the single source of truth for article invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod seed;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status, LogTarget};
pub use model::article::{
    is_valid_article_name, Article, ArticleValidationError, ArticleView, Comment,
};
pub use model::identity::CallerIdentity;
pub use repo::article_repo::{ArticleRepository, RepoError, RepoResult, SqliteArticleRepository};
pub use repo::memory_repo::InMemoryArticleRepository;
pub use seed::{reset_to_seed, seed_articles};
pub use service::article_service::{
    resolve_comment_author, ArticleService, ServiceError, ServiceResult, UpvotePolicy,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
