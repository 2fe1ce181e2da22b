//! Built-in article collection used to initialize or reset a store.
//!
//! Articles only enter the store through this module (or an operator
//! upsert); request handlers never create them.

use crate::model::article::Article;
use crate::repo::article_repo::{ArticleRepository, RepoResult};
use log::info;

/// Names of the articles shipped with the blog frontend.
pub const SEED_ARTICLE_NAMES: &[&str] = &["learn-react", "learn-node", "mongodb"];

/// Returns the seed articles with no upvotes and no comments.
pub fn seed_articles() -> Vec<Article> {
    SEED_ARTICLE_NAMES
        .iter()
        .map(|name| Article::new(*name))
        .collect()
}

/// Replaces every stored article with the seed collection.
///
/// Returns the number of articles written.
pub fn reset_to_seed(repo: &impl ArticleRepository) -> RepoResult<usize> {
    let articles = seed_articles();
    repo.reset_articles(&articles)?;
    info!(
        "event=store_reset module=seed status=ok articles={}",
        articles.len()
    );
    Ok(articles.len())
}
