//! Process-local article repository.
//!
//! Backs tests and ephemeral deployments (`:memory:` store). Every operation
//! runs under one lock acquisition, which gives `record_upvote` the same
//! atomic check-and-increment semantics as the SQLite statement.

use crate::model::article::{Article, Comment};
use crate::repo::article_repo::{ArticleRepository, RepoError, RepoResult};
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// In-memory article collection keyed by name.
#[derive(Debug, Default)]
pub struct InMemoryArticleRepository {
    articles: Mutex<BTreeMap<String, Article>>,
}

impl InMemoryArticleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository pre-populated with `articles`.
    pub fn with_articles(articles: &[Article]) -> RepoResult<Self> {
        let repo = Self::new();
        repo.reset_articles(articles)?;
        Ok(repo)
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Article>> {
        // A panic while holding the lock cannot leave a half-applied
        // mutation behind: every write is a single in-place update.
        self.articles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_article<T>(
        &self,
        name: &str,
        update: impl FnOnce(&mut Article) -> T,
    ) -> RepoResult<T> {
        let mut articles = self.lock();
        let article = articles
            .get_mut(name)
            .ok_or_else(|| RepoError::NotFound(name.to_string()))?;
        Ok(update(article))
    }
}

impl ArticleRepository for InMemoryArticleRepository {
    fn get_article(&self, name: &str) -> RepoResult<Option<Article>> {
        Ok(self.lock().get(name).cloned())
    }

    fn list_articles(&self) -> RepoResult<Vec<Article>> {
        Ok(self.lock().values().cloned().collect())
    }

    fn increment_upvotes(&self, name: &str) -> RepoResult<()> {
        self.with_article(name, |article| article.upvotes += 1)
    }

    fn record_upvote(&self, name: &str, user_id: &str) -> RepoResult<bool> {
        self.with_article(name, |article| {
            if article.has_upvoted(user_id) {
                return false;
            }
            article.upvotes += 1;
            article.upvote_ids.push(user_id.to_string());
            true
        })
    }

    fn append_comment(&self, name: &str, comment: &Comment) -> RepoResult<()> {
        self.with_article(name, |article| article.comments.push(comment.clone()))
    }

    fn upsert_article(&self, article: &Article) -> RepoResult<()> {
        article.validate()?;
        self.lock().insert(article.name.clone(), article.clone());
        Ok(())
    }

    fn reset_articles(&self, articles: &[Article]) -> RepoResult<()> {
        for article in articles {
            article.validate()?;
        }

        let replacement = articles
            .iter()
            .map(|article| (article.name.clone(), article.clone()))
            .collect();
        *self.lock() = replacement;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::InMemoryArticleRepository;
    use crate::model::article::Article;
    use crate::repo::article_repo::{ArticleRepository, RepoError};

    #[test]
    fn record_upvote_is_conditional_on_membership() {
        let repo = InMemoryArticleRepository::with_articles(&[Article::new("learn-node")]).unwrap();

        assert!(repo.record_upvote("learn-node", "u1").unwrap());
        assert!(!repo.record_upvote("learn-node", "u1").unwrap());

        let article = repo.get_article("learn-node").unwrap().unwrap();
        assert_eq!(article.upvotes, 1);
        assert_eq!(article.upvote_ids, vec!["u1".to_string()]);
    }

    #[test]
    fn reset_rejects_invalid_documents_without_touching_state() {
        let repo = InMemoryArticleRepository::with_articles(&[Article::new("mongodb")]).unwrap();

        let err = repo
            .reset_articles(&[Article::new("Bad Name")])
            .unwrap_err();
        assert!(matches!(err, RepoError::Validation(_)));
        assert!(repo.get_article("mongodb").unwrap().is_some());
    }

    #[test]
    fn list_is_ordered_by_name() {
        let repo = InMemoryArticleRepository::with_articles(&[
            Article::new("mongodb"),
            Article::new("learn-react"),
        ])
        .unwrap();

        let names: Vec<String> = repo
            .list_articles()
            .unwrap()
            .into_iter()
            .map(|article| article.name)
            .collect();
        assert_eq!(names, vec!["learn-react", "mongodb"]);
    }
}
