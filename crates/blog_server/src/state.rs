use std::path::PathBuf;
use std::sync::Arc;

use blog_core::db::open_db;
use blog_core::{
    reset_to_seed, ArticleRepository, ArticleService, CallerIdentity, InMemoryArticleRepository,
    ServiceResult, SqliteArticleRepository, UpvotePolicy,
};
use log::info;
use tokio::task;

use crate::{
    config::{AuthMode, Config, StoreLocation},
    error::AppError,
    identity::{IdentityVerifier, TokenFileVerifier, VerifyError},
    ServerError,
};

/// Where article documents live.
#[derive(Clone)]
pub enum ArticleStore {
    /// SQLite file; each service call opens its own connection.
    Sqlite(PathBuf),
    Memory(Arc<InMemoryArticleRepository>),
}

impl ArticleStore {
    fn run<T>(
        &self,
        policy: UpvotePolicy,
        operation: impl FnOnce(&ArticleService<&dyn ArticleRepository>) -> ServiceResult<T>,
    ) -> Result<T, AppError> {
        match self {
            ArticleStore::Sqlite(path) => {
                let conn = open_db(path)?;
                let repo = SqliteArticleRepository::try_new(&conn)?;
                let service = ArticleService::new(&repo as &dyn ArticleRepository, policy);
                Ok(operation(&service)?)
            }
            ArticleStore::Memory(repo) => {
                let service = ArticleService::new(repo.as_ref() as &dyn ArticleRepository, policy);
                Ok(operation(&service)?)
            }
        }
    }
}

pub struct AppState {
    pub store: ArticleStore,
    pub auth_mode: AuthMode,
    pub verifier: Option<Arc<dyn IdentityVerifier>>,
}

impl AppState {
    pub fn new(
        store: ArticleStore,
        auth_mode: AuthMode,
        verifier: Option<Arc<dyn IdentityVerifier>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            auth_mode,
            verifier,
        })
    }

    /// Builds state from configuration, preparing the store.
    ///
    /// File stores are migrated up front and reset to the seed articles when
    /// `seed_on_start` is set. The memory store always starts seeded.
    pub fn from_config(config: &Config) -> Result<Arc<Self>, ServerError> {
        let store = match &config.store {
            StoreLocation::File(path) => {
                let conn = open_db(path)?;
                let repo = SqliteArticleRepository::try_new(&conn)?;
                if config.seed_on_start {
                    reset_to_seed(&repo)?;
                }
                let articles = repo.list_articles()?.len();
                info!(
                    "event=store_ready module=server status=ok store=sqlite path={} articles={}",
                    path.display(),
                    articles
                );
                ArticleStore::Sqlite(path.clone())
            }
            StoreLocation::Memory => {
                let repo = InMemoryArticleRepository::new();
                reset_to_seed(&repo)?;
                info!("event=store_ready module=server status=ok store=memory");
                ArticleStore::Memory(Arc::new(repo))
            }
        };

        let verifier = match &config.tokens_file {
            Some(path) => {
                let verifier = TokenFileVerifier::load(path)?;
                info!(
                    "event=verifier_ready module=server status=ok tokens={}",
                    verifier.len()
                );
                Some(Arc::new(verifier) as Arc<dyn IdentityVerifier>)
            }
            None => None,
        };

        Ok(Self::new(store, config.auth_mode, verifier))
    }

    pub async fn resolve_identity(&self, token: &str) -> Result<CallerIdentity, AppError> {
        let verifier = self
            .verifier
            .as_ref()
            .ok_or(AppError::IdentityVerificationFailed(VerifyError::NotConfigured))?;
        verifier
            .verify(token)
            .await
            .map_err(AppError::IdentityVerificationFailed)
    }

    /// Applies the deployment gate for upvote and comment routes.
    pub fn gate_mutation(
        &self,
        caller: Option<CallerIdentity>,
    ) -> Result<Option<CallerIdentity>, AppError> {
        if self.auth_mode.requires_identity() && caller.is_none() {
            return Err(AppError::Unauthorized);
        }
        Ok(caller)
    }

    /// Runs one service call on the blocking pool.
    pub async fn with_service<T, F>(&self, operation: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(&ArticleService<&dyn ArticleRepository>) -> ServiceResult<T> + Send + 'static,
    {
        let store = self.store.clone();
        let policy = self.auth_mode.upvote_policy();

        task::spawn_blocking(move || store.run(policy, operation))
            .await
            .map_err(|err| AppError::Internal(format!("article service task failed: {err}")))?
    }
}
