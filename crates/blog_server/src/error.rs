use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use blog_core::db::DbError;
use blog_core::{RepoError, ServiceError};
use log::{error, warn};
use serde_json::json;
use thiserror::Error;

use crate::identity::VerifyError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("article not found: {0}")]
    NotFound(String),

    #[error("no such route: {0}")]
    UnknownRoute(String),

    #[error("sign in to upvote or comment")]
    Unauthorized,

    #[error("identity verification failed: {0}")]
    IdentityVerificationFailed(#[source] VerifyError),

    #[error("comment author is required")]
    MissingAuthor,

    #[error("article store failure: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) | AppError::UnknownRoute(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized | AppError::IdentityVerificationFailed(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::MissingAuthor => StatusCode::BAD_REQUEST,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "article_not_found",
            AppError::UnknownRoute(_) => "route_not_found",
            AppError::Unauthorized => "unauthorized",
            AppError::IdentityVerificationFailed(_) => "identity_verification_failed",
            AppError::MissingAuthor => "missing_author",
            AppError::Storage(_) => "storage_unavailable",
            AppError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(
                "event=request_failed module=server status=error code={} error={}",
                self.code(),
                self
            );
            // Store details stay in the log.
            "the article service is temporarily unavailable".to_string()
        } else {
            if let AppError::IdentityVerificationFailed(err) = &self {
                warn!(
                    "event=identity_rejected module=server status=error reason={}",
                    err
                );
            }
            self.to_string()
        };

        let body = json!({
            "error": {
                "code": self.code(),
                "message": message,
            }
        });
        (status, Json(body)).into_response()
    }
}

impl From<ServiceError> for AppError {
    fn from(value: ServiceError) -> Self {
        match value {
            ServiceError::ArticleNotFound(name) => AppError::NotFound(name),
            ServiceError::Repo(err) => AppError::from(err),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(name) => AppError::NotFound(name),
            other => AppError::Storage(other.to_string()),
        }
    }
}

impl From<DbError> for AppError {
    fn from(value: DbError) -> Self {
        AppError::Storage(value.to_string())
    }
}
