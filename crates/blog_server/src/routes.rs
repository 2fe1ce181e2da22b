use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, Uri},
    Json,
};
use blog_core::{resolve_comment_author, ArticleView, CallerIdentity};
use log::info;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    error::AppError,
    identity::{VerifyError, AUTH_TOKEN_HEADER},
    state::AppState,
};

/// Identity resolved from the `authtoken` header; `None` when absent.
pub struct Caller(pub Option<CallerIdentity>);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(AUTH_TOKEN_HEADER) else {
            return Ok(Caller(None));
        };

        let token = value
            .to_str()
            .map(str::trim)
            .ok()
            .filter(|token| !token.is_empty())
            .ok_or(AppError::IdentityVerificationFailed(
                VerifyError::MalformedToken,
            ))?;

        state.resolve_identity(token).await.map(|caller| Caller(Some(caller)))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    #[serde(default)]
    posted_by: Option<String>,
    text: String,
}

pub async fn health_handler() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": blog_core::core_version(),
    }))
}

pub async fn get_article_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Caller(caller): Caller,
) -> Result<Json<ArticleView>, AppError> {
    let view = state
        .with_service(move |service| service.get_article(&name, caller.as_ref()))
        .await?;

    Ok(Json(view))
}

pub async fn upvote_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Caller(caller): Caller,
) -> Result<Json<ArticleView>, AppError> {
    let caller = state.gate_mutation(caller)?;
    let anonymous = caller.is_none();

    let view = state
        .with_service(move |service| service.upvote(&name, caller.as_ref()))
        .await?;

    info!(
        "event=article_upvote module=routes status=ok article={} anonymous={} upvotes={}",
        view.article.name, anonymous, view.article.upvotes
    );
    Ok(Json(view))
}

pub async fn add_comment_handler(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Caller(caller): Caller,
    Json(payload): Json<NewComment>,
) -> Result<Json<ArticleView>, AppError> {
    let caller = state.gate_mutation(caller)?;
    let posted_by = resolve_comment_author(caller.as_ref(), payload.posted_by.as_deref());
    let text = payload.text;

    // Unknown articles report 404 before a missing author is reported.
    let view = state
        .with_service(move |service| match posted_by {
            Some(posted_by) => service
                .add_comment(&name, &posted_by, &text, caller.as_ref())
                .map(Some),
            None => service.get_article(&name, caller.as_ref()).map(|_| None),
        })
        .await?
        .ok_or(AppError::MissingAuthor)?;

    info!(
        "event=article_comment module=routes status=ok article={} comments={}",
        view.article.name,
        view.article.comments.len()
    );
    Ok(Json(view))
}

pub async fn api_not_found_handler(uri: Uri) -> AppError {
    AppError::UnknownRoute(uri.path().to_string())
}
