//! Article repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide the article store operations the service is allowed to use.
//! - Keep SQL and JSON-column details inside the persistence boundary.
//!
//! # Invariants
//! - Whole-document writes call `Article::validate()` before SQL mutations.
//! - Read paths reject invalid persisted documents instead of masking them.
//! - `record_upvote` is one conditional statement: the membership check and
//!   the increment cannot interleave with another writer.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::article::{Article, ArticleValidationError, Comment};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const ARTICLE_SELECT_SQL: &str = "SELECT
    name,
    upvotes,
    upvote_ids,
    comments
FROM articles";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for article persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ArticleValidationError),
    Db(DbError),
    /// No article document with this name exists.
    NotFound(String),
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(name) => write!(f, "article not found: {name}"),
            Self::InvalidData(message) => write!(f, "invalid persisted article data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ArticleValidationError> for RepoError {
    fn from(value: ArticleValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for the article document collection.
///
/// Articles are created out-of-band through `upsert_article` or
/// `reset_articles`; use-case code only reads and mutates existing ones.
pub trait ArticleRepository {
    fn get_article(&self, name: &str) -> RepoResult<Option<Article>>;
    /// Lists every article ordered by `name`.
    fn list_articles(&self) -> RepoResult<Vec<Article>>;
    /// Unconditionally adds one upvote without identity tracking.
    fn increment_upvotes(&self, name: &str) -> RepoResult<()>;
    /// Adds one upvote and records `user_id` only if it is not yet recorded.
    ///
    /// Returns `Ok(true)` when the upvote was recorded and `Ok(false)` when
    /// `user_id` had already upvoted.
    fn record_upvote(&self, name: &str, user_id: &str) -> RepoResult<bool>;
    fn append_comment(&self, name: &str, comment: &Comment) -> RepoResult<()>;
    fn upsert_article(&self, article: &Article) -> RepoResult<()>;
    /// Atomically replaces the whole collection.
    fn reset_articles(&self, articles: &[Article]) -> RepoResult<()>;
}

impl<T: ArticleRepository + ?Sized> ArticleRepository for &T {
    fn get_article(&self, name: &str) -> RepoResult<Option<Article>> {
        (**self).get_article(name)
    }

    fn list_articles(&self) -> RepoResult<Vec<Article>> {
        (**self).list_articles()
    }

    fn increment_upvotes(&self, name: &str) -> RepoResult<()> {
        (**self).increment_upvotes(name)
    }

    fn record_upvote(&self, name: &str, user_id: &str) -> RepoResult<bool> {
        (**self).record_upvote(name, user_id)
    }

    fn append_comment(&self, name: &str, comment: &Comment) -> RepoResult<()> {
        (**self).append_comment(name, comment)
    }

    fn upsert_article(&self, article: &Article) -> RepoResult<()> {
        (**self).upsert_article(article)
    }

    fn reset_articles(&self, articles: &[Article]) -> RepoResult<()> {
        (**self).reset_articles(articles)
    }
}

/// SQLite-backed article repository.
///
/// Each article is one row; `upvote_ids` and `comments` are JSON arrays.
pub struct SqliteArticleRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteArticleRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_article_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ArticleRepository for SqliteArticleRepository<'_> {
    fn get_article(&self, name: &str) -> RepoResult<Option<Article>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ARTICLE_SELECT_SQL} WHERE name = ?1;"))?;

        let mut rows = stmt.query([name])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_article_row(row)?));
        }

        Ok(None)
    }

    fn list_articles(&self) -> RepoResult<Vec<Article>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ARTICLE_SELECT_SQL} ORDER BY name ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut articles = Vec::new();

        while let Some(row) = rows.next()? {
            articles.push(parse_article_row(row)?);
        }

        Ok(articles)
    }

    fn increment_upvotes(&self, name: &str) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE articles
             SET
                upvotes = upvotes + 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE name = ?1;",
            [name],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(name.to_string()));
        }

        Ok(())
    }

    fn record_upvote(&self, name: &str, user_id: &str) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE articles
             SET
                upvotes = upvotes + 1,
                upvote_ids = json_insert(upvote_ids, '$[#]', ?2),
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE name = ?1
               AND NOT EXISTS (
                    SELECT 1
                    FROM json_each(articles.upvote_ids)
                    WHERE json_each.value = ?2
               );",
            params![name, user_id],
        )?;

        if changed == 1 {
            return Ok(true);
        }

        if article_exists(self.conn, name)? {
            Ok(false)
        } else {
            Err(RepoError::NotFound(name.to_string()))
        }
    }

    fn append_comment(&self, name: &str, comment: &Comment) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE articles
             SET
                comments = json_insert(
                    comments,
                    '$[#]',
                    json_object('postedBy', ?2, 'text', ?3)
                ),
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE name = ?1;",
            params![name, comment.posted_by.as_str(), comment.text.as_str()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(name.to_string()));
        }

        Ok(())
    }

    fn upsert_article(&self, article: &Article) -> RepoResult<()> {
        article.validate()?;
        upsert_article_row(self.conn, article)
    }

    fn reset_articles(&self, articles: &[Article]) -> RepoResult<()> {
        for article in articles {
            article.validate()?;
        }

        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM articles;", [])?;
        for article in articles {
            upsert_article_row(&tx, article)?;
        }
        tx.commit()?;

        Ok(())
    }
}

fn upsert_article_row(conn: &Connection, article: &Article) -> RepoResult<()> {
    let upvotes = i64::try_from(article.upvotes).map_err(|_| {
        RepoError::InvalidData(format!(
            "upvotes value {} does not fit the articles.upvotes column",
            article.upvotes
        ))
    })?;

    conn.execute(
        "INSERT INTO articles (name, upvotes, upvote_ids, comments)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(name) DO UPDATE SET
            upvotes = excluded.upvotes,
            upvote_ids = excluded.upvote_ids,
            comments = excluded.comments,
            updated_at = (strftime('%s', 'now') * 1000);",
        params![
            article.name.as_str(),
            upvotes,
            encode_json(&article.upvote_ids, "upvote_ids")?,
            encode_json(&article.comments, "comments")?,
        ],
    )?;

    Ok(())
}

fn article_exists(conn: &Connection, name: &str) -> RepoResult<bool> {
    let found = conn
        .query_row("SELECT 1 FROM articles WHERE name = ?1;", [name], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

fn parse_article_row(row: &Row<'_>) -> RepoResult<Article> {
    let name: String = row.get("name")?;

    let upvotes_raw: i64 = row.get("upvotes")?;
    let upvotes = u64::try_from(upvotes_raw).map_err(|_| {
        RepoError::InvalidData(format!(
            "negative upvotes `{upvotes_raw}` in articles.upvotes for `{name}`"
        ))
    })?;

    let upvote_ids_text: String = row.get("upvote_ids")?;
    let upvote_ids: Vec<String> = serde_json::from_str(&upvote_ids_text).map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid articles.upvote_ids for `{name}`: {err}"
        ))
    })?;

    let comments_text: String = row.get("comments")?;
    let comments: Vec<Comment> = serde_json::from_str(&comments_text).map_err(|err| {
        RepoError::InvalidData(format!("invalid articles.comments for `{name}`: {err}"))
    })?;

    let article = Article {
        name,
        upvotes,
        upvote_ids,
        comments,
    };
    article.validate()?;
    Ok(article)
}

fn encode_json<T: serde::Serialize>(value: &T, column: &str) -> RepoResult<String> {
    serde_json::to_string(value)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode articles.{column}: {err}")))
}

fn ensure_article_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "articles")? {
        return Err(RepoError::MissingRequiredTable("articles"));
    }

    for column in [
        "name",
        "upvotes",
        "upvote_ids",
        "comments",
        "created_at",
        "updated_at",
    ] {
        if !table_has_column(conn, "articles", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "articles",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
