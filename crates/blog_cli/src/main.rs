//! Operator CLI for the blog article store.
//!
//! # Responsibility
//! - Initialize and reset the SQLite article store out-of-band.
//! - Inspect articles and drive the service operations without HTTP.
//!
//! Usage:
//!   blog_cli [--db path] init | seed | list | show <name>
//!   blog_cli [--db path] upvote <name> [--user id] [--counter]
//!   blog_cli [--db path] comment <name> --by <author> <text>

use blog_core::db::open_db;
use blog_core::{
    init_logging, reset_to_seed, resolve_comment_author, ArticleRepository, ArticleService, CallerIdentity,
    SqliteArticleRepository, UpvotePolicy,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "blog_cli", version, about = "Manage the blog article store")]
struct Cli {
    /// Path to SQLite database file
    #[arg(long, global = true, default_value = "blog.sqlite3")]
    db: PathBuf,
    /// Log level written to stderr
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and apply migrations
    Init,
    /// Replace all articles with the built-in seed articles
    Seed,
    /// List article names with upvote and comment counts
    List,
    /// Print one article as JSON
    Show {
        name: String,
    },
    /// Upvote an article
    Upvote {
        name: String,
        /// Caller identity used for dedup
        #[arg(long)]
        user: Option<String>,
        /// Count the upvote without identity tracking
        #[arg(long)]
        counter: bool,
    },
    /// Append a comment to an article
    Comment {
        name: String,
        /// Author recorded as `postedBy`
        #[arg(long = "by")]
        posted_by: String,
        text: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_logging(&cli.log_level, None) {
        eprintln!("blog_cli: {err}");
        return ExitCode::FAILURE;
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("blog_cli: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let conn = open_db(&cli.db)?;
    let repo = SqliteArticleRepository::try_new(&conn)?;

    match cli.command {
        Commands::Init => {
            println!("initialized {}", cli.db.display());
        }
        Commands::Seed => {
            let count = reset_to_seed(&repo)?;
            println!("seeded {count} articles into {}", cli.db.display());
        }
        Commands::List => {
            for article in repo.list_articles()? {
                println!(
                    "{}\tupvotes={}\tcomments={}",
                    article.name,
                    article.upvotes,
                    article.comments.len()
                );
            }
        }
        Commands::Show { name } => {
            let service = ArticleService::new(repo, UpvotePolicy::Dedup);
            let view = service.get_article(&name, None)?;
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        Commands::Upvote {
            name,
            user,
            counter,
        } => {
            let policy = if counter {
                UpvotePolicy::Counter
            } else {
                UpvotePolicy::Dedup
            };
            let caller = user.map(|id| CallerIdentity::new(id, None));
            let service = ArticleService::new(repo, policy);
            let view = service.upvote(&name, caller.as_ref())?;
            println!(
                "{} now has {} upvote(s)",
                view.article.name, view.article.upvotes
            );
        }
        Commands::Comment {
            name,
            posted_by,
            text,
        } => {
            let posted_by = comment_author(&posted_by)?;
            let service = ArticleService::new(repo, UpvotePolicy::Dedup);
            let view = service.add_comment(&name, &posted_by, &text, None)?;
            println!(
                "{} now has {} comment(s)",
                view.article.name,
                view.article.comments.len()
            );
        }
    }

    Ok(())
}

/// Applies the same non-blank author rule as the HTTP comment route.
fn comment_author(posted_by: &str) -> Result<String, String> {
    resolve_comment_author(None, Some(posted_by))
        .ok_or_else(|| "comment author (--by) must not be blank".to_string())
}

#[cfg(test)]
mod tests {
    use super::{comment_author, Cli, Commands};
    use clap::{CommandFactory, Parser};

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn upvote_parses_user_and_global_db() {
        let cli = Cli::parse_from(["blog_cli", "upvote", "learn-node", "--user", "u1", "--db", "x.db"]);
        assert_eq!(cli.db.to_str(), Some("x.db"));
        match cli.command {
            Commands::Upvote {
                name,
                user,
                counter,
            } => {
                assert_eq!(name, "learn-node");
                assert_eq!(user.as_deref(), Some("u1"));
                assert!(!counter);
            }
            _ => panic!("expected upvote command"),
        }
    }

    #[test]
    fn comment_author_is_trimmed_and_must_not_be_blank() {
        assert_eq!(comment_author("  shaun ").as_deref(), Ok("shaun"));
        assert!(comment_author("").is_err());
        assert!(comment_author("   ").is_err());
    }
}
