use blog_core::db::{open_db, open_db_in_memory};
use blog_core::{
    reset_to_seed, Article, ArticleRepository, Comment, RepoError, SqliteArticleRepository,
};
use rusqlite::params;
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn upsert_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteArticleRepository::try_new(&conn).unwrap();

    let mut article = Article::new("learn-react");
    article.upvotes = 3;
    article.upvote_ids = vec!["u1".to_string(), "u2".to_string()];
    article.comments = vec![Comment::new("a@x.com", "first"), Comment::new("b@x.com", "second")];
    repo.upsert_article(&article).unwrap();

    let loaded = repo.get_article("learn-react").unwrap().unwrap();
    assert_eq!(loaded, article);
}

#[test]
fn get_missing_article_returns_none() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteArticleRepository::try_new(&conn).unwrap();

    assert!(repo.get_article("does-not-exist").unwrap().is_none());
}

#[test]
fn upsert_rejects_invalid_names() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteArticleRepository::try_new(&conn).unwrap();

    let err = repo.upsert_article(&Article::new("Not A Slug")).unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
}

#[test]
fn record_upvote_adds_identity_once() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteArticleRepository::try_new(&conn).unwrap();
    repo.upsert_article(&Article::new("learn-node")).unwrap();

    assert!(repo.record_upvote("learn-node", "u1").unwrap());
    assert!(!repo.record_upvote("learn-node", "u1").unwrap());
    assert!(repo.record_upvote("learn-node", "u2").unwrap());

    let article = repo.get_article("learn-node").unwrap().unwrap();
    assert_eq!(article.upvotes, 2);
    assert_eq!(article.upvote_ids, vec!["u1".to_string(), "u2".to_string()]);
}

#[test]
fn record_upvote_treats_ids_as_exact_strings() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteArticleRepository::try_new(&conn).unwrap();
    repo.upsert_article(&Article::new("mongodb")).unwrap();

    assert!(repo.record_upvote("mongodb", "42").unwrap());
    assert!(repo.record_upvote("mongodb", "U42").unwrap());
    assert!(!repo.record_upvote("mongodb", "42").unwrap());

    let article = repo.get_article("mongodb").unwrap().unwrap();
    assert_eq!(article.upvote_ids, vec!["42".to_string(), "U42".to_string()]);
}

#[test]
fn mutations_on_missing_article_return_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteArticleRepository::try_new(&conn).unwrap();

    assert!(matches!(
        repo.increment_upvotes("ghost").unwrap_err(),
        RepoError::NotFound(name) if name == "ghost"
    ));
    assert!(matches!(
        repo.record_upvote("ghost", "u1").unwrap_err(),
        RepoError::NotFound(_)
    ));
    assert!(matches!(
        repo.append_comment("ghost", &Comment::new("a", "b"))
            .unwrap_err(),
        RepoError::NotFound(_)
    ));
}

#[test]
fn increment_upvotes_does_not_track_identity() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteArticleRepository::try_new(&conn).unwrap();
    repo.upsert_article(&Article::new("learn-react")).unwrap();

    repo.increment_upvotes("learn-react").unwrap();
    repo.increment_upvotes("learn-react").unwrap();

    let article = repo.get_article("learn-react").unwrap().unwrap();
    assert_eq!(article.upvotes, 2);
    assert!(article.upvote_ids.is_empty());
}

#[test]
fn append_comment_keeps_insertion_order_and_raw_text() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteArticleRepository::try_new(&conn).unwrap();
    repo.upsert_article(&Article::new("mongodb")).unwrap();

    let comments = [
        Comment::new("a@x.com", "hi"),
        Comment::new("b@x.com", "quotes \" and 'apostrophes'"),
        Comment::new("a@x.com", ""),
    ];
    for comment in &comments {
        repo.append_comment("mongodb", comment).unwrap();
    }

    let article = repo.get_article("mongodb").unwrap().unwrap();
    assert_eq!(article.comments, comments.to_vec());
}

#[test]
fn reset_to_seed_replaces_collection() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteArticleRepository::try_new(&conn).unwrap();
    repo.upsert_article(&Article::new("scratch")).unwrap();
    repo.record_upvote("scratch", "u1").unwrap();

    assert_eq!(reset_to_seed(&repo).unwrap(), 3);

    let names: Vec<String> = repo
        .list_articles()
        .unwrap()
        .into_iter()
        .map(|article| article.name)
        .collect();
    assert_eq!(names, vec!["learn-node", "learn-react", "mongodb"]);
}

#[test]
fn read_rejects_corrupted_upvoter_column() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteArticleRepository::try_new(&conn).unwrap();
    repo.upsert_article(&Article::new("learn-node")).unwrap();

    conn.execute(
        "UPDATE articles SET upvote_ids = ?1, upvotes = 2 WHERE name = ?2;",
        params![r#"["u1","u1"]"#, "learn-node"],
    )
    .unwrap();

    let err = repo.get_article("learn-node").unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));
}

#[test]
fn concurrent_upvotes_from_same_identity_count_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("race.db");
    {
        let conn = open_db(&path).unwrap();
        let repo = SqliteArticleRepository::try_new(&conn).unwrap();
        repo.upsert_article(&Article::new("learn-node")).unwrap();
    }

    const WORKERS: usize = 8;
    let barrier = Arc::new(Barrier::new(WORKERS));
    let handles: Vec<_> = (0..WORKERS)
        .map(|_| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let conn = open_db(&path).unwrap();
                let repo = SqliteArticleRepository::try_new(&conn).unwrap();
                barrier.wait();
                repo.record_upvote("learn-node", "u1").unwrap()
            })
        })
        .collect();

    let recorded = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .filter(|recorded| *recorded)
        .count();
    assert_eq!(recorded, 1);

    let conn = open_db(&path).unwrap();
    let repo = SqliteArticleRepository::try_new(&conn).unwrap();
    let article = repo.get_article("learn-node").unwrap().unwrap();
    assert_eq!(article.upvotes, 1);
    assert_eq!(article.upvote_ids, vec!["u1".to_string()]);
}
