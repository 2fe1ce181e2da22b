//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the article store contract used by the service layer.
//! - Isolate SQLite query details from use-case orchestration.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.
//! - Conditional upvotes are atomic at the store boundary.

pub mod article_repo;
pub mod memory_repo;
