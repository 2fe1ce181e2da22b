//! Domain model for blog articles and request callers.
//!
//! # Responsibility
//! - Define canonical data structures used by the article service.
//! - Keep the persisted document shape and the read projection separate.
//!
//! # Invariants
//! - Every article is identified by its immutable `name`.
//! - Articles are never destroyed by core use-cases.

pub mod article;
pub mod identity;
