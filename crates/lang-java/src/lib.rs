//! Java semantic engine built on tree-sitter.
//!
//! Indexing runs in two passes: [`collect`] walks each syntax tree and records
//! declarations and raw occurrences, then [`bind`] resolves every occurrence
//! against the declarations of the whole project. [`JavaEngine`] implements
//! the engine contract from `stratum-api` on top of the resulting index.

pub mod bind;
pub mod collect;
pub mod engine;
pub mod error;
pub mod index;
pub mod model;
pub mod pattern;
pub mod project;
pub mod syntax;

pub use engine::JavaEngine;
pub use error::JavaError;
pub use project::JavaProject;
