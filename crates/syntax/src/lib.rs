// Chunk: docs/chunks/syntax_highlighting - Tree-sitter syntax highlighting

//! glint-syntax: tree-sitter parse engines producing token categories.
//!
//! This crate turns text into flat, non-overlapping [`HighlightRange`]s. It
//! keeps latency low on large files by:
//!
//! - **Incremental parsing**: edits are applied to the persistent tree and
//!   only the changed parts are re-parsed
//! - **Window-scoped highlighting**: captures are collected for a byte
//!   window, not the whole document
//!
//! # Overview
//!
//! - [`LanguageRegistry`]: maps file extensions and names to grammars and
//!   their queries.
//! - [`ParseEngine`]: owns a parser and the [`SyntaxTree`] for one document,
//!   with [`ParseEngine::sync`] for incremental updates and
//!   [`ParseEngine::highlights_in`] for windowed highlighting. Embedded
//!   languages are highlighted by nested engines.
//! - [`TokenCategory`]: the closed set of categories ranges carry.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use glint_buffer::TextSnapshot;
//! use glint_syntax::{EngineOptions, LanguageRegistry, ParseEngine, TokenCategory};
//!
//! let registry = Arc::new(LanguageRegistry::new());
//! let mut engine = ParseEngine::new(registry, "rust", EngineOptions::default()).unwrap();
//!
//! let snapshot = TextSnapshot::new("fn main() {}");
//! let ranges = engine.parse(&snapshot).unwrap();
//! assert_eq!(ranges[0].category, TokenCategory::Keyword);
//! assert_eq!(ranges[0].byte_range(), 0..2);
//! ```

mod category;
mod edit;
mod engine;
mod error;
mod injection;
mod range;
mod registry;

pub use category::{CategoryOverride, CategoryTable, TokenCategory};
pub use edit::{point_for_offset, EditDescriptor};
pub use engine::{
    EngineOptions, ParseEngine, SyncOutcome, SyntaxTree, DEFAULT_MAX_INJECTION_DEPTH,
    DEFAULT_PARSE_TIMEOUT,
};
pub use error::SyntaxError;
pub use range::HighlightRange;
pub use registry::{InjectionRule, LanguageConfig, LanguageRegistry};
