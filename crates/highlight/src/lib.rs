// Chunk: docs/chunks/viewport_scheduler - Highlight cache and viewport scheduling

//! glint-highlight: keeps a document's highlight ranges current.
//!
//! A session follows one document through loads, edits, viewport moves and
//! language changes, and reports the ranges that changed as
//! [`HighlightUpdate`]s. Work is bounded by what is on screen:
//!
//! - **Line freshness**: the [`HighlightTracker`] stamps each highlighted
//!   line with the document version; only stale lines are re-highlighted
//! - **Viewport windows**: the [`ViewportScheduler`] highlights the visible
//!   lines plus a margin and forgets lines far from them
//! - **Content cache**: the [`HighlightCache`] keeps ranges per content
//!   fingerprint, so returning to earlier text (undo) skips the walk
//!
//! Two sessions share this machinery. [`HighlightSession`] parses on the
//! calling thread and returns updates directly. [`BackgroundSession`] parses
//! on a worker thread and delivers updates through
//! [`poll`](BackgroundSession::poll), discarding results computed for text
//! that has since changed.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use glint_highlight::{HighlightConfig, HighlightSession};
//! use glint_syntax::{LanguageRegistry, TokenCategory};
//!
//! let registry = Arc::new(LanguageRegistry::new());
//! let mut session = HighlightSession::new(registry, "rust", HighlightConfig::default());
//! session.document_did_load("fn main() {}\n");
//!
//! let update = session.viewport_changed(0, 0).unwrap();
//! assert_eq!(update.lines, 1..=1);
//! assert_eq!(update.ranges[0].category, TokenCategory::Keyword);
//! ```

mod background;
mod cache;
mod config;
mod document;
mod scheduler;
mod session;
mod tracker;
mod update;

pub use background::BackgroundSession;
pub use cache::{CacheKey, HighlightCache};
pub use config::{config_file_path, ConfigError, HighlightConfig};
pub use scheduler::{HighlightTarget, ViewportScheduler};
pub use session::HighlightSession;
pub use tracker::HighlightTracker;
pub use update::{CharRange, HighlightEvent, HighlightUpdate};
