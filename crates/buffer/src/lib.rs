// Chunk: docs/chunks/line_index - Byte-offset line index with lazy incremental updates
// Chunk: docs/chunks/content_fingerprint - Immutable text snapshots with content fingerprints
// Chunk: docs/chunks/char_projection - Byte to character offset projection

//! glint-buffer: document snapshots and line bookkeeping for the glint
//! highlighting engine.
//!
//! # Overview
//!
//! - [`TextSnapshot`] is an immutable, cheaply cloned view of the document
//!   with a content [`Fingerprint`].
//! - [`LineIndex`] maps byte offsets to [`Line`]s and back, patching itself
//!   incrementally for edits that stay on one line.
//! - [`ByteCharMap`] projects byte offsets into UTF-16 or scalar offsets.
//!
//! # Example
//!
//! ```
//! use glint_buffer::{DirtyLines, LineIndex, TextSnapshot};
//!
//! let snapshot = TextSnapshot::new("abc\ndef\n");
//! let mut index = LineIndex::from_snapshot(&snapshot);
//! assert_eq!(index.line_count(), 2);
//!
//! // Typing inside a line is patched in place
//! let edited = snapshot.splice(1..1, "X").unwrap();
//! assert_eq!(index.did_insert(1, "X", &edited), DirtyLines::Single(1));
//! assert_eq!(index.line(1).unwrap().length, 5);
//!
//! // A new line terminator defers to a rebuild on the next query
//! let split = edited.splice(1..1, "\n").unwrap();
//! assert_eq!(index.did_insert(1, "\n", &split), DirtyLines::FromLineToEnd(1));
//! assert_eq!(index.line_count(), 3);
//! ```
//!
//! # Dirty Line Tracking
//!
//! Every edit notification returns a [`DirtyLines`] value:
//!
//! - `DirtyLines::None` - nothing changed (empty edit)
//! - `DirtyLines::Single(line)` - one line changed, line count unchanged
//! - `DirtyLines::FromLineToEnd(line)` - the line structure changed, every
//!   line from `line` on must be treated as stale

mod byte_char_map;
mod line_index;
mod snapshot;
mod types;

pub use byte_char_map::{ByteCharMap, CharEncoding};
pub use line_index::{Line, LineIndex, Terminator};
pub use snapshot::{Fingerprint, TextSnapshot};
pub use types::DirtyLines;
