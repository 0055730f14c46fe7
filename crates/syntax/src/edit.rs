// Chunk: docs/chunks/syntax_highlighting - Edit descriptors for incremental parsing

//! Edit descriptors in tree-sitter coordinates.
//!
//! Tree-sitter wants every edit as byte offsets plus (row, column) points,
//! where rows count `\n` bytes and columns are byte offsets within the row.
//! [`EditDescriptor`] carries both, built from the pre-edit text so the
//! points describe the document the persistent tree was parsed from.

use std::ops::Range;

use memchr::{memchr_iter, memrchr};
use tree_sitter::{InputEdit, Point};

/// One contiguous replacement, in tree-sitter coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditDescriptor {
    /// Byte offset where the edit starts
    pub start_byte: usize,
    /// Byte offset where the old content ended
    pub old_end_byte: usize,
    /// Byte offset where the new content ends
    pub new_end_byte: usize,
    pub start_point: Point,
    pub old_end_point: Point,
    pub new_end_point: Point,
}

impl EditDescriptor {
    /// Describes replacing `range` of `before` with `text`.
    ///
    /// Returns `None` if the range is reversed or extends past the end.
    pub fn for_replace(before: &str, range: Range<usize>, text: &str) -> Option<Self> {
        if range.start > range.end || range.end > before.len() {
            return None;
        }
        let start_point = point_for_offset(before, range.start);
        let old_end_point = advance(start_point, &before.as_bytes()[range.clone()]);
        let new_end_point = advance(start_point, text.as_bytes());

        Some(Self {
            start_byte: range.start,
            old_end_byte: range.end,
            new_end_byte: range.start + text.len(),
            start_point,
            old_end_point,
            new_end_point,
        })
    }

    /// Describes inserting `text` at byte offset `at` of `before`.
    pub fn for_insert(before: &str, at: usize, text: &str) -> Option<Self> {
        Self::for_replace(before, at..at, text)
    }

    /// Describes deleting `range` from `before`.
    pub fn for_delete(before: &str, range: Range<usize>) -> Option<Self> {
        Self::for_replace(before, range, "")
    }

    /// Change in document length caused by this edit.
    pub fn delta(&self) -> isize {
        self.new_end_byte as isize - self.old_end_byte as isize
    }

    /// Maps a byte range of the pre-edit text into the post-edit text.
    ///
    /// A range touching the replaced bytes grows to cover the inserted text.
    pub fn map_range(&self, range: Range<usize>) -> Range<usize> {
        let shift = |offset: usize| offset - self.old_end_byte + self.new_end_byte;
        let start = if range.start <= self.start_byte {
            range.start
        } else if range.start >= self.old_end_byte {
            shift(range.start)
        } else {
            self.start_byte
        };
        let end = if range.end < self.start_byte {
            range.end
        } else if range.end >= self.old_end_byte {
            shift(range.end)
        } else {
            self.new_end_byte
        };
        start..end.max(start)
    }

    /// Converts this edit to a tree-sitter `InputEdit`.
    pub fn to_input_edit(&self) -> InputEdit {
        InputEdit {
            start_byte: self.start_byte,
            old_end_byte: self.old_end_byte,
            new_end_byte: self.new_end_byte,
            start_position: self.start_point,
            old_end_position: self.old_end_point,
            new_end_position: self.new_end_point,
        }
    }
}

/// Returns the tree-sitter point for a byte offset in `source`.
///
/// Offsets past the end are clamped to the end.
///
/// # Example
///
/// ```
/// use glint_syntax::point_for_offset;
///
/// let source = "hello\nworld";
/// assert_eq!(point_for_offset(source, 0).row, 0);
/// assert_eq!(point_for_offset(source, 6).row, 1); // after newline
/// assert_eq!(point_for_offset(source, 11).column, 5);
/// ```
pub fn point_for_offset(source: &str, byte_offset: usize) -> Point {
    let prefix = &source.as_bytes()[..byte_offset.min(source.len())];
    advance(Point::new(0, 0), prefix)
}

/// Moves `start` past `bytes`.
fn advance(start: Point, bytes: &[u8]) -> Point {
    let newlines = memchr_iter(b'\n', bytes).count();
    match memrchr(b'\n', bytes) {
        Some(last) => Point::new(start.row + newlines, bytes.len() - last - 1),
        None => Point::new(start.row, start.column + bytes.len()),
    }
}
