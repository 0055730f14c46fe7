// Chunk: docs/chunks/viewport_scheduler - Outbound highlight notifications

use std::ops::{Range, RangeInclusive};

use glint_buffer::{ByteCharMap, Fingerprint};
use glint_syntax::{HighlightRange, TokenCategory};

/// Highlight ranges for one span of the document.
///
/// The consumer replaces whatever it holds for `byte_span` with `ranges`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightUpdate {
    /// Content the ranges were computed for.
    pub fingerprint: Fingerprint,
    /// 1-based lines covered.
    pub lines: RangeInclusive<usize>,
    /// Byte span covered, terminators included.
    pub byte_span: Range<usize>,
    /// Sorted, non-overlapping ranges inside `byte_span`.
    pub ranges: Vec<HighlightRange>,
    /// True if served from the cache without running the engine.
    pub from_cache: bool,
}

impl HighlightUpdate {
    /// Projects the ranges into character space with `map`.
    ///
    /// Ranges that do not fall on character boundaries are dropped.
    pub fn char_ranges(&self, map: &ByteCharMap) -> Vec<CharRange> {
        self.ranges
            .iter()
            .filter_map(|r| {
                let chars = map.range_to_chars(r.byte_range())?;
                Some(CharRange {
                    start: chars.start,
                    end: chars.end,
                    category: r.category,
                })
            })
            .collect()
    }
}

/// A highlight range in character space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharRange {
    pub start: usize,
    pub end: usize,
    pub category: TokenCategory,
}

/// Notifications delivered by [`poll`](crate::HighlightSession::poll).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HighlightEvent {
    /// New ranges for a span of the current document.
    Updated(HighlightUpdate),
    /// A parse ran out of time; highlighting is off until the document's
    /// language changes. Sent once.
    TimedOut,
}
