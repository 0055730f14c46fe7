// Chunk: docs/chunks/syntax_highlighting - Flat highlight ranges from overlapping captures

//! Flat highlight ranges.
//!
//! Highlight queries produce overlapping captures: a string node and the
//! escape sequence inside it, or the same identifier matched by two patterns
//! of a combined C/C++ query. Consumers want one category per byte, so
//! captures are flattened into sorted, non-overlapping [`HighlightRange`]s.

use std::cmp::Reverse;
use std::ops::Range;

use crate::category::TokenCategory;

/// A byte range of the document carrying one token category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HighlightRange {
    pub start_byte: usize,
    pub end_byte: usize,
    pub category: TokenCategory,
}

impl HighlightRange {
    pub fn new(start_byte: usize, end_byte: usize, category: TokenCategory) -> Self {
        Self {
            start_byte,
            end_byte,
            category,
        }
    }

    pub fn byte_range(&self) -> Range<usize> {
        self.start_byte..self.end_byte
    }

    pub fn len(&self) -> usize {
        self.end_byte - self.start_byte
    }

    pub fn is_empty(&self) -> bool {
        self.start_byte >= self.end_byte
    }

    /// Returns true if the range shares at least one byte with `span`.
    pub fn intersects(&self, span: &Range<usize>) -> bool {
        self.start_byte < span.end && span.start < self.end_byte
    }

    /// Returns this range moved by `offset` bytes.
    pub fn shifted(self, offset: usize) -> Self {
        Self::new(self.start_byte + offset, self.end_byte + offset, self.category)
    }
}

/// A mapped capture as collected from a query cursor.
///
/// `order` is the position in which the cursor yielded the capture; among
/// captures of the same node the first pattern wins.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Capture {
    pub start: usize,
    pub end: usize,
    pub category: TokenCategory,
    pub order: usize,
}

/// Flattens captures into sorted, non-overlapping ranges clipped to `window`.
///
/// Captures are visited by start, longest first. A capture overlapping bytes
/// already covered contributes only its uncovered tail, so enclosing
/// captures win over the captures nested inside them. Adjacent ranges of the
/// same category are merged.
pub(crate) fn flatten(mut captures: Vec<Capture>, window: Range<usize>) -> Vec<HighlightRange> {
    captures.sort_by_key(|c| (c.start, Reverse(c.end), c.order));

    let mut ranges: Vec<HighlightRange> = Vec::with_capacity(captures.len());
    let mut covered_until = window.start;

    for capture in captures {
        let start = capture.start.max(window.start).max(covered_until);
        let end = capture.end.min(window.end);
        if end <= start {
            continue;
        }

        match ranges.last_mut() {
            Some(last) if last.end_byte == start && last.category == capture.category => {
                last.end_byte = end;
            }
            _ => ranges.push(HighlightRange::new(start, end, capture.category)),
        }
        covered_until = end;
    }

    ranges
}

/// Replaces everything `outer` says about `region` with `nested`.
///
/// Outer ranges are cut around the region (parts outside it survive);
/// `nested` ranges are expected to lie inside the region already. The result
/// is sorted by start.
pub(crate) fn carve(
    outer: Vec<HighlightRange>,
    region: &Range<usize>,
    nested: Vec<HighlightRange>,
) -> Vec<HighlightRange> {
    let mut result = Vec::with_capacity(outer.len() + nested.len());
    for range in outer {
        if !range.intersects(region) {
            result.push(range);
            continue;
        }
        if range.start_byte < region.start {
            result.push(HighlightRange::new(range.start_byte, region.start, range.category));
        }
        if range.end_byte > region.end {
            result.push(HighlightRange::new(region.end, range.end_byte, range.category));
        }
    }
    result.extend(nested);
    result.sort_by_key(|r| (r.start_byte, r.end_byte));
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use TokenCategory::*;

    fn cap(start: usize, end: usize, category: TokenCategory, order: usize) -> Capture {
        Capture {
            start,
            end,
            category,
            order,
        }
    }

    fn assert_flat(ranges: &[HighlightRange]) {
        for pair in ranges.windows(2) {
            assert!(
                pair[0].end_byte <= pair[1].start_byte,
                "overlap: {:?} and {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_enclosing_capture_wins() {
        // string [0, 10) with an escape [3, 5) inside
        let ranges = flatten(
            vec![cap(3, 5, Keyword, 1), cap(0, 10, String, 0)],
            0..100,
        );
        assert_eq!(ranges, vec![HighlightRange::new(0, 10, String)]);
    }

    #[test]
    fn test_first_pattern_wins_for_same_node() {
        let ranges = flatten(
            vec![cap(0, 5, Function, 1), cap(0, 5, Keyword, 0)],
            0..100,
        );
        assert_eq!(ranges, vec![HighlightRange::new(0, 5, Keyword)]);
    }

    #[test]
    fn test_overlapping_capture_keeps_uncovered_tail() {
        // Capture A: [0, 5) keyword, capture B: [3, 12) function
        let ranges = flatten(
            vec![cap(0, 5, Keyword, 0), cap(3, 12, Function, 1)],
            0..100,
        );
        assert_eq!(
            ranges,
            vec![
                HighlightRange::new(0, 5, Keyword),
                HighlightRange::new(5, 12, Function),
            ]
        );
        assert_flat(&ranges);
    }

    #[test]
    fn test_clipped_to_window() {
        let ranges = flatten(
            vec![
                cap(0, 8, Comment, 0),
                cap(10, 12, Keyword, 1),
                cap(18, 30, String, 2),
            ],
            5..20,
        );
        assert_eq!(
            ranges,
            vec![
                HighlightRange::new(5, 8, Comment),
                HighlightRange::new(10, 12, Keyword),
                HighlightRange::new(18, 20, String),
            ]
        );
    }

    #[test]
    fn test_adjacent_same_category_merges() {
        let ranges = flatten(
            vec![cap(0, 1, Punctuation, 0), cap(1, 2, Punctuation, 1)],
            0..10,
        );
        assert_eq!(ranges, vec![HighlightRange::new(0, 2, Punctuation)]);
    }

    #[test]
    fn test_carve_replaces_region() {
        let outer = vec![
            HighlightRange::new(0, 8, Tag),
            HighlightRange::new(8, 20, String),
            HighlightRange::new(25, 30, Tag),
        ];
        let nested = vec![
            HighlightRange::new(10, 13, Keyword),
            HighlightRange::new(14, 15, Number),
        ];
        let ranges = carve(outer, &(8..20), nested);
        assert_eq!(
            ranges,
            vec![
                HighlightRange::new(0, 8, Tag),
                HighlightRange::new(10, 13, Keyword),
                HighlightRange::new(14, 15, Number),
                HighlightRange::new(25, 30, Tag),
            ]
        );
    }

    #[test]
    fn test_carve_keeps_outer_parts_outside_region() {
        let outer = vec![HighlightRange::new(0, 30, Comment)];
        let ranges = carve(outer, &(10..20), vec![HighlightRange::new(12, 14, Keyword)]);
        assert_eq!(
            ranges,
            vec![
                HighlightRange::new(0, 10, Comment),
                HighlightRange::new(12, 14, Keyword),
                HighlightRange::new(20, 30, Comment),
            ]
        );
        assert_flat(&ranges);
    }
}
