// Chunk: docs/chunks/line_index - Dirty line reporting for index updates

use std::ops::RangeInclusive;

/// Information about which lines an edit dirtied.
///
/// Returned by [`LineIndex::did_insert`](crate::LineIndex::did_insert) and
/// [`LineIndex::did_delete`](crate::LineIndex::did_delete). Line numbers are
/// 1-based, matching [`Line::number`](crate::Line).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirtyLines {
    /// No lines changed (empty insertion or deletion).
    None,
    /// A single line changed and the line count is unchanged.
    Single(usize),
    /// A range of lines changed [from, to).
    Range { from: usize, to: usize },
    /// Everything from a line to the end of the document changed.
    /// Used whenever the line count may have changed, since every line
    /// number after the edit point is then untrustworthy.
    FromLineToEnd(usize),
}

impl DirtyLines {
    /// Returns true if no lines were dirtied.
    pub fn is_none(&self) -> bool {
        matches!(self, DirtyLines::None)
    }

    /// Returns true if the dirty region runs to the end of the document.
    pub fn reaches_end(&self) -> bool {
        matches!(self, DirtyLines::FromLineToEnd(_))
    }

    /// Returns the starting line of the dirty region, if any.
    pub fn start_line(&self) -> Option<usize> {
        match self {
            DirtyLines::None => None,
            DirtyLines::Single(line) => Some(*line),
            DirtyLines::Range { from, .. } => Some(*from),
            DirtyLines::FromLineToEnd(line) => Some(*line),
        }
    }

    /// Returns the dirty lines as an inclusive range, clamped to a document
    /// of `line_count` lines.
    pub fn to_line_range(&self, line_count: usize) -> Option<RangeInclusive<usize>> {
        let (from, last) = match self {
            DirtyLines::None => return None,
            DirtyLines::Single(line) => (*line, *line),
            DirtyLines::Range { from, to } => (*from, to.saturating_sub(1)),
            DirtyLines::FromLineToEnd(line) => (*line, line_count),
        };
        let last = last.min(line_count);
        let from = from.max(1);
        (from <= last).then_some(from..=last)
    }

    /// Merges another dirty region into this one, producing the smallest
    /// region that covers both.
    ///
    /// Used when several edits land before the highlight pass that consumes
    /// them runs.
    pub fn merge(&mut self, other: DirtyLines) {
        *self = match (&*self, &other) {
            (DirtyLines::None, _) => other,
            (_, DirtyLines::None) => return,

            (DirtyLines::FromLineToEnd(a), DirtyLines::FromLineToEnd(b)) => {
                DirtyLines::FromLineToEnd((*a).min(*b))
            }
            (DirtyLines::FromLineToEnd(a), other) | (other, DirtyLines::FromLineToEnd(a)) => {
                match other.start_line() {
                    Some(b) => DirtyLines::FromLineToEnd((*a).min(b)),
                    None => DirtyLines::FromLineToEnd(*a),
                }
            }

            (DirtyLines::Single(a), DirtyLines::Single(b)) => {
                if a == b {
                    DirtyLines::Single(*a)
                } else {
                    DirtyLines::Range {
                        from: (*a).min(*b),
                        to: (*a).max(*b) + 1,
                    }
                }
            }

            (DirtyLines::Single(a), DirtyLines::Range { from, to })
            | (DirtyLines::Range { from, to }, DirtyLines::Single(a)) => DirtyLines::Range {
                from: (*from).min(*a),
                to: (*to).max(*a + 1),
            },

            (DirtyLines::Range { from: a, to: b }, DirtyLines::Range { from: c, to: d }) => {
                DirtyLines::Range {
                    from: (*a).min(*c),
                    to: (*b).max(*d),
                }
            }
        };
    }
}
