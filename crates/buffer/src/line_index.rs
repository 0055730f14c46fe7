// Chunk: docs/chunks/line_index - Byte-offset line index with lazy incremental updates

//! Line index for tracking line boundaries in a document snapshot.
//!
//! Maintains an array of line start offsets (UTF-8 bytes) plus the terminator
//! that ends each line. Offset → line lookup is a binary search. Edits that
//! stay inside one line are patched in O(1) amortized time by folding them
//! into a pending shift; anything that adds, removes or re-pairs a line
//! terminator marks the index for a full rebuild, which the next query
//! performs against the latest snapshot.

use std::ops::{Range, RangeInclusive};

use memchr::memchr2;

use crate::snapshot::TextSnapshot;
use crate::types::DirtyLines;

/// The terminator that ends a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    /// The last line of a document without a trailing terminator.
    None,
    Lf,
    Cr,
    CrLf,
}

impl Terminator {
    /// Length of the terminator in bytes.
    pub fn len(self) -> usize {
        match self {
            Terminator::None => 0,
            Terminator::Lf | Terminator::Cr => 1,
            Terminator::CrLf => 2,
        }
    }

    /// Returns true for [`Terminator::None`].
    pub fn is_none(self) -> bool {
        self == Terminator::None
    }
}

/// One line of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line {
    /// 1-based line number.
    pub number: usize,
    /// Byte offset of the first byte of the line.
    pub start_offset: usize,
    /// Length in bytes including the terminator.
    pub length: usize,
    /// Length in bytes excluding the terminator.
    pub content_length: usize,
}

impl Line {
    /// Byte offset one past the terminator.
    pub fn end_offset(&self) -> usize {
        self.start_offset + self.length
    }

    /// Byte offset one past the last content byte.
    pub fn content_end(&self) -> usize {
        self.start_offset + self.content_length
    }

    /// The full byte range of the line, terminator included.
    pub fn byte_range(&self) -> Range<usize> {
        self.start_offset..self.end_offset()
    }
}

/// Same-line edits not yet folded into `line_starts`.
///
/// Every start strictly after `after_line` (0-based) is off by `delta`.
#[derive(Debug, Clone, Copy)]
struct PendingShift {
    after_line: usize,
    delta: isize,
}

fn shifted(start: usize, delta: isize) -> usize {
    start.wrapping_add_signed(delta)
}

/// Tracks line boundaries of a document.
///
/// All offsets are UTF-8 byte offsets. Line numbers exposed through [`Line`]
/// and [`DirtyLines`] are 1-based; the internal tables are 0-based.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offsets where each line starts, before the pending shift is
    /// applied. `line_starts[0] == 0` always.
    line_starts: Vec<usize>,
    /// The terminator of each line, parallel to `line_starts`.
    terminators: Vec<Terminator>,
    total_len: usize,
    pending: Option<PendingShift>,
    rebuild_needed: bool,
    /// Latest snapshot, read when a lazy rebuild runs.
    snapshot: TextSnapshot,
}

impl LineIndex {
    /// Creates a line index for the empty document (one empty line).
    pub fn new() -> Self {
        Self {
            line_starts: vec![0],
            terminators: vec![Terminator::None],
            total_len: 0,
            pending: None,
            rebuild_needed: false,
            snapshot: TextSnapshot::empty(),
        }
    }

    /// Creates a line index for `snapshot`.
    pub fn from_snapshot(snapshot: &TextSnapshot) -> Self {
        let mut index = Self::new();
        index.rebuild(snapshot);
        index
    }

    /// Rebuilds the index from `snapshot`.
    ///
    /// O(n) in the length of the text. Used on load and, lazily, after any
    /// edit the incremental path cannot patch.
    pub fn rebuild(&mut self, snapshot: &TextSnapshot) {
        self.snapshot = snapshot.clone();
        self.rebuild_from_snapshot();
    }

    fn rebuild_from_snapshot(&mut self) {
        let bytes = self.snapshot.text().as_bytes();
        self.line_starts.clear();
        self.terminators.clear();
        self.line_starts.push(0);

        let mut pos = 0;
        while let Some(found) = memchr2(b'\r', b'\n', &bytes[pos..]) {
            let at = pos + found;
            let terminator = match bytes[at] {
                b'\r' if bytes.get(at + 1) == Some(&b'\n') => Terminator::CrLf,
                b'\r' => Terminator::Cr,
                _ => Terminator::Lf,
            };
            self.terminators.push(terminator);
            pos = at + terminator.len();
            if pos < bytes.len() {
                self.line_starts.push(pos);
            }
        }
        // An unterminated final line (or the empty document)
        if self.terminators.len() < self.line_starts.len() {
            self.terminators.push(Terminator::None);
        }

        self.total_len = bytes.len();
        self.pending = None;
        self.rebuild_needed = false;
    }

    /// Performs a pending lazy rebuild, if any.
    pub fn ensure_current(&mut self) {
        if self.rebuild_needed {
            self.rebuild_from_snapshot();
        }
    }

    /// Returns true if the last edit could not be patched and the next query
    /// will rebuild the index.
    pub fn is_rebuild_needed(&self) -> bool {
        self.rebuild_needed
    }

    /// Total document length in bytes.
    ///
    /// Kept current by every edit, even while a rebuild is pending.
    pub fn total_len(&self) -> usize {
        self.total_len
    }

    /// Returns the number of lines. A document always has at least one.
    pub fn line_count(&mut self) -> usize {
        self.ensure_current();
        self.line_starts.len()
    }

    /// Returns the line with the given 1-based number.
    pub fn line(&mut self, number: usize) -> Option<Line> {
        self.ensure_current();
        let idx = number.checked_sub(1)?;
        (idx < self.line_starts.len()).then(|| self.line_at_index(idx))
    }

    /// Returns the line containing `offset`.
    ///
    /// `offset == total_len` belongs to the last line. Offsets past the end
    /// return `None`.
    pub fn line_containing(&mut self, offset: usize) -> Option<Line> {
        self.ensure_current();
        if offset > self.total_len {
            return None;
        }
        let idx = self.index_at_offset(offset);
        Some(self.line_at_index(idx))
    }

    /// Returns every line intersecting the byte range, clamped to the
    /// document. An empty range yields the line containing its start.
    pub fn lines_in(&mut self, range: Range<usize>) -> Vec<Line> {
        self.ensure_current();
        let start = range.start.min(self.total_len);
        let end = range.end.min(self.total_len).max(start);
        let first = self.index_at_offset(start);
        let last = if end > start {
            self.index_at_offset(end - 1)
        } else {
            first
        };
        (first..=last).map(|idx| self.line_at_index(idx)).collect()
    }

    /// Returns the 1-based lines covered by a viewport given as byte offsets.
    ///
    /// Both ends are clamped to the document, so the result is never empty.
    pub fn visible_line_range(
        &mut self,
        viewport_start: usize,
        viewport_end: usize,
    ) -> RangeInclusive<usize> {
        self.ensure_current();
        let (lo, hi) = if viewport_start <= viewport_end {
            (viewport_start, viewport_end)
        } else {
            (viewport_end, viewport_start)
        };
        let first = self.index_at_offset(lo.min(self.total_len));
        let last = self.index_at_offset(hi.min(self.total_len));
        (first + 1)..=(last + 1)
    }

    /// Returns the byte span covering the given 1-based lines, terminators
    /// included. Lines past the end are clamped; `None` if nothing remains.
    pub fn byte_span(&mut self, lines: RangeInclusive<usize>) -> Option<Range<usize>> {
        self.ensure_current();
        let count = self.line_starts.len();
        let first = (*lines.start()).max(1) - 1;
        let last = (*lines.end()).min(count).checked_sub(1)?;
        if first > last {
            return None;
        }
        Some(self.start_of(first)..self.end_of(last))
    }

    /// Updates the index after `text` was inserted at byte offset `at`.
    ///
    /// `snapshot` is the document after the insertion. Returns the lines
    /// the edit dirtied.
    pub fn did_insert(&mut self, at: usize, text: &str, snapshot: &TextSnapshot) -> DirtyLines {
        // Fold any earlier unpatched edit in against the pre-edit text
        self.ensure_current();
        self.snapshot = snapshot.clone();

        if text.is_empty() {
            return DirtyLines::None;
        }
        if at > self.total_len {
            self.rebuild_needed = true;
            return DirtyLines::FromLineToEnd(1);
        }

        let idx = self.index_at_offset(at);
        // Read before `total_len` moves: the last line ends at `total_len`
        let content_end = self.content_end_of(idx);
        self.total_len += text.len();

        let has_terminator = memchr2(b'\r', b'\n', text.as_bytes()).is_some();
        // Past the content end means inside a CRLF pair or after the final
        // terminator, where a new line would open.
        if has_terminator || at > content_end {
            self.rebuild_needed = true;
            return DirtyLines::FromLineToEnd(idx + 1);
        }

        self.shift_after(idx, text.len() as isize);
        DirtyLines::Single(idx + 1)
    }

    /// Updates the index after the bytes in `range` were deleted.
    ///
    /// `snapshot` is the document after the deletion. Returns the lines the
    /// edit dirtied.
    pub fn did_delete(&mut self, range: Range<usize>, snapshot: &TextSnapshot) -> DirtyLines {
        self.ensure_current();
        self.snapshot = snapshot.clone();

        if range.start >= range.end {
            return DirtyLines::None;
        }
        if range.end > self.total_len {
            self.rebuild_needed = true;
            return DirtyLines::FromLineToEnd(1);
        }

        let idx = self.index_at_offset(range.start);
        let removed = range.end - range.start;
        let line_start = self.start_of(idx);
        let content_end = self.content_end_of(idx);
        self.total_len -= removed;
        let clears_line = range.start == line_start && range.end == content_end;

        let crosses_terminator = range.end > content_end;
        // A lone CR followed by a now-adjacent LF becomes one CRLF terminator
        let joins_crlf = clears_line
            && idx > 0
            && self.terminators[idx - 1] == Terminator::Cr
            && self.terminators[idx] == Terminator::Lf;
        // Emptying the unterminated final line removes it entirely
        let drops_last_line = clears_line
            && idx > 0
            && idx + 1 == self.line_starts.len()
            && self.terminators[idx].is_none();

        if crosses_terminator || joins_crlf || drops_last_line {
            self.rebuild_needed = true;
            return DirtyLines::FromLineToEnd(idx + 1);
        }

        self.shift_after(idx, -(removed as isize));
        DirtyLines::Single(idx + 1)
    }

    // ==================== Internals ====================

    /// Records that every start after line `idx` moved by `delta`.
    ///
    /// Consecutive edits on the same line only touch the pending shift; the
    /// start table is rewritten once the user moves to another line.
    fn shift_after(&mut self, idx: usize, delta: isize) {
        match self.pending {
            Some(ref mut pending) if pending.after_line == idx => {
                pending.delta += delta;
            }
            _ => {
                self.flush_pending();
                self.pending = Some(PendingShift {
                    after_line: idx,
                    delta,
                });
            }
        }
    }

    fn flush_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            for start in self.line_starts.iter_mut().skip(pending.after_line + 1) {
                *start = shifted(*start, pending.delta);
            }
        }
    }

    fn start_of(&self, idx: usize) -> usize {
        let base = self.line_starts[idx];
        match self.pending {
            Some(pending) if idx > pending.after_line => shifted(base, pending.delta),
            _ => base,
        }
    }

    fn end_of(&self, idx: usize) -> usize {
        if idx + 1 < self.line_starts.len() {
            self.start_of(idx + 1)
        } else {
            self.total_len
        }
    }

    fn content_end_of(&self, idx: usize) -> usize {
        self.end_of(idx) - self.terminators[idx].len()
    }

    fn line_at_index(&self, idx: usize) -> Line {
        let start_offset = self.start_of(idx);
        let length = self.end_of(idx) - start_offset;
        Line {
            number: idx + 1,
            start_offset,
            length,
            content_length: length - self.terminators[idx].len(),
        }
    }

    /// 0-based index of the line containing `offset`, with the pending shift
    /// applied on the fly.
    fn index_at_offset(&self, offset: usize) -> usize {
        let starts = &self.line_starts;
        match self.pending {
            Some(pending) if pending.after_line + 1 < starts.len() => {
                let split = pending.after_line + 1;
                if offset < shifted(starts[split], pending.delta) {
                    starts[..split].partition_point(|&s| s <= offset) - 1
                } else {
                    let unshifted = shifted(offset, -pending.delta);
                    split + starts[split..].partition_point(|&s| s <= unshifted) - 1
                }
            }
            _ => starts.partition_point(|&s| s <= offset) - 1,
        }
    }

    /// Returns the line start offsets with any pending shift applied.
    #[cfg(any(debug_assertions, test))]
    pub fn line_starts(&mut self) -> Vec<usize> {
        self.ensure_current();
        (0..self.line_starts.len()).map(|idx| self.start_of(idx)).collect()
    }
}

impl Default for LineIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_for(text: &str) -> LineIndex {
        LineIndex::from_snapshot(&TextSnapshot::new(text))
    }

    /// Applies an insertion to both the snapshot and the index.
    fn insert(
        index: &mut LineIndex,
        snap: &TextSnapshot,
        at: usize,
        text: &str,
    ) -> (TextSnapshot, DirtyLines) {
        let next = snap.splice(at..at, text).unwrap();
        let dirty = index.did_insert(at, text, &next);
        (next, dirty)
    }

    fn delete(
        index: &mut LineIndex,
        snap: &TextSnapshot,
        range: Range<usize>,
    ) -> (TextSnapshot, DirtyLines) {
        let next = snap.splice(range.clone(), "").unwrap();
        let dirty = index.did_delete(range, &next);
        (next, dirty)
    }

    /// The index after incremental edits must match a fresh rebuild.
    fn assert_matches_rebuild(index: &mut LineIndex, snap: &TextSnapshot) {
        let mut fresh = LineIndex::from_snapshot(snap);
        assert_eq!(index.line_starts(), fresh.line_starts());
        assert_eq!(index.line_count(), fresh.line_count());
        for n in 1..=fresh.line_count() {
            assert_eq!(index.line(n), fresh.line(n), "line {n}");
        }
    }

    // ==================== Rebuild ====================

    #[test]
    fn test_new_is_one_empty_line() {
        let mut index = LineIndex::new();
        assert_eq!(index.line_count(), 1);
        assert_eq!(
            index.line(1),
            Some(Line {
                number: 1,
                start_offset: 0,
                length: 0,
                content_length: 0,
            })
        );
    }

    #[test]
    fn test_rebuild_trailing_terminator_opens_no_line() {
        let mut index = index_for("hello\nworld\n");
        assert_eq!(index.line_count(), 2);
        assert_eq!(index.line_starts(), vec![0, 6]);
        let last = index.line(2).unwrap();
        assert_eq!(last.length, 6);
        assert_eq!(last.content_length, 5);
        assert_eq!(last.end_offset(), index.total_len());
    }

    #[test]
    fn test_rebuild_unterminated_last_line() {
        let mut index = index_for("hello\nworld");
        assert_eq!(index.line_count(), 2);
        let last = index.line(2).unwrap();
        assert_eq!(last.length, 5);
        assert_eq!(last.content_length, 5);
    }

    #[test]
    fn test_rebuild_mixed_terminators() {
        // "a\r\n" "b\r" "c\n" "d"
        let mut index = index_for("a\r\nb\rc\nd");
        assert_eq!(index.line_starts(), vec![0, 3, 5, 7]);
        assert_eq!(index.line(1).unwrap().content_length, 1);
        assert_eq!(index.line(1).unwrap().length, 3);
        assert_eq!(index.line(2).unwrap().length, 2);
        assert_eq!(index.line(4).unwrap().length, 1);
    }

    #[test]
    fn test_rebuild_only_terminators() {
        let mut index = index_for("\n\n");
        assert_eq!(index.line_count(), 2);
        assert_eq!(index.line_starts(), vec![0, 1]);
    }

    // ==================== Lookup ====================

    #[test]
    fn test_line_containing() {
        let mut index = index_for("hello\nworld\nfoo");
        assert_eq!(index.line_containing(0).unwrap().number, 1);
        assert_eq!(index.line_containing(5).unwrap().number, 1); // '\n'
        assert_eq!(index.line_containing(6).unwrap().number, 2);
        assert_eq!(index.line_containing(12).unwrap().number, 3);
        assert_eq!(index.line_containing(15).unwrap().number, 3); // end of text
        assert_eq!(index.line_containing(16), None);
    }

    #[test]
    fn test_line_out_of_range() {
        let mut index = index_for("a\nb");
        assert_eq!(index.line(0), None);
        assert_eq!(index.line(3), None);
    }

    #[test]
    fn test_lines_in_and_byte_span() {
        let mut index = index_for("aa\nbb\ncc\ndd\n");
        let lines: Vec<usize> = index.lines_in(4..7).iter().map(|l| l.number).collect();
        assert_eq!(lines, vec![2, 3]);
        // Range ending exactly at a line start does not include that line
        let lines: Vec<usize> = index.lines_in(0..3).iter().map(|l| l.number).collect();
        assert_eq!(lines, vec![1]);
        assert_eq!(index.lines_in(100..200).len(), 1);

        assert_eq!(index.byte_span(2..=3), Some(3..9));
        assert_eq!(index.byte_span(3..=99), Some(6..12));
        assert_eq!(index.byte_span(5..=9), None);
    }

    #[test]
    fn test_visible_line_range_clamps() {
        let mut index = index_for("aa\nbb\ncc\ndd\n");
        assert_eq!(index.visible_line_range(3, 7), 2..=3);
        assert_eq!(index.visible_line_range(7, 3), 2..=3);
        assert_eq!(index.visible_line_range(0, 10_000), 1..=4);
    }

    // ==================== Incremental patching ====================

    #[test]
    fn test_insert_without_terminator_patches_one_line() {
        let snap = TextSnapshot::new("abc\ndef\n");
        let mut index = LineIndex::from_snapshot(&snap);

        let (_, dirty) = insert(&mut index, &snap, 1, "X");
        assert_eq!(dirty, DirtyLines::Single(1));
        assert!(!index.is_rebuild_needed());

        let first = index.line(1).unwrap();
        assert_eq!(first.length, 5);
        let second = index.line(2).unwrap();
        assert_eq!(second.start_offset, 5);
        assert_eq!(second.length, 4);
    }

    #[test]
    fn test_insert_newline_defers_rebuild() {
        let snap = TextSnapshot::new("abc\ndef\n");
        let mut index = LineIndex::from_snapshot(&snap);
        let (snap, _) = insert(&mut index, &snap, 1, "X");

        let (_, dirty) = insert(&mut index, &snap, 1, "\n");
        assert_eq!(dirty, DirtyLines::FromLineToEnd(1));
        assert!(index.is_rebuild_needed());

        // The lookup performs the rebuild
        assert_eq!(index.line_containing(0).unwrap().number, 1);
        assert!(!index.is_rebuild_needed());
        assert_eq!(index.line_starts(), vec![0, 2, 6]);
    }

    #[test]
    fn test_same_line_typing_accumulates_pending_shift() {
        let mut snap = TextSnapshot::new("one\ntwo\nthree\n");
        let mut index = LineIndex::from_snapshot(&snap);
        for i in 0..10 {
            let (next, dirty) = insert(&mut index, &snap, 5 + i, "x");
            assert_eq!(dirty, DirtyLines::Single(2));
            snap = next;
        }
        assert!(index.pending.is_some());
        assert_eq!(index.line_containing(18).unwrap().number, 3);
        assert_matches_rebuild(&mut index, &snap);
    }

    #[test]
    fn test_edits_across_lines_flush_pending() {
        let snap = TextSnapshot::new("aa\nbb\ncc\ndd");
        let mut index = LineIndex::from_snapshot(&snap);
        let (snap, _) = insert(&mut index, &snap, 4, "XYZ");
        let (snap, _) = insert(&mut index, &snap, 0, "_");
        let (snap, dirty) = delete(&mut index, &snap, 11..12);
        assert_eq!(dirty, DirtyLines::Single(3));
        assert_matches_rebuild(&mut index, &snap);
    }

    #[test]
    fn test_delete_within_line() {
        let snap = TextSnapshot::new("hello\nworld\n");
        let mut index = LineIndex::from_snapshot(&snap);
        let (snap, dirty) = delete(&mut index, &snap, 1..4);
        assert_eq!(dirty, DirtyLines::Single(1));
        assert!(!index.is_rebuild_needed());
        assert_eq!(index.line(2).unwrap().start_offset, 3);
        assert_matches_rebuild(&mut index, &snap);
    }

    #[test]
    fn test_delete_across_terminator_rebuilds() {
        let snap = TextSnapshot::new("hello\nworld\n");
        let mut index = LineIndex::from_snapshot(&snap);
        let (snap, dirty) = delete(&mut index, &snap, 4..7);
        assert_eq!(dirty, DirtyLines::FromLineToEnd(1));
        assert!(index.is_rebuild_needed());
        assert_eq!(index.line_count(), 1);
        assert_matches_rebuild(&mut index, &snap);
    }

    #[test]
    fn test_insert_inside_crlf_rebuilds() {
        let snap = TextSnapshot::new("ab\r\ncd");
        let mut index = LineIndex::from_snapshot(&snap);
        let (snap, dirty) = insert(&mut index, &snap, 3, "x");
        assert_eq!(dirty, DirtyLines::FromLineToEnd(1));
        // "ab\r" "x\n" "cd"
        assert_eq!(index.line_count(), 3);
        assert_matches_rebuild(&mut index, &snap);
    }

    #[test]
    fn test_delete_joining_cr_and_lf_rebuilds() {
        // Deleting "x" leaves "ab\r\ncd": the CR and LF now form one terminator
        let snap = TextSnapshot::new("ab\rx\ncd");
        let mut index = LineIndex::from_snapshot(&snap);
        assert_eq!(index.line_count(), 3);
        let (snap, dirty) = delete(&mut index, &snap, 3..4);
        assert_eq!(dirty, DirtyLines::FromLineToEnd(2));
        assert_eq!(index.line_count(), 2);
        assert_matches_rebuild(&mut index, &snap);
    }

    #[test]
    fn test_text_after_trailing_terminator_opens_line() {
        let snap = TextSnapshot::new("abc\n");
        let mut index = LineIndex::from_snapshot(&snap);
        let (snap, dirty) = insert(&mut index, &snap, 4, "d");
        assert_eq!(dirty, DirtyLines::FromLineToEnd(1));
        assert_eq!(index.line_count(), 2);
        assert_matches_rebuild(&mut index, &snap);

        // And emptying that line removes it again
        let (snap, dirty) = delete(&mut index, &snap, 4..5);
        assert_eq!(dirty, DirtyLines::FromLineToEnd(2));
        assert_eq!(index.line_count(), 1);
        assert_matches_rebuild(&mut index, &snap);
    }

    #[test]
    fn test_insert_inside_final_crlf_rebuilds() {
        let snap = TextSnapshot::new("ab\r\n");
        let mut index = LineIndex::from_snapshot(&snap);
        let (snap, dirty) = insert(&mut index, &snap, 3, "x");
        assert_eq!(dirty, DirtyLines::FromLineToEnd(1));
        // "ab\r" "x\n"
        assert_eq!(index.line_count(), 2);
        assert_matches_rebuild(&mut index, &snap);
    }

    #[test]
    fn test_typing_at_end_of_terminated_file() {
        let snap = TextSnapshot::new("fn a() {}\n");
        let mut index = LineIndex::from_snapshot(&snap);
        let (snap, dirty) = insert(&mut index, &snap, 10, "f");
        assert_eq!(dirty, DirtyLines::FromLineToEnd(1));
        let line = index.line(2).unwrap();
        assert_eq!((line.start_offset, line.length, line.content_length), (10, 1, 1));

        // The new last line is unterminated, so further typing patches in place
        let (snap, dirty) = insert(&mut index, &snap, 11, "n");
        assert_eq!(dirty, DirtyLines::Single(2));
        assert_eq!(index.line(1).unwrap().content_length, 9);
        assert_matches_rebuild(&mut index, &snap);
    }

    #[test]
    fn test_delete_on_last_line_patches_in_place() {
        let snap = TextSnapshot::new("abc\n");
        let mut index = LineIndex::from_snapshot(&snap);
        let (snap, dirty) = delete(&mut index, &snap, 1..3);
        assert_eq!(dirty, DirtyLines::Single(1));
        assert!(!index.is_rebuild_needed());
        assert_matches_rebuild(&mut index, &snap);
    }

    #[test]
    fn test_consecutive_unpatched_edits() {
        let snap = TextSnapshot::new("a\nb\n");
        let mut index = LineIndex::from_snapshot(&snap);
        let (snap, _) = insert(&mut index, &snap, 0, "\n");
        // No query in between: the second edit folds the first rebuild in
        let (snap, dirty) = insert(&mut index, &snap, 3, "\n\n");
        // Offset 3 is the 'b' of "\na\nb\n"
        assert_eq!(dirty, DirtyLines::FromLineToEnd(3));
        assert_matches_rebuild(&mut index, &snap);
        assert_eq!(index.line_count(), 5);
    }

    #[test]
    fn test_empty_edits_are_noops() {
        let snap = TextSnapshot::new("abc");
        let mut index = LineIndex::from_snapshot(&snap);
        assert_eq!(index.did_insert(1, "", &snap), DirtyLines::None);
        assert_eq!(index.did_delete(2..2, &snap), DirtyLines::None);
        assert!(!index.is_rebuild_needed());
    }

    #[test]
    fn test_out_of_range_edit_forces_rebuild() {
        let snap = TextSnapshot::new("abc");
        let mut index = LineIndex::from_snapshot(&snap);
        let next = TextSnapshot::new("abc\nxyz");
        assert_eq!(index.did_insert(10, "\nxyz", &next), DirtyLines::FromLineToEnd(1));
        assert_eq!(index.line_count(), 2);
        assert_eq!(index.total_len(), 7);
    }
}
