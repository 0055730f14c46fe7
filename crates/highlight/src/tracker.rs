// Chunk: docs/chunks/viewport_scheduler - Fresh/stale line tracking

//! Which lines carry up-to-date highlighting.
//!
//! The tracker stamps each highlighted line with the document version it
//! was highlighted at. A line is fresh iff its stamp equals the current
//! document version; every other line, stamped or not, is dirty. Edits bump
//! the version and carry the stamps of untouched lines forward, so only the
//! lines an edit dirtied go stale.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use glint_buffer::DirtyLines;

/// Per-line freshness bookkeeping. Line numbers are 1-based.
#[derive(Debug, Default)]
pub struct HighlightTracker {
    document_version: u64,
    highlighted: BTreeMap<usize, u64>,
}

impl HighlightTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document_version(&self) -> u64 {
        self.document_version
    }

    /// Returns true if `line` was highlighted at the current version.
    pub fn is_fresh(&self, line: usize) -> bool {
        self.highlighted.get(&line) == Some(&self.document_version)
    }

    /// Number of fresh lines.
    pub fn fresh_count(&self) -> usize {
        self.highlighted
            .values()
            .filter(|v| **v == self.document_version)
            .count()
    }

    /// Records an edit: lines in `dirty` go stale, every other fresh line
    /// stays fresh under the new version.
    pub fn record_edit(&mut self, dirty: &DirtyLines) {
        // FromLineToEnd reaches usize::MAX: after a line-count change no
        // later line number can be trusted.
        let Some(lines) = dirty.to_line_range(usize::MAX) else {
            return;
        };
        let old = self.document_version;
        self.document_version += 1;

        self.highlighted.retain(|_, v| *v == old);
        self.invalidate(lines);
        let new = self.document_version;
        for v in self.highlighted.values_mut() {
            *v = new;
        }
    }

    /// Marks every line stale (document load, language change).
    pub fn reset(&mut self) {
        self.document_version += 1;
        self.highlighted.clear();
    }

    /// Marks `lines` as highlighted at the current version.
    pub fn mark_fresh(&mut self, lines: RangeInclusive<usize>) {
        let version = self.document_version;
        for line in lines {
            self.highlighted.insert(line, version);
        }
    }

    /// Marks `lines` stale without changing the version.
    pub fn invalidate(&mut self, lines: RangeInclusive<usize>) {
        let (start, end) = lines.into_inner();
        if start > end {
            return;
        }
        let tail = self.highlighted.split_off(&start);
        self.highlighted
            .extend(tail.into_iter().filter(|(line, _)| *line > end));
    }

    /// Forgets every line outside `keep`.
    pub fn retain(&mut self, keep: RangeInclusive<usize>) {
        self.highlighted.retain(|line, _| keep.contains(line));
    }

    /// Returns the smallest line range covering every stale line in
    /// `lines`, or `None` if all of them are fresh.
    pub fn stale_span(&self, lines: RangeInclusive<usize>) -> Option<RangeInclusive<usize>> {
        let first = lines.clone().find(|line| !self.is_fresh(*line))?;
        let last = lines.rev().find(|line| !self.is_fresh(*line))?;
        Some(first..=last)
    }
}
