// Chunk: docs/chunks/viewport_scheduler - Viewport-driven highlight scheduling

//! Deciding what to highlight.
//!
//! The scheduler turns viewport and edit notifications into line windows,
//! narrows a window to the lines that actually need work, and records the
//! results: ranges go into the [`HighlightCache`], lines are marked fresh in
//! the [`HighlightTracker`]. It never runs the parse engine itself; the
//! sessions do, synchronously or on a worker.

use std::ops::{Range, RangeInclusive};

use glint_buffer::{DirtyLines, LineIndex, TextSnapshot};
use glint_syntax::HighlightRange;
use tracing::trace;

use crate::cache::{CacheKey, HighlightCache};
use crate::config::HighlightConfig;
use crate::tracker::HighlightTracker;
use crate::update::HighlightUpdate;

/// A line window and the bytes it spans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightTarget {
    pub lines: RangeInclusive<usize>,
    pub span: Range<usize>,
}

/// Tracks fresh lines and cached ranges around the viewport.
#[derive(Debug)]
pub struct ViewportScheduler {
    margin: usize,
    edit_context: usize,
    tracker: HighlightTracker,
    cache: HighlightCache,
    /// Last viewport window, margin included.
    viewport: Option<RangeInclusive<usize>>,
}

impl ViewportScheduler {
    pub fn new(config: &HighlightConfig) -> Self {
        Self {
            margin: config.viewport_margin_lines,
            edit_context: config.edit_context_lines,
            tracker: HighlightTracker::new(),
            cache: HighlightCache::new(config.cache_capacity(), config.char_encoding),
            viewport: None,
        }
    }

    pub fn tracker(&self) -> &HighlightTracker {
        &self.tracker
    }

    pub fn cache(&self) -> &HighlightCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut HighlightCache {
        &mut self.cache
    }

    /// The last viewport window, margin included.
    pub fn last_viewport(&self) -> Option<RangeInclusive<usize>> {
        self.viewport.clone()
    }

    // ==================== Windows ====================

    /// Returns the lines of the viewport `[start, end]` (byte offsets)
    /// widened by the margin, and remembers them as the current viewport.
    pub fn viewport_window(
        &mut self,
        index: &mut LineIndex,
        start: usize,
        end: usize,
    ) -> RangeInclusive<usize> {
        let visible = index.visible_line_range(start, end);
        let window = self.widen(index, visible, self.margin);
        self.viewport = Some(window.clone());
        window
    }

    /// Returns the lines touched by `written` (bytes of the current
    /// snapshot) widened by the edit context.
    pub fn edit_window(&self, index: &mut LineIndex, written: Range<usize>) -> RangeInclusive<usize> {
        let lines = index.lines_in(written);
        let first = lines.first().map_or(1, |l| l.number);
        let last = lines.last().map_or(first, |l| l.number);
        self.widen(index, first..=last, self.edit_context)
    }

    fn widen(
        &self,
        index: &mut LineIndex,
        lines: RangeInclusive<usize>,
        by: usize,
    ) -> RangeInclusive<usize> {
        let count = index.line_count();
        let first = lines.start().saturating_sub(by).max(1);
        let last = lines.end().saturating_add(by).min(count);
        first..=last.max(first)
    }

    // ==================== Planning ====================

    /// Returns the whole window as a target.
    pub fn target(&self, index: &mut LineIndex, lines: RangeInclusive<usize>) -> Option<HighlightTarget> {
        let span = index.byte_span(lines.clone())?;
        Some(HighlightTarget { lines, span })
    }

    /// Returns the smallest target covering every stale line of `window`,
    /// or `None` if the window is fresh.
    pub fn stale_target(
        &self,
        index: &mut LineIndex,
        window: RangeInclusive<usize>,
    ) -> Option<HighlightTarget> {
        let stale = self.tracker.stale_span(window)?;
        self.target(index, stale)
    }

    // ==================== Bookkeeping ====================

    /// Records an edit's dirty lines.
    pub fn record_edit(&mut self, dirty: &DirtyLines) {
        self.tracker.record_edit(dirty);
    }

    /// Forgets every line and every cached range.
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.cache.clear();
    }

    /// Marks the lines of `changed` (bytes of the current snapshot) stale.
    pub fn invalidate_bytes(&mut self, index: &mut LineIndex, changed: &[Range<usize>]) {
        for range in changed {
            let lines = index.lines_in(range.clone());
            if let (Some(first), Some(last)) = (lines.first(), lines.last()) {
                self.tracker.invalidate(first.number..=last.number);
            }
        }
    }

    /// Serves `target` from the cache, marking its lines fresh.
    pub fn cached(&mut self, key: &CacheKey, target: &HighlightTarget) -> Option<HighlightUpdate> {
        let ranges = self.cache.lookup(key, &target.span)?;
        self.tracker.mark_fresh(target.lines.clone());
        trace!(language = key.language, lines = ?target.lines, "served from cache");
        Some(HighlightUpdate {
            fingerprint: key.fingerprint,
            lines: target.lines.clone(),
            byte_span: target.span.clone(),
            ranges,
            from_cache: true,
        })
    }

    /// Records fresh ranges for `target` of `snapshot`.
    pub fn apply(
        &mut self,
        key: CacheKey,
        snapshot: &TextSnapshot,
        target: HighlightTarget,
        ranges: Vec<HighlightRange>,
    ) -> HighlightUpdate {
        self.cache.store(key, snapshot, target.span.clone(), ranges.clone());
        self.tracker.mark_fresh(target.lines.clone());
        trace!(
            language = key.language,
            lines = ?target.lines,
            ranges = ranges.len(),
            "applied highlights"
        );
        HighlightUpdate {
            fingerprint: key.fingerprint,
            lines: target.lines,
            byte_span: target.span,
            ranges,
            from_cache: false,
        }
    }

    /// Drops tracker and cache entries outside `window`.
    pub fn prune(&mut self, index: &mut LineIndex, key: &CacheKey, window: RangeInclusive<usize>) {
        self.tracker.retain(window.clone());
        if let Some(keep) = index.byte_span(window) {
            self.cache.prune(key, &keep);
        }
    }
}
