// Chunk: docs/chunks/viewport_scheduler - Fingerprint-keyed highlight cache
// Chunk: docs/chunks/char_projection - Lazily built character projection

//! Highlight ranges cached by content.
//!
//! A slot belongs to one (content fingerprint, language) pair and collects
//! the ranges of every byte span highlighted for that content so far. Slots
//! are kept in LRU order, so returning to recent content (undo, redo) finds
//! its ranges still in place. The character projection of a slot is built
//! at most once, on first request.

use std::cell::OnceCell;
use std::num::NonZeroUsize;
use std::ops::Range;
use std::sync::Arc;

use glint_buffer::{ByteCharMap, CharEncoding, Fingerprint, TextSnapshot};
use glint_syntax::HighlightRange;
use lru::LruCache;

/// Identifies the content a slot was computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub fingerprint: Fingerprint,
    pub language: &'static str,
}

impl CacheKey {
    pub fn new(fingerprint: Fingerprint, language: &'static str) -> Self {
        Self {
            fingerprint,
            language,
        }
    }
}

struct CacheSlot {
    snapshot: TextSnapshot,
    /// Sorted, disjoint, non-adjacent byte spans already highlighted.
    covered: Vec<Range<usize>>,
    /// Sorted, non-overlapping ranges inside `covered`.
    ranges: Vec<HighlightRange>,
    char_map: OnceCell<Arc<ByteCharMap>>,
}

impl CacheSlot {
    fn new(snapshot: &TextSnapshot) -> Self {
        Self {
            snapshot: snapshot.clone(),
            covered: Vec::new(),
            ranges: Vec::new(),
            char_map: OnceCell::new(),
        }
    }

    fn covers(&self, span: &Range<usize>) -> bool {
        span.is_empty()
            || self
                .covered
                .iter()
                .any(|c| c.start <= span.start && span.end <= c.end)
    }

    fn ranges_in(&self, span: &Range<usize>) -> Vec<HighlightRange> {
        let first = self.ranges.partition_point(|r| r.end_byte <= span.start);
        self.ranges[first..]
            .iter()
            .take_while(|r| r.start_byte < span.end)
            .filter_map(|r| clip(*r, span))
            .collect()
    }

    fn insert(&mut self, span: Range<usize>, ranges: Vec<HighlightRange>) {
        let mut kept: Vec<HighlightRange> = Vec::with_capacity(self.ranges.len() + ranges.len());
        for range in self.ranges.drain(..) {
            if !range.intersects(&span) {
                kept.push(range);
                continue;
            }
            if range.start_byte < span.start {
                kept.push(HighlightRange::new(range.start_byte, span.start, range.category));
            }
            if range.end_byte > span.end {
                kept.push(HighlightRange::new(span.end, range.end_byte, range.category));
            }
        }
        kept.extend(ranges.into_iter().filter_map(|r| clip(r, &span)));
        kept.sort_by_key(|r| r.start_byte);
        self.ranges = kept;

        self.covered.push(span);
        self.covered = merge_spans(std::mem::take(&mut self.covered));
    }

    fn retain(&mut self, keep: &Range<usize>) {
        self.covered = self
            .covered
            .iter()
            .filter_map(|c| {
                let clipped = c.start.max(keep.start)..c.end.min(keep.end);
                (!clipped.is_empty()).then_some(clipped)
            })
            .collect();
        self.ranges = self.ranges.iter().filter_map(|r| clip(*r, keep)).collect();
    }
}

fn clip(range: HighlightRange, span: &Range<usize>) -> Option<HighlightRange> {
    let start = range.start_byte.max(span.start);
    let end = range.end_byte.min(span.end);
    (start < end).then(|| HighlightRange::new(start, end, range.category))
}

fn merge_spans(mut spans: Vec<Range<usize>>) -> Vec<Range<usize>> {
    spans.retain(|s| !s.is_empty());
    spans.sort_by_key(|s| s.start);
    let mut merged: Vec<Range<usize>> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(last) if span.start <= last.end => last.end = last.end.max(span.end),
            _ => merged.push(span),
        }
    }
    merged
}

/// LRU store of highlight ranges keyed by content.
pub struct HighlightCache {
    slots: LruCache<CacheKey, CacheSlot>,
    encoding: CharEncoding,
}

impl HighlightCache {
    pub fn new(capacity: NonZeroUsize, encoding: CharEncoding) -> Self {
        Self {
            slots: LruCache::new(capacity),
            encoding,
        }
    }

    pub fn encoding(&self) -> CharEncoding {
        self.encoding
    }

    /// Number of content versions held.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Returns true if `span` of `key`'s content has been highlighted.
    pub fn covers(&self, key: &CacheKey, span: &Range<usize>) -> bool {
        self.slots.peek(key).is_some_and(|slot| slot.covers(span))
    }

    /// Returns the ranges of `span`, clipped to it, if the whole span has
    /// been highlighted for `key`'s content.
    pub fn lookup(&mut self, key: &CacheKey, span: &Range<usize>) -> Option<Vec<HighlightRange>> {
        let slot = self.slots.get(key)?;
        slot.covers(span).then(|| slot.ranges_in(span))
    }

    /// Records the ranges computed for `span` of `snapshot`.
    ///
    /// Anything previously stored for bytes inside `span` is replaced.
    pub fn store(
        &mut self,
        key: CacheKey,
        snapshot: &TextSnapshot,
        span: Range<usize>,
        ranges: Vec<HighlightRange>,
    ) {
        self.slots
            .get_or_insert_mut(key, || CacheSlot::new(snapshot))
            .insert(span, ranges);
    }

    /// Returns the character projection of `key`'s content, building it on
    /// first use.
    pub fn char_map(&mut self, key: &CacheKey) -> Option<Arc<ByteCharMap>> {
        let encoding = self.encoding;
        let slot = self.slots.get(key)?;
        let map = slot
            .char_map
            .get_or_init(|| Arc::new(ByteCharMap::new(slot.snapshot.text(), encoding)));
        Some(map.clone())
    }

    /// Installs a projection built elsewhere. A map of another encoding, or
    /// for a slot that already has one, is ignored.
    pub fn offer_char_map(&mut self, key: &CacheKey, map: Arc<ByteCharMap>) {
        if map.encoding() != self.encoding {
            return;
        }
        if let Some(slot) = self.slots.peek_mut(key) {
            let _ = slot.char_map.set(map);
        }
    }

    /// Returns true if `key`'s projection has been built.
    pub fn has_char_map(&self, key: &CacheKey) -> bool {
        self.slots
            .peek(key)
            .is_some_and(|slot| slot.char_map.get().is_some())
    }

    /// Drops everything `key` holds outside `keep`.
    pub fn prune(&mut self, key: &CacheKey, keep: &Range<usize>) {
        if let Some(slot) = self.slots.peek_mut(key) {
            slot.retain(keep);
        }
    }

    /// Byte spans highlighted for `key`'s content.
    pub fn covered_spans(&self, key: &CacheKey) -> Vec<Range<usize>> {
        self.slots
            .peek(key)
            .map(|slot| slot.covered.clone())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for HighlightCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HighlightCache")
            .field("slots", &self.slots.len())
            .field("capacity", &self.slots.cap())
            .field("encoding", &self.encoding)
            .finish()
    }
}
