// Chunk: docs/chunks/viewport_scheduler - Synchronous highlight session

//! Highlighting one document on the calling thread.
//!
//! [`HighlightSession`] owns the document snapshot, its line index, the
//! parse engine and the scheduler, and answers every notification with the
//! ranges that changed. Parsing runs inline; see
//! [`BackgroundSession`](crate::BackgroundSession) for the worker-thread
//! variant.

use std::ops::Range;
use std::sync::Arc;

use glint_buffer::{LineIndex, TextSnapshot};
use glint_syntax::{EngineOptions, LanguageRegistry, ParseEngine, SyntaxError};
use tracing::{debug, warn};

use crate::cache::CacheKey;
use crate::config::HighlightConfig;
use crate::document::DocumentState;
use crate::scheduler::{HighlightTarget, ViewportScheduler};
use crate::update::{CharRange, HighlightEvent, HighlightUpdate};

/// Cache language key for documents without a grammar.
pub(crate) const PLAIN_TEXT: &str = "plain";

/// Builds the engine for `language`, falling back to the unsupported state
/// when its grammar cannot be loaded.
pub(crate) fn build_engine(
    registry: &Arc<LanguageRegistry>,
    language: &str,
    options: EngineOptions,
) -> ParseEngine {
    match ParseEngine::new(registry.clone(), language, options) {
        Ok(engine) => engine,
        Err(e) => {
            warn!(language, error = %e, "grammar unusable, highlighting disabled");
            ParseEngine::unsupported(registry.clone(), options)
        }
    }
}

/// Canonical cache name for `language`.
pub(crate) fn language_key(registry: &LanguageRegistry, language: &str) -> &'static str {
    registry
        .config_for_language_name(language)
        .map_or(PLAIN_TEXT, |config| config.name)
}

/// Synchronous highlighting for one document.
pub struct HighlightSession {
    registry: Arc<LanguageRegistry>,
    config: HighlightConfig,
    doc: DocumentState,
    engine: ParseEngine,
    scheduler: ViewportScheduler,
    events: Vec<HighlightEvent>,
}

impl HighlightSession {
    /// Creates a session for an empty document in `language`.
    pub fn new(registry: Arc<LanguageRegistry>, language: &str, config: HighlightConfig) -> Self {
        let engine = build_engine(&registry, language, config.engine_options());
        let scheduler = ViewportScheduler::new(&config);
        Self {
            registry,
            config,
            doc: DocumentState::new(),
            engine,
            scheduler,
            events: Vec::new(),
        }
    }

    // ==================== Accessors ====================

    /// Canonical name of the document's language, `None` if unsupported.
    pub fn language(&self) -> Option<&'static str> {
        self.engine.language_name()
    }

    pub fn config(&self) -> &HighlightConfig {
        &self.config
    }

    pub fn snapshot(&self) -> &TextSnapshot {
        &self.doc.snapshot
    }

    pub fn line_index(&mut self) -> &mut LineIndex {
        &mut self.doc.index
    }

    pub fn scheduler(&self) -> &ViewportScheduler {
        &self.scheduler
    }

    pub fn engine(&self) -> &ParseEngine {
        &self.engine
    }

    /// Returns true once a parse has timed out.
    pub fn is_disabled(&self) -> bool {
        self.engine.is_disabled()
    }

    fn cache_key(&self) -> CacheKey {
        CacheKey::new(
            self.doc.snapshot.fingerprint(),
            self.engine.language_name().unwrap_or(PLAIN_TEXT),
        )
    }

    // ==================== Notifications ====================

    /// Replaces the document. Every line goes stale and the tree is rebuilt.
    pub fn document_did_load(&mut self, text: &str) {
        self.doc.load(text);
        self.engine.reset();
        self.scheduler.reset();
        self.sync_engine();
    }

    /// Switches grammars. Cached ranges are dropped and the document is
    /// re-parsed; a session disabled by a timeout starts over.
    pub fn language_changed(&mut self, language: &str) {
        self.engine = build_engine(&self.registry, language, self.config.engine_options());
        self.doc.take_edits();
        self.scheduler.reset();
        self.sync_engine();
    }

    /// Records an insertion and re-highlights the lines around it.
    pub fn text_did_insert(&mut self, at: usize, text: &str) -> Option<HighlightUpdate> {
        let Some(applied) = self.doc.insert(at, text) else {
            debug!(at, len = text.len(), "insertion out of range ignored");
            return None;
        };
        self.after_edit(applied)
    }

    /// Records a deletion and re-highlights the lines around it.
    pub fn text_did_delete(&mut self, range: Range<usize>) -> Option<HighlightUpdate> {
        let Some(applied) = self.doc.delete(range.clone()) else {
            debug!(?range, "deletion out of range ignored");
            return None;
        };
        self.after_edit(applied)
    }

    fn after_edit(&mut self, applied: crate::document::AppliedEdit) -> Option<HighlightUpdate> {
        if applied.dirty.is_none() {
            return None;
        }
        self.scheduler.record_edit(&applied.dirty);
        if self.engine.is_disabled() {
            self.doc.take_edits();
            return None;
        }
        self.highlight_incrementally(applied.written)
    }

    /// Highlights the stale lines of the viewport `[start, end]` (byte
    /// offsets) plus the margin, then forgets lines far from it.
    ///
    /// Returns `None` when the whole window is already fresh.
    pub fn viewport_changed(&mut self, start: usize, end: usize) -> Option<HighlightUpdate> {
        let window = self
            .scheduler
            .viewport_window(&mut self.doc.index, start, end);
        if !self.sync_engine() {
            return None;
        }
        let update = self
            .scheduler
            .stale_target(&mut self.doc.index, window.clone())
            .and_then(|target| self.run(target));

        let key = self.cache_key();
        self.scheduler.prune(&mut self.doc.index, &key, window);
        update
    }

    /// Re-highlights the lines around `written` (bytes of the current
    /// snapshot), fresh or not.
    pub fn highlight_incrementally(&mut self, written: Range<usize>) -> Option<HighlightUpdate> {
        let window = self.scheduler.edit_window(&mut self.doc.index, written);
        if !self.sync_engine() {
            return None;
        }
        let target = self.scheduler.target(&mut self.doc.index, window)?;
        self.run(target)
    }

    /// Projects an update's ranges into the configured character space.
    ///
    /// The projection is built once per content version, on first request.
    pub fn char_ranges(&mut self, update: &HighlightUpdate) -> Option<Vec<CharRange>> {
        let key = CacheKey::new(update.fingerprint, self.engine.language_name().unwrap_or(PLAIN_TEXT));
        let map = self.scheduler.cache_mut().char_map(&key)?;
        Some(update.char_ranges(&map))
    }

    /// Drains one-time signals ([`HighlightEvent::TimedOut`]).
    pub fn poll(&mut self) -> Vec<HighlightEvent> {
        std::mem::take(&mut self.events)
    }

    // ==================== Engine ====================

    /// Brings the tree up to date and invalidates the lines whose syntax
    /// changed. Returns false if highlighting is off.
    fn sync_engine(&mut self) -> bool {
        if self.engine.is_disabled() {
            return false;
        }
        let edits = self.doc.take_edits();
        match self.engine.sync(&self.doc.snapshot, &edits) {
            Ok(outcome) => {
                self.scheduler
                    .invalidate_bytes(&mut self.doc.index, &outcome.changed);
                true
            }
            Err(e) => {
                self.fail(e);
                false
            }
        }
    }

    fn run(&mut self, target: HighlightTarget) -> Option<HighlightUpdate> {
        let key = self.cache_key();
        if let Some(update) = self.scheduler.cached(&key, &target) {
            return Some(update);
        }
        match self
            .engine
            .highlights_in(&self.doc.snapshot, target.span.clone())
        {
            Ok(ranges) => Some(self.scheduler.apply(key, &self.doc.snapshot, target, ranges)),
            Err(e) => {
                self.fail(e);
                None
            }
        }
    }

    fn fail(&mut self, error: SyntaxError) {
        match error {
            SyntaxError::Timeout => self.events.push(HighlightEvent::TimedOut),
            other => debug!(error = %other, "highlighting skipped"),
        }
    }
}

impl std::fmt::Debug for HighlightSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HighlightSession")
            .field("engine", &self.engine)
            .field("snapshot", &self.doc.snapshot)
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_syntax::{HighlightRange, TokenCategory};

    fn session(language: &str) -> HighlightSession {
        HighlightSession::new(
            Arc::new(LanguageRegistry::new()),
            language,
            HighlightConfig::default(),
        )
    }

    fn rust_lines(count: usize) -> String {
        (1..=count).map(|n| format!("let v{} = {};\n", n, n)).collect()
    }

    fn offset_of_line(session: &mut HighlightSession, line: usize) -> usize {
        session.line_index().line(line).unwrap().start_offset
    }

    #[test]
    fn test_viewport_highlights_window_once() {
        let mut session = session("rust");
        session.document_did_load(&rust_lines(300));

        let start = offset_of_line(&mut session, 100);
        let end = offset_of_line(&mut session, 120);
        let update = session.viewport_changed(start, end).unwrap();
        assert_eq!(update.lines, 50..=170);
        assert!(update
            .ranges
            .iter()
            .any(|r| r.category == TokenCategory::Keyword));

        // Nothing stale the second time
        assert_eq!(session.viewport_changed(start, end), None);
    }

    #[test]
    fn test_edit_rehighlights_context_lines() {
        let mut session = session("rust");
        session.document_did_load(&rust_lines(50));

        let at = offset_of_line(&mut session, 20) + 4;
        let update = session.text_did_insert(at, "x").unwrap();
        assert_eq!(update.lines, 18..=22);
        assert_eq!(session.snapshot().text().lines().nth(19), Some("let xv20 = 20;"));
    }

    #[test]
    fn test_edit_invalidates_lines_changed_far_away() {
        let mut session = session("rust");
        session.document_did_load(&format!("{}// */\n", rust_lines(40)));
        session.viewport_changed(0, session.snapshot().len());

        // Opening a block comment recolors everything down to its end
        let at = offset_of_line(&mut session, 5);
        let update = session.text_did_insert(at, "/*").unwrap();
        assert_eq!(update.lines, 3..=7);
        assert!(!session.scheduler().tracker().is_fresh(30));
        assert!(session.scheduler().tracker().is_fresh(2));

        let update = session.viewport_changed(0, session.snapshot().len()).unwrap();
        assert_eq!(update.lines, 8..=41);
        let last = update.ranges.last().unwrap();
        assert_eq!(last.category, TokenCategory::Comment);
    }

    #[test]
    fn test_undo_is_served_from_cache() {
        let mut session = session("rust");
        session.document_did_load("let a = 1;\n");
        session.viewport_changed(0, 0).unwrap();

        session.text_did_insert(4, "b").unwrap();
        let undo = session.text_did_delete(4..5).unwrap();
        assert!(undo.from_cache);
        assert_eq!(undo.ranges[0], HighlightRange::new(0, 3, TokenCategory::Keyword));
    }

    #[test]
    fn test_unsupported_language_yields_empty_updates() {
        let mut session = session("cobol");
        session.document_did_load("IDENTIFICATION DIVISION.\n");
        assert_eq!(session.language(), None);
        let update = session.viewport_changed(0, 5).unwrap();
        assert!(update.ranges.is_empty());
    }

    #[test]
    fn test_language_change_rehighlights() {
        let mut session = session("cobol");
        session.document_did_load("fn main() {}\n");
        session.viewport_changed(0, 0);

        session.language_changed("rust");
        assert_eq!(session.language(), Some("rust"));
        let update = session.viewport_changed(0, 0).unwrap();
        assert_eq!(update.ranges[0].category, TokenCategory::Keyword);
    }

    #[test]
    fn test_timeout_signals_once_and_disables() {
        let config = HighlightConfig {
            parse_timeout_ms: 1,
            ..HighlightConfig::default()
        };
        let mut session = HighlightSession::new(Arc::new(LanguageRegistry::new()), "javascript", config);
        session.document_did_load(&format!("let a = [{}];\n", "1, ".repeat(2_000_000)));

        assert!(session.is_disabled());
        assert_eq!(session.poll(), vec![HighlightEvent::TimedOut]);
        assert_eq!(session.viewport_changed(0, 10), None);
        assert_eq!(session.text_did_insert(0, "x"), None);
        assert!(session.poll().is_empty());
        // The document itself is still tracked
        assert!(session.snapshot().text().starts_with("xlet"));
    }

    #[test]
    fn test_char_ranges() {
        let mut session = session("rust");
        session.document_did_load("let \u{e9} = \"\u{1F600}\";\n");
        let update = session.viewport_changed(0, 0).unwrap();
        let chars = session.char_ranges(&update).unwrap();
        let string = chars.iter().find(|r| r.category == TokenCategory::String).unwrap();
        // "é" is 2 bytes but 1 UTF-16 unit; the emoji is 2 units
        assert_eq!((string.start, string.end), (8, 12));
    }
}
