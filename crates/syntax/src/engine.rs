// Chunk: docs/chunks/syntax_highlighting - Core parse engine with incremental parsing
// Chunk: docs/chunks/syntax_highlight_perf - Window-scoped capture collection
// Chunk: docs/chunks/highlight_injection - Nested engines for embedded languages

//! Parse engine with incremental parsing support.
//!
//! A [`ParseEngine`] owns one tree-sitter `Parser` and the persistent
//! [`SyntaxTree`] for one (document, language) pair. Edits are applied to a
//! copy of the tree, the copy is re-parsed, and the result replaces the old
//! tree as a new generation. Highlighting walks the tree with a
//! `QueryCursor` restricted to a byte window, so the cost of a viewport pass
//! is proportional to the window rather than the document.
//!
//! Embedded languages (script/style in HTML, fenced code and inline content
//! in Markdown) are handed to nested engines keyed by language name. Nested
//! engines always parse their region from scratch; their ranges are moved
//! into host coordinates and replace whatever the host said about the
//! region. Failures inside a nested engine leave the region as the host
//! highlighted it.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use std::sync::Arc;
use std::time::{Duration, Instant};

use glint_buffer::{Fingerprint, TextSnapshot};
use streaming_iterator::StreamingIterator;
use tracing::{debug, trace, warn};
use tree_sitter::{Parser, Query, QueryCursor, Tree};

use crate::category::TokenCategory;
use crate::edit::EditDescriptor;
use crate::error::SyntaxError;
use crate::injection::{rule_regions, InjectionQuery, InjectionRegion};
use crate::range::{carve, flatten, Capture, HighlightRange};
use crate::registry::{LanguageConfig, LanguageRegistry};

/// Default parse timeout (500ms).
pub const DEFAULT_PARSE_TIMEOUT: Duration = Duration::from_millis(500);

/// Default bound on nested embedded languages.
pub const DEFAULT_MAX_INJECTION_DEPTH: usize = 3;

/// Options controlling an engine and the nested engines it spawns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Time budget for one parse. Zero disables the budget.
    pub parse_timeout: Duration,
    /// How many levels of embedded languages are highlighted.
    pub max_injection_depth: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            parse_timeout: DEFAULT_PARSE_TIMEOUT,
            max_injection_depth: DEFAULT_MAX_INJECTION_DEPTH,
        }
    }
}

/// The persistent parse result for one snapshot.
///
/// Exclusively owned by its engine and replaced, never merged, on each
/// successful parse.
pub struct SyntaxTree {
    tree: Tree,
    generation: u64,
    fingerprint: Fingerprint,
    len: usize,
}

impl SyntaxTree {
    /// Monotonic counter, bumped by every successful parse.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Fingerprint of the snapshot this tree was parsed from.
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// Byte length of the snapshot this tree was parsed from.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The underlying tree-sitter tree.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }
}

impl fmt::Debug for SyntaxTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntaxTree")
            .field("generation", &self.generation)
            .field("fingerprint", &self.fingerprint)
            .field("len", &self.len)
            .finish()
    }
}

/// What a [`ParseEngine::sync`] call did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Byte ranges (in the new snapshot) whose syntax changed.
    ///
    /// For an incremental parse these come from comparing the edited old
    /// tree with the new one, so they can reach well past the edit (an
    /// unterminated block comment). A full parse reports the whole document.
    pub changed: Vec<Range<usize>>,
    /// True if the previous tree was reused.
    pub incremental: bool,
    /// Generation of the installed tree, 0 if no tree exists.
    pub generation: u64,
}

/// A grammar with its queries compiled.
struct Grammar {
    config: Arc<LanguageConfig>,
    parser: Parser,
    highlights: Query,
    /// Category per highlight capture index, resolved once.
    categories: Vec<Option<TokenCategory>>,
    injections: Option<InjectionQuery>,
}

impl Grammar {
    fn compile(config: Arc<LanguageConfig>, timeout: Duration) -> Result<Self, SyntaxError> {
        let mut parser = Parser::new();
        parser.set_language(&config.language)?;
        parser.set_timeout_micros(timeout_micros(timeout));

        // One-time cost per engine; every highlight pass reuses the query.
        let highlights = Query::new(&config.language, config.highlights_query).map_err(
            |source| SyntaxError::Query {
                language: config.name.to_string(),
                source,
            },
        )?;
        let categories = config.categories.resolve(highlights.capture_names());

        let injections = if config.injections_query.is_empty() {
            None
        } else {
            match Query::new(&config.language, config.injections_query) {
                Ok(query) => InjectionQuery::new(query),
                Err(e) => {
                    warn!(
                        language = config.name,
                        error = %e,
                        "injection query unusable, using regex rules"
                    );
                    None
                }
            }
        };

        Ok(Self {
            config,
            parser,
            highlights,
            categories,
            injections,
        })
    }

    /// Parses `snapshot`, reusing `old` when given. `None` means the time
    /// budget ran out.
    fn parse(&mut self, snapshot: &TextSnapshot, old: Option<&Tree>) -> Option<Tree> {
        let started = Instant::now();
        let tree = self.parser.parse(snapshot.text(), old);
        if tree.is_none() {
            // The parser keeps its partial state after a timeout; drop it so
            // the next parse starts clean.
            self.parser.reset();
        }
        trace!(
            language = self.config.name,
            bytes = snapshot.len(),
            incremental = old.is_some(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "parsed"
        );
        tree
    }
}

fn timeout_micros(timeout: Duration) -> u64 {
    u64::try_from(timeout.as_micros()).unwrap_or(u64::MAX)
}

/// Checks that `edits`, applied in order to a text of `tree_len` bytes,
/// produce a text of `snapshot_len` bytes.
fn edits_fit(tree_len: usize, edits: &[EditDescriptor], snapshot_len: usize) -> bool {
    let mut len = tree_len;
    for edit in edits {
        if edit.start_byte > edit.old_end_byte
            || edit.start_byte > edit.new_end_byte
            || edit.old_end_byte > len
        {
            return false;
        }
        len = len - (edit.old_end_byte - edit.start_byte) + (edit.new_end_byte - edit.start_byte);
    }
    len == snapshot_len
}

/// Maintains the syntax tree for one document in one language.
pub struct ParseEngine {
    registry: Arc<LanguageRegistry>,
    /// `None` is the unsupported state: every call yields no ranges.
    grammar: Option<Grammar>,
    tree: Option<SyntaxTree>,
    last_generation: u64,
    /// Nested engines by language name; `None` records a language whose
    /// engine could not be built, so it is not retried.
    children: HashMap<&'static str, Option<ParseEngine>>,
    depth: usize,
    options: EngineOptions,
    /// Set after a timeout; the engine stops parsing.
    disabled: bool,
}

impl ParseEngine {
    /// Creates an engine for the language called `language`.
    ///
    /// An unknown language yields an engine in the unsupported state, not an
    /// error. Errors are reserved for grammars whose queries do not compile.
    pub fn new(
        registry: Arc<LanguageRegistry>,
        language: &str,
        options: EngineOptions,
    ) -> Result<Self, SyntaxError> {
        match registry.config_for_language_name(language).cloned() {
            Some(config) => Self::at_depth(registry, config, options, 0),
            None => {
                debug!(language, "no grammar, highlighting unsupported");
                Ok(Self::unsupported(registry, options))
            }
        }
    }

    /// Creates an engine for an explicit configuration.
    pub fn with_config(
        registry: Arc<LanguageRegistry>,
        config: Arc<LanguageConfig>,
        options: EngineOptions,
    ) -> Result<Self, SyntaxError> {
        Self::at_depth(registry, config, options, 0)
    }

    /// Creates an engine that highlights nothing.
    pub fn unsupported(registry: Arc<LanguageRegistry>, options: EngineOptions) -> Self {
        Self {
            registry,
            grammar: None,
            tree: None,
            last_generation: 0,
            children: HashMap::new(),
            depth: 0,
            options,
            disabled: false,
        }
    }

    fn at_depth(
        registry: Arc<LanguageRegistry>,
        config: Arc<LanguageConfig>,
        options: EngineOptions,
        depth: usize,
    ) -> Result<Self, SyntaxError> {
        let grammar = Grammar::compile(config, options.parse_timeout)?;
        Ok(Self {
            grammar: Some(grammar),
            depth,
            ..Self::unsupported(registry, options)
        })
    }

    // ==================== State ====================

    /// Canonical name of the engine's language, `None` when unsupported.
    pub fn language_name(&self) -> Option<&'static str> {
        self.grammar.as_ref().map(|g| g.config.name)
    }

    pub fn is_supported(&self) -> bool {
        self.grammar.is_some()
    }

    /// Returns true once a parse has timed out.
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    /// Changes the time budget for subsequent parses.
    pub fn set_parse_timeout(&mut self, timeout: Duration) {
        self.options.parse_timeout = timeout;
        if let Some(grammar) = self.grammar.as_mut() {
            grammar.parser.set_timeout_micros(timeout_micros(timeout));
        }
    }

    /// The current tree, if a parse has succeeded.
    pub fn tree(&self) -> Option<&SyntaxTree> {
        self.tree.as_ref()
    }

    /// Returns true if the current tree was parsed from `snapshot`.
    pub fn is_current(&self, snapshot: &TextSnapshot) -> bool {
        self.tree
            .as_ref()
            .is_some_and(|t| t.fingerprint == snapshot.fingerprint())
    }

    /// Discards the tree and every nested engine. The timeout state is kept.
    pub fn reset(&mut self) {
        self.tree = None;
        self.children.clear();
    }

    fn ensure_enabled(&self) -> Result<(), SyntaxError> {
        if self.disabled {
            Err(SyntaxError::Disabled)
        } else {
            Ok(())
        }
    }

    fn timed_out(&mut self, snapshot: &TextSnapshot) -> SyntaxError {
        self.disabled = true;
        warn!(
            language = self.language_name().unwrap_or("none"),
            bytes = snapshot.len(),
            timeout_ms = self.options.parse_timeout.as_millis() as u64,
            "parse timed out, highlighting disabled"
        );
        SyntaxError::Timeout
    }

    fn install(&mut self, tree: Tree, snapshot: &TextSnapshot) -> u64 {
        self.last_generation += 1;
        self.tree = Some(SyntaxTree {
            tree,
            generation: self.last_generation,
            fingerprint: snapshot.fingerprint(),
            len: snapshot.len(),
        });
        self.last_generation
    }

    // ==================== Parsing ====================

    /// Parses `snapshot` from scratch and returns its highlight ranges.
    pub fn parse(&mut self, snapshot: &TextSnapshot) -> Result<Vec<HighlightRange>, SyntaxError> {
        self.reparse(snapshot)?;
        self.highlights_in(snapshot, 0..snapshot.len())
    }

    /// Applies `edit` to the tree, re-parses incrementally and returns the
    /// highlight ranges of the whole snapshot.
    ///
    /// The result is the same set of ranges [`parse`](Self::parse) would
    /// produce for `snapshot`.
    pub fn update(
        &mut self,
        snapshot: &TextSnapshot,
        edit: &EditDescriptor,
    ) -> Result<Vec<HighlightRange>, SyntaxError> {
        self.sync(snapshot, std::slice::from_ref(edit))?;
        self.highlights_in(snapshot, 0..snapshot.len())
    }

    /// Brings the tree up to date with `snapshot`.
    ///
    /// `edits` are the edits made since the tree was parsed, in order. They
    /// are applied to a copy of the tree which is then re-parsed once. A
    /// batch that does not lead from the tree's text to `snapshot` falls back
    /// to a full parse.
    ///
    /// When either the old or the new tree contains syntax errors the text
    /// is re-parsed from scratch, and the whole document is reported as
    /// changed.
    ///
    /// On timeout the previous tree stays in place, `Err(Timeout)` is
    /// returned once, and every later call returns `Err(Disabled)`.
    pub fn sync(
        &mut self,
        snapshot: &TextSnapshot,
        edits: &[EditDescriptor],
    ) -> Result<SyncOutcome, SyntaxError> {
        self.ensure_enabled()?;
        let Some(language) = self.language_name() else {
            return Ok(SyncOutcome::default());
        };

        let edited = match &self.tree {
            Some(current) if edits.is_empty() && current.fingerprint == snapshot.fingerprint() => {
                return Ok(SyncOutcome {
                    changed: Vec::new(),
                    incremental: true,
                    generation: current.generation,
                });
            }
            Some(current) if !edits.is_empty() && edits_fit(current.len, edits, snapshot.len()) => {
                let mut edited = current.tree.clone();
                for edit in edits {
                    edited.edit(&edit.to_input_edit());
                }
                edited
            }
            Some(current) => {
                warn!(
                    language,
                    tree_len = current.len,
                    snapshot_len = snapshot.len(),
                    edits = edits.len(),
                    "edits do not match snapshot, reparsing from scratch"
                );
                return self.reparse(snapshot);
            }
            None => return self.reparse(snapshot),
        };

        let Some(grammar) = self.grammar.as_mut() else {
            return Ok(SyncOutcome::default());
        };
        let Some(tree) = grammar.parse(snapshot, Some(&edited)) else {
            return Err(self.timed_out(snapshot));
        };
        // Error recovery seeded from an old tree can settle on a different
        // tree than a fresh parse of the same text.
        if tree.root_node().has_error() || edited.root_node().has_error() {
            debug!(language, "syntax errors after incremental parse, reparsing");
            return self.reparse(snapshot);
        }

        let changed: Vec<Range<usize>> = edited
            .changed_ranges(&tree)
            .map(|r| r.start_byte..r.end_byte)
            .collect();
        let generation = self.install(tree, snapshot);
        debug!(
            language,
            generation,
            edits = edits.len(),
            changed = changed.len(),
            "incremental parse"
        );

        Ok(SyncOutcome {
            changed,
            incremental: true,
            generation,
        })
    }

    fn reparse(&mut self, snapshot: &TextSnapshot) -> Result<SyncOutcome, SyntaxError> {
        self.ensure_enabled()?;
        let Some(grammar) = self.grammar.as_mut() else {
            return Ok(SyncOutcome::default());
        };
        let Some(tree) = grammar.parse(snapshot, None) else {
            return Err(self.timed_out(snapshot));
        };
        let generation = self.install(tree, snapshot);
        debug!(
            language = self.language_name().unwrap_or("none"),
            generation,
            bytes = snapshot.len(),
            "full parse"
        );
        Ok(SyncOutcome {
            changed: vec![0..snapshot.len()],
            incremental: false,
            generation,
        })
    }

    // ==================== Highlighting ====================

    /// Returns the highlight ranges intersecting `window`, clipped to it.
    ///
    /// Parses `snapshot` from scratch first if the tree was not parsed from
    /// it. Only the window is walked.
    pub fn highlights_in(
        &mut self,
        snapshot: &TextSnapshot,
        window: Range<usize>,
    ) -> Result<Vec<HighlightRange>, SyntaxError> {
        self.ensure_enabled()?;
        if self.grammar.is_none() {
            return Ok(Vec::new());
        }
        if !self.is_current(snapshot) {
            self.reparse(snapshot)?;
        }

        let len = snapshot.len();
        let window = window.start.min(len)..window.end.min(len);
        if window.is_empty() {
            return Ok(Vec::new());
        }

        let (Some(grammar), Some(tree)) = (&self.grammar, &self.tree) else {
            return Ok(Vec::new());
        };

        let mut captures = Vec::new();
        {
            let mut cursor = QueryCursor::new();
            cursor.set_byte_range(window.clone());
            let root = tree.tree.root_node();
            let mut iter = cursor.captures(&grammar.highlights, root, snapshot.text().as_bytes());
            let mut order = 0;
            while let Some((mat, capture_idx)) = iter.next() {
                let capture = &mat.captures[*capture_idx];
                if let Some(Some(category)) = grammar.categories.get(capture.index as usize) {
                    captures.push(Capture {
                        start: capture.node.start_byte(),
                        end: capture.node.end_byte(),
                        category: *category,
                        order,
                    });
                }
                order += 1;
            }
        }
        let mut ranges = flatten(captures, window.clone());

        if self.depth >= self.options.max_injection_depth {
            return Ok(ranges);
        }

        let regions = match &grammar.injections {
            Some(query) => query.regions(&tree.tree, snapshot.text(), window.clone()),
            None => rule_regions(&grammar.config.injection_rules, snapshot.text(), window.clone()),
        };
        for region in regions {
            let clipped = region.range.start.max(window.start)..region.range.end.min(window.end);
            if let Some(nested) = self.highlight_region(snapshot, &region, clipped.clone()) {
                ranges = carve(ranges, &clipped, nested);
            }
        }

        Ok(ranges)
    }

    /// Highlights one embedded region with the nested engine for its
    /// language. Returns ranges in host coordinates, or `None` when the
    /// region stays as the host highlighted it.
    fn highlight_region(
        &mut self,
        snapshot: &TextSnapshot,
        region: &InjectionRegion,
        clipped: Range<usize>,
    ) -> Option<Vec<HighlightRange>> {
        let config = self.registry.config_for_language_name(&region.language)?.clone();
        // A language embedding itself (Rust macro bodies) is already
        // highlighted by the host query.
        if Some(config.name) == self.language_name() {
            return None;
        }
        let text = snapshot.slice(region.range.clone())?;
        let sub = TextSnapshot::new(text);

        let child = match self.children.entry(config.name) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let name = config.name;
                let engine = ParseEngine::at_depth(
                    self.registry.clone(),
                    config,
                    self.options,
                    self.depth + 1,
                );
                entry.insert(match engine {
                    Ok(engine) => Some(engine),
                    Err(e) => {
                        warn!(language = name, error = %e, "cannot highlight embedded language");
                        None
                    }
                })
            }
        };
        let child = child.as_mut()?;

        let offset = region.range.start;
        let local = (clipped.start - offset)..(clipped.end - offset);
        match child.highlights_in(&sub, local) {
            Ok(ranges) => Some(ranges.into_iter().map(|r| r.shifted(offset)).collect()),
            Err(e) => {
                debug!(language = config_name(child), error = %e, "embedded region left unhighlighted");
                None
            }
        }
    }
}

fn config_name(engine: &ParseEngine) -> &'static str {
    engine.language_name().unwrap_or("none")
}

impl fmt::Debug for ParseEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseEngine")
            .field("language", &self.language_name())
            .field("tree", &self.tree)
            .field("depth", &self.depth)
            .field("disabled", &self.disabled)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Arc<LanguageRegistry> {
        Arc::new(LanguageRegistry::new())
    }

    fn engine(language: &str) -> ParseEngine {
        ParseEngine::new(registry(), language, EngineOptions::default()).unwrap()
    }

    fn texts_of<'a>(
        text: &'a str,
        ranges: &[HighlightRange],
        category: TokenCategory,
    ) -> Vec<&'a str> {
        ranges
            .iter()
            .filter(|r| r.category == category)
            .map(|r| &text[r.byte_range()])
            .collect()
    }

    fn assert_non_overlapping(ranges: &[HighlightRange]) {
        for pair in ranges.windows(2) {
            assert!(
                pair[0].end_byte <= pair[1].start_byte,
                "overlap: {:?} and {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    /// Applies an insertion through `update` and checks it against a fresh parse.
    fn insert_and_compare(engine: &mut ParseEngine, snap: &TextSnapshot, at: usize, text: &str) -> TextSnapshot {
        let edit = EditDescriptor::for_insert(snap.text(), at, text).unwrap();
        let next = snap.splice(at..at, text).unwrap();
        let incremental = engine.update(&next, &edit).unwrap();
        let full = engine_for(engine).parse(&next).unwrap();
        assert_eq!(incremental, full, "after inserting {:?} at {}", text, at);
        next
    }

    fn engine_for(other: &ParseEngine) -> ParseEngine {
        engine(other.language_name().unwrap())
    }

    // ==================== Basic highlighting ====================

    #[test]
    fn test_javascript_keywords() {
        let source = "function foo() { return 1; }";
        let snap = TextSnapshot::new(source);
        let ranges = engine("javascript").parse(&snap).unwrap();

        assert_eq!(texts_of(source, &ranges, TokenCategory::Keyword), vec!["function", "return"]);
        assert_non_overlapping(&ranges);
        let keyword = ranges.iter().find(|r| r.category == TokenCategory::Keyword).unwrap();
        assert_eq!(keyword.byte_range(), 0..8);
    }

    #[test]
    fn test_rust_categories() {
        let source = "// note\nfn main() { let s = \"hi\"; let n = 42; }";
        let snap = TextSnapshot::new(source);
        let ranges = engine("rust").parse(&snap).unwrap();

        assert_eq!(texts_of(source, &ranges, TokenCategory::Comment), vec!["// note"]);
        assert!(texts_of(source, &ranges, TokenCategory::Keyword).contains(&"fn"));
        assert_eq!(texts_of(source, &ranges, TokenCategory::String), vec!["\"hi\""]);
        assert_eq!(texts_of(source, &ranges, TokenCategory::Number), vec!["42"]);
        assert_eq!(texts_of(source, &ranges, TokenCategory::Function), vec!["main"]);
        assert_non_overlapping(&ranges);
    }

    #[test]
    fn test_rust_literals_split_numbers_from_booleans() {
        let source = "const A: f64 = 1.5;\nconst B: bool = true;\nconst C: u8 = 0x1f;\n";
        let snap = TextSnapshot::new(source);
        let ranges = engine("rust").parse(&snap).unwrap();

        assert_eq!(texts_of(source, &ranges, TokenCategory::Number), vec!["1.5", "0x1f"]);
        assert!(texts_of(source, &ranges, TokenCategory::Keyword).contains(&"true"));
    }

    #[test]
    fn test_typescript_layers_javascript_query() {
        let source = r#"const message: string = "hello";"#;
        let snap = TextSnapshot::new(source);
        let ranges = engine("typescript").parse(&snap).unwrap();
        assert!(texts_of(source, &ranges, TokenCategory::Keyword).contains(&"const"));
        assert_eq!(texts_of(source, &ranges, TokenCategory::String), vec!["\"hello\""]);
    }

    #[test]
    fn test_unsupported_language_yields_nothing() {
        let mut engine = engine("fortran");
        assert!(!engine.is_supported());
        let snap = TextSnapshot::new("program hello");
        assert_eq!(engine.parse(&snap).unwrap(), Vec::new());
        assert_eq!(engine.sync(&snap, &[]).unwrap(), SyncOutcome::default());
        assert!(engine.tree().is_none());
    }

    #[test]
    fn test_parse_is_idempotent() {
        let snap = TextSnapshot::new("fn a() {}\nstruct B { c: u32 }\n");
        let mut engine = engine("rust");
        let first = engine.parse(&snap).unwrap();
        let second = engine.parse(&snap).unwrap();
        assert_eq!(first, second);
        assert_eq!(engine.tree().unwrap().generation(), 2);
    }

    #[test]
    fn test_empty_document() {
        let snap = TextSnapshot::empty();
        let mut engine = engine("rust");
        assert!(engine.parse(&snap).unwrap().is_empty());
        assert!(engine.tree().is_some());
    }

    // ==================== Incremental parsing ====================

    #[test]
    fn test_update_matches_full_parse() {
        let mut engine = engine("rust");
        let mut snap = TextSnapshot::new("fn main() {\n    let x = 1;\n}\n");
        engine.parse(&snap).unwrap();

        snap = insert_and_compare(&mut engine, &snap, 16, "mut ");
        snap = insert_and_compare(&mut engine, &snap, 0, "// header\n");
        snap = insert_and_compare(&mut engine, &snap, snap.len(), "struct S;\n");

        let edit = EditDescriptor::for_delete(snap.text(), 0..10).unwrap();
        let next = snap.splice(0..10, "").unwrap();
        let incremental = engine.update(&next, &edit).unwrap();
        assert_eq!(incremental, self::engine("rust").parse(&next).unwrap());
    }

    #[test]
    fn test_sync_reports_changes_away_from_edit() {
        let mut engine = engine("javascript");
        let before = TextSnapshot::new("a();\nb();\n// */\n");
        engine.parse(&before).unwrap();

        let edit = EditDescriptor::for_insert(before.text(), 0, "/*").unwrap();
        let after = before.splice(0..0, "/*").unwrap();
        let outcome = engine.sync(&after, &[edit]).unwrap();

        assert!(outcome.incremental);
        // The new comment swallows every line down to the old line comment
        let old_comment = after.text().find("//").unwrap();
        assert!(
            outcome.changed.iter().any(|r| r.end > old_comment),
            "changed ranges: {:?}",
            outcome.changed
        );
        let ranges = engine.highlights_in(&after, 0..after.len()).unwrap();
        assert_eq!(
            ranges,
            vec![HighlightRange::new(0, after.len() - 1, TokenCategory::Comment)]
        );
    }

    #[test]
    fn test_sync_applies_edit_batch_in_order() {
        let mut engine = engine("rust");
        let s0 = TextSnapshot::new("fn a() {}\n");
        engine.parse(&s0).unwrap();

        let e1 = EditDescriptor::for_insert(s0.text(), 3, "bc").unwrap();
        let s1 = s0.splice(3..3, "bc").unwrap();
        let e2 = EditDescriptor::for_insert(s1.text(), s1.len(), "fn d() {}\n").unwrap();
        let s2 = s1.splice(s1.len()..s1.len(), "fn d() {}\n").unwrap();

        let outcome = engine.sync(&s2, &[e1, e2]).unwrap();
        assert!(outcome.incremental);
        assert_eq!(engine.tree().unwrap().fingerprint(), s2.fingerprint());
        let ranges = engine.highlights_in(&s2, 0..s2.len()).unwrap();
        assert_eq!(ranges, self::engine("rust").parse(&s2).unwrap());
    }

    #[test]
    fn test_inconsistent_batch_falls_back_to_full_parse() {
        let mut engine = engine("rust");
        let s0 = TextSnapshot::new("fn a() {}\n");
        engine.parse(&s0).unwrap();

        // Claims one inserted byte, but the snapshot grew by three
        let edit = EditDescriptor::for_insert(s0.text(), 0, "x").unwrap();
        let s1 = TextSnapshot::new("abcfn a() {}\n");
        let outcome = engine.sync(&s1, &[edit]).unwrap();

        assert!(!outcome.incremental);
        assert_eq!(outcome.changed, vec![0..s1.len()]);
        assert_eq!(engine.tree().unwrap().fingerprint(), s1.fingerprint());
    }

    #[test]
    fn test_edit_into_broken_javascript_matches_full_parse() {
        // Recovering from these errors incrementally used to leave a stray
        // keyword range that a fresh parse does not produce.
        let mut engine = engine("javascript");
        let s0 = TextSnapshot::new("'a'nct{ion foo() { return 1; }\nconst x = 1;\n");
        engine.parse(&s0).unwrap();

        let start = s0.text().find(" = 1;").unwrap();
        let edit = EditDescriptor::for_delete(s0.text(), start + 1..start + 5).unwrap();
        let s1 = s0.splice(start + 1..start + 5, "").unwrap();
        assert_eq!(s1.text(), "'a'nct{ion foo() { return 1; }\nconst x \n");

        let outcome = engine.sync(&s1, &[edit]).unwrap();
        assert!(!outcome.incremental);
        assert_eq!(outcome.changed, vec![0..s1.len()]);
        let ranges = engine.highlights_in(&s1, 0..s1.len()).unwrap();
        assert_eq!(ranges, self::engine("javascript").parse(&s1).unwrap());
    }

    #[test]
    fn test_sync_without_edits_is_noop_when_current() {
        let mut engine = engine("rust");
        let snap = TextSnapshot::new("fn a() {}");
        engine.parse(&snap).unwrap();
        let generation = engine.tree().unwrap().generation();

        let outcome = engine.sync(&snap, &[]).unwrap();
        assert!(outcome.changed.is_empty());
        assert_eq!(outcome.generation, generation);
    }

    // ==================== Windows ====================

    #[test]
    fn test_highlights_in_window_only() {
        let source = "fn one() {}\nfn two() {}\nfn three() {}\n";
        let snap = TextSnapshot::new(source);
        let mut engine = engine("rust");
        let window = 12..24;
        let ranges = engine.highlights_in(&snap, window.clone()).unwrap();

        assert!(!ranges.is_empty());
        assert!(ranges.iter().all(|r| r.start_byte >= window.start && r.end_byte <= window.end));
        assert_eq!(texts_of(source, &ranges, TokenCategory::Function), vec!["two"]);
    }

    #[test]
    fn test_window_clips_spanning_capture() {
        let source = "/* a\nb\nc */ fn x() {}";
        let snap = TextSnapshot::new(source);
        let ranges = engine("rust").highlights_in(&snap, 5..7).unwrap();
        assert_eq!(ranges, vec![HighlightRange::new(5, 7, TokenCategory::Comment)]);
    }

    // ==================== Timeouts ====================

    #[test]
    fn test_timeout_keeps_tree_and_disables() {
        let mut engine = engine("javascript");
        let small = TextSnapshot::new("let a = 1;\n");
        engine.parse(&small).unwrap();
        let generation = engine.tree().unwrap().generation();

        engine.set_parse_timeout(Duration::from_micros(1));
        let huge: String = format!("let b = [{}];\n", "1, ".repeat(500_000));
        let big = TextSnapshot::new(huge);
        assert!(matches!(engine.parse(&big), Err(SyntaxError::Timeout)));

        // Previous tree still installed
        assert_eq!(engine.tree().unwrap().generation(), generation);
        assert_eq!(engine.tree().unwrap().fingerprint(), small.fingerprint());
        assert!(engine.is_disabled());

        // No retry
        assert!(matches!(engine.parse(&small), Err(SyntaxError::Disabled)));
        assert!(matches!(engine.sync(&small, &[]), Err(SyntaxError::Disabled)));
    }

    // ==================== Embedded languages ====================

    #[test]
    fn test_html_script_and_style_are_highlighted() {
        let source = "<style>p { color: red; }</style><script>let x = 1;</script>";
        let snap = TextSnapshot::new(source);
        let ranges = engine("html").parse(&snap).unwrap();

        assert!(texts_of(source, &ranges, TokenCategory::Keyword).contains(&"let"));
        assert!(texts_of(source, &ranges, TokenCategory::Number).contains(&"1"));
        assert!(texts_of(source, &ranges, TokenCategory::Attribute).contains(&"color"));
        assert!(texts_of(source, &ranges, TokenCategory::Tag).contains(&"script"));
        assert_non_overlapping(&ranges);
    }

    #[test]
    fn test_regex_rules_when_injection_query_missing() {
        let mut registry = LanguageRegistry::new();
        let rule = crate::registry::InjectionRule::new(
            r"(?is)<script\b[^>]*>(.*?)</script\s*>",
            "javascript",
        )
        .unwrap();
        registry.register(
            LanguageConfig::new(
                "html_rules",
                tree_sitter_html::LANGUAGE.into(),
                tree_sitter_html::HIGHLIGHTS_QUERY,
                "",
            )
            .with_injection_rule(rule),
            &["xhtml"],
        );
        let registry = Arc::new(registry);
        let mut engine = ParseEngine::new(registry, "html_rules", EngineOptions::default()).unwrap();

        let source = "<p>hi</p><script>return 5;</script>";
        let ranges = engine.parse(&TextSnapshot::new(source)).unwrap();
        assert!(texts_of(source, &ranges, TokenCategory::Keyword).contains(&"return"));
    }

    #[test]
    fn test_markdown_fenced_code() {
        let source = "# Title\n\n```rust\nfn main() {}\n```\n";
        let snap = TextSnapshot::new(source);
        let ranges = engine("markdown").parse(&snap).unwrap();

        assert!(texts_of(source, &ranges, TokenCategory::Keyword).contains(&"fn"));
        assert!(texts_of(source, &ranges, TokenCategory::Function).contains(&"main"));
        assert_non_overlapping(&ranges);
    }

    #[test]
    fn test_injection_depth_bound() {
        let source = "<script>let x = 1;</script>";
        let snap = TextSnapshot::new(source);
        let options = EngineOptions {
            max_injection_depth: 0,
            ..EngineOptions::default()
        };
        let mut engine = ParseEngine::new(registry(), "html", options).unwrap();
        let ranges = engine.parse(&snap).unwrap();
        assert!(texts_of(source, &ranges, TokenCategory::Keyword).is_empty());
    }

    #[test]
    fn test_unknown_embedded_language_is_skipped() {
        let source = "```klingon\nqapla'\n```\n";
        let snap = TextSnapshot::new(source);
        let ranges = engine("markdown").parse(&snap).unwrap();
        assert_non_overlapping(&ranges);
    }

    #[test]
    fn test_embedded_window_is_respected() {
        let source = "<script>\nlet a = 1;\nlet b = 2;\n</script>";
        let snap = TextSnapshot::new(source);
        let second = source.find("let b").unwrap();
        let window = second..second + 10;
        let ranges = engine("html").highlights_in(&snap, window.clone()).unwrap();

        assert_eq!(texts_of(source, &ranges, TokenCategory::Keyword), vec!["let"]);
        assert!(ranges.iter().all(|r| r.start_byte >= window.start && r.end_byte <= window.end));
    }
}
