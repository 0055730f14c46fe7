// Chunk: docs/chunks/highlight_injection - Embedded language region discovery

//! Finding embedded-language regions.
//!
//! A host grammar declares embedded regions through its injection query:
//! `@injection.content` marks the region and the language comes either from
//! a `#set! injection.language "..."` property or from an
//! `@injection.language` capture (a fenced code block's info string). Hosts
//! without a usable injection query can fall back to regex rules.

use std::ops::Range;

use streaming_iterator::StreamingIterator;
use tree_sitter::{Query, QueryCursor, Tree};

use crate::registry::InjectionRule;

/// One embedded region in host coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct InjectionRegion {
    pub language: String,
    pub range: Range<usize>,
}

/// A compiled injection query with its well-known capture ids resolved.
pub(crate) struct InjectionQuery {
    query: Query,
    content_capture: u32,
    language_capture: Option<u32>,
}

impl InjectionQuery {
    /// Wraps a compiled query. Returns `None` if it declares no
    /// `@injection.content` capture, since it could never yield a region.
    pub fn new(query: Query) -> Option<Self> {
        let content_capture = query.capture_index_for_name("injection.content")?;
        let language_capture = query.capture_index_for_name("injection.language");
        Some(Self {
            query,
            content_capture,
            language_capture,
        })
    }

    /// Returns the regions intersecting `window`, sorted by start.
    pub fn regions(&self, tree: &Tree, text: &str, window: Range<usize>) -> Vec<InjectionRegion> {
        let mut cursor = QueryCursor::new();
        cursor.set_byte_range(window.clone());

        let mut regions = Vec::new();
        let mut matches = cursor.matches(&self.query, tree.root_node(), text.as_bytes());
        while let Some(mat) = matches.next() {
            let mut language = self
                .query
                .property_settings(mat.pattern_index)
                .iter()
                .find(|prop| &*prop.key == "injection.language")
                .and_then(|prop| prop.value.as_deref())
                .map(str::to_string);

            if language.is_none() {
                language = mat
                    .captures
                    .iter()
                    .find(|c| Some(c.index) == self.language_capture)
                    .and_then(|c| text.get(c.node.byte_range()))
                    .map(|name| name.trim().to_string());
            }
            let Some(language) = language.filter(|name| !name.is_empty()) else {
                continue;
            };

            for capture in mat.captures.iter().filter(|c| c.index == self.content_capture) {
                let range = capture.node.byte_range();
                if range.is_empty() || range.end <= window.start || range.start >= window.end {
                    continue;
                }
                regions.push(InjectionRegion {
                    language: language.clone(),
                    range,
                });
            }
        }

        normalize(regions)
    }
}

/// Regions found by regex rules, intersecting `window`, sorted by start.
///
/// The rules scan the whole text: a region that began above the window must
/// still be found.
pub(crate) fn rule_regions(
    rules: &[InjectionRule],
    text: &str,
    window: Range<usize>,
) -> Vec<InjectionRegion> {
    let mut regions = Vec::new();
    for rule in rules {
        for caps in rule.pattern.captures_iter(text) {
            let Some(body) = caps.get(1) else { continue };
            let range = body.range();
            if range.is_empty() || range.end <= window.start || range.start >= window.end {
                continue;
            }
            regions.push(InjectionRegion {
                language: rule.language.to_string(),
                range,
            });
        }
    }
    normalize(regions)
}

/// Sorts regions and drops duplicates and regions nested in an earlier one.
fn normalize(mut regions: Vec<InjectionRegion>) -> Vec<InjectionRegion> {
    regions.sort_by_key(|r| (r.range.start, std::cmp::Reverse(r.range.end)));
    let mut kept: Vec<InjectionRegion> = Vec::with_capacity(regions.len());
    for region in regions {
        if let Some(last) = kept.last() {
            if region.range.start < last.range.end {
                continue;
            }
        }
        kept.push(region);
    }
    kept
}
