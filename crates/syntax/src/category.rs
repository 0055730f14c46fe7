// Chunk: docs/chunks/syntax_highlighting - Capture name to token category mapping

//! Token categories and the capture-name table that produces them.
//!
//! Grammars name their captures freely (`keyword.control`, `string.special.key`,
//! `text.title`, ...). A [`CategoryTable`] folds those names into the fixed
//! [`TokenCategory`] set. Lookups try the exact name first and then
//! progressively shorter dotted prefixes, so `function.method.builtin` falls
//! back to `function`.

use std::collections::HashMap;
use std::fmt;

/// The fixed set of categories a highlight range can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenCategory {
    Keyword,
    Type,
    String,
    Comment,
    Number,
    Function,
    Tag,
    Attribute,
    Operator,
    Punctuation,
}

impl TokenCategory {
    /// Every category, in declaration order.
    pub const ALL: [TokenCategory; 10] = [
        TokenCategory::Keyword,
        TokenCategory::Type,
        TokenCategory::String,
        TokenCategory::Comment,
        TokenCategory::Number,
        TokenCategory::Function,
        TokenCategory::Tag,
        TokenCategory::Attribute,
        TokenCategory::Operator,
        TokenCategory::Punctuation,
    ];

    /// Lowercase name, e.g. `"keyword"`.
    pub fn as_str(self) -> &'static str {
        match self {
            TokenCategory::Keyword => "keyword",
            TokenCategory::Type => "type",
            TokenCategory::String => "string",
            TokenCategory::Comment => "comment",
            TokenCategory::Number => "number",
            TokenCategory::Function => "function",
            TokenCategory::Tag => "tag",
            TokenCategory::Attribute => "attribute",
            TokenCategory::Operator => "operator",
            TokenCategory::Punctuation => "punctuation",
        }
    }
}

impl fmt::Display for TokenCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A per-language override: `Some` remaps a capture name, `None` suppresses it.
pub type CategoryOverride = (&'static str, Option<TokenCategory>);

/// Maps capture names to token categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTable {
    /// `None` entries stop the prefix walk and leave the capture unmapped.
    entries: HashMap<String, Option<TokenCategory>>,
}

impl CategoryTable {
    /// The table shared by every language.
    pub fn defaults() -> Self {
        use TokenCategory::*;

        let defaults: &[(&str, TokenCategory)] = &[
            ("keyword", Keyword),
            ("constant.builtin", Keyword),
            ("boolean", Keyword),
            ("type", Type),
            ("type.builtin", Type),
            ("constructor", Type),
            ("string", String),
            ("escape", String),
            ("character", String),
            ("comment", Comment),
            ("number", Number),
            ("float", Number),
            ("constant.numeric", Number),
            ("function", Function),
            ("method", Function),
            ("tag", Tag),
            ("attribute", Attribute),
            ("operator", Operator),
            ("punctuation", Punctuation),
        ];

        Self {
            entries: defaults
                .iter()
                .map(|(name, category)| (name.to_string(), Some(*category)))
                .collect(),
        }
    }

    /// Returns a copy of this table with `overrides` applied on top.
    pub fn with_overrides(&self, overrides: &[CategoryOverride]) -> Self {
        let mut table = self.clone();
        for (name, category) in overrides {
            table.entries.insert(name.to_string(), *category);
        }
        table
    }

    /// Returns the category for a capture name.
    ///
    /// Tries the exact name, then progressively shorter dotted prefixes.
    pub fn category_for_capture(&self, name: &str) -> Option<TokenCategory> {
        if let Some(category) = self.entries.get(name) {
            return *category;
        }

        let mut prefix = name;
        while let Some(dot_pos) = prefix.rfind('.') {
            prefix = &prefix[..dot_pos];
            if let Some(category) = self.entries.get(prefix) {
                return *category;
            }
        }

        None
    }

    /// Resolves every capture name of a query up front, indexed by capture id.
    pub fn resolve(&self, capture_names: &[&str]) -> Vec<Option<TokenCategory>> {
        capture_names
            .iter()
            .map(|name| self.category_for_capture(name))
            .collect()
    }
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self::defaults()
    }
}
