// Chunk: docs/chunks/syntax_highlighting - Language registry for the bundled grammars
// Chunk: docs/chunks/highlight_injection - Injection queries and regex fallback rules

//! Language registry mapping names and file extensions to grammars.
//!
//! The registry is built once and shared (`Arc`) by every parse engine,
//! including the nested engines that highlight embedded languages. Each
//! [`LanguageConfig`] bundles a grammar with its highlight and injection
//! queries, its capture-name → category table, and optional regex rules used
//! to find embedded regions when the injection query is unavailable.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use regex::Regex;
use tracing::warn;
use tree_sitter::Language;

use crate::category::{CategoryOverride, CategoryTable, TokenCategory};

/// A regex rule marking embedded-language regions.
///
/// Capture group 1 of `pattern` is the embedded region.
#[derive(Debug, Clone)]
pub struct InjectionRule {
    pub pattern: Regex,
    pub language: &'static str,
}

impl InjectionRule {
    /// Compiles a rule. The pattern must have at least one capture group.
    pub fn new(pattern: &str, language: &'static str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            language,
        })
    }
}

/// Configuration for one language.
#[derive(Clone)]
pub struct LanguageConfig {
    /// Canonical language name, e.g. `"javascript"`.
    pub name: &'static str,
    /// The tree-sitter language
    pub language: Language,
    /// The highlights query (tree-sitter query syntax)
    pub highlights_query: &'static str,
    /// The injections query, empty when the language embeds nothing
    pub injections_query: &'static str,
    /// Capture name → category mapping (defaults plus overrides)
    pub categories: CategoryTable,
    /// Regex fallback for embedded regions
    pub injection_rules: Vec<InjectionRule>,
}

impl LanguageConfig {
    /// Creates a configuration using the default category table.
    pub fn new(
        name: &'static str,
        language: Language,
        highlights_query: &'static str,
        injections_query: &'static str,
    ) -> Self {
        Self {
            name,
            language,
            highlights_query,
            injections_query,
            categories: CategoryTable::defaults(),
            injection_rules: Vec::new(),
        }
    }

    /// Layers per-language category overrides over the defaults.
    pub fn with_category_overrides(mut self, overrides: &[CategoryOverride]) -> Self {
        self.categories = self.categories.with_overrides(overrides);
        self
    }

    /// Adds a regex fallback rule for embedded regions.
    pub fn with_injection_rule(mut self, rule: InjectionRule) -> Self {
        self.injection_rules.push(rule);
        self
    }
}

impl fmt::Debug for LanguageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LanguageConfig")
            .field("name", &self.name)
            .field("has_injections", &!self.injections_query.is_empty())
            .field("injection_rules", &self.injection_rules.len())
            .finish()
    }
}

const MARKDOWN_CATEGORIES: &[CategoryOverride] = &[
    ("text.title", Some(TokenCategory::Keyword)),
    ("text.literal", Some(TokenCategory::String)),
    ("text.uri", Some(TokenCategory::String)),
];

const CSS_CATEGORIES: &[CategoryOverride] = &[("property", Some(TokenCategory::Attribute))];

const RUST_NUMBER_PATTERNS: &str = "(integer_literal) @number\n(float_literal) @number\n";

/// Registry mapping language names and file extensions to configurations.
///
/// Ships Rust, C++, C, Python, TypeScript, TSX, JavaScript, Go, JSON, TOML,
/// Markdown (block and inline), HTML, CSS, and Bash.
pub struct LanguageRegistry {
    /// Canonical name → config
    configs: HashMap<&'static str, Arc<LanguageConfig>>,
    /// Extension (without leading dot) → canonical name
    extensions: HashMap<&'static str, &'static str>,
}

impl LanguageRegistry {
    /// Creates an empty language registry.
    pub fn empty() -> Self {
        Self {
            configs: HashMap::new(),
            extensions: HashMap::new(),
        }
    }

    /// Creates a new language registry with all bundled languages.
    pub fn new() -> Self {
        let mut registry = Self::empty();

        // Rust (uses HIGHLIGHTS_QUERY). The bundled query captures numeric
        // literals as `@constant.builtin` alongside `true`/`false`, so number
        // patterns go first and win for those nodes.
        let rust_combined_query: &'static str = Box::leak(
            format!("{}\n{}", RUST_NUMBER_PATTERNS, tree_sitter_rust::HIGHLIGHTS_QUERY)
                .into_boxed_str(),
        );
        registry.register(
            LanguageConfig::new(
                "rust",
                tree_sitter_rust::LANGUAGE.into(),
                rust_combined_query,
                tree_sitter_rust::INJECTIONS_QUERY,
            ),
            &["rs"],
        );

        // C++ needs the C highlight query as a base, with C++-specific additions layered on top.
        // The C++ grammar's HIGHLIGHT_QUERY only covers C++-specific constructs (templates,
        // namespaces, `this`, etc.), while keywords, types and functions come from the C query.
        let cpp_combined_query: &'static str = Box::leak(
            format!(
                "{}\n{}",
                tree_sitter_c::HIGHLIGHT_QUERY,
                tree_sitter_cpp::HIGHLIGHT_QUERY
            )
            .into_boxed_str(),
        );
        registry.register(
            LanguageConfig::new("cpp", tree_sitter_cpp::LANGUAGE.into(), cpp_combined_query, ""),
            // .h is ambiguous, default to C++
            &["cpp", "cc", "cxx", "hpp", "h"],
        );

        // C (uses HIGHLIGHT_QUERY - no S)
        registry.register(
            LanguageConfig::new(
                "c",
                tree_sitter_c::LANGUAGE.into(),
                tree_sitter_c::HIGHLIGHT_QUERY,
                "",
            ),
            &["c"],
        );

        registry.register(
            LanguageConfig::new(
                "python",
                tree_sitter_python::LANGUAGE.into(),
                tree_sitter_python::HIGHLIGHTS_QUERY,
                "",
            ),
            &["py"],
        );

        // TypeScript needs the JavaScript highlight query as a base, with TypeScript-specific
        // additions layered on top. Same pattern as C/C++.
        let ts_combined_query: &'static str = Box::leak(
            format!(
                "{}\n{}",
                tree_sitter_javascript::HIGHLIGHT_QUERY,
                tree_sitter_typescript::HIGHLIGHTS_QUERY
            )
            .into_boxed_str(),
        );
        registry.register(
            LanguageConfig::new(
                "typescript",
                tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
                ts_combined_query,
                "",
            ),
            &["ts", "mts", "cts"],
        );
        // TSX extends TypeScript which extends JavaScript
        registry.register(
            LanguageConfig::new(
                "tsx",
                tree_sitter_typescript::LANGUAGE_TSX.into(),
                ts_combined_query,
                "",
            ),
            &["tsx"],
        );

        // JavaScript (uses HIGHLIGHT_QUERY - no S)
        registry.register(
            LanguageConfig::new(
                "javascript",
                tree_sitter_javascript::LANGUAGE.into(),
                tree_sitter_javascript::HIGHLIGHT_QUERY,
                tree_sitter_javascript::INJECTIONS_QUERY,
            ),
            &["js", "jsx", "mjs", "cjs"],
        );

        registry.register(
            LanguageConfig::new(
                "go",
                tree_sitter_go::LANGUAGE.into(),
                tree_sitter_go::HIGHLIGHTS_QUERY,
                "",
            ),
            &["go"],
        );

        registry.register(
            LanguageConfig::new(
                "json",
                tree_sitter_json::LANGUAGE.into(),
                tree_sitter_json::HIGHLIGHTS_QUERY,
                "",
            ),
            &["json"],
        );

        // TOML (tree-sitter-toml-ng)
        registry.register(
            LanguageConfig::new(
                "toml",
                tree_sitter_toml_ng::LANGUAGE.into(),
                tree_sitter_toml_ng::HIGHLIGHTS_QUERY,
                "",
            ),
            &["toml"],
        );

        // Markdown is two grammars: the block grammar injects the inline one
        // into every paragraph.
        registry.register(
            LanguageConfig::new(
                "markdown",
                tree_sitter_md::LANGUAGE.into(),
                tree_sitter_md::HIGHLIGHT_QUERY_BLOCK,
                tree_sitter_md::INJECTION_QUERY_BLOCK,
            )
            .with_category_overrides(MARKDOWN_CATEGORIES),
            &["md", "markdown"],
        );
        registry.register(
            LanguageConfig::new(
                "markdown_inline",
                tree_sitter_md::INLINE_LANGUAGE.into(),
                tree_sitter_md::HIGHLIGHT_QUERY_INLINE,
                tree_sitter_md::INJECTION_QUERY_INLINE,
            )
            .with_category_overrides(MARKDOWN_CATEGORIES),
            &[],
        );

        let mut html = LanguageConfig::new(
            "html",
            tree_sitter_html::LANGUAGE.into(),
            tree_sitter_html::HIGHLIGHTS_QUERY,
            tree_sitter_html::INJECTIONS_QUERY,
        );
        for rule in html_injection_rules() {
            html = html.with_injection_rule(rule);
        }
        registry.register(html, &["html", "htm"]);

        registry.register(
            LanguageConfig::new(
                "css",
                tree_sitter_css::LANGUAGE.into(),
                tree_sitter_css::HIGHLIGHTS_QUERY,
                "",
            )
            .with_category_overrides(CSS_CATEGORIES),
            &["css"],
        );

        // Bash (uses HIGHLIGHT_QUERY - no S)
        registry.register(
            LanguageConfig::new(
                "bash",
                tree_sitter_bash::LANGUAGE.into(),
                tree_sitter_bash::HIGHLIGHT_QUERY,
                "",
            ),
            &["sh", "bash", "zsh"],
        );

        registry
    }

    /// Adds (or replaces) a language and the extensions that select it.
    pub fn register(&mut self, config: LanguageConfig, extensions: &[&'static str]) {
        let name = config.name;
        for ext in extensions {
            self.extensions.insert(*ext, name);
        }
        self.configs.insert(name, Arc::new(config));
    }

    /// Returns the language configuration for a file extension.
    ///
    /// The extension can be with or without a leading dot (e.g., ".rs" or "rs").
    pub fn config_for_extension(&self, ext: &str) -> Option<&Arc<LanguageConfig>> {
        let ext = ext.strip_prefix('.').unwrap_or(ext);
        let name = self.extensions.get(ext)?;
        self.configs.get(name)
    }

    /// Returns the language configuration for a file path, by extension.
    pub fn config_for_path(&self, path: &Path) -> Option<&Arc<LanguageConfig>> {
        let ext = path.extension()?.to_str()?;
        self.config_for_extension(&ext.to_lowercase())
    }

    /// Returns the language configuration for a language name.
    ///
    /// Accepts canonical names, the common aliases used in fenced code blocks
    /// and injection queries ("js", "shell", "golang", "c++", ...), and file
    /// extensions. Matching ignores case and surrounding whitespace. Unknown
    /// names return `None` and the caller falls back to no highlighting.
    pub fn config_for_language_name(&self, name: &str) -> Option<&Arc<LanguageConfig>> {
        let name = name.trim().to_lowercase();

        let canonical = match name.as_str() {
            "js" | "node" => "javascript",
            "ts" => "typescript",
            "py" | "python3" => "python",
            "rs" => "rust",
            "shell" | "sh" | "zsh" => "bash",
            "c++" => "cpp",
            "golang" => "go",
            "md" => "markdown",
            other => other,
        };

        self.configs
            .get(canonical)
            .or_else(|| self.config_for_extension(canonical))
    }

    /// Returns an iterator over all supported extensions.
    pub fn supported_extensions(&self) -> impl Iterator<Item = &str> {
        self.extensions.keys().copied()
    }

    /// Returns an iterator over all canonical language names.
    pub fn language_names(&self) -> impl Iterator<Item = &str> {
        self.configs.keys().copied()
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LanguageRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.configs.keys().collect();
        names.sort();
        f.debug_struct("LanguageRegistry")
            .field("languages", &names)
            .finish()
    }
}

/// `<script>` and `<style>` bodies, for when the HTML injection query is
/// unusable.
fn html_injection_rules() -> Vec<InjectionRule> {
    [
        (r"(?is)<script\b[^>]*>(.*?)</script\s*>", "javascript"),
        (r"(?is)<style\b[^>]*>(.*?)</style\s*>", "css"),
    ]
    .into_iter()
    .filter_map(|(pattern, language)| match InjectionRule::new(pattern, language) {
        Ok(rule) => Some(rule),
        Err(e) => {
            warn!(language, error = %e, "dropping invalid injection rule");
            None
        }
    })
    .collect()
}
