// Chunk: docs/chunks/syntax_highlighting - Parse engine error type

use thiserror::Error;

/// Errors that can occur during parse engine operations.
#[derive(Error, Debug)]
pub enum SyntaxError {
    /// The parse exceeded its time budget and was abandoned.
    ///
    /// The previous tree stays in place and the engine disables itself.
    #[error("parse exceeded the time budget")]
    Timeout,

    /// The engine timed out earlier and no longer parses.
    #[error("highlighting disabled after a parse timeout")]
    Disabled,

    /// The grammar is incompatible with the linked tree-sitter runtime.
    #[error("incompatible grammar: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    /// A highlight or injection query failed to compile.
    #[error("invalid {language} query: {source}")]
    Query {
        language: String,
        #[source]
        source: tree_sitter::QueryError,
    },
}
