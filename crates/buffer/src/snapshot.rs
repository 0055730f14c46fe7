// Chunk: docs/chunks/content_fingerprint - Immutable text snapshots with content fingerprints

//! Immutable document snapshots.
//!
//! A [`TextSnapshot`] is the unit of text handed to the line index and the
//! parse engine. It is cheap to clone (shared ownership of the text) and never
//! changes once created, so a snapshot can travel to a background worker while
//! the editing thread keeps producing newer ones.

use std::fmt;
use std::hash::Hasher;
use std::ops::Range;
use std::sync::{Arc, OnceLock};

use rustc_hash::FxHasher;

/// A fast hash of a snapshot's full content.
///
/// Used as a cache key and as the staleness check for background parses:
/// two snapshots with equal fingerprints are treated as the same content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(u64);

impl Fingerprint {
    /// Computes the fingerprint of `text`.
    pub fn of(text: &str) -> Self {
        let mut hasher = FxHasher::default();
        hasher.write(text.as_bytes());
        // Length is mixed in separately so "" and a string of zero bytes differ
        hasher.write_usize(text.len());
        Self(hasher.finish())
    }

    /// Returns the raw hash value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// An immutable view of document content at one point in time.
///
/// Offsets into a snapshot are UTF-8 byte offsets. The UTF-16 length is
/// computed lazily for consumers that address text in UTF-16 code units.
#[derive(Clone)]
pub struct TextSnapshot {
    text: Arc<str>,
    fingerprint: Fingerprint,
    utf16_len: Arc<OnceLock<usize>>,
}

impl TextSnapshot {
    /// Creates a snapshot, hashing the content once.
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        let text = text.into();
        let fingerprint = Fingerprint::of(&text);
        Self {
            text,
            fingerprint,
            utf16_len: Arc::new(OnceLock::new()),
        }
    }

    /// Creates an empty snapshot.
    pub fn empty() -> Self {
        Self::new("")
    }

    /// Returns the full text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Returns the content fingerprint.
    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// Returns the length in bytes.
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Returns true if the snapshot holds no text.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Returns the length in UTF-16 code units.
    pub fn utf16_len(&self) -> usize {
        *self
            .utf16_len
            .get_or_init(|| self.text.chars().map(char::len_utf16).sum())
    }

    /// Returns the character starting at `byte_offset`.
    ///
    /// Returns `None` past the end or when the offset is not a character
    /// boundary.
    pub fn char_at(&self, byte_offset: usize) -> Option<char> {
        self.text.get(byte_offset..)?.chars().next()
    }

    /// Returns the raw byte at `byte_offset`, if any.
    pub fn byte_at(&self, byte_offset: usize) -> Option<u8> {
        self.text.as_bytes().get(byte_offset).copied()
    }

    /// Returns the text in `range`, or `None` if the range is out of bounds
    /// or splits a character.
    pub fn slice(&self, range: Range<usize>) -> Option<&str> {
        self.text.get(range)
    }

    /// Produces the snapshot that results from replacing `range` with `text`.
    ///
    /// Returns `None` if the range is out of bounds or splits a character.
    pub fn splice(&self, range: Range<usize>, text: &str) -> Option<TextSnapshot> {
        if range.start > range.end {
            return None;
        }
        let prefix = self.text.get(..range.start)?;
        let suffix = self.text.get(range.end..)?;
        let mut out = String::with_capacity(prefix.len() + text.len() + suffix.len());
        out.push_str(prefix);
        out.push_str(text);
        out.push_str(suffix);
        Some(TextSnapshot::new(out))
    }
}

impl Default for TextSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for TextSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextSnapshot")
            .field("len", &self.text.len())
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

impl From<&str> for TextSnapshot {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for TextSnapshot {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_equal_for_equal_content() {
        let a = TextSnapshot::new("fn main() {}");
        let b = TextSnapshot::new(String::from("fn main() {}"));
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_fingerprint_differs_for_different_content() {
        let a = TextSnapshot::new("abc");
        let b = TextSnapshot::new("abd");
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_utf16_len_counts_surrogate_pairs() {
        // emoji is 4 bytes, 2 UTF-16 units
        let s = TextSnapshot::new("a\u{1F600}b");
        assert_eq!(s.len(), 6);
        assert_eq!(s.utf16_len(), 4);
    }

    #[test]
    fn test_char_at() {
        let s = TextSnapshot::new("h\u{e9}llo");
        assert_eq!(s.char_at(0), Some('h'));
        assert_eq!(s.char_at(1), Some('\u{e9}'));
        // middle of the two-byte 'é'
        assert_eq!(s.char_at(2), None);
        assert_eq!(s.char_at(3), Some('l'));
        assert_eq!(s.char_at(100), None);
    }

    #[test]
    fn test_splice_insert_and_delete() {
        let s = TextSnapshot::new("abc\ndef\n");
        let inserted = s.splice(1..1, "X").unwrap();
        assert_eq!(inserted.text(), "aXbc\ndef\n");

        let deleted = inserted.splice(1..2, "").unwrap();
        assert_eq!(deleted.text(), "abc\ndef\n");
        assert_eq!(deleted.fingerprint(), s.fingerprint());
    }

    #[test]
    fn test_splice_out_of_bounds() {
        let s = TextSnapshot::new("abc");
        assert!(s.splice(2..10, "x").is_none());
        assert!(s.splice(5..5, "x").is_none());
    }
}
