// Chunk: docs/chunks/char_projection - Byte to character offset projection

//! Byte-offset → character-offset projection for one snapshot.
//!
//! The engine works in UTF-8 bytes. Consumers that address text in UTF-16
//! code units or Unicode scalar values need every range converted; this map
//! is built once per snapshot and answers each conversion with a binary
//! search over the snapshot's non-ASCII characters only.

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// The character space ranges are projected into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CharEncoding {
    /// UTF-16 code units (surrogate pairs count as two).
    #[default]
    Utf16,
    /// Unicode scalar values (Rust `char`s).
    Scalar,
}

impl CharEncoding {
    fn units(self, ch: char) -> usize {
        match self {
            CharEncoding::Utf16 => ch.len_utf16(),
            CharEncoding::Scalar => 1,
        }
    }
}

/// A non-ASCII character, recorded with its offsets in both spaces.
#[derive(Debug, Clone, Copy)]
struct WideChar {
    byte: usize,
    char: usize,
    byte_len: u8,
    unit_len: u8,
}

impl WideChar {
    fn byte_end(&self) -> usize {
        self.byte + self.byte_len as usize
    }

    fn char_end(&self) -> usize {
        self.char + self.unit_len as usize
    }
}

#[derive(Debug, Clone)]
enum Repr {
    /// Pure ASCII text: byte and character offsets coincide.
    Identity,
    Table(Vec<WideChar>),
}

/// Converts byte offsets of one text into character offsets and back.
#[derive(Debug, Clone)]
pub struct ByteCharMap {
    encoding: CharEncoding,
    byte_len: usize,
    char_len: usize,
    repr: Repr,
}

impl ByteCharMap {
    /// Builds the map for `text`. O(n) once; ASCII text takes a fast path.
    pub fn new(text: &str, encoding: CharEncoding) -> Self {
        if text.is_ascii() {
            return Self {
                encoding,
                byte_len: text.len(),
                char_len: text.len(),
                repr: Repr::Identity,
            };
        }

        let mut wide = Vec::new();
        let mut char_offset = 0;
        for (byte, ch) in text.char_indices() {
            let units = encoding.units(ch);
            if !ch.is_ascii() {
                wide.push(WideChar {
                    byte,
                    char: char_offset,
                    byte_len: ch.len_utf8() as u8,
                    unit_len: units as u8,
                });
            }
            char_offset += units;
        }

        Self {
            encoding,
            byte_len: text.len(),
            char_len: char_offset,
            repr: Repr::Table(wide),
        }
    }

    pub fn encoding(&self) -> CharEncoding {
        self.encoding
    }

    /// Returns true if the text was pure ASCII.
    pub fn is_identity(&self) -> bool {
        matches!(self.repr, Repr::Identity)
    }

    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    /// Length of the text in the map's character space.
    pub fn char_len(&self) -> usize {
        self.char_len
    }

    /// Converts a byte offset to a character offset.
    ///
    /// Returns `None` past the end or inside a multi-byte character.
    pub fn to_char(&self, byte_offset: usize) -> Option<usize> {
        if byte_offset > self.byte_len {
            return None;
        }
        let wide = match &self.repr {
            Repr::Identity => return Some(byte_offset),
            Repr::Table(wide) => wide,
        };
        let idx = wide.partition_point(|w| w.byte <= byte_offset);
        let Some(prev) = idx.checked_sub(1).map(|i| wide[i]) else {
            return Some(byte_offset);
        };
        if byte_offset == prev.byte {
            Some(prev.char)
        } else if byte_offset < prev.byte_end() {
            None
        } else {
            Some(prev.char_end() + (byte_offset - prev.byte_end()))
        }
    }

    /// Converts a character offset back to a byte offset.
    ///
    /// Returns `None` past the end or between the two halves of a
    /// surrogate pair.
    pub fn to_byte(&self, char_offset: usize) -> Option<usize> {
        if char_offset > self.char_len {
            return None;
        }
        let wide = match &self.repr {
            Repr::Identity => return Some(char_offset),
            Repr::Table(wide) => wide,
        };
        let idx = wide.partition_point(|w| w.char <= char_offset);
        let Some(prev) = idx.checked_sub(1).map(|i| wide[i]) else {
            return Some(char_offset);
        };
        if char_offset == prev.char {
            Some(prev.byte)
        } else if char_offset < prev.char_end() {
            None
        } else {
            Some(prev.byte_end() + (char_offset - prev.char_end()))
        }
    }

    /// Converts a byte range to a character range.
    pub fn range_to_chars(&self, range: Range<usize>) -> Option<Range<usize>> {
        Some(self.to_char(range.start)?..self.to_char(range.end)?)
    }
}
