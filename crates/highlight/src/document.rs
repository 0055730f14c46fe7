// Chunk: docs/chunks/viewport_scheduler - Document state shared by the sessions

use std::ops::Range;

use glint_buffer::{DirtyLines, LineIndex, TextSnapshot};
use glint_syntax::EditDescriptor;

/// What one accepted edit did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AppliedEdit {
    pub dirty: DirtyLines,
    /// Bytes of the new snapshot the edit wrote (empty for deletions).
    pub written: Range<usize>,
}

/// The current snapshot, its line index, and the edits the parse engine has
/// not seen yet.
pub(crate) struct DocumentState {
    pub snapshot: TextSnapshot,
    pub index: LineIndex,
    pub pending_edits: Vec<EditDescriptor>,
}

impl DocumentState {
    pub fn new() -> Self {
        let snapshot = TextSnapshot::empty();
        Self {
            index: LineIndex::from_snapshot(&snapshot),
            snapshot,
            pending_edits: Vec::new(),
        }
    }

    /// Replaces the whole content. Pending edits are dropped.
    pub fn load(&mut self, text: &str) {
        self.snapshot = TextSnapshot::new(text);
        self.index.rebuild(&self.snapshot);
        self.pending_edits.clear();
    }

    /// Applies an insertion. `None` if `at` is past the end or not on a
    /// character boundary.
    pub fn insert(&mut self, at: usize, text: &str) -> Option<AppliedEdit> {
        self.replace(at..at, text)
    }

    /// Applies a deletion. `None` if `range` is out of bounds or splits a
    /// character.
    pub fn delete(&mut self, range: Range<usize>) -> Option<AppliedEdit> {
        self.replace(range, "")
    }

    fn replace(&mut self, range: Range<usize>, text: &str) -> Option<AppliedEdit> {
        let next = self.snapshot.splice(range.clone(), text)?;
        let edit = EditDescriptor::for_replace(self.snapshot.text(), range.clone(), text)?;

        let mut dirty = DirtyLines::None;
        if !range.is_empty() {
            // The index must see the text between the two halves of a replace
            let deleted = if text.is_empty() {
                next.clone()
            } else {
                self.snapshot.splice(range.clone(), "")?
            };
            dirty.merge(self.index.did_delete(range.clone(), &deleted));
        }
        if !text.is_empty() {
            dirty.merge(self.index.did_insert(range.start, text, &next));
        }
        if dirty.is_none() {
            return Some(AppliedEdit {
                dirty,
                written: range.start..range.start,
            });
        }

        self.snapshot = next;
        self.pending_edits.push(edit);
        Some(AppliedEdit {
            dirty,
            written: range.start..range.start + text.len(),
        })
    }

    /// Takes the edits not yet shipped to the engine.
    pub fn take_edits(&mut self) -> Vec<EditDescriptor> {
        std::mem::take(&mut self.pending_edits)
    }
}
