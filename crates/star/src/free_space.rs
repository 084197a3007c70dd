//! Reusable byte ranges in the body region.
//!
//! The list is never persisted. It is derived from the directory and the
//! current archive length every time an operation needs it.

use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    directory::Directory,
    error::{ArchiveError, Result},
    HEADER_SIZE,
};

/// A half-open interval `[start, end)` that a future append may reuse,
/// tagged with the directory slot it was derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FreeRange {
    pub start: u64,
    pub end: u64,
    pub index: usize,
}

impl FreeRange {
    pub fn new(start: u64, end: u64, index: usize) -> Self {
        Self { start, end, index }
    }

    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Free ranges ordered by slot index, ascending. No two entries share the
/// same `(start, end)` pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FreeRangeList {
    ranges: Vec<FreeRange>,
}

impl FreeRangeList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_directory(directory: &Directory, archive_len: u64) -> Result<Self> {
        let mut list = Self::new();
        list.rebuild(directory, archive_len)?;
        Ok(list)
    }

    /// Derive the list from scratch.
    ///
    /// A tombstoned slot frees everything between its nearest live
    /// neighbours in table order, falling back to `HEADER_SIZE` below and to
    /// `archive_len` above. Two adjacent live slots free the gap between
    /// them, if any.
    pub fn rebuild(&mut self, directory: &Directory, archive_len: u64) -> Result<()> {
        self.clear();
        let slots = directory.slots();
        for (index, slot) in slots.iter().enumerate() {
            if slot.is_tombstone() {
                let start = slots[..index]
                    .iter()
                    .rev()
                    .find(|m| m.is_live())
                    .map_or(HEADER_SIZE, |m| m.end);
                let end = slots[index + 1..]
                    .iter()
                    .find(|m| m.is_live())
                    .map_or(archive_len, |m| m.start);
                self.insert(FreeRange::new(start, end, index))?;
            } else if slot.is_live() {
                if let Some(next) = slots.get(index + 1).filter(|m| m.is_live()) {
                    if next.start > slot.end {
                        self.insert(FreeRange::new(slot.end, next.start, index))?;
                    }
                }
            }
        }
        debug!(ranges = ?self.ranges, "free space rebuilt");
        Ok(())
    }

    /// Add `range` in index order. Returns `false` when the range is empty
    /// or already present.
    pub fn insert(&mut self, range: FreeRange) -> Result<bool> {
        if range.start > range.end {
            return Err(ArchiveError::InvalidRange {
                start: range.start,
                end: range.end,
            });
        }
        if range.is_empty() || self.contains(range.start, range.end) {
            return Ok(false);
        }
        let at = self.ranges.partition_point(|r| r.index <= range.index);
        self.ranges.insert(at, range);
        Ok(true)
    }

    pub fn contains(&self, start: u64, end: u64) -> bool {
        self.ranges.iter().any(|r| r.start == start && r.end == end)
    }

    /// First range in list order that can hold `required` bytes.
    pub fn find_fit(&self, required: u64) -> Option<FreeRange> {
        self.find_fit_by(required, |_| true)
    }

    /// Like [`find_fit`](Self::find_fit), skipping ranges `accept` rejects.
    pub fn find_fit_by<F>(&self, required: u64, mut accept: F) -> Option<FreeRange>
    where
        F: FnMut(&FreeRange) -> bool,
    {
        self.ranges
            .iter()
            .find(|r| r.len() >= required && accept(r))
            .copied()
    }

    /// Drop the range associated with slot `index`.
    pub fn remove(&mut self, index: usize) -> Option<FreeRange> {
        match self.ranges.iter().position(|r| r.index == index) {
            Some(at) => Some(self.ranges.remove(at)),
            None => {
                warn!(index, "no free range for slot");
                None
            }
        }
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &FreeRange> {
        self.ranges.iter()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Sum of all range lengths.
    pub fn total_bytes(&self) -> u64 {
        self.ranges.iter().map(FreeRange::len).sum()
    }
}
