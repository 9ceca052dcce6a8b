//! Dense `items x contexts` occurrence counts with per-context normalizers.
//!
//! The invariant `norm[ctx] == sum_item counts[item][ctx]` holds after
//! every mutation. A table may be locked, snapshotting the current counts
//! as a training baseline that `reset` restores (instead of zeroing), for
//! held-out evaluation.

/// Count table for one smoothing level.
///
/// Flattened row-major: `counts[item * contexts + ctx]`.
#[derive(Debug, Clone)]
pub struct CountTable {
    items: usize,
    contexts: usize,
    counts: Vec<u32>,
    norm: Vec<u32>,
    snapshot: Option<(Vec<u32>, Vec<u32>)>,
}

impl CountTable {
    /// Zero-count table of the given shape.
    pub fn new(items: usize, contexts: usize) -> Self {
        CountTable {
            items,
            contexts,
            counts: vec![0; items * contexts],
            norm: vec![0; contexts],
            snapshot: None,
        }
    }

    /// Number of distinct items.
    pub fn num_items(&self) -> usize {
        self.items
    }

    /// Number of conditioning contexts.
    pub fn num_contexts(&self) -> usize {
        self.contexts
    }

    /// Occurrence count of `item` in `ctx`.
    #[inline]
    pub fn count(&self, item: usize, ctx: usize) -> u32 {
        self.counts[item * self.contexts + ctx]
    }

    /// Total occupancy of `ctx`.
    #[inline]
    pub fn norm(&self, ctx: usize) -> u32 {
        self.norm[ctx]
    }

    /// Add one occurrence; returns the cell's previous count.
    #[inline]
    pub fn increment(&mut self, item: usize, ctx: usize) -> u32 {
        let cell = &mut self.counts[item * self.contexts + ctx];
        let old = *cell;
        *cell += 1;
        self.norm[ctx] += 1;
        old
    }

    /// Remove one occurrence; returns the cell's previous count.
    ///
    /// Decrementing an empty cell is a caller contract violation.
    #[inline]
    pub fn decrement(&mut self, item: usize, ctx: usize) -> u32 {
        let cell = &mut self.counts[item * self.contexts + ctx];
        let old = *cell;
        debug_assert!(old > 0, "decrement of empty cell ({}, {})", item, ctx);
        *cell -= 1;
        self.norm[ctx] -= 1;
        old
    }

    /// Snapshot the current counts as the training baseline.
    pub fn lock(&mut self) {
        self.snapshot = Some((self.counts.clone(), self.norm.clone()));
    }

    /// Zero all counts, or restore the locked snapshot if one was taken.
    pub fn reset(&mut self) {
        match &self.snapshot {
            Some((counts, norm)) => {
                self.counts.copy_from_slice(counts);
                self.norm.copy_from_slice(norm);
            }
            None => {
                self.counts.fill(0);
                self.norm.fill(0);
            }
        }
    }

    /// Reallocate to a new context cardinality, dropping all counts and
    /// any snapshot.
    ///
    /// Used by document-indexed levels when switching to a held-out
    /// corpus: the per-document counts start from zero there while the
    /// shared levels keep their locked training statistics.
    pub fn resize_contexts(&mut self, contexts: usize) {
        self.contexts = contexts;
        self.counts = vec![0; self.items * contexts];
        self.norm = vec![0; contexts];
        self.snapshot = None;
    }
}
