//! Generalized hierarchical Dirichlet-multinomial smoother.
//!
//! One struct covers every count-based predictive factor in the model
//! (doc-topic, topic-word, switch, register-word, chunk-register-word,
//! register prior): a base measure, a stack of [`CountTable`] levels from
//! outermost to innermost, and one concentration (pseudo-count) per level.
//!
//! The predictive probability interpolates recursively,
//!
//! ```text
//! s_0 = base(item)
//! s_l = s_{l-1} * p_l / (n_l + p_l) + c_l / (n_l + p_l)
//! ```
//!
//! where `c_l`/`n_l` are the level's cell count and context normalizer.
//! The multiply-then-add order is kept exactly: the recursion is not
//! algebraically commutative under floating point, and downstream results
//! must be reproducible bit for bit.

use crate::counts::CountTable;
use crate::slice::slice_sample_log;
use rand::rngs::SmallRng;
use std::collections::HashMap;

/// Level-0 distribution the recursion starts from.
#[derive(Debug, Clone)]
pub enum BaseMeasure {
    /// `1 / V` over `V` items.
    Uniform(usize),
    /// Fixed per-item weights (the switch factor's asymmetric base pair).
    Fixed(Vec<f64>),
}

impl BaseMeasure {
    #[inline]
    fn weight(&self, item: usize) -> f64 {
        match self {
            BaseMeasure::Uniform(v) => 1.0 / *v as f64,
            BaseMeasure::Fixed(w) => w[item],
        }
    }
}

/// Hierarchically smoothed predictive-probability component.
#[derive(Debug, Clone)]
pub struct HierSmoother {
    base: BaseMeasure,
    levels: Vec<CountTable>,
    pseudo: Vec<f64>,
    minimal: bool,
    unseen: Option<HashMap<usize, u32>>,
}

impl HierSmoother {
    /// Build a smoother with zero counts.
    ///
    /// `context_counts` gives the context cardinality of each level,
    /// outermost first; `pseudo` supplies one strictly positive
    /// concentration per level. In `minimal` mode a parent level's counts
    /// move only on the child cell's 0->1 / 1->0 occupancy transitions.
    pub fn new(
        base: BaseMeasure,
        num_items: usize,
        context_counts: &[usize],
        pseudo: Vec<f64>,
        minimal: bool,
    ) -> Self {
        assert_eq!(
            context_counts.len(),
            pseudo.len(),
            "one pseudo-count per level"
        );
        assert!(!pseudo.is_empty(), "at least one smoothing level");
        assert!(
            pseudo.iter().all(|&p| p > 0.0),
            "pseudo-counts must be strictly positive"
        );
        if let BaseMeasure::Fixed(w) = &base {
            assert_eq!(w.len(), num_items, "one base weight per item");
        }

        let levels = context_counts
            .iter()
            .map(|&contexts| CountTable::new(num_items, contexts))
            .collect();

        HierSmoother {
            base,
            levels,
            pseudo,
            minimal,
            unseen: None,
        }
    }

    /// Attach a per-item discount table modeling rare/unseen vocabulary:
    /// predictive scores for listed items are divided by their divisor.
    pub fn with_unseen(mut self, unseen: Option<HashMap<usize, u32>>) -> Self {
        self.unseen = unseen;
        self
    }

    /// Number of nesting levels.
    pub fn num_levels(&self) -> usize {
        self.levels.len()
    }

    /// Number of distinct items.
    pub fn num_items(&self) -> usize {
        self.levels[0].num_items()
    }

    /// The concentration vector.
    pub fn pseudo(&self) -> &[f64] {
        &self.pseudo
    }

    /// Replace the concentration vector (length must be unchanged).
    pub fn set_pseudo(&mut self, pseudo: Vec<f64>) {
        assert_eq!(pseudo.len(), self.pseudo.len());
        self.pseudo = pseudo;
    }

    /// Read-only view of one level's count table.
    pub fn level(&self, l: usize) -> &CountTable {
        &self.levels[l]
    }

    #[inline]
    fn unseen_divisor(&self, item: usize) -> Option<f64> {
        self.unseen
            .as_ref()
            .and_then(|u| u.get(&item))
            .map(|&d| d as f64)
    }

    /// Smoothed predictive probability of `item` given one context per
    /// level (outermost first). Strictly within (0, 1) for positive
    /// pseudo-counts and any non-negative counts.
    #[inline]
    pub fn score(&self, item: usize, ctxs: &[usize]) -> f64 {
        debug_assert_eq!(ctxs.len(), self.levels.len());

        let mut score = self.base.weight(item);

        for (l, table) in self.levels.iter().enumerate() {
            let ctx = ctxs[l];
            let n = table.norm(ctx) as f64;
            let c = table.count(item, ctx) as f64;
            let p = self.pseudo[l];

            score *= p / (n + p);
            score += c / (n + p);
        }

        if let Some(divisor) = self.unseen_divisor(item) {
            score /= divisor;
        }

        score
    }

    /// Raw empirical ratio at the innermost level, ignoring all
    /// pseudo-counts; 0 when the context is unoccupied. Diagnostics only.
    pub fn score_no_prior(&self, item: usize, ctxs: &[usize]) -> f64 {
        debug_assert_eq!(ctxs.len(), self.levels.len());

        let table = &self.levels[self.levels.len() - 1];
        let ctx = ctxs[ctxs.len() - 1];

        let n = table.norm(ctx);
        if n == 0 {
            return 0.0;
        }

        let mut score = table.count(item, ctx) as f64 / n as f64;

        if let Some(divisor) = self.unseen_divisor(item) {
            score /= divisor;
        }

        score
    }

    /// Record one occurrence of `item` in the given contexts.
    #[inline]
    pub fn increment(&mut self, item: usize, ctxs: &[usize]) {
        debug_assert_eq!(ctxs.len(), self.levels.len());

        for (l, table) in self.levels.iter_mut().enumerate().rev() {
            let old = table.increment(item, ctxs[l]);
            if self.minimal && old != 0 {
                break;
            }
        }
    }

    /// Remove one occurrence of `item` from the given contexts.
    #[inline]
    pub fn decrement(&mut self, item: usize, ctxs: &[usize]) {
        debug_assert_eq!(ctxs.len(), self.levels.len());

        for (l, table) in self.levels.iter_mut().enumerate().rev() {
            let old = table.decrement(item, ctxs[l]);
            if self.minimal && old != 1 {
                break;
            }
        }
    }

    /// Snapshot every level's counts as the training baseline.
    pub fn lock(&mut self) {
        for table in &mut self.levels {
            table.lock();
        }
    }

    /// Zero all counts, or restore the locked baseline.
    pub fn reset(&mut self) {
        for table in &mut self.levels {
            table.reset();
        }
    }

    /// Reallocate one level to a new context cardinality (zeroing it and
    /// dropping its snapshot). The doc-topic child level uses this when a
    /// locked model moves to held-out documents.
    pub fn resize_level(&mut self, level: usize, contexts: usize) {
        self.levels[level].resize_contexts(contexts);
    }

    /// Slice-sample the concentration vector in log space.
    ///
    /// `replay` must recompute this smoother's total log predictive
    /// probability for the current assignment state (it is called with the
    /// candidate pseudo-counts already installed). After `num_iterations`
    /// slice updates the accepted vector, strictly positive by
    /// construction, is left installed.
    pub fn sample_hyper<F>(
        &mut self,
        rng: &mut SmallRng,
        num_iterations: usize,
        step_size: f64,
        mut replay: F,
    ) where
        F: FnMut(&mut HierSmoother) -> f64,
    {
        let mut raw: Vec<f64> = self.pseudo.iter().map(|p| p.ln()).collect();

        {
            let this = &mut *self;
            slice_sample_log(rng, &mut raw, num_iterations, step_size, |u| {
                for (p, v) in this.pseudo.iter_mut().zip(u) {
                    *p = v.exp();
                }
                replay(&mut *this)
            });
        }

        for (p, v) in self.pseudo.iter_mut().zip(&raw) {
            *p = v.exp();
        }
    }
}
