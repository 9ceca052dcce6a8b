//! Per-token latent state, stored as one flat arena.
//!
//! Documents hold only offsets into the arena, which is owned by the
//! sampling engine for the lifetime of a run. A token is either on the
//! topical path with a concrete topic, or on the background path with no
//! topic at all, so the "topic is valid iff the switch is topical"
//! invariant holds by construction.

use doc_corpus::Corpus;

/// Latent state of one token position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    /// Switch 0: the token draws from its document's topic mixture.
    Topic(usize),
    /// Switch 1: the token draws from the background word distribution.
    Background,
}

impl TokenState {
    /// Switch value: 0 for topical, 1 for background.
    #[inline]
    pub fn switch(&self) -> usize {
        match self {
            TokenState::Topic(_) => 0,
            TokenState::Background => 1,
        }
    }

    /// The assigned topic, if on the topical path.
    #[inline]
    pub fn topic(&self) -> Option<usize> {
        match self {
            TokenState::Topic(j) => Some(*j),
            TokenState::Background => None,
        }
    }

    /// Topic id the way state files spell it (-1 for background).
    pub fn topic_or_sentinel(&self) -> i64 {
        match self {
            TokenState::Topic(j) => *j as i64,
            TokenState::Background => -1,
        }
    }
}

/// Flat arena of token states with a per-document offset table.
#[derive(Debug, Clone)]
pub struct Assignments {
    offsets: Vec<usize>,
    slots: Vec<TokenState>,
}

impl Assignments {
    /// Allocate one slot per token of `corpus`, all initially topical 0.
    ///
    /// The contents are meaningless until the engine's initializing pass
    /// overwrites them.
    pub fn for_corpus(corpus: &Corpus) -> Self {
        Self::from_doc_lengths(corpus.docs().iter().map(|d| d.len()))
    }

    /// Allocate from explicit document lengths.
    pub fn from_doc_lengths(lengths: impl Iterator<Item = usize>) -> Self {
        let mut offsets = vec![0];
        for len in lengths {
            let last = *offsets.last().unwrap_or(&0);
            offsets.push(last + len);
        }
        let total = *offsets.last().unwrap_or(&0);
        Assignments {
            offsets,
            slots: vec![TokenState::Topic(0); total],
        }
    }

    /// Number of documents.
    pub fn num_docs(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Total number of token slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when the arena holds no tokens.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// States of document `d`'s tokens, in position order.
    #[inline]
    pub fn doc(&self, d: usize) -> &[TokenState] {
        &self.slots[self.offsets[d]..self.offsets[d + 1]]
    }

    /// Mutable states of document `d`'s tokens.
    #[inline]
    pub fn doc_mut(&mut self, d: usize) -> &mut [TokenState] {
        &mut self.slots[self.offsets[d]..self.offsets[d + 1]]
    }

    /// State at document `d`, position `i`.
    #[inline]
    pub fn get(&self, d: usize, i: usize) -> TokenState {
        self.slots[self.offsets[d] + i]
    }

    /// Overwrite the state at document `d`, position `i`.
    #[inline]
    pub fn set(&mut self, d: usize, i: usize, state: TokenState) {
        self.slots[self.offsets[d] + i] = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_partition_the_arena() {
        let assign = Assignments::from_doc_lengths([3, 0, 2].into_iter());
        assert_eq!(assign.num_docs(), 3);
        assert_eq!(assign.len(), 5);
        assert_eq!(assign.doc(0).len(), 3);
        assert_eq!(assign.doc(1).len(), 0);
        assert_eq!(assign.doc(2).len(), 2);
    }

    #[test]
    fn set_get_round_trip() {
        let mut assign = Assignments::from_doc_lengths([2, 2].into_iter());
        assign.set(1, 0, TokenState::Background);
        assign.set(1, 1, TokenState::Topic(4));

        assert_eq!(assign.get(1, 0), TokenState::Background);
        assert_eq!(assign.get(1, 0).switch(), 1);
        assert_eq!(assign.get(1, 0).topic(), None);
        assert_eq!(assign.get(1, 0).topic_or_sentinel(), -1);
        assert_eq!(assign.get(1, 1).topic(), Some(4));
        // document 0 untouched
        assert_eq!(assign.get(0, 0), TokenState::Topic(0));
    }
}
