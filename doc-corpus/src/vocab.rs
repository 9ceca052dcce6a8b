use std::collections::HashMap;

/// Insertion-ordered word dictionary mapping strings to dense ids.
///
/// Ids are assigned in first-seen order, so the mapping is deterministic
/// for a fixed corpus traversal order.
#[derive(Debug, Clone, Default)]
pub struct Vocab {
    words: Vec<Box<str>>,
    index: HashMap<Box<str>, usize>,
}

impl Vocab {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct words (the vocabulary size W).
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Look up `word`, assigning a fresh id if it has not been seen.
    pub fn intern(&mut self, word: &str) -> usize {
        if let Some(&w) = self.index.get(word) {
            return w;
        }
        let w = self.words.len();
        let word: Box<str> = word.into();
        self.words.push(word.clone());
        self.index.insert(word, w);
        w
    }

    /// Look up `word` without growing the dictionary.
    pub fn get(&self, word: &str) -> Option<usize> {
        self.index.get(word).copied()
    }

    /// The word with id `w`. Panics if `w` is out of range.
    pub fn word(&self, w: usize) -> &str {
        &self.words[w]
    }

    pub fn words(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(|x| x.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_idempotent_and_ordered() {
        let mut vocab = Vocab::new();
        assert_eq!(vocab.intern("the"), 0);
        assert_eq!(vocab.intern("cat"), 1);
        assert_eq!(vocab.intern("the"), 0);
        assert_eq!(vocab.len(), 2);
        assert_eq!(vocab.word(1), "cat");
        assert_eq!(vocab.get("dog"), None);
    }
}
