use crate::vocab::Vocab;
use anyhow::ensure;

/// One tokenized document.
///
/// `tokens` and `chunks` are parallel sequences fixed at construction;
/// `register` is the only field mutated after loading (by the sampler).
#[derive(Debug, Clone)]
pub struct Document {
    source: Box<str>,
    tokens: Vec<usize>,
    chunks: Vec<usize>,
    register: Option<usize>,
}

impl Document {
    /// Build a document from parallel token and chunk sequences.
    ///
    /// Fails if the sequences have different lengths.
    pub fn new(source: &str, tokens: Vec<usize>, chunks: Vec<usize>) -> anyhow::Result<Self> {
        ensure!(
            tokens.len() == chunks.len(),
            "document {}: {} tokens vs {} chunk ids",
            source,
            tokens.len(),
            chunks.len()
        );
        Ok(Document {
            source: source.into(),
            tokens,
            chunks,
            register: None,
        })
    }

    /// Build a document with every token in chunk 0.
    pub fn without_chunks(source: &str, tokens: Vec<usize>) -> Self {
        let chunks = vec![0; tokens.len()];
        Document {
            source: source.into(),
            tokens,
            chunks,
            register: None,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn token(&self, i: usize) -> usize {
        self.tokens[i]
    }

    pub fn tokens(&self) -> &[usize] {
        &self.tokens
    }

    pub fn chunk(&self, i: usize) -> usize {
        self.chunks[i]
    }

    pub fn chunks(&self) -> &[usize] {
        &self.chunks
    }

    /// Latent register label; `None` until the sampler assigns one.
    pub fn register(&self) -> Option<usize> {
        self.register
    }

    pub fn set_register(&mut self, register: usize) {
        self.register = Some(register);
    }
}

/// Ordered collection of documents over a shared vocabulary.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    docs: Vec<Document>,
    vocab: Vocab,
}

impl Corpus {
    pub fn new(vocab: Vocab) -> Self {
        Corpus {
            docs: Vec::new(),
            vocab,
        }
    }

    /// Number of documents D.
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Vocabulary size W.
    pub fn num_words(&self) -> usize {
        self.vocab.len()
    }

    /// Total number of tokens across all documents.
    pub fn num_tokens(&self) -> usize {
        self.docs.iter().map(|d| d.len()).sum()
    }

    /// Largest chunk id in the corpus plus one (1 when no chunks are marked).
    pub fn num_chunks(&self) -> usize {
        self.docs
            .iter()
            .flat_map(|d| d.chunks().iter().copied())
            .max()
            .map_or(1, |c| c + 1)
    }

    pub fn push(&mut self, doc: Document) {
        self.docs.push(doc);
    }

    pub fn doc(&self, d: usize) -> &Document {
        &self.docs[d]
    }

    pub fn doc_mut(&mut self, d: usize) -> &mut Document {
        &mut self.docs[d]
    }

    pub fn docs(&self) -> &[Document] {
        &self.docs
    }

    pub fn vocab(&self) -> &Vocab {
        &self.vocab
    }

    pub fn vocab_mut(&mut self) -> &mut Vocab {
        &mut self.vocab
    }
}
