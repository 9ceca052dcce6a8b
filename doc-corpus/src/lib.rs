//! Tokenized document corpus for switching topic models.
//!
//! A [`Corpus`](document::Corpus) is an ordered collection of
//! [`Document`](document::Document)s over a shared [`Vocab`](vocab::Vocab).
//! Documents carry a token sequence, a parallel chunk-id sequence, and a
//! latent register label written back by the sampler. The corpus is built
//! once by the loader and read-only thereafter, except for the register
//! field.

/// Word dictionary (insertion-ordered interner)
pub mod vocab;

/// Documents and the corpus container
pub mod document;

/// Plain-text instance-list loading
pub mod loader;

/// Buffered line IO with transparent gzip
pub mod common_io;

pub use document::{Corpus, Document};
pub use vocab::Vocab;
