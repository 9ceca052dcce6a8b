//! Per-factor log predictive probability by assignment replay.
//!
//! Each function resets its smoother and replays the corpus' stored
//! assignments through score/increment in document-then-position order,
//! accumulating the total log predictive probability. Replay is the
//! objective inside hyperparameter slice sampling and the building block
//! of the engine's joint log probability; with unchanged state two
//! consecutive calls are bit-identical.
//!
//! Documents without an assigned register count as register 0 (the
//! background-only configuration fixes every document there).

use crate::assign::{Assignments, TokenState};
use crate::smoother::HierSmoother;
use doc_corpus::Corpus;

fn register_of(corpus: &Corpus, d: usize) -> usize {
    corpus.doc(d).register().unwrap_or(0)
}

/// Topic-given-document factor over all topical tokens.
pub fn doc_topic_log_prob(
    smoother: &mut HierSmoother,
    corpus: &Corpus,
    assignments: &Assignments,
) -> f64 {
    smoother.reset();

    let mut log_prob = 0.0;
    for d in 0..corpus.len() {
        for state in assignments.doc(d) {
            if let TokenState::Topic(j) = state {
                log_prob += smoother.score(*j, &[0, d]).ln();
                smoother.increment(*j, &[0, d]);
            }
        }
    }
    log_prob
}

/// Word-given-topic factor over all topical tokens.
pub fn topic_word_log_prob(
    smoother: &mut HierSmoother,
    corpus: &Corpus,
    assignments: &Assignments,
) -> f64 {
    smoother.reset();

    let mut log_prob = 0.0;
    for d in 0..corpus.len() {
        let doc = corpus.doc(d);
        for (i, state) in assignments.doc(d).iter().enumerate() {
            if let TokenState::Topic(j) = state {
                let w = doc.token(i);
                log_prob += smoother.score(w, &[*j]).ln();
                smoother.increment(w, &[*j]);
            }
        }
    }
    log_prob
}

/// Switch factor over every token.
///
/// `chunked` selects the conditioning: the chunk-conditioned wiring keys
/// each token by its chunk id, the flat wiring has a single context and
/// ignores any chunk annotations the corpus carries.
pub fn switch_log_prob(
    smoother: &mut HierSmoother,
    corpus: &Corpus,
    assignments: &Assignments,
    chunked: bool,
) -> f64 {
    smoother.reset();

    let mut log_prob = 0.0;
    for d in 0..corpus.len() {
        let doc = corpus.doc(d);
        for (i, state) in assignments.doc(d).iter().enumerate() {
            let k = state.switch();
            let c = if chunked { doc.chunk(i) } else { 0 };
            log_prob += smoother.score(k, &[c]).ln();
            smoother.increment(k, &[c]);
        }
    }
    log_prob
}

/// Background word factor over all background tokens.
///
/// `num_chunks` distinguishes the two wirings: `Some(c_count)` is the
/// two-level chunk-conditioned factor (contexts register, register*C+chunk),
/// `None` the flat word-given-register factor.
pub fn background_word_log_prob(
    smoother: &mut HierSmoother,
    corpus: &Corpus,
    assignments: &Assignments,
    num_chunks: Option<usize>,
) -> f64 {
    smoother.reset();

    let mut log_prob = 0.0;
    for d in 0..corpus.len() {
        let doc = corpus.doc(d);
        let r = register_of(corpus, d);
        for (i, state) in assignments.doc(d).iter().enumerate() {
            if *state != TokenState::Background {
                continue;
            }
            let w = doc.token(i);
            match num_chunks {
                Some(c_count) => {
                    let ctxs = [r, r * c_count + doc.chunk(i)];
                    log_prob += smoother.score(w, &ctxs).ln();
                    smoother.increment(w, &ctxs);
                }
                None => {
                    log_prob += smoother.score(w, &[r]).ln();
                    smoother.increment(w, &[r]);
                }
            }
        }
    }
    log_prob
}

/// Register prior over all documents.
pub fn register_log_prob(smoother: &mut HierSmoother, corpus: &Corpus) -> f64 {
    smoother.reset();

    let mut log_prob = 0.0;
    for d in 0..corpus.len() {
        let r = register_of(corpus, d);
        log_prob += smoother.score(r, &[0]).ln();
        smoother.increment(r, &[0]);
    }
    log_prob
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smoother::BaseMeasure;
    use doc_corpus::{Document, Vocab};

    fn tiny_corpus() -> (Corpus, Assignments) {
        let mut vocab = Vocab::new();
        let a = vocab.intern("a");
        let b = vocab.intern("b");
        let mut corpus = Corpus::new(vocab);
        corpus.push(Document::without_chunks("d0", vec![a, b, a]));
        corpus.push(Document::without_chunks("d1", vec![b, b]));
        corpus.doc_mut(0).set_register(0);
        corpus.doc_mut(1).set_register(1);

        let mut assign = Assignments::for_corpus(&corpus);
        assign.set(0, 0, TokenState::Topic(0));
        assign.set(0, 1, TokenState::Background);
        assign.set(0, 2, TokenState::Topic(1));
        assign.set(1, 0, TokenState::Topic(1));
        assign.set(1, 1, TokenState::Background);
        (corpus, assign)
    }

    #[test]
    fn replay_is_bit_identical() {
        let (corpus, assign) = tiny_corpus();
        let mut s = HierSmoother::new(
            BaseMeasure::Uniform(2),
            2,
            &[1, corpus.len()],
            vec![0.4, 0.4],
            true,
        );
        let first = doc_topic_log_prob(&mut s, &corpus, &assign);
        let second = doc_topic_log_prob(&mut s, &corpus, &assign);
        assert_eq!(first.to_bits(), second.to_bits());
        assert!(first.is_finite() && first < 0.0);
    }

    #[test]
    fn background_factor_counts_only_background_tokens() {
        let (corpus, assign) = tiny_corpus();
        let mut s =
            HierSmoother::new(BaseMeasure::Uniform(2), 2, &[2], vec![0.2], false);
        let lp = background_word_log_prob(&mut s, &corpus, &assign, None);
        assert!(lp.is_finite());
        // one background token per document, registers 0 and 1
        assert_eq!(s.level(0).norm(0), 1);
        assert_eq!(s.level(0).norm(1), 1);
    }

    #[test]
    fn flat_switch_replay_ignores_chunk_annotations() {
        let mut vocab = Vocab::new();
        let a = vocab.intern("a");
        let b = vocab.intern("b");
        let mut corpus = Corpus::new(vocab);
        // chunk ids present, but the switch factor has a single context
        corpus.push(Document::new("d0", vec![a, b, a], vec![0, 2, 1]).unwrap());

        let mut assign = Assignments::for_corpus(&corpus);
        assign.set(0, 1, TokenState::Background);

        let mut s = HierSmoother::new(
            BaseMeasure::Fixed(vec![0.5, 0.5]),
            2,
            &[1],
            vec![1.0],
            false,
        );
        let lp = switch_log_prob(&mut s, &corpus, &assign, false);
        assert!(lp.is_finite() && lp < 0.0);
        assert_eq!(s.level(0).norm(0), 3);
    }

    #[test]
    fn register_prior_replays_every_document() {
        let (corpus, _assign) = tiny_corpus();
        let mut s =
            HierSmoother::new(BaseMeasure::Uniform(2), 2, &[1], vec![2.0], false);
        let lp = register_log_prob(&mut s, &corpus);
        assert_eq!(s.level(0).norm(0), 2);
        // first doc: uniform 1/2; second: smoothed toward uniform
        let expected = (0.5f64).ln() + (0.5f64 * (2.0 / 3.0)).ln();
        approx::assert_abs_diff_eq!(lp, expected, epsilon = 1e-12);
    }
}
