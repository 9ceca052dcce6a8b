//! Final distribution dumps rendered after a run.

use crate::common::*;

use std::io::Write;
use topic_sampler::summary::top_items;
use topic_sampler::Sampler;

/// Write every dump the fitted variant supports into `out_dir`.
///
/// `num_top_words` caps the per-context word dumps; `None` writes the
/// full sorted distributions.
pub fn write_all(
    sampler: &Sampler,
    corpus: &Corpus,
    out_dir: &str,
    num_top_words: Option<usize>,
) -> anyhow::Result<()> {
    doc_topics(sampler, corpus, out_dir)?;
    topic_words(sampler, corpus, out_dir, num_top_words)?;
    topic_summary(sampler, corpus, out_dir)?;
    if sampler.background_word().is_some() {
        register_words(sampler, corpus, out_dir, num_top_words)?;
        register_summary(sampler, corpus, out_dir)?;
    }
    Ok(())
}

fn doc_topics(sampler: &Sampler, corpus: &Corpus, out_dir: &str) -> anyhow::Result<()> {
    let t = sampler.config().num_topics;
    let mut w = io::open_buf_writer(&format!("{}/doc_topics.txt.gz", out_dir))?;
    writeln!(w, "#doc source topic proportion ...")?;
    for d in 0..corpus.len() {
        write!(w, "{}\t{}", d, corpus.doc(d).source())?;
        for (j, p) in top_items(t, None, 0.0, |j| sampler.doc_topic().score(j, &[0, d])) {
            write!(w, "\t{}\t{:.6}", j, p)?;
        }
        writeln!(w)?;
    }
    w.flush()?;
    Ok(())
}

fn topic_words(
    sampler: &Sampler,
    corpus: &Corpus,
    out_dir: &str,
    num_top_words: Option<usize>,
) -> anyhow::Result<()> {
    let t = sampler.config().num_topics;
    let vocab = corpus.vocab();
    let mut out = io::open_buf_writer(&format!("{}/topic_words.txt.gz", out_dir))?;
    writeln!(out, "#topic typeindex type proportion")?;
    for j in 0..t {
        let top = top_items(corpus.num_words(), num_top_words, 0.0, |w| {
            sampler.topic_word().score(w, &[j])
        });
        for (w, p) in top {
            writeln!(out, "{}\t{}\t{}\t{:.6}", j, w, vocab.word(w), p)?;
        }
    }
    out.flush()?;
    Ok(())
}

fn register_words(
    sampler: &Sampler,
    corpus: &Corpus,
    out_dir: &str,
    num_top_words: Option<usize>,
) -> anyhow::Result<()> {
    let config = sampler.config();
    let Some(bg) = sampler.background_word() else {
        return Ok(());
    };
    let vocab = corpus.vocab();
    let chunked = config.kind.chunked();
    let chunk_span = if chunked { config.num_chunks } else { 1 };

    let mut out = io::open_buf_writer(&format!("{}/register_words.txt.gz", out_dir))?;
    if chunked {
        writeln!(out, "#chunk register typeindex type proportion")?;
    } else {
        writeln!(out, "#register typeindex type proportion")?;
    }
    for c in 0..chunk_span {
        for r in 0..config.num_registers {
            let top = top_items(corpus.num_words(), num_top_words, 0.0, |w| {
                if chunked {
                    bg.score(w, &[r, r * config.num_chunks + c])
                } else {
                    bg.score(w, &[r])
                }
            });
            for (w, p) in top {
                if chunked {
                    writeln!(out, "{}\t{}\t{}\t{}\t{:.6}", c, r, w, vocab.word(w), p)?;
                } else {
                    writeln!(out, "{}\t{}\t{}\t{:.6}", r, w, vocab.word(w), p)?;
                }
            }
        }
    }
    out.flush()?;
    Ok(())
}

fn topic_summary(sampler: &Sampler, corpus: &Corpus, out_dir: &str) -> anyhow::Result<()> {
    let t = sampler.config().num_topics;
    let vocab = corpus.vocab();
    let mut out = io::open_buf_writer(&format!("{}/topic_summary.txt.gz", out_dir))?;
    for j in 0..t {
        let top = top_items(corpus.num_words(), Some(10), 0.0, |w| {
            sampler.topic_word().score(w, &[j])
        });
        let words: Vec<&str> = top.iter().map(|&(w, _)| vocab.word(w)).collect();
        writeln!(out, "topic {}: {}", j, words.join(" "))?;
    }
    out.flush()?;
    Ok(())
}

fn register_summary(sampler: &Sampler, corpus: &Corpus, out_dir: &str) -> anyhow::Result<()> {
    let config = sampler.config();
    let Some(bg) = sampler.background_word() else {
        return Ok(());
    };
    let vocab = corpus.vocab();
    let chunked = config.kind.chunked();
    let chunk_span = if chunked { config.num_chunks } else { 1 };

    let mut out = io::open_buf_writer(&format!("{}/register_summary.txt.gz", out_dir))?;
    for c in 0..chunk_span {
        for r in 0..config.num_registers {
            let top = top_items(corpus.num_words(), Some(10), 0.0, |w| {
                if chunked {
                    bg.score(w, &[r, r * config.num_chunks + c])
                } else {
                    bg.score(w, &[r])
                }
            });
            let words: Vec<&str> = top.iter().map(|&(w, _)| vocab.word(w)).collect();
            if chunked {
                writeln!(out, "chunk {}, register {}: {}", c, r, words.join(" "))?;
            } else {
                writeln!(out, "register {}: {}", r, words.join(" "))?;
            }
        }
    }
    out.flush()?;
    Ok(())
}
