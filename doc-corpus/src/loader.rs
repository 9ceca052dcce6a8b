use crate::common_io::open_buf_reader;
use crate::document::{Corpus, Document};
use anyhow::{bail, Context};
use std::io::BufRead;

/// Load a plain-text instance list into `corpus`.
///
/// One document per non-empty line:
///
/// ```text
/// source<TAB>token token token ...
/// ```
///
/// where each token is `word` or `word:chunk` (chunk a non-negative
/// integer, defaulting to 0). Words are lowercased before interning.
/// Empty documents are skipped, as are lines with no token field.
///
/// If the corpus' vocabulary has been populated beforehand and
/// `grow_vocab` is false, out-of-vocabulary words are dropped (the
/// token and its chunk id together, keeping the sequences parallel).
pub fn load_instance_list(
    input_file: &str,
    corpus: &mut Corpus,
    grow_vocab: bool,
) -> anyhow::Result<()> {
    let reader = open_buf_reader(input_file)?;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading {}", input_file))?;
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        let (source, body) = match line.split_once('\t') {
            Some(x) => x,
            None => continue,
        };

        let mut tokens = Vec::new();
        let mut chunks = Vec::new();

        for field in body.split_whitespace() {
            let (word, chunk) = match field.rsplit_once(':') {
                Some((word, chunk_str)) => {
                    let chunk: usize = chunk_str.parse().with_context(|| {
                        format!("{}:{}: bad chunk id {:?}", input_file, lineno + 1, field)
                    })?;
                    (word, chunk)
                }
                None => (field, 0),
            };

            if word.is_empty() {
                bail!("{}:{}: empty word in {:?}", input_file, lineno + 1, field);
            }

            let word = word.to_lowercase();

            let w = if grow_vocab {
                Some(corpus.vocab_mut().intern(&word))
            } else {
                corpus.vocab().get(&word)
            };

            if let Some(w) = w {
                tokens.push(w);
                chunks.push(chunk);
            }
        }

        if tokens.is_empty() {
            continue;
        }

        let doc = Document::new(source, tokens, chunks)?;
        corpus.push(doc);
    }

    Ok(())
}
