//! The narrow seam through which the engine emits run output.
//!
//! All persistence and formatting live behind [`SnapshotSink`]; the engine
//! only hands over values tagged with an iteration number (`None` marks
//! the final, post-run snapshot). Sink failures never corrupt in-memory
//! inference state: the engine logs them, keeps sampling, and returns the
//! collected errors to the caller.

use crate::assign::Assignments;
use doc_corpus::Corpus;

/// Receiver for per-iteration scalars and periodic state snapshots.
pub trait SnapshotSink {
    /// One joint log-probability value at a logged iteration.
    fn log_prob(&mut self, itn: usize, value: f64) -> anyhow::Result<()>;

    /// Full switch+topic assignment state.
    fn state(
        &mut self,
        itn: Option<usize>,
        corpus: &Corpus,
        assignments: &Assignments,
    ) -> anyhow::Result<()>;

    /// One named hyperparameter vector.
    fn hyperparams(&mut self, itn: Option<usize>, name: &str, values: &[f64])
        -> anyhow::Result<()>;
}

/// Sink that discards everything (tests, burn-in-only runs).
#[derive(Debug, Default)]
pub struct NullSink;

impl SnapshotSink for NullSink {
    fn log_prob(&mut self, _itn: usize, _value: f64) -> anyhow::Result<()> {
        Ok(())
    }

    fn state(
        &mut self,
        _itn: Option<usize>,
        _corpus: &Corpus,
        _assignments: &Assignments,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    fn hyperparams(
        &mut self,
        _itn: Option<usize>,
        _name: &str,
        _values: &[f64],
    ) -> anyhow::Result<()> {
        Ok(())
    }
}
