use crate::common::*;

use std::io::Write;
use topic_sampler::{Assignments, SnapshotSink};

/// Snapshot sink writing into one output directory.
///
/// `log_prob.txt` accumulates one line per logged iteration; state and
/// hyperparameter files are tagged with the iteration number when
/// periodic snapshots are enabled, untagged for the final snapshot.
pub struct FileSink {
    out_dir: Box<str>,
}

impl FileSink {
    /// Prepare the output directory, truncating any previous
    /// log-probability trace.
    pub fn new(out_dir: &str) -> anyhow::Result<Self> {
        io::mkdir(out_dir)?;
        std::fs::File::create(format!("{}/log_prob.txt", out_dir))?;
        Ok(FileSink {
            out_dir: out_dir.into(),
        })
    }

    /// Like [`FileSink::new`] but keeps the existing log-probability
    /// trace, for resumed runs.
    pub fn append(out_dir: &str) -> anyhow::Result<Self> {
        io::mkdir(out_dir)?;
        Ok(FileSink {
            out_dir: out_dir.into(),
        })
    }

    fn tagged(&self, stem: &str, itn: Option<usize>, ext: &str) -> String {
        match itn {
            Some(itn) => format!("{}/{}.{}.{}", self.out_dir, stem, itn, ext),
            None => format!("{}/{}.{}", self.out_dir, stem, ext),
        }
    }
}

impl SnapshotSink for FileSink {
    fn log_prob(&mut self, itn: usize, value: f64) -> anyhow::Result<()> {
        let mut w = io::open_append_writer(&format!("{}/log_prob.txt", self.out_dir))?;
        writeln!(w, "{}\t{}", itn, value)?;
        w.flush()?;
        Ok(())
    }

    fn state(
        &mut self,
        itn: Option<usize>,
        corpus: &Corpus,
        assignments: &Assignments,
    ) -> anyhow::Result<()> {
        let mut w = io::open_buf_writer(&self.tagged("state", itn, "txt.gz"))?;
        writeln!(w, "#doc pos word register switch topic")?;
        for d in 0..corpus.len() {
            let doc = corpus.doc(d);
            let r = doc.register().map_or(-1, |r| r as i64);
            for (i, state) in assignments.doc(d).iter().enumerate() {
                writeln!(
                    w,
                    "{} {} {} {} {} {}",
                    d,
                    i,
                    doc.token(i),
                    r,
                    state.switch(),
                    state.topic_or_sentinel()
                )?;
            }
        }
        w.flush()?;
        Ok(())
    }

    fn hyperparams(
        &mut self,
        itn: Option<usize>,
        name: &str,
        values: &[f64],
    ) -> anyhow::Result<()> {
        let mut w = io::open_buf_writer(&self.tagged(name, itn, "txt"))?;
        for v in values {
            writeln!(w, "{}", v)?;
        }
        w.flush()?;
        Ok(())
    }
}
