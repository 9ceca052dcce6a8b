//! Unified collapsed Gibbs sampling engine.
//!
//! One engine serves all four model variants; a [`ModelKind`] decides
//! which factors are wired (switch, latent register, chunk conditioning)
//! instead of maintaining parallel near-copies of the sweep loop.
//!
//! A sweep visits documents, then token positions, in stored order, so a
//! run is fully deterministic given the seed. For each document of a
//! latent-register variant the register is resampled first from its
//! log-domain conditional; then every token's switch/topic pair is
//! resampled from the T+1-outcome conditional built from the current
//! counts. Enabled hyperparameters are slice-sampled after each sweep.

use crate::assign::{Assignments, TokenState};
use crate::likelihood::{
    background_word_log_prob, doc_topic_log_prob, register_log_prob, switch_log_prob,
    topic_word_log_prob,
};
use crate::randoms::{sample_discrete, sample_discrete_log};
use crate::report::SnapshotSink;
use crate::smoother::{BaseMeasure, HierSmoother};
use crate::summary::top_items;

use anyhow::{ensure, Context};
use doc_corpus::Corpus;
use indicatif::ProgressBar;
use log::{info, warn};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

/// Which optional factors the model wires in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    /// Plain LDA: every token is topical.
    Lda,
    /// Switching LDA with observed (fixed) registers, usually a single
    /// shared background distribution.
    Background,
    /// Switching LDA with a latent per-document register.
    Register,
    /// Switching LDA with a latent register and a chunk-conditioned
    /// background word factor.
    ChunkRegister,
}

impl ModelKind {
    /// Whether the binary switch (and a background path) is modeled.
    pub fn switching(&self) -> bool {
        !matches!(self, ModelKind::Lda)
    }

    /// Whether registers are resampled rather than read from the corpus.
    pub fn latent_registers(&self) -> bool {
        matches!(self, ModelKind::Register | ModelKind::ChunkRegister)
    }

    /// Whether the background word factor conditions on chunk ids.
    pub fn chunked(&self) -> bool {
        matches!(self, ModelKind::ChunkRegister)
    }
}

/// Per-hyperparameter sampling enables (alpha, gamma, beta, delta, sigma).
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleFlags {
    /// Doc-topic concentration.
    pub alpha: bool,
    /// Switch concentration.
    pub gamma: bool,
    /// Topic-word concentration.
    pub beta: bool,
    /// Background-word concentration.
    pub delta: bool,
    /// Register-prior concentration.
    pub sigma: bool,
}

impl SampleFlags {
    /// Parse a compact 0/1 flag string, one character per hyperparameter
    /// the variant owns: `Lda` takes 2 (alpha, beta), `Background` 4
    /// (alpha, gamma, beta, delta), the register variants 5 (alpha,
    /// gamma, beta, delta, sigma).
    pub fn parse(kind: ModelKind, flags: &str) -> anyhow::Result<Self> {
        let expected = match kind {
            ModelKind::Lda => 2,
            ModelKind::Background => 4,
            ModelKind::Register | ModelKind::ChunkRegister => 5,
        };
        ensure!(
            flags.len() == expected,
            "expected {} sample flags, got {:?}",
            expected,
            flags
        );

        let mut bits = [false; 5];
        for (i, ch) in flags.chars().enumerate() {
            bits[i] = match ch {
                '0' => false,
                '1' => true,
                _ => anyhow::bail!("sample flags must be 0 or 1, got {:?}", flags),
            };
        }

        Ok(match kind {
            ModelKind::Lda => SampleFlags {
                alpha: bits[0],
                beta: bits[1],
                ..Default::default()
            },
            ModelKind::Background => SampleFlags {
                alpha: bits[0],
                gamma: bits[1],
                beta: bits[2],
                delta: bits[3],
                ..Default::default()
            },
            ModelKind::Register | ModelKind::ChunkRegister => SampleFlags {
                alpha: bits[0],
                gamma: bits[1],
                beta: bits[2],
                delta: bits[3],
                sigma: bits[4],
            },
        })
    }
}

/// Full run configuration for one model.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Model variant (capability flags).
    pub kind: ModelKind,
    /// Number of topics T.
    pub num_topics: usize,
    /// Number of registers R.
    pub num_registers: usize,
    /// Number of chunks C (chunk-conditioned variants).
    pub num_chunks: usize,
    /// Doc-topic concentrations (global, per-document).
    pub alpha: Vec<f64>,
    /// Switch concentration.
    pub gamma: Vec<f64>,
    /// Fixed asymmetric base prior over {topical, background}.
    pub switch_base: [f64; 2],
    /// Topic-word concentration.
    pub beta: Vec<f64>,
    /// Background-word concentrations (1, or 2 when chunk-conditioned).
    pub delta: Vec<f64>,
    /// Register-prior concentration.
    pub sigma: Vec<f64>,
    /// Gibbs sweeps to run.
    pub num_iterations: usize,
    /// Joint log-probability cadence (0 = never).
    pub print_interval: usize,
    /// State-snapshot cadence (0 = final snapshot only).
    pub save_state_interval: usize,
    /// Which hyperparameters to slice-sample after each sweep.
    pub sample_flags: SampleFlags,
    /// RNG seed; fixes the whole run.
    pub seed: u64,
    /// Slice-sampling iterations per hyperparameter update.
    pub hyper_iterations: usize,
    /// Slice-sampling bracket width (log space).
    pub hyper_step_size: f64,
    /// Per-word discount divisors for rare/unseen vocabulary.
    pub unseen_counts: Option<HashMap<usize, u32>>,
}

impl ModelConfig {
    /// Configuration with the conventional default hyperparameters:
    /// alpha = 0.1 T, gamma = 1, beta = 0.01 W, delta = 0.01 W,
    /// sigma = R, symmetric switch base.
    pub fn with_defaults(
        kind: ModelKind,
        num_topics: usize,
        num_registers: usize,
        num_chunks: usize,
        num_words: usize,
    ) -> Self {
        let t = num_topics as f64;
        let w = num_words as f64;
        let delta_len = if kind.chunked() { 2 } else { 1 };
        ModelConfig {
            kind,
            num_topics,
            num_registers,
            num_chunks,
            alpha: vec![0.1 * t; 2],
            gamma: vec![1.0],
            switch_base: [0.5, 0.5],
            beta: vec![0.01 * w],
            delta: vec![0.01 * w; delta_len],
            sigma: vec![num_registers as f64],
            num_iterations: 1000,
            print_interval: 100,
            save_state_interval: 0,
            sample_flags: SampleFlags::default(),
            seed: 1000,
            hyper_iterations: 5,
            hyper_step_size: 1.0,
            unseen_counts: None,
        }
    }

    /// Reject malformed configurations before any sampling happens.
    pub fn validate(&self, corpus: &Corpus) -> anyhow::Result<()> {
        ensure!(self.num_topics >= 1, "need at least one topic");
        ensure!(corpus.num_words() >= 1, "empty vocabulary");
        ensure!(self.alpha.len() == 2, "alpha must have 2 components");
        ensure!(self.beta.len() == 1, "beta must have 1 component");

        let positive = |name: &str, v: &[f64]| -> anyhow::Result<()> {
            ensure!(
                v.iter().all(|&x| x > 0.0 && x.is_finite()),
                "{} must be strictly positive and finite: {:?}",
                name,
                v
            );
            Ok(())
        };
        positive("alpha", &self.alpha)?;
        positive("beta", &self.beta)?;

        if self.kind.switching() {
            ensure!(self.num_registers >= 1, "need at least one register");
            ensure!(self.gamma.len() == 1, "gamma must have 1 component");
            positive("gamma", &self.gamma)?;
            positive("switch base", &self.switch_base)?;

            let delta_len = if self.kind.chunked() { 2 } else { 1 };
            ensure!(
                self.delta.len() == delta_len,
                "delta must have {} component(s) for {:?}",
                delta_len,
                self.kind
            );
            positive("delta", &self.delta)?;

            for (d, doc) in corpus.docs().iter().enumerate() {
                if let Some(r) = doc.register() {
                    ensure!(
                        r < self.num_registers,
                        "document {} register {} out of range (R = {})",
                        d,
                        r,
                        self.num_registers
                    );
                }
            }
        }

        if self.kind.latent_registers() {
            ensure!(self.sigma.len() == 1, "sigma must have 1 component");
            positive("sigma", &self.sigma)?;
        }

        if self.kind.chunked() {
            ensure!(self.num_chunks >= 1, "need at least one chunk");
            ensure!(
                corpus.num_chunks() <= self.num_chunks,
                "corpus chunk ids exceed C = {}",
                self.num_chunks
            );
        }

        if self.save_state_interval != 0 {
            ensure!(
                self.num_iterations % self.save_state_interval == 0,
                "save-state interval must divide the iteration count"
            );
        }

        Ok(())
    }
}

/// Outcome of a completed run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Sweeps performed (excluding the initializing pass).
    pub iterations: usize,
    /// Joint log probability at each logged iteration.
    pub log_probs: Vec<(usize, f64)>,
    /// Snapshot-sink failures encountered (inference itself continued).
    pub io_errors: Vec<anyhow::Error>,
}

/// The collapsed Gibbs sampler for one model run.
///
/// Owns every count table, the assignment arena, and the RNG for the
/// run's lifetime; the corpus is borrowed mutably only to write register
/// labels back.
pub struct Sampler {
    config: ModelConfig,
    rng: SmallRng,

    doc_topic: HierSmoother,
    topic_word: HierSmoother,
    switch: Option<HierSmoother>,
    background_word: Option<HierSmoother>,
    register_prior: Option<HierSmoother>,

    assignments: Assignments,

    // scratch for the T+1 outcome distribution and the R-way register draw
    outcome_weights: Vec<f64>,
    register_log_weights: Vec<f64>,

    initialized: bool,
    itn_offset: usize,
}

impl Sampler {
    /// Wire the smoothers implied by the configuration, with zero counts.
    pub fn new(config: ModelConfig, corpus: &Corpus) -> anyhow::Result<Self> {
        config.validate(corpus)?;

        let t = config.num_topics;
        let w = corpus.num_words();
        let d = corpus.len();
        let r = config.num_registers;
        let c = config.num_chunks;

        let doc_topic = HierSmoother::new(
            BaseMeasure::Uniform(t),
            t,
            &[1, d],
            config.alpha.clone(),
            true,
        );

        let topic_word =
            HierSmoother::new(BaseMeasure::Uniform(w), w, &[t], config.beta.clone(), false)
                .with_unseen(config.unseen_counts.clone());

        let switch = config.kind.switching().then(|| {
            let contexts = if config.kind.chunked() { c } else { 1 };
            HierSmoother::new(
                BaseMeasure::Fixed(config.switch_base.to_vec()),
                2,
                &[contexts],
                config.gamma.clone(),
                false,
            )
        });

        let background_word = config.kind.switching().then(|| {
            if config.kind.chunked() {
                HierSmoother::new(
                    BaseMeasure::Uniform(w),
                    w,
                    &[r, r * c],
                    config.delta.clone(),
                    true,
                )
                .with_unseen(config.unseen_counts.clone())
            } else {
                HierSmoother::new(BaseMeasure::Uniform(w), w, &[r], config.delta.clone(), false)
                    .with_unseen(config.unseen_counts.clone())
            }
        });

        let register_prior = config.kind.latent_registers().then(|| {
            HierSmoother::new(BaseMeasure::Uniform(r), r, &[1], config.sigma.clone(), false)
        });

        let rng = SmallRng::seed_from_u64(config.seed);
        let assignments = Assignments::for_corpus(corpus);
        let outcome_weights = vec![0.0; t + 1];
        let register_log_weights = vec![0.0; r];

        Ok(Sampler {
            config,
            rng,
            doc_topic,
            topic_word,
            switch,
            background_word,
            register_prior,
            assignments,
            outcome_weights,
            register_log_weights,
            initialized: false,
            itn_offset: 0,
        })
    }

    /// Resume from a previous run's assignment state.
    ///
    /// Registers must already be present on the corpus documents for
    /// switching variants; counts are rebuilt by replaying the state.
    /// `itn_offset` tags subsequent snapshots.
    pub fn with_initial_state(
        config: ModelConfig,
        corpus: &Corpus,
        state: Assignments,
        itn_offset: usize,
    ) -> anyhow::Result<Self> {
        let mut sampler = Sampler::new(config, corpus)?;

        ensure!(
            state.num_docs() == corpus.len() && state.len() == corpus.num_tokens(),
            "initial state shape does not match the corpus"
        );

        sampler.assignments = state;
        sampler.itn_offset = itn_offset;

        for d in 0..corpus.len() {
            let doc = corpus.doc(d);
            let r = if sampler.config.kind.switching() {
                let r = doc
                    .register()
                    .with_context(|| format!("document {} has no register", d))?;
                if let Some(rp) = sampler.register_prior.as_mut() {
                    rp.increment(r, &[0]);
                }
                r
            } else {
                0
            };

            for i in 0..doc.len() {
                let w = doc.token(i);
                let c = if sampler.config.kind.chunked() {
                    doc.chunk(i)
                } else {
                    0
                };
                match sampler.assignments.get(d, i) {
                    TokenState::Topic(j) => {
                        ensure!(j < sampler.config.num_topics, "topic {} out of range", j);
                        if let Some(sw) = sampler.switch.as_mut() {
                            sw.increment(0, &[c]);
                        }
                        sampler.topic_word.increment(w, &[j]);
                        sampler.doc_topic.increment(j, &[0, d]);
                    }
                    TokenState::Background => {
                        ensure!(
                            sampler.config.kind.switching(),
                            "background state in a non-switching model"
                        );
                        if let Some(sw) = sampler.switch.as_mut() {
                            sw.increment(1, &[c]);
                        }
                        if let Some(bg) = sampler.background_word.as_mut() {
                            let (ctxs, len) = background_ctxs(
                                sampler.config.kind.chunked(),
                                sampler.config.num_chunks,
                                r,
                                c,
                            );
                            bg.increment(w, &ctxs[..len]);
                        }
                    }
                }
            }
        }

        sampler.initialized = true;
        Ok(sampler)
    }

    /// The run configuration.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Current switch/topic state.
    pub fn assignments(&self) -> &Assignments {
        &self.assignments
    }

    /// Doc-topic factor (alpha lives in its pseudo-counts).
    pub fn doc_topic(&self) -> &HierSmoother {
        &self.doc_topic
    }

    /// Topic-word factor.
    pub fn topic_word(&self) -> &HierSmoother {
        &self.topic_word
    }

    /// Switch factor, when the variant models one.
    pub fn switch_factor(&self) -> Option<&HierSmoother> {
        self.switch.as_ref()
    }

    /// Background word factor, when the variant models one.
    pub fn background_word(&self) -> Option<&HierSmoother> {
        self.background_word.as_ref()
    }

    /// Register prior, when registers are latent.
    pub fn register_prior(&self) -> Option<&HierSmoother> {
        self.register_prior.as_ref()
    }

    /// Run the configured number of sweeps, emitting snapshots to `sink`.
    ///
    /// Sink failures are logged and collected into the summary; they never
    /// abort sampling or touch the inference state.
    pub fn run(
        &mut self,
        corpus: &mut Corpus,
        sink: &mut dyn SnapshotSink,
    ) -> anyhow::Result<RunSummary> {
        info!(
            "{:?}: {} docs, {} words, T = {}{}",
            self.config.kind,
            corpus.len(),
            corpus.num_words(),
            self.config.num_topics,
            if self.config.kind.switching() {
                format!(
                    ", R = {}, C = {}",
                    self.config.num_registers, self.config.num_chunks
                )
            } else {
                String::new()
            }
        );

        let mut summary = RunSummary::default();

        if !self.initialized {
            self.sweep(corpus, true);
            self.initialized = true;
        }

        let num_itns = self.config.num_iterations;
        let progress = ProgressBar::new(num_itns as u64);

        for s in 1..=num_itns {
            self.sweep(corpus, false);
            self.update_hyperparameters(corpus);

            let itn = self.itn_offset + s;

            if self.config.print_interval != 0 && s % self.config.print_interval == 0 {
                self.log_summaries(corpus);
                let lp = self.joint_log_prob(corpus);
                info!("iteration {}: joint log prob {:.4}", itn, lp);
                summary.log_probs.push((itn, lp));
                record(&mut summary, sink.log_prob(itn, lp));
            }

            if self.config.save_state_interval != 0 && s % self.config.save_state_interval == 0 {
                record(&mut summary, sink.state(Some(itn), corpus, &self.assignments));
                self.emit_hyperparams(sink, Some(itn), &mut summary);
            }

            progress.inc(1);
        }
        progress.finish_and_clear();

        if self.config.save_state_interval == 0 {
            record(&mut summary, sink.state(None, corpus, &self.assignments));
            self.emit_hyperparams(sink, None, &mut summary);
        }

        summary.iterations = num_itns;
        Ok(summary)
    }

    /// Snapshot all counts as the training baseline and re-shape the
    /// document-indexed state for `heldout`, so that subsequent resets
    /// restore training statistics instead of zeroing them.
    pub fn lock(&mut self, heldout: &Corpus) {
        self.doc_topic.lock();
        self.doc_topic.resize_level(1, heldout.len());
        self.topic_word.lock();
        if let Some(sw) = self.switch.as_mut() {
            sw.lock();
        }
        if let Some(bg) = self.background_word.as_mut() {
            bg.lock();
        }
        if let Some(rp) = self.register_prior.as_mut() {
            rp.lock();
        }
        self.assignments = Assignments::for_corpus(heldout);
        self.initialized = false;
    }

    /// Joint log probability of the current state: the sum of each wired
    /// factor's replayed log predictive probability.
    pub fn joint_log_prob(&mut self, corpus: &Corpus) -> f64 {
        let chunks = self.config.kind.chunked().then_some(self.config.num_chunks);

        let mut lp = 0.0;
        if let Some(rp) = self.register_prior.as_mut() {
            lp += register_log_prob(rp, corpus);
        }
        if let Some(sw) = self.switch.as_mut() {
            lp += switch_log_prob(sw, corpus, &self.assignments, chunks.is_some());
        }
        lp += topic_word_log_prob(&mut self.topic_word, corpus, &self.assignments);
        lp += doc_topic_log_prob(&mut self.doc_topic, corpus, &self.assignments);
        if let Some(bg) = self.background_word.as_mut() {
            lp += background_word_log_prob(bg, corpus, &self.assignments, chunks);
        }
        lp
    }

    fn sweep(&mut self, corpus: &mut Corpus, init: bool) {
        for d in 0..corpus.len() {
            if self.config.kind.latent_registers() {
                self.resample_register(corpus, d, init);
            } else if init && self.config.kind.switching() && corpus.doc(d).register().is_none() {
                // observed-register variant: unlabeled documents share register 0
                corpus.doc_mut(d).set_register(0);
            }
            self.resample_tokens(corpus, d, init);
        }
    }

    fn resample_register(&mut self, corpus: &mut Corpus, d: usize, init: bool) {
        let num_registers = self.config.num_registers;
        let chunked = self.config.kind.chunked();
        let num_chunks = self.config.num_chunks;

        let (Some(rp), Some(bg)) = (self.register_prior.as_mut(), self.background_word.as_mut())
        else {
            return;
        };

        if init {
            let r_new = if num_registers > 1 {
                self.rng.random_range(0..num_registers)
            } else {
                0
            };
            corpus.doc_mut(d).set_register(r_new);
            rp.increment(r_new, &[0]);
            return;
        }

        let doc = corpus.doc(d);
        let states = self.assignments.doc(d);

        let r_old = doc.register().unwrap_or(0);
        rp.decrement(r_old, &[0]);
        for (i, state) in states.iter().enumerate() {
            if *state == TokenState::Background {
                let (ctxs, len) = background_ctxs(chunked, num_chunks, r_old, doc.chunk(i));
                bg.decrement(doc.token(i), &ctxs[..len]);
            }
        }

        let r_new = if num_registers > 1 {
            for r in 0..num_registers {
                let mut log_score = rp.score(r, &[0]).ln();

                for (i, state) in states.iter().enumerate() {
                    if *state == TokenState::Background {
                        let (ctxs, len) = background_ctxs(chunked, num_chunks, r, doc.chunk(i));
                        log_score += bg.score(doc.token(i), &ctxs[..len]).ln();
                        bg.increment(doc.token(i), &ctxs[..len]);
                    }
                }

                self.register_log_weights[r] = log_score;

                for (i, state) in states.iter().enumerate() {
                    if *state == TokenState::Background {
                        let (ctxs, len) = background_ctxs(chunked, num_chunks, r, doc.chunk(i));
                        bg.decrement(doc.token(i), &ctxs[..len]);
                    }
                }
            }

            sample_discrete_log(&self.register_log_weights, &mut self.rng)
        } else {
            0
        };

        rp.increment(r_new, &[0]);
        for (i, state) in states.iter().enumerate() {
            if *state == TokenState::Background {
                let (ctxs, len) = background_ctxs(chunked, num_chunks, r_new, doc.chunk(i));
                bg.increment(doc.token(i), &ctxs[..len]);
            }
        }
        corpus.doc_mut(d).set_register(r_new);
    }

    fn resample_tokens(&mut self, corpus: &Corpus, d: usize, init: bool) {
        let t = self.config.num_topics;
        let switching = self.config.kind.switching();
        let chunked = self.config.kind.chunked();
        let num_chunks = self.config.num_chunks;

        let doc = corpus.doc(d);
        let r = doc.register().unwrap_or(0);

        for i in 0..doc.len() {
            let w = doc.token(i);
            let c = if chunked { doc.chunk(i) } else { 0 };

            if !init {
                match self.assignments.get(d, i) {
                    TokenState::Topic(j) => {
                        if let Some(sw) = self.switch.as_mut() {
                            sw.decrement(0, &[c]);
                        }
                        self.topic_word.decrement(w, &[j]);
                        self.doc_topic.decrement(j, &[0, d]);
                    }
                    TokenState::Background => {
                        if let Some(sw) = self.switch.as_mut() {
                            sw.decrement(1, &[c]);
                        }
                        if let Some(bg) = self.background_word.as_mut() {
                            let (ctxs, len) = background_ctxs(chunked, num_chunks, r, c);
                            bg.decrement(w, &ctxs[..len]);
                        }
                    }
                }
            }

            let mut total = 0.0;
            let switch_topical = self
                .switch
                .as_ref()
                .map_or(1.0, |sw| sw.score(0, &[c]));

            for j in 0..t {
                let score =
                    switch_topical * self.topic_word.score(w, &[j]) * self.doc_topic.score(j, &[0, d]);
                self.outcome_weights[j] = score;
                total += score;
            }

            let num_outcomes = if switching {
                // background outcome T
                let mut score = 0.0;
                if let (Some(sw), Some(bg)) = (self.switch.as_ref(), self.background_word.as_ref())
                {
                    let (ctxs, len) = background_ctxs(chunked, num_chunks, r, c);
                    score = sw.score(1, &[c]) * bg.score(w, &ctxs[..len]);
                }
                self.outcome_weights[t] = score;
                total += score;
                t + 1
            } else {
                t
            };

            let pick = sample_discrete(&self.outcome_weights[..num_outcomes], total, &mut self.rng);

            let new_state = if pick < t {
                TokenState::Topic(pick)
            } else {
                TokenState::Background
            };
            self.assignments.set(d, i, new_state);

            match new_state {
                TokenState::Topic(j) => {
                    if let Some(sw) = self.switch.as_mut() {
                        sw.increment(0, &[c]);
                    }
                    self.topic_word.increment(w, &[j]);
                    self.doc_topic.increment(j, &[0, d]);
                }
                TokenState::Background => {
                    if let Some(sw) = self.switch.as_mut() {
                        sw.increment(1, &[c]);
                    }
                    if let Some(bg) = self.background_word.as_mut() {
                        let (ctxs, len) = background_ctxs(chunked, num_chunks, r, c);
                        bg.increment(w, &ctxs[..len]);
                    }
                }
            }
        }
    }

    fn update_hyperparameters(&mut self, corpus: &Corpus) {
        let flags = self.config.sample_flags;
        let iterations = self.config.hyper_iterations;
        let step = self.config.hyper_step_size;
        let chunks = self.config.kind.chunked().then_some(self.config.num_chunks);

        if flags.alpha {
            let Sampler {
                ref mut doc_topic,
                ref mut rng,
                ref assignments,
                ..
            } = *self;
            doc_topic.sample_hyper(rng, iterations, step, |s| {
                doc_topic_log_prob(s, corpus, assignments)
            });
        }

        if flags.gamma {
            let Sampler {
                ref mut switch,
                ref mut rng,
                ref assignments,
                ..
            } = *self;
            if let Some(sw) = switch.as_mut() {
                sw.sample_hyper(rng, iterations, step, |s| {
                    switch_log_prob(s, corpus, assignments, chunks.is_some())
                });
            }
        }

        if flags.beta {
            let Sampler {
                ref mut topic_word,
                ref mut rng,
                ref assignments,
                ..
            } = *self;
            topic_word.sample_hyper(rng, iterations, step, |s| {
                topic_word_log_prob(s, corpus, assignments)
            });
        }

        if flags.delta {
            let Sampler {
                ref mut background_word,
                ref mut rng,
                ref assignments,
                ..
            } = *self;
            if let Some(bg) = background_word.as_mut() {
                bg.sample_hyper(rng, iterations, step, |s| {
                    background_word_log_prob(s, corpus, assignments, chunks)
                });
            }
        }

        if flags.sigma {
            let Sampler {
                ref mut register_prior,
                ref mut rng,
                ..
            } = *self;
            if let Some(rp) = register_prior.as_mut() {
                rp.sample_hyper(rng, iterations, step, |s| register_log_prob(s, corpus));
            }
        }
    }

    fn log_summaries(&self, corpus: &Corpus) {
        let vocab = corpus.vocab();
        let render = |top: &[(usize, f64)]| {
            top.iter()
                .map(|&(w, _)| vocab.word(w))
                .collect::<Vec<_>>()
                .join(" ")
        };

        for j in 0..self.config.num_topics {
            let top = top_items(
                corpus.num_words(),
                Some(10),
                0.0,
                |w| self.topic_word.score(w, &[j]),
            );
            info!("topic {}: {}", j, render(&top));
        }

        if let Some(bg) = self.background_word.as_ref() {
            let chunk_span = if self.config.kind.chunked() {
                self.config.num_chunks
            } else {
                1
            };
            for c in 0..chunk_span {
                for r in 0..self.config.num_registers {
                    let top = top_items(corpus.num_words(), Some(10), 0.0, |w| {
                        if self.config.kind.chunked() {
                            bg.score(w, &[r, r * self.config.num_chunks + c])
                        } else {
                            bg.score(w, &[r])
                        }
                    });
                    if self.config.kind.chunked() {
                        info!("chunk {}, register {}: {}", c, r, render(&top));
                    } else {
                        info!("register {}: {}", r, render(&top));
                    }
                }
            }
        }
    }

    fn emit_hyperparams(
        &self,
        sink: &mut dyn SnapshotSink,
        itn: Option<usize>,
        summary: &mut RunSummary,
    ) {
        record(summary, sink.hyperparams(itn, "alpha", self.doc_topic.pseudo()));
        if let Some(sw) = self.switch.as_ref() {
            record(summary, sink.hyperparams(itn, "gamma", sw.pseudo()));
        }
        record(summary, sink.hyperparams(itn, "beta", self.topic_word.pseudo()));
        if let Some(bg) = self.background_word.as_ref() {
            record(summary, sink.hyperparams(itn, "delta", bg.pseudo()));
        }
        if let Some(rp) = self.register_prior.as_ref() {
            record(summary, sink.hyperparams(itn, "sigma", rp.pseudo()));
        }
    }
}

/// Background word contexts for register `r`, chunk `c`.
#[inline]
fn background_ctxs(chunked: bool, num_chunks: usize, r: usize, c: usize) -> ([usize; 2], usize) {
    if chunked {
        ([r, r * num_chunks + c], 2)
    } else {
        ([r, 0], 1)
    }
}

fn record(summary: &mut RunSummary, result: anyhow::Result<()>) {
    if let Err(e) = result {
        warn!("snapshot emission failed: {:#}", e);
        summary.io_errors.push(e);
    }
}
