use doc_corpus::{Corpus, Document, Vocab};
use topic_sampler::assign::TokenState;
use topic_sampler::engine::{ModelConfig, ModelKind, SampleFlags, Sampler};
use topic_sampler::likelihood::{
    background_word_log_prob, doc_topic_log_prob, register_log_prob, switch_log_prob,
    topic_word_log_prob,
};
use topic_sampler::report::{NullSink, SnapshotSink};
use topic_sampler::smoother::{BaseMeasure, HierSmoother};

fn small_corpus() -> Corpus {
    let mut vocab = Vocab::new();
    let words: Vec<usize> = ["a", "b", "c", "d"].iter().map(|w| vocab.intern(w)).collect();

    let mut corpus = Corpus::new(vocab);
    corpus.push(Document::without_chunks(
        "d0",
        vec![words[0], words[1], words[0], words[2], words[3]],
    ));
    corpus.push(Document::without_chunks(
        "d1",
        vec![words[3], words[3], words[1], words[2], words[0]],
    ));
    corpus
}

fn chunked_corpus() -> Corpus {
    let mut vocab = Vocab::new();
    let a = vocab.intern("a");
    let b = vocab.intern("b");
    let c = vocab.intern("c");

    let mut corpus = Corpus::new(vocab);
    corpus.push(Document::new("d0", vec![a, b, a, c], vec![0, 0, 1, 1]).unwrap());
    corpus.push(Document::new("d1", vec![c, b, b], vec![1, 0, 1]).unwrap());
    corpus
}

fn quick_config(kind: ModelKind, corpus: &Corpus, num_topics: usize) -> ModelConfig {
    let mut config = ModelConfig::with_defaults(
        kind,
        num_topics,
        2,
        corpus.num_chunks(),
        corpus.num_words(),
    );
    config.num_iterations = 5;
    config.print_interval = 0;
    config.seed = 17;
    config
}

#[test]
fn degenerate_single_outcome_always_topic_zero() -> anyhow::Result<()> {
    let mut vocab = Vocab::new();
    let w = vocab.intern("only");
    let mut corpus = Corpus::new(vocab);
    corpus.push(Document::without_chunks("d0", vec![w]));

    let mut config = quick_config(ModelKind::Lda, &corpus, 1);
    config.num_iterations = 20;

    let mut sampler = Sampler::new(config, &corpus)?;
    sampler.run(&mut corpus, &mut NullSink)?;

    assert_eq!(sampler.assignments().get(0, 0), TokenState::Topic(0));
    Ok(())
}

#[test]
fn joint_log_prob_is_sum_of_independent_factor_replays() -> anyhow::Result<()> {
    let mut corpus = small_corpus();
    let config = quick_config(ModelKind::Register, &corpus, 2);

    let mut sampler = Sampler::new(config.clone(), &corpus)?;
    sampler.run(&mut corpus, &mut NullSink)?;

    let joint = sampler.joint_log_prob(&corpus);

    // rebuild each factor from scratch and replay independently
    let t = config.num_topics;
    let w = corpus.num_words();
    let r = config.num_registers;
    let d = corpus.len();
    let assign = sampler.assignments();

    let mut expected = 0.0;
    let mut register_prior =
        HierSmoother::new(BaseMeasure::Uniform(r), r, &[1], config.sigma.clone(), false);
    expected += register_log_prob(&mut register_prior, &corpus);

    let mut switch = HierSmoother::new(
        BaseMeasure::Fixed(config.switch_base.to_vec()),
        2,
        &[1],
        config.gamma.clone(),
        false,
    );
    expected += switch_log_prob(&mut switch, &corpus, assign, false);

    let mut topic_word =
        HierSmoother::new(BaseMeasure::Uniform(w), w, &[t], config.beta.clone(), false);
    expected += topic_word_log_prob(&mut topic_word, &corpus, assign);

    let mut doc_topic = HierSmoother::new(
        BaseMeasure::Uniform(t),
        t,
        &[1, d],
        config.alpha.clone(),
        true,
    );
    expected += doc_topic_log_prob(&mut doc_topic, &corpus, assign);

    let mut background =
        HierSmoother::new(BaseMeasure::Uniform(w), w, &[r], config.delta.clone(), false);
    expected += background_word_log_prob(&mut background, &corpus, assign, None);

    assert_eq!(joint.to_bits(), expected.to_bits());
    assert!(joint.is_finite() && joint < 0.0);
    Ok(())
}

#[test]
fn fixed_seed_runs_are_identical() -> anyhow::Result<()> {
    let run = |seed: u64| -> anyhow::Result<(Vec<i64>, f64)> {
        let mut corpus = small_corpus();
        let mut config = quick_config(ModelKind::Register, &corpus, 3);
        config.seed = seed;
        config.sample_flags = SampleFlags::parse(ModelKind::Register, "11111")?;

        let mut sampler = Sampler::new(config, &corpus)?;
        sampler.run(&mut corpus, &mut NullSink)?;

        let states: Vec<i64> = (0..corpus.len())
            .flat_map(|d| {
                sampler
                    .assignments()
                    .doc(d)
                    .iter()
                    .map(|s| s.topic_or_sentinel())
                    .collect::<Vec<_>>()
            })
            .collect();
        let lp = sampler.joint_log_prob(&corpus);
        Ok((states, lp))
    };

    let (states_a, lp_a) = run(99)?;
    let (states_b, lp_b) = run(99)?;
    assert_eq!(states_a, states_b);
    assert_eq!(lp_a.to_bits(), lp_b.to_bits());

    let (_, lp_c) = run(100)?;
    assert_ne!(
        lp_a.to_bits(),
        lp_c.to_bits(),
        "different seeds should diverge"
    );
    Ok(())
}

#[test]
fn sampled_hyperparameters_stay_positive() -> anyhow::Result<()> {
    let mut corpus = chunked_corpus();
    let mut config = quick_config(ModelKind::ChunkRegister, &corpus, 2);
    config.sample_flags = SampleFlags::parse(ModelKind::ChunkRegister, "11111")?;
    config.num_iterations = 10;

    let mut sampler = Sampler::new(config, &corpus)?;
    sampler.run(&mut corpus, &mut NullSink)?;

    let all_positive = |v: &[f64]| v.iter().all(|&x| x > 0.0 && x.is_finite());
    assert!(all_positive(sampler.doc_topic().pseudo()));
    assert!(all_positive(sampler.topic_word().pseudo()));
    assert!(all_positive(sampler.switch_factor().unwrap().pseudo()));
    assert!(all_positive(sampler.background_word().unwrap().pseudo()));
    assert!(all_positive(sampler.register_prior().unwrap().pseudo()));
    assert_eq!(sampler.background_word().unwrap().pseudo().len(), 2);
    Ok(())
}

#[test]
fn count_normalizers_stay_consistent_after_a_run() -> anyhow::Result<()> {
    let mut corpus = chunked_corpus();
    let config = quick_config(ModelKind::ChunkRegister, &corpus, 2);

    let mut sampler = Sampler::new(config, &corpus)?;
    sampler.run(&mut corpus, &mut NullSink)?;

    let check = |s: &HierSmoother| {
        for l in 0..s.num_levels() {
            let table = s.level(l);
            for ctx in 0..table.num_contexts() {
                let total: u32 = (0..table.num_items()).map(|i| table.count(i, ctx)).sum();
                assert_eq!(total, table.norm(ctx));
            }
        }
    };

    check(sampler.doc_topic());
    check(sampler.topic_word());
    check(sampler.switch_factor().unwrap());
    check(sampler.background_word().unwrap());
    check(sampler.register_prior().unwrap());

    // every token is accounted for exactly once in the switch factor
    let switch = sampler.switch_factor().unwrap();
    let total: u32 = (0..switch.level(0).num_contexts())
        .map(|c| switch.level(0).norm(c))
        .sum();
    assert_eq!(total as usize, corpus.num_tokens());
    Ok(())
}

#[test]
fn background_variant_fixes_registers_at_zero() -> anyhow::Result<()> {
    let mut corpus = small_corpus();
    let mut config = quick_config(ModelKind::Background, &corpus, 2);
    config.num_registers = 1;
    config.sigma = vec![1.0];

    let mut sampler = Sampler::new(config, &corpus)?;
    sampler.run(&mut corpus, &mut NullSink)?;

    for d in 0..corpus.len() {
        assert_eq!(corpus.doc(d).register(), Some(0));
    }
    Ok(())
}

#[test]
fn latent_registers_are_assigned_in_range() -> anyhow::Result<()> {
    let mut corpus = small_corpus();
    let mut config = quick_config(ModelKind::Register, &corpus, 2);
    config.num_registers = 3;
    config.sigma = vec![3.0];

    let mut sampler = Sampler::new(config, &corpus)?;
    sampler.run(&mut corpus, &mut NullSink)?;

    for d in 0..corpus.len() {
        let r = corpus.doc(d).register().unwrap();
        assert!(r < 3);
    }
    Ok(())
}

#[test]
fn nonchunked_variants_ignore_chunk_annotations() -> anyhow::Result<()> {
    // the shared loader accepts `word:chunk` for every variant, so a
    // chunk-annotated corpus must run under the flat switch factor too
    let mut corpus = chunked_corpus();
    let mut config = quick_config(ModelKind::Register, &corpus, 2);
    config.sample_flags = SampleFlags::parse(ModelKind::Register, "11111")?;
    config.print_interval = 1;

    let mut sampler = Sampler::new(config, &corpus)?;
    let summary = sampler.run(&mut corpus, &mut NullSink)?;

    assert_eq!(summary.log_probs.len(), 5);
    let lp = sampler.joint_log_prob(&corpus);
    assert!(lp.is_finite() && lp < 0.0);
    Ok(())
}

#[test]
fn resumed_run_reproduces_the_counts() -> anyhow::Result<()> {
    let mut corpus = small_corpus();
    let config = quick_config(ModelKind::Register, &corpus, 2);

    let mut first = Sampler::new(config.clone(), &corpus)?;
    first.run(&mut corpus, &mut NullSink)?;

    let state = first.assignments().clone();
    let mut resumed = Sampler::with_initial_state(config, &corpus, state, 5)?;

    // live tables must match cell for cell, before any replay runs
    let same_counts = |a: &HierSmoother, b: &HierSmoother| {
        assert_eq!(a.num_levels(), b.num_levels());
        for l in 0..a.num_levels() {
            let (ta, tb) = (a.level(l), b.level(l));
            assert_eq!(ta.num_contexts(), tb.num_contexts());
            for ctx in 0..ta.num_contexts() {
                assert_eq!(ta.norm(ctx), tb.norm(ctx), "level {} ctx {}", l, ctx);
                for i in 0..ta.num_items() {
                    assert_eq!(ta.count(i, ctx), tb.count(i, ctx), "level {} ctx {}", l, ctx);
                }
            }
        }
    };
    same_counts(first.doc_topic(), resumed.doc_topic());
    same_counts(first.topic_word(), resumed.topic_word());
    same_counts(
        first.switch_factor().unwrap(),
        resumed.switch_factor().unwrap(),
    );
    same_counts(
        first.background_word().unwrap(),
        resumed.background_word().unwrap(),
    );
    same_counts(
        first.register_prior().unwrap(),
        resumed.register_prior().unwrap(),
    );

    let lp_first = first.joint_log_prob(&corpus);
    let lp_resumed = resumed.joint_log_prob(&corpus);
    assert_eq!(lp_first.to_bits(), lp_resumed.to_bits());
    Ok(())
}

#[test]
fn malformed_configurations_are_rejected_before_sampling() {
    let corpus = small_corpus();

    let mut config = quick_config(ModelKind::Register, &corpus, 2);
    config.alpha = vec![0.1];
    assert!(Sampler::new(config, &corpus).is_err());

    let mut config = quick_config(ModelKind::Register, &corpus, 2);
    config.beta = vec![-1.0];
    assert!(Sampler::new(config, &corpus).is_err());

    let mut config = quick_config(ModelKind::ChunkRegister, &corpus, 2);
    config.delta = vec![1.0];
    assert!(Sampler::new(config, &corpus).is_err(), "chunked delta needs 2");

    let chunked = chunked_corpus();
    let mut config = quick_config(ModelKind::ChunkRegister, &chunked, 2);
    config.num_chunks = 1; // corpus uses chunk id 1
    assert!(Sampler::new(config, &chunked).is_err());

    assert!(SampleFlags::parse(ModelKind::Register, "111").is_err());
    assert!(SampleFlags::parse(ModelKind::Lda, "12").is_err());
    assert!(SampleFlags::parse(ModelKind::Lda, "10").is_ok());
}

#[test]
fn sink_failures_do_not_abort_the_run() -> anyhow::Result<()> {
    struct FailingSink;

    impl SnapshotSink for FailingSink {
        fn log_prob(&mut self, _itn: usize, _value: f64) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
        fn state(
            &mut self,
            _itn: Option<usize>,
            _corpus: &Corpus,
            _assignments: &topic_sampler::Assignments,
        ) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
        fn hyperparams(
            &mut self,
            _itn: Option<usize>,
            _name: &str,
            _values: &[f64],
        ) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
    }

    let mut corpus = small_corpus();
    let mut config = quick_config(ModelKind::Register, &corpus, 2);
    config.print_interval = 1;

    let mut sampler = Sampler::new(config, &corpus)?;
    let summary = sampler.run(&mut corpus, &mut FailingSink)?;

    assert_eq!(summary.iterations, 5);
    assert!(!summary.io_errors.is_empty());
    assert_eq!(summary.log_probs.len(), 5, "log probs still tracked in memory");
    Ok(())
}

#[test]
fn lock_preserves_training_statistics_for_heldout_evaluation() -> anyhow::Result<()> {
    let mut corpus = small_corpus();
    let config = quick_config(ModelKind::Register, &corpus, 2);

    let mut sampler = Sampler::new(config, &corpus)?;
    sampler.run(&mut corpus, &mut NullSink)?;

    let trained_word_score = sampler.topic_word().score(0, &[0]);

    let mut heldout = {
        let mut vocab = Vocab::new();
        for w in ["a", "b", "c", "d"] {
            vocab.intern(w);
        }
        let mut heldout = Corpus::new(vocab);
        heldout.push(Document::without_chunks("h0", vec![0, 1, 2]));
        heldout
    };

    sampler.lock(&heldout);
    sampler.run(&mut heldout, &mut NullSink)?;

    // replay resets to the locked baseline, so training statistics survive
    let _ = sampler.joint_log_prob(&heldout);
    let restored = sampler.topic_word().score(0, &[0]);
    assert!(restored > 0.0 && restored < 1.0);
    assert!(trained_word_score > 0.0);
    Ok(())
}
