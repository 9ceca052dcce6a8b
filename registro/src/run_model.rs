use crate::common::*;
use crate::dumps;
use crate::sink::FileSink;

use anyhow::Context;
use doc_corpus::loader::load_instance_list;
use std::collections::HashMap;
use topic_sampler::engine::SampleFlags;
use topic_sampler::{Assignments, ModelConfig, ModelKind, Sampler, TokenState};

#[derive(Args, Debug)]
pub struct SharedArgs {
    /// instance list file (`source<TAB>word[:chunk] ...`), plain or gzipped
    #[arg(short, long, required = true)]
    input: Box<str>,

    /// output directory
    #[arg(short, long, required = true)]
    output: Box<str>,

    /// number of topics
    #[arg(short = 't', long, default_value_t = 10)]
    num_topics: usize,

    /// Gibbs sweeps to run
    #[arg(long, default_value_t = 1000)]
    num_iterations: usize,

    /// joint log-probability cadence (0 = never)
    #[arg(long, default_value_t = 100)]
    print_interval: usize,

    /// state snapshot cadence (0 = final state only)
    #[arg(long, default_value_t = 0)]
    save_state_interval: usize,

    /// doc-topic concentrations (global, per-document)
    #[arg(long, value_delimiter = ',', num_args = 2)]
    alpha: Option<Vec<f64>>,

    /// topic-word concentration
    #[arg(long)]
    beta: Option<f64>,

    /// random seed
    #[arg(long, default_value_t = 1000)]
    seed: u64,

    /// slice-sampling iterations per hyperparameter update
    #[arg(long, default_value_t = 5)]
    hyper_iterations: usize,

    /// slice-sampling bracket width (log space)
    #[arg(long, default_value_t = 1.0)]
    hyper_step_size: f64,

    /// per-word discount file (`word count` per line)
    #[arg(long)]
    unseen_counts: Option<Box<str>>,

    /// resume from a saved state file, replaying its assignments
    #[arg(long)]
    resume: Option<Box<str>>,

    /// iteration offset tagging the snapshots of a resumed run
    #[arg(long, default_value_t = 0)]
    resume_itn: usize,

    /// cap the per-topic/register word dumps (full sorted distributions
    /// when omitted)
    #[arg(long)]
    num_top_words: Option<usize>,
}

#[derive(Args, Debug)]
pub struct SwitchArgs {
    /// switch concentration
    #[arg(long)]
    gamma: Option<f64>,

    /// base prior over {topical, background}
    #[arg(long, value_delimiter = ',', num_args = 2, default_values_t = [0.5, 0.5])]
    switch_base: Vec<f64>,

    /// background-word concentration(s)
    #[arg(long, value_delimiter = ',')]
    delta: Option<Vec<f64>>,
}

#[derive(Args, Debug)]
pub struct LdaArgs {
    #[command(flatten)]
    shared: SharedArgs,

    /// hyperparameter sampling flags (alpha, beta)
    #[arg(long, default_value = "00")]
    sample_flags: Box<str>,
}

#[derive(Args, Debug)]
pub struct BackgroundArgs {
    #[command(flatten)]
    shared: SharedArgs,

    #[command(flatten)]
    switch: SwitchArgs,

    /// hyperparameter sampling flags (alpha, gamma, beta, delta)
    #[arg(long, default_value = "0000")]
    sample_flags: Box<str>,
}

#[derive(Args, Debug)]
pub struct RegisterArgs {
    #[command(flatten)]
    shared: SharedArgs,

    #[command(flatten)]
    switch: SwitchArgs,

    /// number of latent registers
    #[arg(short = 'r', long, required = true)]
    num_registers: usize,

    /// register-prior concentration
    #[arg(long)]
    sigma: Option<f64>,

    /// hyperparameter sampling flags (alpha, gamma, beta, delta, sigma)
    #[arg(long, default_value = "00000")]
    sample_flags: Box<str>,
}

#[derive(Args, Debug)]
pub struct ChunkRegisterArgs {
    #[command(flatten)]
    shared: SharedArgs,

    #[command(flatten)]
    switch: SwitchArgs,

    /// number of latent registers
    #[arg(short = 'r', long, required = true)]
    num_registers: usize,

    /// number of chunks (inferred from the corpus when omitted)
    #[arg(short = 'c', long)]
    num_chunks: Option<usize>,

    /// register-prior concentration
    #[arg(long)]
    sigma: Option<f64>,

    /// hyperparameter sampling flags (alpha, gamma, beta, delta, sigma)
    #[arg(long, default_value = "00000")]
    sample_flags: Box<str>,
}

pub fn run_lda(args: &LdaArgs) -> anyhow::Result<()> {
    let mut corpus = load_corpus(&args.shared)?;

    let mut config =
        ModelConfig::with_defaults(ModelKind::Lda, args.shared.num_topics, 1, 1, corpus.num_words());
    apply_shared(&mut config, &args.shared, &corpus)?;
    config.sample_flags = SampleFlags::parse(ModelKind::Lda, &args.sample_flags)?;

    run_model(config, &mut corpus, &args.shared)
}

pub fn run_background(args: &BackgroundArgs) -> anyhow::Result<()> {
    let mut corpus = load_corpus(&args.shared)?;

    let mut config = ModelConfig::with_defaults(
        ModelKind::Background,
        args.shared.num_topics,
        1,
        1,
        corpus.num_words(),
    );
    apply_shared(&mut config, &args.shared, &corpus)?;
    apply_switch(&mut config, &args.switch);
    config.sample_flags = SampleFlags::parse(ModelKind::Background, &args.sample_flags)?;

    run_model(config, &mut corpus, &args.shared)
}

pub fn run_register(args: &RegisterArgs) -> anyhow::Result<()> {
    let mut corpus = load_corpus(&args.shared)?;

    let mut config = ModelConfig::with_defaults(
        ModelKind::Register,
        args.shared.num_topics,
        args.num_registers,
        1,
        corpus.num_words(),
    );
    apply_shared(&mut config, &args.shared, &corpus)?;
    apply_switch(&mut config, &args.switch);
    if let Some(sigma) = args.sigma {
        config.sigma = vec![sigma];
    }
    config.sample_flags = SampleFlags::parse(ModelKind::Register, &args.sample_flags)?;

    run_model(config, &mut corpus, &args.shared)
}

pub fn run_chunk_register(args: &ChunkRegisterArgs) -> anyhow::Result<()> {
    let mut corpus = load_corpus(&args.shared)?;

    let num_chunks = args.num_chunks.unwrap_or_else(|| corpus.num_chunks());
    let mut config = ModelConfig::with_defaults(
        ModelKind::ChunkRegister,
        args.shared.num_topics,
        args.num_registers,
        num_chunks,
        corpus.num_words(),
    );
    apply_shared(&mut config, &args.shared, &corpus)?;
    apply_switch(&mut config, &args.switch);
    if let Some(sigma) = args.sigma {
        config.sigma = vec![sigma];
    }
    if num_chunks == 1 {
        // a single chunk carries no signal; flood the register level so
        // the chunk level reduces to it
        config.delta[0] = 1e300;
    }
    config.sample_flags = SampleFlags::parse(ModelKind::ChunkRegister, &args.sample_flags)?;

    run_model(config, &mut corpus, &args.shared)
}

fn load_corpus(shared: &SharedArgs) -> anyhow::Result<Corpus> {
    let mut corpus = Corpus::new(Vocab::new());
    load_instance_list(&shared.input, &mut corpus, true)?;
    anyhow::ensure!(!corpus.is_empty(), "no documents in {}", shared.input);
    info!(
        "{}: {} docs, {} word types, {} tokens",
        shared.input,
        corpus.len(),
        corpus.num_words(),
        corpus.num_tokens()
    );
    Ok(corpus)
}

fn apply_shared(
    config: &mut ModelConfig,
    shared: &SharedArgs,
    corpus: &Corpus,
) -> anyhow::Result<()> {
    config.num_iterations = shared.num_iterations;
    config.print_interval = shared.print_interval;
    config.save_state_interval = shared.save_state_interval;
    config.seed = shared.seed;
    config.hyper_iterations = shared.hyper_iterations;
    config.hyper_step_size = shared.hyper_step_size;

    if let Some(alpha) = &shared.alpha {
        config.alpha = alpha.clone();
    }
    if let Some(beta) = shared.beta {
        config.beta = vec![beta];
    }
    if let Some(file) = &shared.unseen_counts {
        config.unseen_counts = Some(read_unseen_counts(file, corpus)?);
    }
    Ok(())
}

fn apply_switch(config: &mut ModelConfig, switch: &SwitchArgs) {
    if let Some(gamma) = switch.gamma {
        config.gamma = vec![gamma];
    }
    config.switch_base = [switch.switch_base[0], switch.switch_base[1]];
    if let Some(delta) = &switch.delta {
        config.delta = delta.clone();
    }
}

fn read_unseen_counts(file: &str, corpus: &Corpus) -> anyhow::Result<HashMap<usize, u32>> {
    let mut map = HashMap::new();
    for line in io::read_lines(file)? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut fields = line.split_whitespace();
        match (fields.next(), fields.next()) {
            (Some(word), Some(count)) => {
                let count: u32 = count
                    .parse()
                    .with_context(|| format!("{}: bad count in {:?}", file, line))?;
                match corpus.vocab().get(&word.to_lowercase()) {
                    Some(w) => {
                        map.insert(w, count);
                    }
                    None => warn!("unseen-count word {:?} is not in the vocabulary", word),
                }
            }
            _ => anyhow::bail!("{}: malformed unseen-count line {:?}", file, line),
        }
    }
    Ok(map)
}

fn read_state(file: &str, corpus: &mut Corpus) -> anyhow::Result<Assignments> {
    let mut assignments = Assignments::from_doc_lengths(corpus.docs().iter().map(|d| d.len()));

    for line in io::read_lines(file)? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        anyhow::ensure!(
            fields.len() == 6,
            "{}: malformed state line {:?}",
            file,
            line
        );
        let d: usize = fields[0].parse()?;
        let i: usize = fields[1].parse()?;
        let r: i64 = fields[3].parse()?;
        let switch: usize = fields[4].parse()?;
        let topic: i64 = fields[5].parse()?;

        anyhow::ensure!(
            d < corpus.len() && i < corpus.doc(d).len(),
            "{}: token ({}, {}) out of range",
            file,
            d,
            i
        );
        if r >= 0 {
            corpus.doc_mut(d).set_register(r as usize);
        }

        let state = match switch {
            0 => {
                anyhow::ensure!(topic >= 0, "{}: topical token without a topic", file);
                TokenState::Topic(topic as usize)
            }
            1 => TokenState::Background,
            _ => anyhow::bail!("{}: bad switch value {} in {:?}", file, switch, line),
        };
        assignments.set(d, i, state);
    }

    Ok(assignments)
}

fn run_model(config: ModelConfig, corpus: &mut Corpus, shared: &SharedArgs) -> anyhow::Result<()> {
    io::mkdir(&shared.output)?;
    write_options(&config, shared)?;

    let (mut sampler, mut sink) = match &shared.resume {
        Some(state_file) => {
            let state = read_state(state_file, corpus)?;
            info!("resuming from {} at iteration {}", state_file, shared.resume_itn);
            let sampler = Sampler::with_initial_state(config, corpus, state, shared.resume_itn)?;
            (sampler, FileSink::append(&shared.output)?)
        }
        None => (Sampler::new(config, corpus)?, FileSink::new(&shared.output)?),
    };

    let start = std::time::Instant::now();
    let summary = sampler.run(corpus, &mut sink)?;
    info!("{} sweeps in {:.1?}", summary.iterations, start.elapsed());
    if !summary.io_errors.is_empty() {
        warn!("{} snapshot emissions failed", summary.io_errors.len());
    }

    dumps::write_all(&sampler, corpus, &shared.output, shared.num_top_words)?;
    Ok(())
}

fn write_options(config: &ModelConfig, shared: &SharedArgs) -> anyhow::Result<()> {
    let mut lines: Vec<String> = vec![
        format!("input\t{}", shared.input),
        format!("output\t{}", shared.output),
        format!("model\t{:?}", config.kind),
        format!("num_topics\t{}", config.num_topics),
        format!("num_iterations\t{}", config.num_iterations),
        format!("print_interval\t{}", config.print_interval),
        format!("save_state_interval\t{}", config.save_state_interval),
        format!("alpha\t{:?}", config.alpha),
        format!("beta\t{:?}", config.beta),
        format!("sample_flags\t{:?}", config.sample_flags),
        format!("seed\t{}", config.seed),
        format!("hyper_iterations\t{}", config.hyper_iterations),
        format!("hyper_step_size\t{}", config.hyper_step_size),
    ];
    if config.kind.switching() {
        lines.push(format!("num_registers\t{}", config.num_registers));
        lines.push(format!("gamma\t{:?}", config.gamma));
        lines.push(format!("switch_base\t{:?}", config.switch_base));
        lines.push(format!("delta\t{:?}", config.delta));
    }
    if config.kind.latent_registers() {
        lines.push(format!("sigma\t{:?}", config.sigma));
    }
    if config.kind.chunked() {
        lines.push(format!("num_chunks\t{}", config.num_chunks));
    }
    io::write_types(&lines, &format!("{}/options.txt", shared.output))
}
