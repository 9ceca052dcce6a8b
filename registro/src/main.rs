mod common;
mod dumps;
mod run_model;
mod sink;

use crate::common::*;
use crate::run_model::*;

#[derive(Parser, Debug)]
#[command(version, about, long_about, term_width = 80)]
struct Cli {
    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Plain LDA: every token is topical
    Lda(LdaArgs),
    /// Switching LDA with one shared background distribution
    Background(BackgroundArgs),
    /// Switching LDA with a latent per-document register
    Register(RegisterArgs),
    /// Switching LDA with latent registers and chunk-conditioned background
    ChunkRegister(ChunkRegisterArgs),
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match &cli.commands {
        Commands::Lda(args) => run_lda(args)?,
        Commands::Background(args) => run_background(args)?,
        Commands::Register(args) => run_register(args)?,
        Commands::ChunkRegister(args) => run_chunk_register(args)?,
    }

    Ok(())
}
