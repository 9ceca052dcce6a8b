#![allow(unused)]

pub use doc_corpus::common_io as io;
pub use doc_corpus::{Corpus, Document, Vocab};

pub use clap::{Args, Parser, Subcommand};
pub use env_logger;

pub use log::{info, warn};
