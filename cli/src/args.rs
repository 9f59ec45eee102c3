use clap::{Parser, Subcommand};
use makemore_core::{
    evaluate::{DEFAULT_EVAL_WORD, EvalMode},
    language_model::{DEFAULT_MAX_LEN, GeneratorOptions},
    linear_model::{DEFAULT_ITERATIONS, TrainerOptions},
};

/// The seed used throughout Karpathy's makemore lecture.
pub const DEFAULT_SEED: u64 = 2147483647;

#[derive(Parser)]
#[command(about = "Character-level bigram models, counted and trained")]
pub struct Args {
    /// Newline-separated list of words to learn from.
    #[arg(long, global = true, default_value_t = String::from("names.txt"))]
    pub corpus: String,

    /// Random number seed.
    #[arg(long, global = true, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Maximum number of characters to draw for a single name.
    #[arg(long, global = true, default_value_t = DEFAULT_MAX_LEN)]
    pub max_len: usize,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Sample names from the counting bigram model.
    Explore {
        /// Number of names to generate.
        #[arg(long, default_value_t = 10)]
        count: usize,

        /// Also print the bigram counts as a grid.
        #[arg(long, default_value_t = false)]
        table: bool,
    },

    /// Score words under the counting bigram model.
    Eval {
        /// Word to evaluate.
        #[arg(long, default_value_t = String::from(DEFAULT_EVAL_WORD))]
        word: String,

        /// Evaluate every word in the corpus instead of a single one.
        #[arg(long, default_value_t = false, conflicts_with = "word")]
        all: bool,
    },

    /// Train a single linear layer on the bigrams and sample names from it.
    Train {
        /// Number of gradient descent steps.
        #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
        iterations: usize,

        /// Number of names to generate after training.
        #[arg(long, default_value_t = 5)]
        count: usize,
    },
}

impl Args {
    pub fn generator_options(&self) -> GeneratorOptions {
        GeneratorOptions {
            max_len: self.max_len,
            ..Default::default()
        }
    }
}

pub fn eval_mode(word: &str, all: bool) -> EvalMode {
    if all {
        EvalMode::Corpus
    } else {
        EvalMode::Word(word.to_owned())
    }
}

pub fn trainer_options(iterations: usize) -> TrainerOptions {
    TrainerOptions {
        iterations,
        ..Default::default()
    }
}
