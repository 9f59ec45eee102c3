mod args;
mod corpus;

use std::time::Instant;

use anyhow::Result;
use args::{Args, Command, eval_mode, trainer_options};
use clap::{CommandFactory, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use makemore_core::{
    alphabet::Alphabet,
    bigram_model::FrequencyTable,
    dataset::Dataset,
    evaluate::{EvalMode, evaluate},
    language_model::NameGenerator,
    linear_model::{Trainer, TrainerOptions},
    render::{BigramRenderer, TextGridRenderer},
};
use rand::{SeedableRng, rngs::StdRng};

/// This is based on Andrej Karpathy's "The spelled-out intro to language
/// modeling: building makemore":
///
///     https://youtu.be/PaCmpygFfXo
fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    let Some(command) = &args.command else {
        Args::command().print_help()?;
        println!();
        return Ok(());
    };

    let words = corpus::read_words(&args.corpus)?;
    info!("loaded {} words from {}", words.len(), args.corpus);
    let alphabet = Alphabet::from_words(&words)?;

    match command {
        Command::Explore { count, table } => {
            explore(&args, &words, &alphabet, *count, *table)?;
        }
        Command::Eval { word, all } => {
            evaluate_bigrams(&words, &alphabet, &eval_mode(word, *all))?;
        }
        Command::Train { iterations, count } => {
            train(&args, &words, &alphabet, trainer_options(*iterations), *count)?;
        }
    }

    Ok(())
}

fn explore(
    args: &Args,
    words: &[String],
    alphabet: &Alphabet,
    count: usize,
    table: bool,
) -> Result<()> {
    let counts = FrequencyTable::from_words(words, alphabet)?;
    if table {
        TextGridRenderer::new(std::io::stdout().lock()).render(&counts, alphabet)?;
    }
    let probs = counts.probabilities()?;
    let generator = NameGenerator::new(&probs, args.generator_options());
    let mut rng = StdRng::seed_from_u64(args.seed);
    for _ in 0..count {
        println!("{}", generator.sample_name(&mut rng, alphabet)?);
    }
    Ok(())
}

fn evaluate_bigrams(words: &[String], alphabet: &Alphabet, mode: &EvalMode) -> Result<()> {
    let probs = FrequencyTable::from_words(words, alphabet)?.probabilities()?;
    let result = evaluate(mode, words, alphabet, &probs)?;
    println!("{result}");
    Ok(())
}

fn train(
    args: &Args,
    words: &[String],
    alphabet: &Alphabet,
    options: TrainerOptions,
    count: usize,
) -> Result<()> {
    let dataset = Dataset::from_words(words, alphabet)?;
    println!("{} examples", dataset.len());

    let mut rng = StdRng::seed_from_u64(args.seed);
    let mut trainer = Trainer::new(dataset, alphabet.len(), options)?;
    trainer.initialize(&mut rng);

    let start_time = Instant::now();
    let pb = ProgressBar::new(options.iterations as u64);
    pb.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")?
            .progress_chars("##-"),
    );
    pb.set_message("Training");
    trainer.run(|_, loss| {
        pb.suspend(|| println!("Loss: {loss:.4}"));
        pb.inc(1);
    })?;
    pb.finish_and_clear();
    info!("total training time: {} ms", start_time.elapsed().as_millis());

    let model = trainer.into_model()?;
    // Sampling restarts from the seed.
    let mut rng = StdRng::seed_from_u64(args.seed);
    let generator = NameGenerator::new(&model, args.generator_options());
    for _ in 0..count {
        println!("{}", generator.sample_name(&mut rng, alphabet)?);
    }
    Ok(())
}
