use std::fmt::Display;

use crate::{alphabet::Alphabet, bigram_model::ProbabilityTable, error::Result};

/// The word the original makemore lecture scores by default.
pub const DEFAULT_EVAL_WORD: &str = "andrejq";

/// Which words to score.
#[derive(Clone, Debug, PartialEq)]
pub enum EvalMode {
    /// A single word, which doesn't need to come from the corpus.
    Word(String),
    /// Every word in the corpus.
    Corpus,
}

impl Default for EvalMode {
    fn default() -> Self {
        EvalMode::Word(DEFAULT_EVAL_WORD.to_owned())
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LogLikelihood {
    /// Sum of `ln P(next | prev)` over every transition, never positive.
    pub log_likelihood: f32,
    /// Number of transitions scored.
    pub count: usize,
}

impl LogLikelihood {
    pub fn negative_log_likelihood(&self) -> f32 {
        -self.log_likelihood
    }

    /// Mean negative log-likelihood per transition, or `None` if nothing
    /// was scored.
    pub fn normalized(&self) -> Option<f32> {
        if self.count == 0 {
            None
        } else {
            Some(self.negative_log_likelihood() / self.count as f32)
        }
    }
}

impl Display for LogLikelihood {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "log_likelihood={:.4}", self.log_likelihood)?;
        writeln!(f, "negative_log_likelihood={:.4}", self.negative_log_likelihood())?;
        match self.normalized() {
            Some(normalized) => write!(f, "normalized_log_likelihood={normalized:.4}"),
            None => write!(f, "normalized_log_likelihood=undefined"),
        }
    }
}

/// Scores `words` under `probs`, wrapping each word in boundary symbols
/// the same way the table was counted.
pub fn log_likelihood<S: AsRef<str>>(
    words: &[S],
    alphabet: &Alphabet,
    probs: &ProbabilityTable,
) -> Result<LogLikelihood> {
    alphabet.check_table_size(probs.size())?;
    let mut log_likelihood = 0.0f64;
    let mut count = 0;
    for word in words {
        let indices = alphabet.encode_word(word.as_ref())?;
        for pair in indices.windows(2) {
            log_likelihood += (probs.get(pair[0], pair[1]) as f64).ln();
            count += 1;
        }
    }
    Ok(LogLikelihood {
        log_likelihood: log_likelihood as f32,
        count,
    })
}

/// Scores either a single word or the whole corpus, depending on `mode`.
pub fn evaluate<S: AsRef<str>>(
    mode: &EvalMode,
    corpus: &[S],
    alphabet: &Alphabet,
    probs: &ProbabilityTable,
) -> Result<LogLikelihood> {
    match mode {
        EvalMode::Word(word) => log_likelihood(&[word], alphabet, probs),
        EvalMode::Corpus => log_likelihood(corpus, alphabet, probs),
    }
}
