use log::debug;

use crate::{
    alphabet::Alphabet,
    error::{MakemoreError, Result},
    language_model::BigramModel,
    matrix::Matrix,
};

/// How many times each symbol followed each other symbol across a corpus,
/// with every word wrapped in boundary symbols.
#[derive(Clone, Debug, PartialEq)]
pub struct FrequencyTable {
    size: usize,
    counts: Vec<u32>,
}

impl FrequencyTable {
    pub fn from_words<S: AsRef<str>>(words: &[S], alphabet: &Alphabet) -> Result<Self> {
        let size = alphabet.len();
        let mut counts = vec![0; size * size];
        for word in words {
            let indices = alphabet.encode_word(word.as_ref())?;
            for pair in indices.windows(2) {
                counts[pair[0] * size + pair[1]] += 1;
            }
        }
        let result = Self { size, counts };
        debug!("counted {} bigrams over {} words", result.total(), words.len());
        Ok(result)
    }

    /// Number of rows (and columns), i.e. the alphabet size.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn get(&self, from: usize, to: usize) -> u32 {
        self.counts[from * self.size + to]
    }

    pub fn row(&self, from: usize) -> &[u32] {
        &self.counts[from * self.size..(from + 1) * self.size]
    }

    /// Total number of transitions counted.
    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&count| count as u64).sum()
    }

    /// Adds one to every count (Laplace smoothing, so nothing is impossible)
    /// and normalizes each row into a distribution.
    pub fn probabilities(&self) -> Result<ProbabilityTable> {
        let smoothed = self
            .counts
            .iter()
            .map(|&count| (count + 1) as f32)
            .collect::<Vec<_>>();
        let matrix = Matrix::from_vec(self.size, self.size, smoothed)?.normalize_rows();
        Ok(ProbabilityTable { matrix })
    }
}

/// Row-stochastic table of transition probabilities: row `i` is the
/// distribution over what follows symbol `i`.
#[derive(Clone, Debug, PartialEq)]
pub struct ProbabilityTable {
    matrix: Matrix,
}

impl ProbabilityTable {
    pub fn from_words<S: AsRef<str>>(words: &[S], alphabet: &Alphabet) -> Result<Self> {
        FrequencyTable::from_words(words, alphabet)?.probabilities()
    }

    pub fn size(&self) -> usize {
        self.matrix.rows()
    }

    pub fn get(&self, from: usize, to: usize) -> f32 {
        self.matrix.get(from, to)
    }

    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }
}

impl BigramModel for ProbabilityTable {
    fn vocab_size(&self) -> usize {
        self.size()
    }

    fn probabilities(&self, index: usize) -> Result<Vec<f32>> {
        if index >= self.size() {
            return Err(MakemoreError::IndexOutOfRange {
                index,
                len: self.size(),
            });
        }
        Ok(self.matrix.row(index).to_vec())
    }
}
