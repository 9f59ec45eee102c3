use log::debug;

use crate::{alphabet::Alphabet, error::Result};

/// Every transition in the corpus as a (predecessor, successor) example,
/// kept individually rather than counted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dataset {
    xs: Vec<usize>,
    ys: Vec<usize>,
}

impl Dataset {
    pub fn from_words<S: AsRef<str>>(words: &[S], alphabet: &Alphabet) -> Result<Self> {
        let mut xs = vec![];
        let mut ys = vec![];
        for word in words {
            let indices = alphabet.encode_word(word.as_ref())?;
            for pair in indices.windows(2) {
                xs.push(pair[0]);
                ys.push(pair[1]);
            }
        }
        debug!("built {} examples from {} words", xs.len(), words.len());
        Ok(Self { xs, ys })
    }

    /// Predecessor indices, the model's inputs.
    pub fn xs(&self) -> &[usize] {
        &self.xs
    }

    /// Successor indices, the labels.
    pub fn ys(&self) -> &[usize] {
        &self.ys
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bigram_model::FrequencyTable;

    #[test]
    fn test_single_word() {
        let alphabet = Alphabet::from_words(&["ab"]).unwrap();
        let dataset = Dataset::from_words(&["ab"], &alphabet).unwrap();
        assert_eq!(dataset.xs(), &[0, 1, 2]);
        assert_eq!(dataset.ys(), &[1, 2, 0]);
        assert_eq!(dataset.len(), 3);
    }

    #[test]
    fn test_matches_frequency_table() {
        let names = ["emma", "olivia", "ava", ""];
        let alphabet = Alphabet::from_words(&names).unwrap();
        let dataset = Dataset::from_words(&names, &alphabet).unwrap();
        let counts = FrequencyTable::from_words(&names, &alphabet).unwrap();

        assert_eq!(dataset.len() as u64, counts.total());
        for from in 0..alphabet.len() {
            for to in 0..alphabet.len() {
                let examples = dataset
                    .xs()
                    .iter()
                    .zip(dataset.ys())
                    .filter(|&(&x, &y)| x == from && y == to)
                    .count();
                assert_eq!(examples as u32, counts.get(from, to));
            }
        }
    }

    #[test]
    fn test_no_words() {
        let alphabet = Alphabet::from_words(&["a"]).unwrap();
        let words: [&str; 0] = [];
        let dataset = Dataset::from_words(&words, &alphabet).unwrap();
        assert!(dataset.is_empty());
    }
}
