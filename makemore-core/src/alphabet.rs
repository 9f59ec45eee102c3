use std::collections::BTreeSet;

use log::debug;

use crate::error::{MakemoreError, Result};

/// Marks both the start and the end of a word.
pub const BOUNDARY: char = '.';

/// The boundary symbol always sits at the front of the alphabet.
pub const BOUNDARY_INDEX: usize = 0;

/// Character-level vocabulary in the style of Karpathy's makemore
/// lectures: every symbol that appears in the corpus, sorted, with the
/// boundary symbol in front of them.
///
/// The alphabet is small and never changes once built, so both directions
/// of the mapping live in a single array. Index to symbol is a direct
/// lookup, symbol to index is a binary search over the sorted tail.
#[derive(Clone, Debug, PartialEq)]
pub struct Alphabet {
    itos: Vec<char>,
}

impl Alphabet {
    pub fn from_words<S: AsRef<str>>(words: &[S]) -> Result<Self> {
        if words.is_empty() {
            return Err(MakemoreError::EmptyCorpus);
        }

        let mut all_chars: BTreeSet<char> = BTreeSet::new();
        for word in words {
            let word = word.as_ref();
            if word.contains(BOUNDARY) {
                return Err(MakemoreError::ReservedSymbol {
                    word: word.to_owned(),
                });
            }
            all_chars.extend(word.chars());
        }

        let mut itos = Vec::with_capacity(all_chars.len() + 1);
        itos.push(BOUNDARY);
        itos.extend(all_chars);
        debug!("built alphabet of {} symbols from {} words", itos.len(), words.len());

        Ok(Self { itos })
    }

    pub fn len(&self) -> usize {
        self.itos.len()
    }

    /// All symbols, ordered by index.
    pub fn symbols(&self) -> &[char] {
        &self.itos
    }

    /// Fails unless a square table of `size` rows was built over this
    /// alphabet.
    pub fn check_table_size(&self, size: usize) -> Result<()> {
        if size != self.len() {
            return Err(MakemoreError::ShapeMismatch {
                lhs_rows: self.len(),
                lhs_cols: self.len(),
                rhs_rows: size,
                rhs_cols: size,
            });
        }
        Ok(())
    }

    pub fn index_of(&self, symbol: char) -> Option<usize> {
        if symbol == BOUNDARY {
            return Some(BOUNDARY_INDEX);
        }
        self.itos[1..]
            .binary_search(&symbol)
            .ok()
            .map(|position| position + 1)
    }

    pub fn symbol_at(&self, index: usize) -> Option<char> {
        self.itos.get(index).copied()
    }

    /// Returns the indices of `word` wrapped in a leading and trailing
    /// boundary, so a word of length `L` yields `L + 2` indices and `L + 1`
    /// transitions.
    pub fn encode_word(&self, word: &str) -> Result<Vec<usize>> {
        let mut result = Vec::with_capacity(word.len() + 2);
        result.push(BOUNDARY_INDEX);
        for symbol in word.chars() {
            let Some(index) = self.index_of(symbol) else {
                return Err(MakemoreError::UnknownTransition {
                    symbol,
                    word: word.to_owned(),
                });
            };
            result.push(index);
        }
        result.push(BOUNDARY_INDEX);
        Ok(result)
    }

    pub fn decode(&self, indices: &[usize]) -> Result<String> {
        let mut result = String::with_capacity(indices.len());
        for &index in indices {
            let Some(symbol) = self.symbol_at(index) else {
                return Err(MakemoreError::IndexOutOfRange {
                    index,
                    len: self.len(),
                });
            };
            result.push(symbol);
        }
        Ok(result)
    }
}
