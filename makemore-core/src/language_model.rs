use rand::Rng;

use crate::{
    alphabet::{Alphabet, BOUNDARY_INDEX},
    error::{MakemoreError, Result},
    util::multinomial,
};

/// Generous upper bound on the length of a generated name. Hitting it means
/// the model almost never predicts the boundary.
pub const DEFAULT_MAX_LEN: usize = 1_000;

/// Anything that can predict the next symbol from the current one.
pub trait BigramModel {
    fn vocab_size(&self) -> usize;

    /// Distribution over the symbol that follows `index`.
    fn probabilities(&self, index: usize) -> Result<Vec<f32>>;
}

#[derive(Copy, Clone, Debug)]
pub struct GeneratorOptions {
    /// Index the walk starts from.
    pub start: usize,
    /// Maximum number of draws before giving up.
    pub max_len: usize,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            start: BOUNDARY_INDEX,
            max_len: DEFAULT_MAX_LEN,
        }
    }
}

/// Generates names by walking a bigram model one symbol at a time until it
/// produces the boundary symbol.
pub struct NameGenerator<'a> {
    model: &'a dyn BigramModel,
    options: GeneratorOptions,
}

impl<'a> NameGenerator<'a> {
    pub fn new(model: &'a dyn BigramModel, options: GeneratorOptions) -> Self {
        Self { model, options }
    }

    /// Lazily draws indices, ending with (and including) the boundary.
    pub fn draws<'r, R: Rng + ?Sized>(&self, rng: &'r mut R) -> Draws<'a, 'r, R> {
        Draws {
            model: self.model,
            rng,
            current: self.options.start,
            drawn: 0,
            max_len: self.options.max_len,
            finished: false,
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<usize>> {
        self.draws(rng).collect()
    }

    /// Samples a name and decodes it. The result keeps the trailing boundary
    /// symbol, e.g. `"mora."`.
    pub fn sample_name<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        alphabet: &Alphabet,
    ) -> Result<String> {
        alphabet.decode(&self.sample(rng)?)
    }
}

/// Iterator returned by [`NameGenerator::draws`].
pub struct Draws<'a, 'r, R: Rng + ?Sized> {
    model: &'a dyn BigramModel,
    rng: &'r mut R,
    current: usize,
    drawn: usize,
    max_len: usize,
    finished: bool,
}

impl<R: Rng + ?Sized> Draws<'_, '_, R> {
    fn draw(&mut self) -> Result<usize> {
        if self.drawn >= self.max_len {
            return Err(MakemoreError::SamplingDiverged {
                max_len: self.max_len,
            });
        }
        let vocab_size = self.model.vocab_size();
        if self.current >= vocab_size {
            return Err(MakemoreError::IndexOutOfRange {
                index: self.current,
                len: vocab_size,
            });
        }
        let probs = self.model.probabilities(self.current)?;
        let index = multinomial(&probs, &mut *self.rng)?;
        self.drawn += 1;
        self.current = index;
        Ok(index)
    }
}

impl<R: Rng + ?Sized> Iterator for Draws<'_, '_, R> {
    type Item = Result<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = self.draw();
        if !matches!(result, Ok(index) if index != BOUNDARY_INDEX) {
            self.finished = true;
        }
        Some(result)
    }
}
