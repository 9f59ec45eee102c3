use rand::{
    Rng,
    distr::{Distribution, weighted::WeightedIndex},
};

use crate::error::{MakemoreError, Result};

/// Draws one index from the categorical distribution `probs`, with each
/// index chosen in proportion to its weight. The weights don't have to sum
/// to one.
pub fn multinomial<R: Rng + ?Sized>(probs: &[f32], rng: &mut R) -> Result<usize> {
    let mut choices: Vec<usize> = Vec::with_capacity(probs.len());
    let mut weights: Vec<f32> = Vec::with_capacity(probs.len());

    for (i, &prob) in probs.iter().enumerate() {
        if !prob.is_finite() || prob < 0.0 {
            return Err(MakemoreError::InvalidDistribution(format!(
                "weight {prob} at index {i}"
            )));
        }
        if prob > 0.0 {
            choices.push(i);
            weights.push(prob);
        }
    }

    let dist = WeightedIndex::new(&weights)
        .map_err(|err| MakemoreError::InvalidDistribution(err.to_string()))?;

    Ok(choices[dist.sample(rng)])
}
