pub mod alphabet;
pub mod bigram_model;
pub mod dataset;
pub mod error;
pub mod evaluate;
pub mod language_model;
pub mod linear_model;
pub mod matrix;
pub mod render;
pub mod util;

pub use error::{MakemoreError, Result};
