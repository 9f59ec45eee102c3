use thiserror::Error;

pub type Result<T> = std::result::Result<T, MakemoreError>;

#[derive(Debug, Error)]
pub enum MakemoreError {
    #[error("corpus is empty, there are no symbols to index")]
    EmptyCorpus,

    #[error("{word:?} contains the reserved boundary symbol")]
    ReservedSymbol { word: String },

    #[error("'{symbol}' in {word:?} is not in the alphabet")]
    UnknownTransition { symbol: char, word: String },

    #[error("sampling drew {max_len} symbols without reaching the boundary")]
    SamplingDiverged { max_len: usize },

    #[error("index {index} is outside an alphabet of {len} symbols")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("invalid probability distribution: {0}")]
    InvalidDistribution(String),

    #[error("expected {expected} elements, got {got}")]
    DataLength { expected: usize, got: usize },

    #[error("shape mismatch: ({lhs_rows}, {lhs_cols}) vs ({rhs_rows}, {rhs_cols})")]
    ShapeMismatch {
        lhs_rows: usize,
        lhs_cols: usize,
        rhs_rows: usize,
        rhs_cols: usize,
    },

    #[error("trainer has not been initialized")]
    NotInitialized,

    #[error("trainer has already run all of its iterations")]
    TrainingFinished,

    #[error("training stopped at iteration {iteration} of {iterations}")]
    TrainingInProgress { iteration: usize, iterations: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
