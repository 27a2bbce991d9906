use thiserror::Error;

#[derive(Error, Debug)]
pub enum YggdrasilError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Structural error: {0}")]
    Structural(String),

    #[error("{measure} did not converge within {iterations} iterations")]
    Convergence {
        measure: &'static str,
        iterations: usize,
    },

    #[error("Operation cancelled before completion")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, YggdrasilError>;
