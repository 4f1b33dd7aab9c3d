use thiserror::Error;

pub type Result<T> = std::result::Result<T, BenchError>;

/// Errors raised by the benchmark engine.
///
/// Configuration errors are raised before any task executes. Correctness
/// failures and applicability mismatches are not errors: they are recorded in
/// the task outcomes. A `TaskFault` is fatal to the whole batch.
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("unknown algorithm '{name}' (available: {available})")]
    UnknownAlgorithm { name: String, available: String },

    #[error("algorithm '{0}' is already registered")]
    DuplicateAlgorithm(String),

    #[error("ratio {0} is outside (0, 1]")]
    InvalidRatio(f64),

    #[error("malformed ratio range: {0}")]
    InvalidRange(String),

    #[error("{field} must be positive")]
    NonPositive { field: &'static str },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("algorithm '{algorithm}' does not support {dtype} keys")]
    Unsupported {
        algorithm: String,
        dtype: &'static str,
    },

    #[error("task {algorithm} @ ratio {ratio} faulted: {message}")]
    TaskFault {
        algorithm: String,
        ratio: f64,
        message: String,
    },

    #[error("worker pool failed: {0}")]
    WorkerPool(String),
}

impl BenchError {
    /// Whether this error was raised by configuration validation
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            BenchError::UnknownAlgorithm { .. }
                | BenchError::DuplicateAlgorithm(_)
                | BenchError::InvalidRatio(_)
                | BenchError::InvalidRange(_)
                | BenchError::NonPositive { .. }
                | BenchError::Config(_)
        )
    }
}
