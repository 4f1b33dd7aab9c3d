use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub mod aggregate;
pub mod algorithms;
pub mod benchmark;
pub mod complexity;
pub mod config;
pub mod dataset;
mod error;
pub mod progress;
pub mod registry;
pub mod report;
pub mod sampling;
pub mod scheduler;
pub mod validate;

// Re-export main types for public API
pub use aggregate::{CellStatus, TimingAggregator, TimingCell, TimingRow, TimingTable};
pub use algorithms::Builtin;
pub use benchmark::BenchmarkRunner;
pub use complexity::{ComplexityFit, ComplexityFitter, LogLogFit};
pub use config::{AlgorithmSelection, BenchConfig, RatioSpec};
pub use error::{BenchError, Result};
pub use registry::{AlgorithmRegistry, AlgorithmSpec, Applicability};
pub use report::BenchReport;
pub use sampling::{Sample, Sampler, SamplingSpec};
pub use scheduler::{
    ExecutionMode, SkipReason, SkippedTask, TaskOutcome, TaskResult, TaskScheduler,
};

/// Element type marker handed over by the preprocessing stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dtype {
    Int,
    Float,
}

impl Dtype {
    pub fn name(&self) -> &'static str {
        match self {
            Dtype::Int => "int",
            Dtype::Float => "float",
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Dtype::Int)
    }
}

/// Metadata describing a column (or a sample of it)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub dtype: Dtype,
    pub len: usize,
}

/// A sequence of totally ordered numeric sort keys.
///
/// Integer encodings of timestamps, categories and structured codes all arrive
/// as `Int`; everything else arrives as `Float`. Float keys never contain NaN,
/// which keeps `PartialOrd` a total order for every algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Keys {
    Int(Vec<i64>),
    Float(Vec<f64>),
}

impl Keys {
    /// Build float keys, rejecting NaN
    pub fn from_floats(values: Vec<f64>) -> Result<Self> {
        let keys = Keys::Float(values);
        keys.check()?;
        Ok(keys)
    }

    /// Verify the keys are totally ordered. The variants are public, so keys
    /// built by hand may carry NaN.
    pub fn check(&self) -> Result<()> {
        if let Keys::Float(values) = self {
            if let Some(pos) = values.iter().position(|v| v.is_nan()) {
                return Err(BenchError::InvalidInput(format!(
                    "NaN key at position {}",
                    pos
                )));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        match self {
            Keys::Int(v) => v.len(),
            Keys::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn dtype(&self) -> Dtype {
        match self {
            Keys::Int(_) => Dtype::Int,
            Keys::Float(_) => Dtype::Float,
        }
    }

    pub fn meta(&self) -> ColumnMeta {
        ColumnMeta {
            dtype: self.dtype(),
            len: self.len(),
        }
    }

    /// Gather the keys at `indices`, in that order
    pub fn select(&self, indices: &[usize]) -> Keys {
        match self {
            Keys::Int(v) => Keys::Int(indices.iter().map(|&i| v[i]).collect()),
            Keys::Float(v) => Keys::Float(indices.iter().map(|&i| v[i]).collect()),
        }
    }

    /// Independent ascending sort used as the trusted reference ordering
    pub fn sorted(&self) -> Keys {
        match self {
            Keys::Int(v) => {
                let mut out = v.clone();
                out.sort_unstable();
                Keys::Int(out)
            }
            Keys::Float(v) => {
                let mut out = v.clone();
                out.sort_unstable_by(f64::total_cmp);
                Keys::Float(out)
            }
        }
    }

    /// Number of distinct values
    pub fn distinct(&self) -> usize {
        let sorted = self.sorted();
        match &sorted {
            Keys::Int(v) => count_runs(v, |a, b| a == b),
            Keys::Float(v) => count_runs(v, |a, b| a.total_cmp(b) == Ordering::Equal),
        }
    }
}

fn count_runs<T>(sorted: &[T], same: impl Fn(&T, &T) -> bool) -> usize {
    if sorted.is_empty() {
        return 0;
    }
    1 + sorted.windows(2).filter(|w| !same(&w[0], &w[1])).count()
}
