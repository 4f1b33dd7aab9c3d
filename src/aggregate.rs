use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::scheduler::{SkipReason, TaskOutcome, TaskResult};
use crate::{BenchError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellStatus {
    Measured,
    /// First timed run produced a wrong ordering
    Invalid,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimingCell {
    /// Mean seconds, NaN unless `Measured`
    pub mean_secs: f64,
    pub status: CellStatus,
}

impl TimingCell {
    pub fn is_measured(&self) -> bool {
        self.status == CellStatus::Measured
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingRow {
    pub ratio: f64,
    pub sample_size: usize,
    /// One cell per algorithm, in table column order
    pub cells: Vec<TimingCell>,
}

/// Mean timings keyed by (ratio, algorithm)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingTable {
    algorithms: Vec<String>,
    rows: Vec<TimingRow>,
}

impl TimingTable {
    pub fn algorithms(&self) -> &[String] {
        &self.algorithms
    }

    pub fn rows(&self) -> &[TimingRow] {
        &self.rows
    }

    pub fn cell(&self, ratio: f64, algorithm: &str) -> Option<&TimingCell> {
        let col = self.algorithms.iter().position(|a| a == algorithm)?;
        self.rows
            .iter()
            .find(|row| row.ratio == ratio)
            .map(|row| &row.cells[col])
    }

    /// `(sample_size, mean_secs)` for every row of one algorithm's column
    pub fn column(&self, algorithm: &str) -> Vec<(usize, f64)> {
        let Some(col) = self.algorithms.iter().position(|a| a == algorithm) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .map(|row| (row.sample_size, row.cells[col].mean_secs))
            .collect()
    }
}

/// Reduces raw task outcomes into a [`TimingTable`]
pub struct TimingAggregator;

impl TimingAggregator {
    /// Mean of the repetitions, NaN when the result is invalid.
    /// Invalidity is all-or-nothing: a single failed validation discards
    /// every timing of the task.
    pub fn reduce(result: &TaskResult) -> f64 {
        if !result.valid || result.elapsed.is_empty() {
            return f64::NAN;
        }
        let total: f64 = result.elapsed.iter().map(|d| d.as_secs_f64()).sum();
        total / result.elapsed.len() as f64
    }

    /// Build the table for `algorithms` (column order) over `sizes`
    /// (`(ratio, sample_size)` per row). Outcomes may arrive in any order;
    /// every (ratio, algorithm) pair needs exactly one.
    pub fn build(
        algorithms: &[String],
        sizes: &[(f64, usize)],
        outcomes: &[TaskOutcome],
    ) -> Result<TimingTable> {
        let mut cells: HashMap<(u64, &str), TimingCell> = HashMap::with_capacity(outcomes.len());

        for outcome in outcomes {
            let cell = match outcome {
                TaskOutcome::Completed(result) => TimingCell {
                    mean_secs: Self::reduce(result),
                    status: if result.valid {
                        CellStatus::Measured
                    } else {
                        CellStatus::Invalid
                    },
                },
                TaskOutcome::Skipped(skip) => TimingCell {
                    mean_secs: f64::NAN,
                    status: CellStatus::Skipped(skip.reason),
                },
            };
            let key = (outcome.ratio().to_bits(), outcome.algorithm());
            if cells.insert(key, cell).is_some() {
                return Err(BenchError::InvalidInput(format!(
                    "duplicate outcome for {} @ {}",
                    outcome.algorithm(),
                    outcome.ratio()
                )));
            }
        }

        let mut ordered: Vec<(f64, usize)> = sizes.to_vec();
        ordered.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut rows = Vec::with_capacity(ordered.len());
        for (ratio, sample_size) in ordered {
            let mut row_cells = Vec::with_capacity(algorithms.len());
            for algorithm in algorithms {
                let cell = cells
                    .remove(&(ratio.to_bits(), algorithm.as_str()))
                    .ok_or_else(|| {
                        BenchError::InvalidInput(format!(
                            "no outcome for {} @ {}",
                            algorithm, ratio
                        ))
                    })?;
                row_cells.push(cell);
            }
            rows.push(TimingRow {
                ratio,
                sample_size,
                cells: row_cells,
            });
        }

        Ok(TimingTable {
            algorithms: algorithms.to_vec(),
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::SkippedTask;
    use std::time::Duration;

    fn completed(algorithm: &str, ratio: f64, millis: &[u64], valid: bool) -> TaskOutcome {
        TaskOutcome::Completed(TaskResult {
            algorithm: algorithm.to_string(),
            ratio,
            sample_size: 0,
            elapsed: millis.iter().map(|&m| Duration::from_millis(m)).collect(),
            valid,
            first_mismatch: (!valid).then_some(0),
        })
    }

    fn skipped(algorithm: &str, ratio: f64) -> TaskOutcome {
        TaskOutcome::Skipped(SkippedTask {
            algorithm: algorithm.to_string(),
            ratio,
            reason: SkipReason::NotApplicable,
        })
    }

    #[test]
    fn test_reduce_mean_and_nan() {
        let TaskOutcome::Completed(ok) = completed("a", 1.0, &[10, 20, 30], true) else {
            unreachable!()
        };
        assert!((TimingAggregator::reduce(&ok) - 0.02).abs() < 1e-12);

        let TaskOutcome::Completed(bad) = completed("a", 1.0, &[10, 20, 30], false) else {
            unreachable!()
        };
        assert!(TimingAggregator::reduce(&bad).is_nan());
    }

    #[test]
    fn test_build_is_order_independent() {
        let algorithms = vec!["b".to_string(), "a".to_string()];
        let sizes = [(1.0, 100), (0.5, 50)];
        let mut outcomes = vec![
            completed("a", 0.5, &[1], true),
            completed("b", 1.0, &[4], true),
            skipped("a", 1.0),
            completed("b", 0.5, &[2], false),
        ];
        let table = TimingAggregator::build(&algorithms, &sizes, &outcomes).unwrap();
        outcomes.reverse();
        assert_eq!(
            format!("{:?}", table),
            format!(
                "{:?}",
                TimingAggregator::build(&algorithms, &sizes, &outcomes).unwrap()
            )
        );

        assert_eq!(table.rows()[0].ratio, 0.5);
        assert_eq!(table.rows()[0].sample_size, 50);
        assert_eq!(table.cell(0.5, "b").unwrap().status, CellStatus::Invalid);
        assert!(table.cell(0.5, "b").unwrap().mean_secs.is_nan());
        assert!(table.cell(0.5, "a").unwrap().is_measured());
        assert_eq!(
            table.cell(1.0, "a").unwrap().status,
            CellStatus::Skipped(SkipReason::NotApplicable)
        );
        assert_eq!(table.column("b")[1], (100, 0.004));
    }

    #[test]
    fn test_build_rejects_missing_and_duplicate() {
        let algorithms = vec!["a".to_string()];
        let sizes = [(1.0, 10)];
        assert!(TimingAggregator::build(&algorithms, &sizes, &[]).is_err());

        let dup = vec![completed("a", 1.0, &[1], true), skipped("a", 1.0)];
        assert!(TimingAggregator::build(&algorithms, &sizes, &dup).is_err());
    }
}
