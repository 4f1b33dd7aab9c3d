//! Empirical time-complexity estimation.
//!
//! Fits `ln(time) = a * ln(size) + b` by ordinary least squares. The slope
//! `a` is the growth exponent: about 1 for linear and n·log n algorithms at
//! practical sizes, about 2 for quadratic ones.

use serde::{Deserialize, Serialize};

use crate::aggregate::TimingTable;

const DEGENERATE_EPS: f64 = 1e-12;

/// Slope, intercept and goodness of fit of one log–log regression
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogLogFit {
    pub slope: f64,
    pub intercept: f64,
    /// `None` when the time axis has no variance and the residuals do not vanish
    pub r_squared: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityFit {
    pub algorithm: String,
    /// Number of usable `(size, time)` points
    pub points: usize,
    /// `None` with fewer than two usable points or no spread in sizes
    pub fit: Option<LogLogFit>,
}

impl ComplexityFit {
    pub fn slope(&self) -> Option<f64> {
        self.fit.map(|f| f.slope)
    }

    pub fn intercept(&self) -> Option<f64> {
        self.fit.map(|f| f.intercept)
    }

    pub fn r_squared(&self) -> Option<f64> {
        self.fit.and_then(|f| f.r_squared)
    }
}

pub struct ComplexityFitter;

impl ComplexityFitter {
    /// One fit per table column, in column order
    pub fn fit_table(table: &TimingTable) -> Vec<ComplexityFit> {
        table
            .algorithms()
            .iter()
            .map(|algorithm| {
                let pairs: Vec<(f64, f64)> = table
                    .column(algorithm)
                    .into_iter()
                    .map(|(size, secs)| (size as f64, secs))
                    .collect();
                Self::fit_algorithm(algorithm, &pairs)
            })
            .collect()
    }

    pub fn fit_algorithm(algorithm: &str, pairs: &[(f64, f64)]) -> ComplexityFit {
        let usable = usable_points(pairs);
        ComplexityFit {
            algorithm: algorithm.to_string(),
            points: usable.len(),
            fit: regress(&usable),
        }
    }

    /// Fit raw `(size, time)` pairs. Unusable points (non-positive size,
    /// non-finite or non-positive time) are dropped first.
    pub fn fit_points(pairs: &[(f64, f64)]) -> Option<LogLogFit> {
        regress(&usable_points(pairs))
    }
}

fn usable_points(pairs: &[(f64, f64)]) -> Vec<(f64, f64)> {
    pairs
        .iter()
        .filter(|(size, time)| *size > 0.0 && size.is_finite() && time.is_finite() && *time > 0.0)
        .map(|&(size, time)| (size.ln(), time.ln()))
        .collect()
}

fn regress(points: &[(f64, f64)]) -> Option<LogLogFit> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;

    let sxx: f64 = points.iter().map(|p| (p.0 - mean_x).powi(2)).sum();
    if sxx == 0.0 {
        return None;
    }
    let sxy: f64 = points
        .iter()
        .map(|p| (p.0 - mean_x) * (p.1 - mean_y))
        .sum();

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let ss_res: f64 = points
        .iter()
        .map(|p| (p.1 - (slope * p.0 + intercept)).powi(2))
        .sum();
    let ss_tot: f64 = points.iter().map(|p| (p.1 - mean_y).powi(2)).sum();

    // Rounding in the mean leaves a residue on perfectly flat data that grows
    // with the magnitude of the values
    let tolerance = DEGENERATE_EPS * points.iter().map(|p| p.1 * p.1).sum::<f64>().max(1.0);
    let r_squared = if ss_tot <= tolerance {
        (ss_res <= tolerance).then_some(1.0)
    } else {
        Some(1.0 - ss_res / ss_tot)
    };

    Some(LogLogFit {
        slope,
        intercept,
        r_squared,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::TimingAggregator;
    use crate::scheduler::{TaskOutcome, TaskResult};
    use std::time::Duration;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_linear_exact() {
        let pairs: Vec<(f64, f64)> = [100.0, 200.0, 400.0, 800.0]
            .iter()
            .map(|&n| (n, n * 1e-6))
            .collect();
        let fit = ComplexityFitter::fit_points(&pairs).unwrap();
        assert!(close(fit.slope, 1.0));
        assert!(close(fit.intercept, (1e-6f64).ln()));
        assert!(close(fit.r_squared.unwrap(), 1.0));
    }

    #[test]
    fn test_quadratic_exact() {
        let pairs: Vec<(f64, f64)> = [100.0, 200.0, 400.0]
            .iter()
            .map(|&n| (n, n * n * 1e-9))
            .collect();
        let fit = ComplexityFitter::fit_points(&pairs).unwrap();
        assert!(close(fit.slope, 2.0));
        assert!(close(fit.r_squared.unwrap(), 1.0));
    }

    #[test]
    fn test_undefined_fits() {
        assert!(ComplexityFitter::fit_points(&[(100.0, 0.1)]).is_none());
        // NaN and zero times are dropped before counting
        assert!(ComplexityFitter::fit_points(&[(100.0, 0.1), (200.0, f64::NAN), (0.0, 0.3)]).is_none());
        // All sizes equal
        assert!(ComplexityFitter::fit_points(&[(100.0, 0.1), (100.0, 0.2)]).is_none());
    }

    #[test]
    fn test_flat_times_have_unit_r_squared() {
        let fit = ComplexityFitter::fit_points(&[(10.0, 0.5), (20.0, 0.5), (40.0, 0.5)]).unwrap();
        assert!(close(fit.slope, 0.0));
        assert_eq!(fit.r_squared, Some(1.0));
    }

    #[test]
    fn test_flat_tolerance_scales_with_magnitude() {
        // One ulp of noise at this magnitude squares to more than the raw epsilon
        let big = 1e10_f64;
        let next = f64::from_bits(big.to_bits() + 1);
        let fit = regress(&[(1.0, big), (2.0, next), (3.0, big)]).unwrap();
        assert_eq!(fit.r_squared, Some(1.0));

        // A small but real spread is still measured
        let points = [(10.0, 1.0e-9), (20.0, 1.01e-9), (40.0, 0.99e-9)];
        let fit = ComplexityFitter::fit_points(&points).unwrap();
        let r_squared = fit.r_squared.unwrap();
        assert!(r_squared < 1.0 && r_squared >= 0.0);
    }

    #[test]
    fn test_fit_table_uses_sample_sizes() {
        let algorithms = vec!["lin".to_string()];
        let sizes = [(0.25, 1000), (0.5, 2000), (1.0, 4000)];
        let outcomes: Vec<TaskOutcome> = sizes
            .iter()
            .map(|&(ratio, n)| {
                TaskOutcome::Completed(TaskResult {
                    algorithm: "lin".to_string(),
                    ratio,
                    sample_size: n,
                    elapsed: vec![Duration::from_micros(n as u64)],
                    valid: true,
                    first_mismatch: None,
                })
            })
            .collect();
        let table = TimingAggregator::build(&algorithms, &sizes, &outcomes).unwrap();
        let fits = ComplexityFitter::fit_table(&table);
        assert_eq!(fits.len(), 1);
        assert_eq!(fits[0].points, 3);
        assert!(close(fits[0].slope().unwrap(), 1.0));
    }

    #[test]
    fn test_fits_are_deterministic_for_fixed_timings() {
        let algorithms = vec!["merge_sort".to_string(), "insertion_sort".to_string()];
        let sizes = [(0.1, 500), (0.4, 2000), (0.7, 3500), (1.0, 5000)];
        let outcomes: Vec<TaskOutcome> = sizes
            .iter()
            .flat_map(|&(ratio, n)| {
                let n = n as u64;
                [
                    ("merge_sort", vec![n * 13, n * 12 + 7, n * 14]),
                    ("insertion_sort", vec![n * n / 90, n * n / 100, n * n / 95 + 3]),
                ]
                .into_iter()
                .map(move |(algorithm, nanos)| {
                    TaskOutcome::Completed(TaskResult {
                        algorithm: algorithm.to_string(),
                        ratio,
                        sample_size: n as usize,
                        elapsed: nanos.into_iter().map(Duration::from_nanos).collect(),
                        valid: true,
                        first_mismatch: None,
                    })
                })
            })
            .collect();

        let fit = || {
            let table = TimingAggregator::build(&algorithms, &sizes, &outcomes).unwrap();
            ComplexityFitter::fit_table(&table)
        };
        let first = fit();
        let second = fit();
        assert_eq!(first, second);
        assert!(first.iter().all(|f| f.points == 4 && f.fit.is_some()));
        assert!(first[1].slope().unwrap() > first[0].slope().unwrap());
    }
}
