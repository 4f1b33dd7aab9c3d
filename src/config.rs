use clap::Args;
use serde::{Deserialize, Serialize};

use crate::registry::AlgorithmRegistry;
use crate::scheduler::ExecutionMode;
use crate::{BenchError, Result};

pub const DEFAULT_RATMIN: f64 = 0.01;
pub const DEFAULT_RATMAX: f64 = 1.0;
pub const DEFAULT_NRAT: usize = 6;
pub const DEFAULT_REPEAT: usize = 3;
pub const DEFAULT_SEED: u64 = 42;

/// Worker count used when none is given: available parallelism minus one,
/// leaving a core for the coordinator, but never below one
pub fn default_jobs() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or_else(|_| num_cpus::get());
    cores.saturating_sub(1).max(1)
}

/// Sampling ratios as an explicit list or an evenly spaced range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RatioSpec {
    List(Vec<f64>),
    Range { min: f64, max: f64, count: usize },
}

impl Default for RatioSpec {
    fn default() -> Self {
        RatioSpec::Range {
            min: DEFAULT_RATMIN,
            max: DEFAULT_RATMAX,
            count: DEFAULT_NRAT,
        }
    }
}

impl RatioSpec {
    /// Resolve to ascending, de-duplicated ratios, each in (0, 1].
    /// Ranges are expanded as a linspace rounded to 3 decimals, so nearby
    /// points may collapse into one.
    pub fn expand(&self) -> Result<Vec<f64>> {
        let mut ratios = match self {
            RatioSpec::List(list) => list.clone(),
            RatioSpec::Range { min, max, count } => linspace_rounded(*min, *max, *count)?,
        };

        if let Some(&bad) = ratios.iter().find(|&&r| !(r > 0.0 && r <= 1.0)) {
            return Err(BenchError::InvalidRatio(bad));
        }
        if ratios.is_empty() {
            return Err(BenchError::Config("no sampling ratios given".to_string()));
        }

        ratios.sort_by(f64::total_cmp);
        ratios.dedup();
        Ok(ratios)
    }
}

fn linspace_rounded(min: f64, max: f64, count: usize) -> Result<Vec<f64>> {
    if !min.is_finite() || !max.is_finite() {
        return Err(BenchError::InvalidRange(format!(
            "bounds must be finite (got {}..{})",
            min, max
        )));
    }
    if min > max {
        return Err(BenchError::InvalidRange(format!(
            "ratmin {} is above ratmax {}",
            min, max
        )));
    }
    if count == 0 {
        return Err(BenchError::InvalidRange("nrat must be at least 1".to_string()));
    }
    if count == 1 {
        return Ok(vec![round3(min)]);
    }

    let step = (max - min) / (count - 1) as f64;
    Ok((0..count)
        .map(|i| {
            // Endpoint is pinned to avoid drift from repeated steps
            let value = if i == count - 1 { max } else { min + step * i as f64 };
            round3(value)
        })
        .collect())
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Which registered algorithms to run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum AlgorithmSelection {
    #[default]
    All,
    Subset(Vec<String>),
}

impl AlgorithmSelection {
    pub fn names(&self) -> Option<&[String]> {
        match self {
            AlgorithmSelection::All => None,
            AlgorithmSelection::Subset(names) => Some(names.as_slice()),
        }
    }
}

/// Complete configuration of one benchmark run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchConfig {
    pub algorithms: AlgorithmSelection,
    pub ratios: RatioSpec,
    pub repeat: usize,
    pub warmup: usize,
    pub seed: u64,
    pub mode: ExecutionMode,
    pub jobs: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            algorithms: AlgorithmSelection::All,
            ratios: RatioSpec::default(),
            repeat: DEFAULT_REPEAT,
            warmup: 0,
            seed: DEFAULT_SEED,
            mode: ExecutionMode::default(),
            jobs: default_jobs(),
        }
    }
}

impl BenchConfig {
    pub fn with_algorithms<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.algorithms = AlgorithmSelection::Subset(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_ratios(mut self, ratios: Vec<f64>) -> Self {
        self.ratios = RatioSpec::List(ratios);
        self
    }

    pub fn with_ratio_range(mut self, min: f64, max: f64, count: usize) -> Self {
        self.ratios = RatioSpec::Range { min, max, count };
        self
    }

    pub fn with_repeat(mut self, repeat: usize) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn with_warmup(mut self, warmup: usize) -> Self {
        self.warmup = warmup;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Check every constraint against `registry` and return the expanded
    /// ratios. Nothing executes before this succeeds.
    pub fn validate(&self, registry: &AlgorithmRegistry) -> Result<Vec<f64>> {
        if self.repeat == 0 {
            return Err(BenchError::NonPositive { field: "repeat" });
        }
        if self.jobs == 0 {
            return Err(BenchError::NonPositive { field: "jobs" });
        }
        registry.get_all(self.algorithms.names())?;
        self.ratios.expand()
    }

    /// One-line summary used in report headers
    pub fn summary(&self) -> String {
        let algorithms = match &self.algorithms {
            AlgorithmSelection::All => "all".to_string(),
            AlgorithmSelection::Subset(names) => names.join(","),
        };
        let ratios = match &self.ratios {
            RatioSpec::List(list) => format!("{:?}", list),
            RatioSpec::Range { min, max, count } => format!("{}..{} x{}", min, max, count),
        };
        format!(
            "algorithms={} ratios={} repeat={} warmup={} seed={} mode={} jobs={}",
            algorithms,
            ratios,
            self.repeat,
            self.warmup,
            self.seed,
            self.mode.name(),
            self.jobs
        )
    }
}

/// Parse a comma-separated ratio list, ignoring empty entries
pub fn parse_ratio_list(input: &str) -> Result<Vec<f64>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<f64>()
                .map_err(|_| BenchError::InvalidRange(format!("'{}' is not a number", s)))
        })
        .collect()
}

/// Parse a comma-separated name list, ignoring empty entries
pub fn parse_name_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Benchmark parameters shared by CLI subcommands
#[derive(Args, Debug, Clone)]
pub struct BenchArgs {
    /// Algorithms to run (comma-separated), e.g. "merge_sort,heap_sort". Defaults to all
    #[arg(long)]
    pub algos: Option<String>,

    /// Explicit sampling ratios (comma-separated), e.g. "0.1,0.5,1.0"
    #[arg(long, conflicts_with_all = ["ratmin", "ratmax", "nrat"])]
    pub ratios: Option<String>,

    /// Smallest ratio of the evenly spaced range
    #[arg(long, default_value_t = DEFAULT_RATMIN)]
    pub ratmin: f64,

    /// Largest ratio of the evenly spaced range
    #[arg(long, default_value_t = DEFAULT_RATMAX)]
    pub ratmax: f64,

    /// Number of ratios in the range
    #[arg(long, default_value_t = DEFAULT_NRAT)]
    pub nrat: usize,

    /// Timed repetitions per task
    #[arg(long, default_value_t = DEFAULT_REPEAT)]
    pub repeat: usize,

    /// Untimed warm-up runs per task
    #[arg(long, default_value_t = 0)]
    pub warmup: usize,

    /// Seed for the base permutation
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Task dispatch mode
    #[arg(long, value_enum, default_value_t = ExecutionMode::ChannelPool)]
    pub mode: ExecutionMode,

    /// Worker count for parallel modes (default: available cores minus one)
    #[arg(long)]
    pub jobs: Option<usize>,
}

impl BenchArgs {
    pub fn to_config(&self) -> Result<BenchConfig> {
        let algorithms = match &self.algos {
            Some(list) => AlgorithmSelection::Subset(parse_name_list(list)),
            None => AlgorithmSelection::All,
        };
        let ratios = match &self.ratios {
            Some(list) => RatioSpec::List(parse_ratio_list(list)?),
            None => RatioSpec::Range {
                min: self.ratmin,
                max: self.ratmax,
                count: self.nrat,
            },
        };

        Ok(BenchConfig {
            algorithms,
            ratios,
            repeat: self.repeat,
            warmup: self.warmup,
            seed: self.seed,
            mode: self.mode,
            jobs: self.jobs.unwrap_or_else(default_jobs),
        })
    }
}
