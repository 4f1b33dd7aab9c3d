//! # Benchmark Module
//!
//! Drives one complete run: validates the configuration, draws the nested
//! samples, dispatches (algorithm × ratio) tasks through the scheduler and
//! reduces the outcomes into a [`BenchReport`].

use log::info;
use std::time::Instant;

use crate::aggregate::TimingAggregator;
use crate::complexity::ComplexityFitter;
use crate::config::BenchConfig;
use crate::progress::{ProgressReporter, SilentProgress};
use crate::registry::AlgorithmRegistry;
use crate::report::BenchReport;
use crate::sampling::{Sampler, SamplingSpec};
use crate::scheduler::{TaskOutcome, TaskScheduler};
use crate::{Keys, Result};

pub struct BenchmarkRunner {
    registry: AlgorithmRegistry,
    progress: Box<dyn ProgressReporter>,
}

impl BenchmarkRunner {
    /// Runner over `registry` that reports no progress
    pub fn new(registry: AlgorithmRegistry) -> Self {
        Self {
            registry,
            progress: Box::new(SilentProgress::new()),
        }
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn registry(&self) -> &AlgorithmRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut AlgorithmRegistry {
        &mut self.registry
    }

    /// Benchmark every selected algorithm on `data`.
    ///
    /// Configuration errors surface before any task runs. Incorrect output
    /// and inapplicable pairs are recorded in the report; a task fault aborts
    /// the run.
    pub fn run(&self, config: &BenchConfig, data: &Keys) -> Result<BenchReport> {
        let ratios = config.validate(&self.registry)?;
        data.check()?;
        let algorithms = self.registry.get_all(config.algorithms.names())?;

        let started = Instant::now();
        let sampler = Sampler::new(SamplingSpec::new(config.seed, ratios)?, data.len());
        let samples = sampler.samples(data)?;

        info!(
            "Benchmarking {} algorithms over {} ratios of {} {} keys ({} mode, {} jobs)",
            algorithms.len(),
            samples.len(),
            data.len(),
            data.dtype().name(),
            config.mode.name(),
            config.jobs
        );

        let scheduler = TaskScheduler::new(self.registry.clone())
            .with_mode(config.mode)
            .with_jobs(config.jobs);
        let outcomes = scheduler.execute(
            &algorithms,
            &samples,
            config.repeat,
            config.warmup,
            self.progress.as_ref(),
        )?;

        let names: Vec<String> = algorithms.iter().map(|a| a.name().to_string()).collect();
        let sizes: Vec<(f64, usize)> = samples.iter().map(|s| (s.ratio, s.len())).collect();
        let table = TimingAggregator::build(&names, &sizes, &outcomes)?;
        let complexities = ComplexityFitter::fit_table(&table);

        let mut results = Vec::new();
        let mut skipped = Vec::new();
        for outcome in outcomes {
            match outcome {
                TaskOutcome::Completed(result) => results.push(result),
                TaskOutcome::Skipped(skip) => {
                    info!(
                        "Skipped {} @ {}: {}",
                        skip.algorithm,
                        skip.ratio,
                        skip.reason.describe()
                    );
                    skipped.push(skip);
                }
            }
        }
        // Arrival order depends on the worker pool
        let column = |name: &str| names.iter().position(|n| n == name);
        results.sort_by(|a, b| {
            a.ratio
                .total_cmp(&b.ratio)
                .then_with(|| column(&a.algorithm).cmp(&column(&b.algorithm)))
        });

        info!(
            "Completed {} tasks ({} skipped) in {:.3}s",
            results.len(),
            skipped.len(),
            started.elapsed().as_secs_f64()
        );

        Ok(BenchReport {
            config: config.clone(),
            dtype: data.dtype(),
            population: data.len(),
            sizes,
            table,
            complexities,
            results,
            skipped,
        })
    }
}
