use clap::ValueEnum;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::hint::black_box;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossbeam::channel::Receiver;

use crate::aggregate::TimingAggregator;
use crate::progress::ProgressReporter;
use crate::registry::{AlgorithmRegistry, AlgorithmSpec};
use crate::sampling::Sample;
use crate::validate::CorrectnessValidator;
use crate::{BenchError, Result};

pub mod channel_pool;
pub mod sequential;
pub mod work_stealing;

use channel_pool::ChannelPoolExecution;
use sequential::SequentialExecution;
use work_stealing::WorkStealingExecution;

/// How benchmark tasks are dispatched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum ExecutionMode {
    /// One task at a time in plan order, for debugging and single-core hosts
    #[value(name = "sequential")]
    Sequential,
    /// Bounded pool of scoped workers pulling from a crossbeam task queue
    #[value(name = "channel-pool")]
    #[default]
    ChannelPool,
    /// Dedicated rayon pool, one spawned job per task
    #[value(name = "work-stealing")]
    WorkStealing,
}

impl ExecutionMode {
    pub fn name(&self) -> &'static str {
        match self {
            ExecutionMode::Sequential => "sequential",
            ExecutionMode::ChannelPool => "channel-pool",
            ExecutionMode::WorkStealing => "work-stealing",
        }
    }
}

/// One (algorithm, ratio) unit of work. Owns everything it reads.
#[derive(Debug, Clone)]
pub struct BenchmarkTask {
    pub algorithm: Arc<AlgorithmSpec>,
    pub sample: Sample,
    pub repeat: usize,
    pub warmup: usize,
}

impl BenchmarkTask {
    fn fault(&self, message: String) -> BenchError {
        BenchError::TaskFault {
            algorithm: self.algorithm.name().to_string(),
            ratio: self.sample.ratio,
            message,
        }
    }
}

/// Raw measurements of one completed task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    pub algorithm: String,
    pub ratio: f64,
    pub sample_size: usize,
    /// One entry per timed repetition
    pub elapsed: Vec<Duration>,
    /// False iff the first timed repetition produced a wrong ordering
    pub valid: bool,
    pub first_mismatch: Option<usize>,
}

impl TaskResult {
    /// Mean seconds, NaN when invalid
    pub fn mean_secs(&self) -> f64 {
        TimingAggregator::reduce(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// The applicability predicate rejected the sample
    NotApplicable,
    /// The ratio produced no rows
    EmptySample,
}

impl SkipReason {
    pub fn describe(&self) -> &'static str {
        match self {
            SkipReason::NotApplicable => "not applicable",
            SkipReason::EmptySample => "empty sample",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedTask {
    pub algorithm: String,
    pub ratio: f64,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TaskOutcome {
    Completed(TaskResult),
    Skipped(SkippedTask),
}

impl TaskOutcome {
    pub fn algorithm(&self) -> &str {
        match self {
            TaskOutcome::Completed(r) => &r.algorithm,
            TaskOutcome::Skipped(s) => &s.algorithm,
        }
    }

    pub fn ratio(&self) -> f64 {
        match self {
            TaskOutcome::Completed(r) => r.ratio,
            TaskOutcome::Skipped(s) => s.ratio,
        }
    }
}

/// Common interface for the dispatch backends
pub trait ExecutionStrategy {
    /// Run every task to completion and return results in arrival order.
    /// The first task fault aborts dispatch of the remaining tasks.
    fn execute(
        &self,
        tasks: Vec<BenchmarkTask>,
        progress: &dyn ProgressReporter,
    ) -> Result<Vec<TaskResult>>;
}

/// Execute one task under the timing protocol.
///
/// Each invocation gets a fresh private copy of the sample, made before the
/// clock starts. The clock wraps only the sort call. Only the first timed
/// output is validated.
pub fn run_task(task: &BenchmarkTask) -> Result<TaskResult> {
    for _ in 0..task.warmup {
        let input = (*task.sample.keys).clone();
        let output = task
            .algorithm
            .sort(input)
            .map_err(|e| task.fault(e.to_string()))?;
        black_box(output);
    }

    let mut elapsed = Vec::with_capacity(task.repeat);
    let mut first_mismatch = None;

    for rep in 0..task.repeat {
        let input = (*task.sample.keys).clone();
        let start = Instant::now();
        let output = task.algorithm.sort(black_box(input));
        let took = start.elapsed();
        let output = output.map_err(|e| task.fault(e.to_string()))?;
        elapsed.push(took);

        if rep == 0 {
            first_mismatch = CorrectnessValidator::first_mismatch(&output, &task.sample.reference);
            if let Some(pos) = first_mismatch {
                warn!(
                    "{} produced a wrong ordering at ratio {} (first mismatch at index {})",
                    task.algorithm.name(),
                    task.sample.ratio,
                    pos
                );
            }
        }
    }

    debug!(
        "Finished {} @ {} ({} rows, {} reps)",
        task.algorithm.name(),
        task.sample.ratio,
        task.sample.len(),
        task.repeat
    );

    Ok(TaskResult {
        algorithm: task.algorithm.name().to_string(),
        ratio: task.sample.ratio,
        sample_size: task.sample.len(),
        elapsed,
        valid: first_mismatch.is_none(),
        first_mismatch,
    })
}

/// Run a task, turning a panic inside the algorithm into a task fault
pub(crate) fn run_guarded(task: &BenchmarkTask) -> Result<TaskResult> {
    match panic::catch_unwind(AssertUnwindSafe(|| run_task(task))) {
        Ok(result) => result,
        Err(payload) => Err(task.fault(panic_message(payload.as_ref()))),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", msg)
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        format!("panicked: {}", msg)
    } else {
        "panicked".to_string()
    }
}

/// Coordinator loop shared by the parallel backends: reduces results in
/// arrival order until every sender is gone. A fault raises `abort` so
/// workers stop picking up new tasks.
pub(crate) fn collect_results(
    results: &Receiver<Result<TaskResult>>,
    abort: &AtomicBool,
    progress: &dyn ProgressReporter,
) -> Result<Vec<TaskResult>> {
    let mut collected = Vec::new();
    let mut fault = None;

    for outcome in results.iter() {
        match outcome {
            Ok(result) => {
                progress.task_completed();
                collected.push(result);
            }
            Err(e) => {
                abort.store(true, Ordering::Release);
                fault.get_or_insert(e);
            }
        }
    }

    match fault {
        Some(e) => Err(e),
        None => Ok(collected),
    }
}

/// Expands (algorithm × ratio) into tasks and dispatches them
#[derive(Debug, Clone)]
pub struct TaskScheduler {
    registry: AlgorithmRegistry,
    mode: ExecutionMode,
    jobs: usize,
}

impl TaskScheduler {
    pub fn new(registry: AlgorithmRegistry) -> Self {
        Self {
            registry,
            mode: ExecutionMode::default(),
            jobs: crate::config::default_jobs(),
        }
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn registry(&self) -> &AlgorithmRegistry {
        &self.registry
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Resolve an algorithm selection against the registry
    pub fn select(&self, selection: Option<&[String]>) -> Result<Vec<Arc<AlgorithmSpec>>> {
        self.registry.get_all(selection)
    }

    /// Build the task list in ratio-major, selection-minor order. Pairs that
    /// cannot run are returned as skips.
    pub fn plan(
        &self,
        algorithms: &[Arc<AlgorithmSpec>],
        samples: &[Sample],
        repeat: usize,
        warmup: usize,
    ) -> (Vec<BenchmarkTask>, Vec<SkippedTask>) {
        let mut tasks = Vec::with_capacity(algorithms.len() * samples.len());
        let mut skipped = Vec::new();

        for sample in samples {
            let meta = sample.meta();
            for algorithm in algorithms {
                let reason = if sample.is_empty() {
                    Some(SkipReason::EmptySample)
                } else if !algorithm.is_applicable(&meta) {
                    Some(SkipReason::NotApplicable)
                } else {
                    None
                };

                match reason {
                    Some(reason) => {
                        debug!(
                            "Skipping {} @ {}: {}",
                            algorithm.name(),
                            sample.ratio,
                            reason.describe()
                        );
                        skipped.push(SkippedTask {
                            algorithm: algorithm.name().to_string(),
                            ratio: sample.ratio,
                            reason,
                        });
                    }
                    None => tasks.push(BenchmarkTask {
                        algorithm: Arc::clone(algorithm),
                        sample: sample.clone(),
                        repeat,
                        warmup,
                    }),
                }
            }
        }

        (tasks, skipped)
    }

    /// Plan and run every task, returning completed and skipped outcomes
    pub fn execute(
        &self,
        algorithms: &[Arc<AlgorithmSpec>],
        samples: &[Sample],
        repeat: usize,
        warmup: usize,
        progress: &dyn ProgressReporter,
    ) -> Result<Vec<TaskOutcome>> {
        if repeat == 0 {
            return Err(BenchError::NonPositive { field: "repeat" });
        }
        if self.jobs == 0 {
            return Err(BenchError::NonPositive { field: "jobs" });
        }

        let (tasks, skipped) = self.plan(algorithms, samples, repeat, warmup);

        progress.start(tasks.len());
        let completed = match self.mode {
            ExecutionMode::Sequential => SequentialExecution.execute(tasks, progress),
            ExecutionMode::ChannelPool => ChannelPoolExecution::new(self.jobs).execute(tasks, progress),
            ExecutionMode::WorkStealing => {
                WorkStealingExecution::new(self.jobs).execute(tasks, progress)
            }
        };
        progress.finish();

        let mut outcomes: Vec<TaskOutcome> =
            completed?.into_iter().map(TaskOutcome::Completed).collect();
        outcomes.extend(skipped.into_iter().map(TaskOutcome::Skipped));
        Ok(outcomes)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::progress::SilentProgress;
    use crate::registry::Applicability;
    use crate::sampling::{Sampler, SamplingSpec};
    use crate::{Builtin, Keys};

    pub(crate) fn int_samples(n: usize, ratios: Vec<f64>) -> Vec<Sample> {
        let data = Keys::Int((0..n as i64).map(|i| (i * 7919) % 1000).collect());
        Sampler::new(SamplingSpec::new(42, ratios).unwrap(), n)
            .samples(&data)
            .unwrap()
    }

    pub(crate) fn task(spec: AlgorithmSpec, sample: Sample, repeat: usize) -> BenchmarkTask {
        BenchmarkTask {
            algorithm: Arc::new(spec),
            sample,
            repeat,
            warmup: 0,
        }
    }

    #[test]
    fn test_run_task_records_every_repeat() {
        let sample = int_samples(200, vec![1.0]).remove(0);
        let result = run_task(&task(AlgorithmSpec::builtin(Builtin::Merge), sample, 4)).unwrap();
        assert_eq!(result.elapsed.len(), 4);
        assert_eq!(result.sample_size, 200);
        assert!(result.valid);
        assert!(result.mean_secs().is_finite());
    }

    #[test]
    fn test_broken_algorithm_is_invalid_not_fatal() {
        let sample = int_samples(200, vec![1.0]).remove(0);
        let identity = AlgorithmSpec::custom("identity", |keys| keys);
        let result = run_task(&task(identity, sample, 3)).unwrap();
        assert!(!result.valid);
        assert_eq!(result.elapsed.len(), 3);
        assert!(result.mean_secs().is_nan());
        assert!(result.first_mismatch.is_some());
    }

    #[test]
    fn test_panicking_algorithm_faults() {
        let sample = int_samples(50, vec![1.0]).remove(0);
        let boom = AlgorithmSpec::custom("boom", |_| panic!("algorithm bug"));
        let err = run_guarded(&task(boom, sample, 1)).unwrap_err();
        match err {
            BenchError::TaskFault {
                algorithm, message, ..
            } => {
                assert_eq!(algorithm, "boom");
                assert!(message.contains("algorithm bug"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_warmup_runs_are_not_timed() {
        use std::sync::atomic::AtomicUsize;
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let counting = AlgorithmSpec::custom("counting", move |keys: Keys| {
            counter.fetch_add(1, Ordering::Relaxed);
            keys.sorted()
        });
        let sample = int_samples(10, vec![1.0]).remove(0);
        let mut t = task(counting, sample, 2);
        t.warmup = 3;
        let result = run_task(&t).unwrap();
        assert_eq!(result.elapsed.len(), 2);
        assert_eq!(calls.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn test_plan_skips_and_orders() {
        let samples = int_samples(100, vec![0.0, 0.5, 1.0]);
        let mut registry = AlgorithmRegistry::new();
        registry
            .register_spec(AlgorithmSpec::builtin(Builtin::Heap))
            .unwrap();
        registry
            .register_spec(
                AlgorithmSpec::custom("never", |k| k).with_applicability(Applicability::Custom(
                    Arc::new(|_: &crate::ColumnMeta| false),
                )),
            )
            .unwrap();
        let scheduler = TaskScheduler::new(registry);
        let algorithms = scheduler.select(None).unwrap();
        let (tasks, skipped) = scheduler.plan(&algorithms, &samples, 1, 0);

        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].sample.ratio, 0.5);
        assert_eq!(tasks[1].sample.ratio, 1.0);
        assert_eq!(skipped.len(), 4);
        assert_eq!(skipped[0].reason, SkipReason::EmptySample);
        assert_eq!(skipped[1].reason, SkipReason::EmptySample);
        assert_eq!(skipped[2].reason, SkipReason::NotApplicable);
    }

    #[test]
    fn test_execute_rejects_zero_repeat_and_jobs() {
        let samples = int_samples(10, vec![1.0]);
        let scheduler = TaskScheduler::new(AlgorithmRegistry::default());
        let algorithms = scheduler.select(None).unwrap();
        let progress = SilentProgress::new();
        assert!(scheduler
            .execute(&algorithms, &samples, 0, 0, &progress)
            .is_err());
        let scheduler = scheduler.with_jobs(0);
        assert!(scheduler
            .execute(&algorithms, &samples, 1, 0, &progress)
            .is_err());
        assert_eq!(progress.completed(), 0);
    }

    #[test]
    fn test_modes_agree_on_flags() {
        let samples = int_samples(300, vec![0.25, 0.5, 1.0]);
        let mut registry = AlgorithmRegistry::default();
        registry.register("identity", |k| k, None).unwrap();

        let mut snapshots = Vec::new();
        for mode in [
            ExecutionMode::Sequential,
            ExecutionMode::ChannelPool,
            ExecutionMode::WorkStealing,
        ] {
            let scheduler = TaskScheduler::new(registry.clone())
                .with_mode(mode)
                .with_jobs(3);
            let algorithms = scheduler.select(None).unwrap();
            let progress = SilentProgress::new();
            let outcomes = scheduler
                .execute(&algorithms, &samples, 2, 0, &progress)
                .unwrap();
            assert_eq!(progress.completed(), 24);

            let mut flags: Vec<(String, u64, bool)> = outcomes
                .iter()
                .filter_map(|o| match o {
                    TaskOutcome::Completed(r) => {
                        Some((r.algorithm.clone(), r.ratio.to_bits(), r.valid))
                    }
                    TaskOutcome::Skipped(_) => None,
                })
                .collect();
            flags.sort();
            snapshots.push(flags);
        }

        assert_eq!(snapshots[0], snapshots[1]);
        assert_eq!(snapshots[1], snapshots[2]);
        assert_eq!(snapshots[0].iter().filter(|f| !f.2).count(), 3);
    }

    #[test]
    fn test_parallel_fault_propagates() {
        let samples = int_samples(100, vec![0.5, 1.0]);
        let mut registry = AlgorithmRegistry::default();
        registry
            .register("boom", |_| panic!("algorithm bug"), None)
            .unwrap();
        for mode in [ExecutionMode::ChannelPool, ExecutionMode::WorkStealing] {
            let scheduler = TaskScheduler::new(registry.clone())
                .with_mode(mode)
                .with_jobs(2);
            let algorithms = scheduler.select(None).unwrap();
            let err = scheduler
                .execute(&algorithms, &samples, 1, 0, &SilentProgress::new())
                .unwrap_err();
            assert!(matches!(err, BenchError::TaskFault { .. }));
        }
    }
}
