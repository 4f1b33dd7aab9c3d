use crossbeam::channel::unbounded;
use log::debug;
use rayon::ThreadPoolBuilder;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::progress::ProgressReporter;
use crate::{BenchError, Result};

use super::{BenchmarkTask, ExecutionStrategy, TaskResult, collect_results, run_guarded};

/// **WORK STEALING STRATEGY** - one rayon job per task on a dedicated pool
///
/// A private pool sized to `jobs` is built per run so the global rayon pool
/// is never reconfigured. Each task is spawned as its own job; rayon's
/// deques balance uneven task costs (insertion sort at ratio 1.0 next to
/// radix sort at ratio 0.1). Results come back over a crossbeam channel.
pub struct WorkStealingExecution {
    jobs: usize,
}

impl WorkStealingExecution {
    pub fn new(jobs: usize) -> Self {
        Self { jobs: jobs.max(1) }
    }
}

impl ExecutionStrategy for WorkStealingExecution {
    fn execute(
        &self,
        tasks: Vec<BenchmarkTask>,
        progress: &dyn ProgressReporter,
    ) -> Result<Vec<TaskResult>> {
        if tasks.is_empty() {
            return Ok(Vec::new());
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .thread_name(|i| format!("sortbench-worker-{}", i))
            .build()
            .map_err(|e| BenchError::WorkerPool(e.to_string()))?;

        debug!(
            "Dispatching {} tasks over a {}-thread rayon pool",
            tasks.len(),
            self.jobs
        );

        let abort = Arc::new(AtomicBool::new(false));
        let (tx_result, rx_result) = unbounded::<Result<TaskResult>>();

        for task in tasks {
            let abort = Arc::clone(&abort);
            let tx_result = tx_result.clone();
            pool.spawn(move || {
                if abort.load(Ordering::Acquire) {
                    return;
                }
                // Receiver outlives every job
                let _ = tx_result.send(run_guarded(&task));
            });
        }
        drop(tx_result);

        collect_results(&rx_result, &abort, progress)
    }
}
