use crossbeam::channel::{bounded, unbounded};
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::progress::ProgressReporter;
use crate::{BenchError, Result};

use super::{BenchmarkTask, ExecutionStrategy, TaskResult, collect_results, panic_message, run_guarded};

/// **CHANNEL POOL STRATEGY** - bounded MPMC task queue with scoped workers
///
/// **Architecture:**
/// - All tasks are preloaded into a bounded crossbeam queue
/// - `jobs` scoped workers pull tasks until the queue is drained
/// - Results flow back over an unbounded channel to the calling thread,
///   which reduces them in arrival order
/// - The first fault raises an abort flag; workers finish the task in hand
///   and stop taking new ones
pub struct ChannelPoolExecution {
    jobs: usize,
}

impl ChannelPoolExecution {
    pub fn new(jobs: usize) -> Self {
        Self { jobs: jobs.max(1) }
    }
}

impl ExecutionStrategy for ChannelPoolExecution {
    fn execute(
        &self,
        tasks: Vec<BenchmarkTask>,
        progress: &dyn ProgressReporter,
    ) -> Result<Vec<TaskResult>> {
        if tasks.is_empty() {
            return Ok(Vec::new());
        }

        let workers = self.jobs.min(tasks.len());
        let (tx_task, rx_task) = bounded::<BenchmarkTask>(tasks.len());
        for task in tasks {
            tx_task
                .send(task)
                .map_err(|_| BenchError::WorkerPool("task queue closed".to_string()))?;
        }
        // Workers exit once the queue is drained
        drop(tx_task);

        let (tx_result, rx_result) = unbounded::<Result<TaskResult>>();
        let abort = AtomicBool::new(false);

        debug!("Dispatching over {} channel-pool workers", workers);

        let scoped = crossbeam::thread::scope(|s| {
            for _ in 0..workers {
                let rx_task = rx_task.clone();
                let tx_result = tx_result.clone();
                let abort = &abort;
                s.spawn(move |_| {
                    while let Ok(task) = rx_task.recv() {
                        if abort.load(Ordering::Acquire) {
                            break;
                        }
                        if tx_result.send(run_guarded(&task)).is_err() {
                            break;
                        }
                    }
                });
            }
            // Only worker clones remain, so the coordinator sees end-of-stream
            // after the last worker exits
            drop(tx_result);

            collect_results(&rx_result, &abort, progress)
        });

        match scoped {
            Ok(result) => result,
            Err(payload) => Err(BenchError::WorkerPool(panic_message(payload.as_ref()))),
        }
    }
}
