use crate::Result;
use crate::progress::ProgressReporter;

use super::{BenchmarkTask, ExecutionStrategy, TaskResult, run_guarded};

/// **SEQUENTIAL STRATEGY** - one task at a time, in plan order
///
/// No threads, no channels. Timings are free from interference by sibling
/// tasks, so this is the mode to compare parallel runs against.
pub struct SequentialExecution;

impl ExecutionStrategy for SequentialExecution {
    fn execute(
        &self,
        tasks: Vec<BenchmarkTask>,
        progress: &dyn ProgressReporter,
    ) -> Result<Vec<TaskResult>> {
        let mut results = Vec::with_capacity(tasks.len());
        for task in &tasks {
            results.push(run_guarded(task)?);
            progress.task_completed();
        }
        Ok(results)
    }
}
