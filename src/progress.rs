//! Progress reporting for the task scheduler.
//!
//! The scheduler only sees the [`ProgressReporter`] capability. A terminal bar
//! is used when stderr is a terminal, otherwise a coarse percentage is logged.
//! Reporters are only ever called between tasks, never inside a timed region.

use std::io::{IsTerminal, Write};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::info;

pub trait ProgressReporter: Send + Sync {
    /// Called once before dispatch with the number of runnable tasks
    fn start(&self, total: usize);

    /// Called once per finished task
    fn task_completed(&self);

    /// Called once after the last task
    fn finish(&self);

    /// Tasks completed so far
    fn completed(&self) -> usize;
}

/// Pick the richest reporter the environment supports
pub fn select_reporter() -> Box<dyn ProgressReporter> {
    if std::io::stderr().is_terminal() {
        Box::new(TerminalBar::new())
    } else {
        Box::new(PercentReporter::new(10))
    }
}

/// Reporter that only counts
#[derive(Debug, Default)]
pub struct SilentProgress {
    done: AtomicUsize,
}

impl SilentProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressReporter for SilentProgress {
    fn start(&self, _total: usize) {}

    fn task_completed(&self) {
        self.done.fetch_add(1, Ordering::Relaxed);
    }

    fn finish(&self) {}

    fn completed(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }
}

/// Coarse percentage lines through the logger, one per `step` percent
#[derive(Debug)]
pub struct PercentReporter {
    step: usize,
    total: AtomicUsize,
    done: AtomicUsize,
    last_reported: AtomicUsize,
}

impl PercentReporter {
    pub fn new(step: usize) -> Self {
        Self {
            step: step.clamp(1, 100),
            total: AtomicUsize::new(0),
            done: AtomicUsize::new(0),
            last_reported: AtomicUsize::new(0),
        }
    }
}

impl ProgressReporter for PercentReporter {
    fn start(&self, total: usize) {
        self.total.store(total, Ordering::Relaxed);
        info!("Running {} benchmark tasks", total);
    }

    fn task_completed(&self) {
        let done = self.done.fetch_add(1, Ordering::Relaxed) + 1;
        let total = self.total.load(Ordering::Relaxed).max(1);
        let bucket = (done * 100 / total) / self.step * self.step;
        if self.last_reported.fetch_max(bucket, Ordering::Relaxed) < bucket {
            info!("Progress: {}% ({}/{})", bucket, done, total);
        }
    }

    fn finish(&self) {}

    fn completed(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }
}

const BAR_WIDTH: usize = 40;

/// In-place progress bar redrawn on stderr
#[derive(Debug, Default)]
pub struct TerminalBar {
    total: AtomicUsize,
    done: AtomicUsize,
    // Serialises redraws from concurrent completions
    draw: Mutex<()>,
}

impl TerminalBar {
    pub fn new() -> Self {
        Self::default()
    }

    fn render(done: usize, total: usize) -> String {
        let total = total.max(1);
        let filled = (done * BAR_WIDTH / total).min(BAR_WIDTH);
        format!(
            "\r[{}{}] {}/{} ({:>3}%)",
            "#".repeat(filled),
            " ".repeat(BAR_WIDTH - filled),
            done,
            total,
            done * 100 / total
        )
    }

    fn redraw(&self) {
        let Ok(_guard) = self.draw.lock() else {
            return;
        };
        let line = Self::render(
            self.done.load(Ordering::Relaxed),
            self.total.load(Ordering::Relaxed),
        );
        let mut stderr = std::io::stderr().lock();
        // Drawing failures are cosmetic
        let _ = stderr.write_all(line.as_bytes());
        let _ = stderr.flush();
    }
}

impl ProgressReporter for TerminalBar {
    fn start(&self, total: usize) {
        self.total.store(total, Ordering::Relaxed);
        self.redraw();
    }

    fn task_completed(&self) {
        self.done.fetch_add(1, Ordering::Relaxed);
        self.redraw();
    }

    fn finish(&self) {
        let _ = writeln!(std::io::stderr());
    }

    fn completed(&self) -> usize {
        self.done.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_counts() {
        let progress = SilentProgress::new();
        progress.start(3);
        progress.task_completed();
        progress.task_completed();
        assert_eq!(progress.completed(), 2);
    }

    #[test]
    fn test_percent_reporter_counts() {
        let progress = PercentReporter::new(25);
        progress.start(8);
        for _ in 0..8 {
            progress.task_completed();
        }
        assert_eq!(progress.completed(), 8);
        assert_eq!(progress.last_reported.load(Ordering::Relaxed), 100);
    }

    #[test]
    fn test_bar_render() {
        let line = TerminalBar::render(5, 10);
        assert!(line.contains("5/10"));
        assert!(line.contains(&"#".repeat(BAR_WIDTH / 2)));
        assert!(line.contains(" 50%"));
    }
}
