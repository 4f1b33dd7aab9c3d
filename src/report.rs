//! Reporting boundary: console tables, CSV/JSON export and a raw binary dump
//! of task results for later re-analysis.

use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::Dtype;
use crate::aggregate::{CellStatus, TimingAggregator, TimingTable};
use crate::complexity::{ComplexityFit, ComplexityFitter};
use crate::config::BenchConfig;
use crate::scheduler::{SkippedTask, TaskOutcome, TaskResult};

const RAW_MAGIC: &[u8] = b"SORTBENCH\x00\x01";

/// Everything one run produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchReport {
    pub config: BenchConfig,
    pub dtype: Dtype,
    /// Rows in the benchmarked column
    pub population: usize,
    /// `(ratio, sample_size)` per table row, ascending
    pub sizes: Vec<(f64, usize)>,
    pub table: TimingTable,
    pub complexities: Vec<ComplexityFit>,
    pub results: Vec<TaskResult>,
    pub skipped: Vec<SkippedTask>,
}

/// Raw measurements only; tables and fits are recomputed on load
#[derive(Serialize, Deserialize)]
struct RawDump {
    config: BenchConfig,
    dtype: Dtype,
    population: usize,
    sizes: Vec<(f64, usize)>,
    algorithms: Vec<String>,
    results: Vec<TaskResult>,
    skipped: Vec<SkippedTask>,
}

#[derive(Serialize)]
struct JsonExport<'a> {
    config: &'a BenchConfig,
    dtype: Dtype,
    population: usize,
    timings: Vec<JsonTiming<'a>>,
    complexities: &'a [ComplexityFit],
}

#[derive(Serialize)]
struct JsonTiming<'a> {
    ratio: f64,
    n: usize,
    algorithm: &'a str,
    /// `None` for invalid or skipped cells
    mean_secs: Option<f64>,
    status: &'static str,
}

fn status_label(status: CellStatus) -> &'static str {
    match status {
        CellStatus::Measured => "measured",
        CellStatus::Invalid => "invalid",
        CellStatus::Skipped(_) => "skipped",
    }
}

fn create_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

impl BenchReport {
    /// Display the mean timing table
    pub fn print_timing_table(&self) {
        let algorithms = self.table.algorithms();
        let width = 10 + 10 + algorithms.len() * 16;

        println!("\nMean Timing (seconds):");
        println!("{}", "=".repeat(width));
        print!("{:<10}{:<10}", "Ratio", "N");
        for name in algorithms {
            print!("{:>16}", name);
        }
        println!();
        println!("{}", "-".repeat(width));

        for row in self.table.rows() {
            print!("{:<10}{:<10}", format!("{:.3}", row.ratio), row.sample_size);
            for cell in &row.cells {
                let shown = match cell.status {
                    CellStatus::Measured => format!("{:.6}", cell.mean_secs),
                    CellStatus::Invalid => "NaN".to_string(),
                    CellStatus::Skipped(_) => "skip".to_string(),
                };
                print!("{:>16}", shown);
            }
            println!();
        }
        println!("{}", "=".repeat(width));
    }

    /// Display the per-algorithm complexity fits
    pub fn print_complexities(&self) {
        println!("\nEmpirical Complexity (time ~ n^a):");
        println!("{}", "=".repeat(60));
        println!("{:<20} {:>8} {:>10} {:>10} {:>8}", "Algorithm", "Points", "a", "b", "R²");
        println!("{}", "-".repeat(60));
        for fit in &self.complexities {
            let fmt = |v: Option<f64>, prec: usize| match v {
                Some(v) => format!("{:.*}", prec, v),
                None => "-".to_string(),
            };
            println!(
                "{:<20} {:>8} {:>10} {:>10} {:>8}",
                fit.algorithm,
                fit.points,
                fmt(fit.slope(), 3),
                fmt(fit.intercept(), 3),
                fmt(fit.r_squared(), 4)
            );
        }
        println!("{}", "=".repeat(60));
    }

    /// Display invalid and skipped tasks, if any
    pub fn print_issues(&self) {
        let invalid: Vec<&TaskResult> = self.results.iter().filter(|r| !r.valid).collect();
        if invalid.is_empty() && self.skipped.is_empty() {
            return;
        }
        println!("\nIssues:");
        for result in invalid {
            println!(
                "   {} @ {:.3}: wrong ordering (first mismatch at {})",
                result.algorithm,
                result.ratio,
                result
                    .first_mismatch
                    .map_or_else(|| "?".to_string(), |p| p.to_string())
            );
        }
        for skip in &self.skipped {
            println!(
                "   {} @ {:.3}: skipped ({})",
                skip.algorithm,
                skip.ratio,
                skip.reason.describe()
            );
        }
    }

    /// Write the timing table as CSV: `ratio,n,<algorithm...>`
    pub fn save_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        create_parent_dirs(path)?;
        let mut file = BufWriter::new(File::create(path)?);

        writeln!(file, "ratio,n,{}", self.table.algorithms().join(","))?;
        for row in self.table.rows() {
            write!(file, "{},{}", row.ratio, row.sample_size)?;
            for cell in &row.cells {
                if cell.is_measured() {
                    write!(file, ",{}", cell.mean_secs)?;
                } else {
                    write!(file, ",NaN")?;
                }
            }
            writeln!(file)?;
        }
        file.flush()?;
        Ok(())
    }

    /// Write timings and complexity fits as pretty JSON
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        create_parent_dirs(path)?;

        let algorithms = self.table.algorithms();
        let timings = self
            .table
            .rows()
            .iter()
            .flat_map(|row| {
                row.cells
                    .iter()
                    .zip(algorithms)
                    .map(move |(cell, algorithm)| JsonTiming {
                        ratio: row.ratio,
                        n: row.sample_size,
                        algorithm,
                        mean_secs: cell.is_measured().then_some(cell.mean_secs),
                        status: status_label(cell.status),
                    })
            })
            .collect();
        let export = JsonExport {
            config: &self.config,
            dtype: self.dtype,
            population: self.population,
            timings,
            complexities: &self.complexities,
        };

        let file = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(file, &export)
            .map_err(|e| anyhow!("JSON serialization failed: {}", e))?;
        Ok(())
    }

    /// Dump raw per-task results with a magic header
    pub fn save_raw<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        create_parent_dirs(path)?;
        let mut file = BufWriter::new(File::create(path)?);

        file.write_all(RAW_MAGIC)?;

        let dump = RawDump {
            config: self.config.clone(),
            dtype: self.dtype,
            population: self.population,
            sizes: self.sizes.clone(),
            algorithms: self.table.algorithms().to_vec(),
            results: self.results.clone(),
            skipped: self.skipped.clone(),
        };
        bincode::serialize_into(&mut file, &dump)
            .map_err(|e| anyhow!("Serialization failed: {}", e))?;
        file.flush()?;
        Ok(())
    }

    /// Load a raw dump and rebuild the timing table and fits from it
    pub fn load_raw<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = BufReader::new(File::open(path)?);

        let mut magic = [0u8; RAW_MAGIC.len()];
        file.read_exact(&mut magic)?;
        if magic != RAW_MAGIC {
            return Err(anyhow!("Invalid sortbench raw file: wrong magic header"));
        }

        let dump: RawDump = bincode::deserialize_from(file)
            .map_err(|e| anyhow!("Deserialization failed: {}", e))?;

        let outcomes: Vec<TaskOutcome> = dump
            .results
            .iter()
            .cloned()
            .map(TaskOutcome::Completed)
            .chain(dump.skipped.iter().cloned().map(TaskOutcome::Skipped))
            .collect();
        let table = TimingAggregator::build(&dump.algorithms, &dump.sizes, &outcomes)?;
        let complexities = ComplexityFitter::fit_table(&table);

        Ok(Self {
            config: dump.config,
            dtype: dump.dtype,
            population: dump.population,
            sizes: dump.sizes,
            table,
            complexities,
            results: dump.results,
            skipped: dump.skipped,
        })
    }
}
