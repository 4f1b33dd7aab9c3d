use anyhow::{Result, anyhow};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use sortbench::config::{BenchArgs, parse_name_list};
use sortbench::dataset::{
    ColumnEncoding, ColumnType, load_csv_column, synthetic_floats, synthetic_ints,
};
use sortbench::progress::select_reporter;
use sortbench::{AlgorithmRegistry, BenchReport, BenchmarkRunner, Keys};

/// Where the benchmarked column comes from
#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct InputArgs {
    /// Comma-separated file with a header row
    #[arg(long, value_name = "FILE", requires = "column")]
    pub csv: Option<PathBuf>,

    /// Random integers in [0, --max] instead of a file
    #[arg(long, value_name = "N")]
    pub synthetic_ints: Option<usize>,

    /// Random floats in [0, 1) instead of a file
    #[arg(long, value_name = "N")]
    pub synthetic_floats: Option<usize>,
}

#[derive(Debug, Parser)]
pub struct RunArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Column to benchmark (with --csv)
    #[arg(long, value_name = "NAME")]
    pub column: Option<String>,

    /// How --csv cells become sort keys
    #[arg(long, value_enum, default_value_t = ColumnType::Numeric)]
    pub col_type: ColumnType,

    /// Category order for --col-type category (comma-separated, lowest first).
    /// Defaults to the sorted distinct values
    #[arg(long, value_name = "LIST")]
    pub category_order: Option<String>,

    /// Suffix letter ranks for --col-type code (comma-separated), default "N,S"
    #[arg(long, value_name = "LIST")]
    pub code_suffix_order: Option<String>,

    /// Upper bound for --synthetic-ints
    #[arg(long, default_value_t = 1_000_000)]
    pub max: i64,

    #[command(flatten)]
    pub bench: BenchArgs,

    /// Write the timing table as CSV
    #[arg(long, value_name = "FILE")]
    pub save_csv: Option<PathBuf>,

    /// Write timings and complexity fits as JSON
    #[arg(long, value_name = "FILE")]
    pub save_json: Option<PathBuf>,

    /// Write raw per-task results (binary) for later re-analysis with `show`
    #[arg(long, value_name = "FILE")]
    pub save_raw: Option<PathBuf>,

    /// Disable the progress display
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Benchmark sorting algorithms on a column
    Run(RunArgs),

    /// List registered algorithms and where they apply
    List,

    /// Re-analyse a raw results file written by `run --save-raw`
    Show {
        /// Raw results file
        input: PathBuf,
    },
}

#[derive(Debug, Parser)]
#[command(name = "sortbench", author, version, about)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.cmd {
        Commands::Run(args) => cmd_run(args),
        Commands::List => cmd_list(),
        Commands::Show { input } => cmd_show(input),
    }
}

impl RunArgs {
    fn encoding(&self) -> ColumnEncoding {
        ColumnEncoding {
            kind: self.col_type,
            category_order: self.category_order.as_deref().map(parse_name_list),
            code_suffix_order: self.code_suffix_order.as_deref().map(parse_name_list),
        }
    }
}

fn load_input(args: &RunArgs) -> Result<Keys> {
    let input = &args.input;
    if let Some(path) = &input.csv {
        let column = args
            .column
            .as_deref()
            .ok_or_else(|| anyhow!("--csv requires --column"))?;
        eprintln!(
            "Loading column '{}' from {:?} as {}",
            column,
            path,
            args.col_type.name()
        );
        return Ok(load_csv_column(path, column, &args.encoding())?.keys);
    }
    if let Some(n) = input.synthetic_ints {
        eprintln!("Generating {} random integers in [0, {}]", n, args.max);
        return Ok(synthetic_ints(n, args.max, args.bench.seed));
    }
    if let Some(n) = input.synthetic_floats {
        eprintln!("Generating {} random floats in [0, 1)", n);
        return Ok(synthetic_floats(n, args.bench.seed));
    }
    Err(anyhow!("no input given: use --csv, --synthetic-ints or --synthetic-floats"))
}

fn cmd_run(args: RunArgs) -> Result<()> {
    let config = args.bench.to_config()?;
    let data = load_input(&args)?;

    eprintln!("Benchmark configuration:");
    eprintln!("   {}", config.summary());
    eprintln!(
        "   Keys: {} rows, {} unique values ({})",
        data.len(),
        data.distinct(),
        data.dtype().name()
    );

    let mut runner = BenchmarkRunner::new(AlgorithmRegistry::default());
    if !args.quiet {
        runner = runner.with_progress(select_reporter());
    }
    let report = runner.run(&config, &data)?;

    print_report(&report);

    if let Some(path) = &args.save_csv {
        report.save_csv(path)?;
        eprintln!("Timing table saved to {:?}", path);
    }
    if let Some(path) = &args.save_json {
        report.save_json(path)?;
        eprintln!("JSON report saved to {:?}", path);
    }
    if let Some(path) = &args.save_raw {
        report.save_raw(path)?;
        eprintln!("Raw results saved to {:?}", path);
    }
    Ok(())
}

fn cmd_list() -> Result<()> {
    let registry = AlgorithmRegistry::default();
    println!("{:<20} {:<14}", "Algorithm", "Applies to");
    println!("{}", "-".repeat(34));
    for name in registry.names() {
        let applicability = registry
            .get(name)
            .map(|spec| spec.applicability().describe())
            .unwrap_or("-");
        println!("{:<20} {:<14}", name, applicability);
    }
    Ok(())
}

fn cmd_show(input: PathBuf) -> Result<()> {
    let report = BenchReport::load_raw(&input)?;
    eprintln!("Loaded {:?}", input);
    eprintln!("   {}", report.config.summary());
    eprintln!("   Keys: {} ({})", report.population, report.dtype.name());
    print_report(&report);
    Ok(())
}

fn print_report(report: &BenchReport) {
    report.print_timing_table();
    report.print_complexities();
    report.print_issues();
}
