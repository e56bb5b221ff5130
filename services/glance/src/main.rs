//! Command-line comparison of two geophysical data files.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use delta::{statistic_doc, StatValue};
use glance_common::AnalysisDefaults;
use glance::compare::{analyze_geolocation, run_comparisons, select_variables, Selection};
use glance::config_loader::{load_run_config, CommandLineSettings, RunConfig};
use glance::names::{check_file_names, parse_selectors};
use glance::noise::noise_check;
use glance::report::{ComparisonReport, InputFiles, RunInfo};
use glance::sources::{open_data_file, DataFile, FileInfo};

#[derive(Parser, Debug)]
#[command(name = "glance")]
#[command(version, about = "Compare variables between two geophysical data files")]
struct Cli {
    /// Log level
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the variables available for comparison in each file
    Info {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print difference statistics for the selected variables
    Stats {
        #[command(flatten)]
        compare: CompareArgs,

        /// Explain every statistic
        #[arg(short, long)]
        verbose: bool,
    },

    /// Write a JSON comparison report, including geolocation analysis
    Report {
        #[command(flatten)]
        compare: CompareArgs,

        /// Output directory for report.json
        #[arg(short = 'p', long, default_value = ".")]
        output: PathBuf,
    },

    /// Compare an actual product and a noise-added copy against truth
    Noisecheck {
        /// Truth file
        truth: PathBuf,

        /// Truth with noise added
        noise: PathBuf,

        /// Product under test
        actual: PathBuf,

        /// Variable selectors: pattern[:epsilon[:missing]] (default: all shared variables)
        selectors: Vec<String>,

        /// Default absolute epsilon
        #[arg(short, long, allow_negative_numbers = true)]
        epsilon: Option<f64>,

        /// Default missing value
        #[arg(short, long, allow_negative_numbers = true)]
        missing: Option<f64>,
    },
}

#[derive(Args, Debug)]
struct CompareArgs {
    /// File A
    file_a: PathBuf,

    /// File B
    file_b: PathBuf,

    /// Variable selectors: pattern[:epsilon[:missing]] (default: all shared variables)
    selectors: Vec<String>,

    /// YAML run configuration; replaces the options below and the selectors
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Default absolute epsilon
    #[arg(short, long, allow_negative_numbers = true)]
    epsilon: Option<f64>,

    /// Default epsilon as a fraction of max(|a|, |b|)
    #[arg(long, conflicts_with = "epsilon")]
    epsilon_percent: Option<f64>,

    /// Default missing value
    #[arg(short, long, allow_negative_numbers = true)]
    missing: Option<f64>,

    /// Maximum fraction of valid points outside epsilon
    #[arg(long)]
    epsilon_failure_tolerance: Option<f64>,

    /// Maximum fraction of non-finite points
    #[arg(long)]
    nonfinite_tolerance: Option<f64>,

    /// Longitude variable name
    #[arg(short = 'o', long)]
    longitude: Option<String>,

    /// Latitude variable name
    #[arg(short = 'a', long)]
    latitude: Option<String>,

    /// Epsilon for comparing longitude and latitude
    #[arg(short = 'l', long, allow_negative_numbers = true)]
    lonlat_epsilon: Option<f64>,
}

impl CompareArgs {
    /// Settings and variable selection, from the config file when one is
    /// given and from the options otherwise.
    fn settings(&self) -> Result<(RunConfig, Selection, bool)> {
        if let Some(path) = &self.config {
            info!(path = %path.display(), "Using config file settings");
            if !self.selectors.is_empty() {
                warn!("Variable selectors are ignored when a config file is used");
            }
            let config = load_run_config(path)?;
            return Ok((config, Selection::Configured, true));
        }

        info!("Using command line settings");
        let config = RunConfig::from_command_line(CommandLineSettings {
            epsilon: self.epsilon,
            epsilon_percent: self.epsilon_percent,
            missing_value: self.missing,
            epsilon_failure_tolerance: self.epsilon_failure_tolerance,
            nonfinite_data_tolerance: self.nonfinite_tolerance,
            longitude: self.longitude.clone(),
            latitude: self.latitude.clone(),
            lon_lat_epsilon: self.lonlat_epsilon,
        })?;
        let selectors = parse_selectors(&self.selectors)?;
        Ok((config, Selection::Patterns(selectors), false))
    }

    fn open(&self) -> Result<(Box<dyn DataFile>, Box<dyn DataFile>)> {
        let a = open_data_file(&self.file_a)
            .with_context(|| format!("Failed to open file A {:?}", self.file_a))?;
        let b = open_data_file(&self.file_b)
            .with_context(|| format!("Failed to open file B {:?}", self.file_b))?;
        Ok((a, b))
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json)?;

    match cli.command {
        Command::Info { files } => info_command(&files),
        Command::Stats { compare, verbose } => stats_command(&compare, verbose),
        Command::Report { compare, output } => report_command(&compare, &output),
        Command::Noisecheck {
            truth,
            noise,
            actual,
            selectors,
            epsilon,
            missing,
        } => {
            let defaults = AnalysisDefaults {
                epsilon,
                missing_value: missing,
                ..Default::default()
            };
            noisecheck_command([&truth, &noise, &actual], &selectors, &defaults)
        }
    }
}

fn init_tracing(log_level: &str, json: bool) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn exit_code(all_passed: bool) -> ExitCode {
    if all_passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

// ============================================================================
// Commands
// ============================================================================

fn info_command(files: &[PathBuf]) -> Result<ExitCode> {
    for path in files {
        let file = open_data_file(path).with_context(|| format!("Failed to open {:?}", path))?;
        println!("{}:", path.display());
        for name in file.variable_names() {
            let shape = file.shape(&name)?;
            println!("  {} {}", name, shape);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn stats_command(args: &CompareArgs, verbose: bool) -> Result<ExitCode> {
    let (config, selection, _) = args.settings()?;
    let (a, b) = args.open()?;

    let names = check_file_names(a.as_ref(), b.as_ref());
    let variables = select_variables(&config, &selection, &names, a.as_ref(), b.as_ref())?;
    if variables.is_empty() {
        warn!("No variables selected for comparison");
    }

    let results = run_comparisons(a.as_ref(), b.as_ref(), variables, None);
    let mut all_passed = true;

    for (name, result) in &results {
        println!("{}", "-".repeat(32));
        println!("{}", name);
        println!();
        let comparison = match result {
            Ok(c) => c,
            Err(e) => {
                println!("  error: {}", e);
                println!();
                continue;
            }
        };

        for (group, stats) in comparison.stats.groups() {
            println!("{}", group);
            for (key, value) in stats {
                println!("  {}: {}", key, value);
                if verbose {
                    if let Some(doc) = statistic_doc(key) {
                        println!("    {}", doc);
                    }
                }
            }
            println!();
        }

        let verdict = comparison.verdict();
        all_passed &= !verdict.is_fail();
        println!("verdict: {}", verdict);
        if comparison.evaluation.low_confidence {
            println!("  (low confidence: {})", StatValue::NoValidData);
        }
        println!();
    }

    Ok(exit_code(all_passed))
}

fn report_command(args: &CompareArgs, output: &Path) -> Result<ExitCode> {
    let (config, selection, used_config_file) = args.settings()?;
    let (a, b) = args.open()?;

    let files = InputFiles {
        file_a: FileInfo::from_path(&args.file_a)?,
        file_b: FileInfo::from_path(&args.file_b)?,
    };

    let names = check_file_names(a.as_ref(), b.as_ref());
    let variables = select_variables(&config, &selection, &names, a.as_ref(), b.as_ref())?;

    let geolocation = analyze_geolocation(a.as_ref(), b.as_ref(), &config.lat_lon)
        .context("Unable to reconcile longitude and latitude between files")?;
    if geolocation.short_circuit_diffs {
        warn!(
            points = geolocation.lon_lat_equality.not_equal_count,
            "Longitude/latitude differ; difference results may be spatially misleading"
        );
    }

    let results = run_comparisons(a.as_ref(), b.as_ref(), variables, Some(&geolocation));

    let run_info = RunInfo::new(config.lat_lon.clone(), config.defaults.clone(), used_config_file);
    let report = ComparisonReport::new(run_info, files, Some(geolocation), names, results);
    let path = report.write_to(output)?;

    let failed = report.failed_variables();
    if !failed.is_empty() {
        warn!(variables = ?failed, "Variables failed their tolerances");
    }
    println!("{}", path.display());

    Ok(exit_code(report.all_passed()))
}

fn noisecheck_command(
    [truth, noise, actual]: [&PathBuf; 3],
    selectors: &[String],
    defaults: &AnalysisDefaults,
) -> Result<ExitCode> {
    defaults.validate().context("Invalid epsilon")?;
    let selectors = parse_selectors(selectors)?;

    let open = |label: &str, path: &PathBuf| {
        info!(path = %path.display(), "Opening {} file", label);
        open_data_file(path).with_context(|| format!("Failed to open {} file {:?}", label, path))
    };
    let truth = open("truth", truth)?;
    let noise = open("noise", noise)?;
    let actual = open("actual", actual)?;

    let results = noise_check(
        truth.as_ref(),
        noise.as_ref(),
        actual.as_ref(),
        &selectors,
        defaults,
    )?;

    for (name, result) in &results {
        println!("{}", "-".repeat(32));
        println!("{}", name);
        match result {
            Ok(check) => {
                for (key, value) in check.summary.rows() {
                    let value = value
                        .map_or_else(|| StatValue::Undefined.to_string(), |v| v.to_string());
                    println!("  {}: {}", key, value);
                }
            }
            Err(e) => println!("  error: {}", e),
        }
    }

    Ok(ExitCode::SUCCESS)
}
