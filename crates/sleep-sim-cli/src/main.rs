use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use sleep_sim_core::export::{write_results_csv, write_summary_json};
use sleep_sim_core::loader::load_directory;
use sleep_sim_core::night::NightRecord;
use sleep_sim_core::synth::{generate_cohort, CohortSpec};
use sleep_sim_core::{RunSummary, SimConfig, SimulationCoordinator};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

const RESULTS_FILE: &str = "simulation_results.csv";
const SUMMARY_FILE: &str = "summary.json";
const BENCHMARK_NIGHTS: usize = 60;
const BENCHMARK_COHORTS: [usize; 4] = [10, 100, 1_000, 10_000];

#[derive(Parser)]
#[command(name = "sleep-sim")]
#[command(about = "Sleep intervention cohort simulator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate every subject file in a data directory
    Run {
        /// Directory holding subject_<ID>_state.json files
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,

        /// Path to config file (JSON, optional)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output directory for results
        #[arg(long, default_value = ".")]
        out: PathBuf,

        /// Override the configured round cap
        #[arg(long)]
        max_rounds: Option<usize>,
    },
    /// Time full runs over synthetic cohorts of increasing size
    Benchmark {
        /// Plan subjects in parallel
        #[arg(long)]
        parallel: bool,
    },
    /// Dump the default configuration to stdout
    DumpDefaultConfig,
    /// Write a synthetic cohort as subject files
    Synth {
        /// Output directory for the subject files
        #[arg(long)]
        out: PathBuf,

        #[arg(long, default_value_t = 10)]
        subjects: usize,

        #[arg(long, default_value_t = 30)]
        nights: usize,

        #[arg(long, default_value_t = 3)]
        actions: usize,

        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn load_config(path: Option<&Path>) -> Result<SimConfig> {
    let Some(path) = path else {
        return Ok(SimConfig::default());
    };
    let file = File::open(path).context("failed to open config file")?;
    let config: SimConfig =
        serde_json::from_reader(BufReader::new(file)).context("failed to parse config")?;
    info!(path = %path.display(), "loaded config");
    Ok(config)
}

fn save_outputs(out_dir: &Path, summary: &RunSummary) -> Result<()> {
    std::fs::create_dir_all(out_dir).context("failed to create output directory")?;

    if summary.results.is_empty() {
        info!("no results to save");
    } else {
        let path = out_dir.join(RESULTS_FILE);
        let file = File::create(&path).context("failed to create results file")?;
        let rows = write_results_csv(&mut BufWriter::new(file), &summary.results)
            .context("failed to write results")?;
        info!(path = %path.display(), rows, "results saved");
    }

    let path = out_dir.join(SUMMARY_FILE);
    let file = File::create(&path).context("failed to create summary file")?;
    write_summary_json(BufWriter::new(file), summary).context("failed to write summary")?;
    info!(path = %path.display(), "summary saved");
    Ok(())
}

fn run(
    data_dir: &Path,
    config: Option<&Path>,
    out: &Path,
    max_rounds: Option<usize>,
) -> Result<()> {
    let mut config = load_config(config)?;
    if let Some(max_rounds) = max_rounds {
        config.max_rounds = max_rounds;
    }

    let report = load_directory(data_dir).context("failed to load subject data")?;
    let mut coordinator = SimulationCoordinator::with_subjects(report.subjects, config)
        .context("config validation error")?;
    coordinator.record_skipped(report.skipped);

    let summary = coordinator
        .run_to_completion()
        .context("simulation failed")?;
    save_outputs(out, &summary)?;

    println!(
        "Run complete ({:?}): {} subjects, {} rounds, {} decisions",
        summary.status,
        summary.subject_count,
        summary.rounds,
        summary.results.len()
    );
    println!(
        "  Avg CSI: {:.3}, avg CStab: {:.3}, avg sleep debt: {:.2}",
        summary.final_metrics.average_primary_index,
        summary.final_metrics.average_stability_index,
        summary.final_metrics.average_sleep_debt,
    );
    Ok(())
}

fn run_benchmark(num_subjects: usize, parallel: bool) -> Result<()> {
    let spec = CohortSpec {
        num_subjects,
        nights_per_subject: BENCHMARK_NIGHTS,
        ..CohortSpec::default()
    };
    let config = SimConfig {
        parallel_planning: parallel,
        sample_every: BENCHMARK_NIGHTS,
        ..SimConfig::default()
    };

    let cohort = generate_cohort(&spec);
    let mut coordinator = SimulationCoordinator::with_subjects(cohort, config)
        .context("benchmark config validation error")?;

    let start = Instant::now();
    let summary = coordinator
        .run_to_completion()
        .context("benchmark run failed")?;
    let elapsed = start.elapsed();

    let decisions = summary.results.len();
    let per_sec = decisions as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
    println!("--- {num_subjects} subjects x {BENCHMARK_NIGHTS} nights ---");
    println!(
        "  Total:         {:.1} ms over {} rounds",
        elapsed.as_secs_f64() * 1_000.0,
        summary.rounds
    );
    println!("  Throughput:    {per_sec:.0} decisions/sec");
    println!(
        "  Final:         avg CSI={:.3}, avg debt={:.2}",
        summary.final_metrics.average_primary_index, summary.final_metrics.average_sleep_debt
    );
    println!();
    Ok(())
}

#[derive(Serialize)]
struct SubjectFileOut<'a> {
    nights: &'a [NightRecord],
}

fn write_synth_cohort(out: &Path, spec: &CohortSpec) -> Result<usize> {
    std::fs::create_dir_all(out).context("failed to create output directory")?;
    let cohort = generate_cohort(spec);
    for subject in &cohort {
        let path = out.join(format!("subject_{}_state.json", subject.subject_id));
        let file = File::create(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let body = SubjectFileOut {
            nights: &subject.nights,
        };
        serde_json::to_writer_pretty(BufWriter::new(file), &body)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(cohort.len())
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::DumpDefaultConfig => {
            let config = SimConfig::default();
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Benchmark { parallel } => {
            if cfg!(debug_assertions) {
                eprintln!("WARNING: running in debug mode. Results are not representative.");
                eprintln!("         Use: cargo run -p sleep-sim-cli --release -- benchmark");
                eprintln!();
            }
            println!("=== Sleep Sim Benchmark ===");
            println!("Planning: {}", if parallel { "parallel" } else { "sequential" });
            println!();
            for num_subjects in BENCHMARK_COHORTS {
                run_benchmark(num_subjects, parallel)?;
            }
        }
        Commands::Run {
            data_dir,
            config,
            out,
            max_rounds,
        } => run(&data_dir, config.as_deref(), &out, max_rounds)?,
        Commands::Synth {
            out,
            subjects,
            nights,
            actions,
            seed,
        } => {
            let spec = CohortSpec {
                num_subjects: subjects,
                nights_per_subject: nights,
                actions_per_night: actions,
                seed,
            };
            let written = write_synth_cohort(&out, &spec)?;
            println!("Wrote {written} subject files to {:?}", out);
        }
    }
    Ok(())
}
