//src/bin/confindr_cli.rs

use std::path::PathBuf;
use std::process;

use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use confindr_rs::config::{AlleleSelection, CutoffMode, CutoffPolicy, DatabasePaths, DetectionConfig};
use confindr_rs::error::Result;
use confindr_rs::tools::{ToolPaths, Toolkit};
use confindr_rs::{detect_contamination_with_progress, find_samples};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CutoffArg {
    /// keep k-mers seen at least `cutoff` times
    AtLeast,
    /// keep k-mers seen more than `cutoff` times
    GreaterThan,
}

#[derive(Parser)]
#[command(name = "confindr-rs")]
#[command(version)]
#[command(about = "Detect intra- and cross-species contamination in bacterial read sets")]
struct Args {
    /// Folder with the FASTQ files to check; any file with .fq or .fastq in its name is used
    #[arg(short = 'i', long = "input-directory", value_name = "DIR", help_heading = "Input")]
    input_directory: PathBuf,

    /// Forward read identifier
    #[arg(short = 'f', long = "forward-id", default_value = "_R1", help_heading = "Input")]
    forward_id: String,

    /// Reverse read identifier
    #[arg(short = 'r', long = "reverse-id", default_value = "_R2", help_heading = "Input")]
    reverse_id: String,

    /// Folder holding rMLST_combined.fasta, profiles.txt and refseq.msh
    #[arg(short = 'd', long, value_name = "DIR", help_heading = "Database")]
    databases: PathBuf,

    /// Use every listed gene except the genus-specific ones when building genus databases
    #[arg(long = "exclude-genus-alleles", help_heading = "Database")]
    exclude_genus_alleles: bool,

    /// Output folder; the report is written to <DIR>/confindr_report.csv
    #[arg(short = 'o', long = "output-name", value_name = "DIR", help_heading = "Output")]
    output_name: PathBuf,

    /// Keep per-sample intermediate files
    #[arg(short = 'u', long = "keep-temp", help_heading = "Output")]
    keep_temp: bool,

    /// Debug-level logging
    #[arg(short = 'v', long, help_heading = "Output")]
    verbose: bool,

    /// Number of subsample cycles per sample
    #[arg(short = 'n', long = "number-subsamples", default_value = "5", help_heading = "Detection")]
    number_subsamples: usize,

    #[arg(short = 'k', long = "kmer-size", default_value = "31", help_heading = "Detection")]
    kmer_size: usize,

    /// Coverage depth to subsample to
    #[arg(short = 's', long = "subsample-depth", default_value = "20", help_heading = "Detection")]
    subsample_depth: u64,

    /// Minimum count for a k-mer to be used
    #[arg(short = 'c', long = "kmer-cutoff", default_value = "2", help_heading = "Detection")]
    kmer_cutoff: u32,

    #[arg(long = "cutoff-mode", value_enum, default_value = "at-least", help_heading = "Detection")]
    cutoff_mode: CutoffArg,

    /// Derive the k-mer cutoff from each subsample's coverage instead of --kmer-cutoff
    #[arg(long = "coverage-cutoff", help_heading = "Detection")]
    coverage_cutoff: bool,

    /// Threads for external tools and database searches (default: all cores)
    #[arg(short = 't', long, value_name = "NUM", help_heading = "Runtime")]
    threads: Option<usize>,

    /// Samples processed at the same time
    #[arg(short = 'j', long = "sample-jobs", default_value = "1", help_heading = "Runtime")]
    sample_jobs: usize,
}

impl Args {
    fn to_config(&self) -> DetectionConfig {
        let defaults = DetectionConfig::default();
        DetectionConfig {
            kmer_size: self.kmer_size,
            kmer_cutoff: self.kmer_cutoff,
            cutoff_mode: match self.cutoff_mode {
                CutoffArg::AtLeast => CutoffMode::AtLeast,
                CutoffArg::GreaterThan => CutoffMode::GreaterThan,
            },
            cutoff_policy: if self.coverage_cutoff {
                CutoffPolicy::CoverageScaled
            } else {
                CutoffPolicy::Fixed
            },
            subsample_depth: self.subsample_depth,
            cycles: self.number_subsamples,
            threads: self.threads.unwrap_or(defaults.threads),
            sample_jobs: self.sample_jobs,
            allele_selection: if self.exclude_genus_alleles {
                AlleleSelection::Exclude
            } else {
                AlleleSelection::Keep
            },
            keep_temp: self.keep_temp,
            output_dir: self.output_name.clone(),
            databases: DatabasePaths::new(&self.databases),
            ..defaults
        }
    }
}

fn run(args: Args) -> Result<()> {
    let config = args.to_config();
    config.validate()?;

    // 1. Every external tool must be present before any sample starts
    let tools = ToolPaths::resolve()?;
    let toolkit = Toolkit::external(&tools, config.threads);

    // 2. Samples
    let samples = find_samples(&args.input_directory, &args.forward_id, &args.reverse_id)?;
    if samples.is_empty() {
        log::warn!("No FASTQ files found in {}", args.input_directory.display());
    }

    // 3. Detection with a progress bar over samples
    let bar = ProgressBar::new(samples.len() as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);

    let verdicts = detect_contamination_with_progress(&samples, &config, &toolkit, |verdict| {
        bar.set_message(verdict.sample.clone());
        bar.inc(1);
    })?;

    let contaminated = verdicts.iter().filter(|v| v.contaminated).count();
    bar.finish_with_message(format!("{contaminated} of {} sample(s) contaminated", verdicts.len()));
    Ok(())
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(args) {
        log::error!("{e}");
        process::exit(1);
    }
}
