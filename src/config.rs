//src/config.rs

use std::path::{Path, PathBuf};

use crate::error::{DetectError, Result};

/// Sum of the longest allele of every rMLST gene, in base pairs.
pub const MARKER_GENOME_SIZE: u64 = 35_000;

/// How a k-mer's count is compared with the cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CutoffMode {
    /// Keep k-mers with `count >= cutoff`.
    #[default]
    AtLeast,
    /// Keep k-mers with `count > cutoff`.
    GreaterThan,
}

impl CutoffMode {
    pub fn passes(self, count: u32, cutoff: u32) -> bool {
        match self {
            CutoffMode::AtLeast => count >= cutoff,
            CutoffMode::GreaterThan => count > cutoff,
        }
    }
}

/// Where the cutoff value itself comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CutoffPolicy {
    /// Always use `DetectionConfig::kmer_cutoff`.
    #[default]
    Fixed,
    /// Raise the cutoff with the estimated coverage of the subsample.
    CoverageScaled,
}

impl CutoffPolicy {
    /// Cutoff to apply for a subsample of the given coverage.
    pub fn cutoff_for(self, fixed: u32, coverage: f64) -> u32 {
        match self {
            CutoffPolicy::Fixed => fixed,
            CutoffPolicy::CoverageScaled => {
                if coverage < 30.0 {
                    1
                } else if coverage < 100.0 {
                    3
                } else if coverage < 200.0 {
                    4
                } else {
                    5
                }
            }
        }
    }
}

/// Open interval of minor/major count ratios that count as a real second allele.
///
/// Ratios at or below `low` look like sequencing errors; ratios at or above
/// `high` look like paralogous copies inside a single genome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioBand {
    pub low: f64,
    pub high: f64,
}

impl Default for RatioBand {
    fn default() -> Self {
        Self { low: 0.01, high: 0.7 }
    }
}

impl RatioBand {
    pub fn contains(&self, ratio: f64) -> bool {
        self.low < ratio && ratio < self.high
    }
}

/// Which reference records end up in a genus-specific database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlleleSelection {
    /// Keep only records whose gene is listed for the genus.
    #[default]
    Keep,
    /// Drop records whose gene is listed for the genus.
    Exclude,
}

/// Locations of the reference files shared by every sample.
#[derive(Debug, Clone)]
pub struct DatabasePaths {
    pub dir: PathBuf,
}

impl DatabasePaths {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// All rMLST alleles, used when no genus could be assigned.
    pub fn combined_fasta(&self) -> PathBuf {
        self.dir.join("rMLST_combined.fasta")
    }

    /// `genus:allele1,allele2,...` mapping.
    pub fn profiles(&self) -> PathBuf {
        self.dir.join("profiles.txt")
    }

    /// Sketch database queried by the cross-contamination screen.
    pub fn refseq_sketch(&self) -> PathBuf {
        self.dir.join("refseq.msh")
    }

    pub fn genus_fasta(&self, genus: &str) -> PathBuf {
        self.dir.join(format!("{genus}_db.fasta"))
    }
}

/// Run-wide settings, built once and shared read-only by every component.
#[derive(Debug, Clone)]
pub struct DetectionConfig {
    pub kmer_size: usize,
    pub kmer_cutoff: u32,
    pub cutoff_mode: CutoffMode,
    pub cutoff_policy: CutoffPolicy,
    /// Target coverage of each subsample.
    pub subsample_depth: u64,
    pub marker_genome_size: u64,
    /// Number of subsample cycles per sample.
    pub cycles: usize,
    pub threads: usize,
    /// Samples processed concurrently.
    pub sample_jobs: usize,
    pub ratio_band: RatioBand,
    /// A sample is contaminated when the median SNV count is above this.
    pub snv_threshold: f64,
    /// A sample is contaminated when the max unique k-mer count is above this.
    pub max_unique_kmers: usize,
    pub allele_selection: AlleleSelection,
    pub keep_temp: bool,
    pub output_dir: PathBuf,
    pub databases: DatabasePaths,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            kmer_size: 31,
            kmer_cutoff: 2,
            cutoff_mode: CutoffMode::default(),
            cutoff_policy: CutoffPolicy::default(),
            subsample_depth: 20,
            marker_genome_size: MARKER_GENOME_SIZE,
            cycles: 5,
            threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            sample_jobs: 1,
            ratio_band: RatioBand::default(),
            snv_threshold: 2.0,
            max_unique_kmers: 45_000,
            allele_selection: AlleleSelection::default(),
            keep_temp: false,
            output_dir: PathBuf::from("confindr_out"),
            databases: DatabasePaths::new("databases"),
        }
    }
}

impl DetectionConfig {
    /// Bases the subsampler should aim for.
    pub fn subsample_bases(&self) -> u64 {
        self.subsample_depth * self.marker_genome_size
    }

    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join("confindr_report.csv")
    }

    pub fn validate(&self) -> Result<()> {
        if self.kmer_size == 0 {
            return Err(DetectError::InvalidConfig("k-mer size must be positive".into()));
        }
        if self.cycles == 0 {
            return Err(DetectError::InvalidConfig(
                "at least one subsample cycle is required".into(),
            ));
        }
        if self.threads == 0 || self.sample_jobs == 0 {
            return Err(DetectError::InvalidConfig(
                "thread and job counts must be positive".into(),
            ));
        }
        if self.subsample_depth == 0 || self.marker_genome_size == 0 {
            return Err(DetectError::InvalidConfig(
                "subsample depth and marker genome size must be positive".into(),
            ));
        }
        let band = self.ratio_band;
        if !(0.0..=1.0).contains(&band.low) || !(0.0..=1.0).contains(&band.high) || band.low >= band.high {
            return Err(DetectError::InvalidConfig(format!(
                "ratio band ({}, {}) must be a non-empty interval inside [0, 1]",
                band.low, band.high
            )));
        }
        Ok(())
    }
}
