//src/types.rs

use std::fmt;
use std::path::{Path, PathBuf};

/// Reads belonging to one sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadSet {
    Paired { forward: PathBuf, reverse: PathBuf },
    Single(PathBuf),
}

impl ReadSet {
    /// Input files in forward, reverse order.
    pub fn files(&self) -> Vec<&Path> {
        match self {
            ReadSet::Paired { forward, reverse } => vec![forward.as_path(), reverse.as_path()],
            ReadSet::Single(path) => vec![path.as_path()],
        }
    }

    pub fn is_paired(&self) -> bool {
        matches!(self, ReadSet::Paired { .. })
    }

    /// The same layout with every file placed in `dir` under `<stem>_R1.fastq[.gz]`.
    pub fn renamed_in(&self, dir: &Path, stem: &str, gz: bool) -> ReadSet {
        let ext = if gz { "fastq.gz" } else { "fastq" };
        match self {
            ReadSet::Paired { .. } => ReadSet::Paired {
                forward: dir.join(format!("{stem}_R1.{ext}")),
                reverse: dir.join(format!("{stem}_R2.{ext}")),
            },
            ReadSet::Single(_) => ReadSet::Single(dir.join(format!("{stem}.{ext}"))),
        }
    }
}

/// One isolate to check.
///
/// The genus and any co-present genera are not stored here; the screen
/// returns them as a [`GenusCall`] that travels alongside the sample.
#[derive(Debug, Clone)]
pub struct Sample {
    pub name: String,
    pub reads: ReadSet,
}

/// A k-mer that passed the count cutoff, carrying its dense serial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kmer {
    pub sequence: String,
    pub count: u32,
    pub serial: usize,
}

impl Kmer {
    /// `<count>_<serial>`, the name the self-aligner sees.
    pub fn id(&self) -> String {
        format!("{}_{}", self.count, self.serial)
    }
}

/// Two k-mers that align end to end with a single substitution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentRecord {
    pub query: String,
    pub reference: String,
}

/// A candidate second allele: the rarer k-mer and how rare it is.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantPair {
    pub low_kmer: String,
    pub high_kmer: String,
    pub ratio: f64,
}

/// What one subsample cycle contributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleResult {
    /// Confirmed SNVs, or `None` when the cycle produced no SNV evidence.
    pub snv_count: Option<usize>,
    pub unique_kmers: usize,
}

/// Genus assignment from the cross-contamination screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenusCall {
    NotAvailable,
    Single(String),
    /// Two or more genera, in first-seen order.
    Multiple(Vec<String>),
}

impl GenusCall {
    pub fn is_cross_contaminated(&self) -> bool {
        matches!(self, GenusCall::Multiple(_))
    }

    pub fn genus(&self) -> Option<&str> {
        match self {
            GenusCall::Single(g) => Some(g),
            _ => None,
        }
    }
}

impl fmt::Display for GenusCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenusCall::NotAvailable => f.write_str("NA"),
            GenusCall::Single(g) => f.write_str(g),
            GenusCall::Multiple(gs) => f.write_str(&gs.join(":")),
        }
    }
}

/// Final call for a sample; one report row.
#[derive(Debug, Clone, PartialEq)]
pub struct ContaminationVerdict {
    pub sample: String,
    /// Genus column; colon-joined when several genera were found.
    pub genus: String,
    pub median_snvs: f64,
    pub max_unique_kmers: usize,
    pub contaminated: bool,
}

pub const ERROR_GENUS: &str = "Error processing sample";

impl ContaminationVerdict {
    /// Placeholder row for a sample that could not be processed.
    pub fn error(sample: &str) -> Self {
        Self {
            sample: sample.to_string(),
            genus: ERROR_GENUS.to_string(),
            median_snvs: 0.0,
            max_unique_kmers: 0,
            contaminated: false,
        }
    }

    pub fn is_error(&self) -> bool {
        self.genus == ERROR_GENUS
    }

    /// Report fields in column order.
    pub fn to_record(&self) -> [String; 5] {
        [
            self.sample.clone(),
            self.genus.clone(),
            format_median(self.median_snvs),
            self.max_unique_kmers.to_string(),
            if self.contaminated { "True" } else { "False" }.to_string(),
        ]
    }
}

fn format_median(median: f64) -> String {
    if median.fract() == 0.0 {
        format!("{}", median as i64)
    } else {
        format!("{median}")
    }
}
