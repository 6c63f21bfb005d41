//src/tools/mod.rs

//! Interfaces to the external programs the pipeline drives.
//!
//! Each collaborator is a trait so the detection core can run against
//! in-process fakes; the `bbtools`, `jellyfish`, `blast` and `mash`
//! modules hold the implementations that shell out.

pub mod bbtools;
pub mod blast;
pub mod jellyfish;
pub mod mash;

use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use crate::error::{DetectError, Result};
use crate::types::ReadSet;

/// Pulls marker-gene reads out of a read set.
pub trait ReadBaiter: Send + Sync {
    fn bait(&self, reads: &ReadSet, reference: &Path, out: &ReadSet) -> Result<()>;
}

/// Adapter and quality trimming.
pub trait QualityTrimmer: Send + Sync {
    fn trim(&self, reads: &ReadSet, out: &ReadSet) -> Result<()>;
}

/// Draws a random subset of reads holding roughly `target_bases` bases.
pub trait Subsampler: Send + Sync {
    fn subsample(&self, reads: &ReadSet, target_bases: u64, out: &ReadSet) -> Result<()>;
}

/// Counts canonical k-mers and returns the `>count` / `SEQUENCE` listing.
pub trait KmerCounter: Send + Sync {
    fn count(&self, reads: &ReadSet, kmer_size: usize, workdir: &Path) -> Result<String>;
}

/// Aligns a k-mer FASTA against itself, writing SAM with extended CIGARs.
pub trait SelfAligner: Send + Sync {
    fn self_align(&self, kmers_fasta: &Path, out_sam: &Path) -> Result<()>;
}

/// One hit of a nucleotide database search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub subject: String,
    pub identity: f64,
    pub align_length: usize,
}

/// Nucleotide search against a FASTA database with its own index files.
pub trait SequenceSearch: Send + Sync {
    fn has_index(&self, database: &Path) -> bool;
    fn build_index(&self, database: &Path) -> Result<()>;
    /// Hits in the order the search engine ranks them.
    fn search(&self, query: &str, database: &Path) -> Result<Vec<SearchHit>>;
}

/// A reference genome found in the sample by the distance screen.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenHit {
    pub reference: String,
    pub genus: String,
    pub identity: f64,
}

/// Genus-level screen of raw reads against a sketch database.
pub trait DistanceScreener: Send + Sync {
    fn screen(&self, reads: &ReadSet, sketch: &Path) -> Result<Vec<ScreenHit>>;
}

/// The full set of collaborators used for one run.
pub struct Toolkit {
    pub baiter: Box<dyn ReadBaiter>,
    pub trimmer: Box<dyn QualityTrimmer>,
    pub subsampler: Box<dyn Subsampler>,
    pub counter: Box<dyn KmerCounter>,
    pub aligner: Box<dyn SelfAligner>,
    pub search: Box<dyn SequenceSearch>,
    pub screener: Box<dyn DistanceScreener>,
}

impl Toolkit {
    /// BBTools, Jellyfish, BLAST+ and Mash found through `paths`.
    pub fn external(paths: &ToolPaths, threads: usize) -> Self {
        Self {
            baiter: Box::new(bbtools::BbdukBait::new(paths, threads)),
            trimmer: Box::new(bbtools::BbdukTrim::new(paths, threads)),
            subsampler: Box::new(bbtools::Reformat::new(paths, threads)),
            counter: Box::new(jellyfish::Jellyfish::new(paths, threads)),
            aligner: Box::new(bbtools::BbmapSelfAlign::new(paths, threads)),
            search: Box::new(blast::Blastn::new(paths)),
            screener: Box::new(mash::MashScreen::new(paths, threads)),
        }
    }
}

/// Resolved locations of every executable the pipeline needs.
#[derive(Debug, Clone)]
pub struct ToolPaths {
    pub bbduk: PathBuf,
    pub reformat: PathBuf,
    pub bbmap: PathBuf,
    pub jellyfish: PathBuf,
    pub blastn: PathBuf,
    pub makeblastdb: PathBuf,
    pub mash: PathBuf,
}

impl ToolPaths {
    pub fn resolve() -> Result<Self> {
        Ok(Self {
            bbduk: find_executable("bbduk.sh")?,
            reformat: find_executable("reformat.sh")?,
            bbmap: find_executable("bbmap.sh")?,
            jellyfish: find_executable("jellyfish")?,
            blastn: find_executable("blastn")?,
            makeblastdb: find_executable("makeblastdb")?,
            mash: find_executable("mash")?,
        })
    }
}

pub fn find_executable(name: &str) -> Result<PathBuf> {
    let path = Path::new(name);
    if path.is_absolute() && path.is_file() {
        return Ok(path.to_path_buf());
    }

    if let Some(paths) = env::var_os("PATH") {
        for dir in env::split_paths(&paths) {
            let full_path = dir.join(name);
            if full_path.is_file() {
                return Ok(full_path);
            }
        }
    }

    Err(DetectError::ToolNotFound(name.to_string()))
}

fn tool_name(cmd: &Command) -> String {
    Path::new(cmd.get_program())
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| cmd.get_program().to_string_lossy().into_owned())
}

fn check_output(tool: String, output: Output) -> Result<Output> {
    if output.status.success() {
        return Ok(output);
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let tail: Vec<&str> = stderr.lines().rev().take(5).collect();
    Err(DetectError::ToolFailed {
        tool,
        status: output.status.to_string(),
        stderr: tail.into_iter().rev().collect::<Vec<_>>().join(" | "),
    })
}

/// Runs a command to completion and fails on a non-zero exit.
pub fn run_command(cmd: &mut Command) -> Result<Output> {
    let tool = tool_name(cmd);
    log::debug!("Running {:?}", cmd);
    let output = cmd
        .stdin(Stdio::null())
        .output()
        .map_err(|e| DetectError::ToolFailed {
            tool: tool.clone(),
            status: "not started".to_string(),
            stderr: e.to_string(),
        })?;
    check_output(tool, output)
}

/// Like [`run_command`], feeding `input` on stdin.
pub fn run_command_with_stdin(cmd: &mut Command, input: &str) -> Result<Output> {
    let tool = tool_name(cmd);
    log::debug!("Running {:?} with {} bytes on stdin", cmd, input.len());
    let mut child = cmd
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| DetectError::ToolFailed {
            tool: tool.clone(),
            status: "not started".to_string(),
            stderr: e.to_string(),
        })?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(input.as_bytes())?;
    }
    let output = child.wait_with_output()?;
    check_output(tool, output)
}
