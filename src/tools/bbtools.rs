//src/tools/bbtools.rs

use std::path::{Path, PathBuf};
use std::process::Command;

use super::{run_command, QualityTrimmer, ReadBaiter, SelfAligner, Subsampler, ToolPaths};
use crate::error::Result;
use crate::types::ReadSet;

fn kv(key: &str, path: &Path) -> String {
    format!("{}={}", key, path.display())
}

/// `in=`/`out=` style arguments; paired sets use the `1`/`2` suffixed keys.
fn io_args(reads: &ReadSet, input_key: &str, out: &ReadSet, output_key: &str) -> Vec<String> {
    match (reads, out) {
        (
            ReadSet::Paired { forward, reverse },
            ReadSet::Paired { forward: out1, reverse: out2 },
        ) => {
            // bbduk's matched-read output keys are outm/outm2 rather than outm1/outm2
            let out_fwd_key = if output_key == "outm" { "outm".to_string() } else { format!("{output_key}1") };
            vec![
                kv(&format!("{input_key}1"), forward),
                kv(&format!("{input_key}2"), reverse),
                kv(&out_fwd_key, out1),
                kv(&format!("{output_key}2"), out2),
            ]
        }
        _ => vec![kv(input_key, reads.files()[0]), kv(output_key, out.files()[0])],
    }
}

/// `bbduk.sh` in bait mode: keeps reads sharing k-mers with the reference.
pub struct BbdukBait {
    exe: PathBuf,
    threads: usize,
}

impl BbdukBait {
    pub fn new(paths: &ToolPaths, threads: usize) -> Self {
        Self { exe: paths.bbduk.clone(), threads }
    }
}

impl ReadBaiter for BbdukBait {
    fn bait(&self, reads: &ReadSet, reference: &Path, out: &ReadSet) -> Result<()> {
        run_command(
            Command::new(&self.exe)
                .arg(kv("ref", reference))
                .args(io_args(reads, "in", out, "outm"))
                .arg(format!("threads={}", self.threads))
                .arg("overwrite"),
        )?;
        Ok(())
    }
}

/// `bbduk.sh` adapter and quality trimming.
pub struct BbdukTrim {
    exe: PathBuf,
    adapters: PathBuf,
    threads: usize,
}

impl BbdukTrim {
    pub fn new(paths: &ToolPaths, threads: usize) -> Self {
        // bbduk ships its adapter file next to the wrapper script
        let adapters = paths
            .bbduk
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("resources")
            .join("adapters.fa");
        Self {
            exe: paths.bbduk.clone(),
            adapters,
            threads,
        }
    }
}

impl QualityTrimmer for BbdukTrim {
    fn trim(&self, reads: &ReadSet, out: &ReadSet) -> Result<()> {
        run_command(
            Command::new(&self.exe)
                .args(io_args(reads, "in", out, "out"))
                .args(["qtrim=w", "trimq=20", "k=25", "minlength=50", "forcetrimleft=15"])
                .arg(kv("ref", &self.adapters))
                .args(["hdist=1", "tpe", "tbo", "overwrite"])
                .arg(format!("threads={}", self.threads)),
        )?;
        Ok(())
    }
}

/// `reformat.sh` random subsampling to a base-count target.
pub struct Reformat {
    exe: PathBuf,
    threads: usize,
}

impl Reformat {
    pub fn new(paths: &ToolPaths, threads: usize) -> Self {
        Self { exe: paths.reformat.clone(), threads }
    }
}

impl Subsampler for Reformat {
    fn subsample(&self, reads: &ReadSet, target_bases: u64, out: &ReadSet) -> Result<()> {
        run_command(
            Command::new(&self.exe)
                .args(io_args(reads, "in", out, "out"))
                .arg(format!("samplebasestarget={target_bases}"))
                .arg(format!("threads={}", self.threads))
                .arg("overwrite"),
        )?;
        Ok(())
    }
}

/// `bbmap.sh` aligning a k-mer set against itself, reporting every
/// ambiguous placement so k-mers do not only hit themselves.
pub struct BbmapSelfAlign {
    exe: PathBuf,
    threads: usize,
}

impl BbmapSelfAlign {
    pub fn new(paths: &ToolPaths, threads: usize) -> Self {
        Self { exe: paths.bbmap.clone(), threads }
    }
}

impl SelfAligner for BbmapSelfAlign {
    fn self_align(&self, kmers_fasta: &Path, out_sam: &Path) -> Result<()> {
        run_command(
            Command::new(&self.exe)
                .arg(kv("ref", kmers_fasta))
                .arg(kv("in", kmers_fasta))
                .arg(kv("outm", out_sam))
                .args([
                    "ambig=all",
                    "sam=1.4",
                    "subfilter=1",
                    "insfilter=0",
                    "delfilter=0",
                    "indelfilter=0",
                    "nodisk",
                    "overwrite",
                ])
                .arg(format!("threads={}", self.threads)),
        )?;
        Ok(())
    }
}
