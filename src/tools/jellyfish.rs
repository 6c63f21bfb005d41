//src/tools/jellyfish.rs

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::{run_command, KmerCounter, ToolPaths};
use crate::error::{DetectError, Result};
use crate::fastq::{decompress_read_set, is_gz};
use crate::types::ReadSet;

/// Canonical k-mer counting with `jellyfish count` + `jellyfish dump`.
pub struct Jellyfish {
    exe: PathBuf,
    threads: usize,
}

impl Jellyfish {
    pub fn new(paths: &ToolPaths, threads: usize) -> Self {
        Self { exe: paths.jellyfish.clone(), threads }
    }
}

impl KmerCounter for Jellyfish {
    fn count(&self, reads: &ReadSet, kmer_size: usize, workdir: &Path) -> Result<String> {
        // jellyfish only reads plain FASTQ
        let plain = decompress_read_set(reads, workdir)?;
        let counts = workdir.join("mer_counts.jf");
        let files = plain.files();

        let counted = run_command(
            Command::new(&self.exe)
                .arg("count")
                .args(["-m", &kmer_size.to_string()])
                .args(["-s", "100M", "--bf-size", "100M"])
                .args(["-t", &self.threads.to_string()])
                .arg("-C")
                .args(["-F", &files.len().to_string()])
                .args(&files)
                .arg("-o")
                .arg(&counts),
        );
        let dumped = counted.and_then(|_| run_command(Command::new(&self.exe).arg("dump").arg(&counts)));

        let _ = fs::remove_file(&counts);
        for (orig, copy) in reads.files().iter().zip(files.iter()) {
            if is_gz(orig) {
                let _ = fs::remove_file(copy);
            }
        }

        let output = dumped?;
        String::from_utf8(output.stdout).map_err(|_| DetectError::parse("k-mer dump", "non UTF-8 output"))
    }
}
