//src/tools/mash.rs

use std::path::{Path, PathBuf};
use std::process::Command;

use super::{run_command, DistanceScreener, ScreenHit, ToolPaths};
use crate::error::{DetectError, Result};
use crate::types::ReadSet;

/// Minimum identity for a sketch to count as present.
const SCREEN_IDENTITY: &str = "0.95";

/// `mash screen` in winner-takes-all mode.
pub struct MashScreen {
    exe: PathBuf,
    threads: usize,
}

impl MashScreen {
    pub fn new(paths: &ToolPaths, threads: usize) -> Self {
        Self { exe: paths.mash.clone(), threads }
    }
}

/// Genus of a reference sketch named like `.../<Genus>/<species>/<assembly>`.
pub fn genus_from_reference(reference: &str) -> Option<String> {
    let parts: Vec<&str> = reference.split('/').collect();
    if parts.len() < 3 {
        return None;
    }
    let genus = parts[parts.len() - 3];
    if genus.is_empty() {
        None
    } else {
        Some(genus.to_string())
    }
}

/// Parses `mash screen` output:
/// identity, shared-hashes, median-multiplicity, p-value, query-ID[, comment].
pub fn parse_screen_output(text: &str) -> Result<Vec<ScreenHit>> {
    let mut hits = Vec::new();
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 5 {
            return Err(DetectError::parse("mash screen line", line));
        }
        let identity: f64 = fields[0]
            .parse()
            .map_err(|_| DetectError::parse("mash identity", line))?;
        let reference = fields[4];
        match genus_from_reference(reference) {
            Some(genus) => hits.push(ScreenHit {
                reference: reference.to_string(),
                genus,
                identity,
            }),
            None => log::warn!("Cannot tell the genus of sketch {reference}; ignoring it"),
        }
    }
    Ok(hits)
}

impl DistanceScreener for MashScreen {
    fn screen(&self, reads: &ReadSet, sketch: &Path) -> Result<Vec<ScreenHit>> {
        let output = run_command(
            Command::new(&self.exe)
                .args(["screen", "-w", "-i", SCREEN_IDENTITY])
                .args(["-p", &self.threads.to_string()])
                .arg(sketch)
                .args(reads.files()),
        )?;
        parse_screen_output(&String::from_utf8_lossy(&output.stdout))
    }
}
