//src/samples.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::types::{ReadSet, Sample};

fn is_fastq_name(name: &str) -> bool {
    name.contains(".fastq") || name.contains(".fq")
}

/// Finds every FASTQ sample in `dir`.
///
/// A file containing `forward_id` whose mate (`forward_id` replaced by
/// `reverse_id`) exists forms a pair; a file containing neither identifier
/// is a single-end sample. Results are sorted by sample name.
pub fn find_samples(dir: &Path, forward_id: &str, reverse_id: &str) -> Result<Vec<Sample>> {
    let mut files: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if is_fastq_name(name) {
            files.push(path);
        }
    }
    files.sort();

    let mut samples = Vec::new();
    for path in &files {
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(n) => n,
            None => continue,
        };

        if let Some(pos) = name.find(forward_id) {
            let mate = path.with_file_name(name.replacen(forward_id, reverse_id, 1));
            if mate.is_file() {
                samples.push(Sample {
                    name: name[..pos].to_string(),
                    reads: ReadSet::Paired {
                        forward: path.clone(),
                        reverse: mate,
                    },
                });
                continue;
            }
        }

        if !name.contains(forward_id) && !name.contains(reverse_id) {
            samples.push(Sample {
                name: single_sample_name(name),
                reads: ReadSet::Single(path.clone()),
            });
        }
    }

    samples.sort_by(|a, b| a.name.cmp(&b.name));
    log::info!("Found {} sample(s) in {}", samples.len(), dir.display());
    Ok(samples)
}

/// Forward/reverse file pairs in `dir`, sorted by forward path.
pub fn find_paired_reads(dir: &Path, forward_id: &str, reverse_id: &str) -> Result<Vec<(PathBuf, PathBuf)>> {
    let mut pairs: Vec<(PathBuf, PathBuf)> = find_samples(dir, forward_id, reverse_id)?
        .into_iter()
        .filter_map(|s| match s.reads {
            ReadSet::Paired { forward, reverse } => Some((forward, reverse)),
            ReadSet::Single(_) => None,
        })
        .collect();
    pairs.sort();
    Ok(pairs)
}

fn single_sample_name(file_name: &str) -> String {
    let cut = [".fastq", ".fq"]
        .iter()
        .filter_map(|ext| file_name.find(ext))
        .min()
        .unwrap_or(file_name.len());
    file_name[..cut].to_string()
}
