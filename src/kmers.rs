//src/kmers.rs

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use ahash::AHashMap;

use crate::config::CutoffMode;
use crate::error::{DetectError, Result};
use crate::types::Kmer;

/// A k-mer as dumped by the counter, before filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountedKmer {
    pub sequence: String,
    pub count: u32,
}

/// Parses a k-mer listing of `>count` / `SEQUENCE` line pairs.
pub fn parse_kmer_listing(listing: &str) -> Result<Vec<CountedKmer>> {
    let mut kmers = Vec::new();
    let mut lines = listing.lines().filter(|l| !l.trim().is_empty());

    while let Some(header) = lines.next() {
        let header = header.trim();
        let count_str = header
            .strip_prefix('>')
            .ok_or_else(|| DetectError::parse("k-mer header", header))?;
        let count: u32 = count_str
            .parse()
            .map_err(|_| DetectError::parse("k-mer count", header))?;
        let sequence = lines
            .next()
            .ok_or_else(|| DetectError::parse("k-mer listing", "header without sequence"))?
            .trim()
            .to_string();
        kmers.push(CountedKmer { sequence, count });
    }
    Ok(kmers)
}

/// Solid k-mers of one subsample.
#[derive(Debug, Clone, Default)]
pub struct FilteredKmers {
    pub kmers: Vec<Kmer>,
}

impl FilteredKmers {
    /// Unique k-mer count of the cycle.
    pub fn len(&self) -> usize {
        self.kmers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kmers.is_empty()
    }

    /// `count_serial` id -> sequence, for looking up alignment partners.
    pub fn sequence_map(&self) -> AHashMap<String, &str> {
        self.kmers
            .iter()
            .map(|k| (k.id(), k.sequence.as_str()))
            .collect()
    }

    /// Writes the renamed k-mers as FASTA for the self-aligner.
    pub fn write_fasta(&self, path: &Path) -> Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        for k in &self.kmers {
            writeln!(out, ">{}\n{}", k.id(), k.sequence)?;
        }
        out.flush()?;
        Ok(())
    }
}

/// Drops untrustworthy k-mers and numbers the survivors `1..=n` in input order.
pub fn filter_kmers(raw: &[CountedKmer], cutoff: u32, mode: CutoffMode) -> FilteredKmers {
    let kmers = raw
        .iter()
        .filter(|k| mode.passes(k.count, cutoff))
        .enumerate()
        .map(|(i, k)| Kmer {
            sequence: k.sequence.clone(),
            count: k.count,
            serial: i + 1,
        })
        .collect();
    FilteredKmers { kmers }
}

/// Count embedded in a `count_serial` identifier.
pub fn count_from_id(id: &str) -> Result<u32> {
    id.split('_')
        .next()
        .and_then(|c| c.parse().ok())
        .ok_or_else(|| DetectError::parse("k-mer identifier", id))
}
