//src/alignment.rs

//! Reading the self-alignment of solid k-mers.
//!
//! The aligner writes SAM with extended CIGAR strings (`=` for matches,
//! `X` for substitutions). Only records aligning the whole k-mer with a
//! one-base substitution are kept.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{DetectError, Result};
use crate::types::AlignmentRecord;

/// One CIGAR operation, e.g. `15=` or `1X`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarOp {
    pub len: usize,
    pub op: char,
}

pub fn parse_cigar(cigar: &str) -> Result<Vec<CigarOp>> {
    let mut ops = Vec::new();
    let mut len = 0usize;
    let mut have_digits = false;
    for c in cigar.chars() {
        if let Some(d) = c.to_digit(10) {
            len = len
                .checked_mul(10)
                .and_then(|l| l.checked_add(d as usize))
                .ok_or_else(|| DetectError::parse("CIGAR", cigar))?;
            have_digits = true;
        } else {
            if !have_digits || !"MIDNSHP=X".contains(c) {
                return Err(DetectError::parse("CIGAR", cigar));
            }
            ops.push(CigarOp { len, op: c });
            len = 0;
            have_digits = false;
        }
    }
    if have_digits {
        return Err(DetectError::parse("CIGAR", cigar));
    }
    Ok(ops)
}

/// Query bases covered by the alignment, soft clips excluded.
pub fn query_alignment_length(ops: &[CigarOp]) -> usize {
    ops.iter()
        .filter(|o| matches!(o.op, 'M' | 'I' | '=' | 'X'))
        .map(|o| o.len)
        .sum()
}

/// Whether the CIGAR holds a single-base substitution block.
pub fn has_single_substitution(ops: &[CigarOp]) -> bool {
    ops.iter().any(|o| o.op == 'X' && o.len == 1)
}

/// Turns one SAM body line into an alignment record, if it is a full-length
/// single-substitution hit between two k-mers.
pub fn parse_sam_line(line: &str, kmer_size: usize) -> Result<Option<AlignmentRecord>> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 11 {
        return Err(DetectError::parse("SAM line", line));
    }
    let (query, reference, cigar) = (fields[0], fields[2], fields[5]);
    if cigar == "*" || reference == "*" {
        return Ok(None);
    }

    let ops = parse_cigar(cigar)?;
    if !has_single_substitution(&ops) || query_alignment_length(&ops) != kmer_size {
        return Ok(None);
    }

    Ok(Some(AlignmentRecord {
        query: query.to_string(),
        reference: reference.to_string(),
    }))
}

/// Collects the single-substitution records of a SAM file.
pub fn read_mismatch_records(sam: &Path, kmer_size: usize) -> Result<Vec<AlignmentRecord>> {
    let reader = BufReader::new(File::open(sam)?);
    let mut records = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.is_empty() || line.starts_with('@') {
            continue;
        }
        if let Some(record) = parse_sam_line(&line, kmer_size)? {
            records.push(record);
        }
    }
    Ok(records)
}
