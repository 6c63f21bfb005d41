//src/variants.rs

use crate::config::RatioBand;
use crate::error::Result;
use crate::kmers::count_from_id;
use crate::types::{AlignmentRecord, VariantPair};

/// Orders the two k-mers of a record by count and computes `low / high`.
pub fn to_variant_pair(record: &AlignmentRecord) -> Result<Option<VariantPair>> {
    let query_count = count_from_id(&record.query)?;
    let ref_count = count_from_id(&record.reference)?;

    let (low_kmer, low, high_kmer, high) = if query_count > ref_count {
        (&record.reference, ref_count, &record.query, query_count)
    } else {
        (&record.query, query_count, &record.reference, ref_count)
    };
    if high == 0 {
        return Ok(None);
    }

    Ok(Some(VariantPair {
        low_kmer: low_kmer.clone(),
        high_kmer: high_kmer.clone(),
        ratio: low as f64 / high as f64,
    }))
}

/// Keeps the records whose count ratio falls strictly inside `band`.
///
/// Each alignment record yields at most one candidate; the aligner reports
/// both directions of a pair, so a pair is usually seen twice.
pub fn extract_variant_pairs(records: &[AlignmentRecord], band: RatioBand) -> Result<Vec<VariantPair>> {
    let mut pairs = Vec::new();
    for record in records {
        if let Some(pair) = to_variant_pair(record)? {
            if band.contains(pair.ratio) {
                pairs.push(pair);
            }
        }
    }
    log::debug!("{} of {} alignment records are candidate variants", pairs.len(), records.len());
    Ok(pairs)
}
