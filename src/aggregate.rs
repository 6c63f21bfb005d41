//src/aggregate.rs

use crate::config::DetectionConfig;
use crate::types::{ContaminationVerdict, CycleResult, GenusCall};

/// Median of the values; an empty slice counts as a single zero.
pub fn median(values: &[usize]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid] as f64
    } else {
        (sorted[mid - 1] + sorted[mid]) as f64 / 2.0
    }
}

/// Folds cycle results and the genus call into the sample's verdict.
///
/// Three independent signals, any of which marks the sample contaminated:
///   - median confirmed SNVs above `snv_threshold`
///   - more than one genus in the sample
///   - max unique k-mers above `max_unique_kmers`
#[derive(Debug, Clone)]
pub struct ContaminationAggregator {
    pub snv_threshold: f64,
    pub max_unique_kmers: usize,
}

impl ContaminationAggregator {
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            snv_threshold: config.snv_threshold,
            max_unique_kmers: config.max_unique_kmers,
        }
    }

    pub fn aggregate(&self, sample: &str, cycles: &[CycleResult], call: &GenusCall) -> ContaminationVerdict {
        let snvs: Vec<usize> = cycles.iter().filter_map(|c| c.snv_count).collect();
        let median_snvs = median(&snvs);
        let max_unique_kmers = cycles.iter().map(|c| c.unique_kmers).max().unwrap_or(0);

        let contaminated = median_snvs > self.snv_threshold
            || call.is_cross_contaminated()
            || max_unique_kmers > self.max_unique_kmers;

        ContaminationVerdict {
            sample: sample.to_string(),
            genus: call.to_string(),
            median_snvs,
            max_unique_kmers,
            contaminated,
        }
    }
}
