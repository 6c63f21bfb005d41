//src/cycle.rs

use std::path::Path;

use crate::alignment::read_mismatch_records;
use crate::config::{CutoffPolicy, DetectionConfig};
use crate::confirm::DatabaseConfirmer;
use crate::error::Result;
use crate::fastq::estimate_coverage;
use crate::kmers::{filter_kmers, parse_kmer_listing, FilteredKmers};
use crate::tools::Toolkit;
use crate::types::{CycleResult, ReadSet};
use crate::variants::extract_variant_pairs;

/// Runs the subsample cycles of one sample.
///
/// Each cycle is `subsample -> count -> filter -> self-align -> pair -> confirm`
/// on a fresh random draw of the trimmed reads. Cycles share nothing but
/// their inputs, so their results can be aggregated in any order.
pub struct SubsampleCycleRunner<'a> {
    config: &'a DetectionConfig,
    toolkit: &'a Toolkit,
    confirmer: &'a DatabaseConfirmer<'a>,
}

impl<'a> SubsampleCycleRunner<'a> {
    pub fn new(config: &'a DetectionConfig, toolkit: &'a Toolkit, confirmer: &'a DatabaseConfirmer<'a>) -> Self {
        Self {
            config,
            toolkit,
            confirmer,
        }
    }

    /// Runs every configured cycle. A cycle that fails before its k-mers are
    /// filtered is logged and recorded with no evidence at all.
    pub fn run_all(&self, sample: &str, trimmed: &ReadSet, workdir: &Path) -> Vec<CycleResult> {
        let total = self.config.cycles;
        (0..total)
            .map(|i| {
                log::info!("{sample}: Working on cycle {} of {}...", i + 1, total);
                match self.run_cycle(trimmed, workdir, i) {
                    Ok(result) => result,
                    Err(e) => {
                        log::warn!("{sample}: cycle {} failed and is skipped: {e}", i + 1);
                        CycleResult {
                            snv_count: None,
                            unique_kmers: 0,
                        }
                    }
                }
            })
            .collect()
    }

    /// One cycle. Failures up to k-mer filtering fail the cycle; later
    /// failures only drop its SNV count, the unique k-mer count is kept.
    pub fn run_cycle(&self, trimmed: &ReadSet, workdir: &Path, index: usize) -> Result<CycleResult> {
        let solid = self.solid_kmers(trimmed, workdir, index)?;
        if solid.is_empty() {
            log::warn!("No k-mers passed the cutoff in cycle {}; skipping it", index + 1);
            return Ok(CycleResult {
                snv_count: None,
                unique_kmers: 0,
            });
        }

        let snv_count = match self.count_snvs(&solid, workdir, index) {
            Ok(n) => Some(n),
            Err(e) => {
                log::warn!(
                    "SNV search failed in cycle {}: {e}; keeping its {} unique k-mers",
                    index + 1,
                    solid.len()
                );
                None
            }
        };
        Ok(CycleResult {
            snv_count,
            unique_kmers: solid.len(),
        })
    }

    fn solid_kmers(&self, trimmed: &ReadSet, workdir: &Path, index: usize) -> Result<FilteredKmers> {
        let cfg = self.config;

        let subsample = trimmed.renamed_in(workdir, &format!("subsample_{index}"), false);
        self.toolkit
            .subsampler
            .subsample(trimmed, cfg.subsample_bases(), &subsample)?;

        let cutoff = match cfg.cutoff_policy {
            CutoffPolicy::Fixed => cfg.kmer_cutoff,
            policy => {
                let coverage = estimate_coverage(&subsample, cfg.marker_genome_size)?;
                let cutoff = policy.cutoff_for(cfg.kmer_cutoff, coverage);
                log::debug!("Subsample coverage {coverage:.1}x, k-mer cutoff {cutoff}");
                cutoff
            }
        };

        let listing = self.toolkit.counter.count(&subsample, cfg.kmer_size, workdir)?;
        let raw = parse_kmer_listing(&listing)?;
        let solid = filter_kmers(&raw, cutoff, cfg.cutoff_mode);
        log::debug!("{} of {} k-mers pass cutoff {}", solid.len(), raw.len(), cutoff);
        Ok(solid)
    }

    fn count_snvs(&self, solid: &FilteredKmers, workdir: &Path, index: usize) -> Result<usize> {
        let cfg = self.config;

        let fasta = workdir.join(format!("solid_kmers_{index}.fasta"));
        solid.write_fasta(&fasta)?;
        let sam = workdir.join(format!("self_align_{index}.sam"));
        self.toolkit.aligner.self_align(&fasta, &sam)?;

        let records = read_mismatch_records(&sam, cfg.kmer_size)?;
        let pairs = extract_variant_pairs(&records, cfg.ratio_band)?;
        let sequences = solid.sequence_map();
        self.confirmer.confirm(&pairs, &sequences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::ContaminationAggregator;
    use crate::pool::WorkerPool;
    use crate::types::GenusCall;
    use crate::testing::{fake_toolkit, listing, sam_with_snvs, FullLengthSearch};

    fn run(config: &DetectionConfig, listings: Vec<String>, sams: Vec<String>) -> Vec<CycleResult> {
        let dir = tempfile::tempdir().unwrap();
        let toolkit = fake_toolkit(Some(vec!["Escherichia"]), listings, sams);
        let pool = WorkerPool::new(2).unwrap();
        let confirmer = DatabaseConfirmer::new(&FullLengthSearch, "db.fasta".into(), config.kmer_size, &pool);
        let runner = SubsampleCycleRunner::new(config, &toolkit, &confirmer);
        let trimmed = ReadSet::Single(dir.path().join("trimmed.fastq"));
        runner.run_all("s", &trimmed, dir.path())
    }

    #[test]
    fn counts_confirmed_snvs_per_cycle() {
        let config = DetectionConfig { cycles: 2, ..Default::default() };
        let results = run(
            &config,
            vec![listing(10), listing(10)],
            vec![sam_with_snvs(2), sam_with_snvs(0)],
        );
        assert_eq!(
            results,
            vec![
                CycleResult { snv_count: Some(2), unique_kmers: 10 },
                CycleResult { snv_count: Some(0), unique_kmers: 10 },
            ]
        );
    }

    #[test]
    fn empty_filter_result_skips_cycle() {
        let config = DetectionConfig { cycles: 1, kmer_cutoff: 100, ..Default::default() };
        let results = run(&config, vec![listing(10)], vec![]);
        assert_eq!(results, vec![CycleResult { snv_count: None, unique_kmers: 0 }]);
    }

    #[test]
    fn aligner_failure_drops_only_the_snv_count() {
        let config = DetectionConfig { cycles: 2, ..Default::default() };
        // second cycle has no SAM scripted, so the aligner fails
        let results = run(&config, vec![listing(4), listing(4)], vec![sam_with_snvs(1)]);
        assert_eq!(results[0], CycleResult { snv_count: Some(1), unique_kmers: 4 });
        assert_eq!(results[1], CycleResult { snv_count: None, unique_kmers: 4 });
    }

    #[test]
    fn counter_failure_skips_the_cycle() {
        let config = DetectionConfig { cycles: 2, ..Default::default() };
        // only one listing scripted, so the second count fails
        let results = run(&config, vec![listing(4)], vec![sam_with_snvs(0)]);
        assert_eq!(results[0], CycleResult { snv_count: Some(0), unique_kmers: 4 });
        assert_eq!(results[1], CycleResult { snv_count: None, unique_kmers: 0 });
    }

    #[test]
    fn inflated_kmer_set_is_reported_when_alignment_fails() {
        let config = DetectionConfig { cycles: 1, ..Default::default() };
        let results = run(&config, vec![listing(50_000)], vec![]);
        assert_eq!(results, vec![CycleResult { snv_count: None, unique_kmers: 50_000 }]);

        let verdict = ContaminationAggregator::new(&config).aggregate(
            "s",
            &results,
            &GenusCall::Single("Escherichia".into()),
        );
        assert_eq!(verdict.max_unique_kmers, 50_000);
        assert!(verdict.contaminated);
    }

    #[test]
    fn coverage_scaled_cutoff_follows_subsample() {
        // a single 35 bp read over a 35 kb marker set is far below 30x, so the cutoff is 1
        let config = DetectionConfig {
            cycles: 1,
            kmer_cutoff: 50,
            cutoff_policy: CutoffPolicy::CoverageScaled,
            ..Default::default()
        };
        let mut dump = listing(3);
        dump.push_str(">1\nTTTTTTTTTTTTTTTTTTTTTTTTTTTTTTT\n");
        let results = run(&config, vec![dump], vec![sam_with_snvs(0)]);
        assert_eq!(results[0].unique_kmers, 4);
    }
}
