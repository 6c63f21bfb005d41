// src/lib.rs
pub mod aggregate;
pub mod alignment;
pub mod config;
pub mod confirm;
pub mod cycle;
pub mod error;
pub mod fastq;
pub mod genus;
pub mod genus_db;
pub mod kmers;
pub mod pipeline;
pub mod pool;
pub mod report;
pub mod samples;
pub mod tools;
pub mod types;
pub mod variants;

#[cfg(test)]
mod testing;

use std::fs;

use crate::config::DetectionConfig;
use crate::error::Result;
use crate::pipeline::SamplePipeline;
use crate::pool::WorkerPool;
use crate::report::ReportWriter;
use crate::tools::Toolkit;
use crate::types::{ContaminationVerdict, Sample};

pub use crate::error::DetectError;
pub use crate::samples::{find_paired_reads, find_samples};

/// Unified function to check a batch of samples for contamination.
///
/// Writes `<output_dir>/confindr_report.csv` with one row per sample, in
/// completion order, and returns the verdicts in input order. A sample that
/// fails is logged and reported with an error row; it never stops the batch.
pub fn detect_contamination(
    samples: &[Sample],
    config: &DetectionConfig,
    toolkit: &Toolkit,
) -> Result<Vec<ContaminationVerdict>> {
    detect_contamination_with_progress(samples, config, toolkit, |_| {})
}

/// Like [`detect_contamination`], calling `on_sample_done` after each row is written.
pub fn detect_contamination_with_progress<F>(
    samples: &[Sample],
    config: &DetectionConfig,
    toolkit: &Toolkit,
    on_sample_done: F,
) -> Result<Vec<ContaminationVerdict>>
where
    F: Fn(&ContaminationVerdict) + Sync + Send,
{
    // 1. Validate settings and prepare the output directory
    config.validate()?;
    fs::create_dir_all(&config.output_dir)?;
    let report = ReportWriter::create(&config.report_path())?;

    // 2. Worker pools: one for confirmation searches, one for whole samples
    let search_pool = WorkerPool::new(config.threads)?;
    let sample_pool = WorkerPool::new(config.sample_jobs)?;
    let pipeline = SamplePipeline::new(config, toolkit, &search_pool);

    log::info!(
        "Checking {} sample(s) with {} thread(s), {} at a time",
        samples.len(),
        config.threads,
        config.sample_jobs
    );

    // 3. Process samples, isolating failures
    let run_one = |sample: &Sample| -> Result<ContaminationVerdict> {
        let verdict = match pipeline.process(sample) {
            Ok(v) => v,
            Err(e) => {
                log::error!("ERROR processing sample {}: {}", sample.name, e);
                ContaminationVerdict::error(&sample.name)
            }
        };
        report.append(&verdict)?;
        on_sample_done(&verdict);
        Ok(verdict)
    };

    let results = if config.sample_jobs > 1 {
        sample_pool.map(samples, run_one)
    } else {
        samples.iter().map(run_one).collect()
    };

    // 4. Only report write failures abort the batch
    let verdicts = results.into_iter().collect::<Result<Vec<_>>>()?;
    let contaminated = verdicts.iter().filter(|v| v.contaminated).count();
    log::info!(
        "Contamination detection complete: {} of {} sample(s) contaminated. Report: {}",
        contaminated,
        verdicts.len(),
        report.path().display()
    );
    Ok(verdicts)
}
