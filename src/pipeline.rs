//src/pipeline.rs

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::aggregate::ContaminationAggregator;
use crate::config::DetectionConfig;
use crate::confirm::DatabaseConfirmer;
use crate::cycle::SubsampleCycleRunner;
use crate::error::Result;
use crate::genus::CrossContaminationScreener;
use crate::genus_db::ensure_sample_database;
use crate::pool::WorkerPool;
use crate::tools::Toolkit;
use crate::types::{ContaminationVerdict, Sample};

/// Where a sample is in its processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    ExtractTargets,
    Trim,
    Cycles,
    Aggregate,
    CrossContamDetected,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Stage::Init => "Screening for cross-contamination...",
            Stage::ExtractTargets => "Extracting rMLST genes...",
            Stage::Trim => "Quality trimming...",
            Stage::Cycles => "Beginning contamination detection cycles...",
            Stage::Aggregate => "Aggregating cycle results...",
            Stage::CrossContamDetected => "Multiple genera found, skipping cycles",
            Stage::Done => "Finished analysis",
        };
        f.write_str(msg)
    }
}

/// Per-sample scratch directory, removed on drop unless kept.
struct Workspace {
    dir: PathBuf,
    keep: bool,
}

impl Workspace {
    fn create(root: &Path, sample: &str, keep: bool) -> Result<Self> {
        let dir = root.join(sample);
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, keep })
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.keep {
            return;
        }
        if let Err(e) = fs::remove_dir_all(&self.dir) {
            log::warn!("Could not remove {}: {}", self.dir.display(), e);
        }
    }
}

/// Takes one sample from raw reads to its verdict.
pub struct SamplePipeline<'a> {
    config: &'a DetectionConfig,
    toolkit: &'a Toolkit,
    pool: &'a WorkerPool,
    aggregator: ContaminationAggregator,
}

impl<'a> SamplePipeline<'a> {
    pub fn new(config: &'a DetectionConfig, toolkit: &'a Toolkit, pool: &'a WorkerPool) -> Self {
        Self {
            config,
            toolkit,
            pool,
            aggregator: ContaminationAggregator::new(config),
        }
    }

    fn enter(&self, sample: &Sample, stage: Stage) {
        log::info!("{}: {}", sample.name, stage);
    }

    pub fn process(&self, sample: &Sample) -> Result<ContaminationVerdict> {
        let cfg = self.config;

        // 1. Genus screen on the raw reads
        self.enter(sample, Stage::Init);
        let workspace = Workspace::create(&cfg.output_dir, &sample.name, cfg.keep_temp)?;
        let screener =
            CrossContaminationScreener::new(self.toolkit.screener.as_ref(), cfg.databases.refseq_sketch());
        let call = screener.screen(&sample.reads)?;

        if call.is_cross_contaminated() {
            self.enter(sample, Stage::CrossContamDetected);
            let verdict = self.aggregator.aggregate(&sample.name, &[], &call);
            self.enter(sample, Stage::Done);
            return Ok(verdict);
        }

        // 2. Reference for baiting and confirmation
        let database = ensure_sample_database(&cfg.databases, &call, cfg.allele_selection)?;

        // 3. Marker-gene reads, then trimming
        self.enter(sample, Stage::ExtractTargets);
        let baited = sample.reads.renamed_in(&workspace.dir, "rmlst", true);
        self.toolkit.baiter.bait(&sample.reads, &database, &baited)?;

        self.enter(sample, Stage::Trim);
        let trimmed = sample.reads.renamed_in(&workspace.dir, "trimmed", true);
        self.toolkit.trimmer.trim(&baited, &trimmed)?;

        // 4. Subsample cycles
        self.enter(sample, Stage::Cycles);
        let confirmer = DatabaseConfirmer::new(self.toolkit.search.as_ref(), database, cfg.kmer_size, self.pool);
        let runner = SubsampleCycleRunner::new(cfg, self.toolkit, &confirmer);
        let cycles = runner.run_all(&sample.name, &trimmed, &workspace.dir);

        // 5. Verdict
        self.enter(sample, Stage::Aggregate);
        let verdict = self.aggregator.aggregate(&sample.name, &cycles, &call);
        self.enter(sample, Stage::Done);
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabasePaths;
    use crate::testing::{fake_toolkit, listing, sam_with_snvs};

    fn config(root: &Path) -> DetectionConfig {
        let db = root.join("db");
        fs::create_dir_all(&db).unwrap();
        fs::write(db.join("profiles.txt"), "Escherichia:BACT000001,\n").unwrap();
        fs::write(db.join("rMLST_combined.fasta"), ">BACT000001_1\nACGT\n").unwrap();
        DetectionConfig {
            cycles: 3,
            threads: 2,
            output_dir: root.join("out"),
            databases: DatabasePaths::new(&db),
            ..Default::default()
        }
    }

    fn sample(root: &Path) -> Sample {
        Sample {
            name: "SampleX".into(),
            reads: crate::types::ReadSet::Paired {
                forward: root.join("SampleX_R1.fastq.gz"),
                reverse: root.join("SampleX_R2.fastq.gz"),
            },
        }
    }

    #[test]
    fn clean_sample_row_and_workspace_removed() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let toolkit = fake_toolkit(
            Some(vec!["Escherichia"]),
            vec![listing(12_000), listing(11_000), listing(9_000)],
            vec![sam_with_snvs(0), sam_with_snvs(1), sam_with_snvs(0)],
        );
        let pool = WorkerPool::new(2).unwrap();
        let verdict = SamplePipeline::new(&cfg, &toolkit, &pool).process(&sample(dir.path())).unwrap();

        assert_eq!(verdict.to_record().join(","), "SampleX,Escherichia,0,12000,False");
        assert!(!cfg.output_dir.join("SampleX").exists());
        assert!(cfg.databases.genus_fasta("Escherichia").is_file());
    }

    #[test]
    fn two_genera_skip_the_cycles() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        // no listings scripted: running a cycle would fail the count
        let toolkit = fake_toolkit(Some(vec!["Escherichia", "Salmonella"]), vec![], vec![]);
        let pool = WorkerPool::new(1).unwrap();
        let verdict = SamplePipeline::new(&cfg, &toolkit, &pool).process(&sample(dir.path())).unwrap();

        assert_eq!(verdict.to_record().join(","), "SampleX,Escherichia:Salmonella,0,0,True");
        assert!(!cfg.databases.genus_fasta("Escherichia").exists());
    }

    #[test]
    fn keep_temp_leaves_workspace() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = DetectionConfig { cycles: 1, keep_temp: true, ..config(dir.path()) };
        let toolkit = fake_toolkit(Some(vec!["Escherichia"]), vec![listing(5)], vec![sam_with_snvs(0)]);
        let pool = WorkerPool::new(1).unwrap();
        SamplePipeline::new(&cfg, &toolkit, &pool).process(&sample(dir.path())).unwrap();

        let ws = cfg.output_dir.join("SampleX");
        assert!(ws.join("trimmed_R1.fastq.gz").is_file());
        assert!(ws.join("solid_kmers_0.fasta").is_file());
    }

    #[test]
    fn screen_failure_is_a_sample_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());
        let toolkit = fake_toolkit(None, vec![], vec![]);
        let pool = WorkerPool::new(1).unwrap();
        assert!(SamplePipeline::new(&cfg, &toolkit, &pool).process(&sample(dir.path())).is_err());
    }

    #[test]
    fn stage_messages() {
        assert_eq!(Stage::Trim.to_string(), "Quality trimming...");
        assert_eq!(Stage::ExtractTargets.to_string(), "Extracting rMLST genes...");
    }
}
