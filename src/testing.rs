//src/testing.rs

//! In-process stand-ins for the external tools, shared by unit tests.

use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use parking_lot::Mutex;

use crate::error::{DetectError, Result};
use crate::tools::{
    DistanceScreener, KmerCounter, QualityTrimmer, ReadBaiter, ScreenHit, SearchHit, SelfAligner, SequenceSearch,
    Subsampler, Toolkit,
};
use crate::types::ReadSet;

pub const KMER: usize = 31;
pub const READ: &str = "@r1\nACGTACGTACGTACGTACGTACGTACGTACGTACG\n+\nIIIIIIIIIIIIIIIIIIIIIIIIIIIIIIIIIII\n";

fn write_reads(out: &ReadSet) -> Result<()> {
    for file in out.files() {
        fs::write(file, READ)?;
    }
    Ok(())
}

/// Distinct 31-mer for every index.
pub fn kmer_seq(mut i: usize) -> String {
    let mut s = String::with_capacity(KMER);
    for _ in 0..KMER {
        s.push(['A', 'C', 'G', 'T'][i % 4]);
        i /= 4;
    }
    s
}

/// A dump with `40`, `10`, then `total - 2` k-mers of count 5.
pub fn listing(total: usize) -> String {
    let mut out = String::new();
    for i in 0..total {
        let count = match i {
            0 => 40,
            1 => 10,
            _ => 5,
        };
        out.push_str(&format!(">{}\n{}\n", count, kmer_seq(i)));
    }
    out
}

/// SAM body with `n` records of the rare `10_2` k-mer hitting `40_1`.
pub fn sam_with_snvs(n: usize) -> String {
    let mut out = String::from("@HD\tVN:1.4\n");
    for _ in 0..n {
        out.push_str("10_2\t0\t40_1\t1\t44\t15=1X15=\t*\t0\t0\tA\t*\n");
    }
    out
}

/// Writes a fixed read to every output file.
pub struct CopyReads;

impl ReadBaiter for CopyReads {
    fn bait(&self, _reads: &ReadSet, _reference: &Path, out: &ReadSet) -> Result<()> {
        write_reads(out)
    }
}

impl QualityTrimmer for CopyReads {
    fn trim(&self, _reads: &ReadSet, out: &ReadSet) -> Result<()> {
        write_reads(out)
    }
}

impl Subsampler for CopyReads {
    fn subsample(&self, _reads: &ReadSet, _target_bases: u64, out: &ReadSet) -> Result<()> {
        write_reads(out)
    }
}

/// Hands out one prepared listing per call.
pub struct ScriptedCounter(pub Mutex<VecDeque<String>>);

impl ScriptedCounter {
    pub fn new(listings: Vec<String>) -> Self {
        Self(Mutex::new(listings.into()))
    }
}

impl KmerCounter for ScriptedCounter {
    fn count(&self, _reads: &ReadSet, _kmer_size: usize, _workdir: &Path) -> Result<String> {
        self.0
            .lock()
            .pop_front()
            .ok_or_else(|| DetectError::parse("k-mer listing", "script exhausted"))
    }
}

/// Writes one prepared SAM per call.
pub struct ScriptedAligner(pub Mutex<VecDeque<String>>);

impl ScriptedAligner {
    pub fn new(sams: Vec<String>) -> Self {
        Self(Mutex::new(sams.into()))
    }
}

impl SelfAligner for ScriptedAligner {
    fn self_align(&self, _kmers_fasta: &Path, out_sam: &Path) -> Result<()> {
        let sam = self.0.lock().pop_front().ok_or_else(|| DetectError::ToolFailed {
            tool: "bbmap.sh".into(),
            status: "exit status: 1".into(),
            stderr: "no alignment scripted".into(),
        })?;
        fs::write(out_sam, sam)?;
        Ok(())
    }
}

/// Every query is found over its full length.
pub struct FullLengthSearch;

impl SequenceSearch for FullLengthSearch {
    fn has_index(&self, _database: &Path) -> bool {
        true
    }

    fn build_index(&self, _database: &Path) -> Result<()> {
        Ok(())
    }

    fn search(&self, query: &str, _database: &Path) -> Result<Vec<SearchHit>> {
        Ok(vec![SearchHit {
            subject: "BACT000001_1".into(),
            identity: 100.0,
            align_length: query.len(),
        }])
    }
}

/// Reports the given genera, or fails when `None`.
pub struct FixedScreen(pub Option<Vec<&'static str>>);

impl DistanceScreener for FixedScreen {
    fn screen(&self, _reads: &ReadSet, _sketch: &Path) -> Result<Vec<ScreenHit>> {
        let genera = self.0.as_ref().ok_or_else(|| DetectError::ToolFailed {
            tool: "mash".into(),
            status: "exit status: 1".into(),
            stderr: "sketch unreadable".into(),
        })?;
        Ok(genera
            .iter()
            .map(|g| ScreenHit {
                reference: format!("refseq/{g}/sp/genome.fna"),
                genus: g.to_string(),
                identity: 0.99,
            })
            .collect())
    }
}

/// A toolkit where every cycle reads its listing and SAM from the scripts.
pub fn fake_toolkit(genera: Option<Vec<&'static str>>, listings: Vec<String>, sams: Vec<String>) -> Toolkit {
    Toolkit {
        baiter: Box::new(CopyReads),
        trimmer: Box::new(CopyReads),
        subsampler: Box::new(CopyReads),
        counter: Box::new(ScriptedCounter::new(listings)),
        aligner: Box::new(ScriptedAligner::new(sams)),
        search: Box::new(FullLengthSearch),
        screener: Box::new(FixedScreen(genera)),
    }
}
