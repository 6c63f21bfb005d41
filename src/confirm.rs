//src/confirm.rs

use std::path::{Path, PathBuf};

use ahash::AHashMap;

use crate::error::{DetectError, Result};
use crate::pool::WorkerPool;
use crate::tools::SequenceSearch;
use crate::types::VariantPair;

/// Checks candidate minor-allele k-mers against the sample's reference database.
///
/// A k-mer hanging over the end of a marker gene into flanking sequence can
/// look like a second allele; only k-mers whose best hit spans their full
/// length are kept.
pub struct DatabaseConfirmer<'a> {
    search: &'a dyn SequenceSearch,
    database: PathBuf,
    kmer_size: usize,
    pool: &'a WorkerPool,
}

impl<'a> DatabaseConfirmer<'a> {
    pub fn new(search: &'a dyn SequenceSearch, database: PathBuf, kmer_size: usize, pool: &'a WorkerPool) -> Self {
        Self {
            search,
            database,
            kmer_size,
            pool,
        }
    }

    pub fn database(&self) -> &Path {
        &self.database
    }

    /// Builds the search index if it is missing. Another sample may be
    /// building the same index; a failed build is fine if the index exists afterwards.
    pub fn ensure_index(&self) -> Result<()> {
        if self.search.has_index(&self.database) {
            return Ok(());
        }
        log::info!("Making database index for {}", self.database.display());
        match self.search.build_index(&self.database) {
            Ok(()) => Ok(()),
            Err(e) if self.search.has_index(&self.database) => {
                log::warn!("Index build reported {e}, but the index is present; continuing");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Whether the top hit for `sequence` covers all `kmer_size` bases.
    pub fn is_confirmed(&self, sequence: &str) -> Result<bool> {
        let hits = self.search.search(sequence, &self.database)?;
        let Some(top) = hits.first() else {
            return Ok(false);
        };
        log::debug!(
            "{sequence} -> {} ({:.2}% identity over {} bp)",
            top.subject,
            top.identity,
            top.align_length
        );
        Ok(top.align_length == self.kmer_size)
    }

    /// Number of candidates whose minor k-mer is confirmed.
    pub fn confirm(&self, pairs: &[VariantPair], sequences: &AHashMap<String, &str>) -> Result<usize> {
        if pairs.is_empty() {
            return Ok(0);
        }
        self.ensure_index()?;

        let queries = pairs
            .iter()
            .map(|p| {
                sequences
                    .get(&p.low_kmer)
                    .copied()
                    .ok_or_else(|| DetectError::parse("aligned k-mer id", p.low_kmer.clone()))
            })
            .collect::<Result<Vec<&str>>>()?;

        let results = self.pool.map(&queries, |seq| self.is_confirmed(seq));
        let mut confirmed = 0usize;
        for result in results {
            if result? {
                confirmed += 1;
            }
        }
        log::debug!("{confirmed} of {} candidates confirmed in {}", pairs.len(), self.database.display());
        Ok(confirmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::SearchHit;
    use parking_lot::Mutex;

    /// Knows a fixed set of sequences; anything else gets a short hit.
    struct FakeSearch {
        full_length: Vec<&'static str>,
        indexed: Mutex<bool>,
        builds: Mutex<usize>,
    }

    impl FakeSearch {
        fn new(full_length: Vec<&'static str>, indexed: bool) -> Self {
            Self {
                full_length,
                indexed: Mutex::new(indexed),
                builds: Mutex::new(0),
            }
        }
    }

    impl SequenceSearch for FakeSearch {
        fn has_index(&self, _database: &Path) -> bool {
            *self.indexed.lock()
        }

        fn build_index(&self, _database: &Path) -> Result<()> {
            *self.builds.lock() += 1;
            *self.indexed.lock() = true;
            Ok(())
        }

        fn search(&self, query: &str, _database: &Path) -> Result<Vec<SearchHit>> {
            let align_length = if self.full_length.iter().any(|s| *s == query) { query.len() } else { query.len() - 1 };
            Ok(vec![SearchHit {
                subject: "BACT000001_1".into(),
                identity: 100.0,
                align_length,
            }])
        }
    }

    fn pair(low: &str) -> VariantPair {
        VariantPair { low_kmer: low.into(), high_kmer: "90_1".into(), ratio: 0.1 }
    }

    #[test]
    fn counts_only_full_length_hits() {
        let search = FakeSearch::new(vec!["ACGTA"], true);
        let pool = WorkerPool::new(2).unwrap();
        let confirmer = DatabaseConfirmer::new(&search, "db.fasta".into(), 5, &pool);

        let mut seqs = AHashMap::new();
        seqs.insert("9_2".to_string(), "ACGTA");
        seqs.insert("9_3".to_string(), "TTTTT");

        let n = confirmer.confirm(&[pair("9_2"), pair("9_3"), pair("9_2")], &seqs).unwrap();
        assert_eq!(n, 2);
    }

    #[test]
    fn builds_missing_index_lazily() {
        let search = FakeSearch::new(vec![], false);
        let pool = WorkerPool::new(1).unwrap();
        let confirmer = DatabaseConfirmer::new(&search, "db.fasta".into(), 5, &pool);

        assert_eq!(confirmer.confirm(&[], &AHashMap::new()).unwrap(), 0);
        assert_eq!(*search.builds.lock(), 0);

        confirmer.ensure_index().unwrap();
        confirmer.ensure_index().unwrap();
        assert_eq!(*search.builds.lock(), 1);
    }

    struct NoHits;

    impl SequenceSearch for NoHits {
        fn has_index(&self, _database: &Path) -> bool {
            true
        }

        fn build_index(&self, _database: &Path) -> Result<()> {
            Ok(())
        }

        fn search(&self, _query: &str, _database: &Path) -> Result<Vec<SearchHit>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn top_hit_decides_and_no_hit_rejects() {
        let pool = WorkerPool::new(1).unwrap();
        let search = FakeSearch::new(vec!["ACGTA"], true);
        let confirmer = DatabaseConfirmer::new(&search, "db.fasta".into(), 5, &pool);
        assert!(confirmer.is_confirmed("ACGTA").unwrap());
        assert!(!confirmer.is_confirmed("TTTTT").unwrap());

        let confirmer = DatabaseConfirmer::new(&NoHits, "db.fasta".into(), 5, &pool);
        assert!(!confirmer.is_confirmed("ACGTA").unwrap());
    }

    #[test]
    fn unknown_kmer_id_is_an_error() {
        let search = FakeSearch::new(vec![], true);
        let pool = WorkerPool::new(1).unwrap();
        let confirmer = DatabaseConfirmer::new(&search, "db.fasta".into(), 5, &pool);
        assert!(confirmer.confirm(&[pair("3_3")], &AHashMap::new()).is_err());
    }
}
