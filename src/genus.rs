//src/genus.rs

use std::path::PathBuf;

use crate::error::Result;
use crate::tools::DistanceScreener;
use crate::types::{GenusCall, ReadSet};

/// Genera reported under another name. Shigella is phylogenetically inside Escherichia.
pub const GENUS_SYNONYMS: &[(&str, &str)] = &[("Shigella", "Escherichia")];

pub fn canonical_genus(genus: &str) -> &str {
    GENUS_SYNONYMS
        .iter()
        .find(|(alias, _)| *alias == genus)
        .map(|(_, canonical)| *canonical)
        .unwrap_or(genus)
}

/// Folds screen hits into a genus call: synonyms merged, duplicates
/// dropped, first-seen order kept.
pub fn merge_genera<I, S>(genera: I) -> GenusCall
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut present: Vec<String> = Vec::new();
    for genus in genera {
        let genus = canonical_genus(genus.as_ref());
        if !present.iter().any(|g| g == genus) {
            present.push(genus.to_string());
        }
    }

    match present.len() {
        0 => GenusCall::NotAvailable,
        1 => GenusCall::Single(present.remove(0)),
        _ => GenusCall::Multiple(present),
    }
}

/// Decides which genera are present in a sample's raw reads.
pub struct CrossContaminationScreener<'a> {
    screener: &'a dyn DistanceScreener,
    sketch: PathBuf,
}

impl<'a> CrossContaminationScreener<'a> {
    pub fn new(screener: &'a dyn DistanceScreener, sketch: PathBuf) -> Self {
        Self { screener, sketch }
    }

    pub fn screen(&self, reads: &ReadSet) -> Result<GenusCall> {
        let hits = self.screener.screen(reads, &self.sketch)?;
        for hit in &hits {
            log::debug!("Sketch hit {} ({}) at {:.3} identity", hit.reference, hit.genus, hit.identity);
        }
        let call = merge_genera(hits.iter().map(|h| h.genus.as_str()));
        log::info!("Genera present: {}", call);
        Ok(call)
    }
}
