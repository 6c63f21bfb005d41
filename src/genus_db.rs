//src/genus_db.rs

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::config::{AlleleSelection, DatabasePaths};
use crate::error::{DetectError, Result};
use crate::types::GenusCall;

/// Reads the allele list for `target_genus` from a profiles file of the form
/// ```text
/// <genus>:<allele>,<allele>,...,
/// ```
/// Returns an empty list when the genus is not listed.
pub fn read_genus_alleles<P: AsRef<Path>>(profiles: P, target_genus: &str) -> Result<Vec<String>> {
    let reader = BufReader::new(File::open(profiles)?);
    let mut alleles = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let line = line.trim_end();
        let Some((genus, list)) = line.split_once(':') else {
            continue;
        };
        if genus == target_genus {
            alleles = list
                .split(',')
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string)
                .collect();
        }
    }
    Ok(alleles)
}

fn gene_of(record_id: &str) -> &str {
    record_id.split('_').next().unwrap_or(record_id)
}

/// Copies records of `combined` into `out`, choosing by the gene prefix of
/// each record id (`BACT000060_12` -> `BACT000060`). Returns the number written.
pub fn filter_reference(
    combined: &Path,
    out: &Path,
    alleles: &[String],
    selection: AlleleSelection,
) -> Result<usize> {
    write_filtered(combined, File::create(out)?, alleles, selection)
}

fn write_filtered<W: Write>(
    combined: &Path,
    out: W,
    alleles: &[String],
    selection: AlleleSelection,
) -> Result<usize> {
    let reader = BufReader::new(File::open(combined)?);
    let mut writer = BufWriter::new(out);
    let mut keep = false;
    let mut written = 0usize;

    for line in reader.lines() {
        let line = line?;
        if let Some(header) = line.strip_prefix('>') {
            let id = header.split_whitespace().next().unwrap_or("");
            let listed = alleles.iter().any(|a| a == gene_of(id));
            keep = match selection {
                AlleleSelection::Keep => listed,
                AlleleSelection::Exclude => !listed,
            };
            if keep {
                written += 1;
                writeln!(writer, ">{id}")?;
            }
        } else if keep && !line.trim().is_empty() {
            writeln!(writer, "{}", line.trim())?;
        }
    }
    writer.flush()?;
    Ok(written)
}

/// Database the sample's candidate k-mers are checked against.
///
/// Samples with a genus get `<genus>_db.fasta`, built on first use. The
/// records go to a uniquely named temporary file that is linked into place
/// only if no other builder got there first, so readers never see a
/// half-written database. A genus without profile alleles, or whose
/// selection matches no record, falls back to the combined database and
/// nothing is cached.
pub fn ensure_sample_database(
    databases: &DatabasePaths,
    call: &GenusCall,
    selection: AlleleSelection,
) -> Result<PathBuf> {
    let combined = databases.combined_fasta();
    let Some(genus) = call.genus() else {
        return Ok(combined);
    };

    let target = databases.genus_fasta(genus);
    if target.is_file() {
        return Ok(target);
    }
    if !combined.is_file() {
        return Err(DetectError::MissingInput(combined));
    }

    let alleles = read_genus_alleles(databases.profiles(), genus)?;
    if alleles.is_empty() {
        log::warn!("No profile alleles for genus {genus}; using {}", combined.display());
        return Ok(combined);
    }

    log::info!("Setting up genus-specific database for genus {genus}...");
    let mut tmp = NamedTempFile::new_in(&databases.dir)?;
    let written = write_filtered(&combined, tmp.as_file_mut(), &alleles, selection)?;
    if written == 0 {
        log::warn!("No reference records selected for genus {genus}; using {}", combined.display());
        return Ok(combined);
    }

    match tmp.persist_noclobber(&target) {
        Ok(_) => log::debug!("{} holds {} reference alleles", target.display(), written),
        Err(_) if target.is_file() => {
            log::debug!("{} was created concurrently; keeping the existing copy", target.display())
        }
        Err(e) => return Err(e.error.into()),
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const PROFILES: &str = "Escherichia:BACT000060,BACT000065,\nListeria:BACT000001\n";
    const COMBINED: &str = ">BACT000060_1\nAAAA\nCCCC\n>BACT000001_4 desc\nGGGG\n>BACT000065_2\nTTTT\n";

    fn setup() -> (tempfile::TempDir, DatabasePaths) {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("profiles.txt"), PROFILES).unwrap();
        fs::write(dir.path().join("rMLST_combined.fasta"), COMBINED).unwrap();
        let paths = DatabasePaths::new(dir.path());
        (dir, paths)
    }

    #[test]
    fn genus_alleles() {
        let (_dir, db) = setup();
        assert_eq!(
            read_genus_alleles(db.profiles(), "Escherichia").unwrap(),
            vec!["BACT000060", "BACT000065"]
        );
        assert!(read_genus_alleles(db.profiles(), "NotARealGenus").unwrap().is_empty());
    }

    #[test]
    fn keep_and_exclude_selection() {
        let (dir, db) = setup();
        let alleles = vec!["BACT000060".to_string(), "BACT000065".to_string()];

        let kept = dir.path().join("kept.fasta");
        assert_eq!(filter_reference(&db.combined_fasta(), &kept, &alleles, AlleleSelection::Keep).unwrap(), 2);
        assert_eq!(
            fs::read_to_string(&kept).unwrap(),
            ">BACT000060_1\nAAAA\nCCCC\n>BACT000065_2\nTTTT\n"
        );

        let excluded = dir.path().join("excluded.fasta");
        filter_reference(&db.combined_fasta(), &excluded, &alleles, AlleleSelection::Exclude).unwrap();
        assert_eq!(fs::read_to_string(&excluded).unwrap(), ">BACT000001_4\nGGGG\n");
    }

    #[test]
    fn database_is_built_once_and_reused() {
        let (_dir, db) = setup();
        let call = GenusCall::Single("Listeria".into());
        let path = ensure_sample_database(&db, &call, AlleleSelection::Keep).unwrap();
        assert_eq!(path, db.genus_fasta("Listeria"));
        assert_eq!(fs::read_to_string(&path).unwrap(), ">BACT000001_4\nGGGG\n");

        fs::write(&path, ">cached\nA\n").unwrap();
        let again = ensure_sample_database(&db, &call, AlleleSelection::Keep).unwrap();
        assert_eq!(fs::read_to_string(again).unwrap(), ">cached\nA\n");
    }

    #[test]
    fn genus_without_profile_uses_combined_database() {
        let (dir, db) = setup();
        let call = GenusCall::Single("Bacillus".into());
        let path = ensure_sample_database(&db, &call, AlleleSelection::Keep).unwrap();
        assert_eq!(path, db.combined_fasta());
        assert!(!db.genus_fasta("Bacillus").exists());
        // no temporary files left behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn selection_matching_nothing_is_not_cached() {
        let (_dir, db) = setup();
        fs::write(db.profiles(), "Listeria:BACT999999,\n").unwrap();
        let call = GenusCall::Single("Listeria".into());
        let path = ensure_sample_database(&db, &call, AlleleSelection::Keep).unwrap();
        assert_eq!(path, db.combined_fasta());
        assert!(!db.genus_fasta("Listeria").exists());
    }

    #[test]
    fn concurrent_builders_agree() {
        for _ in 0..10 {
            let (_dir, db) = setup();
            let call = GenusCall::Single("Escherichia".into());
            let (db_ref, call_ref) = (&db, &call);
            let paths: Vec<PathBuf> = std::thread::scope(|s| {
                let handles: Vec<_> = (0..8)
                    .map(|_| s.spawn(move || ensure_sample_database(db_ref, call_ref, AlleleSelection::Keep).unwrap()))
                    .collect();
                handles.into_iter().map(|h| h.join().unwrap()).collect()
            });
            assert!(paths.iter().all(|p| *p == db.genus_fasta("Escherichia")));
            assert_eq!(
                fs::read_to_string(db.genus_fasta("Escherichia")).unwrap(),
                ">BACT000060_1\nAAAA\nCCCC\n>BACT000065_2\nTTTT\n"
            );
        }
    }

    #[test]
    fn no_genus_uses_combined_database() {
        let (_dir, db) = setup();
        let path = ensure_sample_database(&db, &GenusCall::NotAvailable, AlleleSelection::Keep).unwrap();
        assert_eq!(path, db.combined_fasta());
    }
}
