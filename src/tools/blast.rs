//src/tools/blast.rs

use std::path::{Path, PathBuf};
use std::process::Command;

use super::{run_command, run_command_with_stdin, SearchHit, SequenceSearch, ToolPaths};
use crate::error::{DetectError, Result};

/// Index files `makeblastdb` writes next to a nucleotide FASTA.
const INDEX_EXTENSIONS: [&str; 3] = ["nhr", "nin", "nsq"];

/// `blastn` with tabular output, indexing databases with `makeblastdb`.
pub struct Blastn {
    blastn: PathBuf,
    makeblastdb: PathBuf,
}

impl Blastn {
    pub fn new(paths: &ToolPaths) -> Self {
        Self {
            blastn: paths.blastn.clone(),
            makeblastdb: paths.makeblastdb.clone(),
        }
    }
}

fn index_file(database: &Path, ext: &str) -> PathBuf {
    let mut name = database.as_os_str().to_os_string();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// Parses `-outfmt 6` lines: qseqid sseqid pident length ...
pub fn parse_tabular_hits(text: &str) -> Result<Vec<SearchHit>> {
    text.lines()
        .filter(|l| !l.trim().is_empty() && !l.starts_with('#'))
        .map(|line| {
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 4 {
                return Err(DetectError::parse("BLAST hit", line));
            }
            Ok(SearchHit {
                subject: fields[1].to_string(),
                identity: fields[2]
                    .parse()
                    .map_err(|_| DetectError::parse("BLAST identity", line))?,
                align_length: fields[3]
                    .parse()
                    .map_err(|_| DetectError::parse("BLAST alignment length", line))?,
            })
        })
        .collect()
}

impl SequenceSearch for Blastn {
    fn has_index(&self, database: &Path) -> bool {
        INDEX_EXTENSIONS
            .iter()
            .all(|ext| index_file(database, ext).is_file())
    }

    fn build_index(&self, database: &Path) -> Result<()> {
        run_command(
            Command::new(&self.makeblastdb)
                .arg("-in")
                .arg(database)
                .args(["-dbtype", "nucl"]),
        )?;
        Ok(())
    }

    fn search(&self, query: &str, database: &Path) -> Result<Vec<SearchHit>> {
        let fasta = format!(">query\n{query}\n");
        let output = run_command_with_stdin(
            Command::new(&self.blastn)
                .arg("-db")
                .arg(database)
                .args(["-outfmt", "6"]),
            &fasta,
        )?;
        parse_tabular_hits(&String::from_utf8_lossy(&output.stdout))
    }
}
