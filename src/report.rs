//src/report.rs

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::error::Result;
use crate::types::ContaminationVerdict;

pub const REPORT_HEADER: [&str; 5] = ["Sample", "Genus", "NumContamSNVs", "NumUniqueKmers", "ContamStatus"];

/// Append-only CSV report shared by every sample of a run.
pub struct ReportWriter {
    path: PathBuf,
    out: Mutex<csv::Writer<File>>,
}

impl ReportWriter {
    /// Creates (or truncates) the report and writes the header.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut out = csv::Writer::from_path(path)?;
        out.write_record(REPORT_HEADER)?;
        out.flush()?;
        Ok(Self {
            path: path.to_path_buf(),
            out: Mutex::new(out),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one row and flushes it, so a crash loses at most the sample in flight.
    pub fn append(&self, verdict: &ContaminationVerdict) -> Result<()> {
        let mut out = self.out.lock();
        out.write_record(verdict.to_record())?;
        out.flush()?;
        Ok(())
    }
}
