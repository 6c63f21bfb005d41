//src/fastq.rs

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;

use crate::types::ReadSet;

pub fn is_gz(path: &Path) -> bool {
    path.extension().map(|ext| ext == "gz").unwrap_or(false)
}

/// Opens a FASTQ file, transparently decompressing `.gz`.
pub fn open_fastq(path: &Path) -> io::Result<Box<dyn BufRead>> {
    let f = File::open(path)?;
    if is_gz(path) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(f))))
    } else {
        Ok(Box::new(BufReader::new(f)))
    }
}

/// Total number of sequenced bases in a FASTQ file.
pub fn count_bases(path: &Path) -> io::Result<u64> {
    let mut reader = open_fastq(path)?;
    let mut line = String::new();
    let mut bases = 0u64;
    let mut line_no = 0usize;

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        // sequence is the second line of every four-line record
        if line_no % 4 == 1 {
            bases += line.trim_end().len() as u64;
        }
        line_no += 1;
    }
    Ok(bases)
}

/// Coverage of the marker genes, assuming both mates carry as many bases as the forward file.
pub fn estimate_coverage(reads: &ReadSet, genome_size: u64) -> io::Result<f64> {
    let files = reads.files();
    let forward_bases = count_bases(files[0])?;
    let total = forward_bases * files.len() as u64;
    Ok(total as f64 / genome_size as f64)
}

/// Writes a plain copy of a gzipped FASTQ into `dir`; plain inputs are returned as-is.
pub fn decompress_into(path: &Path, dir: &Path) -> io::Result<PathBuf> {
    if !is_gz(path) {
        return Ok(path.to_path_buf());
    }
    let name = path
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "reads.fastq".into());
    let out_path = dir.join(name);

    let mut reader = open_fastq(path)?;
    let mut writer = BufWriter::new(File::create(&out_path)?);
    io::copy(&mut reader, &mut writer)?;
    Ok(out_path)
}

/// Plain-text view of a read set, decompressing gzipped members into `dir`.
pub fn decompress_read_set(reads: &ReadSet, dir: &Path) -> io::Result<ReadSet> {
    Ok(match reads {
        ReadSet::Paired { forward, reverse } => ReadSet::Paired {
            forward: decompress_into(forward, dir)?,
            reverse: decompress_into(reverse, dir)?,
        },
        ReadSet::Single(path) => ReadSet::Single(decompress_into(path, dir)?),
    })
}
