//! Source record loader: one gzip-compressed JSON-lines file per split.

use crate::source::{SourceUnit, Split};
use flate2::read::GzDecoder;
use serde::Deserialize;
use std::borrow::Cow;
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Default input root.
pub const DEFAULT_INPUT_DIR: &str = "/mnt/inputs";

/// One corpus record.
#[derive(Debug, Deserialize)]
struct Record {
    source_code: String,
    sha256_hash: String,
}

/// Errors loading a split.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read line {line}: {source}")]
    Read {
        line: usize,
        #[source]
        source: io::Error,
    },

    #[error("malformed record on line {line}: {source}")]
    Record {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// `<root>/<split>.jsonl.gz`
pub fn split_path(root: &Path, split: Split) -> PathBuf {
    root.join(format!("{split}.jsonl.gz"))
}

/// Load every record of `split` under `root`.
pub fn load_split(root: &Path, split: Split) -> Result<Vec<SourceUnit>, LoadError> {
    let path = split_path(root, split);
    let file = File::open(&path).map_err(|source| LoadError::Open {
        path: path.clone(),
        source,
    })?;

    let units = load_from_reader(BufReader::new(GzDecoder::new(file)), split)?;
    tracing::info!("Loaded {} units from {}", units.len(), path.display());
    Ok(units)
}

/// Decode JSON-lines records from an already decompressed reader.
///
/// Blank lines are skipped. A repeated id keeps its first record. Invalid
/// UTF-8 is replaced with U+FFFD rather than failing the split.
pub fn load_from_reader<R: BufRead>(reader: R, split: Split) -> Result<Vec<SourceUnit>, LoadError> {
    let mut units = Vec::new();
    let mut seen = HashSet::new();

    for (i, bytes) in reader.split(b'\n').enumerate() {
        let line_no = i + 1;
        let bytes = bytes.map_err(|source| LoadError::Read { line: line_no, source })?;
        let line = String::from_utf8_lossy(&bytes);
        if let Cow::Owned(_) = line {
            tracing::warn!("Replaced invalid UTF-8 on line {line_no} of {split}");
        }
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let record: Record = serde_json::from_str(line).map_err(|source| LoadError::Record {
            line: line_no,
            source,
        })?;

        if !seen.insert(record.sha256_hash.clone()) {
            tracing::warn!(
                "Skipping duplicate record {} on line {line_no} of {split}",
                record.sha256_hash
            );
            continue;
        }

        units.push(SourceUnit::from_record(
            record.sha256_hash,
            &record.source_code,
            split,
        ));
    }

    Ok(units)
}
