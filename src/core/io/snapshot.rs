use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use crate::core::genome::ReferencePosition;
use crate::core::result::DeNovoResult;

/// Evaluated candidates, including sites that were evaluated and rejected
/// (None) so resumed runs do not revisit them.
pub type Results = HashMap<ReferencePosition, Option<DeNovoResult>>;

const FORMAT: &str = "supernovo-results";
const VERSION: u32 = 1;

/// Snapshots are gzipped JSON lines: a header object followed by one entry
/// per evaluated position. The original's language-native object stream is
/// deliberately not readable.
#[derive(Serialize, Deserialize)]
struct Header {
    format: String,
    version: u32,
}

#[derive(Serialize)]
struct EntryRef<'a> {
    position: &'a ReferencePosition,
    result: &'a Option<DeNovoResult>,
}

#[derive(Deserialize)]
struct Entry {
    position: ReferencePosition,
    result: Option<DeNovoResult>,
}

pub fn write(path: &Path, results: &Results) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create snapshot {}", path.display()))?;
    let mut writer = BufWriter::new(GzEncoder::new(file, Compression::default()));

    serde_json::to_writer(&mut writer, &Header { format: FORMAT.to_string(), version: VERSION })?;
    writeln!(writer)?;
    for (position, result) in results {
        serde_json::to_writer(&mut writer, &EntryRef { position, result })?;
        writeln!(writer)?;
    }
    writer
        .into_inner()
        .map_err(|error| error.into_error())
        .and_then(|encoder| encoder.finish())
        .with_context(|| format!("failed to finish snapshot {}", path.display()))?;
    Ok(())
}

pub fn read(path: &Path) -> Result<Results> {
    let file =
        File::open(path).with_context(|| format!("failed to open snapshot {}", path.display()))?;
    let reader = BufReader::new(MultiGzDecoder::new(file));

    let mut lines = reader.lines();
    let header: Header = match lines.next() {
        Some(line) => serde_json::from_str(&line?).context("snapshot header is not readable")?,
        None => bail!("snapshot {} is empty", path.display()),
    };
    if header.format != FORMAT || header.version != VERSION {
        bail!(
            "snapshot {} has unsupported format {} v{} (expected {} v{})",
            path.display(),
            header.format,
            header.version,
            FORMAT,
            VERSION
        );
    }

    let mut results = Results::new();
    for line in lines {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let entry: Entry = serde_json::from_str(&line)
            .with_context(|| format!("corrupt snapshot entry in {}", path.display()))?;
        results.insert(entry.position, entry.result);
    }
    Ok(results)
}

/// Atomically replace the checkpoint: write a sibling temp file, then
/// rename over the target. The rename is the commit point.
pub fn checkpoint(path: &Path, results: &Results) -> Result<()> {
    let temp = PathBuf::from(format!("{}_TEMP", path.display()));
    write(&temp, results)?;
    fs::rename(&temp, path)
        .with_context(|| format!("failed to overwrite checkpoint {}", path.display()))?;
    Ok(())
}
