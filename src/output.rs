//! Writing show records to disk.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use tracing::debug;

use crate::schema::Show;

/// Write `show` as `<ids joined by '-'>.json` under `dir`, replacing any
/// existing file of that name.
pub fn write_show(dir: &Path, show: &Show) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {:?}", dir))?;

    let path = dir.join(format!("{}.json", show.file_stem()));
    let json = to_json(show)?;
    std::fs::write(&path, json).with_context(|| format!("Failed to write show: {:?}", path))?;

    debug!("Wrote {:?}", path);
    Ok(path)
}

/// Pretty JSON with four-space indentation.
fn to_json(show: &Show) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    show.serialize(&mut ser).context("Failed to serialize show")?;
    Ok(buf)
}
