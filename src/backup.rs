use anyhow::{anyhow, Context};
use serde_json::json;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::store::SnapshotBlobs;

const MANIFEST_ENTRY: &str = "manifest.json";
const USERS_ENTRY: &str = "data/users.json";
const COURSES_ENTRY: &str = "data/courses.json";
pub const BUNDLE_FORMAT_V1: &str = "coursebook-snapshot-v1";

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub entry_count: usize,
}

#[derive(Debug, Clone)]
pub struct ImportedSnapshot {
    pub bundle_format: String,
    pub revision: u64,
    pub blobs: SnapshotBlobs,
}

pub fn export_snapshot_bundle(
    blobs: &SnapshotBlobs,
    revision: u64,
    out_path: &Path,
) -> anyhow::Result<ExportSummary> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }

    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let manifest = json!({
        "format": BUNDLE_FORMAT_V1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "revision": revision,
        "exportedAt": chrono::Utc::now().to_rfc3339(),
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    zip.start_file(USERS_ENTRY, opts)
        .context("failed to start users entry")?;
    zip.write_all(blobs.users.as_bytes())
        .context("failed to write users entry")?;

    zip.start_file(COURSES_ENTRY, opts)
        .context("failed to start courses entry")?;
    zip.write_all(blobs.courses.as_bytes())
        .context("failed to write courses entry")?;

    zip.finish().context("failed to finalize zip bundle")?;

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        entry_count: 3,
    })
}

fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> anyhow::Result<String> {
    let mut text = String::new();
    archive
        .by_name(name)
        .with_context(|| format!("bundle missing {name}"))?
        .read_to_string(&mut text)
        .with_context(|| format!("failed to read {name}"))?;
    Ok(text)
}

pub fn import_snapshot_bundle(in_path: &Path) -> anyhow::Result<ImportedSnapshot> {
    if !is_zip_file(in_path)? {
        return Err(anyhow!(
            "not a snapshot bundle: {}",
            in_path.to_string_lossy()
        ));
    }
    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let manifest_text = read_entry(&mut archive, MANIFEST_ENTRY)?;
    let manifest: serde_json::Value =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid JSON")?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != BUNDLE_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", format));
    }
    let revision = manifest
        .get("revision")
        .and_then(|v| v.as_u64())
        .unwrap_or(0);

    let users = read_entry(&mut archive, USERS_ENTRY)?;
    let courses = read_entry(&mut archive, COURSES_ENTRY)?;

    Ok(ImportedSnapshot {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        revision,
        blobs: SnapshotBlobs { users, courses },
    })
}

fn is_zip_file(path: &Path) -> anyhow::Result<bool> {
    let mut f = File::open(path)
        .with_context(|| format!("failed to open input file {}", path.to_string_lossy()))?;
    let mut sig = [0u8; 4];
    let read = f.read(&mut sig).context("failed to read file signature")?;
    if read < 4 {
        return Ok(false);
    }
    Ok(sig == [0x50, 0x4B, 0x03, 0x04])
}
