//! zip 归档

use std::io::{Cursor, Write};

use zip::CompressionMethod;
use zip::write::FileOptions;

use crate::error::{CoreError, CoreResult};
use crate::types::Artifact;

const ZIP_MIME: &str = "application/zip";

/// Deflate `artifacts` into one zip artifact.
pub fn zip_artifacts(identifier: &str, group: &str, artifacts: &[&Artifact]) -> CoreResult<Artifact> {
    let fail = |e: zip::result::ZipError| CoreError::Archive(format!("{identifier}: {e}"));

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
    for artifact in artifacts {
        writer
            .start_file(artifact.identifier.as_str(), options)
            .map_err(fail)?;
        writer
            .write_all(&artifact.payload)
            .map_err(|e| CoreError::Archive(format!("{identifier}: {e}")))?;
    }
    let payload = writer.finish().map_err(fail)?.into_inner();

    log::debug!(
        "Archived {} file(s) into {identifier}: {} bytes",
        artifacts.len(),
        payload.len()
    );
    Ok(Artifact::new(identifier, payload, group, ZIP_MIME))
}

/// One zip per logical group, in first-appearance order.
pub fn archive_per_group(artifacts: &[Artifact], date: &str) -> CoreResult<Vec<Artifact>> {
    let mut groups: Vec<(&str, Vec<&Artifact>)> = Vec::new();
    for artifact in artifacts {
        match groups
            .iter_mut()
            .find(|(group, _)| *group == artifact.logical_group)
        {
            Some((_, members)) => members.push(artifact),
            None => groups.push((artifact.logical_group.as_str(), vec![artifact])),
        }
    }

    groups
        .into_iter()
        .map(|(group, members)| zip_artifacts(&format!("dns_{group}_{date}.zip"), group, &members))
        .collect()
}

/// Everything in a single zip.
pub fn archive_all(artifacts: &[Artifact], date: &str) -> CoreResult<Vec<Artifact>> {
    if artifacts.is_empty() {
        return Ok(Vec::new());
    }
    let members: Vec<&Artifact> = artifacts.iter().collect();
    Ok(vec![zip_artifacts(
        &format!("dns_inventory_{date}.zip"),
        "all",
        &members,
    )?])
}
