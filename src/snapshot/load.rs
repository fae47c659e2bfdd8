use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use super::model::{Edge, Node, Snapshot};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read snapshot {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to parse snapshot {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    edges: Vec<Edge>,
}

pub fn parse_snapshot(raw: &str) -> Result<Snapshot, serde_json::Error> {
    let parsed: RawSnapshot = serde_json::from_str(raw)?;
    Ok(Snapshot::new(parsed.nodes, parsed.edges))
}

pub fn load_snapshot(path: &Path) -> Result<Snapshot, SnapshotError> {
    let raw = fs::read_to_string(path).map_err(|source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let snapshot = parse_snapshot(&raw).map_err(|source| SnapshotError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    info!(
        path = %path.display(),
        nodes = snapshot.nodes.len(),
        edges = snapshot.edges.len(),
        "snapshot loaded"
    );
    Ok(snapshot)
}

/// Reads a JSON object mapping subject names to `#rrggbb` override colors.
///
/// Values that are not strings are skipped; whether a string is a usable hex
/// color is decided later by the encoding rules.
pub fn load_subject_colors(path: &Path) -> Result<HashMap<String, String>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read subject colors from {}", path.display()))?;
    let parsed: Value = serde_json::from_str(&raw).context("invalid JSON in subject colors")?;
    let object = parsed
        .as_object()
        .ok_or_else(|| anyhow!("subject colors must be a JSON object"))?;

    let mut colors = HashMap::with_capacity(object.len());
    for (subject, value) in object {
        match value.as_str() {
            Some(hex) => {
                colors.insert(subject.clone(), hex.to_owned());
            }
            None => warn!(subject = %subject, "ignoring non-string subject color"),
        }
    }

    Ok(colors)
}
