//! Artifact extraction from the toolchain output directory.
//!
//! Best effort: a missing kind or an unreadable file leaves that kind
//! absent, never fails the request.

use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use sha2::{Digest, Sha256};
use sketchlane_protocol::ops::{Artifact, ArtifactKind, Artifacts};
use tracing::debug;
use walkdir::WalkDir;

/// Collect the first file of each kind, by file name order.
pub fn extract_artifacts(output_dir: &Path) -> Artifacts {
    let mut artifacts = Artifacts::default();
    for kind in ArtifactKind::ALL {
        if let Some(artifact) = find_first(output_dir, kind).and_then(|path| read_artifact(&path)) {
            artifacts.set(kind, artifact);
        }
    }
    artifacts
}

fn matcher(kind: ArtifactKind) -> Option<GlobMatcher> {
    Glob::new(&format!("*.{}", kind.extension()))
        .map(|glob| glob.compile_matcher())
        .ok()
}

fn find_first(output_dir: &Path, kind: ArtifactKind) -> Option<PathBuf> {
    let matcher = matcher(kind)?;
    WalkDir::new(output_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .find(|entry| matcher.is_match(entry.file_name()))
        .map(|entry| entry.into_path())
}

fn read_artifact(path: &Path) -> Option<Artifact> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(path = %path.display(), error = %e, "artifact unreadable");
            return None;
        }
    };
    Some(Artifact {
        path: path.display().to_string(),
        size_bytes: bytes.len() as u64,
        sha256: hex::encode(Sha256::digest(&bytes)),
        content: decode_text(bytes),
    })
}

/// UTF-8, falling back to one character per byte (Latin-1).
pub fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => e.into_bytes().iter().map(|&b| char::from(b)).collect(),
    }
}
