//! Per-request workspace.
//!
//! Each request owns a uniquely named temp root:
//!
//! ```text
//! <temp_root>/sketchlane-XXXXXX/
//!   src/<sketch_name>/   staged files
//!   build/               toolchain build path
//!   out/                 toolchain output dir (artifacts)
//! ```
//!
//! The root is removed when the [`Workspace`] is dropped, on every exit path.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use sketchlane_protocol::ops::NamedFile;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, warn};

/// Prefix of every workspace root.
pub const WORKSPACE_PREFIX: &str = "sketchlane-";

const SOURCE_DIR: &str = "src";
const BUILD_DIR: &str = "build";
const OUTPUT_DIR: &str = "out";

/// Errors from workspace operations.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to create workspace: {0}")]
    Create(#[source] io::Error),

    #[error("failed to write {name}: {source}")]
    Stage {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("path escapes the workspace: {0}")]
    Escapes(String),

    #[error("failed to remove workspace {path}: {source}")]
    Teardown {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Where workspaces are created.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceConfig {
    /// Parent directory (default: system temp dir).
    pub temp_root: Option<PathBuf>,
}

/// Scoped temp directory tree for one request.
#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    root: PathBuf,
    sketch_dir: PathBuf,
}

impl Workspace {
    /// Create a fresh root and the sketch directory inside it.
    pub fn create(config: &WorkspaceConfig, sketch_name: &str) -> Result<Self, WorkspaceError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKSPACE_PREFIX);
        let dir = match &config.temp_root {
            Some(parent) => builder.tempdir_in(parent),
            None => builder.tempdir(),
        }
        .map_err(WorkspaceError::Create)?;

        let root = dir.path().to_path_buf();
        let sketch_dir = root.join(SOURCE_DIR).join(checked_relative(sketch_name)?);
        fs::create_dir_all(&sketch_dir).map_err(WorkspaceError::Create)?;

        debug!(root = %root.display(), "workspace created");
        Ok(Self {
            dir: Some(dir),
            root,
            sketch_dir,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn sketch_dir(&self) -> &Path {
        &self.sketch_dir
    }

    pub fn build_dir(&self) -> PathBuf {
        self.root.join(BUILD_DIR)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(OUTPUT_DIR)
    }

    /// Write each file under the sketch directory, creating parents.
    pub fn stage(&self, files: &[NamedFile]) -> Result<(), WorkspaceError> {
        for file in files {
            let relative = checked_relative(&file.name)?;
            let path = self.sketch_dir.join(relative);
            let stage_err = |source| WorkspaceError::Stage {
                name: file.name.clone(),
                source,
            };
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(stage_err)?;
            }
            fs::write(&path, file.content.as_bytes()).map_err(stage_err)?;
        }
        debug!(count = files.len(), "files staged");
        Ok(())
    }

    /// Create the build and output directories.
    pub fn prepare_output_dirs(&self) -> Result<(), WorkspaceError> {
        fs::create_dir_all(self.build_dir()).map_err(WorkspaceError::Create)?;
        fs::create_dir_all(self.output_dir()).map_err(WorkspaceError::Create)?;
        Ok(())
    }

    /// Remove the workspace now and report failure.
    pub fn close(mut self) -> Result<(), WorkspaceError> {
        match self.dir.take() {
            Some(dir) => dir.close().map_err(|source| WorkspaceError::Teardown {
                path: self.root.clone(),
                source,
            }),
            None => Ok(()),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            if let Err(e) = dir.close() {
                warn!(root = %self.root.display(), error = %e, "workspace teardown failed");
            } else {
                debug!(root = %self.root.display(), "workspace removed");
            }
        }
    }
}

/// Accept only plain relative components.
///
/// The gate already rejects unsafe names; this keeps the workspace sound on
/// its own.
fn checked_relative(name: &str) -> Result<&Path, WorkspaceError> {
    let path = Path::new(name);
    let plain = !name.is_empty() && path.components().all(|c| matches!(c, Component::Normal(_)));
    if !plain {
        return Err(WorkspaceError::Escapes(name.to_string()));
    }
    Ok(path)
}
