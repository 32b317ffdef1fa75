//! Deny-by-default admission gate for sketch build requests.
//!
//! The gate normalizes an untrusted build/upload request, validates every
//! file against name, size, and extension rules, and resolves the target.
//! Nothing touches disk or spawns a process until a request is admitted.

mod config;
mod files;
mod result;
mod target;

pub use config::{default_aliases, GateConfig, DEFAULT_ALIASES, DEFAULT_BOARD};
pub use files::{check_define_name, check_extension, check_file, check_file_name, check_files, check_sketch_name};
pub use result::{AdmittedBuild, AdmittedUpload, RejectionReason, ResolvedTarget};
pub use target::resolve_target;

use sketchlane_protocol::ops::{BuildRequest, NamedFile, UploadRequest};

/// Sketch name used when the request does not provide one.
pub const DEFAULT_SKETCH_NAME: &str = "sketch";

/// The admission gate.
#[derive(Debug, Clone)]
pub struct Gate {
    config: GateConfig,
}

impl Gate {
    /// Create a new gate with the given configuration.
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Validate and normalize a build request, then resolve its target.
    pub fn admit_build(&self, request: &BuildRequest) -> Result<AdmittedBuild, RejectionReason> {
        let sketch_name = request
            .sketch_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_SKETCH_NAME)
            .to_string();
        check_sketch_name(&sketch_name)?;

        let files = combine_files(request, &sketch_name);
        check_files(&files, &self.config)?;

        for name in request.defines.keys() {
            check_define_name(name)?;
        }

        let target = resolve_target(request.fqbn.as_deref(), request.board.as_deref(), &self.config)?;

        Ok(AdmittedBuild {
            files,
            sketch_name,
            target,
            warnings: request.warnings,
            defines: request.defines.clone(),
            extra_flags: request.extra_flags.clone(),
        })
    }

    /// Validate an upload request: a build request plus a port.
    pub fn admit_upload(&self, request: &UploadRequest) -> Result<AdmittedUpload, RejectionReason> {
        let port = request
            .port
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or(RejectionReason::MissingPort)?
            .to_string();

        let build = self.admit_build(&request.build)?;
        Ok(AdmittedUpload { build, port })
    }
}

/// Fold the inline sketch into the explicit file list.
///
/// The inline source becomes `<sketch_name>.ino`, appended after the
/// explicit files so their order is preserved.
fn combine_files(request: &BuildRequest, sketch_name: &str) -> Vec<NamedFile> {
    let mut files = request.files.clone();
    if let Some(sketch) = request.sketch.as_deref().filter(|s| !s.is_empty()) {
        files.push(NamedFile::new(format!("{}.ino", sketch_name), sketch));
    }
    files
}
