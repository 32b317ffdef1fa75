//! Operation-specific types.

pub mod build;
pub mod catalog;
pub mod probe;
pub mod result;

pub use build::{BuildRequest, DefineValue, NamedFile, UploadRequest, Warnings};
pub use catalog::CatalogKind;
pub use probe::{LaneSettings, ProbeResponse, ToolVersions};
pub use result::{
    Artifact, ArtifactKind, Artifacts, BuildResponse, BuildResult, Diagnostic, ProcessOutcome,
    Severity, UploadPhase, UploadResponse, TIMEOUT_RETURN_CODE,
};

/// Known operation names.
pub mod names {
    pub const PROBE: &str = "probe";
    pub const BUILD: &str = "build";
    pub const UPLOAD: &str = "upload";
    pub const BOARDS: &str = "boards";
    pub const CORES: &str = "cores";
    pub const LIBS: &str = "libs";
    pub const PORTS: &str = "ports";

    /// Every operation the worker answers, in display order.
    pub const ALL: &[&str] = &[PROBE, BUILD, UPLOAD, BOARDS, CORES, LIBS, PORTS];
}
