//! Build and upload pipelines.
//!
//! admit -> create workspace -> stage -> compile -> compose [-> upload].
//! The workspace lives exactly as long as one call and is removed on every
//! exit path.

use std::time::Duration;

use sketchlane_gate::{AdmittedBuild, Gate, RejectionReason};
use sketchlane_protocol::ops::{BuildRequest, BuildResponse, BuildResult, UploadRequest, UploadResponse};
use sketchlane_protocol::RpcError;
use thiserror::Error;
use tracing::{info, warn};

use crate::compose::{compose_build, compose_upload};
use crate::config::LaneConfig;
use crate::executor::{compile_args, upload_args, CompileSpec, ExecutorError, Invoker};
use crate::workspace::{Workspace, WorkspaceConfig, WorkspaceError};

/// Errors that stop a pipeline before a result can be composed.
///
/// A toolchain that runs and fails is not an error here: its outcome is
/// part of the returned result.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Rejected(#[from] RejectionReason),

    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

impl From<PipelineError> for RpcError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Rejected(reason) => reason.into(),
            PipelineError::Workspace(err) => RpcError::internal(err.to_string()),
            PipelineError::Executor(err) => RpcError::internal(err.to_string()),
        }
    }
}

/// Request-independent pipeline state, built once from the config.
#[derive(Debug, Clone)]
pub struct Pipeline {
    gate: Gate,
    invoker: Invoker,
    workspace: WorkspaceConfig,
    compile_timeout: Duration,
    upload_timeout: Duration,
    verbose_compile: bool,
}

impl Pipeline {
    pub fn new(config: &LaneConfig) -> Self {
        Self {
            gate: Gate::new(config.gate_config()),
            invoker: Invoker::new(config.invoker_config()),
            workspace: config.workspace_config(),
            compile_timeout: config.compile_timeout(),
            upload_timeout: config.upload_timeout(),
            verbose_compile: config.verbose_compile,
        }
    }

    pub fn compile_timeout(&self) -> Duration {
        self.compile_timeout
    }

    pub fn upload_timeout(&self) -> Duration {
        self.upload_timeout
    }

    /// Validate, stage, and compile.
    pub fn build(&self, request: &BuildRequest) -> Result<BuildResponse, PipelineError> {
        let admitted = self.gate.admit_build(request)?;
        let workspace = self.stage(&admitted)?;
        let result = self.compile(&admitted, &workspace)?;
        drop(workspace);

        info!(
            fqbn = %admitted.target,
            return_code = result.outcome.return_code,
            timed_out = result.outcome.timed_out,
            diagnostics = result.diagnostics.len(),
            "build finished"
        );
        Ok(BuildResponse {
            target: admitted.target.to_string(),
            sketch_name: admitted.sketch_name,
            result,
        })
    }

    /// Validate, stage, compile, and upload when the compile succeeded.
    pub fn upload(&self, request: &UploadRequest) -> Result<UploadResponse, PipelineError> {
        let admitted = self.gate.admit_upload(request)?;
        let build = &admitted.build;
        let workspace = self.stage(build)?;
        let compiled = self.compile(build, &workspace)?;

        let upload = if compiled.succeeded() {
            let invocation = self
                .invoker
                .toolchain(
                    upload_args(build.target.as_str(), &admitted.port, workspace.sketch_dir()),
                    self.upload_timeout,
                )
                .in_dir(workspace.sketch_dir());
            Some(compose_upload(self.invoker.run(&invocation)?))
        } else {
            warn!(fqbn = %build.target, "compile failed, upload skipped");
            None
        };
        drop(workspace);

        let response = UploadResponse {
            target: build.target.to_string(),
            sketch_name: build.sketch_name.clone(),
            port: admitted.port.clone(),
            build: compiled,
            upload,
        };
        info!(
            fqbn = %response.target,
            port = %response.port,
            return_code = response.deciding_outcome().return_code,
            "upload finished"
        );
        Ok(response)
    }

    fn stage(&self, admitted: &AdmittedBuild) -> Result<Workspace, PipelineError> {
        let workspace = Workspace::create(&self.workspace, &admitted.sketch_name)?;
        workspace.stage(&admitted.files)?;
        workspace.prepare_output_dirs()?;
        Ok(workspace)
    }

    fn compile(&self, admitted: &AdmittedBuild, workspace: &Workspace) -> Result<BuildResult, PipelineError> {
        let build_dir = workspace.build_dir();
        let output_dir = workspace.output_dir();
        let spec = CompileSpec {
            target: admitted.target.as_str(),
            warnings: admitted.warnings,
            build_dir: &build_dir,
            output_dir: &output_dir,
            sketch_dir: workspace.sketch_dir(),
            defines: &admitted.defines,
            extra_flags: &admitted.extra_flags,
            verbose: self.verbose_compile,
        };
        let invocation = self
            .invoker
            .toolchain(compile_args(&spec), self.compile_timeout)
            .in_dir(workspace.sketch_dir());
        let outcome = self.invoker.run(&invocation)?;
        Ok(compose_build(outcome, &output_dir))
    }
}
