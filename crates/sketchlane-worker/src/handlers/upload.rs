//! Upload operation handler.
//!
//! Compiles, then uploads only when the compile succeeded. The error, if
//! any, describes the phase that decided the outcome.

use sketchlane_protocol::ops::UploadRequest;
use sketchlane_protocol::{RpcError, RpcRequest};

use super::{pipeline_error, to_payload, toolchain_error, Lane, Reply};

/// Handle the upload operation.
pub fn handle(request: &RpcRequest, lane: &Lane) -> Result<Reply, RpcError> {
    let req: UploadRequest = request.parse_payload()?;
    let response = lane.pipeline().upload(&req).map_err(pipeline_error)?;
    let payload = to_payload(&response)?;

    if response.succeeded() {
        return Ok(Reply::Ok(payload));
    }

    let timeout = if response.build.succeeded() {
        lane.pipeline().upload_timeout()
    } else {
        lane.pipeline().compile_timeout()
    };
    let error = toolchain_error(response.deciding_outcome(), timeout);
    Ok(Reply::Failed { error, payload })
}
