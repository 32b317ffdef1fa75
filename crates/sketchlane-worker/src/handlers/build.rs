//! Build operation handler.
//!
//! Compiles the request's sketch and returns the composed result. A failed
//! compile still returns the full result alongside the error.

use sketchlane_protocol::ops::BuildRequest;
use sketchlane_protocol::{RpcError, RpcRequest};

use super::{pipeline_error, to_payload, toolchain_error, Lane, Reply};

/// Handle the build operation.
pub fn handle(request: &RpcRequest, lane: &Lane) -> Result<Reply, RpcError> {
    let req: BuildRequest = request.parse_payload()?;
    let response = lane.pipeline().build(&req).map_err(pipeline_error)?;
    let payload = to_payload(&response)?;

    if response.result.succeeded() {
        Ok(Reply::Ok(payload))
    } else {
        let error = toolchain_error(&response.result.outcome, lane.pipeline().compile_timeout());
        Ok(Reply::Failed { error, payload })
    }
}
