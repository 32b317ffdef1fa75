//! Worker RPC Handler
//!
//! Implements the stdin/stdout JSON RPC handler for the worker entrypoint:
//!
//!   sketchlane-worker rpc
//!
//! The handler reads a single JSON request line from stdin, dispatches it to
//! the operation handler, and writes a single JSON response line to stdout.
//! Logs go to stderr.

use std::io::{self, BufRead, Read, Write};

use sketchlane_protocol::ops::{names, CatalogKind};
use sketchlane_protocol::{
    RpcError, RpcRequest, RpcResponse, PROTOCOL_MAX, PROTOCOL_MIN, PROTOCOL_VERSION_PROBE,
};
use tracing::{debug, info_span, warn};

use crate::config::LaneConfig;
use crate::handlers::{self, Lane, Reply};

/// Headroom for the envelope and JSON escaping of a maximal request.
const ENVELOPE_OVERHEAD_BYTES: u64 = 1024 * 1024;

/// Worst-case JSON expansion of one content byte (`\u00XX`).
const JSON_ESCAPE_FACTOR: u64 = 6;

/// Main RPC handler for the worker.
#[derive(Debug, Clone)]
pub struct RpcHandler {
    lane: Lane,
}

impl RpcHandler {
    /// Create a new RPC handler with the given configuration.
    pub fn new(config: LaneConfig) -> Self {
        Self {
            lane: Lane::new(config),
        }
    }

    /// Run the RPC handler, reading from stdin and writing to stdout.
    pub fn run(&self) -> io::Result<()> {
        self.run_with_io(&mut io::stdin().lock(), &mut io::stdout().lock())
    }

    /// Run the RPC handler with custom I/O.
    pub fn run_with_io<R: BufRead, W: Write>(&self, reader: &mut R, writer: &mut W) -> io::Result<()> {
        let response = self.respond(reader);
        self.write_response(writer, &response)
    }

    /// Answer one request read from `reader`.
    pub fn respond<R: BufRead>(&self, reader: &mut R) -> RpcResponse {
        let request = match self.read_request(reader) {
            Ok(req) => req,
            Err(e) => {
                warn!(error = %e, "unreadable request");
                return RpcResponse::error(PROTOCOL_VERSION_PROBE, String::new(), e);
            }
        };

        self.handle(&request)
    }

    /// Answer an already decoded request.
    pub fn handle(&self, request: &RpcRequest) -> RpcResponse {
        if let Err(e) = validate_protocol_version(request) {
            return RpcResponse::error(request.protocol_version, request.request_id.clone(), e);
        }

        self.dispatch(request)
    }

    /// Largest request line accepted, derived from the file limits.
    pub fn max_request_bytes(&self) -> u64 {
        let config = self.lane.config();
        (config.max_files as u64)
            .saturating_mul(config.max_file_bytes)
            .saturating_mul(JSON_ESCAPE_FACTOR)
            .saturating_add(ENVELOPE_OVERHEAD_BYTES)
    }

    /// Read and parse the RPC request from the reader.
    fn read_request<R: BufRead>(&self, reader: &mut R) -> Result<RpcRequest, RpcError> {
        let max = self.max_request_bytes();
        let mut line = String::new();
        reader
            .take(max.saturating_add(1))
            .read_line(&mut line)
            .map_err(|e| RpcError::invalid_request(format!("failed to read request: {}", e)))?;

        if line.len() as u64 > max {
            return Err(RpcError::payload_too_large(line.len() as u64, max));
        }

        serde_json::from_str(&line).map_err(|e| RpcError::invalid_request(format!("invalid JSON: {}", e)))
    }

    /// Dispatch the request to the appropriate operation handler.
    fn dispatch(&self, request: &RpcRequest) -> RpcResponse {
        let span = info_span!("rpc", op = %request.op, request_id = %request.request_id);
        let _guard = span.enter();

        let protocol_version = if request.op == names::PROBE {
            PROTOCOL_VERSION_PROBE
        } else {
            request.protocol_version
        };

        let result = match request.op.as_str() {
            names::PROBE => handlers::probe::handle(&self.lane),
            names::BUILD => handlers::build::handle(request, &self.lane),
            names::UPLOAD => handlers::upload::handle(request, &self.lane),
            op => match CatalogKind::from_op(op) {
                Some(kind) => handlers::catalog::handle(kind, &self.lane),
                None => Err(RpcError::unknown_operation(op)),
            },
        };

        let request_id = request.request_id.clone();
        let response = match result {
            Ok(Reply::Ok(payload)) => RpcResponse::success(protocol_version, request_id, payload),
            Ok(Reply::Failed { error, payload }) => {
                RpcResponse::failure(protocol_version, request_id, error, payload)
            }
            Err(e) => RpcResponse::error(protocol_version, request_id, e),
        };
        debug!(ok = response.ok, status = response.status, "request answered");
        response
    }

    /// Write the response to the writer.
    fn write_response<W: Write>(&self, writer: &mut W, response: &RpcResponse) -> io::Result<()> {
        let json = serde_json::to_string(response).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(writer, "{}", json)?;
        writer.flush()
    }
}

/// Probe uses version 0; everything else must be in the supported range.
fn validate_protocol_version(request: &RpcRequest) -> Result<(), RpcError> {
    if request.op == names::PROBE {
        if request.protocol_version != PROTOCOL_VERSION_PROBE {
            return Err(RpcError::unsupported_protocol(
                request.protocol_version,
                PROTOCOL_VERSION_PROBE,
                PROTOCOL_VERSION_PROBE,
            ));
        }
        return Ok(());
    }

    if request.protocol_version < PROTOCOL_MIN || request.protocol_version > PROTOCOL_MAX {
        return Err(RpcError::unsupported_protocol(
            request.protocol_version,
            PROTOCOL_MIN,
            PROTOCOL_MAX,
        ));
    }

    Ok(())
}
