//! Sketchlane CLI
//!
//! Entry point for the `sketchlane` command-line tool.

use clap::{Args, Parser, Subcommand};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use sketchlane::report;
use sketchlane::sources::{load_sources, sketch_name_for};
use sketchlane_protocol::ops::{
    names, BuildRequest, BuildResponse, DefineValue, UploadRequest, UploadResponse, Warnings,
};
use sketchlane_protocol::{RpcError, RpcRequest, RpcResponse, PROTOCOL_VERSION_PROBE};
use sketchlane_worker::{init_logging, LaneConfig, RpcHandler, CONFIG_PATH_ENV};
use std::path::{Path, PathBuf};
use std::process;
use tracing::debug;

/// Request handled, toolchain succeeded.
const EXIT_OK: i32 = 0;
/// The toolchain failed, timed out, or the lane hit an internal error.
const EXIT_FAILED: i32 = 1;
/// The request was rejected before anything ran.
const EXIT_REJECTED: i32 = 2;

#[derive(Parser)]
#[command(name = "sketchlane")]
#[command(about = "Sandboxed Arduino build/upload lane", version)]
struct Cli {
    /// Path to lane config file (default: $SKETCHLANE_CONFIG)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Output the raw JSON response
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a sketch directory or source file
    Build(BuildArgs),

    /// Compile a sketch and upload it to a device
    Upload {
        #[command(flatten)]
        build: BuildArgs,

        /// Serial port of the device
        #[arg(long, short = 'p')]
        port: String,
    },

    /// Show toolchain versions and lane settings
    Versions,

    /// List connected boards
    Boards,

    /// List installed cores
    Cores,

    /// List installed libraries
    Libs,

    /// List serial ports
    Ports,

    /// Print the effective lane configuration
    Config,
}

#[derive(Args)]
struct BuildArgs {
    /// Sketch directory or single source file
    path: PathBuf,

    /// Fully qualified board name (wins over --board)
    #[arg(long)]
    fqbn: Option<String>,

    /// Board alias such as uno, nano, mega
    #[arg(long, short = 'b')]
    board: Option<String>,

    /// Sketch name (default: directory name or file stem)
    #[arg(long)]
    sketch_name: Option<String>,

    /// Compiler warning level: none, default, more, all
    #[arg(long, default_value = "default", value_parser = parse_warnings)]
    warnings: Warnings,

    /// Preprocessor define, NAME or NAME=VALUE (repeatable)
    #[arg(short = 'D', value_name = "NAME[=VALUE]", value_parser = parse_define)]
    define: Vec<(String, DefineValue)>,

    /// Extra compiler flag (repeatable)
    #[arg(long = "flag", value_name = "FLAG", allow_hyphen_values = true)]
    flags: Vec<String>,
}

fn main() {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            process::exit(EXIT_REJECTED);
        }
    };
    init_logging(config.debug);

    let code = match cli.command {
        Commands::Build(args) => run_build(config, args, cli.json),
        Commands::Upload { build, port } => run_upload(config, build, port, cli.json),
        Commands::Versions => run_listing(config, names::PROBE, cli.json),
        Commands::Boards => run_listing(config, names::BOARDS, cli.json),
        Commands::Cores => run_listing(config, names::CORES, cli.json),
        Commands::Libs => run_listing(config, names::LIBS, cli.json),
        Commands::Ports => run_listing(config, names::PORTS, cli.json),
        Commands::Config => run_config(&config),
    };
    process::exit(code);
}

fn load_config(path: Option<&Path>) -> Result<LaneConfig, String> {
    let path = path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));
    LaneConfig::load(path.as_deref()).map_err(|e| e.to_string())
}

fn run_build(config: LaneConfig, args: BuildArgs, json_output: bool) -> i32 {
    let request = match build_request(&args) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error reading sources: {}", e);
            return EXIT_REJECTED;
        }
    };
    let response = send(config, names::BUILD, to_value(&request));
    finish::<BuildResponse, _>(&response, json_output, report::render_build)
}

fn run_upload(config: LaneConfig, args: BuildArgs, port: String, json_output: bool) -> i32 {
    let build = match build_request(&args) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error reading sources: {}", e);
            return EXIT_REJECTED;
        }
    };
    let request = UploadRequest {
        build,
        port: Some(port),
    };
    let response = send(config, names::UPLOAD, to_value(&request));
    finish::<UploadResponse, _>(&response, json_output, report::render_upload)
}

/// Probe and catalog operations: the payload is printed as JSON either way.
fn run_listing(config: LaneConfig, op: &str, json_output: bool) -> i32 {
    let response = send(config, op, serde_json::json!({}));
    if json_output {
        print_json(&response);
        return exit_code(&response);
    }
    if let Some(payload) = &response.payload {
        match serde_json::to_string_pretty(payload) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                return EXIT_FAILED;
            }
        }
    }
    if let Some(error) = &response.error {
        eprintln!("{}", report::render_error(error));
    }
    exit_code(&response)
}

fn run_config(config: &LaneConfig) -> i32 {
    match toml::to_string_pretty(config) {
        Ok(text) => {
            print!("{}", text);
            EXIT_OK
        }
        Err(e) => {
            eprintln!("Error serializing config: {}", e);
            EXIT_FAILED
        }
    }
}

fn build_request(args: &BuildArgs) -> Result<BuildRequest, sketchlane::SourceError> {
    let files = load_sources(&args.path)?;
    let sketch_name = args.sketch_name.clone().or_else(|| sketch_name_for(&args.path));
    let defines: IndexMap<String, DefineValue> = args.define.iter().cloned().collect();

    Ok(BuildRequest {
        sketch: None,
        files,
        sketch_name,
        fqbn: args.fqbn.clone(),
        board: args.board.clone(),
        warnings: args.warnings,
        defines,
        extra_flags: args.flags.clone(),
    })
}

/// Answer one request in-process.
fn send(config: LaneConfig, op: &str, payload: serde_json::Value) -> RpcResponse {
    let mut request = RpcRequest::new(op, uuid::Uuid::new_v4().to_string(), payload);
    if op == names::PROBE {
        request.protocol_version = PROTOCOL_VERSION_PROBE;
    }
    debug!(op = %request.op, request_id = %request.request_id, "sending request");
    RpcHandler::new(config).handle(&request)
}

fn to_value<T: serde::Serialize>(payload: &T) -> serde_json::Value {
    serde_json::to_value(payload).unwrap_or_else(|_| serde_json::json!({}))
}

/// Print the response (rendered or raw) and pick the exit code.
fn finish<T, F>(response: &RpcResponse, json_output: bool, render: F) -> i32
where
    T: DeserializeOwned,
    F: Fn(&T) -> String,
{
    if json_output {
        print_json(response);
        return exit_code(response);
    }
    if let Some(payload) = response.payload.clone() {
        match serde_json::from_value::<T>(payload) {
            Ok(typed) => print!("{}", render(&typed)),
            Err(e) => eprintln!("Unexpected response payload: {}", e),
        }
    }
    if let Some(error) = &response.error {
        eprintln!("{}", report::render_error(error));
    }
    exit_code(response)
}

fn print_json(response: &RpcResponse) {
    match serde_json::to_string_pretty(response) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing output: {}", e),
    }
}

fn exit_code(response: &RpcResponse) -> i32 {
    match &response.error {
        None => EXIT_OK,
        Some(error) => error_exit_code(error),
    }
}

fn error_exit_code(error: &RpcError) -> i32 {
    if error.code.is_client_error() && error.code != sketchlane_protocol::ErrorCode::ToolchainFailed {
        EXIT_REJECTED
    } else {
        EXIT_FAILED
    }
}

fn parse_warnings(s: &str) -> Result<Warnings, String> {
    serde_json::from_value(serde_json::Value::String(s.to_ascii_lowercase()))
        .map_err(|_| format!("unknown warning level '{}' (expected none, default, more, all)", s))
}

/// `NAME` is a flag; `NAME=VALUE` keeps integers numeric and everything else text.
fn parse_define(s: &str) -> Result<(String, DefineValue), String> {
    let (name, value) = match s.split_once('=') {
        Some((name, value)) => {
            let value = value
                .parse::<i64>()
                .map(DefineValue::Int)
                .unwrap_or_else(|_| DefineValue::Text(value.to_string()));
            (name, value)
        }
        None => (s, DefineValue::Bool(true)),
    };
    if name.is_empty() {
        return Err("define name must not be empty".to_string());
    }
    Ok((name.to_string(), value))
}
