//! Stepwise MCP Server
//!
//! Line-delimited JSON-RPC 2.0 over stdin/stdout.
//!
//! Tools:
//! - decompose: Run LU, PLU, LDLt, Sparse-LDLt, RREF or Nullspace on a matrix
//! - list_operations: List the operations and the input each one takes
//! - project: Project a vector onto each vector of a basis

use std::io::{self, BufRead, Write};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use stepwise_core::{EngineConfig, StepwiseError};
use stepwise_matrix::helpers::{extract_basis, extract_number_list, extract_request};
use stepwise_matrix::{project_onto_basis, run, DecompositionLog, OperationKind, Outcome, ResultGroup};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const PROTOCOL_VERSION: &str = "2025-11-25";
const SERVER_NAME: &str = "stepwise";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

const NO_DECOMPOSITION_TEXT: &str = "Can't decompose! Try pivoting.";

// MCP Protocol types
#[derive(Debug, Deserialize)]
struct McpRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    id: Option<JsonValue>,
    method: String,
    #[serde(default)]
    params: Option<JsonValue>,
}

#[derive(Debug, Serialize)]
struct McpResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<McpError>,
}

#[derive(Debug, Serialize)]
struct McpError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<JsonValue>,
}

impl McpError {
    const PARSE: i32 = -32700;
    const METHOD_NOT_FOUND: i32 = -32601;
    const INVALID_PARAMS: i32 = -32602;
    const INTERNAL: i32 = -32603;

    fn invalid_params(message: impl Into<String>) -> Self {
        McpError { code: Self::INVALID_PARAMS, message: message.into(), data: None }
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .init();

    let config = match EngineConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "invalid engine configuration");
            std::process::exit(1);
        }
    };

    info!(version = SERVER_VERSION, protocol = PROTOCOL_VERSION, "Stepwise MCP Server started");
    info!(?config, "engine configuration");

    let stdin = io::stdin();
    let mut reader = io::BufReader::new(stdin.lock());

    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => {
                info!("client disconnected (EOF)");
                break;
            }
            Ok(_) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                debug!(bytes = line.len(), "received");

                let Some(response) = handle_line(&config, line) else {
                    continue;
                };
                if let Err(e) = write_response(&response) {
                    error!(error = %e, "writing response failed");
                    break;
                }
            }
            Err(e) => {
                error!(error = %e, "reading input failed");
                break;
            }
        }
    }

    info!("server shutting down");
}

/// Handle one input line; `None` for notifications, which get no response
fn handle_line(config: &EngineConfig, line: &str) -> Option<McpResponse> {
    let request: McpRequest = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "unparseable request");
            return Some(McpResponse {
                jsonrpc: "2.0".to_string(),
                id: None,
                result: None,
                error: Some(McpError { code: McpError::PARSE, message: format!("Parse error: {}", e), data: None }),
            });
        }
    };

    debug!(method = %request.method, "processing");
    let response = handle_request(config, &request);

    if request.id.is_none() {
        debug!(method = %request.method, "notification processed (no response)");
        return None;
    }
    Some(response)
}

fn write_response(response: &McpResponse) -> io::Result<()> {
    let response_json = serde_json::to_string(response)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", response_json)?;
    stdout.flush()
}

fn handle_request(config: &EngineConfig, request: &McpRequest) -> McpResponse {
    let result = match request.method.as_str() {
        // Lifecycle
        "initialize" => handle_initialize(&request.params),
        "initialized" => Ok(json!({})),
        "ping" => Ok(json!({})),

        // Tools
        "tools/list" => handle_tools_list(),
        "tools/call" => handle_tool_call(config, &request.params),

        _ => Err(McpError {
            code: McpError::METHOD_NOT_FOUND,
            message: format!("Method not found: {}", request.method),
            data: None,
        }),
    };

    match result {
        Ok(r) => McpResponse {
            jsonrpc: "2.0".to_string(),
            id: request.id.clone(),
            result: Some(r),
            error: None,
        },
        Err(e) => McpResponse {
            jsonrpc: "2.0".to_string(),
            id: request.id.clone(),
            result: None,
            error: Some(e),
        },
    }
}

fn handle_initialize(params: &Option<JsonValue>) -> Result<JsonValue, McpError> {
    let client_info = params.as_ref()
        .and_then(|p| p.get("clientInfo"))
        .and_then(|c| c.get("name"))
        .and_then(|n| n.as_str())
        .unwrap_or("unknown");

    // answer with the client's protocol version when it sends one
    let client_protocol = params.as_ref()
        .and_then(|p| p.get("protocolVersion"))
        .and_then(|v| v.as_str())
        .unwrap_or(PROTOCOL_VERSION);

    info!(client = client_info, protocol = client_protocol, "client connected");

    Ok(json!({
        "protocolVersion": client_protocol,
        "serverInfo": {
            "name": SERVER_NAME,
            "version": SERVER_VERSION,
            "description": "Step-by-step matrix factorizations"
        },
        "capabilities": {
            "tools": {
                "listChanged": false
            }
        },
        "instructions": "Stepwise factors matrices and shows every intermediate step. Call 'list_operations' to see what is available, then 'decompose' with a matrix such as \"[4,3;6,3]\" (dense) or \"[[0,0,4],[0,1,2],[1,1,5]]\" (sparse symmetric)."
    }))
}

fn handle_tools_list() -> Result<JsonValue, McpError> {
    let operations: Vec<&str> = OperationKind::ALL.iter().map(|k| k.as_str()).collect();

    Ok(json!({
        "tools": [
            {
                "name": "decompose",
                "description": "Run a factorization and return every logged step plus the final matrices.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "operation": {
                            "type": "string",
                            "description": "Operation to run",
                            "enum": operations
                        },
                        "matrix": {
                            "description": "Dense text [a,b;c,d], sparse text [[row,col,value],...], or a list of rows",
                            "oneOf": [
                                { "type": "string" },
                                { "type": "array", "items": { "type": "array", "items": { "type": "number" } } }
                            ]
                        },
                        "config": {
                            "type": "object",
                            "description": "Overrides for pivot_epsilon, sparse_pivot_epsilon, elimination_tolerance, symmetry_tolerance"
                        }
                    },
                    "required": ["operation", "matrix"]
                }
            },
            {
                "name": "list_operations",
                "description": "List available operations and the input each one takes.",
                "inputSchema": {
                    "type": "object",
                    "properties": {}
                }
            },
            {
                "name": "project",
                "description": "Project a vector onto each vector of a basis.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "vector": {
                            "type": "array",
                            "items": { "type": "number" }
                        },
                        "basis": {
                            "type": "array",
                            "description": "List of basis vectors",
                            "items": { "type": "array", "items": { "type": "number" } }
                        },
                        "config": {
                            "type": "object"
                        }
                    },
                    "required": ["vector", "basis"]
                }
            }
        ]
    }))
}

fn handle_tool_call(config: &EngineConfig, params: &Option<JsonValue>) -> Result<JsonValue, McpError> {
    let params = params.as_ref().ok_or_else(|| McpError::invalid_params("Missing params"))?;

    let name = params.get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| McpError::invalid_params("Missing tool name"))?;

    let args = params.get("arguments").cloned().unwrap_or(json!({}));

    match name {
        "decompose" => tool_decompose(config, args),
        "list_operations" => tool_list_operations(),
        "project" => tool_project(config, args),
        _ => Err(McpError::invalid_params(format!("Unknown tool: {}", name))),
    }
}

/// Engine failures are tool results, not protocol errors
fn engine_error(err: &StepwiseError) -> JsonValue {
    warn!(code = %err.code, "{}", err.message);
    json!({
        "content": [{ "type": "text", "text": err.to_string() }],
        "error": err,
        "isError": true
    })
}

fn call_config(base: &EngineConfig, args: &JsonValue) -> Result<EngineConfig, StepwiseError> {
    match args.get("config") {
        Some(overrides) => base.with_overrides(overrides),
        None => Ok(*base),
    }
}

fn tool_decompose(base: &EngineConfig, args: JsonValue) -> Result<JsonValue, McpError> {
    let operation = args.get("operation")
        .and_then(|v| v.as_str())
        .ok_or_else(|| McpError::invalid_params("Missing operation argument"))?;
    let matrix = args.get("matrix")
        .ok_or_else(|| McpError::invalid_params("Missing matrix argument"))?;

    let result = call_config(base, &args).and_then(|config| {
        let kind: OperationKind = operation.parse()?;
        let request = extract_request(kind, matrix, &config)?;
        run(&request, &config).map(|outcome| (kind, outcome))
    });

    let (kind, outcome) = match result {
        Ok(r) => r,
        Err(e) => return Ok(engine_error(&e)),
    };

    let text = match &outcome {
        Outcome::Complete { log } => format_log(kind, log),
        Outcome::NoDecomposition { .. } => NO_DECOMPOSITION_TEXT.to_string(),
    };
    let outcome_json = serde_json::to_value(&outcome)
        .map_err(|e| McpError { code: McpError::INTERNAL, message: format!("Serialization failed: {}", e), data: None })?;

    Ok(json!({
        "content": [{ "type": "text", "text": text }],
        "operation": kind.as_str(),
        "outcome": outcome_json,
        "isError": false
    }))
}

fn tool_list_operations() -> Result<JsonValue, McpError> {
    let operations: Vec<JsonValue> = OperationKind::ALL.iter().map(|k| {
        json!({
            "name": k.as_str(),
            "input": k.input_kind(),
            "description": k.description()
        })
    }).collect();

    let text = OperationKind::ALL.iter()
        .map(|k| format!("- {}: {}", k.as_str(), k.description()))
        .collect::<Vec<_>>()
        .join("\n");

    Ok(json!({
        "content": [{ "type": "text", "text": text }],
        "operations": operations
    }))
}

fn tool_project(base: &EngineConfig, args: JsonValue) -> Result<JsonValue, McpError> {
    let vector = args.get("vector").ok_or_else(|| McpError::invalid_params("Missing vector argument"))?;
    let basis = args.get("basis").ok_or_else(|| McpError::invalid_params("Missing basis argument"))?;

    let result = call_config(base, &args).and_then(|config| {
        let v = extract_number_list(vector, "vector")?;
        let b = extract_basis(basis, "basis")?;
        project_onto_basis(&v, &b, &config)
    });

    match result {
        Ok(projection) => Ok(json!({
            "content": [{ "type": "text", "text": format!("Projections (one per column):\n{}", projection) }],
            "projection": projection,
            "isError": false
        })),
        Err(e) => Ok(engine_error(&e)),
    }
}

/// Plain-text rendering: one section per step, then the extra matrices
fn format_log(kind: OperationKind, log: &DecompositionLog) -> String {
    let mut out = format!("{}\n", kind.as_str());

    let steps: Vec<(&str, &[stepwise_matrix::Matrix])> = log.groups().iter()
        .filter_map(|g| match g {
            ResultGroup::Steps { name, snapshots } => Some((name.as_str(), snapshots.as_slice())),
            ResultGroup::Extra { .. } => None,
        })
        .collect();

    for step in 0..log.step_count().unwrap_or(0) {
        out.push_str(&format!("\nStep {}\n", step + 1));
        for (name, snapshots) in &steps {
            out.push_str(&format!("{} = {}\n", name, snapshots[step]));
        }
    }

    let extras: Vec<String> = log.groups().iter()
        .filter_map(|g| match g {
            ResultGroup::Extra { name, matrix } => Some(format!("{} = {}", name, matrix)),
            ResultGroup::Steps { .. } => None,
        })
        .collect();
    if !extras.is_empty() {
        out.push('\n');
        out.push_str(&extras.join("\n"));
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: Option<i64>, method: &str, params: JsonValue) -> McpRequest {
        McpRequest {
            jsonrpc: "2.0".to_string(),
            id: id.map(|i| json!(i)),
            method: method.to_string(),
            params: Some(params),
        }
    }

    fn call(tool: &str, arguments: JsonValue) -> JsonValue {
        let req = request(Some(1), "tools/call", json!({ "name": tool, "arguments": arguments }));
        let response = handle_request(&EngineConfig::default(), &req);
        assert!(response.error.is_none(), "unexpected error: {:?}", response.error);
        response.result.unwrap()
    }

    #[test]
    fn test_initialize() {
        let req = request(Some(1), "initialize", json!({ "protocolVersion": "2024-11-05" }));
        let response = handle_request(&EngineConfig::default(), &req);
        let result = response.result.unwrap();
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], "stepwise");
    }

    #[test]
    fn test_tools_list() {
        let response = handle_request(&EngineConfig::default(), &request(Some(2), "tools/list", json!({})));
        let tools = response.result.unwrap()["tools"].as_array().unwrap().clone();
        let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["decompose", "list_operations", "project"]);
    }

    #[test]
    fn test_unknown_method() {
        let response = handle_request(&EngineConfig::default(), &request(Some(3), "resources/list", json!({})));
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[test]
    fn test_parse_error_and_notification() {
        let response = handle_line(&EngineConfig::default(), "{not json").unwrap();
        assert_eq!(response.error.unwrap().code, -32700);

        let notification = r#"{"jsonrpc":"2.0","method":"initialized"}"#;
        assert!(handle_line(&EngineConfig::default(), notification).is_none());
    }

    #[test]
    fn test_decompose_lu() {
        let result = call("decompose", json!({ "operation": "LU", "matrix": "[4,3;6,3]" }));
        assert_eq!(result["isError"], false);
        assert_eq!(result["outcome"]["status"], "complete");

        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("Step 1"));
        assert!(text.contains("L = [[1, 0], [1.5, 1]]"));
        assert!(text.contains("U = [[4, 3], [0, -1.5]]"));
    }

    #[test]
    fn test_decompose_no_decomposition() {
        let result = call("decompose", json!({ "operation": "LU", "matrix": [[0, 1], [1, 0]] }));
        assert_eq!(result["isError"], false);
        assert_eq!(result["content"][0]["text"], NO_DECOMPOSITION_TEXT);
        assert_eq!(result["outcome"]["status"], "no_decomposition");
    }

    #[test]
    fn test_decompose_sparse() {
        let result = call("decompose", json!({
            "operation": "sparse-ldlt",
            "matrix": "[[0,0,4],[0,1,2],[1,1,5]]"
        }));
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("D = [[4, 0], [0, 4]]"));
        assert!(text.contains("L = [[1, 0], [0.5, 1]]"));
    }

    #[test]
    fn test_decompose_engine_errors_are_tool_results() {
        let result = call("decompose", json!({ "operation": "QR", "matrix": "[1]" }));
        assert_eq!(result["isError"], true);
        assert_eq!(result["error"]["code"], "UNKNOWN_OPERATION");

        let result = call("decompose", json!({ "operation": "LDLt", "matrix": "[1,2;3,4]" }));
        assert_eq!(result["error"]["code"], "NOT_SYMMETRIC");

        let result = call("decompose", json!({ "operation": "LU", "matrix": "[1,2;3]" }));
        assert_eq!(result["error"]["code"], "INVALID_SHAPE");
    }

    #[test]
    fn test_decompose_config_override() {
        let result = call("decompose", json!({
            "operation": "LDLt",
            "matrix": "[0.25,0.25;0.25,1]",
            "config": { "pivot_epsilon": 0.5 }
        }));
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("L = [[1, 0], [0, 1]]"), "{}", text);

        let result = call("decompose", json!({
            "operation": "LU",
            "matrix": "[1]",
            "config": { "bogus": 1 }
        }));
        assert_eq!(result["isError"], true);
    }

    #[test]
    fn test_decompose_missing_arguments() {
        let req = request(Some(4), "tools/call", json!({ "name": "decompose", "arguments": { "operation": "LU" } }));
        let response = handle_request(&EngineConfig::default(), &req);
        assert_eq!(response.error.unwrap().code, -32602);
    }

    #[test]
    fn test_list_operations() {
        let result = call("list_operations", json!({}));
        let ops = result["operations"].as_array().unwrap();
        assert_eq!(ops.len(), 6);
        assert_eq!(ops[3]["name"], "Sparse-LDLt");
        assert_eq!(ops[3]["input"], "sparse_symmetric");
    }

    #[test]
    fn test_project() {
        let result = call("project", json!({ "vector": [2, 0], "basis": [[1, 1]] }));
        assert_eq!(result["isError"], false);
        assert_eq!(result["projection"], json!([[1.0], [1.0]]));

        let result = call("project", json!({ "vector": [1, 1], "basis": [[0, 0]] }));
        assert_eq!(result["error"]["code"], "DOMAIN_ERROR");
    }

    #[test]
    fn test_format_log_sections() {
        let config = EngineConfig::default();
        let req = stepwise_matrix::Request::from_text(OperationKind::Plu, "[0,1;1,0]", &config).unwrap();
        let outcome = run(&req, &config).unwrap();
        let text = format_log(OperationKind::Plu, outcome.log().unwrap());

        assert!(text.starts_with("PLU\n"));
        assert!(text.contains("\nStep 1\nL = "));
        assert!(text.ends_with("P = [[0, 1], [1, 0]]\n"));
    }
}
