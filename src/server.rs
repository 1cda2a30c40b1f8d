use crate::config::{Config, DEFAULT_BRANCH};
use crate::directory;
use crate::error::DirectoryError;
use crate::http;
use crate::markdown::normalize_image_references;
use crate::mcp::mcp_wrap;
use crate::tools::*;
use crate::types::ContentEntry;
use log::{debug, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::io::{self, BufRead, Write};
use tokio::runtime::Runtime;

// Minimal JSON-RPC 2.0 types
#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum Id {
    Str(String),
    Num(i64),
    Null,
}

#[derive(Debug, Serialize, Deserialize)]
struct Request {
    jsonrpc: String,
    method: String,
    #[serde(default)]
    params: Value,
    id: Option<Id>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Response {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
    id: Option<Id>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

fn rpc_error(id: Option<Id>, code: i64, message: &str, data: Option<Value>) -> Response {
    Response {
        jsonrpc: "2.0".into(),
        result: None,
        error: Some(RpcError {
            code,
            message: message.into(),
            data,
        }),
        id,
    }
}

fn rpc_ok(id: Option<Id>, result: Value) -> Response {
    Response {
        jsonrpc: "2.0".into(),
        result: Some(result),
        error: None,
        id,
    }
}

pub fn run_stdio_server() -> anyhow::Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    serve(stdin.lock(), stdout.lock())
}

/// Answer one JSON-RPC request per non-empty input line, in order, on a single-threaded runtime.
pub fn serve<R: BufRead, W: Write>(input: R, mut output: W) -> anyhow::Result<()> {
    info!(
        "Starting repo-directory stdio server; protocol={}",
        PROTOCOL_VERSION
    );
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    for line in input.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let resp = match serde_json::from_str::<Request>(&line) {
            Ok(req) => {
                debug!("Received method={}", req.method);
                dispatch(&rt, req)
            }
            Err(e) => rpc_error(None, -32700, &format!("Parse error: {}", e), None),
        };
        write_response(&mut output, &resp)?;
    }
    Ok(())
}

fn write_response<W: Write>(out: &mut W, resp: &Response) -> anyhow::Result<()> {
    let payload = serde_json::to_string(resp)?;
    writeln!(out, "{}", payload)?;
    out.flush()?;
    Ok(())
}

fn dispatch(rt: &Runtime, req: Request) -> Response {
    match req.method.as_str() {
        "initialize" => handle_initialize(req.id),
        "tools/list" => handle_tools_list(req.id),
        "tools/call" => handle_tools_call(rt, req.id, req.params),
        other => rpc_error(req.id, -32601, &format!("Method not found: {}", other), None),
    }
}

fn handle_initialize(id: Option<Id>) -> Response {
    rpc_ok(
        id,
        serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "serverInfo": {
                "name": "repo-directory",
                "version": env!("CARGO_PKG_VERSION"),
            },
            "capabilities": { "tools": {} }
        }),
    )
}

fn handle_tools_list(id: Option<Id>) -> Response {
    let tools = tool_descriptors();
    rpc_ok(id, serde_json::json!({ "tools": tools }))
}

#[derive(Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

fn handle_tools_call(rt: &Runtime, id: Option<Id>, params: Value) -> Response {
    let parsed: Result<ToolCallParams, _> = serde_json::from_value(params);
    let Ok(call) = parsed else {
        return rpc_error(id, -32602, "Invalid params", None);
    };
    // Tools take an object; a missing `arguments` means "no arguments".
    let args = if call.arguments.is_null() {
        Value::Object(Default::default())
    } else {
        call.arguments
    };
    match call.name.as_str() {
        "list_repositories" => handle_list_repositories(rt, id, args),
        "repository_exists" => handle_repository_exists(rt, id, args),
        "rename_repository" => handle_rename_repository(rt, id, args),
        "get_content" => handle_get_content(rt, id, args),
        "get_file_text" => handle_get_file_text(rt, id, args),
        "probe_path" => handle_probe_path(rt, id, args),
        "get_readme" => handle_get_readme(rt, id, args),
        "normalize_image_references" => handle_normalize(id, args),
        _ => rpc_error(id, -32601, &format!("Tool not found: {}", call.name), None),
    }
}

// Build a client for one tool call and drive `op` to completion on the server runtime.
fn with_client<T, F, Fut>(rt: &Runtime, cfg: &Config, op: F) -> Result<T, ErrorShape>
where
    F: FnOnce(Client) -> Fut,
    Fut: Future<Output = Result<T, DirectoryError>>,
{
    let client = http::build_client(cfg)
        .map_err(|e| DirectoryError::from_reqwest("Failed to build HTTP client", e))?;
    rt.block_on(op(client)).map_err(ErrorShape::from)
}

fn tool_response<T: Serialize>(
    id: Option<Id>,
    result: Result<T, ErrorShape>,
    text: impl FnOnce(&T) -> Option<String>,
) -> Response {
    let (out, text, is_error) = match result {
        Ok(item) => {
            let text = text(&item);
            (
                ToolOutput {
                    item: Some(item),
                    error: None,
                },
                text,
                false,
            )
        }
        Err(err) => {
            warn!("tool call failed: {} ({})", err.message, err.code);
            let text = Some(err.message.clone());
            (
                ToolOutput {
                    item: None,
                    error: Some(err),
                },
                text,
                true,
            )
        }
    };
    match serde_json::to_value(out) {
        Ok(structured) => rpc_ok(id, mcp_wrap(structured, text, is_error)),
        Err(e) => rpc_error(id, -32603, &format!("Failed to encode result: {}", e), None),
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(args: Value) -> Result<T, String> {
    serde_json::from_value(args).map_err(|e| format!("Invalid params: {}", e))
}

fn load_config() -> Result<Config, String> {
    Config::from_env().map_err(|e| e.to_string())
}

fn resolve_owner(explicit: Option<String>, cfg: &Config) -> Result<String, String> {
    explicit
        .or_else(|| cfg.default_owner.clone())
        .filter(|o| !o.is_empty())
        .ok_or_else(|| "Invalid params: owner is required (or set REPO_DIRECTORY_OWNER)".to_string())
}

macro_rules! try_rpc {
    ($id:expr, $code:expr, $e:expr) => {
        match $e {
            Ok(v) => v,
            Err(msg) => return rpc_error($id, $code, &msg, None),
        }
    };
}

fn handle_list_repositories(rt: &Runtime, id: Option<Id>, args: Value) -> Response {
    let input: ListRepositoriesInput = try_rpc!(id, -32602, parse_args(args));
    let cfg = try_rpc!(id, -32603, load_config());
    let owner = input.owner.or_else(|| cfg.default_owner.clone());
    let cfg = &cfg;
    let result = with_client(rt, cfg, |client| async move {
        directory::list_repositories(&client, cfg, owner.as_deref()).await
    });
    tool_response(id, result, |_| None)
}

fn handle_repository_exists(rt: &Runtime, id: Option<Id>, args: Value) -> Response {
    let input: RepositoryExistsInput = try_rpc!(id, -32602, parse_args(args));
    let cfg = try_rpc!(id, -32603, load_config());
    let owner = try_rpc!(id, -32602, resolve_owner(input.owner, &cfg));
    let repo = input.repo;
    let cfg = &cfg;
    let result = with_client(rt, cfg, |client| async move {
        let exists = directory::repository_exists(&client, cfg, &owner, &repo).await?;
        Ok::<_, DirectoryError>(RepositoryExistsItem {
            owner,
            repo,
            exists,
        })
    });
    tool_response(id, result, |_| None)
}

// The change code gates renaming only; it is never sent to the host.
fn check_rename_gate(cfg: &Config, input: &RenameRepositoryInput) -> Result<(), ErrorShape> {
    match cfg.change_code.as_deref() {
        None => Err(ErrorShape::new(
            "rename_disabled",
            "Repository renaming is disabled: no change code is configured",
        )),
        Some(code) if code != input.change_code => Err(ErrorShape::new(
            "rename_disabled",
            "Incorrect change name code",
        )),
        Some(_) => {
            let new_name = input.new_name.trim();
            if new_name.is_empty() || new_name == input.old_name {
                Err(ErrorShape::new(
                    "invalid_name",
                    "Please enter a new name different from the current one",
                ))
            } else {
                Ok(())
            }
        }
    }
}

fn handle_rename_repository(rt: &Runtime, id: Option<Id>, args: Value) -> Response {
    let input: RenameRepositoryInput = try_rpc!(id, -32602, parse_args(args));
    let cfg = try_rpc!(id, -32603, load_config());
    if let Err(gate) = check_rename_gate(&cfg, &input) {
        return tool_response(id, Err::<(), _>(gate), |_| None);
    }
    let owner = try_rpc!(id, -32602, resolve_owner(input.owner.clone(), &cfg));
    let cfg = &cfg;
    let result = with_client(rt, cfg, |client| async move {
        directory::rename_repository(
            &client,
            cfg,
            &owner,
            &input.old_name,
            input.new_name.trim(),
        )
        .await
    });
    tool_response(id, result, |outcome| Some(outcome.message.clone()))
}

// Tools addressing a path default to README.md on the configured branch.
fn path_and_branch(input: &PathInput, cfg: &Config) -> (String, String) {
    let path = input
        .path
        .clone()
        .unwrap_or_else(|| directory::README_PATH.to_string());
    let branch = input
        .branch
        .clone()
        .unwrap_or_else(|| cfg.default_branch.clone());
    (path, branch)
}

fn handle_get_content(rt: &Runtime, id: Option<Id>, args: Value) -> Response {
    let input: PathInput = try_rpc!(id, -32602, parse_args(args));
    let cfg = try_rpc!(id, -32603, load_config());
    let owner = try_rpc!(id, -32602, resolve_owner(input.owner.clone(), &cfg));
    let (path, branch) = path_and_branch(&input, &cfg);
    let cfg = &cfg;
    let result = with_client(rt, cfg, |client| async move {
        directory::get_content(&client, cfg, &owner, &input.repo, &path, Some(branch.as_str())).await
    });
    tool_response(id, result, |entry| match entry {
        ContentEntry::File(f) if f.decoded => Some(f.content.clone()),
        _ => None,
    })
}

fn handle_get_file_text(rt: &Runtime, id: Option<Id>, args: Value) -> Response {
    let input: PathInput = try_rpc!(id, -32602, parse_args(args));
    let cfg = try_rpc!(id, -32603, load_config());
    let owner = try_rpc!(id, -32602, resolve_owner(input.owner.clone(), &cfg));
    let (path, branch) = path_and_branch(&input, &cfg);
    let cfg = &cfg;
    let result = with_client(rt, cfg, |client| async move {
        directory::get_file_text(&client, cfg, &owner, &input.repo, &path, Some(branch.as_str())).await
    });
    tool_response(id, result, |text| Some(text.clone()))
}

fn handle_probe_path(rt: &Runtime, id: Option<Id>, args: Value) -> Response {
    let input: PathInput = try_rpc!(id, -32602, parse_args(args));
    let cfg = try_rpc!(id, -32603, load_config());
    let owner = try_rpc!(id, -32602, resolve_owner(input.owner.clone(), &cfg));
    let (path, branch) = path_and_branch(&input, &cfg);
    let cfg = &cfg;
    let result = with_client(rt, cfg, |client| async move {
        directory::probe_exists(&client, cfg, &owner, &input.repo, &path, Some(branch.as_str())).await
    });
    tool_response(id, result, |_| None)
}

fn handle_get_readme(rt: &Runtime, id: Option<Id>, args: Value) -> Response {
    let input: ReadmeInput = try_rpc!(id, -32602, parse_args(args));
    let cfg = try_rpc!(id, -32603, load_config());
    let owner = try_rpc!(id, -32602, resolve_owner(input.owner, &cfg));
    let repo = input.repo;
    let branch = input.branch.unwrap_or_else(|| cfg.default_branch.clone());
    let cfg = &cfg;
    let result = with_client(rt, cfg, |client| async move {
        directory::fetch_readme(&client, cfg, &owner, &repo, Some(branch.as_str())).await
    });
    tool_response(id, result, |text| Some(text.clone()))
}

fn handle_normalize(id: Option<Id>, args: Value) -> Response {
    let input: NormalizeInput = try_rpc!(id, -32602, parse_args(args));
    let branch = input
        .default_branch
        .filter(|b| !b.is_empty())
        .unwrap_or_else(|| DEFAULT_BRANCH.to_string());
    let text = normalize_image_references(&input.markdown, &branch);
    tool_response(id, Ok(text), |t| Some(t.clone()))
}
