//! MCP (Model Context Protocol) server over stdio.
//!
//! Implements a JSON-RPC 2.0 server that exposes the engine's query
//! operations as MCP tools, one tool per capability. Designed for use with
//! AI coding assistants via the `scout mcp serve` command.
//!
//! Transport: NDJSON over stdin/stdout. No async runtime required. The
//! active session lives behind an `RwLock<Option<Session>>`: exploring a
//! project builds a complete new session and swaps it in one assignment,
//! so overlapping readers never observe a half-built index.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::{OnceLock, RwLock};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analyzer;
use crate::errors::ScoutError;
use crate::output::{ReferenceOutput, SearchOutput, SymbolOutput};
use crate::refs;
use crate::search::{self, SearchOptions};
use crate::session::Session;
use crate::types::SymbolKind;

// ---------------------------------------------------------------------------
// JSON-RPC 2.0 types
// ---------------------------------------------------------------------------

const JSONRPC_VERSION: &str = "2.0";
const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RequestId {
    Number(i64),
    Str(String),
}

#[derive(Debug, Serialize)]
struct Response {
    jsonrpc: &'static str,
    id: RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl Response {
    fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: RequestId, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// MCP protocol types
// ---------------------------------------------------------------------------

const PROTOCOL_VERSION: &str = "2025-11-25";

#[derive(Debug, Serialize)]
struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    protocol_version: &'static str,
    capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    server_info: ServerInfo,
}

#[derive(Debug, Serialize)]
struct ServerCapabilities {
    tools: ToolsCapability,
}

#[derive(Debug, Serialize)]
struct ToolsCapability {}

#[derive(Debug, Serialize)]
struct ServerInfo {
    name: &'static str,
    version: &'static str,
}

#[derive(Debug, Clone, Serialize)]
struct Tool {
    name: &'static str,
    description: &'static str,
    #[serde(rename = "inputSchema")]
    input_schema: Value,
}

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Serialize)]
struct CallToolResult {
    content: Vec<Content>,
    #[serde(rename = "isError", skip_serializing_if = "std::ops::Not::not")]
    is_error: bool,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(rename = "type")]
    type_: &'static str,
    text: String,
}

impl Content {
    fn text(text: String) -> Self {
        Self {
            type_: "text",
            text,
        }
    }
}

impl CallToolResult {
    fn success(text: String) -> Self {
        Self {
            content: vec![Content::text(text)],
            is_error: false,
        }
    }

    fn error(message: String) -> Self {
        Self {
            content: vec![Content::text(message)],
            is_error: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Extract a required string parameter from JSON args, returning a
/// `CallToolResult::error` on missing.
fn require_str(args: &Value, key: &str) -> Result<String, CallToolResult> {
    args.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| CallToolResult::error(format!("missing required parameter: {key}")))
}

fn opt_str(args: &Value, key: &str) -> Option<String> {
    args.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}

fn opt_bool(args: &Value, key: &str, default: bool) -> bool {
    args.get(key).and_then(|v| v.as_bool()).unwrap_or(default)
}

fn opt_usize(args: &Value, key: &str) -> Option<usize> {
    args.get(key).and_then(|v| v.as_u64()).map(|v| v as usize)
}

/// Serialize any `Serialize` value into a successful `CallToolResult`.
fn format_result<T: Serialize>(data: &T) -> CallToolResult {
    match serde_json::to_string_pretty(data) {
        Ok(s) => CallToolResult::success(s),
        Err(_) => CallToolResult::error("output formatting failed".into()),
    }
}

/// Map an engine error to a tool error, preserving the taxonomy name so a
/// calling agent can branch on it.
fn error_result(err: &ScoutError) -> CallToolResult {
    CallToolResult::error(format!("{}: {err}", err.code()))
}

// ---------------------------------------------------------------------------
// Tool definitions
// ---------------------------------------------------------------------------

fn tool_definitions() -> &'static Vec<Tool> {
    static TOOLS: OnceLock<Vec<Tool>> = OnceLock::new();
    TOOLS.get_or_init(|| {
        vec![
            Tool {
                name: "explore_project",
                description: "Explore a project directory: scan the tree, build the symbol index, and return structure and statistics. Must be called before any other tool.",
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "path": {
                            "type": "string",
                            "description": "Path to the project directory"
                        }
                    },
                    "required": ["path"]
                }),
            },
            Tool {
                name: "list_files",
                description: "List files in a directory of the explored project, with metadata.",
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "directory": {
                            "type": "string",
                            "description": "Directory relative to the project root",
                            "default": "."
                        },
                        "recursive": {
                            "type": "boolean",
                            "description": "Recurse into subdirectories",
                            "default": false
                        },
                        "code_only": {
                            "type": "boolean",
                            "description": "Only list recognized code files",
                            "default": true
                        },
                        "extension": {
                            "type": "string",
                            "description": "Restrict to an extension pattern, e.g. *.py"
                        }
                    }
                }),
            },
            Tool {
                name: "read_file",
                description: "Read a file's content, optionally sliced to a 1-indexed inclusive line range.",
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "file_path": {
                            "type": "string",
                            "description": "File path relative to the project root"
                        },
                        "start_line": {
                            "type": "integer",
                            "description": "First line to include (1-indexed)"
                        },
                        "end_line": {
                            "type": "integer",
                            "description": "Last line to include (inclusive)"
                        }
                    },
                    "required": ["file_path"]
                }),
            },
            Tool {
                name: "search_files",
                description: "Search for text in project files, grouped per file.",
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "Text to search for (literal)"
                        },
                        "file_pattern": {
                            "type": "string",
                            "description": "File pattern to match, e.g. *.py,*.js",
                            "default": "*"
                        },
                        "case_sensitive": {
                            "type": "boolean",
                            "default": false
                        }
                    },
                    "required": ["query"]
                }),
            },
            Tool {
                name: "search_symbol",
                description: "Search declared symbols (classes, functions, methods, imports) by name substring.",
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "symbol_name": {
                            "type": "string",
                            "description": "Symbol name or name fragment"
                        },
                        "symbol_type": {
                            "type": "string",
                            "enum": ["class", "function", "method", "import"],
                            "description": "Restrict to one symbol kind"
                        }
                    },
                    "required": ["symbol_name"]
                }),
            },
            Tool {
                name: "find_references",
                description: "Find all whole-word occurrences of a symbol, classified as declaration or reference.",
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "symbol_name": {
                            "type": "string",
                            "description": "Symbol name to find references for"
                        },
                        "scope": {
                            "type": "string",
                            "description": "Directory (relative) to restrict the scan to"
                        }
                    },
                    "required": ["symbol_name"]
                }),
            },
            Tool {
                name: "find_definition",
                description: "Find the declaration sites of a symbol by exact name. A symbol defined in several files yields several declarations.",
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "symbol_name": {
                            "type": "string",
                            "description": "Exact symbol name"
                        }
                    },
                    "required": ["symbol_name"]
                }),
            },
            Tool {
                name: "search_code_advanced",
                description: "Advanced code search with regex, whole-word matching, and surrounding context.",
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "Text or pattern to search for"
                        },
                        "file_pattern": {
                            "type": "string",
                            "description": "File pattern to match, e.g. *.py,*.js",
                            "default": "*"
                        },
                        "case_sensitive": {
                            "type": "boolean",
                            "default": false
                        },
                        "whole_word": {
                            "type": "boolean",
                            "default": false
                        },
                        "regex": {
                            "type": "boolean",
                            "description": "Treat the query as a regular expression",
                            "default": false
                        },
                        "context_lines": {
                            "type": "integer",
                            "description": "Lines of context before and after each match",
                            "default": 2
                        },
                        "max_results": {
                            "type": "integer",
                            "description": "Stop after this many matches"
                        }
                    },
                    "required": ["query"]
                }),
            },
            Tool {
                name: "analyze_imports",
                description: "Aggregate import statements across the project (or a scope) grouped by importing file.",
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "scope": {
                            "type": "string",
                            "description": "File or directory (relative) to restrict to"
                        }
                    }
                }),
            },
            Tool {
                name: "analyze_file",
                description: "Compute metrics for one file: line counts, functions, classes, imports, and a complexity score.",
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "file_path": {
                            "type": "string",
                            "description": "File path relative to the project root"
                        }
                    },
                    "required": ["file_path"]
                }),
            },
            Tool {
                name: "find_code_patterns",
                description: "Search code files for one or more regex patterns, grouped per pattern.",
                input_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "patterns": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Regex patterns to search for"
                        },
                        "pattern": {
                            "type": "string",
                            "description": "A single regex pattern (alternative to patterns)"
                        },
                        "scope": {
                            "type": "string",
                            "description": "File or directory (relative) to restrict to"
                        }
                    }
                }),
            },
        ]
    })
}

// ---------------------------------------------------------------------------
// MCP Server
// ---------------------------------------------------------------------------

/// Per-file cap applied by the simple `search_files` grouping.
const SEARCH_FILES_PER_FILE: usize = 5;
/// File-count cap applied by the simple `search_files` grouping.
const SEARCH_FILES_MAX_FILES: usize = 20;

struct McpServer {
    session: RwLock<Option<Session>>,
}

impl McpServer {
    fn new() -> Self {
        Self {
            session: RwLock::new(None),
        }
    }

    /// Run a closure against the active session, or report
    /// `NoActiveProject` if none has been established.
    fn with_session<F>(&self, f: F) -> CallToolResult
    where
        F: FnOnce(&Session) -> CallToolResult,
    {
        let guard = self.session.read().expect("session lock poisoned");
        match guard.as_ref() {
            Some(session) => f(session),
            None => error_result(&ScoutError::NoActiveProject),
        }
    }

    fn handle_initialize(&self, _params: &Value) -> Value {
        serde_json::to_value(InitializeResult {
            protocol_version: PROTOCOL_VERSION,
            capabilities: ServerCapabilities {
                tools: ToolsCapability {},
            },
            server_info: ServerInfo {
                name: "scout",
                version: env!("CARGO_PKG_VERSION"),
            },
        })
        .expect("serialize InitializeResult")
    }

    fn handle_tools_list(&self) -> Value {
        serde_json::json!({ "tools": tool_definitions() })
    }

    fn handle_tools_call(&self, params: &Value) -> Value {
        let call: CallToolParams = match serde_json::from_value(params.clone()) {
            Ok(p) => p,
            Err(_) => {
                return serde_json::to_value(CallToolResult::error(
                    "invalid tool call parameters".into(),
                ))
                .expect("serialize CallToolResult");
            }
        };

        let result = match call.name.as_str() {
            "explore_project" => self.tool_explore(call.arguments),
            "list_files" => self.tool_list_files(call.arguments),
            "read_file" => self.tool_read_file(call.arguments),
            "search_files" => self.tool_search_files(call.arguments),
            "search_symbol" => self.tool_search_symbol(call.arguments),
            "find_references" => self.tool_find_references(call.arguments),
            "find_definition" => self.tool_find_definition(call.arguments),
            "search_code_advanced" => self.tool_search_advanced(call.arguments),
            "analyze_imports" => self.tool_analyze_imports(call.arguments),
            "analyze_file" => self.tool_analyze_file(call.arguments),
            "find_code_patterns" => self.tool_find_patterns(call.arguments),
            _ => CallToolResult::error(format!("unknown tool: {}", call.name)),
        };

        serde_json::to_value(result).expect("serialize CallToolResult")
    }

    // -- Tool handlers -------------------------------------------------------

    fn tool_explore(&self, args: Value) -> CallToolResult {
        let path = match require_str(&args, "path") {
            Ok(p) => p,
            Err(e) => return e,
        };
        match Session::explore(Path::new(&path)) {
            Ok(new_session) => {
                let summary = new_session.summary();
                // Last write wins: the previous session is discarded whole.
                *self.session.write().expect("session lock poisoned") = Some(new_session);
                format_result(&summary)
            }
            Err(e) => error_result(&e),
        }
    }

    fn tool_list_files(&self, args: Value) -> CallToolResult {
        let directory = opt_str(&args, "directory").unwrap_or_else(|| ".".to_string());
        let recursive = opt_bool(&args, "recursive", false);
        let code_only = opt_bool(&args, "code_only", true);
        let extension = opt_str(&args, "extension");
        self.with_session(|session| {
            match session.list_files(&directory, recursive, code_only, extension.as_deref()) {
                Ok(files) => format_result(&serde_json::json!({
                    "directory": directory,
                    "count": files.len(),
                    "files": files,
                })),
                Err(e) => error_result(&e),
            }
        })
    }

    fn tool_read_file(&self, args: Value) -> CallToolResult {
        let file_path = match require_str(&args, "file_path") {
            Ok(p) => p,
            Err(e) => return e,
        };
        let start = opt_usize(&args, "start_line");
        let end = opt_usize(&args, "end_line");
        self.with_session(|session| match session.read_file(&file_path, start, end) {
            Ok(slice) => format_result(&slice),
            Err(e) => error_result(&e),
        })
    }

    fn tool_search_files(&self, args: Value) -> CallToolResult {
        let query = match require_str(&args, "query") {
            Ok(q) => q,
            Err(e) => return e,
        };
        let file_pattern = opt_str(&args, "file_pattern").unwrap_or_else(|| "*".to_string());
        let case_sensitive = opt_bool(&args, "case_sensitive", false);

        self.with_session(|session| {
            let opts = SearchOptions {
                regex: false,
                case_sensitive,
                whole_word: false,
                file_glob: Some(file_pattern.clone()),
                context_lines: 0,
                max_results: SEARCH_FILES_PER_FILE * SEARCH_FILES_MAX_FILES * 10,
            };
            let outcome = match search::search(
                session.root(),
                session.root(),
                &query,
                &opts,
                session.extra_ignores(),
            ) {
                Ok(o) => o,
                Err(e) => return error_result(&e),
            };

            // Group per file, capping matches per file and file count.
            let mut groups: Vec<Value> = Vec::new();
            let mut current: Option<(String, Vec<SearchOutput>, usize)> = None;
            let flush = |cur: &mut Option<(String, Vec<SearchOutput>, usize)>,
                             groups: &mut Vec<Value>| {
                if let Some((file, matches, total)) = cur.take()
                    && groups.len() < SEARCH_FILES_MAX_FILES
                {
                    groups.push(serde_json::json!({
                        "file": file,
                        "matches": matches,
                        "total_matches": total,
                    }));
                }
            };
            for m in outcome.matches {
                match &mut current {
                    Some((file, matches, total)) if *file == m.file => {
                        *total += 1;
                        if matches.len() < SEARCH_FILES_PER_FILE {
                            matches.push(SearchOutput::from(m));
                        }
                    }
                    _ => {
                        flush(&mut current, &mut groups);
                        current = Some((m.file.clone(), vec![SearchOutput::from(m)], 1));
                    }
                }
            }
            flush(&mut current, &mut groups);

            format_result(&serde_json::json!({
                "query": query,
                "file_pattern": file_pattern,
                "case_sensitive": case_sensitive,
                "total_files": groups.len(),
                "results": groups,
                "warnings": outcome.warnings,
            }))
        })
    }

    fn tool_search_symbol(&self, args: Value) -> CallToolResult {
        let name = match require_str(&args, "symbol_name") {
            Ok(n) => n,
            Err(e) => return e,
        };
        let kind = match opt_str(&args, "symbol_type") {
            Some(s) => match SymbolKind::parse(&s) {
                Some(k) => Some(k),
                None => {
                    return error_result(&ScoutError::InvalidQuery(format!(
                        "unknown symbol type: {s}"
                    )));
                }
            },
            None => None,
        };
        self.with_session(|session| {
            let results = session.index().lookup(&name, false, kind);
            let outputs: Vec<SymbolOutput> = results.iter().map(SymbolOutput::from).collect();
            format_result(&serde_json::json!({
                "query": name,
                "type": kind.map(|k| k.to_string()).unwrap_or_else(|| "all".to_string()),
                "count": outputs.len(),
                "results": outputs,
            }))
        })
    }

    fn tool_find_references(&self, args: Value) -> CallToolResult {
        let name = match require_str(&args, "symbol_name") {
            Ok(n) => n,
            Err(e) => return e,
        };
        let scope = opt_str(&args, "scope");
        self.with_session(|session| {
            let scope_abs = match session.resolve_scope(scope.as_deref()) {
                Ok(p) => p,
                Err(e) => return error_result(&e),
            };
            match refs::find_references(
                session.root(),
                &scope_abs,
                &name,
                session.index(),
                session.config().search.reference_cap,
                session.extra_ignores(),
            ) {
                Ok(outcome) => {
                    let outputs: Vec<ReferenceOutput> =
                        outcome.references.iter().map(ReferenceOutput::from).collect();
                    format_result(&serde_json::json!({
                        "symbol": name,
                        "count": outputs.len(),
                        "references": outputs,
                        "truncated": outcome.truncated,
                        "warnings": outcome.warnings,
                    }))
                }
                Err(e) => error_result(&e),
            }
        })
    }

    fn tool_find_definition(&self, args: Value) -> CallToolResult {
        let name = match require_str(&args, "symbol_name") {
            Ok(n) => n,
            Err(e) => return e,
        };
        self.with_session(|session| {
            let defs = session.index().find_definition(&name);
            let outputs: Vec<SymbolOutput> = defs.iter().map(SymbolOutput::from).collect();
            format_result(&serde_json::json!({
                "symbol": name,
                "found": !outputs.is_empty(),
                "count": outputs.len(),
                "definitions": outputs,
            }))
        })
    }

    fn tool_search_advanced(&self, args: Value) -> CallToolResult {
        let query = match require_str(&args, "query") {
            Ok(q) => q,
            Err(e) => return e,
        };
        let file_pattern = opt_str(&args, "file_pattern").unwrap_or_else(|| "*".to_string());
        self.with_session(|session| {
            let opts = SearchOptions {
                regex: opt_bool(&args, "regex", false),
                case_sensitive: opt_bool(&args, "case_sensitive", false),
                whole_word: opt_bool(&args, "whole_word", false),
                file_glob: Some(file_pattern.clone()),
                context_lines: opt_usize(&args, "context_lines")
                    .unwrap_or(session.config().search.context_lines),
                max_results: opt_usize(&args, "max_results")
                    .unwrap_or(session.config().search.max_results),
            };
            match search::search(
                session.root(),
                session.root(),
                &query,
                &opts,
                session.extra_ignores(),
            ) {
                Ok(outcome) => {
                    let outputs: Vec<SearchOutput> =
                        outcome.matches.into_iter().map(SearchOutput::from).collect();
                    format_result(&serde_json::json!({
                        "query": query,
                        "options": {
                            "file_pattern": file_pattern,
                            "case_sensitive": opts.case_sensitive,
                            "whole_word": opts.whole_word,
                            "regex": opts.regex,
                            "context_lines": opts.context_lines,
                        },
                        "total_matches": outputs.len(),
                        "truncated": outcome.truncated,
                        "results": outputs,
                        "warnings": outcome.warnings,
                    }))
                }
                Err(e) => error_result(&e),
            }
        })
    }

    fn tool_analyze_imports(&self, args: Value) -> CallToolResult {
        let scope = opt_str(&args, "scope");
        self.with_session(
            |session| match analyzer::analyze_imports(session, scope.as_deref()) {
                Ok((groups, warnings)) => format_result(&serde_json::json!({
                    "scope": scope.clone().unwrap_or_else(|| ".".to_string()),
                    "files": groups,
                    "warnings": warnings,
                })),
                Err(e) => error_result(&e),
            },
        )
    }

    fn tool_analyze_file(&self, args: Value) -> CallToolResult {
        let file_path = match require_str(&args, "file_path") {
            Ok(p) => p,
            Err(e) => return e,
        };
        self.with_session(
            |session| match analyzer::analyze_file(session, &file_path) {
                Ok(metrics) => format_result(&metrics),
                Err(e) => error_result(&e),
            },
        )
    }

    fn tool_find_patterns(&self, args: Value) -> CallToolResult {
        let patterns: Vec<String> = match args.get("patterns") {
            Some(v) => match serde_json::from_value(v.clone()) {
                Ok(p) => p,
                Err(_) => {
                    return error_result(&ScoutError::InvalidQuery(
                        "patterns must be an array of strings".to_string(),
                    ));
                }
            },
            None => match opt_str(&args, "pattern") {
                Some(p) => vec![p],
                None => {
                    return CallToolResult::error(
                        "missing required parameter: patterns".to_string(),
                    );
                }
            },
        };
        let scope = opt_str(&args, "scope");
        self.with_session(|session| {
            match analyzer::find_code_patterns(session, &patterns, scope.as_deref()) {
                Ok(results) => format_result(&serde_json::json!({
                    "patterns": patterns,
                    "results": results,
                })),
                Err(e) => error_result(&e),
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Serve loop
// ---------------------------------------------------------------------------

/// Run the MCP server, reading JSON-RPC from stdin and writing responses
/// to stdout. The session starts empty; every tool except
/// `explore_project` reports `NoActiveProject` until one is established.
pub fn serve() -> Result<()> {
    let server = McpServer::new();

    let stdin = io::stdin().lock();
    let mut stdout = io::stdout().lock();

    for line in stdin.lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };

        if line.trim().is_empty() {
            continue;
        }

        let msg: Value = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(_) => {
                let resp = Response::error(RequestId::Number(0), PARSE_ERROR, "parse error");
                write_response(&mut stdout, &resp)?;
                continue;
            }
        };

        // Notifications have no `id` field — handle silently.
        let id = match msg.get("id") {
            Some(id_val) => match serde_json::from_value::<RequestId>(id_val.clone()) {
                Ok(id) => id,
                Err(_) => continue,
            },
            None => continue,
        };

        let method = match msg.get("method").and_then(|v| v.as_str()) {
            Some(m) => m,
            None => {
                let resp = Response::error(id, INVALID_REQUEST, "missing method");
                write_response(&mut stdout, &resp)?;
                continue;
            }
        };

        let empty_params = Value::Object(Default::default());
        let params = msg.get("params").unwrap_or(&empty_params);

        let resp = match method {
            "initialize" => Response::success(id, server.handle_initialize(params)),
            "ping" => Response::success(id, serde_json::json!({})),
            "tools/list" => Response::success(id, server.handle_tools_list()),
            "tools/call" => Response::success(id, server.handle_tools_call(params)),
            _ => Response::error(id, METHOD_NOT_FOUND, format!("unknown method: {method}")),
        };

        write_response(&mut stdout, &resp)?;
    }

    Ok(())
}

fn write_response(stdout: &mut impl Write, resp: &Response) -> io::Result<()> {
    let json = serde_json::to_string(resp).expect("serialize Response");
    writeln!(stdout, "{json}")?;
    stdout.flush()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn server_with_project(files: &[(&str, &str)]) -> (tempfile::TempDir, McpServer) {
        let td = tempfile::tempdir().unwrap();
        for (rel, content) in files {
            let p = td.path().join(rel);
            if let Some(parent) = p.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(&p, content).unwrap();
        }
        let server = McpServer::new();
        let result = server.tool_explore(serde_json::json!({
            "path": td.path().to_string_lossy(),
        }));
        assert!(!result.is_error, "explore failed: {:?}", result.content);
        (td, server)
    }

    fn payload(result: &CallToolResult) -> Value {
        serde_json::from_str(&result.content[0].text).unwrap()
    }

    #[test]
    fn tool_definitions_count() {
        assert_eq!(tool_definitions().len(), 11);
    }

    #[test]
    fn tool_definitions_have_valid_schemas() {
        for tool in tool_definitions() {
            assert!(
                tool.input_schema.get("type").is_some(),
                "tool {} missing schema type",
                tool.name
            );
        }
    }

    #[test]
    fn queries_before_explore_report_no_active_project() {
        let server = McpServer::new();
        for (tool, args) in [
            ("list_files", serde_json::json!({})),
            ("search_symbol", serde_json::json!({"symbol_name": "x"})),
            ("find_references", serde_json::json!({"symbol_name": "x"})),
            ("find_definition", serde_json::json!({"symbol_name": "x"})),
            ("analyze_file", serde_json::json!({"file_path": "a.py"})),
        ] {
            let result = server.handle_tools_call(&serde_json::json!({
                "name": tool,
                "arguments": args,
            }));
            assert_eq!(result["isError"], true, "{tool} should fail");
            let text = result["content"][0]["text"].as_str().unwrap();
            assert!(
                text.starts_with("NoActiveProject"),
                "{tool} should name the taxonomy, got: {text}"
            );
        }
    }

    #[test]
    fn explore_then_symbol_scenario() {
        // The canonical two-file scenario: a declaration in one file, a
        // call in another.
        let (_td, server) = server_with_project(&[
            ("a.py", "def foo(): pass\n"),
            ("b.py", "foo()\n"),
        ]);

        let sym = payload(&server.tool_search_symbol(serde_json::json!({
            "symbol_name": "foo",
        })));
        assert_eq!(sym["count"], 1);
        assert_eq!(sym["results"][0]["file"], "a.py");
        assert_eq!(sym["results"][0]["line"], 1);

        let refs = payload(&server.tool_find_references(serde_json::json!({
            "symbol_name": "foo",
        })));
        assert_eq!(refs["count"], 2);
        let classes: Vec<&str> = refs["references"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["type"].as_str().unwrap())
            .collect();
        assert!(classes.contains(&"declaration"));
        assert!(classes.contains(&"reference"));
    }

    #[test]
    fn find_definition_reports_all_sites() {
        let (_td, server) = server_with_project(&[
            ("a.py", "def shared(): pass\n"),
            ("b.py", "def shared(): pass\n"),
        ]);
        let defs = payload(&server.tool_find_definition(serde_json::json!({
            "symbol_name": "shared",
        })));
        assert_eq!(defs["found"], true);
        assert_eq!(defs["count"], 2);
    }

    #[test]
    fn find_definition_missing_symbol_is_not_found() {
        let (_td, server) = server_with_project(&[("a.py", "x = 1\n")]);
        let defs = payload(&server.tool_find_definition(serde_json::json!({
            "symbol_name": "ghost",
        })));
        assert_eq!(defs["found"], false);
        assert_eq!(defs["count"], 0);
    }

    #[test]
    fn search_advanced_invalid_regex_is_invalid_query() {
        let (_td, server) = server_with_project(&[("a.py", "x = 1\n")]);
        let result = server.tool_search_advanced(serde_json::json!({
            "query": "(unclosed",
            "regex": true,
        }));
        assert!(result.is_error);
        assert!(result.content[0].text.starts_with("InvalidQuery"));
    }

    #[test]
    fn search_advanced_respects_max_results() {
        let mut content = String::new();
        for i in 0..30 {
            content.push_str(&format!("needle_{i} = {i}\n"));
        }
        let (_td, server) = server_with_project(&[("a.py", &content)]);
        let out = payload(&server.tool_search_advanced(serde_json::json!({
            "query": "needle",
            "max_results": 5,
        })));
        assert_eq!(out["total_matches"], 5);
        assert_eq!(out["truncated"], true);
    }

    #[test]
    fn search_files_groups_per_file() {
        let (_td, server) = server_with_project(&[
            ("a.py", "hit\nhit\nhit\nhit\nhit\nhit\nhit\n"),
            ("b.py", "hit\n"),
        ]);
        let out = payload(&server.tool_search_files(serde_json::json!({
            "query": "hit",
        })));
        assert_eq!(out["total_files"], 2);
        let first = &out["results"][0];
        assert_eq!(first["file"], "a.py");
        assert_eq!(first["total_matches"], 7);
        assert_eq!(first["matches"].as_array().unwrap().len(), 5);
    }

    #[test]
    fn read_file_slices_lines() {
        let (_td, server) =
            server_with_project(&[("f.txt", "one\ntwo\nthree\n")]);
        let out = payload(&server.tool_read_file(serde_json::json!({
            "file_path": "f.txt",
            "start_line": 2,
            "end_line": 2,
        })));
        assert_eq!(out["content"], "two\n");
        assert_eq!(out["line_range"], "2-2");
        assert_eq!(out["total_lines"], 3);
    }

    #[test]
    fn read_file_outside_project_is_refused() {
        let (_td, server) = server_with_project(&[("a.py", "x = 1\n")]);
        let result = server.tool_read_file(serde_json::json!({
            "file_path": "/etc/passwd",
        }));
        assert!(result.is_error);
        assert!(result.content[0].text.starts_with("PathOutsideProject"));
    }

    #[test]
    fn analyze_file_round_trip() {
        let (_td, server) = server_with_project(&[(
            "m.py",
            "import os\n\ndef f():\n    if os.name:\n        pass\n",
        )]);
        let out = payload(&server.tool_analyze_file(serde_json::json!({
            "file_path": "m.py",
        })));
        assert_eq!(out["lines_total"], 5);
        assert_eq!(out["functions"][0]["name"], "f");
        assert_eq!(out["functions"][0]["complexity"], 2);
    }

    #[test]
    fn find_patterns_accepts_single_pattern() {
        let (_td, server) = server_with_project(&[("m.py", "def alpha(): pass\n")]);
        let out = payload(&server.tool_find_patterns(serde_json::json!({
            "pattern": r"def \w+",
        })));
        assert_eq!(out["results"][0]["matches"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn re_explore_replaces_session_wholesale() {
        let (_td, server) = server_with_project(&[("a.py", "def first(): pass\n")]);

        let td2 = tempfile::tempdir().unwrap();
        fs::write(td2.path().join("b.py"), "def second(): pass\n").unwrap();
        let result = server.tool_explore(serde_json::json!({
            "path": td2.path().to_string_lossy(),
        }));
        assert!(!result.is_error);

        let old = payload(&server.tool_find_definition(serde_json::json!({
            "symbol_name": "first",
        })));
        assert_eq!(old["found"], false, "previous project is fully discarded");

        let new = payload(&server.tool_find_definition(serde_json::json!({
            "symbol_name": "second",
        })));
        assert_eq!(new["found"], true);
    }

    #[test]
    fn parse_request_with_number_id() {
        let json = r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#;
        let v: Value = serde_json::from_str(json).unwrap();
        let id: RequestId = serde_json::from_value(v["id"].clone()).unwrap();
        assert!(matches!(id, RequestId::Number(1)));
    }

    #[test]
    fn parse_request_with_string_id() {
        let json = r#"{"jsonrpc":"2.0","id":"abc","method":"ping"}"#;
        let v: Value = serde_json::from_str(json).unwrap();
        let id: RequestId = serde_json::from_value(v["id"].clone()).unwrap();
        assert!(matches!(id, RequestId::Str(ref s) if s == "abc"));
    }

    #[test]
    fn initialize_response_has_correct_version() {
        let server = McpServer::new();
        let result = server.handle_initialize(&Value::Object(Default::default()));
        assert_eq!(
            result["protocolVersion"].as_str().unwrap(),
            PROTOCOL_VERSION
        );
        assert_eq!(result["serverInfo"]["name"].as_str().unwrap(), "scout");
    }

    #[test]
    fn unknown_tool_returns_error() {
        let server = McpServer::new();
        let params = serde_json::json!({"name": "nonexistent", "arguments": {}});
        let result = server.handle_tools_call(&params);
        assert!(result["isError"].as_bool().unwrap_or(false));
    }

    #[test]
    fn response_serialization_success() {
        let resp = Response::success(RequestId::Number(1), serde_json::json!({"ok": true}));
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"result\""));
        assert!(!json.contains("\"error\""));
    }

    #[test]
    fn response_serialization_error() {
        let resp = Response::error(RequestId::Number(1), METHOD_NOT_FOUND, "not found");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("\"error\""));
        assert!(!json.contains("\"result\""));
    }

    #[test]
    fn require_str_returns_error_when_missing() {
        let args = serde_json::json!({});
        let err = require_str(&args, "name").unwrap_err();
        assert!(err.is_error);
        assert!(err.content[0].text.contains("missing"));
    }
}
