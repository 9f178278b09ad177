//! Reference stdio tool server.
//!
//! Speaks newline-delimited JSON-RPC 2.0 on stdin/stdout and exposes a few
//! trivial tools. Used by demos and by the integration tests.
//!
//! Flags:
//! - `--silent-init` never answers `initialize`
//! - `--reject-init` answers `initialize` with an error
//! - `--noise` writes junk and stray responses before every reply

use serde_json::{Value, json};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdout};

const SERVER_NAME: &str = "weave-echo-server";

#[derive(Debug, Default, Clone, Copy)]
struct Flags {
    silent_init: bool,
    reject_init: bool,
    noise: bool,
}

impl Flags {
    fn from_args() -> Result<Self, String> {
        let mut flags = Self::default();
        for arg in std::env::args().skip(1) {
            match arg.as_str() {
                "--silent-init" => flags.silent_init = true,
                "--reject-init" => flags.reject_init = true,
                "--noise" => flags.noise = true,
                other => return Err(format!("unknown flag: {other}")),
            }
        }
        Ok(flags)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let flags = match Flags::from_args() {
        Ok(flags) => flags,
        Err(e) => {
            eprintln!("{SERVER_NAME}: {e}");
            std::process::exit(2);
        }
    };
    eprintln!("{SERVER_NAME}: ready (pid {})", std::process::id());

    let mut out = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                eprintln!("{SERVER_NAME}: stdin error: {e}");
                break;
            }
        };
        let Ok(request) = serde_json::from_str::<Value>(&line) else {
            eprintln!("{SERVER_NAME}: ignoring non-JSON input");
            continue;
        };
        // Notifications get no answer.
        let Some(id) = request.get("id").cloned() else {
            continue;
        };
        let method = request.get("method").and_then(Value::as_str).unwrap_or_default();
        let params = request.get("params").cloned().unwrap_or(Value::Null);

        let reply = match method {
            "initialize" if flags.silent_init => continue,
            "initialize" if flags.reject_init => error(&id, -32600, "initialize rejected"),
            "initialize" => success(&id, initialize_result(&params)),
            "tools/list" => success(&id, json!({ "tools": tool_schemas() })),
            "tools/call" => call_tool(&id, &params).await,
            other => error(&id, -32601, &format!("method not found: {other}")),
        };

        if flags.noise {
            write_noise(&mut out, &id).await;
        }
        write_line(&mut out, &reply).await;
    }
}

fn initialize_result(params: &Value) -> Value {
    let version = params
        .get("protocolVersion")
        .and_then(Value::as_str)
        .unwrap_or("2024-11-05");
    json!({
        "protocolVersion": version,
        "capabilities": { "tools": {} },
        "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") }
    })
}

fn tool_schemas() -> Value {
    json!([
        {
            "name": "echo",
            "description": "Return the given text",
            "inputSchema": {
                "type": "object",
                "properties": { "text": { "type": "string", "description": "Text to echo" } },
                "required": ["text"]
            }
        },
        {
            "name": "add",
            "description": "Add two numbers",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "a": { "type": "number" },
                    "b": { "type": "integer" }
                },
                "required": ["a", "b"]
            }
        },
        {
            "name": "env",
            "description": "Read an environment variable of the server process",
            "inputSchema": {
                "type": "object",
                "properties": { "name": { "type": "string" } },
                "required": ["name"]
            }
        },
        {
            "name": "fail",
            "description": "Always answer with an error",
            "inputSchema": { "type": "object", "properties": {} }
        },
        {
            "name": "sleep",
            "description": "Wait before answering",
            "inputSchema": {
                "type": "object",
                "properties": { "ms": { "type": "integer" } },
                "required": ["ms"]
            }
        },
        {
            "name": "crash",
            "description": "Exit without answering",
            "inputSchema": {
                "type": "object",
                "properties": { "code": { "type": "integer" } }
            }
        }
    ])
}

async fn call_tool(id: &Value, params: &Value) -> Value {
    let name = params.get("name").and_then(Value::as_str).unwrap_or_default();
    let args = params.get("arguments").cloned().unwrap_or_else(|| json!({}));

    match name {
        "echo" => text(id, args.get("text").and_then(Value::as_str).unwrap_or_default()),
        "add" => {
            let a = args.get("a").and_then(Value::as_f64).unwrap_or_default();
            let b = args.get("b").and_then(Value::as_f64).unwrap_or_default();
            text(id, &(a + b).to_string())
        }
        "env" => {
            let key = args.get("name").and_then(Value::as_str).unwrap_or_default();
            text(id, &std::env::var(key).unwrap_or_default())
        }
        "fail" => error(id, 7, "bad"),
        "sleep" => {
            let ms = args.get("ms").and_then(Value::as_u64).unwrap_or_default();
            tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
            text(id, "slept")
        }
        "crash" => {
            let code = args
                .get("code")
                .and_then(Value::as_i64)
                .and_then(|code| i32::try_from(code).ok())
                .unwrap_or(3);
            eprintln!("{SERVER_NAME}: crashing with code {code}");
            std::process::exit(code);
        }
        other => error(id, -32602, &format!("unknown tool: {other}")),
    }
}

fn text(id: &Value, text: &str) -> Value {
    success(id, json!({ "content": [{ "type": "text", "text": text }] }))
}

fn success(id: &Value, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn error(id: &Value, code: i64, message: &str) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
}

async fn write_noise(out: &mut Stdout, id: &Value) {
    let stray_id = id.as_u64().map_or(0, |id| id + 10_000);
    write_raw(out, "echo server log line, not JSON").await;
    write_line(out, &json!({ "jsonrpc": "2.0", "method": "notifications/message", "params": { "level": "info" } })).await;
    write_line(out, &json!({ "jsonrpc": "2.0", "id": stray_id, "result": { "stray": true } })).await;
}

async fn write_line(out: &mut Stdout, message: &Value) {
    write_raw(out, &message.to_string()).await;
}

async fn write_raw(out: &mut Stdout, line: &str) {
    let mut bytes = line.as_bytes().to_vec();
    bytes.push(b'\n');
    if out.write_all(&bytes).await.is_err() || out.flush().await.is_err() {
        std::process::exit(1);
    }
}
