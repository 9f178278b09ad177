//! Black-box tests of the `weave-mcp` binary.

use std::path::Path;
use std::process::{Command, Output};

const BIN: &str = env!("CARGO_BIN_EXE_weave-mcp");

fn run_cli(home: &Path, args: &[&str]) -> Output {
    Command::new(BIN)
        .args(args)
        .current_dir(home)
        .env("WEAVE_HOME", home)
        .env_remove("WEAVE_MCP_CONFIG")
        .env_remove("RUST_LOG")
        .env_remove("WEAVE_MCP_INIT_TIMEOUT_MS")
        .output()
        .expect("failed to run weave-mcp")
}

fn write(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path.display().to_string()
}

#[test]
fn servers_lists_both_sources() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "mcp_config.yaml",
        "mcp_servers:\n  search:\n    command: uvx\n    args: [search-server]\n    enabled: false\n",
    );
    let primary = write(
        dir.path(),
        "agent.json",
        r#"{"mcp_servers": {"files": {"command": "npx", "description": "Local files"}}}"#,
    );

    let output = run_cli(dir.path(), &["servers", "--config", &primary]);
    assert!(output.status.success(), "{output:?}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Found 2 tool server(s)"));
    assert!(stdout.contains("files"));
    assert!(stdout.contains("Local files"));
    assert!(stdout.contains("uvx search-server"));
}

#[test]
fn empty_configuration_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_cli(dir.path(), &["servers"]);
    assert!(output.status.success(), "{output:?}");
    assert!(String::from_utf8_lossy(&output.stdout).contains("No tool servers configured"));
}

#[test]
fn unknown_server_exits_with_usage_code() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_cli(dir.path(), &["call", "ghost", "anything"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("ghost"));
}

#[test]
fn unspawnable_server_exits_with_process_code() {
    let dir = tempfile::tempdir().unwrap();
    let servers = write(
        dir.path(),
        "servers.yaml",
        "mcp_servers:\n  broken:\n    command: /nonexistent/weave-tool-server\n",
    );

    let output = run_cli(dir.path(), &["tools", "broken", "--servers-file", &servers]);
    assert_eq!(output.status.code(), Some(71));
}

#[test]
fn invalid_configuration_exits_with_config_code() {
    let dir = tempfile::tempdir().unwrap();
    let servers = write(dir.path(), "servers.yaml", "mcp_servers: [unclosed\n");

    let output = run_cli(dir.path(), &["servers", "--servers-file", &servers]);
    assert_eq!(output.status.code(), Some(78));
}

#[test]
fn non_object_arguments_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "mcp_config.yaml",
        "mcp_servers:\n  files:\n    command: /nonexistent/weave-tool-server\n",
    );

    let output = run_cli(dir.path(), &["call", "files", "read", "--args", "[1]"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn env_file_overrides_are_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let env_file = write(dir.path(), "custom.env", "WEAVE_MCP_INIT_TIMEOUT_MS=soon\n");

    // The bad value comes from the file, so settings parsing fails.
    let output = run_cli(dir.path(), &["servers", "--env-file", &env_file]);
    assert_eq!(output.status.code(), Some(78));
}
