//! Loading servers from the primary object and the secondary YAML file.

use serde_json::{Map, json};
use weave_mcp::{
    DescriptorSource, InlineSource, McpError, McpService, McpSettings, ToolCallOutcome,
    YamlFileSource,
};

const ECHO_SERVER: &str = env!("CARGO_BIN_EXE_weave-echo-server");

fn write_secondary(dir: &tempfile::TempDir, body: &str) -> std::path::PathBuf {
    let path = dir.path().join("mcp_config.yaml");
    std::fs::write(&path, body).unwrap();
    path
}

#[tokio::test]
async fn primary_source_wins_on_name_collision() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_secondary(
        &dir,
        &format!(
            "mcp_servers:\n  shared:\n    command: {ECHO_SERVER}\n    env:\n      ORIGIN: secondary\n  extra:\n    command: {ECHO_SERVER}\n    description: only in the file\n"
        ),
    );

    let primary = InlineSource::from_value(
        "agent",
        json!({
            "name": "demo-agent",
            "mcp_servers": {
                "shared": {"command": ECHO_SERVER, "env": {"ORIGIN": "primary"}}
            }
        }),
    )
    .unwrap();
    let secondary = YamlFileSource::new(&path);

    let service = McpService::from_sources(&[&primary, &secondary], McpSettings::default())
        .await
        .unwrap();

    let servers = service.list_servers();
    let names: Vec<_> = servers.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, ["extra", "shared"]);
    assert_eq!(servers[0].description, "only in the file");
    assert_eq!(
        service.manager().registry().source_of("shared"),
        Some(primary.label())
    );

    let mut args = Map::new();
    args.insert("name".to_string(), json!("ORIGIN"));
    let outcome = service.call_tool("shared", "env", args).await.unwrap();
    match outcome {
        ToolCallOutcome::Success(value) => assert_eq!(value["content"][0]["text"], "primary"),
        ToolCallOutcome::RemoteError(err) => panic!("unexpected remote error: {err}"),
    }

    service.shutdown().await;
}

#[tokio::test]
async fn disabled_entry_from_file_is_never_started() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_secondary(
        &dir,
        &format!("mcp_servers:\n  off:\n    command: {ECHO_SERVER}\n    enabled: false\n"),
    );

    let service = McpService::from_sources(&[&YamlFileSource::new(&path)], McpSettings::default())
        .await
        .unwrap();

    assert!(matches!(service.get_tools("off").await, Err(McpError::Disabled(_))));
    assert!(matches!(
        service.call_tool("off", "echo", Map::new()).await,
        Err(McpError::Disabled(_))
    ));
    assert!(service.manager().running().is_empty());
}

#[tokio::test]
async fn broken_secondary_file_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_secondary(&dir, "mcp_servers:\n  bad: [\n");

    let result = McpService::from_sources(&[&YamlFileSource::new(&path)], McpSettings::default()).await;
    assert!(matches!(result, Err(McpError::Config { .. })));
}
