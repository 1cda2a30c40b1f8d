use assert_cmd::Command;
use std::io::Write;

fn run(req: &serde_json::Value) -> anyhow::Result<String> {
    let mut cmd = Command::cargo_bin("repo-directory")?;
    let input = serde_json::to_string(req)?;
    let assert = cmd
        .arg("--log-level")
        .arg("warn")
        .env_remove("GITHUB_API_URL")
        .write_stdin({
            let mut b = Vec::new();
            writeln!(b, "{}", input).unwrap();
            b
        })
        .assert()
        .success();
    let output = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    Ok(output)
}

#[test]
fn initialize_and_tools_list() -> anyhow::Result<()> {
    let init_req = serde_json::json!({
        "jsonrpc": "2.0",
        "method": "initialize",
        "id": 1
    });
    let out = run(&init_req)?;
    assert!(out.contains("\"protocolVersion\""));

    let list_req = serde_json::json!({
        "jsonrpc": "2.0",
        "method": "tools/list",
        "id": 2
    });
    let out = run(&list_req)?;
    let v: serde_json::Value = serde_json::from_str(&out)?;
    let names: Vec<&str> = v["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    for expected in [
        "list_repositories",
        "repository_exists",
        "rename_repository",
        "get_content",
        "get_file_text",
        "probe_path",
        "get_readme",
        "normalize_image_references",
    ] {
        assert!(names.contains(&expected), "missing tool {}", expected);
    }
    Ok(())
}

#[test]
fn version_flag() {
    Command::cargo_bin("repo-directory")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicates::str::starts_with("repo-directory "));
}
