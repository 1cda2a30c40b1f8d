use assert_cmd::Command;
use httpmock::{
    Method::{GET, PATCH},
    MockServer,
};
use std::io::Write;

fn run_with_env(req: &serde_json::Value, envs: &[(&str, &str)]) -> anyhow::Result<serde_json::Value> {
    let mut cmd = Command::cargo_bin("repo-directory")?;
    for key in [
        "GITHUB_TOKEN",
        "GH_TOKEN",
        "REPO_DIRECTORY_OWNER",
        "REPO_DIRECTORY_CHANGE_CODE",
        "REPO_DIRECTORY_DEFAULT_BRANCH",
    ] {
        cmd.env_remove(key);
    }
    for (k, v) in envs {
        cmd.env(k, v);
    }
    let input = serde_json::to_string(req)?;
    let assert = cmd
        .arg("--log-level")
        .arg("warn")
        .write_stdin({
            let mut b = Vec::new();
            writeln!(b, "{}", input).unwrap();
            b
        })
        .assert();
    let output = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    Ok(serde_json::from_str(output.trim())?)
}

fn call(name: &str, arguments: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc":"2.0","method":"tools/call","id":1,
        "params":{"name": name, "arguments": arguments}
    })
}

#[test]
fn envelope_success_and_error() -> anyhow::Result<()> {
    let server = MockServer::start();
    let _ok = server.mock(|when, then| {
        when.method(GET).path("/users/acme/repos");
        then.status(200).json_body(serde_json::json!([{
            "name":"widgets","url":"u","html_url":"h","clone_url":"c","ssh_url":"s",
            "description":null,"language":null,"private":false,"fork":false,
            "stargazers_count":0,"forks_count":0,"updated_at":"2025-01-01T00:00:00Z"
        }]));
    });
    let _missing = server.mock(|when, then| {
        when.method(GET).path("/repos/acme/widgets/contents/README.md");
        then.status(404).json_body(serde_json::json!({"message":"Not Found"}));
    });
    let base = server.base_url();
    let envs = [
        ("GITHUB_TOKEN", "t"),
        ("GITHUB_API_URL", base.as_str()),
        ("REPO_DIRECTORY_OWNER", "acme"),
    ];

    let ok = run_with_env(&call("list_repositories", serde_json::json!({})), &envs)?;
    let result = &ok["result"];
    assert!(result["content"][0]["text"].is_string());
    assert_eq!(result["structuredContent"]["item"][0]["name"], "widgets");
    assert!(result.get("isError").is_none());

    let err = run_with_env(
        &call("get_file_text", serde_json::json!({"repo":"widgets"})),
        &envs,
    )?;
    let result = &err["result"];
    assert_eq!(result["isError"], true);
    assert_eq!(result["structuredContent"]["error"]["code"], "not_found");
    assert_eq!(result["structuredContent"]["error"]["status"], 404);
    Ok(())
}

#[test]
fn rename_requires_change_code() -> anyhow::Result<()> {
    let server = MockServer::start();
    let patch = server.mock(|when, then| {
        when.method(PATCH).path("/repos/acme/old");
        then.status(200).json_body(serde_json::json!({"full_name":"acme/new"}));
    });
    let base = server.base_url();
    let args = serde_json::json!({"owner":"acme","old_name":"old","new_name":"new","change_code":"guess"});

    let disabled = run_with_env(
        &call("rename_repository", args.clone()),
        &[("GITHUB_TOKEN", "t"), ("GITHUB_API_URL", base.as_str())],
    )?;
    assert_eq!(
        disabled["result"]["structuredContent"]["error"]["code"],
        "rename_disabled"
    );

    let wrong = run_with_env(
        &call("rename_repository", args),
        &[
            ("GITHUB_TOKEN", "t"),
            ("GITHUB_API_URL", base.as_str()),
            ("REPO_DIRECTORY_CHANGE_CODE", "secret"),
        ],
    )?;
    assert_eq!(wrong["result"]["isError"], true);
    assert_eq!(
        wrong["result"]["structuredContent"]["error"]["message"],
        "Incorrect change name code"
    );
    patch.assert_hits(0);
    Ok(())
}

#[test]
fn rename_with_code_runs_precondition_checks() -> anyhow::Result<()> {
    let server = MockServer::start();
    let _old = server.mock(|when, then| {
        when.method(GET).path("/repos/acme/old");
        then.status(200).json_body(serde_json::json!({"name":"old"}));
    });
    let _new = server.mock(|when, then| {
        when.method(GET).path("/repos/acme/new");
        then.status(404);
    });
    let patch = server.mock(|when, then| {
        when.method(PATCH).path("/repos/acme/old");
        then.status(200).json_body(serde_json::json!({
            "full_name":"acme/new","html_url":"https://github.com/acme/new",
            "clone_url":"c","ssh_url":"s","private":false,"description":null,
            "created_at":"2024-01-01T00:00:00Z","updated_at":"2025-01-01T00:00:00Z"
        }));
    });
    let base = server.base_url();
    let out = run_with_env(
        &call(
            "rename_repository",
            serde_json::json!({"old_name":"old","new_name":"new","change_code":"secret"}),
        ),
        &[
            ("GITHUB_TOKEN", "t"),
            ("GITHUB_API_URL", base.as_str()),
            ("REPO_DIRECTORY_OWNER", "acme"),
            ("REPO_DIRECTORY_CHANGE_CODE", "secret"),
        ],
    )?;
    let result = &out["result"];
    assert!(result.get("isError").is_none());
    assert_eq!(result["structuredContent"]["item"]["full_name"], "acme/new");
    assert_eq!(
        result["content"][0]["text"],
        "Repository 'old' successfully renamed to 'new'"
    );
    patch.assert_hits(1);
    Ok(())
}

#[test]
fn repo_scoped_tools_need_an_owner() -> anyhow::Result<()> {
    let out = run_with_env(
        &call("probe_path", serde_json::json!({"repo":"widgets"})),
        &[("GITHUB_API_URL", "http://127.0.0.1:9")],
    )?;
    assert_eq!(out["error"]["code"], -32602);
    Ok(())
}
