#![allow(dead_code)]

use httpmock::MockServer;
use repo_directory::{http, Config};

pub fn config_for(server: &MockServer, token: Option<&str>) -> Config {
    Config::new(server.base_url(), token.map(str::to_string)).expect("mock server url is valid")
}

pub fn client_for(cfg: &Config) -> reqwest::Client {
    http::build_client(cfg).expect("client builds")
}

pub fn repo_json(owner: &str, name: &str) -> serde_json::Value {
    serde_json::json!({
        "name": name,
        "full_name": format!("{}/{}", owner, name),
        "url": format!("https://api.github.com/repos/{}/{}", owner, name),
        "html_url": format!("https://github.com/{}/{}", owner, name),
        "clone_url": format!("https://github.com/{}/{}.git", owner, name),
        "ssh_url": format!("git@github.com:{}/{}.git", owner, name),
        "description": null,
        "language": "Rust",
        "private": false,
        "fork": false,
        "stargazers_count": 3,
        "forks_count": 1,
        "created_at": "2024-01-01T00:00:00Z",
        "updated_at": "2025-01-01T00:00:00Z"
    })
}

/// `count` repositories named `repo-<offset>` .. `repo-<offset+count-1>`.
pub fn repo_page(owner: &str, offset: usize, count: usize) -> serde_json::Value {
    serde_json::Value::Array(
        (offset..offset + count)
            .map(|i| repo_json(owner, &format!("repo-{}", i)))
            .collect(),
    )
}
