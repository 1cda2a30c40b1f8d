use crate::error::DirectoryError;
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

pub fn tool_descriptors() -> Vec<ToolDescriptor> {
    let list_repositories = ToolDescriptor {
        name: "list_repositories".into(),
        description: "List all repositories of an owner, most recently updated first".into(),
        input_schema: serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "owner": {"type": "string"}
            }
        }),
    };

    let repository_exists = ToolDescriptor {
        name: "repository_exists".into(),
        description: "Check whether a repository exists".into(),
        input_schema: serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "owner": {"type": "string"},
                "repo": {"type": "string"}
            },
            "required": ["repo"]
        }),
    };

    let rename_repository = ToolDescriptor {
        name: "rename_repository".into(),
        description: "Rename a repository (requires the change code)".into(),
        input_schema: serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "owner": {"type": "string"},
                "old_name": {"type": "string"},
                "new_name": {"type": "string"},
                "change_code": {"type": "string"}
            },
            "required": ["old_name", "new_name", "change_code"]
        }),
    };

    let path_props = serde_json::json!({
        "owner": {"type": "string"},
        "repo": {"type": "string"},
        "path": {"type": "string"},
        "branch": {"type": "string"}
    });

    let get_content = ToolDescriptor {
        name: "get_content".into(),
        description: "Get a file (decoded) or a directory listing".into(),
        input_schema: serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "properties": path_props.clone(),
            "required": ["repo"]
        }),
    };

    let get_file_text = ToolDescriptor {
        name: "get_file_text".into(),
        description: "Get the text of a file".into(),
        input_schema: serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "properties": path_props.clone(),
            "required": ["repo"]
        }),
    };

    let probe_path = ToolDescriptor {
        name: "probe_path".into(),
        description: "Check whether a file or directory exists".into(),
        input_schema: serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "properties": path_props,
            "required": ["repo"]
        }),
    };

    let get_readme = ToolDescriptor {
        name: "get_readme".into(),
        description: "Get README.md with image references normalized for rendering".into(),
        input_schema: serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "owner": {"type": "string"},
                "repo": {"type": "string"},
                "branch": {"type": "string"}
            },
            "required": ["repo"]
        }),
    };

    let normalize = ToolDescriptor {
        name: "normalize_image_references".into(),
        description: "Rewrite blob image URLs to raw URLs and separate images from text".into(),
        input_schema: serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "markdown": {"type": "string"},
                "default_branch": {"type": "string"}
            },
            "required": ["markdown"]
        }),
    };

    vec![
        list_repositories,
        repository_exists,
        rename_repository,
        get_content,
        get_file_text,
        probe_path,
        get_readme,
        normalize,
    ]
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ErrorShape {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorShape {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            status: None,
        }
    }
}

impl From<DirectoryError> for ErrorShape {
    fn from(e: DirectoryError) -> Self {
        Self {
            code: e.code().to_string(),
            message: e.to_string(),
            status: e.status(),
        }
    }
}

/// Structured result of every tool: exactly one of `item` and `error` is present.
#[derive(Debug, Serialize)]
pub struct ToolOutput<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorShape>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ListRepositoriesInput {
    pub owner: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoryExistsInput {
    pub owner: Option<String>,
    pub repo: String,
}

#[derive(Debug, Serialize)]
pub struct RepositoryExistsItem {
    pub owner: String,
    pub repo: String,
    pub exists: bool,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenameRepositoryInput {
    pub owner: Option<String>,
    pub old_name: String,
    pub new_name: String,
    pub change_code: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathInput {
    pub owner: Option<String>,
    pub repo: String,
    pub path: Option<String>,
    pub branch: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReadmeInput {
    pub owner: Option<String>,
    pub repo: String,
    pub branch: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NormalizeInput {
    pub markdown: String,
    pub default_branch: Option<String>,
}
