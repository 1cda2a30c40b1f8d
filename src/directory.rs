//! Repository directory operations over the host's REST API.
//!
//! Every function is one self-contained exchange (rename: two probes and one write) driven by
//! the credential and endpoint in [`Config`]. Nothing is cached and nothing is retried.
//!
//! The rename precondition checks are check-then-act: another client can take the new name
//! between the probe and the PATCH. The host has no conditional rename, so its own uniqueness
//! check (reported as 422 and mapped to [`DirectoryError::InvalidName`]) is the final word and
//! the probe is only an early, friendlier rejection.

use crate::config::Config;
use crate::error::DirectoryError;
use crate::http::{self, encode_path_segment, encode_repo_path, map_status_to_error, RestResponse};
use crate::markdown::normalize_image_references;
use crate::types::{
    ContentEntry, DirectoryEntry, EntryKind, ExistenceCheck, ExistenceKind, FileContent,
    RenameOutcome, RepositorySummary,
};
use base64::Engine;
use log::{debug, info, warn};
use reqwest::{Client, Method, StatusCode};
use serde::Deserialize;
use std::collections::HashSet;

/// Largest page the listing endpoint serves.
pub const PAGE_SIZE: usize = 100;
pub const README_PATH: &str = "README.md";

const LIST_CONTEXT: &str = "Failed to fetch repositories";
const RENAME_CONTEXT: &str = "Failed to rename repository";
const CONTENT_CONTEXT: &str = "Failed to get file content";
const PROBE_CONTEXT: &str = "Failed to check file existence";

#[derive(Deserialize)]
struct RepoWire {
    name: String,
    url: String,
    html_url: String,
    clone_url: String,
    ssh_url: String,
    description: Option<String>,
    language: Option<String>,
    #[serde(default)]
    private: bool,
    #[serde(default)]
    fork: bool,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    #[serde(default)]
    updated_at: Option<String>,
}

impl From<RepoWire> for RepositorySummary {
    fn from(r: RepoWire) -> Self {
        RepositorySummary {
            name: r.name,
            api_url: r.url,
            html_url: r.html_url,
            clone_url: r.clone_url,
            ssh_url: r.ssh_url,
            description: r.description,
            language: r.language,
            private: r.private,
            fork: r.fork,
            stars: r.stargazers_count,
            forks: r.forks_count,
            updated_at: r.updated_at.unwrap_or_default(),
        }
    }
}

#[derive(Deserialize)]
struct RenamedWire {
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    html_url: String,
    #[serde(default)]
    clone_url: String,
    #[serde(default)]
    ssh_url: String,
    #[serde(default)]
    private: bool,
    description: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

// One object of the contents endpoint; files, directory children and probe results share it.
#[derive(Deserialize, Default)]
#[serde(default)]
struct ContentWire {
    #[serde(rename = "type")]
    kind: Option<String>,
    name: String,
    path: String,
    size: u64,
    sha: String,
    content: Option<String>,
    encoding: Option<String>,
    url: Option<String>,
    html_url: Option<String>,
    download_url: Option<String>,
}

impl ContentWire {
    fn entry_kind(&self) -> EntryKind {
        match self.kind.as_deref() {
            Some("file") => EntryKind::File,
            Some("dir") => EntryKind::Dir,
            Some("symlink") => EntryKind::Symlink,
            Some("submodule") => EntryKind::Submodule,
            _ => EntryKind::Other,
        }
    }

    fn into_directory_entry(self) -> DirectoryEntry {
        DirectoryEntry {
            kind: self.entry_kind(),
            name: self.name,
            path: self.path,
            size: self.size,
            sha: self.sha,
            api_url: self.url,
            html_url: self.html_url,
            download_url: self.download_url,
        }
    }

    fn into_file(self) -> FileContent {
        let raw = self.content.unwrap_or_default();
        let (content, decoded) = decode_content(&raw, self.encoding.as_deref());
        FileContent {
            name: self.name,
            path: self.path,
            content,
            decoded,
            size: self.size,
            sha: self.sha,
            api_url: self.url,
            html_url: self.html_url,
            download_url: self.download_url,
            encoding: self.encoding,
        }
    }
}

/// Decode a contents-endpoint body. Only base64 is understood; any other encoding, or a base64
/// body that does not decode to UTF-8, is returned verbatim with `false`.
pub fn decode_content(raw: &str, encoding: Option<&str>) -> (String, bool) {
    if encoding != Some("base64") {
        return (raw.to_string(), false);
    }
    // The host wraps base64 bodies at 60 columns.
    let compact: String = raw.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = match base64::engine::general_purpose::STANDARD.decode(compact.as_bytes()) {
        Ok(b) => b,
        Err(e) => {
            warn!("base64 content did not decode, keeping encoded body: {}", e);
            return (raw.to_string(), false);
        }
    };
    match String::from_utf8(bytes) {
        Ok(text) => (text, true),
        Err(_) => {
            warn!("decoded content is not UTF-8 text, keeping encoded body");
            (raw.to_string(), false)
        }
    }
}

fn contents_path(owner: &str, repo: &str, path: &str) -> String {
    let encoded = encode_repo_path(path);
    let mut p = format!(
        "/repos/{}/{}/contents",
        encode_path_segment(owner),
        encode_path_segment(repo)
    );
    if !encoded.is_empty() {
        p.push('/');
        p.push_str(&encoded);
    }
    p
}

fn ref_query(branch: Option<&str>) -> Vec<(&'static str, String)> {
    match branch.filter(|b| !b.is_empty()) {
        Some(b) => vec![("ref", b.to_string())],
        None => Vec::new(),
    }
}

// Statuses the contents endpoint can answer besides 200 (and 404 for probes).
fn content_failure(res: &RestResponse, path: &str, repo: &str, context: &str) -> DirectoryError {
    let status = Some(res.status.as_u16());
    match res.status {
        StatusCode::NOT_FOUND => DirectoryError::NotFound {
            status,
            message: format!(
                "File or directory '{}' not found in repository '{}'",
                path, repo
            ),
        },
        StatusCode::FORBIDDEN => DirectoryError::Permission {
            status,
            message: "Insufficient permissions or repository is private".into(),
        },
        StatusCode::UNAUTHORIZED => DirectoryError::Auth {
            status,
            message: "Authentication failed. Check your token and permissions".into(),
        },
        s => DirectoryError::transport(status, format!("{}. Status code: {}", context, s.as_u16())),
    }
}

/// List every repository of `owner`, or of the authenticated user when `owner` is `None`,
/// most recently updated first.
///
/// Pages of [`PAGE_SIZE`] are requested one at a time until a short or empty page. Any
/// non-success status fails the whole listing with a `Transport` error.
pub async fn list_repositories(
    client: &Client,
    cfg: &Config,
    owner: Option<&str>,
) -> Result<Vec<RepositorySummary>, DirectoryError> {
    let path = match owner {
        Some(o) => format!("/users/{}/repos", encode_path_segment(o)),
        None => "/user/repos".to_string(),
    };
    let mut repositories: Vec<RepositorySummary> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut page: u32 = 1;
    loop {
        let query = [
            ("page", page.to_string()),
            ("per_page", PAGE_SIZE.to_string()),
            ("sort", "updated".to_string()),
            ("direction", "desc".to_string()),
        ];
        let res = http::send(client, cfg, Method::GET, &path, &query, None, LIST_CONTEXT).await?;
        if !res.status.is_success() {
            return Err(DirectoryError::transport(
                Some(res.status.as_u16()),
                format!(
                    "{}: status {}: {}",
                    LIST_CONTEXT,
                    res.status.as_u16(),
                    res.host_message()
                ),
            ));
        }
        let batch: Vec<RepoWire> = res.json(LIST_CONTEXT)?;
        let count = batch.len();
        for repo in batch {
            // A repository updated mid-listing can shift into a later page.
            if seen.insert(repo.name.clone()) {
                repositories.push(repo.into());
            } else {
                debug!("skipping repeated repository '{}' on page {}", repo.name, page);
            }
        }
        if count < PAGE_SIZE {
            break;
        }
        page += 1;
    }
    info!(
        "listed {} repositories for {} in {} page(s)",
        repositories.len(),
        owner.unwrap_or("authenticated user"),
        page
    );
    Ok(repositories)
}

/// Whether `owner/repo` exists. Absence is `Ok(false)`; auth and permission failures are errors.
pub async fn repository_exists(
    client: &Client,
    cfg: &Config,
    owner: &str,
    repo: &str,
) -> Result<bool, DirectoryError> {
    let path = format!(
        "/repos/{}/{}",
        encode_path_segment(owner),
        encode_path_segment(repo)
    );
    let context = format!("Failed to check repository '{}/{}'", owner, repo);
    let res = http::send(client, cfg, Method::GET, &path, &[], None, &context).await?;
    match res.status {
        s if s.is_success() => Ok(true),
        StatusCode::NOT_FOUND => Ok(false),
        s => Err(map_status_to_error(
            s,
            format!("{}: {}", context, res.host_message()),
        )),
    }
}

/// Rename `owner/old_name` to `new_name`.
///
/// The old name must exist and the new name must not; both are checked before the PATCH is
/// issued, so a failed precondition never mutates anything.
pub async fn rename_repository(
    client: &Client,
    cfg: &Config,
    owner: &str,
    old_name: &str,
    new_name: &str,
) -> Result<RenameOutcome, DirectoryError> {
    if !repository_exists(client, cfg, owner, old_name).await? {
        return Err(DirectoryError::NotFound {
            status: Some(StatusCode::NOT_FOUND.as_u16()),
            message: format!("Repository '{}' not found", old_name),
        });
    }
    if repository_exists(client, cfg, owner, new_name).await? {
        return Err(DirectoryError::Conflict {
            status: None,
            message: format!("Repository name '{}' is already taken", new_name),
        });
    }

    let path = format!(
        "/repos/{}/{}",
        encode_path_segment(owner),
        encode_path_segment(old_name)
    );
    let body = serde_json::json!({ "name": new_name });
    let res = http::send(
        client,
        cfg,
        Method::PATCH,
        &path,
        &[],
        Some(&body),
        RENAME_CONTEXT,
    )
    .await?;

    let status = Some(res.status.as_u16());
    match res.status {
        StatusCode::OK => {
            let renamed: RenamedWire = res.json(RENAME_CONTEXT)?;
            info!("renamed repository {}/{} to {}", owner, old_name, new_name);
            Ok(RenameOutcome {
                old_name: old_name.to_string(),
                new_name: new_name.to_string(),
                full_name: renamed.full_name,
                html_url: renamed.html_url,
                clone_url: renamed.clone_url,
                ssh_url: renamed.ssh_url,
                private: renamed.private,
                description: renamed.description,
                created_at: renamed.created_at.unwrap_or_default(),
                updated_at: renamed.updated_at.unwrap_or_default(),
                message: format!(
                    "Repository '{}' successfully renamed to '{}'",
                    old_name, new_name
                ),
            })
        }
        StatusCode::UNPROCESSABLE_ENTITY => Err(DirectoryError::InvalidName {
            status,
            message: format!(
                "Invalid repository name '{}' or name already exists: {}",
                new_name,
                res.host_message()
            ),
        }),
        StatusCode::FORBIDDEN => Err(DirectoryError::Permission {
            status,
            message: "Insufficient permissions. Token needs 'repo' scope or you don't have access to this repository".into(),
        }),
        StatusCode::UNAUTHORIZED => Err(DirectoryError::Auth {
            status,
            message: "Authentication failed. Check your token and permissions".into(),
        }),
        s => Err(DirectoryError::transport(
            status,
            format!("{}. Status code: {}", RENAME_CONTEXT, s.as_u16()),
        )),
    }
}

/// Fetch a file or directory listing at `path` on `branch` (the host's default branch when
/// `None`). An empty `path` addresses the repository root.
pub async fn get_content(
    client: &Client,
    cfg: &Config,
    owner: &str,
    repo: &str,
    path: &str,
    branch: Option<&str>,
) -> Result<ContentEntry, DirectoryError> {
    let api_path = contents_path(owner, repo, path);
    let query = ref_query(branch);
    let res = http::send(client, cfg, Method::GET, &api_path, &query, None, CONTENT_CONTEXT).await?;
    if res.status != StatusCode::OK {
        return Err(content_failure(&res, path, repo, CONTENT_CONTEXT));
    }

    let value: serde_json::Value = res.json(CONTENT_CONTEXT)?;
    match value {
        serde_json::Value::Array(items) => {
            let entries = items
                .into_iter()
                .map(|item| {
                    serde_json::from_value::<ContentWire>(item)
                        .map(ContentWire::into_directory_entry)
                })
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| {
                    DirectoryError::transport(
                        Some(res.status.as_u16()),
                        format!("{}: malformed directory entry: {}", CONTENT_CONTEXT, e),
                    )
                })?;
            let path = if path.is_empty() { "root" } else { path };
            Ok(ContentEntry::Directory {
                path: path.to_string(),
                entries,
            })
        }
        serde_json::Value::Object(_) => {
            let wire: ContentWire = serde_json::from_value(value).map_err(|e| {
                DirectoryError::transport(
                    Some(res.status.as_u16()),
                    format!("{}: malformed content object: {}", CONTENT_CONTEXT, e),
                )
            })?;
            match wire.entry_kind() {
                EntryKind::File => Ok(ContentEntry::File(wire.into_file())),
                EntryKind::Dir => Ok(ContentEntry::Directory {
                    path: wire.path,
                    entries: Vec::new(),
                }),
                other => Err(DirectoryError::transport(
                    Some(res.status.as_u16()),
                    format!(
                        "{}: unsupported content kind {:?} at '{}'",
                        CONTENT_CONTEXT, other, path
                    ),
                )),
            }
        }
        _ => Err(DirectoryError::transport(
            Some(res.status.as_u16()),
            format!("{}: unexpected response shape", CONTENT_CONTEXT),
        )),
    }
}

/// Text of the file at `path`; fails with `NotAFile` when the path is a directory.
pub async fn get_file_text(
    client: &Client,
    cfg: &Config,
    owner: &str,
    repo: &str,
    path: &str,
    branch: Option<&str>,
) -> Result<String, DirectoryError> {
    match get_content(client, cfg, owner, repo, path, branch).await? {
        ContentEntry::File(file) => Ok(file.content),
        ContentEntry::Directory { .. } => Err(DirectoryError::NotAFile {
            status: None,
            message: format!("Path '{}' is not a file", path),
        }),
    }
}

/// Probe `path` without treating absence as an error.
pub async fn probe_exists(
    client: &Client,
    cfg: &Config,
    owner: &str,
    repo: &str,
    path: &str,
    branch: Option<&str>,
) -> Result<ExistenceCheck, DirectoryError> {
    let api_path = contents_path(owner, repo, path);
    let query = ref_query(branch);
    let res = http::send(client, cfg, Method::GET, &api_path, &query, None, PROBE_CONTEXT).await?;
    match res.status {
        StatusCode::OK => {}
        StatusCode::NOT_FOUND => return Ok(ExistenceCheck::bare(false, ExistenceKind::None, path)),
        _ => return Err(content_failure(&res, path, repo, PROBE_CONTEXT)),
    }

    let value: serde_json::Value = res.json(PROBE_CONTEXT)?;
    let check = match value {
        serde_json::Value::Object(_) => {
            let wire: ContentWire = match serde_json::from_value(value) {
                Ok(w) => w,
                Err(e) => {
                    warn!("unreadable contents object at '{}': {}", path, e);
                    return Ok(ExistenceCheck::bare(true, ExistenceKind::Unknown, path));
                }
            };
            let kind = match wire.entry_kind() {
                EntryKind::File => ExistenceKind::File,
                EntryKind::Dir => ExistenceKind::Directory,
                _ => ExistenceKind::Unknown,
            };
            ExistenceCheck {
                exists: true,
                kind,
                path: wire.path,
                name: wire.name,
                size: wire.size,
                sha: wire.sha,
                html_url: wire.html_url,
                download_url: wire.download_url,
            }
        }
        serde_json::Value::Array(_) => ExistenceCheck::bare(true, ExistenceKind::Directory, path),
        _ => ExistenceCheck::bare(true, ExistenceKind::Unknown, path),
    };
    Ok(check)
}

/// README of `owner/repo` with image references normalized for rendering.
pub async fn fetch_readme(
    client: &Client,
    cfg: &Config,
    owner: &str,
    repo: &str,
    branch: Option<&str>,
) -> Result<String, DirectoryError> {
    let text = get_file_text(client, cfg, owner, repo, README_PATH, branch).await?;
    let default_branch = branch.unwrap_or(cfg.default_branch.as_str());
    Ok(normalize_image_references(&text, default_branch))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_bodies_decode_across_line_wraps() {
        let encoded = base64::engine::general_purpose::STANDARD.encode("# Title\nbody\n");
        let wrapped = format!("{}\n{}\n", &encoded[..8], &encoded[8..]);
        assert_eq!(
            decode_content(&wrapped, Some("base64")),
            ("# Title\nbody\n".to_string(), true)
        );
    }

    #[test]
    fn undecodable_bodies_pass_through() {
        assert_eq!(
            decode_content("%%% not base64", Some("base64")),
            ("%%% not base64".to_string(), false)
        );
        let binary = base64::engine::general_purpose::STANDARD.encode([0xff, 0xfe, 0x00]);
        assert_eq!(
            decode_content(&binary, Some("base64")),
            (binary.clone(), false)
        );
        assert_eq!(
            decode_content("plain", Some("utf-8")),
            ("plain".to_string(), false)
        );
        assert_eq!(decode_content("", None), (String::new(), false));
    }

    #[test]
    fn contents_paths() {
        assert_eq!(contents_path("o", "r", ""), "/repos/o/r/contents");
        assert_eq!(
            contents_path("o", "r", "docs/a b.md"),
            "/repos/o/r/contents/docs/a%20b.md"
        );
    }

    #[test]
    fn ref_query_skips_empty_branch() {
        assert!(ref_query(None).is_empty());
        assert!(ref_query(Some("")).is_empty());
        assert_eq!(ref_query(Some("dev")), vec![("ref", "dev".to_string())]);
    }
}
