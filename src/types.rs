use serde::{Deserialize, Serialize};
use std::fmt;

// Rate budget reported by the host on every REST response.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RateMeta {
    pub remaining: Option<i32>,
    pub used: Option<i32>,
    pub reset_at: Option<String>,
}

fn or_unknown<T: fmt::Display>(v: &Option<T>) -> String {
    v.as_ref().map_or_else(|| "?".to_string(), |x| x.to_string())
}

impl fmt::Display for RateMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "remaining={} used={} reset_at={}",
            or_unknown(&self.remaining),
            or_unknown(&self.used),
            or_unknown(&self.reset_at)
        )
    }
}

/// One repository as listed by the host at fetch time.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RepositorySummary {
    pub name: String,
    pub api_url: String,
    pub html_url: String,
    pub clone_url: String,
    pub ssh_url: String,
    pub description: Option<String>,
    pub language: Option<String>,
    pub private: bool,
    pub fork: bool,
    pub stars: u64,
    pub forks: u64,
    pub updated_at: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Submodule,
    #[serde(other)]
    Other,
}

/// Child of a directory listing; never carries content bytes.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub name: String,
    pub path: String,
    pub kind: EntryKind,
    pub size: u64,
    pub sha: String,
    pub api_url: Option<String>,
    pub html_url: Option<String>,
    pub download_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FileContent {
    pub name: String,
    pub path: String,
    /// Decoded text when `decoded` is true, otherwise the body exactly as the host sent it.
    pub content: String,
    pub decoded: bool,
    pub size: u64,
    pub sha: String,
    pub api_url: Option<String>,
    pub html_url: Option<String>,
    pub download_url: Option<String>,
    pub encoding: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentEntry {
    File(FileContent),
    Directory {
        path: String,
        /// Host order; not sorted.
        entries: Vec<DirectoryEntry>,
    },
}

impl ContentEntry {
    pub fn path(&self) -> &str {
        match self {
            ContentEntry::File(f) => &f.path,
            ContentEntry::Directory { path, .. } => path,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RenameOutcome {
    pub old_name: String,
    pub new_name: String,
    pub full_name: String,
    pub html_url: String,
    pub clone_url: String,
    pub ssh_url: String,
    pub private: bool,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExistenceKind {
    File,
    Directory,
    Unknown,
    None,
}

/// Result of a path probe. Absence is a normal value here, not an error.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ExistenceCheck {
    pub exists: bool,
    pub kind: ExistenceKind,
    pub path: String,
    pub name: String,
    pub size: u64,
    pub sha: String,
    pub html_url: Option<String>,
    pub download_url: Option<String>,
}

impl ExistenceCheck {
    pub(crate) fn bare(exists: bool, kind: ExistenceKind, path: &str) -> Self {
        Self {
            exists,
            kind,
            path: path.to_string(),
            name: last_segment(path).to_string(),
            size: 0,
            sha: String::new(),
            html_url: None,
            download_url: None,
        }
    }
}

pub(crate) fn last_segment(path: &str) -> &str {
    path.trim_end_matches('/').rsplit('/').next().unwrap_or(path)
}
