//! Client for browsing and renaming an owner's repositories on a hosted-repository REST API,
//! plus README image-link normalization, with a stdio JSON-RPC tool server on top.

pub mod config;
pub mod directory;
pub mod error;
pub mod http;
pub mod markdown;
pub mod mcp;
pub mod server;
pub mod tools;
pub mod types;

pub use config::Config;
pub use directory::{
    fetch_readme, get_content, get_file_text, list_repositories, probe_exists, rename_repository,
    repository_exists,
};
pub use error::{ConfigError, DirectoryError};
pub use markdown::normalize_image_references;
pub use types::{
    ContentEntry, DirectoryEntry, EntryKind, ExistenceCheck, ExistenceKind, FileContent, RateMeta,
    RenameOutcome, RepositorySummary,
};
