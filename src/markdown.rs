//! Markdown image-reference normalization.
//!
//! READMEs frequently embed images through the host's `blob` viewer URLs, which serve an HTML
//! page rather than the image bytes. [`normalize_image_references`] rewrites those into raw
//! content URLs and separates every image from the text that follows it. It is the composition
//! of three passes, each usable on its own:
//!
//! 1. [`rewrite_branch_blob_urls`]: `github.com/<owner>/<repo>/blob/<ref>/<path>`
//! 2. [`rewrite_branchless_blob_urls`]: `github.com/<owner>/<repo>/blob/<path>` (default branch)
//! 3. [`separate_image_references`]: blank line after every image reference
//!
//! Pass 3 runs last so it sees both rewritten and already-raw URLs.

use regex::{Captures, Regex};
use std::sync::LazyLock;

pub const RAW_CONTENT_BASE: &str = "https://raw.githubusercontent.com";

/// Branch names treated as a ref segment even though any path segment could be one.
const WELL_KNOWN_BRANCHES: &[&str] = &["main", "master", "develop", "dev", "trunk", "gh-pages"];

// A link destination may hold one level of balanced parentheses, and may be followed by a
// double-quoted title.
static BRANCH_BLOB_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"!\[([^\]]*)\]\(https?://(?:www\.)?github\.com/([^/\s()]+)/([^/\s()]+)/blob/([^/\s()]+)/((?:[^()\s]|\([^()\s]*\))+)(\s+"[^"]*")?\)"#,
    )
    .expect("branch blob pattern compiles")
});

static BRANCHLESS_BLOB_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"!\[([^\]]*)\]\(https?://(?:www\.)?github\.com/([^/\s()]+)/([^/\s()]+)/blob/((?:[^()\s]|\([^()\s]*\))+)(\s+"[^"]*")?\)"#,
    )
    .expect("branchless blob pattern compiles")
});

static ANY_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(!\[[^\]]*\]\((?:[^()\s]|\([^()\s]*\))*(?:\s+"[^"]*")?\))(\n*)"#)
        .expect("image pattern compiles")
});

// Release tags such as `v1.2.0` or `2.4`.
static VERSION_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v?\d+(\.\d+)+$").expect("version tag pattern compiles"));

/// Whether a segment right after `/blob/` names a ref rather than the first directory of a path.
fn is_ref_segment(segment: &str, default_branch: &str) -> bool {
    segment == default_branch
        || WELL_KNOWN_BRANCHES.contains(&segment)
        || VERSION_TAG.is_match(segment)
        || ((7..=40).contains(&segment.len()) && segment.chars().all(|c| c.is_ascii_hexdigit()))
}

fn raw_image(alt: &str, owner: &str, repo: &str, branch: &str, path: &str, title: &str) -> String {
    format!(
        "![{}]({}/{}/{}/{}/{}{})",
        alt, RAW_CONTENT_BASE, owner, repo, branch, path, title
    )
}

fn title<'a>(caps: &'a Captures, group: usize) -> &'a str {
    caps.get(group).map_or("", |m| m.as_str())
}

/// Pass 1: rewrite blob image URLs whose first segment after `/blob/` is a recognizable ref.
pub fn rewrite_branch_blob_urls(markdown: &str, default_branch: &str) -> String {
    BRANCH_BLOB_IMAGE
        .replace_all(markdown, |caps: &Captures| {
            if is_ref_segment(&caps[4], default_branch) {
                raw_image(
                    &caps[1],
                    &caps[2],
                    &caps[3],
                    &caps[4],
                    &caps[5],
                    title(caps, 6),
                )
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

/// Pass 2: rewrite remaining blob image URLs, which carry no ref, onto `default_branch`.
pub fn rewrite_branchless_blob_urls(markdown: &str, default_branch: &str) -> String {
    BRANCHLESS_BLOB_IMAGE
        .replace_all(markdown, |caps: &Captures| {
            raw_image(
                &caps[1],
                &caps[2],
                &caps[3],
                default_branch,
                &caps[4],
                title(caps, 5),
            )
        })
        .into_owned()
}

/// Pass 3: make sure every image reference is followed by a blank line.
///
/// Images already followed by two or more newlines are left alone, as are images nested inside
/// a link label (`[![badge](..)](..)`), where a line break would break the link.
pub fn separate_image_references(markdown: &str) -> String {
    ANY_IMAGE
        .replace_all(markdown, |caps: &Captures| {
            let whole = &caps[0];
            let end = caps.get(0).map(|m| m.end()).unwrap_or(markdown.len());
            let inside_link = markdown[end..].starts_with(']');
            if caps[2].len() >= 2 || inside_link {
                whole.to_string()
            } else {
                format!("{}\n\n", &caps[1])
            }
        })
        .into_owned()
}

/// Apply the three passes in order.
pub fn normalize_image_references(markdown: &str, default_branch: &str) -> String {
    let pass1 = rewrite_branch_blob_urls(markdown, default_branch);
    let pass2 = rewrite_branchless_blob_urls(&pass1, default_branch);
    separate_image_references(&pass2)
}
