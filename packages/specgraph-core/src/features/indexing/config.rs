//! Index configuration
//!
//! All knobs are explicit, per-index configuration; nothing is global.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default bound on pointer re-resolution depth
pub const DEFAULT_MAX_DEPTH: u32 = 100;

/// Where a document lives, for resolving relative references
///
/// URL bases use URL-path-join rules; filesystem bases use lexical path
/// joining. Neither form touches the network or the disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaseLocation {
    Url(String),
    Path(PathBuf),
}

impl BaseLocation {
    /// Canonical string form, used to match references against external
    /// documents.
    pub fn as_str(&self) -> String {
        match self {
            BaseLocation::Url(url) => url.clone(),
            BaseLocation::Path(path) => path.to_string_lossy().to_string(),
        }
    }

    /// Final path segment (the document's file name), if any.
    pub fn file_name(&self) -> Option<&str> {
        match self {
            BaseLocation::Url(url) => url.rsplit('/').next().filter(|s| !s.is_empty()),
            BaseLocation::Path(path) => path.file_name().and_then(|n| n.to_str()),
        }
    }

    /// Resolve a relative document reference against this base.
    ///
    /// Absolute inputs (a URL, or a rooted path) pass through unchanged.
    pub fn join(&self, relative: &str) -> String {
        if relative.contains("://") {
            return relative.to_string();
        }
        match self {
            BaseLocation::Url(base) => join_url(base, relative),
            BaseLocation::Path(base) => join_path(base, relative),
        }
    }
}

fn join_url(base: &str, relative: &str) -> String {
    let (scheme_host, path) = match base.find("://") {
        Some(scheme_end) => {
            let after = &base[scheme_end + 3..];
            match after.find('/') {
                Some(path_start) => base.split_at(scheme_end + 3 + path_start),
                None => (base, ""),
            }
        }
        None => ("", base),
    };
    if let Some(rooted) = relative.strip_prefix('/') {
        return format!("{}/{}", scheme_host, normalize_segments("", rooted));
    }
    let dir = match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    };
    let tail = normalize_segments(dir, relative);
    if tail.starts_with('/') {
        format!("{scheme_host}{tail}")
    } else {
        format!("{scheme_host}/{tail}")
    }
}

fn join_path(base: &std::path::Path, relative: &str) -> String {
    if std::path::Path::new(relative).is_absolute() {
        return relative.to_string();
    }
    let dir = base
        .parent()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_default();
    normalize_segments(&dir, relative)
}

/// Lexical `.`/`..` normalization over slash-separated segments.
fn normalize_segments(dir: &str, relative: &str) -> String {
    let rooted = dir.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in dir.split('/').chain(relative.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    let joined = segments.join("/");
    if rooted {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Per-index construction options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Where this document itself lives (path or URL)
    pub location: Option<BaseLocation>,
    /// Configured fallback base for relative references
    pub base_url: Option<BaseLocation>,
    /// Tolerate circular reference chains instead of failing.
    ///
    /// Off by default: a cycle is an error unless the caller opts in.
    pub allow_circular: bool,
    /// Bound on pointer re-resolution depth
    pub max_depth: u32,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            location: None,
            base_url: None,
            allow_circular: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl IndexConfig {
    pub fn with_location(mut self, location: BaseLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_base_url(mut self, base: BaseLocation) -> Self {
        self.base_url = Some(base);
        self
    }

    pub fn tolerate_circular(mut self) -> Self {
        self.allow_circular = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_url_join_replaces_last_segment() {
        let base = BaseLocation::Url("https://example.com/specs/root.yaml".into());
        assert_eq!(base.join("common.yaml"), "https://example.com/specs/common.yaml");
    }

    #[test]
    fn test_url_join_parent_traversal() {
        let base = BaseLocation::Url("https://example.com/specs/v1/root.yaml".into());
        assert_eq!(
            base.join("../shared/types.yaml"),
            "https://example.com/specs/shared/types.yaml"
        );
    }

    #[test]
    fn test_url_join_rooted_reference() {
        let base = BaseLocation::Url("https://example.com/specs/root.yaml".into());
        assert_eq!(base.join("/other/doc.yaml"), "https://example.com/other/doc.yaml");
    }

    #[test]
    fn test_path_join_is_lexical() {
        let base = BaseLocation::Path("/work/specs/root.yaml".into());
        assert_eq!(base.join("./common.yaml"), "/work/specs/common.yaml");
        assert_eq!(base.join("../common.yaml"), "/work/common.yaml");
    }

    #[test]
    fn test_absolute_inputs_pass_through() {
        let base = BaseLocation::Path("/work/specs/root.yaml".into());
        assert_eq!(base.join("/etc/doc.yaml"), "/etc/doc.yaml");
        assert_eq!(
            base.join("https://example.com/doc.yaml"),
            "https://example.com/doc.yaml"
        );
    }

    #[test]
    fn test_default_config() {
        let config = IndexConfig::default();
        assert!(!config.allow_circular);
        assert_eq!(config.max_depth, DEFAULT_MAX_DEPTH);
    }
}
