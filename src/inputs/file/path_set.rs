// SPDX-License-Identifier: Apache-2.0

//! Resolution of a configured path-or-glob to the set of matching files.

use glob::Pattern;
use std::path::{Component, Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use crate::inputs::file::error::{Error, Result};

const GLOB_METACHARACTERS: &[char] = &['*', '?', '[', ']'];

/// The set of files on disk matching a configured path pattern.
///
/// Identity is the pattern string. Resolution is lazy and re-walks the
/// filesystem on every [`paths`](PathSet::paths) call, which is deliberately
/// expensive; callers must not invoke it in a hot loop. [`contains`]
/// (PathSet::contains) is a pure matcher test and never touches the
/// filesystem.
#[derive(Debug, Clone)]
pub struct PathSet {
    pattern: String,
    root: PathBuf,
    matcher: Option<Pattern>,
    /// Absolute form of a glob-free pattern; None when `matcher` is set.
    literal: Option<PathBuf>,
}

impl PartialEq for PathSet {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern
    }
}

impl Eq for PathSet {}

impl PathSet {
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();
        if pattern.is_empty() {
            return Err(Error::Config("path pattern must not be empty".to_string()));
        }

        let has_meta = pattern.contains(GLOB_METACHARACTERS);
        let matcher = if has_meta {
            Some(Pattern::new(&pattern).map_err(|e| Error::InvalidGlob(e.to_string()))?)
        } else {
            None
        };

        // Glob-free patterns resolve to an absolute path so that watcher
        // event paths, which are absolute, match configured relative ones
        let literal = if has_meta {
            None
        } else {
            Some(std::path::absolute(Path::new(&pattern))?)
        };

        // For a literal path the watch root is its directory; for a glob it
        // is the longest prefix before the first metacharacter
        let root = match &literal {
            Some(path) => path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| path.clone()),
            None => glob_free_prefix(&pattern),
        };

        Ok(Self {
            root,
            pattern,
            matcher,
            literal,
        })
    }

    /// The longest prefix of the pattern containing no glob metacharacter.
    /// This is the directory tree a watcher needs to register interest in.
    pub fn root_path(&self) -> &Path {
        &self.root
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Test whether a path belongs to this set without touching the
    /// filesystem.
    pub fn contains(&self, path: &Path) -> bool {
        match &self.matcher {
            Some(matcher) => matcher.matches_path(path),
            None => self.literal.as_deref() == Some(path),
        }
    }

    /// Resolve the current set of matching files by walking the tree under
    /// [`root_path`](PathSet::root_path). `/proc` is skipped; unreadable
    /// directories are logged and skipped.
    pub fn paths(&self) -> Vec<PathBuf> {
        let matcher = match &self.matcher {
            None => {
                if let Some(path) = &self.literal {
                    if path.is_file() {
                        return vec![path.clone()];
                    }
                }
                return Vec::new();
            }
            Some(matcher) => matcher,
        };

        let mut paths = Vec::new();
        let walker = WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|entry| entry.path() != Path::new("/proc"));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable directory entry");
                    continue;
                }
            };
            if entry.file_type().is_file() && matcher.matches_path(entry.path()) {
                paths.push(entry.into_path());
            }
        }

        paths
    }
}

/// Longest path prefix containing no glob metacharacter.
fn glob_free_prefix(pattern: &str) -> PathBuf {
    let mut prefix = PathBuf::new();
    for component in Path::new(pattern).components() {
        match component {
            Component::Normal(part) => {
                if part.to_string_lossy().contains(GLOB_METACHARACTERS) {
                    break;
                }
                prefix.push(part);
            }
            other => prefix.push(other.as_os_str()),
        }
    }
    prefix
}
