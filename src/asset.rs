//! Named trees of SQL fragments.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::PersistorError;

/// A node in an [`AssetTree`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Asset {
    Fragment(String),
    Tree(AssetTree),
}

/// Directory of `.sql` fragments exposed as nested name -> text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetTree {
    path: Option<PathBuf>,
    entries: BTreeMap<String, Asset>,
}

impl AssetTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every file ending in `ext` under `path`, recursing into sub-directories.
    ///
    /// Hidden entries are skipped; a fragment is named by its file stem, a sub-tree by its
    /// directory name.
    ///
    /// # Errors
    /// Returns `PersistorError::AssetError` if a directory or file cannot be read, or if an
    /// entry name contains a `.` and so could never be reached through [`get`](Self::get).
    pub fn from_dir(path: impl AsRef<Path>, ext: &str) -> Result<Self, PersistorError> {
        let path = path.as_ref();
        let asset_error = |path: &Path, source: io::Error| PersistorError::AssetError {
            path: path.to_path_buf(),
            source,
        };
        let ext = ext.trim_start_matches('.');
        let mut tree = Self {
            path: Some(path.to_path_buf()),
            entries: BTreeMap::new(),
        };

        for entry in fs::read_dir(path).map_err(|e| asset_error(path, e))? {
            let entry = entry.map_err(|e| asset_error(path, e))?;
            let child = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                continue;
            }
            let dotted = |name: &str| {
                asset_error(
                    &child,
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("asset name {name:?} contains '.'"),
                    ),
                )
            };
            if child.is_dir() {
                if name.contains('.') {
                    return Err(dotted(&name));
                }
                tree.entries
                    .insert(name, Asset::Tree(Self::from_dir(&child, ext)?));
                continue;
            }
            if child.extension().and_then(|e| e.to_str()) != Some(ext) {
                continue;
            }
            let Some(stem) = child.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem.contains('.') {
                return Err(dotted(stem));
            }
            let text = fs::read_to_string(&child).map_err(|e| asset_error(&child, e))?;
            tree.entries
                .insert(stem.to_string(), Asset::Fragment(text));
        }
        Ok(tree)
    }

    /// Directory this tree was loaded from, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn insert(&mut self, name: impl Into<String>, text: impl Into<String>) -> &mut Self {
        self.entries
            .insert(name.into(), Asset::Fragment(text.into()));
        self
    }

    pub fn insert_tree(&mut self, name: impl Into<String>, tree: AssetTree) -> &mut Self {
        self.entries.insert(name.into(), Asset::Tree(tree));
        self
    }

    /// Look up a fragment by dotted name, e.g. `"runs.open"`.
    #[must_use]
    pub fn get(&self, dotted: &str) -> Option<&str> {
        let mut node = self;
        let mut parts = dotted.split('.').peekable();
        while let Some(part) = parts.next() {
            match (node.entries.get(part)?, parts.peek()) {
                (Asset::Fragment(text), None) => return Some(text.as_str()),
                (Asset::Tree(child), Some(_)) => node = child,
                _ => return None,
            }
        }
        None
    }

    /// Every fragment as `(dotted name, text)`, in name order.
    #[must_use]
    pub fn walk(&self) -> Vec<(String, &str)> {
        let mut out = Vec::new();
        self.walk_into("", &mut out);
        out
    }

    fn walk_into<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a str)>) {
        for (name, asset) in &self.entries {
            let dotted = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}.{name}")
            };
            match asset {
                Asset::Fragment(text) => out.push((dotted, text.as_str())),
                Asset::Tree(child) => child.walk_into(&dotted, out),
            }
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
