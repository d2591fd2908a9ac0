//! Output path resolution.
//! Expands manifest output path templates, confines the results to the
//! output root, and tracks claimed paths to detect collisions.

use crate::config::VariableMap;
use crate::error::{Error, Result};
use crate::manifest::ManifestEntry;
use crate::render::render;
use indexmap::IndexMap;
use std::path::{Component, Path, PathBuf};

/// Expands an entry's output path template and joins it under the output
/// root.
///
/// `origin` names the manifest for diagnostics. The expanded path must be
/// relative and stay inside the root: `..`, absolute paths, and drive
/// prefixes all fail with `Error::PathEscapesRoot` before anything is
/// written.
pub fn resolve_output_path(
    out_root: &Path,
    origin: &str,
    entry: &ManifestEntry,
    variables: &VariableMap,
) -> Result<PathBuf> {
    let rendered = render(origin, &entry.output, variables)?;

    let relative = Path::new(&rendered);
    let mut clean = PathBuf::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => return Err(Error::PathEscapesRoot { path: relative.to_path_buf() }),
        }
    }
    if clean.as_os_str().is_empty() {
        return Err(Error::PathEscapesRoot { path: relative.to_path_buf() });
    }

    Ok(out_root.join(clean))
}

/// Registry of resolved output paths for one run.
///
/// Claims are made for every selected entry before any file is written, so
/// a colliding manifest fails with nothing on disk.
#[derive(Debug, Default)]
pub struct PathRegistry {
    claimed: IndexMap<PathBuf, String>,
}

impl PathRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims a resolved path for the given output template.
    ///
    /// # Errors
    /// * `Error::OutputPathCollision` if the path was already claimed; the
    ///   error names both claimants
    pub fn claim(&mut self, path: &Path, output: &str) -> Result<()> {
        if let Some(first) = self.claimed.get(path) {
            return Err(Error::OutputPathCollision {
                path: path.to_path_buf(),
                first: first.clone(),
                second: output.to_string(),
            });
        }
        self.claimed.insert(path.to_path_buf(), output.to_string());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.is_empty()
    }
}

/// Creates the parent directory of an output path, idempotently.
pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| Error::DirectoryCreateFailed {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    Ok(())
}
