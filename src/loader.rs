//! Template loading for sourcegen.
//! Resolves template paths against the template tree root, confines them to
//! the root, and caches file contents for the lifetime of the run.

use crate::error::{Error, Result};
use log::debug;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Read-only view of the template tree with an in-memory content cache.
///
/// Contents are loaded lazily and retained for the run, keyed by template
/// path. The cache lock is held across the first read of each path, so
/// concurrent first-loads for the same path coalesce into one read.
pub struct TemplateLoader {
    root: PathBuf,
    cache: Mutex<HashMap<PathBuf, Arc<String>>>,
}

impl TemplateLoader {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into(), cache: Mutex::new(HashMap::new()) }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Loads a template by its tree-relative POSIX path.
    ///
    /// # Errors
    /// * `Error::PathEscapesRoot` if the path is absolute or contains `..`
    /// * `Error::TemplateNotFound` if no file exists at the resolved path
    /// * `Error::TemplateReadFailed` if reading fails
    pub fn load(&self, template_path: &str) -> Result<Arc<String>> {
        let relative = confine_to_root(template_path)?;

        let mut cache = self.cache.lock().unwrap();
        if let Some(content) = cache.get(&relative) {
            debug!("Cache hit for template '{}'", template_path);
            return Ok(Arc::clone(content));
        }

        let full_path = self.root.join(&relative);
        if !full_path.is_file() {
            return Err(Error::TemplateNotFound { path: full_path });
        }

        debug!("Reading template '{}'", full_path.display());
        let content = std::fs::read_to_string(&full_path).map_err(|e| {
            Error::TemplateReadFailed { path: full_path.clone(), source: e }
        })?;

        let content = Arc::new(content);
        cache.insert(relative, Arc::clone(&content));
        Ok(content)
    }
}

/// Checks that a template path stays inside the tree root: only normal
/// components are allowed, so `..`, absolute paths, and drive prefixes are
/// all rejected before touching the filesystem.
fn confine_to_root(template_path: &str) -> Result<PathBuf> {
    let relative = Path::new(template_path);
    for component in relative.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => return Err(Error::PathEscapesRoot { path: relative.to_path_buf() }),
        }
    }
    Ok(relative.to_path_buf())
}
