//! Project configuration for sourcegen.
//! Loads the project descriptor (JSON or YAML) and derives the variable map
//! and flag map used during generation.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Raw on-disk shape of the project descriptor. All fields optional so that
/// required-field failures are reported as such instead of as parse errors.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawProjectConfig {
    library_name: Option<String>,
    library_name_suffix: Option<String>,
    python_module_name: Option<String>,
    tools_name: Option<String>,
    prefix: Option<String>,
    library_type: Option<String>,
    structure_name: Option<String>,
    structure_description: Option<String>,
    mount_tool_name: Option<String>,
    mount_tool_file_entry_type: Option<String>,
    authors: Option<String>,
    tests_authors: Option<String>,
    copyright: Option<String>,
    #[serde(default)]
    variables: IndexMap<String, String>,
    #[serde(default)]
    flags: IndexMap<String, bool>,
}

/// Typed view of one project's generation parameters.
///
/// `python_module_name`, `tools_name` and `prefix` are derived from
/// `library_name_suffix` when omitted.
#[derive(Debug)]
pub struct ProjectConfig {
    /// Where the descriptor was loaded from, used in diagnostics
    pub source: PathBuf,
    pub library_name: String,
    pub library_name_suffix: String,
    pub python_module_name: String,
    pub tools_name: String,
    pub prefix: String,
    pub library_type: Option<String>,
    pub structure_name: Option<String>,
    pub structure_description: Option<String>,
    pub mount_tool_name: Option<String>,
    pub mount_tool_file_entry_type: Option<String>,
    pub authors: Option<String>,
    pub tests_authors: Option<String>,
    pub copyright: Option<String>,
    /// Free-form extra string variables
    pub variables: IndexMap<String, String>,
    /// Boolean feature flags referenced by manifest guards
    pub flags: IndexMap<String, bool>,
}

impl ProjectConfig {
    /// Loads and parses the project descriptor from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading project configuration from '{}'", path.display());
        let content = std::fs::read_to_string(path).map_err(Error::IoError)?;
        Self::parse(path, &content)
    }

    /// Parses descriptor content, trying JSON first and YAML second.
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let raw: RawProjectConfig = match serde_json::from_str(content) {
            Ok(value) => value,
            Err(_) => serde_yaml::from_str(content).map_err(|e| Error::ConfigParseFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?,
        };
        raw.into_config(path)
    }

    /// Builds the immutable variable map for one generator run.
    ///
    /// Every string variable is inserted together with its precomputed
    /// `<name>_upper_case` and `<name>_lower_case` aliases, so the
    /// substitution engine can treat aliases as ordinary keys. The flag map
    /// is carried alongside for guard evaluation.
    ///
    /// # Errors
    /// * `Error::ConfigParseFailed` if an explicit `variables` entry collides
    ///   with a typed field, another variable, or a generated alias
    pub fn variable_map(&self) -> Result<VariableMap> {
        let mut map = VariableMap::new();

        self.define(&mut map, "library_name", &self.library_name)?;
        self.define(&mut map, "library_name_suffix", &self.library_name_suffix)?;
        self.define(&mut map, "python_module_name", &self.python_module_name)?;
        self.define(&mut map, "tools_name", &self.tools_name)?;
        self.define(&mut map, "prefix", &self.prefix)?;

        let optional = [
            ("library_type", &self.library_type),
            ("structure_name", &self.structure_name),
            ("structure_description", &self.structure_description),
            ("mount_tool_name", &self.mount_tool_name),
            ("mount_tool_file_entry_type", &self.mount_tool_file_entry_type),
            ("authors", &self.authors),
            ("tests_authors", &self.tests_authors),
            ("copyright", &self.copyright),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                self.define(&mut map, name, value)?;
            }
        }

        for (name, value) in &self.variables {
            self.define(&mut map, name, value)?;
        }

        for (name, value) in &self.flags {
            map.set_flag(name, *value);
        }

        Ok(map)
    }

    /// Defines a variable and its case aliases, rejecting duplicates.
    fn define(&self, map: &mut VariableMap, name: &str, value: &str) -> Result<()> {
        let entries = [
            (name.to_string(), value.to_string()),
            (format!("{name}_upper_case"), value.to_ascii_uppercase()),
            (format!("{name}_lower_case"), value.to_ascii_lowercase()),
        ];
        for (key, value) in entries {
            if map.contains(&key) {
                return Err(Error::ConfigParseFailed {
                    path: self.source.clone(),
                    message: format!("variable \"{key}\" is defined more than once"),
                });
            }
            map.set(key, value);
        }
        Ok(())
    }
}

impl RawProjectConfig {
    fn into_config(self, path: &Path) -> Result<ProjectConfig> {
        let library_name = require(self.library_name, "library_name")?;
        let library_name_suffix = require(self.library_name_suffix, "library_name_suffix")?;

        let python_module_name =
            self.python_module_name.unwrap_or_else(|| format!("py{library_name_suffix}"));
        let tools_name =
            self.tools_name.unwrap_or_else(|| format!("{library_name_suffix}tools"));
        let prefix = self.prefix.unwrap_or_else(|| library_name_suffix.clone());

        Ok(ProjectConfig {
            source: path.to_path_buf(),
            library_name,
            library_name_suffix,
            python_module_name,
            tools_name,
            prefix,
            library_type: self.library_type,
            structure_name: self.structure_name,
            structure_description: self.structure_description,
            mount_tool_name: self.mount_tool_name,
            mount_tool_file_entry_type: self.mount_tool_file_entry_type,
            authors: self.authors,
            tests_authors: self.tests_authors,
            copyright: self.copyright,
            variables: self.variables,
            flags: self.flags,
        })
    }
}

fn require(value: Option<String>, field: &'static str) -> Result<String> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => Err(Error::MissingRequiredField { field }),
    }
}

/// Immutable name → value mapping for one generator run.
///
/// Insertion order is preserved so that any iteration that reaches output
/// bytes or diagnostics is deterministic. Lookups are case-sensitive and
/// there is no fallback value: a missing name fails the lookup.
#[derive(Debug, Default)]
pub struct VariableMap {
    values: IndexMap<String, String>,
    flags: IndexMap<String, bool>,
}

impl VariableMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a variable verbatim, replacing any previous value.
    ///
    /// Case aliases are the config layer's concern; this is the raw store.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn set_flag(&mut self, name: impl Into<String>, value: bool) {
        self.flags.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn flag(&self, name: &str) -> Option<bool> {
        self.flags.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
