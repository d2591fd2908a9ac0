//! Output manifest model and the guard expression language.
//!
//! The manifest is the single source of truth for what gets generated: one
//! record per output file, each naming an output path template, an ordered
//! fragment list, and an optional flag guard. Fragment order lives here as
//! data; the generator has no baked-in ordering knowledge.

use crate::config::VariableMap;
use crate::error::{Error, Result};
use log::debug;
use serde::Deserialize;
use std::path::Path;

/// One fragment of a manifest entry: a plain template path, or a template
/// path gated by its own flag guard.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Fragment {
    Path(String),
    Conditional { path: String, when: String },
}

impl Fragment {
    pub fn path(&self) -> &str {
        match self {
            Fragment::Path(path) => path,
            Fragment::Conditional { path, .. } => path,
        }
    }

    pub fn when(&self) -> Option<&str> {
        match self {
            Fragment::Path(_) => None,
            Fragment::Conditional { when, .. } => Some(when),
        }
    }
}

/// Declaration of one output file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestEntry {
    /// Template string yielding the output path once expanded
    pub output: String,
    /// Ordered template paths whose expansions are concatenated
    pub fragments: Vec<Fragment>,
    /// Optional flag expression gating the whole entry
    #[serde(default)]
    pub when: Option<String>,
}

/// An ordered list of manifest entries.
#[derive(Debug)]
pub struct Manifest {
    /// Where the manifest was loaded from, used in diagnostics
    pub origin: String,
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    pub fn new(entries: Vec<ManifestEntry>) -> Self {
        Self { origin: "<manifest>".to_string(), entries }
    }

    /// Loads and parses the manifest from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading manifest from '{}'", path.display());
        let content = std::fs::read_to_string(path).map_err(Error::IoError)?;
        Self::parse(path, &content)
    }

    /// Parses manifest content, trying JSON first and YAML second.
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let entries: Vec<ManifestEntry> = match serde_json::from_str(content) {
            Ok(value) => value,
            Err(_) => serde_yaml::from_str(content).map_err(|e| Error::ConfigParseFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?,
        };
        let manifest = Self { origin: path.display().to_string(), entries };
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        for entry in &self.entries {
            if entry.fragments.is_empty() {
                return Err(Error::EmptyFragmentList { output: entry.output.clone() });
            }
        }
        Ok(())
    }
}

/// A boolean expression over config flags.
///
/// Grammar: `FLAG`, `not FLAG`, `not(EXPR)`, `all(EXPR, ...)`,
/// `any(EXPR, ...)`. Nesting is accepted. `not`, `all` and `any` are
/// keywords and cannot name flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    Flag(String),
    Not(Box<Guard>),
    All(Vec<Guard>),
    Any(Vec<Guard>),
}

impl Guard {
    /// Parses a guard expression.
    ///
    /// # Errors
    /// * `Error::GuardEvalFailed` on any syntax error
    pub fn parse(expression: &str) -> Result<Self> {
        let mut parser = GuardParser { expression, finger: 0 };
        let guard = parser.expression()?;
        parser.skip_whitespace();
        if !parser.at_end() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(guard)
    }

    /// Evaluates the guard against the flag map.
    ///
    /// # Errors
    /// * `Error::GuardEvalFailed` if a referenced flag is not defined
    pub fn eval(&self, variables: &VariableMap) -> Result<bool> {
        match self {
            Guard::Flag(name) => variables.flag(name).ok_or_else(|| Error::GuardEvalFailed {
                expression: self.to_string(),
                message: format!("unknown flag \"{name}\""),
            }),
            Guard::Not(inner) => Ok(!inner.eval(variables)?),
            Guard::All(items) => {
                for item in items {
                    if !item.eval(variables)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Guard::Any(items) => {
                for item in items {
                    if item.eval(variables)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }
}

impl std::fmt::Display for Guard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Guard::Flag(name) => write!(f, "{name}"),
            Guard::Not(inner) => write!(f, "not({inner})"),
            Guard::All(items) => write_call(f, "all", items),
            Guard::Any(items) => write_call(f, "any", items),
        }
    }
}

fn write_call(
    f: &mut std::fmt::Formatter<'_>,
    name: &str,
    items: &[Guard],
) -> std::fmt::Result {
    write!(f, "{name}(")?;
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    write!(f, ")")
}

/// Byte-finger recursive-descent parser for guard expressions.
struct GuardParser<'a> {
    expression: &'a str,
    finger: usize,
}

impl<'a> GuardParser<'a> {
    fn error(&self, message: &str) -> Error {
        Error::GuardEvalFailed {
            expression: self.expression.to_string(),
            message: message.to_string(),
        }
    }

    fn at_end(&self) -> bool {
        self.finger >= self.expression.len()
    }

    fn peek(&self) -> Option<u8> {
        self.expression.as_bytes().get(self.finger).copied()
    }

    fn skip_whitespace(&mut self) {
        let bytes = self.expression.as_bytes();
        while self.finger < bytes.len() && bytes[self.finger].is_ascii_whitespace() {
            self.finger += 1;
        }
    }

    fn expect(&mut self, expected: u8) -> Result<()> {
        self.skip_whitespace();
        if self.peek() == Some(expected) {
            self.finger += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected '{}'", char::from(expected))))
        }
    }

    fn identifier(&mut self) -> Result<&'a str> {
        self.skip_whitespace();
        let bytes = self.expression.as_bytes();
        let start = self.finger;
        let mut end = start;
        while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
            end += 1;
        }
        if end == start {
            return Err(self.error("expected flag name"));
        }
        self.finger = end;
        Ok(&self.expression[start..end])
    }

    fn expression(&mut self) -> Result<Guard> {
        let name = self.identifier()?;
        match name {
            "not" => {
                self.skip_whitespace();
                if self.peek() == Some(b'(') {
                    self.finger += 1;
                    let inner = self.expression()?;
                    self.expect(b')')?;
                    Ok(Guard::Not(Box::new(inner)))
                } else {
                    let flag = self.identifier()?;
                    Ok(Guard::Not(Box::new(Guard::Flag(flag.to_string()))))
                }
            }
            "all" | "any" => {
                self.expect(b'(')?;
                let mut items = vec![self.expression()?];
                loop {
                    self.skip_whitespace();
                    match self.peek() {
                        Some(b',') => {
                            self.finger += 1;
                            items.push(self.expression()?);
                        }
                        Some(b')') => {
                            self.finger += 1;
                            break;
                        }
                        _ => return Err(self.error("expected ',' or ')'")),
                    }
                }
                if name == "all" {
                    Ok(Guard::All(items))
                } else {
                    Ok(Guard::Any(items))
                }
            }
            _ => Ok(Guard::Flag(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_parse_shapes() {
        assert_eq!(Guard::parse("with_python").unwrap(), Guard::Flag("with_python".into()));
        assert_eq!(
            Guard::parse("not with_python").unwrap(),
            Guard::Not(Box::new(Guard::Flag("with_python".into())))
        );
        assert_eq!(
            Guard::parse("all(a, b)").unwrap(),
            Guard::All(vec![Guard::Flag("a".into()), Guard::Flag("b".into())])
        );
        assert_eq!(
            Guard::parse("any(a, not(b))").unwrap(),
            Guard::Any(vec![
                Guard::Flag("a".into()),
                Guard::Not(Box::new(Guard::Flag("b".into()))),
            ])
        );
    }

    #[test]
    fn test_guard_parse_rejects_trailing_input() {
        assert!(Guard::parse("a b").is_err());
        assert!(Guard::parse("all(a,)").is_err());
        assert!(Guard::parse("").is_err());
    }

    #[test]
    fn test_guard_display_round_trip() {
        let guard = Guard::parse("all(a, not(b), any(c, d))").unwrap();
        assert_eq!(guard.to_string(), "all(a, not(b), any(c, d))");
    }
}
