//! Error handling for the sourcegen application.
//! Defines the error taxonomy and results used throughout the generator.

use crate::constants::MAX_DIAGNOSTIC_WIDTH;
use crate::lexer::Span;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Custom error types for sourcegen operations.
///
/// Every failure the generator can produce is one of these kinds. Syntax and
/// resolution errors carry the template path and the source span of the
/// offending placeholder so diagnostics can point at the exact location.
#[derive(Error, Debug)]
pub enum Error {
    /// A `${` without a matching `}` before end of input
    #[error("{template}:{}:{}: unterminated placeholder: missing closing '}}'", .span.line, .span.column)]
    UnterminatedPlaceholder { template: String, span: Span },

    /// A placeholder with no name (`${}` or `${:modifier}`)
    #[error("{template}:{}:{}: empty placeholder name", .span.line, .span.column)]
    EmptyName { template: String, span: Span },

    /// A character outside `[A-Za-z0-9_]` inside a placeholder name or modifier
    #[error("{template}:{}:{}: invalid character {found:?} in placeholder name", .span.line, .span.column)]
    InvalidCharInName { template: String, span: Span, found: char },

    /// A placeholder naming a variable that is not in the variable map
    #[error("{template}:{}:{}: unknown variable: \"{name}\"", .span.line, .span.column)]
    UnknownVariable { template: String, span: Span, name: String },

    /// A placeholder modifier outside the closed set
    #[error("{template}:{}:{}: unknown modifier: \"{name}\"", .span.line, .span.column)]
    UnknownModifier { template: String, span: Span, name: String },

    /// A template path that does not exist under the template tree root
    #[error("template not found: '{}'", .path.display())]
    TemplateNotFound { path: PathBuf },

    /// A template or output path that would resolve outside its root
    #[error("path escapes root: '{}'", .path.display())]
    PathEscapesRoot { path: PathBuf },

    /// A template file that exists but could not be read
    #[error("failed to read template '{}': {source}", .path.display())]
    TemplateReadFailed { path: PathBuf, source: io::Error },

    /// An output file that could not be written
    #[error("failed to write output '{}': {source}", .path.display())]
    OutputWriteFailed { path: PathBuf, source: io::Error },

    /// An output parent directory that could not be created
    #[error("failed to create directory '{}': {source}", .path.display())]
    DirectoryCreateFailed { path: PathBuf, source: io::Error },

    /// Two manifest entries resolving to the same output path
    #[error("output path collision: '{}' is produced by both \"{first}\" and \"{second}\"", .path.display())]
    OutputPathCollision { path: PathBuf, first: String, second: String },

    /// A manifest entry with no fragments
    #[error("manifest entry \"{output}\" has an empty fragment list")]
    EmptyFragmentList { output: String },

    /// A guard expression that could not be parsed or evaluated
    #[error("guard \"{expression}\" failed: {message}")]
    GuardEvalFailed { expression: String, message: String },

    /// A project configuration or manifest document that could not be parsed
    #[error("failed to parse '{}': {message}", .path.display())]
    ConfigParseFailed { path: PathBuf, message: String },

    /// A required configuration field that is absent or empty
    #[error("missing required configuration field \"{field}\"")]
    MissingRequiredField { field: &'static str },

    /// Represents errors that occur during other file system operations
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

/// Convenience type alias for Results with sourcegen's Error type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Maps the error kind to the process exit code:
    /// 3 template/config, 4 I/O, 5 collision.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::OutputPathCollision { .. } => 5,
            Error::TemplateNotFound { .. }
            | Error::PathEscapesRoot { .. }
            | Error::TemplateReadFailed { .. }
            | Error::OutputWriteFailed { .. }
            | Error::DirectoryCreateFailed { .. }
            | Error::IoError(_) => 4,
            _ => 3,
        }
    }

    /// Returns the template path and source span for errors that point at a
    /// location in a template, for source-context reporting.
    pub fn template_span(&self) -> Option<(&str, Span)> {
        match self {
            Error::UnterminatedPlaceholder { template, span }
            | Error::EmptyName { template, span }
            | Error::InvalidCharInName { template, span, .. }
            | Error::UnknownVariable { template, span, .. }
            | Error::UnknownModifier { template, span, .. } => {
                Some((template.as_str(), *span))
            }
            _ => None,
        }
    }
}

/// Default error handler that prints the diagnostic and exits the program
/// with the error's mapped exit code.
pub fn default_error_handler(err: Error) -> ! {
    eprintln!("{}", err);
    std::process::exit(err.exit_code());
}

/// Renders the source line containing the span, with a caret underline.
///
/// The rendering ends with a newline. Lines wider than
/// [`MAX_DIAGNOSTIC_WIDTH`] columns produce an empty string instead.
pub fn source_highlight(source: &str, span: Span) -> String {
    use unicode_width::UnicodeWidthStr;

    let offset = span.offset.min(source.len());
    let start = source[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let end = source[offset..].find('\n').map(|i| offset + i).unwrap_or(source.len());
    let line = &source[start..end];
    if line.width() > MAX_DIAGNOSTIC_WIDTH {
        return String::new();
    }

    let spaces = source[start..offset].width();
    let span_end = (offset + span.len).min(end);
    let carets = source[offset..span_end].width().max(1);
    format!("  {}\n  {}{}\n", line, " ".repeat(spaces), "^".repeat(carets))
}
