//! Placeholder substitution against the project variable map.

use crate::config::VariableMap;
use crate::error::{Error, Result};
use crate::lexer::{Lexer, Token};

/// The closed set of case modifiers recognized in placeholders.
///
/// Extending this set is a deliberate code change; modifiers are never
/// user-defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    UpperCase,
    LowerCase,
}

impl Modifier {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "upper_case" => Some(Self::UpperCase),
            "lower_case" => Some(Self::LowerCase),
            _ => None,
        }
    }

    /// Applies the case transform. ASCII only: non-ASCII bytes pass through.
    pub fn apply(&self, value: &str) -> String {
        match self {
            Self::UpperCase => value.to_ascii_uppercase(),
            Self::LowerCase => value.to_ascii_lowercase(),
        }
    }
}

/// Expands a template source against the variable map.
///
/// Substitution is single-pass: if a substituted value itself contains
/// `${...}`, those bytes appear verbatim in the output. `template` is the
/// template path, used in diagnostics.
///
/// # Errors
/// * Lexing errors from the placeholder scanner
/// * `Error::UnknownVariable` if a name is not in the map
/// * `Error::UnknownModifier` if a modifier is outside the closed set
pub fn render(template: &str, source: &str, variables: &VariableMap) -> Result<String> {
    let mut output = String::with_capacity(source.len());

    for token in Lexer::new(template, source) {
        match token? {
            Token::Literal(text) => output.push_str(text),
            Token::Placeholder { name, modifier, span } => {
                let value = variables.get(name).ok_or_else(|| Error::UnknownVariable {
                    template: template.to_string(),
                    span,
                    name: name.to_string(),
                })?;
                match modifier {
                    None => output.push_str(value),
                    Some(modifier_name) => {
                        let modifier = Modifier::from_name(modifier_name).ok_or_else(|| {
                            Error::UnknownModifier {
                                template: template.to_string(),
                                span,
                                name: modifier_name.to_string(),
                            }
                        })?;
                        output.push_str(&modifier.apply(value));
                    }
                }
            }
        }
    }

    Ok(output)
}
