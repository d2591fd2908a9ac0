//! Fragment composition.
//! Expands an ordered list of fragments and concatenates the results
//! byte-for-byte; the composer inserts no separators of its own.

use crate::config::VariableMap;
use crate::error::Result;
use crate::loader::TemplateLoader;
use crate::manifest::{Fragment, Guard};
use crate::render::render;
use log::debug;

/// Expands each fragment in declared order and appends the results.
///
/// Fragments carrying their own guard are skipped when the guard is false.
/// The output equals the concatenation of the individual expansions.
pub fn compose(
    loader: &TemplateLoader,
    fragments: &[Fragment],
    variables: &VariableMap,
) -> Result<String> {
    let mut output = String::new();

    for fragment in fragments {
        if let Some(expression) = fragment.when() {
            if !Guard::parse(expression)?.eval(variables)? {
                debug!("Skipping fragment '{}': guard '{}' is false", fragment.path(), expression);
                continue;
            }
        }
        debug!("Composing fragment '{}'", fragment.path());
        let source = loader.load(fragment.path())?;
        output.push_str(&render(fragment.path(), &source, variables)?);
    }

    Ok(output)
}
