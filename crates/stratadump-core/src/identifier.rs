//! Identifier validation and quoting.
//!
//! Table, column and constraint names come from catalog metadata and end up
//! interpolated into the generated script. They are only ever interpolated after
//! passing [`ensure_safe_identifier`]; anything else aborts the run.

use sqlparser::ast::Ident;

use crate::error::{BackupError, IdentifierKind};

/// Whether `name` is a plain SQL identifier: ASCII letters, digits and
/// underscores, not starting with a digit.
pub fn is_safe_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

pub fn ensure_safe_identifier(name: &str, kind: IdentifierKind) -> Result<&str, BackupError> {
    if is_safe_identifier(name) {
        Ok(name)
    } else {
        Err(BackupError::UnsafeIdentifier {
            kind,
            name: name.to_string(),
        })
    }
}

/// Wrap `name` in `quote`, doubling any embedded quote characters.
///
/// Used directly only for names that never reach the script (the schema in the
/// row-reading query); script identifiers go through
/// [`crate::types::Dialect::quote_identifier`].
pub fn quote_with(name: &str, quote: char) -> String {
    Ident::with_quote(quote, name).to_string()
}

/// Flatten text for use inside a `--` comment.
pub fn comment_text(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect()
}
