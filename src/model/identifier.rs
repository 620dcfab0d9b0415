use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::ValidationIssue;

static IDENTIFIER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_]\w*$").expect("Invalid regex pattern for identifiers")
});

/// True when `name` is a valid identifier (`^[A-Za-z_]\w*$`)
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name)
}

/// Validate a name that must be a non-empty identifier.
///
/// `what` names the thing being validated ("Stream", "Enum", "Attribute", ...)
/// and ends up in the issue message.
pub fn validate_identifier(name: &str, what: &'static str) -> Result<(), ValidationIssue> {
    if name.trim().is_empty() {
        return Err(ValidationIssue::EmptyName(what));
    }
    if !is_identifier(name) {
        return Err(ValidationIssue::InvalidCharacters(what));
    }
    Ok(())
}
