//! Name validation.
//!
//! Valid names:
//! - Must contain at least one non-whitespace character
//! - Must not contain control characters (newlines, tabs, NUL, ...)
//! - Session names must not exceed [`MAX_NAME_LEN`] bytes
//! - Session names must not start or end with whitespace
//!
//! Query names are artifact labels. They grow by one lineage suffix per
//! derivation step and have no length bound.

use crate::error::{IndexError, IndexResult};
use crate::types::Namespace;

/// Upper bound on a session name's length in bytes.
pub const MAX_NAME_LEN: usize = 4096;

/// Validate a name for `namespace`, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use drift_index::{validate_name, Namespace};
///
/// assert!(validate_name(Namespace::Session, "castles").is_ok());
/// assert!(validate_name(Namespace::Query, "a fox -- upscale item[2]").is_ok());
/// assert!(validate_name(Namespace::Session, "").is_err());
/// assert!(validate_name(Namespace::Session, " padded ").is_err());
/// ```
pub fn validate_name(namespace: Namespace, name: &str) -> IndexResult<()> {
    let invalid = |reason: &str| IndexError::InvalidName {
        namespace,
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.trim().is_empty() {
        return Err(invalid("name must not be empty"));
    }
    if namespace == Namespace::Session && name.len() > MAX_NAME_LEN {
        return Err(invalid("name is too long"));
    }
    if let Some(ch) = name.chars().find(|c| c.is_control()) {
        return Err(invalid(&format!("contains control character {ch:?}")));
    }
    if namespace == Namespace::Session && name.trim() != name {
        return Err(invalid("must not start or end with whitespace"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_are_valid() {
        assert!(validate_name(Namespace::Session, "fox-study").is_ok());
        assert!(validate_name(Namespace::Session, "fox study 2").is_ok());
    }

    #[test]
    fn empty_and_blank_are_invalid() {
        assert!(validate_name(Namespace::Query, "").is_err());
        assert!(validate_name(Namespace::Query, "   ").is_err());
    }

    #[test]
    fn control_characters_are_invalid() {
        let err = validate_name(Namespace::Session, "two\nlines").unwrap_err();
        assert!(matches!(err, IndexError::InvalidName { .. }));
        assert!(validate_name(Namespace::Query, "tab\there").is_err());
    }

    #[test]
    fn padding_only_matters_for_sessions() {
        assert!(validate_name(Namespace::Session, " lead").is_err());
        assert!(validate_name(Namespace::Query, " lead").is_ok());
    }

    #[test]
    fn overlong_session_names_are_invalid() {
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(validate_name(Namespace::Session, &long).is_err());
    }

    #[test]
    fn deep_lineage_labels_are_valid_query_names() {
        let mut label = String::from("a fox in snow");
        for i in 0..500 {
            label.push_str(&format!(" -- diffuse item[{}] sr[0.5]", i % 4));
        }
        assert!(label.len() > MAX_NAME_LEN);
        assert!(validate_name(Namespace::Query, &label).is_ok());
    }
}
