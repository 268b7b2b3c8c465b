//! Shared record-validation error type.
//!
//! The owner/meeting/server/command records pulled out of the broker are
//! untyped JSON (the broker stores whatever the config loader or an operator
//! wrote); every component that reads one back validates it against the
//! schema it expects before acting on it. [`ValidationError`] is the common
//! shape those checks report, regardless of which record kind failed.

use thiserror::Error;

/// A record failed validation against its expected schema.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was absent.
    #[error("missing required field `{field}`")]
    MissingField {
        /// Dotted path of the missing field, e.g. `owner.email`.
        field: String,
    },

    /// A field was present but did not satisfy its constraint.
    #[error("field `{field}` is invalid: {reason}")]
    InvalidField {
        /// Dotted path of the offending field.
        field: String,
        /// Human-readable reason, e.g. "not a valid email address".
        reason: String,
    },

    /// A field that must refer to the future was in the past.
    #[error("field `{field}` must be in the future")]
    NotInFuture {
        /// Dotted path of the offending field.
        field: String,
    },
}

impl ValidationError {
    /// Build a [`ValidationError::MissingField`] for the given dotted path.
    #[must_use]
    pub fn missing(field: impl Into<String>) -> Self {
        Self::MissingField {
            field: field.into(),
        }
    }

    /// Build a [`ValidationError::InvalidField`] for the given dotted path.
    #[must_use]
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Validate that a string is non-empty after trimming, lower-casing it in
/// place — matches the owner schema's `required, lowerstrip` email rule.
///
/// Returns the normalized value on success.
pub fn require_lowercase_trimmed(
    field: &str,
    value: Option<&str>,
) -> Result<String, ValidationError> {
    let value = value.ok_or_else(|| ValidationError::missing(field))?;
    let normalized = value.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(ValidationError::missing(field));
    }
    Ok(normalized)
}

/// Very small email-shape check: a non-empty local part, an `@`, and a
/// non-empty domain part. Mirrors the original `is_email` schema check,
/// which deliberately did not attempt full RFC 5322 validation.
#[must_use]
pub fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && domain.contains('.'),
        None => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn require_lowercase_trimmed_normalizes() {
        let value = require_lowercase_trimmed("owner.email", Some("  Alice@Example.COM  "))
            .expect("valid");
        assert_eq!(value, "alice@example.com");
    }

    #[test]
    fn require_lowercase_trimmed_rejects_missing() {
        let err = require_lowercase_trimmed("owner.email", None).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField {
                field: "owner.email".to_string()
            }
        );
    }

    #[test]
    fn require_lowercase_trimmed_rejects_blank() {
        let err = require_lowercase_trimmed("owner.email", Some("   ")).unwrap_err();
        assert!(matches!(err, ValidationError::MissingField { .. }));
    }

    #[test]
    fn looks_like_email_accepts_plausible_addresses() {
        assert!(looks_like_email("alice@example.com"));
        assert!(!looks_like_email("alice@localhost"));
        assert!(!looks_like_email("not-an-email"));
        assert!(!looks_like_email("@example.com"));
    }
}
