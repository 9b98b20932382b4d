//! Input validation for account identifiers
//!
//! Usernames and emails are case-normalised (trimmed, lowercase) before they
//! reach the identity store. Fields are private to force validation through
//! the public constructors.

use std::fmt;

// ============================================================================
// Validation Errors
// ============================================================================

/// Validation errors for account fields
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("Invalid length for {field}: expected {min}-{max}, got {actual}")]
    InvalidLength {
        field: &'static str,
        min: usize,
        max: usize,
        actual: usize,
    },

    #[error("Invalid format for {field}: '{value}' (expected: {expected})")]
    InvalidFormat {
        field: &'static str,
        value: String,
        expected: &'static str,
    },
}

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 30;
pub const EMAIL_MAX_LEN: usize = 254;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 128;

// ============================================================================
// Username
// ============================================================================

/// Validated username (trimmed, lowercase)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Username(String);

impl Username {
    /// # Validation Rules
    /// - Trimmed and lowercased first
    /// - Length: 3-30 characters
    /// - Only a-z, 0-9, `_`, `.`, `-`
    ///
    /// # Examples
    /// ```
    /// use media_accounts::account::validation::Username;
    ///
    /// let name = Username::new("  Alice_01 ").unwrap();
    /// assert_eq!(name.as_str(), "alice_01");
    ///
    /// assert!(Username::new("al ice").is_err());
    /// ```
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let name = raw.trim().to_lowercase();

        if name.is_empty() {
            return Err(ValidationError::Required { field: "username" });
        }

        let len = name.chars().count();
        if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
            return Err(ValidationError::InvalidLength {
                field: "username",
                min: USERNAME_MIN_LEN,
                max: USERNAME_MAX_LEN,
                actual: len,
            });
        }

        if !name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '.' | '-'))
        {
            return Err(ValidationError::InvalidFormat {
                field: "username",
                value: name,
                expected: "letters, numbers, '_', '.', '-' only",
            });
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Email
// ============================================================================

/// Validated email address (trimmed, lowercase)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Email(String);

impl Email {
    /// Deliberately shallow: one `@`, non-empty local part, a dot in the domain.
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        let email = raw.trim().to_lowercase();

        if email.is_empty() {
            return Err(ValidationError::Required { field: "email" });
        }

        if email.len() > EMAIL_MAX_LEN {
            return Err(ValidationError::InvalidLength {
                field: "email",
                min: 3,
                max: EMAIL_MAX_LEN,
                actual: email.len(),
            });
        }

        let valid = match email.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.contains('@')
                    && domain.contains('.')
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && !email.chars().any(char::is_whitespace)
            }
            None => false,
        };

        if !valid {
            return Err(ValidationError::InvalidFormat {
                field: "email",
                value: email,
                expected: "local@domain.tld",
            });
        }

        Ok(Self(email))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Free-form fields
// ============================================================================

/// Trim and require a non-blank value
pub fn require_non_blank(field: &'static str, raw: &str) -> Result<String, ValidationError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ValidationError::Required { field });
    }
    Ok(value.to_string())
}

/// Check plaintext password length. The value itself is never echoed back.
pub fn check_password(field: &'static str, plaintext: &str) -> Result<(), ValidationError> {
    if plaintext.trim().is_empty() {
        return Err(ValidationError::Required { field });
    }
    let len = plaintext.chars().count();
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
        return Err(ValidationError::InvalidLength {
            field,
            min: PASSWORD_MIN_LEN,
            max: PASSWORD_MAX_LEN,
            actual: len,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_normalised() {
        assert_eq!(Username::new("  ChAnNeL.One ").unwrap().as_str(), "channel.one");
    }

    #[test]
    fn test_username_rejects_bad_chars() {
        assert!(matches!(
            Username::new("bad name"),
            Err(ValidationError::InvalidFormat { .. })
        ));
        assert!(Username::new("emoji🙂").is_err());
    }

    #[test]
    fn test_username_length() {
        assert!(matches!(
            Username::new("ab"),
            Err(ValidationError::InvalidLength { actual: 2, .. })
        ));
        assert!(Username::new(&"a".repeat(31)).is_err());
        assert!(Username::new(&"a".repeat(30)).is_ok());
    }

    #[test]
    fn test_username_blank_is_required() {
        assert_eq!(
            Username::new("   "),
            Err(ValidationError::Required { field: "username" })
        );
    }

    #[test]
    fn test_email_normalised() {
        assert_eq!(
            Email::new(" Viewer@Example.COM ").unwrap().as_str(),
            "viewer@example.com"
        );
    }

    #[test]
    fn test_email_rejects_malformed() {
        for bad in ["plain", "@example.com", "a@b", "a@@b.com", "a@.com", "a b@c.com"] {
            assert!(Email::new(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_require_non_blank() {
        assert_eq!(require_non_blank("fullname", "  Jo  ").unwrap(), "Jo");
        assert!(require_non_blank("fullname", " ").is_err());
    }

    #[test]
    fn test_check_password() {
        assert!(check_password("password", "longenough").is_ok());
        assert!(matches!(
            check_password("password", "short"),
            Err(ValidationError::InvalidLength { .. })
        ));
        assert_eq!(
            check_password("password", "        "),
            Err(ValidationError::Required { field: "password" })
        );
    }
}
