// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Field schemas for names, email addresses and passwords.
//!
//! A [`Schemas`] value is built once from configuration and never changes
//! afterwards. Both the request guard and the auth service evaluate the same
//! value, so a rule only has to be written down here.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;

/// Default upper bound for display names
pub const DEFAULT_NAME_MAX_LENGTH: usize = 50;
/// RFC 5321 SMTP limit
pub const MAX_EMAIL_LENGTH: usize = 254;
/// Default minimum password length
pub const MIN_PASSWORD_LENGTH: usize = 8;
/// Default maximum password length
pub const MAX_PASSWORD_LENGTH: usize = 128;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

/// Possible validation errors. The payload is the client-facing message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0}")]
    InvalidName(String),

    #[error("{0}")]
    InvalidEmail(String),

    #[error("{0}")]
    InvalidPassword(String),
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Password complexity requirements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordRequirements {
    pub min_length: usize,
    pub max_length: usize,
    pub require_uppercase: bool,
    pub require_lowercase: bool,
    pub require_digit: bool,
    pub require_special: bool,
}

impl Default for PasswordRequirements {
    fn default() -> Self {
        Self {
            min_length: MIN_PASSWORD_LENGTH,
            max_length: MAX_PASSWORD_LENGTH,
            require_uppercase: true,
            require_lowercase: true,
            require_digit: true,
            require_special: true,
        }
    }
}

/// Display name rules
#[derive(Debug, Clone)]
pub struct NameSchema {
    pub max_length: usize,
}

impl NameSchema {
    pub fn check(&self, name: &str) -> ValidationResult<()> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::InvalidName("Name is required".to_string()));
        }

        if trimmed.chars().count() > self.max_length {
            return Err(ValidationError::InvalidName(format!(
                "Name must be at most {} characters",
                self.max_length
            )));
        }

        Ok(())
    }
}

/// Email address rules
#[derive(Debug, Clone)]
pub struct EmailSchema {
    pub max_length: usize,
}

impl EmailSchema {
    pub fn check(&self, email: &str) -> ValidationResult<()> {
        if email.is_empty() {
            return Err(ValidationError::InvalidEmail("Email is required".to_string()));
        }

        if email.chars().count() > self.max_length {
            return Err(ValidationError::InvalidEmail(format!(
                "Email address cannot exceed {} characters",
                self.max_length
            )));
        }

        if !EMAIL_REGEX.is_match(email) {
            return Err(ValidationError::InvalidEmail(
                "Please enter a valid email address".to_string(),
            ));
        }

        Ok(())
    }
}

/// Password strength rules
#[derive(Debug, Clone)]
pub struct PasswordSchema {
    pub requirements: PasswordRequirements,
}

impl PasswordSchema {
    pub fn check(&self, password: &str) -> ValidationResult<()> {
        let req = &self.requirements;
        let length = password.chars().count();

        if length < req.min_length {
            return Err(ValidationError::InvalidPassword(format!(
                "Password must be at least {} characters",
                req.min_length
            )));
        }

        if length > req.max_length {
            return Err(ValidationError::InvalidPassword(format!(
                "Password cannot exceed {} characters",
                req.max_length
            )));
        }

        if req.require_uppercase && !password.chars().any(char::is_uppercase) {
            return Err(ValidationError::InvalidPassword(
                "Password must contain at least one uppercase letter".to_string(),
            ));
        }

        if req.require_lowercase && !password.chars().any(char::is_lowercase) {
            return Err(ValidationError::InvalidPassword(
                "Password must contain at least one lowercase letter".to_string(),
            ));
        }

        if req.require_digit && !password.chars().any(|c| c.is_ascii_digit()) {
            return Err(ValidationError::InvalidPassword(
                "Password must contain at least one number".to_string(),
            ));
        }

        if req.require_special && !password.chars().any(|c| !c.is_alphanumeric()) {
            return Err(ValidationError::InvalidPassword(
                "Password must contain at least one special character".to_string(),
            ));
        }

        Ok(())
    }
}

/// The full set of field schemas
#[derive(Debug, Clone)]
pub struct Schemas {
    pub name: NameSchema,
    pub email: EmailSchema,
    pub password: PasswordSchema,
}

impl Schemas {
    pub fn new(name_max_length: usize, requirements: PasswordRequirements) -> Self {
        Self {
            name: NameSchema {
                max_length: name_max_length,
            },
            email: EmailSchema {
                max_length: MAX_EMAIL_LENGTH,
            },
            password: PasswordSchema { requirements },
        }
    }
}

impl Default for Schemas {
    fn default() -> Self {
        Self::new(DEFAULT_NAME_MAX_LENGTH, PasswordRequirements::default())
    }
}

/// Normalize an email address for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
