// ============================
// crates/backend-lib/src/guard/mod.rs
// ============================
//! Request guard for the `/api/auth` operations.
//!
//! The guard runs before a request body is handed to the [`AuthService`].
//! Each guarded operation owns an ordered list of field checks; the first
//! failing check rejects the request with the schema's message. Operations
//! without checks pass through untouched.
//!
//! [`AuthService`]: crate::auth::AuthService

use metrics::counter;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::debug;

use crate::metrics::GUARD_REJECTED;
use crate::validation::{Schemas, ValidationError, ValidationResult};

/// Operations understood by the auth endpoints, keyed by their path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthOperation {
    SignUpEmail,
    SignInEmail,
    SignOut,
    RequestPasswordReset,
    ResetPassword,
    ChangePassword,
    UpdateUser,
    ChangeEmail,
    VerifyEmailChange,
}

impl AuthOperation {
    /// Resolve an operation from a path such as `/sign-up/email`
    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            "/sign-up/email" => Some(Self::SignUpEmail),
            "/sign-in/email" => Some(Self::SignInEmail),
            "/sign-out" => Some(Self::SignOut),
            "/request-password-reset" | "/forget-password" => Some(Self::RequestPasswordReset),
            "/reset-password" => Some(Self::ResetPassword),
            "/change-password" => Some(Self::ChangePassword),
            "/update-user" => Some(Self::UpdateUser),
            "/change-email" => Some(Self::ChangeEmail),
            "/verify-email-change" => Some(Self::VerifyEmailChange),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SignUpEmail => "sign-up-email",
            Self::SignInEmail => "sign-in-email",
            Self::SignOut => "sign-out",
            Self::RequestPasswordReset => "request-password-reset",
            Self::ResetPassword => "reset-password",
            Self::ChangePassword => "change-password",
            Self::UpdateUser => "update-user",
            Self::ChangeEmail => "change-email",
            Self::VerifyEmailChange => "verify-email-change",
        }
    }
}

/// A single check applied to a request body
#[derive(Debug, Clone, Copy)]
enum FieldCheck {
    /// Name schema on the field, when present
    Name(&'static str),
    /// Email schema on the field, when present
    Email(&'static str),
    /// Password schema on the first present field among the candidates
    Password(&'static [&'static str]),
    /// Non-empty string, when present
    Required(&'static str, &'static str),
}

/// Validation pipeline keyed by operation
#[derive(Debug, Clone)]
pub struct RequestGuard {
    schemas: Schemas,
    stages: HashMap<AuthOperation, Vec<FieldCheck>>,
}

impl RequestGuard {
    /// Build the pipeline around a set of schemas
    pub fn new(schemas: Schemas) -> Self {
        let mut stages = HashMap::new();
        stages.insert(
            AuthOperation::SignUpEmail,
            vec![
                FieldCheck::Name("name"),
                FieldCheck::Email("email"),
                FieldCheck::Password(&["password"]),
            ],
        );
        // Strength is enforced when a password is set, sign-in only needs one
        stages.insert(
            AuthOperation::SignInEmail,
            vec![
                FieldCheck::Email("email"),
                FieldCheck::Required("password", "Password is required"),
            ],
        );
        stages.insert(
            AuthOperation::ResetPassword,
            vec![FieldCheck::Password(&["password", "newPassword"])],
        );
        stages.insert(
            AuthOperation::ChangePassword,
            vec![FieldCheck::Password(&["password", "newPassword"])],
        );
        stages.insert(AuthOperation::ChangeEmail, vec![FieldCheck::Email("newEmail")]);

        Self { schemas, stages }
    }

    /// The schemas this guard evaluates
    pub fn schemas(&self) -> &Schemas {
        &self.schemas
    }

    /// Check a request body for the operation at `path`.
    ///
    /// Unknown paths and operations without checks always pass.
    pub fn check(&self, path: &str, body: &Map<String, Value>) -> ValidationResult<()> {
        let Some(operation) = AuthOperation::from_path(path) else {
            return Ok(());
        };
        self.check_operation(operation, body)
    }

    /// Check a request body for an already resolved operation
    pub fn check_operation(
        &self,
        operation: AuthOperation,
        body: &Map<String, Value>,
    ) -> ValidationResult<()> {
        let Some(checks) = self.stages.get(&operation) else {
            return Ok(());
        };

        for check in checks {
            if let Err(err) = self.apply(*check, body) {
                counter!(GUARD_REJECTED, "operation" => operation.as_str()).increment(1);
                debug!(operation = operation.as_str(), reason = %err, "request rejected by guard");
                return Err(err);
            }
        }

        Ok(())
    }

    fn apply(&self, check: FieldCheck, body: &Map<String, Value>) -> ValidationResult<()> {
        match check {
            FieldCheck::Name(field) => match present(body, field) {
                Some(value) => {
                    let name = as_str(value, || {
                        ValidationError::InvalidName("Name must be a string".to_string())
                    })?;
                    self.schemas.name.check(name)
                },
                None => Ok(()),
            },
            FieldCheck::Email(field) => match present(body, field) {
                Some(value) => {
                    let email = as_str(value, || {
                        ValidationError::InvalidEmail("Email must be a string".to_string())
                    })?;
                    self.schemas.email.check(email)
                },
                None => Ok(()),
            },
            FieldCheck::Password(candidates) => {
                match candidates.iter().find_map(|field| present(body, field)) {
                    Some(value) => {
                        let password = as_str(value, || {
                            ValidationError::InvalidPassword(
                                "Password must be a string".to_string(),
                            )
                        })?;
                        self.schemas.password.check(password)
                    },
                    None => Ok(()),
                }
            },
            FieldCheck::Required(field, message) => match present(body, field) {
                Some(Value::String(s)) if !s.is_empty() => Ok(()),
                Some(_) => Err(ValidationError::InvalidPassword(message.to_string())),
                None => Ok(()),
            },
        }
    }
}

impl Default for RequestGuard {
    fn default() -> Self {
        Self::new(Schemas::default())
    }
}

/// A field counts as present unless it is missing or `null`
fn present<'a>(body: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    body.get(field).filter(|v| !v.is_null())
}

fn as_str(
    value: &Value,
    mismatch: impl FnOnce() -> ValidationError,
) -> ValidationResult<&str> {
    value.as_str().ok_or_else(mismatch)
}
