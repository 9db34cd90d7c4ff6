// =========================
// tests/unit/guard_tests.rs
// =========================
//! Request guard behaviour through the public API
use backend_lib::guard::{AuthOperation, RequestGuard};
use backend_lib::validation::{PasswordRequirements, Schemas, ValidationError};
use serde_json::{json, Map, Value};

fn body(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

fn message(result: Result<(), ValidationError>) -> String {
    result.unwrap_err().to_string()
}

#[test]
fn test_weak_sign_up_passwords_report_first_failure() {
    let guard = RequestGuard::default();
    let cases = [
        ("Ab1!", "Password must be at least 8 characters"),
        ("password123!", "Password must contain at least one uppercase letter"),
        ("PASSWORD123!", "Password must contain at least one lowercase letter"),
        ("Password!!!!", "Password must contain at least one number"),
        ("Password1234", "Password must contain at least one special character"),
    ];

    for (password, expected) in cases {
        let req = body(json!({
            "name": "Ada",
            "email": "ada@example.com",
            "password": password,
        }));
        assert_eq!(message(guard.check("/sign-up/email", &req)), expected);
    }
}

#[test]
fn test_sign_up_with_every_field_invalid_reports_name() {
    let guard = RequestGuard::default();
    let req = body(json!({ "name": "", "email": "nope", "password": "x" }));
    assert_eq!(
        guard.check("/sign-up/email", &req),
        Err(ValidationError::InvalidName("Name is required".to_string()))
    );
}

#[test]
fn test_configured_schemas_are_used() {
    let requirements = PasswordRequirements {
        min_length: 6,
        require_special: false,
        ..PasswordRequirements::default()
    };
    let guard = RequestGuard::new(Schemas::new(10, requirements));

    let ok = body(json!({ "name": "Ada", "password": "Abcde1" }));
    assert!(guard.check("/sign-up/email", &ok).is_ok());

    let long_name = body(json!({ "name": "Ada Lovelace Byron" }));
    assert_eq!(
        message(guard.check("/sign-up/email", &long_name)),
        "Name must be at most 10 characters"
    );
}

#[test]
fn test_change_password_uses_new_password_field() {
    let guard = RequestGuard::default();
    let weak = body(json!({ "currentPassword": "anything", "newPassword": "short" }));
    assert_eq!(
        message(guard.check_operation(AuthOperation::ChangePassword, &weak)),
        "Password must be at least 8 characters"
    );

    // The current password is never strength-checked
    let ok = body(json!({ "currentPassword": "x", "newPassword": "NewPassword456!" }));
    assert!(guard
        .check_operation(AuthOperation::ChangePassword, &ok)
        .is_ok());
}

#[test]
fn test_unguarded_operations_accept_anything() {
    let guard = RequestGuard::default();
    let req = body(json!({ "email": 42, "password": null, "name": [] }));
    for operation in [
        AuthOperation::SignOut,
        AuthOperation::RequestPasswordReset,
        AuthOperation::UpdateUser,
        AuthOperation::VerifyEmailChange,
    ] {
        assert!(guard.check_operation(operation, &req).is_ok());
    }
}

#[test]
fn test_forget_password_alias() {
    assert_eq!(
        AuthOperation::from_path("/forget-password"),
        Some(AuthOperation::RequestPasswordReset)
    );
}
