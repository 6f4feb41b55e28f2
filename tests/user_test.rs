use icd_provider::validation::{DatabaseUser, UserType};

fn database(password: &str) -> DatabaseUser {
    DatabaseUser::new("testy", password, UserType::Database)
}

fn ops_manager(password: &str) -> DatabaseUser {
    DatabaseUser::new("testy", password, UserType::OpsManager)
}

// ─── Passwords ───────────────────────────────────────────────────────────────

#[test]
fn test_password_without_number_fails_only_digit_rule() {
    let err = database("pizzapizzapizza").validate_password().unwrap_err();
    assert_eq!(
        err.to_string(),
        "database user (testy) validation error:\npassword must contain at least one number"
    );
}

#[test]
fn test_password_with_leading_special_reports_every_violation() {
    let err = database("-_pizzapizzapizza").validate_password().unwrap_err();
    assert_eq!(
        err.violations,
        vec![
            "password must not begin with a special character (~!@#$%^&*()=+[]{}|;:,.<>/?_-)",
            "password must contain at least one number",
        ]
    );
}

#[test]
fn test_ops_manager_password_with_special_character_passes() {
    assert!(ops_manager("password12345678$password").validate_password().is_ok());
}

#[test]
fn test_ops_manager_password_requires_special_character() {
    let err = ops_manager("password12345678password").validate_password().unwrap_err();
    assert_eq!(
        err.violations,
        vec!["password must contain at least one special character (~!@#$%^&*()=+[]{}|;:,.<>/?_-)"]
    );
}

#[test]
fn test_ops_manager_may_begin_with_special_character() {
    assert!(ops_manager("$password12345678").validate_password().is_ok());
}

#[test]
fn test_single_special_character_fails_several_rules() {
    let err = database("$").validate_password().unwrap_err();
    assert_eq!(
        err.to_string(),
        "database user (testy) validation error:\n\
         password must not begin with a special character (~!@#$%^&*()=+[]{}|;:,.<>/?_-)\n\
         password must contain at least one letter\n\
         password must contain at least one number"
    );
}

#[test]
fn test_password_with_invalid_characters() {
    let err = database("secure password 123").validate_password().unwrap_err();
    assert_eq!(err.violations, vec!["password must not contain invalid characters"]);

    let err = database("pässword123").validate_password().unwrap_err();
    assert_eq!(err.violations, vec!["password must not contain invalid characters"]);
}

#[test]
fn test_uppercase_letters_satisfy_letter_rule() {
    assert!(database("PASSWORD12345678").validate_password().is_ok());
}

#[test]
fn test_other_user_types_skip_type_specific_rules() {
    let user = DatabaseUser::new("replica", "-password1", UserType::from("read_only_replica"));
    assert!(user.validate_password().is_ok());
}

// ─── Redis RBAC roles ────────────────────────────────────────────────────────

#[test]
fn test_rbac_role_without_at_sign_fails_format() {
    let err = database("Password12345").with_role("+admin -all").validate_rbac_role().unwrap_err();
    assert_eq!(
        err.violations,
        vec!["role must be in the format +@category or -@category"]
    );
}

#[test]
fn test_rbac_role_with_unknown_categories() {
    let err = database("Password12345")
        .with_role("+@catfood -@dogfood")
        .validate_rbac_role()
        .unwrap_err();
    assert_eq!(
        err.violations,
        vec!["role must contain only allowed categories: all, admin, read, write"]
    );
}

#[test]
fn test_rbac_role_with_allowed_categories() {
    let user = database("Password12345").with_role("-@all +@read");
    assert!(user.validate_rbac_role().is_ok());
    assert!(database("Password12345").with_role("+@write").validate_rbac_role().is_ok());
}

#[test]
fn test_rbac_role_only_for_database_users() {
    let err = ops_manager("Password12345$")
        .with_role("-@all +@read")
        .validate_rbac_role()
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "database user (testy) validation error:\nrole is only allowed for the database user"
    );
}

#[test]
fn test_missing_or_empty_role_always_passes() {
    assert!(database("Password12345").validate_rbac_role().is_ok());
    assert!(database("Password12345").with_role("").validate_rbac_role().is_ok());
    assert!(ops_manager("Password12345$").validate_rbac_role().is_ok());
}

// ─── Ops Manager roles ───────────────────────────────────────────────────────

#[test]
fn test_ops_manager_role_must_be_known() {
    assert!(ops_manager("Password12345$")
        .with_role("group_read_only")
        .validate_ops_manager_role()
        .is_ok());
    assert!(ops_manager("Password12345$")
        .with_role("group_data_access_admin")
        .validate_ops_manager_role()
        .is_ok());

    let err = ops_manager("Password12345$")
        .with_role("group_owner")
        .validate_ops_manager_role()
        .unwrap_err();
    assert_eq!(
        err.violations,
        vec!["role must be one of: group_read_only, group_data_access_admin"]
    );
}

#[test]
fn test_ops_manager_role_ignored_for_database_users() {
    assert!(database("Password12345")
        .with_role("-@all")
        .validate_ops_manager_role()
        .is_ok());
}

#[test]
fn test_validation_is_repeatable() {
    let user = database("-_pizzapizzapizza");
    assert_eq!(user.validate_password(), user.validate_password());
}

#[test]
fn test_rbac_role_with_non_ascii_category_fails_format() {
    let err = database("Password12345").with_role("+@café").validate_rbac_role().unwrap_err();
    assert_eq!(
        err.violations,
        vec!["role must be in the format +@category or -@category"]
    );
}

#[test]
fn test_rbac_role_with_bad_grammar_reports_only_format() {
    let err = database("Password12345")
        .with_role("+@catfood, +@read")
        .validate_rbac_role()
        .unwrap_err();
    assert_eq!(
        err.violations,
        vec!["role must be in the format +@category or -@category"]
    );
}
