//! Forms behind signup, login and the password change / reset flows.

use super::{FormData, FormErrors, NON_FIELD_ERRORS};

pub const PASSWORD_MISMATCH: &str = "The two password fields didn’t match.";
pub const PASSWORD_TOO_SHORT: &str =
    "This password is too short. It must contain at least 8 characters.";
pub const PASSWORD_NUMERIC: &str = "This password is entirely numeric.";
pub const PASSWORD_SIMILAR: &str = "The password is too similar to the username.";
pub const INVALID_USERNAME: &str = "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";
pub const USERNAME_TAKEN: &str = "A user with that username already exists.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const INVALID_LOGIN: &str = "Please enter a correct username and password. Note that both fields may be case-sensitive.";
pub const WRONG_OLD_PASSWORD: &str =
    "Your old password was entered incorrectly. Please enter it again.";

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_USERNAME_LENGTH: usize = 150;

/// Problems with a proposed password; empty when it is acceptable.
pub fn validate_password(password: &str, username: &str) -> Vec<&'static str> {
    let mut problems = Vec::new();
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        problems.push(PASSWORD_TOO_SHORT);
    }
    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        problems.push(PASSWORD_NUMERIC);
    }
    if !username.is_empty() && password.eq_ignore_ascii_case(username) {
        problems.push(PASSWORD_SIMILAR);
    }
    problems
}

fn is_valid_username(username: &str) -> bool {
    username.chars().count() <= MAX_USERNAME_LENGTH
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && domain.contains('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// Check `password1`/`password2` and return the new password.
fn clean_new_password_pair(
    data: &FormData,
    first: &str,
    second: &str,
    username: &str,
    errors: &mut FormErrors,
) -> Option<String> {
    let password1 = data.required_raw(first, errors);
    let password2 = data.required_raw(second, errors);
    let (Some(password1), Some(password2)) = (password1, password2) else {
        return None;
    };

    if password1 != password2 {
        errors.add(second, PASSWORD_MISMATCH);
        return None;
    }
    let problems = validate_password(&password2, username);
    if !problems.is_empty() {
        for problem in problems {
            errors.add(second, problem);
        }
        return None;
    }
    Some(password2)
}

/// Cleaned signup data. Username uniqueness is checked against the store by
/// the caller.
#[derive(Debug, Clone)]
pub struct SignupForm {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: String,
}

impl SignupForm {
    pub fn clean(data: &FormData) -> Result<Self, FormErrors> {
        let mut errors = FormErrors::new();

        let username = data.required("username", &mut errors);
        if username.as_deref().is_some_and(|name| !is_valid_username(name)) {
            errors.add("username", INVALID_USERNAME);
        }

        let email = data.field("email").unwrap_or_default().trim().to_string();
        if !email.is_empty() && !is_valid_email(&email) {
            errors.add("email", INVALID_EMAIL);
        }

        let password = clean_new_password_pair(
            data,
            "password1",
            "password2",
            username.as_deref().unwrap_or_default(),
            &mut errors,
        );

        errors.into_result(|| Self {
            username: username.unwrap_or_default(),
            email,
            first_name: data.field("first_name").unwrap_or_default().trim().to_string(),
            last_name: data.field("last_name").unwrap_or_default().trim().to_string(),
            password: password.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    pub fn clean(data: &FormData) -> Result<Self, FormErrors> {
        let mut errors = FormErrors::new();
        let username = data.required("username", &mut errors);
        let password = data.required_raw("password", &mut errors);

        errors.into_result(|| Self {
            username: username.unwrap_or_default(),
            password: password.unwrap_or_default(),
        })
    }

    /// Errors for a username/password pair that did not authenticate.
    pub fn invalid_login() -> FormErrors {
        let mut errors = FormErrors::new();
        errors.add(NON_FIELD_ERRORS, INVALID_LOGIN);
        errors
    }
}

/// New password chosen through the reset link.
#[derive(Debug, Clone)]
pub struct SetPasswordForm {
    pub new_password: String,
}

impl SetPasswordForm {
    pub fn clean(data: &FormData, username: &str) -> Result<Self, FormErrors> {
        let mut errors = FormErrors::new();
        let new_password = clean_new_password_pair(
            data,
            "new_password1",
            "new_password2",
            username,
            &mut errors,
        );
        errors.into_result(|| Self {
            new_password: new_password.unwrap_or_default(),
        })
    }
}

/// Password change for a logged-in user. The old password is verified
/// against the stored hash by the caller.
#[derive(Debug, Clone)]
pub struct PasswordChangeForm {
    pub old_password: String,
    pub new_password: String,
}

impl PasswordChangeForm {
    pub fn clean(data: &FormData, username: &str) -> Result<Self, FormErrors> {
        let mut errors = FormErrors::new();
        let old_password = data.required_raw("old_password", &mut errors);
        let new_password = clean_new_password_pair(
            data,
            "new_password1",
            "new_password2",
            username,
            &mut errors,
        );
        errors.into_result(|| Self {
            old_password: old_password.unwrap_or_default(),
            new_password: new_password.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct PasswordResetForm {
    pub email: String,
}

impl PasswordResetForm {
    pub fn clean(data: &FormData) -> Result<Self, FormErrors> {
        let mut errors = FormErrors::new();
        let email = data.required("email", &mut errors);
        if email.as_deref().is_some_and(|email| !is_valid_email(email)) {
            errors.add("email", INVALID_EMAIL);
        }
        errors.into_result(|| Self {
            email: email.unwrap_or_default(),
        })
    }
}
