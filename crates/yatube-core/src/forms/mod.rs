//! Form binding and validation.
//!
//! Handlers collect the submitted fields and files into [`FormData`]; each
//! form's `clean` turns that into typed values or per-field [`FormErrors`].

mod account;
mod comment;
mod post;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::ports::UploadedFile;

pub use account::{
    LoginForm, PasswordChangeForm, PasswordResetForm, SetPasswordForm, SignupForm,
    USERNAME_TAKEN, WRONG_OLD_PASSWORD, validate_password,
};
pub use comment::{CleanedComment, CommentForm};
pub use post::{CleanedPost, IMAGE_UPLOAD_TO, PostForm, is_image};

pub const REQUIRED: &str = "This field is required.";

/// Key for errors that do not belong to a single field.
pub const NON_FIELD_ERRORS: &str = "__all__";

/// Submitted form fields and uploaded files.
#[derive(Debug, Clone, Default)]
pub struct FormData {
    fields: BTreeMap<String, String>,
    files: BTreeMap<String, UploadedFile>,
}

impl FormData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert_field(name, value);
        self
    }

    pub fn with_file(mut self, name: impl Into<String>, file: UploadedFile) -> Self {
        self.insert_file(name, file);
        self
    }

    pub fn insert_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn insert_file(&mut self, name: impl Into<String>, file: UploadedFile) {
        self.files.insert(name.into(), file);
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.files.get(name)
    }

    /// Field values, used to re-render a bound form.
    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.files.is_empty()
    }

    /// A trimmed, non-empty value or a "required" error.
    fn required(&self, name: &str, errors: &mut FormErrors) -> Option<String> {
        match self.field(name).map(str::trim) {
            Some(value) if !value.is_empty() => Some(value.to_string()),
            _ => {
                errors.add(name, REQUIRED);
                None
            }
        }
    }

    /// Like [`FormData::required`] but keeps surrounding whitespace.
    fn required_raw(&self, name: &str, errors: &mut FormErrors) -> Option<String> {
        match self.field(name) {
            Some(value) if !value.is_empty() => Some(value.to_string()),
            _ => {
                errors.add(name, REQUIRED);
                None
            }
        }
    }
}

/// Validation errors keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn into_inner(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }

    /// `Ok(value)` when no error was recorded.
    pub fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, FormErrors> {
        if self.is_empty() { Ok(value()) } else { Err(self) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_trims_whitespace() {
        let data = FormData::new().with_field("text", "   ");
        let mut errors = FormErrors::new();
        assert_eq!(data.required("text", &mut errors), None);
        assert_eq!(errors.get("text"), Some(&[REQUIRED.to_string()][..]));
    }

    #[test]
    fn test_errors_accumulate_per_field() {
        let mut errors = FormErrors::new();
        errors.add("password2", "first");
        errors.add("password2", "second");
        assert_eq!(errors.get("password2").map(<[String]>::len), Some(2));
        assert!(errors.into_result(|| ()).is_err());
    }
}
