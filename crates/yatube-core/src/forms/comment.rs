use super::{FormData, FormErrors};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedComment {
    pub text: String,
}

/// The comment form has a single required `text` field.
pub struct CommentForm;

impl CommentForm {
    pub fn clean(data: &FormData) -> Result<CleanedComment, FormErrors> {
        let mut errors = FormErrors::new();
        let text = data.required("text", &mut errors);

        errors.into_result(|| CleanedComment {
            text: text.unwrap_or_default(),
        })
    }
}
