//! Rendered pages and RFC 7807 error documents.

use serde::{Deserialize, Serialize};

/// A rendered page: the template name, the site-wide `year`, and the page's
/// own context flattened alongside them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rendered<C> {
    pub template: String,
    pub year: i32,
    #[serde(flatten)]
    pub context: C,
}

impl<C> Rendered<C> {
    pub fn new(template: impl Into<String>, year: i32, context: C) -> Self {
        Self {
            template: template.into(),
            year,
            context,
        }
    }
}

/// RFC 7807 Problem Details.
///
/// See: https://datatracker.ietf.org/doc/html/rfc7807
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// A URI reference that identifies the problem type.
    #[serde(rename = "type")]
    pub error_type: String,

    /// A short, human-readable summary of the problem type.
    pub title: String,

    /// The HTTP status code.
    pub status: u16,

    /// A human-readable explanation specific to this occurrence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// The request path that produced the problem.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
}

impl ErrorResponse {
    pub fn new(status: u16, title: impl Into<String>) -> Self {
        Self {
            error_type: "about:blank".to_string(),
            title: title.into(),
            status,
            detail: None,
            instance: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(400, "Bad Request").with_detail(detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(404, "Not Found").with_detail(detail)
    }

    pub fn payload_too_large(detail: impl Into<String>) -> Self {
        Self::new(413, "Payload Too Large").with_detail(detail)
    }

    pub fn internal_error() -> Self {
        Self::new(500, "Internal Server Error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendered_flattens_context() {
        #[derive(Serialize)]
        struct Ctx {
            is_edit: bool,
        }

        let page = Rendered::new("posts/create_post.html", 2022, Ctx { is_edit: true });
        let value = serde_json::to_value(&page).unwrap();
        assert_eq!(value["template"], "posts/create_post.html");
        assert_eq!(value["year"], 2022);
        assert_eq!(value["is_edit"], true);
    }

    #[test]
    fn test_error_response_skips_empty_fields() {
        let value = serde_json::to_value(ErrorResponse::not_found("No post 5")).unwrap();
        assert_eq!(value["type"], "about:blank");
        assert_eq!(value["status"], 404);
        assert!(value.get("instance").is_none());
    }
}
