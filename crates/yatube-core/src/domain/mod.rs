//! Domain entities - the core business objects.

mod comment;
mod follow;
mod group;
mod post;
mod user;

pub use comment::{Comment, CommentDetails, NewComment};
pub use follow::{Follow, NewFollow};
pub use group::{Group, NewGroup};
pub use post::{NewPost, Post, PostDetails, PostFilter};
pub use user::{Author, NewUser, User};

/// Truncate `text` to at most `limit` characters, ending with an ellipsis when cut.
pub(crate) fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(limit.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::truncate_chars;

    #[test]
    fn test_truncate_keeps_short_text() {
        assert_eq!(truncate_chars("short", 30), "short");
    }

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        let text = "Текст тестового поста, который должен быть обрезан";
        let cut = truncate_chars(text, 30);
        assert_eq!(cut.chars().count(), 30);
        assert!(cut.ends_with('…'));
        assert!(cut.starts_with("Текст тестового поста"));
    }
}
