use image::ImageFormat;

use crate::domain::{Group, Post};
use crate::ports::UploadedFile;

use super::{FormData, FormErrors};

pub const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";
pub const INVALID_IMAGE: &str = "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";
pub const EMPTY_FILE: &str = "The submitted file is empty.";

/// Directory under the media root that post images are stored in.
pub const IMAGE_UPLOAD_TO: &str = "posts";

#[derive(Debug, Clone)]
pub struct CleanedPost {
    pub text: String,
    pub group_id: Option<i32>,
    /// A newly uploaded image; `None` keeps whatever the post already has.
    pub image: Option<UploadedFile>,
}

impl CleanedPost {
    /// Copy the cleaned fields onto an existing post. The image path is set
    /// separately once the upload has been stored.
    pub fn apply_to(&self, post: &mut Post) {
        post.text = self.text.clone();
        post.group_id = self.group_id;
    }
}

/// Form for creating and editing posts: `text`, optional `group`, optional `image`.
pub struct PostForm;

impl PostForm {
    pub fn clean(data: &FormData, groups: &[Group]) -> Result<CleanedPost, FormErrors> {
        let mut errors = FormErrors::new();
        let text = data.required("text", &mut errors);

        let group_id = match data.field("group").map(str::trim) {
            None | Some("") => None,
            Some(raw) => match raw.parse::<i32>() {
                Ok(id) if groups.iter().any(|g| g.id == id) => Some(id),
                _ => {
                    errors.add("group", INVALID_CHOICE);
                    None
                }
            },
        };

        let image = match data.file("image") {
            // A file input left blank arrives without a name
            None => None,
            Some(file) if file.file_name.is_empty() && file.bytes.is_empty() => None,
            Some(file) if file.bytes.is_empty() => {
                errors.add("image", EMPTY_FILE);
                None
            }
            Some(file) if !is_image(&file.bytes) => {
                errors.add("image", INVALID_IMAGE);
                None
            }
            Some(file) => Some(file.clone()),
        };

        errors.into_result(|| CleanedPost {
            text: text.unwrap_or_default(),
            group_id,
            image,
        })
    }

    /// Initial field values for editing an existing post.
    pub fn initial(post: &Post) -> FormData {
        let data = FormData::new().with_field("text", post.text.clone());
        match post.group_id {
            Some(id) => data.with_field("group", id.to_string()),
            None => data,
        }
    }
}

/// Formats accepted for post images.
const IMAGE_FORMATS: [ImageFormat; 5] = [
    ImageFormat::Gif,
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Bmp,
    ImageFormat::WebP,
];

/// The bytes decode as a GIF, PNG, JPEG, BMP or WebP image.
pub fn is_image(bytes: &[u8]) -> bool {
    match image::guess_format(bytes) {
        Ok(format) if IMAGE_FORMATS.contains(&format) => {
            image::load_from_memory_with_format(bytes, format).is_ok()
        }
        _ => false,
    }
}
