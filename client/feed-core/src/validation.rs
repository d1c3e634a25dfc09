//! Pre-flight content checks, run before any optimistic write

use crate::config::ContentLimits;
use crate::domain::MediaUpload;
use crate::error::{FeedError, FeedResult};

/// Captions are optional; an empty caption after trimming is stored as none
pub fn validate_caption(caption: Option<&str>, limits: &ContentLimits) -> FeedResult<Option<String>> {
    let Some(text) = caption.map(str::trim).filter(|text| !text.is_empty()) else {
        return Ok(None);
    };
    let length = text.chars().count();
    if length > limits.caption_max_chars {
        return Err(FeedError::Validation(format!(
            "caption is {} characters, the limit is {}",
            length, limits.caption_max_chars
        )));
    }
    Ok(Some(text.to_string()))
}

/// Returns the trimmed comment text
pub fn validate_comment(content: &str, limits: &ContentLimits) -> FeedResult<String> {
    let text = content.trim();
    if text.is_empty() {
        return Err(FeedError::Validation("comment cannot be empty".to_string()));
    }
    let length = text.chars().count();
    if length > limits.comment_max_chars {
        return Err(FeedError::Validation(format!(
            "comment is {} characters, the limit is {}",
            length, limits.comment_max_chars
        )));
    }
    Ok(text.to_string())
}

pub fn validate_media(media: &MediaUpload, limits: &ContentLimits) -> FeedResult<()> {
    if !media.content_type.to_ascii_lowercase().starts_with("image/") {
        return Err(FeedError::Validation(format!(
            "{} is not an image",
            media.content_type
        )));
    }
    if media.bytes.is_empty() {
        return Err(FeedError::Validation("image is empty".to_string()));
    }
    if media.bytes.len() > limits.max_media_bytes {
        return Err(FeedError::Validation(format!(
            "image must be at most {} MB",
            limits.max_media_bytes / (1024 * 1024)
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FeedConfig;

    fn limits() -> ContentLimits {
        FeedConfig::default().limits
    }

    fn image(content_type: &str, size: usize) -> MediaUpload {
        MediaUpload {
            file_name: "photo.jpg".to_string(),
            content_type: content_type.to_string(),
            bytes: vec![0u8; size],
        }
    }

    #[test]
    fn test_caption_limit_counts_characters() {
        let at_limit = "é".repeat(2200);
        assert!(validate_caption(Some(&at_limit), &limits()).is_ok());

        let over = "a".repeat(2201);
        assert!(matches!(
            validate_caption(Some(&over), &limits()),
            Err(FeedError::Validation(_))
        ));
    }

    #[test]
    fn test_blank_caption_is_none() {
        assert_eq!(validate_caption(Some("   "), &limits()).unwrap(), None);
        assert_eq!(validate_caption(None, &limits()).unwrap(), None);
        assert_eq!(
            validate_caption(Some(" sunset "), &limits()).unwrap(),
            Some("sunset".to_string())
        );
    }

    #[test]
    fn test_comment_trimmed_and_non_empty() {
        assert_eq!(validate_comment("  hi  ", &limits()).unwrap(), "hi");
        assert!(matches!(
            validate_comment(" \n ", &limits()),
            Err(FeedError::Validation(_))
        ));
    }

    #[test]
    fn test_media_type_and_size() {
        assert!(validate_media(&image("image/png", 10), &limits()).is_ok());
        assert!(validate_media(&image("video/mp4", 10), &limits()).is_err());
        assert!(validate_media(&image("image/jpeg", 5 * 1024 * 1024 + 1), &limits()).is_err());
        assert!(validate_media(&image("image/jpeg", 0), &limits()).is_err());
    }
}
