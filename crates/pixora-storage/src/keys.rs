//! Shared key generation for asset store backends.
//!
//! Key format: `uploads/{uuid}-{filename}` with the filename reduced to
//! ASCII alphanumerics, `.`, `-` and `_`.

use uuid::Uuid;

/// Generate a storage key for an uploaded original.
pub fn generate_upload_key(filename: &str) -> String {
    format!("uploads/{}-{}", Uuid::new_v4(), sanitize_filename(filename))
}

/// Replace anything outside `[A-Za-z0-9._-]` with `_`
pub fn sanitize_filename(filename: &str) -> String {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        sanitized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("my photo (1).png"), "my_photo__1_.png");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename(".."), "upload");
    }

    #[test]
    fn test_generate_upload_key() {
        let key = generate_upload_key("beach.jpg");
        assert!(key.starts_with("uploads/"));
        assert!(key.ends_with("-beach.jpg"));
    }
}
