use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use image::ImageFormat;
use std::path::Path;

use crate::error::ApiError;

pub const MAX_BYTES: usize = 5 * 1024 * 1024;

const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

/// Validates an uploaded picture by name, declared type, size and magic
/// bytes. The returned MIME type comes from the bytes, not from anything
/// the client claimed.
pub fn validate_upload(
    file_name: &str,
    declared_type: Option<&str>,
    data: &Bytes,
) -> Result<&'static str, ApiError> {
    if data.is_empty() {
        return Err(ApiError::Payload("Uploaded file is empty".into()));
    }
    if data.len() > MAX_BYTES {
        return Err(ApiError::Payload("File too large (max 5 MiB)".into()));
    }

    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match extension.as_deref() {
        Some(ext) if ALLOWED_EXTENSIONS.contains(&ext) => {}
        _ => return Err(ApiError::Payload("Only image files are allowed".into())),
    }

    if let Some(declared) = declared_type {
        if !matches!(
            declared,
            "image/jpeg" | "image/jpg" | "image/png" | "image/gif"
        ) {
            return Err(ApiError::Payload("Only image files are allowed".into()));
        }
    }

    let format = image::guess_format(data)
        .map_err(|_| ApiError::Payload("Only image files are allowed".into()))?;
    match format {
        ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::Gif => Ok(format.to_mime_type()),
        _ => Err(ApiError::Payload("Only image files are allowed".into())),
    }
}

/// Renders the picture as a `data:` URI so the user record carries the
/// image inline and profile reads need no second fetch.
pub fn to_data_uri(mime: &str, data: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    const JPEG: &[u8] = &[
        0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0x49, 0x46, 0x00, 0x01,
    ];
    const PNG: &[u8] = &[
        0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D,
    ];
    const GIF: &[u8] = b"GIF89a\x01\x00\x01\x00\x80\x00";

    #[test]
    fn accepts_the_three_supported_formats() {
        let jpeg = Bytes::from_static(JPEG);
        let png = Bytes::from_static(PNG);
        let gif = Bytes::from_static(GIF);

        assert_eq!(
            validate_upload("me.jpg", Some("image/jpeg"), &jpeg).expect("jpeg"),
            "image/jpeg"
        );
        assert_eq!(
            validate_upload("me.JPEG", None, &jpeg).expect("uppercase jpeg ext"),
            "image/jpeg"
        );
        assert_eq!(
            validate_upload("me.png", Some("image/png"), &png).expect("png"),
            "image/png"
        );
        assert_eq!(
            validate_upload("me.gif", Some("image/gif"), &gif).expect("gif"),
            "image/gif"
        );
    }

    #[test]
    fn rejects_empty_and_oversized_uploads() {
        let empty = Bytes::new();
        let err = validate_upload("me.png", None, &empty).unwrap_err();
        assert!(matches!(err, ApiError::Payload(_)));

        let mut oversized = Vec::with_capacity(MAX_BYTES + 1);
        oversized.extend_from_slice(JPEG);
        oversized.resize(MAX_BYTES + 1, 0);
        let oversized = Bytes::from(oversized);
        let err = validate_upload("me.jpg", None, &oversized).unwrap_err();
        assert!(matches!(err, ApiError::Payload(_)));
    }

    #[test]
    fn rejects_disallowed_extensions() {
        let png = Bytes::from_static(PNG);
        assert!(validate_upload("notes.txt", None, &png).is_err());
        assert!(validate_upload("archive.png.zip", None, &png).is_err());
        assert!(validate_upload("no-extension", None, &png).is_err());
    }

    #[test]
    fn rejects_mismatched_declared_type() {
        let png = Bytes::from_static(PNG);
        let err = validate_upload("me.png", Some("application/pdf"), &png).unwrap_err();
        assert!(matches!(err, ApiError::Payload(_)));
    }

    #[test]
    fn rejects_content_that_is_not_an_image() {
        let text = Bytes::from_static(b"just some text pretending to be a png");
        assert!(validate_upload("me.png", Some("image/png"), &text).is_err());
    }

    #[test]
    fn rejects_image_formats_outside_the_allowlist() {
        // WebP sniffs fine but is not an accepted profile picture format.
        let webp = Bytes::from_static(b"RIFF\x24\x00\x00\x00WEBPVP8 ");
        assert!(validate_upload("me.png", Some("image/png"), &webp).is_err());
    }

    #[test]
    fn data_uri_round_trips_the_bytes() {
        let uri = to_data_uri("image/png", PNG);
        let encoded = uri
            .strip_prefix("data:image/png;base64,")
            .expect("data uri prefix");
        let decoded = STANDARD.decode(encoded).expect("valid base64");
        assert_eq!(decoded, PNG);
    }
}
