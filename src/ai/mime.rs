/// Sniff the mime type of an uploaded image from its magic bytes.
///
/// Local files carry no declared content type, so the CLI uses this
/// before building an [`crate::models::EditRequest`]. Unknown formats
/// fall back to `image/jpeg`, the default the upload contract assumes.
pub fn sniff_upload_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [0x89, 0x50, 0x4E, 0x47, ..] => "image/png",
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => "image/webp",
        _ => {
            tracing::warn!(
                "Unrecognized upload format (first 4 bytes: {:02X?}), assuming image/jpeg",
                &bytes[..bytes.len().min(4)]
            );
            "image/jpeg"
        }
    }
}
