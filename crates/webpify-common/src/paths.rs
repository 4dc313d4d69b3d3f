//! Path and media type utilities.
//!
//! Inputs arrive with a declared media type. For files read from disk the type
//! is derived from the extension; everything downstream only looks at the
//! declared type.

use std::path::Path;

/// Extension to media type table for the image formats we recognise.
const IMAGE_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("bmp", "image/bmp"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("ico", "image/x-icon"),
];

/// Media type used when the extension is unknown.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Extension appended to converted output names.
pub const WEBP_EXTENSION: &str = "webp";

/// Check whether a declared media type names an image type.
///
/// # Examples
///
/// ```
/// use webpify_common::paths::is_image_media_type;
///
/// assert!(is_image_media_type("image/png"));
/// assert!(is_image_media_type("IMAGE/JPEG"));
/// assert!(!is_image_media_type("application/pdf"));
/// assert!(!is_image_media_type(""));
/// ```
pub fn is_image_media_type(media_type: &str) -> bool {
    media_type
        .get(..6)
        .map(|prefix| prefix.eq_ignore_ascii_case("image/"))
        .unwrap_or(false)
        && media_type.len() > 6
}

/// Derive a declared media type from a path's extension.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use webpify_common::paths::media_type_for_path;
///
/// assert_eq!(media_type_for_path(Path::new("photo.JPG")), "image/jpeg");
/// assert_eq!(media_type_for_path(Path::new("notes.txt")), "application/octet-stream");
/// ```
pub fn media_type_for_path(path: &Path) -> &'static str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| {
            let ext = ext.to_lowercase();
            IMAGE_TYPES
                .iter()
                .find(|(known, _)| *known == ext)
                .map(|(_, media_type)| *media_type)
        })
        .unwrap_or(OCTET_STREAM)
}

/// Build the download name for a converted file.
///
/// The last extension is stripped and `.webp` appended. A leading dot alone
/// does not count as an extension.
///
/// # Examples
///
/// ```
/// use webpify_common::paths::output_file_name;
///
/// assert_eq!(output_file_name("cat.png"), "cat.webp");
/// assert_eq!(output_file_name("scan.2024.tiff"), "scan.2024.webp");
/// assert_eq!(output_file_name("README"), "README.webp");
/// ```
pub fn output_file_name(original: &str) -> String {
    let base = match original.rfind('.') {
        Some(0) | None => original,
        Some(idx) => &original[..idx],
    };
    format!("{base}.{WEBP_EXTENSION}")
}

/// Number a file name by inserting `-n` before its extension.
///
/// # Examples
///
/// ```
/// use webpify_common::paths::numbered_file_name;
///
/// assert_eq!(numbered_file_name("pic.webp", 1), "pic-1.webp");
/// assert_eq!(numbered_file_name("README", 2), "README-2");
/// ```
pub fn numbered_file_name(file_name: &str, n: usize) -> String {
    match file_name.rfind('.') {
        Some(0) | None => format!("{file_name}-{n}"),
        Some(idx) => format!("{}-{}{}", &file_name[..idx], n, &file_name[idx..]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_image_media_type() {
        assert!(is_image_media_type("image/jpeg"));
        assert!(is_image_media_type("image/svg+xml"));
        assert!(is_image_media_type("Image/Png"));

        assert!(!is_image_media_type("image/"));
        assert!(!is_image_media_type("text/plain"));
        assert!(!is_image_media_type("video/mp4"));
        assert!(!is_image_media_type("img"));
    }

    #[test]
    fn test_media_type_for_path() {
        assert_eq!(media_type_for_path(Path::new("a.jpg")), "image/jpeg");
        assert_eq!(media_type_for_path(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(media_type_for_path(Path::new("a.png")), "image/png");
        assert_eq!(media_type_for_path(Path::new("a.gif")), "image/gif");
        assert_eq!(media_type_for_path(Path::new("a.webp")), "image/webp");
        assert_eq!(media_type_for_path(Path::new("a.bmp")), "image/bmp");
        assert_eq!(media_type_for_path(Path::new("a.tif")), "image/tiff");
        assert_eq!(media_type_for_path(Path::new("a.ico")), "image/x-icon");

        // Case insensitive
        assert_eq!(media_type_for_path(Path::new("A.PNG")), "image/png");

        // With paths
        assert_eq!(
            media_type_for_path(Path::new("/path/to/photo.jpg")),
            "image/jpeg"
        );

        assert_eq!(media_type_for_path(Path::new("movie.mkv")), OCTET_STREAM);
        assert_eq!(media_type_for_path(Path::new("no_extension")), OCTET_STREAM);
    }

    #[test]
    fn test_output_file_name() {
        assert_eq!(output_file_name("photo.jpg"), "photo.webp");
        assert_eq!(output_file_name("photo.webp"), "photo.webp");
        assert_eq!(output_file_name("archive.tar.gz"), "archive.tar.webp");
        assert_eq!(output_file_name("noext"), "noext.webp");
        assert_eq!(output_file_name(".hidden"), ".hidden.webp");
        assert_eq!(output_file_name("trailing."), "trailing.webp");
    }

    #[test]
    fn test_numbered_file_name() {
        assert_eq!(numbered_file_name("pic.webp", 1), "pic-1.webp");
        assert_eq!(numbered_file_name("scan.2024.webp", 3), "scan.2024-3.webp");
        assert_eq!(numbered_file_name(".hidden.webp", 1), ".hidden-1.webp");
        assert_eq!(numbered_file_name("noext", 2), "noext-2");
    }
}
