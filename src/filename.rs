//! File names for parts: sanitizing declared names and synthesizing
//! missing ones.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Header carrying the sanitized file name of a part.
pub const FILE_NAME_KEY: &str = "X-FileName";

/// Extension used when the media type has no known mapping.
pub const FALLBACK_EXTENSION: &str = ".dat";

/// Everything but unreserved characters is escaped, as in a URL query.
const QUERY: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Replaces path separators with `-` and query-escapes the rest.
///
/// Spaces become `+`. With `mask_percent`, every `%` introduced by the
/// escaping is rewritten to `!P!` so later stages cannot percent-decode it.
#[must_use]
pub fn sanitize(name: &str, mask_percent: bool) -> String {
    let flattened = name.replace(['/', '\\'], "-");
    let escaped = utf8_percent_encode(&flattened, QUERY)
        .to_string()
        .replace("%20", "+");
    if mask_percent {
        escaped.replace('%', "!P!")
    } else {
        escaped
    }
}

/// Builds a name for a part that declares none: `<depth>.<seq><ext>`.
#[must_use]
pub fn synthesize(depth: usize, seq: u64, media_type: &str) -> String {
    let ext = extension_for(media_type).unwrap_or(FALLBACK_EXTENSION);
    format!("{depth}.{seq}{ext}")
}

/// Guesses a file extension (with the leading dot) for a media type.
#[must_use]
pub fn extension_for(media_type: &str) -> Option<&'static str> {
    let ext = match media_type.trim().to_ascii_lowercase().as_str() {
        "text/plain" | "message/delivery-status" => ".txt",
        "text/html" => ".html",
        "text/css" => ".css",
        "text/csv" => ".csv",
        "text/calendar" => ".ics",
        "text/markdown" => ".md",
        "text/xml" | "application/xml" => ".xml",
        "text/vcard" | "text/x-vcard" => ".vcf",
        "message/rfc822" => ".eml",
        "application/json" => ".json",
        "application/pdf" => ".pdf",
        "application/zip" | "application/x-zip-compressed" => ".zip",
        "application/gzip" | "application/x-gzip" => ".gz",
        "application/x-7z-compressed" => ".7z",
        "application/x-tar" => ".tar",
        "application/rtf" | "text/rtf" => ".rtf",
        "application/msword" => ".doc",
        "application/vnd.ms-excel" => ".xls",
        "application/vnd.ms-powerpoint" => ".ppt",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => ".docx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => ".xlsx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation" => ".pptx",
        "application/vnd.oasis.opendocument.text" => ".odt",
        "application/vnd.oasis.opendocument.spreadsheet" => ".ods",
        "application/pkcs7-signature" | "application/x-pkcs7-signature" => ".p7s",
        "application/pgp-signature" => ".asc",
        "application/ms-tnef" | "application/vnd.ms-tnef" => ".tnef",
        "image/png" => ".png",
        "image/jpeg" | "image/jpg" | "image/pjpeg" => ".jpg",
        "image/gif" => ".gif",
        "image/webp" => ".webp",
        "image/bmp" => ".bmp",
        "image/tiff" => ".tif",
        "image/svg+xml" => ".svg",
        "image/avif" => ".avif",
        "audio/mpeg" => ".mp3",
        "audio/wav" | "audio/x-wav" => ".wav",
        "audio/ogg" => ".ogg",
        "video/mp4" => ".mp4",
        "video/mpeg" => ".mpeg",
        "video/quicktime" => ".mov",
        _ => return None,
    };
    Some(ext)
}
