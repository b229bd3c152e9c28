//! Extension based MIME lookup.

use crate::path;

/// MIME type reported when the extension is unknown.
pub const DEFAULT_MIME: &str = "application/octet-stream";

const MIME_TABLE: &[(&str, &str)] = &[
    ("7z", "application/x-7z-compressed"),
    ("ar", "application/x-archive"),
    ("avi", "video/x-msvideo"),
    ("bmp", "image/bmp"),
    ("bz2", "application/x-bzip2"),
    ("bzip2", "application/x-bzip2"),
    ("c", "text/x-c"),
    ("css", "text/css"),
    ("csv", "text/csv"),
    ("deb", "application/x-debian-package"),
    ("doc", "application/msword"),
    ("gif", "image/gif"),
    ("gz", "application/x-gzip"),
    ("gzip", "application/x-gzip"),
    ("h", "text/x-c"),
    ("htm", "text/html"),
    ("html", "text/html"),
    ("ico", "image/x-icon"),
    ("jpe", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("js", "application/javascript"),
    ("json", "application/json"),
    ("md", "text/markdown"),
    ("mp3", "audio/mpeg"),
    ("mp4", "video/mp4"),
    ("mpeg", "video/mpeg"),
    ("mpg", "video/mpeg"),
    ("ogg", "application/ogg"),
    ("pdf", "application/pdf"),
    ("php", "text/x-php"),
    ("png", "image/png"),
    ("ps", "application/postscript"),
    ("rs", "text/x-rust"),
    ("rtf", "application/rtf"),
    ("sh", "application/x-sh"),
    ("svg", "image/svg+xml"),
    ("tar", "application/x-tar"),
    ("tbz", "application/x-bzip-compressed-tar"),
    ("tgz", "application/x-compressed-tar"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    ("toml", "application/toml"),
    ("txt", "text/plain"),
    ("wav", "audio/x-wav"),
    ("xhtml", "application/xhtml+xml"),
    ("xml", "text/xml"),
    ("zip", "application/zip"),
];

/// Best-guess MIME type for a file name.
pub fn from_filename(name: &str) -> &'static str {
    path::extension(name)
        .and_then(from_extension)
        .unwrap_or(DEFAULT_MIME)
}

/// MIME type for an extension (case-insensitive), if known.
pub fn from_extension(ext: &str) -> Option<&'static str> {
    let ext = ext.to_ascii_lowercase();
    MIME_TABLE
        .binary_search_by(|(key, _)| (*key).cmp(ext.as_str()))
        .ok()
        .map(|idx| MIME_TABLE[idx].1)
}
