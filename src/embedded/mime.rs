//! Fixed suffix to MIME type table for embedded resources.

/// Content type for a resource name, keyed on its last `.` suffix.
pub fn content_type_for(name: &str) -> &'static str {
    let Some(pos) = name.rfind('.') else {
        return "application/octet-stream";
    };

    match name[pos..].to_ascii_lowercase().as_str() {
        ".js" => "text/javascript",
        ".css" => "text/css",
        ".htm" | ".html" => "text/html",
        ".jpg" | ".jpeg" => "image/jpeg",
        ".png" => "image/png",
        ".gif" => "image/gif",
        ".ico" => "image/x-icon",
        ".bmp" => "image/bmp",
        ".xml" => "application/xml",
        ".json" => "application/json",
        _ => "application/octet-stream",
    }
}
