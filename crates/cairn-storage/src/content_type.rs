/// Fallback for anything without a recognised extension
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Map a request path's extension to a content type.
pub fn for_path(path: &str) -> &'static str {
    let name = path.rsplit('/').next().unwrap_or(path);
    let Some((_, ext)) = name.rsplit_once('.') else {
        return DEFAULT_CONTENT_TYPE;
    };

    match ext.to_ascii_lowercase().as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" | "map" => "application/json",
        "txt" => "text/plain; charset=utf-8",
        "xml" => "application/xml",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "wasm" => "application/wasm",
        "pdf" => "application/pdf",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_extensions() {
        assert_eq!(for_path("/index.html"), "text/html; charset=utf-8");
        assert_eq!(for_path("/static/app.JS"), "text/javascript; charset=utf-8");
        assert_eq!(for_path("/img/logo.png"), "image/png");
    }

    #[test]
    fn unknown_or_missing_extension() {
        assert_eq!(for_path("/LICENSE"), DEFAULT_CONTENT_TYPE);
        assert_eq!(for_path("/archive.xyz"), DEFAULT_CONTENT_TYPE);
        assert_eq!(for_path("/v1.2/README"), DEFAULT_CONTENT_TYPE);
    }
}
