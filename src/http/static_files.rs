//! Static file responses for requests no plugin claims.
//!
//! # Responsibilities
//! - Map a URL path onto a root directory without escaping it
//! - Pick a content type from the file extension
//! - Gzip bodies at or above the configured threshold

use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;
use http::StatusCode;

use crate::http::response::{build_http_response, not_found_response};

/// Join a URL path onto `root`, refusing parent and absolute components.
pub fn resolve_path(root: &Path, url_path: &str) -> Option<PathBuf> {
    let mut resolved = root.to_path_buf();
    for comp in Path::new(url_path.trim_start_matches('/')).components() {
        match comp {
            Component::Normal(s) => resolved.push(s),
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(resolved)
}

fn content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase()
        .as_str()
    {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "txt" => "text/plain",
        "svg" => "image/svg+xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "ico" => "image/x-icon",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}

fn gzip(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Build a ready-to-queue response for the file at `path`.
///
/// Missing or unreadable files produce the 404 packet.
pub fn serve_static_file(path: &Path, min_compression_length: usize, server_agent: &str) -> Bytes {
    match try_serve(path, min_compression_length) {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Static file unavailable");
            not_found_response(server_agent)
        }
    }
}

fn try_serve(path: &Path, min_compression_length: usize) -> io::Result<Bytes> {
    if !path.is_file() {
        return Err(io::Error::new(io::ErrorKind::NotFound, "file not found"));
    }
    let content = fs::read(path)?;
    let content_type = content_type(path);

    let compress = content.len() >= min_compression_length;
    let body = if compress { gzip(&content)? } else { content };
    let length = body.len().to_string();

    let mut headers = vec![
        ("Content-Type", content_type),
        ("Cache-Control", "max-age=86400"),
    ];
    if compress {
        headers.push(("Content-Encoding", "gzip"));
    }
    headers.push(("Content-Length", length.as_str()));

    Ok(build_http_response(StatusCode::OK, "OK", &headers, Some(body.as_slice())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[test]
    fn resolve_path_prevents_traversal() {
        let root = Path::new("/srv/www");
        assert!(resolve_path(root, "/../etc/passwd").is_none());
        assert!(resolve_path(root, "/a/../../b").is_none());
        assert_eq!(
            resolve_path(root, "/css/./site.css"),
            Some(PathBuf::from("/srv/www/css/site.css"))
        );
    }

    #[test]
    fn small_file_is_served_plain() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("hello.txt");
        fs::write(&file, "Hello\n").unwrap();

        let response = serve_static_file(&file, 1024, "agent");
        assert_eq!(
            &response[..],
            &b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nCache-Control: max-age=86400\r\nContent-Length: 6\r\n\r\nHello\n"[..]
        );
    }

    #[test]
    fn large_file_is_gzipped() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("app.js");
        let content = "console.log('x');\n".repeat(50);
        fs::write(&file, &content).unwrap();

        let response = serve_static_file(&file, 20, "agent");
        let text = String::from_utf8_lossy(&response);
        assert!(text.contains("Content-Encoding: gzip\r\n"));
        assert!(text.contains("Content-Type: application/javascript\r\n"));

        let split = response.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
        let mut decoded = String::new();
        GzDecoder::new(&response[split..]).read_to_string(&mut decoded).unwrap();
        assert_eq!(decoded, content);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let response = serve_static_file(&dir.path().join("nope.html"), 20, "agent");
        assert_eq!(response, not_found_response("agent"));
    }
}
