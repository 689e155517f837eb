//! HTTP response helpers.

use std::path::Path;

use anyhow::{Context, Result};
use tiny_http::{Header, Method, Request, Response, StatusCode};

use crate::utils::mime::{self, types};

/// Response headers accumulated by custom header rules.
pub type ExtraHeaders = [(String, String)];

/// Respond with a static file.
pub fn respond_file(request: Request, path: &Path, extra: &ExtraHeaders) -> Result<()> {
    let content_type = mime::from_path(path);

    if is_head_request(&request) {
        return send_head(request, 200, content_type, extra);
    }

    let body = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    send_body(request, 200, content_type, body, extra)
}

/// Respond with an HTML document.
pub fn respond_html(request: Request, status: u16, body: String, extra: &ExtraHeaders) -> Result<()> {
    if is_head_request(&request) {
        return send_head(request, status, types::HTML, extra);
    }
    send_body(request, status, types::HTML, body.into_bytes(), extra)
}

/// Respond with a JSON payload.
pub fn respond_json(request: Request, body: String) -> Result<()> {
    if is_head_request(&request) {
        return send_head(request, 200, types::JSON, &[]);
    }
    send_body(request, 200, types::JSON, body.into_bytes(), &[])
}

/// Respond with a plain 404.
pub fn respond_not_found(request: Request) -> Result<()> {
    respond_plain(request, 404, "404 Not Found")
}

/// Respond with 503 Service Unavailable (server shutting down).
pub fn respond_unavailable(request: Request) -> Result<()> {
    respond_plain(request, 503, "503 Service Unavailable")
}

/// Respond with plain text at the given status.
pub fn respond_plain(request: Request, status: u16, body: &str) -> Result<()> {
    if is_head_request(&request) {
        return send_head(request, status, types::PLAIN, &[]);
    }
    send_body(request, status, types::PLAIN, body.as_bytes().to_vec(), &[])
}

fn is_head_request(request: &Request) -> bool {
    request.method() == &Method::Head
}

fn send_head(
    request: Request,
    status: u16,
    content_type: &'static str,
    extra: &ExtraHeaders,
) -> Result<()> {
    let mut response = Response::empty(StatusCode(status))
        .with_header(make_header("Content-Type", content_type));
    for (name, value) in extra {
        if let Ok(header) = Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            response = response.with_header(header);
        }
    }
    request.respond(response)?;
    Ok(())
}

fn send_body(
    request: Request,
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
    extra: &ExtraHeaders,
) -> Result<()> {
    let mut response = Response::from_data(body)
        .with_status_code(StatusCode(status))
        .with_header(make_header("Content-Type", content_type));
    for (name, value) in extra {
        if let Ok(header) = Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            response = response.with_header(header);
        }
    }
    request.respond(response)?;
    Ok(())
}

fn make_header(key: &'static str, value: &'static str) -> Header {
    Header::from_bytes(key, value).unwrap()
}
