//! Canned responses produced by the host itself.
//!
//! Every body written here carries an explicit `Content-Type` and
//! `Content-Length`. 304 carries nothing beyond its status.

use axum::body::Body;
use axum::http::{header, HeaderValue, Response, StatusCode};

/// A `text/plain` response with an explicit length.
pub fn plain_text(status: StatusCode, text: impl Into<String>) -> Response<Body> {
    let text = text.into();
    let length = text.len();
    let mut res = Response::new(Body::from(text));
    *res.status_mut() = status;
    let headers = res.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    res
}

/// 404 naming the path that could not be resolved.
pub fn not_found(path: &str) -> Response<Body> {
    plain_text(StatusCode::NOT_FOUND, format!("Not found: {}", path))
}

/// 304 with an empty body.
pub fn not_modified() -> Response<Body> {
    let mut res = Response::new(Body::empty());
    *res.status_mut() = StatusCode::NOT_MODIFIED;
    res
}

/// Generic 500 used by the per-request error boundary.
pub fn server_error() -> Response<Body> {
    plain_text(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
}

pub fn bad_request(reason: &str) -> Response<Body> {
    plain_text(StatusCode::BAD_REQUEST, format!("Bad Request - {}", reason))
}
