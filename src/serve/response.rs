//! HTTP replies.
//!
//! Handlers build a [`Reply`] (plain data, easy to assert on) and [`send`]
//! turns it into a tiny_http response. HEAD requests get the same status and
//! headers with an empty body.

use super::middleware::{DeriveFailure, DerivedImage, JPEG_CONTENT_TYPE};
use super::static_files::content_type;
use std::fs;
use std::io;
use std::path::Path;
use tiny_http::{Header, Method, Request, Response, StatusCode};

const PLAIN: &str = "text/plain; charset=utf-8";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub cache_control: Option<&'static str>,
    pub body: Vec<u8>,
}

impl Reply {
    fn text(status: u16, message: &str) -> Self {
        Self {
            status,
            content_type: PLAIN,
            cache_control: None,
            body: message.as_bytes().to_vec(),
        }
    }

    pub fn derived(result: Result<DerivedImage, DeriveFailure>) -> Self {
        match result {
            Ok(image) => Self {
                status: 200,
                content_type: JPEG_CONTENT_TYPE,
                cache_control: Some(image.cache_control),
                body: image.body,
            },
            Err(failure) => Self::failure(&failure),
        }
    }

    pub fn failure(failure: &DeriveFailure) -> Self {
        let status = failure.status();
        let message = match status {
            404 => "404 Not Found",
            400 => "400 Bad Request",
            _ => "500 Internal Server Error",
        };
        Self {
            // Failures must not be cached even in production.
            cache_control: Some("no-store"),
            ..Self::text(status, message)
        }
    }

    /// A static file from disk.
    pub fn file(path: &Path) -> io::Result<Self> {
        Ok(Self {
            status: 200,
            content_type: content_type(path),
            cache_control: None,
            body: fs::read(path)?,
        })
    }

    pub fn not_found() -> Self {
        Self::text(404, "404 Not Found")
    }

    pub fn method_not_allowed() -> Self {
        Self::text(405, "405 Method Not Allowed")
    }

    pub fn internal_error() -> Self {
        Self::text(500, "500 Internal Server Error")
    }
}

fn headers(reply: &Reply) -> Vec<Header> {
    let mut fields = vec![("Content-Type", reply.content_type)];
    if let Some(cache_control) = reply.cache_control {
        fields.push(("Cache-Control", cache_control));
    }
    if reply.status == 405 {
        fields.push(("Allow", "GET, HEAD"));
    }
    fields
        .into_iter()
        .filter_map(|(field, value)| Header::from_bytes(field, value).ok())
        .collect()
}

/// Write `reply` to the client.
pub fn send(request: Request, reply: Reply) -> io::Result<()> {
    let status = StatusCode(reply.status);
    let headers = headers(&reply);

    if request.method() == &Method::Head {
        let mut response = Response::empty(status);
        for header in headers {
            response.add_header(header);
        }
        return request.respond(response);
    }

    let mut response = Response::from_data(reply.body).with_status_code(status);
    for header in headers {
        response.add_header(header);
    }
    request.respond(response)
}
