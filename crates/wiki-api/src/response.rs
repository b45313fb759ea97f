use std::io;

use axum::{
    body::Body,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use tracing::warn;

use crate::Error;

/// In-memory stand-in for the connection. Handlers write status, headers and
/// body here; the dispatcher only turns it into a real response once the
/// handler has returned successfully.
#[derive(Debug, Default)]
pub struct ResponseBuffer {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status written so far; `200 OK` if none was set explicitly.
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    /// The first status written sticks.
    pub fn write_status(&mut self, status: StatusCode) {
        match self.status {
            None => self.status = Some(status),
            Some(existing) if existing != status => {
                warn!("Superfluous status write {} (already {})", status, existing);
            }
            Some(_) => {}
        }
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn append_header(&mut self, name: header::HeaderName, value: HeaderValue) {
        self.headers.append(name, value);
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn write_body(&mut self, bytes: &[u8]) {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(bytes);
    }

    pub fn html(&mut self, status: StatusCode, html: impl AsRef<str>) {
        self.content(status, "text/html; charset=utf-8", html.as_ref());
    }

    pub fn text(&mut self, status: StatusCode, text: impl AsRef<str>) {
        self.content(status, "text/plain; charset=utf-8", text.as_ref());
    }

    fn content(&mut self, status: StatusCode, content_type: &'static str, content: &str) {
        self.headers
            .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        self.write_status(status);
        self.write_body(content.as_bytes());
    }

    /// `303 See Other` to `location`, so a POST is always followed by a GET.
    pub fn redirect(&mut self, location: &str) -> Result<(), Error> {
        let value = HeaderValue::try_from(location).map_err(anyhow::Error::from)?;
        self.headers.insert(header::LOCATION, value);
        self.write_status(StatusCode::SEE_OTHER);
        Ok(())
    }

    pub fn into_response(self) -> Response {
        let status = self.status();
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = status;
        *response.headers_mut() = self.headers;
        response
    }
}

impl io::Write for ResponseBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_body(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_to_ok_and_first_status_wins() {
        let mut buf = ResponseBuffer::new();
        assert_eq!(buf.status(), StatusCode::OK);

        buf.write_status(StatusCode::CREATED);
        buf.write_status(StatusCode::ACCEPTED);
        assert_eq!(buf.status(), StatusCode::CREATED);
    }

    #[test]
    fn body_write_implies_ok() {
        let mut buf = ResponseBuffer::new();
        write!(buf, "hello {}", 42).unwrap();
        buf.write_status(StatusCode::NOT_FOUND);
        assert_eq!(buf.status(), StatusCode::OK);
        assert_eq!(buf.body(), b"hello 42");
    }

    #[test]
    fn redirect_sets_location() {
        let mut buf = ResponseBuffer::new();
        buf.redirect("/article/7").unwrap();

        let response = buf.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/article/7");
    }

    #[test]
    fn redirect_rejects_control_characters() {
        let mut buf = ResponseBuffer::new();
        assert!(buf.redirect("/evil\r\nSet-Cookie: x=y").is_err());
        assert!(buf.headers().get(header::LOCATION).is_none());
    }
}
