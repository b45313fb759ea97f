use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use axum::{
    body::Body,
    extract::Request,
    http::{HeaderMap, StatusCode, header},
    response::Response,
};
use http_body_util::LengthLimitError;
use tracing::{debug, error, warn};
use url::form_urlencoded;
use wiki_db::panic_message;

use crate::error::INTERNAL_ERROR_TEXT;
use crate::{AppState, Context, Error, Handler, ResponseBuffer};

/// Upper bound on a request body; forms here are small.
pub const MAX_BODY_BYTES: usize = 2048;

const FORM_MEDIA_TYPE: &str = "application/x-www-form-urlencoded";

/// Run `handler` for one request.
///
/// The body is capped and parsed before the handler runs. The handler writes
/// into a [`ResponseBuffer`] on the blocking pool; only a successful return
/// turns that buffer into the response. An error or a panic discards it and
/// answers with the error response instead, so partial output never escapes.
pub async fn dispatch(
    state: AppState,
    handler: Handler,
    params: HashMap<String, String>,
    request: Request,
) -> Response {
    let (parts, body) = request.into_parts();
    let target = parts.uri.to_string();

    let form = match read_form(&parts.headers, body).await {
        Ok(form) => form,
        Err(err) => return error_response(&target, err),
    };
    let mut cx = Context::new(state, parts.method, parts.uri, parts.headers, params);
    cx.form = form;

    let outcome = tokio::task::spawn_blocking(move || {
        panic::catch_unwind(AssertUnwindSafe(move || {
            handler.call(&mut cx).map(|()| cx.response)
        }))
    })
    .await;

    match outcome {
        Ok(Ok(Ok(buffer))) => buffer.into_response(),
        Ok(Ok(Err(err))) => error_response(&target, err),
        Ok(Err(payload)) => {
            error!(
                "Error serving {}: handler panic: {}",
                target,
                panic_message(payload.as_ref())
            );
            internal_error_response()
        }
        Err(join_err) => {
            error!("Error serving {}: handler task failed: {}", target, join_err);
            internal_error_response()
        }
    }
}

/// Answer with the status and public text for `err`. Server errors and
/// unclassified errors are logged with their full cause chain.
pub fn error_response(target: &str, err: Error) -> Response {
    let status = err.status_code();
    match &err {
        Error::Http(e) if status.is_server_error() => {
            error!("Error serving {}: {}", target, e);
        }
        Error::Http(e) => debug!("Rejected {}: {}", target, e),
        // Debug output includes the backtrace when RUST_BACKTRACE is set.
        Error::Internal(e) => error!("Error serving {}: {:?}", target, e),
    }

    let mut buffer = ResponseBuffer::new();
    buffer.text(status, err.public_message());
    buffer.into_response()
}

fn internal_error_response() -> Response {
    let mut buffer = ResponseBuffer::new();
    buffer.text(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_ERROR_TEXT);
    buffer.into_response()
}

async fn read_form(headers: &HeaderMap, body: Body) -> Result<HashMap<String, String>, Error> {
    if !is_form(headers) {
        return Ok(HashMap::new());
    }

    let bytes = axum::body::to_bytes(body, MAX_BODY_BYTES)
        .await
        .map_err(|e| {
            let inner = e.into_inner();
            if inner.is::<LengthLimitError>() {
                warn!("Request body over {} bytes rejected", MAX_BODY_BYTES);
                Error::payload_too_large()
            } else {
                Error::bad_request(format!("unreadable request body: {}", inner))
            }
        })?;

    Ok(parse_fields(&bytes))
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|ct| ct.split(';').next())
        .is_some_and(|media| media.trim().eq_ignore_ascii_case(FORM_MEDIA_TYPE))
}

/// Url-encoded pairs; the first occurrence of a repeated key wins.
fn parse_fields(input: &[u8]) -> HashMap<String, String> {
    let mut fields = HashMap::new();
    for (key, value) in form_urlencoded::parse(input) {
        fields
            .entry(key.into_owned())
            .or_insert_with(|| value.into_owned());
    }
    fields
}
