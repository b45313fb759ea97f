//! Double-submit CSRF protection: a random token lives in a signed cookie and
//! every rendered form echoes it back in a hidden field.

use cookie::{Cookie, SameSite};
use tracing::warn;
use wiki_crypto::{random_token, tokens_match};

use crate::{Context, Error, Handler};

pub const CSRF_COOKIE: &str = "wikicsrf";
pub const CSRF_FIELD: &str = "csrf_token";
pub const CSRF_HEADER: &str = "x-csrf-token";

const CSRF_REJECTED: &str = "Forbidden - CSRF token invalid";

/// The request's CSRF token, issuing a new cookie if it has none yet.
pub fn token(cx: &mut Context) -> Result<String, Error> {
    if let Some(token) = &cx.csrf_token {
        return Ok(token.clone());
    }

    match cx.state.sessions.read_signed(&cx.headers, CSRF_COOKIE) {
        Some(existing) if !existing.is_empty() => {
            cx.csrf_token = Some(existing.clone());
            Ok(existing)
        }
        _ => rotate(cx),
    }
}

/// Issue a fresh token, replacing whatever cookie the client holds. Called
/// whenever the session changes identity (login, logout).
pub fn rotate(cx: &mut Context) -> Result<String, Error> {
    let fresh = random_token();
    let cookie = Cookie::build((CSRF_COOKIE, fresh.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .build();
    cx.state.sessions.write_signed(&mut cx.response, cookie)?;
    cx.csrf_token = Some(fresh.clone());
    Ok(fresh)
}

/// Hidden `<input>` carrying the token, for embedding in forms.
pub fn field(cx: &mut Context) -> Result<String, Error> {
    let token = token(cx)?;
    Ok(format!(
        r#"<input type="hidden" name="{}" value="{}">"#,
        CSRF_FIELD, token
    ))
}

/// 403 unless the form field (or `X-CSRF-Token` header) matches the cookie.
pub fn require_csrf(inner: Handler) -> Handler {
    Handler::new(move |cx| {
        let expected = cx
            .state
            .sessions
            .read_signed(&cx.headers, CSRF_COOKIE)
            .unwrap_or_default();
        let given = cx
            .form
            .get(CSRF_FIELD)
            .map(String::as_str)
            .or_else(|| cx.headers.get(CSRF_HEADER).and_then(|v| v.to_str().ok()))
            .unwrap_or("");

        if !tokens_match(&expected, given) {
            warn!("CSRF check failed for {} {}", cx.method, cx.path());
            return Err(Error::forbidden(CSRF_REJECTED));
        }
        inner.call(cx)
    })
}
