use std::collections::HashMap;
use std::sync::Arc;

use axum::http::{HeaderMap, Method, Uri};
use tracing::warn;

use crate::{AppState, Error, ResponseBuffer, Session};

pub type HandlerResult = Result<(), Error>;

/// Everything a handler sees about one request, plus the buffer it answers into.
/// Built by the dispatcher; carries no router-specific types.
pub struct Context {
    pub state: AppState,
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    /// Path parameters captured by the router, e.g. `id` in `/article/{id}`.
    pub params: HashMap<String, String>,
    /// Fields of a url-encoded request body.
    pub form: HashMap<String, String>,
    pub session: Session,
    pub response: ResponseBuffer,
    pub(crate) csrf_token: Option<String>,
}

impl Context {
    pub fn new(
        state: AppState,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        params: HashMap<String, String>,
    ) -> Self {
        let session = state.sessions.load(&headers);
        Self {
            state,
            method,
            uri,
            headers,
            params,
            form: HashMap::new(),
            session,
            response: ResponseBuffer::new(),
            csrf_token: None,
        }
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// Body field `name`, or `""` when absent.
    pub fn form_value(&self, name: &str) -> &str {
        self.form.get(name).map(String::as_str).unwrap_or("")
    }

    /// Body field `name`, rejecting a missing or blank value with 400.
    pub fn required(&self, name: &str) -> Result<String, Error> {
        let value = self.form_value(name);
        if value.trim().is_empty() {
            return Err(Error::bad_request(format!("{} required but not specified", name)));
        }
        Ok(value.to_string())
    }

    pub fn logged_in(&self) -> bool {
        self.session.is_authenticated()
    }

    /// Name of the logged-in user, if any.
    pub fn current_name(&self) -> Option<&str> {
        if self.logged_in() {
            self.session.get_str("name")
        } else {
            None
        }
    }

    pub fn save_session(&mut self) -> HandlerResult {
        self.state.sessions.save(&self.session, &mut self.response)
    }
}

/// The uniform handler contract: write into `cx.response` and return `Ok`, or
/// return a typed error and let the dispatcher answer.
#[derive(Clone)]
pub struct Handler(Arc<dyn Fn(&mut Context) -> HandlerResult + Send + Sync>);

impl Handler {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut Context) -> HandlerResult + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, cx: &mut Context) -> HandlerResult {
        (self.0)(cx)
    }
}

/// 405 unless the request uses `method`; `inner` is not invoked otherwise.
pub fn require_method(method: Method, inner: Handler) -> Handler {
    Handler::new(move |cx| {
        if cx.method != method {
            return Err(Error::method_not_allowed());
        }
        inner.call(cx)
    })
}

/// GET, and HEAD answered the same way.
pub fn get(inner: Handler) -> Handler {
    Handler::new(move |cx| {
        if cx.method != Method::GET && cx.method != Method::HEAD {
            return Err(Error::method_not_allowed());
        }
        inner.call(cx)
    })
}

pub fn post(inner: Handler) -> Handler {
    require_method(Method::POST, inner)
}

/// A route answering GET (and HEAD) and POST with different handlers; 405 for anything else.
pub fn get_or_post(on_get: Handler, on_post: Handler) -> Handler {
    Handler::new(move |cx| match cx.method {
        Method::GET | Method::HEAD => on_get.call(cx),
        Method::POST => on_post.call(cx),
        _ => Err(Error::method_not_allowed()),
    })
}

/// 401 unless the session is authenticated.
pub fn require_auth(inner: Handler) -> Handler {
    Handler::new(move |cx| {
        if !cx.logged_in() {
            warn!("Unauthenticated request to {} rejected", cx.path());
            return Err(Error::unauthorized());
        }
        inner.call(cx)
    })
}
