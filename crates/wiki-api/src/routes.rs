use std::collections::HashMap;
use std::path::Path;

use axum::{
    Router,
    extract::{Path as PathParams, Request, State, rejection::PathRejection},
    routing::{MethodRouter, any},
};
use tower_http::services::ServeDir;

use crate::csrf::require_csrf;
use crate::handler::{get, get_or_post, post, require_auth};
use crate::{AppState, Handler, articles, dispatch, users};

/// The full route table. Method checks live in the handlers themselves, so
/// every route accepts any verb at the router level.
pub fn router(state: AppState, static_dir: impl AsRef<Path>) -> Router {
    Router::new()
        .route("/", endpoint(get(Handler::new(articles::root))))
        .route(
            "/new",
            endpoint(get(require_auth(Handler::new(articles::new_form)))),
        )
        .route("/article/{id}", endpoint(get(Handler::new(articles::show))))
        .route(
            "/article/{id}/edit",
            endpoint(get(require_auth(Handler::new(articles::edit)))),
        )
        .route(
            "/save",
            endpoint(post(require_auth(require_csrf(Handler::new(articles::save))))),
        )
        .route(
            "/delete",
            endpoint(post(require_auth(require_csrf(Handler::new(articles::delete))))),
        )
        .route(
            "/signup",
            endpoint(get_or_post(
                Handler::new(users::signup_form),
                require_csrf(Handler::new(users::signup)),
            )),
        )
        .route(
            "/login",
            endpoint(get_or_post(
                Handler::new(users::login_form),
                require_csrf(Handler::new(users::login)),
            )),
        )
        .route(
            "/logout",
            endpoint(get_or_post(
                Handler::new(users::logout_form),
                require_auth(require_csrf(Handler::new(users::logout))),
            )),
        )
        .nest_service("/static", ServeDir::new(static_dir.as_ref()))
        .with_state(state)
}

/// Adapt a [`Handler`] to axum: pull out state and path params, then hand the
/// raw request to the dispatcher.
pub fn endpoint(handler: Handler) -> MethodRouter<AppState> {
    any(
        move |State(state): State<AppState>,
              params: Result<PathParams<HashMap<String, String>>, PathRejection>,
              request: Request| {
            let handler = handler.clone();
            async move {
                let params = params.map(|PathParams(p)| p).unwrap_or_default();
                dispatch(state, handler, params, request).await
            }
        },
    )
}
