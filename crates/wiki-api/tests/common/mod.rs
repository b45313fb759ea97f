#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::Request,
    http::{self, HeaderMap, StatusCode, header},
};
use cookie::Cookie;
use tower::ServiceExt;
use url::form_urlencoded;
use wiki_api::{AppState, AppStateInner, SessionStore, router};
use wiki_db::Database;

pub fn test_state() -> AppState {
    Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        sessions: SessionStore::generate(),
    })
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn location(&self) -> &str {
        self.headers
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap())
            .unwrap_or("")
    }
}

/// A browser stand-in: keeps cookies between requests like a real client.
pub struct TestClient {
    pub state: AppState,
    app: Router,
    cookies: BTreeMap<String, String>,
}

impl TestClient {
    pub fn new() -> Self {
        let state = test_state();
        let static_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../../static");
        Self {
            app: router(state.clone(), static_dir),
            state,
            cookies: BTreeMap::new(),
        }
    }

    pub fn has_cookie(&self, name: &str) -> bool {
        self.cookies.contains_key(name)
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// The `Cookie` request header this client would send next.
    pub fn cookie_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if !self.cookies.is_empty() {
            let pairs: Vec<String> = self
                .cookies
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect();
            headers.insert(header::COOKIE, pairs.join("; ").parse().unwrap());
        }
        headers
    }

    pub async fn get(&mut self, path: &str) -> TestResponse {
        let request = http::Request::get(path).body(Body::empty()).unwrap();
        self.send(request).await
    }

    pub async fn post(&mut self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        let body = form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let request = http::Request::post(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    pub async fn send(&mut self, mut request: Request) -> TestResponse {
        request.headers_mut().extend(self.cookie_headers());

        let response = self.app.clone().oneshot(request).await.unwrap();
        for set_cookie in response.headers().get_all(header::SET_COOKIE) {
            let cookie = Cookie::parse(set_cookie.to_str().unwrap().to_owned()).unwrap();
            if cookie.value().is_empty() {
                self.cookies.remove(cookie.name());
            } else {
                self.cookies
                    .insert(cookie.name().to_owned(), cookie.value().to_owned());
            }
        }

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        TestResponse {
            status,
            headers,
            body: String::from_utf8(bytes.to_vec()).unwrap(),
        }
    }

    /// Fetch a form page and pull the CSRF token out of its hidden field.
    pub async fn csrf_token(&mut self, form_path: &str) -> String {
        let page = self.get(form_path).await;
        assert_eq!(page.status, StatusCode::OK, "GET {form_path}: {}", page.body);
        extract_csrf(&page.body)
    }

    pub async fn signup(&mut self, name: &str, email: &str, password: &str) -> TestResponse {
        let token = self.csrf_token("/signup").await;
        self.post(
            "/signup",
            &[
                ("csrf_token", token.as_str()),
                ("name", name),
                ("email", email),
                ("password", password),
            ],
        )
        .await
    }

    pub async fn login(&mut self, email: &str, password: &str) -> TestResponse {
        let token = self.csrf_token("/login").await;
        self.post(
            "/login",
            &[("csrf_token", token.as_str()), ("email", email), ("password", password)],
        )
        .await
    }

    /// Sign up and log in as a fresh user.
    pub async fn logged_in() -> Self {
        let mut client = Self::new();
        let signup = client.signup("alice", "alice@example.com", "hunter22").await;
        assert_eq!(signup.status, StatusCode::SEE_OTHER);
        let login = client.login("alice@example.com", "hunter22").await;
        assert_eq!(login.status, StatusCode::SEE_OTHER);
        assert_eq!(login.location(), "/");
        client
    }
}

pub fn extract_csrf(html: &str) -> String {
    let marker = r#"name="csrf_token" value=""#;
    let start = html.find(marker).expect("page has no CSRF field") + marker.len();
    let end = html[start..].find('"').unwrap() + start;
    html[start..end].to_string()
}
