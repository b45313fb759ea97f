use std::collections::BTreeMap;
use std::mem;

use anyhow::{Context as _, bail};
use axum::http::{HeaderMap, HeaderValue, header};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD as B64};
use chrono::{Duration, Utc};
use cookie::{Cookie, CookieJar, Key, SameSite};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{Error, ResponseBuffer};

pub const SESSION_COOKIE: &str = "wikisession";

/// Shortest accepted session secret; the signing key is derived from it.
pub const MIN_SECRET_LEN: usize = 32;

const DEFAULT_MAX_AGE_DAYS: i64 = 30;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SessionData {
    #[serde(default)]
    values: BTreeMap<String, Value>,
    #[serde(default)]
    flashes: Vec<String>,
    #[serde(default)]
    expires_at: i64,
}

/// Per-browser key/value state, carried entirely in a signed cookie.
#[derive(Debug, Clone, Default)]
pub struct Session {
    data: SessionData,
    cleared: bool,
}

impl Session {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.values.get(key)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.cleared = false;
        self.data.values.insert(key.to_string(), value.into());
    }

    /// Drop every value and flash but keep the cookie alive.
    pub fn reset(&mut self) {
        self.data = SessionData::default();
        self.cleared = false;
    }

    /// Drop everything and expire the cookie on the next save.
    pub fn clear(&mut self) {
        self.data = SessionData::default();
        self.cleared = true;
    }

    /// Authenticated iff `id` is present, numeric and non-zero.
    pub fn is_authenticated(&self) -> bool {
        self.get_i64("id").is_some_and(|id| id != 0)
    }

    /// Queue a one-shot message. Only one is kept; a newer one replaces it.
    pub fn add_flash(&mut self, message: impl Into<String>) {
        self.cleared = false;
        self.data.flashes = vec![message.into()];
    }

    pub fn flashes(&self) -> &[String] {
        &self.data.flashes
    }

    pub fn take_flashes(&mut self) -> Vec<String> {
        mem::take(&mut self.data.flashes)
    }
}

/// Loads and saves [`Session`]s as signed cookies. The key is fixed at
/// construction and shared read-only by every request.
pub struct SessionStore {
    key: Key,
    max_age: Duration,
}

impl SessionStore {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            max_age: Duration::days(DEFAULT_MAX_AGE_DAYS),
        }
    }

    pub fn from_secret(secret: &[u8]) -> anyhow::Result<Self> {
        if secret.len() < MIN_SECRET_LEN {
            bail!(
                "session secret must be at least {} bytes, got {}",
                MIN_SECRET_LEN,
                secret.len()
            );
        }
        Ok(Self::new(Key::derive_from(secret)))
    }

    /// Random key; sessions do not survive a restart.
    pub fn generate() -> Self {
        Self::new(Key::generate())
    }

    /// Fails closed: a missing, forged, corrupt or expired cookie all give an
    /// empty session.
    pub fn load(&self, headers: &HeaderMap) -> Session {
        let Some(raw) = self.read_signed(headers, SESSION_COOKIE) else {
            return Session::default();
        };
        match decode(&raw) {
            Ok(data) if data.expires_at > Utc::now().timestamp() => Session {
                data,
                cleared: false,
            },
            Ok(_) => {
                debug!("Ignoring expired session cookie");
                Session::default()
            }
            Err(e) => {
                warn!("Ignoring corrupt session cookie: {:#}", e);
                Session::default()
            }
        }
    }

    pub fn logged_in(&self, headers: &HeaderMap) -> bool {
        self.load(headers).is_authenticated()
    }

    /// Write the session's `Set-Cookie` into the buffered response.
    pub fn save(&self, session: &Session, response: &mut ResponseBuffer) -> Result<(), Error> {
        if session.cleared {
            let mut removal = Cookie::build((SESSION_COOKIE, "")).path("/").build();
            removal.make_removal();
            let value = HeaderValue::try_from(removal.to_string()).map_err(anyhow::Error::from)?;
            response.append_header(header::SET_COOKIE, value);
            return Ok(());
        }

        let mut data = session.data.clone();
        data.expires_at = (Utc::now() + self.max_age).timestamp();
        let cookie = Cookie::build((SESSION_COOKIE, encode(&data)?))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .max_age(cookie::time::Duration::seconds(self.max_age.num_seconds()))
            .build();
        self.write_signed(response, cookie)
    }

    /// Value of cookie `name` if present and its signature checks out.
    pub fn read_signed(&self, headers: &HeaderMap, name: &str) -> Option<String> {
        let mut jar = CookieJar::new();
        for value in headers.get_all(header::COOKIE) {
            let Ok(value) = value.to_str() else { continue };
            for cookie in Cookie::split_parse(value.to_owned()).flatten() {
                jar.add_original(cookie);
            }
        }
        jar.signed(&self.key)
            .get(name)
            .map(|cookie| cookie.value().to_owned())
    }

    pub fn write_signed(
        &self,
        response: &mut ResponseBuffer,
        cookie: Cookie<'static>,
    ) -> Result<(), Error> {
        let mut jar = CookieJar::new();
        jar.signed_mut(&self.key).add(cookie);
        for signed in jar.delta() {
            let value = HeaderValue::try_from(signed.to_string()).map_err(anyhow::Error::from)?;
            response.append_header(header::SET_COOKIE, value);
        }
        Ok(())
    }
}

fn encode(data: &SessionData) -> anyhow::Result<String> {
    let json = serde_json::to_vec(data).context("session encode failed")?;
    Ok(B64.encode(json))
}

fn decode(raw: &str) -> anyhow::Result<SessionData> {
    let json = B64.decode(raw).context("session payload is not base64")?;
    serde_json::from_slice(&json).context("session payload is not valid JSON")
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Turn the `Set-Cookie` headers of a response into a request `Cookie` header.
    fn replay(response: &ResponseBuffer) -> HeaderMap {
        let pairs: Vec<String> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| {
                let cookie = Cookie::parse(v.to_str().unwrap().to_owned()).unwrap();
                format!("{}={}", cookie.name(), cookie.value())
            })
            .collect();
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::try_from(pairs.join("; ")).unwrap());
        headers
    }

    fn saved(store: &SessionStore, session: &Session) -> HeaderMap {
        let mut buf = ResponseBuffer::new();
        store.save(session, &mut buf).unwrap();
        replay(&buf)
    }

    fn signed_payload(store: &SessionStore, data: &SessionData) -> HeaderMap {
        let mut buf = ResponseBuffer::new();
        let cookie = Cookie::new(SESSION_COOKIE, encode(data).unwrap());
        store.write_signed(&mut buf, cookie).unwrap();
        replay(&buf)
    }

    #[test]
    fn round_trips_values() {
        let store = SessionStore::generate();
        let mut session = Session::default();
        session.set("id", 7);
        session.set("name", "alice");

        let loaded = store.load(&saved(&store, &session));
        assert_eq!(loaded.get_i64("id"), Some(7));
        assert_eq!(loaded.get_str("name"), Some("alice"));
        assert!(loaded.is_authenticated());
    }

    #[test]
    fn no_cookie_is_anonymous() {
        let store = SessionStore::generate();
        assert!(!store.logged_in(&HeaderMap::new()));
    }

    #[test]
    fn missing_or_zero_id_is_anonymous() {
        let store = SessionStore::generate();

        let mut session = Session::default();
        session.set("name", "alice");
        session.set("email", "a@example.com");
        assert!(!store.logged_in(&saved(&store, &session)));

        session.set("id", 0);
        assert!(!store.logged_in(&saved(&store, &session)));

        session.set("id", "12");
        assert!(!store.logged_in(&saved(&store, &session)));
    }

    #[test]
    fn expired_cookie_is_anonymous() {
        let store = SessionStore::generate();
        let mut values = BTreeMap::new();
        values.insert("id".to_string(), Value::from(3));
        let data = SessionData {
            values,
            flashes: vec![],
            expires_at: Utc::now().timestamp() - 1,
        };
        assert!(!store.logged_in(&signed_payload(&store, &data)));
    }

    #[test]
    fn forged_or_foreign_cookie_is_anonymous() {
        let store = SessionStore::generate();
        let mut session = Session::default();
        session.set("id", 1);
        let headers = saved(&store, &session);

        let other = SessionStore::generate();
        assert!(!other.logged_in(&headers));

        let mut forged = HeaderMap::new();
        let payload = encode(&SessionData {
            values: BTreeMap::from([("id".to_string(), Value::from(1))]),
            flashes: vec![],
            expires_at: i64::MAX,
        })
        .unwrap();
        forged.insert(
            header::COOKIE,
            HeaderValue::try_from(format!("{SESSION_COOKIE}={payload}")).unwrap(),
        );
        assert!(!store.logged_in(&forged));
    }

    #[test]
    fn clear_writes_a_removal_cookie() {
        let store = SessionStore::generate();
        let mut session = Session::default();
        session.set("id", 1);
        session.clear();
        assert!(!session.is_authenticated());

        let mut buf = ResponseBuffer::new();
        store.save(&session, &mut buf).unwrap();
        let set_cookie = buf.headers()[header::SET_COOKIE].to_str().unwrap();
        let cookie = Cookie::parse(set_cookie.to_owned()).unwrap();
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "");
        assert_eq!(cookie.max_age(), Some(cookie::time::Duration::ZERO));
    }

    #[test]
    fn keeps_at_most_one_flash() {
        let mut session = Session::default();
        session.add_flash("first");
        session.add_flash("second");
        assert_eq!(session.flashes(), ["second".to_string()]);

        assert_eq!(session.take_flashes(), vec!["second".to_string()]);
        assert!(session.flashes().is_empty());
    }

    #[test]
    fn short_secret_is_rejected() {
        assert!(SessionStore::from_secret(b"too short").is_err());
        assert!(SessionStore::from_secret(&[7u8; MIN_SECRET_LEN]).is_ok());
    }
}
