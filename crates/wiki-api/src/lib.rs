//! HTTP layer of the wiki: the error-typed handler contract, response
//! buffering with panic recovery, signed-cookie sessions, CSRF protection,
//! and the article/user handlers built on top of them.

pub mod articles;
pub mod csrf;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod pages;
pub mod response;
pub mod routes;
pub mod session;
pub mod state;
pub mod users;

pub use dispatch::{MAX_BODY_BYTES, dispatch};
pub use error::{Error, HttpError};
pub use handler::{Context, Handler, HandlerResult};
pub use response::ResponseBuffer;
pub use routes::router;
pub use session::{Session, SessionStore};
pub use state::{AppState, AppStateInner};
