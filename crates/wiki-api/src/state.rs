use std::sync::Arc;

use wiki_db::Database;

use crate::session::SessionStore;

pub type AppState = Arc<AppStateInner>;

/// Process-wide state, read-only after startup apart from the database itself.
pub struct AppStateInner {
    pub db: Database,
    pub sessions: SessionStore,
}
