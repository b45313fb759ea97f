use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;
use tracing::warn;
use wiki_api::SessionStore;

/// Secrets that ship in sample configs and must never sign real sessions.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "dev-secret-change-me",
    "change-me",
    "changeme",
    "secret",
    "your-secret-here",
];

#[derive(Debug, Parser)]
#[command(name = "wiki", about = "A small multi-user wiki")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "WIKI_ADDR", default_value = "0.0.0.0:8080")]
    pub addr: SocketAddr,

    /// Datasource configuration file
    #[arg(long, env = "WIKI_DBCONF", default_value = "dbconfig.yml")]
    pub dbconf: PathBuf,

    /// Environment section of the datasource configuration
    #[arg(long, env = "WIKI_ENV", default_value = "development")]
    pub env: String,

    /// Directory served under /static
    #[arg(long, env = "WIKI_STATIC_DIR", default_value = "./static")]
    pub static_dir: PathBuf,

    /// Debug-level logging unless RUST_LOG says otherwise
    #[arg(long)]
    pub debug: bool,
}

impl Args {
    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "wiki=debug,wiki_api=debug,wiki_db=debug,tower_http=debug"
        } else {
            "wiki=info,wiki_api=info,wiki_db=info,tower_http=info"
        }
    }
}

/// Build the session store from `WIKI_SESSION_SECRET`, or a throwaway random
/// key when it is unset.
pub fn session_store(secret: Option<&str>) -> Result<SessionStore> {
    match secret {
        None | Some("") => {
            warn!("WIKI_SESSION_SECRET not set, using a random key; sessions will not survive a restart");
            Ok(SessionStore::generate())
        }
        Some(s) if PLACEHOLDER_SECRETS.contains(&s) => {
            bail!("WIKI_SESSION_SECRET is a placeholder value, set a real secret")
        }
        Some(s) => SessionStore::from_secret(s.as_bytes()),
    }
}
