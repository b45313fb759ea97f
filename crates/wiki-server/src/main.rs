mod config;

use std::backtrace::Backtrace;
use std::panic;
use std::sync::Arc;

use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use wiki_api::{AppState, AppStateInner};
use wiki_db::DbConfigs;

use crate::config::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_filter().into()),
        )
        .init();
    install_panic_hook();

    // Init database
    let db = DbConfigs::from_file(&args.dbconf)?.open(&args.env)?;
    info!("Using {} datasource from {}", args.env, args.dbconf.display());

    let secret = std::env::var("WIKI_SESSION_SECRET").ok();
    let sessions = config::session_store(secret.as_deref())?;

    let state: AppState = Arc::new(AppStateInner { db, sessions });

    let app = wiki_api::router(state, &args.static_dir).layer(TraceLayer::new_for_http());

    info!("Wiki server listening on {}", args.addr);
    let listener = tokio::net::TcpListener::bind(args.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Route panic reports through tracing. The dispatcher and the transaction
/// wrapper both recover, so this only adds the location and a backtrace.
fn install_panic_hook() {
    panic::set_hook(Box::new(|info| {
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".into());
        let location = info
            .location()
            .map(|l| l.to_string())
            .unwrap_or_else(|| "unknown location".into());
        error!(
            "panic at {}: {}\n{}",
            location,
            payload,
            Backtrace::force_capture()
        );
    }));
}
