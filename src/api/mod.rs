pub mod routes;

use crate::ai::SnippetGenerator;
use crate::ai::transport::CompletionTransport;
use crate::app::AppController;
use crate::db::SnippetStore;
use anyhow::{Context, Result};
use axum::Router;
use rust_embed::RustEmbed;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tracing::info;

#[derive(RustEmbed)]
#[folder = "assets/web"]
struct WindowAssets;

pub type DashboardController =
    AppController<SnippetGenerator<Box<dyn CompletionTransport>>, SnippetStore>;

/// One controller for every browser tab; the mutex keeps events sequential.
pub type SharedController = Arc<Mutex<DashboardController>>;

pub async fn run_server(state: routes::ApiState, port: u16) -> Result<()> {
    let app: Router = routes::router(state);

    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind dashboard server: {addr}"))?;

    info!(address = %addr, "CodeSnip dashboard started");

    axum::serve(listener, app)
        .await
        .context("Dashboard server failed")?;

    Ok(())
}

pub fn get_embedded_asset(path: &str) -> Option<(Vec<u8>, String)> {
    let normalized = path.trim_start_matches('/');
    let requested = if normalized.is_empty() {
        "index.html"
    } else {
        normalized
    };

    WindowAssets::get(requested)
        .map(|content| (content, requested))
        .or_else(|| WindowAssets::get("index.html").map(|content| (content, "index.html")))
        .map(|(content, served)| {
            let mime = mime_guess::from_path(served)
                .first_or_octet_stream()
                .to_string();
            (content.data.into_owned(), mime)
        })
}
