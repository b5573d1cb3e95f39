#![cfg_attr(all(windows, not(debug_assertions)), windows_subsystem = "windows")]

use anyhow::{Context, Result};
use eframe::egui;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod chat;
mod chatapp;
mod chatapp_ui;
mod endpoint;
mod nimclient;
mod settings;
#[cfg(test)]
mod test_server;

use chatapp::ChatApp;

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nim_chat=info")))
        .init();

    tracing::info!("Starting NIM Chat v{}", env!("CARGO_PKG_VERSION"));

    // Requests run on this runtime; it must outlive the window.
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    let handle = runtime.handle().clone();
    let config_path = settings::config_path();
    tracing::info!("Using settings file {}", config_path.display());

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("NIM Chat")
            .with_inner_size([480.0, 720.0]),
        ..Default::default()
    };

    eframe::run_native(
        "NIM Chat",
        options,
        Box::new(move |_cc| Box::new(ChatApp::new(handle, config_path))),
    )
    .map_err(|e| anyhow::anyhow!("Failed to run app: {}", e))
}
