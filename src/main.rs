//! mictest: terminal microphone tester.

mod app;
mod commands;
mod config;
mod logging;
mod recording;

#[tokio::main]
async fn main() {
    if let Err(e) = app::run().await {
        tracing::error!("{e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
