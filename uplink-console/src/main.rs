//! Uplink Console
//!
//! An interactive console for managing the communication devices a telemetry
//! uplink emits on and for starting, stopping and resuming its sending loop.

mod app;
mod commands;
mod settings;

use settings::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the console itself
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "uplink=info,uplink_core=info,uplink_sim=info,uplink_detect=info,uplink_types=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting uplink console");

    let settings = Settings::load();
    app::run(settings).await
}
