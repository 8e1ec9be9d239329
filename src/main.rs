use anyhow::Context;
use screen_sentry::capture::ScreenFrameSource;
use screen_sentry::config::{self, Secrets};
use screen_sentry::monitor::MonitorLoop;
use screen_sentry::notify::TelegramNotifier;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = config::load_config(Path::new("monitor.json"));
    let secrets = Secrets::from_env().context("telegram credentials")?;

    let notifier = TelegramNotifier::connect(&secrets.bot_token, secrets.chat_id)
        .await
        .context("telegram startup")?;

    info!(
        interval_secs = config.check_interval_secs,
        threshold = config.pixel_diff_threshold,
        "starting screen monitor"
    );

    let mut monitor = MonitorLoop::new(ScreenFrameSource, notifier, &config);
    monitor.run().await;

    Ok(())
}
