use anyhow::{Context, Result};
use chrono::Local;
use setpoint::Config;
use tracing_subscriber::{fmt, EnvFilter};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).with_target(false).init();
}

fn main() -> Result<()> {
    // Load .env before anything reads the environment, RUST_LOG included.
    let dotenv = dotenvy::dotenv();
    init_tracing();
    match dotenv {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("ignoring unreadable .env: {e}"),
    }

    let outcome = Config::load()
        .context("configuration")
        .and_then(|config| {
            setpoint::run(&config, Local::now().naive_local()).context("prediction run")
        });

    match outcome {
        Ok(report) => {
            tracing::info!(
                ai_set_temp = %report.enrichment.ai_set_temp,
                predicted = report.prediction.value,
                "run complete"
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("{e:#}");
            Err(e)
        }
    }
}
