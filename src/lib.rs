//! Predicts an air-conditioner set temperature from indoor readings, user
//! feedback and outdoor weather, and writes it back to the realtime database.
//!
//! A run is a straight line: read `/sensor_data` and `/user_feedback`, fetch
//! the current weather, encode features against the model schema, predict,
//! patch the result into `/sensor_data`. Scheduling repeated runs is left to
//! cron or a systemd timer.

pub mod config;
pub mod error;
pub mod features;
pub mod model;
pub mod pipeline;
pub mod store;
pub mod weather;

pub use config::Config;
pub use error::{Result, SetpointError};
pub use pipeline::{Pipeline, Prediction, RunReport};

use chrono::NaiveDateTime;
use model::{Model, Regressor};
use store::{FirebaseClient, ServiceAccountKey, ServiceAccountTokenSource};
use weather::OpenWeatherClient;

/// Build the real collaborators from `config` and run the pipeline once.
///
/// Local inputs (credentials, model) are loaded before any network request.
pub fn run(config: &Config, now: NaiveDateTime) -> Result<RunReport> {
    let key = ServiceAccountKey::from_file(&config.firebase.credentials_path)?;
    let model = Model::load(&config.model.path)?;
    tracing::info!(
        path = %config.model.path.display(),
        features = model.feature_names().len(),
        "loaded model"
    );

    let http = reqwest::blocking::Client::builder()
        .user_agent(concat!("setpoint/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let db = FirebaseClient::new(
        config.firebase.database_url.clone(),
        Box::new(ServiceAccountTokenSource::new(key, http.clone())),
        http.clone(),
    );
    let weather = OpenWeatherClient::with_client(
        config.weather.api_key.clone(),
        config.weather.base_url.clone(),
        http,
    );

    Pipeline::new(&db, &weather, &model, config.weather.coordinates).run_once(now)
}
