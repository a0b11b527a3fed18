//! Error taxonomy for a single prediction run.
//!
//! Every variant is terminal: the binary reports it and exits non-zero.
//! Nothing here is retried.

use std::path::PathBuf;

/// Failure of any step of the fetch-predict-write pipeline.
#[derive(Debug, thiserror::Error)]
pub enum SetpointError {
    /// A required setting is absent from the environment and config file.
    #[error("{key} not found in environment variables. Please set {key} in your .env file")]
    MissingConfiguration { key: &'static str },

    /// A setting is present but unusable.
    #[error("invalid configuration for {key}: {reason}")]
    InvalidConfiguration { key: String, reason: String },

    #[error(
        "Firebase credentials file not found: {}. Create a Firebase service account JSON file \
         and point FIREBASE_CREDENTIALS_PATH at it",
        .0.display()
    )]
    MissingCredentialFile(PathBuf),

    #[error("invalid service account credentials: {0}")]
    InvalidCredentials(String),

    /// The OAuth token exchange was rejected or returned no token.
    #[error("service account token exchange failed: {0}")]
    Auth(String),

    #[error("No sensor data found in Firebase.")]
    NoSensorData,

    /// The realtime database answered with a non-success status.
    #[error("realtime database {method} {path} returned {status}: {body}")]
    Store {
        method: &'static str,
        path: String,
        status: u16,
        body: String,
    },

    #[error("realtime database document {path} is malformed: {reason}")]
    MalformedDocument { path: String, reason: String },

    #[error("Failed to get weather data from OpenWeatherMap. Status code: {status}. Response: {body}")]
    WeatherApiFailure { status: u16, body: String },

    #[error("weather response is missing {0}")]
    MalformedWeather(&'static str),

    #[error("model artifact {}: {reason}", path.display())]
    ModelArtifact { path: PathBuf, reason: String },

    #[error("feature vector has {actual} columns, model expects {expected}")]
    FeatureWidth { expected: usize, actual: usize },

    #[error("model predicted {0}, refusing to write a set-point")]
    NonFinitePrediction(f64),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, SetpointError>;
