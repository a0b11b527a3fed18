//! Configuration schema and layered loading.
//!
//! Precedence, lowest first: built-in defaults, an optional TOML file, then
//! environment variables. Validation runs before any network traffic.

use crate::error::{Result, SetpointError};
use crate::weather::Coordinates;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CREDENTIALS_PATH: &str = "firebase-config.json";
pub const DEFAULT_MODEL_PATH: &str = "ac_model.json";
pub const DEFAULT_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
/// Colombo, Sri Lanka.
pub const DEFAULT_LATITUDE: f64 = 6.9271;
pub const DEFAULT_LONGITUDE: f64 = 79.8612;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_VAR: &str = "SETPOINT_CONFIG";
const LOCAL_CONFIG_FILE: &str = "setpoint.toml";

/// Fully resolved settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub firebase: FirebaseConfig,
    pub weather: WeatherConfig,
    pub model: ModelConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FirebaseConfig {
    /// Service-account JSON file.
    pub credentials_path: PathBuf,
    /// Database root, e.g. `https://my-app-default-rtdb.firebaseio.com`.
    pub database_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherConfig {
    pub api_key: String,
    pub base_url: String,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub path: PathBuf,
}

/// On-disk shape of `setpoint.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    firebase: FileFirebase,
    weather: FileWeather,
    model: FileModel,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileFirebase {
    credentials_path: Option<PathBuf>,
    database_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileWeather {
    api_key: Option<String>,
    base_url: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileModel {
    path: Option<PathBuf>,
}

impl Config {
    /// Load from the process environment and the first config file found.
    pub fn load() -> Result<Self> {
        let env = |key: &str| std::env::var(key).ok();
        let file = locate_config_file(&env)?;
        Self::load_with(env, file.as_deref())
    }

    /// Load using `env` as the variable lookup and an optional TOML file.
    ///
    /// Empty variables count as unset.
    pub fn load_with<F>(env: F, file: Option<&Path>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match file {
            Some(path) => read_file_config(path)?,
            None => FileConfig::default(),
        };
        let var = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let credentials_path = var("FIREBASE_CREDENTIALS_PATH")
            .map(PathBuf::from)
            .or(file.firebase.credentials_path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS_PATH));
        if !credentials_path.exists() {
            return Err(SetpointError::MissingCredentialFile(credentials_path));
        }

        let database_url = var("FIREBASE_DATABASE_URL")
            .or(file.firebase.database_url)
            .filter(|v| !v.trim().is_empty())
            .ok_or(SetpointError::MissingConfiguration {
                key: "FIREBASE_DATABASE_URL",
            })?;

        let api_key = var("OPENWEATHER_API_KEY")
            .or(file.weather.api_key)
            .filter(|v| !v.trim().is_empty())
            .ok_or(SetpointError::MissingConfiguration {
                key: "OPENWEATHER_API_KEY",
            })?;

        let latitude = match var("LATITUDE") {
            Some(raw) => parse_coordinate("LATITUDE", &raw, 90.0)?,
            None => check_coordinate(
                "LATITUDE",
                file.weather.latitude.unwrap_or(DEFAULT_LATITUDE),
                90.0,
            )?,
        };
        let longitude = match var("LONGITUDE") {
            Some(raw) => parse_coordinate("LONGITUDE", &raw, 180.0)?,
            None => check_coordinate(
                "LONGITUDE",
                file.weather.longitude.unwrap_or(DEFAULT_LONGITUDE),
                180.0,
            )?,
        };

        let base_url = var("OPENWEATHER_BASE_URL")
            .or(file.weather.base_url)
            .unwrap_or_else(|| DEFAULT_WEATHER_URL.to_string());

        let model_path = var("MODEL_PATH")
            .map(PathBuf::from)
            .or(file.model.path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH));

        Ok(Self {
            firebase: FirebaseConfig {
                credentials_path,
                database_url: database_url.trim_end_matches('/').to_string(),
            },
            weather: WeatherConfig {
                api_key,
                base_url,
                coordinates: Coordinates {
                    latitude,
                    longitude,
                },
            },
            model: ModelConfig { path: model_path },
        })
    }
}

/// Find the config file: `$SETPOINT_CONFIG`, then `./setpoint.toml`, then the
/// platform config directory. An explicitly named file must exist.
pub fn locate_config_file<F>(env: &F) -> Result<Option<PathBuf>>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(explicit) = env(CONFIG_PATH_VAR).filter(|v| !v.trim().is_empty()) {
        let path = PathBuf::from(explicit);
        if !path.is_file() {
            return Err(SetpointError::InvalidConfiguration {
                key: CONFIG_PATH_VAR.into(),
                reason: format!("{} does not exist", path.display()),
            });
        }
        return Ok(Some(path));
    }

    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Ok(Some(local));
    }

    Ok(directories::ProjectDirs::from("", "", "setpoint")
        .map(|dirs| dirs.config_dir().join("config.toml"))
        .filter(|path| path.is_file()))
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    let raw = std::fs::read_to_string(path).map_err(|e| SetpointError::InvalidConfiguration {
        key: path.display().to_string(),
        reason: e.to_string(),
    })?;
    toml::from_str(&raw).map_err(|e| SetpointError::InvalidConfiguration {
        key: path.display().to_string(),
        reason: e.to_string(),
    })
}

fn parse_coordinate(key: &str, raw: &str, limit: f64) -> Result<f64> {
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|_| SetpointError::InvalidConfiguration {
            key: key.into(),
            reason: format!("{raw:?} is not a number"),
        })?;
    check_coordinate(key, value, limit)
}

fn check_coordinate(key: &str, value: f64, limit: f64) -> Result<f64> {
    if !value.is_finite() || value.abs() > limit {
        return Err(SetpointError::InvalidConfiguration {
            key: key.into(),
            reason: format!("{value} is outside ±{limit}"),
        });
    }
    Ok(value)
}
