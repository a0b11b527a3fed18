//! Outdoor conditions from the OpenWeatherMap current-weather endpoint.
//!
//! One blocking GET per run. Any non-success status aborts the run with the
//! status code and body attached.

use crate::error::{Result, SetpointError};
use serde::Deserialize;

/// Geographic position passed to the weather service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Outdoor reading used as model input and written back to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSnapshot {
    /// Degrees Celsius.
    pub outdoor_temp: f64,
    /// Relative humidity, percent.
    pub outdoor_humidity: f64,
    /// Condition group such as `Clouds`, `Rain` or `Clear`.
    pub condition: String,
}

/// Source of the current outdoor conditions.
pub trait WeatherSource {
    fn current(&self, at: Coordinates) -> Result<WeatherSnapshot>;
}

#[derive(Deserialize)]
struct CurrentWeather {
    main: Option<MainBlock>,
    #[serde(default)]
    weather: Vec<ConditionBlock>,
}

#[derive(Deserialize)]
struct MainBlock {
    temp: Option<f64>,
    humidity: Option<f64>,
}

#[derive(Deserialize)]
struct ConditionBlock {
    main: Option<String>,
}

/// Blocking OpenWeatherMap client. Requests metric units.
pub struct OpenWeatherClient {
    api_key: String,
    base_url: String,
    http: reqwest::blocking::Client,
}

impl OpenWeatherClient {
    pub fn with_client(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        http: reqwest::blocking::Client,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            http,
        }
    }
}

impl WeatherSource for OpenWeatherClient {
    fn current(&self, at: Coordinates) -> Result<WeatherSnapshot> {
        let resp = self
            .http
            .get(&self.base_url)
            .query(&[
                ("lat", at.latitude.to_string()),
                ("lon", at.longitude.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_string()),
            ])
            .send()?;

        let status = resp.status();
        let body = resp.text().unwrap_or_else(|_| "<unreadable>".to_string());
        if !status.is_success() {
            return Err(SetpointError::WeatherApiFailure {
                status: status.as_u16(),
                body,
            });
        }

        parse_current_weather(&body)
    }
}

/// Pull `main.temp`, `main.humidity` and `weather[0].main` out of a response body.
pub fn parse_current_weather(body: &str) -> Result<WeatherSnapshot> {
    let parsed: CurrentWeather =
        serde_json::from_str(body).map_err(|_| SetpointError::MalformedWeather("a JSON body"))?;
    let main = parsed.main.ok_or(SetpointError::MalformedWeather("main"))?;

    Ok(WeatherSnapshot {
        outdoor_temp: main
            .temp
            .ok_or(SetpointError::MalformedWeather("main.temp"))?,
        outdoor_humidity: main
            .humidity
            .ok_or(SetpointError::MalformedWeather("main.humidity"))?,
        condition: parsed
            .weather
            .into_iter()
            .next()
            .and_then(|w| w.main)
            .ok_or(SetpointError::MalformedWeather("weather[0].main"))?,
    })
}
