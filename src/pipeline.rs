//! One fetch-encode-predict-write run.
//!
//! Steps execute strictly in order and the first failure ends the run:
//! sensor document, feedback document, weather, encode, predict, write.

use crate::error::{Result, SetpointError};
use crate::features::{self, FeatureVector, RawInput};
use crate::model::Regressor;
use crate::store::{self, Enrichment, RealtimeStore, SensorSnapshot, UserFeedback};
use crate::weather::{Coordinates, WeatherSnapshot, WeatherSource};
use chrono::{NaiveDateTime, Timelike};

/// Value used for the `occupancy` feature; no occupancy sensor is wired up.
const DEFAULT_OCCUPANCY: f64 = 0.0;

/// Model output for one run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Raw regression output, degrees Celsius.
    pub value: f64,
}

impl Prediction {
    /// Nearest integer, ties to even.
    pub fn rounded(&self) -> i64 {
        self.value.round_ties_even() as i64
    }

    /// Set-point command stored in the database, e.g. `cool_24`.
    pub fn command(&self) -> String {
        format!("cool_{}", self.rounded())
    }
}

/// Everything a successful run read and wrote.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub sensor: SensorSnapshot,
    pub feedback: UserFeedback,
    pub weather: WeatherSnapshot,
    pub features: FeatureVector,
    pub prediction: Prediction,
    pub enrichment: Enrichment,
}

pub struct Pipeline<'a> {
    store: &'a dyn RealtimeStore,
    weather: &'a dyn WeatherSource,
    model: &'a dyn Regressor,
    location: Coordinates,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        store: &'a dyn RealtimeStore,
        weather: &'a dyn WeatherSource,
        model: &'a dyn Regressor,
        location: Coordinates,
    ) -> Self {
        Self {
            store,
            weather,
            model,
            location,
        }
    }

    /// Run once with `now` as the local wall-clock time.
    pub fn run_once(&self, now: NaiveDateTime) -> Result<RunReport> {
        let sensor = store::read_sensor_snapshot(self.store)?;
        let feedback = store::read_user_feedback(self.store)?;
        tracing::info!(
            indoor_temp = ?sensor.indoor_temp,
            indoor_humidity = ?sensor.indoor_humidity,
            activity_type = ?feedback.activity_type,
            status = ?feedback.status,
            "read realtime database"
        );

        let weather = self.weather.current(self.location)?;
        let hour = now.hour();
        tracing::info!(
            outdoor_temp = weather.outdoor_temp,
            outdoor_humidity = weather.outdoor_humidity,
            condition = %weather.condition,
            hour,
            "read outdoor weather"
        );

        let raw = raw_input(&sensor, &feedback, &weather, hour);
        let features = features::encode(&raw, self.model.feature_names());
        let prediction = Prediction {
            value: self.model.predict_one(features.values())?,
        };
        if !prediction.value.is_finite() {
            return Err(SetpointError::NonFinitePrediction(prediction.value));
        }
        tracing::info!(predicted = prediction.value, "predicted AC set temperature");

        let enrichment = Enrichment {
            ai_set_temp: prediction.command(),
            outdoor_humidity: weather.outdoor_humidity,
            outdoor_temp: weather.outdoor_temp,
            weather: weather.condition.clone(),
            time_of_day: hour,
            timestamp: now.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        };
        store::write_enrichment(self.store, &enrichment)?;
        tracing::info!(
            ai_set_temp = %enrichment.ai_set_temp,
            "wrote {}/ai_set_temp",
            store::SENSOR_PATH
        );

        Ok(RunReport {
            sensor,
            feedback,
            weather,
            features,
            prediction,
            enrichment,
        })
    }
}

/// Merge the three sources into the encoder's input record.
pub fn raw_input(
    sensor: &SensorSnapshot,
    feedback: &UserFeedback,
    weather: &WeatherSnapshot,
    hour: u32,
) -> RawInput {
    RawInput {
        indoor_temp: sensor.indoor_temp,
        indoor_humidity: sensor.indoor_humidity,
        occupancy: Some(DEFAULT_OCCUPANCY),
        time_of_day: Some(f64::from(hour)),
        outdoor_temp: Some(weather.outdoor_temp),
        outdoor_humidity: Some(weather.outdoor_humidity),
        weather: Some(weather.condition.clone()),
        activity_type: feedback.activity_type.clone(),
        user_feedback: feedback.status.clone(),
    }
}
