pub mod schema;

pub use schema::{
    locate_config_file, Config, FirebaseConfig, ModelConfig, WeatherConfig, CONFIG_PATH_VAR,
    DEFAULT_CREDENTIALS_PATH, DEFAULT_LATITUDE, DEFAULT_LONGITUDE, DEFAULT_MODEL_PATH,
    DEFAULT_WEATHER_URL,
};
