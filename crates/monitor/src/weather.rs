use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use haulvoice_core::config::WeatherConfig;

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("weather request failed: {0}")]
    Request(String),
    #[error("weather response malformed: {0}")]
    Decode(String),
    #[error("weather client misconfigured: {0}")]
    Configuration(String),
}

/// Current-conditions lookup by city name. Implementations return a short
/// spoken-ready description.
#[async_trait]
pub trait WeatherClient: Send + Sync {
    async fn weather_for_city(&self, city: &str) -> Result<String, WeatherError>;
}

/// OpenWeatherMap current-weather client.
pub struct OpenWeatherClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    units: String,
}

#[derive(Deserialize)]
struct WeatherResponse {
    main: WeatherMain,
    weather: Vec<WeatherCondition>,
}

#[derive(Deserialize)]
struct WeatherMain {
    temp: f64,
    feels_like: f64,
    humidity: i64,
}

#[derive(Deserialize)]
struct WeatherCondition {
    description: String,
}

impl OpenWeatherClient {
    pub fn from_config(config: &WeatherConfig) -> Result<Self, WeatherError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            WeatherError::Configuration("weather.api_key is not configured".to_string())
        })?;

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .context("building weather http client")
            .map_err(|error| WeatherError::Configuration(error.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            api_key,
            units: config.units.clone(),
        })
    }

    fn format_description(city: &str, response: &WeatherResponse) -> String {
        let description = response
            .weather
            .first()
            .map(|condition| condition.description.as_str())
            .unwrap_or("unknown conditions");

        format!(
            "The current weather in {city} is {description}. The temperature is {temp}°C, \
             feels like {feels}°C, with {humidity}% humidity.",
            temp = response.main.temp.round(),
            feels = response.main.feels_like.round(),
            humidity = response.main.humidity,
        )
    }
}

#[async_trait]
impl WeatherClient for OpenWeatherClient {
    async fn weather_for_city(&self, city: &str) -> Result<String, WeatherError> {
        let response = self
            .http
            .get(&self.base_url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.expose_secret()),
                ("units", &self.units),
            ])
            .send()
            .await
            .map_err(|error| WeatherError::Request(error.to_string()))?
            .error_for_status()
            .map_err(|error| WeatherError::Request(error.to_string()))?;

        let parsed: WeatherResponse =
            response.json().await.map_err(|error| WeatherError::Decode(error.to_string()))?;

        Ok(Self::format_description(city, &parsed))
    }
}

/// Scripted weather double: canned descriptions per city, with a default
/// for everything else.
#[derive(Default)]
pub struct ScriptedWeather {
    by_city: HashMap<String, Result<String, String>>,
    default_description: Option<String>,
}

impl ScriptedWeather {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear_everywhere() -> Self {
        Self { by_city: HashMap::new(), default_description: Some("clear sky".to_string()) }
    }

    pub fn with_city(mut self, city: &str, outcome: Result<String, String>) -> Self {
        self.by_city.insert(city.to_string(), outcome);
        self
    }
}

#[async_trait]
impl WeatherClient for ScriptedWeather {
    async fn weather_for_city(&self, city: &str) -> Result<String, WeatherError> {
        match self.by_city.get(city) {
            Some(Ok(description)) => Ok(description.clone()),
            Some(Err(error)) => Err(WeatherError::Request(error.clone())),
            None => self
                .default_description
                .clone()
                .ok_or_else(|| WeatherError::Request(format!("no script for {city}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{OpenWeatherClient, ScriptedWeather, WeatherClient, WeatherError, WeatherResponse};

    #[test]
    fn formats_spoken_description() {
        let response: WeatherResponse = serde_json::from_value(serde_json::json!({
            "main": {"temp": 21.4, "feels_like": 19.6, "humidity": 64},
            "weather": [{"description": "scattered thunderstorms"}]
        }))
        .expect("decode");

        let formatted = OpenWeatherClient::format_description("Tulsa", &response);
        assert_eq!(
            formatted,
            "The current weather in Tulsa is scattered thunderstorms. The temperature is 21°C, \
             feels like 20°C, with 64% humidity."
        );
    }

    #[tokio::test]
    async fn scripted_weather_falls_back_to_default() {
        let weather = ScriptedWeather::clear_everywhere()
            .with_city("Tulsa", Ok("Tornado warning in effect".to_string()))
            .with_city("Houston", Err("api down".to_string()));

        assert_eq!(
            weather.weather_for_city("Tulsa").await.expect("scripted"),
            "Tornado warning in effect"
        );
        assert!(matches!(
            weather.weather_for_city("Houston").await,
            Err(WeatherError::Request(_))
        ));
        assert_eq!(weather.weather_for_city("Austin").await.expect("default"), "clear sky");
    }
}
