use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::warn;

use super::remote::call_with_timeout;

/// Degraded value attached to outfits when conditions cannot be fetched.
pub const UNKNOWN_WEATHER: &str = "Unknown";

/// Current conditions at a location.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub condition: String,
    pub temperature_c: f64,
}

impl fmt::Display for WeatherReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {:.1}°C", self.condition, self.temperature_c)
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, location: &str) -> Result<WeatherReport, WeatherError>;
}

#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("missing OPENWEATHER_API_KEY")]
    MissingApiKey,
    #[error("weather request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("weather API error ({status}): {body}")]
    Status { status: u16, body: String },
    #[error("malformed weather response: {0}")]
    Malformed(String),
}

#[derive(Debug, Deserialize)]
struct CurrentConditions {
    weather: Vec<ConditionEntry>,
    main: MainReadings,
}

#[derive(Debug, Deserialize)]
struct ConditionEntry {
    main: String,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
}

pub(crate) fn parse_report(body: &[u8]) -> Result<WeatherReport, WeatherError> {
    let conditions: CurrentConditions =
        serde_json::from_slice(body).map_err(|err| WeatherError::Malformed(err.to_string()))?;
    let condition = conditions
        .weather
        .into_iter()
        .next()
        .ok_or_else(|| WeatherError::Malformed("empty weather list".to_string()))?;

    Ok(WeatherReport {
        condition: condition.main,
        temperature_c: conditions.main.temp,
    })
}

/// OpenWeather "current weather" client (metric units).
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenWeatherClient {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn current(&self, location: &str) -> Result<WeatherReport, WeatherError> {
        let api_key = self.api_key.as_deref().ok_or(WeatherError::MissingApiKey)?;

        let response = self
            .client
            .get(format!("{}/weather", self.base_url))
            .query(&[("q", location), ("appid", api_key), ("units", "metric")])
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(WeatherError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        parse_report(&body)
    }
}

/// Fetches conditions for the fixed reference location, never failing.
#[derive(Clone)]
pub struct WeatherEnricher {
    provider: Arc<dyn WeatherProvider>,
    location: String,
    timeout: Duration,
}

impl WeatherEnricher {
    pub fn new(provider: Arc<dyn WeatherProvider>, location: impl Into<String>, timeout: Duration) -> Self {
        Self {
            provider,
            location: location.into(),
            timeout,
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// `"<condition>, <temp>°C"`, or [`UNKNOWN_WEATHER`] on any failure.
    pub async fn current_weather(&self) -> String {
        match call_with_timeout(self.timeout, self.provider.current(&self.location)).await {
            Ok(report) => report.to_string(),
            Err(failure) => {
                warn!(location = %self.location, error = %failure, "could not fetch weather");
                UNKNOWN_WEATHER.to_string()
            }
        }
    }
}

impl fmt::Debug for WeatherEnricher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeatherEnricher")
            .field("location", &self.location)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_condition_and_temperature() {
        let report = WeatherReport {
            condition: "Clouds".to_string(),
            temperature_c: 14.26,
        };
        assert_eq!(report.to_string(), "Clouds, 14.3°C");
    }

    #[test]
    fn parses_openweather_payload() {
        let body = br#"{"weather":[{"id":803,"main":"Clouds","description":"broken clouds"}],"main":{"temp":9.0,"humidity":81},"name":"London"}"#;
        let report = parse_report(body).expect("valid payload");
        assert_eq!(report.condition, "Clouds");
        assert_eq!(report.to_string(), "Clouds, 9.0°C");
    }

    #[test]
    fn empty_condition_list_is_malformed() {
        let body = br#"{"weather":[],"main":{"temp":9.0}}"#;
        assert!(matches!(parse_report(body), Err(WeatherError::Malformed(_))));
    }

    #[tokio::test]
    async fn missing_api_key_degrades_to_unknown() {
        let client = OpenWeatherClient::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9/data/2.5",
            None,
        );
        match client.current("London").await {
            Err(WeatherError::MissingApiKey) => {}
            other => panic!("expected missing key, got {other:?}"),
        }

        let enricher = WeatherEnricher::new(Arc::new(client), "London", Duration::from_secs(1));
        assert_eq!(enricher.current_weather().await, UNKNOWN_WEATHER);
    }
}
