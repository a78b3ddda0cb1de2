use reqwest;
use serde::Deserialize;
use std::{env, fmt, time::Duration};

const FORECAST_ENDPOINT: &str = "http://api.openweathermap.org/data/2.5/forecast";
const MAX_FORECAST_ENTRIES: usize = 5;

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    #[serde(default)]
    list: Vec<ForecastEntry>,
}

#[derive(Debug, Deserialize)]
struct ForecastEntry {
    dt_txt: String,
    main: ForecastMain,
    weather: Vec<ForecastCondition>,
}

#[derive(Debug, Deserialize)]
struct ForecastMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct ForecastCondition {
    main: String,
}

#[derive(Debug)]
pub enum WeatherError {
    EnvironmentError(String),
    HttpError(reqwest::Error),
    ResponseError(String),
}

impl fmt::Display for WeatherError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WeatherError::EnvironmentError(msg) => write!(f, "Environment error: {}", msg),
            WeatherError::HttpError(err) => write!(f, "HTTP error: {}", err),
            WeatherError::ResponseError(msg) => write!(f, "Response error: {}", msg),
        }
    }
}

impl std::error::Error for WeatherError {}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        WeatherError::HttpError(err)
    }
}

/// Forecast-by-city client. Failures here never abort the generation flow;
/// the orchestrator reduces them to an empty context string.
pub struct WeatherService {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl WeatherService {
    pub fn new() -> Result<Self, WeatherError> {
        let api_key = env::var("OPENWEATHER_API_KEY").map_err(|_| {
            WeatherError::EnvironmentError("OPENWEATHER_API_KEY not set".to_string())
        })?;

        Ok(Self::with_base_url(api_key, FORECAST_ENDPOINT.to_string()))
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_key,
            base_url,
        }
    }

    /// One-line summary of the next few forecast entries, for prompt
    /// embedding: `Weather forecast: 2026-08-10: 31°C, Rain, ...`
    pub async fn forecast_summary(&self, destination: &str) -> Result<String, WeatherError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", destination),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(WeatherError::ResponseError(format!(
                "forecast request failed with status {}",
                response.status()
            )));
        }

        let data: ForecastResponse = response.json().await?;
        if data.list.is_empty() {
            return Err(WeatherError::ResponseError(
                "forecast list is empty".to_string(),
            ));
        }

        let entries: Vec<String> = data
            .list
            .iter()
            .take(MAX_FORECAST_ENTRIES)
            .map(|forecast| {
                let date = forecast
                    .dt_txt
                    .split(' ')
                    .next()
                    .unwrap_or(forecast.dt_txt.as_str());
                let condition = forecast
                    .weather
                    .first()
                    .map(|w| w.main.as_str())
                    .unwrap_or("Unknown");
                format!("{}: {}°C, {}", date, forecast.main.temp.round() as i64, condition)
            })
            .collect();

        Ok(format!("Weather forecast: {}", entries.join(", ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn forecast_body() -> serde_json::Value {
        json!({
            "list": [
                { "dt_txt": "2026-08-10 09:00:00", "main": { "temp": 30.6 }, "weather": [{ "main": "Rain" }] },
                { "dt_txt": "2026-08-10 12:00:00", "main": { "temp": 31.2 }, "weather": [{ "main": "Clouds" }] },
                { "dt_txt": "2026-08-11 09:00:00", "main": { "temp": 29.8 }, "weather": [{ "main": "Rain" }] },
                { "dt_txt": "2026-08-11 12:00:00", "main": { "temp": 30.1 }, "weather": [{ "main": "Rain" }] },
                { "dt_txt": "2026-08-12 09:00:00", "main": { "temp": 28.4 }, "weather": [{ "main": "Clear" }] },
                { "dt_txt": "2026-08-12 12:00:00", "main": { "temp": 32.0 }, "weather": [{ "main": "Clear" }] }
            ]
        })
    }

    #[tokio::test]
    async fn summarizes_first_five_entries() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_query(mockito::Matcher::UrlEncoded("q".into(), "Goa".into()))
            .with_status(200)
            .with_body(forecast_body().to_string())
            .create_async()
            .await;

        let service = WeatherService::with_base_url("test-key".to_string(), server.url());
        let summary = service.forecast_summary("Goa").await.unwrap();

        mock.assert_async().await;
        assert!(summary.starts_with("Weather forecast: 2026-08-10: 31°C, Rain"));
        // Sixth entry is dropped.
        assert_eq!(summary.matches("°C").count(), 5);
        assert!(!summary.contains("32°C"));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/")
            .match_query(mockito::Matcher::Any)
            .with_status(401)
            .with_body("{\"cod\":401}")
            .create_async()
            .await;

        let service = WeatherService::with_base_url("bad-key".to_string(), server.url());
        assert!(service.forecast_summary("Goa").await.is_err());
    }

    #[tokio::test]
    async fn empty_forecast_list_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body("{\"list\":[]}")
            .create_async()
            .await;

        let service = WeatherService::with_base_url("test-key".to_string(), server.url());
        assert!(service.forecast_summary("Goa").await.is_err());
    }

    #[test]
    fn missing_key_fails_construction() {
        // Guard against env leakage from the host shell.
        std::env::remove_var("OPENWEATHER_API_KEY");
        assert!(WeatherService::new().is_err());
    }
}
