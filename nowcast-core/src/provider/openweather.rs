use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::{
    error::{FetchError, UNKNOWN_HTTP_ERROR},
    model::{Observation, WeatherRequest},
};

use super::WeatherProvider;

const CURRENT_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> anyhow::Result<Self> {
        Self::with_endpoint(api_key, CURRENT_WEATHER_URL, REQUEST_TIMEOUT)
    }

    /// Point the client at another endpoint, e.g. a local mock server.
    pub fn with_endpoint(
        api_key: String,
        url: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { api_key, url: url.into(), http })
    }

    async fn fetch_current(&self, request: &WeatherRequest) -> Result<Observation, FetchError> {
        debug!(city = %request.city, units = %request.units, "requesting current weather");

        let res = self
            .http
            .get(&self.url)
            .query(&[
                ("q", request.city.as_str()),
                ("appid", self.api_key.as_str()),
                ("units", request.units.as_str()),
            ])
            .send()
            .await
            .map_err(network_error)?;

        let status = res.status();
        let body = res.text().await.map_err(network_error)?;

        if !status.is_success() {
            let message = api_message(&body);
            debug!(status = status.as_u16(), %message, "OpenWeather request failed");
            return Err(FetchError::Api { status: status.as_u16(), message });
        }

        // Derived structs would also accept a JSON array; only an object is a valid answer.
        let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&body)?;
        let parsed: OwCurrentResponse = serde_json::from_value(serde_json::Value::Object(object))?;
        debug!(location = ?parsed.name, "received current weather");

        Ok(parsed.into())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwMain {
    temp: Option<f64>,
    feels_like: Option<f64>,
    humidity: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwWeather {
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwWind {
    speed: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwSys {
    country: Option<String>,
    sunrise: Option<i64>,
    sunset: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwCurrentResponse {
    name: Option<String>,
    dt: Option<i64>,
    timezone: Option<i64>,
    main: Option<OwMain>,
    weather: Option<Vec<OwWeather>>,
    wind: Option<OwWind>,
    sys: Option<OwSys>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwErrorBody {
    message: Option<String>,
}

impl From<OwCurrentResponse> for Observation {
    fn from(raw: OwCurrentResponse) -> Self {
        // A sub-object sent as `null` degrades the same way as a missing one.
        let main = raw.main.unwrap_or_default();
        let wind = raw.wind.unwrap_or_default();
        let sys = raw.sys.unwrap_or_default();
        let description = raw
            .weather
            .unwrap_or_default()
            .into_iter()
            .next()
            .and_then(|w| w.description);

        Observation {
            city: raw.name,
            country: sys.country,
            description,
            temperature: main.temp,
            feels_like: main.feels_like,
            humidity: main.humidity,
            wind_speed: wind.speed,
            timezone_offset: raw.timezone.unwrap_or(0),
            observed_at: raw.dt,
            sunrise: sys.sunrise,
            sunset: sys.sunset,
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn current(&self, request: &WeatherRequest) -> Result<Observation, FetchError> {
        self.fetch_current(request).await
    }
}

/// The request URL carries the API key, so it never goes into the message.
fn network_error(err: reqwest::Error) -> FetchError {
    FetchError::Network(err.without_url())
}

fn api_message(body: &str) -> String {
    serde_json::from_str::<OwErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_HTTP_ERROR.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Units;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const WEATHER_PATH: &str = "/data/2.5/weather";

    fn provider_for(server: &MockServer, timeout: Duration) -> OpenWeatherProvider {
        OpenWeatherProvider::with_endpoint(
            "TEST_KEY".to_string(),
            format!("{}{WEATHER_PATH}", server.uri()),
            timeout,
        )
        .unwrap()
    }

    fn london_body() -> serde_json::Value {
        serde_json::json!({
            "name": "London",
            "dt": 1_705_300_200,
            "timezone": 0,
            "weather": [{"id": 803, "main": "Clouds", "description": "broken clouds"}],
            "main": {"temp": 7.5, "feels_like": 5, "humidity": 81},
            "wind": {"speed": 4.12, "deg": 240},
            "sys": {"country": "GB", "sunrise": 1_705_305_600, "sunset": 1_705_335_900},
            "cod": 200
        })
    }

    #[tokio::test]
    async fn sends_query_and_maps_all_fields() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(WEATHER_PATH))
            .and(query_param("q", "London,GB"))
            .and(query_param("appid", "TEST_KEY"))
            .and(query_param("units", "imperial"))
            .respond_with(ResponseTemplate::new(200).set_body_json(london_body()))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider_for(&server, REQUEST_TIMEOUT);
        let obs = provider
            .current(&WeatherRequest::new("London,GB", Units::Imperial))
            .await
            .unwrap();

        assert_eq!(obs.city.as_deref(), Some("London"));
        assert_eq!(obs.country.as_deref(), Some("GB"));
        assert_eq!(obs.description.as_deref(), Some("broken clouds"));
        assert_eq!(obs.temperature, Some(7.5));
        assert_eq!(obs.feels_like, Some(5.0));
        assert_eq!(obs.humidity, Some(81.0));
        assert_eq!(obs.wind_speed, Some(4.12));
        assert_eq!(obs.observed_at, Some(1_705_300_200));
        assert_eq!(obs.sunrise, Some(1_705_305_600));
        assert_eq!(obs.sunset, Some(1_705_335_900));
    }

    #[tokio::test]
    async fn missing_fields_become_none() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(WEATHER_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "Nowhere",
                "weather": [],
                "main": {"temp": 1.0},
                "sys": {"sunset": 1_705_335_900}
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server, REQUEST_TIMEOUT);
        let obs = provider
            .current(&WeatherRequest::new("Nowhere", Units::Metric))
            .await
            .unwrap();

        assert_eq!(obs.description, None);
        assert_eq!(obs.sunrise, None);
        assert_eq!(obs.sunset, Some(1_705_335_900));
        assert_eq!(obs.humidity, None);
        assert_eq!(obs.wind_speed, None);
        assert_eq!(obs.country, None);
        assert_eq!(obs.observed_at, None);
        assert_eq!(obs.timezone_offset, 0);
    }

    #[tokio::test]
    async fn not_found_carries_body_message() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(WEATHER_PATH))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(serde_json::json!({"cod": "404", "message": "city not found"})),
            )
            .mount(&server)
            .await;

        let provider = provider_for(&server, REQUEST_TIMEOUT);
        let err = provider
            .current(&WeatherRequest::new("Atlantis", Units::Metric))
            .await
            .unwrap_err();

        match err {
            FetchError::Api { status, message } => {
                assert_eq!(status, 404);
                assert_eq!(message, "city not found");
            }
            other => panic!("expected API error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn error_without_message_uses_default() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(WEATHER_PATH))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
            .mount(&server)
            .await;

        let provider = provider_for(&server, REQUEST_TIMEOUT);
        let err = provider
            .current(&WeatherRequest::new("London", Units::Metric))
            .await
            .unwrap_err();

        assert!(!err.is_network());
        assert_eq!(err.to_string(), UNKNOWN_HTTP_ERROR);
    }

    #[tokio::test]
    async fn timeout_is_a_network_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(WEATHER_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(london_body())
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let provider = provider_for(&server, Duration::from_millis(100));
        let err = provider
            .current(&WeatherRequest::new("London", Units::Metric))
            .await
            .unwrap_err();

        assert!(err.is_network());
        assert_eq!(err.to_string(), "request timed out");
    }

    #[tokio::test]
    async fn network_error_does_not_leak_api_key() {
        // Reserve a free port, then release it so the connection is refused.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        let url = format!("http://127.0.0.1:{port}{WEATHER_PATH}");

        let provider =
            OpenWeatherProvider::with_endpoint("SECRET_KEY".to_string(), url, REQUEST_TIMEOUT)
                .unwrap();
        let err = provider
            .current(&WeatherRequest::new("London", Units::Metric))
            .await
            .unwrap_err();

        assert!(err.is_network());
        assert!(!err.to_string().contains("SECRET_KEY"));
    }

    #[tokio::test]
    async fn malformed_success_body_is_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(WEATHER_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let provider = provider_for(&server, REQUEST_TIMEOUT);
        let err = provider
            .current(&WeatherRequest::new("London", Units::Metric))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[tokio::test]
    async fn array_success_body_is_decode_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(WEATHER_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .mount(&server)
            .await;

        let provider = provider_for(&server, REQUEST_TIMEOUT);
        let err = provider
            .current(&WeatherRequest::new("London", Units::Metric))
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Decode(_)));
        assert!(!err.is_network());
    }

    #[tokio::test]
    async fn null_sub_objects_become_none() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(WEATHER_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "Nullville",
                "dt": 1_705_300_200,
                "weather": null,
                "main": null,
                "wind": null,
                "sys": null
            })))
            .mount(&server)
            .await;

        let provider = provider_for(&server, REQUEST_TIMEOUT);
        let obs = provider
            .current(&WeatherRequest::new("Nullville", Units::Metric))
            .await
            .unwrap();

        assert_eq!(obs.city.as_deref(), Some("Nullville"));
        assert_eq!(obs.observed_at, Some(1_705_300_200));
        assert_eq!(obs.description, None);
        assert_eq!(obs.temperature, None);
        assert_eq!(obs.wind_speed, None);
        assert_eq!(obs.country, None);
        assert_eq!(obs.sunrise, None);
    }

    #[test]
    fn api_message_falls_back_for_blank_message() {
        assert_eq!(api_message(r#"{"message": ""}"#), UNKNOWN_HTTP_ERROR);
        assert_eq!(api_message(r#"{"message": "Invalid API key"}"#), "Invalid API key");
        assert_eq!(api_message(""), UNKNOWN_HTTP_ERROR);
    }
}
