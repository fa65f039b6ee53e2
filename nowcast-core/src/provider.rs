use crate::{FetchError, Observation, WeatherRequest};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

pub use openweather::OpenWeatherProvider;

/// A source of current weather observations.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Issues a single request; no retries.
    async fn current(&self, request: &WeatherRequest) -> Result<Observation, FetchError>;
}
