//! Core library for the `nowcast` CLI.
//!
//! This crate defines:
//! - Configuration & API key resolution
//! - Abstraction over the weather provider and the OpenWeather client
//! - Shared domain models (requests, observations) and display formatting
//!
//! It is used by `nowcast-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod format;
pub mod model;
pub mod provider;

pub use config::{Config, ProviderConfig};
pub use error::{ConfigError, FetchError};
pub use model::{Observation, Units, WeatherRequest};
pub use provider::{OpenWeatherProvider, WeatherProvider};
