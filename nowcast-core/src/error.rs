use thiserror::Error;

/// Body message used when a non-2xx response carries no readable `message`.
pub const UNKNOWN_HTTP_ERROR: &str = "Unknown HTTP error";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "OPENWEATHER_API_KEY is not set.\n\
         Hint: pass --apikey <KEY>, export OPENWEATHER_API_KEY, or run `nowcast --configure`."
    )]
    MissingApiKey,
}

/// Why a single weather fetch produced no data.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The API answered with a non-2xx status.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Timeout, connection failure, or a body that could not be read.
    #[error("{}", describe_transport(.0))]
    Network(#[source] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    pub fn is_network(&self) -> bool {
        matches!(self, FetchError::Network(_))
    }
}

fn describe_transport(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        return "request timed out".to_string();
    }

    // reqwest keeps the root cause (DNS failure, refused connection) in the source chain.
    let mut message = err.to_string();
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
