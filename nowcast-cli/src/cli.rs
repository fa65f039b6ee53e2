use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use inquire::{Password, PasswordDisplayMode};
use nowcast_core::{Config, OpenWeatherProvider, Units, WeatherProvider, WeatherRequest};
use std::io::{self, IsTerminal, Write};
use tracing::{debug, warn};

use crate::render::Renderer;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "nowcast", version, about = "Current weather conditions for a city")]
pub struct Cli {
    /// City name, e.g. 'Bengaluru' or 'New York,US'. Words are joined with spaces.
    #[arg(required_unless_present = "configure", num_args = 1..)]
    pub city: Vec<String>,

    /// Units: metric (°C), imperial (°F), standard (K).
    #[arg(short, long, value_enum)]
    pub units: Option<UnitsArg>,

    /// OpenWeatherMap API key (overrides the config file).
    #[arg(short = 'k', long = "apikey", env = "OPENWEATHER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Prompt for an API key and store it in the config file.
    #[arg(long, conflicts_with = "city")]
    pub configure: bool,

    /// Disable colored output.
    #[arg(long)]
    pub no_color: bool,

    /// Log debug details to stderr.
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum UnitsArg {
    Metric,
    Imperial,
    Standard,
}

impl From<UnitsArg> for Units {
    fn from(value: UnitsArg) -> Self {
        match value {
            UnitsArg::Metric => Units::Metric,
            UnitsArg::Imperial => Units::Imperial,
            UnitsArg::Standard => Units::Standard,
        }
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        if self.configure {
            return self.configure(Config::load()?);
        }

        let config = Config::load().unwrap_or_else(|err| {
            warn!("ignoring config file: {err:#}");
            Config::default()
        });

        let stdout = io::stdout();
        let stderr = io::stderr();
        self.show(&config, &mut stdout.lock(), &mut stderr.lock()).await
    }

    /// Resolve the key and units, then fetch and print once.
    async fn show(
        &self,
        config: &Config,
        out: &mut impl Write,
        err: &mut impl Write,
    ) -> anyhow::Result<()> {
        let api_key = config.resolve_api_key(self.api_key.as_deref())?;
        let units = config.resolve_units(self.units.map(Units::from));
        let request = WeatherRequest::new(self.city.join(" "), units);
        debug!(city = %request.city, %units, "resolved request");

        let provider = OpenWeatherProvider::new(api_key)?;
        report(&provider, &request, &Renderer::new(self.use_color()), out, err).await
    }

    fn configure(&self, mut config: Config) -> anyhow::Result<()> {
        let api_key = Password::new("OpenWeather API key:")
            .with_display_mode(PasswordDisplayMode::Masked)
            .without_confirmation()
            .with_help_message("Create one at https://home.openweathermap.org/api_keys")
            .prompt()
            .context("Failed to read API key")?;

        let api_key = api_key.trim();
        if api_key.is_empty() {
            bail!("API key must not be empty");
        }

        config.set_api_key(api_key.to_string());
        if let Some(units) = self.units {
            config.units = Some(units.into());
        }

        let path = config.save()?;
        println!("Saved configuration to {}", path.display());
        Ok(())
    }

    fn use_color(&self) -> bool {
        !self.no_color && std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal()
    }
}

/// Fetch once and print either the observation or the error.
///
/// A failed fetch is reported on `err` and is not an error of the run itself.
pub async fn report<P>(
    provider: &P,
    request: &WeatherRequest,
    renderer: &Renderer,
    out: &mut impl Write,
    err: &mut impl Write,
) -> anyhow::Result<()>
where
    P: WeatherProvider + ?Sized,
{
    match provider.current(request).await {
        Ok(obs) => write!(out, "{}", renderer.render(&obs, request.units))?,
        Err(fetch_err) => {
            debug!(error = ?fetch_err, "weather fetch failed");
            writeln!(err, "{}", renderer.render_error(&fetch_err))?;
        }
    }

    Ok(())
}
