//! Terminal rendering for observations and fetch errors.

use comfy_table::{
    Attribute, Cell, CellAlignment, Color, ContentArrangement, Table, modifiers, presets,
};
use nowcast_core::{
    FetchError, Observation, Units,
    format::{PLACEHOLDER, format_local_time, format_value, title_case},
};
use owo_colors::{OwoColorize, Style};

/// Highlight colour for the condition line, picked by keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tone {
    Cloudy,
    Clear,
    Other,
}

impl Tone {
    fn for_description(description: &str) -> Self {
        let lower = description.to_lowercase();
        if lower.contains("cloud") {
            Tone::Cloudy
        } else if lower.contains("clear") {
            Tone::Clear
        } else {
            Tone::Other
        }
    }

    fn style(self) -> Style {
        match self {
            Tone::Cloudy => Style::new().bold().magenta(),
            Tone::Clear => Style::new().bold().yellow(),
            Tone::Other => Style::new().bold().cyan(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    /// Header box, condition highlight and the detail table.
    pub fn render(&self, obs: &Observation, units: Units) -> String {
        let header = self.header(obs).to_string();
        let width = header.lines().next().map_or(0, |line| line.chars().count());

        let description = obs
            .description
            .as_deref()
            .map(title_case)
            .unwrap_or_else(|| PLACEHOLDER.to_string());
        let pad = width.saturating_sub(description.chars().count()) / 2;
        let condition = self.paint(&description, Tone::for_description(&description).style());

        let details = self.details(obs, units);

        format!("{header}\n{}{condition}\n\n{details}\n\n", " ".repeat(pad))
    }

    pub fn render_error(&self, err: &FetchError) -> String {
        let prefix = if err.is_network() { "Network error:" } else { "API error:" };
        format!("{} {err}", self.paint(prefix, Style::new().bold().red()))
    }

    fn header(&self, obs: &Observation) -> Table {
        let name = obs.city.as_deref().unwrap_or("Unknown");
        let location = match obs.country.as_deref().filter(|c| !c.is_empty()) {
            Some(country) => format!("{name}, {country}"),
            None => name.to_string(),
        };
        let local_time = format_local_time(obs.observed_at, obs.timezone_offset);

        let mut table = self.table();
        table.load_preset(presets::UTF8_BORDERS_ONLY).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
        table.add_row(vec![
            Cell::new(format!("Weather · {location}"))
                .fg(Color::White)
                .bg(Color::Blue)
                .add_attribute(Attribute::Bold)
                .set_alignment(CellAlignment::Center),
        ]);
        table.add_row(vec![
            Cell::new(format!("Local time (approx): {local_time}"))
                .add_attribute(Attribute::Dim)
                .set_alignment(CellAlignment::Center),
        ]);
        table
    }

    fn details(&self, obs: &Observation, units: Units) -> Table {
        let temp_unit = units.temperature_suffix();
        let rows = [
            (
                "Temperature",
                format!(
                    "{} {temp_unit} (Feels like {}{temp_unit})",
                    format_value(obs.temperature),
                    format_value(obs.feels_like),
                ),
            ),
            ("Humidity", format!("{}%", format_value(obs.humidity))),
            (
                "Wind Speed",
                format!("{} {}", format_value(obs.wind_speed), units.wind_speed_suffix()),
            ),
            ("Sunrise", format_local_time(obs.sunrise, obs.timezone_offset)),
            ("Sunset", format_local_time(obs.sunset, obs.timezone_offset)),
        ];

        let mut table = self.table();
        table.load_preset(presets::NOTHING).set_content_arrangement(ContentArrangement::Dynamic);
        for (label, value) in rows {
            table.add_row(vec![Cell::new(label).add_attribute(Attribute::Bold), Cell::new(value)]);
        }
        table
    }

    /// comfy-table only emits styling when it believes it writes to a tty.
    fn table(&self) -> Table {
        let mut table = Table::new();
        if self.color {
            table.enforce_styling();
        } else {
            table.force_no_tty();
        }
        table
    }

    fn paint(&self, text: &str, style: Style) -> String {
        if self.color { text.style(style).to_string() } else { text.to_string() }
    }
}
