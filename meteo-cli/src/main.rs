//! Binary crate for the `meteo` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - The interactive filter/sort/group/export menu
//! - Human-friendly output formatting

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod render;
mod shell;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they never mix with menu output or piped data.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cmd = cli::Cli::parse();
    cmd.run().await
}

#[cfg(test)]
mod test_support {
    use chrono::NaiveDateTime;
    use meteo_core::{
        Condition, Coordinates, DayPeriod, ForecastSet, Location, WeatherRecord,
        model::LOCAL_DATE_TIME_FORMAT,
    };

    pub fn record(when: &str, temperature: f64, description: &str) -> WeatherRecord {
        let date_time = NaiveDateTime::parse_from_str(when, LOCAL_DATE_TIME_FORMAT).unwrap();
        WeatherRecord {
            timestamp: date_time.and_utc().timestamp() - 7200,
            date_time,
            temperature,
            feels_like: temperature,
            temp_min: temperature - 1.0,
            temp_max: temperature + 1.0,
            pressure: 1015,
            humidity: 60,
            conditions: vec![Condition {
                code: 61,
                category: "Rain".to_string(),
                description: description.to_string(),
                icon: "10d".to_string(),
            }],
            cloudiness: 50,
            wind_speed: 2.0,
            wind_direction: 180,
            wind_gust: 2.4,
            visibility: 10_000,
            precipitation_probability: 0.5,
            period: DayPeriod::Day,
        }
    }

    pub fn forecast(records: Vec<WeatherRecord>) -> ForecastSet {
        ForecastSet {
            status: "200".to_string(),
            location: Location {
                id: 2972315,
                name: "Toulouse".to_string(),
                country: "FR".to_string(),
                coordinates: Coordinates { latitude: 43.6047, longitude: 1.4442 },
                population: 471941,
                timezone: "Europe/Paris".to_string(),
                timezone_offset: 7200,
                sunrise: 0,
                sunset: 0,
            },
            records,
        }
    }
}
