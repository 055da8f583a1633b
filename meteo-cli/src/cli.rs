use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use inquire::{CustomType, Select, Text};
use meteo_core::{
    Config, ExportFormat, MeteoError, Projection, SortOrder, WeatherQueryExt, WeatherRecord,
    export_to_path, model::DISPLAY_DATE_FORMAT, provider_from_config,
};
use std::{path::PathBuf, str::FromStr};
use tracing::debug;

use crate::{render, shell::Shell};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "meteo", version, about = "Browse, filter and export hourly weather forecasts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Set the forecast location and export defaults.
    Configure,

    /// Fetch the forecast and open the interactive filter/sort/export menu.
    Interactive,

    /// Fetch the forecast, apply filters and write an export file.
    Export(ExportArgs),

    /// List the fields that can be selected with `--fields`.
    Fields,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortKey {
    Temp,
    Date,
}

#[derive(Debug, Clone, Default, clap::Args)]
pub struct ExportArgs {
    /// Output format; defaults to the configured one.
    #[arg(long, value_parser = ExportFormat::from_str)]
    pub format: Option<ExportFormat>,

    /// Comma-separated field names ("Date,Heure,Temperature") or the numbers listed by
    /// `meteo fields` ("1,2,3"). All fields if absent.
    #[arg(long)]
    pub fields: Option<String>,

    /// Keep only this day (dd/mm/yyyy).
    #[arg(long, value_parser = parse_date)]
    pub date: Option<NaiveDate>,

    /// Start of an inclusive day range (dd/mm/yyyy).
    #[arg(long, value_parser = parse_date, requires = "to")]
    pub from: Option<NaiveDate>,

    /// End of an inclusive day range (dd/mm/yyyy).
    #[arg(long, value_parser = parse_date, requires = "from")]
    pub to: Option<NaiveDate>,

    #[arg(long, allow_negative_numbers = true)]
    pub min_temp: Option<f64>,

    #[arg(long, allow_negative_numbers = true)]
    pub max_temp: Option<f64>,

    /// Case-insensitive text matched against the weather condition.
    #[arg(long)]
    pub condition: Option<String>,

    #[arg(long, value_enum)]
    pub sort: Option<SortKey>,

    /// Sort in descending order.
    #[arg(long, requires = "sort")]
    pub desc: bool,

    /// Destination file; defaults to the configured export name.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl ExportArgs {
    /// Apply the requested filters, then the sort, to `records`.
    pub fn apply(&self, records: &[WeatherRecord]) -> Result<Vec<WeatherRecord>, MeteoError> {
        let mut view = records.to_vec();

        if let Some(date) = self.date {
            view = view.filter_by_date(date);
        }
        if let (Some(start), Some(end)) = (self.from, self.to) {
            view = view.filter_by_date_range(start, end)?;
        }
        if self.min_temp.is_some() || self.max_temp.is_some() {
            view = view.filter_by_temperature_range(
                self.min_temp.unwrap_or(f64::NEG_INFINITY),
                self.max_temp.unwrap_or(f64::INFINITY),
            )?;
        }
        if let Some(text) = &self.condition {
            view = view.filter_by_condition(text)?;
        }

        let order = if self.desc { SortOrder::Descending } else { SortOrder::Ascending };
        view = match self.sort {
            Some(SortKey::Temp) => view.sort_by_temperature(order),
            Some(SortKey::Date) => view.sort_by_date(order),
            None => view,
        };

        Ok(view)
    }

    pub fn projection(&self) -> Result<Option<Projection>, MeteoError> {
        let Some(raw) = self.fields.as_deref() else {
            return Ok(None);
        };

        let numbered = raw
            .split(',')
            .map(str::trim)
            .all(|s| s.bytes().all(|b| b.is_ascii_digit()));
        if !numbered {
            return Projection::parse(raw).map(Some);
        }

        let projection = Projection::from_indices(raw);
        if projection.is_empty() {
            return Err(MeteoError::InvalidArgument(format!(
                "No field is numbered '{raw}'. Run `meteo fields` for the list."
            )));
        }
        Ok(Some(projection))
    }
}

/// Parse a `dd/mm/yyyy` date.
pub fn parse_date(input: &str) -> Result<NaiveDate, MeteoError> {
    NaiveDate::parse_from_str(input.trim(), DISPLAY_DATE_FORMAT).map_err(|_| {
        MeteoError::InvalidArgument(format!(
            "Invalid date '{}'. Use the dd/mm/yyyy format.",
            input.trim()
        ))
    })
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Interactive => {
                let config = Config::load()?;
                let forecast = provider_from_config(&config)
                    .fetch_forecast(&config.forecast_request())
                    .await
                    .context("Could not load the weather forecast")?;

                if forecast.is_empty() {
                    anyhow::bail!("The provider returned no forecast records");
                }
                println!(
                    "Loaded {} forecasts for {}, {}.",
                    forecast.len(),
                    forecast.location.name,
                    forecast.location.country
                );

                Shell::new(forecast, config).run()
            }
            Command::Export(args) => {
                let config = Config::load()?;
                let format = args.format.unwrap_or(config.export.default_format);
                let projection = args.projection()?;

                let forecast = provider_from_config(&config)
                    .fetch_forecast(&config.forecast_request())
                    .await
                    .context("Could not load the weather forecast")?;

                let view = args.apply(&forecast.records)?;
                debug!(selected = view.len(), total = forecast.len(), "applied export filters");

                let path = args
                    .output
                    .clone()
                    .unwrap_or_else(|| config.export_path(None, format));
                export_to_path(&view, format, projection.as_ref(), &path)?;

                println!("Exported {} records to {}", view.len(), path.display());
                Ok(())
            }
            Command::Fields => {
                print!("{}", render::field_list());
                Ok(())
            }
        }
    }
}

/// Interactive configuration of the location and export defaults.
fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;
    let loc = &mut config.location;

    loc.name = Text::new("Location name:").with_default(&loc.name).prompt()?;
    loc.country = Text::new("Country code:").with_default(&loc.country).prompt()?;
    loc.latitude = CustomType::<f64>::new("Latitude:")
        .with_default(loc.latitude)
        .with_error_message("Please enter a number")
        .prompt()?;
    loc.longitude = CustomType::<f64>::new("Longitude:")
        .with_default(loc.longitude)
        .with_error_message("Please enter a number")
        .prompt()?;
    loc.timezone = Text::new("Timezone (IANA name):")
        .with_default(&loc.timezone)
        .prompt()?;

    config.forecast_days = CustomType::<u8>::new("Forecast days (1-16):")
        .with_default(config.forecast_days)
        .prompt()?;
    config.page_size = CustomType::<usize>::new("Rows per page:")
        .with_default(config.page_size)
        .prompt()?;
    config.export.default_format =
        Select::new("Default export format:", ExportFormat::all().to_vec()).prompt()?;
    config.export.default_stem = Text::new("Default export file name (without extension):")
        .with_default(&config.export.default_stem)
        .prompt()?;

    let path = config.save()?;
    println!("Configuration saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::record;
    use meteo_core::Field;

    fn sample() -> Vec<WeatherRecord> {
        vec![
            record("2024-05-01T06:00", 10.0, "Pluie légère"),
            record("2024-05-01T12:00", 18.0, "Nuageux"),
            record("2024-05-02T09:00", 14.0, "Pluie modérée"),
            record("2024-05-03T09:00", 22.0, "Ciel dégagé"),
        ]
    }

    fn temps(records: &[WeatherRecord]) -> Vec<f64> {
        records.iter().map(|r| r.temperature).collect()
    }

    #[test]
    fn export_command_parses_filters() {
        let cli = Cli::try_parse_from([
            "meteo", "export", "--format", "csv", "--fields", "Temperature,DescriptionMeteo",
            "--from", "01/05/2024", "--to", "02/05/2024", "--min-temp", "-5", "--sort", "temp",
            "--desc",
        ])
        .unwrap();

        let Command::Export(args) = cli.command else {
            panic!("expected export command");
        };
        assert_eq!(args.format, Some(ExportFormat::Csv));
        assert_eq!(args.from, NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(args.min_temp, Some(-5.0));
        assert_eq!(args.sort, Some(SortKey::Temp));
        assert!(args.desc);

        let projection = args.projection().unwrap().unwrap();
        assert_eq!(projection.fields(), &[Field::Temperature, Field::DescriptionMeteo]);
    }

    #[test]
    fn fields_accept_listed_numbers() {
        let cli =
            Cli::try_parse_from(["meteo", "export", "--fields", "3,9", "--format", "csv"]).unwrap();
        let Command::Export(args) = cli.command else {
            panic!("expected export command");
        };

        let projection = args.projection().unwrap().unwrap();
        assert_eq!(projection.fields(), &[Field::Temperature, Field::DescriptionMeteo]);
    }

    #[test]
    fn fields_reject_numbers_outside_the_list() {
        let args = ExportArgs { fields: Some("0, 42".into()), ..ExportArgs::default() };
        assert!(matches!(args.projection(), Err(MeteoError::InvalidArgument(_))));

        let args = ExportArgs { fields: Some("3,Date".into()), ..ExportArgs::default() };
        assert!(args.projection().is_err());
    }

    #[test]
    fn unknown_format_is_rejected_by_the_parser() {
        assert!(Cli::try_parse_from(["meteo", "export", "--format", "xml"]).is_err());
    }

    #[test]
    fn apply_chains_filters_then_sort() {
        let args = ExportArgs {
            from: NaiveDate::from_ymd_opt(2024, 5, 1),
            to: NaiveDate::from_ymd_opt(2024, 5, 2),
            condition: Some("pluie".into()),
            sort: Some(SortKey::Temp),
            desc: true,
            ..ExportArgs::default()
        };

        assert_eq!(temps(&args.apply(&sample()).unwrap()), vec![14.0, 10.0]);
    }

    #[test]
    fn apply_with_open_ended_temperature_bound() {
        let args = ExportArgs { min_temp: Some(15.0), ..ExportArgs::default() };
        assert_eq!(temps(&args.apply(&sample()).unwrap()), vec![18.0, 22.0]);
    }

    #[test]
    fn apply_propagates_inverted_date_range() {
        let args = ExportArgs {
            from: NaiveDate::from_ymd_opt(2024, 5, 3),
            to: NaiveDate::from_ymd_opt(2024, 5, 1),
            ..ExportArgs::default()
        };
        assert!(matches!(args.apply(&sample()), Err(MeteoError::InvalidRange { .. })));
    }

    #[test]
    fn parse_date_expects_day_first() {
        assert_eq!(parse_date("02/05/2024").unwrap(), NaiveDate::from_ymd_opt(2024, 5, 2).unwrap());
        assert!(parse_date("2024-05-02").is_err());
    }
}
