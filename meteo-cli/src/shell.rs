//! Interactive menu over a fetched forecast.
//!
//! The shell keeps the original series untouched and a current view. Every menu action
//! is turned into a [`ViewOp`] and the view is rebound to `next_view(view, original, op)`;
//! nothing else ever changes it.

use chrono::NaiveDate;
use inquire::{CustomType, InquireError, MultiSelect, Select, Text};
use meteo_core::{
    Aggregate, Config, ExportFormat, Field, ForecastSet, MeteoError, Projection, SortOrder,
    WeatherQueryExt, WeatherRecord, export_to_path, query::paginate,
};
use std::{fmt, sync::Arc};
use tracing::debug;

use crate::{cli::parse_date, render};

/// A transition from one view to the next.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewOp {
    FilterDate(NaiveDate),
    FilterDateRange(NaiveDate, NaiveDate),
    FilterTemperature(f64, f64),
    FilterCondition(String),
    SortTemperature(SortOrder),
    SortDate(SortOrder),
    Reset,
}

/// The view that results from applying `op` to `view`. `Reset` goes back to `original`.
pub fn next_view(
    view: &[WeatherRecord],
    original: &[WeatherRecord],
    op: &ViewOp,
) -> Result<Vec<WeatherRecord>, MeteoError> {
    Ok(match op {
        ViewOp::FilterDate(date) => view.filter_by_date(*date),
        ViewOp::FilterDateRange(start, end) => view.filter_by_date_range(*start, *end)?,
        ViewOp::FilterTemperature(min, max) => view.filter_by_temperature_range(*min, *max)?,
        ViewOp::FilterCondition(text) => view.filter_by_condition(text)?,
        ViewOp::SortTemperature(order) => view.sort_by_temperature(*order),
        ViewOp::SortDate(order) => view.sort_by_date(*order),
        ViewOp::Reset => original.to_vec(),
    })
}

pub struct Shell {
    original: Arc<[WeatherRecord]>,
    view: Vec<WeatherRecord>,
    config: Config,
}

#[derive(Debug, Clone, Copy)]
enum MainChoice {
    Filter,
    Sort,
    Group,
    Display,
    Export,
    Reset,
    Quit,
}

impl fmt::Display for MainChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MainChoice::Filter => "Filter records",
            MainChoice::Sort => "Sort records",
            MainChoice::Group => "Group records",
            MainChoice::Display => "Display records",
            MainChoice::Export => "Export records",
            MainChoice::Reset => "Reset all filters and sorts",
            MainChoice::Quit => "Quit",
        })
    }
}

/// A labelled menu entry carrying a value.
#[derive(Debug, Clone)]
struct Choice<T> {
    label: &'static str,
    value: T,
}

impl<T> fmt::Display for Choice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label)
    }
}

fn choice<T>(label: &'static str, value: T) -> Choice<T> {
    Choice { label, value }
}

/// `None` when the user backed out with Esc.
fn optional<T>(result: Result<T, InquireError>) -> anyhow::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(InquireError::OperationCanceled) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

#[derive(Debug, Clone, Copy)]
enum GroupChoice {
    ByDate,
    ByCondition,
    PerDay(Aggregate),
}

#[derive(Debug, Clone, Copy)]
enum PageNav {
    Previous,
    Next,
    Back,
}

impl Shell {
    pub fn new(forecast: ForecastSet, config: Config) -> Self {
        let original: Arc<[WeatherRecord]> = forecast.records.into();
        Self {
            view: original.to_vec(),
            original,
            config,
        }
    }

    pub fn view(&self) -> &[WeatherRecord] {
        &self.view
    }

    /// Rebind the view to the result of `op`. A rejected operation leaves it as it was.
    pub fn apply(&mut self, op: &ViewOp) -> Result<usize, MeteoError> {
        let next = next_view(&self.view, &self.original, op)?;
        debug!(?op, before = self.view.len(), after = next.len(), "view transition");
        self.view = next;
        Ok(self.view.len())
    }

    pub fn run(mut self) -> anyhow::Result<()> {
        let menu = vec![
            MainChoice::Filter,
            MainChoice::Sort,
            MainChoice::Group,
            MainChoice::Display,
            MainChoice::Export,
            MainChoice::Reset,
            MainChoice::Quit,
        ];

        loop {
            let Some(selected) = optional(Select::new("Main menu", menu.clone()).prompt())? else {
                break;
            };

            match selected {
                MainChoice::Filter => self.filter_menu()?,
                MainChoice::Sort => self.sort_menu()?,
                MainChoice::Group => self.group_menu()?,
                MainChoice::Display => self.display()?,
                MainChoice::Export => self.export_menu()?,
                MainChoice::Reset => {
                    self.run_op(ViewOp::Reset)?;
                    println!("All filters and sorts have been reset.");
                }
                MainChoice::Quit => break,
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    /// Apply `op`, report the outcome, then show the new view.
    fn run_op(&mut self, op: ViewOp) -> anyhow::Result<()> {
        match self.apply(&op) {
            Ok(count) => {
                println!("{count} records in the current view.");
                self.display()
            }
            Err(err) => {
                println!("{err}");
                Ok(())
            }
        }
    }

    fn filter_menu(&mut self) -> anyhow::Result<()> {
        let options = vec![
            choice("By date", 1),
            choice("By date range", 2),
            choice("By temperature range", 3),
            choice("By weather condition", 4),
            choice("Reset filters", 5),
        ];
        let Some(selected) = optional(Select::new("Filter", options).prompt())? else {
            return Ok(());
        };

        let op = match selected.value {
            1 => match prompt_date("Date (dd/mm/yyyy):")? {
                Some(date) => ViewOp::FilterDate(date),
                None => return Ok(()),
            },
            2 => {
                let Some(start) = prompt_date("Start date (dd/mm/yyyy):")? else {
                    return Ok(());
                };
                let Some(end) = prompt_date("End date (dd/mm/yyyy):")? else {
                    return Ok(());
                };
                ViewOp::FilterDateRange(start, end)
            }
            3 => {
                let Some(min) = prompt_temperature("Minimum temperature (°C):")? else {
                    return Ok(());
                };
                let Some(max) = prompt_temperature("Maximum temperature (°C):")? else {
                    return Ok(());
                };
                ViewOp::FilterTemperature(min, max)
            }
            4 => {
                let Some(text) =
                    optional(Text::new("Weather condition (e.g. pluie, nuage):").prompt())?
                else {
                    return Ok(());
                };
                ViewOp::FilterCondition(text)
            }
            _ => ViewOp::Reset,
        };

        self.run_op(op)
    }

    fn sort_menu(&mut self) -> anyhow::Result<()> {
        let options = vec![
            choice("Temperature (ascending)", ViewOp::SortTemperature(SortOrder::Ascending)),
            choice("Temperature (descending)", ViewOp::SortTemperature(SortOrder::Descending)),
            choice("Date (ascending)", ViewOp::SortDate(SortOrder::Ascending)),
            choice("Date (descending)", ViewOp::SortDate(SortOrder::Descending)),
        ];

        match optional(Select::new("Sort", options).prompt())? {
            Some(selected) => self.run_op(selected.value),
            None => Ok(()),
        }
    }

    fn group_menu(&self) -> anyhow::Result<()> {
        let options = vec![
            choice("By date", GroupChoice::ByDate),
            choice("By weather condition", GroupChoice::ByCondition),
            choice("Mean temperature per day", GroupChoice::PerDay(Aggregate::Mean)),
            choice("Max temperature per day", GroupChoice::PerDay(Aggregate::Max)),
            choice("Min temperature per day", GroupChoice::PerDay(Aggregate::Min)),
        ];
        let Some(selected) = optional(Select::new("Group", options).prompt())? else {
            return Ok(());
        };

        let text = match selected.value {
            GroupChoice::ByDate => render::date_groups(&self.view.group_by_date()),
            GroupChoice::ByCondition => render::condition_groups(&self.view.group_by_condition()),
            GroupChoice::PerDay(reducer) => {
                render::aggregates(&self.view.aggregate_by_date(reducer), reducer)
            }
        };

        if text.is_empty() {
            println!("No records to group.");
        } else {
            println!("{text}");
        }
        Ok(())
    }

    fn display(&self) -> anyhow::Result<()> {
        if self.view.is_empty() {
            println!("No records to display.");
            return Ok(());
        }

        let mut page = 0;
        loop {
            let current = paginate(&self.view, page, self.config.page_size);
            println!("\n{}", render::table_page(&current));

            let mut nav = Vec::new();
            if current.page > 0 {
                nav.push(choice("Previous page", PageNav::Previous));
            }
            if current.page + 1 < current.total_pages {
                nav.push(choice("Next page", PageNav::Next));
            }
            nav.push(choice("Back", PageNav::Back));

            match optional(Select::new("Navigate", nav).prompt())?.map(|c| c.value) {
                Some(PageNav::Previous) => page = current.page - 1,
                Some(PageNav::Next) => page = current.page + 1,
                Some(PageNav::Back) | None => return Ok(()),
            }
        }
    }

    fn export_menu(&self) -> anyhow::Result<()> {
        if self.view.is_empty() {
            println!("No records to export.");
            return Ok(());
        }

        let Some(format) = optional(
            Select::new("Export format", ExportFormat::all().to_vec())
                .with_starting_cursor(match self.config.export.default_format {
                    ExportFormat::Json => 0,
                    ExportFormat::Csv => 1,
                })
                .prompt(),
        )?
        else {
            return Ok(());
        };

        let scope = vec![choice("All fields", false), choice("Custom selection", true)];
        let Some(custom) = optional(Select::new("Fields to export", scope).prompt())? else {
            return Ok(());
        };

        let projection = if custom.value {
            let Some(fields) =
                optional(MultiSelect::new("Select fields", Field::ALL.to_vec()).prompt())?
            else {
                return Ok(());
            };
            Some(Projection::new(fields))
        } else {
            None
        };

        let Some(name) = optional(
            Text::new("Export file name:")
                .with_default(&self.config.export.default_stem)
                .prompt(),
        )?
        else {
            return Ok(());
        };

        let path = self.config.export_path(Some(&name), format);
        match export_to_path(&self.view, format, projection.as_ref(), &path) {
            Ok(_) => println!("Exported {} records to {}", self.view.len(), path.display()),
            Err(err) => println!("Export failed: {err}"),
        }
        Ok(())
    }
}

fn prompt_date(message: &str) -> anyhow::Result<Option<NaiveDate>> {
    loop {
        let Some(raw) = optional(Text::new(message).prompt())? else {
            return Ok(None);
        };
        match parse_date(&raw) {
            Ok(date) => return Ok(Some(date)),
            Err(err) => println!("{err}"),
        }
    }
}

fn prompt_temperature(message: &str) -> anyhow::Result<Option<f64>> {
    optional(
        CustomType::<f64>::new(message)
            .with_error_message("Please enter a number")
            .prompt(),
    )
}
