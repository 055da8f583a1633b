//! Plain-text rendering of views for the terminal.
//!
//! Everything here returns a `String`; printing is left to the caller.

use chrono::NaiveDate;
use indexmap::IndexMap;
use meteo_core::{Aggregate, Field, Page, WeatherRecord, model::DISPLAY_DATE_FORMAT};
use std::fmt::Write;

pub fn table_page(page: &Page<'_>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Page {}/{}", page.page + 1, page.total_pages);
    let _ = writeln!(out, "Date       | Time  | Temp.   | Description");
    let _ = writeln!(out, "{}", "-".repeat(50));

    if page.items.is_empty() {
        let _ = writeln!(out, "(no records)");
    }
    for r in page.items {
        let _ = writeln!(
            out,
            "{} | {} | {:>5.1}°C | {}",
            r.formatted_date(),
            r.formatted_time(),
            r.temperature,
            r.description()
        );
    }
    out
}

pub fn date_groups(groups: &IndexMap<NaiveDate, Vec<WeatherRecord>>) -> String {
    let mut out = String::new();
    for (date, records) in groups {
        let _ = writeln!(
            out,
            "\nDate: {} ({} forecasts)",
            date.format(DISPLAY_DATE_FORMAT),
            records.len()
        );
        for r in records {
            let _ = writeln!(
                out,
                "  {} - {}°C - {}",
                r.formatted_time(),
                r.temperature,
                r.description()
            );
        }
    }
    out
}

pub fn condition_groups(groups: &IndexMap<String, Vec<WeatherRecord>>) -> String {
    let mut out = String::new();
    for (condition, records) in groups {
        let _ = writeln!(out, "\nCondition: {condition} ({} forecasts)", records.len());
        for r in records {
            let _ = writeln!(
                out,
                "  {} {} - {}°C",
                r.formatted_date(),
                r.formatted_time(),
                r.temperature
            );
        }
    }
    out
}

pub fn aggregates(values: &IndexMap<NaiveDate, f64>, reducer: Aggregate) -> String {
    let label = match reducer {
        Aggregate::Mean => "Mean temperature",
        Aggregate::Max => "Max temperature",
        Aggregate::Min => "Min temperature",
    };

    let mut out = String::new();
    for (date, value) in values {
        let _ = writeln!(out, "Date: {} - {label}: {value}°C", date.format(DISPLAY_DATE_FORMAT));
    }
    out
}

/// Numbered list of exportable fields; `export --fields` accepts either the names or the numbers.
pub fn field_list() -> String {
    let mut out = String::new();
    for (i, field) in Field::ALL.iter().enumerate() {
        let _ = writeln!(out, "{:>2}. {field}", i + 1);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::record;
    use meteo_core::{WeatherQueryExt, query::paginate};

    #[test]
    fn table_page_lists_rows() {
        let records = vec![
            record("2024-05-01T06:00", 10.0, "Pluie légère"),
            record("2024-05-01T09:00", 12.5, "Nuageux"),
        ];
        let text = table_page(&paginate(&records, 0, 10));

        assert!(text.starts_with("Page 1/1\n"));
        assert!(text.contains("01/05/2024 | 06:00 |  10.0°C | Pluie légère"));
        assert!(text.contains("01/05/2024 | 09:00 |  12.5°C | Nuageux"));
    }

    #[test]
    fn empty_page_says_so() {
        let text = table_page(&paginate(&[], 0, 10));
        assert!(text.contains("(no records)"));
    }

    #[test]
    fn groups_and_aggregates_render_in_view_order() {
        let records = vec![
            record("2024-05-02T06:00", 8.0, "Brouillard"),
            record("2024-05-01T06:00", 10.0, "Pluie légère"),
        ];

        let text = date_groups(&records.group_by_date());
        let second = text.find("01/05/2024").unwrap();
        let first = text.find("02/05/2024").unwrap();
        assert!(first < second);
        assert!(text.contains("(1 forecasts)"));

        let text = condition_groups(&records.group_by_condition());
        assert!(text.contains("Condition: Brouillard (1 forecasts)"));

        let text = aggregates(&records.aggregate_by_date(Aggregate::Max), Aggregate::Max);
        assert!(text.contains("Date: 02/05/2024 - Max temperature: 8°C"));
    }

    #[test]
    fn field_list_is_numbered_from_one() {
        let text = field_list();
        assert!(text.starts_with(" 1. Date\n"));
        assert!(text.contains("13. ProbabilitePrecipitation"));
    }
}
