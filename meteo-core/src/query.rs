//! Pure, composable operations over a slice of [`WeatherRecord`]s.
//!
//! Nothing here mutates its input: filters and sorts return a fresh `Vec`, groupings and
//! aggregations return an [`IndexMap`] whose key order is the order in which each key first
//! appears in the input. Callers can therefore keep the original series around and re-apply
//! a different chain of operations at any time.

use chrono::NaiveDate;
use indexmap::IndexMap;
use std::hash::Hash;
use tracing::debug;

use crate::{
    error::{MeteoError, Result},
    model::WeatherRecord,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Reducer applied to the temperatures of one date group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    /// Arithmetic mean rounded to one decimal, half away from zero.
    Mean,
    Max,
    Min,
}

impl Aggregate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregate::Mean => "mean",
            Aggregate::Max => "max",
            Aggregate::Min => "min",
        }
    }

    fn reduce(&self, group: &[WeatherRecord]) -> f64 {
        let temps = group.iter().map(|r| r.temperature);
        match self {
            Aggregate::Mean => round1(temps.sum::<f64>() / group.len() as f64),
            Aggregate::Max => temps.fold(f64::NEG_INFINITY, f64::max),
            Aggregate::Min => temps.fold(f64::INFINITY, f64::min),
        }
    }
}

/// One page of a view, as shown by a pager.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<'a> {
    pub items: &'a [WeatherRecord],
    /// Zero-based page index, clamped to the last page.
    pub page: usize,
    pub total_pages: usize,
}

/// Records whose local calendar date is `date`.
pub fn filter_by_date(records: &[WeatherRecord], date: NaiveDate) -> Vec<WeatherRecord> {
    filtered(records, |r| r.date() == date)
}

/// Records whose local calendar date lies in `start..=end`.
pub fn filter_by_date_range(
    records: &[WeatherRecord],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<WeatherRecord>> {
    if start > end {
        return Err(MeteoError::InvalidRange { start, end });
    }

    Ok(filtered(records, |r| (start..=end).contains(&r.date())))
}

/// Records with `min <= temperature <= max`. An inverted range matches nothing.
pub fn filter_by_temperature_range(
    records: &[WeatherRecord],
    min: f64,
    max: f64,
) -> Result<Vec<WeatherRecord>> {
    if min.is_nan() || max.is_nan() {
        return Err(MeteoError::InvalidArgument(
            "Temperature bounds must be numbers".to_string(),
        ));
    }

    Ok(filtered(records, |r| r.temperature >= min && r.temperature <= max))
}

/// Case-insensitive substring match on the primary condition's category or description.
pub fn filter_by_condition(records: &[WeatherRecord], text: &str) -> Result<Vec<WeatherRecord>> {
    let needle = text.trim().to_lowercase();
    if needle.is_empty() {
        return Err(MeteoError::InvalidArgument(
            "Condition text must not be empty".to_string(),
        ));
    }

    Ok(filtered(records, |r| {
        r.category().to_lowercase().contains(&needle)
            || r.description().to_lowercase().contains(&needle)
    }))
}

pub fn sort_by_temperature(records: &[WeatherRecord], order: SortOrder) -> Vec<WeatherRecord> {
    sorted(records, order, |a, b| a.temperature.total_cmp(&b.temperature))
}

pub fn sort_by_date(records: &[WeatherRecord], order: SortOrder) -> Vec<WeatherRecord> {
    sorted(records, order, |a, b| a.date_time.cmp(&b.date_time))
}

pub fn group_by_date(records: &[WeatherRecord]) -> IndexMap<NaiveDate, Vec<WeatherRecord>> {
    grouped(records, WeatherRecord::date)
}

/// Groups keyed on the primary condition description.
pub fn group_by_condition(records: &[WeatherRecord]) -> IndexMap<String, Vec<WeatherRecord>> {
    grouped(records, |r| r.description().to_string())
}

pub fn aggregate_by_date(records: &[WeatherRecord], reducer: Aggregate) -> IndexMap<NaiveDate, f64> {
    let aggregated: IndexMap<_, _> = group_by_date(records)
        .into_iter()
        .map(|(date, group)| (date, reducer.reduce(&group)))
        .collect();

    debug!(reducer = reducer.as_str(), days = aggregated.len(), "aggregated temperatures by date");
    aggregated
}

/// Slice out page `page` (zero-based) of `page_size` records. Out-of-range pages are
/// clamped to the last one; an empty input yields a single empty page.
pub fn paginate(records: &[WeatherRecord], page: usize, page_size: usize) -> Page<'_> {
    let page_size = page_size.max(1);
    let total_pages = records.len().div_ceil(page_size).max(1);
    let page = page.min(total_pages - 1);

    let start = (page * page_size).min(records.len());
    let end = (start + page_size).min(records.len());

    Page { items: &records[start..end], page, total_pages }
}

/// Round half away from zero to one decimal place.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn filtered<F>(records: &[WeatherRecord], predicate: F) -> Vec<WeatherRecord>
where
    F: Fn(&WeatherRecord) -> bool,
{
    let out: Vec<_> = records.iter().filter(|&r| predicate(r)).cloned().collect();
    debug!(input = records.len(), output = out.len(), "filtered records");
    out
}

fn sorted<F>(records: &[WeatherRecord], order: SortOrder, compare: F) -> Vec<WeatherRecord>
where
    F: Fn(&WeatherRecord, &WeatherRecord) -> std::cmp::Ordering,
{
    let mut out = records.to_vec();
    // `sort_by` is stable; reversing the comparator keeps ties in input order.
    match order {
        SortOrder::Ascending => out.sort_by(|a, b| compare(a, b)),
        SortOrder::Descending => out.sort_by(|a, b| compare(b, a)),
    }
    out
}

fn grouped<K, F>(records: &[WeatherRecord], key: F) -> IndexMap<K, Vec<WeatherRecord>>
where
    K: Hash + Eq,
    F: Fn(&WeatherRecord) -> K,
{
    let mut groups: IndexMap<K, Vec<WeatherRecord>> = IndexMap::new();
    for record in records {
        groups.entry(key(record)).or_default().push(record.clone());
    }
    groups
}

/// Chainable form of the query functions.
///
/// ```ignore
/// let rainy_days = records
///     .filter_by_condition("pluie")?
///     .sort_by_temperature(SortOrder::Descending)
///     .group_by_date();
/// ```
pub trait WeatherQueryExt {
    fn filter_by_date(&self, date: NaiveDate) -> Vec<WeatherRecord>;
    fn filter_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<WeatherRecord>>;
    fn filter_by_temperature_range(&self, min: f64, max: f64) -> Result<Vec<WeatherRecord>>;
    fn filter_by_condition(&self, text: &str) -> Result<Vec<WeatherRecord>>;
    fn sort_by_temperature(&self, order: SortOrder) -> Vec<WeatherRecord>;
    fn sort_by_date(&self, order: SortOrder) -> Vec<WeatherRecord>;
    fn group_by_date(&self) -> IndexMap<NaiveDate, Vec<WeatherRecord>>;
    fn group_by_condition(&self) -> IndexMap<String, Vec<WeatherRecord>>;
    fn aggregate_by_date(&self, reducer: Aggregate) -> IndexMap<NaiveDate, f64>;
}

impl WeatherQueryExt for [WeatherRecord] {
    fn filter_by_date(&self, date: NaiveDate) -> Vec<WeatherRecord> {
        filter_by_date(self, date)
    }

    fn filter_by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<WeatherRecord>> {
        filter_by_date_range(self, start, end)
    }

    fn filter_by_temperature_range(&self, min: f64, max: f64) -> Result<Vec<WeatherRecord>> {
        filter_by_temperature_range(self, min, max)
    }

    fn filter_by_condition(&self, text: &str) -> Result<Vec<WeatherRecord>> {
        filter_by_condition(self, text)
    }

    fn sort_by_temperature(&self, order: SortOrder) -> Vec<WeatherRecord> {
        sort_by_temperature(self, order)
    }

    fn sort_by_date(&self, order: SortOrder) -> Vec<WeatherRecord> {
        sort_by_date(self, order)
    }

    fn group_by_date(&self) -> IndexMap<NaiveDate, Vec<WeatherRecord>> {
        group_by_date(self)
    }

    fn group_by_condition(&self) -> IndexMap<String, Vec<WeatherRecord>> {
        group_by_condition(self)
    }

    fn aggregate_by_date(&self, reducer: Aggregate) -> IndexMap<NaiveDate, f64> {
        aggregate_by_date(self, reducer)
    }
}
