use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{MeteoError, Result};

/// Wall-clock format used by the provider for local date/times, e.g. `2024-05-01T14:00`.
pub const LOCAL_DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";
pub const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y";
pub const DISPLAY_TIME_FORMAT: &str = "%H:%M";

/// What the caller wants fetched from a provider.
#[derive(Debug, Clone)]
pub struct ForecastRequest {
    pub location: Location,
    /// IANA timezone name the provider should use for local times.
    pub timezone: String,
    pub forecast_days: u8,
    pub max_records: usize,
}

/// A single weather condition attached to an observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub code: i32,
    pub category: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayPeriod {
    Day,
    Night,
}

/// One hourly weather observation.
///
/// `date_time` is the authoritative instant: it is the local wall-clock time reported by
/// the provider, and every calendar accessor derives from it. `timestamp` is computed from
/// it at normalization time and checked by [`ForecastSet::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub timestamp: i64,
    #[serde(with = "local_date_time")]
    pub date_time: NaiveDateTime,
    pub temperature: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub pressure: i32,
    pub humidity: u8,
    pub conditions: Vec<Condition>,
    pub cloudiness: u8,
    pub wind_speed: f64,
    pub wind_direction: u16,
    pub wind_gust: f64,
    pub visibility: i32,
    pub precipitation_probability: f64,
    pub period: DayPeriod,
}

impl WeatherRecord {
    pub fn date(&self) -> NaiveDate {
        self.date_time.date()
    }

    pub fn time(&self) -> NaiveTime {
        self.date_time.time()
    }

    /// Date as `dd/mm/yyyy`.
    pub fn formatted_date(&self) -> String {
        self.date_time.format(DISPLAY_DATE_FORMAT).to_string()
    }

    /// Time as `HH:MM`.
    pub fn formatted_time(&self) -> String {
        self.date_time.format(DISPLAY_TIME_FORMAT).to_string()
    }

    pub fn primary_condition(&self) -> Option<&Condition> {
        self.conditions.first()
    }

    /// Description of the primary condition.
    pub fn description(&self) -> &str {
        self.primary_condition()
            .map(|c| c.description.as_str())
            .unwrap_or("Inconnu")
    }

    pub fn category(&self) -> &str {
        self.primary_condition()
            .map(|c| c.category.as_str())
            .unwrap_or("Unknown")
    }

    /// Check the record-level invariants.
    pub fn validate(&self) -> Result<()> {
        let at = self.date_time.format(LOCAL_DATE_TIME_FORMAT);

        if self.conditions.is_empty() {
            return Err(MeteoError::DataIntegrity(format!(
                "record at {at} has no weather condition"
            )));
        }
        if self.humidity > 100 {
            return Err(MeteoError::DataIntegrity(format!(
                "record at {at} has humidity {}% (expected 0..=100)",
                self.humidity
            )));
        }
        if self.cloudiness > 100 {
            return Err(MeteoError::DataIntegrity(format!(
                "record at {at} has cloudiness {}% (expected 0..=100)",
                self.cloudiness
            )));
        }
        if self.wind_direction >= 360 {
            return Err(MeteoError::DataIntegrity(format!(
                "record at {at} has wind direction {}° (expected 0..360)",
                self.wind_direction
            )));
        }
        if !(0.0..=1.0).contains(&self.precipitation_probability) {
            return Err(MeteoError::DataIntegrity(format!(
                "record at {at} has precipitation probability {} (expected 0..=1)",
                self.precipitation_probability
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub country: String,
    pub coordinates: Coordinates,
    pub population: u64,
    /// IANA zone name local times are expressed in, e.g. "Europe/Paris".
    #[serde(default)]
    pub timezone: String,
    /// Offset from UTC in seconds at the start of the series.
    pub timezone_offset: i32,
    pub sunrise: i64,
    pub sunset: i64,
}

impl Location {
    pub fn zone(&self) -> Zone {
        Zone::resolve(&self.timezone, self.timezone_offset)
    }
}

/// Time zone mapping local wall-clock hours to epoch seconds.
///
/// A named zone follows its daylight-saving rules, so a series crossing a DST change gets the
/// right offset on each side. The fixed variant is used when no known zone name is available.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Zone {
    Named(Tz),
    Fixed(FixedOffset),
}

impl Zone {
    /// The IANA zone `name` if it is known, otherwise the fixed `utc_offset` (UTC if that is
    /// out of range too).
    pub fn resolve(name: &str, utc_offset: i32) -> Self {
        match name.parse::<Tz>() {
            Ok(tz) => Zone::Named(tz),
            Err(_) => Zone::Fixed(FixedOffset::east_opt(utc_offset).unwrap_or_else(|| Utc.fix())),
        }
    }

    /// Epoch seconds of `local`. A repeated hour resolves to its first occurrence; an hour
    /// skipped by a DST change has no instant and yields `None`.
    pub fn epoch_of(&self, local: NaiveDateTime) -> Option<i64> {
        match self {
            Zone::Named(tz) => tz.from_local_datetime(&local).earliest().map(|dt| dt.timestamp()),
            Zone::Fixed(offset) => offset
                .from_local_datetime(&local)
                .earliest()
                .map(|dt| dt.timestamp()),
        }
    }
}

/// An ordered hourly series for one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSet {
    pub status: String,
    pub location: Location,
    pub records: Vec<WeatherRecord>,
}

impl ForecastSet {
    /// Validate every record, including that its epoch timestamp agrees with its local
    /// date/time in the location's zone.
    pub fn validate(&self) -> Result<()> {
        let zone = self.location.zone();

        for record in &self.records {
            record.validate()?;

            let local = record.date_time.format(LOCAL_DATE_TIME_FORMAT);
            let expected = zone.epoch_of(record.date_time).ok_or_else(|| {
                MeteoError::DataIntegrity(format!("record at {local} falls in a DST gap"))
            })?;
            if record.timestamp != expected {
                return Err(MeteoError::DataIntegrity(format!(
                    "record at {local} has timestamp {} but its local time implies {expected}",
                    record.timestamp,
                )));
            }
        }

        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Serde adapter keeping `date_time` in the provider's `YYYY-MM-DDTHH:MM` form.
pub(crate) mod local_date_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    use super::LOCAL_DATE_TIME_FORMAT;

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(LOCAL_DATE_TIME_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(D::Error::custom)
    }

    /// Accepts the provider format, with or without seconds.
    pub fn parse(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
        NaiveDateTime::parse_from_str(raw, LOCAL_DATE_TIME_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn condition(code: i32, category: &str, description: &str) -> Condition {
        Condition {
            code,
            category: category.to_string(),
            description: description.to_string(),
            icon: "10d".to_string(),
        }
    }

    /// Record at `when` (`YYYY-MM-DDTHH:MM`) with the given temperature and description.
    pub fn record(when: &str, temperature: f64, description: &str) -> WeatherRecord {
        let date_time = local_date_time::parse(when).expect("fixture date must parse");
        WeatherRecord {
            timestamp: date_time.and_utc().timestamp() - 7200,
            date_time,
            temperature,
            feels_like: temperature - 0.5,
            temp_min: temperature - 1.0,
            temp_max: temperature + 1.0,
            pressure: 1013,
            humidity: 70,
            conditions: vec![condition(61, "Rain", description)],
            cloudiness: 40,
            wind_speed: 3.5,
            wind_direction: 270,
            wind_gust: 4.2,
            visibility: 10_000,
            precipitation_probability: 0.3,
            period: DayPeriod::Day,
        }
    }

    pub fn location() -> Location {
        Location {
            id: 2972315,
            name: "Toulouse".to_string(),
            country: "FR".to_string(),
            coordinates: Coordinates { latitude: 43.6047, longitude: 1.4442 },
            population: 471941,
            timezone: "Europe/Paris".to_string(),
            timezone_offset: 7200,
            sunrise: 0,
            sunset: 0,
        }
    }
}
