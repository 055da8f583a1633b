use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{NaiveDateTime, Timelike};
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use crate::model::{
    Condition, DayPeriod, ForecastRequest, ForecastSet, Location, WeatherRecord, Zone,
    local_date_time,
};

use super::{WeatherProvider, wmo};

const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

const HOURLY_VARIABLES: &str = "temperature_2m,relativehumidity_2m,precipitation_probability,\
weathercode,surface_pressure,windspeed_10m,winddirection_10m,cloudcover";

/// Open-Meteo does not report visibility on this endpoint.
const DEFAULT_VISIBILITY_M: i32 = 10_000;

/// Keyless client for the Open-Meteo hourly forecast API.
#[derive(Debug, Clone)]
pub struct OpenMeteoProvider {
    http: Client,
    base_url: String,
}

impl OpenMeteoProvider {
    pub fn new() -> Self {
        Self::with_base_url(FORECAST_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }

    async fn fetch(&self, request: &ForecastRequest) -> Result<OmResponse> {
        let coords = &request.location.coordinates;

        let res = self
            .http
            .get(&self.base_url)
            .query(&[
                ("latitude", coords.latitude.to_string()),
                ("longitude", coords.longitude.to_string()),
                ("hourly", HOURLY_VARIABLES.to_string()),
                ("daily", "sunrise,sunset".to_string()),
                ("timezone", request.timezone.clone()),
                ("forecast_days", request.forecast_days.to_string()),
            ])
            .send()
            .await
            .context("Failed to send request to Open-Meteo (hourly forecast)")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read Open-Meteo forecast response body")?;

        if !status.is_success() {
            return Err(anyhow!(
                "Open-Meteo forecast request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        serde_json::from_str(&body).context("Failed to parse Open-Meteo forecast JSON")
    }
}

impl Default for OpenMeteoProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WeatherProvider for OpenMeteoProvider {
    async fn fetch_forecast(&self, request: &ForecastRequest) -> Result<ForecastSet> {
        let response = self.fetch(request).await?;
        let forecast = normalize(response, request.location.clone(), request.max_records)?;

        info!(
            location = %forecast.location.name,
            records = forecast.len(),
            "loaded forecast from Open-Meteo"
        );
        Ok(forecast)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OmResponse {
    utc_offset_seconds: i32,
    /// Resolved IANA zone name, e.g. "Europe/Paris" when "auto" was requested.
    #[serde(default)]
    timezone: Option<String>,
    hourly: OmHourly,
    #[serde(default)]
    daily: Option<OmDaily>,
}

#[derive(Debug, Deserialize)]
struct OmHourly {
    time: Vec<String>,
    temperature_2m: Vec<Option<f64>>,
    relativehumidity_2m: Vec<Option<f64>>,
    precipitation_probability: Vec<Option<f64>>,
    weathercode: Vec<Option<f64>>,
    surface_pressure: Vec<Option<f64>>,
    windspeed_10m: Vec<Option<f64>>,
    winddirection_10m: Vec<Option<f64>>,
    cloudcover: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct OmDaily {
    #[serde(default)]
    sunrise: Vec<String>,
    #[serde(default)]
    sunset: Vec<String>,
}

/// One hour with every variable present.
struct HourlySample {
    date_time: NaiveDateTime,
    temperature: f64,
    humidity: f64,
    precipitation_probability: f64,
    code: f64,
    pressure: f64,
    wind_speed: f64,
    wind_direction: f64,
    cloud_cover: f64,
}

impl OmHourly {
    fn sample(&self, i: usize) -> Option<HourlySample> {
        fn at(column: &[Option<f64>], i: usize) -> Option<f64> {
            column.get(i).copied().flatten()
        }

        Some(HourlySample {
            date_time: local_date_time::parse(self.time.get(i)?).ok()?,
            temperature: at(&self.temperature_2m, i)?,
            humidity: at(&self.relativehumidity_2m, i)?,
            precipitation_probability: at(&self.precipitation_probability, i)?,
            code: at(&self.weathercode, i)?,
            pressure: at(&self.surface_pressure, i)?,
            wind_speed: at(&self.windspeed_10m, i)?,
            wind_direction: at(&self.winddirection_10m, i)?,
            cloud_cover: at(&self.cloudcover, i)?,
        })
    }
}

/// Turn a raw Open-Meteo payload into a validated [`ForecastSet`].
///
/// Hours with a missing variable are skipped. At most `max_records` hours are kept. Epoch
/// timestamps are resolved through the named zone so each hour gets its own DST offset.
pub(crate) fn normalize(
    response: OmResponse,
    mut location: Location,
    max_records: usize,
) -> Result<ForecastSet> {
    if let Some(name) = response.timezone.as_deref().filter(|n| !n.is_empty()) {
        location.timezone = name.to_string();
    }
    location.timezone_offset = response.utc_offset_seconds;
    let zone = location.zone();
    let hourly = &response.hourly;

    let mut records = Vec::with_capacity(hourly.time.len().min(max_records));
    for i in 0..hourly.time.len().min(max_records) {
        let Some(sample) = hourly.sample(i) else {
            warn!(index = i, time = ?hourly.time.get(i), "skipping incomplete hourly sample");
            continue;
        };
        let Some(timestamp) = zone.epoch_of(sample.date_time) else {
            warn!(index = i, time = %sample.date_time, "skipping hour that does not exist locally");
            continue;
        };
        records.push(to_record(sample, timestamp));
    }

    if let Some(daily) = &response.daily {
        location.sunrise = first_epoch(&daily.sunrise, &zone).unwrap_or(location.sunrise);
        location.sunset = first_epoch(&daily.sunset, &zone).unwrap_or(location.sunset);
    }

    let forecast = ForecastSet {
        status: "200".to_string(),
        location,
        records,
    };
    forecast
        .validate()
        .context("Open-Meteo returned data that violates record invariants")?;

    Ok(forecast)
}

fn to_record(s: HourlySample, timestamp: i64) -> WeatherRecord {
    let code = s.code as i32;
    let humidity = s.humidity.clamp(0.0, 100.0) as u8;

    WeatherRecord {
        timestamp,
        date_time: s.date_time,
        temperature: s.temperature,
        feels_like: feels_like(s.temperature, humidity, s.wind_speed),
        temp_min: s.temperature - 1.0,
        temp_max: s.temperature + 1.0,
        pressure: s.pressure as i32,
        humidity,
        conditions: vec![Condition {
            code,
            category: wmo::category(code).to_string(),
            description: wmo::description(code).to_string(),
            icon: wmo::icon(code).to_string(),
        }],
        cloudiness: s.cloud_cover.clamp(0.0, 100.0) as u8,
        wind_speed: s.wind_speed,
        wind_direction: (s.wind_direction as i64).rem_euclid(360) as u16,
        wind_gust: s.wind_speed * 1.2,
        visibility: DEFAULT_VISIBILITY_M,
        precipitation_probability: s.precipitation_probability.clamp(0.0, 100.0) / 100.0,
        period: day_period(s.date_time),
    }
}

/// Rough apparent temperature: heat index above 20 °C, wind chill otherwise.
pub(crate) fn feels_like(temperature: f64, humidity: u8, wind_speed: f64) -> f64 {
    if temperature > 20.0 {
        temperature + 0.05 * f64::from(humidity) - 0.03 * wind_speed
    } else {
        temperature - 0.05 * wind_speed
    }
}

/// Daytime is 06:00 up to (not including) 20:00 local.
pub(crate) fn day_period(local: NaiveDateTime) -> DayPeriod {
    if (6..20).contains(&local.hour()) {
        DayPeriod::Day
    } else {
        DayPeriod::Night
    }
}

fn first_epoch(values: &[String], zone: &Zone) -> Option<i64> {
    let local = local_date_time::parse(values.first()?).ok()?;
    zone.epoch_of(local)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::location;

    const PAYLOAD: &str = r#"{
        "latitude": 43.6,
        "longitude": 1.44,
        "utc_offset_seconds": 7200,
        "timezone": "Europe/Paris",
        "hourly": {
            "time": ["2024-05-01T05:00", "2024-05-01T06:00", "2024-05-01T21:00", "2024-05-02T12:00"],
            "temperature_2m": [9.4, 10.0, null, 22.0],
            "relativehumidity_2m": [88, 85, 80, 40],
            "precipitation_probability": [20, 35, 10, 0],
            "weathercode": [61, 3, 0, 0],
            "surface_pressure": [1012.7, 1013.2, 1014.0, 1016.9],
            "windspeed_10m": [5.0, 4.0, 3.0, 10.0],
            "winddirection_10m": [360, 180, 90, 45],
            "cloudcover": [100, 90, 0, 5]
        },
        "daily": {
            "time": ["2024-05-01"],
            "sunrise": ["2024-05-01T06:45"],
            "sunset": ["2024-05-01T21:02"]
        }
    }"#;

    fn parsed() -> OmResponse {
        serde_json::from_str(PAYLOAD).expect("payload must parse")
    }

    #[test]
    fn normalize_builds_typed_records() {
        let forecast = normalize(parsed(), location(), 40).unwrap();

        assert_eq!(forecast.status, "200");
        // the 21:00 hour has no temperature and is skipped
        assert_eq!(forecast.len(), 3);

        let first = &forecast.records[0];
        assert_eq!(first.formatted_time(), "05:00");
        assert_eq!(first.description(), "Pluie légère");
        assert_eq!(first.category(), "Rain");
        assert_eq!(first.pressure, 1012);
        assert_eq!(first.wind_direction, 0);
        assert_eq!(first.period, DayPeriod::Night);
        assert!((first.precipitation_probability - 0.2).abs() < 1e-9);
        assert!((first.wind_gust - 6.0).abs() < 1e-9);
        assert_eq!(first.temp_min, 8.4);
        assert_eq!(first.visibility, 10_000);

        assert_eq!(forecast.records[1].period, DayPeriod::Day);
    }

    #[test]
    fn normalize_derives_timestamps_from_local_time() {
        let forecast = normalize(parsed(), location(), 40).unwrap();

        // 2024-05-01T05:00 at UTC+2 is 03:00Z
        assert_eq!(forecast.records[0].timestamp, 1_714_532_400);
        assert_eq!(forecast.location.timezone_offset, 7200);
        assert_eq!(forecast.location.sunrise, 1_714_538_700);
        assert!(forecast.validate().is_ok());
    }

    #[test]
    fn normalize_resolves_each_hour_in_its_own_offset() {
        // response offset is the one in force at the first hour (CEST)
        let payload = r#"{
            "utc_offset_seconds": 7200,
            "timezone": "Europe/Paris",
            "hourly": {
                "time": ["2024-10-26T12:00", "2024-10-27T12:00"],
                "temperature_2m": [15.0, 14.0],
                "relativehumidity_2m": [70, 75],
                "precipitation_probability": [10, 20],
                "weathercode": [3, 3],
                "surface_pressure": [1015.0, 1014.0],
                "windspeed_10m": [4.0, 5.0],
                "winddirection_10m": [200, 210],
                "cloudcover": [80, 85]
            }
        }"#;
        let response: OmResponse = serde_json::from_str(payload).unwrap();
        let forecast = normalize(response, location(), 40).unwrap();

        assert_eq!(forecast.records[0].timestamp, 1_729_936_800);
        // 12:00 CET on the 27th is 11:00Z
        assert_eq!(forecast.records[1].timestamp, 1_730_026_800);
        assert_eq!(forecast.location.timezone, "Europe/Paris");
    }

    #[test]
    fn normalize_skips_hour_missing_from_local_clock() {
        let payload = r#"{
            "utc_offset_seconds": 3600,
            "timezone": "Europe/Paris",
            "hourly": {
                "time": ["2024-03-31T01:00", "2024-03-31T02:00", "2024-03-31T03:00"],
                "temperature_2m": [6.0, 6.0, 6.0],
                "relativehumidity_2m": [90, 90, 90],
                "precipitation_probability": [0, 0, 0],
                "weathercode": [0, 0, 0],
                "surface_pressure": [1010.0, 1010.0, 1010.0],
                "windspeed_10m": [2.0, 2.0, 2.0],
                "winddirection_10m": [0, 0, 0],
                "cloudcover": [0, 0, 0]
            }
        }"#;
        let response: OmResponse = serde_json::from_str(payload).unwrap();
        let forecast = normalize(response, location(), 40).unwrap();

        let times: Vec<_> = forecast.records.iter().map(|r| r.formatted_time()).collect();
        assert_eq!(times, ["01:00", "03:00"]);
        // 01:00 CET and 03:00 CEST are one hour apart
        assert_eq!(forecast.records[1].timestamp - forecast.records[0].timestamp, 3600);
    }

    #[test]
    fn normalize_caps_record_count() {
        let forecast = normalize(parsed(), location(), 2).unwrap();
        assert_eq!(forecast.len(), 2);
    }

    #[test]
    fn feels_like_switches_formula_at_twenty_degrees() {
        assert!((feels_like(22.0, 40, 10.0) - 23.7).abs() < 1e-9);
        assert!((feels_like(10.0, 85, 4.0) - 9.8).abs() < 1e-9);
        assert!((feels_like(20.0, 85, 4.0) - 19.8).abs() < 1e-9);
    }

    #[test]
    fn day_period_boundaries() {
        let at = |s: &str| local_date_time::parse(s).unwrap();
        assert_eq!(day_period(at("2024-05-01T05:59")), DayPeriod::Night);
        assert_eq!(day_period(at("2024-05-01T06:00")), DayPeriod::Day);
        assert_eq!(day_period(at("2024-05-01T19:00")), DayPeriod::Day);
        assert_eq!(day_period(at("2024-05-01T20:00")), DayPeriod::Night);
    }

    #[tokio::test]
    async fn fetch_forecast_reports_unreachable_endpoint() {
        let provider = OpenMeteoProvider::with_base_url("http://127.0.0.1:9/v1/forecast");
        let request = crate::Config::default().forecast_request();

        assert!(provider.fetch_forecast(&request).await.is_err());
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let long = "é".repeat(300);
        let out = truncate_body(&long);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), 203);
        assert_eq!(truncate_body("short"), "short");
    }
}
