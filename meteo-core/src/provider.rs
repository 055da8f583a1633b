use async_trait::async_trait;
use std::fmt::Debug;

use crate::{Config, ForecastRequest, ForecastSet, provider::openmeteo::OpenMeteoProvider};

pub mod openmeteo;
pub mod wmo;

/// Source of hourly forecasts.
///
/// Implementations own all provider-specific normalization and must hand back a
/// validated [`ForecastSet`]; the query and export stages never see raw payloads.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn fetch_forecast(&self, request: &ForecastRequest) -> anyhow::Result<ForecastSet>;
}

/// Construct the provider described by `config`.
pub fn provider_from_config(config: &Config) -> Box<dyn WeatherProvider> {
    match &config.provider_url {
        Some(url) => Box::new(OpenMeteoProvider::with_base_url(url.clone())),
        None => Box::new(OpenMeteoProvider::new()),
    }
}
