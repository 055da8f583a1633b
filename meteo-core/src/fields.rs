use serde::{Serialize, Serializer};
use std::{fmt, str::FromStr};

use crate::{
    error::{MeteoError, Result},
    model::WeatherRecord,
};

/// The exportable fields of a [`WeatherRecord`], in canonical export order.
///
/// Adding a field means adding a variant here plus one arm in [`Field::name`] and
/// [`Field::extract`]; the encoder and the shell pick it up from [`Field::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Date,
    Heure,
    Temperature,
    Ressenti,
    TempMin,
    TempMax,
    Humidite,
    Pression,
    DescriptionMeteo,
    VitesseVent,
    DirectionVent,
    Nuages,
    ProbabilitePrecipitation,
}

impl Field {
    pub const ALL: [Field; 13] = [
        Field::Date,
        Field::Heure,
        Field::Temperature,
        Field::Ressenti,
        Field::TempMin,
        Field::TempMax,
        Field::Humidite,
        Field::Pression,
        Field::DescriptionMeteo,
        Field::VitesseVent,
        Field::DirectionVent,
        Field::Nuages,
        Field::ProbabilitePrecipitation,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Field::Date => "Date",
            Field::Heure => "Heure",
            Field::Temperature => "Temperature",
            Field::Ressenti => "Ressenti",
            Field::TempMin => "TempMin",
            Field::TempMax => "TempMax",
            Field::Humidite => "Humidite",
            Field::Pression => "Pression",
            Field::DescriptionMeteo => "DescriptionMeteo",
            Field::VitesseVent => "VitesseVent",
            Field::DirectionVent => "DirectionVent",
            Field::Nuages => "Nuages",
            Field::ProbabilitePrecipitation => "ProbabilitePrecipitation",
        }
    }

    pub fn extract(&self, record: &WeatherRecord) -> FieldValue {
        match self {
            Field::Date => FieldValue::Text(record.formatted_date()),
            Field::Heure => FieldValue::Text(record.formatted_time()),
            Field::Temperature => FieldValue::Float(record.temperature),
            Field::Ressenti => FieldValue::Float(record.feels_like),
            Field::TempMin => FieldValue::Float(record.temp_min),
            Field::TempMax => FieldValue::Float(record.temp_max),
            Field::Humidite => FieldValue::Int(i64::from(record.humidity)),
            Field::Pression => FieldValue::Int(i64::from(record.pressure)),
            Field::DescriptionMeteo => FieldValue::Text(record.description().to_string()),
            Field::VitesseVent => FieldValue::Float(record.wind_speed),
            Field::DirectionVent => FieldValue::Int(i64::from(record.wind_direction)),
            Field::Nuages => FieldValue::Int(i64::from(record.cloudiness)),
            Field::ProbabilitePrecipitation => FieldValue::Float(record.precipitation_probability),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = MeteoError;

    fn from_str(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        Field::ALL
            .iter()
            .find(|f| f.name().eq_ignore_ascii_case(trimmed))
            .copied()
            .ok_or_else(|| {
                MeteoError::InvalidArgument(format!(
                    "Unknown field '{trimmed}'. Supported fields: {}.",
                    Field::ALL.map(|f| f.name()).join(", ")
                ))
            })
    }
}

/// A scalar pulled out of a record. Flat exports only ever carry these.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Float(f64),
    Int(i64),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Float(v) => write!(f, "{v}"),
            FieldValue::Int(v) => write!(f, "{v}"),
        }
    }
}

impl Serialize for FieldValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldValue::Text(s) => serializer.serialize_str(s),
            FieldValue::Float(v) => serializer.serialize_f64(*v),
            FieldValue::Int(v) => serializer.serialize_i64(*v),
        }
    }
}

/// An ordered, duplicate-free selection of fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Projection {
    fields: Vec<Field>,
}

impl Projection {
    pub fn new(fields: impl IntoIterator<Item = Field>) -> Self {
        let mut projection = Projection::default();
        for field in fields {
            projection.push(field);
        }
        projection
    }

    /// Every field in canonical order.
    pub fn all() -> Self {
        Projection { fields: Field::ALL.to_vec() }
    }

    /// Parse a comma-separated list of field names, e.g. `"Temperature, Date"`.
    pub fn parse(input: &str) -> Result<Self> {
        let fields = input
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Field::from_str)
            .collect::<Result<Vec<_>>>()?;

        if fields.is_empty() {
            return Err(MeteoError::InvalidArgument(
                "Field list is empty. Pass at least one field name.".to_string(),
            ));
        }

        Ok(Projection::new(fields))
    }

    /// Parse 1-based menu numbers as shown by the shell, e.g. `"3, 9"`.
    /// Entries that are not numbers or are out of range are skipped.
    pub fn from_indices(input: &str) -> Self {
        Projection::new(
            input
                .split(',')
                .filter_map(|s| s.trim().parse::<usize>().ok())
                .filter_map(|n| n.checked_sub(1).and_then(|i| Field::ALL.get(i).copied())),
        )
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn header(&self) -> Vec<&'static str> {
        self.fields.iter().map(Field::name).collect()
    }

    fn push(&mut self, field: Field) {
        if !self.fields.contains(&field) {
            self.fields.push(field);
        }
    }
}
