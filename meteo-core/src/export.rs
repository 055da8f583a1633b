//! Field-selective serialization of a record view to JSON or `;`-separated CSV.
//!
//! Encoding always happens fully in memory. [`export_to_path`] only touches the
//! destination once the whole payload has been produced, so a failed encode never
//! leaves a half-written file behind.
//!
//! CSV framing: the delimiter is `;` and lines end with `\n`. Values containing `;`,
//! quotes or newlines are wrapped in double quotes by the CSV writer; nothing else is
//! escaped, so readers that split lines naively on `;` will mis-read such rows
//! (free-text descriptions are the usual suspects).

use serde::{
    Deserialize,
    ser::{Serialize, SerializeMap, Serializer},
};
use serde_json::ser::PrettyFormatter;
use std::{fmt, fs, path::Path, str::FromStr};
use tracing::{debug, info};

use crate::{
    error::{MeteoError, Result},
    fields::{Field, Projection},
    model::WeatherRecord,
};

pub const CSV_DELIMITER: u8 = b';';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }

    /// File extension, without the dot.
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    pub const fn all() -> &'static [ExportFormat] {
        &[ExportFormat::Json, ExportFormat::Csv]
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = MeteoError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            _ => Err(MeteoError::Encoding(format!(
                "Unsupported export format '{value}'. Supported formats: json, csv."
            ))),
        }
    }
}

/// Encode `records` in `format`.
///
/// With `projection`, each record becomes a flat row of exactly those fields, in that
/// order. Without it (or with an empty one), JSON carries the full nested record and
/// CSV carries every registry field in canonical order.
pub fn encode(
    records: &[WeatherRecord],
    format: ExportFormat,
    projection: Option<&Projection>,
) -> Result<Vec<u8>> {
    let projection = projection.filter(|p| !p.is_empty());

    let bytes = match format {
        ExportFormat::Json => encode_json(records, projection)?,
        ExportFormat::Csv => encode_csv(records, projection.cloned().unwrap_or_else(Projection::all))?,
    };

    debug!(
        format = format.as_str(),
        records = records.len(),
        projected = projection.is_some(),
        bytes = bytes.len(),
        "encoded export"
    );
    Ok(bytes)
}

/// Encode, then write the result to `path` in a single call.
///
/// Returns the number of bytes written. The file is created (or truncated) only after
/// encoding succeeded.
pub fn export_to_path(
    records: &[WeatherRecord],
    format: ExportFormat,
    projection: Option<&Projection>,
    path: &Path,
) -> Result<usize> {
    let bytes = encode(records, format, projection)?;

    fs::write(path, &bytes).map_err(|source| MeteoError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    info!(path = %path.display(), format = format.as_str(), records = records.len(), "exported records");
    Ok(bytes.len())
}

/// `stem` with the extension for `format` appended, unless it already has it.
pub fn default_file_name(stem: &str, format: ExportFormat) -> String {
    let suffix = format!(".{}", format.extension());
    if stem.to_lowercase().ends_with(&suffix) {
        stem.to_string()
    } else {
        format!("{stem}{suffix}")
    }
}

fn encode_json(records: &[WeatherRecord], projection: Option<&Projection>) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"  "));

    match projection {
        Some(projection) => {
            let rows: Vec<_> = records
                .iter()
                .map(|record| ProjectedRow { record, fields: projection.fields() })
                .collect();
            rows.serialize(&mut serializer)?;
        }
        None => records.serialize(&mut serializer)?,
    }

    Ok(out)
}

fn encode_csv(records: &[WeatherRecord], projection: Projection) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(CSV_DELIMITER)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(projection.header())?;
    for record in records {
        writer.write_record(
            projection
                .fields()
                .iter()
                .map(|field| field.extract(record).to_string()),
        )?;
    }

    writer
        .into_inner()
        .map_err(|err| MeteoError::Encoding(format!("CSV: {}", err.error())))
}

/// A record seen through a projection: a flat map of field name to scalar.
struct ProjectedRow<'a> {
    record: &'a WeatherRecord,
    fields: &'a [Field],
}

impl Serialize for ProjectedRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for field in self.fields {
            map.serialize_entry(field.name(), &field.extract(self.record))?;
        }
        map.end()
    }
}
