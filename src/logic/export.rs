use crate::error::{ClimaError, Result};
use crate::models::{ForecastDay, ForecastSeries, Region};
use chrono::NaiveDate;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A rendered CSV file, ready to be written wherever the caller wants
#[derive(Debug, Clone, PartialEq)]
pub struct CsvExport {
    pub filename: String,
    pub contents: String,
}

const CSV_HEADER: [&str; 10] = [
    "date",
    "rainRisk",
    "tempExtreme",
    "soilMoisture",
    "confidence%",
    "precipitation_mm",
    "tempMax_C",
    "tempMin_C",
    "humidity_pct",
    "windSpeed_ms",
];

/// Field order must match `CSV_HEADER`.
#[derive(Serialize)]
struct CsvRow {
    date: String,
    rain_risk: String,
    temp_extreme: String,
    soil_moisture: String,
    confidence_pct: String,
    precipitation_mm: String,
    temp_max_c: String,
    temp_min_c: String,
    humidity_pct: String,
    wind_speed_ms: String,
}

impl From<&ForecastDay> for CsvRow {
    fn from(day: &ForecastDay) -> Self {
        let w = &day.raw_weather;
        Self {
            date: day.date.format("%Y-%m-%d").to_string(),
            rain_risk: score(day.rain_risk),
            temp_extreme: score(day.temp_extreme),
            soil_moisture: score(day.soil_moisture_proxy),
            confidence_pct: percent(day.confidence_score * 100.0),
            precipitation_mm: one_decimal(w.precipitation_mm),
            temp_max_c: one_decimal(w.temp_max_c),
            temp_min_c: one_decimal(w.temp_min_c),
            humidity_pct: percent(w.humidity_percent),
            wind_speed_ms: w.wind_speed_ms.map(one_decimal).unwrap_or_default(),
        }
    }
}

fn one_decimal(v: f64) -> String {
    if v.is_finite() {
        format!("{:.1}", v)
    } else {
        String::new()
    }
}

fn score(v: f64) -> String {
    one_decimal(v.clamp(0.0, 100.0))
}

fn percent(v: f64) -> String {
    if v.is_finite() {
        format!("{:.0}", v.clamp(0.0, 100.0).round())
    } else {
        String::new()
    }
}

pub fn export_filename(region: Region, today: NaiveDate) -> String {
    format!("climasense_{}_{}.csv", region.slug(), today.format("%Y-%m-%d"))
}

/// Render the series as CSV, one row per day in chronological order
/// regardless of how the table is currently sorted.
pub fn export_csv(series: &ForecastSeries, region: Region, today: NaiveDate) -> Result<CsvExport> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(vec![]);
    wtr.write_record(CSV_HEADER)
        .map_err(|e| ClimaError::ExportFailure(format!("CSV header error: {}", e)))?;
    for day in series.days() {
        wtr.serialize(CsvRow::from(day))
            .map_err(|e| ClimaError::ExportFailure(format!("CSV serialization error: {}", e)))?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| ClimaError::ExportFailure(format!("CSV writer error: {}", e)))?;
    let contents = String::from_utf8(bytes)
        .map_err(|e| ClimaError::ExportFailure(format!("UTF-8 conversion error: {}", e)))?;

    Ok(CsvExport {
        filename: export_filename(region, today),
        contents,
    })
}

/// Write the export into `dir`, creating it if needed.
pub fn write_export(dir: &Path, export: &CsvExport) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| {
        ClimaError::ExportFailure(format!("cannot create {}: {}", dir.display(), e))
    })?;
    let path = dir.join(&export.filename);
    std::fs::write(&path, &export.contents).map_err(|e| {
        ClimaError::ExportFailure(format!("cannot write {}: {}", path.display(), e))
    })?;
    tracing::debug!(path = %path.display(), bytes = export.contents.len(), "CSV export written");
    Ok(path)
}
