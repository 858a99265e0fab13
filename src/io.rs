//! Observed-data ingest and fitted-curve export.
//!
//! Observed data is a three-column CSV of `time, delta_p, derivative`. A
//! leading header row is detected and skipped, as are `#` comment lines.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use ndarray::Array1;

use crate::data::ObservedData;
use crate::error::{FitError, Result};
use crate::result::FitResult;

/// Read observed data from a CSV file.
pub fn read_observed_csv<P: AsRef<Path>>(path: P) -> Result<ObservedData> {
    let file = File::open(path)?;
    parse_observed_csv(file)
}

/// Parse observed data from any reader.
pub fn parse_observed_csv<R: Read>(reader: R) -> Result<ObservedData> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut time = Vec::new();
    let mut delta_p = Vec::new();
    let mut derivative = Vec::new();

    for (idx, record) in reader.records().enumerate() {
        let record = record?;
        let line = record.position().map_or(idx + 1, |p| p.line() as usize);

        if record.iter().all(str::is_empty) {
            continue;
        }
        if record.len() < 3 {
            return Err(FitError::InvalidConfiguration(format!(
                "line {}: expected 3 columns (time, delta_p, derivative), found {}",
                line,
                record.len()
            )));
        }

        let fields: Vec<std::result::Result<f64, _>> =
            record.iter().take(3).map(str::parse::<f64>).collect();

        // A non-numeric first row is a header.
        if idx == 0 && fields.iter().any(|f| f.is_err()) {
            continue;
        }

        let mut values = [0.0; 3];
        for (column, (slot, field)) in values.iter_mut().zip(fields).enumerate() {
            *slot = field.map_err(|_| {
                FitError::InvalidConfiguration(format!(
                    "line {}: column {} is not a number: '{}'",
                    line,
                    column + 1,
                    record.get(column).unwrap_or_default()
                ))
            })?;
        }

        time.push(values[0]);
        delta_p.push(values[1]);
        derivative.push(values[2]);
    }

    ObservedData::new(time, delta_p, derivative)
}

/// Write fitted curves as `time,pressure,derivative` rows.
pub fn write_curves_csv<W: Write>(writer: W, time: &Array1<f64>, result: &FitResult) -> Result<()> {
    let curves = &result.curves;
    if curves.pressure.len() != time.len() || curves.derivative.len() != time.len() {
        return Err(FitError::DimensionMismatch(format!(
            "{} time samples but curves of length {} and {}",
            time.len(),
            curves.pressure.len(),
            curves.derivative.len()
        )));
    }

    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(["time", "pressure", "derivative"])?;
    for ((t, p), d) in time
        .iter()
        .zip(curves.pressure.iter())
        .zip(curves.derivative.iter())
    {
        writer.write_record(&[t.to_string(), p.to_string(), d.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Write fitted curves to a CSV file.
pub fn save_curves_csv<P: AsRef<Path>>(path: P, time: &Array1<f64>, result: &FitResult) -> Result<()> {
    let file = File::create(path)?;
    write_curves_csv(file, time, result)
}
