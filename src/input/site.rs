//! Code for reading candidate sites from CSV files.
use super::input_err_msg;
use crate::site::{Point, Site};
use crate::units::Power;
use anyhow::{Context, Result, ensure};
use indexmap::IndexMap;
use std::io::Read;
use std::path::Path;

/// Columns with a fixed meaning. All other columns are treated as weights.
const X_COLUMN: &str = "x";
const Y_COLUMN: &str = "y";
const CHARGING_POINTS_COLUMN: &str = "charging_points";
const AVERAGE_CAPACITY_COLUMN: &str = "average_charging_capacity";

/// Read sites from a CSV file.
///
/// The file must have `x` and `y` columns, in metres. It may also have `charging_points` and
/// `average_charging_capacity` columns describing existing infrastructure. Every other column
/// holding a number is available as a weight; cells which can't be read as numbers are ignored.
pub fn read_sites(file_path: &Path) -> Result<Vec<Site>> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| input_err_msg(file_path))?;
    let sites = read_sites_from_reader(reader).with_context(|| input_err_msg(file_path))?;
    ensure!(
        !sites.is_empty(),
        "CSV file {} cannot be empty",
        file_path.display()
    );

    Ok(sites)
}

/// Read sites from an open CSV reader
fn read_sites_from_reader<R: Read>(mut reader: csv::Reader<R>) -> Result<Vec<Site>> {
    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h == name);
    let x_idx = column(X_COLUMN).context("Missing column: x")?;
    let y_idx = column(Y_COLUMN).context("Missing column: y")?;
    let points_idx = column(CHARGING_POINTS_COLUMN);
    let capacity_idx = column(AVERAGE_CAPACITY_COLUMN);
    let weight_columns: Vec<(usize, &str)> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| {
            ![
                X_COLUMN,
                Y_COLUMN,
                CHARGING_POINTS_COLUMN,
                AVERAGE_CAPACITY_COLUMN,
            ]
            .contains(h)
        })
        .collect();

    let mut sites = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let parse = |idx: usize, name: &str| -> Result<f64> {
            let raw = record.get(idx).unwrap_or_default();
            raw.parse()
                .with_context(|| format!("Row {}: invalid value for {name}: \"{raw}\"", row + 1))
        };

        let position = Point::new(parse(x_idx, X_COLUMN)?, parse(y_idx, Y_COLUMN)?);
        ensure!(
            position.x.is_finite() && position.y.is_finite(),
            "Row {}: coordinates must be finite",
            row + 1
        );

        let weights: IndexMap<String, f64> = weight_columns
            .iter()
            .filter_map(|(idx, name)| {
                let value: f64 = record.get(*idx)?.parse().ok()?;
                Some((name.to_string(), value))
            })
            .collect();

        // Existing infrastructure columns may be left blank
        let present = |idx: &usize| !record.get(*idx).unwrap_or_default().is_empty();

        let mut site = Site::new(position, weights);
        if let Some(idx) = points_idx.filter(present) {
            let raw = record.get(idx).unwrap_or_default();
            site.charging_points = raw.parse().with_context(|| {
                format!("Row {}: invalid value for charging_points: \"{raw}\"", row + 1)
            })?;
        }
        if let Some(idx) = capacity_idx.filter(present) {
            site.average_charging_capacity = Power(parse(idx, AVERAGE_CAPACITY_COLUMN)?);
        }

        sites.push(site);
    }

    Ok(sites)
}
