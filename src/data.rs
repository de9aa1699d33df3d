use crate::types::{Category, Coordinate, Record};
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to open data source {path:?}: {source}")]
    Unreachable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse data source as JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Data source must be a list of records: {0}")]
    Shape(String),
}

const LAT_KEYS: &[&str] = &["lat", "latitude"];
const LON_KEYS: &[&str] = &["lon", "lng", "longitude"];
const NAME_KEYS: &[&str] = &["name", "id"];

/// Reads every investor record from a JSON file.
///
/// Only the outer shape is checked. Records without usable coordinates are
/// kept here and rejected later, when markers are built.
pub fn load_records<C: Category>(path: &Path) -> Result<Vec<Record<C>>, LoadError> {
    info!("Loading {} records from {:?}...", C::SCHEME, path);
    let file = File::open(path).map_err(|source| LoadError::Unreachable {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_reader(BufReader::new(file))?;
    let records = parse_records(&value)?;
    info!("Loaded {} {} records", records.len(), C::SCHEME);
    Ok(records)
}

pub fn parse_records<C: Category>(value: &Value) -> Result<Vec<Record<C>>, LoadError> {
    let rows = value
        .as_array()
        .ok_or_else(|| LoadError::Shape(format!("expected an array, found {}", kind(value))))?;

    let records = rows
        .iter()
        .enumerate()
        .filter_map(|(i, row)| match row.as_object() {
            Some(object) => Some(record_from_object(object)),
            None => {
                debug!("Skipping entry {}: {} is not a record", i, kind(row));
                None
            }
        })
        .collect();
    Ok(records)
}

fn record_from_object<C: Category>(object: &serde_json::Map<String, Value>) -> Record<C> {
    let name = first_of(object, NAME_KEYS)
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .unwrap_or_default();

    let category = object
        .get(C::FIELD)
        .and_then(Value::as_str)
        .map(C::from_label)
        .unwrap_or_else(|| C::from_label(""));

    let lat = first_of(object, LAT_KEYS).and_then(parse_number);
    let lon = first_of(object, LON_KEYS).and_then(parse_number);
    let coordinate = match (lat, lon) {
        (Some(lat), Some(lon)) => Some(Coordinate { lat, lon }),
        _ => None,
    };

    let attributes = object
        .iter()
        .filter(|(k, _)| {
            let k = k.as_str();
            !LAT_KEYS.contains(&k) && !LON_KEYS.contains(&k)
        })
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    Record {
        name,
        coordinate,
        category,
        attributes,
    }
}

fn first_of<'a>(object: &'a serde_json::Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| object.get(*k))
}

/// Numbers and numeric strings parse; NaN and infinities do not.
pub(crate) fn parse_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
