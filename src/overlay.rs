//! Static context drawn under the investor layers: the priority FSAs, the
//! reference cities, Highways 400 and 10 and the corridor around them.

use crate::data::parse_number;
use anyhow::{anyhow, Context, Result};
use geo::{LineString, Point, Polygon};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

/// Nominal coverage radius drawn around each priority FSA, in metres.
pub const FSA_RADIUS_M: f64 = 15_000.0;
/// Nominal ring drawn around each reference city, in metres.
pub const CITY_RADIUS_M: f64 = 40_000.0;

const CAPITAL_ICON: &str = "http://maps.google.com/mapfiles/kml/shapes/capital_small.png";

// (lat, lon)
const CORRIDOR: &[(f64, f64)] = &[
    (44.62, -80.35),
    (44.48, -79.58),
    (44.05, -79.3),
    (43.6, -79.35),
    (43.55, -79.85),
    (43.85, -80.15),
    (44.35, -80.25),
    (44.62, -80.35),
];

const FSA_CLUSTER_INFO: &str = "1 – High-Income / High-Investment";

// Collingwood to Toronto, (lat, lon)
const HIGHWAYS: &[(&str, &[(f64, f64)])] = &[
    (
        "Highway 400",
        &[(44.5008, -80.2144), (44.39, -79.69), (43.9, -79.51), (43.6532, -79.3832)],
    ),
    (
        "Highway 10",
        &[(44.5008, -80.2144), (44.3, -80.0), (43.9, -79.9), (43.6532, -79.3832)],
    ),
];

const KEY_CITIES: &[(&str, f64, f64)] = &[
    ("Toronto", 43.6532, -79.3832),
    ("Collingwood", 44.5008, -80.2144),
];

#[derive(Debug, Clone, PartialEq)]
pub struct FsaSite {
    pub fsa: String,
    pub point: Point<f64>,
}

pub fn load_priority_fsas(path: &Path, cluster: i64) -> Result<Vec<FsaSite>> {
    info!("Loading FSA overlay from {:?}...", path);
    let file = File::open(path).with_context(|| format!("Failed to open FSA data: {:?}", path))?;
    let value: Value = serde_json::from_reader(BufReader::new(file))
        .context("Failed to parse FSA data")?;
    let sites = priority_fsas(&value, cluster)?;
    info!("Kept {} FSAs in socioeconomic cluster {}", sites.len(), cluster);
    Ok(sites)
}

pub fn priority_fsas(value: &Value, cluster: i64) -> Result<Vec<FsaSite>> {
    let rows = value
        .as_array()
        .ok_or_else(|| anyhow!("FSA data must be a list of objects"))?;

    let sites = rows
        .iter()
        .filter_map(Value::as_object)
        .filter(|row| {
            row.get("socioeconomic_cluster")
                .and_then(parse_number)
                .is_some_and(|c| c == cluster as f64)
        })
        .filter_map(|row| {
            let lat = row.get("lat").and_then(parse_number)?;
            let lon = row.get("lon").and_then(parse_number)?;
            let fsa = match row.get("fsa") {
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
                None => String::new(),
            };
            Some(FsaSite {
                fsa,
                point: Point::new(lon, lat),
            })
        })
        .collect();

    Ok(sites)
}

fn feature(geometry: geojson::Value, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geometry)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

pub fn corridor() -> Polygon<f64> {
    let ring: LineString<f64> = CORRIDOR.iter().map(|&(lat, lon)| (lon, lat)).collect();
    Polygon::new(ring, vec![])
}

pub fn highway(waypoints: &[(f64, f64)]) -> LineString<f64> {
    waypoints.iter().map(|&(lat, lon)| (lon, lat)).collect()
}

/// FSA circles, city hall markers, highways and the corridor outline as GeoJSON.
pub fn overlay_geojson(sites: &[FsaSite]) -> FeatureCollection {
    let mut features = Vec::with_capacity(sites.len() + KEY_CITIES.len() + HIGHWAYS.len() + 1);

    for site in sites {
        let mut props = JsonObject::new();
        props.insert("kind".into(), "fsa".into());
        props.insert("fsa".into(), site.fsa.clone().into());
        props.insert("cluster".into(), FSA_CLUSTER_INFO.into());
        props.insert("radius_m".into(), FSA_RADIUS_M.into());
        features.push(feature(geojson::Value::from(&site.point), props));
    }

    for &(name, lat, lon) in KEY_CITIES {
        let mut props = JsonObject::new();
        props.insert("kind".into(), "city".into());
        props.insert("title".into(), format!("{} City Hall", name).into());
        props.insert("icon".into(), CAPITAL_ICON.into());
        props.insert("radius_m".into(), CITY_RADIUS_M.into());
        features.push(feature(geojson::Value::from(&Point::new(lon, lat)), props));
    }

    for &(name, waypoints) in HIGHWAYS {
        let mut props = JsonObject::new();
        props.insert("kind".into(), "highway".into());
        props.insert("name".into(), name.into());
        props.insert("stroke".into(), "#000000".into());
        props.insert("dashed".into(), true.into());
        features.push(feature(geojson::Value::from(&highway(waypoints)), props));
    }

    let mut props = JsonObject::new();
    props.insert("kind".into(), "corridor".into());
    props.insert("stroke".into(), "#FF0000".into());
    features.push(feature(geojson::Value::from(&corridor()), props));

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
