use anyhow::{Context, Result};
use geojson::{GeoJson, Value};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::geo::{wkb, Coord, DecodeError, Geometry, Polygon, Ring};

/// Scalar attribute value from a result row
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Null,
}

impl AttrValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Number(n) if n.is_finite() => Some(*n),
            AttrValue::Text(s) => s.trim().parse().ok().filter(|n: &f64| n.is_finite()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bool(b) => write!(f, "{}", b),
            AttrValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            AttrValue::Number(n) => write!(f, "{}", n),
            AttrValue::Text(s) => f.write_str(s),
            AttrValue::Null => f.write_str("null"),
        }
    }
}

pub type Attributes = HashMap<String, AttrValue>;

/// Where a row's geometry comes from
#[derive(Debug, Clone, PartialEq)]
pub enum GeometrySource {
    /// WKB/EWKB bytes, raw or hex text
    Wkb(Vec<u8>),
    /// GeoJSON geometry object (`ST_AsGeoJSON` output)
    GeoJson(geojson::Geometry),
}

/// One row of a query result
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowItem {
    pub id: String,
    pub name: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub attributes: Attributes,
    pub geometry: Option<GeometrySource>,
}

impl RowItem {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Decoded geometry, `Ok(None)` if the row has none
    pub fn decode_geometry(&self) -> Result<Option<Geometry>, DecodeError> {
        match &self.geometry {
            None => Ok(None),
            Some(GeometrySource::Wkb(bytes)) => wkb::decode(bytes).map(Some),
            Some(GeometrySource::GeoJson(geometry)) => geometry_from_geojson(geometry).map(Some),
        }
    }

    /// Raw point coordinates as (lon, lat)
    pub fn point(&self) -> Option<Coord> {
        match (self.lon, self.lat) {
            (Some(lon), Some(lat)) if lon.is_finite() && lat.is_finite() => Some((lon, lat)),
            _ => None,
        }
    }

    pub fn attribute(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.get(key)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GeometryField {
    Hex(String),
    GeoJson(geojson::Geometry),
}

#[derive(Deserialize)]
struct RowRecord {
    id: AttrValue,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    attributes: Attributes,
    #[serde(default)]
    geometry: Option<GeometryField>,
}

impl From<RowRecord> for RowItem {
    fn from(record: RowRecord) -> Self {
        Self {
            id: record.id.to_string(),
            name: record.name,
            lat: record.lat,
            lon: record.lon,
            attributes: record.attributes,
            geometry: record.geometry.map(|g| match g {
                GeometryField::Hex(hex) => GeometrySource::Wkb(hex.into_bytes()),
                GeometryField::GeoJson(geometry) => GeometrySource::GeoJson(geometry),
            }),
        }
    }
}

/// Parse a JSON array of rows. simd-json parses in place, hence `&mut`.
pub fn parse_rows(bytes: &mut [u8]) -> Result<Vec<RowItem>> {
    let records: Vec<RowRecord> = simd_json::serde::from_slice(bytes)?;
    Ok(records.into_iter().map(RowItem::from).collect())
}

/// Load a rows file written by the query layer
pub fn load_rows(path: &Path) -> Result<Vec<RowItem>> {
    let mut bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let rows = parse_rows(&mut bytes).with_context(|| format!("parsing {}", path.display()))?;
    log::info!("loaded {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

fn coord(position: &[f64]) -> Result<Coord, DecodeError> {
    match position {
        [lon, lat, ..] => Ok((*lon, *lat)),
        _ => Err(DecodeError::Unsupported("position with fewer than 2 values")),
    }
}

fn ring(positions: &[Vec<f64>]) -> Result<Ring, DecodeError> {
    positions.iter().map(|p| coord(p)).collect()
}

fn polygon(rings: &[Vec<Vec<f64>>]) -> Result<Polygon, DecodeError> {
    Ok(Polygon::new(rings.iter().map(|r| ring(r)).collect::<Result<_, _>>()?))
}

/// Convert a GeoJSON geometry into the crate's geometry model
pub fn geometry_from_geojson(geometry: &geojson::Geometry) -> Result<Geometry, DecodeError> {
    match &geometry.value {
        Value::Point(p) => Ok(Geometry::Point(coord(p)?)),
        Value::MultiPoint(points) if points.len() == 1 => Ok(Geometry::Point(coord(&points[0])?)),
        Value::MultiPoint(_) => Err(DecodeError::Unsupported("MultiPoint")),
        Value::LineString(line) => Ok(Geometry::LineString(ring(line)?)),
        Value::MultiLineString(lines) => Ok(Geometry::MultiLineString(
            lines.iter().map(|l| ring(l)).collect::<Result<_, _>>()?,
        )),
        Value::Polygon(rings) => Ok(Geometry::Polygon(polygon(rings)?)),
        Value::MultiPolygon(polys) => Ok(Geometry::MultiPolygon(
            polys.iter().map(|p| polygon(p)).collect::<Result<_, _>>()?,
        )),
        Value::GeometryCollection(items) if items.len() == 1 => geometry_from_geojson(&items[0]),
        Value::GeometryCollection(_) => Err(DecodeError::Unsupported("GeometryCollection")),
    }
}

/// Background coastlines, drawn as polylines under the data
#[derive(Debug, Clone, Default)]
pub struct Basemap {
    pub lines: Vec<Ring>,
}

impl Basemap {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Load Natural Earth coastlines from `data_dir`, falling back to the
/// built-in outlines when nothing usable is there
pub fn load_basemap(data_dir: &Path) -> Basemap {
    let coastline_files = ["ne_110m_coastline.json", "natural-earth.json", "ne_50m_coastline.json"];

    let mut basemap = Basemap::default();
    for filename in coastline_files {
        let path = data_dir.join(filename);
        if !path.exists() {
            continue;
        }
        match load_coastlines(&path) {
            Ok(lines) => {
                log::info!("basemap: {} lines from {}", lines.len(), path.display());
                basemap.lines.extend(lines);
                break;
            }
            Err(e) => log::warn!("failed to load {}: {:#}", path.display(), e),
        }
    }

    if basemap.is_empty() {
        log::info!("no coastline data in {}, using built-in outlines", data_dir.display());
        return simple_world();
    }
    basemap
}

fn load_coastlines(path: &Path) -> Result<Vec<Ring>> {
    let content = fs::read_to_string(path)?;
    let geojson: GeoJson = content.parse()?;
    let mut lines = Vec::new();
    process_geojson_lines(&geojson, |line| lines.push(line));
    Ok(lines)
}

/// Process GeoJSON and extract line features
fn process_geojson_lines<F>(geojson: &GeoJson, mut add_line: F)
where
    F: FnMut(Ring),
{
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in &fc.features {
                if let Some(ref geometry) = feature.geometry {
                    process_geometry_lines(geometry, &mut add_line);
                }
            }
        }
        GeoJson::Feature(f) => {
            if let Some(ref geometry) = f.geometry {
                process_geometry_lines(geometry, &mut add_line);
            }
        }
        GeoJson::Geometry(geometry) => {
            process_geometry_lines(geometry, &mut add_line);
        }
    }
}

fn process_geometry_lines<F>(geometry: &geojson::Geometry, add_line: &mut F)
where
    F: FnMut(Ring),
{
    let to_line = |coords: &Vec<Vec<f64>>| -> Ring { coords.iter().filter_map(|c| coord(c).ok()).collect() };
    match &geometry.value {
        Value::LineString(coords) => add_line(to_line(coords)),
        Value::MultiLineString(lines) => lines.iter().for_each(|l| add_line(to_line(l))),
        Value::Polygon(rings) => {
            if let Some(exterior) = rings.first() {
                add_line(to_line(exterior));
            }
        }
        Value::MultiPolygon(polygons) => {
            for rings in polygons {
                if let Some(exterior) = rings.first() {
                    add_line(to_line(exterior));
                }
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                process_geometry_lines(g, add_line);
            }
        }
        _ => {}
    }
}

/// Coarse continent outlines for when no data file is available
pub fn simple_world() -> Basemap {
    let lines = vec![
        // North America
        vec![
            (-168.0, 65.0), (-166.0, 60.0), (-141.0, 60.0), (-130.0, 55.0),
            (-125.0, 48.0), (-124.0, 40.0), (-117.0, 32.0), (-110.0, 25.0),
            (-97.0, 25.0), (-97.0, 28.0), (-82.0, 24.0), (-80.0, 25.0),
            (-81.0, 31.0), (-75.0, 35.0), (-70.0, 41.0), (-67.0, 45.0),
            (-65.0, 47.0), (-55.0, 47.0), (-52.0, 47.0), (-55.0, 52.0),
            (-58.0, 55.0), (-64.0, 60.0), (-73.0, 62.0), (-80.0, 63.0),
            (-95.0, 62.0), (-110.0, 68.0), (-130.0, 70.0), (-145.0, 70.0),
            (-168.0, 65.0),
        ],
        // South America
        vec![
            (-80.0, 10.0), (-75.0, 5.0), (-70.0, 5.0), (-60.0, 5.0),
            (-50.0, 0.0), (-35.0, -5.0), (-35.0, -10.0), (-38.0, -15.0),
            (-40.0, -22.0), (-48.0, -25.0), (-55.0, -34.0), (-58.0, -38.0),
            (-65.0, -42.0), (-68.0, -50.0), (-75.0, -52.0), (-75.0, -45.0),
            (-72.0, -40.0), (-72.0, -30.0), (-70.0, -20.0), (-70.0, -15.0),
            (-80.0, -5.0), (-80.0, 0.0), (-80.0, 10.0),
        ],
        // Europe
        vec![
            (-10.0, 36.0), (-5.0, 36.0), (0.0, 38.0), (5.0, 43.0),
            (10.0, 44.0), (15.0, 45.0), (20.0, 40.0), (25.0, 37.0),
            (30.0, 40.0), (35.0, 42.0), (40.0, 43.0), (40.0, 55.0),
            (30.0, 60.0), (25.0, 65.0), (20.0, 70.0), (10.0, 71.0),
            (5.0, 62.0), (5.0, 58.0), (-5.0, 58.0), (-10.0, 52.0),
            (-5.0, 48.0), (-5.0, 43.0), (-10.0, 36.0),
        ],
        // Africa
        vec![
            (-17.0, 15.0), (-17.0, 20.0), (-15.0, 28.0), (-5.0, 35.0),
            (10.0, 37.0), (20.0, 33.0), (25.0, 32.0), (35.0, 30.0),
            (35.0, 20.0), (42.0, 12.0), (50.0, 12.0), (45.0, 5.0),
            (40.0, -5.0), (40.0, -15.0), (35.0, -25.0), (30.0, -32.0),
            (20.0, -35.0), (18.0, -32.0), (12.0, -18.0), (10.0, -5.0),
            (8.0, 4.0), (0.0, 5.0), (-8.0, 4.0), (-15.0, 10.0),
            (-17.0, 15.0),
        ],
        // Asia
        vec![
            (35.0, 42.0), (40.0, 43.0), (50.0, 40.0), (55.0, 37.0),
            (60.0, 25.0), (65.0, 25.0), (70.0, 20.0), (75.0, 15.0),
            (80.0, 8.0), (80.0, 15.0), (88.0, 22.0), (92.0, 22.0),
            (95.0, 16.0), (100.0, 14.0), (105.0, 10.0), (110.0, 20.0),
            (115.0, 22.0), (120.0, 22.0), (122.0, 25.0), (125.0, 30.0),
            (130.0, 35.0), (135.0, 35.0), (140.0, 40.0), (145.0, 45.0),
            (145.0, 50.0), (140.0, 55.0), (135.0, 55.0), (130.0, 52.0),
            (130.0, 43.0), (120.0, 40.0), (110.0, 45.0), (90.0, 50.0),
            (70.0, 55.0), (60.0, 55.0), (50.0, 50.0), (40.0, 43.0),
        ],
        // Australia
        vec![
            (115.0, -20.0), (120.0, -18.0), (130.0, -12.0), (140.0, -12.0),
            (145.0, -15.0), (150.0, -25.0), (153.0, -30.0), (150.0, -35.0),
            (145.0, -38.0), (140.0, -38.0), (135.0, -35.0), (130.0, -32.0),
            (125.0, -32.0), (115.0, -35.0), (115.0, -25.0), (115.0, -20.0),
        ],
    ];
    Basemap { lines }
}

fn closed(points: &[Coord]) -> Ring {
    let mut ring = points.to_vec();
    if let Some(first) = points.first() {
        ring.push(*first);
    }
    ring
}

fn attrs(pairs: &[(&str, AttrValue)]) -> Attributes {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

fn text(s: &str) -> AttrValue {
    AttrValue::Text(s.to_string())
}

/// Hex WKB the way PostGIS prints a bytea column
fn wkb_source(geometry: &Geometry) -> Option<GeometrySource> {
    match wkb::to_hex(geometry) {
        Ok(hex) => Some(GeometrySource::Wkb(format!("\\x{}", hex).into_bytes())),
        Err(e) => {
            log::warn!("demo geometry failed to encode: {}", e);
            None
        }
    }
}

/// Sample result set used when no rows file is given
pub fn demo_rows() -> Vec<RowItem> {
    let mut rows = Vec::new();

    let square = Geometry::Polygon(Polygon::new(vec![closed(&[(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0)])]));
    rows.push(RowItem {
        name: Some("Null Island Block".to_string()),
        attributes: attrs(&[
            ("area_km2", AttrValue::Number(197_000.0)),
            ("continent", text("Africa")),
            ("terrain", text("plain")),
            ("gdp", AttrValue::Number(2.1e9)),
        ]),
        geometry: wkb_source(&square),
        ..RowItem::new("1")
    });

    // Centroid of the horseshoe falls in the notch
    let horseshoe = Geometry::Polygon(Polygon::new(vec![closed(&[
        (20.0, 40.0), (30.0, 40.0), (30.0, 50.0), (27.0, 50.0),
        (27.0, 43.0), (23.0, 43.0), (23.0, 50.0), (20.0, 50.0),
    ])]));
    rows.push(RowItem {
        name: Some("Horseshoe Basin".to_string()),
        attributes: attrs(&[
            ("area_km2", AttrValue::Number(540_000.0)),
            ("continent", text("Europe")),
            ("terrain", text("basin")),
            ("gdp", AttrValue::Number(8.4e11)),
        ]),
        geometry: wkb_source(&horseshoe),
        ..RowItem::new("2")
    });

    let fiji = Geometry::MultiPolygon(vec![
        Polygon::new(vec![closed(&[(177.0, -16.0), (-179.0, -16.0), (-179.0, -19.0), (177.0, -19.0)])]),
        Polygon::new(vec![closed(&[(-179.9, -20.0), (-178.5, -20.0), (-178.5, -21.0), (-179.9, -21.0)])]),
    ]);
    rows.push(RowItem {
        name: Some("Fiji".to_string()),
        attributes: attrs(&[
            ("area_km2", AttrValue::Number(18_274.0)),
            ("continent", text("Oceania")),
            ("terrain", text("mountain")),
            ("gdp", AttrValue::Number(5.5e9)),
        ]),
        geometry: wkb_source(&fiji),
        ..RowItem::new("3")
    });

    let archipelago = Geometry::MultiPolygon(vec![
        Polygon::new(vec![
            closed(&[(-30.0, 10.0), (-20.0, 10.0), (-20.0, 20.0), (-30.0, 20.0)]),
            closed(&[(-27.0, 13.0), (-23.0, 13.0), (-23.0, 17.0), (-27.0, 17.0)]),
        ]),
        Polygon::new(vec![closed(&[(-18.0, 12.0), (-16.0, 12.0), (-16.0, 14.0)])]),
        Polygon::new(vec![closed(&[(-33.0, 8.0), (-32.0, 8.0), (-32.0, 9.0)])]),
    ]);
    rows.push(RowItem {
        name: Some("Ring Atolls".to_string()),
        attributes: attrs(&[
            ("area_km2", AttrValue::Number(4_033.0)),
            ("continent", text("Africa")),
            ("terrain", text("hills")),
            ("gdp", AttrValue::Number(2.0e9)),
        ]),
        geometry: wkb_source(&archipelago),
        ..RowItem::new("4")
    });

    let iberia = geojson::Geometry::new(Value::Polygon(vec![vec![
        vec![-9.0, 37.0], vec![-2.0, 36.5], vec![3.0, 42.0], vec![-2.0, 43.5],
        vec![-9.0, 43.0], vec![-9.0, 37.0],
    ]]));
    rows.push(RowItem {
        name: Some("Iberia".to_string()),
        attributes: attrs(&[
            ("area_km2", AttrValue::Number(583_254.0)),
            ("continent", text("Europe")),
            ("terrain", text("plateau")),
            ("gdp", AttrValue::Number(1.7e12)),
        ]),
        geometry: Some(GeometrySource::GeoJson(iberia)),
        ..RowItem::new("5")
    });

    let river = Geometry::LineString(vec![
        (8.2, 48.0), (11.0, 48.7), (16.4, 48.2), (19.0, 47.5), (20.5, 44.8), (22.5, 44.0), (28.0, 45.0), (29.7, 45.2),
    ]);
    rows.push(RowItem {
        name: Some("Danube".to_string()),
        attributes: attrs(&[("length_km", AttrValue::Number(2_850.0)), ("terrain", text("wetland"))]),
        geometry: wkb_source(&river),
        ..RowItem::new("6")
    });

    let cities = [
        ("7", "Tokyo", 139.7, 35.7, 37_400_000.0, "Asia"),
        ("8", "Nairobi", 36.8, -1.3, 4_400_000.0, "Africa"),
        ("9", "Lima", -77.0, -12.0, 10_700_000.0, "South America"),
        ("10", "Chicago", -87.6, 41.9, 8_900_000.0, "North America"),
    ];
    for (id, name, lon, lat, population, continent) in cities {
        rows.push(RowItem {
            name: Some(name.to_string()),
            lat: Some(lat),
            lon: Some(lon),
            attributes: attrs(&[("population", AttrValue::Number(population)), ("continent", text(continent))]),
            ..RowItem::new(id)
        });
    }

    rows
}
