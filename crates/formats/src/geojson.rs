use serde_json::{Map, Value};

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeoPoint {
    pub lon_deg: f64,
    pub lat_deg: f64,
}

impl GeoPoint {
    pub fn new(lon_deg: f64, lat_deg: f64) -> Self {
        Self { lon_deg, lat_deg }
    }
}

/// A single GeoJSON position.
///
/// Malformed positions are kept (as their JSON text) instead of failing the
/// whole document, so consumers can report and skip them one by one.
#[derive(Debug, Clone, PartialEq)]
pub enum Position {
    Valid(GeoPoint),
    Invalid(String),
}

pub type Ring = Vec<Position>;

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Position),
    MultiPoint(Vec<Position>),
    LineString(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

impl Geometry {
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::MultiPoint(_) => "MultiPoint",
            Geometry::LineString(_) => "LineString",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// Area geometries as a list of polygons (each a list of rings).
    /// A `Polygon` is a one-element list; non-area geometries yield `None`.
    pub fn polygons(&self) -> Option<Vec<&[Ring]>> {
        match self {
            Geometry::Polygon(rings) => Some(vec![rings.as_slice()]),
            Geometry::MultiPolygon(polys) => Some(polys.iter().map(Vec::as_slice).collect()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub id: Option<String>,
    pub properties: Map<String, Value>,
    pub geometry: Option<Geometry>,
}

impl Feature {
    /// `properties.name` when it is a string.
    pub fn name(&self) -> Option<&str> {
        self.properties.get("name").and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

#[derive(Debug, thiserror::Error)]
pub enum GeoJsonError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected GeoJSON FeatureCollection")]
    NotAFeatureCollection,
    #[error("invalid feature at index {index}: {reason}")]
    InvalidFeature { index: usize, reason: String },
}

impl FeatureCollection {
    pub fn from_geojson_str(payload: &str) -> Result<Self, GeoJsonError> {
        let value: Value = serde_json::from_str(payload)?;
        Self::from_geojson_value(&value)
    }

    pub fn from_geojson_value(value: &Value) -> Result<Self, GeoJsonError> {
        let obj = value.as_object().ok_or(GeoJsonError::NotAFeatureCollection)?;
        let ty = obj
            .get("type")
            .and_then(Value::as_str)
            .ok_or(GeoJsonError::NotAFeatureCollection)?;
        if ty != "FeatureCollection" {
            return Err(GeoJsonError::NotAFeatureCollection);
        }

        let features_val = obj
            .get("features")
            .and_then(Value::as_array)
            .ok_or(GeoJsonError::NotAFeatureCollection)?;

        let mut features = Vec::with_capacity(features_val.len());
        for (index, feat_val) in features_val.iter().enumerate() {
            let feature = parse_feature(feat_val)
                .map_err(|reason| GeoJsonError::InvalidFeature { index, reason })?;
            features.push(feature);
        }

        Ok(Self { features })
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }
}

fn parse_feature(value: &Value) -> Result<Feature, String> {
    let obj = value
        .as_object()
        .ok_or("feature must be an object".to_string())?;

    let ty = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or("feature missing type".to_string())?;
    if ty != "Feature" {
        return Err(format!("unexpected feature type: {ty}"));
    }

    let id = match obj.get("id") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    let properties = obj
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let geometry = match obj.get("geometry") {
        None => return Err("feature missing geometry".to_string()),
        Some(Value::Null) => None,
        Some(g) => Some(parse_geometry(g)?),
    };

    Ok(Feature {
        id,
        properties,
        geometry,
    })
}

fn parse_geometry(value: &Value) -> Result<Geometry, String> {
    let obj = value
        .as_object()
        .ok_or("geometry must be an object".to_string())?;
    let ty = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or("geometry missing type".to_string())?;

    let coords = obj
        .get("coordinates")
        .ok_or("geometry missing coordinates".to_string())?;

    match ty {
        "Point" => Ok(Geometry::Point(parse_position(coords))),
        "MultiPoint" => Ok(Geometry::MultiPoint(parse_positions(coords)?)),
        "LineString" => Ok(Geometry::LineString(parse_positions(coords)?)),
        "MultiLineString" => Ok(Geometry::MultiLineString(parse_rings(coords)?)),
        "Polygon" => Ok(Geometry::Polygon(parse_rings(coords)?)),
        "MultiPolygon" => Ok(Geometry::MultiPolygon(parse_multi_polygon(coords)?)),
        other => Err(format!("unsupported geometry type: {other}")),
    }
}

/// Numbers, or strings holding a finite number such as `"113.2"`.
fn coordinate(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

fn parse_position(value: &Value) -> Position {
    let coords = value.as_array().and_then(|arr| {
        let lon = coordinate(arr.first()?)?;
        let lat = coordinate(arr.get(1)?)?;
        Some(GeoPoint::new(lon, lat))
    });
    match coords {
        Some(p) => Position::Valid(p),
        None => Position::Invalid(value.to_string()),
    }
}

fn parse_positions(value: &Value) -> Result<Vec<Position>, String> {
    let arr = value
        .as_array()
        .ok_or("coordinates must be an array of positions".to_string())?;
    Ok(arr.iter().map(parse_position).collect())
}

fn parse_rings(value: &Value) -> Result<Vec<Ring>, String> {
    let rings = value
        .as_array()
        .ok_or("coordinates must be an array of rings".to_string())?;
    let mut out = Vec::with_capacity(rings.len());
    for ring in rings {
        out.push(parse_positions(ring)?);
    }
    Ok(out)
}

fn parse_multi_polygon(value: &Value) -> Result<Vec<Vec<Ring>>, String> {
    let polys = value
        .as_array()
        .ok_or("MultiPolygon coordinates must be an array of polygons".to_string())?;
    let mut out = Vec::with_capacity(polys.len());
    for poly in polys {
        out.push(parse_rings(poly)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::{FeatureCollection, GeoJsonError, GeoPoint, Geometry, Position};
    use pretty_assertions::assert_eq;

    const DISTRICTS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "id": 440103,
                "properties": { "name": "Liwan" },
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[113.2, 23.1], [113.3, 23.1], [113.3, 23.2], [113.2, 23.1]]]
                }
            },
            {
                "type": "Feature",
                "properties": { "name": "Nansha" },
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [
                        [[[113.5, 22.7], [113.6, 22.7], [113.6, 22.8], [113.5, 22.7]]],
                        [[[113.7, 22.6], [113.8, 22.6], ["bad"], [113.7, 22.6]]]
                    ]
                }
            }
        ]
    }"#;

    #[test]
    fn parses_polygon_and_multipolygon_features() {
        let fc = FeatureCollection::from_geojson_str(DISTRICTS).expect("parse");
        assert_eq!(fc.len(), 2);
        assert_eq!(fc.features[0].id.as_deref(), Some("440103"));
        assert_eq!(fc.features[0].name(), Some("Liwan"));

        let Some(Geometry::Polygon(rings)) = &fc.features[0].geometry else {
            panic!("expected polygon");
        };
        assert_eq!(rings.len(), 1);
        assert_eq!(rings[0][0], Position::Valid(GeoPoint::new(113.2, 23.1)));

        let polys = fc.features[1]
            .geometry
            .as_ref()
            .and_then(|g| g.polygons())
            .expect("area geometry");
        assert_eq!(polys.len(), 2);
    }

    #[test]
    fn malformed_positions_are_kept_as_invalid() {
        let fc = FeatureCollection::from_geojson_str(DISTRICTS).expect("parse");
        let Some(Geometry::MultiPolygon(polys)) = &fc.features[1].geometry else {
            panic!("expected multipolygon");
        };
        assert_eq!(polys[1][0][2], Position::Invalid(r#"["bad"]"#.to_string()));
    }

    #[test]
    fn numeric_string_coordinates_are_accepted() {
        let fc = FeatureCollection::from_geojson_str(
            r#"{"type":"FeatureCollection","features":[{"type":"Feature","properties":{},
                "geometry":{"type":"LineString","coordinates":[["113.2"," 23.1 "],["x",1],["inf",2]]}}]}"#,
        )
        .expect("parse");
        let Some(Geometry::LineString(points)) = &fc.features[0].geometry else {
            panic!("expected line string");
        };
        assert_eq!(points[0], Position::Valid(GeoPoint::new(113.2, 23.1)));
        assert!(matches!(points[1], Position::Invalid(_)));
        assert!(matches!(points[2], Position::Invalid(_)));
    }

    #[test]
    fn polygon_is_wrapped_as_single_polygon() {
        let g = Geometry::Polygon(vec![vec![]]);
        assert_eq!(g.polygons().map(|p| p.len()), Some(1));
        assert!(Geometry::Point(Position::Invalid("null".into())).polygons().is_none());
    }

    #[test]
    fn null_geometry_is_allowed() {
        let fc = FeatureCollection::from_geojson_str(
            r#"{"type":"FeatureCollection","features":[{"type":"Feature","properties":{},"geometry":null}]}"#,
        )
        .expect("parse");
        assert!(fc.features[0].geometry.is_none());
        assert_eq!(fc.features[0].name(), None);
    }

    #[test]
    fn rejects_non_collections_and_bad_features() {
        let err = FeatureCollection::from_geojson_str(r#"{"type":"Feature"}"#).unwrap_err();
        assert!(matches!(err, GeoJsonError::NotAFeatureCollection));

        let err = FeatureCollection::from_geojson_str(
            r#"{"type":"FeatureCollection","features":[{"type":"Feature","geometry":{"type":"Circle","coordinates":[]}}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, GeoJsonError::InvalidFeature { index: 0, .. }));

        let err = FeatureCollection::from_geojson_str("{").unwrap_err();
        assert!(matches!(err, GeoJsonError::Json(_)));
    }
}
