//! Geometry adapter
//!
//! Converts between the feature service's native geometry encoding
//! (`rings`/`paths`/`x`-`y` objects) and the standard polygon/line/point
//! interchange form, and provides the spherical helpers used by the
//! resolver and indicator queries: centroids, great-circle distance and
//! topology-preserving simplification.

use crate::arcgis::Feature;
use geo::{Centroid, Coord, Geometry, LineString, MultiLineString, Point, Polygon, SimplifyVwPreserve};
use serde_json::{json, Value};

/// Mean Earth radius in kilometers (IUGG).
pub const EARTH_RADIUS_KM: f64 = 6371.0088;

/// Default simplification tolerance in degrees.
pub const DEFAULT_SIMPLIFY_TOLERANCE: f64 = 0.0005;

/// Converts a native-encoded geometry to the standard interchange form.
///
/// A `rings` object becomes a polygon, a `paths` object a line or
/// multi-line, and an `x`/`y` pair a point. Anything already in standard
/// form, or unrecognized, is returned unchanged.
pub fn esri_to_standard(geometry: &Value) -> Value {
    if let Some(rings) = geometry.get("rings") {
        return json!({"type": "Polygon", "coordinates": rings});
    }

    if let Some(paths) = geometry.get("paths").and_then(Value::as_array) {
        return if paths.len() == 1 {
            json!({"type": "LineString", "coordinates": paths[0]})
        } else {
            json!({"type": "MultiLineString", "coordinates": paths})
        };
    }

    if let (Some(x), Some(y)) = (geometry.get("x"), geometry.get("y")) {
        return json!({"type": "Point", "coordinates": [x, y]});
    }

    geometry.clone()
}

/// Parses a standard-form geometry value into a planar geometry object.
pub fn parse_geometry(value: &Value) -> Option<Geometry<f64>> {
    let coordinates = value.get("coordinates")?;
    match value.get("type")?.as_str()? {
        "Polygon" => {
            let mut rings = coordinates.as_array()?.iter().map(ring);
            let exterior = rings.next()??;
            let interiors: Option<Vec<LineString<f64>>> = rings.collect();
            Some(Geometry::Polygon(Polygon::new(exterior, interiors?)))
        }
        "LineString" => Some(Geometry::LineString(ring(coordinates)?)),
        "MultiLineString" => {
            let lines: Option<Vec<LineString<f64>>> =
                coordinates.as_array()?.iter().map(ring).collect();
            Some(Geometry::MultiLineString(MultiLineString::new(lines?)))
        }
        "Point" => {
            let position = coordinate(coordinates)?;
            Some(Geometry::Point(Point::from(position)))
        }
        _ => None,
    }
}

/// Returns the centroid `(lat, lon)` of a feature's geometry.
///
/// Conversion failures yield `None` rather than an error: a feature
/// without a usable geometry simply has no centroid.
pub fn feature_centroid(feature: &Feature) -> Option<(f64, f64)> {
    let geometry = feature.geometry.as_ref()?;
    let parsed = parse_geometry(&esri_to_standard(geometry))?;
    let centroid = parsed.centroid()?;
    Some((centroid.y(), centroid.x()))
}

/// Serializes a planar geometry back to the standard interchange form.
pub fn to_standard_value(geometry: &Geometry<f64>) -> Option<Value> {
    match geometry {
        Geometry::Polygon(polygon) => Some(json!({
            "type": "Polygon",
            "coordinates": polygon_coordinates(polygon),
        })),
        Geometry::MultiPolygon(multi) => Some(json!({
            "type": "MultiPolygon",
            "coordinates": multi.iter().map(polygon_coordinates).collect::<Vec<_>>(),
        })),
        Geometry::LineString(line) => Some(json!({
            "type": "LineString",
            "coordinates": line_coordinates(line),
        })),
        Geometry::MultiLineString(multi) => Some(json!({
            "type": "MultiLineString",
            "coordinates": multi.iter().map(line_coordinates).collect::<Vec<_>>(),
        })),
        Geometry::Point(point) => Some(json!({
            "type": "Point",
            "coordinates": [point.x(), point.y()],
        })),
        _ => None,
    }
}

/// Returns a simplified copy of a feature's geometry in standard form.
///
/// Applies topology-preserving Visvalingam simplification with the given
/// tolerance; point geometries pass through unchanged. Any geometry error
/// yields `None`.
pub fn simplify_geometry(feature: &Feature, tolerance: f64) -> Option<Value> {
    let geometry = feature.geometry.as_ref()?;
    let parsed = parse_geometry(&esri_to_standard(geometry))?;

    let simplified = match parsed {
        Geometry::Polygon(p) => Geometry::Polygon(p.simplify_vw_preserve(&tolerance)),
        Geometry::MultiPolygon(p) => Geometry::MultiPolygon(p.simplify_vw_preserve(&tolerance)),
        Geometry::LineString(l) => Geometry::LineString(l.simplify_vw_preserve(&tolerance)),
        Geometry::MultiLineString(l) => {
            Geometry::MultiLineString(l.simplify_vw_preserve(&tolerance))
        }
        other => other,
    };

    to_standard_value(&simplified)
}

/// Great-circle distance between two WGS84 points, in kilometers.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lon1, lat2, lon2) = (
        lat1.to_radians(),
        lon1.to_radians(),
        lat2.to_radians(),
        lon2.to_radians(),
    );
    let d_lat = lat2 - lat1;
    let d_lon = lon2 - lon1;

    let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Minimum haversine distance from a base point to a set of points.
///
/// Returns `None` for an empty set.
pub fn min_distance_km(base: (f64, f64), points: &[(f64, f64)]) -> Option<f64> {
    points
        .iter()
        .map(|(lat, lon)| haversine_km(base.0, base.1, *lat, *lon))
        .min_by(|a, b| a.total_cmp(b))
}

fn coordinate(value: &Value) -> Option<Coord<f64>> {
    let pair = value.as_array()?;
    Some(Coord {
        x: pair.first()?.as_f64()?,
        y: pair.get(1)?.as_f64()?,
    })
}

fn ring(value: &Value) -> Option<LineString<f64>> {
    let coords: Option<Vec<Coord<f64>>> = value.as_array()?.iter().map(coordinate).collect();
    Some(LineString::new(coords?))
}

fn line_coordinates(line: &LineString<f64>) -> Vec<[f64; 2]> {
    line.coords().map(|c| [c.x, c.y]).collect()
}

fn polygon_coordinates(polygon: &Polygon<f64>) -> Vec<Vec<[f64; 2]>> {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors().iter())
        .map(line_coordinates)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_feature() -> Feature {
        serde_json::from_value(json!({
            "attributes": {},
            "geometry": {
                "rings": [[[91.0, 23.0], [92.0, 23.0], [92.0, 24.0], [91.0, 24.0], [91.0, 23.0]]]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_rings_convert_to_polygon() {
        let converted = esri_to_standard(&json!({
            "rings": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
        }));
        assert_eq!(converted["type"], "Polygon");
        assert_eq!(converted["coordinates"][0][1], json!([1.0, 0.0]));
    }

    #[test]
    fn test_point_and_paths_convert() {
        let point = esri_to_standard(&json!({"x": 78.5, "y": 17.1}));
        assert_eq!(point, json!({"type": "Point", "coordinates": [78.5, 17.1]}));

        let line = esri_to_standard(&json!({"paths": [[[0.0, 0.0], [1.0, 1.0]]]}));
        assert_eq!(line["type"], "LineString");

        let multi = esri_to_standard(
            &json!({"paths": [[[0.0, 0.0], [1.0, 1.0]], [[2.0, 2.0], [3.0, 3.0]]]}),
        );
        assert_eq!(multi["type"], "MultiLineString");
    }

    #[test]
    fn test_unrecognized_geometry_passes_through() {
        let standard = json!({"type": "Point", "coordinates": [1.0, 2.0]});
        assert_eq!(esri_to_standard(&standard), standard);

        let opaque = json!({"blob": true});
        assert_eq!(esri_to_standard(&opaque), opaque);
    }

    #[test]
    fn test_feature_centroid_of_square() {
        let (lat, lon) = feature_centroid(&square_feature()).unwrap();
        assert!((lat - 23.5).abs() < 1e-9);
        assert!((lon - 91.5).abs() < 1e-9);
    }

    #[test]
    fn test_centroid_unavailable_on_bad_geometry() {
        let feature: Feature = serde_json::from_value(json!({
            "attributes": {},
            "geometry": {"rings": "not coordinates"}
        }))
        .unwrap();
        assert_eq!(feature_centroid(&feature), None);

        let no_geometry = Feature::default();
        assert_eq!(feature_centroid(&no_geometry), None);
    }

    #[test]
    fn test_point_feature_centroid() {
        let feature: Feature = serde_json::from_value(json!({
            "attributes": {},
            "geometry": {"x": 78.5432, "y": 17.1234}
        }))
        .unwrap();
        let (lat, lon) = feature_centroid(&feature).unwrap();
        assert_eq!((lat, lon), (17.1234, 78.5432));
    }

    #[test]
    fn test_haversine_zero_for_identical_points() {
        assert_eq!(haversine_km(12.0, 77.0, 12.0, 77.0), 0.0);
    }

    #[test]
    fn test_haversine_delhi_to_mumbai() {
        // Delhi (28.6139, 77.2090) to Mumbai (19.0760, 72.8777): ~1150 km
        let distance = haversine_km(28.6139, 77.2090, 19.0760, 72.8777);
        assert!((distance - 1150.0).abs() / 1150.0 < 0.05, "distance {distance}");
    }

    #[test]
    fn test_min_distance_km() {
        let base = (10.0, 10.0);
        let points = [(10.1, 10.1), (11.0, 11.0)];
        assert!(min_distance_km(base, &points).unwrap() < 16.0);
        assert_eq!(min_distance_km(base, &[]), None);
    }

    #[test]
    fn test_simplify_returns_standard_polygon() {
        let simplified = simplify_geometry(&square_feature(), DEFAULT_SIMPLIFY_TOLERANCE).unwrap();
        assert_eq!(simplified["type"], "Polygon");
        let ring = simplified["coordinates"][0].as_array().unwrap();
        assert!(ring.len() >= 4);
        assert_eq!(ring.first(), ring.last());
    }

    #[test]
    fn test_simplify_unavailable_without_geometry() {
        assert_eq!(
            simplify_geometry(&Feature::default(), DEFAULT_SIMPLIFY_TOLERANCE),
            None
        );
    }
}
