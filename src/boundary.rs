//! Administrative boundaries from Overpass responses.
//!
//! An Overpass `out geom;` answer lists relations whose member ways carry
//! their own node coordinates. Outer and inner ways are stitched into closed
//! rings by matching endpoints, then inner rings are attached to the outer
//! ring that contains them.

use crate::error::{InsightsError, Result};
use crate::{Bounds, Crs, Extent};
use geo::{BoundingRect, Contains, Coord, LineString, MultiPolygon, Point, Polygon};
use log::{debug, warn};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Overpass QL for an Italian comune (admin level 8) with member geometry.
pub fn boundary_query(place: &str) -> String {
    let escaped = place.replace('\\', "\\\\").replace('"', "\\\"");
    format!(
        r#"[out:json];
area[name="{}"][admin_level=8][boundary=administrative]->.target;
area["name"="Italia"][boundary=administrative]->.wrap;
rel(pivot.target)(area.wrap);

out geom;"#,
        escaped
    )
}

// Overpass wire format, only the parts we read

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<Element>,
}

#[derive(Debug, Deserialize)]
struct Element {
    #[serde(rename = "type")]
    kind: String,
    id: i64,
    #[serde(default)]
    tags: BTreeMap<String, String>,
    #[serde(default)]
    members: Vec<Member>,
}

#[derive(Debug, Deserialize)]
struct Member {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    role: String,
    /// Nodes outside the query area come back as null
    #[serde(default)]
    geometry: Vec<Option<LatLon>>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct LatLon {
    lat: f64,
    lon: f64,
}

/// One boundary relation.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryFeature {
    pub osm_id: i64,
    pub tags: BTreeMap<String, String>,
    pub geometry: MultiPolygon<f64>,
}

impl BoundaryFeature {
    pub fn name(&self) -> Option<&str> {
        self.tags.get("name").map(String::as_str)
    }
}

/// Boundary polygons of a place. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryTable {
    features: Vec<BoundaryFeature>,
    crs: Crs,
}

impl BoundaryTable {
    /// Fails with [`InsightsError::BoundaryNotFound`] when `features` is empty.
    pub fn from_features(place: &str, features: Vec<BoundaryFeature>) -> Result<Self> {
        if features.is_empty() {
            return Err(InsightsError::BoundaryNotFound {
                place: place.to_string(),
            });
        }
        Ok(Self {
            features,
            crs: Crs::WGS84,
        })
    }

    pub fn features(&self) -> &[BoundaryFeature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn crs(&self) -> Crs {
        self.crs
    }

    /// Bounding box of every polygon in the table.
    pub fn bounds(&self) -> Option<Bounds> {
        self.features
            .iter()
            .filter_map(|f| f.geometry.bounding_rect())
            .map(|r| Bounds {
                min_lat: r.min().y,
                max_lat: r.max().y,
                min_lng: r.min().x,
                max_lng: r.max().x,
            })
            .reduce(|a, b| a.union(&b))
    }

    /// Bounds projected to Web Mercator, for plot extents.
    pub fn extent_web_mercator(&self) -> Option<Extent> {
        self.bounds().map(|b| b.to_web_mercator_extent())
    }

    /// Tags become properties, the OSM id becomes the feature id.
    pub fn to_geojson(&self) -> geojson::FeatureCollection {
        let features = self
            .features
            .iter()
            .map(|f| {
                let properties: geojson::JsonObject = f
                    .tags
                    .iter()
                    .map(|(k, v)| (k.clone(), geojson::JsonValue::String(v.clone())))
                    .collect();
                geojson::Feature {
                    bbox: None,
                    geometry: Some(geojson::Geometry::new(geojson::Value::from(&f.geometry))),
                    id: Some(geojson::feature::Id::Number(f.osm_id.into())),
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        geojson::FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}

/// Parse an Overpass JSON body into a boundary table for `place`.
pub fn parse_overpass_response(place: &str, body: &[u8]) -> Result<BoundaryTable> {
    let response: OverpassResponse =
        serde_json::from_slice(body).map_err(|e| InsightsError::InvalidResponse(e.to_string()))?;

    let features: Vec<BoundaryFeature> = response
        .elements
        .into_iter()
        .filter(|e| e.kind == "relation")
        .filter_map(|e| {
            let geometry = relation_geometry(&e.members);
            if geometry.0.is_empty() {
                warn!("[Overpass] Relation {} has no closed outer ring, skipped", e.id);
                return None;
            }
            Some(BoundaryFeature {
                osm_id: e.id,
                tags: e.tags,
                geometry,
            })
        })
        .collect();

    debug!("[Overpass] {} boundary features for {}", features.len(), place);
    BoundaryTable::from_features(place, features)
}

fn way_coords(member: &Member) -> Vec<Coord<f64>> {
    member
        .geometry
        .iter()
        .flatten()
        .map(|p| Coord { x: p.lon, y: p.lat })
        .collect()
}

fn relation_geometry(members: &[Member]) -> MultiPolygon<f64> {
    let ways_with_role = |role: &str| -> Vec<Vec<Coord<f64>>> {
        members
            .iter()
            .filter(|m| m.kind == "way" && m.role == role)
            .map(way_coords)
            .filter(|c| c.len() >= 2)
            .collect()
    };

    // Untagged members are treated as outer
    let mut outer_ways = ways_with_role("outer");
    outer_ways.extend(ways_with_role(""));

    let mut polygons: Vec<Polygon<f64>> = assemble_rings(outer_ways)
        .into_iter()
        .map(|ring| Polygon::new(ring, vec![]))
        .collect();

    for inner in assemble_rings(ways_with_role("inner")) {
        let Some(first) = inner.0.first().copied() else {
            continue;
        };
        match polygons
            .iter_mut()
            .find(|p| p.contains(&Point::from(first)))
        {
            Some(polygon) => polygon.interiors_push(inner),
            None => debug!("[Overpass] Inner ring outside every outer ring, dropped"),
        }
    }

    MultiPolygon::new(polygons)
}

/// Join ways sharing endpoints into closed rings.
///
/// Ways are reversed when needed. A chain that cannot be closed is closed
/// directly if it has at least three distinct points.
fn assemble_rings(mut ways: Vec<Vec<Coord<f64>>>) -> Vec<LineString<f64>> {
    let mut rings = Vec::new();

    while let Some(mut ring) = ways.pop() {
        while ring.first() != ring.last() {
            let Some(tail) = ring.last().copied() else {
                break;
            };
            let next = ways
                .iter()
                .position(|w| w.first() == Some(&tail) || w.last() == Some(&tail));
            let Some(index) = next else {
                break;
            };

            let mut way = ways.swap_remove(index);
            if way.first() != Some(&tail) {
                way.reverse();
            }
            ring.extend(way.into_iter().skip(1));
        }

        if ring.first() != ring.last() {
            if let Some(&head) = ring.first() {
                ring.push(head);
            }
        }
        if ring.len() >= 4 {
            rings.push(LineString::new(ring));
        }
    }

    rings
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use geo::Area;

    /// A square relation split into two outer ways with a square hole.
    pub(crate) const SQUARE_RELATION: &str = r#"{
        "version": 0.6,
        "elements": [
            {
                "type": "relation",
                "id": 41485,
                "members": [
                    {"type": "way", "ref": 1, "role": "outer", "geometry": [
                        {"lat": 41.8, "lon": 12.4},
                        {"lat": 41.8, "lon": 12.6},
                        {"lat": 42.0, "lon": 12.6}
                    ]},
                    {"type": "way", "ref": 2, "role": "outer", "geometry": [
                        {"lat": 41.8, "lon": 12.4},
                        {"lat": 42.0, "lon": 12.4},
                        {"lat": 42.0, "lon": 12.6}
                    ]},
                    {"type": "way", "ref": 3, "role": "inner", "geometry": [
                        {"lat": 41.85, "lon": 12.45}, {"lat": 41.85, "lon": 12.5},
                        {"lat": 41.9, "lon": 12.5}, {"lat": 41.85, "lon": 12.45}
                    ]},
                    {"type": "node", "ref": 9, "role": "admin_centre", "lat": 41.89, "lon": 12.48}
                ],
                "tags": {"name": "Roma", "admin_level": "8", "boundary": "administrative"}
            }
        ]
    }"#;

    #[test]
    fn test_query_template() {
        let q = boundary_query("Roma");
        assert!(q.starts_with("[out:json];"));
        assert!(q.contains(
            r#"area[name="Roma"][admin_level=8][boundary=administrative]->.target;"#
        ));
        assert!(q.contains(r#"area["name"="Italia"][boundary=administrative]->.wrap;"#));
        assert!(q.contains("rel(pivot.target)(area.wrap);"));
        assert!(q.trim_end().ends_with("out geom;"));
    }

    #[test]
    fn test_query_escapes_quotes() {
        let q = boundary_query(r#"Sant"Angelo"#);
        assert!(q.contains(r#"area[name="Sant\"Angelo"]"#));
    }

    #[test]
    fn test_parse_relation_with_hole() {
        let table = parse_overpass_response("Roma", SQUARE_RELATION.as_bytes()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.crs(), Crs::WGS84);

        let feature = &table.features()[0];
        assert_eq!(feature.osm_id, 41485);
        assert_eq!(feature.name(), Some("Roma"));
        assert_eq!(feature.geometry.0.len(), 1);

        let polygon = &feature.geometry.0[0];
        assert_eq!(polygon.exterior().0.len(), 5);
        assert_eq!(polygon.interiors().len(), 1);
        // 0.2 x 0.2 square minus a 0.05 x 0.05 right triangle
        assert!((polygon.unsigned_area() - (0.04 - 0.00125)).abs() < 1e-9);
    }

    #[test]
    fn test_bounds_and_extent() {
        let table = parse_overpass_response("Roma", SQUARE_RELATION.as_bytes()).unwrap();
        let b = table.bounds().unwrap();
        assert_eq!(b.min_lat, 41.8);
        assert_eq!(b.max_lng, 12.6);
        let e = table.extent_web_mercator().unwrap();
        assert!(e.width() > 0.0 && e.height() > 0.0);
        assert_eq!(b.max_lat, 42.0);
    }

    #[test]
    fn test_empty_result_is_not_found() {
        let err = parse_overpass_response("Atlantide", br#"{"elements": []}"#).unwrap_err();
        assert!(err.is_connection_error());
        assert_eq!(
            err.to_string(),
            "No boundaries were found for Atlantide. Try with another city or check your Overpass query limit."
        );
    }

    #[test]
    fn test_invalid_body() {
        let err = parse_overpass_response("Roma", b"<html>rate limited</html>").unwrap_err();
        assert!(matches!(err, InsightsError::InvalidResponse(_)));
    }

    #[test]
    fn test_null_nodes_and_open_chain() {
        let body = r#"{"elements": [{"type": "relation", "id": 7, "members": [
            {"type": "way", "role": "outer", "geometry": [
                {"lat": 0.0, "lon": 0.0}, null, {"lat": 0.0, "lon": 1.0}, {"lat": 1.0, "lon": 1.0}
            ]}
        ]}]}"#;
        let table = parse_overpass_response("Test", body.as_bytes()).unwrap();
        let ring = table.features()[0].geometry.0[0].exterior();
        assert_eq!(ring.0.len(), 4);
        assert_eq!(ring.0.first(), ring.0.last());
    }

    #[test]
    fn test_geojson_export() {
        let table = parse_overpass_response("Roma", SQUARE_RELATION.as_bytes()).unwrap();
        let fc = table.to_geojson();
        assert_eq!(fc.features.len(), 1);
        let feature = &fc.features[0];
        assert_eq!(feature.property("name").and_then(|v| v.as_str()), Some("Roma"));
        let text = serde_json::to_string(&fc).unwrap();
        assert!(text.contains("MultiPolygon"));
    }
}
