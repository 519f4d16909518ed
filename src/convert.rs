// convert.rs

use std::fs;
use std::path::Path;

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use kml::types::{
    Coord, Geometry as KmlGeometry, MultiGeometry, Placemark, Polygon as KmlPolygon,
};
use kml::Kml;
use log::debug;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse KML: {0}")]
    Parse(#[from] kml::Error),
}

/// Reads a `.kml` file and converts it into a GeoJSON feature collection.
pub fn load_file(path: &Path) -> Result<FeatureCollection, ConvertError> {
    let text = fs::read_to_string(path).map_err(|source| ConvertError::Read {
        path: path.display().to_string(),
        source,
    })?;
    features_from_str(&text)
}

/// Parses KML text and flattens the document tree (documents, folders,
/// placemarks) into an ordered feature collection. Coordinates stay raw
/// lon/lat degrees; KML carries no other reference system.
pub fn features_from_str(text: &str) -> Result<FeatureCollection, ConvertError> {
    let document: Kml = text.parse()?;
    let mut features = Vec::new();
    collect_features(&document, &mut features);
    debug!("converted KML document into {} features", features.len());
    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

fn collect_features(node: &Kml, features: &mut Vec<Feature>) {
    match node {
        Kml::KmlDocument(document) => {
            for element in &document.elements {
                collect_features(element, features);
            }
        }
        Kml::Document { elements, .. } => {
            for element in elements {
                collect_features(element, features);
            }
        }
        Kml::Folder(folder) => {
            for element in &folder.elements {
                collect_features(element, features);
            }
        }
        Kml::Placemark(placemark) => features.push(placemark_feature(placemark)),
        // Bare geometries outside any placemark still become features.
        Kml::Point(point) => features.push(feature(Some(Value::Point(position(&point.coord))))),
        Kml::LineString(line) => {
            features.push(feature(Some(Value::LineString(positions(&line.coords)))));
        }
        Kml::LinearRing(ring) => {
            features.push(feature(Some(Value::LineString(positions(&ring.coords)))));
        }
        Kml::Polygon(polygon) => {
            features.push(feature(Some(Value::Polygon(polygon_rings(polygon)))));
        }
        Kml::MultiGeometry(multi) => features.push(feature(multi_geometry_value(multi))),
        _ => {}
    }
}

/// A placemark without a geometry still yields a feature, with a null
/// geometry; the aggregator decides how to treat those.
fn placemark_feature(placemark: &Placemark) -> Feature {
    let value = placemark.geometry.as_ref().and_then(geometry_value);
    let mut converted = feature(value);
    converted.properties = placemark_properties(placemark);
    converted
}

fn feature(value: Option<Value>) -> Feature {
    Feature {
        bbox: None,
        geometry: value.map(Geometry::new),
        id: None,
        properties: None,
        foreign_members: None,
    }
}

fn placemark_properties(placemark: &Placemark) -> Option<JsonObject> {
    let mut properties = JsonObject::new();
    if let Some(name) = &placemark.name {
        properties.insert("name".to_string(), serde_json::Value::String(name.clone()));
    }
    if let Some(description) = &placemark.description {
        properties.insert(
            "description".to_string(),
            serde_json::Value::String(description.clone()),
        );
    }
    (!properties.is_empty()).then_some(properties)
}

fn geometry_value(geometry: &KmlGeometry) -> Option<Value> {
    match geometry {
        KmlGeometry::Point(point) => Some(Value::Point(position(&point.coord))),
        KmlGeometry::LineString(line) => Some(Value::LineString(positions(&line.coords))),
        KmlGeometry::LinearRing(ring) => Some(Value::LineString(positions(&ring.coords))),
        KmlGeometry::Polygon(polygon) => Some(Value::Polygon(polygon_rings(polygon))),
        KmlGeometry::MultiGeometry(multi) => multi_geometry_value(multi),
        _ => None,
    }
}

/// Homogeneous members collapse into the matching Multi* kind; mixed members
/// stay a GeometryCollection.
fn multi_geometry_value(multi: &MultiGeometry) -> Option<Value> {
    let members: Vec<Value> = multi.geometries.iter().filter_map(geometry_value).collect();
    if members.is_empty() {
        return None;
    }

    let mut points = Vec::new();
    let mut lines = Vec::new();
    let mut polygons = Vec::new();
    for member in &members {
        match member {
            Value::Point(coords) => points.push(coords.clone()),
            Value::LineString(coords) => lines.push(coords.clone()),
            Value::Polygon(rings) => polygons.push(rings.clone()),
            _ => {}
        }
    }

    let value = if points.len() == members.len() {
        Value::MultiPoint(points)
    } else if lines.len() == members.len() {
        Value::MultiLineString(lines)
    } else if polygons.len() == members.len() {
        Value::MultiPolygon(polygons)
    } else {
        Value::GeometryCollection(members.into_iter().map(Geometry::new).collect())
    };
    Some(value)
}

fn polygon_rings(polygon: &KmlPolygon) -> Vec<Vec<Vec<f64>>> {
    std::iter::once(&polygon.outer)
        .chain(polygon.inner.iter())
        .map(|ring| positions(&ring.coords))
        .collect()
}

fn positions(coords: &[Coord]) -> Vec<Vec<f64>> {
    coords.iter().map(position).collect()
}

fn position(coord: &Coord) -> Vec<f64> {
    match coord.z {
        Some(z) => vec![coord.x, coord.y, z],
        None => vec![coord.x, coord.y],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_PLACEMARKS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <Placemark>
      <name>Depot</name>
      <Point><coordinates>10,20</coordinates></Point>
    </Placemark>
    <Placemark>
      <LineString><coordinates>0,0 3,4</coordinates></LineString>
    </Placemark>
  </Document>
</kml>"#;

    #[test]
    fn placemarks_become_features_in_document_order() {
        let collection = features_from_str(TWO_PLACEMARKS).unwrap();
        assert_eq!(collection.features.len(), 2);

        let first = collection.features[0].geometry.as_ref().unwrap();
        assert_eq!(first.value, Value::Point(vec![10.0, 20.0]));

        let second = collection.features[1].geometry.as_ref().unwrap();
        assert_eq!(
            second.value,
            Value::LineString(vec![vec![0.0, 0.0], vec![3.0, 4.0]])
        );
    }

    #[test]
    fn placemark_name_lands_in_properties() {
        let collection = features_from_str(TWO_PLACEMARKS).unwrap();
        let properties = collection.features[0].properties.as_ref().unwrap();
        assert_eq!(properties["name"], serde_json::json!("Depot"));
        assert!(collection.features[1].properties.is_none());
    }

    #[test]
    fn folders_are_flattened_in_order() {
        let text = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <Folder>
      <Placemark><Point><coordinates>1,1</coordinates></Point></Placemark>
      <Folder>
        <Placemark><Point><coordinates>2,2</coordinates></Point></Placemark>
      </Folder>
    </Folder>
    <Placemark><Point><coordinates>3,3</coordinates></Point></Placemark>
  </Document>
</kml>"#;
        let collection = features_from_str(text).unwrap();
        let xs: Vec<f64> = collection
            .features
            .iter()
            .map(|feature| match &feature.geometry.as_ref().unwrap().value {
                Value::Point(coords) => coords[0],
                other => panic!("unexpected geometry {other:?}"),
            })
            .collect();
        assert_eq!(xs, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn elevation_is_kept_as_a_third_component() {
        let text = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Placemark><Point><coordinates>10,20,300</coordinates></Point></Placemark>
</kml>"#;
        let collection = features_from_str(text).unwrap();
        let geometry = collection.features[0].geometry.as_ref().unwrap();
        assert_eq!(geometry.value, Value::Point(vec![10.0, 20.0, 300.0]));
    }

    #[test]
    fn homogeneous_multi_geometry_collapses_to_multi_line_string() {
        let text = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Placemark>
    <MultiGeometry>
      <LineString><coordinates>0,0 1,0</coordinates></LineString>
      <LineString><coordinates>0,1 1,1</coordinates></LineString>
    </MultiGeometry>
  </Placemark>
</kml>"#;
        let collection = features_from_str(text).unwrap();
        let geometry = collection.features[0].geometry.as_ref().unwrap();
        assert_eq!(
            geometry.value,
            Value::MultiLineString(vec![
                vec![vec![0.0, 0.0], vec![1.0, 0.0]],
                vec![vec![0.0, 1.0], vec![1.0, 1.0]],
            ])
        );
    }

    #[test]
    fn mixed_multi_geometry_stays_a_collection() {
        let text = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Placemark>
    <MultiGeometry>
      <Point><coordinates>0,0</coordinates></Point>
      <LineString><coordinates>0,0 1,0</coordinates></LineString>
    </MultiGeometry>
  </Placemark>
</kml>"#;
        let collection = features_from_str(text).unwrap();
        let geometry = collection.features[0].geometry.as_ref().unwrap();
        assert!(matches!(geometry.value, Value::GeometryCollection(ref members) if members.len() == 2));
    }

    #[test]
    fn placemark_without_geometry_keeps_its_slot() {
        let text = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <Placemark><name>No geometry here</name></Placemark>
    <Placemark><Point><coordinates>5,5</coordinates></Point></Placemark>
  </Document>
</kml>"#;
        let collection = features_from_str(text).unwrap();
        assert_eq!(collection.features.len(), 2);
        assert!(collection.features[0].geometry.is_none());
        assert!(collection.features[1].geometry.is_some());
    }

    #[test]
    fn malformed_xml_is_a_parse_error() {
        let result = features_from_str("<kml><Document><unterminated");
        assert!(matches!(result, Err(ConvertError::Parse(_))));
    }
}
