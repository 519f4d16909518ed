// aggregate.rs

use std::collections::BTreeMap;

use geojson::{FeatureCollection, Value};
use serde::Serialize;

/// Derived tables for one loaded feature collection.
///
/// `counts` maps every geometry kind present in the collection to the number
/// of features of that kind. `lengths` maps the line-bearing kinds to their
/// accumulated planar length. Both are `BTreeMap` so the same input always
/// serializes to the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub counts: BTreeMap<String, usize>,
    pub lengths: BTreeMap<String, f64>,
    /// Features dropped because their geometry was missing or malformed.
    pub skipped: usize,
}

/// Geometry whose coordinate payload cannot be walked (a position with fewer
/// than two components). The owning feature is skipped, not the whole pass.
struct MalformedGeometry;

/// Builds count and length tables from a feature collection, in one pass and
/// in collection order. Pure; the caller owns what to do with the result.
pub fn summarize(collection: &FeatureCollection) -> Summary {
    let mut summary = Summary::default();

    for feature in &collection.features {
        let Some(geometry) = &feature.geometry else {
            summary.skipped += 1;
            continue;
        };

        if check_positions(&geometry.value).is_err() {
            summary.skipped += 1;
            continue;
        }

        let kind = geometry.value.type_name();
        *summary.counts.entry(kind.to_string()).or_insert(0) += 1;
        if let Some(length) = length_contribution(&geometry.value) {
            *summary.lengths.entry(kind.to_string()).or_insert(0.0) += length;
        }
    }

    summary
}

/// Checks every position of every kind; a single short position marks the
/// whole geometry malformed.
fn check_positions(value: &Value) -> Result<(), MalformedGeometry> {
    match value {
        Value::Point(coords) => check_position(coords),
        Value::MultiPoint(coords) | Value::LineString(coords) => {
            coords.iter().try_for_each(|c| check_position(c))
        }
        Value::MultiLineString(lines) | Value::Polygon(lines) => {
            lines.iter().flatten().try_for_each(|c| check_position(c))
        }
        Value::MultiPolygon(polygons) => polygons
            .iter()
            .flatten()
            .flatten()
            .try_for_each(|c| check_position(c)),
        Value::GeometryCollection(members) => members
            .iter()
            .try_for_each(|member| check_positions(&member.value)),
    }
}

fn check_position(position: &[f64]) -> Result<(), MalformedGeometry> {
    if position.len() < 2 {
        Err(MalformedGeometry)
    } else {
        Ok(())
    }
}

/// Per-kind decision on whether and how a geometry contributes to the length
/// table. Only the two line kinds are measured; a `MultiLineString` measures
/// each member line on its own, so the gap between two member lines is never
/// counted as a segment. Every other kind counts but has no length.
fn length_contribution(value: &Value) -> Option<f64> {
    match value {
        Value::LineString(coords) => Some(path_length(coords)),
        Value::MultiLineString(lines) => Some(lines.iter().map(|line| path_length(line)).sum()),
        _ => None,
    }
}

/// Planar Euclidean length of a coordinate path over raw lon/lat degrees,
/// assuming positions already checked. Elevation (any third component) is
/// ignored; fewer than two coordinates is a zero-length path. The value has
/// no physical unit, it is a comparative magnitude only.
fn path_length(coords: &[Vec<f64>]) -> f64 {
    let mut total = 0.0;
    for pair in coords.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        total += ((b[0] - a[0]).powi(2) + (b[1] - a[1]).powi(2)).sqrt();
    }
    total
}
