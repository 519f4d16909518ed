// map.rs

use geojson::{FeatureCollection, Value};
use ratatui::style::Color;
use ratatui::widgets::canvas::{Context, Line, Points};

const PAN_STEP: f64 = 0.1;
const ZOOM_FACTOR: f64 = 1.5;
const MIN_SPAN: f64 = 0.001;
const MAX_SPAN: f64 = 360.0;
const FIT_PADDING: f64 = 0.1;

/// Visible window onto the lon/lat plane. The latitude span is always half
/// the longitude span, which keeps the 360x180 world proportionate in
/// terminal cells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center: (f64, f64),
    pub span: f64,
}

impl Default for Viewport {
    /// Whole-world view, nudged north like the original viewer's start
    /// position.
    fn default() -> Self {
        Viewport {
            center: (0.0, 20.0),
            span: MAX_SPAN,
        }
    }
}

impl Viewport {
    /// Frames a bounding box with padding on all sides. Degenerate boxes
    /// (single point, vertical line) get a minimum span instead of a
    /// zero-size window.
    pub fn fit(bbox: [f64; 4]) -> Viewport {
        let [min_lon, min_lat, max_lon, max_lat] = bbox;
        let lon_range = (max_lon - min_lon).max(MIN_SPAN);
        let lat_range = (max_lat - min_lat).max(MIN_SPAN / 2.0);
        let span = (lon_range.max(lat_range * 2.0) * (1.0 + 2.0 * FIT_PADDING)).min(MAX_SPAN);
        Viewport {
            center: ((min_lon + max_lon) / 2.0, (min_lat + max_lat) / 2.0),
            span,
        }
    }

    /// Moves the window by a fraction of its own size; `dx`/`dy` are usually
    /// -1, 0 or 1 per keypress.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        self.center.0 = (self.center.0 + dx * self.span * PAN_STEP).clamp(-180.0, 180.0);
        self.center.1 = (self.center.1 + dy * self.span / 2.0 * PAN_STEP).clamp(-90.0, 90.0);
    }

    pub fn zoom_in(&mut self) {
        self.span = (self.span / ZOOM_FACTOR).max(MIN_SPAN);
    }

    pub fn zoom_out(&mut self) {
        self.span = (self.span * ZOOM_FACTOR).min(MAX_SPAN);
    }

    pub fn x_bounds(&self) -> [f64; 2] {
        [self.center.0 - self.span / 2.0, self.center.0 + self.span / 2.0]
    }

    pub fn y_bounds(&self) -> [f64; 2] {
        [self.center.1 - self.span / 4.0, self.center.1 + self.span / 4.0]
    }
}

/// Bounding box of every position in the collection as
/// `[min_lon, min_lat, max_lon, max_lat]`, or `None` when there is nothing
/// to frame. Positions with fewer than two components are ignored here; the
/// aggregator reports them.
pub fn bounds(collection: &FeatureCollection) -> Option<[f64; 4]> {
    let mut bbox: Option<[f64; 4]> = None;
    for feature in &collection.features {
        if let Some(geometry) = &feature.geometry {
            for_each_position(&geometry.value, &mut |position| {
                if position.len() < 2 {
                    return;
                }
                let (lon, lat) = (position[0], position[1]);
                let entry = bbox.get_or_insert([lon, lat, lon, lat]);
                entry[0] = entry[0].min(lon);
                entry[1] = entry[1].min(lat);
                entry[2] = entry[2].max(lon);
                entry[3] = entry[3].max(lat);
            });
        }
    }
    bbox
}

fn for_each_position(value: &Value, visit: &mut impl FnMut(&[f64])) {
    match value {
        Value::Point(coords) => visit(coords),
        Value::MultiPoint(coords) | Value::LineString(coords) => {
            coords.iter().for_each(|c| visit(c));
        }
        Value::MultiLineString(lines) | Value::Polygon(lines) => {
            lines.iter().flatten().for_each(|c| visit(c));
        }
        Value::MultiPolygon(polygons) => {
            polygons.iter().flatten().flatten().for_each(|c| visit(c));
        }
        Value::GeometryCollection(members) => {
            for member in members {
                for_each_position(&member.value, visit);
            }
        }
    }
}

/// Draws the feature overlay onto the canvas: points as dots, line strings
/// as segment chains, polygons as ring outlines.
pub fn draw_features(ctx: &mut Context, collection: &FeatureCollection, color: Color) {
    for feature in &collection.features {
        if let Some(geometry) = &feature.geometry {
            draw_value(ctx, &geometry.value, color);
        }
    }
}

fn draw_value(ctx: &mut Context, value: &Value, color: Color) {
    match value {
        Value::Point(coords) => draw_points(ctx, std::slice::from_ref(coords), color),
        Value::MultiPoint(coords) => draw_points(ctx, coords, color),
        Value::LineString(coords) => draw_path(ctx, coords, color),
        Value::MultiLineString(lines) => {
            for line in lines {
                draw_path(ctx, line, color);
            }
        }
        Value::Polygon(rings) => {
            for ring in rings {
                draw_path(ctx, ring, color);
            }
        }
        Value::MultiPolygon(polygons) => {
            for polygon in polygons {
                for ring in polygon {
                    draw_path(ctx, ring, color);
                }
            }
        }
        Value::GeometryCollection(members) => {
            for member in members {
                draw_value(ctx, &member.value, color);
            }
        }
    }
}

fn draw_points(ctx: &mut Context, coords: &[Vec<f64>], color: Color) {
    let dots: Vec<(f64, f64)> = coords
        .iter()
        .filter(|c| c.len() >= 2)
        .map(|c| (c[0], c[1]))
        .collect();
    ctx.draw(&Points {
        coords: &dots,
        color,
    });
}

fn draw_path(ctx: &mut Context, coords: &[Vec<f64>], color: Color) {
    for pair in coords.windows(2) {
        if pair[0].len() < 2 || pair[1].len() < 2 {
            continue;
        }
        ctx.draw(&Line {
            x1: pair[0][0],
            y1: pair[0][1],
            x2: pair[1][0],
            y2: pair[1][1],
            color,
        });
    }
}
