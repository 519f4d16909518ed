// app.rs

use std::path::PathBuf;

use chrono::{DateTime, Local};
use geojson::FeatureCollection;
use log::{debug, info, warn};

use crate::aggregate::Summary;
use crate::convert::ConvertError;
use crate::map::{self, Viewport};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CurrentScreen {
    Viewer,
    Help,
}

/// One `.kml` file found in the scanned directory.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub name: String,
    pub path: PathBuf,
    pub size_kb: u64,
    pub modified: Option<DateTime<Local>>,
}

/// A successful load: the converted collection together with its derived
/// tables, applied to the view in one step.
#[derive(Debug)]
pub struct LoadedDocument {
    pub collection: FeatureCollection,
    pub summary: Summary,
}

/// Data derived from the currently loaded file plus the two table toggles.
/// The data half is replaced wholesale on every successful load; the toggle
/// half only ever changes through its own transitions and survives reloads.
#[derive(Default)]
pub struct ViewState {
    pub collection: Option<FeatureCollection>,
    pub summary: Option<Summary>,
    pub show_summary: bool,
    pub show_details: bool,
}

impl ViewState {
    pub fn load_succeeded(&mut self, collection: FeatureCollection, summary: Summary) {
        self.collection = Some(collection);
        self.summary = Some(summary);
    }

    pub fn toggle_summary(&mut self) {
        self.show_summary = !self.show_summary;
    }

    pub fn toggle_details(&mut self) {
        self.show_details = !self.show_details;
    }

    pub fn map_visible(&self) -> bool {
        self.collection.is_some()
    }

    pub fn summary_visible(&self) -> bool {
        self.show_summary && self.summary.is_some()
    }

    pub fn details_visible(&self) -> bool {
        self.show_details && self.summary.is_some()
    }
}

pub struct App {
    pub current_screen: CurrentScreen,
    pub kml_files: Vec<FileEntry>,
    pub selected_file_index: usize,
    pub scroll_offset: usize,
    pub view: ViewState,
    pub viewport: Viewport,
    pub loaded_file: Option<String>,
    pub notification: String,
    pub should_quit: bool,
    load_generation: u64,
}

impl App {
    pub fn new(kml_files: Vec<FileEntry>) -> App {
        let notification = if kml_files.is_empty() {
            String::from("No .kml files found. Point the viewer at a directory containing some.")
        } else {
            String::from("Select a KML file and press Enter to load it.")
        };
        App {
            current_screen: CurrentScreen::Viewer,
            kml_files,
            selected_file_index: 0,
            scroll_offset: 0,
            view: ViewState::default(),
            viewport: Viewport::default(),
            loaded_file: None,
            notification,
            should_quit: false,
            load_generation: 0,
        }
    }

    pub fn selected_entry(&self) -> Option<&FileEntry> {
        self.kml_files.get(self.selected_file_index)
    }

    pub fn select_next(&mut self) {
        if self.selected_file_index + 1 < self.kml_files.len() {
            self.selected_file_index += 1;
        }
    }

    pub fn select_previous(&mut self) {
        if self.selected_file_index > 0 {
            self.selected_file_index -= 1;
        }
    }

    /// Keeps the list cursor inside the visible window; called at render
    /// time once the panel height is known.
    pub fn clamp_scroll(&mut self, visible: usize) {
        if visible == 0 {
            return;
        }
        if self.selected_file_index >= self.scroll_offset + visible {
            self.scroll_offset = self.selected_file_index - visible + 1;
        }
        if self.selected_file_index < self.scroll_offset {
            self.scroll_offset = self.selected_file_index;
        }
        if self.kml_files.len() <= visible {
            self.scroll_offset = 0;
        }
    }

    /// Registers a new load request and supersedes any in-flight one. The
    /// returned generation must accompany the completion event; stale
    /// completions are discarded in `apply_load`.
    pub fn request_load(&mut self) -> Option<(u64, PathBuf)> {
        let entry = self.selected_entry()?;
        let (name, path) = (entry.name.clone(), entry.path.clone());
        self.load_generation += 1;
        self.notification = format!("Loading {name}...");
        info!("load #{} requested for {name}", self.load_generation);
        Some((self.load_generation, path))
    }

    /// Applies a load completion. A success replaces the collection and both
    /// tables atomically and refits the viewport; the visibility toggles are
    /// left alone. A failure keeps the previous view state intact and only
    /// surfaces the message.
    pub fn apply_load(
        &mut self,
        generation: u64,
        name: String,
        result: Result<LoadedDocument, ConvertError>,
    ) {
        if generation != self.load_generation {
            debug!("discarding superseded load #{generation} ({name})");
            return;
        }
        match result {
            Ok(document) => {
                let feature_count = document.collection.features.len();
                let skipped = document.summary.skipped;
                self.viewport = map::bounds(&document.collection)
                    .map(Viewport::fit)
                    .unwrap_or_default();
                self.view
                    .load_succeeded(document.collection, document.summary);
                self.notification = if skipped > 0 {
                    format!("Loaded {feature_count} features from {name} ({skipped} malformed skipped)")
                } else {
                    format!("Loaded {feature_count} features from {name}")
                };
                self.loaded_file = Some(name);
            }
            Err(error) => {
                warn!("load of {name} failed: {error}");
                self.notification = format!("Could not load {name}: {error}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate;
    use geojson::{Feature, Geometry, Value};

    fn collection(values: Vec<Value>) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: values
                .into_iter()
                .map(|value| Feature {
                    bbox: None,
                    geometry: Some(Geometry::new(value)),
                    id: None,
                    properties: None,
                    foreign_members: None,
                })
                .collect(),
            foreign_members: None,
        }
    }

    fn entry(name: &str) -> FileEntry {
        FileEntry {
            name: name.to_string(),
            path: PathBuf::from(name),
            size_kb: 1,
            modified: None,
        }
    }

    fn loaded(values: Vec<Value>) -> LoadedDocument {
        let collection = collection(values);
        let summary = aggregate::summarize(&collection);
        LoadedDocument {
            collection,
            summary,
        }
    }

    #[test]
    fn toggles_are_independent_of_each_other_and_of_data() {
        let mut view = ViewState::default();
        view.toggle_summary();
        assert!(view.show_summary);
        assert!(!view.show_details);
        assert!(view.collection.is_none());

        view.toggle_details();
        assert!(view.show_summary);
        assert!(view.show_details);

        view.toggle_summary();
        assert!(!view.show_summary);
        assert!(view.show_details);
    }

    #[test]
    fn tables_render_only_with_flag_and_data() {
        let mut view = ViewState::default();
        view.toggle_summary();
        assert!(!view.summary_visible(), "no data yet");

        let document = loaded(vec![Value::Point(vec![0.0, 0.0])]);
        view.load_succeeded(document.collection, document.summary);
        assert!(view.summary_visible());
        assert!(!view.details_visible(), "details flag is still off");
        assert!(view.map_visible());
    }

    #[test]
    fn reload_replaces_data_but_keeps_toggles() {
        let mut app = App::new(vec![entry("a.kml"), entry("b.kml")]);
        app.view.toggle_summary();
        app.view.toggle_details();

        let (generation, _) = app.request_load().unwrap();
        app.apply_load(
            generation,
            "a.kml".to_string(),
            Ok(loaded(vec![
                Value::Point(vec![0.0, 0.0]),
                Value::Point(vec![1.0, 1.0]),
            ])),
        );
        assert_eq!(app.view.summary.as_ref().unwrap().counts["Point"], 2);

        app.select_next();
        let (generation, _) = app.request_load().unwrap();
        app.apply_load(
            generation,
            "b.kml".to_string(),
            Ok(loaded(vec![Value::LineString(vec![
                vec![0.0, 0.0],
                vec![3.0, 4.0],
            ])])),
        );

        let summary = app.view.summary.as_ref().unwrap();
        assert!(!summary.counts.contains_key("Point"), "no residue of file A");
        assert_eq!(summary.counts["LineString"], 1);
        assert!(app.view.show_summary && app.view.show_details);
        assert_eq!(app.loaded_file.as_deref(), Some("b.kml"));
    }

    #[test]
    fn failed_load_keeps_previous_state() {
        let mut app = App::new(vec![entry("a.kml")]);
        let (generation, _) = app.request_load().unwrap();
        app.apply_load(
            generation,
            "a.kml".to_string(),
            Ok(loaded(vec![Value::Point(vec![0.0, 0.0])])),
        );

        let (generation, _) = app.request_load().unwrap();
        let failure = crate::convert::features_from_str("<kml><broken").unwrap_err();
        app.apply_load(generation, "a.kml".to_string(), Err(failure));

        assert!(app.view.collection.is_some());
        assert_eq!(app.view.summary.as_ref().unwrap().counts["Point"], 1);
        assert!(app.notification.starts_with("Could not load"));
    }

    #[test]
    fn superseded_load_is_discarded() {
        let mut app = App::new(vec![entry("a.kml"), entry("b.kml")]);
        let (first, _) = app.request_load().unwrap();
        app.select_next();
        let (second, _) = app.request_load().unwrap();
        assert!(second > first);

        // The older request resolves last; its result must not be applied.
        app.apply_load(
            second,
            "b.kml".to_string(),
            Ok(loaded(vec![Value::Point(vec![2.0, 2.0])])),
        );
        app.apply_load(
            first,
            "a.kml".to_string(),
            Ok(loaded(vec![
                Value::Point(vec![1.0, 1.0]),
                Value::Point(vec![3.0, 3.0]),
            ])),
        );

        assert_eq!(app.view.summary.as_ref().unwrap().counts["Point"], 1);
        assert_eq!(app.loaded_file.as_deref(), Some("b.kml"));
    }

    #[test]
    fn request_load_returns_the_selected_path_and_says_so() {
        let mut app = App::new(vec![entry("a.kml"), entry("b.kml")]);
        app.select_next();

        let (generation, path) = app.request_load().unwrap();
        assert_eq!(generation, 1);
        assert_eq!(path, PathBuf::from("b.kml"));
        assert_eq!(app.notification, "Loading b.kml...");

        let (next_generation, _) = app.request_load().unwrap();
        assert_eq!(next_generation, 2);
    }

    #[test]
    fn list_cursor_stays_within_bounds() {
        let mut app = App::new(vec![entry("a.kml"), entry("b.kml")]);
        app.select_previous();
        assert_eq!(app.selected_file_index, 0);
        app.select_next();
        app.select_next();
        app.select_next();
        assert_eq!(app.selected_file_index, 1);
    }
}
