// ui.rs

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{
        Block, Borders, Paragraph, Wrap,
        canvas::{Canvas, Map as WorldMap, MapResolution},
    },
};

use crate::app::{App, CurrentScreen};
use crate::map;

pub fn render(frame: &mut Frame, app: &mut App) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)]) // Main content, then footer
        .split(frame.size());

    match app.current_screen {
        CurrentScreen::Viewer => render_viewer(frame, app, main_layout[0]),
        CurrentScreen::Help => render_help_screen(frame, main_layout[0]),
    }

    render_footer(frame, app, main_layout[1]);
}

fn render_viewer(frame: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title
            Constraint::Length(1), // Notification
            Constraint::Min(0),    // Main content area
        ])
        .split(area);

    let title = Paragraph::new(" KML File Viewer ")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Cyan).bold());
    frame.render_widget(title, chunks[0]);

    let notification = Paragraph::new(app.notification.clone())
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::White).bg(Color::DarkGray));
    frame.render_widget(notification, chunks[1]);

    let content_layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(chunks[2]);

    render_file_list(frame, app, content_layout[0]);
    render_map_and_tables(frame, app, content_layout[1]);
}

fn render_file_list(frame: &mut Frame, app: &mut App, area: Rect) {
    let panel = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(4)])
        .split(area);

    let list_block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" KML files ({}) ", app.kml_files.len()))
        .border_style(Style::default().fg(Color::LightGreen));
    let inner_height = list_block.inner(panel[0]).height as usize;
    app.clamp_scroll(inner_height);

    let end_display_index = (app.scroll_offset + inner_height).min(app.kml_files.len());
    let mut list_items: Vec<Line> = Vec::new();
    for i in app.scroll_offset..end_display_index {
        let entry = &app.kml_files[i];
        let loaded_indicator = if app.loaded_file.as_deref() == Some(entry.name.as_str()) {
            "[x]"
        } else {
            "[ ]"
        };
        let display_text = format!("{} {}. {}", loaded_indicator, i + 1, entry.name);
        let mut style = Style::default().fg(Color::White);
        if i == app.selected_file_index {
            style = style.bg(Color::DarkGray).add_modifier(Modifier::BOLD);
        }
        list_items.push(Line::from(vec![Span::styled(display_text, style)]));
    }

    let file_list = Paragraph::new(list_items)
        .block(list_block)
        .wrap(Wrap { trim: false });
    frame.render_widget(file_list, panel[0]);

    // Size/modified line for the highlighted file.
    let mut info_lines: Vec<Line> = Vec::new();
    if let Some(entry) = app.selected_entry() {
        info_lines.push(Line::from(format!("Size: {} KB", entry.size_kb)));
        let modified = entry
            .modified
            .map(|time| time.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| String::from("N/A"));
        info_lines.push(Line::from(format!("Modified: {modified}")));
    } else {
        info_lines.push(Line::from("No file selected.").fg(Color::Gray));
    }
    let info = Paragraph::new(info_lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" File Information ")
            .border_style(Style::default().fg(Color::LightBlue)),
    );
    frame.render_widget(info, panel[1]);
}

fn render_map_and_tables(frame: &mut Frame, app: &mut App, area: Rect) {
    // The map takes whatever the visible tables leave over; each table is
    // shown only when its toggle is on and its data exists.
    let summary_rows = app
        .view
        .summary
        .as_ref()
        .map(|summary| summary.counts.len() + usize::from(summary.skipped > 0))
        .unwrap_or(0);
    let details_rows = app
        .view
        .summary
        .as_ref()
        .map(|summary| summary.lengths.len())
        .unwrap_or(0);

    let mut constraints = vec![Constraint::Min(0)];
    if app.view.summary_visible() {
        constraints.push(Constraint::Length(summary_rows.max(1) as u16 + 3));
    }
    if app.view.details_visible() {
        constraints.push(Constraint::Length(details_rows.max(1) as u16 + 3));
    }

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);
    let mut chunk_idx = 0;

    if app.view.map_visible() {
        render_map(frame, app, chunks[chunk_idx]);
    } else {
        let hint = Paragraph::new(
            "\nNo file loaded yet.\n\n\
            Navigate the list with J/K or the arrow keys\n\
            and press Enter to load the highlighted KML file.",
        )
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Map ")
                .border_style(Style::default().fg(Color::DarkGray)),
        );
        frame.render_widget(hint, chunks[chunk_idx]);
    }
    chunk_idx += 1;

    if app.view.summary_visible() {
        render_summary_table(frame, app, chunks[chunk_idx]);
        chunk_idx += 1;
    }
    if app.view.details_visible() {
        render_details_table(frame, app, chunks[chunk_idx]);
    }
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let title = match &app.loaded_file {
        Some(name) => format!(" Map — {name} "),
        None => String::from(" Map "),
    };
    let canvas = Canvas::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(Style::default().fg(Color::Magenta)),
        )
        .x_bounds(app.viewport.x_bounds())
        .y_bounds(app.viewport.y_bounds())
        .paint(|ctx| {
            // Coastline basemap under the feature overlay.
            ctx.draw(&WorldMap {
                resolution: MapResolution::High,
                color: Color::Gray,
            });
            if let Some(collection) = &app.view.collection {
                map::draw_features(ctx, collection, Color::Yellow);
            }
        });
    frame.render_widget(canvas, area);
}

fn render_summary_table(frame: &mut Frame, app: &App, area: Rect) {
    let mut rows: Vec<Line> = vec![Line::from(Span::styled(
        format!("{:<24} {:>8}", "Element Type", "Count"),
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    if let Some(summary) = &app.view.summary {
        for (kind, count) in &summary.counts {
            rows.push(Line::from(format!("{kind:<24} {count:>8}")));
        }
        if summary.skipped > 0 {
            rows.push(Line::from(
                Span::from(format!("{:<24} {:>8}", "(malformed, skipped)", summary.skipped))
                    .fg(Color::Red),
            ));
        }
    }
    let table = Paragraph::new(rows).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Summary ")
            .border_style(Style::default().fg(Color::LightYellow)),
    );
    frame.render_widget(table, area);
}

fn render_details_table(frame: &mut Frame, app: &App, area: Rect) {
    let mut rows: Vec<Line> = vec![Line::from(Span::styled(
        format!("{:<24} {:>14}", "Element Type", "Total Length"),
        Style::default().add_modifier(Modifier::BOLD),
    ))];
    if let Some(summary) = &app.view.summary {
        if summary.lengths.is_empty() {
            rows.push(Line::from("No line features in this file.").fg(Color::Gray));
        }
        for (kind, length) in &summary.lengths {
            rows.push(Line::from(details_row(kind, *length)));
        }
    }
    let table = Paragraph::new(rows).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Detailed View ")
            .border_style(Style::default().fg(Color::LightCyan)),
    );
    frame.render_widget(table, area);
}

/// One details-table row, right-aligned under the same 14-column header the
/// "Total Length" label uses.
fn details_row(kind: &str, length: f64) -> String {
    format!("{kind:<24} {:>14}", format!("{length:.2} units"))
}

/// Renders the help screen.
fn render_help_screen(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .title(" Help Screen ")
        .title_style(Style::default().fg(Color::Yellow).bold())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));

    let help_text = Paragraph::new(
        "Keybinds:\n\
          J/K or ↑/↓: Navigate file list\n\
          Enter: Load the highlighted KML file\n\
          S: Toggle the Summary table (feature counts)\n\
          D: Toggle the Detailed View table (line lengths)\n\
          H/L or ←/→: Pan the map west/east\n\
          U/N: Pan the map north/south\n\
          + / -: Zoom the map in/out\n\
          F: Fit the map to the loaded features\n\
          ?: Toggle this Help screen\n\
          Q: Quit the application\n\n\
          Lengths are planar Euclidean over raw lon/lat degrees —\n\
          comparative magnitudes, not physical distances.",
    )
    .block(block)
    .wrap(Wrap { trim: false })
    .style(Style::default().fg(Color::LightGreen));

    frame.render_widget(help_text, area);
}

/// Renders a common footer area.
fn render_footer(frame: &mut Frame, app: &mut App, area: Rect) {
    let current_screen_name = match app.current_screen {
        CurrentScreen::Viewer => "Viewer",
        CurrentScreen::Help => "Help",
    };

    let footer_text = Line::from(vec![
        Span::raw("Screen: "),
        Span::styled(
            current_screen_name,
            Style::default()
                .fg(Color::LightBlue)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled("Enter", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" load | "),
        Span::styled("s", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" summary | "),
        Span::styled("d", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" details | "),
        Span::styled("q", Style::default().add_modifier(Modifier::BOLD).fg(Color::Red)),
        Span::raw(" quit | "),
        Span::styled("?", Style::default().add_modifier(Modifier::BOLD).fg(Color::Green)),
        Span::raw(" help "),
    ]);

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(Style::default().fg(Color::DarkGray));

    let footer = Paragraph::new(footer_text)
        .alignment(Alignment::Center)
        .block(block)
        .style(Style::default().fg(Color::Gray));

    frame.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn details_rows_line_up_with_the_header() {
        let header = format!("{:<24} {:>14}", "Element Type", "Total Length");
        let row = details_row("LineString", 5.0);
        assert_eq!(row.len(), header.len());
        assert!(row.ends_with("5.00 units"));
    }
}
