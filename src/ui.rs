use crate::app::App;
use geoquery_map::braille::BrailleCanvas;
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
    Frame,
};

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    // Split into map area and status bar
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Map
            Constraint::Length(1), // Status bar
        ])
        .split(area);

    render_map(frame, app, chunks[0]);
    render_status_bar(frame, app, chunks[1]);
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            format!(" geoquery-map · {} ", app.source),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    // Mouse position is in terminal cells; the border shifts it by one
    let cursor_pos = app.mouse_pos.and_then(|(col, row)| {
        let cx = col.checked_sub(inner.x)?;
        let cy = row.checked_sub(inner.y)?;
        (cx < inner.width && cy < inner.height).then_some((cx, cy))
    });

    frame.render_widget(
        MapWidget {
            canvas: &app.canvas,
            cursor_pos,
            show_cursor: !app.controller.is_panning(),
        },
        inner,
    );
}

/// Copies the rendered Braille canvas into the terminal buffer
struct MapWidget<'a> {
    canvas: &'a BrailleCanvas,
    cursor_pos: Option<(u16, u16)>,
    show_cursor: bool,
}

impl Widget for MapWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let rows = area.height.min(self.canvas.height() as u16);
        let cols = area.width.min(self.canvas.width() as u16);
        for row in 0..rows {
            for col in 0..cols {
                if let Some((ch, color)) = self.canvas.cell(col as usize, row as usize) {
                    buf[(area.x + col, area.y + row)].set_char(ch).set_fg(color);
                }
            }
        }

        if let (true, Some((cx, cy))) = (self.show_cursor, self.cursor_pos) {
            buf[(area.x + cx, area.y + cy)].set_char('╋').set_fg(Color::Red);
        }
    }
}

fn toggle(on: bool, on_label: &'static str, off_label: &'static str) -> Span<'static> {
    Span::styled(
        if on { on_label } else { off_label },
        Style::default().fg(if on { Color::Green } else { Color::DarkGray }),
    )
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let controller = &app.controller;
    let settings = controller.settings();
    let stats = controller.stats();
    let dim = Style::default().fg(Color::DarkGray);

    let mut spans = vec![
        Span::styled(" Mode: ", dim),
        Span::styled(controller.mode().name(), Style::default().fg(Color::Magenta)),
        Span::styled(" Zoom: ", dim),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(
            format!(" {}/{} labels ", stats.labels_placed, stats.labels_placed + stats.labels_dropped),
            dim,
        ),
        toggle(settings.show_labels, "[L]abels ", "[l]abels "),
        toggle(settings.show_basemap, "[B]asemap ", "[b]asemap "),
    ];
    if let Some(name) = app.selection() {
        spans.push(Span::styled("| ", dim));
        spans.push(Span::styled(name.to_string(), Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(" "));
    }
    if let Some(message) = &app.message {
        spans.push(Span::styled("| ", dim));
        spans.push(Span::styled(message.clone(), Style::default().fg(Color::Cyan)));
        spans.push(Span::raw(" "));
    }
    spans.push(Span::styled(
        "| hjkl:pan +/-:zoom m:mode e:export r:reset q:quit",
        dim,
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
