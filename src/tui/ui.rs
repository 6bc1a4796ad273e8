//! UI rendering for the TUI.

use super::app::{App, DialogKind, FocusArea, Mode};
use crate::port::BaudRate;
use crate::results::{ExchangeOutcome, ResultRow};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap},
    Frame, Terminal,
};
use std::io::{self, Stdout};

/// The terminal the console draws on.
pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Set up the terminal for TUI rendering.
pub fn setup_terminal() -> io::Result<Tui> {
    crossterm::terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    crossterm::execute!(
        stdout,
        crossterm::terminal::EnterAlternateScreen,
        crossterm::event::EnableMouseCapture
    )?;
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

/// Restore the terminal to normal mode.
pub fn restore_terminal(mut terminal: Tui) -> io::Result<()> {
    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        crossterm::terminal::LeaveAlternateScreen,
        crossterm::event::DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Render the entire UI. Records the table area on `app` for mouse input.
pub fn render(app: &mut App, frame: &mut Frame) {
    let size = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Length(3), // Port / baud selectors
            Constraint::Min(6),    // Test table
            Constraint::Length(1), // Status bar
        ])
        .split(size);

    render_header(app, frame, chunks[0]);
    render_selectors(app, frame, chunks[1]);
    render_table(app, frame, chunks[2]);
    render_status_bar(app, frame, chunks[3]);

    match app.mode {
        Mode::Help => render_help_overlay(app, frame, size),
        Mode::Dialog => render_dialog(app, frame, size),
        Mode::Normal => {}
    }
}

fn border_style(app: &App, area: FocusArea) -> Style {
    if app.focus == area {
        Style::default().fg(app.theme.accent)
    } else {
        Style::default().fg(app.theme.border)
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let (port_info, status, status_color) = match app.bench.connection() {
        Some(info) => (
            format!("{} @ {}", info.port_name, info.baud_rate),
            "Connected",
            app.theme.connected,
        ),
        None => ("Not connected".to_string(), "Disconnected", app.theme.inactive),
    };

    let header = Line::from(vec![
        Span::styled(
            " PDT Test ",
            Style::default()
                .fg(app.theme.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled(port_info, Style::default().fg(app.theme.fg)),
        Span::raw(" | "),
        Span::styled(status, Style::default().fg(status_color)),
        Span::raw(" | "),
        Span::styled(app.uptime_string(), Style::default().fg(app.theme.fg)),
    ]);

    let header_widget = Paragraph::new(header).style(Style::default().bg(app.theme.selection));
    frame.render_widget(header_widget, area);
}

fn render_selectors(app: &App, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Min(30),
            Constraint::Length(16),
            Constraint::Length(30),
        ])
        .split(area);

    let port_text = match app.available_ports.get(app.selected_port) {
        Some(port) if port.description.is_empty() => port.name.clone(),
        Some(port) => format!("{} ({})", port.name, port.description),
        None => "no ports found".to_string(),
    };
    let port_widget = Paragraph::new(format!("◂ {} ▸", port_text)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style(app, FocusArea::Ports))
            .title(format!(
                " Port {}/{} ",
                (app.selected_port + 1).min(app.available_ports.len()),
                app.available_ports.len()
            )),
    );
    frame.render_widget(port_widget, chunks[0]);

    let baud = BaudRate::ALL
        .get(app.selected_baud)
        .copied()
        .unwrap_or_default();
    let baud_widget = Paragraph::new(format!("◂ {} ▸", baud)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style(app, FocusArea::Baud))
            .title(" Baud "),
    );
    frame.render_widget(baud_widget, chunks[1]);

    let (action, color) = if app.bench.is_connected() {
        ("c: Disconnect", app.theme.failed)
    } else {
        ("c: Connect", app.theme.connected)
    };
    let actions = Line::from(vec![
        Span::styled(action, Style::default().fg(color)),
        Span::raw("  "),
        Span::styled("r: Refresh", Style::default().fg(app.theme.fg)),
        Span::raw("  "),
        Span::styled("x: Clear", Style::default().fg(app.theme.fg)),
    ]);
    let actions_widget = Paragraph::new(actions).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(app.theme.border)),
    );
    frame.render_widget(actions_widget, chunks[2]);
}

fn result_cell<'a>(app: &App, row: &ResultRow) -> Cell<'a> {
    if row.in_flight {
        let text = match &row.result {
            Some(outcome) => format!("{} …", outcome.render()),
            None => "…".to_string(),
        };
        return Cell::from(text).style(Style::default().fg(app.theme.pending));
    }
    let color = match &row.result {
        Some(ExchangeOutcome::Passed(_)) => app.theme.passed,
        Some(ExchangeOutcome::Invalid { .. } | ExchangeOutcome::Failed(_)) => app.theme.failed,
        None => app.theme.fg,
    };
    Cell::from(row.result_text()).style(Style::default().fg(color))
}

fn render_table(app: &mut App, frame: &mut Frame, area: Rect) {
    app.table_area = area;

    let header = Row::new(vec!["#", "Test", "Result"]).style(
        Style::default()
            .fg(app.theme.accent)
            .add_modifier(Modifier::BOLD),
    );

    let rows: Vec<Row> = app
        .bench
        .rows()
        .iter()
        .map(|row| {
            Row::new(vec![
                Cell::from(row.index.to_string()),
                Cell::from(row.label.clone()),
                result_cell(app, row),
            ])
            .style(Style::default().fg(app.theme.fg))
        })
        .collect();

    let title = format!(
        " Tests ({} passed, {} pending) ",
        app.bench.results().passed_count(),
        app.bench.results().in_flight_count()
    );

    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Length(28),
            Constraint::Min(20),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style(app, FocusArea::Tests))
            .title(title),
    )
    .row_highlight_style(
        Style::default()
            .bg(app.theme.selection)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, &mut app.table_state);
}

fn render_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let status_text = app
        .status_message
        .clone()
        .unwrap_or_else(|| "Ready".to_string());

    let keybinds = "q:quit  Tab:focus  Enter/dbl-click:run  1-9:run #  F1:help";

    let status = Line::from(vec![
        Span::styled(format!(" {} ", status_text), Style::default().fg(app.theme.fg)),
        Span::raw(" | "),
        Span::styled(keybinds, Style::default().fg(app.theme.inactive)),
    ]);

    let status_widget = Paragraph::new(status).style(Style::default().bg(app.theme.selection));
    frame.render_widget(status_widget, area);
}

fn render_help_overlay(app: &App, frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 70, area);
    frame.render_widget(Clear, popup_area);

    let help_text = vec![
        Line::from(Span::styled(
            "Keybindings",
            Style::default()
                .fg(app.theme.accent)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("  q / Ctrl+C     - Quit"),
        Line::from("  Tab / S-Tab    - Cycle focus (port, baud, tests)"),
        Line::from("  j/k, Up/Down   - Move selection"),
        Line::from("  Left/Right     - Change port or baud"),
        Line::from("  r              - Refresh port list"),
        Line::from("  c              - Connect / disconnect"),
        Line::from("  Enter          - Run selected test"),
        Line::from("  1-9            - Run test by number"),
        Line::from("  Double-click   - Run clicked test"),
        Line::from("  x / Ctrl+L     - Clear results"),
        Line::from("  F1 / ?         - Show help"),
        Line::from(""),
        Line::from(format!(
            "Log file: {}",
            app.config.logging.file.display()
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Press Esc or F1 to close",
            Style::default().fg(app.theme.inactive),
        )),
    ];

    let help_widget = Paragraph::new(help_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.accent))
                .title(" Help ")
                .style(Style::default().bg(app.theme.bg)),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(help_widget, popup_area);
}

fn render_dialog(app: &App, frame: &mut Frame, area: Rect) {
    let Some(dialog) = &app.dialog else {
        return;
    };
    let popup_area = centered_rect(50, 30, area);
    frame.render_widget(Clear, popup_area);

    let color = match dialog.kind {
        DialogKind::Info => app.theme.accent,
        DialogKind::Error => app.theme.failed,
    };

    let text = vec![
        Line::from(""),
        Line::from(Span::styled(
            dialog.message.clone(),
            Style::default().fg(app.theme.fg),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Press Enter to close",
            Style::default().fg(app.theme.inactive),
        )),
    ];

    let widget = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title(format!(" {} ", dialog.title))
                .style(Style::default().bg(app.theme.bg)),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(widget, popup_area);
}

/// Create a centered rectangle with the given percentage of width and height.
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
