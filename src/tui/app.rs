//! TUI application state and main loop.

use crate::bench::{BenchSettings, TestBench};
use crate::catalog::TestCatalog;
use crate::config::Config;
use crate::error::AppError;
use crate::port::{list_ports, BaudRate, LinkOpener, PortInfo};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use ratatui::widgets::TableState;
use std::io;
use std::sync::mpsc;
use std::time::{Duration, Instant};
use tracing::warn;

use super::event::{Event, EventHandler};
use super::theme::Theme;
use super::ui;

/// Application mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Navigation and actions
    #[default]
    Normal,
    /// Help overlay
    Help,
    /// A message dialog waits for acknowledgement
    Dialog,
}

/// Focus area in the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusArea {
    /// Port selector
    Ports,
    /// Baud rate selector
    Baud,
    /// Test case table
    #[default]
    Tests,
}

/// Application state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Running,
    Quitting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogKind {
    Info,
    Error,
}

/// Modal message, the terminal stand-in for a message box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialog {
    pub kind: DialogKind,
    pub title: String,
    pub message: String,
}

impl Dialog {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: DialogKind::Info,
            title: "Info".to_string(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: DialogKind::Error,
            title: "Error".to_string(),
            message: message.into(),
        }
    }
}

/// Turns single clicks into double-clicks on the same row.
#[derive(Debug, Clone)]
pub struct ClickTracker {
    window: Duration,
    last: Option<(usize, Instant)>,
}

impl ClickTracker {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Record a click on `row`; true when it completes a double-click.
    pub fn register(&mut self, row: usize, at: Instant) -> bool {
        match self.last.take() {
            Some((last_row, last_at))
                if last_row == row && at.saturating_duration_since(last_at) <= self.window =>
            {
                true
            }
            _ => {
                self.last = Some((row, at));
                false
            }
        }
    }
}

/// Main TUI application.
pub struct App {
    pub state: AppState,
    pub mode: Mode,
    pub theme: Theme,
    pub focus: FocusArea,
    pub config: Config,

    /// Connection, catalog, results and dispatcher
    pub bench: TestBench,

    /// Ports found by the last refresh
    pub available_ports: Vec<PortInfo>,
    pub selected_port: usize,
    /// Index into `BaudRate::ALL`
    pub selected_baud: usize,

    pub table_state: TableState,
    /// Where the table was last drawn, for mouse hit-testing
    pub table_area: Rect,

    pub dialog: Option<Dialog>,
    pub status_message: Option<String>,

    clicks: ClickTracker,
}

impl App {
    /// Build the app. Dispatcher reports are delivered as
    /// [`Event::Exchange`] on `events`.
    pub fn new(config: Config, opener: Box<dyn LinkOpener>, events: mpsc::Sender<Event>) -> Self {
        let theme = Theme::by_name(&config.tui.theme)
            .cloned()
            .unwrap_or_default();
        let bench = TestBench::new(
            TestCatalog::production(),
            opener,
            BenchSettings::from(&config),
            Box::new(move |report| {
                let _ = events.send(Event::Exchange(report));
            }),
        );

        Self {
            state: AppState::Running,
            mode: Mode::Normal,
            theme,
            focus: FocusArea::Tests,
            selected_baud: config.serial.baud_rate().position(),
            clicks: ClickTracker::new(config.tui.double_click_window()),
            config,
            bench,
            available_ports: Vec::new(),
            selected_port: 0,
            table_state: TableState::default().with_selected(Some(0)),
            table_area: Rect::default(),
            dialog: None,
            status_message: None,
        }
    }

    /// Run the main loop until the operator quits.
    pub fn run(&mut self, events: &EventHandler) -> io::Result<()> {
        let mut terminal = ui::setup_terminal()?;
        self.refresh_ports();

        let result = self.event_loop(&mut terminal, events);

        ui::restore_terminal(terminal)?;
        result
    }

    fn event_loop(&mut self, terminal: &mut ui::Tui, events: &EventHandler) -> io::Result<()> {
        while self.state == AppState::Running {
            terminal.draw(|frame| ui::render(self, frame))?;
            match events.next() {
                Ok(event) => self.handle_event(event),
                Err(_) => self.state = AppState::Quitting,
            }
        }
        Ok(())
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Tick | Event::Resize(_, _) => {}
            Event::Key(key) => self.handle_key(key),
            Event::Mouse(mouse) => self.handle_mouse(mouse),
            Event::Exchange(report) => {
                let index = report.index;
                let text = report.outcome.render();
                self.bench.apply(report);
                self.status_message = Some(format!("#{index}: {text}"));
            }
            Event::Error(err) => {
                warn!(error = %err, "terminal input error");
                self.status_message = Some(format!("Error: {}", err));
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.state = AppState::Quitting;
            return;
        }
        match self.mode {
            Mode::Normal => self.handle_normal_key(key),
            Mode::Help => self.handle_help_key(key),
            Mode::Dialog => self.handle_dialog_key(key),
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.state = AppState::Quitting,
            KeyCode::F(1) | KeyCode::Char('?') => self.mode = Mode::Help,
            KeyCode::Tab => self.cycle_focus(),
            KeyCode::BackTab => self.cycle_focus_back(),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Left if self.focus != FocusArea::Tests => self.move_selection(-1),
            KeyCode::Right if self.focus != FocusArea::Tests => self.move_selection(1),
            KeyCode::Char('r') => self.refresh_ports(),
            KeyCode::Char('c') => self.toggle_connection(),
            KeyCode::Char('l') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.clear_results()
            }
            KeyCode::Char('x') => self.clear_results(),
            KeyCode::Char(digit @ '1'..='9') => {
                if let Some(index) = digit.to_digit(10) {
                    self.run_case(index as usize);
                }
            }
            KeyCode::Enter => match self.focus {
                FocusArea::Tests => self.run_selected(),
                FocusArea::Ports | FocusArea::Baud => self.toggle_connection(),
            },
            _ => {}
        }
    }

    fn handle_help_key(&mut self, key: KeyEvent) {
        if matches!(
            key.code,
            KeyCode::Esc | KeyCode::F(1) | KeyCode::Char('q') | KeyCode::Char('?')
        ) {
            self.mode = Mode::Normal;
        }
    }

    fn handle_dialog_key(&mut self, key: KeyEvent) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char(' ')) {
            self.dialog = None;
            self.mode = Mode::Normal;
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        if self.mode != Mode::Normal {
            return;
        }
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let Some(row) = self.row_at(mouse.column, mouse.row) else {
                    return;
                };
                self.focus = FocusArea::Tests;
                self.table_state.select(Some(row));
                if self.clicks.register(row, Instant::now()) {
                    self.run_row(row);
                }
            }
            MouseEventKind::ScrollUp => self.move_selection(-1),
            MouseEventKind::ScrollDown => self.move_selection(1),
            _ => {}
        }
    }

    /// Table row under a terminal cell, skipping the border and header.
    fn row_at(&self, column: u16, row: u16) -> Option<usize> {
        let area = self.table_area;
        let first_row = area.y.saturating_add(2);
        let last_row = area.y.saturating_add(area.height.saturating_sub(1));
        if column <= area.x || column >= area.x + area.width.saturating_sub(1) {
            return None;
        }
        if row < first_row || row >= last_row {
            return None;
        }
        let index = self.table_state.offset() + usize::from(row - first_row);
        (index < self.bench.rows().len()).then_some(index)
    }

    fn cycle_focus(&mut self) {
        self.focus = match self.focus {
            FocusArea::Ports => FocusArea::Baud,
            FocusArea::Baud => FocusArea::Tests,
            FocusArea::Tests => FocusArea::Ports,
        };
    }

    fn cycle_focus_back(&mut self) {
        self.focus = match self.focus {
            FocusArea::Ports => FocusArea::Tests,
            FocusArea::Baud => FocusArea::Ports,
            FocusArea::Tests => FocusArea::Baud,
        };
    }

    fn move_selection(&mut self, delta: isize) {
        fn step(current: usize, len: usize, delta: isize) -> usize {
            if len == 0 {
                return 0;
            }
            current.saturating_add_signed(delta).min(len - 1)
        }

        match self.focus {
            FocusArea::Ports => {
                self.selected_port = step(self.selected_port, self.available_ports.len(), delta);
            }
            FocusArea::Baud => {
                self.selected_baud = step(self.selected_baud, BaudRate::ALL.len(), delta);
            }
            FocusArea::Tests => {
                let current = self.table_state.selected().unwrap_or(0);
                let next = step(current, self.bench.rows().len(), delta);
                self.table_state.select(Some(next));
            }
        }
    }

    pub fn selected_port_name(&self) -> Option<&str> {
        self.available_ports
            .get(self.selected_port)
            .map(|p| p.name.as_str())
    }

    pub fn selected_baud(&self) -> BaudRate {
        BaudRate::ALL
            .get(self.selected_baud)
            .copied()
            .unwrap_or_default()
    }

    /// Re-enumerate ports, keeping the current choice when it still exists.
    pub fn refresh_ports(&mut self) {
        match list_ports() {
            Ok(ports) => {
                let count = ports.len();
                self.set_ports(ports);
                self.status_message = Some(format!("Found {count} serial port(s)"));
            }
            Err(e) => {
                warn!(error = %e, "failed to list serial ports");
                self.status_message = Some(format!("Failed to list ports: {}", e));
            }
        }
    }

    /// Replace the port list. The previous selection wins, then the
    /// configured default port, then the first entry.
    pub fn set_ports(&mut self, ports: Vec<PortInfo>) {
        let previous = self.selected_port_name().map(str::to_string);
        let preferred = previous.or_else(|| self.config.serial.default_port.clone());

        self.selected_port = preferred
            .and_then(|name| ports.iter().position(|p| p.name == name))
            .unwrap_or(0);
        self.available_ports = ports;
    }

    /// Connect to the selected port, or disconnect when connected.
    pub fn toggle_connection(&mut self) {
        if self.bench.is_connected() {
            if let Some(info) = self.bench.disconnect() {
                self.status_message = Some(if self.bench.is_releasing() {
                    format!(
                        "Disconnected from {}; port closes when the current test finishes",
                        info.port_name
                    )
                } else {
                    format!("Disconnected from {}", info.port_name)
                });
            }
            self.show_dialog(Dialog::info("Serial port disconnected"));
        } else {
            self.connect_selected();
        }
    }

    pub fn connect_selected(&mut self) {
        let port = self.selected_port_name().unwrap_or_default().to_string();
        match self.bench.connect(&port, self.selected_baud()) {
            Ok(info) => {
                self.status_message = Some(format!(
                    "Connected to {} @ {}",
                    info.port_name, info.baud_rate
                ));
                self.show_dialog(Dialog::info("Serial port connected"));
            }
            Err(e) => self.show_dialog(Dialog::error(e.to_string())),
        }
    }

    pub fn run_selected(&mut self) {
        if let Some(row) = self.table_state.selected() {
            self.run_row(row);
        }
    }

    /// Run the case shown at table position `row`.
    pub fn run_row(&mut self, row: usize) {
        if let Some(index) = self.bench.rows().get(row).map(|r| r.index) {
            self.run_case(index);
        }
    }

    /// Run the case with catalog index `index`.
    pub fn run_case(&mut self, index: usize) {
        match self.bench.run_case(index) {
            Ok(()) => self.status_message = Some(format!("#{index}: sent")),
            Err(AppError::NotConnected) => {
                self.show_dialog(Dialog::error(AppError::NotConnected.to_string()))
            }
            Err(e) => self.status_message = Some(e.to_string()),
        }
    }

    pub fn clear_results(&mut self) {
        self.bench.clear_results();
        self.status_message = Some("Results cleared".to_string());
    }

    fn show_dialog(&mut self, dialog: Dialog) {
        self.dialog = Some(dialog);
        self.mode = Mode::Dialog;
    }

    /// Time since connecting, as `HH:MM:SS`.
    pub fn uptime_string(&self) -> String {
        match self.bench.connection() {
            Some(info) => {
                let secs = (chrono::Local::now() - info.connected_at)
                    .num_seconds()
                    .max(0);
                format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
            }
            None => "--:--:--".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{MockLink, MockOpener};
    use crate::results::INVALID_RESPONSE_MARKER;
    use crossterm::event::KeyEventState;
    use crossterm::event::KeyEventKind;

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn test_app(link: &MockLink) -> (App, MockOpener, mpsc::Receiver<Event>) {
        let mut config = Config::default();
        config.serial.response_timeout_ms = 50;
        config.serial.read_timeout_ms = 10;
        let opener = MockOpener::new(link.clone());
        let (tx, rx) = mpsc::channel();
        let mut app = App::new(config, Box::new(opener.clone()), tx);
        app.set_ports(vec![PortInfo {
            name: "/dev/ttyMOCK".into(),
            description: String::new(),
        }]);
        (app, opener, rx)
    }

    fn pump(app: &mut App, rx: &mpsc::Receiver<Event>) {
        let event = rx
            .recv_timeout(Duration::from_secs(2))
            .expect("exchange report");
        app.handle_event(event);
    }

    #[test]
    fn test_click_tracker() {
        let mut clicks = ClickTracker::new(Duration::from_millis(400));
        let t0 = Instant::now();
        assert!(!clicks.register(2, t0));
        assert!(clicks.register(2, t0 + Duration::from_millis(100)));
        // A third click starts a new pair.
        assert!(!clicks.register(2, t0 + Duration::from_millis(150)));
        assert!(!clicks.register(3, t0 + Duration::from_millis(200)));
        assert!(!clicks.register(3, t0 + Duration::from_millis(900)));
    }

    #[test]
    fn test_run_without_connection_shows_dialog() {
        let link = MockLink::new("MOCK0");
        let (mut app, _, _rx) = test_app(&link);

        app.handle_event(key(KeyCode::Enter));

        assert_eq!(app.mode, Mode::Dialog);
        assert_eq!(app.dialog.as_ref().unwrap().kind, DialogKind::Error);
        assert!(link.write_log().is_empty());

        app.handle_event(key(KeyCode::Esc));
        assert_eq!(app.mode, Mode::Normal);
        assert!(app.dialog.is_none());
    }

    #[test]
    fn test_connect_run_and_display() {
        let mut link = MockLink::new("MOCK0");
        link.queue_reply(r#"{"result":"ABC123"}"#);
        let (mut app, opener, rx) = test_app(&link);

        app.handle_event(key(KeyCode::Char('c')));
        assert!(app.bench.is_connected());
        assert_eq!(opener.opened()[0].1.baud_rate, BaudRate::B115200);
        app.handle_event(key(KeyCode::Enter)); // dismiss dialog

        app.handle_event(key(KeyCode::Char('7')));
        pump(&mut app, &rx);

        let row = app.bench.results().row(7).unwrap();
        assert_eq!(row.result_text(), "\"ABC123\"");
    }

    #[test]
    fn test_connect_failure_shows_error_dialog() {
        let link = MockLink::new("MOCK0");
        let (mut app, opener, _rx) = test_app(&link);
        opener.refuse_with("Device or resource busy");

        app.connect_selected();

        assert!(!app.bench.is_connected());
        let dialog = app.dialog.as_ref().unwrap();
        assert_eq!(dialog.kind, DialogKind::Error);
        assert!(dialog.message.contains("busy"));
    }

    #[test]
    fn test_clear_key_empties_results() {
        let link = MockLink::new("MOCK0");
        let (mut app, _, rx) = test_app(&link);
        app.connect_selected();
        app.handle_event(key(KeyCode::Enter));

        app.run_case(1);
        pump(&mut app, &rx);
        assert_eq!(
            app.bench.results().row(1).unwrap().result_text(),
            INVALID_RESPONSE_MARKER
        );

        app.handle_event(key(KeyCode::Char('x')));
        assert!(app.bench.rows().iter().all(|r| r.result_text().is_empty()));
    }

    #[test]
    fn test_baud_selection_cycles_within_bounds() {
        let link = MockLink::new("MOCK0");
        let (mut app, _, _rx) = test_app(&link);
        app.focus = FocusArea::Baud;

        app.handle_event(key(KeyCode::Right));
        assert_eq!(app.selected_baud(), BaudRate::B115200);
        for _ in 0..10 {
            app.handle_event(key(KeyCode::Left));
        }
        assert_eq!(app.selected_baud(), BaudRate::B9600);
    }

    #[test]
    fn test_set_ports_prefers_configured_default() {
        let link = MockLink::new("MOCK0");
        let (mut app, _, _rx) = test_app(&link);
        app.available_ports.clear();
        app.config.serial.default_port = Some("COM4".into());

        app.set_ports(vec![
            PortInfo {
                name: "COM3".into(),
                description: String::new(),
            },
            PortInfo {
                name: "COM4".into(),
                description: String::new(),
            },
        ]);
        assert_eq!(app.selected_port_name(), Some("COM4"));
    }

    #[test]
    fn test_double_click_runs_row() {
        let mut link = MockLink::new("MOCK0");
        link.queue_reply(r#"{"result":"1.0.3"}"#);
        let (mut app, _, rx) = test_app(&link);
        app.connect_selected();
        app.handle_event(key(KeyCode::Enter));
        app.table_area = Rect::new(0, 5, 80, 15);

        let click = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 10,
            row: 5 + 2 + 3,
            modifiers: KeyModifiers::NONE,
        };
        app.handle_event(Event::Mouse(click));
        assert_eq!(app.table_state.selected(), Some(3));
        assert!(link.write_log().is_empty());

        app.handle_event(Event::Mouse(click));
        pump(&mut app, &rx);
        assert_eq!(
            app.bench.results().row(4).unwrap().result_text(),
            "\"1.0.3\""
        );
    }

    #[test]
    fn test_quit() {
        let link = MockLink::new("MOCK0");
        let (mut app, _, _rx) = test_app(&link);
        app.handle_event(key(KeyCode::Char('q')));
        assert_eq!(app.state, AppState::Quitting);
    }
}
