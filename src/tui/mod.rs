//! Terminal operator console.
//!
//! A ratatui front end for the test bench: pick a port and baud rate,
//! connect, then run test cases from the table with Enter, a number key or
//! a double-click. Results appear in the third column as the dispatcher
//! reports them.
//!
//! # Example
//!
//! ```rust,no_run
//! use pdt_test::config::Config;
//! use pdt_test::port::HardwareOpener;
//! use pdt_test::tui::{App, EventHandler};
//!
//! let config = Config::default();
//! let events = EventHandler::new(config.tui.refresh_interval());
//! let mut app = App::new(config, Box::new(HardwareOpener), events.sender());
//! app.run(&events)?;
//! # Ok::<(), std::io::Error>(())
//! ```

mod app;
mod event;
mod theme;
mod ui;

pub use app::{App, AppState, ClickTracker, Dialog, DialogKind, FocusArea, Mode};
pub use event::{Event, EventHandler};
pub use theme::{Theme, THEMES};
pub use ui::render;
