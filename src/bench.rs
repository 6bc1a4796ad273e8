//! Test bench: the controller the UI and the headless runner drive.
//!
//! ```text
//! UI / CLI ──> TestBench ──> Dispatcher queue ──> worker ──> SerialLink
//!                  ^                                 │
//!                  └──── apply(ExchangeReport) <─────┘ (via EventSink)
//! ```
//!
//! The bench owns the catalog, the result table, the connection manager and
//! the dispatcher. Only the thread that owns the bench mutates the table;
//! reports from the worker arrive as messages and are folded in with
//! [`TestBench::apply`].

use crate::catalog::TestCatalog;
use crate::config::Config;
use crate::connection::{ConnectionInfo, ConnectionManager};
use crate::dispatcher::{Dispatcher, EventSink, ExchangeTiming};
use crate::error::{AppError, AppResult};
use crate::port::{BaudRate, LinkOpener};
use crate::results::{ExchangeOutcome, ExchangeReport, ResultRow, ResultTable};
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Settings a bench is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchSettings {
    pub read_timeout: Duration,
    pub timing: ExchangeTiming,
    pub queue_capacity: usize,
}

impl Default for BenchSettings {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(100),
            timing: ExchangeTiming::default(),
            queue_capacity: 4,
        }
    }
}

impl From<&Config> for BenchSettings {
    fn from(config: &Config) -> Self {
        Self {
            read_timeout: config.serial.read_timeout(),
            timing: ExchangeTiming {
                response_timeout: config.serial.response_timeout(),
                clear_input_before_send: config.serial.clear_input_before_send,
            },
            queue_capacity: config.dispatch.queue_capacity,
        }
    }
}

pub struct TestBench {
    catalog: TestCatalog,
    results: ResultTable,
    connection: ConnectionManager,
    dispatcher: Dispatcher,
}

impl TestBench {
    pub fn new(
        catalog: TestCatalog,
        opener: Box<dyn LinkOpener>,
        settings: BenchSettings,
        sink: EventSink,
    ) -> Self {
        let results = ResultTable::new(&catalog);
        Self {
            catalog,
            results,
            connection: ConnectionManager::new(opener, settings.read_timeout)
                .with_release_wait(settings.timing.response_timeout + settings.read_timeout),
            dispatcher: Dispatcher::spawn(settings.timing, settings.queue_capacity, sink),
        }
    }

    pub fn connect(&mut self, port_name: &str, baud_rate: BaudRate) -> AppResult<ConnectionInfo> {
        self.connection.connect(port_name, baud_rate)
    }

    /// Close the connection. Queued commands will fail without writing.
    pub fn disconnect(&mut self) -> Option<ConnectionInfo> {
        self.connection.disconnect()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// An exchange started before the last disconnect still holds the port.
    pub fn is_releasing(&self) -> bool {
        self.connection.is_releasing()
    }

    pub fn connection(&self) -> Option<&ConnectionInfo> {
        self.connection.info()
    }

    /// Queue the test case at `index`.
    ///
    /// # Errors
    ///
    /// - `AppError::UnknownCase` if no case has that index
    /// - `AppError::NotConnected` if no connection is open; nothing is sent
    /// - `AppError::AlreadyPending` if the row is still waiting
    /// - `AppError::QueueFull` / `AppError::WorkerStopped` from the dispatcher
    pub fn run_case(&mut self, index: usize) -> AppResult<()> {
        let case = self
            .catalog
            .get(index)
            .ok_or(AppError::UnknownCase(index))?;
        let link = self.connection.handle().ok_or_else(|| {
            warn!(index, "send attempted without an open connection");
            AppError::NotConnected
        })?;

        if !self.results.mark_in_flight(index) {
            return Err(AppError::AlreadyPending(index));
        }

        if let Err(e) = self.dispatcher.submit(case, link) {
            self.results.cancel_in_flight(index);
            return Err(e);
        }
        Ok(())
    }

    /// Fold a worker report into the result table.
    pub fn apply(&mut self, report: ExchangeReport) {
        match &report.outcome {
            ExchangeOutcome::Passed(_) => info!(
                index = report.index,
                elapsed_ms = report.elapsed.as_millis() as u64,
                result = %report.outcome.render(),
                "test case completed"
            ),
            ExchangeOutcome::Invalid { .. } | ExchangeOutcome::Failed(_) => error!(
                index = report.index,
                result = %report.outcome.render(),
                "test case failed"
            ),
        }
        if !self.results.apply(&report) {
            warn!(index = report.index, "report for unknown test case dropped");
        }
    }

    pub fn clear_results(&mut self) {
        self.results.clear();
    }

    pub fn rows(&self) -> &[ResultRow] {
        self.results.rows()
    }

    pub fn results(&self) -> &ResultTable {
        &self.results
    }

    pub fn catalog(&self) -> &TestCatalog {
        &self.catalog
    }
}

/// Run `indices` one after another, as the headless runner does.
///
/// Each case is queued only after the previous report arrived. `reports`
/// must be the receiving end of the bench's sink.
///
/// # Errors
///
/// Stops at the first case that cannot be queued (`UnknownCase`,
/// `NotConnected`, ...) or whose report does not arrive within `wait`
/// (`NoReport`).
pub fn run_sequence(
    bench: &mut TestBench,
    reports: &Receiver<ExchangeReport>,
    indices: &[usize],
    wait: Duration,
) -> AppResult<Vec<ResultRow>> {
    let mut rows = Vec::with_capacity(indices.len());
    for &index in indices {
        bench.run_case(index)?;

        let deadline = Instant::now() + wait;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let report = reports.recv_timeout(remaining).map_err(|_| {
                error!(index, "no report before deadline");
                AppError::NoReport(index)
            })?;
            let done = report.index == index;
            bench.apply(report);
            if done {
                break;
            }
        }

        if let Some(row) = bench.results().row(index) {
            rows.push(row.clone());
        }
    }
    Ok(rows)
}

impl std::fmt::Debug for TestBench {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestBench")
            .field("connection", &self.connection)
            .field("in_flight", &self.results.in_flight_count())
            .finish()
    }
}
