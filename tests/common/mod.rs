//! Shared test utilities for the bench tests.
//!
//! - A bench wired to a scripted `MockLink`
//! - Helpers to wait for dispatcher reports

#![allow(dead_code)]

use pdt_test::bench::{BenchSettings, TestBench};
use pdt_test::catalog::TestCatalog;
use pdt_test::dispatcher::ExchangeTiming;
use pdt_test::port::{BaudRate, MockLink, MockOpener};
use pdt_test::results::ExchangeReport;
use std::sync::mpsc;
use std::time::{Duration, Instant};

pub const MOCK_PORT: &str = "/dev/ttyMOCK0";

/// Settings with short timeouts so failing exchanges finish quickly.
pub fn fast_settings() -> BenchSettings {
    BenchSettings {
        read_timeout: Duration::from_millis(10),
        timing: ExchangeTiming {
            response_timeout: Duration::from_millis(100),
            clear_input_before_send: true,
        },
        queue_capacity: 8,
    }
}

/// A bench over the production catalog whose opener hands out clones of
/// the returned `MockLink`.
pub struct MockBench {
    pub bench: TestBench,
    pub link: MockLink,
    pub opener: MockOpener,
    pub reports: mpsc::Receiver<ExchangeReport>,
}

impl MockBench {
    pub fn new() -> Self {
        Self::with_settings(fast_settings())
    }

    pub fn with_settings(settings: BenchSettings) -> Self {
        let link = MockLink::new("MOCK0");
        let opener = MockOpener::new(link.clone());
        let (tx, reports) = mpsc::channel();
        let bench = TestBench::new(
            TestCatalog::production(),
            Box::new(opener.clone()),
            settings,
            Box::new(move |report| {
                let _ = tx.send(report);
            }),
        );
        Self {
            bench,
            link,
            opener,
            reports,
        }
    }

    /// Same as [`MockBench::new`], already connected at 115200.
    pub fn connected() -> Self {
        let mut mock = Self::new();
        mock.bench
            .connect(MOCK_PORT, BaudRate::B115200)
            .expect("mock connect");
        mock
    }

    /// Wait for the next report and fold it into the bench.
    pub fn next_report(&mut self) -> ExchangeReport {
        let report = self
            .reports
            .recv_timeout(Duration::from_secs(2))
            .expect("dispatcher report");
        self.bench.apply(report.clone());
        report
    }

    pub fn result_text(&self, index: usize) -> String {
        self.bench
            .results()
            .row(index)
            .map(|row| row.result_text())
            .unwrap_or_default()
    }
}

/// Poll `condition` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}
