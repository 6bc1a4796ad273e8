//! Command dispatcher.
//!
//! One worker thread drains a bounded FIFO of jobs, so exactly one
//! request/response exchange is on the wire at a time. Outcomes go back to
//! the caller through an [`EventSink`]; the worker never touches UI state.

use crate::catalog::TestCase;
use crate::connection::LinkHandle;
use crate::error::{AppError, AppResult};
use crate::protocol::{self, Response};
use crate::results::{ExchangeOutcome, ExchangeReport};
use serde_json::Value;
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Receives one report per submitted job.
pub type EventSink = Box<dyn Fn(ExchangeReport) + Send + 'static>;

/// Timing and housekeeping for a single exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeTiming {
    /// Total time allowed for the response line to arrive.
    pub response_timeout: Duration,
    /// Discard unread bytes (late answers to earlier commands) before sending.
    pub clear_input_before_send: bool,
}

impl Default for ExchangeTiming {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_millis(1000),
            clear_input_before_send: true,
        }
    }
}

struct Job {
    index: usize,
    command: Value,
    link: LinkHandle,
}

/// Handle to the worker thread. Dropping it drains the queue and joins.
pub struct Dispatcher {
    jobs: Option<SyncSender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl Dispatcher {
    /// Start the worker with room for `queue_capacity` waiting jobs.
    pub fn spawn(timing: ExchangeTiming, queue_capacity: usize, sink: EventSink) -> Self {
        let (jobs, queue) = mpsc::sync_channel::<Job>(queue_capacity.max(1));

        let worker = thread::Builder::new()
            .name("pdt-dispatch".into())
            .spawn(move || {
                for job in queue {
                    let started = Instant::now();
                    let outcome = run_exchange(&job, &timing);
                    sink(ExchangeReport {
                        index: job.index,
                        outcome,
                        elapsed: started.elapsed(),
                    });
                }
                debug!("dispatch worker stopped");
            });

        let worker = match worker {
            Ok(handle) => Some(handle),
            Err(e) => {
                error!(error = %e, "failed to start dispatch worker");
                None
            }
        };

        Self {
            jobs: worker.as_ref().map(|_| jobs),
            worker,
        }
    }

    /// Queue `case` for sending over `link`.
    ///
    /// # Errors
    ///
    /// - `AppError::QueueFull` if the queue has no room
    /// - `AppError::WorkerStopped` if the worker is gone
    pub fn submit(&self, case: &TestCase, link: LinkHandle) -> AppResult<()> {
        let jobs = self.jobs.as_ref().ok_or(AppError::WorkerStopped)?;
        let job = Job {
            index: case.index,
            command: case.command.clone(),
            link,
        };

        match jobs.try_send(job) {
            Ok(()) => {
                debug!(index = case.index, "command queued");
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                warn!(index = case.index, "command queue full");
                Err(AppError::QueueFull)
            }
            Err(TrySendError::Disconnected(_)) => Err(AppError::WorkerStopped),
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.jobs.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("dispatch worker panicked");
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("running", &self.jobs.is_some())
            .finish()
    }
}

fn run_exchange(job: &Job, timing: &ExchangeTiming) -> ExchangeOutcome {
    let Some(shared) = job.link.upgrade() else {
        warn!(index = job.index, "connection closed before command was sent");
        return ExchangeOutcome::Failed("connection closed".into());
    };
    let mut link = shared.lock();
    let port = link.name().to_string();

    if timing.clear_input_before_send {
        if let Err(e) = link.clear_input() {
            debug!(port = %port, error = %e, "could not clear stale input");
        }
    }

    let line = match protocol::write_command(&mut **link, &job.command) {
        Ok(line) => line,
        Err(e) => {
            error!(port = %port, index = job.index, error = %e, "failed to send command");
            return ExchangeOutcome::Failed(e.to_string());
        }
    };
    info!(port = %port, index = job.index, command = line.trim_end(), "sent command");

    let raw = match protocol::read_line(&mut **link, timing.response_timeout) {
        Ok(raw) => raw,
        Err(e) => {
            error!(port = %port, index = job.index, error = %e, "failed to read response");
            return ExchangeOutcome::Failed(e.to_string());
        }
    };
    info!(port = %port, index = job.index, response = %raw, "received response");

    match protocol::parse_response(&raw) {
        Response::Result(value) => ExchangeOutcome::Passed(value),
        Response::Invalid => {
            error!(port = %port, index = job.index, response = %raw, "invalid response");
            ExchangeOutcome::Invalid { raw }
        }
    }
}
