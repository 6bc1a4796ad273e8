//! Entry point for the PDT production test console.
//!
//! # Usage
//!
//! ```bash
//! # Interactive console
//! pdt-test
//!
//! # Preselect a port and connect on start
//! pdt-test --port /dev/ttyUSB0 --baud 115200 --connect
//!
//! # Headless: run cases 1, 4 and 7 and print the results
//! pdt-test --port COM3 --run 1 --run 4 --run 7
//! ```

use clap::Parser;
use pdt_test::bench::run_sequence;
use pdt_test::config::{Config, ConfigLoader};
use pdt_test::port::{list_ports, BaudRate, HardwareOpener};
use pdt_test::tui::{App, EventHandler};
use pdt_test::{logging, BenchSettings, ExchangeReport, TestBench, TestCatalog};
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Production test console for PDT devices over a serial link.",
    long_about = "Sends the production test commands to a device as JSON lines and shows each \
                  response. Runs as an interactive terminal console, or headless with --run."
)]
struct Args {
    /// Serial port to select (e.g. /dev/ttyUSB0, COM3)
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate: 9600, 19200, 38400, 57600 or 115200
    #[arg(short, long, value_parser = parse_baud)]
    baud: Option<BaudRate>,

    /// Configuration file to load instead of the default search
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log file path
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Connect to the selected port on start
    #[arg(long)]
    connect: bool,

    /// List available serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Run the test case with this index headless (repeatable)
    #[arg(long = "run", value_name = "INDEX")]
    run: Vec<usize>,

    /// Run every test case headless, in order
    #[arg(long, conflicts_with = "run")]
    run_all: bool,
}

fn parse_baud(value: &str) -> Result<BaudRate, String> {
    let bps: u32 = value
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    BaudRate::try_from(bps).map_err(|e| e.to_string())
}

fn load_config(args: &Args) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => ConfigLoader::load_from(path)?.into_config(),
        None => match ConfigLoader::load() {
            Ok(loader) => loader.into_config(),
            Err(e) => {
                eprintln!("Warning: Failed to load config, using defaults: {}", e);
                ConfigLoader::with_defaults().into_config()
            }
        },
    };

    if let Some(port) = &args.port {
        config.serial.default_port = Some(port.clone());
    }
    if let Some(baud) = args.baud {
        config.serial.default_baud = baud.into();
    }
    if let Some(file) = &args.log_file {
        config.logging.file = file.clone();
    }
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args)?;

    if args.list_ports {
        for port in list_ports()? {
            if port.description.is_empty() {
                println!("{}", port.name);
            } else {
                println!("{}\t{}", port.name, port.description);
            }
        }
        return Ok(());
    }

    let _log_guard = logging::init(&config.logging)?;
    info!(version = env!("CARGO_PKG_VERSION"), "pdt-test starting");

    if args.run_all || !args.run.is_empty() {
        return run_headless(&args, &config);
    }

    let events = EventHandler::new(config.tui.refresh_interval());
    let mut app = App::new(config, Box::new(HardwareOpener), events.sender());
    if args.connect {
        app.refresh_ports();
        app.connect_selected();
    }
    app.run(&events)?;

    info!("pdt-test exiting");
    Ok(())
}

/// Run cases one after another on the configured port and print the results.
fn run_headless(args: &Args, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let port = config
        .serial
        .default_port
        .clone()
        .ok_or("no serial port given; use --port or serial.default_port")?;

    let catalog = TestCatalog::production();
    let indices: Vec<usize> = if args.run_all {
        catalog.iter().map(|c| c.index).collect()
    } else {
        args.run.clone()
    };

    let (tx, rx) = mpsc::channel::<ExchangeReport>();
    let mut bench = TestBench::new(
        catalog,
        Box::new(HardwareOpener),
        BenchSettings::from(config),
        Box::new(move |report| {
            let _ = tx.send(report);
        }),
    );
    bench.connect(&port, config.serial.baud_rate())?;

    // Response timeout plus slack for the queue and the pre-send clear.
    let wait = config.serial.response_timeout() + Duration::from_secs(1);
    let rows = run_sequence(&mut bench, &rx, &indices, wait);
    bench.disconnect();

    let rows = rows?;
    for row in &rows {
        println!("{}\t{}\t{}", row.index, row.label, row.result_text());
    }

    let failures = rows.iter().filter(|row| !row.is_passed()).count();
    if failures > 0 {
        warn!(failures, "headless run finished with failures");
        return Err(format!("{failures} test case(s) failed").into());
    }
    Ok(())
}
