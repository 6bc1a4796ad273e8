//! Log file behaviour across a full bench session.
//!
//! The subscriber is process-global, so this binary holds a single test.

mod common;

use common::MockBench;
use pdt_test::config::{LogFormat, LoggingConfig};
use pdt_test::logging;

#[test]
fn test_session_appends_to_existing_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("serial_test_log.txt");
    std::fs::write(&path, "previous run line\n").unwrap();

    std::env::remove_var("RUST_LOG");
    let guard = logging::init(&LoggingConfig {
        file: path.clone(),
        level: "info".into(),
        format: LogFormat::Full,
    })
    .unwrap();

    let mut mock = MockBench::connected();
    mock.link.queue_reply("not-json");
    mock.bench.run_case(7).unwrap();
    mock.next_report();
    mock.bench.disconnect();

    drop(mock);
    drop(guard);

    let contents = std::fs::read_to_string(&path).unwrap();
    assert!(
        contents.starts_with("previous run line\n"),
        "earlier content lost:\n{contents}"
    );
    for event in [
        "connected to serial port",
        "sent command",
        "received response",
        "invalid response",
        "serial port disconnected",
    ] {
        assert!(contents.contains(event), "missing '{event}' in:\n{contents}");
    }
    assert!(contents.contains(r#"{"PdtTest":"uid"}"#));
    assert!(contents.contains("not-json"));
}
