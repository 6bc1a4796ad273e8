//! Newline-delimited JSON wire protocol.
//!
//! A command is one compact JSON object followed by `\n`. The device answers
//! with one JSON object per line carrying a `result` field. There is no
//! framing beyond the line break.

use crate::port::{LinkError, SerialLink};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::debug;

/// Pause between polls when the link reports "no data yet" without blocking.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(2);

/// A parsed response line.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// The value of the `result` field.
    Result(Value),
    /// Not JSON, not an object, or no `result` field.
    Invalid,
}

/// Encode a command as a single line.
pub fn encode_command(command: &Value) -> String {
    let mut line = command.to_string();
    line.push('\n');
    line
}

/// Write `command` as one line, retrying partial writes.
///
/// Returns the encoded line.
pub fn write_command(link: &mut dyn SerialLink, command: &Value) -> Result<String, LinkError> {
    let line = encode_command(command);
    let mut remaining = line.as_bytes();
    while !remaining.is_empty() {
        let written = link.write_bytes(remaining)?;
        if written == 0 {
            return Err(LinkError::WriteZero);
        }
        remaining = &remaining[written..];
    }
    Ok(line)
}

/// Read bytes until `\n` or until `timeout` elapses.
///
/// On timeout whatever arrived is returned, so a silent device yields an
/// empty string. The line is decoded lossily and trimmed.
pub fn read_line(link: &mut dyn SerialLink, timeout: Duration) -> Result<String, LinkError> {
    let deadline = Instant::now() + timeout;
    let mut line = Vec::new();
    let mut byte = [0u8; 1];

    loop {
        if Instant::now() >= deadline {
            debug!(
                port = link.name(),
                received = line.len(),
                "response deadline elapsed"
            );
            break;
        }

        match link.read_bytes(&mut byte) {
            Ok(0) => std::thread::sleep(IDLE_POLL_INTERVAL),
            Ok(_) if byte[0] == b'\n' => break,
            Ok(_) => line.push(byte[0]),
            Err(e) if e.is_idle() => {
                if let LinkError::Io(ref io) = e {
                    if io.kind() == std::io::ErrorKind::WouldBlock {
                        std::thread::sleep(IDLE_POLL_INTERVAL);
                    }
                }
            }
            Err(e) => return Err(e),
        }
    }

    Ok(String::from_utf8_lossy(&line).trim().to_string())
}

/// Parse a response line and pull out its `result` field.
pub fn parse_response(raw: &str) -> Response {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(mut fields)) => match fields.remove("result") {
            Some(result) => Response::Result(result),
            None => Response::Invalid,
        },
        _ => Response::Invalid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::MockLink;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_encode_is_single_compact_line() {
        let line = encode_command(&json!({"PdtTest": "uid"}));
        assert_eq!(line, "{\"PdtTest\":\"uid\"}\n");
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[test]
    fn test_write_command_logs_one_write() {
        let mut link = MockLink::new("MOCK0");
        let line = write_command(&mut link, &json!({"PdtTest": "enter"})).unwrap();
        assert_eq!(link.written_lines(), vec![line]);
    }

    #[test]
    fn test_read_line_stops_at_newline() {
        let mut link = MockLink::new("MOCK0");
        link.enqueue_read(b"{\"result\":1}\r\n{\"result\":2}\n");

        let first = read_line(&mut link, Duration::from_millis(200)).unwrap();
        assert_eq!(first, "{\"result\":1}");
        let second = read_line(&mut link, Duration::from_millis(200)).unwrap();
        assert_eq!(second, "{\"result\":2}");
    }

    #[test]
    fn test_read_line_times_out_empty() {
        let mut link = MockLink::new("MOCK0");
        let started = Instant::now();
        let line = read_line(&mut link, Duration::from_millis(30)).unwrap();
        assert_eq!(line, "");
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_read_line_returns_partial_on_timeout() {
        let mut link = MockLink::new("MOCK0");
        link.enqueue_read(b"{\"result\":");
        let line = read_line(&mut link, Duration::from_millis(30)).unwrap();
        assert_eq!(line, "{\"result\":");
        assert_eq!(parse_response(&line), Response::Invalid);
    }

    #[test]
    fn test_parse_result_string() {
        assert_eq!(
            parse_response(r#"{"result":"ABC123"}"#),
            Response::Result(json!("ABC123"))
        );
    }

    #[test]
    fn test_parse_result_structured() {
        assert_eq!(
            parse_response(r#"{"result":{"adc":[1,2,3]},"seq":4}"#),
            Response::Result(json!({"adc": [1, 2, 3]}))
        );
    }

    #[test]
    fn test_parse_null_result_is_a_result() {
        assert_eq!(parse_response(r#"{"result":null}"#), Response::Result(Value::Null));
    }

    #[test]
    fn test_parse_invalid_inputs() {
        for raw in ["", "not-json", "42", "[1,2]", "\"result\"", r#"{"status":"ok"}"#, "{"] {
            assert_eq!(parse_response(raw), Response::Invalid, "input {raw:?}");
        }
    }

    proptest! {
        #[test]
        fn prop_parse_never_panics(raw in ".*") {
            let _ = parse_response(&raw);
        }

        #[test]
        fn prop_text_without_braces_is_invalid(raw in "[^{}]*") {
            prop_assert_eq!(parse_response(&raw), Response::Invalid);
        }
    }
}
