//! Result sink: maps exchange outcomes onto table rows.

use crate::catalog::TestCatalog;
use serde_json::Value;
use std::time::Duration;

/// Shown in the result column when a response cannot be used.
pub const INVALID_RESPONSE_MARKER: &str = "invalid response";

/// How one request/response exchange ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeOutcome {
    /// The device answered with a `result` value.
    Passed(Value),
    /// The line was empty, not JSON, or had no `result` field.
    Invalid { raw: String },
    /// The exchange never completed (write failed, link gone).
    Failed(String),
}

impl ExchangeOutcome {
    /// Text for the result column.
    pub fn render(&self) -> String {
        match self {
            Self::Passed(value) => render_result(value),
            Self::Invalid { .. } => INVALID_RESPONSE_MARKER.to_string(),
            Self::Failed(reason) => format!("error: {reason}"),
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed(_))
    }
}

/// Compact single-line JSON, non-ASCII text kept as-is.
pub fn render_result(value: &Value) -> String {
    value.to_string()
}

/// Message from the dispatcher worker back to the UI thread.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeReport {
    pub index: usize,
    pub outcome: ExchangeOutcome,
    pub elapsed: Duration,
}

/// One table row.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub index: usize,
    pub label: String,
    pub result: Option<ExchangeOutcome>,
    /// A request for this row is queued or on the wire.
    pub in_flight: bool,
}

impl ResultRow {
    /// The result column; empty when nothing has been recorded.
    pub fn result_text(&self) -> String {
        self.result
            .as_ref()
            .map(ExchangeOutcome::render)
            .unwrap_or_default()
    }

    /// Whether the last recorded outcome carried a device result.
    pub fn is_passed(&self) -> bool {
        self.result.as_ref().is_some_and(ExchangeOutcome::is_passed)
    }
}

/// Rows for every catalog entry, in catalog order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    rows: Vec<ResultRow>,
}

impl ResultTable {
    pub fn new(catalog: &TestCatalog) -> Self {
        let rows = catalog
            .iter()
            .map(|case| ResultRow {
                index: case.index,
                label: case.label.clone(),
                result: None,
                in_flight: false,
            })
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn row(&self, index: usize) -> Option<&ResultRow> {
        self.rows.iter().find(|r| r.index == index)
    }

    fn row_mut(&mut self, index: usize) -> Option<&mut ResultRow> {
        self.rows.iter_mut().find(|r| r.index == index)
    }

    /// Flag a row as awaiting a response. Returns `false` if it already was.
    pub fn mark_in_flight(&mut self, index: usize) -> bool {
        match self.row_mut(index) {
            Some(row) if !row.in_flight => {
                row.in_flight = true;
                true
            }
            _ => false,
        }
    }

    /// Undo [`mark_in_flight`](Self::mark_in_flight) for a request that was
    /// never queued.
    pub fn cancel_in_flight(&mut self, index: usize) {
        if let Some(row) = self.row_mut(index) {
            row.in_flight = false;
        }
    }

    /// Record an outcome. Reports for unknown rows are ignored.
    pub fn apply(&mut self, report: &ExchangeReport) -> bool {
        match self.row_mut(report.index) {
            Some(row) => {
                row.in_flight = false;
                row.result = Some(report.outcome.clone());
                true
            }
            None => false,
        }
    }

    /// Empty every result column. In-flight flags are kept so a pending
    /// row still cannot be re-sent.
    pub fn clear(&mut self) {
        for row in &mut self.rows {
            row.result = None;
        }
    }

    pub fn in_flight_count(&self) -> usize {
        self.rows.iter().filter(|r| r.in_flight).count()
    }

    pub fn passed_count(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| r.is_passed())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn report(index: usize, outcome: ExchangeOutcome) -> ExchangeReport {
        ExchangeReport {
            index,
            outcome,
            elapsed: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_render_string_result_keeps_quotes() {
        let outcome = ExchangeOutcome::Passed(json!("ABC123"));
        assert_eq!(outcome.render(), "\"ABC123\"");
    }

    #[test]
    fn test_render_is_compact_and_keeps_unicode() {
        let outcome = ExchangeOutcome::Passed(json!({"ver": "1.2", "name": "测试"}));
        let text = outcome.render();
        assert!(!text.contains(' '));
        assert!(text.contains("测试"));
        assert!(!text.contains('\n'));
    }

    #[test]
    fn test_render_multiline_string_stays_on_one_line() {
        let outcome = ExchangeOutcome::Passed(json!("line1\nline2"));
        assert_eq!(outcome.render(), "\"line1\\nline2\"");
    }

    #[test]
    fn test_invalid_and_failed_markers() {
        let invalid = ExchangeOutcome::Invalid {
            raw: "not-json".into(),
        };
        assert_eq!(invalid.render(), INVALID_RESPONSE_MARKER);
        let failed = ExchangeOutcome::Failed("broken pipe".into());
        assert_eq!(failed.render(), "error: broken pipe");
    }

    #[test]
    fn test_new_table_is_empty() {
        let table = ResultTable::new(&TestCatalog::production());
        assert_eq!(table.rows().len(), 9);
        assert!(table.rows().iter().all(|r| r.result_text().is_empty()));
    }

    #[test]
    fn test_apply_writes_matching_row_only() {
        let mut table = ResultTable::new(&TestCatalog::production());
        assert!(table.apply(&report(7, ExchangeOutcome::Passed(json!("ABC123")))));

        assert_eq!(table.row(7).unwrap().result_text(), "\"ABC123\"");
        assert_eq!(table.row(6).unwrap().result_text(), "");
        assert!(!table.apply(&report(42, ExchangeOutcome::Passed(json!(1)))));
    }

    #[test]
    fn test_in_flight_is_exclusive_per_row() {
        let mut table = ResultTable::new(&TestCatalog::production());
        assert!(table.mark_in_flight(3));
        assert!(!table.mark_in_flight(3));
        assert!(table.mark_in_flight(4));
        assert_eq!(table.in_flight_count(), 2);

        table.apply(&report(3, ExchangeOutcome::Passed(json!(0))));
        assert!(table.mark_in_flight(3));
    }

    #[test]
    fn test_clear_empties_every_row() {
        let mut table = ResultTable::new(&TestCatalog::production());
        table.apply(&report(1, ExchangeOutcome::Passed(json!("ok"))));
        table.apply(&report(
            2,
            ExchangeOutcome::Invalid {
                raw: String::new(),
            },
        ));
        table.apply(&report(3, ExchangeOutcome::Failed("gone".into())));

        table.clear();

        assert!(table.rows().iter().all(|r| r.result_text().is_empty()));
        assert_eq!(table.passed_count(), 0);
    }

    #[test]
    fn test_clear_keeps_in_flight_flags() {
        let mut table = ResultTable::new(&TestCatalog::production());
        table.mark_in_flight(5);
        table.clear();
        assert!(table.row(5).unwrap().in_flight);
    }
}
