//! The fixed list of production test cases.

use serde::Serialize;
use serde_json::{json, Value};

/// Number of entries in the pin-mapping configuration command.
pub const PIN_MAPPING_LEN: usize = 48;

/// A named command sent to the device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestCase {
    /// 1-based position shown in the first table column.
    pub index: usize,
    pub label: String,
    pub command: Value,
}

impl TestCase {
    pub fn new(index: usize, label: impl Into<String>, command: Value) -> Self {
        Self {
            index,
            label: label.into(),
            command,
        }
    }
}

/// Ordered, immutable set of test cases.
#[derive(Debug, Clone, PartialEq)]
pub struct TestCatalog {
    cases: Vec<TestCase>,
}

impl TestCatalog {
    /// The production-test sequence, in the order the operator runs it.
    pub fn production() -> Self {
        let mapping: Vec<usize> = (0..PIN_MAPPING_LEN).collect();

        Self::from_cases(vec![
            TestCase::new(1, "Enter production test mode", json!({"PdtTest": "enter"})),
            TestCase::new(2, "I2C data collection", json!({"PdtTest": "I2C"})),
            TestCase::new(3, "ADC data test", json!({"PdtTest": "ADC"})),
            TestCase::new(4, "Query software version", json!({"PdtTest": "softver"})),
            TestCase::new(5, "Radio function test", json!({"PdtTest": "radio"})),
            TestCase::new(
                6,
                "Pin mapping configuration",
                json!({"pinMappingConfig": {"mapping": mapping}}),
            ),
            TestCase::new(7, "Query device UID", json!({"PdtTest": "uid"})),
            TestCase::new(8, "Query pin map", json!({"PdtTest": "pinMap"})),
            TestCase::new(9, "Exit production test mode", json!({"PdtTest": "exit"})),
        ])
    }

    /// Build a catalog from arbitrary cases, ordered by index.
    pub fn from_cases(mut cases: Vec<TestCase>) -> Self {
        cases.sort_by_key(|c| c.index);
        Self { cases }
    }

    pub fn get(&self, index: usize) -> Option<&TestCase> {
        self.cases.iter().find(|c| c.index == index)
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TestCase> {
        self.cases.iter()
    }
}

impl Default for TestCatalog {
    fn default() -> Self {
        Self::production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_production_catalog_order() {
        let catalog = TestCatalog::production();
        let indices: Vec<usize> = catalog.iter().map(|c| c.index).collect();
        assert_eq!(indices, (1..=9).collect::<Vec<_>>());
    }

    #[test]
    fn test_indices_are_unique() {
        let catalog = TestCatalog::production();
        let unique: HashSet<usize> = catalog.iter().map(|c| c.index).collect();
        assert_eq!(unique.len(), catalog.len());
    }

    #[test]
    fn test_pdt_commands() {
        let catalog = TestCatalog::production();
        let expected = [
            (1, "enter"),
            (2, "I2C"),
            (3, "ADC"),
            (4, "softver"),
            (5, "radio"),
            (7, "uid"),
            (8, "pinMap"),
            (9, "exit"),
        ];
        for (index, name) in expected {
            let case = catalog.get(index).unwrap();
            assert_eq!(case.command, json!({ "PdtTest": name }), "case {index}");
        }
    }

    #[test]
    fn test_pin_mapping_has_48_sequential_entries() {
        let catalog = TestCatalog::production();
        let case = catalog.get(6).unwrap();
        let mapping = case.command["pinMappingConfig"]["mapping"]
            .as_array()
            .unwrap();
        assert_eq!(mapping.len(), PIN_MAPPING_LEN);
        for (i, value) in mapping.iter().enumerate() {
            assert_eq!(value.as_u64(), Some(i as u64));
        }
    }

    #[test]
    fn test_unknown_index() {
        let catalog = TestCatalog::production();
        assert!(catalog.get(0).is_none());
        assert!(catalog.get(10).is_none());
    }

    #[test]
    fn test_from_cases_sorts_by_index() {
        let catalog = TestCatalog::from_cases(vec![
            TestCase::new(2, "b", json!({})),
            TestCase::new(1, "a", json!({})),
        ]);
        assert_eq!(catalog.cases()[0].label, "a");
    }
}
