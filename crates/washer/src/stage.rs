//! Ordered washer stages.
//!
//! The table is fixed once built: stage order comes from the input order and
//! every stage's `next` points at its successor, the last one at nothing.

use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, WasherError},
    types::ColorRange,
};

/// Serializable description of one stage, as found in configuration files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StageSpec {
    pub id: String,
    #[serde(flatten)]
    pub range: ColorRange,
    /// Reopen the camera after this stage is confirmed
    #[serde(default)]
    pub reinitialize_after: bool,
    /// Require exactly this many circles before confirming; any number if absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_count: Option<usize>,
}

impl StageSpec {
    pub fn new(id: impl Into<String>, range: ColorRange) -> Self {
        Self {
            id: id.into(),
            range,
            reinitialize_after: false,
            expected_count: None,
        }
    }

    pub fn reinitialize_after(mut self) -> Self {
        self.reinitialize_after = true;
        self
    }

    pub fn expecting(mut self, count: usize) -> Self {
        self.expected_count = Some(count);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WasherStage {
    pub id: String,
    pub range: ColorRange,
    pub next: Option<String>,
    pub reinitialize_after: bool,
    pub expected_count: Option<usize>,
}

impl WasherStage {
    /// Whether a frame with `count` circles confirms this stage
    pub fn accepts(&self, count: usize) -> bool {
        match self.expected_count {
            Some(expected) => count == expected,
            None => count > 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageTable {
    stages: Vec<WasherStage>,
}

impl StageTable {
    pub fn new(specs: Vec<StageSpec>) -> Result<Self> {
        if specs.is_empty() {
            return Err(WasherError::InvalidStageTable(
                "at least one stage is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for spec in &specs {
            if spec.id.trim().is_empty() {
                return Err(WasherError::InvalidStageTable(
                    "stage ids must not be empty".to_string(),
                ));
            }
            if !seen.insert(spec.id.as_str()) {
                return Err(WasherError::InvalidStageTable(format!(
                    "duplicate stage id '{}'",
                    spec.id
                )));
            }
            if spec.expected_count == Some(0) {
                return Err(WasherError::InvalidStageTable(format!(
                    "stage '{}' expects zero washers",
                    spec.id
                )));
            }
        }

        let next_ids: Vec<Option<String>> = specs
            .iter()
            .skip(1)
            .map(|s| Some(s.id.clone()))
            .chain(std::iter::once(None))
            .collect();

        let stages = specs
            .into_iter()
            .zip(next_ids)
            .map(|(spec, next)| WasherStage {
                id: spec.id,
                range: spec.range,
                next,
                reinitialize_after: spec.reinitialize_after,
                expected_count: spec.expected_count,
            })
            .collect();

        Ok(Self { stages })
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&WasherStage> {
        self.stages.get(index)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.id == id)
    }

    /// Index of the stage following `index`, if any
    pub fn next_index(&self, index: usize) -> Option<usize> {
        self.stages
            .get(index)
            .and_then(|s| s.next.as_deref())
            .and_then(|id| self.position(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &WasherStage> {
        self.stages.iter()
    }

    pub fn specs(&self) -> Vec<StageSpec> {
        self.stages
            .iter()
            .map(|s| StageSpec {
                id: s.id.clone(),
                range: s.range,
                reinitialize_after: s.reinitialize_after,
                expected_count: s.expected_count,
            })
            .collect()
    }
}

/// Ranges used on the assembly station
pub mod ranges {
    use crate::types::ColorRange;

    pub fn blue() -> ColorRange {
        ColorRange::from_ordered_bounds([100, 150, 50], [140, 255, 255])
    }

    pub fn teal() -> ColorRange {
        ColorRange::from_ordered_bounds([90, 50, 50], [105, 255, 150])
    }

    pub fn deep_teal() -> ColorRange {
        ColorRange::from_ordered_bounds([60, 50, 50], [95, 255, 255])
    }

    pub fn red() -> ColorRange {
        ColorRange::from_ordered_bounds([0, 150, 50], [10, 255, 255])
    }
}

/// Blue, teal, red; the camera is reopened after blue
pub fn station_stages() -> Vec<StageSpec> {
    vec![
        StageSpec::new("blue", ranges::blue()).reinitialize_after(),
        StageSpec::new("teal", ranges::teal()),
        StageSpec::new("red", ranges::red()),
    ]
}

/// Blue, deep teal, red with no camera reopen
pub fn bench_stages() -> Vec<StageSpec> {
    vec![
        StageSpec::new("blue", ranges::blue()),
        StageSpec::new("deep_teal", ranges::deep_teal()),
        StageSpec::new("red", ranges::red()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_pointers_follow_order() {
        let table = StageTable::new(station_stages()).unwrap();
        let next: Vec<Option<&str>> = table.iter().map(|s| s.next.as_deref()).collect();
        assert_eq!(next, vec![Some("teal"), Some("red"), None]);
        assert_eq!(table.next_index(0), Some(1));
        assert_eq!(table.next_index(2), None);
    }

    #[test]
    fn test_reinitialize_flag_only_on_blue() {
        let table = StageTable::new(station_stages()).unwrap();
        let flags: Vec<bool> = table.iter().map(|s| s.reinitialize_after).collect();
        assert_eq!(flags, vec![true, false, false]);
    }

    #[test]
    fn test_rejects_empty_and_duplicate_tables() {
        assert!(matches!(
            StageTable::new(vec![]),
            Err(WasherError::InvalidStageTable(_))
        ));

        let dup = vec![
            StageSpec::new("blue", ranges::blue()),
            StageSpec::new("blue", ranges::red()),
        ];
        assert!(matches!(
            StageTable::new(dup),
            Err(WasherError::InvalidStageTable(_))
        ));

        let blank = vec![StageSpec::new("  ", ranges::blue())];
        assert!(StageTable::new(blank).is_err());

        let zero = vec![StageSpec::new("blue", ranges::blue()).expecting(0)];
        assert!(StageTable::new(zero).is_err());
    }

    #[test]
    fn test_accepts_presence_or_exact_count() {
        let table = StageTable::new(vec![
            StageSpec::new("blue", ranges::blue()),
            StageSpec::new("red", ranges::red()).expecting(2),
        ])
        .unwrap();

        let blue = table.get(0).unwrap();
        assert!(!blue.accepts(0));
        assert!(blue.accepts(1));
        assert!(blue.accepts(3));

        let red = table.get(1).unwrap();
        assert!(!red.accepts(1));
        assert!(red.accepts(2));
        assert!(!red.accepts(3));
    }

    #[test]
    fn test_stage_round_trip_through_json() {
        let spec = StageSpec::new("teal", ranges::teal()).reinitialize_after();
        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains("\"lower\":[90,50,50]"));
        let back: StageSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
    }
}
