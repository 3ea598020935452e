// crates/certify-core/src/runtime/differ.rs
// ============================================================================
// Module: Record Differ
// Description: Compares expected records against mapped actual records.
// Purpose: Produce a complete, human-readable diff instead of a bare boolean.
// Dependencies: serde_json
// ============================================================================

//! ## Overview
//! [`RecordDiffer`] compares two record sequences under an ordering contract
//! declared by the mapper:
//! - `Ordered`: records are compared position by position.
//! - `Unordered`: records are compared as multisets. When the stream declares
//!   a primary key, records are paired by key so that changed rows show up as
//!   field-level mismatches rather than a missing/unexpected pair.
//!
//! The diff lists missing records, unexpected records, and mismatched pairs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde_json::Map;
use serde_json::Value;

use crate::core::OutputRecord;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Whether record order is significant when comparing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordOrdering {
    /// Records compare as a multiset.
    #[default]
    Unordered,
    /// Records compare position by position.
    Ordered,
}

/// One differing field within a paired record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDiff {
    /// Dotted field path (`data.id`, `generation_id`, ...).
    pub path: String,
    /// Expected value (`None` when absent).
    pub expected: Option<Value>,
    /// Actual value (`None` when absent).
    pub actual: Option<Value>,
}

/// Paired expected/actual records that differ.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMismatch {
    /// Expected record.
    pub expected: OutputRecord,
    /// Actual (mapped) record.
    pub actual: OutputRecord,
    /// Differing fields.
    pub fields: Vec<FieldDiff>,
}

/// Complete comparison result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordDiff {
    /// Expected records with no counterpart.
    pub missing: Vec<OutputRecord>,
    /// Actual records with no counterpart.
    pub unexpected: Vec<OutputRecord>,
    /// Paired records with differing fields.
    pub mismatched: Vec<RecordMismatch>,
}

impl RecordDiff {
    /// Returns true when both sides agree.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty() && self.mismatched.is_empty()
    }
}

impl fmt::Display for RecordDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("records match");
        }
        for record in &self.missing {
            writeln!(f, "missing record (expected but not found): {record}")?;
        }
        for record in &self.unexpected {
            writeln!(f, "unexpected record (found but not expected): {record}")?;
        }
        for mismatch in &self.mismatched {
            writeln!(f, "mismatched record:")?;
            writeln!(f, "  expected: {}", mismatch.expected)?;
            writeln!(f, "  actual:   {}", mismatch.actual)?;
            for field in &mismatch.fields {
                writeln!(
                    f,
                    "  {}: expected {} but was {}",
                    field.path,
                    render(field.expected.as_ref()),
                    render(field.actual.as_ref())
                )?;
            }
        }
        Ok(())
    }
}

/// Renders an optional value for diff output.
fn render(value: Option<&Value>) -> String {
    value.map_or_else(|| "<absent>".to_string(), ToString::to_string)
}

// ============================================================================
// SECTION: Differ
// ============================================================================

/// Compares expected and actual record sequences.
#[derive(Debug, Clone, Default)]
pub struct RecordDiffer {
    /// Top-level data fields forming the primary key.
    primary_key: Vec<String>,
    /// Ordering contract.
    ordering: RecordOrdering,
}

impl RecordDiffer {
    /// Creates a differ.
    #[must_use]
    pub const fn new(primary_key: Vec<String>, ordering: RecordOrdering) -> Self {
        Self {
            primary_key,
            ordering,
        }
    }

    /// Diffs expected against actual.
    #[must_use]
    pub fn diff(&self, expected: &[OutputRecord], actual: &[OutputRecord]) -> RecordDiff {
        match self.ordering {
            RecordOrdering::Ordered => diff_ordered(expected, actual),
            RecordOrdering::Unordered if self.primary_key.is_empty() => {
                diff_multiset(expected, actual)
            }
            RecordOrdering::Unordered => self.diff_keyed(expected, actual),
        }
    }

    /// Pairs records by primary key, then falls back to multiset matching for
    /// the records left over.
    fn diff_keyed(&self, expected: &[OutputRecord], actual: &[OutputRecord]) -> RecordDiff {
        let mut diff = RecordDiff::default();
        let mut claimed = vec![false; actual.len()];
        let mut unpaired = Vec::new();
        for want in expected {
            let key = self.key_of(want);
            let partner = actual
                .iter()
                .enumerate()
                .find(|(index, got)| !claimed[*index] && self.key_of(got) == key);
            match partner {
                Some((index, got)) => {
                    claimed[index] = true;
                    if want != got {
                        diff.mismatched.push(mismatch(want, got));
                    }
                }
                None => unpaired.push(want.clone()),
            }
        }
        let leftovers: Vec<OutputRecord> = actual
            .iter()
            .zip(claimed)
            .filter(|(_, taken)| !taken)
            .map(|(record, _)| record.clone())
            .collect();
        let rest = diff_multiset(&unpaired, &leftovers);
        diff.missing = rest.missing;
        diff.unexpected = rest.unexpected;
        diff
    }

    /// Extracts the primary key values of a record.
    fn key_of(&self, record: &OutputRecord) -> Vec<Option<Value>> {
        self.primary_key.iter().map(|field| record.data.get(field).cloned()).collect()
    }
}

/// Position-by-position comparison.
fn diff_ordered(expected: &[OutputRecord], actual: &[OutputRecord]) -> RecordDiff {
    let mut diff = RecordDiff::default();
    for (want, got) in expected.iter().zip(actual) {
        if want != got {
            diff.mismatched.push(mismatch(want, got));
        }
    }
    diff.missing.extend(expected.iter().skip(actual.len()).cloned());
    diff.unexpected.extend(actual.iter().skip(expected.len()).cloned());
    diff
}

/// Multiset comparison: every expected record consumes one equal actual record.
fn diff_multiset(expected: &[OutputRecord], actual: &[OutputRecord]) -> RecordDiff {
    let mut diff = RecordDiff::default();
    let mut claimed = vec![false; actual.len()];
    for want in expected {
        let partner =
            actual.iter().enumerate().position(|(index, got)| !claimed[index] && got == want);
        match partner {
            Some(index) => claimed[index] = true,
            None => diff.missing.push(want.clone()),
        }
    }
    diff.unexpected = actual
        .iter()
        .zip(claimed)
        .filter(|(_, taken)| !taken)
        .map(|(record, _)| record.clone())
        .collect();
    diff
}

/// Builds a mismatch entry with field-level differences.
fn mismatch(expected: &OutputRecord, actual: &OutputRecord) -> RecordMismatch {
    RecordMismatch {
        expected: expected.clone(),
        actual: actual.clone(),
        fields: field_diffs(expected, actual),
    }
}

/// Lists differing fields between two records.
fn field_diffs(expected: &OutputRecord, actual: &OutputRecord) -> Vec<FieldDiff> {
    let mut fields = Vec::new();
    let mut push = |path: &str, want: Option<Value>, got: Option<Value>| {
        if want != got {
            fields.push(FieldDiff {
                path: path.to_string(),
                expected: want,
                actual: got,
            });
        }
    };
    push(
        "extracted_at_ms",
        Some(Value::from(expected.extracted_at_ms)),
        Some(Value::from(actual.extracted_at_ms)),
    );
    push(
        "generation_id",
        expected.generation_id.map(Value::from),
        actual.generation_id.map(Value::from),
    );
    push(
        "loaded_at_ms",
        expected.loaded_at_ms.map(Value::from),
        actual.loaded_at_ms.map(Value::from),
    );
    push(
        "meta",
        expected.meta.as_ref().and_then(|meta| serde_json::to_value(meta).ok()),
        actual.meta.as_ref().and_then(|meta| serde_json::to_value(meta).ok()),
    );
    match (expected.data.as_object(), actual.data.as_object()) {
        (Some(want), Some(got)) => data_field_diffs(want, got, &mut push),
        _ => push("data", Some(expected.data.clone()), Some(actual.data.clone())),
    }
    fields
}

/// Compares data objects key by key over the union of their keys.
fn data_field_diffs(
    want: &Map<String, Value>,
    got: &Map<String, Value>,
    push: &mut impl FnMut(&str, Option<Value>, Option<Value>),
) {
    let mut keys: Vec<&String> = want.keys().chain(got.keys()).collect();
    keys.sort();
    keys.dedup();
    for key in keys {
        push(&format!("data.{key}"), want.get(key).cloned(), got.get(key).cloned());
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
