//! Run outcome types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::field::FieldDescriptor;
use crate::RunId;

/// Category of a per-field failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    ElementNotFound,
    UnsupportedAction,
    UnsupportedElementType,
    StateNotChanged,
    Dom,
}

/// One failed field, in processing order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldFailure {
    pub field_name: String,
    pub locator: String,
    pub locator_kind: String,
    pub kind: FailureKind,
    pub message: String,
}

impl FieldFailure {
    pub fn new(field: &FieldDescriptor, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            field_name: field.field_name.clone(),
            locator: field.locator.clone(),
            locator_kind: field.locator_kind.clone(),
            kind,
            message: message.into(),
        }
    }
}

/// Aggregated outcome of one orchestration pass. Immutable once returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_count: usize,
    pub success_count: usize,
    pub error_count: usize,
    pub skipped_count: usize,
    pub errors: Vec<FieldFailure>,
}

impl RunResult {
    pub fn success(&self) -> bool {
        self.error_count == 0
    }

    pub fn failures_of(&self, kind: FailureKind) -> impl Iterator<Item = &FieldFailure> {
        self.errors.iter().filter(move |f| f.kind == kind)
    }
}

/// Mutable tally used while a run is in progress.
#[derive(Debug)]
pub struct RunRecorder {
    run_id: RunId,
    started_at: DateTime<Utc>,
    total: usize,
    success: usize,
    skipped: usize,
    errors: Vec<FieldFailure>,
}

impl RunRecorder {
    pub fn start(run_id: RunId, total: usize) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            total,
            success: 0,
            skipped: 0,
            errors: Vec::new(),
        }
    }

    pub fn record_success(&mut self) {
        self.success += 1;
    }

    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    pub fn record_failure(&mut self, failure: FieldFailure) {
        self.errors.push(failure);
    }

    pub fn finish(self) -> RunResult {
        RunResult {
            run_id: self.run_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            total_count: self.total,
            success_count: self.success,
            error_count: self.errors.len(),
            skipped_count: self.skipped,
            errors: self.errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_counts_add_up() {
        let field = FieldDescriptor::new("Email", "email", "id", "x");
        let mut recorder = RunRecorder::start(RunId::new(), 3);
        recorder.record_success();
        recorder.record_skip();
        recorder.record_failure(FieldFailure::new(
            &field,
            FailureKind::ElementNotFound,
            "not found",
        ));
        let result = recorder.finish();

        assert_eq!(result.total_count, 3);
        assert_eq!(
            result.success_count + result.error_count + result.skipped_count,
            result.total_count
        );
        assert!(!result.success());
        assert_eq!(result.failures_of(FailureKind::ElementNotFound).count(), 1);
        assert_eq!(result.errors[0].field_name, "Email");
    }

    #[test]
    fn serializes_camel_case() {
        let result = RunRecorder::start(RunId::new(), 0).finish();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["totalCount"], 0);
        assert_eq!(json["skippedCount"], 0);
        assert!(json["errors"].as_array().unwrap().is_empty());
    }
}
