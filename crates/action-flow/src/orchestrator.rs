//! Run orchestration
//!
//! One run walks the field list in order: eligibility, resolve, prepare and highlight,
//! dispatch, then the trigger's pacing delay. A failing field is recorded and the loop moves
//! on; only a malformed input or a concurrent request ends a run early.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use action_locator::{ElementResolver, LocatorResolver};
use action_primitives::{DefaultSynthesizer, EventSynthesizer, Pacer};
use dom_adapter::DomPort;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sheetform_core_types::{FieldDescriptor, FieldFailure, RunId, RunRecorder, RunResult, Trigger};
use stealth::TimingPolicy;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::EngineConfig;
use crate::dispatcher::ActionDispatcher;
use crate::errors::{FieldError, FillError};

/// Observable orchestrator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Idle,
    Running,
}

/// Releases the busy flag when a run ends, however it ends
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Sequential form filler bound to one page
pub struct Orchestrator {
    resolver: Arc<dyn ElementResolver>,
    dispatcher: ActionDispatcher,
    timing: TimingPolicy,
    busy: AtomicBool,
}

impl Orchestrator {
    /// Default synthesizer, paced by `config.synthesis` and sharing the timing RNG
    pub fn new(dom: Arc<dyn DomPort>, config: &EngineConfig) -> Self {
        let timing = TimingPolicy::new(config.timing.clone());
        let pacer = Pacer::new(config.synthesis.clone(), timing.random());
        let synthesizer = Arc::new(DefaultSynthesizer::with_pacer(Arc::clone(&dom), pacer));
        Self::with_timing(dom, synthesizer, timing, config)
    }

    pub fn with_synthesizer(
        dom: Arc<dyn DomPort>,
        synthesizer: Arc<dyn EventSynthesizer>,
        config: &EngineConfig,
    ) -> Self {
        let timing = TimingPolicy::new(config.timing.clone());
        Self::with_timing(dom, synthesizer, timing, config)
    }

    fn with_timing(
        dom: Arc<dyn DomPort>,
        synthesizer: Arc<dyn EventSynthesizer>,
        timing: TimingPolicy,
        config: &EngineConfig,
    ) -> Self {
        let resolver = Arc::new(LocatorResolver::with_config(
            Arc::clone(&dom),
            config.resolver.clone(),
        ));
        let dispatcher = ActionDispatcher::with_config(dom, synthesizer, config);
        Self::from_parts(resolver, dispatcher, timing)
    }

    pub fn from_parts(
        resolver: Arc<dyn ElementResolver>,
        dispatcher: ActionDispatcher,
        timing: TimingPolicy,
    ) -> Self {
        Self {
            resolver,
            dispatcher,
            timing,
            busy: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> RunState {
        if self.busy.load(Ordering::Acquire) {
            RunState::Running
        } else {
            RunState::Idle
        }
    }

    /// Fill every field in order and report the tally
    ///
    /// Fails only with [`FillError::AlreadyInProgress`]; per-field problems land in the
    /// returned [`RunResult`].
    pub async fn run(&self, fields: &[FieldDescriptor]) -> Result<RunResult, FillError> {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            warn!("fill request rejected, a run is already in progress");
            return Err(FillError::AlreadyInProgress);
        };

        let run_id = RunId::new();
        let span = info_span!("fill_run", run_id = %run_id, fields = fields.len());
        Ok(self.run_fields(run_id, fields).instrument(span).await)
    }

    /// Like [`run`](Self::run), for input that has not been typed yet
    ///
    /// The input must be an array. Entries that are not objects, or do not deserialize,
    /// become empty descriptors and are skipped as invalid.
    pub async fn run_value(&self, input: &Value) -> Result<RunResult, FillError> {
        let fields = parse_field_list(input)?;
        self.run(&fields).await
    }

    async fn run_fields(&self, run_id: RunId, fields: &[FieldDescriptor]) -> RunResult {
        info!(total = fields.len(), "fill run started");
        let mut recorder = RunRecorder::start(run_id, fields.len());

        for (index, field) in fields.iter().enumerate() {
            let position = index + 1;
            if let Err(reason) = field.eligibility() {
                info!(position, field = %field.field_name, %reason, "field skipped");
                recorder.record_skip();
                continue;
            }

            let trigger = field.trigger();
            match self.fill_field(field, &trigger).await {
                Ok(()) => {
                    recorder.record_success();
                    let delay = self.timing.delay_for(&trigger);
                    info!(
                        position,
                        field = %field.field_name,
                        delay_ms = delay.as_millis() as u64,
                        "field filled"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    warn!(
                        position,
                        field = %field.field_name,
                        locator = %field.locator,
                        error = %err,
                        "field failed"
                    );
                    recorder.record_failure(FieldFailure::new(
                        field,
                        err.failure_kind(),
                        err.to_string(),
                    ));
                }
            }
        }

        let result = recorder.finish();
        info!(
            success = result.success_count,
            errors = result.error_count,
            skipped = result.skipped_count,
            "fill run completed"
        );
        result
    }

    async fn fill_field(&self, field: &FieldDescriptor, trigger: &Trigger) -> Result<(), FieldError> {
        let resolution = self.resolver.resolve(&field.locator, field.kind()).await?;
        let el = resolution.element;

        self.dispatcher.prepare(el).await?;
        self.dispatcher.highlight(el).await;

        let intensity = self.timing.intensity_for(trigger);
        debug!(element = %el, %trigger, ?intensity, "performing action");
        self.dispatcher.perform(el, field, intensity).await?;
        Ok(())
    }
}

/// Field descriptors from wire input; only a non-array is rejected
pub fn parse_field_list(input: &Value) -> Result<Vec<FieldDescriptor>, FillError> {
    let Some(items) = input.as_array() else {
        return Err(FillError::MalformedFieldList(format!(
            "expected an array of fields, got {}",
            json_type(input)
        )));
    };

    Ok(items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            if !item.is_object() {
                debug!(index, kind = json_type(item), "field entry is not an object");
                return FieldDescriptor::default();
            }
            FieldDescriptor::deserialize(item).unwrap_or_else(|err| {
                debug!(index, error = %err, "field entry does not deserialize");
                FieldDescriptor::default()
            })
        })
        .collect())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_non_array_input_is_malformed() {
        let err = parse_field_list(&json!({"fieldName": "x"})).unwrap_err();
        assert_eq!(
            err,
            FillError::MalformedFieldList("expected an array of fields, got an object".into())
        );
    }

    #[test]
    fn test_bad_entries_become_invalid_fields() {
        let fields = parse_field_list(&json!([
            "not a field",
            {"fieldName": "Email", "selector": "email", "selectorType": "id", "value": "a@b.c"},
            {"fieldName": 7}
        ]))
        .unwrap();
        assert_eq!(fields.len(), 3);
        assert!(fields[0].eligibility().unwrap_err().is_invalid());
        assert!(fields[1].eligibility().is_ok());
        assert!(fields[2].eligibility().unwrap_err().is_invalid());
    }

    #[test]
    fn test_busy_guard_releases_on_drop() {
        let flag = AtomicBool::new(false);
        let guard = BusyGuard::acquire(&flag).unwrap();
        assert!(BusyGuard::acquire(&flag).is_none());
        drop(guard);
        assert!(BusyGuard::acquire(&flag).is_some());
    }
}
