//! Deterministic minimum event sequences

use std::sync::Arc;

use async_trait::async_trait;
use dom_adapter::{DomPort, ElementHandle, EventKind};
use stealth::{Intensity, SeededRandom, SynthesisTiming};

use crate::{
    errors::SynthesisError,
    pacing::Pacer,
    synthesizer::{EventSynthesizer, Sequence},
    types::{Gesture, SynthesisReport},
};

/// Synthesizer that ignores intensity and never pauses.
///
/// - value: set, `input`, `change`
/// - click: `mousedown`, `mouseup`, `click`
/// - clear: set empty, `input`, `change`
pub struct ScriptedSynthesizer {
    dom: Arc<dyn DomPort>,
    pacer: Pacer,
}

impl ScriptedSynthesizer {
    pub fn new(dom: Arc<dyn DomPort>) -> Self {
        Self {
            dom,
            pacer: Pacer::new(SynthesisTiming::instant(), Arc::new(SeededRandom::new(0))),
        }
    }

    fn sequence(
        &self,
        el: ElementHandle,
        gesture: Gesture,
        intensity: Intensity,
    ) -> Sequence<'_> {
        Sequence::new(self.dom.as_ref(), &self.pacer, el, gesture, intensity)
    }

    async fn assign(
        &self,
        el: ElementHandle,
        value: &str,
        gesture: Gesture,
        intensity: Intensity,
    ) -> Result<SynthesisReport, SynthesisError> {
        let mut seq = self.sequence(el, gesture, intensity);
        seq.set_value(value).await?;
        seq.fire_kind(EventKind::Input).await?;
        seq.fire_kind(EventKind::Change).await?;
        let committed = seq.read_value().await?;
        Ok(seq.finish(Some(committed)))
    }
}

#[async_trait]
impl EventSynthesizer for ScriptedSynthesizer {
    async fn apply_value(
        &self,
        el: ElementHandle,
        value: &str,
        intensity: Intensity,
    ) -> Result<SynthesisReport, SynthesisError> {
        self.assign(el, value, Gesture::ApplyValue, intensity).await
    }

    async fn click(
        &self,
        el: ElementHandle,
        intensity: Intensity,
    ) -> Result<SynthesisReport, SynthesisError> {
        let mut seq = self.sequence(el, Gesture::Click, intensity);
        seq.fire_kind(EventKind::MouseDown).await?;
        seq.fire_kind(EventKind::MouseUp).await?;
        seq.fire_kind(EventKind::Click).await?;
        Ok(seq.finish(None))
    }

    async fn clear(
        &self,
        el: ElementHandle,
        intensity: Intensity,
    ) -> Result<SynthesisReport, SynthesisError> {
        self.assign(el, "", Gesture::Clear, intensity).await
    }
}
