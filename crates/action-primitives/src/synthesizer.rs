//! Default event synthesizer
//!
//! Each gesture lives in its own module:
//! 1. value - assign a literal value (plain/enhanced sequence, storm for maximum variance)
//! 2. click - pointer and mouse sequence ending in exactly one `click`
//! 3. clear - empty the control and announce it

mod clear;
mod click;
mod storm;
mod value;

pub use clear::*;
pub use click::*;
pub use value::*;

use std::sync::Arc;

use async_trait::async_trait;
use dom_adapter::{DomError, DomPort, ElementHandle, ElementInfo, EventKind, SyntheticEvent};
use stealth::{Intensity, RandomSource, SynthesisTiming, ThreadRandom};
use tokio::time::Instant;

use crate::{
    errors::SynthesisError,
    pacing::Pacer,
    types::{Gesture, SynthesisReport},
};

/// Event synthesizer trait
///
/// Implementations are bound to one page. A value mismatch after assignment is reported
/// through [`SynthesisReport::committed`] and logged, never returned as an error.
#[async_trait]
pub trait EventSynthesizer: Send + Sync {
    /// Replace the element's value with `value`
    async fn apply_value(
        &self,
        el: ElementHandle,
        value: &str,
        intensity: Intensity,
    ) -> Result<SynthesisReport, SynthesisError>;

    /// Click the element once
    async fn click(
        &self,
        el: ElementHandle,
        intensity: Intensity,
    ) -> Result<SynthesisReport, SynthesisError>;

    /// Empty the element's value
    async fn clear(
        &self,
        el: ElementHandle,
        intensity: Intensity,
    ) -> Result<SynthesisReport, SynthesisError>;
}

/// Default implementation of the three intensity tiers
pub struct DefaultSynthesizer {
    dom: Arc<dyn DomPort>,
    pacer: Pacer,
}

impl DefaultSynthesizer {
    /// Default pacing with thread randomness
    pub fn new(dom: Arc<dyn DomPort>) -> Self {
        Self::with_pacer(
            dom,
            Pacer::new(SynthesisTiming::default(), Arc::new(ThreadRandom)),
        )
    }

    pub fn with_pacer(dom: Arc<dyn DomPort>, pacer: Pacer) -> Self {
        Self { dom, pacer }
    }

    pub fn dom(&self) -> &dyn DomPort {
        self.dom.as_ref()
    }

    pub fn pacer(&self) -> &Pacer {
        &self.pacer
    }

    pub(crate) fn sequence(
        &self,
        el: ElementHandle,
        gesture: Gesture,
        intensity: Intensity,
    ) -> Sequence<'_> {
        Sequence::new(self.dom.as_ref(), &self.pacer, el, gesture, intensity)
    }
}

#[async_trait]
impl EventSynthesizer for DefaultSynthesizer {
    async fn apply_value(
        &self,
        el: ElementHandle,
        value: &str,
        intensity: Intensity,
    ) -> Result<SynthesisReport, SynthesisError> {
        execute_apply_value(self, el, value, intensity).await
    }

    async fn click(
        &self,
        el: ElementHandle,
        intensity: Intensity,
    ) -> Result<SynthesisReport, SynthesisError> {
        execute_click(self, el, intensity).await
    }

    async fn clear(
        &self,
        el: ElementHandle,
        intensity: Intensity,
    ) -> Result<SynthesisReport, SynthesisError> {
        execute_clear(self, el, intensity).await
    }
}

/// One gesture in progress: counts dispatched events and paces steps
pub(crate) struct Sequence<'a> {
    dom: &'a dyn DomPort,
    pacer: &'a Pacer,
    el: ElementHandle,
    gesture: Gesture,
    intensity: Intensity,
    events: u32,
    started: Instant,
}

impl<'a> Sequence<'a> {
    pub(crate) fn new(
        dom: &'a dyn DomPort,
        pacer: &'a Pacer,
        el: ElementHandle,
        gesture: Gesture,
        intensity: Intensity,
    ) -> Self {
        Self {
            dom,
            pacer,
            el,
            gesture,
            intensity,
            events: 0,
            started: Instant::now(),
        }
    }

    pub(crate) fn element(&self) -> ElementHandle {
        self.el
    }

    pub(crate) fn intensity(&self) -> Intensity {
        self.intensity
    }

    pub(crate) fn random(&self) -> &dyn RandomSource {
        self.pacer.random()
    }

    pub(crate) fn timing(&self) -> &SynthesisTiming {
        self.pacer.timing()
    }

    pub(crate) async fn fire(&mut self, event: SyntheticEvent) -> Result<(), DomError> {
        self.dom.dispatch(self.el, event).await?;
        self.events += 1;
        Ok(())
    }

    pub(crate) async fn fire_kind(&mut self, kind: EventKind) -> Result<(), DomError> {
        self.fire(SyntheticEvent::new(kind)).await
    }

    pub(crate) async fn pause(&self) {
        self.pacer.step(self.intensity).await;
    }

    pub(crate) async fn micro(&self) {
        self.pacer.micro().await;
    }

    /// Pointer offset somewhere inside a typical control.
    pub(crate) fn offset(&self) -> (f64, f64) {
        let rng = self.pacer.random();
        (rng.next_in(2, 24) as f64, rng.next_in(2, 12) as f64)
    }

    pub(crate) async fn focus(&mut self) -> Result<(), DomError> {
        self.dom.focus(self.el).await?;
        self.fire_kind(EventKind::Focus).await
    }

    pub(crate) async fn blur(&mut self) -> Result<(), DomError> {
        self.dom.blur(self.el).await?;
        self.fire_kind(EventKind::Blur).await
    }

    pub(crate) async fn hover(&mut self) -> Result<(), DomError> {
        let (x, y) = self.offset();
        for kind in [
            EventKind::PointerOver,
            EventKind::PointerEnter,
            EventKind::MouseOver,
            EventKind::MouseEnter,
        ] {
            self.fire(SyntheticEvent::new(kind).at(x, y)).await?;
        }
        Ok(())
    }

    pub(crate) async fn select_text(&self) -> Result<(), DomError> {
        self.dom.select_text(self.el).await
    }

    pub(crate) async fn set_value(&self, value: &str) -> Result<(), DomError> {
        self.dom.set_value(self.el, value).await
    }

    pub(crate) async fn describe(&self) -> Result<ElementInfo, DomError> {
        self.dom.describe(self.el).await
    }

    pub(crate) async fn read_value(&self) -> Result<String, DomError> {
        Ok(self.describe().await?.value)
    }

    pub(crate) fn finish(self, committed: Option<String>) -> SynthesisReport {
        SynthesisReport {
            gesture: self.gesture,
            intensity: self.intensity,
            events: self.events,
            committed,
            latency_ms: self.started.elapsed().as_millis() as u64,
        }
    }
}
