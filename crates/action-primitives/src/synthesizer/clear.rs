//! Clear gesture

use dom_adapter::{ElementHandle, EventKind};
use stealth::Intensity;
use tracing::{debug, warn};

use super::DefaultSynthesizer;
use crate::{
    errors::SynthesisError,
    types::{Gesture, SynthesisReport},
};

/// Execute clear: focus, select, empty, `input`, `change`, blur
pub async fn execute_clear(
    synth: &DefaultSynthesizer,
    el: ElementHandle,
    intensity: Intensity,
) -> Result<SynthesisReport, SynthesisError> {
    debug!(element = %el, ?intensity, "clearing element");

    let mut seq = synth.sequence(el, Gesture::Clear, intensity);
    seq.focus().await?;
    seq.pause().await;
    seq.select_text().await?;
    seq.set_value("").await?;
    seq.fire_kind(EventKind::Input).await?;
    seq.fire_kind(EventKind::Change).await?;
    seq.pause().await;
    seq.blur().await?;

    let committed = seq.read_value().await?;
    if !committed.is_empty() {
        warn!(element = %el, actual = %committed, "element not empty after clear");
    }
    Ok(seq.finish(Some(committed)))
}
