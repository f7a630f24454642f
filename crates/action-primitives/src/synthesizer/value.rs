//! Value assignment

use dom_adapter::{DomError, ElementHandle, EventKind, SyntheticEvent};
use stealth::Intensity;
use tracing::{debug, warn};

use super::{storm::execute_storm, DefaultSynthesizer, Sequence};
use crate::{
    errors::SynthesisError,
    types::{Gesture, SynthesisReport},
};

/// Execute value assignment
///
/// Plain and enhanced tiers walk a fixed sequence; maximum variance hands off to the storm.
/// The committed value is read back afterwards and a mismatch is logged.
pub async fn execute_apply_value(
    synth: &DefaultSynthesizer,
    el: ElementHandle,
    value: &str,
    intensity: Intensity,
) -> Result<SynthesisReport, SynthesisError> {
    debug!(element = %el, ?intensity, value_len = value.len(), "applying value");

    let mut seq = synth.sequence(el, Gesture::ApplyValue, intensity);
    match intensity {
        Intensity::Plain | Intensity::Enhanced => sequential(&mut seq, value).await?,
        Intensity::MaximumVariance => execute_storm(&mut seq, value).await?,
    }

    let committed = seq.read_value().await?;
    if committed != value {
        warn!(
            element = %el,
            expected = value,
            actual = %committed,
            "value verification failed"
        );
    }

    let report = seq.finish(Some(committed));
    debug!(
        element = %el,
        events = report.events,
        latency_ms = report.latency_ms,
        "value applied"
    );
    Ok(report)
}

async fn sequential(seq: &mut Sequence<'_>, value: &str) -> Result<(), DomError> {
    let enhanced = seq.intensity() == Intensity::Enhanced;

    if enhanced {
        seq.hover().await?;
        seq.pause().await;
    }

    seq.focus().await?;
    seq.pause().await;

    if !seq.read_value().await?.is_empty() {
        seq.select_text().await?;
        seq.pause().await;
        seq.fire(SyntheticEvent::key(EventKind::KeyDown, "Delete"))
            .await?;
        seq.set_value("").await?;
        seq.pause().await;
    }

    seq.set_value(value).await?;
    seq.fire_kind(EventKind::Input).await?;
    seq.pause().await;
    seq.fire_kind(EventKind::Change).await?;
    seq.pause().await;
    seq.fire(SyntheticEvent::input_text(value)).await?;
    seq.pause().await;

    if enhanced {
        seq.fire_kind(EventKind::KeyUp).await?;
        seq.fire_kind(EventKind::Paste).await?;
        seq.pause().await;
    }

    seq.blur().await?;
    seq.pause().await;
    Ok(())
}
