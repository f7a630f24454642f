//! Click gesture

use dom_adapter::{ElementHandle, EventKind, SyntheticEvent};
use stealth::Intensity;
use tracing::debug;

use super::DefaultSynthesizer;
use crate::{
    errors::SynthesisError,
    types::{Gesture, SynthesisReport},
};

/// Execute click
///
/// Every tier dispatches exactly one `click`, so a checkbox toggles at most once.
/// - plain: focus, `mousedown`, `mouseup`, `click`
/// - enhanced: hover first, `pointerdown`/`pointerup` alongside the mouse buttons
/// - maximum variance: enhanced plus stray movement before and a `mousemove` after
pub async fn execute_click(
    synth: &DefaultSynthesizer,
    el: ElementHandle,
    intensity: Intensity,
) -> Result<SynthesisReport, SynthesisError> {
    debug!(element = %el, ?intensity, "clicking element");

    let mut seq = synth.sequence(el, Gesture::Click, intensity);
    let variance = intensity == Intensity::MaximumVariance;
    let pointer = intensity != Intensity::Plain;

    if variance {
        let moves = seq.random().next_in(1, 3);
        for _ in 0..moves {
            let (x, y) = seq.offset();
            seq.fire(SyntheticEvent::new(EventKind::MouseMove).at(x, y))
                .await?;
            seq.micro().await;
        }
    }

    if pointer {
        seq.hover().await?;
        seq.pause().await;
    }

    seq.focus().await?;
    seq.pause().await;

    let (x, y) = seq.offset();
    if pointer {
        seq.fire(SyntheticEvent::new(EventKind::PointerDown).at(x, y))
            .await?;
    }
    seq.fire(SyntheticEvent::new(EventKind::MouseDown).at(x, y))
        .await?;
    seq.pause().await;

    if pointer {
        seq.fire(SyntheticEvent::new(EventKind::PointerUp).at(x, y))
            .await?;
    }
    seq.fire(SyntheticEvent::new(EventKind::MouseUp).at(x, y))
        .await?;
    seq.pause().await;

    seq.fire(SyntheticEvent::new(EventKind::Click).at(x, y))
        .await?;

    if variance {
        seq.micro().await;
        let (dx, dy) = seq.offset();
        seq.fire(SyntheticEvent::new(EventKind::MouseMove).at(x + dx, y + dy))
            .await?;
    }

    Ok(seq.finish(None))
}
