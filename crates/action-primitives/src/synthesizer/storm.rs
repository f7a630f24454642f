//! Maximum-variance event storm

use dom_adapter::{DomError, EventKind, SyntheticEvent};
use stealth::shuffle;
use tracing::debug;

use super::Sequence;

/// Families of events mixed into a storm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StormGroup {
    Pointer,
    Keyboard,
    Focus,
    Paste,
    Validation,
}

impl StormGroup {
    const ALL: [StormGroup; 5] = [
        StormGroup::Pointer,
        StormGroup::Keyboard,
        StormGroup::Focus,
        StormGroup::Paste,
        StormGroup::Validation,
    ];

    /// Groups that may appear a second time
    const REPEATABLE: [StormGroup; 3] =
        [StormGroup::Pointer, StormGroup::Keyboard, StormGroup::Paste];

    fn events(self, value: &str, (x, y): (f64, f64)) -> Vec<SyntheticEvent> {
        match self {
            StormGroup::Pointer => vec![
                SyntheticEvent::new(EventKind::MouseMove).at(x, y),
                SyntheticEvent::new(EventKind::PointerOver).at(x, y),
                SyntheticEvent::new(EventKind::MouseOver).at(x, y),
            ],
            StormGroup::Keyboard => {
                let key = value
                    .chars()
                    .last()
                    .map(String::from)
                    .unwrap_or_else(|| "Unidentified".to_string());
                vec![
                    SyntheticEvent::key(EventKind::KeyDown, key.clone()),
                    SyntheticEvent::key(EventKind::KeyPress, key.clone()),
                    SyntheticEvent::key(EventKind::KeyUp, key),
                ]
            }
            StormGroup::Focus => vec![
                SyntheticEvent::new(EventKind::FocusIn),
                SyntheticEvent::new(EventKind::Focus),
            ],
            StormGroup::Paste => vec![
                SyntheticEvent::new(EventKind::Paste),
                SyntheticEvent::input_text(value),
            ],
            StormGroup::Validation => vec![
                SyntheticEvent::new(EventKind::Input),
                SyntheticEvent::new(EventKind::Change),
            ],
        }
    }
}

/// Commit `value`, then dispatch a shuffled mix of event groups.
///
/// The validation group is always present, so at least one `input` and one `change` reach
/// the element. Events never touch the committed value themselves.
pub(super) async fn execute_storm(seq: &mut Sequence<'_>, value: &str) -> Result<(), DomError> {
    seq.focus().await?;
    seq.set_value(value).await?;

    let mut groups = StormGroup::ALL.to_vec();
    for extra in StormGroup::REPEATABLE {
        if seq.random().chance(0.5) {
            groups.push(extra);
        }
    }
    shuffle(seq.random(), &mut groups);
    debug!(element = %seq.element(), groups = groups.len(), "dispatching event storm");

    for group in groups {
        for event in group.events(value, seq.offset()) {
            seq.fire(event).await?;
            if seq.random().chance(0.5) {
                seq.micro().await;
            }
        }
    }

    let decoy_probability = seq.timing().decoy_probability;
    if seq.random().chance(decoy_probability) {
        decoy(seq).await?;
    }

    seq.micro().await;
    seq.blur().await
}

/// Stray pointer movement, plus a click when the click has no default action to run.
async fn decoy(seq: &mut Sequence<'_>) -> Result<(), DomError> {
    let (x, y) = seq.offset();
    seq.fire(SyntheticEvent::new(EventKind::MouseMove).at(x + 3.0, y + 2.0))
        .await?;
    seq.micro().await;

    let info = seq.describe().await?;
    if !info.has_click_activation() {
        seq.fire(SyntheticEvent::new(EventKind::Click).at(x, y))
            .await?;
    }
    Ok(())
}
