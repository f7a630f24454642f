//! Element resolver with fixed-pause retry

use crate::{errors::LocatorError, strategies::run_strategy, types::*};
use async_trait::async_trait;
use dom_adapter::DomPort;
use sheetform_core_types::LocatorKind;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Element resolver trait
#[async_trait]
pub trait ElementResolver: Send + Sync {
    /// Resolve `locator` as `kind`, retrying up to the configured attempt count
    async fn resolve(&self, locator: &str, kind: LocatorKind) -> Result<Resolution, LocatorError>;
}

/// Default resolver over a [`DomPort`]
pub struct LocatorResolver {
    dom: Arc<dyn DomPort>,
    config: ResolverConfig,
}

impl LocatorResolver {
    pub fn new(dom: Arc<dyn DomPort>) -> Self {
        Self::with_config(dom, ResolverConfig::default())
    }

    pub fn with_config(dom: Arc<dyn DomPort>, config: ResolverConfig) -> Self {
        Self { dom, config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve with an explicit attempt budget (at least one attempt is always made)
    ///
    /// Each attempt runs the kind's strategy once. Attempts are separated by
    /// `retry_pause_ms`. `NotFound` is returned only after the final attempt; if that
    /// attempt failed with a page error, the error is reported instead. Page errors that
    /// a later attempt cannot fix end the lookup at once.
    pub async fn resolve_with_attempts(
        &self,
        locator: &str,
        kind: LocatorKind,
        max_attempts: u32,
    ) -> Result<Resolution, LocatorError> {
        let locator = locator.trim();
        if locator.is_empty() {
            return Err(LocatorError::EmptyLocator);
        }
        let attempts = max_attempts.max(1);
        let pause = Duration::from_millis(self.config.retry_pause_ms);

        for attempt in 1..=attempts {
            debug!(locator, kind = %kind, attempt, "resolving element");

            match run_strategy(self.dom.as_ref(), kind, locator).await {
                Ok(Some(located)) => {
                    info!(
                        locator,
                        kind = %kind,
                        step = located.step.map(|s| s.name()).unwrap_or(kind.name()),
                        attempt,
                        element = %located.element,
                        "element resolved"
                    );
                    return Ok(Resolution {
                        element: located.element,
                        kind,
                        step: located.step,
                        attempt,
                    });
                }
                Ok(None) => {
                    debug!(locator, kind = %kind, attempt, "no match");
                }
                Err(err) if !err.is_retryable() => {
                    warn!(
                        locator,
                        kind = %kind,
                        attempt,
                        error = %err,
                        "lookup failed, not retrying"
                    );
                    return Err(LocatorError::Dom(err.to_string()));
                }
                Err(err) => {
                    warn!(locator, kind = %kind, attempt, error = %err, "lookup failed");
                    if attempt == attempts {
                        return Err(LocatorError::Dom(err.to_string()));
                    }
                }
            }

            if attempt < attempts {
                tokio::time::sleep(pause).await;
            }
        }

        warn!(locator, kind = %kind, attempts, "element not found");
        Err(LocatorError::NotFound {
            locator: locator.to_string(),
            kind,
            attempts,
        })
    }
}

#[async_trait]
impl ElementResolver for LocatorResolver {
    async fn resolve(&self, locator: &str, kind: LocatorKind) -> Result<Resolution, LocatorError> {
        self.resolve_with_attempts(locator, kind, self.config.max_attempts)
            .await
    }
}
