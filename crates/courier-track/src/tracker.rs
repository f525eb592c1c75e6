//! Fallback orchestrator.
//!
//! Walks a courier's chain strictly in order. The first strategy whose
//! normalized output has at least one event wins and the rest are never
//! invoked. Strategy failures only advance the chain; they never reach the
//! caller. The whole walk is bounded by the registry's aggregate deadline,
//! and dropping the returned future cancels the in-flight upstream call.

use std::sync::Arc;

use crate::classify::classify;
use crate::error::{TrackError, TrackResult};
use crate::normalize::Normalized;
use crate::registry::{CourierEntry, Registry};
use crate::types::{TrackingRequest, TrackingResult, TrackingSuccess};

/// Where a chain walk ended.
#[derive(Debug)]
enum Outcome {
    Succeeded { index: usize, normalized: Normalized },
    Exhausted,
}

/// Resolves tracking requests against a shared [`Registry`].
#[derive(Debug, Clone)]
pub struct Tracker {
    registry: Arc<Registry>,
}

impl Tracker {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Resolve and render the result for the wire. Never fails.
    pub async fn track(&self, courier_id: &str, tracking_number: &str) -> TrackingResult {
        self.resolve(&TrackingRequest::new(courier_id, tracking_number))
            .await
            .into()
    }

    /// Resolve a request. Input validation and courier lookup happen before
    /// any network I/O.
    pub async fn resolve(&self, request: &TrackingRequest) -> TrackResult<TrackingSuccess> {
        if request.courier_id.is_empty() || request.tracking_number.is_empty() {
            return Err(TrackError::MissingNumber);
        }
        let courier = self
            .registry
            .lookup(&request.courier_id)
            .ok_or_else(|| TrackError::UnknownCourier(request.courier_id.clone()))?;

        let number = request.tracking_number.as_str();
        let walk = walk_chain(&courier, number);
        let outcome = match tokio::time::timeout(self.registry.deadline(), walk).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(
                    courier = %courier.id,
                    number,
                    deadline_ms = self.registry.deadline().as_millis() as u64,
                    "Tracking deadline exceeded"
                );
                return Err(TrackError::DeadlineExceeded {
                    courier: courier.id.clone(),
                    message: courier.unavailable_message.clone(),
                });
            }
        };

        match outcome {
            Outcome::Succeeded { index, normalized } => {
                tracing::info!(
                    courier = %courier.id,
                    number,
                    strategy = index,
                    events = normalized.events.len(),
                    "Tracking resolved"
                );
                Ok(assemble(&courier, number, normalized))
            }
            Outcome::Exhausted => {
                tracing::warn!(courier = %courier.id, number, "All tracking strategies exhausted");
                Err(TrackError::Exhausted {
                    courier: courier.id.clone(),
                    message: courier.unavailable_message.clone(),
                })
            }
        }
    }
}

async fn walk_chain(courier: &CourierEntry, number: &str) -> Outcome {
    for (index, step) in courier.steps.iter().enumerate() {
        let kind = step.strategy.kind();
        let payload = match step.strategy.fetch(number).await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::debug!(courier = %courier.id, strategy = index, %kind, error = %e, "Strategy failed");
                continue;
            }
        };

        let normalized = step.normalizer.normalize(&payload);
        if normalized.is_empty() {
            tracing::debug!(courier = %courier.id, strategy = index, %kind, "Strategy returned no events");
            continue;
        }
        return Outcome::Succeeded { index, normalized };
    }
    Outcome::Exhausted
}

fn assemble(courier: &CourierEntry, number: &str, normalized: Normalized) -> TrackingSuccess {
    let status = normalized
        .events
        .first()
        .map(|e| classify(&e.description))
        .unwrap_or_default();
    TrackingSuccess {
        courier: courier.name.clone(),
        tracking_number: number.to_string(),
        status,
        estimated_delivery: normalized.estimated_delivery,
        events: normalized.events,
    }
}
