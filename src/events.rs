//! Kubernetes Events for IngressTemplate reconcile outcomes
//!
//! Events show up in `kubectl describe ingresstemplate`. Publishing never
//! fails a reconcile; recorder errors are logged and dropped.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::Client;
#[cfg(test)]
use mockall::automock;
use tracing::warn;

/// Sink for reconcile outcome Events
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Record an Event on `resource_ref`
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    );
}

/// Publisher backed by the API server's events endpoint
pub struct KubeEventPublisher {
    recorder: Recorder,
}

impl KubeEventPublisher {
    /// Reports as `controller_name`, with `POD_NAME` as the instance when set
    pub fn new(client: Client, controller_name: &str) -> Self {
        let reporter = Reporter {
            controller: controller_name.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

#[async_trait]
impl EventPublisher for KubeEventPublisher {
    async fn publish(
        &self,
        resource_ref: &ObjectReference,
        type_: EventType,
        reason: &str,
        action: &str,
        note: Option<String>,
    ) {
        let event = Event {
            type_,
            reason: reason.to_string(),
            note,
            action: action.to_string(),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, resource_ref).await {
            warn!(reason, error = %e, "dropping IngressTemplate event");
        }
    }
}

/// Publisher that drops every event
pub struct NoopEventPublisher;

#[async_trait]
impl EventPublisher for NoopEventPublisher {
    async fn publish(
        &self,
        _resource_ref: &ObjectReference,
        _type_: EventType,
        _reason: &str,
        _action: &str,
        _note: Option<String>,
    ) {
    }
}

/// Values of the Event `reason` field
pub mod reasons {
    /// The generated Ingress was created
    pub const INGRESS_CREATED: &str = "IngressCreated";
    /// The generated Ingress was brought back in line with the template
    pub const INGRESS_UPDATED: &str = "IngressUpdated";
    /// A template expression failed to render
    pub const RENDER_FAILED: &str = "RenderFailed";
    /// The API server rejected the generated Ingress
    pub const APPLY_FAILED: &str = "ApplyFailed";
    /// The IngressTemplate spec is unusable
    pub const VALIDATION_FAILED: &str = "ValidationFailed";
}

/// Values of the Event `action` field
pub mod actions {
    /// Every Event comes from a reconcile cycle
    pub const RECONCILE: &str = "Reconcile";
}
