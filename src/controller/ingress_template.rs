//! IngressTemplate controller implementation
//!
//! Each reconcile cycle runs fetch, derive, render, apply and status update
//! for one IngressTemplate:
//!
//! 1. Fetch the IngressTemplate fresh from the store. Gone or being deleted
//!    ends the cycle quietly; garbage collection removes the Ingress.
//! 2. Derive the target namespace and name from the configured naming strategy.
//! 3. Render labels, annotations, spec and name against the template's metadata.
//!    A render failure aborts before anything is written.
//! 4. Apply: create the Ingress with a controller owner reference, or overwrite
//!    labels, annotations and spec of the existing one. Identical content is a
//!    no-op and issues no write.
//! 5. Mark the IngressTemplate ready after a create or update.
//!
//! Failures are returned to the dispatcher; the cycle itself never retries.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::runtime::controller::Action;
use kube::runtime::events::EventType;
use kube::{Client, Resource, ResourceExt};
use tracing::{debug, error, info, instrument, warn};

use super::store::{IngressTemplateStore, KubeStore};
use crate::config::{ReconcilerConfig, TargetNaming};
use crate::crd::{IngressTemplate, IngressTemplateStatus};
use crate::events::{actions, reasons, EventPublisher, KubeEventPublisher};
use crate::template::{IngressRenderer, RenderContext};
use crate::Error;

/// Name reported on Kubernetes Events
pub const CONTROLLER_NAME: &str = "ingress-template-controller";

/// Result of the apply step
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The existing Ingress already matched; nothing was written
    NoOp,
    /// A new Ingress was created
    Created,
    /// The existing Ingress was overwritten
    Updated,
}

impl ApplyOutcome {
    /// Returns true if the cycle wrote the Ingress
    pub fn changed(&self) -> bool {
        !matches!(self, Self::NoOp)
    }
}

impl fmt::Display for ApplyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoOp => write!(f, "noop"),
            Self::Created => write!(f, "created"),
            Self::Updated => write!(f, "updated"),
        }
    }
}

/// Result of one reconcile cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The IngressTemplate no longer exists
    NotFound,
    /// The IngressTemplate is being deleted
    Deleting,
    /// The Ingress was brought in line with the IngressTemplate
    Applied(ApplyOutcome),
}

/// Controller context containing shared state and clients
///
/// Use [`ContextBuilder`] to construct instances:
///
/// ```ignore
/// let ctx = Context::builder(client)
///     .config(args.reconciler_config())
///     .build();
/// ```
pub struct Context {
    /// Store for IngressTemplates and Ingresses (trait object for testability)
    pub store: Arc<dyn IngressTemplateStore>,
    /// Event publisher for reconcile outcomes
    pub events: Arc<dyn EventPublisher>,
    /// Renderer for template-bearing Ingress fields
    pub renderer: IngressRenderer,
    /// Reconciler settings
    pub config: ReconcilerConfig,
}

impl Context {
    /// Create a builder for constructing a Context
    pub fn builder(client: Client) -> ContextBuilder {
        ContextBuilder::new(client)
    }

    /// Create a context for testing with custom mock clients
    #[cfg(test)]
    pub fn for_testing(
        store: Arc<dyn IngressTemplateStore>,
        events: Arc<dyn EventPublisher>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            store,
            events,
            renderer: IngressRenderer::new(),
            config,
        }
    }

    /// Run a store call under the configured deadline
    async fn call<T, F>(&self, operation: &str, fut: F) -> Result<T, Error>
    where
        F: Future<Output = Result<T, Error>>,
    {
        tokio::time::timeout(self.config.store_timeout, fut)
            .await
            .map_err(|_| Error::timeout(operation, self.config.store_timeout))?
    }
}

/// Builder for constructing [`Context`] instances
pub struct ContextBuilder {
    client: Client,
    events: Option<Arc<dyn EventPublisher>>,
    config: ReconcilerConfig,
}

impl ContextBuilder {
    fn new(client: Client) -> Self {
        Self {
            client,
            events: None,
            config: ReconcilerConfig::default(),
        }
    }

    /// Set the reconciler settings
    pub fn config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the event publisher
    pub fn events(mut self, events: Arc<dyn EventPublisher>) -> Self {
        self.events = Some(events);
        self
    }

    /// Build the Context
    pub fn build(self) -> Context {
        Context {
            store: Arc::new(KubeStore::new(self.client.clone())),
            events: self
                .events
                .unwrap_or_else(|| Arc::new(KubeEventPublisher::new(self.client, CONTROLLER_NAME))),
            renderer: IngressRenderer::new(),
            config: self.config,
        }
    }
}

/// Reconcile an IngressTemplate
///
/// The object handed in by the dispatcher only identifies the work item;
/// the cycle re-reads the IngressTemplate from the store.
#[instrument(skip(template, ctx), fields(template = %template.key()))]
pub async fn reconcile(template: Arc<IngressTemplate>, ctx: Arc<Context>) -> Result<Action, Error> {
    let name = template.name_any();
    let namespace = template
        .namespace()
        .ok_or_else(|| Error::validation_for(&name, "IngressTemplate has no namespace"))?;

    info!("reconciling IngressTemplate");

    match reconcile_template(&ctx, &namespace, &name).await? {
        ReconcileOutcome::NotFound => {
            debug!("IngressTemplate not found, nothing to do");
            Ok(Action::await_change())
        }
        ReconcileOutcome::Deleting => {
            debug!("IngressTemplate is being deleted, leaving Ingress to garbage collection");
            Ok(Action::await_change())
        }
        ReconcileOutcome::Applied(outcome) => {
            info!(%outcome, "reconciled IngressTemplate");
            Ok(Action::requeue(ctx.config.resync_interval))
        }
    }
}

/// Run one reconcile cycle for the IngressTemplate `namespace/name`
pub async fn reconcile_template(
    ctx: &Context,
    namespace: &str,
    name: &str,
) -> Result<ReconcileOutcome, Error> {
    let Some(template) = ctx
        .call("get IngressTemplate", ctx.store.get_template(namespace, name))
        .await?
    else {
        return Ok(ReconcileOutcome::NotFound);
    };

    if template.metadata.deletion_timestamp.is_some() {
        return Ok(ReconcileOutcome::Deleting);
    }

    let key = template.key();
    let obj_ref = template.object_ref(&());

    if let Err(e) = template.spec.validate() {
        let err = match e {
            Error::Validation { message, .. } => Error::validation_for(&key, message),
            other => other,
        };
        warn!(error = %err, "IngressTemplate validation failed");
        ctx.events
            .publish(
                &obj_ref,
                EventType::Warning,
                reasons::VALIDATION_FAILED,
                actions::RECONCILE,
                Some(err.to_string()),
            )
            .await;
        return Err(err);
    }

    let desired = match build_ingress(&template, &ctx.renderer, &ctx.config) {
        Ok(ingress) => ingress,
        Err(err) => {
            warn!(error = %err, "failed to render Ingress");
            ctx.events
                .publish(
                    &obj_ref,
                    EventType::Warning,
                    reasons::RENDER_FAILED,
                    actions::RECONCILE,
                    Some(err.to_string()),
                )
                .await;
            return Err(err);
        }
    };

    match apply_ingress(ctx, &template, desired).await {
        Ok(outcome) => {
            if outcome.changed() {
                mark_ready(ctx, &template).await?;
                let reason = match outcome {
                    ApplyOutcome::Created => reasons::INGRESS_CREATED,
                    _ => reasons::INGRESS_UPDATED,
                };
                ctx.events
                    .publish(
                        &obj_ref,
                        EventType::Normal,
                        reason,
                        actions::RECONCILE,
                        Some(format!("Ingress {outcome}")),
                    )
                    .await;
            } else {
                debug!("Ingress already up to date");
            }
            Ok(ReconcileOutcome::Applied(outcome))
        }
        Err(err) => {
            acknowledge_status(ctx, &template).await;
            if !err.is_conflict() {
                ctx.events
                    .publish(
                        &obj_ref,
                        EventType::Warning,
                        reasons::APPLY_FAILED,
                        actions::RECONCILE,
                        Some(err.to_string()),
                    )
                    .await;
            }
            Err(err)
        }
    }
}

/// Build the rendered Ingress for an IngressTemplate
///
/// Pure: no store access. The result carries no owner reference; that is
/// attached when the Ingress is first created.
pub fn build_ingress(
    template: &IngressTemplate,
    renderer: &IngressRenderer,
    config: &ReconcilerConfig,
) -> Result<Ingress, Error> {
    let key = template.key();
    let render_ctx = RenderContext::for_shape(config.context_shape, &template.metadata);

    let base_name = match &template.spec.ingress_name {
        Some(ingress_name) => renderer
            .render_value(&render_ctx, "spec.ingressName", ingress_name)
            .map_err(|e| Error::render_for(&key, e))?,
        None => template.name_any(),
    };
    if base_name.trim().is_empty() {
        return Err(Error::validation_for(&key, "ingressName rendered to an empty string"));
    }

    let (name, generate_name) = match config.naming {
        TargetNaming::Fixed => (Some(base_name), None),
        TargetNaming::Generate => (None, Some(format!("{base_name}-"))),
    };

    let document = Ingress {
        metadata: ObjectMeta {
            name,
            generate_name,
            namespace: template.namespace(),
            labels: non_empty(&template.spec.ingress_labels),
            annotations: non_empty(&template.spec.ingress_annotations),
            ..Default::default()
        },
        spec: Some(template.spec.ingress_spec_template.clone()),
        status: None,
    };

    renderer
        .render(&render_ctx, &document)
        .map_err(|e| Error::render_for(key, e))
}

fn non_empty(map: &BTreeMap<String, String>) -> Option<BTreeMap<String, String>> {
    (!map.is_empty()).then(|| map.clone())
}

/// Controller owner reference pointing at `template`
pub fn owner_reference(template: &IngressTemplate) -> Result<OwnerReference, Error> {
    let uid = template.uid().ok_or_else(|| {
        Error::internal_with_context(
            "owner_reference",
            format!("IngressTemplate {} has no uid", template.key()),
        )
    })?;

    Ok(OwnerReference {
        api_version: IngressTemplate::api_version(&()).to_string(),
        kind: IngressTemplate::kind(&()).to_string(),
        name: template.name_any(),
        uid,
        controller: Some(true),
        block_owner_deletion: Some(true),
    })
}

/// Create or update the Ingress for `template`
async fn apply_ingress(
    ctx: &Context,
    template: &IngressTemplate,
    desired: Ingress,
) -> Result<ApplyOutcome, Error> {
    let namespace = template.namespace().unwrap_or_default();
    let owner = owner_reference(template)?;

    let existing = match ctx.config.naming {
        TargetNaming::Fixed => {
            let name = desired.metadata.name.clone().unwrap_or_default();
            ctx.call("get Ingress", ctx.store.get_ingress(&namespace, &name))
                .await?
        }
        TargetNaming::Generate => {
            ctx.call(
                "find owned Ingress",
                ctx.store.find_owned_ingress(&namespace, &owner.uid),
            )
            .await?
        }
    };

    let Some(existing) = existing else {
        let mut ingress = desired;
        ingress.metadata.owner_references = Some(vec![owner]);
        let created = ctx
            .call("create Ingress", ctx.store.create_ingress(&namespace, &ingress))
            .await?;
        info!(ingress = %created.name_any(), "created Ingress");
        return Ok(ApplyOutcome::Created);
    };

    let Some(updated) = merge_into_existing(&existing, desired, owner)? else {
        return Ok(ApplyOutcome::NoOp);
    };

    ctx.call("replace Ingress", ctx.store.replace_ingress(&namespace, &updated))
        .await?;
    info!(ingress = %updated.name_any(), "updated Ingress");
    Ok(ApplyOutcome::Updated)
}

/// Overlay the rendered content onto the existing Ingress
///
/// Name, resource version and owner references of `existing` are kept. An
/// Ingress without a controller is adopted. Returns `None` when nothing
/// would change.
fn merge_into_existing(
    existing: &Ingress,
    desired: Ingress,
    owner: OwnerReference,
) -> Result<Option<Ingress>, Error> {
    let controller = existing
        .owner_references()
        .iter()
        .find(|r| r.controller == Some(true));

    let adopt = match controller {
        Some(r) if r.uid != owner.uid => {
            return Err(Error::apply_permanent(
                format!(
                    "{}/{}",
                    existing.namespace().unwrap_or_default(),
                    existing.name_any()
                ),
                format!("Ingress is controlled by {} {}", r.kind, r.name),
            ));
        }
        Some(_) => false,
        None => true,
    };

    let mut updated = existing.clone();
    updated.metadata.labels = desired.metadata.labels;
    updated.metadata.annotations = desired.metadata.annotations;
    updated.spec = desired.spec;
    if adopt {
        updated
            .metadata
            .owner_references
            .get_or_insert_with(Vec::new)
            .push(owner);
    }

    if &updated == existing {
        Ok(None)
    } else {
        Ok(Some(updated))
    }
}

/// Set `ready = True` after the Ingress was written
async fn mark_ready(ctx: &Context, template: &IngressTemplate) -> Result<(), Error> {
    if template.is_ready() {
        return Ok(());
    }

    ctx.call(
        "patch IngressTemplate status",
        ctx.store.patch_template_status(
            &template.namespace().unwrap_or_default(),
            &template.name_any(),
            template.resource_version(),
            &IngressTemplateStatus::ready(),
        ),
    )
    .await?;

    debug!("marked IngressTemplate ready");
    Ok(())
}

/// Persist the status unchanged after a failed apply
///
/// Failures are logged; the caller reports the apply error instead.
async fn acknowledge_status(ctx: &Context, template: &IngressTemplate) {
    let status = template.status.clone().unwrap_or_default();
    let result = ctx
        .call(
            "patch IngressTemplate status",
            ctx.store.patch_template_status(
                &template.namespace().unwrap_or_default(),
                &template.name_any(),
                None,
                &status,
            ),
        )
        .await;

    if let Err(e) = result {
        warn!(error = %e, "failed to record status after apply error");
    }
}

/// Error policy for the controller
///
/// Conflicts and transient failures requeue the whole cycle after a short
/// delay; errors that need a spec change wait for the next watch event.
pub fn error_policy(template: Arc<IngressTemplate>, error: &Error, _ctx: Arc<Context>) -> Action {
    error!(
        ?error,
        template = %template.key(),
        retryable = error.is_retryable(),
        "reconciliation failed"
    );

    match error.requeue_after() {
        Some(delay) => Action::requeue(delay),
        None => Action::await_change(),
    }
}
