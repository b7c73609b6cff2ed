//! Controller runner - binds the reconciler to IngressTemplate and Ingress watches

use std::sync::Arc;

use futures::StreamExt;
use k8s_openapi::api::networking::v1::Ingress;
use kube::runtime::controller::Config as ControllerConfig;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client};

use super::ingress_template::{error_policy, reconcile, Context};
use crate::config::ControllerSettings;
use crate::crd::IngressTemplate;

/// Watcher timeout (seconds) - must be less than client read_timeout (30s)
/// This forces the API server to close the watch before the client times out,
/// preventing "body read timed out" errors on idle watches.
const WATCH_TIMEOUT_SECS: u32 = 25;

/// Run the IngressTemplate controller until a shutdown signal arrives
///
/// Watches IngressTemplates and the Ingresses they own; a change to either
/// queues the owning IngressTemplate. The controller deduplicates queued
/// work per object and never runs two reconciles for the same object at once.
pub async fn run(client: Client, ctx: Arc<Context>, settings: &ControllerSettings) {
    let (templates, ingresses): (Api<IngressTemplate>, Api<Ingress>) = match &settings.namespace {
        Some(ns) => (
            Api::namespaced(client.clone(), ns),
            Api::namespaced(client, ns),
        ),
        None => (Api::all(client.clone()), Api::all(client)),
    };

    tracing::info!(
        namespace = settings.namespace.as_deref().unwrap_or("*"),
        concurrency = settings.concurrency,
        "starting IngressTemplate controller"
    );

    Controller::new(
        templates,
        WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS),
    )
    .owns(
        ingresses,
        WatcherConfig::default().timeout(WATCH_TIMEOUT_SECS),
    )
    .with_config(ControllerConfig::default().concurrency(settings.concurrency))
    .shutdown_on_signal()
    .run(reconcile, error_policy, ctx)
    .for_each(log_reconcile_result("IngressTemplate"))
    .await;

    tracing::info!("IngressTemplate controller stopped");
}

fn log_reconcile_result<T: std::fmt::Debug, E: std::fmt::Debug>(
    controller_name: &'static str,
) -> impl Fn(Result<T, E>) -> std::future::Ready<()> {
    move |result| {
        match result {
            Ok(action) => tracing::debug!(?action, "{} reconciliation completed", controller_name),
            Err(e) => tracing::error!(error = ?e, "{} reconciliation error", controller_name),
        }
        std::future::ready(())
    }
}
