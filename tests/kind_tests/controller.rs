//! Integration tests for the running controller
//!
//! The controller is started in-process and left to react to watch events.

use std::time::Duration;

use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{Api, DeleteParams, PostParams};

use ingress_template_operator::config::ControllerSettings;
use ingress_template_operator::controller;
use ingress_template_operator::crd::IngressTemplate;

use super::helpers::{
    cleanup, ensure_namespace, ensure_test_cluster, first_host, namespace_context,
    sample_template, wait_for_ingress,
};

const NAMESPACE: &str = "test-controller";

/// Story: the controller recreates an Ingress someone deleted
///
/// Expected behavior:
/// - Creating the IngressTemplate yields the Ingress without a direct call
/// - Deleting the owned Ingress triggers a reconcile that brings it back
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_controller_restores_deleted_ingress() {
    let client = ensure_test_cluster().await.expect("failed to setup cluster");
    ensure_namespace(&client, NAMESPACE)
        .await
        .expect("failed to create namespace");
    let name = "sample";
    cleanup(&client, NAMESPACE, name).await;

    let settings = ControllerSettings {
        concurrency: 2,
        namespace: Some(NAMESPACE.to_string()),
    };
    let ctx = namespace_context(client.clone());
    let runner_client = client.clone();
    let handle = tokio::spawn(async move {
        controller::run(runner_client, ctx, &settings).await;
    });

    let templates: Api<IngressTemplate> = Api::namespaced(client.clone(), NAMESPACE);
    templates
        .create(
            &PostParams::default(),
            &sample_template(name, NAMESPACE, "{{ .namespace }}.example.com"),
        )
        .await
        .expect("failed to create IngressTemplate");

    let ingresses: Api<Ingress> = Api::namespaced(client.clone(), NAMESPACE);
    let expected_host = format!("{NAMESPACE}.example.com");
    let created = wait_for_ingress(&ingresses, name, Duration::from_secs(30), |i| {
        first_host(i).as_deref() == Some(expected_host.as_str())
    })
    .await
    .expect("controller should create the Ingress");

    ingresses
        .delete(name, &DeleteParams::default())
        .await
        .expect("failed to delete Ingress");

    let restored = wait_for_ingress(&ingresses, name, Duration::from_secs(30), |i| {
        i.metadata.uid != created.metadata.uid
    })
    .await
    .expect("controller should recreate the Ingress");
    assert_eq!(first_host(&restored), Some(expected_host));

    handle.abort();
    cleanup(&client, NAMESPACE, name).await;
}
