//! Integration tests for IngressTemplate reconciliation
//!
//! Each test drives single reconcile cycles against a real API server and
//! checks the Ingress and status that come out.

use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::ResourceExt;

use ingress_template_operator::controller::{reconcile_template, ApplyOutcome, ReconcileOutcome};
use ingress_template_operator::crd::{ConditionStatus, IngressTemplate};

use super::helpers::{
    cleanup, ensure_namespace, ensure_test_cluster, first_host, namespace_context,
    sample_template,
};

const NAMESPACE: &str = "test";

/// Story: a namespace owner creates an IngressTemplate and gets a rendered Ingress
///
/// Expected behavior:
/// - Ingress `test/sample` exists with annotation `value1-test`
/// - Its host is `test.example.com`
/// - It has exactly one owner reference, pointing at `sample`
/// - The IngressTemplate reports ready
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_template_produces_rendered_ingress() {
    let client = ensure_test_cluster().await.expect("failed to setup cluster");
    ensure_namespace(&client, NAMESPACE)
        .await
        .expect("failed to create namespace");
    let name = "sample";
    cleanup(&client, NAMESPACE, name).await;

    let templates: Api<IngressTemplate> = Api::namespaced(client.clone(), NAMESPACE);
    let created = templates
        .create(
            &PostParams::default(),
            &sample_template(name, NAMESPACE, "{{ .namespace }}.example.com"),
        )
        .await
        .expect("failed to create IngressTemplate");

    let ctx = namespace_context(client.clone());
    let outcome = reconcile_template(&ctx, NAMESPACE, name)
        .await
        .expect("reconcile should succeed");
    assert_eq!(outcome, ReconcileOutcome::Applied(ApplyOutcome::Created));

    let ingresses: Api<Ingress> = Api::namespaced(client.clone(), NAMESPACE);
    let ingress = ingresses.get(name).await.expect("Ingress should exist");
    assert_eq!(ingress.annotations()["key1"], "value1-test");
    assert_eq!(first_host(&ingress).as_deref(), Some("test.example.com"));

    let owners = ingress.owner_references();
    assert_eq!(owners.len(), 1);
    assert_eq!(owners[0].name, name);
    assert_eq!(Some(owners[0].uid.clone()), created.uid());
    assert_eq!(owners[0].controller, Some(true));

    let template = templates.get(name).await.expect("template should exist");
    assert_eq!(
        template.status.and_then(|s| s.ready),
        Some(ConditionStatus::True)
    );

    // A second cycle over unchanged input writes nothing
    let outcome = reconcile_template(&ctx, NAMESPACE, name)
        .await
        .expect("second reconcile should succeed");
    assert_eq!(outcome, ReconcileOutcome::Applied(ApplyOutcome::NoOp));
    let unchanged = ingresses.get(name).await.expect("Ingress should exist");
    assert_eq!(unchanged.resource_version(), ingress.resource_version());

    cleanup(&client, NAMESPACE, name).await;
}

/// Story: editing the host template updates the same Ingress
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_template_edit_propagates_to_ingress() {
    let client = ensure_test_cluster().await.expect("failed to setup cluster");
    ensure_namespace(&client, NAMESPACE)
        .await
        .expect("failed to create namespace");
    let name = "sample-update";
    cleanup(&client, NAMESPACE, name).await;

    let templates: Api<IngressTemplate> = Api::namespaced(client.clone(), NAMESPACE);
    templates
        .create(
            &PostParams::default(),
            &sample_template(name, NAMESPACE, "{{ .namespace }}.example.com"),
        )
        .await
        .expect("failed to create IngressTemplate");

    let ctx = namespace_context(client.clone());
    reconcile_template(&ctx, NAMESPACE, name)
        .await
        .expect("initial reconcile");

    let ingresses: Api<Ingress> = Api::namespaced(client.clone(), NAMESPACE);
    let before = ingresses.get(name).await.expect("Ingress should exist");

    let patch = serde_json::json!({
        "spec": {
            "ingressSpecTemplate": {
                "rules": [{
                    "host": "{{ .namespace }}.other.com",
                    "http": { "paths": [{
                        "path": "/",
                        "pathType": "Prefix",
                        "backend": { "service": { "name": "web", "port": { "number": 80 } } }
                    }]}
                }]
            }
        }
    });
    templates
        .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .expect("failed to edit IngressTemplate");

    let outcome = reconcile_template(&ctx, NAMESPACE, name)
        .await
        .expect("update reconcile");
    assert_eq!(outcome, ReconcileOutcome::Applied(ApplyOutcome::Updated));

    let after = ingresses.get(name).await.expect("Ingress should exist");
    assert_eq!(first_host(&after).as_deref(), Some("test.other.com"));
    assert_eq!(after.uid(), before.uid());
    assert_eq!(after.owner_references().len(), 1);

    cleanup(&client, NAMESPACE, name).await;
}

/// Story: a malformed expression leaves the existing Ingress alone
#[tokio::test]
#[ignore = "requires kind cluster - run with: cargo test --test kind -- --ignored"]
async fn story_broken_template_keeps_last_good_ingress() {
    let client = ensure_test_cluster().await.expect("failed to setup cluster");
    ensure_namespace(&client, NAMESPACE)
        .await
        .expect("failed to create namespace");
    let name = "sample-broken";
    cleanup(&client, NAMESPACE, name).await;

    let templates: Api<IngressTemplate> = Api::namespaced(client.clone(), NAMESPACE);
    templates
        .create(
            &PostParams::default(),
            &sample_template(name, NAMESPACE, "{{ .namespace }}.example.com"),
        )
        .await
        .expect("failed to create IngressTemplate");

    let ctx = namespace_context(client.clone());
    reconcile_template(&ctx, NAMESPACE, name)
        .await
        .expect("initial reconcile");

    let patch = serde_json::json!({
        "spec": { "ingressAnnotations": { "key1": "{{ .namespace " } }
    });
    templates
        .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .expect("failed to edit IngressTemplate");

    let err = reconcile_template(&ctx, NAMESPACE, name)
        .await
        .expect_err("render should fail");
    assert!(!err.is_retryable());

    let ingresses: Api<Ingress> = Api::namespaced(client.clone(), NAMESPACE);
    let ingress = ingresses.get(name).await.expect("Ingress should exist");
    assert_eq!(ingress.annotations()["key1"], "value1-test");

    cleanup(&client, NAMESPACE, name).await;
}
