//! Shared fixtures for integration tests

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, ServiceBackendPort,
};
use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, DeleteParams, Patch, PatchParams};
use kube::{Client, CustomResourceExt};

use ingress_template_operator::config::{ContextShape, ReconcilerConfig};
use ingress_template_operator::controller::Context;
use ingress_template_operator::crd::{IngressTemplate, IngressTemplateSpec};
use ingress_template_operator::events::NoopEventPublisher;

const CRD_NAME: &str = "ingresstemplates.ingress-template.takumakume.github.io";
const FIELD_MANAGER: &str = "ingress-template-integration-test";

/// Connect to the current cluster and make sure the CRD is established
pub async fn ensure_test_cluster() -> Result<Client, kube::Error> {
    let client = Client::try_default().await?;

    let crds: Api<CustomResourceDefinition> = Api::all(client.clone());
    crds.patch(
        CRD_NAME,
        &PatchParams::apply(FIELD_MANAGER).force(),
        &Patch::Apply(&IngressTemplate::crd()),
    )
    .await?;

    for _ in 0..30 {
        let crd = crds.get(CRD_NAME).await?;
        let established = crd
            .status
            .and_then(|s| s.conditions)
            .unwrap_or_default()
            .iter()
            .any(|c| c.type_ == "Established" && c.status == "True");
        if established {
            break;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    Ok(client)
}

/// Create the namespace if it does not exist
pub async fn ensure_namespace(client: &Client, name: &str) -> Result<(), kube::Error> {
    let namespaces: Api<Namespace> = Api::all(client.clone());
    let namespace = Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        ..Default::default()
    };
    namespaces
        .patch(
            name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(&namespace),
        )
        .await?;
    Ok(())
}

/// IngressTemplate with one annotation and one rule on `host`
pub fn sample_template(name: &str, namespace: &str, host: &str) -> IngressTemplate {
    IngressTemplate {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..Default::default()
        },
        spec: IngressTemplateSpec {
            ingress_spec_template: IngressSpec {
                rules: Some(vec![IngressRule {
                    host: Some(host.to_string()),
                    http: Some(HTTPIngressRuleValue {
                        paths: vec![HTTPIngressPath {
                            path: Some("/".to_string()),
                            path_type: "Prefix".to_string(),
                            backend: IngressBackend {
                                service: Some(IngressServiceBackend {
                                    name: "web".to_string(),
                                    port: Some(ServiceBackendPort {
                                        number: Some(80),
                                        name: None,
                                    }),
                                }),
                                resource: None,
                            },
                        }],
                    }),
                }]),
                ..Default::default()
            },
            ingress_name: None,
            ingress_annotations: BTreeMap::from([(
                "key1".to_string(),
                "value1-{{ .namespace }}".to_string(),
            )]),
            ingress_labels: BTreeMap::new(),
        },
        status: None,
    }
}

/// Reconciler context using the namespace-only rendering shape
pub fn namespace_context(client: Client) -> Arc<Context> {
    let config = ReconcilerConfig {
        context_shape: ContextShape::Namespace,
        ..Default::default()
    };
    Arc::new(
        Context::builder(client)
            .config(config)
            .events(Arc::new(NoopEventPublisher))
            .build(),
    )
}

/// Delete the IngressTemplate and its Ingress, ignoring absence
pub async fn cleanup(client: &Client, namespace: &str, name: &str) {
    let templates: Api<IngressTemplate> = Api::namespaced(client.clone(), namespace);
    let ingresses: Api<Ingress> = Api::namespaced(client.clone(), namespace);
    let _ = templates.delete(name, &DeleteParams::default()).await;
    let _ = ingresses.delete(name, &DeleteParams::default()).await;
}

/// Host of the first rule of an Ingress
pub fn first_host(ingress: &Ingress) -> Option<String> {
    ingress.spec.as_ref()?.rules.as_ref()?.first()?.host.clone()
}

/// Poll the Ingress until `done` holds or the timeout elapses
pub async fn wait_for_ingress(
    api: &Api<Ingress>,
    name: &str,
    timeout: Duration,
    done: impl Fn(&Ingress) -> bool,
) -> Option<Ingress> {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if let Ok(Some(ingress)) = api.get_opt(name).await {
            if done(&ingress) {
                return Some(ingress);
            }
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
    None
}
