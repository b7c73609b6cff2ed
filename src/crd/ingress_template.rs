//! IngressTemplate Custom Resource Definition
//!
//! An IngressTemplate declares one Ingress whose string fields may contain
//! `{{ .path }}` expressions. The operator renders those expressions against
//! the IngressTemplate's own metadata and keeps a single owned Ingress in the
//! same namespace in sync with the result.

use std::collections::BTreeMap;

use k8s_openapi::api::networking::v1::IngressSpec;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::types::ConditionStatus;

/// Specification for an IngressTemplate
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "ingress-template.takumakume.github.io",
    version = "v1alpha1",
    kind = "IngressTemplate",
    plural = "ingresstemplates",
    shortname = "igt",
    status = "IngressTemplateStatus",
    namespaced,
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.ready"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct IngressTemplateSpec {
    /// Ingress spec whose hosts, TLS entries and backend names may be templated
    pub ingress_spec_template: IngressSpec,

    /// Name of the generated Ingress (defaults to the IngressTemplate name)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ingress_name: Option<String>,

    /// Annotations for the generated Ingress; values may be templated
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ingress_annotations: BTreeMap<String, String>,

    /// Labels for the generated Ingress; values may be templated
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ingress_labels: BTreeMap<String, String>,
}

impl IngressTemplateSpec {
    /// Validate the template before rendering
    ///
    /// An Ingress with neither rules nor a default backend routes nothing,
    /// and the API server would accept it silently.
    pub fn validate(&self) -> Result<(), crate::Error> {
        let spec = &self.ingress_spec_template;
        let has_rules = spec.rules.as_ref().is_some_and(|r| !r.is_empty());
        if !has_rules && spec.default_backend.is_none() {
            return Err(crate::Error::validation(
                "ingressSpecTemplate must declare at least one rule or a defaultBackend",
            ));
        }

        if let Some(name) = &self.ingress_name {
            if name.trim().is_empty() {
                return Err(crate::Error::validation("ingressName must not be blank"));
            }
        }

        Ok(())
    }
}

/// Status for an IngressTemplate
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IngressTemplateStatus {
    /// Whether the generated Ingress matches the latest successful render
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready: Option<ConditionStatus>,
}

impl IngressTemplateStatus {
    /// Status reporting a successfully applied Ingress
    pub fn ready() -> Self {
        Self {
            ready: Some(ConditionStatus::True),
        }
    }

    /// Returns true if the status already reports ready
    pub fn is_ready(&self) -> bool {
        self.ready.is_some_and(|r| r.is_true())
    }
}

impl IngressTemplate {
    /// `namespace/name` key used in logs and errors
    pub fn key(&self) -> String {
        format!(
            "{}/{}",
            self.metadata.namespace.as_deref().unwrap_or_default(),
            self.metadata.name.as_deref().unwrap_or_default()
        )
    }

    /// Returns true if the current status reports ready
    pub fn is_ready(&self) -> bool {
        self.status.as_ref().is_some_and(|s| s.is_ready())
    }
}
