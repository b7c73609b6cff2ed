//! Rendering context built from an IngressTemplate's metadata
//!
//! Two context shapes are supported, chosen once per deployment:
//! - [`ContextShape::Metadata`]: `{{ .Metadata.Namespace }}`, `{{ .Metadata.Name }}`,
//!   `{{ .Metadata.Labels.KEY }}`, `{{ .Metadata.Annotations.KEY }}`, ...
//! - [`ContextShape::Namespace`]: `{{ .namespace }}` only
//!
//! Templates written for one shape do not resolve under the other; with strict
//! undefined handling they fail to render rather than producing empty strings.

use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use minijinja::Value;
use serde::Serialize;

use crate::config::ContextShape;

/// Root key of the full metadata context shape
pub const METADATA_KEY: &str = "Metadata";

/// Key of the namespace-only context shape
pub const NAMESPACE_KEY: &str = "namespace";

/// Values available to template expressions during one reconcile cycle
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    values: BTreeMap<String, Value>,
}

impl RenderContext {
    /// Create a new builder for RenderContext
    pub fn builder() -> RenderContextBuilder {
        RenderContextBuilder::default()
    }

    /// Build the context for the configured shape from an object's metadata
    pub fn for_shape(shape: ContextShape, metadata: &ObjectMeta) -> Self {
        match shape {
            ContextShape::Metadata => Self::from_metadata(metadata),
            ContextShape::Namespace => {
                Self::namespace_only(metadata.namespace.as_deref().unwrap_or_default())
            }
        }
    }

    /// Full metadata under `Metadata`
    pub fn from_metadata(metadata: &ObjectMeta) -> Self {
        let metadata = MetadataContext::from(metadata);
        Self::builder()
            .entry(METADATA_KEY, Value::from_serialize(&metadata))
            .build()
    }

    /// Bare namespace string under `namespace`
    pub fn namespace_only(namespace: &str) -> Self {
        Self::builder().value(NAMESPACE_KEY, namespace).build()
    }

    /// Convert to minijinja Value for rendering
    pub fn to_value(&self) -> Value {
        Value::from_iter(self.values.clone())
    }
}

/// Builder for RenderContext
#[derive(Debug, Default)]
pub struct RenderContextBuilder {
    values: BTreeMap<String, Value>,
}

impl RenderContextBuilder {
    /// Add a string value addressable as `{{ .key }}`
    pub fn value(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entry(key, Value::from(value.into()))
    }

    /// Add an arbitrary minijinja value
    pub fn entry(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    /// Build the RenderContext
    pub fn build(self) -> RenderContext {
        RenderContext {
            values: self.values,
        }
    }
}

/// Object metadata exposed under `{{ .Metadata.* }}`
///
/// Field names are capitalised so `{{ .Metadata.Namespace }}` reads the same
/// as in other Kubernetes manifest templating tools. Absent strings are empty
/// and absent maps are empty maps, so lookups on them never hit undefined.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetadataContext {
    /// `{{ .Metadata.Name }}`
    pub name: String,
    /// `{{ .Metadata.Namespace }}`
    pub namespace: String,
    /// `{{ .Metadata.GenerateName }}`
    pub generate_name: String,
    /// `{{ .Metadata.UID }}`
    #[serde(rename = "UID")]
    pub uid: String,
    /// `{{ .Metadata.ResourceVersion }}`
    pub resource_version: String,
    /// `{{ .Metadata.Generation }}`
    pub generation: i64,
    /// `{{ .Metadata.CreationTimestamp }}` (RFC 3339)
    pub creation_timestamp: String,
    /// `{{ .Metadata.Labels.KEY }}`
    pub labels: BTreeMap<String, String>,
    /// `{{ .Metadata.Annotations.KEY }}`
    pub annotations: BTreeMap<String, String>,
}

impl From<&ObjectMeta> for MetadataContext {
    fn from(meta: &ObjectMeta) -> Self {
        Self {
            name: meta.name.clone().unwrap_or_default(),
            namespace: meta.namespace.clone().unwrap_or_default(),
            generate_name: meta.generate_name.clone().unwrap_or_default(),
            uid: meta.uid.clone().unwrap_or_default(),
            resource_version: meta.resource_version.clone().unwrap_or_default(),
            generation: meta.generation.unwrap_or_default(),
            creation_timestamp: meta
                .creation_timestamp
                .as_ref()
                .map(|t| t.0.to_rfc3339())
                .unwrap_or_default(),
            labels: meta.labels.clone().unwrap_or_default(),
            annotations: meta.annotations.clone().unwrap_or_default(),
        }
    }
}
