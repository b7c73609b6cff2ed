//! Kubernetes store access for the IngressTemplate controller
//!
//! The reconciler only talks to the API server through [`IngressTemplateStore`]
//! so unit tests can substitute a mock. [`KubeStore`] is the production
//! implementation over `kube::Api`.

use async_trait::async_trait;
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{Api, ListParams, Patch, PatchParams, PostParams};
use kube::{Client, ResourceExt};
use tracing::warn;

#[cfg(test)]
use mockall::automock;

use crate::crd::{IngressTemplate, IngressTemplateStatus};
use crate::Error;

/// Field manager recorded on every write made by the controller
pub const FIELD_MANAGER: &str = "ingress-template-controller";

/// Trait abstracting Kubernetes operations on IngressTemplates and Ingresses
///
/// This trait allows mocking the Kubernetes client in tests while using
/// the real client in production. Absent objects are `Ok(None)`, never errors.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait IngressTemplateStore: Send + Sync {
    /// Fetch an IngressTemplate by namespace and name
    async fn get_template(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<IngressTemplate>, Error>;

    /// Fetch an Ingress by namespace and name
    async fn get_ingress(&self, namespace: &str, name: &str) -> Result<Option<Ingress>, Error>;

    /// Find the Ingress whose controller owner reference points at `owner_uid`
    async fn find_owned_ingress(
        &self,
        namespace: &str,
        owner_uid: &str,
    ) -> Result<Option<Ingress>, Error>;

    /// Create an Ingress
    ///
    /// Returns [`Error::Conflict`] if an object with the same name appeared
    /// since it was looked up.
    async fn create_ingress(&self, namespace: &str, ingress: &Ingress) -> Result<Ingress, Error>;

    /// Replace an existing Ingress
    ///
    /// The write carries the Ingress's `resourceVersion`; a stale version
    /// yields [`Error::Conflict`].
    async fn replace_ingress(&self, namespace: &str, ingress: &Ingress)
        -> Result<Ingress, Error>;

    /// Write the status subresource of an IngressTemplate
    ///
    /// When `resource_version` is set the write is rejected with
    /// [`Error::Conflict`] if the IngressTemplate changed since it was read.
    async fn patch_template_status(
        &self,
        namespace: &str,
        name: &str,
        resource_version: Option<String>,
        status: &IngressTemplateStatus,
    ) -> Result<(), Error>;
}

/// Real Kubernetes store implementation
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    /// Create a new store wrapping the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn templates(&self, namespace: &str) -> Api<IngressTemplate> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn ingresses(&self, namespace: &str) -> Api<Ingress> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn post_params() -> PostParams {
    PostParams {
        dry_run: false,
        field_manager: Some(FIELD_MANAGER.to_string()),
    }
}

fn ingress_key(namespace: &str, ingress: &Ingress) -> String {
    let name = ingress
        .metadata
        .name
        .as_deref()
        .or(ingress.metadata.generate_name.as_deref())
        .unwrap_or_default();
    format!("{namespace}/{name}")
}

/// Returns true if `ingress` is controlled by the object with `owner_uid`
pub(crate) fn is_controlled_by(ingress: &Ingress, owner_uid: &str) -> bool {
    ingress
        .owner_references()
        .iter()
        .any(|r| r.controller == Some(true) && r.uid == owner_uid)
}

#[async_trait]
impl IngressTemplateStore for KubeStore {
    async fn get_template(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<IngressTemplate>, Error> {
        Ok(self.templates(namespace).get_opt(name).await?)
    }

    async fn get_ingress(&self, namespace: &str, name: &str) -> Result<Option<Ingress>, Error> {
        Ok(self.ingresses(namespace).get_opt(name).await?)
    }

    async fn find_owned_ingress(
        &self,
        namespace: &str,
        owner_uid: &str,
    ) -> Result<Option<Ingress>, Error> {
        let list = self.ingresses(namespace).list(&ListParams::default()).await?;
        let mut owned = list
            .items
            .into_iter()
            .filter(|ingress| is_controlled_by(ingress, owner_uid));

        let first = owned.next();
        if let Some(extra) = owned.next() {
            warn!(
                namespace,
                owner_uid,
                ingress = %extra.name_any(),
                "multiple Ingresses controlled by the same IngressTemplate, using the first"
            );
        }
        Ok(first)
    }

    async fn create_ingress(&self, namespace: &str, ingress: &Ingress) -> Result<Ingress, Error> {
        self.ingresses(namespace)
            .create(&post_params(), ingress)
            .await
            .map_err(|e| Error::from_apply(ingress_key(namespace, ingress), e))
    }

    async fn replace_ingress(
        &self,
        namespace: &str,
        ingress: &Ingress,
    ) -> Result<Ingress, Error> {
        let name = ingress.name_any();
        self.ingresses(namespace)
            .replace(&name, &post_params(), ingress)
            .await
            .map_err(|e| Error::from_apply(ingress_key(namespace, ingress), e))
    }

    async fn patch_template_status(
        &self,
        namespace: &str,
        name: &str,
        resource_version: Option<String>,
        status: &IngressTemplateStatus,
    ) -> Result<(), Error> {
        let mut status_patch = serde_json::json!({
            "status": status
        });
        if let Some(rv) = resource_version {
            status_patch["metadata"] = serde_json::json!({ "resourceVersion": rv });
        }

        self.templates(namespace)
            .patch_status(
                name,
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(&status_patch),
            )
            .await
            .map_err(|e| Error::from_status_update(format!("{namespace}/{name}"), e))?;

        Ok(())
    }
}
