//! Controller for IngressTemplate resources
//!
//! Reconciliation follows the Kubernetes controller pattern with a
//! level-triggered observe-diff-act loop, driven by `kube::runtime::Controller`.

mod ingress_template;
mod runner;
mod store;

pub use ingress_template::{
    build_ingress, error_policy, owner_reference, reconcile, reconcile_template, ApplyOutcome,
    Context, ContextBuilder, ReconcileOutcome, CONTROLLER_NAME,
};
pub use runner::run;
pub use store::{IngressTemplateStore, KubeStore, FIELD_MANAGER};
