//! Custom Resource Definitions for the IngressTemplate operator

mod ingress_template;
mod types;

pub use ingress_template::{IngressTemplate, IngressTemplateSpec, IngressTemplateStatus};
pub use types::ConditionStatus;
