//! Templating for IngressTemplate resources
//!
//! Renders `{{ .path }}` expressions in the string fields of a generated
//! Ingress using minijinja. The values available to expressions come from
//! the source IngressTemplate's metadata:
//!
//! - `{{ .Metadata.Namespace }}`, `{{ .Metadata.Name }}`, `{{ .Metadata.Labels.KEY }}`
//!   when running with the full metadata context (default)
//! - `{{ .namespace }}` when running with the namespace-only context
//!
//! Undefined variables are errors, never empty strings.

mod context;
mod engine;
mod error;
mod renderer;

pub use context::{
    MetadataContext, RenderContext, RenderContextBuilder, METADATA_KEY, NAMESPACE_KEY,
};
pub use engine::TemplateEngine;
pub use error::{RenderError, TemplateError};
pub use renderer::IngressRenderer;
