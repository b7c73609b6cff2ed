//! IngressTemplate operator - templated Ingress generation for Kubernetes
//!
//! Users declare an `IngressTemplate` whose host names, TLS entries, backend
//! names, labels and annotations may contain `{{ .path }}` expressions. The
//! operator renders those expressions against the IngressTemplate's own
//! metadata and keeps exactly one owned `Ingress` in the same namespace in
//! sync with the result. Deleting the IngressTemplate deletes the Ingress via
//! Kubernetes garbage collection.
//!
//! # Modules
//!
//! - [`crd`] - The IngressTemplate Custom Resource Definition
//! - [`template`] - Expression evaluation and Ingress field rendering
//! - [`controller`] - Reconciliation, store access and controller wiring
//! - [`config`] - Command-line and environment configuration
//! - [`events`] - Kubernetes Event publishing
//! - [`telemetry`] - Logging setup
//! - [`error`] - Error types for the operator

#![deny(missing_docs)]

pub mod config;
pub mod controller;
pub mod crd;
pub mod error;
pub mod events;
pub mod telemetry;
pub mod template;

pub use error::Error;
