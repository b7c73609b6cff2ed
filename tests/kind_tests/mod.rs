//! Integration tests for the IngressTemplate operator
//!
//! These tests tell the story of how namespace owners use IngressTemplates
//! against a real API server.
//!
//! # Test Organization
//!
//! - `ingress_template`: Stories about a template producing, updating and
//!   owning its Ingress, driven one reconcile cycle at a time
//!
//! - `controller`: Stories about the running controller reacting to watch
//!   events without being called directly
//!
//! # Running These Tests
//!
//! ```bash
//! cargo test --test kind -- --ignored --test-threads=1
//! ```

mod controller;
mod helpers;
mod ingress_template;
