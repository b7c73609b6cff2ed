//! Ingress renderer
//!
//! Walks an Ingress document and rewrites the template-bearing string fields.
//! Only these locations are rendered:
//! - `metadata.labels[*]` and `metadata.annotations[*]` values
//! - `spec.tls[i].hosts[j]` and `spec.tls[i].secretName`
//! - `spec.rules[i].host`
//! - `spec.rules[i].http.paths[j].backend.service.name`
//! - `spec.rules[i].http.paths[j].backend.resource.name`
//!
//! Everything else (ports, path types, paths, ingress class, default backend)
//! is copied verbatim, even when it contains template-like text.

use std::collections::BTreeMap;

use k8s_openapi::api::networking::v1::{Ingress, IngressBackend, IngressRule, IngressTLS};

use super::context::RenderContext;
use super::engine::TemplateEngine;
use super::error::RenderError;

/// Renders Ingress documents against a [`RenderContext`]
///
/// Rendering is pure: the input document is never modified, and the same
/// (context, document) pair always yields the same result or the same error.
#[derive(Default)]
pub struct IngressRenderer {
    engine: TemplateEngine,
}

impl IngressRenderer {
    /// Create a new renderer
    pub fn new() -> Self {
        Self {
            engine: TemplateEngine::new(),
        }
    }

    /// Render every template-bearing field of `ingress`
    ///
    /// # Errors
    ///
    /// Returns a [`RenderError`] naming the first field that failed. No
    /// partially rendered document is ever returned.
    pub fn render(&self, ctx: &RenderContext, ingress: &Ingress) -> Result<Ingress, RenderError> {
        let mut rendered = ingress.clone();

        if let Some(labels) = rendered.metadata.labels.as_mut() {
            self.render_map(ctx, "metadata.labels", labels)?;
        }
        if let Some(annotations) = rendered.metadata.annotations.as_mut() {
            self.render_map(ctx, "metadata.annotations", annotations)?;
        }

        if let Some(spec) = rendered.spec.as_mut() {
            if let Some(tls) = spec.tls.as_mut() {
                for (i, entry) in tls.iter_mut().enumerate() {
                    self.render_tls(ctx, i, entry)?;
                }
            }
            if let Some(rules) = spec.rules.as_mut() {
                for (i, rule) in rules.iter_mut().enumerate() {
                    self.render_rule(ctx, i, rule)?;
                }
            }
        }

        Ok(rendered)
    }

    /// Render a single string value, reporting failures against `field`
    pub fn render_value(
        &self,
        ctx: &RenderContext,
        field: &str,
        value: &str,
    ) -> Result<String, RenderError> {
        self.engine
            .render(value, ctx)
            .map_err(|e| RenderError::new(field, e))
    }

    fn render_map(
        &self,
        ctx: &RenderContext,
        field: &str,
        map: &mut BTreeMap<String, String>,
    ) -> Result<(), RenderError> {
        for (key, value) in map.iter_mut() {
            *value = self.render_value(ctx, &format!("{field}[{key}]"), value)?;
        }
        Ok(())
    }

    fn render_tls(
        &self,
        ctx: &RenderContext,
        index: usize,
        tls: &mut IngressTLS,
    ) -> Result<(), RenderError> {
        if let Some(hosts) = tls.hosts.as_mut() {
            for (j, host) in hosts.iter_mut().enumerate() {
                *host = self.render_value(ctx, &format!("spec.tls[{index}].hosts[{j}]"), host)?;
            }
        }
        if let Some(secret_name) = tls.secret_name.as_mut() {
            *secret_name = self.render_value(
                ctx,
                &format!("spec.tls[{index}].secretName"),
                secret_name,
            )?;
        }
        Ok(())
    }

    fn render_rule(
        &self,
        ctx: &RenderContext,
        index: usize,
        rule: &mut IngressRule,
    ) -> Result<(), RenderError> {
        if let Some(host) = rule.host.as_mut() {
            *host = self.render_value(ctx, &format!("spec.rules[{index}].host"), host)?;
        }

        let Some(http) = rule.http.as_mut() else {
            return Ok(());
        };
        for (j, path) in http.paths.iter_mut().enumerate() {
            let field = format!("spec.rules[{index}].http.paths[{j}].backend");
            self.render_backend(ctx, &field, &mut path.backend)?;
        }
        Ok(())
    }

    fn render_backend(
        &self,
        ctx: &RenderContext,
        field: &str,
        backend: &mut IngressBackend,
    ) -> Result<(), RenderError> {
        if let Some(service) = backend.service.as_mut() {
            if !service.name.is_empty() {
                service.name =
                    self.render_value(ctx, &format!("{field}.service.name"), &service.name)?;
            }
        }
        if let Some(resource) = backend.resource.as_mut() {
            if !resource.name.is_empty() {
                resource.name =
                    self.render_value(ctx, &format!("{field}.resource.name"), &resource.name)?;
            }
        }
        Ok(())
    }
}
