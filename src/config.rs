//! Operator configuration
//!
//! All settings come from command-line flags with environment variable
//! fallbacks. They are fixed for the lifetime of the process; in particular
//! the context shape and naming strategy must not change between deployments
//! that manage the same IngressTemplates.

use std::fmt;
use std::time::Duration;

use clap::{Args, ValueEnum};

/// Default drift-correction interval for successfully reconciled templates
pub const DEFAULT_RESYNC_SECS: u64 = 300;

/// Default deadline applied to every store call
pub const DEFAULT_STORE_TIMEOUT_SECS: u64 = 30;

/// Default number of IngressTemplates reconciled in parallel
pub const DEFAULT_CONCURRENCY: u16 = 4;

/// Shape of the values exposed to template expressions
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ContextShape {
    /// Full object metadata under `Metadata` (`{{ .Metadata.Namespace }}`)
    #[default]
    Metadata,
    /// Only the namespace under `namespace` (`{{ .namespace }}`)
    Namespace,
}

impl fmt::Display for ContextShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metadata => write!(f, "metadata"),
            Self::Namespace => write!(f, "namespace"),
        }
    }
}

/// How the generated Ingress is named
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum TargetNaming {
    /// Ingress name equals the IngressTemplate name (or its rendered `ingressName`)
    ///
    /// The target is looked up by name only. Changing `ingressName` creates a
    /// new Ingress and leaves the previous one in place, still owned by the
    /// IngressTemplate, until the IngressTemplate is deleted.
    #[default]
    Fixed,
    /// Ingress name is generated by the API server from the template name as a prefix
    Generate,
}

impl fmt::Display for TargetNaming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed => write!(f, "fixed"),
            Self::Generate => write!(f, "generate"),
        }
    }
}

/// Log output format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Settings consumed by the reconciler itself
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Rendering context shape
    pub context_shape: ContextShape,
    /// Target naming strategy
    pub naming: TargetNaming,
    /// Requeue interval after a successful reconcile
    pub resync_interval: Duration,
    /// Deadline for each store call
    pub store_timeout: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            context_shape: ContextShape::default(),
            naming: TargetNaming::default(),
            resync_interval: Duration::from_secs(DEFAULT_RESYNC_SECS),
            store_timeout: Duration::from_secs(DEFAULT_STORE_TIMEOUT_SECS),
        }
    }
}

/// Settings for the watch/dispatch layer
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ControllerSettings {
    /// Maximum number of concurrent reconciles (0 = unbounded)
    pub concurrency: u16,
    /// Restrict watches to this namespace
    pub namespace: Option<String>,
}

/// Controller flags
#[derive(Args, Debug, Clone)]
pub struct ControllerArgs {
    /// Variables exposed to templates
    #[arg(long, env = "CONTEXT_SHAPE", value_enum, default_value_t = ContextShape::Metadata)]
    pub context_shape: ContextShape,

    /// Naming strategy for generated Ingresses
    #[arg(long, env = "TARGET_NAMING", value_enum, default_value_t = TargetNaming::Fixed)]
    pub naming: TargetNaming,

    /// Maximum number of IngressTemplates reconciled in parallel (0 = unbounded)
    #[arg(long, env = "RECONCILE_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: u16,

    /// Seconds between drift-correction reconciles of a healthy IngressTemplate
    #[arg(long, env = "RESYNC_SECS", default_value_t = DEFAULT_RESYNC_SECS)]
    pub resync_secs: u64,

    /// Deadline in seconds for each Kubernetes API call made while reconciling
    #[arg(long, env = "STORE_TIMEOUT_SECS", default_value_t = DEFAULT_STORE_TIMEOUT_SECS)]
    pub store_timeout_secs: u64,

    /// Only watch IngressTemplates and Ingresses in this namespace
    #[arg(long, env = "WATCH_NAMESPACE")]
    pub namespace: Option<String>,

    /// Install or update the IngressTemplate CRD on startup
    #[arg(long, env = "INSTALL_CRD")]
    pub install_crd: bool,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl ControllerArgs {
    /// Reconciler settings derived from the flags
    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            context_shape: self.context_shape,
            naming: self.naming,
            resync_interval: Duration::from_secs(self.resync_secs),
            store_timeout: Duration::from_secs(self.store_timeout_secs),
        }
    }

    /// Dispatcher settings derived from the flags
    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            concurrency: self.concurrency,
            namespace: self.namespace.clone().filter(|ns| !ns.is_empty()),
        }
    }
}
