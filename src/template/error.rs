//! Template error types

use std::fmt;

/// Errors that can occur while evaluating a single template string
#[derive(Debug)]
pub enum TemplateError {
    /// Template evaluation failed (undefined variable, bad path, filter failure)
    Render(minijinja::Error),
    /// Template syntax is invalid
    Syntax(minijinja::Error),
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Render(e) => write!(f, "template render error: {}", e),
            Self::Syntax(e) => write!(f, "template syntax error: {}", e),
        }
    }
}

impl std::error::Error for TemplateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Render(e) | Self::Syntax(e) => Some(e),
        }
    }
}

impl From<minijinja::Error> for TemplateError {
    fn from(err: minijinja::Error) -> Self {
        use minijinja::ErrorKind;

        match err.kind() {
            ErrorKind::SyntaxError | ErrorKind::BadEscape => Self::Syntax(err),
            _ => Self::Render(err),
        }
    }
}

/// A failed render of an Ingress document
///
/// Carries the location of the first field that failed (for example
/// `spec.rules[0].host` or `metadata.annotations[key1]`) together with the
/// underlying template error. A render either succeeds for every field or
/// fails as a whole with one of these.
#[derive(Debug)]
pub struct RenderError {
    field: String,
    source: TemplateError,
}

impl RenderError {
    /// Create a render error for the given field location
    pub fn new(field: impl Into<String>, source: TemplateError) -> Self {
        Self {
            field: field.into(),
            source,
        }
    }

    /// Location of the field that failed to render
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The underlying template error
    pub fn cause(&self) -> &TemplateError {
        &self.source
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to render {}: {}", self.field, self.source)
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}
