//! Template engine for `{{ .path }}` expressions
//!
//! Uses minijinja with custom syntax configuration:
//! - Variable delimiters: `{{...}}`
//! - Block and comment delimiters moved to control-character sequences, so
//!   literal `{%` and `{#` in Ingress values (nginx snippets, colors) pass
//!   through untouched
//!
//! Paths may be written with a leading dot (`{{ .Metadata.Namespace }}`),
//! the conventional form for Kubernetes manifest templates. The leading dot
//! is stripped before evaluation so it resolves against the context root.

use minijinja::syntax::SyntaxConfig;
use minijinja::{Environment, UndefinedBehavior};

use super::context::RenderContext;
use super::error::TemplateError;

const BLOCK_DELIMITERS: (&str, &str) = ("\u{1}%", "%\u{1}");
const COMMENT_DELIMITERS: (&str, &str) = ("\u{1}#", "#\u{1}");

/// Template engine for string field rendering
///
/// Supports:
/// - `{{ .path.to.value }}` and `{{ path.to.value }}` lookups
/// - minijinja builtin filters (`default`, `upper`, `lower`, `trim`, ...)
/// - Strict undefined variable handling
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    /// Create a new template engine
    ///
    /// # Panics
    ///
    /// Panics if minijinja rejects the hardcoded delimiters, which only a
    /// library change could cause.
    pub fn new() -> Self {
        let syntax = SyntaxConfig::builder()
            .variable_delimiters("{{", "}}")
            .block_delimiters(BLOCK_DELIMITERS.0, BLOCK_DELIMITERS.1)
            .comment_delimiters(COMMENT_DELIMITERS.0, COMMENT_DELIMITERS.1)
            .build()
            .expect("template syntax configuration is hardcoded and valid");

        let mut env = Environment::new();
        env.set_syntax(syntax);
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);

        Self { env }
    }

    /// Render a template string with the given context
    ///
    /// Strings without template syntax are returned unchanged without being
    /// handed to the evaluator.
    ///
    /// # Errors
    ///
    /// Returns `TemplateError` if:
    /// - Template syntax is invalid
    /// - A referenced variable is undefined
    /// - A filter or expression fails to evaluate
    pub fn render(&self, template: &str, ctx: &RenderContext) -> Result<String, TemplateError> {
        if !Self::has_template_syntax(template) {
            return Ok(template.to_string());
        }

        let normalized = normalize_leading_dots(template);

        self.env
            .render_str(&normalized, ctx.to_value())
            .map_err(TemplateError::from)
    }

    /// Check if a string contains a `{{` expression
    pub fn has_template_syntax(s: &str) -> bool {
        s.contains("{{")
    }
}

/// Strip the leading dot of every path inside `{{...}}` expressions.
///
/// Converts `{{ .Metadata.Namespace }}` → `{{ Metadata.Namespace }}`.
/// Member access dots (`Metadata.Namespace`), decimal points and quoted
/// strings are preserved.
fn normalize_leading_dots(template: &str) -> String {
    let mut result = String::with_capacity(template.len());
    let mut remaining = template;

    while let Some(start) = remaining.find("{{") {
        result.push_str(&remaining[..start + 2]); // Include "{{"
        remaining = &remaining[start + 2..];

        if let Some(end) = remaining.find("}}") {
            let expression = &remaining[..end];
            result.push_str(&strip_expression_dots(expression));
            result.push_str("}}");
            remaining = &remaining[end + 2..];
        } else {
            // No closing braces; leave it for the parser to reject
            result.push_str(remaining);
            remaining = "";
        }
    }

    result.push_str(remaining);
    result
}

/// Drop dots that start a path within a single expression, skipping quoted strings.
fn strip_expression_dots(expr: &str) -> String {
    let mut result = String::with_capacity(expr.len());
    let mut chars = expr.chars().peekable();
    let mut in_single_quote = false;
    let mut in_double_quote = false;

    while let Some(ch) = chars.next() {
        match ch {
            '\'' if !in_double_quote => {
                in_single_quote = !in_single_quote;
                result.push(ch);
            }
            '"' if !in_single_quote => {
                in_double_quote = !in_double_quote;
                result.push(ch);
            }
            '.' if !in_single_quote && !in_double_quote => {
                let prev_continues_path = result
                    .chars()
                    .last()
                    .is_some_and(|c| c.is_alphanumeric() || matches!(c, '_' | ')' | ']'));
                let next_starts_ident = chars
                    .peek()
                    .is_some_and(|c| c.is_alphabetic() || *c == '_');
                if prev_continues_path || !next_starts_ident {
                    result.push('.');
                }
            }
            _ => result.push(ch),
        }
    }

    result
}
