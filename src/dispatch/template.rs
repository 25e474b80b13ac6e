//! Outbound body templates.
//!
//! # Responsibilities
//! - Register named handlebars templates once at load time
//! - Render a template against an inbound payload
//! - Parse the rendered text as the JSON body to send
//!
//! Templates see the payload as `JSON`, e.g. `{"text": "{{JSON.user_name}}"}`.
//! `{{tojson JSON.commits}}` writes any value as JSON text.

use handlebars::{handlebars_helper, no_escape, Handlebars};
use serde::Serialize;
use serde_json::Value;

use crate::error::RenderError;

handlebars_helper!(tojson: |v: Json| serde_json::to_string(v).unwrap_or_default());

#[derive(Serialize)]
struct RenderContext<'a> {
    #[serde(rename = "JSON")]
    json: &'a Value,
}

/// Named renderers, read-only after load.
pub struct TemplateTable {
    registry: Handlebars<'static>,
}

impl TemplateTable {
    pub fn new() -> Self {
        let mut registry = Handlebars::new();
        // Output is JSON, not HTML.
        registry.register_escape_fn(no_escape);
        registry.register_helper("tojson", Box::new(tojson));
        Self { registry }
    }

    /// Register `source` under `name`, replacing any previous template.
    pub fn register(&mut self, name: &str, source: &str) -> Result<(), handlebars::TemplateError> {
        self.registry.register_template_string(name, source)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registry.has_template(name)
    }

    pub fn len(&self) -> usize {
        self.registry.get_templates().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.registry.get_templates().keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Render `name` against `payload` to text.
    pub fn render_text(&self, name: &str, payload: &Value) -> Result<String, RenderError> {
        if !self.contains(name) {
            return Err(RenderError::UnknownTemplate(name.to_string()));
        }
        self.registry
            .render(name, &RenderContext { json: payload })
            .map_err(|source| RenderError::Render {
                name: name.to_string(),
                source,
            })
    }

    /// Render `name` against `payload` and parse the result as JSON.
    pub fn render(&self, name: &str, payload: &Value) -> Result<Value, RenderError> {
        let text = self.render_text(name, payload)?;
        serde_json::from_str(&text).map_err(|source| RenderError::InvalidJson {
            name: name.to_string(),
            source,
        })
    }
}

impl Default for TemplateTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TemplateTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateTable")
            .field("templates", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table(source: &str) -> TemplateTable {
        let mut table = TemplateTable::new();
        table.register("t", source).unwrap();
        table
    }

    #[test]
    fn test_render_payload_fields() {
        let table = table(r#"{"text": "{{JSON.user_name}} pushed {{JSON.commits.[0].id}}"}"#);
        let body = table
            .render("t", &json!({"user_name": "John Smith", "commits": [{"id": "abc"}]}))
            .unwrap();
        assert_eq!(body, json!({"text": "John Smith pushed abc"}));
    }

    #[test]
    fn test_no_html_escaping() {
        let table = table(r#"{"text": "{{JSON.s}}"}"#);
        let body = table.render("t", &json!({"s": "a<b>&c"})).unwrap();
        assert_eq!(body, json!({"text": "a<b>&c"}));
    }

    #[test]
    fn test_tojson_helper() {
        let table = table(r#"{"commits": {{tojson JSON.commits}}, "missing": {{tojson JSON.nope}} }"#);
        let body = table.render("t", &json!({"commits": [1, {"a": "b"}]})).unwrap();
        assert_eq!(body, json!({"commits": [1, {"a": "b"}], "missing": null}));
    }

    #[test]
    fn test_missing_field_renders_empty() {
        let table = table(r#"{"text": "[{{JSON.absent}}]"}"#);
        assert_eq!(table.render("t", &json!({})).unwrap(), json!({"text": "[]"}));
    }

    #[test]
    fn test_invalid_json_output() {
        let table = table(r#"{"text": "{{JSON.s}}"}"#);
        let err = table.render("t", &json!({"s": "quote\"inside"})).unwrap_err();
        assert!(matches!(err, RenderError::InvalidJson { .. }));
    }

    #[test]
    fn test_unknown_template() {
        let err = TemplateTable::new().render("nope", &json!({})).unwrap_err();
        assert!(matches!(err, RenderError::UnknownTemplate(_)));
    }

    #[test]
    fn test_invalid_template_source() {
        let mut table = TemplateTable::new();
        assert!(table.register("bad", "{{#if}}").is_err());
        assert!(!table.contains("bad"));
    }

    #[test]
    fn test_names_sorted() {
        let mut table = TemplateTable::new();
        table.register("b", "{}").unwrap();
        table.register("a", "{}").unwrap();
        assert_eq!(table.names(), ["a", "b"]);
        assert_eq!(table.len(), 2);
    }
}
