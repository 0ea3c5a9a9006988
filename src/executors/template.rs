//! Template resolution for executor config strings.
//!
//! Variables reference the run context: `{{variable}}` or a dotted path like
//! `{{httpResponse.data.title}}`. The `json` helper splices a complex value
//! as pretty-printed JSON: `{{json httpResponse.data}}`.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::{FlowbaseError, Result, runtime::WorkflowContext};

/// Regex pattern for template variables
/// Format: `{{key}}`, `{{key.subkey}}` or `{{json key.subkey}}`
const TEMPLATE_PATTERN: &str = r"\{\{\s*(json\s+)?([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z0-9_]+)*)\s*\}\}";

static TEMPLATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(TEMPLATE_PATTERN).unwrap());

/// Resolve every template variable in `template` against the context.
/// Returns error if any variable cannot be resolved or any `{{` opener does
/// not form a well-formed expression.
pub fn resolve_template(
    ctx: &WorkflowContext,
    template: &str,
) -> Result<String> {
    let mut result = String::with_capacity(template.len());
    let mut errors: Vec<String> = Vec::new();

    // Single pass over the input; rendered values are spliced in as-is and
    // never rescanned for further expressions.
    let mut matched = 0;
    let mut tail = 0;
    for caps in TEMPLATE_RE.captures_iter(template) {
        matched += 1;
        let full_match = caps.get(0).unwrap();
        let as_json = caps.get(1).is_some();
        let path = &caps[2];

        result.push_str(&template[tail..full_match.start()]);
        tail = full_match.end();

        match ctx.lookup_path(path) {
            Some(value) => {
                if as_json {
                    result.push_str(&serde_json::to_string_pretty(value)?);
                } else {
                    result.push_str(&render_value(value));
                }
            }
            None => {
                errors.push(format!("variable '{}' not found", path));
            }
        }
    }
    result.push_str(&template[tail..]);

    // Every opener must have been consumed by a well-formed expression.
    let openers = template.matches("{{").count();
    if openers != matched {
        errors.push(format!("malformed template expression in '{}'", template));
    }

    if !errors.is_empty() {
        return Err(FlowbaseError::Template(errors.join(", ")));
    }

    Ok(result)
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        // objects and arrays render as compact JSON
        v => v.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn ctx() -> WorkflowContext {
        WorkflowContext::new()
            .insert(
                "httpResponse",
                json!({
                    "data": { "title": "delectus aut autem", "completed": false },
                    "status": 200,
                    "statusText": "OK"
                }),
            )
            .unwrap()
            .insert("aiResponse", json!("a summary"))
            .unwrap()
            .insert("count", json!(3))
            .unwrap()
            .insert("nothing", json!(null))
            .unwrap()
    }

    #[test]
    fn test_resolve_plain_variable() {
        let out = resolve_template(&ctx(), "summary: {{aiResponse}}").unwrap();
        assert_eq!(out, "summary: a summary");
    }

    #[test]
    fn test_resolve_dotted_path() {
        let out = resolve_template(&ctx(), "{{httpResponse.data.title}} ({{httpResponse.status}})").unwrap();
        assert_eq!(out, "delectus aut autem (200)");
    }

    #[test]
    fn test_resolve_scalars() {
        assert_eq!(resolve_template(&ctx(), "{{count}}").unwrap(), "3");
        assert_eq!(resolve_template(&ctx(), "{{nothing}}").unwrap(), "null");
        assert_eq!(resolve_template(&ctx(), "{{httpResponse.data.completed}}").unwrap(), "false");
    }

    #[test]
    fn test_resolve_object_renders_compact_json() {
        let out = resolve_template(&ctx(), "{{httpResponse.data}}").unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, json!({ "title": "delectus aut autem", "completed": false }));
    }

    #[test]
    fn test_json_helper_pretty_prints() {
        let out = resolve_template(&ctx(), "{{json httpResponse.data}}").unwrap();
        assert!(out.contains('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, json!({ "title": "delectus aut autem", "completed": false }));
    }

    #[test]
    fn test_whitespace_inside_braces() {
        let out = resolve_template(&ctx(), "{{ aiResponse }}").unwrap();
        assert_eq!(out, "a summary");
    }

    #[test]
    fn test_rendered_values_are_not_rescanned() {
        let ctx = WorkflowContext::new()
            .insert("a", json!("literal {{b}}"))
            .unwrap()
            .insert("b", json!("x"))
            .unwrap();
        let out = resolve_template(&ctx, "{{a}} and {{b}}").unwrap();
        assert_eq!(out, "literal {{b}} and x");
    }

    #[test]
    fn test_repeated_variable_resolved_everywhere() {
        let out = resolve_template(&ctx(), "{{count}} of {{count}}").unwrap();
        assert_eq!(out, "3 of 3");
    }

    #[test]
    fn test_no_variables_passes_through() {
        let out = resolve_template(&ctx(), "static text").unwrap();
        assert_eq!(out, "static text");
    }

    #[test]
    fn test_unresolved_variable_fails() {
        let err = resolve_template(&ctx(), "{{missing}}").err().unwrap();
        assert!(matches!(err, FlowbaseError::Template(_)));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_unresolved_path_segment_fails() {
        let err = resolve_template(&ctx(), "{{httpResponse.data.nope}}").err().unwrap();
        assert!(matches!(err, FlowbaseError::Template(_)));
    }

    #[test]
    fn test_malformed_expression_fails() {
        let err = resolve_template(&ctx(), "{{not closed").err().unwrap();
        assert!(matches!(err, FlowbaseError::Template(_)));

        let err = resolve_template(&ctx(), "{{bad name}}").err().unwrap();
        assert!(matches!(err, FlowbaseError::Template(_)));
    }

    #[test]
    fn test_multiple_errors_reported_together() {
        let err = resolve_template(&ctx(), "{{a}} and {{b}}").err().unwrap();
        let text = err.to_string();
        assert!(text.contains("'a'"));
        assert!(text.contains("'b'"));
    }
}
