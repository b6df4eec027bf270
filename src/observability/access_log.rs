//! Access log line formatting.
//!
//! The context is a JSON object so plugins can add, drop or rewrite fields
//! freely before the line is rendered.

use serde_json::{Map, Value};

/// Named fields available to the access log format.
pub type AccessLogContext = Map<String, Value>;

/// Rendered in place of null or missing fields.
const MISSING: &str = "-";

/// Substitute every `{field}` in `format` from `context`. `{{` and `}}`
/// render as literal braces.
pub fn format_access_log(format: &str, context: &AccessLogContext) -> String {
    let mut line = String::with_capacity(format.len() + 64);
    let mut rest = format;
    while let Some(start) = rest.find(['{', '}']) {
        line.push_str(&rest[..start]);
        let brace = &rest[start..start + 1];
        let after = &rest[start + 1..];
        if after.starts_with(brace) {
            line.push_str(brace);
            rest = &after[1..];
            continue;
        }
        if brace == "}" {
            line.push('}');
            rest = after;
            continue;
        }
        match after.find('}') {
            Some(end) => {
                render_value(&mut line, context.get(&after[..end]));
                rest = &after[end + 1..];
            }
            None => {
                line.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    line.push_str(rest);
    line
}

fn render_value(line: &mut String, value: Option<&Value>) {
    match value {
        None | Some(Value::Null) => line.push_str(MISSING),
        Some(Value::String(s)) => line.push_str(s),
        Some(other) => line.push_str(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::DEFAULT_ACCESS_LOG_FORMAT;
    use serde_json::json;

    fn context(value: Value) -> AccessLogContext {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn renders_default_format() {
        let ctx = context(json!({
            "client_ip": "10.0.0.1",
            "client_port": 51000,
            "request_method": "GET",
            "request_path": "/index.html",
            "request_ua": "curl/8.0",
            "connection_time_ms": "1.50",
        }));
        assert_eq!(
            format_access_log(DEFAULT_ACCESS_LOG_FORMAT, &ctx),
            "10.0.0.1:51000 - GET /index.html - curl/8.0 - 1.50ms"
        );
    }

    #[test]
    fn missing_and_null_fields_render_as_dash() {
        let ctx = context(json!({"client_ip": null}));
        assert_eq!(format_access_log("{client_ip} {nope} done", &ctx), "- - done");
    }

    #[test]
    fn dangling_brace_is_kept_verbatim() {
        let ctx = AccessLogContext::new();
        assert_eq!(format_access_log("a {b", &ctx), "a {b");
    }

    #[test]
    fn doubled_braces_render_literally() {
        let ctx = context(json!({"request_path": "/a"}));
        assert_eq!(
            format_access_log("{{\"path\": \"{request_path}\"}}", &ctx),
            "{\"path\": \"/a\"}"
        );
        assert_eq!(format_access_log("{{request_path}}", &ctx), "{request_path}");
    }
}
