//! Schema-file probing for repository analysis.
//!
//! Candidate files are parsed as JSON or, failing that, as a minimal YAML
//! subset: flat `key: value` lines, inline `[a, b]` arrays, and inline JSON
//! objects. The subset is deliberately narrow - the detection logic only
//! ever needs the three capability arrays, and files the subset cannot
//! represent are skipped, not errors. Do not widen this to full YAML.

use serde_json::{Map, Value};

/// Capability arrays accumulated from parsed schema files.
#[derive(Debug, Default)]
pub struct SchemaScan {
    /// True once any parsed file carried a capability array
    pub matched: bool,
    pub tools: Vec<Value>,
    pub resources: Vec<Value>,
    pub prompts: Vec<Value>,
}

impl SchemaScan {
    /// Fold one parsed document into the accumulated scan.
    pub fn absorb(&mut self, doc: &Value) {
        for (key, bucket) in [
            ("tools", &mut self.tools),
            ("resources", &mut self.resources),
            ("prompts", &mut self.prompts),
        ] {
            if let Some(items) = doc.get(key).and_then(Value::as_array) {
                self.matched = true;
                bucket.extend(items.iter().cloned());
            }
        }
    }
}

/// True if a file name looks like a schema candidate worth downloading.
pub fn is_schema_candidate(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.contains("mcp")
        || lower.contains("schema")
        || lower.ends_with(".json")
        || lower.ends_with(".yaml")
        || lower.ends_with(".yml")
}

/// Parse a schema document as JSON first, then as the YAML subset.
/// Returns None for anything neither parser accepts - unsupported files are
/// skipped by callers.
pub fn parse_schema_document(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        if value.is_object() {
            return Some(value);
        }
    }
    parse_yaml_subset(text)
}

/// Minimal YAML reader: flat `key: value` pairs only.
///
/// Accepted values: inline `[a, b]` arrays, inline JSON objects, and plain
/// scalars. Any top-level line the subset cannot represent (indentation,
/// `- ` list items, a bare key) rejects the whole document.
fn parse_yaml_subset(text: &str) -> Option<Value> {
    let mut map = Map::new();

    for line in text.lines() {
        let trimmed = line.trim_end();
        if trimmed.trim().is_empty() || trimmed.trim_start().starts_with('#') {
            continue;
        }
        // Indented or list-item lines mean nesting - out of subset.
        if trimmed.starts_with(' ') || trimmed.starts_with('\t') || trimmed.starts_with('-') {
            return None;
        }

        let (key, raw_value) = trimmed.split_once(':')?;
        let key = key.trim();
        if key.is_empty() || key.contains(' ') {
            return None;
        }
        map.insert(key.to_string(), parse_scalar(raw_value.trim()));
    }

    if map.is_empty() {
        None
    } else {
        Some(Value::Object(map))
    }
}

/// Parse one value: inline array, inline JSON object, or scalar.
fn parse_scalar(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }

    if raw.starts_with('{') {
        if let Ok(value) = serde_json::from_str::<Value>(raw) {
            return value;
        }
    }

    if let Some(inner) = raw.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
        let items = inner
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(parse_scalar)
            .collect();
        return Value::Array(items);
    }

    if let Ok(b) = raw.parse::<bool>() {
        return Value::Bool(b);
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Value::Number(n.into());
    }
    if let Ok(f) = raw.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }

    Value::String(raw.trim_matches('"').trim_matches('\'').to_string())
}
