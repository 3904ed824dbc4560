use serde_json::{Map, Value};

/// `{success: true, ...body}`. A body that is not an object is nested under
/// `fallback_key`.
pub fn merge_success(body: Value, fallback_key: &str) -> Value {
    let mut merged = Map::new();
    merged.insert("success".to_string(), Value::Bool(true));
    match body {
        Value::Object(fields) => {
            for (key, value) in fields {
                if key != "success" {
                    merged.insert(key, value);
                }
            }
        }
        other => {
            merged.insert(fallback_key.to_string(), other);
        }
    }
    Value::Object(merged)
}
