use serde_json::Value;
use url::form_urlencoded;

/// Sanitizes sensitive fields in JSON payloads for logging
pub fn sanitize_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sanitized = serde_json::Map::new();
            for (key, val) in map {
                let sanitized_val = if is_sensitive_field(key) {
                    mask_value(val)
                } else {
                    sanitize_json(val)
                };
                sanitized.insert(key.clone(), sanitized_val);
            }
            Value::Object(sanitized)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sanitize_json).collect()),
        _ => value.clone(),
    }
}

/// Same as [`sanitize_json`] for `application/x-www-form-urlencoded` bodies,
/// which is how the gateway posts its callbacks.
pub fn sanitize_form(body: &str) -> Value {
    let mut sanitized = serde_json::Map::new();
    for (key, val) in form_urlencoded::parse(body.as_bytes()) {
        let val = Value::String(val.into_owned());
        let val = if is_sensitive_field(&key) {
            mask_value(&val)
        } else {
            val
        };
        sanitized.insert(key.into_owned(), val);
    }
    Value::Object(sanitized)
}

fn is_sensitive_field(key: &str) -> bool {
    matches!(
        key.to_lowercase().as_str(),
        "posauthcode"
            | "pos_auth_code"
            | "fingerprint"
            | "resultfingerprint"
            | "merchantresppan"
            | "pan"
            | "token"
            | "merchantresptoken"
            | "email"
            | "portalpassword"
            | "password"
            | "secret"
            | "authorization"
    )
}

fn mask_value(value: &Value) -> Value {
    match value {
        Value::String(s) if s.chars().count() > 8 => {
            let chars: Vec<char> = s.chars().collect();
            let visible: String = chars[..4].iter().collect();
            let end: String = chars[chars.len() - 4..].iter().collect();
            Value::String(format!("{}****{}", visible, end))
        }
        _ => Value::String("****".to_string()),
    }
}
