use serde_json::{json, Value};
use thiserror::Error;
use tracing::warn;

use grelay_provider_core::ShapeContract;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidateError {
    #[error("output is not parseable JSON: {detail}")]
    Parse { detail: String },
    #[error("shape mismatch at {path}: {detail}")]
    Shape { path: String, detail: String },
}

/// Apply the output-shape contract to raw provider text.
///
/// Without a contract the text is wrapped as `{"text": ...}` and always
/// accepted. With one, the text must parse as JSON and every field the
/// contract names must carry the declared type; providers under load
/// return prose-wrapped JSON, truncated JSON, and records with missing
/// subfields, all of which the gateway treats as retryable. Fields the
/// contract does not name are ignored.
pub fn validate(raw_text: &str, contract: Option<&ShapeContract>) -> Result<Value, ValidateError> {
    let Some(contract) = contract else {
        return Ok(json!({ "text": raw_text }));
    };
    let value: Value = serde_json::from_str(raw_text).map_err(|err| ValidateError::Parse {
        detail: err.to_string(),
    })?;
    check(&value, contract, "$")?;
    Ok(value)
}

fn check(value: &Value, shape: &ShapeContract, path: &str) -> Result<(), ValidateError> {
    match shape {
        ShapeContract::Text => {
            if !value.is_string() {
                return Err(mismatch(value, path, "expected string"));
            }
        }
        ShapeContract::Number => {
            if !value.is_number() {
                return Err(mismatch(value, path, "expected number"));
            }
        }
        ShapeContract::Array { items } => {
            let Some(elements) = value.as_array() else {
                return Err(mismatch(value, path, "expected array"));
            };
            for (index, element) in elements.iter().enumerate() {
                check(element, items, &format!("{path}[{index}]"))?;
            }
        }
        ShapeContract::Object {
            properties,
            required,
        } => {
            let Some(fields) = value.as_object() else {
                return Err(mismatch(value, path, "expected object"));
            };
            for name in required {
                if !fields.contains_key(name) {
                    return Err(mismatch(
                        value,
                        path,
                        &format!("missing required field \"{name}\""),
                    ));
                }
            }
            for (name, field_shape) in properties {
                if let Some(field) = fields.get(name) {
                    check(field, field_shape, &format!("{path}.{name}"))?;
                }
            }
        }
    }
    Ok(())
}

// The offending element goes to the log for diagnosis, never to the
// caller.
fn mismatch(value: &Value, path: &str, detail: &str) -> ValidateError {
    let mut element = value.to_string();
    if element.len() > 200 {
        let mut cut = 200;
        while !element.is_char_boundary(cut) {
            cut -= 1;
        }
        element.truncate(cut);
    }
    warn!(
        event = "validation_failed",
        path = %path,
        detail = %detail,
        element = %element
    );
    ValidateError::Shape {
        path: path.to_string(),
        detail: detail.to_string(),
    }
}
