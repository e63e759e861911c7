use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Caller-supplied description of the structured output a generation is
/// expected to produce. The serde representation is the uppercase-typed
/// schema dialect callers already hold (`{"type": "OBJECT", ...}`);
/// adapters re-encode it into whatever their provider understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ShapeContract {
    #[serde(rename = "STRING")]
    Text,
    #[serde(rename = "NUMBER")]
    Number,
    #[serde(rename = "ARRAY")]
    Array { items: Box<ShapeContract> },
    #[serde(rename = "OBJECT")]
    Object {
        properties: BTreeMap<String, ShapeContract>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        required: Vec<String>,
    },
}

impl ShapeContract {
    /// Object shape with every listed property required.
    pub fn object<K>(properties: impl IntoIterator<Item = (K, ShapeContract)>) -> Self
    where
        K: Into<String>,
    {
        let properties: BTreeMap<String, ShapeContract> = properties
            .into_iter()
            .map(|(name, shape)| (name.into(), shape))
            .collect();
        let required = properties.keys().cloned().collect();
        Self::Object {
            properties,
            required,
        }
    }

    pub fn array(items: ShapeContract) -> Self {
        Self::Array {
            items: Box::new(items),
        }
    }

    /// The contract as a plain JSON value, for embedding into a
    /// provider's structured-output directive.
    pub fn to_wire_schema(&self) -> Value {
        match self {
            Self::Text => json!({ "type": "STRING" }),
            Self::Number => json!({ "type": "NUMBER" }),
            Self::Array { items } => json!({
                "type": "ARRAY",
                "items": items.to_wire_schema(),
            }),
            Self::Object {
                properties,
                required,
            } => {
                let properties: serde_json::Map<String, Value> = properties
                    .iter()
                    .map(|(name, shape)| (name.clone(), shape.to_wire_schema()))
                    .collect();
                let mut schema = json!({
                    "type": "OBJECT",
                    "properties": properties,
                });
                if !required.is_empty() {
                    schema["required"] = json!(required);
                }
                schema
            }
        }
    }
}
