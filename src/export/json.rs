//! JSON backend

use crate::error::{ConvertError, Result};
use crate::model::Value;

use super::{Backend, ExportMode};

/// JSON writer
pub struct JsonBackend {
    pretty: bool,
}

impl JsonBackend {
    pub fn new() -> Self {
        Self { pretty: false }
    }

    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl Default for JsonBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for JsonBackend {
    fn id(&self) -> &'static str {
        "json"
    }

    fn default_extension(&self) -> &'static str {
        ".json"
    }

    fn default_template(&self, _mode: ExportMode) -> &'static str {
        "{data}\n"
    }

    fn write_value(&self, value: &Value, out: &mut String) -> Result<()> {
        let json = to_json(value)?.unwrap_or(serde_json::Value::Null);
        let text = if self.pretty {
            serde_json::to_string_pretty(&json)?
        } else {
            serde_json::to_string(&json)?
        };
        out.push_str(&text);
        Ok(())
    }
}

/// Convert to `serde_json`, dropping `Null` at every depth
fn to_json(value: &Value) -> Result<Option<serde_json::Value>> {
    Ok(Some(match value {
        Value::Null => return Ok(None),
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::from(*i),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .ok_or(ConvertError::NonFiniteFloat(*f))?,
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Array(items) => {
            let mut array = Vec::with_capacity(items.len());
            for item in items {
                array.extend(to_json(item)?);
            }
            serde_json::Value::Array(array)
        }
        Value::Object(fields) => {
            let mut object = serde_json::Map::new();
            for (key, item) in fields {
                if let Some(item) = to_json(item)? {
                    object.insert(key.clone(), item);
                }
            }
            serde_json::Value::Object(object)
        }
    }))
}
