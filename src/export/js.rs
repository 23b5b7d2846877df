//! JavaScript object literal backend

use crate::error::{ConvertError, Result};
use crate::model::Value;

use super::{Backend, ExportMode};

/// Writes values as JavaScript literals with single-quoted strings
#[derive(Debug, Clone, Copy, Default)]
pub struct JsBackend;

impl Backend for JsBackend {
    fn id(&self) -> &'static str {
        "js"
    }

    fn default_extension(&self) -> &'static str {
        ".js"
    }

    fn default_template(&self, mode: ExportMode) -> &'static str {
        match mode {
            ExportMode::PerFile => "// {name}\nmodule.exports = {data};\n",
            ExportMode::Aggregated => "module.exports = {data};\n",
        }
    }

    fn write_value(&self, value: &Value, out: &mut String) -> Result<()> {
        write_js(value, out)
    }
}

fn write_js(value: &Value, out: &mut String) -> Result<()> {
    match value {
        Value::Null => {}
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Int(i) => out.push_str(&i.to_string()),
        Value::Float(f) if !f.is_finite() => return Err(ConvertError::NonFiniteFloat(*f)),
        Value::Float(f) => out.push_str(&f.to_string()),
        Value::String(s) => write_quoted(s, out),
        Value::Array(items) => {
            out.push('[');
            let mut first = true;
            for item in items.iter().filter(|v| !v.is_null()) {
                if !first {
                    out.push(',');
                }
                first = false;
                write_js(item, out)?;
            }
            out.push(']');
        }
        Value::Object(fields) => {
            out.push('{');
            let mut first = true;
            for (key, item) in fields.iter().filter(|(_, v)| !v.is_null()) {
                if !first {
                    out.push(',');
                }
                first = false;
                if is_bare_key(key) {
                    out.push_str(key);
                } else {
                    write_quoted(key, out);
                }
                out.push(':');
                write_js(item, out)?;
            }
            out.push('}');
        }
    }
    Ok(())
}

fn write_quoted(s: &str, out: &mut String) {
    out.push('\'');
    for ch in s.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(ch),
        }
    }
    out.push('\'');
}

/// Identifiers and non-negative integers need no quotes as object keys
fn is_bare_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        }
        Some('0') => key.len() == 1,
        Some(c) if c.is_ascii_digit() => chars.all(|c| c.is_ascii_digit()),
        _ => false,
    }
}
