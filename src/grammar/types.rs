//! Built-in column type grammar
//!
//! Spec strings look like `int`, `string[]`, `float[][]` or `uint8=3`: a base
//! type, any number of `[]` array suffixes and an optional `=literal` default.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::GrammarError;
use crate::model::{CellRef, Value};

use super::{ColumnParser, TypeGrammar};

/// Formatting knobs shared by all parsers of one run
#[derive(Debug, Clone)]
pub struct GrammarOptions {
    /// Output format of `date` values
    pub date_fmt: String,
    /// Output format of `tinydate` values
    pub tiny_date_fmt: String,
    /// Emit `timestamp` values in milliseconds instead of seconds
    pub timestamp_ms: bool,
    /// Round floats to this many fraction digits
    pub fraction_digits: Option<u32>,
    pub custom_data_cell: Option<CellRef>,
}

impl Default for GrammarOptions {
    fn default() -> Self {
        Self {
            date_fmt: "%Y/%m/%d %H:%M:%S".to_string(),
            tiny_date_fmt: "%Y/%m/%d".to_string(),
            timestamp_ms: false,
            fraction_digits: None,
            custom_data_cell: None,
        }
    }
}

/// The grammar shipped with the tool
#[derive(Debug, Clone, Default)]
pub struct BuiltinGrammar {
    options: GrammarOptions,
}

impl BuiltinGrammar {
    pub fn new(options: GrammarOptions) -> Self {
        Self { options }
    }
}

impl TypeGrammar for BuiltinGrammar {
    fn build(&self, spec: &str) -> Result<Arc<dyn ColumnParser>, GrammarError> {
        Ok(Arc::new(BuiltinParser::compile(spec, &self.options)?))
    }

    fn custom_data_cell(&self) -> Option<CellRef> {
        self.options.custom_data_cell
    }
}

#[derive(Debug, Clone)]
enum Kind {
    Int { min: i64, max: i64 },
    Float { fraction_digits: Option<u32> },
    String,
    Bool,
    Date { fmt: String },
    Timestamp { millis: bool },
    Json,
    Array(Box<Kind>),
}

#[derive(Debug)]
struct BuiltinParser {
    spec: String,
    kind: Kind,
    default: Option<Value>,
}

impl BuiltinParser {
    fn compile(spec: &str, options: &GrammarOptions) -> Result<Self, GrammarError> {
        let (type_part, default_text) = match spec.split_once('=') {
            Some((t, d)) => (t.trim(), Some(d.trim())),
            None => (spec.trim(), None),
        };
        let type_part = type_part.to_ascii_lowercase();

        let mut base = type_part.as_str();
        let mut depth = 0;
        while let Some(inner) = base.strip_suffix("[]") {
            base = inner.trim_end();
            depth += 1;
        }

        let mut kind = base_kind(base, options)?;
        for _ in 0..depth {
            kind = Kind::Array(Box::new(kind));
        }

        let mut canonical = format!("{}{}", base, "[]".repeat(depth));
        let default = match default_text {
            Some(text) => {
                let value = kind
                    .parse(text)
                    .map_err(|e| GrammarError::new(format!("bad default \"{}\": {}", text, e)))?;
                if !kind.is_valid(&value) {
                    return Err(GrammarError::new(format!(
                        "default \"{}\" out of range",
                        text
                    )));
                }
                canonical.push('=');
                canonical.push_str(text);
                Some(value)
            }
            None => kind.builtin_default(),
        };

        Ok(Self {
            spec: canonical,
            kind,
            default,
        })
    }
}

impl ColumnParser for BuiltinParser {
    fn parse(&self, text: &str) -> Result<Value, GrammarError> {
        self.kind.parse(text)
    }

    fn is_valid(&self, value: &Value) -> bool {
        self.kind.is_valid(value)
    }

    fn default_value(&self) -> Option<Value> {
        self.default.clone()
    }

    fn spec(&self) -> &str {
        &self.spec
    }
}

fn base_kind(name: &str, options: &GrammarOptions) -> Result<Kind, GrammarError> {
    let int = |min: i64, max: i64| Kind::Int { min, max };
    let kind = match name {
        "int8" => int(i8::MIN as i64, i8::MAX as i64),
        "int16" => int(i16::MIN as i64, i16::MAX as i64),
        "int" | "int32" => int(i32::MIN as i64, i32::MAX as i64),
        "long" | "int64" => int(i64::MIN, i64::MAX),
        "uint8" => int(0, u8::MAX as i64),
        "uint16" => int(0, u16::MAX as i64),
        "uint" | "uint32" => int(0, u32::MAX as i64),
        "uint64" => int(0, i64::MAX),
        "float" | "double" | "number" => Kind::Float {
            fraction_digits: options.fraction_digits,
        },
        "string" => Kind::String,
        "bool" => Kind::Bool,
        "date" => Kind::Date {
            fmt: options.date_fmt.clone(),
        },
        "tinydate" => Kind::Date {
            fmt: options.tiny_date_fmt.clone(),
        },
        "timestamp" => Kind::Timestamp {
            millis: options.timestamp_ms,
        },
        "json" => Kind::Json,
        "" => return Err(GrammarError::new("empty type")),
        other => return Err(GrammarError::new(format!("unknown type \"{}\"", other))),
    };
    Ok(kind)
}

impl Kind {
    fn parse(&self, text: &str) -> Result<Value, GrammarError> {
        match self {
            Kind::Int { .. } => parse_int(text.trim()).map(Value::Int),
            Kind::Float { fraction_digits } => {
                let f: f64 = text
                    .trim()
                    .parse()
                    .map_err(|_| GrammarError::new(format!("\"{}\" is not a number", text)))?;
                Ok(Value::Float(round_to(f, *fraction_digits)))
            }
            Kind::String => Ok(Value::String(text.to_string())),
            Kind::Bool => match text.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "y" => Ok(Value::Bool(true)),
                "false" | "0" | "no" | "n" => Ok(Value::Bool(false)),
                _ => Err(GrammarError::new(format!("\"{}\" is not a bool", text))),
            },
            Kind::Date { fmt } => {
                let dt = parse_datetime(text.trim())?;
                Ok(Value::String(dt.format(fmt).to_string()))
            }
            Kind::Timestamp { millis } => {
                let trimmed = text.trim();
                if let Ok(raw) = trimmed.parse::<i64>() {
                    return Ok(Value::Int(raw));
                }
                let dt = parse_datetime(trimmed)?.and_utc();
                Ok(Value::Int(if *millis {
                    dt.timestamp_millis()
                } else {
                    dt.timestamp()
                }))
            }
            Kind::Json => serde_json::from_str::<serde_json::Value>(text)
                .map(Value::from)
                .map_err(|e| GrammarError::new(format!("invalid json: {}", e))),
            Kind::Array(elem) => {
                let trimmed = text.trim();
                let body = trimmed
                    .strip_prefix('[')
                    .and_then(|s| s.strip_suffix(']'))
                    .unwrap_or(trimmed);
                if body.trim().is_empty() {
                    return Ok(Value::Array(Vec::new()));
                }
                split_top_level(body)
                    .into_iter()
                    .map(|part| {
                        let part = part.trim();
                        match **elem {
                            Kind::String => Ok(Value::String(unquote(part).to_string())),
                            _ => elem.parse(part),
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(Value::Array)
            }
        }
    }

    fn is_valid(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (Kind::Int { min, max }, Value::Int(i)) => i >= min && i <= max,
            (Kind::Float { .. }, Value::Float(f)) => f.is_finite(),
            (Kind::String, Value::String(_)) => true,
            (Kind::Bool, Value::Bool(_)) => true,
            (Kind::Date { .. }, Value::String(_)) => true,
            (Kind::Timestamp { .. }, Value::Int(_)) => true,
            (Kind::Json, _) => true,
            (Kind::Array(elem), Value::Array(items)) => items.iter().all(|v| elem.is_valid(v)),
            _ => false,
        }
    }

    fn builtin_default(&self) -> Option<Value> {
        match self {
            Kind::Int { .. } => Some(Value::Int(0)),
            Kind::Float { .. } => Some(Value::Float(0.0)),
            Kind::String => Some(Value::String(String::new())),
            Kind::Bool => Some(Value::Bool(false)),
            Kind::Array(_) => Some(Value::Array(Vec::new())),
            Kind::Date { .. } | Kind::Timestamp { .. } | Kind::Json => None,
        }
    }
}

fn parse_int(text: &str) -> Result<i64, GrammarError> {
    if let Ok(i) = text.parse::<i64>() {
        return Ok(i);
    }
    // Workbooks may hand integers over as `3.0`
    match text.parse::<f64>() {
        Ok(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => Ok(f as i64),
        _ => Err(GrammarError::new(format!("\"{}\" is not an integer", text))),
    }
}

fn round_to(value: f64, digits: Option<u32>) -> f64 {
    match digits {
        Some(d) => {
            let factor = 10f64.powi(d as i32);
            (value * factor).round() / factor
        }
        None => value,
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%Y-%m-%d"];

fn parse_datetime(text: &str) -> Result<NaiveDateTime, GrammarError> {
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Ok(dt);
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(text, fmt) {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                return Ok(dt);
            }
        }
    }
    Err(GrammarError::new(format!("\"{}\" is not a date", text)))
}

/// Split on commas that are not nested in brackets, braces or quotes
fn split_top_level(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, ch) in body.char_indices() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => {}
            None => match ch {
                '\'' | '"' => quote = Some(ch),
                '[' | '{' => depth += 1,
                ']' | '}' => depth -= 1,
                ',' if depth == 0 => {
                    parts.push(&body[start..i]);
                    start = i + 1;
                }
                _ => {}
            },
        }
    }
    parts.push(&body[start..]);
    parts
}

fn unquote(s: &str) -> &str {
    for q in ['"', '\''] {
        if let Some(inner) = s.strip_prefix(q).and_then(|r| r.strip_suffix(q)) {
            return inner;
        }
    }
    s
}
