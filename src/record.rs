use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Level of a captured log call.
///
/// The set is closed and mirrors the five console entry points the
/// collector knows about. `Log` is the plain/trace level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Log,
    Info,
    Warn,
    Error,
    Debug,
}

impl LogLevel {
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Log,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Debug,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Log => "log",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Debug => "debug",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&tracing::Level> for LogLevel {
    fn from(level: &tracing::Level) -> Self {
        match *level {
            tracing::Level::TRACE => LogLevel::Log,
            tracing::Level::DEBUG => LogLevel::Debug,
            tracing::Level::INFO => LogLevel::Info,
            tracing::Level::WARN => LogLevel::Warn,
            tracing::Level::ERROR => LogLevel::Error,
        }
    }
}

/// One argument passed to a logging call.
///
/// Composite values (`List`, `Map`) are pretty-printed when the message is
/// formatted; everything else uses its natural string form. `Opaque` holds
/// the `Debug` rendering of a value that has no structured form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LogValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<LogValue>),
    Map(BTreeMap<String, LogValue>),
    Opaque(String),
}

impl LogValue {
    /// Capture any `Debug` value as an opaque argument.
    pub fn opaque(value: &dyn fmt::Debug) -> Self {
        LogValue::Opaque(format!("{:?}", value))
    }

    /// Capture any `Serialize` value through its JSON representation.
    ///
    /// Values that fail to serialize fall back to an opaque marker rather
    /// than failing the log call.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(json) => LogValue::from(json),
            Err(e) => LogValue::Opaque(format!("<unserializable: {}>", e)),
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, LogValue::List(_) | LogValue::Map(_))
    }

    /// Render this argument the way it appears inside a formatted message.
    pub fn render(&self) -> String {
        match self {
            LogValue::Null => "null".to_string(),
            LogValue::Bool(b) => b.to_string(),
            LogValue::Int(i) => i.to_string(),
            LogValue::Float(f) => render_float(*f),
            LogValue::Str(s) | LogValue::Opaque(s) => s.clone(),
            LogValue::List(_) | LogValue::Map(_) => {
                serde_json::to_string_pretty(self).unwrap_or_else(|_| format!("{:?}", self))
            }
        }
    }
}

fn render_float(f: f64) -> String {
    if f.is_nan() {
        "NaN".to_string()
    } else if f.is_infinite() {
        let sign = if f > 0.0 { "" } else { "-" };
        format!("{}Infinity", sign)
    } else if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

impl From<&str> for LogValue {
    fn from(s: &str) -> Self {
        LogValue::Str(s.to_string())
    }
}

impl From<String> for LogValue {
    fn from(s: String) -> Self {
        LogValue::Str(s)
    }
}

impl From<bool> for LogValue {
    fn from(b: bool) -> Self {
        LogValue::Bool(b)
    }
}

impl From<i64> for LogValue {
    fn from(i: i64) -> Self {
        LogValue::Int(i)
    }
}

impl From<i32> for LogValue {
    fn from(i: i32) -> Self {
        LogValue::Int(i as i64)
    }
}

impl From<u64> for LogValue {
    fn from(u: u64) -> Self {
        i64::try_from(u)
            .map(LogValue::Int)
            .unwrap_or(LogValue::Float(u as f64))
    }
}

impl From<f64> for LogValue {
    fn from(f: f64) -> Self {
        LogValue::Float(f)
    }
}

impl<T: Into<LogValue>> From<Option<T>> for LogValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(LogValue::Null)
    }
}

impl<T: Into<LogValue>> From<Vec<T>> for LogValue {
    fn from(values: Vec<T>) -> Self {
        LogValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, LogValue>> for LogValue {
    fn from(map: BTreeMap<String, LogValue>) -> Self {
        LogValue::Map(map)
    }
}

impl From<serde_json::Value> for LogValue {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value;
        match json {
            Value::Null => LogValue::Null,
            Value::Bool(b) => LogValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => LogValue::Int(i),
                None => LogValue::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => LogValue::Str(s),
            Value::Array(items) => LogValue::List(items.into_iter().map(LogValue::from).collect()),
            Value::Object(map) => LogValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, LogValue::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Render an argument list into a single message: each argument via
/// [`LogValue::render`], joined with single spaces.
pub fn format_message(args: &[LogValue]) -> String {
    args.iter()
        .map(LogValue::render)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Client clock in milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// A single captured logging call, in the shape the collector accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    pub client_timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_user_id: Option<String>,
    #[serde(default)]
    pub payload: Vec<LogValue>,
}

impl LogRecord {
    /// Build a record from raw arguments, formatting the message and
    /// stamping it with the current client time.
    pub fn capture(level: LogLevel, args: Vec<LogValue>, user_id: Option<String>) -> Self {
        LogRecord {
            level,
            message: format_message(&args),
            client_timestamp: now_millis(),
            log_user_id: user_id,
            payload: args,
        }
    }
}
