use std::backtrace::Backtrace;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

/// Structured fields handed to a backend alongside the formatted message.
pub type Fields = Map<String, Value>;

/// Arguments for [`Logger::info`](crate::Logger::info) and
/// [`Logger::debug`](crate::Logger::debug).
///
/// ```rust,ignore
/// log.info(LogFields::new("Activity done").arg1(json!({ "user": "abc" })).arg2(60));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogFields {
    #[serde(skip)]
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg1: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg2: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg3: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg4: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg5: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arg6: Option<Value>,
}

impl LogFields {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            ..Default::default()
        }
    }

    pub fn arg1(mut self, value: impl Serialize) -> Self {
        self.arg1 = Some(to_value(value));
        self
    }

    pub fn arg2(mut self, value: impl Serialize) -> Self {
        self.arg2 = Some(to_value(value));
        self
    }

    pub fn arg3(mut self, value: impl Serialize) -> Self {
        self.arg3 = Some(to_value(value));
        self
    }

    pub fn arg4(mut self, value: impl Serialize) -> Self {
        self.arg4 = Some(to_value(value));
        self
    }

    pub fn arg5(mut self, value: impl Serialize) -> Self {
        self.arg5 = Some(to_value(value));
        self
    }

    pub fn arg6(mut self, value: impl Serialize) -> Self {
        self.arg6 = Some(to_value(value));
        self
    }

    /// The present auxiliary values keyed `arg1`..`arg6`, in order.
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        let args = [
            ("arg1", &self.arg1),
            ("arg2", &self.arg2),
            ("arg3", &self.arg3),
            ("arg4", &self.arg4),
            ("arg5", &self.arg5),
            ("arg6", &self.arg6),
        ];
        for (key, value) in args {
            if let Some(value) = value {
                fields.insert(key.to_string(), value.clone());
            }
        }
        fields
    }
}

/// Arguments for [`Logger::error`](crate::Logger::error).
///
/// `error` is optional only so that a missing error can be reported as a
/// contract violation at the call; logging without one panics.
#[derive(Debug, Default)]
pub struct ErrorFields<'a> {
    pub error: Option<&'a mut LoggedError>,
    pub msg: Option<String>,
    pub arg1: Option<Value>,
    pub arg2: Option<Value>,
    pub arg3: Option<Value>,
    pub arg4: Option<Value>,
}

impl<'a> ErrorFields<'a> {
    pub fn new(error: &'a mut LoggedError) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }

    pub fn msg(mut self, msg: impl Into<String>) -> Self {
        self.msg = Some(msg.into());
        self
    }

    pub fn arg1(mut self, value: impl Serialize) -> Self {
        self.arg1 = Some(to_value(value));
        self
    }

    pub fn arg2(mut self, value: impl Serialize) -> Self {
        self.arg2 = Some(to_value(value));
        self
    }

    pub fn arg3(mut self, value: impl Serialize) -> Self {
        self.arg3 = Some(to_value(value));
        self
    }

    pub fn arg4(mut self, value: impl Serialize) -> Self {
        self.arg4 = Some(to_value(value));
        self
    }
}

/// An error value as seen by the backend: a type tag, a stack trace and any
/// number of extra properties, all serialized at the top level of a record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoggedError {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip)]
    pub message: String,
    pub stack: String,
    #[serde(flatten)]
    pub extra: Fields,
}

impl LoggedError {
    /// Create an error tagged `Error`, capturing the current backtrace.
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        let stack = render_stack("Error", &message, &[]);
        Self {
            kind: "Error".to_string(),
            message,
            stack,
            extra: Fields::new(),
        }
    }

    /// Capture a standard error, tagging it with its short type name and
    /// recording its `source()` chain in the stack.
    pub fn from_error<E: std::error::Error>(err: &E) -> Self {
        let kind = short_type_name::<E>().to_string();
        let message = err.to_string();

        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(cause.to_string());
            source = cause.source();
        }

        let stack = render_stack(&kind, &message, &causes);
        Self {
            kind,
            message,
            stack,
            extra: Fields::new(),
        }
    }

    /// Replace the type tag. The first line of the stack follows.
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        let kind = kind.into();
        let old_head = format!("{}: {}", self.kind, self.message);
        if let Some(rest) = self.stack.strip_prefix(&old_head) {
            self.stack = format!("{}: {}{}", kind, self.message, rest);
        }
        self.kind = kind;
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = stack.into();
        self
    }

    /// Attach an extra property, replacing any previous value under `key`.
    pub fn set(&mut self, key: impl Into<String>, value: impl Serialize) -> &mut Self {
        self.extra.insert(key.into(), to_value(value));
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

impl fmt::Display for LoggedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for LoggedError {}

fn render_stack(kind: &str, message: &str, causes: &[String]) -> String {
    let mut stack = format!("{}: {}", kind, message);
    for cause in causes {
        stack.push_str("\nCaused by: ");
        stack.push_str(cause);
    }
    stack.push('\n');
    stack.push_str(&Backtrace::force_capture().to_string());
    stack
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// Values that cannot be represented as JSON (maps with non-string keys,
/// failing `Serialize` impls) are kept as a marker string.
fn to_value(value: impl Serialize) -> Value {
    match serde_json::to_value(value) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(error = %e, "Log value could not be serialized");
            Value::String(format!("<unserializable: {}>", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[derive(Debug, thiserror::Error)]
    #[error("request failed")]
    struct RequestError {
        #[source]
        source: std::io::Error,
    }

    #[test]
    fn test_to_fields_only_includes_present_args() {
        let fields = LogFields::new("done").arg1(json!({"ok": true})).arg3(60);

        assert_eq!(fields.to_fields().len(), 2);
        assert_eq!(fields.to_fields()["arg1"], json!({"ok": true}));
        assert_eq!(fields.to_fields()["arg3"], json!(60));
        assert!(LogFields::new("empty").to_fields().is_empty());
    }

    #[test]
    fn test_log_fields_serialize_skips_msg() {
        let fields = LogFields::new("done").arg2("x");
        let value = serde_json::to_value(&fields).unwrap();
        assert_eq!(value, json!({"arg2": "x"}));
    }

    #[test]
    fn test_unserializable_arg_is_marked_not_nulled() {
        let mut by_point = HashMap::new();
        by_point.insert((1, 2), "a");

        let fields = LogFields::new("m").arg1(&by_point);
        let marker = fields.arg1.as_ref().and_then(Value::as_str).unwrap();
        assert!(marker.starts_with("<unserializable: "));

        let mut err = LoggedError::new("boom");
        err.set("points", &by_point);
        assert!(err.get("points").unwrap().is_string());
    }

    #[test]
    fn test_logged_error_stack_starts_with_kind_and_message() {
        let err = LoggedError::new("Unhandled Error");
        assert_eq!(err.kind, "Error");
        assert!(err.stack.starts_with("Error: Unhandled Error\n"));
        assert_eq!(err.to_string(), "Error: Unhandled Error");
    }

    #[test]
    fn test_logged_error_from_error_records_causes() {
        let err = RequestError {
            source: std::io::Error::new(std::io::ErrorKind::TimedOut, "socket timed out"),
        };
        let logged = LoggedError::from_error(&err);

        assert_eq!(logged.kind, "RequestError");
        assert_eq!(logged.message, "request failed");
        assert!(logged
            .stack
            .starts_with("RequestError: request failed\nCaused by: socket timed out\n"));
    }

    #[test]
    fn test_with_kind_rewrites_stack_head() {
        let err = LoggedError::new("bad input").with_kind("TypeError");
        assert_eq!(err.kind, "TypeError");
        assert!(err.stack.starts_with("TypeError: bad input"));
    }

    #[test]
    fn test_logged_error_serializes_extra_at_top_level() {
        let mut err = LoggedError::new("boom").with_stack("Error: boom");
        err.set("statusCode", 400);

        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(
            value,
            json!({"type": "Error", "stack": "Error: boom", "statusCode": 400})
        );
        assert_eq!(err.get("statusCode"), Some(&json!(400)));
    }
}
