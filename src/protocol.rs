use serde::Deserialize;
use serde_json::{json, Map, Value};

/// Protocol version reported in `hello_response`.
pub const PROTOCOL_VERSION: &str = "0.9.0";

/// One incoming request line, routed by its `type` tag.
///
/// `run_tool` tolerates a missing `tool_name` (the registry lookup then fails
/// with `not_found`) and a missing `parameters` map. The `id` field is not
/// part of this enum; it is lifted off the raw message and echoed verbatim.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    Hello,
    ListTools,
    RunTool {
        #[serde(default)]
        tool_name: String,
        #[serde(default)]
        parameters: Map<String, Value>,
    },
}

/// Wire error codes. Protocol errors are data, not Rust errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NotSupported,
    NotFound,
    ToolError,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::NotSupported => "not_supported",
            ErrorCode::NotFound => "not_found",
            ErrorCode::ToolError => "tool_error",
            ErrorCode::InternalError => "internal_error",
        }
    }
}

/// Success envelope: `{id, status: "success", ...content}`.
pub fn success(id: Value, content: Value) -> Value {
    let mut out = Map::new();
    out.insert("id".into(), id);
    out.insert("status".into(), Value::String("success".into()));
    if let Value::Object(fields) = content {
        out.extend(fields);
    }
    Value::Object(out)
}

/// Error envelope: `{id, status: "error", error: {code, message}}`.
pub fn error(id: Value, code: ErrorCode, message: impl Into<String>) -> Value {
    json!({
        "id": id,
        "status": "error",
        "error": { "code": code.as_str(), "message": message.into() }
    })
}

/// Best-effort id recovery from a line that failed to parse as JSON.
///
/// Scans for an `"id"` key and reads the single JSON value after the colon.
/// Good enough for lines truncated after their id field; anything stranger
/// yields `None` and the line is dropped.
pub fn extract_id(raw: &str) -> Option<Value> {
    const KEY: &str = "\"id\"";
    let mut search = raw;
    while let Some(pos) = search.find(KEY) {
        let rest = search[pos + KEY.len()..].trim_start();
        if let Some(rest) = rest.strip_prefix(':') {
            let mut stream = serde_json::Deserializer::from_str(rest).into_iter::<Value>();
            if let Some(Ok(value)) = stream.next() {
                return Some(value);
            }
        }
        search = &search[pos + KEY.len()..];
    }
    None
}
