//! JSON-RPC 2.0 codec.

use super::RpcCodec;
use bytes::Bytes;
use serde_json::{json, Value};

pub struct JsonRpcCodec;

impl RpcCodec for JsonRpcCodec {
    fn content_type(&self) -> &'static str {
        "application/json"
    }

    fn method_name(&self, body: &[u8]) -> Option<String> {
        let request: Value = serde_json::from_slice(body).ok()?;
        match request.get("method")? {
            Value::String(name) if !name.is_empty() => Some(name.clone()),
            _ => None,
        }
    }

    fn request_id(&self, body: &[u8]) -> Value {
        serde_json::from_slice::<Value>(body)
            .ok()
            .and_then(|request| request.get("id").cloned())
            .filter(|id| !id.is_null())
            .unwrap_or_else(|| Value::from(1))
    }

    fn encode_result(&self, payload: &Value, id: &Value) -> Bytes {
        envelope(json!({"jsonrpc": "2.0", "result": payload, "id": id}))
    }

    fn encode_fault(&self, code: i32, message: &str, id: &Value) -> Bytes {
        envelope(json!({
            "jsonrpc": "2.0",
            "error": {"code": code, "message": message},
            "id": id,
        }))
    }
}

fn envelope(value: Value) -> Bytes {
    Bytes::from(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_name() {
        assert_eq!(
            JsonRpcCodec.method_name(br#"{"method": "user.list", "id": 1}"#),
            Some("user.list".to_string())
        );
        assert_eq!(JsonRpcCodec.method_name(br#"{"id": 1}"#), None);
        assert_eq!(JsonRpcCodec.method_name(br#"{"method": 3}"#), None);
        assert_eq!(JsonRpcCodec.method_name(b"[1, 2"), None);
    }

    #[test]
    fn test_request_id_defaults_to_one() {
        assert_eq!(JsonRpcCodec.request_id(br#"{"method": "a", "id": "abc"}"#), json!("abc"));
        assert_eq!(JsonRpcCodec.request_id(br#"{"method": "a"}"#), json!(1));
        assert_eq!(JsonRpcCodec.request_id(br#"{"method": "a", "id": null}"#), json!(1));
        assert_eq!(JsonRpcCodec.request_id(b"garbage"), json!(1));
    }

    #[test]
    fn test_envelopes() {
        let result = JsonRpcCodec.encode_result(&json!({"a": [1]}), &json!(5));
        assert_eq!(
            serde_json::from_slice::<Value>(&result).unwrap(),
            json!({"jsonrpc": "2.0", "result": {"a": [1]}, "id": 5})
        );

        let fault = JsonRpcCodec.encode_fault(-32700, "parse_error", &json!(1));
        assert_eq!(
            std::str::from_utf8(&fault).unwrap(),
            r#"{"jsonrpc":"2.0","error":{"code":-32700,"message":"parse_error"},"id":1}"#
        );
    }
}
