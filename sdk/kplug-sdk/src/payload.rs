//! Structured payload codec.
//!
//! Requests and responses are JSON objects. Requests are parsed into a
//! generic value first and then checked against the handler's schema through
//! [`FromPayload`], so field-level errors come out as [`ValidationError`]s
//! with host-readable messages instead of serde's derive errors.

use crate::error::{PluginError, Result, ValidationError};
use serde::Serialize;
use serde_json::{Map, Value};

/// Typed request built from a decoded JSON object.
pub trait FromPayload: Sized {
    fn from_payload(fields: &Fields<'_>) -> std::result::Result<Self, ValidationError>;
}

/// 请求字段访问器
#[derive(Debug, Clone, Copy)]
pub struct Fields<'a> {
    map: &'a Map<String, Value>,
}

impl<'a> Fields<'a> {
    pub fn new(map: &'a Map<String, Value>) -> Self {
        Self { map }
    }

    /// A string field that must be present. `null` counts as present but
    /// mistyped.
    pub fn required_str(&self, field: &'static str) -> std::result::Result<&'a str, ValidationError> {
        match self.map.get(field) {
            None => Err(ValidationError::Missing { field }),
            Some(value) => value.as_str().ok_or(ValidationError::WrongType {
                field,
                expected: "string",
            }),
        }
    }

    pub fn optional_str(&self, field: &'static str) -> std::result::Result<Option<&'a str>, ValidationError> {
        match self.map.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value.as_str().map(Some).ok_or(ValidationError::WrongType {
                field,
                expected: "string",
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Parse request bytes into `T`.
pub fn decode<T: FromPayload>(bytes: &[u8]) -> Result<T> {
    let value: Value = serde_json::from_slice(bytes).map_err(|e| PluginError::InvalidJson {
        reason: e.to_string(),
    })?;
    let map = match value {
        Value::Object(map) => map,
        other => {
            return Err(PluginError::InvalidJson {
                reason: format!("expected a JSON object, got {}", value_kind(&other)),
            })
        }
    };
    Ok(T::from_payload(&Fields::new(&map))?)
}

/// Serialize a response payload.
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| PluginError::Encode { reason: e.to_string() })
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Debug)]
    struct Named {
        name: String,
        nickname: Option<String>,
    }

    impl FromPayload for Named {
        fn from_payload(fields: &Fields<'_>) -> std::result::Result<Self, ValidationError> {
            Ok(Self {
                name: fields.required_str("name")?.to_string(),
                nickname: fields.optional_str("nickname")?.map(str::to_string),
            })
        }
    }

    #[test]
    fn test_decode_typed_request() {
        let named: Named = decode(br#"{"name":"World","extra":[1,2]}"#).unwrap();
        assert_eq!(named.name, "World");
        assert_eq!(named.nickname, None);

        let named: Named = decode(br#"{"name":"World","nickname":"W"}"#).unwrap();
        assert_eq!(named.nickname.as_deref(), Some("W"));
    }

    #[test]
    fn test_schema_errors() {
        let cases: [(&[u8], &str); 4] = [
            (br#"{}"#, "Missing 'name' parameter"),
            (br#"{"name":5}"#, "Name must be a string"),
            (br#"{"name":null}"#, "Name must be a string"),
            (br#"{"name":"x","nickname":true}"#, "Nickname must be a string"),
        ];
        for (input, expected) in cases {
            let err = decode::<Named>(input).unwrap_err();
            assert!(matches!(err, PluginError::Validation(_)), "{err:?}");
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn test_malformed_json() {
        let inputs: [&[u8]; 6] = [b"", b"{\"name\":", b"not json", b"[\"name\"]", b"\"World\"", b"null"];
        for input in inputs {
            let err = decode::<Named>(input).unwrap_err();
            assert!(matches!(err, PluginError::InvalidJson { .. }), "{err:?}");
            assert_eq!(err.to_string(), "Invalid JSON input");
        }
    }

    #[test]
    fn test_encode_reports_failure() {
        // 非字符串键的 map 无法序列化为 JSON 对象
        let mut bad = HashMap::new();
        bad.insert(vec![1u8], 1);
        let err = encode(&bad).unwrap_err();
        assert!(matches!(err, PluginError::Encode { .. }));
    }
}
