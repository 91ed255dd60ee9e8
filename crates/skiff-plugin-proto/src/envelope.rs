//! Call/Return envelope shapes and the identifier space.
//!
//! Decoding never panics past this boundary: malformed input (wrong shape,
//! wrong types, unexpected extra fields) yields a typed [`DecodeError`] that
//! the caller turns into either a dropped message (inbound Return) or an
//! `invalidParams` answer (inbound Call).

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{MAX_MESSAGE_BYTES, MAX_METHOD_NAME_BYTES, MAX_PARAMS_PER_CALL};

/// Reserved wire error code: the Call named a method outside the registry.
pub const METHOD_NOT_FOUND: i64 = -32601;

/// Reserved wire error code: the Call's params failed schema validation.
pub const INVALID_PARAMS: i64 = -32602;

/// Application-defined wire error code: the bound host method itself failed.
pub const UNKNOWN: i64 = -1;

/// A call identifier as it appears on the wire.
///
/// Outgoing calls always carry positive integers, but the decoder accepts
/// any of the three token forms so either side can echo back whatever id
/// form it received.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcId {
    Num(u64),
    Text(String),
    Null,
}

impl RpcId {
    /// The numeric value usable for pending-table correlation.
    ///
    /// String ids that parse as integers are accepted so a peer that
    /// stringified the id on echo still correlates.
    pub fn as_pending(&self) -> Option<u64> {
        match self {
            RpcId::Num(n) => Some(*n),
            RpcId::Text(s) => s.parse().ok(),
            RpcId::Null => None,
        }
    }
}

impl fmt::Display for RpcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcId::Num(n) => write!(f, "{n}"),
            RpcId::Text(s) => write!(f, "{s:?}"),
            RpcId::Null => write!(f, "null"),
        }
    }
}

/// An inbound or outbound method call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Call {
    pub id: RpcId,
    pub method: String,
    pub params: Vec<Value>,
}

/// The error half of a failed [`Return`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn method_not_found(name: &str) -> Self {
        Self {
            code: METHOD_NOT_FOUND,
            message: format!("method not found: {name}"),
            data: None,
        }
    }

    pub fn invalid_params(detail: impl fmt::Display) -> Self {
        Self {
            code: INVALID_PARAMS,
            message: format!("invalid params: {detail}"),
            data: None,
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self {
            code: UNKNOWN,
            message: message.into(),
            data: None,
        }
    }
}

/// The answer to exactly one [`Call`], correlated by id.
///
/// A success may omit `result` entirely: that is the undefined/void result.
/// Carrying both `result` and `error` is a decode failure.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Return {
    pub id: RpcId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl Return {
    pub fn ok(id: RpcId, result: Option<Value>) -> Self {
        Self {
            id,
            result,
            error: None,
        }
    }

    pub fn err(id: RpcId, error: RpcError) -> Self {
        Self {
            id,
            result: None,
            error: Some(error),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("payload too large: {len} bytes (max {max})")]
    TooLarge { len: usize, max: usize },

    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("method name too long: {len} bytes (max {max})")]
    MethodTooLong { len: usize, max: usize },

    #[error("too many params: {len} (max {max})")]
    TooManyParams { len: usize, max: usize },

    #[error("return envelope carries both result and error")]
    ResultAndError,
}

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("encode envelope: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn decode_call(raw: &str) -> Result<Call, DecodeError> {
    check_len(raw)?;
    let call: Call = serde_json::from_str(raw)?;
    if call.method.len() > MAX_METHOD_NAME_BYTES {
        return Err(DecodeError::MethodTooLong {
            len: call.method.len(),
            max: MAX_METHOD_NAME_BYTES,
        });
    }
    if call.params.len() > MAX_PARAMS_PER_CALL {
        return Err(DecodeError::TooManyParams {
            len: call.params.len(),
            max: MAX_PARAMS_PER_CALL,
        });
    }
    Ok(call)
}

pub fn encode_call(call: &Call) -> Result<String, EncodeError> {
    Ok(serde_json::to_string(call)?)
}

pub fn decode_return(raw: &str) -> Result<Return, DecodeError> {
    check_len(raw)?;
    let ret: Return = serde_json::from_str(raw)?;
    if ret.result.is_some() && ret.error.is_some() {
        return Err(DecodeError::ResultAndError);
    }
    Ok(ret)
}

pub fn encode_return(ret: &Return) -> Result<String, EncodeError> {
    Ok(serde_json::to_string(ret)?)
}

fn check_len(raw: &str) -> Result<(), DecodeError> {
    if raw.len() > MAX_MESSAGE_BYTES {
        return Err(DecodeError::TooLarge {
            len: raw.len(),
            max: MAX_MESSAGE_BYTES,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_all_id_forms() {
        let call = decode_call(r#"{"id":7,"method":"signMessage","params":["hi"]}"#).unwrap();
        assert_eq!(call.id, RpcId::Num(7));

        let call = decode_call(r#"{"id":"7","method":"signMessage","params":[]}"#).unwrap();
        assert_eq!(call.id, RpcId::Text("7".into()));
        assert_eq!(call.id.as_pending(), Some(7));

        let call = decode_call(r#"{"id":null,"method":"signMessage","params":[]}"#).unwrap();
        assert_eq!(call.id, RpcId::Null);
        assert_eq!(call.id.as_pending(), None);
    }

    #[test]
    fn rejects_unknown_envelope_fields() {
        let err = decode_call(r#"{"id":1,"method":"m","params":[],"extra":true}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));

        let err = decode_return(r#"{"id":1,"result":null,"surprise":1}"#).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn rejects_wrongly_typed_fields() {
        assert!(decode_call(r#"{"id":1,"method":42,"params":[]}"#).is_err());
        assert!(decode_call(r#"{"id":1,"method":"m","params":{}}"#).is_err());
        assert!(decode_call(r#"{"id":1.5,"method":"m","params":[]}"#).is_err());
    }

    #[test]
    fn rejects_oversized_payload_before_parsing() {
        let raw = format!(
            r#"{{"id":1,"method":"m","params":["{}"]}}"#,
            "a".repeat(MAX_MESSAGE_BYTES)
        );
        let err = decode_call(&raw).unwrap_err();
        assert!(matches!(err, DecodeError::TooLarge { .. }));
    }

    #[test]
    fn rejects_too_many_params() {
        let params: Vec<Value> = (0..=MAX_PARAMS_PER_CALL as i64).map(Value::from).collect();
        let raw = serde_json::to_string(&json!({
            "id": 1,
            "method": "m",
            "params": params,
        }))
        .unwrap();
        let err = decode_call(&raw).unwrap_err();
        assert!(matches!(err, DecodeError::TooManyParams { .. }));
    }

    #[test]
    fn return_without_result_is_a_void_success() {
        let ret = decode_return(r#"{"id":3}"#).unwrap();
        assert_eq!(ret.result, None);
        assert_eq!(ret.error, None);
    }

    #[test]
    fn rejects_return_with_result_and_error() {
        let raw = r#"{"id":3,"result":1,"error":{"code":-1,"message":"x"}}"#;
        let err = decode_return(raw).unwrap_err();
        assert!(matches!(err, DecodeError::ResultAndError));
    }

    #[test]
    fn error_return_round_trips() {
        let ret = Return::err(RpcId::Num(9), RpcError::invalid_params("bad shape"));
        let raw = encode_return(&ret).unwrap();
        let back = decode_return(&raw).unwrap();
        assert_eq!(back, ret);
        assert_eq!(back.error.unwrap().code, INVALID_PARAMS);
    }

    #[test]
    fn void_success_omits_result_key() {
        let raw = encode_return(&Return::ok(RpcId::Num(1), None)).unwrap();
        assert_eq!(raw, r#"{"id":1}"#);
    }
}
