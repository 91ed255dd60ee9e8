//! Callback envelope of the previous bridge generation.
//!
//! Older partner pages correlate calls with an opaque `cbid` token and pass
//! their arguments as named fields beside it, and expect answers shaped
//! `{ cbid, func, err, res }`. Nothing in the modern session code uses this
//! module; it exists so those pages keep working while they migrate.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::envelope::{DecodeError, EncodeError, RpcId};
use crate::MAX_MESSAGE_BYTES;

/// An inbound legacy call. Arguments arrive as named fields beside the
/// envelope keys, so they are captured as a flattened map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LegacyCall {
    pub cbid: RpcId,
    pub func: String,
    #[serde(flatten)]
    pub args: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LegacyReturn {
    pub cbid: RpcId,
    pub func: String,
    pub err: Option<Value>,
    pub res: Option<Value>,
}

impl LegacyReturn {
    pub fn ok(cbid: RpcId, func: String, res: Option<Value>) -> Self {
        Self {
            cbid,
            func,
            err: None,
            res,
        }
    }

    pub fn err(cbid: RpcId, func: String, err: Value) -> Self {
        Self {
            cbid,
            func,
            err: Some(err),
            res: None,
        }
    }
}

pub fn decode_legacy_call(raw: &str) -> Result<LegacyCall, DecodeError> {
    if raw.len() > MAX_MESSAGE_BYTES {
        return Err(DecodeError::TooLarge {
            len: raw.len(),
            max: MAX_MESSAGE_BYTES,
        });
    }
    Ok(serde_json::from_str(raw)?)
}

pub fn encode_legacy_return(ret: &LegacyReturn) -> Result<String, EncodeError> {
    Ok(serde_json::to_string(ret)?)
}
