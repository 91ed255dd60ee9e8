//! Wire protocol for the partner plugin bridge.
//!
//! The bridge carries JSON text messages between the host application and a
//! sandboxed partner web page. This crate defines:
//! - the Call/Return envelope shapes and their identifier space (`envelope`)
//! - the typed parameter/result vocabulary of the method table (`types`)
//! - the callback envelope of the previous bridge generation (`legacy`)
//!
//! Everything arriving from the partner page is untrusted: decode entry
//! points enforce hard size limits before parsing and return typed errors
//! instead of panicking.

/// Hard limits enforced during deserialization of untrusted bridge payloads.
///
/// Webview messages are small; these caps exist so a hostile page cannot
/// trigger outsized allocations or stuff an unbounded number of values into
/// a single call.
/// Maximum size of a single serialized envelope.
pub const MAX_MESSAGE_BYTES: usize = 512 * 1024; // 512 KiB

/// Maximum number of positional parameters in a single Call.
pub const MAX_PARAMS_PER_CALL: usize = 8;

/// Maximum UTF-8 byte length of a method name.
pub const MAX_METHOD_NAME_BYTES: usize = 64;

/// Maximum number of entries in a `writeData` map or `readData` key list.
pub const MAX_DATA_KEYS_PER_CALL: usize = 1_000;

/// Maximum number of targets in a single `requestSpend`.
pub const MAX_SPEND_TARGETS_PER_CALL: usize = 100;

pub mod envelope;
pub mod legacy;
pub mod types;

pub use envelope::{
    decode_call, decode_return, encode_call, encode_return, Call, DecodeError, EncodeError, Return,
    RpcError, RpcId, INVALID_PARAMS, METHOD_NOT_FOUND, UNKNOWN,
};
