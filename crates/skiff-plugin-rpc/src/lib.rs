//! Core of the partner plugin bridge.
//!
//! This crate implements:
//! - the closed method schema registry (`registry`): one descriptor per
//!   method, param decode and result encode, exhaustively matched
//! - the content-side call invoker with its pending-call table (`client`)
//! - the host-side call dispatcher (`dispatch`), which always answers and
//!   never lets untrusted input reach a bound method unvalidated
//! - the transport adapter and session lifecycle (`session`), wiring both
//!   ends onto the one-directional message primitives of the embedding
//!   environment and surviving content reloads
//!
//! The bound host implementation surface is the [`PluginHost`] trait; the
//! production implementation lives in the host crate.

mod client;
mod dispatch;
mod host;
mod registry;
mod session;

pub use client::{InvokeError, PluginRpcClient};
pub use dispatch::CallDispatcher;
pub use host::PluginHost;
pub use registry::{decode_params, Method, MethodCall, MethodReturn, ParamsError};
pub use session::{BridgeConfig, ContentBridge, HostBridge, MessageSink};
