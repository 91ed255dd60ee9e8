//! Transport adapter and session lifecycle.
//!
//! The embedding environment supplies two one-directional primitives:
//! content can push a serialized message that the host receives as an event,
//! and the host can deliver a message into the content's receive entrypoint.
//! Both are modeled as [`MessageSink`]; neither side ever constructs
//! executable text.
//!
//! A session is the lifetime of one loaded instance of the embedded content.
//! Reloading the content destroys the session: the content side fails its
//! pending calls with `BridgeClosed`, and the host side drops any Return
//! produced by a dispatch that outlived its session, so at most one Return
//! ever exists per dispatched Call.

use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use skiff_plugin_proto::envelope::{self, Return, RpcError, RpcId};
use skiff_plugin_proto::MAX_MESSAGE_BYTES;

use crate::client::{InvokeError, PluginRpcClient};
use crate::dispatch::CallDispatcher;
use crate::host::PluginHost;

/// One-directional message primitive: deliver a serialized envelope into the
/// other side's receive entrypoint.
pub trait MessageSink: Send + Sync {
    fn deliver(&self, raw: String);
}

/// Limits for one bridge instance.
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    /// Inbound messages larger than this are answered with a protocol error
    /// without being parsed.
    pub max_message_bytes: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_message_bytes: MAX_MESSAGE_BYTES,
        }
    }
}

/// Host side of the bridge: owns the dispatcher and the session lifecycle.
#[derive(Clone)]
pub struct HostBridge {
    inner: Arc<HostInner>,
}

struct HostInner {
    dispatcher: CallDispatcher,
    sink: Arc<dyn MessageSink>,
    config: BridgeConfig,
    state: Mutex<SessionState>,
}

#[derive(Default)]
struct SessionState {
    /// Bumped on every load; distinguishes the sessions' dispatch tasks.
    generation: u64,
    active: bool,
}

impl HostBridge {
    /// `sink` is the host→content primitive.
    pub fn new(
        host: Arc<dyn PluginHost>,
        sink: Arc<dyn MessageSink>,
        config: BridgeConfig,
    ) -> Self {
        Self {
            inner: Arc::new(HostInner {
                dispatcher: CallDispatcher::new(host),
                sink,
                config,
                state: Mutex::new(SessionState::default()),
            }),
        }
    }

    /// The content signaled readiness. The first signal per load starts a
    /// session; repeats are ignored until the content unloads.
    pub fn content_loaded(&self) {
        let mut state = self.inner.state.lock().unwrap();
        if state.active {
            return;
        }
        state.generation += 1;
        state.active = true;
        info!(session = state.generation, "plugin content session started");
    }

    /// The content unloaded or is reloading. Dispatches still in flight keep
    /// running, but their Returns are dropped.
    pub fn content_unloaded(&self) {
        let mut state = self.inner.state.lock().unwrap();
        if !state.active {
            return;
        }
        state.active = false;
        info!(session = state.generation, "plugin content session ended");
    }

    /// Inbound content→host event. Each call is dispatched on its own task,
    /// so completions may be out of arrival order.
    pub fn on_message(&self, raw: &str) {
        let Some(generation) = self.active_generation() else {
            debug!("dropping content message with no active session");
            return;
        };

        if raw.len() > self.inner.config.max_message_bytes {
            debug!(
                len = raw.len(),
                max = self.inner.config.max_message_bytes,
                "rejecting oversized content message"
            );
            let err = RpcError::invalid_params(format!(
                "payload too large: {} bytes (max {})",
                raw.len(),
                self.inner.config.max_message_bytes
            ));
            self.deliver_return(generation, Return::err(RpcId::Null, err));
            return;
        }

        let raw = raw.to_owned();
        let bridge = self.clone();
        tokio::spawn(async move {
            let ret = bridge.inner.dispatcher.dispatch(&raw).await;
            bridge.deliver_return(generation, ret);
        });
    }

    fn active_generation(&self) -> Option<u64> {
        let state = self.inner.state.lock().unwrap();
        state.active.then_some(state.generation)
    }

    fn deliver_return(&self, generation: u64, ret: Return) {
        // The session the call belonged to must still be the live one.
        if self.active_generation() != Some(generation) {
            debug!(id = %ret.id, "dropping return for torn-down session");
            return;
        }
        match envelope::encode_return(&ret) {
            Ok(raw) => self.inner.sink.deliver(raw),
            Err(err) => debug!(id = %ret.id, error = %err, "failed to encode return"),
        }
    }
}

/// Content side of the bridge: owns the per-load client session.
pub struct ContentBridge {
    sink: Arc<dyn MessageSink>,
    session: Mutex<Option<Arc<PluginRpcClient>>>,
}

impl ContentBridge {
    /// `sink` is the content→host primitive.
    pub fn new(sink: Arc<dyn MessageSink>) -> Self {
        Self {
            sink,
            session: Mutex::new(None),
        }
    }

    /// The content finished loading: construct the session and perform the
    /// `getDeepLink` handshake. Repeat signals for the same load return the
    /// existing session without a second handshake.
    pub async fn content_ready(&self) -> Result<Arc<PluginRpcClient>, InvokeError> {
        let (client, fresh) = {
            let mut session = self.session.lock().unwrap();
            match &*session {
                Some(client) => (client.clone(), false),
                None => {
                    let client = Arc::new(PluginRpcClient::new(self.sink.clone()));
                    *session = Some(client.clone());
                    (client, true)
                }
            }
        };
        if fresh {
            client.connect().await?;
        }
        Ok(client)
    }

    /// The content was torn down: destroy the session. Pending calls fail
    /// with `BridgeClosed`; a fresh session starts its id counter at 1.
    pub fn content_torn_down(&self) {
        let client = self.session.lock().unwrap().take();
        if let Some(client) = client {
            client.close();
        }
    }

    /// Inbound host→content delivery. Messages arriving between sessions are
    /// discarded.
    pub fn on_message(&self, raw: &str) {
        let client = self.session.lock().unwrap().clone();
        match client {
            Some(client) => client.handle_return(raw),
            None => debug!("dropping host message with no active session"),
        }
    }

    pub fn session(&self) -> Option<Arc<PluginRpcClient>> {
        self.session.lock().unwrap().clone()
    }
}
