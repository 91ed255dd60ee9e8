//! Content-side call invoker and pending-call table.
//!
//! One instance lives for exactly one load of the embedded content. Ids come
//! from a monotonic counter starting at 1 and are never reused within the
//! session, even after a call completes, so a stale Return can never match a
//! newer entry.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::debug;

use skiff_plugin_proto::envelope::{self, Call, EncodeError, RpcError, RpcId};
use skiff_plugin_proto::types::{
    AssetSpec, DeepLink, ReceiveAddress, ReceiveAddressOptions, SpendOptions, SpendTarget,
    Transaction, WalletDetails, WalletHistory,
};

use crate::registry::Method;
use crate::session::MessageSink;

#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    /// The host answered with an error envelope; displays as its message.
    #[error("{message}")]
    Rpc {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    /// The session was torn down before the call resolved.
    #[error("bridge closed")]
    BridgeClosed,

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("unexpected result shape for {method}: {source}")]
    ResultShape {
        method: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl From<RpcError> for InvokeError {
    fn from(err: RpcError) -> Self {
        InvokeError::Rpc {
            code: err.code,
            message: err.message,
            data: err.data,
        }
    }
}

type CallOutcome = Result<Option<Value>, RpcError>;

pub struct PluginRpcClient {
    sink: Arc<dyn MessageSink>,
    pending: Mutex<HashMap<u64, oneshot::Sender<CallOutcome>>>,
    next_id: AtomicU64,
    closed: AtomicBool,
    deep_link: OnceLock<DeepLink>,
}

impl PluginRpcClient {
    /// `sink` is the content→host primitive: it must hand the serialized
    /// Call to the host side of the bridge.
    pub fn new(sink: Arc<dyn MessageSink>) -> Self {
        Self {
            sink,
            pending: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            deep_link: OnceLock::new(),
        }
    }

    /// Send one Call and await its Return.
    ///
    /// `Ok(None)` is the undefined/void result. The future resolves exactly
    /// once; if the session is torn down first it fails with
    /// [`InvokeError::BridgeClosed`].
    pub async fn invoke(
        &self,
        method: Method,
        params: Vec<Value>,
    ) -> Result<Option<Value>, InvokeError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(InvokeError::BridgeClosed);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().unwrap();
            pending.insert(id, tx);
            // A teardown may have raced the insert; its drain must win.
            if self.closed.load(Ordering::Acquire) {
                pending.remove(&id);
                return Err(InvokeError::BridgeClosed);
            }
        }

        let call = Call {
            id: RpcId::Num(id),
            method: method.name().to_owned(),
            params,
        };
        let raw = match envelope::encode_call(&call) {
            Ok(raw) => raw,
            Err(err) => {
                let mut pending = self.pending.lock().unwrap();
                pending.remove(&id);
                return Err(err.into());
            }
        };
        self.sink.deliver(raw);

        match rx.await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(err)) => Err(err.into()),
            // Sender dropped without an answer: the session was torn down.
            Err(_) => Err(InvokeError::BridgeClosed),
        }
    }

    /// Inbound host→content delivery.
    ///
    /// Malformed envelopes and unknown or already-resolved ids are silently
    /// discarded; discarding never panics and is only logged at debug level.
    /// Orphans are expected: they are Returns for a prior, torn-down session
    /// or duplicate deliveries.
    pub fn handle_return(&self, raw: &str) {
        let ret = match envelope::decode_return(raw) {
            Ok(ret) => ret,
            Err(err) => {
                debug!(error = %err, "dropping malformed return envelope");
                return;
            }
        };
        let Some(id) = ret.id.as_pending() else {
            debug!(id = %ret.id, "dropping return with non-numeric id");
            return;
        };
        let entry = {
            let mut pending = self.pending.lock().unwrap();
            pending.remove(&id)
        };
        let Some(tx) = entry else {
            debug!(id, "discarding orphaned return");
            return;
        };
        let outcome = match ret.error {
            Some(err) => Err(err),
            None => Ok(ret.result),
        };
        let _ = tx.send(outcome);
    }

    /// Tear the session down: every pending call fails with
    /// [`InvokeError::BridgeClosed`] and later Returns become orphans.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        let mut pending = self.pending.lock().unwrap();
        pending.clear();
    }

    /// The handshake: fetch and seed the deep-link state. Must complete
    /// before any other call is made.
    pub async fn connect(&self) -> Result<DeepLink, InvokeError> {
        let link: DeepLink = self.call_typed(Method::GetDeepLink, Vec::new()).await?;
        let _ = self.deep_link.set(link.clone());
        Ok(link)
    }

    pub fn deep_path(&self) -> Option<&str> {
        self.deep_link.get()?.deep_path.as_deref()
    }

    pub fn deep_query(&self) -> Option<&BTreeMap<String, String>> {
        self.deep_link.get()?.deep_query.as_ref()
    }

    pub fn promo_code(&self) -> Option<&str> {
        self.deep_link.get()?.promo_code.as_deref()
    }

    // Typed stubs, one per registry entry.

    pub async fn choose_currency_wallet(
        &self,
        allowed_codes: Option<&[AssetSpec]>,
    ) -> Result<AssetSpec, InvokeError> {
        let params = match allowed_codes {
            Some(codes) => vec![to_param(codes)?],
            None => Vec::new(),
        };
        self.call_typed(Method::ChooseCurrencyWallet, params).await
    }

    pub async fn get_receive_address(
        &self,
        options: Option<&ReceiveAddressOptions>,
    ) -> Result<ReceiveAddress, InvokeError> {
        self.call_typed(Method::GetReceiveAddress, optional_param(options)?)
            .await
    }

    pub async fn get_current_wallet_info(&self) -> Result<WalletDetails, InvokeError> {
        self.call_typed(Method::GetCurrentWalletInfo, Vec::new())
            .await
    }

    pub async fn get_wallet_history(&self) -> Result<WalletHistory, InvokeError> {
        self.call_typed(Method::GetWalletHistory, Vec::new()).await
    }

    pub async fn request_spend(
        &self,
        targets: &[SpendTarget],
        options: Option<&SpendOptions>,
    ) -> Result<Option<Transaction>, InvokeError> {
        let mut params = vec![to_param(targets)?];
        params.extend(optional_param(options)?);
        self.call_optional(Method::RequestSpend, params).await
    }

    pub async fn request_spend_uri(
        &self,
        uri: &str,
        options: Option<&SpendOptions>,
    ) -> Result<Option<Transaction>, InvokeError> {
        let mut params = vec![Value::String(uri.to_owned())];
        params.extend(optional_param(options)?);
        self.call_optional(Method::RequestSpendUri, params).await
    }

    pub async fn sign_message(&self, message: &str) -> Result<String, InvokeError> {
        self.call_typed(Method::SignMessage, vec![Value::String(message.to_owned())])
            .await
    }

    pub async fn write_data(
        &self,
        data: &BTreeMap<String, Option<String>>,
    ) -> Result<(), InvokeError> {
        self.call_void(Method::WriteData, vec![to_param(data)?])
            .await
    }

    pub async fn read_data(
        &self,
        keys: &[String],
    ) -> Result<BTreeMap<String, Option<String>>, InvokeError> {
        self.call_typed(Method::ReadData, vec![to_param(keys)?])
            .await
    }

    pub async fn console_log(&self, text: &str) -> Result<(), InvokeError> {
        self.call_void(Method::ConsoleLog, vec![Value::String(text.to_owned())])
            .await
    }

    pub async fn display_error(&self, text: &str) -> Result<(), InvokeError> {
        self.call_void(Method::DisplayError, vec![Value::String(text.to_owned())])
            .await
    }

    pub async fn display_toast(&self, text: &str) -> Result<(), InvokeError> {
        self.call_void(Method::DisplayToast, vec![Value::String(text.to_owned())])
            .await
    }

    pub async fn open_url(&self, url: &str) -> Result<(), InvokeError> {
        self.call_void(Method::OpenUrl, vec![Value::String(url.to_owned())])
            .await
    }

    pub async fn open_email_app(&self, email_address: &str) -> Result<(), InvokeError> {
        self.call_void(
            Method::OpenEmailApp,
            vec![Value::String(email_address.to_owned())],
        )
        .await
    }

    pub async fn open_safari_view(&self, url: &str) -> Result<(), InvokeError> {
        self.call_void(Method::OpenSafariView, vec![Value::String(url.to_owned())])
            .await
    }

    pub async fn has_safari_view(&self) -> Result<bool, InvokeError> {
        self.call_typed(Method::HasSafariView, Vec::new()).await
    }

    pub async fn exit_plugin(&self) -> Result<(), InvokeError> {
        self.call_void(Method::ExitPlugin, Vec::new()).await
    }

    pub async fn restart_plugin(&self) -> Result<(), InvokeError> {
        self.call_void(Method::RestartPlugin, Vec::new()).await
    }

    async fn call_typed<T: DeserializeOwned>(
        &self,
        method: Method,
        params: Vec<Value>,
    ) -> Result<T, InvokeError> {
        let result = self.invoke(method, params).await?;
        serde_json::from_value(result.unwrap_or(Value::Null)).map_err(|source| {
            InvokeError::ResultShape {
                method: method.name(),
                source,
            }
        })
    }

    /// For methods whose result may legitimately be undefined.
    async fn call_optional<T: DeserializeOwned>(
        &self,
        method: Method,
        params: Vec<Value>,
    ) -> Result<Option<T>, InvokeError> {
        match self.invoke(method, params).await? {
            None => Ok(None),
            Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|source| InvokeError::ResultShape {
                    method: method.name(),
                    source,
                }),
        }
    }

    async fn call_void(&self, method: Method, params: Vec<Value>) -> Result<(), InvokeError> {
        self.invoke(method, params).await?;
        Ok(())
    }
}

fn to_param<T: Serialize + ?Sized>(value: &T) -> Result<Value, InvokeError> {
    serde_json::to_value(value).map_err(|err| InvokeError::Encode(err.into()))
}

/// An absent optional trailing argument is omitted from the params array.
fn optional_param<T: Serialize>(value: Option<&T>) -> Result<Vec<Value>, InvokeError> {
    match value {
        Some(value) => Ok(vec![to_param(value)?]),
        None => Ok(Vec::new()),
    }
}
