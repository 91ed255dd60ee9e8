//! Host-side call dispatcher.
//!
//! `dispatch` always resolves to a Return and never lets an error escape
//! across the boundary. Exactly one of four outcomes occurs per Call:
//! `methodNotFound`, `invalidParams` (bound implementation not invoked),
//! success, or `unknown` carrying the bound implementation's error message.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use skiff_plugin_proto::envelope::{self, Return, RpcError, RpcId};

use crate::host::PluginHost;
use crate::registry::{self, Method, MethodCall, MethodReturn};

pub struct CallDispatcher {
    host: Arc<dyn PluginHost>,
}

impl CallDispatcher {
    pub fn new(host: Arc<dyn PluginHost>) -> Self {
        Self { host }
    }

    pub async fn dispatch(&self, raw: &str) -> Return {
        let call = match envelope::decode_call(raw) {
            Ok(call) => call,
            Err(err) => {
                debug!(error = %err, "rejecting malformed call envelope");
                return Return::err(recover_id(raw), RpcError::invalid_params(err));
            }
        };

        let Some(method) = Method::from_name(&call.method) else {
            debug!(method = %call.method, id = %call.id, "unknown method");
            return Return::err(call.id, RpcError::method_not_found(&call.method));
        };

        let typed = match registry::decode_params(method, &call.params) {
            Ok(typed) => typed,
            Err(err) => {
                warn!(method = method.name(), id = %call.id, error = %err, "rejecting invalid params");
                return Return::err(call.id, RpcError::invalid_params(err));
            }
        };

        match self.invoke(typed).await {
            Ok(ret) => match ret.into_wire() {
                Ok(result) => Return::ok(call.id, result),
                Err(err) => {
                    warn!(method = method.name(), error = %err, "result failed to serialize");
                    Return::err(call.id, RpcError::unknown(err.to_string()))
                }
            },
            Err(err) => {
                warn!(method = method.name(), id = %call.id, error = %err, "method failed");
                Return::err(call.id, RpcError::unknown(err.to_string()))
            }
        }
    }

    async fn invoke(&self, call: MethodCall) -> anyhow::Result<MethodReturn> {
        let host = &self.host;
        Ok(match call {
            MethodCall::GetDeepLink => MethodReturn::DeepLink(host.get_deep_link().await?),
            MethodCall::ChooseCurrencyWallet { allowed_codes } => {
                MethodReturn::ChosenCode(host.choose_currency_wallet(allowed_codes).await?)
            }
            MethodCall::GetReceiveAddress { options } => {
                MethodReturn::ReceiveAddress(host.get_receive_address(options).await?)
            }
            MethodCall::GetCurrentWalletInfo => {
                MethodReturn::WalletDetails(Box::new(host.get_current_wallet_info().await?))
            }
            MethodCall::GetWalletHistory => {
                MethodReturn::WalletHistory(host.get_wallet_history().await?)
            }
            MethodCall::RequestSpend { targets, options } => {
                MethodReturn::Transaction(host.request_spend(targets, options).await?.map(Box::new))
            }
            MethodCall::RequestSpendUri { uri, options } => MethodReturn::Transaction(
                host.request_spend_uri(uri, options).await?.map(Box::new),
            ),
            MethodCall::SignMessage { message } => {
                MethodReturn::Signature(host.sign_message(message).await?)
            }
            MethodCall::WriteData { data } => {
                host.write_data(data).await?;
                MethodReturn::Void
            }
            MethodCall::ReadData { keys } => MethodReturn::DataMap(host.read_data(keys).await?),
            MethodCall::ConsoleLog { text } => {
                host.console_log(text).await?;
                MethodReturn::Void
            }
            MethodCall::DisplayError { text } => {
                host.display_error(text).await?;
                MethodReturn::Void
            }
            MethodCall::DisplayToast { text } => {
                host.display_toast(text).await?;
                MethodReturn::Void
            }
            MethodCall::OpenUrl { url } => {
                host.open_url(url).await?;
                MethodReturn::Void
            }
            MethodCall::OpenEmailApp { email_address } => {
                host.open_email_app(email_address).await?;
                MethodReturn::Void
            }
            MethodCall::OpenSafariView { url } => {
                host.open_safari_view(url).await?;
                MethodReturn::Void
            }
            MethodCall::HasSafariView => MethodReturn::Bool(host.has_safari_view().await?),
            MethodCall::ExitPlugin => {
                host.exit_plugin().await?;
                MethodReturn::Void
            }
            MethodCall::RestartPlugin => {
                host.restart_plugin().await?;
                MethodReturn::Void
            }
        })
    }
}

/// Pull the id out of an envelope that failed strict decoding, so the answer
/// still correlates when possible.
fn recover_id(raw: &str) -> RpcId {
    serde_json::from_str::<Value>(raw)
        .ok()
        .and_then(|value| value.get("id").cloned())
        .and_then(|id| serde_json::from_value(id).ok())
        .unwrap_or(RpcId::Null)
}
