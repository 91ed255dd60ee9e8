//! The method schema registry: the single source of truth for the API
//! surface reachable from embedded content.
//!
//! The registry is a closed enum, not a dynamic table: adding a method is a
//! compile-time-visible change, lookups outside [`Method::ALL`] cannot
//! exist, and dispatch over [`MethodCall`] is exhaustiveness-checked. Each
//! entry pairs a parameter validator (untrusted wire values → typed
//! arguments) with a result serializer (typed result → wire-safe value).

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use skiff_plugin_proto::types::{
    AssetSpec, DeepLink, ReceiveAddress, ReceiveAddressOptions, SpendOptions, SpendTarget,
    Transaction, WalletDetails, WalletHistory,
};
use skiff_plugin_proto::{EncodeError, MAX_DATA_KEYS_PER_CALL, MAX_SPEND_TARGETS_PER_CALL};

/// Every method reachable over the bridge. No method outside this table
/// exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    GetDeepLink,
    ChooseCurrencyWallet,
    GetReceiveAddress,
    GetCurrentWalletInfo,
    GetWalletHistory,
    RequestSpend,
    RequestSpendUri,
    SignMessage,
    WriteData,
    ReadData,
    ConsoleLog,
    DisplayError,
    DisplayToast,
    OpenUrl,
    OpenEmailApp,
    OpenSafariView,
    HasSafariView,
    ExitPlugin,
    RestartPlugin,
}

impl Method {
    pub const ALL: [Method; 19] = [
        Method::GetDeepLink,
        Method::ChooseCurrencyWallet,
        Method::GetReceiveAddress,
        Method::GetCurrentWalletInfo,
        Method::GetWalletHistory,
        Method::RequestSpend,
        Method::RequestSpendUri,
        Method::SignMessage,
        Method::WriteData,
        Method::ReadData,
        Method::ConsoleLog,
        Method::DisplayError,
        Method::DisplayToast,
        Method::OpenUrl,
        Method::OpenEmailApp,
        Method::OpenSafariView,
        Method::HasSafariView,
        Method::ExitPlugin,
        Method::RestartPlugin,
    ];

    /// The name as it appears on the wire.
    pub fn name(self) -> &'static str {
        match self {
            Method::GetDeepLink => "getDeepLink",
            Method::ChooseCurrencyWallet => "chooseCurrencyWallet",
            Method::GetReceiveAddress => "getReceiveAddress",
            Method::GetCurrentWalletInfo => "getCurrentWalletInfo",
            Method::GetWalletHistory => "getWalletHistory",
            Method::RequestSpend => "requestSpend",
            Method::RequestSpendUri => "requestSpendUri",
            Method::SignMessage => "signMessage",
            Method::WriteData => "writeData",
            Method::ReadData => "readData",
            Method::ConsoleLog => "consoleLog",
            Method::DisplayError => "displayError",
            Method::DisplayToast => "displayToast",
            Method::OpenUrl => "openURL",
            Method::OpenEmailApp => "openEmailApp",
            Method::OpenSafariView => "openSafariView",
            Method::HasSafariView => "hasSafariView",
            Method::ExitPlugin => "exitPlugin",
            Method::RestartPlugin => "restartPlugin",
        }
    }

    pub fn from_name(name: &str) -> Option<Method> {
        Method::ALL.into_iter().find(|m| m.name() == name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("parameter {index} for {method}: {source}")]
    Parameter {
        method: &'static str,
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("too many {what}: {len} (max {max})")]
    TooMany {
        what: &'static str,
        len: usize,
        max: usize,
    },
}

/// A validated call: the typed argument tuple for one method.
#[derive(Clone, Debug, PartialEq)]
pub enum MethodCall {
    GetDeepLink,
    ChooseCurrencyWallet {
        allowed_codes: Option<Vec<AssetSpec>>,
    },
    GetReceiveAddress {
        options: ReceiveAddressOptions,
    },
    GetCurrentWalletInfo,
    GetWalletHistory,
    RequestSpend {
        targets: Vec<SpendTarget>,
        options: SpendOptions,
    },
    RequestSpendUri {
        uri: String,
        options: SpendOptions,
    },
    SignMessage {
        message: String,
    },
    WriteData {
        data: BTreeMap<String, Option<String>>,
    },
    ReadData {
        keys: Vec<String>,
    },
    ConsoleLog {
        text: String,
    },
    DisplayError {
        text: String,
    },
    DisplayToast {
        text: String,
    },
    OpenUrl {
        url: String,
    },
    OpenEmailApp {
        email_address: String,
    },
    OpenSafariView {
        url: String,
    },
    HasSafariView,
    ExitPlugin,
    RestartPlugin,
}

/// Validate untrusted wire params into the method's typed argument tuple.
///
/// Missing trailing parameters decode as null, which satisfies any optional
/// argument; extra trailing parameters are ignored, matching how the partner
/// pages' own runtime treats surplus arguments.
pub fn decode_params(method: Method, params: &[Value]) -> Result<MethodCall, ParamsError> {
    match method {
        Method::GetDeepLink => Ok(MethodCall::GetDeepLink),
        Method::ChooseCurrencyWallet => {
            let allowed_codes: Option<Vec<AssetSpec>> = arg(method, params, 0)?;
            Ok(MethodCall::ChooseCurrencyWallet { allowed_codes })
        }
        Method::GetReceiveAddress => {
            let options: Option<ReceiveAddressOptions> = arg(method, params, 0)?;
            Ok(MethodCall::GetReceiveAddress {
                options: options.unwrap_or_default(),
            })
        }
        Method::GetCurrentWalletInfo => Ok(MethodCall::GetCurrentWalletInfo),
        Method::GetWalletHistory => Ok(MethodCall::GetWalletHistory),
        Method::RequestSpend => {
            let targets: Vec<SpendTarget> = arg(method, params, 0)?;
            if targets.len() > MAX_SPEND_TARGETS_PER_CALL {
                return Err(ParamsError::TooMany {
                    what: "spend targets",
                    len: targets.len(),
                    max: MAX_SPEND_TARGETS_PER_CALL,
                });
            }
            let options: Option<SpendOptions> = arg(method, params, 1)?;
            Ok(MethodCall::RequestSpend {
                targets,
                options: options.unwrap_or_default(),
            })
        }
        Method::RequestSpendUri => {
            let uri: String = arg(method, params, 0)?;
            let options: Option<SpendOptions> = arg(method, params, 1)?;
            Ok(MethodCall::RequestSpendUri {
                uri,
                options: options.unwrap_or_default(),
            })
        }
        Method::SignMessage => {
            let message: String = arg(method, params, 0)?;
            Ok(MethodCall::SignMessage { message })
        }
        Method::WriteData => {
            let data: BTreeMap<String, Option<String>> = arg(method, params, 0)?;
            if data.len() > MAX_DATA_KEYS_PER_CALL {
                return Err(ParamsError::TooMany {
                    what: "data keys",
                    len: data.len(),
                    max: MAX_DATA_KEYS_PER_CALL,
                });
            }
            Ok(MethodCall::WriteData { data })
        }
        Method::ReadData => {
            let keys: Vec<String> = arg(method, params, 0)?;
            if keys.len() > MAX_DATA_KEYS_PER_CALL {
                return Err(ParamsError::TooMany {
                    what: "data keys",
                    len: keys.len(),
                    max: MAX_DATA_KEYS_PER_CALL,
                });
            }
            Ok(MethodCall::ReadData { keys })
        }
        Method::ConsoleLog => Ok(MethodCall::ConsoleLog {
            text: arg(method, params, 0)?,
        }),
        Method::DisplayError => Ok(MethodCall::DisplayError {
            text: arg(method, params, 0)?,
        }),
        Method::DisplayToast => Ok(MethodCall::DisplayToast {
            text: arg(method, params, 0)?,
        }),
        Method::OpenUrl => Ok(MethodCall::OpenUrl {
            url: arg(method, params, 0)?,
        }),
        Method::OpenEmailApp => Ok(MethodCall::OpenEmailApp {
            email_address: arg(method, params, 0)?,
        }),
        Method::OpenSafariView => Ok(MethodCall::OpenSafariView {
            url: arg(method, params, 0)?,
        }),
        Method::HasSafariView => Ok(MethodCall::HasSafariView),
        Method::ExitPlugin => Ok(MethodCall::ExitPlugin),
        Method::RestartPlugin => Ok(MethodCall::RestartPlugin),
    }
}

fn arg<T: DeserializeOwned>(
    method: Method,
    params: &[Value],
    index: usize,
) -> Result<T, ParamsError> {
    let value = params.get(index).cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|source| ParamsError::Parameter {
        method: method.name(),
        index,
        source,
    })
}

/// A typed result ready to cross back to wire form.
#[derive(Clone, Debug, PartialEq)]
pub enum MethodReturn {
    DeepLink(DeepLink),
    ChosenCode(AssetSpec),
    ReceiveAddress(ReceiveAddress),
    WalletDetails(Box<WalletDetails>),
    WalletHistory(WalletHistory),
    /// Spend flows: `None` when the user backed out.
    Transaction(Option<Box<Transaction>>),
    Signature(String),
    DataMap(BTreeMap<String, Option<String>>),
    Bool(bool),
    Void,
}

impl MethodReturn {
    /// Serialize to wire form; `None` is the undefined/void result.
    pub fn into_wire(self) -> Result<Option<Value>, EncodeError> {
        let value = match self {
            MethodReturn::DeepLink(link) => serde_json::to_value(link)?,
            MethodReturn::ChosenCode(code) => serde_json::to_value(code)?,
            MethodReturn::ReceiveAddress(address) => serde_json::to_value(address)?,
            MethodReturn::WalletDetails(details) => serde_json::to_value(details)?,
            MethodReturn::WalletHistory(history) => serde_json::to_value(history)?,
            MethodReturn::Transaction(Some(tx)) => serde_json::to_value(tx)?,
            MethodReturn::Transaction(None) | MethodReturn::Void => return Ok(None),
            MethodReturn::Signature(signature) => Value::String(signature),
            MethodReturn::DataMap(map) => serde_json::to_value(map)?,
            MethodReturn::Bool(flag) => Value::Bool(flag),
        };
        Ok(Some(value))
    }
}
