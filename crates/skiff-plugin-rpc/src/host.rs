//! The bound implementation surface the dispatcher invokes.

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;

use skiff_plugin_proto::types::{
    AssetSpec, DeepLink, ReceiveAddress, ReceiveAddressOptions, SpendOptions, SpendTarget,
    Transaction, WalletDetails, WalletHistory,
};

/// One method per registry entry; the registry guarantees implementations
/// only ever see validated, typed arguments.
///
/// ## Reporting failures
///
/// Implementations fail with ordinary [`anyhow::Error`]s (user cancellation,
/// network failure, insufficient funds, ...). The dispatcher maps any error
/// onto the wire `unknown(-1)` code carrying the error's message; the
/// protocol defines no richer application error vocabulary.
#[async_trait]
pub trait PluginHost: Send + Sync {
    /// The handshake call: deep-link state seeding the content session.
    async fn get_deep_link(&self) -> Result<DeepLink>;

    /// Present the wallet picker and record the selection. The result is the
    /// chosen asset in the caller's own vocabulary.
    async fn choose_currency_wallet(
        &self,
        allowed_codes: Option<Vec<AssetSpec>>,
    ) -> Result<AssetSpec>;

    async fn get_receive_address(&self, options: ReceiveAddressOptions) -> Result<ReceiveAddress>;

    async fn get_current_wallet_info(&self) -> Result<WalletDetails>;

    async fn get_wallet_history(&self) -> Result<WalletHistory>;

    /// `None` when the user backed out of the confirmation flow.
    async fn request_spend(
        &self,
        targets: Vec<SpendTarget>,
        options: SpendOptions,
    ) -> Result<Option<Transaction>>;

    async fn request_spend_uri(
        &self,
        uri: String,
        options: SpendOptions,
    ) -> Result<Option<Transaction>>;

    async fn sign_message(&self, message: String) -> Result<String>;

    /// A `None` value deletes the key.
    async fn write_data(&self, data: BTreeMap<String, Option<String>>) -> Result<()>;

    /// Missing keys come back as `None` values, never as errors.
    async fn read_data(
        &self,
        keys: Vec<String>,
    ) -> Result<BTreeMap<String, Option<String>>>;

    async fn console_log(&self, text: String) -> Result<()>;

    async fn display_error(&self, text: String) -> Result<()>;

    async fn display_toast(&self, text: String) -> Result<()>;

    async fn open_url(&self, url: String) -> Result<()>;

    async fn open_email_app(&self, email_address: String) -> Result<()>;

    async fn open_safari_view(&self, url: String) -> Result<()>;

    async fn has_safari_view(&self) -> Result<bool>;

    async fn exit_plugin(&self) -> Result<()>;

    async fn restart_plugin(&self) -> Result<()>;
}
