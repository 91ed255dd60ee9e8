//! Collaborator traits consumed by the provider.
//!
//! These are the seams to the rest of the application: the wallet engine,
//! the navigation stack, the encrypted per-plugin store, the toast/error
//! presenter, and the external launcher. The provider is written entirely
//! against these traits; tests drive it with in-memory doubles.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use skiff_plugin_proto::types::{AssetId, ReceiveAddress, Transaction, TxMetadata};

/// Static facts about a wallet.
#[derive(Clone, Debug)]
pub struct WalletProfile {
    pub name: String,
    pub plugin_id: String,
    /// The chain's own currency code, e.g. "ETH".
    pub chain_code: String,
    /// Includes the `iso:` prefix, e.g. "iso:USD".
    pub fiat_currency_code: String,
}

/// Icon URLs for an asset, when the app ships them.
#[derive(Clone, Debug, Default)]
pub struct AssetIcons {
    pub light: Option<String>,
    pub dark: Option<String>,
}

/// What the wallet engine extracted from a payment URI.
#[derive(Clone, Debug, Default)]
pub struct ParsedUri {
    pub public_address: Option<String>,
    /// When present, a legacy-format address was scanned; it takes
    /// precedence over `public_address`.
    pub legacy_address: Option<String>,
    pub native_amount: Option<String>,
    pub currency_code: Option<String>,
    pub metadata: Option<TxMetadata>,
    /// A BIP-70 style payment-protocol endpoint; handled by navigation, not
    /// by the ordinary spend flow.
    pub payment_protocol_url: Option<String>,
}

#[async_trait]
pub trait WalletEngine: Send + Sync {
    fn profile(&self) -> WalletProfile;

    /// The currency code of a token on this wallet, or the chain code when
    /// `token_id` is None.
    fn currency_code(&self, token_id: Option<&str>) -> String;

    fn asset_icons(&self, token_id: Option<&str>) -> AssetIcons;

    /// None when the wallet holds no balance entry for the code.
    fn balance(&self, currency_code: &str) -> Option<String>;

    async fn receive_address(&self) -> Result<ReceiveAddress>;

    async fn parse_uri(&self, uri: &str) -> Result<ParsedUri>;

    /// Sign `message` with the key behind `public_address`.
    async fn sign_message(&self, message: &str, public_address: &str) -> Result<String>;

    async fn transactions(&self, currency_code: &str) -> Result<Vec<Transaction>>;

    /// Convert a display-denomination amount to the chain's native unit.
    async fn denomination_to_native(&self, amount: &str, currency_code: &str) -> Result<String>;
}

/// A recorded wallet choice: the wallet plus the token on it, if any.
#[derive(Clone)]
pub struct WalletSelection {
    pub wallet: Arc<dyn WalletEngine>,
    pub token_id: Option<String>,
}

/// One resolved target of a spend, amounts already in native units.
#[derive(Clone, Debug, Default)]
pub struct ResolvedTarget {
    pub public_address: Option<String>,
    pub native_amount: Option<String>,
    pub memo: Option<String>,
    pub other_params: Option<Value>,
}

/// Everything the spend-confirmation flow needs to present a request.
#[derive(Clone, Debug)]
pub struct SpendInfo {
    pub token_id: Option<String>,
    pub spend_targets: Vec<ResolvedTarget>,
    pub metadata: Option<TxMetadata>,
    pub custom_network_fee: Option<Value>,
}

/// How the spend-confirmation flow ended.
#[derive(Clone, Debug)]
pub enum SpendOutcome {
    Done(Transaction),
    BackedOut,
}

#[async_trait]
pub trait Navigation: Send + Sync {
    /// Push the spend-confirmation flow and wait for its outcome. With
    /// `lock_inputs` the flow shows the request read-only.
    async fn spend_confirmation(&self, info: SpendInfo, lock_inputs: bool) -> Result<SpendOutcome>;

    async fn launch_payment_protocol(&self, url: &str, metadata: Option<TxMetadata>)
        -> Result<()>;

    fn pop(&self);
}

/// The encrypted per-plugin key-value store. Each plugin only ever sees its
/// own namespace.
#[async_trait]
pub trait PluginStore: Send + Sync {
    async fn get_item(&self, store_id: &str, key: &str) -> Result<String>;

    async fn set_item(&self, store_id: &str, key: &str, value: &str) -> Result<()>;

    async fn delete_item(&self, store_id: &str, key: &str) -> Result<()>;
}

#[async_trait]
pub trait Presenter: Send + Sync {
    fn toast(&self, text: &str);

    fn error(&self, text: &str);

    /// A yes/no modal; true when the user agreed.
    async fn confirm(&self, title: &str, message: &str) -> Result<bool>;

    /// Show the wallet picker restricted to `allowed`; None when the user
    /// dismissed it without choosing.
    async fn choose_wallet(&self, allowed: &[AssetId]) -> Result<Option<WalletSelection>>;
}

#[async_trait]
pub trait ExternalLauncher: Send + Sync {
    async fn open_url(&self, url: &str) -> Result<()>;

    async fn open_email_app(&self, address: &str) -> Result<()>;

    async fn open_safari_view(&self, url: &str) -> Result<()>;

    fn has_safari_view(&self) -> bool;
}

/// Control over the embedded content view itself.
pub trait ContentControl: Send + Sync {
    fn reload(&self);
}
