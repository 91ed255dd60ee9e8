//! Typed parameter/result vocabulary of the method table.
//!
//! These shapes cross the bridge as JSON, so wire names are camelCase. They
//! are deliberately tolerant of extra fields: partner pages ship on their own
//! schedule and may send metadata this app version does not know about. The
//! envelope layer is what rejects unknown fields; see [`crate::envelope`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The deep-link state seeding a plugin session, returned by `getDeepLink`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepLink {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deep_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deep_query: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promo_code: Option<String>,
}

/// A partner-facing currency specifier: a plain/scoped code string such as
/// `"BTC"` or `"ETH-REP"`, or an object naming the asset precisely.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AssetSpec {
    Code(String),
    Token(TokenSpec),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSpec {
    pub plugin_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,
}

/// A precisely identified asset: a chain, or a token on a chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetId {
    pub plugin_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount_fiat: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveAddressOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TxMetadata>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveAddress {
    pub public_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TxMetadata>,
}

/// Everything a partner page may know about the selected wallet.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletDetails {
    pub name: String,
    pub plugin_id: String,
    pub receive_address: ReceiveAddress,
    /// The chain's own currency code, e.g. "ETH" for an ERC-20 token.
    pub chain_code: String,
    pub currency_code: String,
    /// Reported without the `iso:` prefix.
    pub fiat_currency_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_icon_dark: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConfirmationState {
    Confirmed,
    Unconfirmed,
    Syncing,
    Dropped,
    #[serde(other)]
    Unknown,
}

/// A transaction as exposed to the partner page.
///
/// This is already the sanitized shape: the signed body is blanked before it
/// crosses the bridge (see the host crate's `sanitize_tx`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub txid: String,
    pub wallet_id: String,
    pub currency_code: String,
    /// Amounts are decimal strings; precision exceeds f64.
    pub native_amount: String,
    pub network_fee: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_network_fee: Option<String>,
    pub block_height: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmations: Option<ConfirmationState>,
    /// Seconds since the epoch.
    pub date: f64,
    pub is_send: bool,
    pub our_receive_addresses: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TxMetadata>,
    pub signed_tx: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletHistory {
    /// Unlike [`WalletDetails`], history keeps the `iso:` prefix.
    pub fiat_currency_code: String,
    pub balance: String,
    pub transactions: Vec<Transaction>,
}

/// One target of a `requestSpend`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_amount: Option<String>,
    /// A display-denomination amount; converted to a native amount by the
    /// wallet engine before spending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange_amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_params: Option<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpendOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_network_fee: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TxMetadata>,
    /// Defaults to true: the confirmation flow shows the request read-only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_inputs: Option<bool>,
    /// Threaded through as the spend memo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique_identifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
}
