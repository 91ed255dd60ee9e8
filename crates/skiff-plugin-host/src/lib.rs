//! Host capability surface of the plugin bridge.
//!
//! The bridge core (`skiff-plugin-rpc`) validates and routes calls; this
//! crate is what the calls land on. [`RampProvider`] implements the bound
//! method surface against collaborator traits for the wallet engine, the
//! navigation stack, the per-plugin encrypted store, the toast/error
//! presenter, and the external launcher. The embedded content only ever
//! sees what these implementations choose to return; wallets, keys, and
//! navigation internals stay on this side of the boundary.

mod assets;
mod provider;
mod traits;

pub use assets::{
    return_currency_code, unfix_currency_code, upgrade_asset_specs, ChainAssets,
    CurrencyCodeTable,
};
pub use provider::{sanitize_tx, RampProvider, RampProviderOpts};
pub use traits::{
    AssetIcons, ContentControl, ExternalLauncher, Navigation, ParsedUri, PluginStore, Presenter,
    ResolvedTarget, SpendInfo, SpendOutcome, WalletEngine, WalletProfile, WalletSelection,
};
