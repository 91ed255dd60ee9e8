//! The production `PluginHost` implementation.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use tracing::{debug, info};

use skiff_plugin_proto::types::{
    AssetId, AssetSpec, DeepLink, ReceiveAddress, ReceiveAddressOptions, SpendOptions,
    SpendTarget, TokenSpec, Transaction, WalletDetails, WalletHistory,
};
use skiff_plugin_rpc::PluginHost;

use crate::assets::{
    return_currency_code, unfix_currency_code, upgrade_asset_specs, CurrencyCodeTable,
};
use crate::traits::{
    ContentControl, ExternalLauncher, Navigation, PluginStore, Presenter, ResolvedTarget,
    SpendInfo, SpendOutcome, WalletSelection,
};

pub struct RampProviderOpts {
    pub deep_link: DeepLink,
    /// Namespace inside the per-plugin store.
    pub store_id: String,
    /// Known-bad partner currency strings mapped to exact assets.
    pub fix_currency_codes: BTreeMap<String, AssetId>,
    pub assets: CurrencyCodeTable,
    pub store: Arc<dyn PluginStore>,
    pub presenter: Arc<dyn Presenter>,
    pub navigation: Arc<dyn Navigation>,
    pub launcher: Arc<dyn ExternalLauncher>,
    pub content: Arc<dyn ContentControl>,
    /// The wallet already selected in the app when the plugin launched.
    pub selected: Option<WalletSelection>,
}

/// One instance serves one plugin for the lifetime of its scene. Wallet
/// selection is the only mutable state; everything else delegates to the
/// collaborators.
pub struct RampProvider {
    deep_link: DeepLink,
    store_id: String,
    fix_currency_codes: BTreeMap<String, AssetId>,
    assets: CurrencyCodeTable,
    store: Arc<dyn PluginStore>,
    presenter: Arc<dyn Presenter>,
    navigation: Arc<dyn Navigation>,
    launcher: Arc<dyn ExternalLauncher>,
    content: Arc<dyn ContentControl>,
    selection: Mutex<Option<WalletSelection>>,
}

impl RampProvider {
    pub fn new(opts: RampProviderOpts) -> Self {
        Self {
            deep_link: opts.deep_link,
            store_id: opts.store_id,
            fix_currency_codes: opts.fix_currency_codes,
            assets: opts.assets,
            store: opts.store,
            presenter: opts.presenter,
            navigation: opts.navigation,
            launcher: opts.launcher,
            content: opts.content,
            selection: Mutex::new(opts.selected),
        }
    }

    fn selected(&self) -> Result<WalletSelection> {
        self.selection
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow!("No selected wallet"))
    }

    async fn confirm_spend(
        &self,
        info: SpendInfo,
        lock_inputs: bool,
    ) -> Result<Option<Transaction>> {
        match self.navigation.spend_confirmation(info, lock_inputs).await? {
            SpendOutcome::Done(tx) => Ok(Some(sanitize_tx(tx))),
            SpendOutcome::BackedOut => Ok(None),
        }
    }
}

#[async_trait]
impl PluginHost for RampProvider {
    async fn get_deep_link(&self) -> Result<DeepLink> {
        Ok(self.deep_link.clone())
    }

    async fn choose_currency_wallet(
        &self,
        allowed_codes: Option<Vec<AssetSpec>>,
    ) -> Result<AssetSpec> {
        let all_strings = allowed_codes
            .iter()
            .flatten()
            .all(|spec| matches!(spec, AssetSpec::Code(_)));
        let all_objects = allowed_codes
            .iter()
            .flatten()
            .all(|spec| matches!(spec, AssetSpec::Token(_)));
        if !all_strings && !all_objects {
            bail!("Cannot mix string and object currency specifiers");
        }

        let Some(allowed) = upgrade_asset_specs(
            &self.assets,
            &self.fix_currency_codes,
            allowed_codes.as_deref(),
        ) else {
            bail!("No allowed assets specified");
        };

        let Some(selection) = self.presenter.choose_wallet(&allowed).await? else {
            bail!("User closed the wallet picker without choosing a wallet");
        };

        let profile = selection.wallet.profile();
        let token_id = selection.token_id.clone();
        let token_code = selection.wallet.currency_code(token_id.as_deref());
        info!(
            plugin_id = %profile.plugin_id,
            currency_code = %token_code,
            "plugin selected a wallet"
        );
        *self.selection.lock().unwrap() = Some(selection);

        if let Some(unfixed) =
            unfix_currency_code(&self.fix_currency_codes, &profile.plugin_id, token_id.as_deref())
        {
            return Ok(AssetSpec::Code(unfixed));
        }

        if all_objects {
            return Ok(AssetSpec::Token(TokenSpec {
                plugin_id: profile.plugin_id,
                token_id,
                currency_code: Some(token_code),
            }));
        }

        let string_codes: Vec<String> = allowed_codes
            .into_iter()
            .flatten()
            .filter_map(|spec| match spec {
                AssetSpec::Code(code) => Some(code),
                AssetSpec::Token(_) => None,
            })
            .collect();
        match return_currency_code(&string_codes, &profile.chain_code, &token_code) {
            Some(code) => Ok(AssetSpec::Code(code)),
            None => bail!("Token {token_code} selected but not in the allowed currency codes"),
        }
    }

    async fn get_receive_address(&self, options: ReceiveAddressOptions) -> Result<ReceiveAddress> {
        let selection = self.selected()?;
        let mut address = selection.wallet.receive_address().await?;
        if options.metadata.is_some() {
            address.metadata = options.metadata;
        }
        Ok(address)
    }

    async fn get_current_wallet_info(&self) -> Result<WalletDetails> {
        let selection = self.selected()?;
        let profile = selection.wallet.profile();
        let token_id = selection.token_id.as_deref();
        let currency_code = selection.wallet.currency_code(token_id);
        let receive_address = selection.wallet.receive_address().await?;
        let icons = selection.wallet.asset_icons(token_id);

        let fiat_currency_code = profile
            .fiat_currency_code
            .strip_prefix("iso:")
            .unwrap_or(&profile.fiat_currency_code)
            .to_string();
        Ok(WalletDetails {
            name: profile.name,
            plugin_id: profile.plugin_id,
            receive_address,
            chain_code: profile.chain_code,
            currency_code,
            fiat_currency_code,
            currency_icon: icons.light,
            currency_icon_dark: icons.dark,
        })
    }

    async fn get_wallet_history(&self) -> Result<WalletHistory> {
        let selection = self.selected()?;
        let profile = selection.wallet.profile();
        let currency_code = selection.wallet.currency_code(selection.token_id.as_deref());

        let granted = self
            .presenter
            .confirm(
                "Export transactions",
                &format!("Share the transaction history of {}?", profile.name),
            )
            .await?;
        if !granted {
            bail!("User denied permission");
        }

        let balance = selection
            .wallet
            .balance(&currency_code)
            .unwrap_or_else(|| "0".to_string());
        let transactions = selection
            .wallet
            .transactions(&currency_code)
            .await?
            .into_iter()
            .map(sanitize_tx)
            .collect();
        Ok(WalletHistory {
            fiat_currency_code: profile.fiat_currency_code,
            balance,
            transactions,
        })
    }

    async fn request_spend(
        &self,
        targets: Vec<SpendTarget>,
        options: SpendOptions,
    ) -> Result<Option<Transaction>> {
        let selection = self.selected()?;
        let currency_code = selection.wallet.currency_code(selection.token_id.as_deref());

        let mut spend_targets = Vec::with_capacity(targets.len());
        for target in targets {
            let native_amount = match target.exchange_amount {
                Some(exchange) => Some(
                    selection
                        .wallet
                        .denomination_to_native(&exchange, &currency_code)
                        .await?,
                ),
                None => target.native_amount,
            };
            spend_targets.push(ResolvedTarget {
                public_address: target.public_address,
                native_amount,
                memo: options.unique_identifier.clone(),
                other_params: target.other_params,
            });
        }

        let info = SpendInfo {
            token_id: selection.token_id.clone(),
            spend_targets,
            metadata: options.metadata.clone(),
            custom_network_fee: options.custom_network_fee.clone(),
        };
        self.confirm_spend(info, options.lock_inputs.unwrap_or(true))
            .await
    }

    async fn request_spend_uri(
        &self,
        uri: String,
        options: SpendOptions,
    ) -> Result<Option<Transaction>> {
        let selection = self.selected()?;
        let selected_code = selection.wallet.currency_code(selection.token_id.as_deref());

        debug!(%uri, "parsing spend uri");
        let parsed = selection.wallet.parse_uri(&uri).await?;

        if let Some(url) = parsed.payment_protocol_url {
            // The payment-protocol flow reports its own errors; the partner
            // just sees an undefined result.
            if let Err(err) = self
                .navigation
                .launch_payment_protocol(&url, options.metadata.clone())
                .await
            {
                self.presenter.error(&err.to_string());
            }
            return Ok(None);
        }

        let uri_code = options.currency_code.clone().or(parsed.currency_code);
        if uri_code.as_deref() != Some(selected_code.as_str()) {
            bail!("URI currency code mismatch from chooseCurrencyWallet selected code");
        }

        let info = SpendInfo {
            token_id: selection.token_id.clone(),
            spend_targets: vec![ResolvedTarget {
                public_address: parsed.legacy_address.or(parsed.public_address),
                native_amount: parsed.native_amount,
                memo: options.unique_identifier.clone(),
                other_params: None,
            }],
            metadata: options.metadata.clone(),
            custom_network_fee: options.custom_network_fee.clone(),
        };
        self.confirm_spend(info, options.lock_inputs.unwrap_or(true))
            .await
    }

    async fn sign_message(&self, message: String) -> Result<String> {
        let selection = self.selected()?;
        let address = selection.wallet.receive_address().await?;
        debug!(len = message.len(), "signing partner message");
        selection
            .wallet
            .sign_message(&message, &address.public_address)
            .await
    }

    async fn write_data(&self, data: BTreeMap<String, Option<String>>) -> Result<()> {
        let keys = data.len();
        for (key, value) in data {
            match value {
                Some(value) => self.store.set_item(&self.store_id, &key, &value).await?,
                None => self.store.delete_item(&self.store_id, &key).await?,
            }
        }
        debug!(store_id = %self.store_id, keys, "plugin data written");
        Ok(())
    }

    async fn read_data(&self, keys: Vec<String>) -> Result<BTreeMap<String, Option<String>>> {
        let mut out = BTreeMap::new();
        for key in keys {
            let value = self.store.get_item(&self.store_id, &key).await.ok();
            out.insert(key, value);
        }
        debug!(store_id = %self.store_id, keys = out.len(), "plugin data read");
        Ok(out)
    }

    async fn console_log(&self, text: String) -> Result<()> {
        info!(%text, "plugin console message");
        Ok(())
    }

    async fn display_error(&self, text: String) -> Result<()> {
        self.presenter.error(&text);
        Ok(())
    }

    async fn display_toast(&self, text: String) -> Result<()> {
        self.presenter.toast(&text);
        Ok(())
    }

    async fn open_url(&self, url: String) -> Result<()> {
        self.launcher.open_url(&url).await
    }

    async fn open_email_app(&self, email_address: String) -> Result<()> {
        self.launcher.open_email_app(&email_address).await
    }

    async fn open_safari_view(&self, url: String) -> Result<()> {
        self.launcher.open_safari_view(&url).await
    }

    async fn has_safari_view(&self) -> Result<bool> {
        Ok(self.launcher.has_safari_view())
    }

    async fn exit_plugin(&self) -> Result<()> {
        self.navigation.pop();
        Ok(())
    }

    async fn restart_plugin(&self) -> Result<()> {
        self.content.reload();
        Ok(())
    }
}

/// Rebuild a transaction field-by-field before it crosses the bridge. The
/// signed body never leaves the host.
pub fn sanitize_tx(tx: Transaction) -> Transaction {
    Transaction {
        txid: tx.txid,
        wallet_id: tx.wallet_id,
        currency_code: tx.currency_code,
        native_amount: tx.native_amount,
        network_fee: tx.network_fee,
        parent_network_fee: tx.parent_network_fee,
        block_height: tx.block_height,
        confirmations: tx.confirmations,
        date: tx.date,
        is_send: tx.is_send,
        our_receive_addresses: tx.our_receive_addresses,
        metadata: tx.metadata,
        signed_tx: String::new(),
    }
}
