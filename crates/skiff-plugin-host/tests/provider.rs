//! Provider semantics against in-memory collaborator doubles.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use skiff_plugin_host::{
    AssetIcons, ChainAssets, ContentControl, CurrencyCodeTable, ExternalLauncher, Navigation,
    ParsedUri, PluginStore, Presenter, RampProvider, RampProviderOpts, ResolvedTarget, SpendInfo,
    SpendOutcome, WalletEngine, WalletProfile, WalletSelection,
};
use skiff_plugin_proto::types::{
    AssetId, AssetSpec, DeepLink, ReceiveAddress, SpendOptions, SpendTarget, TokenSpec,
    Transaction,
};
use skiff_plugin_rpc::PluginHost;

struct TestWallet {
    profile: WalletProfile,
    token_code: String,
    balances: BTreeMap<String, String>,
    txs: Vec<Transaction>,
    parse_result: Mutex<ParsedUri>,
}

impl TestWallet {
    fn new(plugin_id: &str, chain_code: &str) -> Self {
        Self {
            profile: WalletProfile {
                name: "Main Wallet".into(),
                plugin_id: plugin_id.into(),
                chain_code: chain_code.into(),
                fiat_currency_code: "iso:USD".into(),
            },
            token_code: "USDC".into(),
            balances: BTreeMap::new(),
            txs: Vec::new(),
            parse_result: Mutex::new(ParsedUri::default()),
        }
    }

    fn set_parse_result(&self, parsed: ParsedUri) {
        *self.parse_result.lock().unwrap() = parsed;
    }
}

#[async_trait]
impl WalletEngine for TestWallet {
    fn profile(&self) -> WalletProfile {
        self.profile.clone()
    }

    fn currency_code(&self, token_id: Option<&str>) -> String {
        match token_id {
            None => self.profile.chain_code.clone(),
            Some(_) => self.token_code.clone(),
        }
    }

    fn asset_icons(&self, _token_id: Option<&str>) -> AssetIcons {
        AssetIcons {
            light: Some("https://icons.example/btc.png".into()),
            dark: None,
        }
    }

    fn balance(&self, currency_code: &str) -> Option<String> {
        self.balances.get(currency_code).cloned()
    }

    async fn receive_address(&self) -> Result<ReceiveAddress> {
        Ok(ReceiveAddress {
            public_address: "bc1qmainaddress".into(),
            legacy_address: None,
            metadata: None,
        })
    }

    async fn parse_uri(&self, _uri: &str) -> Result<ParsedUri> {
        Ok(self.parse_result.lock().unwrap().clone())
    }

    async fn sign_message(&self, message: &str, public_address: &str) -> Result<String> {
        Ok(format!("sig({message})@{public_address}"))
    }

    async fn transactions(&self, _currency_code: &str) -> Result<Vec<Transaction>> {
        Ok(self.txs.clone())
    }

    async fn denomination_to_native(&self, amount: &str, _currency_code: &str) -> Result<String> {
        Ok(format!("{amount}:native"))
    }
}

#[derive(Default)]
struct MemoryStore(Mutex<BTreeMap<(String, String), String>>);

#[async_trait]
impl PluginStore for MemoryStore {
    async fn get_item(&self, store_id: &str, key: &str) -> Result<String> {
        self.0
            .lock()
            .unwrap()
            .get(&(store_id.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| anyhow!("no such key: {key}"))
    }

    async fn set_item(&self, store_id: &str, key: &str, value: &str) -> Result<()> {
        self.0
            .lock()
            .unwrap()
            .insert((store_id.to_string(), key.to_string()), value.to_string());
        Ok(())
    }

    async fn delete_item(&self, store_id: &str, key: &str) -> Result<()> {
        self.0
            .lock()
            .unwrap()
            .remove(&(store_id.to_string(), key.to_string()));
        Ok(())
    }
}

struct TestPresenter {
    confirm_answer: bool,
    choice: Mutex<Option<WalletSelection>>,
    last_allowed: Mutex<Vec<AssetId>>,
    toasts: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl TestPresenter {
    fn new() -> Self {
        Self {
            confirm_answer: true,
            choice: Mutex::new(None),
            last_allowed: Mutex::new(Vec::new()),
            toasts: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
        }
    }

    fn will_choose(&self, selection: WalletSelection) {
        *self.choice.lock().unwrap() = Some(selection);
    }
}

#[async_trait]
impl Presenter for TestPresenter {
    fn toast(&self, text: &str) {
        self.toasts.lock().unwrap().push(text.to_string());
    }

    fn error(&self, text: &str) {
        self.errors.lock().unwrap().push(text.to_string());
    }

    async fn confirm(&self, _title: &str, _message: &str) -> Result<bool> {
        Ok(self.confirm_answer)
    }

    async fn choose_wallet(&self, allowed: &[AssetId]) -> Result<Option<WalletSelection>> {
        *self.last_allowed.lock().unwrap() = allowed.to_vec();
        Ok(self.choice.lock().unwrap().clone())
    }
}

struct TestNavigation {
    outcome: Mutex<SpendOutcome>,
    last_spend: Mutex<Option<(SpendInfo, bool)>>,
    payment_protocols: Mutex<Vec<String>>,
    fail_payment_protocol: bool,
    pops: AtomicUsize,
}

impl TestNavigation {
    fn new() -> Self {
        Self {
            outcome: Mutex::new(SpendOutcome::BackedOut),
            last_spend: Mutex::new(None),
            payment_protocols: Mutex::new(Vec::new()),
            fail_payment_protocol: false,
            pops: AtomicUsize::new(0),
        }
    }

    fn will_complete_with(&self, tx: Transaction) {
        *self.outcome.lock().unwrap() = SpendOutcome::Done(tx);
    }

    fn last_targets(&self) -> Vec<ResolvedTarget> {
        let guard = self.last_spend.lock().unwrap();
        let (info, _) = guard.as_ref().expect("no spend recorded");
        info.spend_targets.clone()
    }
}

#[async_trait]
impl Navigation for TestNavigation {
    async fn spend_confirmation(&self, info: SpendInfo, lock_inputs: bool) -> Result<SpendOutcome> {
        *self.last_spend.lock().unwrap() = Some((info, lock_inputs));
        Ok(self.outcome.lock().unwrap().clone())
    }

    async fn launch_payment_protocol(
        &self,
        url: &str,
        _metadata: Option<skiff_plugin_proto::types::TxMetadata>,
    ) -> Result<()> {
        self.payment_protocols.lock().unwrap().push(url.to_string());
        if self.fail_payment_protocol {
            return Err(anyhow!("payment protocol endpoint unreachable"));
        }
        Ok(())
    }

    fn pop(&self) {
        self.pops.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct TestLauncher {
    urls: Mutex<Vec<String>>,
}

#[async_trait]
impl ExternalLauncher for TestLauncher {
    async fn open_url(&self, url: &str) -> Result<()> {
        self.urls.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn open_email_app(&self, _address: &str) -> Result<()> {
        Ok(())
    }

    async fn open_safari_view(&self, url: &str) -> Result<()> {
        self.urls.lock().unwrap().push(url.to_string());
        Ok(())
    }

    fn has_safari_view(&self) -> bool {
        true
    }
}

#[derive(Default)]
struct TestControl {
    reloads: AtomicUsize,
}

impl ContentControl for TestControl {
    fn reload(&self) {
        self.reloads.fetch_add(1, Ordering::SeqCst);
    }
}

fn asset_table() -> CurrencyCodeTable {
    CurrencyCodeTable::new(&BTreeMap::from([
        (
            "bitcoin".to_string(),
            ChainAssets {
                chain_code: "BTC".into(),
                tokens: BTreeMap::new(),
            },
        ),
        (
            "ethereum".to_string(),
            ChainAssets {
                chain_code: "ETH".into(),
                tokens: BTreeMap::from([(
                    "a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48".to_string(),
                    "USDC".to_string(),
                )]),
            },
        ),
    ]))
}

struct World {
    wallet: Arc<TestWallet>,
    store: Arc<MemoryStore>,
    presenter: Arc<TestPresenter>,
    navigation: Arc<TestNavigation>,
    launcher: Arc<TestLauncher>,
    content: Arc<TestControl>,
}

impl World {
    fn new() -> Self {
        Self {
            wallet: Arc::new(TestWallet::new("bitcoin", "BTC")),
            store: Arc::new(MemoryStore::default()),
            presenter: Arc::new(TestPresenter::new()),
            navigation: Arc::new(TestNavigation::new()),
            launcher: Arc::new(TestLauncher::default()),
            content: Arc::new(TestControl::default()),
        }
    }

    fn provider(&self, selected: bool) -> RampProvider {
        RampProvider::new(RampProviderOpts {
            deep_link: DeepLink::default(),
            store_id: "partner-ramp".into(),
            fix_currency_codes: BTreeMap::new(),
            assets: asset_table(),
            store: self.store.clone(),
            presenter: self.presenter.clone(),
            navigation: self.navigation.clone(),
            launcher: self.launcher.clone(),
            content: self.content.clone(),
            selected: selected.then(|| WalletSelection {
                wallet: self.wallet.clone(),
                token_id: None,
            }),
        })
    }
}

fn sample_tx(signed: &str) -> Transaction {
    Transaction {
        txid: "abc123".into(),
        wallet_id: "wallet-1".into(),
        currency_code: "BTC".into(),
        native_amount: "-150000".into(),
        network_fee: "300".into(),
        parent_network_fee: None,
        block_height: 840_000,
        confirmations: None,
        date: 1_754_000_000.0,
        is_send: true,
        our_receive_addresses: vec!["bc1qchange".into()],
        metadata: None,
        signed_tx: signed.into(),
    }
}

fn codes(specs: &[&str]) -> Vec<AssetSpec> {
    specs
        .iter()
        .map(|code| AssetSpec::Code(code.to_string()))
        .collect()
}

#[tokio::test]
async fn wallet_methods_require_a_selection() {
    let world = World::new();
    let provider = world.provider(false);

    let err = provider
        .get_receive_address(Default::default())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "No selected wallet");

    let err = provider.sign_message("hi".into()).await.unwrap_err();
    assert_eq!(err.to_string(), "No selected wallet");
}

#[tokio::test]
async fn choose_wallet_records_selection_and_answers_in_the_callers_vocabulary() {
    let world = World::new();
    let provider = world.provider(false);
    world.presenter.will_choose(WalletSelection {
        wallet: world.wallet.clone(),
        token_id: None,
    });

    let chosen = provider
        .choose_currency_wallet(Some(codes(&["BTC", "ETH"])))
        .await
        .unwrap();
    assert_eq!(chosen, AssetSpec::Code("BTC".into()));

    // The picker saw the resolved assets.
    assert_eq!(
        world.presenter.last_allowed.lock().unwrap().as_slice(),
        [
            AssetId {
                plugin_id: "bitcoin".into(),
                token_id: None
            },
            AssetId {
                plugin_id: "ethereum".into(),
                token_id: None
            },
        ]
    );

    // The selection is live for later calls.
    let address = provider.get_receive_address(Default::default()).await.unwrap();
    assert_eq!(address.public_address, "bc1qmainaddress");
}

#[tokio::test]
async fn choose_wallet_answers_scoped_and_object_forms() {
    let eth_wallet = Arc::new(TestWallet::new("ethereum", "ETH"));
    let token_id = "a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";

    let world = World::new();
    let provider = world.provider(false);
    world.presenter.will_choose(WalletSelection {
        wallet: eth_wallet.clone(),
        token_id: Some(token_id.into()),
    });

    let chosen = provider
        .choose_currency_wallet(Some(codes(&["BTC-BTC", "ETH-USDC"])))
        .await
        .unwrap();
    assert_eq!(chosen, AssetSpec::Code("ETH-USDC".into()));

    let chosen = provider
        .choose_currency_wallet(Some(vec![AssetSpec::Token(TokenSpec {
            plugin_id: "ethereum".into(),
            token_id: Some(token_id.into()),
            currency_code: None,
        })]))
        .await
        .unwrap();
    assert_eq!(
        chosen,
        AssetSpec::Token(TokenSpec {
            plugin_id: "ethereum".into(),
            token_id: Some(token_id.into()),
            currency_code: Some("USDC".into()),
        })
    );
}

#[tokio::test]
async fn choose_wallet_restores_fixed_partner_strings() {
    let eth_wallet = Arc::new(TestWallet::new("ethereum", "ETH"));
    let token_id = "a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";

    let world = World::new();
    let provider = RampProvider::new(RampProviderOpts {
        deep_link: DeepLink::default(),
        store_id: "partner-ramp".into(),
        fix_currency_codes: BTreeMap::from([(
            "USDC.E".to_string(),
            AssetId {
                plugin_id: "ethereum".into(),
                token_id: Some(token_id.into()),
            },
        )]),
        assets: asset_table(),
        store: world.store.clone(),
        presenter: world.presenter.clone(),
        navigation: world.navigation.clone(),
        launcher: world.launcher.clone(),
        content: world.content.clone(),
        selected: None,
    });

    world.presenter.will_choose(WalletSelection {
        wallet: eth_wallet,
        token_id: Some(token_id.into()),
    });

    let chosen = provider
        .choose_currency_wallet(Some(codes(&["USDC.E", "BTC"])))
        .await
        .unwrap();
    assert_eq!(chosen, AssetSpec::Code("USDC.E".into()));
}

#[tokio::test]
async fn choose_wallet_rejects_bad_requests() {
    let world = World::new();
    let provider = world.provider(false);

    let mixed = vec![
        AssetSpec::Code("BTC".into()),
        AssetSpec::Token(TokenSpec {
            plugin_id: "ethereum".into(),
            token_id: None,
            currency_code: None,
        }),
    ];
    let err = provider.choose_currency_wallet(Some(mixed)).await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Cannot mix string and object currency specifiers"
    );

    let err = provider.choose_currency_wallet(None).await.unwrap_err();
    assert_eq!(err.to_string(), "No allowed assets specified");

    // Picker dismissed without a choice.
    let err = provider
        .choose_currency_wallet(Some(codes(&["BTC"])))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("without choosing"));
}

#[tokio::test]
async fn wallet_info_strips_the_iso_prefix_but_history_keeps_it() {
    let world = World::new();
    let provider = world.provider(true);

    let details = provider.get_current_wallet_info().await.unwrap();
    assert_eq!(details.fiat_currency_code, "USD");
    assert_eq!(details.chain_code, "BTC");
    assert_eq!(details.currency_code, "BTC");
    assert_eq!(details.name, "Main Wallet");

    let history = provider.get_wallet_history().await.unwrap();
    assert_eq!(history.fiat_currency_code, "iso:USD");
    // No balance entry for BTC in this wallet double.
    assert_eq!(history.balance, "0");
}

#[tokio::test]
async fn wallet_history_requires_user_permission() {
    let mut world = World::new();
    let presenter = Arc::new(TestPresenter {
        confirm_answer: false,
        ..TestPresenter::new()
    });
    world.presenter = presenter;
    let provider = world.provider(true);

    let err = provider.get_wallet_history().await.unwrap_err();
    assert_eq!(err.to_string(), "User denied permission");
}

#[tokio::test]
async fn request_spend_converts_exchange_amounts_and_sanitizes_the_result() {
    let world = World::new();
    let provider = world.provider(true);
    world.navigation.will_complete_with(sample_tx("0200000001ab..."));

    let targets = vec![SpendTarget {
        public_address: Some("bc1qdest".into()),
        exchange_amount: Some("2.5".into()),
        ..Default::default()
    }];
    let options = SpendOptions {
        unique_identifier: Some("order-77".into()),
        ..Default::default()
    };

    let tx = provider
        .request_spend(targets, options)
        .await
        .unwrap()
        .expect("expected a completed spend");
    assert_eq!(tx.txid, "abc123");
    assert_eq!(tx.signed_tx, "", "signed body must not cross the bridge");

    let resolved = world.navigation.last_targets();
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].native_amount.as_deref(), Some("2.5:native"));
    assert_eq!(resolved[0].memo.as_deref(), Some("order-77"));

    // lockInputs defaults to true.
    let (_, lock_inputs) = world.navigation.last_spend.lock().unwrap().clone().unwrap();
    assert!(lock_inputs);
}

#[tokio::test]
async fn request_spend_backed_out_is_an_undefined_result() {
    let world = World::new();
    let provider = world.provider(true);

    let result = provider
        .request_spend(
            vec![SpendTarget {
                public_address: Some("bc1qdest".into()),
                native_amount: Some("1000".into()),
                ..Default::default()
            }],
            SpendOptions::default(),
        )
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn spend_uri_routes_payment_protocol_urls_to_navigation() {
    let world = World::new();
    let provider = world.provider(true);
    world.wallet.set_parse_result(ParsedUri {
        payment_protocol_url: Some("https://pay.example/invoice/9".into()),
        ..ParsedUri::default()
    });

    let result = provider
        .request_spend_uri("bitcoin:?r=https://pay.example/invoice/9".into(), SpendOptions::default())
        .await
        .unwrap();
    assert!(result.is_none());
    assert_eq!(
        world.navigation.payment_protocols.lock().unwrap().as_slice(),
        ["https://pay.example/invoice/9"]
    );
}

#[tokio::test]
async fn spend_uri_payment_protocol_failures_surface_as_presenter_errors() {
    let mut world = World::new();
    world.navigation = Arc::new(TestNavigation {
        fail_payment_protocol: true,
        ..TestNavigation::new()
    });
    let provider = world.provider(true);
    world.wallet.set_parse_result(ParsedUri {
        payment_protocol_url: Some("https://pay.example/invoice/9".into()),
        ..ParsedUri::default()
    });

    let result = provider
        .request_spend_uri("bitcoin:?r=...".into(), SpendOptions::default())
        .await
        .unwrap();
    assert!(result.is_none());
    assert_eq!(world.presenter.errors.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn spend_uri_rejects_currency_mismatch() {
    let world = World::new();
    let provider = world.provider(true);
    world.wallet.set_parse_result(ParsedUri {
        public_address: Some("ltc1qdest".into()),
        currency_code: Some("LTC".into()),
        ..ParsedUri::default()
    });

    let err = provider
        .request_spend_uri("litecoin:ltc1qdest".into(), SpendOptions::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("currency code mismatch"));
}

#[tokio::test]
async fn spend_uri_prefers_the_scanned_legacy_address() {
    let world = World::new();
    let provider = world.provider(true);
    world.navigation.will_complete_with(sample_tx("ff"));
    world.wallet.set_parse_result(ParsedUri {
        public_address: Some("bc1qmodern".into()),
        legacy_address: Some("1LegacyAddr".into()),
        native_amount: Some("5000".into()),
        currency_code: Some("BTC".into()),
        ..ParsedUri::default()
    });

    provider
        .request_spend_uri("bitcoin:1LegacyAddr?amount=0.00005".into(), SpendOptions::default())
        .await
        .unwrap();

    let resolved = world.navigation.last_targets();
    assert_eq!(resolved[0].public_address.as_deref(), Some("1LegacyAddr"));
    assert_eq!(resolved[0].native_amount.as_deref(), Some("5000"));
}

#[tokio::test]
async fn sign_message_uses_the_receive_address_as_key_context() {
    let world = World::new();
    let provider = world.provider(true);

    let signature = provider.sign_message("attest".into()).await.unwrap();
    assert_eq!(signature, "sig(attest)@bc1qmainaddress");
}

#[tokio::test]
async fn data_round_trips_through_the_namespaced_store() {
    let world = World::new();
    let provider = world.provider(true);

    provider
        .write_data(BTreeMap::from([
            ("session".to_string(), Some("tok-1".to_string())),
            ("stale".to_string(), Some("x".to_string())),
        ]))
        .await
        .unwrap();
    provider
        .write_data(BTreeMap::from([("stale".to_string(), None)]))
        .await
        .unwrap();

    let read = provider
        .read_data(vec!["session".into(), "stale".into(), "missing".into()])
        .await
        .unwrap();
    assert_eq!(read.get("session"), Some(&Some("tok-1".to_string())));
    assert_eq!(read.get("stale"), Some(&None));
    assert_eq!(read.get("missing"), Some(&None));
}

#[tokio::test]
async fn display_navigation_and_launcher_calls_delegate() {
    let world = World::new();
    let provider = world.provider(true);

    provider.display_toast("saved".into()).await.unwrap();
    provider.display_error("bad luck".into()).await.unwrap();
    provider.open_url("https://partner.example".into()).await.unwrap();
    assert!(provider.has_safari_view().await.unwrap());
    provider.exit_plugin().await.unwrap();
    provider.restart_plugin().await.unwrap();

    assert_eq!(world.presenter.toasts.lock().unwrap().as_slice(), ["saved"]);
    assert_eq!(
        world.presenter.errors.lock().unwrap().as_slice(),
        ["bad luck"]
    );
    assert_eq!(
        world.launcher.urls.lock().unwrap().as_slice(),
        ["https://partner.example"]
    );
    assert_eq!(world.navigation.pops.load(Ordering::SeqCst), 1);
    assert_eq!(world.content.reloads.load(Ordering::SeqCst), 1);
}
