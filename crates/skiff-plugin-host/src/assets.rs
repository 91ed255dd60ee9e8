//! Resolution of partner-facing currency specifiers to precise assets.
//!
//! Partners name assets loosely: plain codes ("BTC"), scoped codes
//! ("MATIC-USDC"), or objects with a pluginId. This module resolves those
//! against the account's asset directory, applies per-plugin fix tables for
//! known-bad partner strings, and maps a selection back into the partner's
//! own vocabulary. This serves a public-facing API, so the quirks below are
//! load-bearing compatibility behavior.

use std::collections::BTreeMap;

use skiff_plugin_proto::types::{AssetId, AssetSpec, TokenSpec};

/// The assets one chain plugin contributes to the directory.
#[derive(Clone, Debug)]
pub struct ChainAssets {
    pub chain_code: String,
    /// tokenId → currency code.
    pub tokens: BTreeMap<String, String>,
}

/// The account's asset directory: currency code → every asset carrying it.
pub struct CurrencyCodeTable {
    codes: BTreeMap<String, Vec<AssetId>>,
}

impl CurrencyCodeTable {
    /// `chains` is keyed by pluginId.
    pub fn new(chains: &BTreeMap<String, ChainAssets>) -> Self {
        let mut codes: BTreeMap<String, Vec<AssetId>> = BTreeMap::new();
        for (plugin_id, chain) in chains {
            codes
                .entry(chain.chain_code.to_uppercase())
                .or_default()
                .push(AssetId {
                    plugin_id: plugin_id.clone(),
                    token_id: None,
                });
            for (token_id, code) in &chain.tokens {
                codes.entry(code.to_uppercase()).or_default().push(AssetId {
                    plugin_id: plugin_id.clone(),
                    token_id: Some(token_id.clone()),
                });
            }
        }
        Self { codes }
    }

    pub fn lookup(&self, code: &str) -> &[AssetId] {
        self.codes
            .get(&code.to_uppercase())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Precisely identify the assets named by a partner's allowed-codes array.
///
/// Returns None when no codes were given at all; an array that resolves to
/// nothing still comes back as an empty list, which simply restricts the
/// wallet picker to nothing.
///
/// Plain codes are ambiguous when they match both a mainnet coin and an
/// Ethereum token (e.g. "MATIC"); those are dropped rather than guessed at.
/// Tokens on any other chain must be named with their parent, "MATIC-USDC".
pub fn upgrade_asset_specs(
    table: &CurrencyCodeTable,
    fix_currency_codes: &BTreeMap<String, AssetId>,
    specs: Option<&[AssetSpec]>,
) -> Option<Vec<AssetId>> {
    let specs = specs?;
    if specs.is_empty() {
        return None;
    }

    let mut out = Vec::new();
    for spec in specs {
        match spec {
            AssetSpec::Code(code) => {
                if let Some(fixed) = fix_currency_codes.get(code) {
                    // The fix table knows exactly which asset this partner
                    // string means.
                    out.push(fixed.clone());
                    continue;
                }

                match code.split_once('-') {
                    None => {
                        let matches = table.lookup(code);
                        let mainnets: Vec<AssetId> = matches
                            .iter()
                            .filter(|asset| asset.token_id.is_none())
                            .cloned()
                            .collect();
                        let eth_tokens: Vec<AssetId> = matches
                            .iter()
                            .filter(|asset| {
                                asset.plugin_id == "ethereum" && asset.token_id.is_some()
                            })
                            .cloned()
                            .collect();
                        if !mainnets.is_empty() && !eth_tokens.is_empty() {
                            continue;
                        }
                        out.extend(mainnets);
                        out.extend(eth_tokens);
                    }
                    Some((parent_code, token_code)) => {
                        let Some(parent) = table
                            .lookup(parent_code)
                            .iter()
                            .find(|asset| asset.token_id.is_none())
                        else {
                            continue;
                        };
                        out.extend(
                            table
                                .lookup(token_code)
                                .iter()
                                .filter(|asset| asset.plugin_id == parent.plugin_id)
                                .cloned(),
                        );
                    }
                }
            }
            AssetSpec::Token(TokenSpec {
                plugin_id,
                token_id,
                currency_code,
            }) => match currency_code {
                None => out.push(AssetId {
                    plugin_id: plugin_id.clone(),
                    token_id: token_id.clone(),
                }),
                Some(code) => out.extend(
                    table
                        .lookup(code)
                        .iter()
                        .filter(|asset| &asset.plugin_id == plugin_id)
                        .cloned(),
                ),
            },
        }
    }

    Some(out)
}

/// The reverse of a fix-table entry: the partner's own string for an asset.
pub fn unfix_currency_code(
    fix_currency_codes: &BTreeMap<String, AssetId>,
    plugin_id: &str,
    token_id: Option<&str>,
) -> Option<String> {
    fix_currency_codes
        .iter()
        .find(|(_, asset)| asset.plugin_id == plugin_id && asset.token_id.as_deref() == token_id)
        .map(|(code, _)| code.clone())
}

/// Express a selection in the caller's own vocabulary: prefer their scoped
/// "CHAIN-TOKEN" form, then the plain mainnet form, then the bare Ethereum
/// token form.
pub fn return_currency_code(
    allowed_codes: &[String],
    chain_code: &str,
    token_code: &str,
) -> Option<String> {
    let scoped = format!("{chain_code}-{token_code}");
    if let Some(found) = allowed_codes.iter().find(|code| **code == scoped) {
        return Some(found.clone());
    }
    if chain_code == token_code {
        return allowed_codes
            .iter()
            .find(|code| code.as_str() == chain_code)
            .cloned();
    }
    if chain_code == "ETH" {
        // Users may name an Ethereum token with a bare code.
        return allowed_codes
            .iter()
            .find(|code| code.as_str() == token_code)
            .cloned();
    }
    None
}
