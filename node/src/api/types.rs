//! Request and response bodies, and the metrics views of the responses
//! that support `?response=prometheus`.

use chain::{ChainIndex, Currency, SiacoinOutputID, SiafundOutputID, Transaction, V2Transaction};
use serde::{Deserialize, Serialize};
use wallet::{Balance, WalletID};

use crate::prometheus::{Metric, ToMetrics};
use crate::syncer::PeerInfo;

/// The `?response=` rendering selector.
#[derive(Debug, Default, Deserialize)]
pub struct FormatParams {
    pub response: Option<String>,
}

impl FormatParams {
    pub fn prometheus(&self) -> bool {
        self.response.as_deref() == Some("prometheus")
    }
}

/// Pagination query parameters; defaults are endpoint-specific.
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    #[serde(default)]
    pub offset: usize,
    pub limit: Option<usize>,
}

/// Response type for `/consensus/tip`.
#[derive(Serialize)]
#[serde(transparent)]
pub struct ConsensusTipResponse(pub ChainIndex);

impl ToMetrics for ConsensusTipResponse {
    fn to_metrics(&self) -> Vec<Metric> {
        vec![Metric::new(
            "utxod_consensus_tip_height",
            self.0.height as f64,
        )]
    }
}

/// Response type for `/syncer/peers`.
#[derive(Serialize)]
#[serde(transparent)]
pub struct SyncerPeersResponse(pub Vec<PeerInfo>);

impl ToMetrics for SyncerPeersResponse {
    fn to_metrics(&self) -> Vec<Metric> {
        self.0
            .iter()
            .map(|peer| Metric::new("utxod_syncer_peer", 1.0).with_label("addr", &peer.addr))
            .collect()
    }
}

/// Request type for `/txpool/broadcast`.
#[derive(Deserialize)]
pub struct TxpoolBroadcastRequest {
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default, rename = "v2transactions")]
    pub v2_transactions: Vec<V2Transaction>,
}

/// Response type for `/txpool/transactions`.
#[derive(Serialize)]
pub struct TxpoolTransactionsResponse {
    pub transactions: Vec<Transaction>,
    #[serde(rename = "v2transactions")]
    pub v2_transactions: Vec<V2Transaction>,
}

/// Response type for `/txpool/fee`.
#[derive(Serialize)]
#[serde(transparent)]
pub struct TxpoolFeeResponse(pub Currency);

impl ToMetrics for TxpoolFeeResponse {
    fn to_metrics(&self) -> Vec<Metric> {
        vec![Metric::new("utxod_txpool_fee", self.0 .0 as f64)]
    }
}

/// Request type for creating or updating a wallet.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletUpdateRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Response type for `/wallets/:id/balance`.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceResponse {
    pub id: WalletID,
    #[serde(flatten)]
    pub balance: Balance,
}

impl ToMetrics for BalanceResponse {
    fn to_metrics(&self) -> Vec<Metric> {
        let id = self.id.to_string();
        vec![
            Metric::new("utxod_wallet_balance_siacoins", self.balance.siacoins.0 as f64)
                .with_label("id", id.clone()),
            Metric::new(
                "utxod_wallet_balance_immature_siacoins",
                self.balance.immature_siacoins.0 as f64,
            )
            .with_label("id", id.clone()),
            Metric::new("utxod_wallet_balance_siafunds", self.balance.siafunds as f64)
                .with_label("id", id),
        ]
    }
}

/// Request type for `/wallets/:id/reserve`. `duration` is in milliseconds.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletReserveRequest {
    #[serde(default)]
    pub siacoin_outputs: Vec<SiacoinOutputID>,
    #[serde(default)]
    pub siafund_outputs: Vec<SiafundOutputID>,
    pub duration: u64,
}

/// Request type for `/wallets/:id/release`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletReleaseRequest {
    #[serde(default)]
    pub siacoin_outputs: Vec<SiacoinOutputID>,
    #[serde(default)]
    pub siafund_outputs: Vec<SiafundOutputID>,
}

/// Request type for `/wallets/:id/fund`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletFundRequest {
    #[serde(default)]
    pub transaction: Transaction,
    pub amount: Currency,
    #[serde(default)]
    pub change_address: chain::Address,
}

/// Request type for `/wallets/:id/fundsf`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletFundSFRequest {
    #[serde(default)]
    pub transaction: Transaction,
    pub amount: u64,
    #[serde(default)]
    pub change_address: chain::Address,
    #[serde(default)]
    pub claim_address: chain::Address,
}
