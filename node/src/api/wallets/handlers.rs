use std::time::Duration;

use chain::{Address, Hash256};
use wallet::{Wallet, WalletAddress, WalletID, EVENTS_PAGE_LIMIT, OUTPUTS_PAGE_LIMIT};

use super::super::response::{self, ApiResult};
use super::super::types::{
    BalanceResponse, FormatParams, PageParams, WalletFundRequest, WalletFundSFRequest,
    WalletReleaseRequest, WalletReserveRequest, WalletUpdateRequest,
};
use super::super::{ChainRef, WalletsRef};

fn output_ids(
    siacoin: &[chain::SiacoinOutputID],
    siafund: &[chain::SiafundOutputID],
) -> Vec<Hash256> {
    siacoin
        .iter()
        .map(|id| id.0)
        .chain(siafund.iter().map(|id| id.0))
        .collect()
}

pub(super) async fn list(wm: WalletsRef) -> ApiResult {
    Ok(response::json(&wm.wallets()?))
}

pub(super) async fn create(req: WalletUpdateRequest, wm: WalletsRef) -> ApiResult {
    let wallet = wm.add_wallet(Wallet {
        name: req.name,
        description: req.description,
        metadata: req.metadata,
        ..Wallet::default()
    })?;
    Ok(response::json(&wallet))
}

pub(super) async fn update(id: WalletID, req: WalletUpdateRequest, wm: WalletsRef) -> ApiResult {
    let wallet = wm.update_wallet(Wallet {
        id,
        name: req.name,
        description: req.description,
        metadata: req.metadata,
        ..Wallet::default()
    })?;
    Ok(response::json(&wallet))
}

pub(super) async fn delete(id: WalletID, wm: WalletsRef) -> ApiResult {
    wm.delete_wallet(id)?;
    Ok(response::empty())
}

pub(super) async fn add_address(id: WalletID, address: WalletAddress, wm: WalletsRef) -> ApiResult {
    wm.add_address(id, address)?;
    Ok(response::empty())
}

pub(super) async fn remove_address(id: WalletID, address: Address, wm: WalletsRef) -> ApiResult {
    wm.remove_address(id, address)?;
    Ok(response::empty())
}

pub(super) async fn addresses(id: WalletID, wm: WalletsRef) -> ApiResult {
    Ok(response::json(&wm.addresses(id)?))
}

pub(super) async fn balance(id: WalletID, format: FormatParams, wm: WalletsRef) -> ApiResult {
    let balance = wm.wallet_balance(id)?;
    Ok(response::formatted(
        &format,
        &BalanceResponse { id, balance },
    ))
}

pub(super) async fn events(id: WalletID, page: PageParams, wm: WalletsRef) -> ApiResult {
    let events = wm.events(id, page.offset, page.limit.unwrap_or(EVENTS_PAGE_LIMIT))?;
    Ok(response::json(&events))
}

pub(super) async fn pool(id: WalletID, cm: ChainRef, wm: WalletsRef) -> ApiResult {
    Ok(response::json(&wm.annotate(id, cm.pool_transactions())?))
}

pub(super) async fn outputs_siacoin(id: WalletID, page: PageParams, wm: WalletsRef) -> ApiResult {
    let outputs =
        wm.unspent_siacoin_outputs(id, page.offset, page.limit.unwrap_or(OUTPUTS_PAGE_LIMIT))?;
    Ok(response::json(&outputs))
}

pub(super) async fn outputs_siafund(id: WalletID, page: PageParams, wm: WalletsRef) -> ApiResult {
    let outputs =
        wm.unspent_siafund_outputs(id, page.offset, page.limit.unwrap_or(OUTPUTS_PAGE_LIMIT))?;
    Ok(response::json(&outputs))
}

pub(super) async fn reserve(_id: WalletID, req: WalletReserveRequest, wm: WalletsRef) -> ApiResult {
    let ids = output_ids(&req.siacoin_outputs, &req.siafund_outputs);
    wm.reserve(&ids, Duration::from_millis(req.duration))?;
    Ok(response::empty())
}

pub(super) async fn release(_id: WalletID, req: WalletReleaseRequest, wm: WalletsRef) -> ApiResult {
    let ids = output_ids(&req.siacoin_outputs, &req.siafund_outputs);
    wm.release(&ids);
    Ok(response::empty())
}

pub(super) async fn fund(id: WalletID, req: WalletFundRequest, wm: WalletsRef) -> ApiResult {
    let funded = wm.fund(id, req.transaction, req.amount, req.change_address)?;
    Ok(response::json(&funded))
}

pub(super) async fn fund_siafund(
    id: WalletID,
    req: WalletFundSFRequest,
    wm: WalletsRef,
) -> ApiResult {
    let funded = wm.fund_siafunds(
        id,
        req.transaction,
        req.amount,
        req.change_address,
        req.claim_address,
    )?;
    Ok(response::json(&funded))
}

pub(super) async fn resubscribe(height: u64, wm: WalletsRef) -> ApiResult {
    wm.subscribe(height)?;
    Ok(response::empty())
}
