//! HTTP API.
//!
//! Routes are grouped by area, one module per area; handlers live next to
//! the filters that mount them. Error mapping and response rendering are
//! shared in `response`.

mod consensus;
mod response;
mod syncer;
mod txpool;
mod types;
mod wallets;

use std::convert::Infallible;
use std::sync::Arc;

use warp::Filter;

use crate::config;

pub type ChainRef = Arc<chain::Manager>;
pub type WalletsRef = Arc<wallet::WalletManager<wallet::MemStore>>;
pub type SyncerRef = Arc<dyn crate::syncer::Syncer>;

/// Launches the API server.
pub async fn launch(cfg: &config::Api, cm: ChainRef, sync: SyncerRef, wm: WalletsRef) {
    if cfg.disabled {
        return;
    }
    let routes = routes(cm, sync, wm);
    tracing::info!(addr = %cfg.listen, "api listening");
    warp::serve(routes).run(cfg.listen).await;
}

pub fn routes(
    cm: ChainRef,
    sync: SyncerRef,
    wm: WalletsRef,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    consensus::routes(cm.clone())
        .or(syncer::routes(cm.clone(), sync.clone()))
        .or(txpool::routes(cm.clone(), sync))
        .or(wallets::routes(cm, wm))
}

fn with_chain(cm: ChainRef) -> impl Filter<Extract = (ChainRef,), Error = Infallible> + Clone {
    warp::any().map(move || cm.clone())
}

fn with_syncer(sync: SyncerRef) -> impl Filter<Extract = (SyncerRef,), Error = Infallible> + Clone {
    warp::any().map(move || sync.clone())
}

fn with_wallets(wm: WalletsRef) -> impl Filter<Extract = (WalletsRef,), Error = Infallible> + Clone {
    warp::any().map(move || wm.clone())
}
