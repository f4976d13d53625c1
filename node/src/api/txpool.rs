use warp::Filter;

use super::response::respond;
use super::types::FormatParams;
use super::{with_chain, with_syncer, ChainRef, SyncerRef};

pub fn routes(
    cm: ChainRef,
    sync: SyncerRef,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    transactions(cm.clone())
        .or(fee(cm.clone()))
        .or(broadcast(cm, sync))
}

fn transactions(
    cm: ChainRef,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    use warp::*;

    path!("txpool" / "transactions")
        .and(get())
        .and(with_chain(cm))
        .then(handlers::transactions)
        .map(respond)
}

fn fee(cm: ChainRef) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    use warp::*;

    path!("txpool" / "fee")
        .and(get())
        .and(query::<FormatParams>())
        .and(with_chain(cm))
        .then(handlers::fee)
        .map(respond)
}

fn broadcast(
    cm: ChainRef,
    sync: SyncerRef,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    use warp::*;

    path!("txpool" / "broadcast")
        .and(post())
        .and(body::json())
        .and(with_chain(cm))
        .and(with_syncer(sync))
        .then(handlers::broadcast)
        .map(respond)
}

mod handlers {
    use super::super::response::{self, ApiError, ApiResult};
    use super::super::types::{
        FormatParams, TxpoolBroadcastRequest, TxpoolFeeResponse, TxpoolTransactionsResponse,
    };
    use super::{ChainRef, SyncerRef};

    pub(super) async fn transactions(cm: ChainRef) -> ApiResult {
        Ok(response::json(&TxpoolTransactionsResponse {
            transactions: cm.pool_transactions(),
            v2_transactions: cm.v2_pool_transactions(),
        }))
    }

    pub(super) async fn fee(format: FormatParams, cm: ChainRef) -> ApiResult {
        Ok(response::formatted(
            &format,
            &TxpoolFeeResponse(cm.recommended_fee()),
        ))
    }

    pub(super) async fn broadcast(
        req: TxpoolBroadcastRequest,
        cm: ChainRef,
        sync: SyncerRef,
    ) -> ApiResult {
        if !req.transactions.is_empty() {
            cm.add_pool_transactions(req.transactions.clone())
                .map_err(|err| ApiError::BadRequest(format!("invalid transaction set: {err}")))?;
            sync.broadcast_transaction_set(&req.transactions);
        }
        if !req.v2_transactions.is_empty() {
            let basis = cm.tip();
            cm.add_v2_pool_transactions(basis, req.v2_transactions.clone())
                .map_err(|err| {
                    ApiError::BadRequest(format!("invalid v2 transaction set: {err}"))
                })?;
            sync.broadcast_v2_transaction_set(basis, &req.v2_transactions);
        }
        Ok(response::empty())
    }
}
