use warp::Filter;

use super::response::respond;
use super::types::FormatParams;
use super::{with_chain, with_syncer, ChainRef, SyncerRef};

pub fn routes(
    cm: ChainRef,
    sync: SyncerRef,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    peers(sync.clone())
        .or(connect(sync.clone()))
        .or(broadcast_block(cm, sync))
}

fn peers(sync: SyncerRef) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    use warp::*;

    path!("syncer" / "peers")
        .and(get())
        .and(query::<FormatParams>())
        .and(with_syncer(sync))
        .then(handlers::peers)
        .map(respond)
}

fn connect(
    sync: SyncerRef,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    use warp::*;

    path!("syncer" / "connect")
        .and(post())
        .and(body::json())
        .and(with_syncer(sync))
        .then(handlers::connect)
        .map(respond)
}

fn broadcast_block(
    cm: ChainRef,
    sync: SyncerRef,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    use warp::*;

    path!("syncer" / "broadcast" / "block")
        .and(post())
        .and(body::json())
        .and(with_chain(cm))
        .and(with_syncer(sync))
        .then(handlers::broadcast_block)
        .map(respond)
}

mod handlers {
    use chain::Block;

    use super::super::response::{self, ApiError, ApiResult};
    use super::super::types::{FormatParams, SyncerPeersResponse};
    use super::{ChainRef, SyncerRef};
    use crate::syncer::BlockHeader;

    pub(super) async fn peers(format: FormatParams, sync: SyncerRef) -> ApiResult {
        Ok(response::formatted(
            &format,
            &SyncerPeersResponse(sync.peers()),
        ))
    }

    pub(super) async fn connect(addr: String, sync: SyncerRef) -> ApiResult {
        sync.connect(&addr)
            .map_err(|err| ApiError::Internal(format!("couldn't connect to peer: {err}")))?;
        Ok(response::empty())
    }

    pub(super) async fn broadcast_block(block: Block, cm: ChainRef, sync: SyncerRef) -> ApiResult {
        cm.add_blocks(std::slice::from_ref(&block))
            .map_err(|err| ApiError::BadRequest(format!("block is invalid: {err}")))?;
        if block.v2_transactions.is_empty() {
            sync.broadcast_header(BlockHeader::from(&block));
        } else {
            sync.broadcast_v2_block_outline(&block);
        }
        Ok(response::empty())
    }
}
