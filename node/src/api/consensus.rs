use warp::Filter;

use super::response::respond;
use super::types::FormatParams;
use super::{with_chain, ChainRef};

pub fn routes(
    cm: ChainRef,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    network(cm.clone()).or(tip(cm.clone())).or(tip_state(cm))
}

fn network(
    cm: ChainRef,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    use warp::*;

    path!("consensus" / "network")
        .and(get())
        .and(with_chain(cm))
        .then(handlers::network)
        .map(respond)
}

fn tip(cm: ChainRef) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    use warp::*;

    path!("consensus" / "tip")
        .and(get())
        .and(query::<FormatParams>())
        .and(with_chain(cm))
        .then(handlers::tip)
        .map(respond)
}

fn tip_state(
    cm: ChainRef,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    use warp::*;

    path!("consensus" / "tipstate")
        .and(get())
        .and(with_chain(cm))
        .then(handlers::tip_state)
        .map(respond)
}

mod handlers {
    use super::super::response::{self, ApiResult};
    use super::super::types::{ConsensusTipResponse, FormatParams};
    use super::ChainRef;

    pub(super) async fn network(cm: ChainRef) -> ApiResult {
        Ok(response::json(&cm.tip_state().network))
    }

    pub(super) async fn tip(format: FormatParams, cm: ChainRef) -> ApiResult {
        Ok(response::formatted(
            &format,
            &ConsensusTipResponse(cm.tip()),
        ))
    }

    pub(super) async fn tip_state(cm: ChainRef) -> ApiResult {
        Ok(response::json(&cm.tip_state()))
    }
}
