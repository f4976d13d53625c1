use serde::Serialize;
use warp::http::{header, StatusCode};
use warp::reply::Response;
use warp::Reply;

use crate::prometheus::{self, ToMetrics};

use super::types::FormatParams;

/// Handler outcome: a ready response or a mapped error.
pub type ApiResult = Result<Response, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    Conflict(String),
    BadRequest(String),
    Internal(String),
}

impl ApiError {
    fn parts(self) -> (StatusCode, String) {
        match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        }
    }
}

impl From<wallet::Error> for ApiError {
    fn from(err: wallet::Error) -> Self {
        match err {
            wallet::Error::NotFound => ApiError::NotFound(err.to_string()),
            wallet::Error::Conflict => ApiError::Conflict(err.to_string()),
            wallet::Error::InsufficientBalance
            | wallet::Error::ChangeAddressRequired
            | wallet::Error::InvalidInput(_)
            | wallet::Error::Chain(_) => ApiError::BadRequest(err.to_string()),
            wallet::Error::Store(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<chain::Error> for ApiError {
    fn from(err: chain::Error) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

/// Converts a handler outcome into the wire response; server errors are
/// logged with the request already consumed.
pub fn respond(result: ApiResult) -> Response {
    match result {
        Ok(resp) => resp,
        Err(err) => {
            let (status, message) = err.parts();
            if status.is_server_error() {
                tracing::error!(%message, "request failed");
            }
            let mut resp = Response::new(message.into());
            *resp.status_mut() = status;
            resp
        }
    }
}

pub fn json<T: Serialize>(value: &T) -> Response {
    warp::reply::json(value).into_response()
}

/// Renders JSON, or Prometheus text when the request asked for it and the
/// response type supports it.
pub fn formatted<T: Serialize + ToMetrics>(format: &FormatParams, value: &T) -> Response {
    if format.prometheus() {
        let body = prometheus::encode(&value.to_metrics());
        warp::http::Response::builder()
            .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
            .body(body.into())
            .expect("static response parts are valid")
    } else {
        json(value)
    }
}

pub fn empty() -> Response {
    StatusCode::OK.into_response()
}
