use thiserror::Error;

/// An error surfaced by a store implementation. The indexing code wraps
/// these with context as they cross the applier/reverter boundary.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct StoreError(pub String);

impl StoreError {
    pub fn new(msg: impl Into<String>) -> StoreError {
        StoreError(msg.into())
    }
}

/// All error kinds produced by wallet operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("wallet not found")]
    NotFound,

    #[error("output is already reserved")]
    Conflict,

    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("change address must be specified")]
    ChangeAddressRequired,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("chain error: {0}")]
    Chain(#[from] chain::Error),

    #[error("store error: {0}")]
    Store(String),
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Error::Store(err.0)
    }
}
