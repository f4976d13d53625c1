use std::path::PathBuf;
use thiserror::Error as ThisError;

/// All error types in the node implementation
#[derive(ThisError, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    IoError(std::io::Error),

    #[error("Configuration file does not exist: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Configuration error: {0}")]
    ConfigError(toml::de::Error),

    #[error("Unknown network: {0}")]
    UnknownNetwork(String),

    #[error("Chain error: {0}")]
    ChainError(chain::Error),

    #[error("Wallet error: {0}")]
    WalletError(wallet::Error),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<chain::Error> for Error {
    fn from(err: chain::Error) -> Self {
        Error::ChainError(err)
    }
}

impl From<wallet::Error> for Error {
    fn from(err: wallet::Error) -> Self {
        Error::WalletError(err)
    }
}
