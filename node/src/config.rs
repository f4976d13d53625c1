use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::errors::Error;

/// Default config location
pub const DEFAULT_CONFIG_LOCATION: &str = "~/.utxod/config.toml";

#[derive(Clone, Debug)]
pub struct Config {
    /// Config data
    pub data: ConfigData,

    /// Config path
    pub path: PathBuf,
}

/// Configuration file for the node.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConfigData {
    /// API options
    #[serde(default)]
    pub api: Api,

    /// Syncer gateway options
    #[serde(default)]
    pub syncer: Syncer,

    /// Consensus network selection
    #[serde(default)]
    pub consensus: Consensus,

    /// Logging options
    #[serde(default)]
    pub log: Log,
}

/// API configuration options
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Api {
    /// Listening address for the API webserver.
    #[serde(default = "Api::default_listen_addr")]
    pub listen: SocketAddr,

    /// Disable the API by setting api.disabled=true. Default is false.
    #[serde(default)]
    pub disabled: bool,
}

impl Api {
    fn default_listen_addr() -> SocketAddr {
        "127.0.0.1:9980".parse().unwrap()
    }
}

impl Default for Api {
    fn default() -> Self {
        Api {
            listen: Api::default_listen_addr(),
            disabled: false,
        }
    }
}

/// Syncer gateway configuration options
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Syncer {
    /// Address the gateway reports to peers.
    #[serde(default = "Syncer::default_listen_addr")]
    pub listen: String,
}

impl Syncer {
    fn default_listen_addr() -> String {
        "0.0.0.0:9981".into()
    }
}

impl Default for Syncer {
    fn default() -> Self {
        Syncer {
            listen: Syncer::default_listen_addr(),
        }
    }
}

/// Consensus network configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Consensus {
    /// Network to join; currently only "mainnet".
    #[serde(default = "Consensus::default_network")]
    pub network: String,
}

impl Consensus {
    fn default_network() -> String {
        "mainnet".into()
    }
}

impl Default for Consensus {
    fn default() -> Self {
        Consensus {
            network: Consensus::default_network(),
        }
    }
}

/// Logging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Log {
    /// Filter directive for log output, e.g. "info" or "wallet=debug".
    #[serde(default = "Log::default_level")]
    pub level: String,
}

impl Log {
    fn default_level() -> String {
        "info".into()
    }
}

impl Default for Log {
    fn default() -> Self {
        Log {
            level: Log::default_level(),
        }
    }
}

impl Config {
    /// Returns a documentation for the config file.
    pub fn description() -> &'static str {
        r##"
    [api]
    listen = "127.0.0.1:9980"      # socket address for the webserver running the API
    disabled = false               # whether the API server should be disabled

    [syncer]
    listen = "0.0.0.0:9981"        # address the gateway reports to peers

    [consensus]
    network = "mainnet"            # network to join

    [log]
    level = "info"                 # log filter, e.g. "info" or "wallet=debug,info"
"##
    }

    /// Reads the config from the file
    pub fn load(path: Option<PathBuf>) -> Result<Config, Error> {
        let use_default = path.is_none();
        let path = path
            .map(expand_path)
            .unwrap_or_else(|| expand_path(PathBuf::from(DEFAULT_CONFIG_LOCATION)));

        if path.exists() {
            let string = fs::read_to_string(&path)?;
            let data = toml::from_str(&string).map_err(Error::ConfigError)?;
            Ok(Config { data, path })
        } else if use_default {
            Ok(Config {
                data: ConfigData::default(),
                path,
            })
        } else {
            Err(Error::ConfigNotFound(path))
        }
    }
}

/// Expands a leading `~` to the user's home directory.
fn expand_path(path: PathBuf) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = std::env::var_os("HOME") {
            return Path::new(&home).join(stripped);
        }
    }
    path
}
