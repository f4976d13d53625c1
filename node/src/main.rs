mod api;
mod cli_args;
mod config;
mod errors;
mod prometheus;
mod syncer;

use std::sync::Arc;

use cli_args::RunCommand;
use config::Config;
use errors::Error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    match cli_args::parse_args() {
        Ok(RunCommand::Run(config)) => {
            if let Err(err) = run(config).await {
                eprintln!("{err}");
                std::process::exit(1);
            }
        }
        Ok(RunCommand::ShowConfig(config)) => show_config(config),
        Ok(RunCommand::Help) => help(),
        Err(msg) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
    }
}

async fn run(config: Config) -> Result<(), Error> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.data.log.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let network = match config.data.consensus.network.as_str() {
        "mainnet" => chain::Network::mainnet(),
        other => return Err(Error::UnknownNetwork(other.into())),
    };
    tracing::info!(network = %network.name, "starting node");

    // 1. The chain manager, indexed from its genesis block.
    let cm = Arc::new(chain::Manager::new(network.clone(), network.genesis())?);

    // 2. The wallet indexer over an in-memory store, following the tip.
    let wm = Arc::new(wallet::WalletManager::new(
        wallet::MemStore::new(),
        cm.clone(),
    )?);
    tokio::spawn(wm.clone().run());

    // 3. The gateway and the API server.
    let gateway: api::SyncerRef = Arc::new(syncer::Gateway::new(config.data.syncer.listen.clone()));
    api::launch(&config.data.api, cm, gateway, wm).await;
    Ok(())
}

fn show_config(config: Config) {
    let toml_string = toml::to_string_pretty(&config.data)
        .expect("the configuration round-trips through toml");
    println!("{toml_string}");
}

fn help() {
    eprintln!(
        r###"
## Running the node

    utxod run    [options]      # run the node
    utxod config [options]      # show current configuration
    utxod help                  # list command line options

## Launch options

    --config <path>           # path to the config file
                                (default is {})

## Config file with default settings:
{}
"###,
        config::DEFAULT_CONFIG_LOCATION,
        Config::description(),
    );
}
