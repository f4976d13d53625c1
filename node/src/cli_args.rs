use std::path::PathBuf;

use crate::config::Config;
use crate::errors::Error;

/// What the binary was asked to do.
pub enum RunCommand {
    Run(Config),
    ShowConfig(Config),
    Help,
}

/// Parses the process arguments. Commands: `run` (default), `config`,
/// `help`; the only option is `--config <path>`.
pub fn parse_args() -> Result<RunCommand, String> {
    let mut args = std::env::args().skip(1);
    let mut command: Option<String> = None;
    let mut config_path: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => match args.next() {
                Some(path) => config_path = Some(PathBuf::from(path)),
                None => return Err("--config requires a path".into()),
            },
            "help" | "--help" | "-h" => return Ok(RunCommand::Help),
            other if command.is_none() && !other.starts_with('-') => {
                command = Some(other.to_string());
            }
            other => return Err(format!("unrecognized argument: {other}")),
        }
    }

    let load = |path: Option<PathBuf>| {
        Config::load(path).map_err(|err| match err {
            Error::ConfigNotFound(path) => {
                format!("configuration file not found: {}", path.display())
            }
            err => format!("failed to load configuration: {err}"),
        })
    };

    match command.as_deref() {
        None | Some("run") => Ok(RunCommand::Run(load(config_path)?)),
        Some("config") => Ok(RunCommand::ShowConfig(load(config_path)?)),
        Some(other) => Err(format!("unrecognized command: {other}")),
    }
}
