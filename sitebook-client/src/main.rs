//! Sitebook command-line entry point.
//!
//! ```text
//! sitebook [--config <path>] dashboard
//! sitebook [--config <path>] members
//! sitebook [--config <path>] select-site <id|all>
//! sitebook [--config <path>] export <path>
//! ```

use serde::Serialize;
use sitebook_client::queries::{DashboardQuery, MembersQuery};
use sitebook_client::{
    telemetry, ClientConfig, ClientError, ClientResult, LogNotifier, Notifier, SiteClient,
};
use sitebook_core::SiteSelection;
use std::path::PathBuf;

const USAGE: &str = "sitebook [--config <path>] <dashboard | members | select-site <id|all> | export <path>>";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Dashboard,
    Members,
    SelectSite(String),
    Export(PathBuf),
}

fn parse_command(args: &[String]) -> Result<Command, ClientError> {
    let mut positional = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            iter.next();
            continue;
        }
        positional.push(arg.as_str());
    }
    match positional.as_slice() {
        ["dashboard"] => Ok(Command::Dashboard),
        ["members"] => Ok(Command::Members),
        ["select-site", site] => Ok(Command::SelectSite((*site).to_string())),
        ["export", path] => Ok(Command::Export(PathBuf::from(*path))),
        _ => Err(ClientError::Usage(USAGE.to_string())),
    }
}

fn print_json<T: Serialize>(value: &T) -> ClientResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| ClientError::Io(std::io::Error::other(e)))?;
    println!("{}", text);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), ClientError> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_command(&args)?;
    let config = ClientConfig::load()?;
    telemetry::init_tracing(&config)?;

    let client = SiteClient::new(config)?;
    let result = run(&client, command).await;

    for notification in client.notifications().drain() {
        LogNotifier.notify(notification);
    }
    result
}

async fn run(client: &SiteClient, command: Command) -> ClientResult<()> {
    match command {
        Command::Dashboard => {
            let state = client.queries().run(&DashboardQuery).await;
            match (state.data, state.error) {
                (_, Some(err)) => Err(err.into()),
                (Some(summary), None) => print_json(&summary),
                (None, None) => Ok(()),
            }
        }
        Command::Members => {
            let state = client.queries().run(&MembersQuery).await;
            match (state.data, state.error) {
                (_, Some(err)) => Err(err.into()),
                (Some(members), None) => print_json(&members),
                (None, None) => Ok(()),
            }
        }
        Command::SelectSite(raw) => {
            let selection = SiteSelection::parse(&raw)?;
            let changed = client.select_site(selection.clone())?;
            tracing::info!(selection = %selection, changed, "Site selected");
            println!("{}", selection);
            Ok(())
        }
        Command::Export(path) => {
            let export = client.services().export.database().await?;
            let target = if path.is_dir() {
                path.join(&export.filename)
            } else {
                path
            };
            tokio::fs::write(&target, &export.bytes).await?;
            println!("{}", target.display());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command(&args(&["dashboard"])).unwrap(), Command::Dashboard);
        assert_eq!(
            parse_command(&args(&["--config", "c.toml", "select-site", "all"])).unwrap(),
            Command::SelectSite("all".to_string())
        );
        assert_eq!(
            parse_command(&args(&["export", "/tmp/out.sql", "--config", "c.toml"])).unwrap(),
            Command::Export(PathBuf::from("/tmp/out.sql"))
        );
    }

    #[test]
    fn test_unknown_command_is_usage_error() {
        assert!(matches!(parse_command(&args(&["bogus"])), Err(ClientError::Usage(_))));
        assert!(matches!(parse_command(&args(&[])), Err(ClientError::Usage(_))));
        assert!(matches!(parse_command(&args(&["select-site"])), Err(ClientError::Usage(_))));
    }
}
