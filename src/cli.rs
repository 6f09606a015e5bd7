//! Command dispatch.
//!
//! A run validates the integration name against the registry, loads and
//! merges the settings documents, constructs the integration, validates
//! the command name against its command table, parses any declared
//! options, and invokes the command. Nothing executes past a failed
//! gate.

use std::process::ExitCode;

use clap::Parser;
use thiserror::Error;

use crate::integrations::{self, CommandError, CommandOpts, Registry};
use crate::settings::{SettingsError, Store};

const USAGE: &str = "Usage: spoor <integration> <command> [options...]";

#[derive(Parser)]
#[command(name = "spoor")]
#[command(about = "Command-line client for GitHub issues and Pivotal Tracker stories")]
struct Cli {
    /// Integration to run a command against
    integration: Option<String>,

    /// Command to run
    command: Option<String>,

    /// Command-specific options
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    rest: Vec<String>,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Command(#[from] CommandError),
}

/// How a dispatch ended. Anything but `Ran` means no command executed.
#[derive(Debug, PartialEq)]
pub enum Outcome {
    Ran,
    InvalidIntegration {
        given: Option<String>,
        valid: Vec<String>,
    },
    InvalidCommand {
        given: Option<String>,
        valid: Vec<String>,
    },
    BadOptions,
}

/// Binary entry point: parse the process arguments, dispatch, and map the
/// outcome onto an exit code.
pub async fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let registry = integrations::registry();
    let store = Store::from_env()?;

    let outcome = dispatch(
        &registry,
        &store,
        cli.integration.as_deref(),
        cli.command.as_deref(),
        &cli.rest,
    )
    .await?;

    Ok(match outcome {
        Outcome::Ran => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

/// Run one invocation against an explicit registry and settings store.
pub async fn dispatch(
    registry: &Registry,
    store: &Store,
    integration: Option<&str>,
    command: Option<&str>,
    rest: &[String],
) -> Result<Outcome, DispatchError> {
    // Gate one: the integration name. No settings are read and no
    // constructor runs until it passes.
    let valid_integrations: Vec<String> = registry.keys().map(|name| name.to_string()).collect();
    let Some(integration) = integration.filter(|name| registry.contains_key(name)) else {
        print_invalid("integration", integration, &valid_integrations);
        return Ok(Outcome::InvalidIntegration {
            given: integration.map(String::from),
            valid: valid_integrations,
        });
    };

    let mut effective = store.effective()?;
    let slice = effective.remove(integration);
    let constructor = registry[integration];
    let instance = constructor(slice)?;

    // Gate two: the command name, against the instance's command table.
    let valid_commands = instance.commands();
    let Some(command) = command.filter(|name| valid_commands.iter().any(|c| c == name)) else {
        print_invalid("command", command, &valid_commands);
        return Ok(Outcome::InvalidCommand {
            given: command.map(String::from),
            valid: valid_commands,
        });
    };

    let opts = match instance.opts(command) {
        Some(declare) => {
            let parser = declare(clap::Command::new(command.to_string()).no_binary_name(true));
            match parser.try_get_matches_from(rest) {
                Ok(matches) => CommandOpts::new(matches),
                Err(err) => {
                    err.print().ok();
                    return Ok(Outcome::BadOptions);
                }
            }
        }
        None => CommandOpts::default(),
    };

    instance.run(command, opts).await?;
    Ok(Outcome::Ran)
}

fn print_invalid(what: &str, given: Option<&str>, valid: &[String]) {
    println!("{}\n", USAGE);
    match given {
        Some(name) => println!("Invalid {} {}\n", what, name),
        None => println!("Missing {}\n", what),
    }
    println!("Valid {}s are: {}", what, valid.join(", "));
}
