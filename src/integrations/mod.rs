//! Pluggable integrations and the contract the dispatcher consumes.
//!
//! An integration adapts one remote tracking service behind a fixed
//! command table. The registry is a compile-time list of known
//! integrations; each entry maps a name to a constructor taking that
//! integration's settings slice (which may be absent) and returning a
//! boxed [`Integration`].

pub mod github;
pub mod tracker;

use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use clap::ArgMatches;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::settings::{IntegrationSettings, SettingsError};

/// Declares the options a command expects, by configuring its parser.
pub type OptsFn = fn(clap::Command) -> clap::Command;

/// The future returned by a command invocation.
pub type CommandFuture<'a> = Pin<Box<dyn Future<Output = Result<(), CommandError>> + 'a>>;

/// Constructs an integration from its effective-settings slice.
pub type Constructor =
    fn(Option<IntegrationSettings>) -> Result<Box<dyn Integration>, SettingsError>;

/// Integration name to constructor, in stable (sorted) order.
pub type Registry = BTreeMap<&'static str, Constructor>;

/// What the dispatcher consumes from each integration.
pub trait Integration {
    /// Command names, in stable (sorted) order.
    fn commands(&self) -> Vec<String>;

    /// Option declaration for a command, if it takes arguments.
    fn opts(&self, command: &str) -> Option<OptsFn>;

    /// Invoke a previously validated command.
    fn run<'a>(&'a self, command: &'a str, opts: CommandOpts) -> CommandFuture<'a>;
}

/// The known integrations.
pub fn registry() -> Registry {
    BTreeMap::from([
        ("github", github::Github::construct as Constructor),
        ("tracker", tracker::Tracker::construct as Constructor),
    ])
}

/// Parsed options handed to a command. Commands without declared opts
/// receive an empty set.
#[derive(Debug, Default)]
pub struct CommandOpts(ArgMatches);

impl CommandOpts {
    pub fn new(matches: ArgMatches) -> Self {
        Self(matches)
    }

    // try_get_one so that looking up an option a command never declared
    // reads as absent instead of panicking.

    pub fn str(&self, name: &str) -> Option<&str> {
        self.0
            .try_get_one::<String>(name)
            .ok()
            .flatten()
            .map(String::as_str)
    }

    pub fn u64(&self, name: &str) -> Option<u64> {
        self.0.try_get_one::<u64>(name).ok().flatten().copied()
    }

    pub fn path(&self, name: &str) -> Option<&Path> {
        self.0
            .try_get_one::<PathBuf>(name)
            .ok()
            .flatten()
            .map(PathBuf::as_path)
    }

    pub fn require_str(&self, name: &'static str) -> Result<&str, CommandError> {
        self.str(name).ok_or(CommandError::MissingOption(name))
    }

    pub fn require_u64(&self, name: &'static str) -> Result<u64, CommandError> {
        self.u64(name).ok_or(CommandError::MissingOption(name))
    }

    pub fn require_path(&self, name: &'static str) -> Result<&Path, CommandError> {
        self.path(name).ok_or(CommandError::MissingOption(name))
    }
}

/// HTTP client errors, shared by both API clients.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: token required or invalid")]
    Unauthorized,

    #[error("server error: {0}")]
    Server(String),
}

/// Failures surfaced by command handlers. Policy is log and stop: each
/// command performs at most one logical operation, so there is nothing
/// to retry or roll back.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Api(#[from] ClientError),

    #[error("missing setting `{0}`; add it to a .spoor.json document")]
    MissingSetting(&'static str),

    #[error("missing option `{0}`")]
    MissingOption(&'static str),

    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    #[error("prompt failed: {0}")]
    Prompt(#[from] inquire::InquireError),

    #[error("unable to read {}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to run git: {0}")]
    Git(#[source] std::io::Error),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Decode a response body, converting HTTP error statuses to
/// [`ClientError`].
pub(crate) async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        Ok(response.json().await?)
    } else {
        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::NOT_FOUND => Err(ClientError::NotFound(body)),
            StatusCode::BAD_REQUEST => Err(ClientError::BadRequest(body)),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ClientError::Unauthorized),
            _ => Err(ClientError::Server(format!("{}: {}", status, body))),
        }
    }
}
