//! Dispatcher integration tests.
//!
//! A synthetic registry stands in for the real integrations so the two
//! validation gates can be observed: constructors that must not run,
//! handlers that must not be called, and option values that must arrive
//! typed.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use clap::{value_parser, Arg};
use tempfile::TempDir;

use spoor::cli::{dispatch, DispatchError, Outcome};
use spoor::integrations::{
    CommandError, CommandFuture, CommandOpts, Constructor, Integration, OptsFn, Registry,
};
use spoor::settings::{IntegrationSettings, SettingsError, Store};

static FOO_CALLS: AtomicUsize = AtomicUsize::new(0);
static ANSWER_VALUE: AtomicU64 = AtomicU64::new(0);

struct TestIntegration;

impl Integration for TestIntegration {
    fn commands(&self) -> Vec<String> {
        vec!["answer".to_string(), "foo".to_string()]
    }

    fn opts(&self, command: &str) -> Option<OptsFn> {
        match command {
            "answer" => Some(answer_opts),
            _ => None,
        }
    }

    fn run<'a>(&'a self, command: &'a str, opts: CommandOpts) -> CommandFuture<'a> {
        Box::pin(async move {
            match command {
                "foo" => {
                    FOO_CALLS.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
                "answer" => {
                    ANSWER_VALUE.store(opts.require_u64("value")?, Ordering::SeqCst);
                    Ok(())
                }
                other => Err(CommandError::UnknownCommand(other.to_string())),
            }
        })
    }
}

fn answer_opts(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        Arg::new("value")
            .required(true)
            .value_parser(value_parser!(u64)),
    )
}

fn plain_ctor(
    _settings: Option<IntegrationSettings>,
) -> Result<Box<dyn Integration>, SettingsError> {
    Ok(Box::new(TestIntegration))
}

fn panicking_ctor(
    _settings: Option<IntegrationSettings>,
) -> Result<Box<dyn Integration>, SettingsError> {
    panic!("constructor must not run for an invalid integration");
}

/// An integration whose handlers must never run.
struct NeverRun;

impl Integration for NeverRun {
    fn commands(&self) -> Vec<String> {
        vec!["foo".to_string()]
    }

    fn opts(&self, _command: &str) -> Option<OptsFn> {
        None
    }

    fn run<'a>(&'a self, _command: &'a str, _opts: CommandOpts) -> CommandFuture<'a> {
        panic!("no command may run after a failed validation gate");
    }
}

fn never_run_ctor(
    _settings: Option<IntegrationSettings>,
) -> Result<Box<dyn Integration>, SettingsError> {
    Ok(Box::new(NeverRun))
}

fn registry_of(entries: &[(&'static str, Constructor)]) -> Registry {
    entries.iter().copied().collect::<BTreeMap<_, _>>()
}

fn empty_store(dir: &TempDir) -> Store {
    Store::new(
        dir.path().join("project.spoor.json"),
        dir.path().join("user.spoor.json"),
    )
}

#[tokio::test]
async fn unknown_integration_constructs_nothing_and_lists_valid_names() {
    let dir = TempDir::new().unwrap();
    let registry = registry_of(&[("alpha", panicking_ctor), ("beta", panicking_ctor)]);

    let outcome = dispatch(&registry, &empty_store(&dir), Some("gamma"), Some("foo"), &[])
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Outcome::InvalidIntegration {
            given: Some("gamma".to_string()),
            valid: vec!["alpha".to_string(), "beta".to_string()],
        }
    );
}

#[tokio::test]
async fn missing_integration_is_a_validation_failure() {
    let dir = TempDir::new().unwrap();
    let registry = registry_of(&[("alpha", panicking_ctor)]);

    let outcome = dispatch(&registry, &empty_store(&dir), None, None, &[])
        .await
        .unwrap();

    assert!(matches!(outcome, Outcome::InvalidIntegration { given: None, .. }));
}

#[tokio::test]
async fn unknown_command_never_reaches_a_handler() {
    let dir = TempDir::new().unwrap();
    let registry = registry_of(&[("alpha", never_run_ctor)]);

    let outcome = dispatch(&registry, &empty_store(&dir), Some("alpha"), Some("bar"), &[])
        .await
        .unwrap();

    assert_eq!(
        outcome,
        Outcome::InvalidCommand {
            given: Some("bar".to_string()),
            valid: vec!["foo".to_string()],
        }
    );
}

#[tokio::test]
async fn valid_command_runs_to_completion() {
    let dir = TempDir::new().unwrap();
    let registry = registry_of(&[("alpha", plain_ctor)]);

    let before = FOO_CALLS.load(Ordering::SeqCst);
    let outcome = dispatch(&registry, &empty_store(&dir), Some("alpha"), Some("foo"), &[])
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Ran);
    assert_eq!(FOO_CALLS.load(Ordering::SeqCst), before + 1);
}

#[tokio::test]
async fn declared_numeric_positional_arrives_typed() {
    let dir = TempDir::new().unwrap();
    let registry = registry_of(&[("alpha", plain_ctor)]);

    let outcome = dispatch(
        &registry,
        &empty_store(&dir),
        Some("alpha"),
        Some("answer"),
        &["42".to_string()],
    )
    .await
    .unwrap();

    assert_eq!(outcome, Outcome::Ran);
    assert_eq!(ANSWER_VALUE.load(Ordering::SeqCst), 42);
}

#[tokio::test]
async fn unparseable_options_stop_before_the_handler() {
    let dir = TempDir::new().unwrap();
    let registry = registry_of(&[("alpha", plain_ctor)]);

    let outcome = dispatch(
        &registry,
        &empty_store(&dir),
        Some("alpha"),
        Some("answer"),
        &["not-a-number".to_string()],
    )
    .await
    .unwrap();

    assert_eq!(outcome, Outcome::BadOptions);
}

#[tokio::test]
async fn malformed_settings_abort_before_dispatching() {
    let dir = TempDir::new().unwrap();
    let project_path = dir.path().join("project.spoor.json");
    std::fs::write(&project_path, "{ not json").unwrap();
    let store = Store::new(project_path, dir.path().join("user.spoor.json"));
    let registry = registry_of(&[("alpha", never_run_ctor)]);

    let err = dispatch(&registry, &store, Some("alpha"), Some("foo"), &[])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DispatchError::Settings(SettingsError::Malformed { .. })
    ));
}
