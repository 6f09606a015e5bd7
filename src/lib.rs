//! spoor: a command-line client for remote issue and story trackers.
//!
//! A single invocation is `spoor <integration> <command> [options...]`.
//! The [`cli`] module validates the integration and command names and
//! dispatches to one of the pluggable [`integrations`] (GitHub, Pivotal
//! Tracker), each of which wraps a remote REST API behind a fixed command
//! table. Configuration comes from two JSON documents merged per
//! invocation by the [`settings`] module: a project-scoped `.spoor.json`
//! in the working directory and a user-scoped one in the home directory
//! holding secrets such as auth tokens.

pub mod cli;
pub mod integrations;
pub mod models;
pub mod prompt;
pub mod render;
pub mod settings;
