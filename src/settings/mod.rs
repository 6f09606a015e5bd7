//! Settings documents: reading, writing, and merging.
//!
//! Two JSON documents configure a run. The project document
//! (`./.spoor.json`) is checked into a repository and shared; the user
//! document (`$HOME/.spoor.json`) is private and holds secrets such as
//! auth tokens. Top-level keys are integration names; the values are
//! opaque objects interpreted by the matching integration.
//!
//! Read policy: a missing file yields an empty document, malformed JSON
//! is fatal. The two situations produce distinct diagnostics.

mod merge;

pub use merge::merge;

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

/// Fixed filename for both the project and user documents.
pub const SETTINGS_FILE: &str = ".spoor.json";

/// One integration's slice of a settings document.
pub type IntegrationSettings = serde_json::Map<String, Value>;

/// A whole settings document, keyed by integration name. `BTreeMap` keeps
/// iteration order stable for listings.
pub type SettingsDoc = BTreeMap<String, IntegrationSettings>;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("malformed JSON in {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unable to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("unable to encode settings: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("could not determine home directory")]
    NoHome,

    #[error("{integration} setting `{field}` has the wrong type (expected {expected})")]
    WrongType {
        integration: &'static str,
        field: &'static str,
        expected: &'static str,
    },
}

/// Resolved locations of the two settings documents.
#[derive(Debug, Clone)]
pub struct Store {
    project_path: PathBuf,
    user_path: PathBuf,
}

impl Store {
    /// Project document in the current working directory, user document in
    /// the home directory.
    pub fn from_env() -> Result<Self, SettingsError> {
        let home = dirs::home_dir().ok_or(SettingsError::NoHome)?;
        Ok(Self::new(PathBuf::from(SETTINGS_FILE), home.join(SETTINGS_FILE)))
    }

    /// Explicit paths, used by tests.
    pub fn new(project_path: PathBuf, user_path: PathBuf) -> Self {
        Self {
            project_path,
            user_path,
        }
    }

    pub fn project(&self) -> Result<SettingsDoc, SettingsError> {
        read_doc(&self.project_path)
    }

    pub fn user(&self) -> Result<SettingsDoc, SettingsError> {
        read_doc(&self.user_path)
    }

    /// The per-invocation effective settings: user overlaid onto project.
    pub fn effective(&self) -> Result<SettingsDoc, SettingsError> {
        Ok(merge(self.project()?, self.user()?))
    }

    /// Fold `fields` into the named integration's slice of the user
    /// document and write it back. Unrelated top-level keys are preserved.
    pub fn write_user_slice(
        &self,
        integration: &str,
        fields: IntegrationSettings,
    ) -> Result<(), SettingsError> {
        write_slice(&self.user_path, integration, fields)
    }

    /// Same as [`Store::write_user_slice`], against the project document.
    pub fn write_project_slice(
        &self,
        integration: &str,
        fields: IntegrationSettings,
    ) -> Result<(), SettingsError> {
        write_slice(&self.project_path, integration, fields)
    }
}

fn read_doc(path: &Path) -> Result<SettingsDoc, SettingsError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "settings file not found, using empty document");
            return Ok(SettingsDoc::new());
        }
        Err(source) => {
            return Err(SettingsError::Io {
                path: path.to_owned(),
                source,
            })
        }
    };

    serde_json::from_str(&text).map_err(|source| SettingsError::Malformed {
        path: path.to_owned(),
        source,
    })
}

fn write_slice(
    path: &Path,
    integration: &str,
    fields: IntegrationSettings,
) -> Result<(), SettingsError> {
    let mut doc = read_doc(path)?;
    doc.entry(integration.to_string()).or_default().extend(fields);

    let text = serde_json::to_string_pretty(&doc).map_err(SettingsError::Encode)?;
    fs::write(path, text).map_err(|source| SettingsError::Write {
        path: path.to_owned(),
        source,
    })
}

/// Read an optional string field from an integration's settings slice.
pub fn string_field(
    slice: Option<&IntegrationSettings>,
    integration: &'static str,
    field: &'static str,
) -> Result<Option<String>, SettingsError> {
    match slice.and_then(|fields| fields.get(field)) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(SettingsError::WrongType {
            integration,
            field,
            expected: "string",
        }),
    }
}

/// Read an optional unsigned-integer field from an integration's settings
/// slice.
pub fn u64_field(
    slice: Option<&IntegrationSettings>,
    integration: &'static str,
    field: &'static str,
) -> Result<Option<u64>, SettingsError> {
    match slice.and_then(|fields| fields.get(field)) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(value)) => value.as_u64().map(Some).ok_or(SettingsError::WrongType {
            integration,
            field,
            expected: "unsigned integer",
        }),
        Some(_) => Err(SettingsError::WrongType {
            integration,
            field,
            expected: "unsigned integer",
        }),
    }
}
