//! Data store configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{DataStoreError, Result};

/// How table and column names are treated before being spliced into SQL.
///
/// Values are always bound as parameters. Identifiers cannot be, so under
/// `Raw` a caller controlling a table or column name controls the SQL text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierPolicy {
    /// Interpolate identifiers verbatim.
    #[default]
    Raw,
    /// Accept only `[A-Za-z_][A-Za-z0-9_]*`.
    Strict,
}

impl IdentifierPolicy {
    /// Validate `ident` under this policy.
    pub fn check(self, ident: &str) -> Result<()> {
        match self {
            Self::Raw => Ok(()),
            Self::Strict if is_plain_identifier(ident) => Ok(()),
            Self::Strict => Err(DataStoreError::InvalidIdentifier(ident.to_string())),
        }
    }
}

fn is_plain_identifier(ident: &str) -> bool {
    let mut chars = ident.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Data store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataStoreConfig {
    /// Path to the SQLite database file
    pub path: PathBuf,
    /// Create the file when it does not exist yet
    #[serde(default = "default_create_if_missing")]
    pub create_if_missing: bool,
    #[serde(default)]
    pub identifier_policy: IdentifierPolicy,
}

fn default_create_if_missing() -> bool {
    true
}

impl DataStoreConfig {
    /// Create a new config for the database file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            create_if_missing: default_create_if_missing(),
            identifier_policy: IdentifierPolicy::default(),
        }
    }

    pub fn with_create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    pub fn with_identifier_policy(mut self, policy: IdentifierPolicy) -> Self {
        self.identifier_policy = policy;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
