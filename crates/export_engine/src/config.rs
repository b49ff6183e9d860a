use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::client::PollSettings;
use crate::fetch::FetchSettings;

pub const DEFAULT_API_BASE: &str = "https://www.notion.so/api/v3/";
pub const DEFAULT_WORKING_DIR: &str = "workspace";
pub const DEFAULT_ARCHIVE_NAME: &str = "export.zip";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Markdown,
    Html,
}

impl ExportFormat {
    /// Value sent as `exportType`.
    pub fn as_str(self) -> &'static str {
        match self {
            ExportFormat::Markdown => "markdown",
            ExportFormat::Html => "html",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            "html" => Ok(ExportFormat::Html),
            other => Err(format!("unknown export format {other:?} (expected markdown or html)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub format: ExportFormat,
    pub locale: String,
    pub time_zone: String,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::Markdown,
            locale: "en".to_string(),
            time_zone: "Europe/Berlin".to_string(),
        }
    }
}

/// Session credential and identities sent with every task API request.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Credentials {
    pub token: String,
    pub space_id: String,
    pub user_id: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("space_id", &self.space_id)
            .field("user_id", &self.user_id)
            .finish()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required settings: {}", .missing.join(", "))]
    MissingCredentials { missing: Vec<&'static str> },
    #[error("api base url {0} cannot be used as a base for endpoints")]
    InvalidApiBase(String),
}

#[derive(Debug, Clone)]
pub struct ExportConfig {
    pub api_base: Url,
    pub credentials: Credentials,
    pub options: ExportOptions,
    pub poll: PollSettings,
    pub fetch: FetchSettings,
    /// Owned by the run: deleted and recreated at start.
    pub working_dir: PathBuf,
    pub archive_name: String,
}

impl ExportConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            api_base: Url::parse(DEFAULT_API_BASE).expect("default api base is a valid url"),
            credentials,
            options: ExportOptions::default(),
            poll: PollSettings::default(),
            fetch: FetchSettings::default(),
            working_dir: PathBuf::from(DEFAULT_WORKING_DIR),
            archive_name: DEFAULT_ARCHIVE_NAME.to_string(),
        }
    }

    /// Fails fast on absent credentials, before any network traffic.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if self.credentials.token.trim().is_empty() {
            missing.push("token");
        }
        if self.credentials.space_id.trim().is_empty() {
            missing.push("space id");
        }
        if self.credentials.user_id.trim().is_empty() {
            missing.push("user id");
        }
        if !missing.is_empty() {
            return Err(ConfigError::MissingCredentials { missing });
        }
        if self.api_base.cannot_be_a_base() {
            return Err(ConfigError::InvalidApiBase(self.api_base.to_string()));
        }
        Ok(())
    }

    pub fn archive_path(&self) -> PathBuf {
        self.working_dir.join(&self.archive_name)
    }

    pub fn export_root(&self) -> PathBuf {
        self.working_dir.join(export_core::EXPORT_ROOT_NAME)
    }
}
