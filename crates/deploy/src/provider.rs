//! External providers liftoff talks to.

use serde::{Deserialize, Serialize};

/// One of the two external services a user connects.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Provider {
    /// The source-control host (GitHub).
    SourceControl,
    /// The deployment host (Vercel).
    Hosting,
}

impl Provider {
    /// Default host name of the provider.
    pub fn default_host(&self) -> &'static str {
        match self {
            Provider::SourceControl => "github.com",
            Provider::Hosting => "vercel.com",
        }
    }

    /// Human-facing product name, used in log and error messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            Provider::SourceControl => "GitHub",
            Provider::Hosting => "Vercel",
        }
    }

    /// Whether credentials for this provider are paired with a locally entered identity.
    pub fn requires_identity(&self) -> bool {
        matches!(self, Provider::SourceControl)
    }
}
