use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    Install,
    Update,
}

impl std::fmt::Display for PromptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Install => f.write_str("install"),
            Self::Update => f.write_str("update"),
        }
    }
}

impl std::str::FromStr for PromptKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "install" => Ok(Self::Install),
            "update" => Ok(Self::Update),
            other => Err(format!("unknown prompt kind '{other}'; expected install|update")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DismissalMode {
    Later,
    Permanent,
}

impl std::str::FromStr for DismissalMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "later" => Ok(Self::Later),
            "permanent" => Ok(Self::Permanent),
            other => Err(format!("unknown dismissal mode '{other}'; expected later|permanent")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DismissalRecord {
    pub mode: DismissalMode,
    pub timestamp: Option<OffsetDateTime>,
}
