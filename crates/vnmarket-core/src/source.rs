use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Closed set of data providers the registry knows how to build.
///
/// Source identifiers are matched case-insensitively, so `"SSI"`, `"ssi"` and
/// `" Ssi "` all resolve to [`ProviderId::Ssi`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    /// SSI Securities: FiinTrade market/fundamental/core services plus iBoard.
    Ssi,
    /// VNDIRECT public finfo API.
    Vnd,
}

impl ProviderId {
    pub const ALL: [Self; 2] = [Self::Ssi, Self::Vnd];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ssi => "ssi",
            Self::Vnd => "vnd",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ssi" => Ok(Self::Ssi),
            "vnd" | "vndirect" => Ok(Self::Vnd),
            other => Err(ValidationError::InvalidSource {
                value: other.to_owned(),
            }),
        }
    }
}
