use serde::{Deserialize, Serialize};
use std::fmt;

/// Symbolic locality code used to pick a read target.
///
/// EU is co-located with the master and has no replica of its own; every
/// other region maps to a fixed replica slot. Unknown input falls back to
/// EU, mirroring the classifier default for private or unroutable clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    #[default]
    Eu,
    Us,
    Asia,
    Sa,
    Africa,
}

impl Region {
    pub const ALL: [Region; 5] = [
        Region::Eu,
        Region::Us,
        Region::Asia,
        Region::Sa,
        Region::Africa,
    ];

    /// Parse a region code. Unrecognized codes resolve to EU (the master's
    /// region), never to an error.
    pub fn parse(code: &str) -> Region {
        match code.trim().to_ascii_lowercase().as_str() {
            "us" => Region::Us,
            "asia" => Region::Asia,
            "sa" => Region::Sa,
            "africa" => Region::Africa,
            _ => Region::Eu,
        }
    }

    /// Static region -> replica slot mapping. `None` means "read from the
    /// master directly".
    pub fn replica_index(self) -> Option<usize> {
        match self {
            Region::Us => Some(0),
            Region::Asia => Some(1),
            Region::Sa => Some(2),
            Region::Africa => Some(3),
            Region::Eu => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Region::Eu => "eu",
            Region::Us => "us",
            Region::Asia => "asia",
            Region::Sa => "sa",
            Region::Africa => "africa",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
