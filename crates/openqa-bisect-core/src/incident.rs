use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A single maintenance update or repository revision under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Incident(u64);

/// Ordered, de-duplicated incident collection.
pub type IncidentSet = BTreeSet<Incident>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid incident token '{token}'")]
pub struct IncidentParseError {
    pub token: String,
}

impl Incident {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Incident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Incident {
    type Err = IncidentParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let token = raw.trim();
        if token.is_empty() || !token.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(IncidentParseError {
                token: token.to_string(),
            });
        }
        token.parse::<u64>().map(Self).map_err(|_| IncidentParseError {
            token: token.to_string(),
        })
    }
}

/// Parse a comma-separated incident list, failing on the first bad token.
///
/// Blank entries (`"1,,2"`, trailing commas) are dropped rather than rejected.
pub fn parse_incident_list(raw: &str) -> Result<IncidentSet, IncidentParseError> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(Incident::from_str)
        .collect()
}

/// Parse a comma-separated incident list, skipping tokens that are not incidents.
pub fn parse_incident_list_lossy(raw: &str) -> IncidentSet {
    raw.split(',')
        .filter_map(|token| token.parse::<Incident>().ok())
        .collect()
}

/// Render incidents as the comma-joined value the platform expects.
pub fn join_incidents<'a>(incidents: impl IntoIterator<Item = &'a Incident>) -> String {
    incidents
        .into_iter()
        .map(Incident::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
