//! Severity tiers shared by every detector.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity of a single finding or bug.
///
/// Ordering is meaningful: `Critical > Major > Minor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Minor,
    Major,
    Critical,
}

impl Severity {
    /// All tiers from most to least severe.
    pub const DESCENDING: [Severity; 3] = [Severity::Critical, Severity::Major, Severity::Minor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minor => "MINOR",
            Self::Major => "MAJOR",
            Self::Critical => "CRITICAL",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Minor => "ℹ️",
            Self::Major => "⚠️",
            Self::Critical => "❌",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate severity of a result set. `Pass` means no findings at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregateSeverity {
    #[default]
    Pass,
    Minor,
    Major,
    Critical,
}

impl AggregateSeverity {
    /// Maximum severity over a set of severities.
    pub fn of<I>(severities: I) -> Self
    where
        I: IntoIterator<Item = Severity>,
    {
        severities
            .into_iter()
            .map(Self::from)
            .max()
            .unwrap_or(Self::Pass)
    }

    pub fn is_critical(&self) -> bool {
        *self == Self::Critical
    }
}

impl From<Severity> for AggregateSeverity {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Minor => Self::Minor,
            Severity::Major => Self::Major,
            Severity::Critical => Self::Critical,
        }
    }
}

impl fmt::Display for AggregateSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pass => "PASS",
            Self::Minor => "MINOR",
            Self::Major => "MAJOR",
            Self::Critical => "CRITICAL",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Critical > Severity::Major);
        assert!(Severity::Major > Severity::Minor);
    }

    #[test]
    fn test_aggregate_empty_is_pass() {
        assert_eq!(AggregateSeverity::of(Vec::new()), AggregateSeverity::Pass);
    }

    #[test]
    fn test_aggregate_takes_maximum() {
        let agg = AggregateSeverity::of(vec![Severity::Minor, Severity::Critical, Severity::Major]);
        assert_eq!(agg, AggregateSeverity::Critical);
    }

    #[test]
    fn test_adding_critical_never_lowers_aggregate() {
        let sets = [
            vec![],
            vec![Severity::Minor],
            vec![Severity::Major, Severity::Minor],
            vec![Severity::Critical],
        ];
        for set in sets {
            let before = AggregateSeverity::of(set.clone());
            let mut with_critical = set;
            with_critical.push(Severity::Critical);
            let after = AggregateSeverity::of(with_critical);
            assert!(after >= before);
            assert_eq!(after, AggregateSeverity::Critical);
        }
    }

    #[test]
    fn test_severity_serializes_uppercase() {
        let json = serde_json::to_string(&Severity::Major).unwrap();
        assert_eq!(json, "\"MAJOR\"");
    }
}
