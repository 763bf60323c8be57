use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Accepted values for a threat's `impacts` list
pub const IMPACT_CATEGORIES: &[&str] = &["Confidentiality", "Integrity", "Availability"];

/// Accepted values for a threat's `stride` list
pub const STRIDE_CATEGORIES: &[&str] = &[
    "Spoofing",
    "Tampering",
    "Repudiation",
    "Info Disclosure",
    "Denial Of Service",
    "Elevation Of Privilege",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum InitiativeSize {
    #[default]
    Undefined,
    Small,
    Medium,
    Large,
}

impl InitiativeSize {
    pub const ALL: [InitiativeSize; 4] = [Self::Undefined, Self::Small, Self::Medium, Self::Large];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Undefined => "Undefined",
            Self::Small => "Small",
            Self::Medium => "Medium",
            Self::Large => "Large",
        }
    }
}

impl fmt::Display for InitiativeSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InitiativeSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|size| size.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "invalid initiative_size {:?}, expected one of Undefined, Small, Medium, Large",
                    s
                )
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UptimeDependency {
    #[default]
    None,
    Degraded,
    Hard,
    Operational,
}

impl UptimeDependency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Degraded => "degraded",
            Self::Hard => "hard",
            Self::Operational => "operational",
        }
    }
}

impl FromStr for UptimeDependency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "degraded" => Ok(Self::Degraded),
            "hard" => Ok(Self::Hard),
            "operational" => Ok(Self::Operational),
            other => Err(format!(
                "invalid uptime_dependency {:?}, expected one of none, degraded, hard, operational",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initiative_size_parse() {
        assert_eq!("Small".parse::<InitiativeSize>(), Ok(InitiativeSize::Small));
        assert!("small".parse::<InitiativeSize>().is_err());
        assert_eq!(InitiativeSize::Large.to_string(), "Large");
    }

    #[test]
    fn test_uptime_dependency_parse() {
        assert_eq!("hard".parse::<UptimeDependency>(), Ok(UptimeDependency::Hard));
        assert!("Hard".parse::<UptimeDependency>().is_err());
    }
}
