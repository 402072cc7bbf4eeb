//! Australian states and territories used for regional stock and webhook routing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Australian state or territory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuState {
    Nsw,
    Vic,
    Qld,
    Sa,
    Wa,
    Tas,
    Nt,
    Act,
}

impl AuState {
    /// Short code, also the key of regional webhooks.
    pub fn code(&self) -> &'static str {
        match self {
            AuState::Nsw => "NSW",
            AuState::Vic => "VIC",
            AuState::Qld => "QLD",
            AuState::Sa => "SA",
            AuState::Wa => "WA",
            AuState::Tas => "TAS",
            AuState::Nt => "NT",
            AuState::Act => "ACT",
        }
    }

    /// Capital-city postcode used when querying availability.
    pub fn capital_postcode(&self) -> &'static str {
        match self {
            AuState::Nsw => "2000",
            AuState::Vic => "3000",
            AuState::Qld => "4000",
            AuState::Sa => "5000",
            AuState::Wa => "6000",
            AuState::Tas => "7000",
            AuState::Nt => "0800",
            AuState::Act => "2600",
        }
    }

    /// Capital city, used as a store search term.
    pub fn capital_city(&self) -> &'static str {
        match self {
            AuState::Nsw => "Sydney",
            AuState::Vic => "Melbourne",
            AuState::Qld => "Brisbane",
            AuState::Sa => "Adelaide",
            AuState::Wa => "Perth",
            AuState::Tas => "Hobart",
            AuState::Nt => "Darwin",
            AuState::Act => "Canberra",
        }
    }

    /// Maps a postcode to its state. ACT ranges sit inside the NSW block.
    pub fn from_postcode(postcode: &str) -> Option<AuState> {
        let code: u32 = postcode.trim().parse().ok()?;

        match code {
            200..=299 | 2600..=2910 => Some(AuState::Act),
            1000..=1999 | 2000..=2599 | 2911..=2999 => Some(AuState::Nsw),
            3000..=3999 | 8000..=8999 => Some(AuState::Vic),
            4000..=4999 | 9000..=9999 => Some(AuState::Qld),
            5000..=5999 => Some(AuState::Sa),
            6000..=6799 | 6900..=6999 => Some(AuState::Wa),
            7000..=7999 => Some(AuState::Tas),
            800..=999 => Some(AuState::Nt),
            _ => None,
        }
    }

    /// Returns all states and territories.
    pub fn all() -> &'static [AuState] {
        &[
            AuState::Nsw,
            AuState::Vic,
            AuState::Qld,
            AuState::Sa,
            AuState::Wa,
            AuState::Tas,
            AuState::Nt,
            AuState::Act,
        ]
    }
}

impl fmt::Display for AuState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for AuState {
    type Err = StateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "NSW" | "NEW SOUTH WALES" => Ok(AuState::Nsw),
            "VIC" | "VICTORIA" => Ok(AuState::Vic),
            "QLD" | "QUEENSLAND" => Ok(AuState::Qld),
            "SA" | "SOUTH AUSTRALIA" => Ok(AuState::Sa),
            "WA" | "WESTERN AUSTRALIA" => Ok(AuState::Wa),
            "TAS" | "TASMANIA" => Ok(AuState::Tas),
            "NT" | "NORTHERN TERRITORY" => Ok(AuState::Nt),
            "ACT" | "AUSTRALIAN CAPITAL TERRITORY" => Ok(AuState::Act),
            _ => Err(StateParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct StateParseError(String);

impl fmt::Display for StateParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown state '{}'. Valid states: NSW, VIC, QLD, SA, WA, TAS, NT, ACT", self.0)
    }
}

impl std::error::Error for StateParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_parsing() {
        assert_eq!(AuState::from_str("nsw").unwrap(), AuState::Nsw);
        assert_eq!(AuState::from_str("Victoria").unwrap(), AuState::Vic);
        assert_eq!(AuState::from_str(" qld ").unwrap(), AuState::Qld);
        assert_eq!(AuState::from_str("ACT").unwrap(), AuState::Act);
        assert!(AuState::from_str("XYZ").is_err());
    }

    #[test]
    fn test_postcode_mapping() {
        assert_eq!(AuState::from_postcode("2000"), Some(AuState::Nsw));
        assert_eq!(AuState::from_postcode("2600"), Some(AuState::Act));
        assert_eq!(AuState::from_postcode("2913"), Some(AuState::Nsw));
        assert_eq!(AuState::from_postcode("3000"), Some(AuState::Vic));
        assert_eq!(AuState::from_postcode("4217"), Some(AuState::Qld));
        assert_eq!(AuState::from_postcode("5000"), Some(AuState::Sa));
        assert_eq!(AuState::from_postcode("6000"), Some(AuState::Wa));
        assert_eq!(AuState::from_postcode("6850"), None);
        assert_eq!(AuState::from_postcode("7000"), Some(AuState::Tas));
        assert_eq!(AuState::from_postcode("0800"), Some(AuState::Nt));
        assert_eq!(AuState::from_postcode("abc"), None);
    }

    #[test]
    fn test_capital_postcodes_map_back() {
        for state in AuState::all() {
            assert_eq!(AuState::from_postcode(state.capital_postcode()), Some(*state));
        }
    }

    #[test]
    fn test_state_serde() {
        assert_eq!(serde_json::to_string(&AuState::Tas).unwrap(), "\"TAS\"");
        let parsed: AuState = serde_json::from_str("\"NT\"").unwrap();
        assert_eq!(parsed, AuState::Nt);
    }

    #[test]
    fn test_display() {
        assert_eq!(AuState::Wa.to_string(), "WA");
        assert_eq!(AuState::all().len(), 8);
    }
}
