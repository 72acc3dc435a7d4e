use serde::{Deserialize, Serialize};

use crate::store::StoreError;

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = StoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(StoreError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(Channel {
    App => "app",
    Sms => "sms",
    Ussd => "ussd",
    Voice => "voice",
});

str_enum!(EncounterStatus {
    Created => "created",
    InProgress => "in_progress",
    Triaged => "triaged",
    Referred => "referred",
});

str_enum!(Sex {
    Female => "female",
    Male => "male",
    Other => "other",
    Unknown => "unknown",
});

impl EncounterStatus {
    /// Only pre-triage encounters may enter the decision engine.
    pub fn is_triage_eligible(&self) -> bool {
        matches!(self, Self::Created | Self::InProgress)
    }
}

/// Ordinal severity classification. Derived ordering is the clinical
/// ordering: GREEN (routine) < YELLOW (urgent) < RED (emergency).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskTier {
    Green,
    Yellow,
    Red,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Green => "GREEN",
            Self::Yellow => "YELLOW",
            Self::Red => "RED",
        }
    }
}

impl std::str::FromStr for RiskTier {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GREEN" => Ok(Self::Green),
            "YELLOW" => Ok(Self::Yellow),
            "RED" => Ok(Self::Red),
            _ => Err(StoreError::InvalidEnum {
                field: "RiskTier".into(),
                value: s.into(),
            }),
        }
    }
}

/// Confidence qualifier attached to an assessment. Ordered LOW < MEDIUM < HIGH
/// so an override can raise it with `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Uncertainty {
    Low,
    Medium,
    High,
}

impl Uncertainty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl std::str::FromStr for Uncertainty {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOW" => Ok(Self::Low),
            "MEDIUM" => Ok(Self::Medium),
            "HIGH" => Ok(Self::High),
            _ => Err(StoreError::InvalidEnum {
                field: "Uncertainty".into(),
                value: s.into(),
            }),
        }
    }
}
