use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        $(#[$meta])*
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
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(Gender {
    Male => "Male",
    Female => "Female",
    Other => "Other",
    Unknown => "Unknown",
});

impl Gender {
    /// Lenient mapping for LLM output ("M", "female", "F ", ...).
    pub fn from_loose(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Self::Male,
            "female" | "f" => Self::Female,
            "other" => Self::Other,
            _ => Self::Unknown,
        }
    }
}

str_enum!(
    #[serde(rename_all = "lowercase")]
    ReportStatus {
        Pending => "pending",
        Processing => "processing",
        Processed => "processed",
        Reviewed => "reviewed",
        Failed => "failed",
    }
);

str_enum!(TestStatus {
    Normal => "Normal",
    Abnormal => "Abnormal",
    Critical => "Critical",
    Unknown => "Unknown",
});

impl TestStatus {
    pub fn from_loose(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "normal" => Self::Normal,
            "abnormal" | "high" | "low" => Self::Abnormal,
            "critical" => Self::Critical,
            _ => Self::Unknown,
        }
    }
}

str_enum!(
    #[serde(rename_all = "lowercase")]
    ConsentStatus {
        Active => "active",
        Revoked => "revoked",
    }
);

str_enum!(
    #[serde(rename_all = "lowercase")]
    AssignmentStatus {
        Active => "active",
        Ended => "ended",
    }
);

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn report_status_round_trips_through_str() {
        for status in [
            ReportStatus::Pending,
            ReportStatus::Processing,
            ReportStatus::Processed,
            ReportStatus::Reviewed,
            ReportStatus::Failed,
        ] {
            assert_eq!(ReportStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn unknown_value_is_invalid_enum() {
        let err = ReportStatus::from_str("archived").unwrap_err();
        assert!(matches!(err, DatabaseError::InvalidEnum { .. }));
    }

    #[test]
    fn report_status_serializes_lowercase() {
        let json = serde_json::to_string(&ReportStatus::Processed).unwrap();
        assert_eq!(json, "\"processed\"");
    }

    #[test]
    fn gender_serializes_capitalized() {
        let json = serde_json::to_string(&Gender::Female).unwrap();
        assert_eq!(json, "\"Female\"");
    }

    #[test]
    fn loose_gender_mapping() {
        assert_eq!(Gender::from_loose(" male "), Gender::Male);
        assert_eq!(Gender::from_loose("F"), Gender::Female);
        assert_eq!(Gender::from_loose("n/a"), Gender::Unknown);
    }

    #[test]
    fn loose_test_status_mapping() {
        assert_eq!(TestStatus::from_loose("HIGH"), TestStatus::Abnormal);
        assert_eq!(TestStatus::from_loose("critical"), TestStatus::Critical);
        assert_eq!(TestStatus::from_loose(""), TestStatus::Unknown);
    }
}
