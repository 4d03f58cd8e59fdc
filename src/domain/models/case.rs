//! Case records and categories.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Legal matter category; selects the opening script for the presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseCategory {
    Penal,
    Laboral,
}

impl CaseCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseCategory::Penal => "penal",
            CaseCategory::Laboral => "laboral",
        }
    }

    /// Unknown categories fall back to the penal courtroom script.
    pub fn from_str_or_penal(s: &str) -> Self {
        match s {
            "laboral" => CaseCategory::Laboral,
            _ => CaseCategory::Penal,
        }
    }
}

/// A case the user can litigate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseRecord {
    pub id: String,
    pub title: String,
    pub category: CaseCategory,
    pub facts: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip() {
        assert_eq!(
            CaseCategory::from_str_or_penal(CaseCategory::Laboral.as_str()),
            CaseCategory::Laboral
        );
    }

    #[test]
    fn test_unknown_category_falls_back_to_penal() {
        assert_eq!(
            CaseCategory::from_str_or_penal("mercantil"),
            CaseCategory::Penal
        );
    }
}
