//! Entity category vocabulary and the model-label mapping table

use serde::{Deserialize, Serialize};

/// Entity categories written to the `category` feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityCategory {
    Person,
    Location,
    Organization,
    Date,
}

/// Model-native label (lowercase) -> vocabulary category
///
/// Labels not listed here are unmapped; producers skip spans carrying them.
pub const CATEGORY_TABLE: &[(&str, EntityCategory)] = &[
    ("person", EntityCategory::Person),
    ("location", EntityCategory::Location),
    ("organization", EntityCategory::Organization),
    ("date", EntityCategory::Date),
];

impl EntityCategory {
    /// Get the vocabulary identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Person => "PERSON",
            Self::Location => "LOCATION",
            Self::Organization => "ORGANIZATION",
            Self::Date => "DATE",
        }
    }

    /// Map a model-native category label, ignoring case
    pub fn from_model_label(label: &str) -> Option<Self> {
        CATEGORY_TABLE
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(label))
            .map(|(_, category)| *category)
    }
}

impl std::fmt::Display for EntityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
