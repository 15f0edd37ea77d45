//! Common type definitions shared by the provider, tunes and API layers.
//!
//! # ID Types
//!
//! - [`UserId`]: auth provider user identifier (UUID)
//! - [`TuneId`]: identifier of a trained model ("tune") hosted by the image-generation API
//!
//! # Utility Functions
//!
//! - [`abbrev_uuid`]: Abbreviate UUIDs to first 8 chars for logging

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

pub type UserId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

/// Remote identifier of a tune.
///
/// The `models.modelId` column holds whatever the image API handed back when the tune was
/// created, which is a number for current tunes and a string for some older rows. Both
/// deserialize into the same textual form used to build `/tunes/{id}` URLs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TuneId(String);

impl TuneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TuneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for TuneId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for TuneId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(TuneId::from(n)),
            Raw::Text(s) => Ok(TuneId(s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tune_id_accepts_numbers_and_strings() {
        let ids: Vec<TuneId> = serde_json::from_str(r#"[1504944, "690204"]"#).unwrap();
        assert_eq!(ids, vec![TuneId::from(1504944), TuneId::new("690204")]);
        assert_eq!(ids[0].to_string(), "1504944");
    }

    #[test]
    fn test_abbrev_uuid() {
        let id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        assert_eq!(abbrev_uuid(&id), "550e8400");
    }
}
