use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A description the user taught, pointing at a known-good target.
#[derive(Debug, Clone, PartialEq)]
pub struct LearnedMapping {
    pub description: String,
    pub target: String,
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// Owned, insertion-ordered view of the mapping store.
pub type MappingSnapshot = IndexMap<String, LearnedMapping>;

/// Value half of the `mappings://learned` resource document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingEntry {
    pub target: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub recorded_at: String,
}

/// The resource document: one object level keyed by description.
pub type MappingDocument = IndexMap<String, MappingEntry>;

/// RFC 3339 UTC with millisecond precision, e.g. `2026-10-17T09:30:00.000Z`.
pub fn iso_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn to_document(snapshot: &MappingSnapshot) -> MappingDocument {
    snapshot
        .iter()
        .map(|(description, mapping)| {
            (
                description.clone(),
                MappingEntry {
                    target: mapping.target.clone(),
                    notes: mapping.notes.clone(),
                    recorded_at: iso_timestamp(&mapping.recorded_at),
                },
            )
        })
        .collect()
}
