use crate::store::MappingStore;
use kestrel_common::mapping::to_document;
use serde::Serialize;

pub const LEARNED_MAPPINGS_URI: &str = "mappings://learned";

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("Unknown resource: {0}")]
    NotFound(String),
    #[error("Failed to serialize resource {uri}: {source}")]
    Serialization {
        uri: String,
        source: serde_json::Error,
    },
}

/// Listing entry for a readable resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    pub uri: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub mime_type: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    pub uri: String,
    pub mime_type: &'static str,
    pub text: String,
}

/// Read-only view of the mapping store, outside of tool dispatch.
#[derive(Clone)]
pub struct ResourceRouter {
    store: MappingStore,
}

impl ResourceRouter {
    pub fn new(store: MappingStore) -> Self {
        Self { store }
    }

    pub fn list(&self) -> Vec<ResourceDescriptor> {
        vec![ResourceDescriptor {
            uri: LEARNED_MAPPINGS_URI,
            name: "Learned mappings",
            description: "Every description taught so far with its target, notes and recording time",
            mime_type: "application/json",
        }]
    }

    pub fn read(&self, uri: &str) -> Result<ResourceContents, ResourceError> {
        if uri != LEARNED_MAPPINGS_URI {
            return Err(ResourceError::NotFound(uri.to_string()));
        }

        let document = to_document(&self.store.get_all());
        let text = serde_json::to_string_pretty(&document).map_err(|source| {
            ResourceError::Serialization {
                uri: uri.to_string(),
                source,
            }
        })?;

        Ok(ResourceContents {
            uri: uri.to_string(),
            mime_type: "application/json",
            text,
        })
    }
}
