//! Typed argument records, decoded from schema-validated objects.

use kestrel_common::protocol::ImageFormat;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumerateArgs {
    #[serde(default)]
    pub include_hidden: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClickArgs {
    pub target: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeachArgs {
    pub description: String,
    pub target: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureArgs {
    #[serde(default)]
    pub include_elements: bool,
    #[serde(default)]
    pub format: ImageFormat,
}
