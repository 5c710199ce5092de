use serde::{Deserialize, Serialize};

/// Commands understood by the browser extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RemoteCommand {
    EnumerateEntities(EnumerateRequest),
    ClickTarget(ClickRequest),
    CaptureVisual(CaptureVisualRequest),
    CaptureStructure(CaptureStructureRequest),
}

impl RemoteCommand {
    /// Wire name of the command, also used to label failures.
    pub fn name(&self) -> &'static str {
        match self {
            RemoteCommand::EnumerateEntities(_) => "enumerate_entities",
            RemoteCommand::ClickTarget(_) => "click_target",
            RemoteCommand::CaptureVisual(_) => "capture_visual",
            RemoteCommand::CaptureStructure(_) => "capture_structure",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EnumerateRequest {
    #[serde(default)]
    pub include_hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickRequest {
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CaptureVisualRequest {
    #[serde(default)]
    pub format: ImageFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CaptureStructureRequest {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
}

impl ImageFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
        }
    }
}

/// A command stamped with the correlation id its reply must echo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRequest {
    pub id: String,
    #[serde(flatten)]
    pub command: RemoteCommand,
}

/// A reply frame from the extension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteReply {
    pub id: String,
    #[serde(flatten)]
    pub body: ReplyBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReplyBody {
    Ok {
        #[serde(default)]
        data: serde_json::Value,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        warnings: Vec<String>,
    },
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hint: Option<String>,
    },
}

/// One interactive element as reported by an enumeration pass.
///
/// The locator is only as fresh as the page state it was taken from; a stale
/// locator surfaces as a remote fault when it is clicked.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumeratedEntity {
    #[serde(default, alias = "tag", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, alias = "text", skip_serializing_if = "Option::is_none")]
    pub display_text: Option<String>,
    #[serde(default, alias = "selector", skip_serializing_if = "Option::is_none")]
    pub locator: Option<String>,
    #[serde(flatten)]
    pub attributes: EntityAttributes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityAttributes {
    #[serde(default, rename = "id", skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    #[serde(
        default,
        rename = "className",
        alias = "class",
        skip_serializing_if = "Option::is_none"
    )]
    pub classification: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(
        default,
        rename = "ariaLabel",
        alias = "aria-label",
        skip_serializing_if = "Option::is_none"
    )]
    pub accessible_name: Option<String>,
}

/// Enumeration replies come either as a bare array or wrapped in `{ "elements": [...] }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EnumerationPayload {
    List(Vec<EnumeratedEntity>),
    Wrapped { elements: Vec<EnumeratedEntity> },
}

impl EnumerationPayload {
    pub fn into_entities(self) -> Vec<EnumeratedEntity> {
        match self {
            EnumerationPayload::List(entities) => entities,
            EnumerationPayload::Wrapped { elements } => elements,
        }
    }
}

/// Visual capture replies: a base64 string (optionally a `data:` URL) or an object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum VisualPayload {
    Encoded(String),
    Object {
        data: String,
        #[serde(default, alias = "mime_type", rename = "mimeType")]
        mime_type: Option<String>,
    },
}
