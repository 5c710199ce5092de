use async_trait::async_trait;
use base64::Engine;
use kestrel_common::error::DispatchError;
use kestrel_common::protocol::{
    CaptureStructureRequest, CaptureVisualRequest, ClickRequest, EnumerateRequest,
    EnumeratedEntity, EnumerationPayload, ImageFormat, RemoteCommand, VisualPayload,
};
use serde::de::DeserializeOwned;

/// A decoded visual capture.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualCapture {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// The channel to the remote surface, as seen by the tool layer.
///
/// Implementations correlate each command with its reply and enforce their
/// own timeout; they never retry. Takes `&self` so that several invocations
/// can wait on the channel at the same time.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Send a command and wait for the `data` of its successful reply.
    async fn send(&self, command: RemoteCommand) -> Result<serde_json::Value, DispatchError>;

    /// List the interactive elements on the current page.
    async fn enumerate_entities(
        &self,
        include_hidden: bool,
    ) -> Result<Vec<EnumeratedEntity>, DispatchError> {
        let command = RemoteCommand::EnumerateEntities(EnumerateRequest { include_hidden });
        let name = command.name();
        let data = self.send(command).await?;
        decode::<EnumerationPayload>(name, data).map(EnumerationPayload::into_entities)
    }

    /// Click whatever the locator resolves to.
    async fn click_target(&self, target: &str) -> Result<(), DispatchError> {
        self.send(RemoteCommand::ClickTarget(ClickRequest {
            target: target.to_string(),
        }))
        .await?;
        Ok(())
    }

    /// Screenshot of the visible viewport.
    async fn capture_visual(&self, format: ImageFormat) -> Result<VisualCapture, DispatchError> {
        let command = RemoteCommand::CaptureVisual(CaptureVisualRequest { format });
        let name = command.name();
        let data = self.send(command).await?;
        let payload = decode::<VisualPayload>(name, data)?;
        decode_visual(name, payload, format)
    }

    /// Structural snapshot of the page; its shape belongs to the extension.
    async fn capture_structure(&self) -> Result<serde_json::Value, DispatchError> {
        self.send(RemoteCommand::CaptureStructure(
            CaptureStructureRequest::default(),
        ))
        .await
    }
}

fn decode<T: DeserializeOwned>(command: &str, data: serde_json::Value) -> Result<T, DispatchError> {
    serde_json::from_value(data).map_err(|e| DispatchError::MalformedReply {
        command: command.to_string(),
        message: e.to_string(),
    })
}

fn decode_visual(
    command: &str,
    payload: VisualPayload,
    requested: ImageFormat,
) -> Result<VisualCapture, DispatchError> {
    let (encoded, declared_mime) = match payload {
        VisualPayload::Encoded(s) => (s, None),
        VisualPayload::Object { data, mime_type } => (data, mime_type),
    };

    // Extensions commonly hand back `data:image/png;base64,...` URLs.
    let (url_mime, body) = match encoded
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(','))
    {
        Some((header, body)) => (header.strip_suffix(";base64").map(str::to_string), body),
        None => (None, encoded.as_str()),
    };

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(body.trim())
        .map_err(|e| DispatchError::MalformedReply {
            command: command.to_string(),
            message: format!("base64 decode failed: {}", e),
        })?;

    let mime_type = declared_mime
        .or(url_mime)
        .unwrap_or_else(|| requested.mime_type().to_string());

    Ok(VisualCapture { bytes, mime_type })
}
