//! Executes tool invocations: validate → (remote calls) → format.

use super::args::{CaptureArgs, ClickArgs, EnumerateArgs, TeachArgs};
use super::{Tool, ToolContract};
use crate::dispatcher::Dispatcher;
use crate::schema::ValidationError;
use crate::store::MappingStore;
use kestrel_common::envelope::{ContentBlock, ToolResponse};
use kestrel_common::error::DispatchError;
use kestrel_common::formatter::{ListingMode, format_entities, format_mappings};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("'{tool}' failed: {source}")]
    Remote {
        tool: &'static str,
        source: DispatchError,
    },

    #[error("Internal error in '{tool}': {message}")]
    InvariantViolation { tool: &'static str, message: String },
}

#[derive(Clone)]
pub struct ToolRouter {
    dispatcher: Arc<dyn Dispatcher>,
    store: MappingStore,
}

impl ToolRouter {
    pub fn new(dispatcher: Arc<dyn Dispatcher>, store: MappingStore) -> Self {
        Self { dispatcher, store }
    }

    pub fn store(&self) -> &MappingStore {
        &self.store
    }

    pub fn list_tools(&self) -> Vec<ToolContract> {
        Tool::ALL.iter().map(Tool::contract).collect()
    }

    /// Run a tool and fold any failure into an error envelope.
    pub async fn call(&self, name: &str, arguments: &Value) -> ToolResponse {
        match self.invoke(name, arguments).await {
            Ok(response) => response,
            Err(e) => {
                warn!(tool = name, error = %e, "Tool invocation failed");
                ToolResponse::error(format!("Error: {}", e))
            }
        }
    }

    pub async fn invoke(&self, name: &str, arguments: &Value) -> Result<ToolResponse, ToolError> {
        let tool = Tool::from_name(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        let normalized = tool.schema().validate(name, arguments)?;
        debug!(tool = name, "Arguments validated");

        match tool {
            Tool::Enumerate => self.enumerate(decode_args(tool, normalized)?).await,
            Tool::ClickByTarget => self.click(decode_args(tool, normalized)?).await,
            Tool::Teach => Ok(self.teach(decode_args(tool, normalized)?)),
            Tool::ListLearned => Ok(self.list_learned()),
            Tool::EnhancedCapture => self.enhanced_capture(decode_args(tool, normalized)?).await,
        }
    }

    async fn enumerate(&self, args: EnumerateArgs) -> Result<ToolResponse, ToolError> {
        let entities = self
            .dispatcher
            .enumerate_entities(args.include_hidden)
            .await
            .map_err(remote(Tool::Enumerate))?;
        debug!(count = entities.len(), "Enumerated elements");
        Ok(ToolResponse::text(format_entities(
            &entities,
            ListingMode::Detailed,
        )))
    }

    async fn click(&self, args: ClickArgs) -> Result<ToolResponse, ToolError> {
        let tool = Tool::ClickByTarget;
        self.dispatcher
            .click_target(&args.target)
            .await
            .map_err(remote(tool))?;
        info!(locator = %args.target, "Clicked element");

        let structure = self
            .dispatcher
            .capture_structure()
            .await
            .map_err(remote(tool))?;

        let mut confirmation = format!("Clicked `{}`", args.target);
        if let Some(description) = &args.description {
            confirmation.push_str(&format!(" ({})", description));
        }

        Ok(ToolResponse::success(vec![
            ContentBlock::text(confirmation),
            structure_block(tool, structure)?,
        ]))
    }

    fn teach(&self, args: TeachArgs) -> ToolResponse {
        let mapping = self
            .store
            .put(&args.description, &args.target, args.notes.as_deref());
        info!(
            description = %mapping.description,
            locator = %mapping.target,
            total = self.store.size(),
            "Learned mapping"
        );

        let mut confirmation = format!("Learned \"{}\" → `{}`", mapping.description, mapping.target);
        if let Some(notes) = &mapping.notes {
            confirmation.push_str(&format!(" (notes: {})", notes));
        }
        ToolResponse::text(confirmation)
    }

    fn list_learned(&self) -> ToolResponse {
        ToolResponse::text(format_mappings(&self.store.get_all()))
    }

    async fn enhanced_capture(&self, args: CaptureArgs) -> Result<ToolResponse, ToolError> {
        let tool = Tool::EnhancedCapture;
        let visual = self
            .dispatcher
            .capture_visual(args.format)
            .await
            .map_err(remote(tool))?;
        let structure = self
            .dispatcher
            .capture_structure()
            .await
            .map_err(remote(tool))?;

        let mut content = vec![
            ContentBlock::image(&visual.bytes, visual.mime_type),
            structure_block(tool, structure)?,
        ];

        if args.include_elements {
            // The screenshot and structure stand on their own; a failed
            // enumeration only drops the element list.
            match self.dispatcher.enumerate_entities(false).await {
                Ok(entities) => content.push(ContentBlock::text(format_entities(
                    &entities,
                    ListingMode::Compact,
                ))),
                Err(e) => warn!(error = %e, "Element enumeration failed during capture; omitting"),
            }
        }

        Ok(ToolResponse::success(content))
    }
}

fn remote(tool: Tool) -> impl FnOnce(DispatchError) -> ToolError {
    move |source| ToolError::Remote {
        tool: tool.name(),
        source,
    }
}

fn decode_args<T: DeserializeOwned>(tool: Tool, normalized: Map<String, Value>) -> Result<T, ToolError> {
    serde_json::from_value(Value::Object(normalized)).map_err(|e| ToolError::InvariantViolation {
        tool: tool.name(),
        message: format!("validated arguments did not decode: {}", e),
    })
}

fn structure_block(tool: Tool, structure: Value) -> Result<ContentBlock, ToolError> {
    match structure {
        Value::String(text) => Ok(ContentBlock::text(text)),
        other => serde_json::to_string_pretty(&other)
            .map(ContentBlock::text)
            .map_err(|e| ToolError::InvariantViolation {
                tool: tool.name(),
                message: format!("structure could not be rendered: {}", e),
            }),
    }
}
