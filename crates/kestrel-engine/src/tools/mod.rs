//! Tool contracts and the router that executes them.

pub mod args;
pub mod router;

use crate::schema::{ArgumentSchema, FieldKind, FieldSpec};
use serde::Serialize;
use serde_json::json;

pub use router::{ToolError, ToolRouter};

/// Every operation the router knows. The enum is the dispatch table, so two
/// tools can never share a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Enumerate,
    ClickByTarget,
    Teach,
    ListLearned,
    EnhancedCapture,
}

impl Tool {
    pub const ALL: [Tool; 5] = [
        Tool::Enumerate,
        Tool::ClickByTarget,
        Tool::Teach,
        Tool::ListLearned,
        Tool::EnhancedCapture,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Tool::Enumerate => "enumerate",
            Tool::ClickByTarget => "click-by-target",
            Tool::Teach => "teach",
            Tool::ListLearned => "list-learned",
            Tool::EnhancedCapture => "enhanced-capture",
        }
    }

    pub fn from_name(name: &str) -> Option<Tool> {
        Tool::ALL.into_iter().find(|t| t.name() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            Tool::Enumerate => {
                "List the interactive elements on the current page with their selectors and identifying attributes."
            }
            Tool::ClickByTarget => {
                "Click the element matching a selector, then return the page structure after the click."
            }
            Tool::Teach => {
                "Remember that a natural-language description refers to a specific selector. Teaching the same description again replaces the earlier mapping."
            }
            Tool::ListLearned => "Show every description-to-selector mapping taught so far.",
            Tool::EnhancedCapture => {
                "Capture a screenshot and the page structure, optionally with the list of interactive elements."
            }
        }
    }

    pub fn schema(&self) -> ArgumentSchema {
        match self {
            Tool::Enumerate => ArgumentSchema::new().field(
                FieldSpec::optional(
                    "includeHidden",
                    FieldKind::Boolean,
                    "Also report elements that are not currently visible",
                )
                .with_default(json!(false)),
            ),
            Tool::ClickByTarget => ArgumentSchema::new()
                .field(FieldSpec::required(
                    "target",
                    FieldKind::String,
                    "Selector of the element to click",
                ))
                .field(FieldSpec::optional(
                    "description",
                    FieldKind::String,
                    "What the element is, echoed in the confirmation",
                )),
            Tool::Teach => ArgumentSchema::new()
                .field(FieldSpec::required(
                    "description",
                    FieldKind::String,
                    "Natural-language description of the element, e.g. \"login button\"",
                ))
                .field(FieldSpec::required(
                    "target",
                    FieldKind::String,
                    "Selector that reliably finds the element",
                ))
                .field(FieldSpec::optional(
                    "notes",
                    FieldKind::String,
                    "Anything worth remembering about this mapping",
                )),
            Tool::ListLearned => ArgumentSchema::new(),
            Tool::EnhancedCapture => ArgumentSchema::new()
                .field(
                    FieldSpec::optional(
                        "includeElements",
                        FieldKind::Boolean,
                        "Append the list of interactive elements",
                    )
                    .with_default(json!(false)),
                )
                .field(
                    FieldSpec::optional(
                        "format",
                        FieldKind::OneOf(&["png", "jpeg"]),
                        "Screenshot image format",
                    )
                    .with_default(json!("png")),
                ),
        }
    }

    pub fn contract(&self) -> ToolContract {
        ToolContract {
            name: self.name(),
            description: self.description(),
            input_schema: self.schema().to_json_schema(),
        }
    }
}

/// Discovery view of a tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolContract {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}
