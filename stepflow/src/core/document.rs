//! The record flowing through the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Version stamped into every transformed document.
pub const WORKFLOW_VERSION: &str = "1.0.0";

/// Metadata block added by the transform step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    /// Always true once the document has been transformed.
    pub transformed: bool,
    /// UTF-16 length of the original title, or 0 if it had none.
    pub original_length: usize,
    /// Version of the workflow that produced the document.
    pub workflow_version: String,
}

/// A record of named fields plus the transform metadata.
///
/// Serializes flat: the named fields sit next to `processedAt` and
/// `metadata`, matching the shape returned by the data source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineDocument {
    /// Named fields, initially whatever the data source returned.
    #[serde(flatten)]
    pub fields: Map<String, Value>,

    /// When the document was transformed.
    #[serde(
        rename = "processedAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub processed_at: Option<DateTime<Utc>>,

    /// Transform metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DocumentMetadata>,
}

impl PipelineDocument {
    /// Creates a document from raw fields.
    #[must_use]
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            processed_at: None,
            metadata: None,
        }
    }

    /// Creates a document from a JSON value, which must be an object.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self::from_fields(fields)),
            _ => None,
        }
    }

    /// Returns a field by name.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns the title if it is a string.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.fields.get("title").and_then(Value::as_str)
    }

    /// Returns true once the transform step has stamped the document.
    #[must_use]
    pub fn is_transformed(&self) -> bool {
        self.metadata.as_ref().is_some_and(|m| m.transformed)
    }
}
