//! The transform step.

use super::{Step, TRANSFORM};
use crate::core::{DocumentMetadata, PipelineDocument, WORKFLOW_VERSION};
use crate::errors::StepError;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tracing::debug;

/// Upper-cases the title and stamps processing metadata.
///
/// Pure apart from reading the clock. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformStep;

impl TransformStep {
    /// Creates a transform step.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Applies the transformation to a document.
    ///
    /// Fields are shallow-copied. A string title is upper-cased and its
    /// length recorded in UTF-16 code units; a missing title stays missing and a
    /// non-string title is copied unchanged, both with length 0.
    #[must_use]
    pub fn apply(input: &PipelineDocument) -> PipelineDocument {
        let mut fields = input.fields.clone();
        // The typed fields below replace any same-named raw fields.
        fields.remove("processedAt");
        fields.remove("metadata");

        let original_length = match input.fields.get("title") {
            Some(Value::String(title)) => {
                fields.insert("title".to_string(), Value::String(title.to_uppercase()));
                title.encode_utf16().count()
            }
            _ => 0,
        };

        PipelineDocument {
            fields,
            processed_at: Some(Utc::now()),
            metadata: Some(DocumentMetadata {
                transformed: true,
                original_length,
                workflow_version: WORKFLOW_VERSION.to_string(),
            }),
        }
    }
}

#[async_trait]
impl Step for TransformStep {
    type Input = PipelineDocument;
    type Output = PipelineDocument;

    fn name(&self) -> &str {
        TRANSFORM
    }

    async fn run(&self, input: &PipelineDocument) -> Result<PipelineDocument, StepError> {
        debug!(step = TRANSFORM, "Transforming data");
        Ok(Self::apply(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn doc(value: Value) -> PipelineDocument {
        PipelineDocument::from_value(value).unwrap()
    }

    #[test]
    fn test_transform_uppercases_title() {
        let out = TransformStep::apply(&doc(json!({"id": 1, "title": "hello"})));

        assert_eq!(out.title(), Some("HELLO"));
        assert_eq!(out.get("id"), Some(&json!(1)));
        assert!(out.processed_at.is_some());
        assert_eq!(
            out.metadata,
            Some(DocumentMetadata {
                transformed: true,
                original_length: 5,
                workflow_version: "1.0.0".to_string(),
            })
        );
    }

    #[test]
    fn test_transform_without_title() {
        let out = TransformStep::apply(&doc(json!({"body": "x"})));

        assert!(out.get("title").is_none());
        assert_eq!(out.metadata.map(|m| m.original_length), Some(0));
    }

    #[test]
    fn test_transform_non_string_title() {
        let out = TransformStep::apply(&doc(json!({"title": 42})));
        assert_eq!(out.get("title"), Some(&json!(42)));
        assert_eq!(out.metadata.map(|m| m.original_length), Some(0));
    }

    #[test]
    fn test_transform_counts_characters() {
        let out = TransformStep::apply(&doc(json!({"title": "straße"})));
        assert_eq!(out.title(), Some("STRASSE"));
        assert_eq!(out.metadata.map(|m| m.original_length), Some(6));
    }

    #[test]
    fn test_transform_counts_utf16_units() {
        let out = TransformStep::apply(&doc(json!({"title": "a😀"})));
        assert_eq!(out.title(), Some("A😀"));
        assert_eq!(out.metadata.map(|m| m.original_length), Some(3));
    }

    #[test]
    fn test_transform_is_idempotent_apart_from_timestamp() {
        let input = doc(json!({"title": "Repeatable", "userId": 7}));
        let a = TransformStep::apply(&input);
        let b = TransformStep::apply(&input);

        assert_eq!(a.fields, b.fields);
        assert_eq!(a.metadata, b.metadata);
    }

    #[test]
    fn test_transform_replaces_raw_metadata_field() {
        let out = TransformStep::apply(&doc(json!({"title": "t", "metadata": "raw"})));
        let value = serde_json::to_value(&out).unwrap();
        assert_eq!(value["metadata"]["transformed"], json!(true));
    }

    #[tokio::test]
    async fn test_transform_step_never_fails() {
        let step = TransformStep::new();
        assert_eq!(step.name(), "transform");
        assert!(step.run(&PipelineDocument::default()).await.is_ok());
    }
}
