//! Stack event and output records
//!
//! The provider reports these as PascalCase JSON. Wire structs mirror that
//! shape and are converted into the domain types below, which is where the
//! status classification happens.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Resource type the provider uses for the stack itself
pub const STACK_RESOURCE_TYPE: &str = "AWS::CloudFormation::Stack";

/// Coarse classification of a `ResourceStatus` token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusKind {
    #[default]
    InProgress,
    Complete,
    Failed,
}

impl StatusKind {
    /// Classify a raw status token by substring
    ///
    /// `FAILED` wins over everything, `COMPLETE` counts only when the token
    /// is not also `IN_PROGRESS` (e.g. `UPDATE_COMPLETE_CLEANUP_IN_PROGRESS`).
    pub fn classify(status: &str) -> Self {
        if status.contains("FAILED") {
            StatusKind::Failed
        } else if status.contains("COMPLETE") && !status.contains("IN_PROGRESS") {
            StatusKind::Complete
        } else {
            StatusKind::InProgress
        }
    }
}

/// One provider-reported change record
#[derive(Debug, Clone, PartialEq)]
pub struct StackEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub logical_resource_id: String,
    pub resource_type: String,
    pub resource_status: String,
    pub resource_status_reason: Option<String>,
    /// Classification of `resource_status`, computed once at construction
    pub status_kind: StatusKind,
}

impl StackEvent {
    pub fn new(
        event_id: impl Into<String>,
        timestamp: DateTime<Utc>,
        logical_resource_id: impl Into<String>,
        resource_type: impl Into<String>,
        resource_status: impl Into<String>,
        resource_status_reason: Option<String>,
    ) -> Self {
        let resource_status = resource_status.into();
        let status_kind = StatusKind::classify(&resource_status);
        Self {
            event_id: event_id.into(),
            timestamp,
            logical_resource_id: logical_resource_id.into(),
            resource_type: resource_type.into(),
            resource_status,
            resource_status_reason,
            status_kind,
        }
    }

    /// Whether this record describes the stack itself rather than a resource in it
    pub fn is_stack_event(&self, stack_name: &str) -> bool {
        self.resource_type == STACK_RESOURCE_TYPE && self.logical_resource_id == stack_name
    }

    /// Whether the status is a terminal completion or failure
    pub fn is_settled(&self) -> bool {
        self.status_kind != StatusKind::InProgress
    }
}

/// One stack output (key/value/description)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackOutput {
    pub key: String,
    pub value: String,
    pub description: Option<String>,
}

/// `describe-stack-events` response body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct DescribeStackEventsResponse {
    #[serde(default)]
    pub stack_events: Vec<WireStackEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WireStackEvent {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub logical_resource_id: String,
    #[serde(default)]
    pub resource_type: String,
    #[serde(default)]
    pub resource_status: String,
    pub resource_status_reason: Option<String>,
}

impl WireStackEvent {
    pub fn into_event(self) -> StackEvent {
        StackEvent::new(
            self.event_id,
            self.timestamp,
            self.logical_resource_id,
            self.resource_type,
            self.resource_status,
            self.resource_status_reason,
        )
    }
}

/// `describe-stacks` response body
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct DescribeStacksResponse {
    #[serde(default)]
    pub stacks: Vec<WireStack>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WireStack {
    #[serde(default)]
    pub outputs: Vec<WireOutput>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct WireOutput {
    pub output_key: String,
    #[serde(default)]
    pub output_value: String,
    pub description: Option<String>,
}

impl WireOutput {
    pub fn into_output(self) -> StackOutput {
        StackOutput {
            key: self.output_key,
            value: self.output_value,
            description: self.description,
        }
    }
}
