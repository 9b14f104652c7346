//! Deployment stack data model and provider access

pub mod provider;
pub mod schema;

pub use provider::{AwsCliConfig, AwsCliProvider, ProviderError, StackProvider};
pub use schema::{StackEvent, StackOutput, StatusKind, STACK_RESOURCE_TYPE};
