//! Stack provider access
//!
//! The provider is reached through the AWS CLI in non-interactive JSON mode,
//! so region and credential resolution stay with the CLI's own configuration.

use std::future::Future;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::schema::{
    DescribeStackEventsResponse, DescribeStacksResponse, StackEvent, StackOutput, WireOutput,
    WireStackEvent,
};

/// Failures of a single provider call
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("stack {stack} does not exist")]
    StackNotFound { stack: String },

    #[error("authorization failed: {0}")]
    Auth(String),

    #[error("provider call exited with {status}: {stderr}")]
    Command { status: ExitStatus, stderr: String },

    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed provider response: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Read access to a deployment stack
pub trait StackProvider {
    /// One page of events, newest first, exactly as the provider returns them
    fn list_stack_events(
        &self,
        stack_name: &str,
    ) -> impl Future<Output = Result<Vec<StackEvent>, ProviderError>> + Send;

    /// Outputs of the stack's current version
    fn describe_stack_outputs(
        &self,
        stack_name: &str,
    ) -> impl Future<Output = Result<Vec<StackOutput>, ProviderError>> + Send;
}

/// Configuration for the AWS CLI backed provider
#[derive(Debug, Clone)]
pub struct AwsCliConfig {
    /// CLI binary to invoke
    pub program: PathBuf,
    pub region: Option<String>,
    pub profile: Option<String>,
    /// Upper bound for one CLI invocation
    pub timeout: Duration,
}

impl Default for AwsCliConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("aws"),
            region: None,
            profile: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Provider that shells out to `aws cloudformation ...`
pub struct AwsCliProvider {
    config: AwsCliConfig,
}

impl AwsCliProvider {
    pub fn new(config: AwsCliConfig) -> Self {
        Self { config }
    }

    fn command(&self, operation: &str, stack_name: &str) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.arg("cloudformation")
            .arg(operation)
            .arg("--stack-name")
            .arg(stack_name)
            .arg("--output")
            .arg("json");

        if let Some(region) = &self.config.region {
            cmd.arg("--region").arg(region);
        }
        if let Some(profile) = &self.config.profile {
            cmd.arg("--profile").arg(profile);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn invoke(&self, mut cmd: Command, stack_name: &str) -> Result<Vec<u8>, ProviderError> {
        let program = self.config.program.display().to_string();
        debug!("Invoking {} for stack {}", program, stack_name);

        let output = timeout(self.config.timeout, cmd.output())
            .await
            .map_err(|_| ProviderError::Timeout(self.config.timeout))?
            .map_err(|source| ProviderError::Spawn { program, source })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!("Provider call failed: {}", stderr);
            return Err(classify_failure(output.status, stderr, stack_name));
        }

        Ok(output.stdout)
    }
}

impl StackProvider for AwsCliProvider {
    async fn list_stack_events(&self, stack_name: &str) -> Result<Vec<StackEvent>, ProviderError> {
        let mut cmd = self.command("describe-stack-events", stack_name);
        // The CLI follows NextToken on its own; a single page is what we want
        cmd.arg("--no-paginate");

        let stdout = self.invoke(cmd, stack_name).await?;
        let response: DescribeStackEventsResponse = serde_json::from_slice(&stdout)?;
        Ok(response
            .stack_events
            .into_iter()
            .map(WireStackEvent::into_event)
            .collect())
    }

    async fn describe_stack_outputs(
        &self,
        stack_name: &str,
    ) -> Result<Vec<StackOutput>, ProviderError> {
        let cmd = self.command("describe-stacks", stack_name);

        let stdout = self.invoke(cmd, stack_name).await?;
        let response: DescribeStacksResponse = serde_json::from_slice(&stdout)?;
        Ok(response
            .stacks
            .into_iter()
            .flat_map(|stack| stack.outputs)
            .map(WireOutput::into_output)
            .collect())
    }
}

/// Map CLI error text onto the error taxonomy
fn classify_failure(status: ExitStatus, stderr: String, stack_name: &str) -> ProviderError {
    const AUTH_MARKERS: [&str; 6] = [
        "Unable to locate credentials",
        "ExpiredToken",
        "InvalidClientTokenId",
        "AccessDenied",
        "UnrecognizedClientException",
        "SignatureDoesNotMatch",
    ];

    if stderr.contains("does not exist") {
        ProviderError::StackNotFound {
            stack: stack_name.to_string(),
        }
    } else if AUTH_MARKERS.iter().any(|marker| stderr.contains(marker)) {
        ProviderError::Auth(stderr)
    } else {
        ProviderError::Command { status, stderr }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;

    fn failed() -> ExitStatus {
        ExitStatus::from_raw(255 << 8)
    }

    #[test]
    fn test_classify_not_found() {
        let stderr = "An error occurred (ValidationError) when calling the DescribeStackEvents \
                      operation: Stack [my-stack] does not exist"
            .to_string();
        let err = classify_failure(failed(), stderr, "my-stack");
        assert!(matches!(err, ProviderError::StackNotFound { ref stack } if stack == "my-stack"));
    }

    #[test]
    fn test_classify_auth() {
        let err = classify_failure(failed(), "Unable to locate credentials.".to_string(), "s");
        assert!(matches!(err, ProviderError::Auth(_)));
    }

    #[test]
    fn test_classify_other() {
        let err = classify_failure(failed(), "Throttling: Rate exceeded".to_string(), "s");
        assert!(matches!(err, ProviderError::Command { .. }));
    }

    #[test]
    fn test_command_arguments() {
        let provider = AwsCliProvider::new(AwsCliConfig {
            region: Some("eu-west-1".to_string()),
            profile: Some("ops".to_string()),
            ..Default::default()
        });
        let cmd = provider.command("describe-stack-events", "my-stack");
        let args: Vec<String> = cmd
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect();

        assert_eq!(
            args,
            vec![
                "cloudformation",
                "describe-stack-events",
                "--stack-name",
                "my-stack",
                "--output",
                "json",
                "--region",
                "eu-west-1",
                "--profile",
                "ops",
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let provider = AwsCliProvider::new(AwsCliConfig {
            program: PathBuf::from("/nonexistent/stack-tail-aws"),
            ..Default::default()
        });
        let err = provider.list_stack_events("my-stack").await.unwrap_err();
        assert!(matches!(err, ProviderError::Spawn { .. }));
    }

    /// Write an executable shell script standing in for the `aws` binary
    fn fake_aws(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let script = dir.path().join("fake-aws");
        std::fs::write(&script, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    #[tokio::test]
    async fn test_reads_events_from_program_output() {
        let dir = tempfile::tempdir().unwrap();
        let script = fake_aws(
            &dir,
            "cat <<'JSON'\n{\"StackEvents\":[{\"EventId\":\"e1\",\
             \"Timestamp\":\"2024-05-01T10:00:00Z\",\"LogicalResourceId\":\"s\",\
             \"ResourceType\":\"AWS::CloudFormation::Stack\",\
             \"ResourceStatus\":\"CREATE_COMPLETE\"}]}\nJSON",
        );

        let provider = AwsCliProvider::new(AwsCliConfig {
            program: script,
            ..Default::default()
        });
        let events = provider.list_stack_events("s").await.unwrap();
        assert_eq!(events.len(), 1);
        assert!(events[0].is_stack_event("s"));
    }

    #[tokio::test]
    async fn test_slow_program_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let script = fake_aws(&dir, "sleep 5");

        let provider = AwsCliProvider::new(AwsCliConfig {
            program: script,
            timeout: Duration::from_millis(200),
            ..Default::default()
        });
        let err = provider.list_stack_events("s").await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(t) if t == Duration::from_millis(200)));
    }

    #[tokio::test]
    async fn test_malformed_output_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let script = fake_aws(&dir, "echo 'not json'");

        let provider = AwsCliProvider::new(AwsCliConfig {
            program: script,
            ..Default::default()
        });
        let err = provider.list_stack_events("s").await.unwrap_err();
        assert!(matches!(err, ProviderError::Parse(_)));
    }

    #[tokio::test]
    async fn test_outputs_of_missing_stack() {
        let dir = tempfile::tempdir().unwrap();
        let script = fake_aws(
            &dir,
            "echo 'An error occurred (ValidationError) when calling the DescribeStacks \
             operation: Stack with id s does not exist' >&2\nexit 255",
        );

        let provider = AwsCliProvider::new(AwsCliConfig {
            program: script,
            ..Default::default()
        });
        let err = provider.describe_stack_outputs("s").await.unwrap_err();
        assert!(matches!(err, ProviderError::StackNotFound { ref stack } if stack == "s"));
    }
}
