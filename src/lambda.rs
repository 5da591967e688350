use serde_json::{json, Map, Value};
use tracing::info;

use crate::config::AppConfig;
use crate::error::Result;
use crate::iam::{PolicyStatement, Role};
use crate::sqs::QueueHandle;
use crate::stage::RemovalPolicy;
use crate::template::{intrinsic, Parameter, Resource, Stack};

/// Template parameter naming the bucket the handler bundles are uploaded to.
pub const ASSETS_BUCKET_PARAMETER: &str = "AssetsBucketName";

const ENTRY_METADATA_KEY: &str = "tabsflow:entry";

/// A compute unit backed by an externally built handler binary.
#[derive(Debug, Clone)]
pub struct FunctionDeclaration {
    name: String,
    entry: String,
    runtime: String,
    architecture: String,
    handler: String,
    timeout_secs: u32,
    memory_mb: u32,
    environment: Map<String, Value>,
    log_retention_days: u32,
    removal: RemovalPolicy,
}

impl FunctionDeclaration {
    /// Function `<service>_<stage>` built from the handler at `entry`, with
    /// the app's Lambda defaults.
    pub fn new(config: &AppConfig, service: &str, entry: &str) -> Self {
        Self {
            name: config.function_name(service),
            entry: entry.to_string(),
            runtime: config.lambda.runtime.to_string(),
            architecture: config.lambda.architecture.to_string(),
            handler: config.lambda.handler.to_string(),
            timeout_secs: config.lambda.timeout_secs,
            memory_mb: config.lambda.memory_mb,
            environment: Map::new(),
            log_retention_days: config.policy.log_retention_days,
            removal: config.policy.removal,
        }
    }

    pub fn env(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.environment.insert(key.to_string(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bundle key in the assets bucket: `cmd/email/main.go` → `cmd/email/bootstrap.zip`.
    fn bundle_key(&self) -> String {
        let dir = self
            .entry
            .trim_start_matches("../")
            .rsplit_once('/')
            .map_or("", |(dir, _)| dir);
        format!("{dir}/bootstrap.zip")
    }

    /// Declares the function and its log group under `scope`, executing as `role`.
    pub fn declare(self, stack: &mut Stack, scope: &str, role: &Role) -> Result<FunctionHandle> {
        if !stack.has_parameter(ASSETS_BUCKET_PARAMETER) {
            stack.add_parameter(
                ASSETS_BUCKET_PARAMETER,
                Parameter {
                    parameter_type: "String".to_string(),
                    default: None,
                    description: Some("Bucket holding the Lambda handler bundles".to_string()),
                },
            )?;
        }

        let id = intrinsic::logical_id(&[scope, &self.name]);
        let properties = json!({
            "FunctionName": self.name,
            "Code": {
                "S3Bucket": intrinsic::reference(ASSETS_BUCKET_PARAMETER),
                "S3Key": self.bundle_key(),
            },
            "Handler": self.handler,
            "Runtime": self.runtime,
            "Architectures": [self.architecture],
            "MemorySize": self.memory_mb,
            "Timeout": self.timeout_secs,
            "Role": role.arn(),
            "Environment": { "Variables": self.environment },
        });
        stack.add_resource(
            id.clone(),
            Resource::new("AWS::Lambda::Function", properties)?
                .with_metadata(json!({ ENTRY_METADATA_KEY: self.entry }))
                .depends_on(role.logical_id())
                .depends_on(role.default_policy_id()),
        )?;

        stack.add_resource(
            format!("{id}LogGroup"),
            Resource::new(
                "AWS::Logs::LogGroup",
                json!({
                    "LogGroupName": format!("/aws/lambda/{}", self.name),
                    "RetentionInDays": self.log_retention_days,
                }),
            )?
            .with_removal_policy(self.removal),
        )?;
        info!("Function '{}' declared from {}", self.name, self.entry);

        Ok(FunctionHandle {
            logical_id: id,
            name: self.name,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionHandle {
    logical_id: String,
    name: String,
}

impl FunctionHandle {
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arn(&self) -> Value {
        intrinsic::get_att(&self.logical_id, "Arn")
    }

    pub fn grant_invoke(&self, role: &mut Role) {
        role.add_to_invoke_policy(PolicyStatement::allow(
            ["lambda:InvokeFunction"],
            vec![
                self.arn(),
                intrinsic::join(":", vec![self.arn(), json!("*")]),
            ],
        ));
    }

    /// Polls `queue` one message at a time.
    pub fn add_sqs_event_source(&self, stack: &mut Stack, queue: &QueueHandle) -> Result<()> {
        stack.add_resource(
            format!("{}SqsEventSource{}", self.logical_id, queue.logical_id()),
            Resource::new(
                "AWS::Lambda::EventSourceMapping",
                json!({
                    "FunctionName": intrinsic::reference(&self.logical_id),
                    "EventSourceArn": queue.arn(),
                    "BatchSize": 1,
                }),
            )?,
        )?;
        Ok(())
    }

    /// Lets API Gateway invoke the function for requests matching `source_arn`.
    pub fn allow_api_gateway_invoke(
        &self,
        stack: &mut Stack,
        id: impl Into<String>,
        source_arn: Value,
    ) -> Result<()> {
        stack.add_resource(
            id,
            Resource::new(
                "AWS::Lambda::Permission",
                json!({
                    "Action": "lambda:InvokeFunction",
                    "FunctionName": self.arn(),
                    "Principal": "apigateway.amazonaws.com",
                    "SourceArn": source_arn,
                }),
            )?,
        )?;
        Ok(())
    }
}
