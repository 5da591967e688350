use anyhow::{anyhow, Result};
use aws_sdk_dynamodb::Client;
use tracing::{error, info};

/// Tag CloudFormation puts on every resource it manages.
const STACK_NAME_TAG: &str = "aws:cloudformation:stack-name";

/// Live-account DynamoDB lookups used before a deploy.
///
/// Synthesis itself never talks to AWS; this client only answers whether a
/// table name the stateful stack wants is already taken.
#[derive(Debug)]
pub struct DynamoDb {
    client: Client,
}

impl DynamoDb {
    /// Creates a new `DynamoDb` instance.
    pub fn new(sdk_config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(sdk_config),
        }
    }

    /// Verifies authentication by attempting to list tables.
    pub async fn check_auth(&self) -> Result<()> {
        self.client.list_tables().limit(1).send().await.map_err(|e| {
            error!("Authentication failed: {}", e);
            anyhow!("Authentication failed")
        })?;
        info!("Authentication successful");
        Ok(())
    }

    /// Returns the table's ARN, or `None` if no table has that name.
    pub async fn table_arn(&self, table_name: &str) -> Result<Option<String>> {
        match self
            .client
            .describe_table()
            .table_name(table_name)
            .send()
            .await
        {
            Ok(output) => Ok(output
                .table()
                .and_then(|table| table.table_arn())
                .map(str::to_string)),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|e| e.is_resource_not_found_exception()) =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Returns the CloudFormation stack that manages the table, if any.
    pub async fn owning_stack(&self, table_arn: &str) -> Result<Option<String>> {
        let output = self
            .client
            .list_tags_of_resource()
            .resource_arn(table_arn)
            .send()
            .await?;

        Ok(output
            .tags()
            .iter()
            .find(|tag| tag.key() == STACK_NAME_TAG)
            .map(|tag| tag.value().to_string()))
    }
}
