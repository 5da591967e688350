//! Checks run against the live account before a deploy.

use anyhow::{bail, Result};
use tokio::time::Duration;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::dynamodb::DynamoDb;
use crate::stacks::stateful;
use crate::utils::retry_with_backoff;

const INITIAL_DELAY: Duration = Duration::from_millis(500);
const MAX_RETRIES: usize = 3;

/// What a preflight found for one table name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableStatus {
    Absent,
    OwnedBy(String),
    Unmanaged,
}

/// A table name is free when nothing holds it or the stateful stack already
/// manages it.
pub fn check_table(table: &str, expected_stack: &str, status: &TableStatus) -> Result<()> {
    match status {
        TableStatus::Absent => Ok(()),
        TableStatus::OwnedBy(stack) if stack == expected_stack => Ok(()),
        TableStatus::OwnedBy(stack) => {
            bail!("Table '{table}' already exists and is managed by stack '{stack}'")
        }
        TableStatus::Unmanaged => {
            bail!("Table '{table}' already exists outside of CloudFormation")
        }
    }
}

/// Verifies credentials and that no stateful table name is taken by
/// something other than the stateful stack.
pub async fn run(config: &AppConfig) -> Result<()> {
    let sdk_config = aws_config::load_from_env().await;
    let ddb = DynamoDb::new(&sdk_config);

    retry_with_backoff("Authentication", || ddb.check_auth(), INITIAL_DELAY, MAX_RETRIES).await?;

    let expected_stack = config.stack_name(stateful::STACK);
    let mut failures = 0;
    for table in stateful::table_names(config) {
        let status = match ddb.table_arn(&table).await? {
            None => TableStatus::Absent,
            Some(arn) => match ddb.owning_stack(&arn).await? {
                Some(stack) => TableStatus::OwnedBy(stack),
                None => TableStatus::Unmanaged,
            },
        };
        match check_table(&table, &expected_stack, &status) {
            Ok(()) => info!("Table '{}': {:?}", table, status),
            Err(e) => {
                warn!("{}", e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        bail!("Preflight found {failures} conflicting table(s)");
    }
    info!("Preflight passed for stage {}", config.stage());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_and_owned_tables_pass() {
        let stack = "TabsFlow-Stateful-dev";
        check_table("t", stack, &TableStatus::Absent).unwrap();
        check_table("t", stack, &TableStatus::OwnedBy(stack.to_string())).unwrap();
    }

    #[test]
    fn foreign_tables_fail() {
        let stack = "TabsFlow-Stateful-dev";
        let err = check_table("t", stack, &TableStatus::OwnedBy("Other".to_string())).unwrap_err();
        assert!(err.to_string().contains("Other"));
        assert!(check_table("t", stack, &TableStatus::Unmanaged).is_err());
    }
}
