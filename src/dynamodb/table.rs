use aws_sdk_dynamodb::types::{BillingMode, KeyType};
use serde_json::{json, Value};
use tracing::info;

use crate::dynamodb::KeyAttribute;
use crate::error::Result;
use crate::iam::{PolicyStatement, Role};
use crate::stage::{RemovalPolicy, StagePolicy};
use crate::template::{intrinsic, Resource, Stack};

const READ_WRITE_ACTIONS: [&str; 12] = [
    "dynamodb:BatchGetItem",
    "dynamodb:GetRecords",
    "dynamodb:GetShardIterator",
    "dynamodb:Query",
    "dynamodb:GetItem",
    "dynamodb:Scan",
    "dynamodb:ConditionCheckItem",
    "dynamodb:BatchWriteItem",
    "dynamodb:PutItem",
    "dynamodb:UpdateItem",
    "dynamodb:DeleteItem",
    "dynamodb:DescribeTable",
];

/// DynamoDB table declaration.
///
/// # Table Structure
///
/// - **Table Name**: unique within the account and region; callers derive it
///   from the app name, the logical table name and the stage.
/// - **Primary Key**: a partition key and a sort key.
/// - **TTL**: optional attribute holding an epoch expiry time.
///
/// Billing is always on-demand. Retention, deletion protection and
/// point-in-time recovery come from the stage policy.
///
/// # Example
///
/// ```
/// # use tabsflow_infra::dynamodb::{KeyAttribute, TableDeclaration};
/// # use tabsflow_infra::stage::Stage;
/// let table = TableDeclaration::new(
///     "TabsFlow-Sessions_dev",
///     KeyAttribute::string("PK"),
///     KeyAttribute::string("SK"),
/// )
/// .with_ttl("TTL")
/// .with_policy(&Stage::Dev.policy());
/// ```
#[derive(Debug, Clone)]
pub struct TableDeclaration {
    name: String,
    partition_key: KeyAttribute,
    sort_key: KeyAttribute,
    ttl_attribute: Option<String>,
    billing_mode: BillingMode,
    removal: RemovalPolicy,
    point_in_time_recovery: bool,
    deletion_protection: bool,
}

impl TableDeclaration {
    pub fn new(name: impl Into<String>, partition_key: KeyAttribute, sort_key: KeyAttribute) -> Self {
        Self {
            name: name.into(),
            partition_key,
            sort_key,
            ttl_attribute: None,
            billing_mode: BillingMode::PayPerRequest,
            removal: RemovalPolicy::Delete,
            point_in_time_recovery: false,
            deletion_protection: false,
        }
    }

    pub fn with_ttl(mut self, attribute: impl Into<String>) -> Self {
        self.ttl_attribute = Some(attribute.into());
        self
    }

    pub fn with_policy(mut self, policy: &StagePolicy) -> Self {
        self.removal = policy.removal;
        self.point_in_time_recovery = policy.point_in_time_recovery;
        self.deletion_protection = policy.deletion_protection;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn partition_key(&self) -> &KeyAttribute {
        &self.partition_key
    }

    pub fn sort_key(&self) -> &KeyAttribute {
        &self.sort_key
    }

    pub fn declare(self, stack: &mut Stack, logical_id: &str) -> Result<TableHandle> {
        let mut properties = json!({
            "TableName": self.name,
            "BillingMode": self.billing_mode.as_str(),
            "AttributeDefinitions": [
                self.partition_key.definition(),
                self.sort_key.definition(),
            ],
            "KeySchema": [
                self.partition_key.key_schema(KeyType::Hash),
                self.sort_key.key_schema(KeyType::Range),
            ],
            "DeletionProtectionEnabled": self.deletion_protection,
        });
        if self.point_in_time_recovery {
            properties["PointInTimeRecoverySpecification"] =
                json!({ "PointInTimeRecoveryEnabled": true });
        }
        if let Some(ttl) = &self.ttl_attribute {
            properties["TimeToLiveSpecification"] =
                json!({ "AttributeName": ttl, "Enabled": true });
        }

        let id = stack.add_resource(
            logical_id,
            Resource::new("AWS::DynamoDB::Table", properties)?.with_removal_policy(self.removal),
        )?;
        info!("Table '{}' declared ({:?})", self.name, self.removal);

        Ok(TableHandle {
            arn: intrinsic::get_att(&id, "Arn"),
            name: intrinsic::reference(&id),
        })
    }
}

/// Reference to a table, either declared in this stack or imported by ARN.
#[derive(Debug, Clone, PartialEq)]
pub struct TableHandle {
    arn: Value,
    name: Value,
}

impl TableHandle {
    /// Imports a table from its ARN; the name is the last segment of
    /// `arn:aws:dynamodb:<region>:<account>:table/<name>`.
    pub fn from_arn(arn: Value) -> Self {
        let resource = intrinsic::select(5, intrinsic::split(":", arn.clone()));
        let name = intrinsic::select(1, intrinsic::split("/", resource));
        Self { arn, name }
    }

    pub fn arn(&self) -> &Value {
        &self.arn
    }

    pub fn name(&self) -> &Value {
        &self.name
    }

    pub fn grant_read_write_data(&self, role: &mut Role) {
        role.add_to_policy(PolicyStatement::allow(
            READ_WRITE_ACTIONS,
            vec![
                self.arn.clone(),
                intrinsic::join("", vec![self.arn.clone(), json!("/index/*")]),
            ],
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::Stage;

    #[test]
    fn prod_table_is_protected() {
        let mut stack = Stack::new("Test", "test");
        TableDeclaration::new(
            "TabsFlow-Main_prod",
            KeyAttribute::string("PK"),
            KeyAttribute::string("SK"),
        )
        .with_policy(&Stage::Prod.policy())
        .declare(&mut stack, "MainTable")
        .unwrap();

        let template = stack.finish().unwrap().template;
        let table = template.resource("MainTable").unwrap();
        assert_eq!(table.deletion_policy, Some(RemovalPolicy::Retain));
        assert_eq!(table.property("DeletionProtectionEnabled"), Some(&json!(true)));
        assert_eq!(
            table.property("KeySchema"),
            Some(&json!([
                { "AttributeName": "PK", "KeyType": "HASH" },
                { "AttributeName": "SK", "KeyType": "RANGE" },
            ]))
        );
        assert_eq!(table.property("BillingMode"), Some(&json!("PAY_PER_REQUEST")));
    }

    #[test]
    fn imported_table_name_is_derived_from_arn() {
        let handle = TableHandle::from_arn(intrinsic::reference("MainTableArnParameter"));
        assert_eq!(
            handle.name(),
            &json!({ "Fn::Select": [1, { "Fn::Split": ["/", { "Fn::Select": [5, { "Fn::Split": [":", { "Ref": "MainTableArnParameter" }] }] }] }] })
        );
    }
}
