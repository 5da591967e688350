use serde_json::{json, Value};
use tracing::info;

use crate::error::Result;
use crate::iam::{PolicyStatement, Role};
use crate::stage::RemovalPolicy;
use crate::template::{intrinsic, Resource, Stack};

pub const VISIBILITY_TIMEOUT_SECS: u32 = 300;
pub const DELIVERY_DELAY_SECS: u32 = 1;
/// Deliveries before a message is parked in the dead-letter queue.
pub const MAX_RECEIVE_COUNT: u32 = 3;

const CONSUME_ACTIONS: [&str; 5] = [
    "sqs:ReceiveMessage",
    "sqs:ChangeMessageVisibility",
    "sqs:GetQueueUrl",
    "sqs:DeleteMessage",
    "sqs:GetQueueAttributes",
];

const SEND_ACTIONS: [&str; 3] = [
    "sqs:SendMessage",
    "sqs:GetQueueAttributes",
    "sqs:GetQueueUrl",
];

/// A work queue paired 1:1 with a dead-letter queue named `<name>-dlq`.
#[derive(Debug, Clone)]
pub struct QueueDeclaration {
    name: String,
    visibility_timeout_secs: u32,
    delivery_delay_secs: u32,
    max_receive_count: u32,
    removal: RemovalPolicy,
}

impl QueueDeclaration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            visibility_timeout_secs: VISIBILITY_TIMEOUT_SECS,
            delivery_delay_secs: DELIVERY_DELAY_SECS,
            max_receive_count: MAX_RECEIVE_COUNT,
            removal: RemovalPolicy::Delete,
        }
    }

    pub fn with_removal_policy(mut self, removal: RemovalPolicy) -> Self {
        self.removal = removal;
        self
    }

    pub fn dead_letter_queue_name(&self) -> String {
        format!("{}-dlq", self.name)
    }

    /// Declares the dead-letter queue and the queue under `scope`.
    pub fn declare(self, stack: &mut Stack, scope: &str) -> Result<QueueHandle> {
        let dlq_name = self.dead_letter_queue_name();
        let dlq_id = stack.add_resource(
            intrinsic::logical_id(&[scope, &dlq_name]),
            Resource::new(
                "AWS::SQS::Queue",
                json!({
                    "QueueName": dlq_name,
                    "VisibilityTimeout": self.visibility_timeout_secs,
                }),
            )?
            .with_removal_policy(self.removal),
        )?;

        let id = stack.add_resource(
            intrinsic::logical_id(&[scope, &self.name]),
            Resource::new(
                "AWS::SQS::Queue",
                json!({
                    "QueueName": self.name,
                    "VisibilityTimeout": self.visibility_timeout_secs,
                    "DelaySeconds": self.delivery_delay_secs,
                    "RedrivePolicy": {
                        "deadLetterTargetArn": intrinsic::get_att(&dlq_id, "Arn"),
                        "maxReceiveCount": self.max_receive_count,
                    },
                }),
            )?
            .with_removal_policy(self.removal),
        )?;
        info!("Queue '{}' declared with dead-letter queue '{}'", self.name, dlq_name);

        Ok(QueueHandle {
            logical_id: id,
            name: self.name,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueHandle {
    logical_id: String,
    name: String,
}

impl QueueHandle {
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arn(&self) -> Value {
        intrinsic::get_att(&self.logical_id, "Arn")
    }

    /// `Ref` on a queue yields its URL.
    pub fn url(&self) -> Value {
        intrinsic::reference(&self.logical_id)
    }

    pub fn grant_consume_messages(&self, role: &mut Role) {
        role.add_to_policy(PolicyStatement::allow(CONSUME_ACTIONS, vec![self.arn()]));
    }

    pub fn grant_send_messages(&self, role: &mut Role) {
        role.add_to_policy(PolicyStatement::allow(SEND_ACTIONS, vec![self.arn()]));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_is_paired_with_dead_letter_queue() {
        let mut stack = Stack::new("Test", "test");
        let queue = QueueDeclaration::new("App-Emails_dev")
            .declare(&mut stack, "EmailService")
            .unwrap();
        assert_eq!(queue.logical_id(), "EmailServiceAppEmailsdev");

        let template = stack.finish().unwrap().template;
        assert_eq!(template.resources_of_type("AWS::SQS::Queue").count(), 2);

        let dlq = template.resource("EmailServiceAppEmailsdevdlq").unwrap();
        assert_eq!(dlq.property("QueueName"), Some(&json!("App-Emails_dev-dlq")));
        assert_eq!(dlq.property("VisibilityTimeout"), Some(&json!(300)));
    }

    #[test]
    fn consume_grant_has_five_actions() {
        let mut role = Role::for_service("LambdaRole", "lambda.amazonaws.com");
        let queue = QueueHandle {
            logical_id: "Queue".to_string(),
            name: "queue".to_string(),
        };
        queue.grant_consume_messages(&mut role);
        let actions = role.statements()[0].actions();
        assert_eq!(actions.len(), 5);
        assert!(actions.iter().any(|a| a == "sqs:ReceiveMessage"));
        assert!(actions.iter().any(|a| a == "sqs:DeleteMessage"));
    }
}
