use crate::apigateway::Authorization;
use crate::dynamodb::TableHandle;
use crate::error::Result;
use crate::iam::{PolicyStatement, Role};
use crate::lambda::FunctionDeclaration;
use crate::sqs::{QueueDeclaration, QueueHandle};
use crate::template::intrinsic;

use super::auth::AuthOutputs;
use super::ServiceScope;

pub const SERVICE: &str = "NotificationsService";
const ENTRY: &str = "../cmd/notifications/main.go";

const SCHEDULER_ACTIONS: [&str; 6] = [
    "scheduler:CreateSchedule",
    "scheduler:DeleteSchedule",
    "scheduler:GetSchedule",
    "scheduler:UpdateSchedule",
    "scheduler:ListSchedules",
    "iam:PassRole",
];

pub struct NotificationsOutputs {
    pub queue: QueueHandle,
}

/// Push notifications: a queue fed by other services and by EventBridge
/// Scheduler, drained by the notifications function.
pub fn declare(
    scope: &mut ServiceScope<'_>,
    main: &TableHandle,
    auth: &AuthOutputs,
) -> Result<NotificationsOutputs> {
    let config = scope.config;

    let queue = QueueDeclaration::new(config.resource_name("Notifications"))
        .with_removal_policy(config.policy.removal)
        .declare(scope.stack, SERVICE)?;

    // Scheduler may only enqueue into this one queue.
    let mut scheduler_role = Role::for_service(
        intrinsic::logical_id(&[SERVICE, "SchedulerRole"]),
        "scheduler.amazonaws.com",
    )
    .with_description("Role that EventBridge Scheduler can assume to execute tasks");
    queue.grant_send_messages(&mut scheduler_role);

    let function = FunctionDeclaration::new(config, SERVICE, ENTRY)
        .env("DDB_MAIN_TABLE_NAME", main.name().clone())
        .env("NOTIFICATIONS_QUEUE_ARN", queue.arn())
        .env("NOTIFICATIONS_QUEUE_URL", queue.url())
        .env("SCHEDULER_ROLE_ARN", scheduler_role.arn())
        .env("VAPID_PRIVATE_KEY", config.env.vapid_private_key.as_str())
        .env("VAPID_PUBLIC_KEY", config.env.vapid_public_key.as_str())
        .declare(scope.stack, SERVICE, scope.role)?;

    scope.role.add_to_policy(PolicyStatement::allow(
        ["iam:PassRole"],
        vec![scheduler_role.arn()],
    ));
    scope.role.add_to_policy(PolicyStatement::allow(
        SCHEDULER_ACTIONS,
        vec![intrinsic::sub(
            "arn:${AWS::Partition}:scheduler:${AWS::Region}:${AWS::AccountId}:schedule/*",
        )],
    ));
    queue.grant_consume_messages(scope.role);
    queue.grant_send_messages(scope.role);
    main.grant_read_write_data(scope.role);

    function.add_sqs_event_source(scope.stack, &queue)?;
    scheduler_role.declare(scope.stack)?;

    scope.route(
        "notifications",
        &function,
        Authorization::Custom(&auth.authorizer),
        false,
    )?;

    Ok(NotificationsOutputs { queue })
}
