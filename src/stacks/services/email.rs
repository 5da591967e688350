use crate::error::Result;
use crate::lambda::FunctionDeclaration;
use crate::sqs::{QueueDeclaration, QueueHandle};
use crate::stage::Stage;

use super::ServiceScope;

pub const SERVICE: &str = "EmailService";
const ENTRY: &str = "../cmd/email/main.go";

pub struct EmailOutputs {
    pub queue: QueueHandle,
}

/// Outbound email: a queue drained by the email function.
pub fn declare(scope: &mut ServiceScope<'_>) -> Result<EmailOutputs> {
    let config = scope.config;

    let queue = QueueDeclaration::new(config.resource_name("Emails"))
        .with_removal_policy(config.policy.removal)
        .declare(scope.stack, SERVICE)?;

    // Test deployments never send real mail.
    let api_key = match config.stage() {
        Stage::Test => String::new(),
        _ => config.env.zepto_mail_api_key.clone(),
    };

    let function = FunctionDeclaration::new(config, SERVICE, ENTRY)
        .env("ZEPTO_MAIL_API_KEY", api_key)
        .env("EMAIL_QUEUE_URL", queue.url())
        .declare(scope.stack, SERVICE, scope.role)?;

    queue.grant_consume_messages(scope.role);
    function.add_sqs_event_source(scope.stack, &queue)?;

    Ok(EmailOutputs { queue })
}
