use crate::apigateway::Authorization;
use crate::dynamodb::TableHandle;
use crate::error::Result;
use crate::lambda::FunctionDeclaration;

use super::auth::AuthOutputs;
use super::notifications::NotificationsOutputs;
use super::ServiceScope;

pub const SERVICE: &str = "SpacesService";
const ENTRY: &str = "../cmd/spaces/main.go";

pub fn declare(
    scope: &mut ServiceScope<'_>,
    main: &TableHandle,
    auth: &AuthOutputs,
    notifications: &NotificationsOutputs,
) -> Result<()> {
    let function = FunctionDeclaration::new(scope.config, SERVICE, ENTRY)
        .env("DDB_MAIN_TABLE_NAME", main.name().clone())
        .env("NOTIFICATIONS_QUEUE_URL", notifications.queue.url())
        .declare(scope.stack, SERVICE, scope.role)?;

    main.grant_read_write_data(scope.role);
    notifications.queue.grant_send_messages(scope.role);

    scope.route(
        "spaces",
        &function,
        Authorization::Custom(&auth.authorizer),
        false,
    )?;
    Ok(())
}
