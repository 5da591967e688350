use crate::apigateway::Authorization;
use crate::dynamodb::TableHandle;
use crate::error::Result;
use crate::lambda::FunctionDeclaration;

use super::auth::AuthOutputs;
use super::notifications::NotificationsOutputs;
use super::ServiceScope;

pub const SERVICE: &str = "NotesService";
const ENTRY: &str = "../cmd/notes/main.go";

pub fn declare(
    scope: &mut ServiceScope<'_>,
    main: &TableHandle,
    search_index: &TableHandle,
    auth: &AuthOutputs,
    notifications: &NotificationsOutputs,
) -> Result<()> {
    let function = FunctionDeclaration::new(scope.config, SERVICE, ENTRY)
        .env("DDB_MAIN_TABLE_NAME", main.name().clone())
        .env("DDB_SEARCH_INDEX_TABLE_NAME", search_index.name().clone())
        .env("NOTIFICATIONS_QUEUE_URL", notifications.queue.url())
        .declare(scope.stack, SERVICE, scope.role)?;

    main.grant_read_write_data(scope.role);
    search_index.grant_read_write_data(scope.role);
    notifications.queue.grant_send_messages(scope.role);

    scope.route(
        "notes",
        &function,
        Authorization::Custom(&auth.authorizer),
        false,
    )?;
    Ok(())
}
