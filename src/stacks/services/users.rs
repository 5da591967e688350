use crate::apigateway::Authorization;
use crate::dynamodb::TableHandle;
use crate::error::Result;
use crate::lambda::FunctionDeclaration;

use super::auth::AuthOutputs;
use super::email::EmailOutputs;
use super::ServiceScope;

pub const SERVICE: &str = "UsersService";
const ENTRY: &str = "../cmd/users/main.go";

pub fn declare(
    scope: &mut ServiceScope<'_>,
    main: &TableHandle,
    email: &EmailOutputs,
    auth: &AuthOutputs,
) -> Result<()> {
    let function = FunctionDeclaration::new(scope.config, SERVICE, ENTRY)
        .env("EMAIL_QUEUE_URL", email.queue.url())
        .env("DDB_MAIN_TABLE_NAME", main.name().clone())
        .declare(scope.stack, SERVICE, scope.role)?;

    main.grant_read_write_data(scope.role);
    email.queue.grant_send_messages(scope.role);

    scope.route(
        "users",
        &function,
        Authorization::Custom(&auth.authorizer),
        true,
    )?;
    Ok(())
}
