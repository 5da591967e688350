use crate::apigateway::{Authorization, RequestAuthorizer};
use crate::dynamodb::TableHandle;
use crate::error::Result;
use crate::lambda::FunctionDeclaration;

use super::email::EmailOutputs;
use super::ServiceScope;

pub const SERVICE: &str = "AuthService";
const ENTRY: &str = "../cmd/auth/main.go";
const AUTHORIZER_ENTRY: &str = "../cmd/auth/lambda_authorizer/main.go";
const AUTHORIZER_FUNCTION: &str = "Authorizer";
/// Header carrying the session cookie the authorizer validates.
const IDENTITY_HEADER: &str = "Cookies";

pub struct AuthOutputs {
    pub authorizer: RequestAuthorizer,
}

/// Sign-in endpoints plus the request authorizer shared by every gated route.
pub fn declare(
    scope: &mut ServiceScope<'_>,
    sessions: &TableHandle,
    email: &EmailOutputs,
) -> Result<AuthOutputs> {
    let config = scope.config;

    let function = FunctionDeclaration::new(config, SERVICE, ENTRY)
        .env("JWT_SECRET_KEY", config.env.jwt_secret_key.as_str())
        .env("EMAIL_QUEUE_URL", email.queue.url())
        .env("DDB_SESSIONS_TABLE_NAME", sessions.name().clone())
        .declare(scope.stack, SERVICE, scope.role)?;

    sessions.grant_read_write_data(scope.role);
    email.queue.grant_send_messages(scope.role);

    scope.route("auth", &function, Authorization::None, true)?;

    let authorizer_function = FunctionDeclaration::new(config, AUTHORIZER_FUNCTION, AUTHORIZER_ENTRY)
        .env("JWT_SECRET_KEY", config.env.jwt_secret_key.as_str())
        .env("DDB_SESSIONS_TABLE_NAME", sessions.name().clone())
        .declare(scope.stack, SERVICE, scope.role)?;

    let authorizer = scope.api.add_request_authorizer(
        scope.stack,
        SERVICE,
        &format!("{}-Authorizer", config.app_name),
        &authorizer_function,
        IDENTITY_HEADER,
    )?;
    authorizer_function.grant_invoke(scope.role);

    Ok(AuthOutputs { authorizer })
}
