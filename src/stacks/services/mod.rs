//! The service stack: one REST API, one shared Lambda execution role and the
//! service modules wired onto them.
//!
//! Modules are declared in dependency order. Each returns the handles later
//! modules need (the email queue, the authorizer, the notifications queue),
//! so a module can only be declared once its producers exist.

pub mod auth;
pub mod email;
pub mod notes;
pub mod notifications;
pub mod spaces;
pub mod users;

use tracing::info;

use crate::apigateway::{Authorization, CorsOptions, RestApi};
use crate::config::AppConfig;
use crate::dynamodb::TableHandle;
use crate::error::Result;
use crate::iam::Role;
use crate::lambda::FunctionHandle;
use crate::registry::{ParameterKey, Registry};
use crate::template::{Stack, SynthesizedStack};

pub const STACK: &str = "Service";

/// Logical id of the execution role shared by every function.
pub const LAMBDA_ROLE: &str = "LambdaRole";

const LAMBDA_BASIC_EXECUTION_POLICY: &str = "service-role/AWSLambdaBasicExecutionRole";

/// Everything a service module declares into.
pub struct ServiceScope<'a> {
    pub config: &'a AppConfig,
    pub stack: &'a mut Stack,
    pub role: &'a mut Role,
    pub api: &'a mut RestApi,
}

impl ServiceScope<'_> {
    /// Adds `/<path_part>` and `/<path_part>/{proxy+}`, routing `ANY` on the
    /// proxy (and on the base resource too when `include_base` is set).
    fn route(
        &mut self,
        path_part: &str,
        function: &FunctionHandle,
        authorization: Authorization<'_>,
        include_base: bool,
    ) -> Result<()> {
        let root = self.api.root();
        let base = self.api.add_resource(self.stack, &root, path_part)?;
        if include_base {
            self.api
                .add_method(self.stack, &base, "ANY", function, authorization)?;
        }
        let proxy = self.api.add_proxy(self.stack, &base)?;
        self.api
            .add_method(self.stack, &proxy, "ANY", function, authorization)
    }
}

/// Tables the service stack imports from the registry.
#[derive(Debug, Clone)]
pub struct SharedTables {
    pub main: TableHandle,
    pub sessions: TableHandle,
    pub search_index: TableHandle,
}

impl SharedTables {
    fn resolve(registry: &Registry, stack: &mut Stack) -> Result<Self> {
        Ok(Self {
            main: TableHandle::from_arn(registry.resolve(stack, ParameterKey::MainTableArn)?),
            sessions: TableHandle::from_arn(
                registry.resolve(stack, ParameterKey::SessionsTableArn)?,
            ),
            search_index: TableHandle::from_arn(
                registry.resolve(stack, ParameterKey::SearchIndexTableArn)?,
            ),
        })
    }
}

pub fn build(config: &AppConfig, registry: &Registry) -> Result<SynthesizedStack> {
    let mut stack = Stack::new(
        config.stack_name(STACK),
        format!("{} services ({})", config.app_name, config.stage()),
    );

    let tables = SharedTables::resolve(registry, &mut stack)?;

    let mut role = Role::for_service(LAMBDA_ROLE, "lambda.amazonaws.com")
        .with_managed_policy(LAMBDA_BASIC_EXECUTION_POLICY);

    let mut api = RestApi::declare(
        &mut stack,
        &format!("{}-{}", config.app_name, config.stage()),
        config.stage().as_str(),
        config.policy.endpoint_type,
        Some(CorsOptions {
            allow_origins: config.allowed_origins.clone(),
        }),
    )?;
    if config.env.has_api_domain() {
        let certificate_arn = registry.resolve(&mut stack, ParameterKey::ApiDomainCertArn)?;
        api.with_custom_domain(&config.env.api_domain_name, certificate_arn);
    }

    let mut scope = ServiceScope {
        config,
        stack: &mut stack,
        role: &mut role,
        api: &mut api,
    };

    let email = email::declare(&mut scope)?;
    let auth = auth::declare(&mut scope, &tables.sessions, &email)?;
    let notifications = notifications::declare(&mut scope, &tables.main, &auth)?;
    users::declare(&mut scope, &tables.main, &email, &auth)?;
    spaces::declare(&mut scope, &tables.main, &auth, &notifications)?;
    notes::declare(
        &mut scope,
        &tables.main,
        &tables.search_index,
        &auth,
        &notifications,
    )?;

    api.finish(&mut stack)?;
    role.declare(&mut stack)?;

    info!("Service stack declared for stage {}", config.stage());
    stack.finish()
}
