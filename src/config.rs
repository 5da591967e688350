use crate::env::Env;
use crate::stage::{Stage, StagePolicy};

pub const APP_NAME: &str = "TabsFlow";

/// DynamoDB naming shared by the stateful and service stacks.
#[derive(Debug, Clone)]
pub struct DynamoDbConfig {
    pub main_table: &'static str,
    pub sessions_table: &'static str,
    pub search_index_table: &'static str,
    pub partition_key: &'static str,
    pub sort_key: &'static str,
    pub ttl_attribute: &'static str,
}

/// Defaults applied to every Lambda function.
#[derive(Debug, Clone)]
pub struct LambdaConfig {
    pub runtime: &'static str,
    pub architecture: &'static str,
    pub handler: &'static str,
    pub timeout_secs: u32,
    pub memory_mb: u32,
}

/// Trust settings for the CI deployment role.
#[derive(Debug, Clone)]
pub struct GithubOidcConfig {
    pub domain: &'static str,
    pub owner: &'static str,
    pub repo: &'static str,
    pub role_name: &'static str,
    pub thumbprints: &'static [&'static str],
}

/// Configuration built once at process entry and passed by reference to
/// every stack builder.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub env: Env,
    pub policy: StagePolicy,
    pub dynamodb: DynamoDbConfig,
    pub lambda: LambdaConfig,
    pub github: GithubOidcConfig,
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn new(env: Env) -> Self {
        Self::with_app_name(APP_NAME, env)
    }

    pub fn with_app_name(app_name: impl Into<String>, env: Env) -> Self {
        let policy = env.stage.policy();
        Self {
            app_name: app_name.into(),
            env,
            policy,
            dynamodb: DynamoDbConfig {
                main_table: "Main",
                sessions_table: "Sessions",
                search_index_table: "SearchIndex",
                partition_key: "PK",
                sort_key: "SK",
                ttl_attribute: "TTL",
            },
            lambda: LambdaConfig {
                runtime: "provided.al2",
                architecture: "arm64",
                handler: "bootstrap",
                timeout_secs: 30,
                memory_mb: 128,
            },
            github: GithubOidcConfig {
                domain: "token.actions.githubusercontent.com",
                owner: "manishMandal02",
                repo: "tabsflow-backend",
                role_name: "TabsFlow-GithubActionsDeployRole",
                thumbprints: &[
                    "6938fd4d98bab03faadb97b34396831e3780aea1",
                    "1c58a3a8518e8759bf075b76b750d4f2df264fcd",
                ],
            },
            allowed_origins: [
                "chrome-extension://eidcobgdojgmpdkaajefdgniiaklpfno",
                "https://local.tabsflow.com:3000",
                "https://tabsflow.com",
                "https://app.tabsflow.com",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }

    pub fn stage(&self) -> Stage {
        self.env.stage
    }

    /// `<App>-<Logical>_<stage>`, unique per stage so parallel stage
    /// deployments never collide.
    pub fn resource_name(&self, logical: &str) -> String {
        format!("{}-{}_{}", self.app_name, logical, self.env.stage)
    }

    /// `<Service>_<stage>`.
    pub fn function_name(&self, service: &str) -> String {
        format!("{}_{}", service, self.env.stage)
    }

    pub fn stack_name(&self, stack: &str) -> String {
        format!("{}-{}-{}", self.app_name, stack, self.env.stage)
    }
}

#[cfg(test)]
mod tests {
    use crate::stage::Stage;
    use crate::tests::helpers::app_config;

    #[test]
    fn names_are_stage_scoped() {
        let config = app_config(Stage::Dev);
        assert_eq!(config.resource_name("Emails"), "TabsFlow-Emails_dev");
        assert_eq!(config.function_name("UsersService"), "UsersService_dev");
        assert_eq!(config.stack_name("Service"), "TabsFlow-Service-dev");
    }

    #[test]
    fn policy_is_computed_from_stage() {
        let config = app_config(Stage::Prod);
        assert_eq!(config.policy, Stage::Prod.policy());
        assert_eq!(config.allowed_origins.len(), 4);
    }
}
