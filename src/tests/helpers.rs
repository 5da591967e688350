use serde_json::Value;
use std::collections::BTreeMap;

use crate::app::{self, Assembly};
use crate::config::AppConfig;
use crate::env::{self, Env, EnvResolver};
use crate::stage::Stage;
use crate::template::{Resource, Template};

pub const DOMAIN: &str = "api.tabsflow.com";

/// Every required variable for `stage`, with the API domain only when given.
pub fn resolver(stage: Stage, domain: Option<&str>) -> EnvResolver {
    let mut vars = vec![
        (env::AWS_REGION, "ap-south-1"),
        (env::AWS_ACCOUNT_ID, "123456789012"),
        (env::DEPLOY_STAGE, stage.as_str()),
        (env::JWT_SECRET_KEY, "jwt-secret"),
        (env::ZEPTO_MAIL_API_KEY, "zepto-key"),
        (env::VAPID_PRIVATE_KEY, "vapid-private"),
        (env::VAPID_PUBLIC_KEY, "vapid-public"),
    ];
    if let Some(domain) = domain {
        vars.push((env::API_DOMAIN_NAME, domain));
    }
    EnvResolver::from_vars(vars)
}

/// Config for `stage`; every stage but `test` gets the API domain.
pub fn app_config(stage: Stage) -> AppConfig {
    let domain = (stage != Stage::Test).then_some(DOMAIN);
    let env = Env::resolve(&resolver(stage, domain)).unwrap();
    AppConfig::new(env)
}

pub fn synthesize(stage: Stage) -> (AppConfig, Assembly) {
    let config = app_config(stage);
    let assembly = app::synthesize(&config).unwrap();
    (config, assembly)
}

pub fn template<'a>(assembly: &'a Assembly, config: &AppConfig, stack: &str) -> &'a Template {
    let name = config.stack_name(stack);
    &assembly
        .stack(&name)
        .unwrap_or_else(|| panic!("stack {name} not synthesized"))
        .template
}

pub fn function<'a>(template: &'a Template, name: &str) -> &'a Resource {
    template
        .resources_of_type("AWS::Lambda::Function")
        .find(|(_, r)| r.property("FunctionName") == Some(&Value::from(name)))
        .map(|(_, r)| r)
        .unwrap_or_else(|| panic!("function {name} not declared"))
}

pub fn function_env<'a>(template: &'a Template, name: &str) -> &'a serde_json::Map<String, Value> {
    function(template, name)
        .property("Environment")
        .and_then(|e| e["Variables"].as_object())
        .unwrap_or_else(|| panic!("function {name} has no environment"))
}

pub fn queue<'a>(template: &'a Template, name: &str) -> (&'a str, &'a Resource) {
    template
        .resources_of_type("AWS::SQS::Queue")
        .find(|(_, r)| r.property("QueueName") == Some(&Value::from(name)))
        .unwrap_or_else(|| panic!("queue {name} not declared"))
}

/// Statements of the policy attached to role `role_id`.
pub fn role_statements<'a>(template: &'a Template, role_id: &str) -> &'a Vec<Value> {
    policy_statements(template, &format!("{role_id}DefaultPolicy"))
}

/// Statements of a named policy resource.
pub fn policy_statements<'a>(template: &'a Template, policy_id: &str) -> &'a Vec<Value> {
    template
        .resource(policy_id)
        .and_then(|p| p.property("PolicyDocument"))
        .and_then(|d| d["Statement"].as_array())
        .unwrap_or_else(|| panic!("{policy_id} has no statements"))
}

/// Actions of a statement, whether rendered as a scalar or a list.
pub fn actions(statement: &Value) -> Vec<&str> {
    match &statement["Action"] {
        Value::String(action) => vec![action.as_str()],
        Value::Array(actions) => actions.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

/// Full path of an API Gateway resource, walking `ParentId` references up
/// to the root.
pub fn resource_path(template: &Template, resource_id: &Value) -> String {
    let Some(id) = resource_id["Ref"].as_str() else {
        return "/".to_string();
    };
    let resource = template.resource(id).unwrap();
    let part = resource.property("PathPart").and_then(Value::as_str).unwrap();
    let parent = resource_path(template, &resource.properties["ParentId"]);
    match parent.as_str() {
        "/" => format!("/{part}"),
        parent => format!("{parent}/{part}"),
    }
}

/// Non-preflight methods keyed by `"<HTTP method> <path>"`.
pub fn routes(template: &Template) -> BTreeMap<String, &Resource> {
    template
        .resources_of_type("AWS::ApiGateway::Method")
        .filter(|(_, r)| r.property("HttpMethod") != Some(&Value::from("OPTIONS")))
        .map(|(_, r)| {
            let method = r.properties["HttpMethod"].as_str().unwrap_or_default();
            let path = resource_path(template, &r.properties["ResourceId"]);
            (format!("{method} {path}"), r)
        })
        .collect()
}
