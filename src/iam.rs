use serde_json::{json, Value};

use crate::error::Result;
use crate::template::{intrinsic, Resource, Stack};

pub const POLICY_VERSION: &str = "2012-10-17";

/// A single `Allow` statement.
///
/// Statements are only ever scoped to named resources; the one exception is
/// the CI deployment role, which is declared with explicit wildcards.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyStatement {
    actions: Vec<String>,
    resources: Vec<Value>,
}

impl PolicyStatement {
    pub fn allow<I, S>(actions: I, resources: Vec<Value>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            actions: actions.into_iter().map(Into::into).collect(),
            resources,
        }
    }

    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    /// Renders the statement the way IAM documents are usually written: a
    /// lone action or resource is a scalar, several are a list.
    pub fn to_value(&self) -> Value {
        let action = match self.actions.as_slice() {
            [single] => json!(single),
            many => json!(many),
        };
        let resource = match self.resources.as_slice() {
            [single] => single.clone(),
            many => json!(many),
        };
        json!({ "Action": action, "Effect": "Allow", "Resource": resource })
    }
}

pub fn policy_document(statements: &[PolicyStatement]) -> Value {
    json!({
        "Statement": statements.iter().map(PolicyStatement::to_value).collect::<Vec<_>>(),
        "Version": POLICY_VERSION,
    })
}

/// Who may assume a role.
#[derive(Debug, Clone)]
pub enum Principal {
    Service(String),
    /// Web identity federation through an OIDC provider, gated by conditions.
    WebIdentity { provider: Value, conditions: Value },
}

impl Principal {
    fn assume_role_policy(&self) -> Value {
        let statement = match self {
            Principal::Service(service) => json!({
                "Action": "sts:AssumeRole",
                "Effect": "Allow",
                "Principal": { "Service": service },
            }),
            Principal::WebIdentity {
                provider,
                conditions,
            } => json!({
                "Action": "sts:AssumeRoleWithWebIdentity",
                "Condition": conditions,
                "Effect": "Allow",
                "Principal": { "Federated": provider },
            }),
        };
        json!({ "Statement": [statement], "Version": POLICY_VERSION })
    }
}

/// An IAM role that collects grants while the stack is being built and is
/// emitted once, with its statements in a `<Role>DefaultPolicy`.
#[derive(Debug, Clone)]
pub struct Role {
    logical_id: String,
    principal: Principal,
    role_name: Option<String>,
    description: Option<String>,
    max_session_secs: Option<u32>,
    managed_policies: Vec<Value>,
    inline_policies: Vec<(String, Vec<PolicyStatement>)>,
    statements: Vec<PolicyStatement>,
    invoke_statements: Vec<PolicyStatement>,
}

impl Role {
    pub fn new(logical_id: impl Into<String>, principal: Principal) -> Self {
        Self {
            logical_id: logical_id.into(),
            principal,
            role_name: None,
            description: None,
            max_session_secs: None,
            managed_policies: Vec::new(),
            inline_policies: Vec::new(),
            statements: Vec::new(),
            invoke_statements: Vec::new(),
        }
    }

    pub fn for_service(logical_id: impl Into<String>, service: &str) -> Self {
        Self::new(logical_id, Principal::Service(service.to_string()))
    }

    pub fn with_role_name(mut self, name: impl Into<String>) -> Self {
        self.role_name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_max_session_secs(mut self, secs: u32) -> Self {
        self.max_session_secs = Some(secs);
        self
    }

    /// Attaches an AWS managed policy, e.g. `service-role/AWSLambdaBasicExecutionRole`.
    pub fn with_managed_policy(mut self, name: &str) -> Self {
        self.managed_policies.push(intrinsic::managed_policy_arn(name));
        self
    }

    pub fn with_inline_policy(
        mut self,
        name: impl Into<String>,
        statements: Vec<PolicyStatement>,
    ) -> Self {
        self.inline_policies.push((name.into(), statements));
        self
    }

    pub fn add_to_policy(&mut self, statement: PolicyStatement) {
        if !self.statements.contains(&statement) {
            self.statements.push(statement);
        }
    }

    /// Grants on functions go into a separate `<Role>InvokePolicy` that no
    /// function waits on. A function executing as this role and granted to
    /// it would otherwise depend on itself through the default policy.
    pub fn add_to_invoke_policy(&mut self, statement: PolicyStatement) {
        if !self.invoke_statements.contains(&statement) {
            self.invoke_statements.push(statement);
        }
    }

    pub fn statements(&self) -> &[PolicyStatement] {
        &self.statements
    }

    pub fn invoke_statements(&self) -> &[PolicyStatement] {
        &self.invoke_statements
    }

    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    pub fn default_policy_id(&self) -> String {
        format!("{}DefaultPolicy", self.logical_id)
    }

    pub fn invoke_policy_id(&self) -> String {
        format!("{}InvokePolicy", self.logical_id)
    }

    pub fn arn(&self) -> Value {
        intrinsic::get_att(&self.logical_id, "Arn")
    }

    /// Emits the role, plus its default and invoke policies when they hold
    /// any grants.
    pub fn declare(self, stack: &mut Stack) -> Result<()> {
        let mut properties = json!({
            "AssumeRolePolicyDocument": self.principal.assume_role_policy(),
        });
        if !self.managed_policies.is_empty() {
            properties["ManagedPolicyArns"] = json!(self.managed_policies);
        }
        if let Some(name) = &self.role_name {
            properties["RoleName"] = json!(name);
        }
        if let Some(description) = &self.description {
            properties["Description"] = json!(description);
        }
        if let Some(secs) = self.max_session_secs {
            properties["MaxSessionDuration"] = json!(secs);
        }
        if !self.inline_policies.is_empty() {
            properties["Policies"] = self
                .inline_policies
                .iter()
                .map(|(name, statements)| {
                    json!({ "PolicyDocument": policy_document(statements), "PolicyName": name })
                })
                .collect();
        }
        stack.add_resource(
            self.logical_id.clone(),
            Resource::new("AWS::IAM::Role", properties)?,
        )?;

        for (policy_id, statements) in [
            (self.default_policy_id(), &self.statements),
            (self.invoke_policy_id(), &self.invoke_statements),
        ] {
            if statements.is_empty() {
                continue;
            }
            stack.add_resource(
                policy_id.clone(),
                Resource::new(
                    "AWS::IAM::Policy",
                    json!({
                        "PolicyDocument": policy_document(statements),
                        "PolicyName": policy_id,
                        "Roles": [intrinsic::reference(&self.logical_id)],
                    }),
                )?,
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_action_renders_as_scalar() {
        let statement = PolicyStatement::allow(["iam:PassRole"], vec![json!("arn:role")]);
        assert_eq!(
            statement.to_value(),
            json!({ "Action": "iam:PassRole", "Effect": "Allow", "Resource": "arn:role" })
        );
    }

    #[test]
    fn duplicate_grants_are_collapsed() {
        let mut role = Role::for_service("LambdaRole", "lambda.amazonaws.com");
        let statement = PolicyStatement::allow(["sqs:SendMessage"], vec![json!("arn:queue")]);
        role.add_to_policy(statement.clone());
        role.add_to_policy(statement);
        assert_eq!(role.statements().len(), 1);
    }

    #[test]
    fn role_without_grants_has_no_default_policy() {
        let mut stack = Stack::new("Test", "test");
        Role::for_service("SchedulerRole", "scheduler.amazonaws.com")
            .declare(&mut stack)
            .unwrap();
        let template = stack.finish().unwrap().template;
        assert!(template.resource("SchedulerRole").is_some());
        assert!(template.resource("SchedulerRoleDefaultPolicy").is_none());
    }

    #[test]
    fn invoke_grants_get_their_own_policy() {
        let mut stack = Stack::new("Test", "test");
        let mut role = Role::for_service("LambdaRole", "lambda.amazonaws.com");
        role.add_to_policy(PolicyStatement::allow(["sqs:SendMessage"], vec![json!("arn:queue")]));
        role.add_to_invoke_policy(PolicyStatement::allow(
            ["lambda:InvokeFunction"],
            vec![json!("arn:function")],
        ));
        role.declare(&mut stack).unwrap();

        let template = stack.finish().unwrap().template;
        let invoke = template.resource("LambdaRoleInvokePolicy").unwrap();
        assert_eq!(
            invoke.properties["PolicyDocument"]["Statement"][0]["Action"],
            json!("lambda:InvokeFunction")
        );
        let default = template.resource("LambdaRoleDefaultPolicy").unwrap();
        assert_eq!(
            default.properties["PolicyDocument"]["Statement"].as_array().unwrap().len(),
            1
        );
    }
}
