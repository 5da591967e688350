use serde_json::{json, Value};

use crate::config::AppConfig;
use crate::error::Result;
use crate::iam::{PolicyStatement, Principal, Role};
use crate::template::{intrinsic, Resource, Stack, SynthesizedStack};

pub const STACK: &str = "GithubOIDC";

const STS_AUDIENCE: &str = "sts.amazonaws.com";
const MAX_SESSION_SECS: u32 = 3600;

/// Services the CI pipeline provisions.
const DEPLOYMENT_ACTIONS: [&str; 15] = [
    "cloudformation:*",
    "s3:*",
    "lambda:*",
    "apigateway:*",
    "dynamodb:*",
    "sqs:*",
    "scheduler:*",
    "events:*",
    "logs:*",
    "acm:*",
    "cloudwatch:*",
    "ssm:*",
    "ecr:*",
    "ec2:*",
    "iam:*",
];

/// Conditions restricting web identity assumption to one repository.
pub fn trust_conditions(config: &AppConfig) -> Value {
    let github = &config.github;
    json!({
        "StringLike": {
            format!("{}:sub", github.domain): format!("repo:{}/{}:*", github.owner, github.repo),
            format!("{}:aud", github.domain): STS_AUDIENCE,
        }
    })
}

/// OIDC trust between GitHub Actions and the account, and the role the
/// deployment workflow assumes. Account-wide, so the stack is not
/// stage-scoped.
pub fn build(config: &AppConfig) -> Result<SynthesizedStack> {
    let github = &config.github;
    let mut stack = Stack::new(
        format!("{}-{}", config.app_name, STACK),
        format!("{} GitHub Actions deployment trust", config.app_name),
    );

    let provider_id = stack.add_resource(
        "GithubProvider",
        Resource::new(
            "AWS::IAM::OIDCProvider",
            json!({
                "Url": format!("https://{}", github.domain),
                "ClientIdList": [STS_AUDIENCE],
                "ThumbprintList": github.thumbprints,
            }),
        )?,
    )?;

    Role::new(
        intrinsic::logical_id(&[github.role_name]),
        Principal::WebIdentity {
            provider: intrinsic::reference(&provider_id),
            conditions: trust_conditions(config),
        },
    )
    .with_role_name(github.role_name)
    .with_description(
        "This role is used via GitHub Actions to deploy the synthesized templates to the target AWS account",
    )
    .with_max_session_secs(MAX_SESSION_SECS)
    .with_inline_policy(
        "github-actions-deployment-policy",
        vec![PolicyStatement::allow(DEPLOYMENT_ACTIONS, vec![json!("*")])],
    )
    .declare(&mut stack)?;

    stack.finish()
}
