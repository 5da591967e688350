//! Cross-stack handle passing through the SSM parameter store.
//!
//! Synthesis happens in two phases. Producer stacks declare an
//! `AWS::SSM::Parameter` per handle and return a `Publication` for it; the
//! app records those in a `Registry`. Only then are consumer stacks built:
//! `Registry::resolve` turns a key into a deploy-time parameter lookup and
//! makes the consumer depend on the producer. Resolving a key nobody
//! published is an error, never an empty value.

use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

use crate::config::AppConfig;
use crate::error::{Result, SynthError};
use crate::template::{intrinsic, Parameter, Resource, Stack};

/// Registry entries shared between stacks. Every consumer must agree on
/// these names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ParameterKey {
    MainTableArn,
    SessionsTableArn,
    SearchIndexTableArn,
    ApiDomainCertArn,
}

impl ParameterKey {
    pub fn as_str(self) -> &'static str {
        match self {
            ParameterKey::MainTableArn => "MainTableArn",
            ParameterKey::SessionsTableArn => "SessionsTableArn",
            ParameterKey::SearchIndexTableArn => "SearchIndexTableArn",
            ParameterKey::ApiDomainCertArn => "ApiDomainCertArn",
        }
    }

    /// Stage-scoped parameter name: `/<App>/<stage>/<Key>`.
    pub fn path(self, config: &AppConfig) -> String {
        format!("/{}/{}/{}", config.app_name, config.stage(), self.as_str())
    }
}

impl fmt::Display for ParameterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registry write a stack performs when it is deployed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Publication {
    pub key: ParameterKey,
    pub path: String,
    pub stack: String,
}

/// Declares the parameter holding `value` in the producer `stack`.
pub fn publish(
    stack: &mut Stack,
    config: &AppConfig,
    key: ParameterKey,
    value: Value,
) -> Result<()> {
    let path = key.path(config);
    stack.add_resource(
        format!("{key}Parameter"),
        Resource::new(
            "AWS::SSM::Parameter",
            json!({
                "Name": path,
                "Type": "String",
                "Tier": "Standard",
                "Value": value,
            }),
        )?,
    )?;
    debug!(stack = %stack.name(), "Publishing {}", path);

    let publication = Publication {
        key,
        path,
        stack: stack.name().to_string(),
    };
    stack.record_publication(publication);
    Ok(())
}

/// Single-writer, multi-reader view of everything producers published.
#[derive(Debug, Default)]
pub struct Registry {
    published: BTreeMap<ParameterKey, Publication>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a producer's publication; a key has exactly one writer.
    pub fn record(&mut self, publication: Publication) -> Result<()> {
        if let Some(existing) = self.published.get(&publication.key) {
            return Err(SynthError::DuplicatePublisher {
                key: publication.key.to_string(),
                stack: existing.stack.clone(),
            });
        }
        info!(
            "Registry parameter {} published by {}",
            publication.path, publication.stack
        );
        self.published.insert(publication.key, publication);
        Ok(())
    }

    pub fn publisher(&self, key: ParameterKey) -> Option<&str> {
        self.published.get(&key).map(|p| p.stack.as_str())
    }

    /// Resolves `key` in the consumer `stack`.
    ///
    /// The value is read by CloudFormation at deploy time through an
    /// `AWS::SSM::Parameter::Value<String>` parameter; the consumer is made
    /// to depend on the publishing stack so the write is visible first.
    pub fn resolve(&self, stack: &mut Stack, key: ParameterKey) -> Result<Value> {
        let publication = self
            .published
            .get(&key)
            .ok_or_else(|| SynthError::UnpublishedParameter(key.to_string()))?;

        let id = format!("SsmParameterValue{key}");
        if !stack.has_parameter(&id) {
            stack.add_parameter(
                id.clone(),
                Parameter {
                    parameter_type: "AWS::SSM::Parameter::Value<String>".to_string(),
                    default: Some(publication.path.clone()),
                    description: Some(format!("{key} published by {}", publication.stack)),
                },
            )?;
        }
        stack.add_dependency(publication.stack.clone());
        debug!(stack = %stack.name(), "Resolved {}", publication.path);

        Ok(intrinsic::reference(&id))
    }
}
