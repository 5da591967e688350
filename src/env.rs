//! Environment resolution.
//!
//! Required variables are read once at startup. A missing variable is a
//! configuration error that halts synthesis; there is no fallback except for
//! `API_DOMAIN_NAME`, which may be empty in the `test` stage.

use std::collections::HashMap;
use tracing::debug;

use crate::error::{Result, SynthError};
use crate::stage::Stage;

pub const AWS_REGION: &str = "AWS_REGION";
pub const AWS_ACCOUNT_ID: &str = "AWS_ACCOUNT_ID";
pub const DEPLOY_STAGE: &str = "DEPLOY_STAGE";
pub const JWT_SECRET_KEY: &str = "JWT_SECRET_KEY";
pub const ZEPTO_MAIL_API_KEY: &str = "ZEPTO_MAIL_API_KEY";
pub const VAPID_PRIVATE_KEY: &str = "VAPID_PRIVATE_KEY";
pub const VAPID_PUBLIC_KEY: &str = "VAPID_PUBLIC_KEY";
pub const API_DOMAIN_NAME: &str = "API_DOMAIN_NAME";

/// Source of raw environment values.
#[derive(Debug, Clone, Default)]
pub struct EnvResolver {
    vars: HashMap<String, String>,
}

impl EnvResolver {
    pub fn from_process() -> Self {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: vars
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.vars.insert(key.to_string(), value.into());
    }

    /// Returns the value of `key`, treating an empty value as unset.
    pub fn get(&self, key: &str) -> Result<String> {
        match self.vars.get(key) {
            Some(value) if !value.is_empty() => Ok(value.clone()),
            _ => Err(SynthError::MissingEnv(key.to_string())),
        }
    }

    fn get_optional(&self, key: &str) -> Option<String> {
        self.vars.get(key).filter(|v| !v.is_empty()).cloned()
    }
}

/// Resolved deployment environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Env {
    pub region: String,
    pub account_id: String,
    pub stage: Stage,
    pub jwt_secret_key: String,
    pub zepto_mail_api_key: String,
    pub vapid_private_key: String,
    pub vapid_public_key: String,
    /// Empty only in the `test` stage.
    pub api_domain_name: String,
}

impl Env {
    pub fn resolve(resolver: &EnvResolver) -> Result<Self> {
        let stage: Stage = resolver.get(DEPLOY_STAGE)?.parse()?;

        let api_domain_name = match resolver.get_optional(API_DOMAIN_NAME) {
            Some(domain) => domain,
            None if stage == Stage::Test => String::new(),
            None => return Err(SynthError::MissingEnv(API_DOMAIN_NAME.to_string())),
        };

        let env = Self {
            region: resolver.get(AWS_REGION)?,
            account_id: resolver.get(AWS_ACCOUNT_ID)?,
            stage,
            jwt_secret_key: resolver.get(JWT_SECRET_KEY)?,
            zepto_mail_api_key: resolver.get(ZEPTO_MAIL_API_KEY)?,
            vapid_private_key: resolver.get(VAPID_PRIVATE_KEY)?,
            vapid_public_key: resolver.get(VAPID_PUBLIC_KEY)?,
            api_domain_name,
        };
        debug!(stage = %env.stage, region = %env.region, "Environment resolved");
        Ok(env)
    }

    pub fn has_api_domain(&self) -> bool {
        !self.api_domain_name.is_empty()
    }
}
