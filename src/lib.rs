//! CloudFormation synthesis for the TabsFlow backend.
//!
//! `app::synthesize` builds every stack for one stage from an `AppConfig`;
//! the resulting `Assembly` is written as JSON templates plus a manifest
//! for the deployment engine.

pub mod acm;
pub mod apigateway;
pub mod app;
pub mod config;
pub mod dynamodb;
pub mod env;
pub mod error;
pub mod iam;
pub mod lambda;
pub mod preflight;
pub mod registry;
pub mod sqs;
pub mod stacks;
pub mod stage;
pub mod template;
pub mod utils;

#[cfg(test)]
mod tests;
