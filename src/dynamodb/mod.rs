//! # DynamoDB Module
//!
//! Table declarations for the stateful stack, and a thin SDK client used to
//! check the live account before deploying them.
//!
//! ## Components
//!
//! - `TableDeclaration`: a table's name, key schema and stage-driven policies,
//!   rendered as an `AWS::DynamoDB::Table` resource.
//! - `TableHandle`: the ARN and name of a declared or imported table, with
//!   read/write grants.
//! - `KeyAttribute`: key schema building block.
//! - `DynamoDb`: SDK wrapper for the preflight collision check.
//!
//! ## Usage
//!
//! The preflight check needs AWS credentials in the environment:
//!
//! - `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`, `AWS_REGION`
//! - optionally `AWS_SESSION_TOKEN` and `AWS_ENDPOINT_URL`
//!
//! Declarations need nothing but the app config.

mod client;
mod schema;
mod table;

pub use client::DynamoDb;
pub use schema::KeyAttribute;
pub use table::{TableDeclaration, TableHandle};
