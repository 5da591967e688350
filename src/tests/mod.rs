//! Template assertion suite.
//!
//! Synthesizes the whole app in memory for a stage and asserts over the
//! resulting templates. Nothing here talks to AWS.

pub mod helpers;

mod app;
