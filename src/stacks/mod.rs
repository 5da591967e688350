//! Stack builders. Each takes the app config (and, for consumers, the
//! registry) and returns a finished, immutable `SynthesizedStack`.

pub mod certificate;
pub mod github_oidc;
pub mod services;
pub mod stateful;
