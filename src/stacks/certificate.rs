use crate::acm;
use crate::config::AppConfig;
use crate::error::Result;
use crate::registry::{self, ParameterKey};
use crate::template::{Stack, SynthesizedStack};

pub const STACK: &str = "Certificate";

/// Certificate for the custom API domain, published to the registry.
///
/// Only built when a domain is configured.
pub fn build(config: &AppConfig) -> Result<SynthesizedStack> {
    let mut stack = Stack::new(
        config.stack_name(STACK),
        format!("{} API domain certificate ({})", config.app_name, config.stage()),
    );

    let certificate_name = format!("{}/{}/api-domain-cert", config.app_name, config.stage());
    let arn = acm::declare_certificate(
        &mut stack,
        "ApiDomainCertificate",
        &config.env.api_domain_name,
        &certificate_name,
    )?;
    registry::publish(&mut stack, config, ParameterKey::ApiDomainCertArn, arn)?;

    stack.finish()
}
