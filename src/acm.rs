use serde_json::{json, Value};
use tracing::info;

use crate::error::Result;
use crate::template::{intrinsic, Resource, Stack};

/// Declares an ACM certificate for `domain_name`, validated by email to the
/// domain's registered contacts. `Ref` on the certificate yields its ARN.
pub fn declare_certificate(
    stack: &mut Stack,
    logical_id: &str,
    domain_name: &str,
    certificate_name: &str,
) -> Result<Value> {
    let id = stack.add_resource(
        logical_id,
        Resource::new(
            "AWS::CertificateManager::Certificate",
            json!({
                "DomainName": domain_name,
                "ValidationMethod": "EMAIL",
                "Tags": [{ "Key": "Name", "Value": certificate_name }],
            }),
        )?,
    )?;
    info!("Certificate '{}' declared for {}", certificate_name, domain_name);
    Ok(intrinsic::reference(&id))
}
