use serde_json::{json, Value};
use std::fs;

use super::helpers::{app_config, resolver, synthesize};
use crate::app::{self, MANIFEST_FILE};
use crate::env::{Env, API_DOMAIN_NAME};
use crate::error::SynthError;
use crate::registry::Registry;
use crate::stacks::{certificate, services};
use crate::stage::Stage;

#[test]
fn test_stage_without_domain_skips_certificate() {
    let env = Env::resolve(&resolver(Stage::Test, None)).unwrap();
    assert_eq!(env.api_domain_name, "");

    let (config, assembly) = synthesize(Stage::Test);
    assert!(assembly.stack(&config.stack_name(certificate::STACK)).is_none());

    let service = assembly.stack(&config.stack_name(services::STACK)).unwrap();
    assert_eq!(
        service
            .template
            .resources_of_type("AWS::ApiGateway::DomainName")
            .count(),
        0
    );
    assert!(service
        .template
        .parameter("SsmParameterValueApiDomainCertArn")
        .is_none());
}

#[test]
fn prod_without_domain_fails_fast() {
    let err = Env::resolve(&resolver(Stage::Prod, None)).unwrap_err();
    assert!(matches!(err, SynthError::MissingEnv(key) if key == API_DOMAIN_NAME));
}

#[test]
fn services_cannot_resolve_before_producers_publish() {
    let config = app_config(Stage::Dev);
    let err = services::build(&config, &Registry::new()).unwrap_err();
    assert!(matches!(err, SynthError::UnpublishedParameter(key) if key == "MainTableArn"));
}

#[test]
fn service_stack_deploys_after_its_producers() {
    let (config, assembly) = synthesize(Stage::Prod);
    let names: Vec<_> = assembly.stacks().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(
        names,
        [
            "TabsFlow-Stateful-prod",
            "TabsFlow-Certificate-prod",
            "TabsFlow-GithubOIDC",
            "TabsFlow-Service-prod",
        ]
    );

    let service = assembly.stack(&config.stack_name(services::STACK)).unwrap();
    assert_eq!(
        service.dependencies,
        ["TabsFlow-Certificate-prod", "TabsFlow-Stateful-prod"]
    );
}

#[test]
fn manifest_carries_stage_protection() {
    for (stage, protected) in [(Stage::Dev, false), (Stage::Prod, true)] {
        let (_, assembly) = synthesize(stage);
        let manifest = serde_json::to_value(assembly.manifest()).unwrap();
        for entry in manifest["stacks"].as_array().unwrap() {
            assert_eq!(entry["terminationProtection"], json!(protected), "{stage}");
            assert_eq!(entry["region"], json!("ap-south-1"));
            assert_eq!(entry["account"], json!("123456789012"));
        }
    }
}

#[test]
fn write_emits_templates_and_manifest() {
    let (_, assembly) = synthesize(Stage::Dev);
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("synth.out");

    let written = assembly.write(&out).unwrap();
    assert_eq!(written.len(), assembly.stacks().len() + 1);

    let manifest: Value =
        serde_json::from_str(&fs::read_to_string(out.join(MANIFEST_FILE)).unwrap()).unwrap();
    let entries = manifest["stacks"].as_array().unwrap();
    assert_eq!(entries.len(), assembly.stacks().len());
    assert_eq!(entries.len(), 4, "dev with a domain also gets the certificate stack");

    for entry in entries {
        let file = entry["templateFile"].as_str().unwrap();
        let template: Value =
            serde_json::from_str(&fs::read_to_string(out.join(file)).unwrap()).unwrap();
        assert_eq!(template["AWSTemplateFormatVersion"], json!("2010-09-09"));
        assert!(template["Resources"].as_object().is_some_and(|r| !r.is_empty()));
    }

    let stateful = entries
        .iter()
        .find(|e| e["name"] == json!("TabsFlow-Stateful-dev"))
        .unwrap();
    assert_eq!(stateful["publishes"].as_array().unwrap().len(), 3);
}

#[test]
fn synthesis_is_deterministic() {
    let config = app_config(Stage::Dev);
    let first = app::synthesize(&config).unwrap();
    let second = app::synthesize(&config).unwrap();
    for (a, b) in first.stacks().iter().zip(second.stacks()) {
        assert_eq!(a.template.to_json().unwrap(), b.template.to_json().unwrap());
    }
}
