use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::AppConfig;
use crate::error::Result;
use crate::registry::{Publication, Registry};
use crate::stacks::{certificate, github_oidc, services, stateful};
use crate::template::SynthesizedStack;

pub const MANIFEST_FILE: &str = "manifest.json";

/// Every synthesized stack of one app, in deployment order.
#[derive(Debug)]
pub struct Assembly {
    region: String,
    account: String,
    termination_protection: bool,
    stacks: Vec<SynthesizedStack>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub version: &'static str,
    pub stacks: Vec<ManifestEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub name: String,
    pub template_file: String,
    pub region: String,
    pub account: String,
    pub termination_protection: bool,
    pub dependencies: Vec<String>,
    pub publishes: Vec<Publication>,
}

/// Synthesizes all stacks in two phases.
///
/// Phase one builds the producers (stateful, certificate, GitHub OIDC) and
/// records what they publish. Phase two builds the service stack, which can
/// only resolve what phase one recorded.
pub fn synthesize(config: &AppConfig) -> Result<Assembly> {
    let mut registry = Registry::new();
    let mut stacks = Vec::new();

    let mut producers = vec![stateful::build(config)?];
    if config.env.has_api_domain() {
        producers.push(certificate::build(config)?);
    } else {
        info!("No API domain configured, skipping certificate and custom domain");
    }
    producers.push(github_oidc::build(config)?);

    for producer in producers {
        for publication in &producer.publications {
            registry.record(publication.clone())?;
        }
        stacks.push(producer);
    }

    stacks.push(services::build(config, &registry)?);

    info!(
        "Synthesized {} stacks for stage {}",
        stacks.len(),
        config.stage()
    );
    Ok(Assembly {
        region: config.env.region.clone(),
        account: config.env.account_id.clone(),
        termination_protection: config.policy.termination_protection,
        stacks,
    })
}

impl Assembly {
    pub fn stacks(&self) -> &[SynthesizedStack] {
        &self.stacks
    }

    pub fn stack(&self, name: &str) -> Option<&SynthesizedStack> {
        self.stacks.iter().find(|s| s.name == name)
    }

    pub fn template_file(stack: &SynthesizedStack) -> String {
        format!("{}.template.json", stack.name)
    }

    pub fn manifest(&self) -> Manifest {
        Manifest {
            version: "1",
            stacks: self
                .stacks
                .iter()
                .map(|stack| ManifestEntry {
                    name: stack.name.clone(),
                    template_file: Self::template_file(stack),
                    region: self.region.clone(),
                    account: self.account.clone(),
                    termination_protection: self.termination_protection,
                    dependencies: stack.dependencies.clone(),
                    publishes: stack.publications.clone(),
                })
                .collect(),
        }
    }

    /// Writes one template per stack plus the manifest into `out_dir`.
    pub fn write(&self, out_dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(out_dir)?;
        let mut written = Vec::with_capacity(self.stacks.len() + 1);

        for stack in &self.stacks {
            let path = out_dir.join(Self::template_file(stack));
            fs::write(&path, stack.template.to_json_pretty()?)?;
            info!("Wrote {}", path.display());
            written.push(path);
        }

        let manifest_path = out_dir.join(MANIFEST_FILE);
        fs::write(&manifest_path, serde_json::to_string_pretty(&self.manifest())?)?;
        written.push(manifest_path);
        Ok(written)
    }
}
