use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use super::{intrinsic, Output, Parameter, Resource, Template};
use crate::error::{Result, SynthError};
use crate::registry::Publication;

/// Template graph under construction.
///
/// Builders add declarations in any order; `finish` checks that every
/// reference points at something declared and freezes the graph.
#[derive(Debug)]
pub struct Stack {
    name: String,
    description: String,
    parameters: BTreeMap<String, Parameter>,
    resources: BTreeMap<String, Resource>,
    outputs: BTreeMap<String, Output>,
    dependencies: BTreeSet<String>,
    publications: Vec<Publication>,
}

/// A finished stack: its template plus the cross-stack facts the app needs
/// to order deployment.
#[derive(Debug, Clone)]
pub struct SynthesizedStack {
    pub name: String,
    pub template: Template,
    /// Stacks that must be deployed before this one.
    pub dependencies: Vec<String>,
    /// Registry entries this stack writes when deployed.
    pub publications: Vec<Publication>,
}

impl Stack {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: BTreeMap::new(),
            resources: BTreeMap::new(),
            outputs: BTreeMap::new(),
            dependencies: BTreeSet::new(),
            publications: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declares a resource and returns its logical id.
    pub fn add_resource(&mut self, id: impl Into<String>, resource: Resource) -> Result<String> {
        let id = id.into();
        if self.resources.contains_key(&id) || self.parameters.contains_key(&id) {
            return Err(SynthError::DuplicateLogicalId {
                stack: self.name.clone(),
                id,
            });
        }
        debug!(stack = %self.name, id = %id, "Declared {}", resource.resource_type);
        self.resources.insert(id.clone(), resource);
        Ok(id)
    }

    pub fn add_parameter(&mut self, id: impl Into<String>, parameter: Parameter) -> Result<String> {
        let id = id.into();
        if self.resources.contains_key(&id) || self.parameters.contains_key(&id) {
            return Err(SynthError::DuplicateLogicalId {
                stack: self.name.clone(),
                id,
            });
        }
        self.parameters.insert(id.clone(), parameter);
        Ok(id)
    }

    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.resources.get(id)
    }

    pub fn has_parameter(&self, id: &str) -> bool {
        self.parameters.contains_key(id)
    }

    pub fn add_output(
        &mut self,
        id: impl Into<String>,
        value: Value,
        description: impl Into<String>,
    ) {
        self.outputs.insert(
            id.into(),
            Output {
                value,
                description: Some(description.into()),
            },
        );
    }

    pub fn add_dependency(&mut self, stack: impl Into<String>) {
        let stack = stack.into();
        if stack != self.name {
            self.dependencies.insert(stack);
        }
    }

    pub fn record_publication(&mut self, publication: Publication) {
        self.publications.push(publication);
    }

    /// Validates references and freezes the stack.
    pub fn finish(self) -> Result<SynthesizedStack> {
        let is_declared =
            |id: &str| self.resources.contains_key(id) || self.parameters.contains_key(id);

        let property_refs = self.resources.values().flat_map(|r| {
            r.properties
                .values()
                .flat_map(intrinsic::referenced_ids)
                .chain(r.depends_on.iter().cloned())
        });
        let output_refs = self
            .outputs
            .values()
            .flat_map(|o| intrinsic::referenced_ids(&o.value));

        if let Some(id) = property_refs.chain(output_refs).find(|id| !is_declared(id)) {
            return Err(SynthError::UndefinedReference {
                stack: self.name,
                id,
            });
        }

        if let Some(cycle) = self.find_cycle() {
            return Err(SynthError::CircularDependency {
                stack: self.name,
                cycle,
            });
        }

        debug!(
            stack = %self.name,
            resources = self.resources.len(),
            "Stack synthesized"
        );

        Ok(SynthesizedStack {
            template: Template {
                format_version: "2010-09-09",
                description: Some(self.description),
                parameters: self.parameters,
                resources: self.resources,
                outputs: self.outputs,
            },
            name: self.name,
            dependencies: self.dependencies.into_iter().collect(),
            publications: self.publications,
        })
    }
}

impl Stack {
    /// Resources each resource must wait for, through `Ref`, `Fn::GetAtt`
    /// or `DependsOn`. Parameters are leaves and left out.
    fn dependency_graph(&self) -> BTreeMap<&str, BTreeSet<String>> {
        self.resources
            .iter()
            .map(|(id, resource)| {
                let edges = resource
                    .properties
                    .values()
                    .flat_map(intrinsic::referenced_ids)
                    .chain(resource.depends_on.iter().cloned())
                    .filter(|target| self.resources.contains_key(target))
                    .collect();
                (id.as_str(), edges)
            })
            .collect()
    }

    /// Returns the first dependency cycle found, closed on its first id.
    fn find_cycle(&self) -> Option<Vec<String>> {
        let graph = self.dependency_graph();
        let mut done = BTreeSet::new();
        let mut path = Vec::new();
        graph
            .keys()
            .find_map(|id| visit(&graph, *id, &mut done, &mut path))
    }
}

fn visit<'a>(
    graph: &'a BTreeMap<&'a str, BTreeSet<String>>,
    id: &'a str,
    done: &mut BTreeSet<&'a str>,
    path: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    if done.contains(id) {
        return None;
    }
    if let Some(start) = path.iter().position(|on_path| *on_path == id) {
        let mut cycle: Vec<String> = path[start..].iter().map(|s| s.to_string()).collect();
        cycle.push(id.to_string());
        return Some(cycle);
    }

    path.push(id);
    if let Some(edges) = graph.get(id) {
        for next in edges {
            if let Some(cycle) = visit(graph, next, done, path) {
                return Some(cycle);
            }
        }
    }
    path.pop();
    done.insert(id);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_duplicate_logical_ids() {
        let mut stack = Stack::new("Test", "test");
        stack
            .add_resource("Queue", Resource::new("AWS::SQS::Queue", json!({})).unwrap())
            .unwrap();
        let err = stack
            .add_resource("Queue", Resource::new("AWS::SQS::Queue", json!({})).unwrap())
            .unwrap_err();
        assert!(matches!(err, SynthError::DuplicateLogicalId { .. }));
    }

    #[test]
    fn dangling_reference_fails_finish() {
        let mut stack = Stack::new("Test", "test");
        stack
            .add_resource(
                "Mapping",
                Resource::new(
                    "AWS::Lambda::EventSourceMapping",
                    json!({ "EventSourceArn": intrinsic::get_att("MissingQueue", "Arn") }),
                ).unwrap(),
            )
            .unwrap();
        let err = stack.finish().unwrap_err();
        assert!(matches!(err, SynthError::UndefinedReference { id, .. } if id == "MissingQueue"));
    }

    #[test]
    fn dangling_depends_on_fails_finish() {
        let mut stack = Stack::new("Test", "test");
        stack
            .add_resource(
                "Function",
                Resource::new("AWS::Lambda::Function", json!({})).unwrap().depends_on("MissingPolicy"),
            )
            .unwrap();
        assert!(stack.finish().is_err());
    }

    #[test]
    fn serializes_cloudformation_shape() {
        let mut stack = Stack::new("Test", "test stack");
        stack
            .add_resource(
                "Queue",
                Resource::new("AWS::SQS::Queue", json!({ "VisibilityTimeout": 300 })).unwrap()
                    .with_removal_policy(crate::stage::RemovalPolicy::Retain),
            )
            .unwrap();
        stack.add_output("QueueUrl", intrinsic::reference("Queue"), "queue url");
        let json = stack.finish().unwrap().template.to_json().unwrap();

        assert_eq!(json["AWSTemplateFormatVersion"], "2010-09-09");
        assert_eq!(json["Resources"]["Queue"]["Type"], "AWS::SQS::Queue");
        assert_eq!(json["Resources"]["Queue"]["DeletionPolicy"], "Retain");
        assert_eq!(json["Resources"]["Queue"]["UpdateReplacePolicy"], "Retain");
        assert_eq!(json["Outputs"]["QueueUrl"]["Value"]["Ref"], "Queue");
        assert!(json.get("Parameters").is_none());
    }

    #[test]
    fn circular_dependency_fails_finish() {
        let mut stack = Stack::new("Test", "test");
        stack
            .add_resource(
                "Policy",
                Resource::new(
                    "AWS::IAM::Policy",
                    json!({ "Resource": intrinsic::get_att("Function", "Arn") }),
                )
                .unwrap(),
            )
            .unwrap();
        stack
            .add_resource(
                "Function",
                Resource::new("AWS::Lambda::Function", json!({}))
                    .unwrap()
                    .depends_on("Policy"),
            )
            .unwrap();
        let err = stack.finish().unwrap_err();
        assert!(matches!(
            err,
            SynthError::CircularDependency { cycle, .. }
                if cycle == ["Function", "Policy", "Function"]
        ));
    }

    #[test]
    fn shared_dependencies_are_not_cycles() {
        let mut stack = Stack::new("Test", "test");
        stack
            .add_resource("Role", Resource::new("AWS::IAM::Role", json!({})).unwrap())
            .unwrap();
        for id in ["First", "Second"] {
            stack
                .add_resource(
                    id,
                    Resource::new(
                        "AWS::Lambda::Function",
                        json!({ "Role": intrinsic::get_att("Role", "Arn") }),
                    )
                    .unwrap()
                    .depends_on("Role"),
                )
                .unwrap();
        }
        stack.finish().unwrap();
    }
}
