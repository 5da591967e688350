//! CloudFormation intrinsic functions and pseudo parameters.

use serde_json::{json, Value};

pub const PARTITION: &str = "AWS::Partition";
pub const REGION: &str = "AWS::Region";
pub const ACCOUNT_ID: &str = "AWS::AccountId";
pub const URL_SUFFIX: &str = "AWS::URLSuffix";

/// `{ "Ref": id }`
pub fn reference(id: &str) -> Value {
    json!({ "Ref": id })
}

/// `{ "Fn::GetAtt": [id, attribute] }`
pub fn get_att(id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [id, attribute] })
}

pub fn join(separator: &str, parts: Vec<Value>) -> Value {
    json!({ "Fn::Join": [separator, parts] })
}

pub fn sub(template: &str) -> Value {
    json!({ "Fn::Sub": template })
}

pub fn select(index: usize, list: Value) -> Value {
    json!({ "Fn::Select": [index, list] })
}

pub fn split(separator: &str, source: Value) -> Value {
    json!({ "Fn::Split": [separator, source] })
}

/// `arn:<partition>:iam::aws:policy/<name>`
pub fn managed_policy_arn(name: &str) -> Value {
    join(
        "",
        vec![
            json!("arn:"),
            reference(PARTITION),
            json!(format!(":iam::aws:policy/{name}")),
        ],
    )
}

/// Derives a deterministic logical id from a construct path.
///
/// Logical ids must be alphanumeric, so every other character is dropped.
pub fn logical_id(parts: &[&str]) -> String {
    parts
        .iter()
        .flat_map(|part| part.chars())
        .filter(char::is_ascii_alphanumeric)
        .collect()
}

/// Returns the logical ids a value points at through `Ref` or `Fn::GetAtt`,
/// skipping pseudo parameters.
pub fn referenced_ids(value: &Value) -> Vec<String> {
    let mut ids = Vec::new();
    collect_references(value, &mut ids);
    ids
}

fn collect_references(value: &Value, ids: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(target)) = map.get("Ref") {
                if !target.starts_with("AWS::") {
                    ids.push(target.clone());
                }
            }
            if let Some(Value::Array(args)) = map.get("Fn::GetAtt") {
                if let Some(Value::String(target)) = args.first() {
                    ids.push(target.clone());
                }
            }
            for nested in map.values() {
                collect_references(nested, ids);
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_references(item, ids)),
        _ => {}
    }
}
