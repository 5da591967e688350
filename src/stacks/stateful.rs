use tracing::info;

use crate::config::AppConfig;
use crate::dynamodb::{KeyAttribute, TableDeclaration};
use crate::error::Result;
use crate::registry::{self, ParameterKey};
use crate::template::{Stack, SynthesizedStack};

pub const STACK: &str = "Stateful";

/// Table names the stateful stack declares, in declaration order.
pub fn table_names(config: &AppConfig) -> [String; 3] {
    let ddb = &config.dynamodb;
    [
        config.resource_name(ddb.main_table),
        config.resource_name(ddb.sessions_table),
        config.resource_name(ddb.search_index_table),
    ]
}

/// Persistent storage: the main, sessions and search-index tables, each
/// published to the registry by ARN.
pub fn build(config: &AppConfig) -> Result<SynthesizedStack> {
    let ddb = &config.dynamodb;
    let mut stack = Stack::new(
        config.stack_name(STACK),
        format!("{} persistent storage ({})", config.app_name, config.stage()),
    );

    let [main_name, sessions_name, search_index_name] = table_names(config);
    let table = |name: String| {
        TableDeclaration::new(
            name,
            KeyAttribute::string(ddb.partition_key),
            KeyAttribute::string(ddb.sort_key),
        )
        .with_policy(&config.policy)
    };

    let tables = [
        (
            "MainTable",
            table(main_name),
            ParameterKey::MainTableArn,
        ),
        (
            "SessionsTable",
            table(sessions_name).with_ttl(ddb.ttl_attribute),
            ParameterKey::SessionsTableArn,
        ),
        (
            "SearchIndexTable",
            table(search_index_name),
            ParameterKey::SearchIndexTableArn,
        ),
    ];

    for (logical_id, declaration, key) in tables {
        let handle = declaration.declare(&mut stack, logical_id)?;
        registry::publish(&mut stack, config, key, handle.arn().clone())?;
        stack.add_output(key.as_str(), handle.arn().clone(), format!("ARN of {logical_id}"));
    }

    info!("Stateful stack declared for stage {}", config.stage());
    stack.finish()
}
