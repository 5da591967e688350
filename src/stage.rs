use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::SynthError;

/// Deployment environment identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Dev,
    Test,
    Prod,
}

/// What CloudFormation does with a resource when it leaves the template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RemovalPolicy {
    Delete,
    Retain,
}

/// API Gateway endpoint topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EndpointType {
    Regional,
    Edge,
}

impl EndpointType {
    pub fn as_str(self) -> &'static str {
        match self {
            EndpointType::Regional => "REGIONAL",
            EndpointType::Edge => "EDGE",
        }
    }
}

/// Operational policies derived from the stage.
///
/// Every stack builder reads the same `StagePolicy` out of the app config,
/// never its own interpretation of the stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagePolicy {
    pub removal: RemovalPolicy,
    pub deletion_protection: bool,
    pub point_in_time_recovery: bool,
    pub termination_protection: bool,
    pub endpoint_type: EndpointType,
    pub log_retention_days: u32,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Dev, Stage::Test, Stage::Prod];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Dev => "dev",
            Stage::Test => "test",
            Stage::Prod => "prod",
        }
    }

    pub fn policy(self) -> StagePolicy {
        match self {
            Stage::Dev | Stage::Test => StagePolicy {
                removal: RemovalPolicy::Delete,
                deletion_protection: false,
                point_in_time_recovery: false,
                termination_protection: false,
                endpoint_type: EndpointType::Regional,
                log_retention_days: 7,
            },
            Stage::Prod => StagePolicy {
                removal: RemovalPolicy::Retain,
                deletion_protection: true,
                point_in_time_recovery: true,
                termination_protection: true,
                endpoint_type: EndpointType::Edge,
                log_retention_days: 30,
            },
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dev" => Ok(Stage::Dev),
            "test" => Ok(Stage::Test),
            "prod" => Ok(Stage::Prod),
            other => Err(SynthError::InvalidEnv {
                key: crate::env::DEPLOY_STAGE.to_string(),
                value: other.to_string(),
                reason: "expected one of dev, test, prod".to_string(),
            }),
        }
    }
}

impl RemovalPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            RemovalPolicy::Delete => "Delete",
            RemovalPolicy::Retain => "Retain",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_table_matches_stages() {
        let dev = Stage::Dev.policy();
        assert_eq!(dev.removal, RemovalPolicy::Delete);
        assert!(!dev.deletion_protection);
        assert!(!dev.point_in_time_recovery);

        let test = Stage::Test.policy();
        assert_eq!(test.removal, RemovalPolicy::Delete);
        assert!(!test.deletion_protection);
        assert!(!test.point_in_time_recovery);
        assert_eq!(test.endpoint_type, EndpointType::Regional);

        let prod = Stage::Prod.policy();
        assert_eq!(prod.removal, RemovalPolicy::Retain);
        assert!(prod.deletion_protection);
        assert!(prod.point_in_time_recovery);
        assert!(prod.termination_protection);
        assert_eq!(prod.endpoint_type, EndpointType::Edge);
        assert!(prod.log_retention_days > test.log_retention_days);
    }

    #[test]
    fn retention_never_conflicts_with_protection() {
        for stage in Stage::ALL {
            let policy = stage.policy();
            let retained = policy.removal == RemovalPolicy::Retain;
            assert_eq!(retained, policy.deletion_protection, "{stage}");
            assert_eq!(retained, stage == Stage::Prod, "{stage}");
        }
    }

    #[test]
    fn parses_known_stages_only() {
        assert_eq!("prod".parse::<Stage>().unwrap(), Stage::Prod);
        assert_eq!(Stage::Test.to_string(), "test");
        assert!(matches!(
            "staging".parse::<Stage>(),
            Err(SynthError::InvalidEnv { .. })
        ));
    }
}
