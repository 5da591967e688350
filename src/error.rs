use thiserror::Error;

/// Everything that can abort synthesis.
///
/// All variants are fatal: synthesis is a one-shot, single pass process and
/// nothing here is retried.
#[derive(Debug, Error)]
pub enum SynthError {
    #[error("missing required environment variable `{0}`")]
    MissingEnv(String),

    #[error("invalid value `{value}` for environment variable `{key}`: {reason}")]
    InvalidEnv {
        key: String,
        value: String,
        reason: String,
    },

    #[error("registry parameter `{0}` was resolved before any stack published it")]
    UnpublishedParameter(String),

    #[error("registry parameter `{key}` is already published by stack `{stack}`")]
    DuplicatePublisher { key: String, stack: String },

    #[error("stack `{stack}` declares logical id `{id}` twice")]
    DuplicateLogicalId { stack: String, id: String },

    #[error("properties of `{0}` must be a JSON object")]
    InvalidProperties(String),

    #[error("stack `{stack}` references undefined logical id `{id}`")]
    UndefinedReference { stack: String, id: String },

    #[error("stack `{stack}` has a circular dependency: {}", .cycle.join(" -> "))]
    CircularDependency { stack: String, cycle: Vec<String> },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = SynthError> = std::result::Result<T, E>;
