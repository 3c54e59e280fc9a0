use thiserror::Error;

use crate::topic::TopicErrorCode;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Environment variable {var} should contain {purpose}")]
    MissingVariable {
        var: &'static str,
        purpose: &'static str,
    },
}

/// Failures reported by a cluster-admin connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrokerError {
    #[error("{0}")]
    Client(String),

    #[error("broker returned no metadata for topic {0:?}")]
    MissingMetadata(String),

    #[error("admin task failed: {0}")]
    Task(String),
}

/// Everything that can end a provisioning request early.
///
/// The `Display` output is the exact message returned to the caller.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("method {0} is not allowed")]
    MethodNotAllowed(String),

    #[error("URLs should be of the form /<namespace>/<stream-name>")]
    MalformedPath,

    #[error("Error connecting to Kafka broker {broker:?}: {source}")]
    Connect { broker: String, source: BrokerError },

    #[error("Error trying to list topics to see if {topic:?} exists: {source}")]
    Describe { topic: String, source: BrokerError },

    #[error("Error creating topic {topic:?}: {source}")]
    Create { topic: String, source: BrokerError },

    #[error("Error checking topic {topic:?}: broker reported {code}")]
    UnexpectedTopicState { topic: String, code: TopicErrorCode },
}

impl ProvisionError {
    /// True when the request itself was at fault and the broker was never contacted.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ProvisionError::MethodNotAllowed(_) | ProvisionError::MalformedPath
        )
    }
}

pub type ProvisionResult<T> = Result<T, ProvisionError>;
