use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::errors::ProvisionError;

pub const DEFAULT_PARTITIONS: i32 = 1;
pub const DEFAULT_REPLICATION_FACTOR: i32 = 1;

// Underscore is not allowed in Kubernetes names, so `a_b` + `c` can never
// collide with `a` + `b_c`.
const SEPARATOR: char = '_';

/// Kafka topic name derived from a `(namespace, stream)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicName(String);

impl TopicName {
    pub fn new(namespace: &str, stream: &str) -> Self {
        Self(format!("{}{}{}", namespace, SEPARATOR, stream))
    }

    /// Parses `/<namespace>/<stream-name>`. Anything other than exactly two
    /// non-empty segments is rejected.
    pub fn from_path(path: &str) -> Result<Self, ProvisionError> {
        let trimmed = path.strip_prefix('/').unwrap_or(path);
        let segments: Vec<&str> = trimmed.split('/').collect();

        match segments.as_slice() {
            [namespace, stream] if !namespace.is_empty() && !stream.is_empty() => {
                Ok(Self::new(namespace, stream))
            }
            _ => Err(ProvisionError::MalformedPath),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TopicName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicDetail {
    pub num_partitions: i32,
    pub replication_factor: i32,
}

impl Default for TopicDetail {
    fn default() -> Self {
        Self {
            num_partitions: DEFAULT_PARTITIONS,
            replication_factor: DEFAULT_REPLICATION_FACTOR,
        }
    }
}

/// Per-topic error code from a metadata lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopicErrorCode {
    NoError,
    UnknownTopicOrPartition,
    Other(String),
}

impl Display for TopicErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TopicErrorCode::NoError => write!(f, "no error"),
            TopicErrorCode::UnknownTopicOrPartition => {
                write!(f, "this server does not host this topic-partition")
            }
            TopicErrorCode::Other(description) => write!(f, "{}", description),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMetadata {
    pub name: String,
    pub error: TopicErrorCode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Created,
    Existing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionResponse {
    pub gateway: String,
    pub topic: String,
}
