//! A broker cluster held entirely in memory.
//!
//! Behaves like a single Kafka broker from the point of view of the admin
//! API, and lets callers inject failures at each step.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::admin::{AdminConfig, AdminConnector, ClusterAdmin};
use crate::errors::BrokerError;
use crate::topic::{TopicDetail, TopicErrorCode, TopicMetadata};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallStats {
    pub connects: usize,
    pub describes: usize,
    pub creates: usize,
    pub closes: usize,
}

#[derive(Debug, Default)]
struct Failures {
    connect: Option<String>,
    describe: Option<String>,
    create: Option<String>,
    close: Option<String>,
}

#[derive(Debug, Default)]
struct ClusterState {
    topics: HashMap<String, TopicDetail>,
    topic_errors: HashMap<String, TopicErrorCode>,
    failures: Failures,
    stats: CallStats,
    connections: Vec<(Vec<String>, AdminConfig)>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCluster {
    state: Arc<Mutex<ClusterState>>,
}

impl InMemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_topic(self, topic: &str) -> Self {
        self.lock()
            .topics
            .insert(topic.to_string(), TopicDetail::default());
        self
    }

    /// Makes metadata lookups for `topic` report `code` regardless of whether it exists.
    pub fn set_topic_error(&self, topic: &str, code: TopicErrorCode) {
        self.lock().topic_errors.insert(topic.to_string(), code);
    }

    pub fn fail_connect(&self, message: &str) {
        self.lock().failures.connect = Some(message.to_string());
    }

    pub fn fail_describe(&self, message: &str) {
        self.lock().failures.describe = Some(message.to_string());
    }

    pub fn fail_create(&self, message: &str) {
        self.lock().failures.create = Some(message.to_string());
    }

    pub fn fail_close(&self, message: &str) {
        self.lock().failures.close = Some(message.to_string());
    }

    pub fn has_topic(&self, topic: &str) -> bool {
        self.lock().topics.contains_key(topic)
    }

    pub fn topic_detail(&self, topic: &str) -> Option<TopicDetail> {
        self.lock().topics.get(topic).copied()
    }

    pub fn stats(&self) -> CallStats {
        self.lock().stats
    }

    /// Brokers and admin settings of every connection opened so far.
    pub fn connections(&self) -> Vec<(Vec<String>, AdminConfig)> {
        self.lock().connections.clone()
    }

    fn lock(&self) -> MutexGuard<'_, ClusterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl AdminConnector for InMemoryCluster {
    async fn connect(
        &self,
        brokers: &[String],
        config: &AdminConfig,
    ) -> Result<Box<dyn ClusterAdmin>, BrokerError> {
        let mut state = self.lock();
        state.stats.connects += 1;
        if let Some(message) = &state.failures.connect {
            return Err(BrokerError::Client(message.clone()));
        }
        state.connections.push((brokers.to_vec(), config.clone()));

        Ok(Box::new(InMemoryAdmin {
            cluster: self.clone(),
        }))
    }
}

struct InMemoryAdmin {
    cluster: InMemoryCluster,
}

#[async_trait]
impl ClusterAdmin for InMemoryAdmin {
    async fn describe_topics(&self, topics: &[String]) -> Result<Vec<TopicMetadata>, BrokerError> {
        let mut state = self.cluster.lock();
        state.stats.describes += 1;
        if let Some(message) = &state.failures.describe {
            return Err(BrokerError::Client(message.clone()));
        }

        let metadata = topics
            .iter()
            .map(|name| {
                let error = match state.topic_errors.get(name) {
                    Some(code) => code.clone(),
                    None if state.topics.contains_key(name) => TopicErrorCode::NoError,
                    None => TopicErrorCode::UnknownTopicOrPartition,
                };
                TopicMetadata {
                    name: name.clone(),
                    error,
                }
            })
            .collect();

        Ok(metadata)
    }

    async fn create_topic(
        &self,
        topic: &str,
        detail: &TopicDetail,
        validate_only: bool,
    ) -> Result<(), BrokerError> {
        let mut state = self.cluster.lock();
        state.stats.creates += 1;
        if let Some(message) = &state.failures.create {
            return Err(BrokerError::Client(message.clone()));
        }
        if state.topics.contains_key(topic) {
            return Err(BrokerError::Client(format!(
                "Topic '{}' already exists.",
                topic
            )));
        }

        if !validate_only {
            state.topics.insert(topic.to_string(), *detail);
        }
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), BrokerError> {
        let mut state = self.cluster.lock();
        state.stats.closes += 1;
        match &state.failures.close {
            Some(message) => Err(BrokerError::Client(message.clone())),
            None => Ok(()),
        }
    }
}
