//! Cluster-admin connections backed by librdkafka.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use provisioner_core::{
    AdminConfig, AdminConnector, BrokerError, ClusterAdmin, TopicDetail, TopicErrorCode,
    TopicMetadata,
};
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::error::RDKafkaErrorCode;
use rdkafka::types::RDKafkaRespErr;
use rdkafka::ClientConfig;

type Client = AdminClient<DefaultClientContext>;

/// Matches librdkafka's default `socket.timeout.ms`.
const METADATA_TIMEOUT: Duration = Duration::from_secs(60);

pub fn client_config(brokers: &[String], config: &AdminConfig) -> ClientConfig {
    let mut client_config = ClientConfig::new();
    client_config
        .set("bootstrap.servers", brokers.join(","))
        .set("client.id", &config.client_id)
        .set("api.version.request", "true")
        .set("broker.version.fallback", &config.min_broker_version)
        // A metadata probe must never create the topic as a side effect.
        .set("allow.auto.create.topics", "false");
    client_config
}

/// How long `connect` waits for the cluster to answer its first metadata request.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy)]
pub struct KafkaConnector {
    connect_timeout: Duration,
}

impl KafkaConnector {
    pub fn new() -> Self {
        Self::with_connect_timeout(DEFAULT_CONNECT_TIMEOUT)
    }

    pub fn with_connect_timeout(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for KafkaConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AdminConnector for KafkaConnector {
    async fn connect(
        &self,
        brokers: &[String],
        config: &AdminConfig,
    ) -> Result<Box<dyn ClusterAdmin>, BrokerError> {
        let client_config = client_config(brokers, config);
        let timeout = self.connect_timeout;

        // Creating the client never touches the network, so ask the cluster
        // for metadata before handing the connection out.
        let client = tokio::task::spawn_blocking(move || -> Result<Client, BrokerError> {
            let client: Client = client_config
                .create()
                .map_err(|e| BrokerError::Client(e.to_string()))?;
            client
                .inner()
                .fetch_metadata(None, timeout)
                .map_err(|e| BrokerError::Client(e.to_string()))?;
            Ok(client)
        })
        .await
        .map_err(|e| BrokerError::Task(e.to_string()))??;

        tracing::debug!(brokers = %brokers.join(","), "Opened admin connection");
        Ok(Box::new(KafkaAdmin {
            client: Some(Arc::new(client)),
        }))
    }
}

/// `None` only once the connection has been closed or dropped.
struct KafkaAdmin {
    client: Option<Arc<Client>>,
}

impl KafkaAdmin {
    fn client(&self) -> Result<&Arc<Client>, BrokerError> {
        self.client
            .as_ref()
            .ok_or_else(|| BrokerError::Client("admin connection is closed".to_string()))
    }
}

// Dropping the client joins librdkafka's background threads, which must not
// happen on an async worker. Covers requests abandoned before `close`.
impl Drop for KafkaAdmin {
    fn drop(&mut self) {
        let Some(client) = self.client.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || drop(client));
            }
            Err(_) => drop(client),
        }
    }
}

#[async_trait]
impl ClusterAdmin for KafkaAdmin {
    async fn describe_topics(&self, topics: &[String]) -> Result<Vec<TopicMetadata>, BrokerError> {
        let client = Arc::clone(self.client()?);
        let topics = topics.to_vec();

        // fetch_metadata blocks the calling thread
        tokio::task::spawn_blocking(move || {
            topics
                .iter()
                .map(|topic| describe_topic(&client, topic))
                .collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(|e| BrokerError::Task(e.to_string()))?
    }

    async fn create_topic(
        &self,
        topic: &str,
        detail: &TopicDetail,
        validate_only: bool,
    ) -> Result<(), BrokerError> {
        let new_topic = NewTopic::new(
            topic,
            detail.num_partitions,
            TopicReplication::Fixed(detail.replication_factor),
        );
        let options = AdminOptions::new().validate_only(validate_only);

        let results = self
            .client()?
            .create_topics(&[new_topic], &options)
            .await
            .map_err(|e| BrokerError::Client(e.to_string()))?;

        for result in results {
            if let Err((name, code)) = result {
                return Err(BrokerError::Client(format!("{}: {}", name, code)));
            }
        }
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), BrokerError> {
        let mut admin = self;
        let Some(client) = admin.client.take() else {
            return Ok(());
        };

        tokio::task::spawn_blocking(move || drop(client))
            .await
            .map_err(|e| BrokerError::Task(e.to_string()))
    }
}

fn describe_topic(client: &Client, topic: &str) -> Result<TopicMetadata, BrokerError> {
    let metadata = client
        .inner()
        .fetch_metadata(Some(topic), METADATA_TIMEOUT)
        .map_err(|e| BrokerError::Client(e.to_string()))?;

    metadata
        .topics()
        .iter()
        .find(|t| t.name() == topic)
        .map(|t| TopicMetadata {
            name: t.name().to_string(),
            error: topic_error_code(t.error()),
        })
        .ok_or_else(|| BrokerError::MissingMetadata(topic.to_string()))
}

fn topic_error_code(error: Option<RDKafkaRespErr>) -> TopicErrorCode {
    match error.map(RDKafkaErrorCode::from) {
        None | Some(RDKafkaErrorCode::NoError) => TopicErrorCode::NoError,
        Some(RDKafkaErrorCode::UnknownTopicOrPartition) | Some(RDKafkaErrorCode::UnknownTopic) => {
            TopicErrorCode::UnknownTopicOrPartition
        }
        Some(code) => TopicErrorCode::Other(code.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_carries_identity() {
        let config = client_config(
            &["kafka-1:9092".to_string(), "kafka-2:9092".to_string()],
            &AdminConfig::default(),
        );

        assert_eq!(
            config.get("bootstrap.servers"),
            Some("kafka-1:9092,kafka-2:9092")
        );
        assert_eq!(config.get("client.id"), Some("kafka-provisioner"));
        assert_eq!(config.get("broker.version.fallback"), Some("0.11.0"));
        assert_eq!(config.get("allow.auto.create.topics"), Some("false"));
    }

    fn unconnected_admin() -> (KafkaAdmin, std::sync::Weak<Client>) {
        let client: Client = client_config(&["127.0.0.1:1".to_string()], &AdminConfig::default())
            .create()
            .unwrap();
        let client = Arc::new(client);
        let weak = Arc::downgrade(&client);
        (
            KafkaAdmin {
                client: Some(client),
            },
            weak,
        )
    }

    #[tokio::test]
    async fn test_dropped_admin_releases_client_in_background() {
        let (admin, weak) = unconnected_admin();

        drop(Box::new(admin));

        tokio::time::timeout(Duration::from_secs(10), async {
            while weak.upgrade().is_some() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }

    #[test]
    fn test_dropped_admin_outside_runtime_releases_client() {
        let (admin, weak) = unconnected_admin();

        drop(admin);

        assert!(weak.upgrade().is_none());
    }

    #[tokio::test]
    async fn test_close_releases_client() {
        let (admin, weak) = unconnected_admin();

        Box::new(admin).close().await.unwrap();

        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_topic_error_code_mapping() {
        assert_eq!(topic_error_code(None), TopicErrorCode::NoError);
        assert_eq!(
            topic_error_code(Some(RDKafkaRespErr::RD_KAFKA_RESP_ERR_UNKNOWN_TOPIC_OR_PART)),
            TopicErrorCode::UnknownTopicOrPartition
        );
        assert_eq!(
            topic_error_code(Some(RDKafkaRespErr::RD_KAFKA_RESP_ERR__UNKNOWN_TOPIC)),
            TopicErrorCode::UnknownTopicOrPartition
        );
        assert!(matches!(
            topic_error_code(Some(RDKafkaRespErr::RD_KAFKA_RESP_ERR_LEADER_NOT_AVAILABLE)),
            TopicErrorCode::Other(_)
        ));
    }
}
