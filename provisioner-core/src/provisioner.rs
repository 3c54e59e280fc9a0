use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use crate::admin::{AdminConfig, AdminConnector, ClusterAdmin};
use crate::config::Config;
use crate::errors::{BrokerError, ProvisionError, ProvisionResult};
use crate::topic::{
    ProvisionOutcome, ProvisionResponse, TopicDetail, TopicErrorCode, TopicName,
};

const PUT: &str = "PUT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioned {
    pub outcome: ProvisionOutcome,
    pub response: ProvisionResponse,
}

/// Ensures a topic exists for every `PUT /<namespace>/<stream-name>`.
///
/// Each call opens its own admin connection and closes it before returning.
#[derive(Clone)]
pub struct Provisioner {
    config: Arc<Config>,
    connector: Arc<dyn AdminConnector>,
    admin_config: AdminConfig,
}

impl Provisioner {
    pub fn new(config: Arc<Config>, connector: Arc<dyn AdminConnector>) -> Self {
        Self {
            config,
            connector,
            admin_config: AdminConfig::default(),
        }
    }

    /// Method and path checks happen before any broker contact.
    pub async fn handle(&self, method: &str, path: &str) -> ProvisionResult<Provisioned> {
        if method != PUT {
            return Err(ProvisionError::MethodNotAllowed(method.to_string()));
        }
        let topic = TopicName::from_path(path)?;
        self.provision(&topic).await
    }

    pub async fn provision(&self, topic: &TopicName) -> ProvisionResult<Provisioned> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("provision", %request_id, topic = %topic);

        async move {
            let admin = self
                .connector
                .connect(&self.config.brokers(), &self.admin_config)
                .await
                .map_err(|source| ProvisionError::Connect {
                    broker: self.config.broker.clone(),
                    source,
                })?;

            let result = ensure_topic(admin.as_ref(), topic).await;

            if let Err(e) = admin.close().await {
                tracing::error!(
                    "Error disconnecting from Kafka broker {:?}: {}",
                    self.config.broker,
                    e
                );
            }

            let outcome = result?;
            Ok(Provisioned {
                outcome,
                response: ProvisionResponse {
                    gateway: self.config.gateway.clone(),
                    topic: topic.to_string(),
                },
            })
        }
        .instrument(span)
        .await
    }
}

async fn ensure_topic(
    admin: &dyn ClusterAdmin,
    topic: &TopicName,
) -> ProvisionResult<ProvisionOutcome> {
    let describe_error = |source| ProvisionError::Describe {
        topic: topic.to_string(),
        source,
    };

    let metadata = admin
        .describe_topics(&[topic.to_string()])
        .await
        .map_err(describe_error)?;

    let code = metadata
        .into_iter()
        .find(|m| m.name == topic.as_str())
        .map(|m| m.error)
        .ok_or_else(|| describe_error(BrokerError::MissingMetadata(topic.to_string())))?;

    match code {
        TopicErrorCode::UnknownTopicOrPartition => {
            admin
                .create_topic(topic.as_str(), &TopicDetail::default(), false)
                .await
                .map_err(|source| ProvisionError::Create {
                    topic: topic.to_string(),
                    source,
                })?;
            tracing::info!("Created topic {:?}", topic.as_str());
            Ok(ProvisionOutcome::Created)
        }
        TopicErrorCode::NoError => {
            tracing::debug!("Topic {:?} already exists", topic.as_str());
            Ok(ProvisionOutcome::Existing)
        }
        code => Err(ProvisionError::UnexpectedTopicState {
            topic: topic.to_string(),
            code,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{CallStats, InMemoryCluster};

    fn provisioner(cluster: &InMemoryCluster) -> Provisioner {
        let config = Config {
            gateway: "liiklus:6565".to_string(),
            broker: "kafka:9092".to_string(),
            bind_address: "127.0.0.1:0".to_string(),
        };
        Provisioner::new(Arc::new(config), Arc::new(cluster.clone()))
    }

    #[tokio::test]
    async fn test_creates_missing_topic() {
        let cluster = InMemoryCluster::new();
        let provisioner = provisioner(&cluster);

        let provisioned = provisioner.handle("PUT", "/orders/created").await.unwrap();

        assert_eq!(provisioned.outcome, ProvisionOutcome::Created);
        assert_eq!(provisioned.response.topic, "orders_created");
        assert_eq!(provisioned.response.gateway, "liiklus:6565");
        assert_eq!(
            cluster.topic_detail("orders_created"),
            Some(TopicDetail {
                num_partitions: 1,
                replication_factor: 1,
            })
        );
    }

    #[tokio::test]
    async fn test_second_call_finds_existing_topic() {
        let cluster = InMemoryCluster::new();
        let provisioner = provisioner(&cluster);

        let first = provisioner.handle("PUT", "/orders/created").await.unwrap();
        let second = provisioner.handle("PUT", "/orders/created").await.unwrap();

        assert_eq!(first.outcome, ProvisionOutcome::Created);
        assert_eq!(second.outcome, ProvisionOutcome::Existing);
        assert_eq!(first.response, second.response);
        assert_eq!(cluster.stats().creates, 1);
    }

    #[tokio::test]
    async fn test_existing_topic_is_not_recreated() {
        let cluster = InMemoryCluster::new().with_topic("orders_created");
        let provisioner = provisioner(&cluster);

        let provisioned = provisioner.handle("PUT", "/orders/created").await.unwrap();

        assert_eq!(provisioned.outcome, ProvisionOutcome::Existing);
        assert_eq!(cluster.stats().creates, 0);
    }

    #[tokio::test]
    async fn test_connects_with_client_identity() {
        let cluster = InMemoryCluster::new();
        let provisioner = provisioner(&cluster);

        provisioner.handle("PUT", "/orders/created").await.unwrap();

        let connections = cluster.connections();
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].0, vec!["kafka:9092".to_string()]);
        assert_eq!(connections[0].1.client_id, "kafka-provisioner");
        assert_eq!(connections[0].1.min_broker_version, "0.11.0");
    }

    #[tokio::test]
    async fn test_rejects_before_contacting_broker() {
        let cluster = InMemoryCluster::new();
        let provisioner = provisioner(&cluster);

        let err = provisioner.handle("GET", "/orders/created").await.unwrap_err();
        assert!(matches!(err, ProvisionError::MethodNotAllowed(ref m) if m == "GET"));

        let err = provisioner.handle("PUT", "/orders").await.unwrap_err();
        assert!(matches!(err, ProvisionError::MalformedPath));

        assert_eq!(cluster.stats(), CallStats::default());
    }

    #[tokio::test]
    async fn test_connect_failure_embeds_broker() {
        let cluster = InMemoryCluster::new();
        cluster.fail_connect("connection refused");
        let provisioner = provisioner(&cluster);

        let err = provisioner.handle("PUT", "/orders/created").await.unwrap_err();

        assert!(matches!(err, ProvisionError::Connect { .. }));
        assert!(err.to_string().contains("kafka:9092"));
        assert_eq!(cluster.stats().closes, 0);
    }

    #[tokio::test]
    async fn test_describe_failure_closes_connection() {
        let cluster = InMemoryCluster::new();
        cluster.fail_describe("broken pipe");
        let provisioner = provisioner(&cluster);

        let err = provisioner.handle("PUT", "/orders/created").await.unwrap_err();

        assert!(matches!(err, ProvisionError::Describe { .. }));
        assert!(err.to_string().contains("orders_created"));
        assert!(err.to_string().contains("broken pipe"));
        assert_eq!(cluster.stats().creates, 0);
        assert_eq!(cluster.stats().closes, 1);
    }

    #[tokio::test]
    async fn test_create_failure_closes_connection() {
        let cluster = InMemoryCluster::new();
        cluster.fail_create("not enough brokers");
        let provisioner = provisioner(&cluster);

        let err = provisioner.handle("PUT", "/orders/created").await.unwrap_err();

        assert!(matches!(err, ProvisionError::Create { .. }));
        assert!(err.to_string().contains("not enough brokers"));
        assert_eq!(cluster.stats().closes, 1);
    }

    #[tokio::test]
    async fn test_unexpected_topic_error() {
        let cluster = InMemoryCluster::new();
        cluster.set_topic_error(
            "orders_created",
            TopicErrorCode::Other("Leader not available".to_string()),
        );
        let provisioner = provisioner(&cluster);

        let err = provisioner.handle("PUT", "/orders/created").await.unwrap_err();

        assert!(matches!(err, ProvisionError::UnexpectedTopicState { .. }));
        assert_eq!(cluster.stats().creates, 0);
        assert_eq!(cluster.stats().closes, 1);
    }

    #[tokio::test]
    async fn test_close_failure_does_not_fail_request() {
        let cluster = InMemoryCluster::new();
        cluster.fail_close("socket already closed");
        let provisioner = provisioner(&cluster);

        let provisioned = provisioner.handle("PUT", "/orders/created").await.unwrap();

        assert_eq!(provisioned.outcome, ProvisionOutcome::Created);
        assert_eq!(cluster.stats().closes, 1);
    }
}
