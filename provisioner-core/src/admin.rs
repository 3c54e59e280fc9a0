use async_trait::async_trait;

use crate::errors::BrokerError;
use crate::topic::{TopicDetail, TopicMetadata};

pub const CLIENT_ID: &str = "kafka-provisioner";

/// Oldest broker protocol version the admin client will speak.
pub const MIN_BROKER_VERSION: &str = "0.11.0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminConfig {
    pub client_id: String,
    pub min_broker_version: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            client_id: CLIENT_ID.to_string(),
            min_broker_version: MIN_BROKER_VERSION.to_string(),
        }
    }
}

/// Opens administrative connections to a broker cluster.
#[async_trait]
pub trait AdminConnector: Send + Sync {
    async fn connect(
        &self,
        brokers: &[String],
        config: &AdminConfig,
    ) -> Result<Box<dyn ClusterAdmin>, BrokerError>;
}

/// One open administrative connection. Callers must `close` it when done;
/// dropping it without closing still releases the underlying client.
#[async_trait]
pub trait ClusterAdmin: Send + Sync {
    async fn describe_topics(&self, topics: &[String]) -> Result<Vec<TopicMetadata>, BrokerError>;

    async fn create_topic(
        &self,
        topic: &str,
        detail: &TopicDetail,
        validate_only: bool,
    ) -> Result<(), BrokerError>;

    async fn close(self: Box<Self>) -> Result<(), BrokerError>;
}
