//! Redpanda connectivity checks.

use crate::config::RedpandaConfig;
use crate::consumer::client_builder;
use tracing::{debug, error, warn};

/// Checks that the brokers answer and the configured topic exists.
pub async fn check_connection(config: &RedpandaConfig) -> bool {
    let client = match client_builder(config).build().await {
        Ok(client) => client,
        Err(e) => {
            error!(brokers = %config.broker_string(), "Failed to connect to Redpanda: {}", e);
            return false;
        }
    };

    match client.list_topics().await {
        Ok(topics) => {
            let found = topics.iter().any(|t| t.name == config.topic);
            if found {
                debug!(topics = topics.len(), "Redpanda connection healthy");
            } else {
                warn!(topic = %config.topic, "Redpanda topic does not exist");
            }
            found
        }
        Err(e) => {
            error!("Failed to list Redpanda topics: {}", e);
            false
        }
    }
}
