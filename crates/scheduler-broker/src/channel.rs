//! `BrokerChannel` (spec.md §4.2): a durable-queue wrapper over a `lapin`
//! AMQP channel.
//!
//! Grounded on `original_source/schedulergodx/utils/rmq_property.py`'s
//! `RmqConnect.get_channel`, which opens one connection and declares one
//! durable queue per logical direction (`client-service`,
//! `service-client`); the teacher's own `lapin = "3.7"` dependency
//! (`workspace.dependencies`) is reused rather than introducing a second
//! AMQP client.

use futures::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicGetOptions, BasicNackOptions, BasicPublishOptions,
    QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use scheduler_shared::config::BrokerConfig;
use scheduler_shared::envelope::Envelope;
use scheduler_shared::error::BrokerError;
use tracing::{info, warn};

use crate::codec;

/// A single fetched delivery awaiting `ack`/`nack`.
pub struct Delivery {
    pub delivery_tag: u64,
    pub body: Vec<u8>,
}

pub struct BrokerChannel {
    channel: Channel,
    queue: String,
}

impl BrokerChannel {
    /// Connects to the broker and declares `queue` as durable, matching
    /// spec.md §6's "Both declared durable, messages persistent."
    pub async fn connect(config: &BrokerConfig, queue: &str) -> Result<Self, BrokerError> {
        let uri = config.amqp_uri();
        let properties = ConnectionProperties::default()
            .with_connection_name(format!("schedulergodx-{queue}").into());

        let connection = Connection::connect(&uri, properties)
            .await
            .map_err(|e| BrokerError::Unavailable(e.to_string()))?;
        let channel = connection
            .create_channel()
            .await
            .map_err(|e| BrokerError::Unavailable(e.to_string()))?;

        channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| BrokerError::Unavailable(e.to_string()))?;

        info!(queue, "broker channel connected and queue declared");
        Ok(Self {
            channel,
            queue: queue.to_string(),
        })
    }

    /// Durable enqueue with the persistent delivery-mode flag set.
    pub async fn publish(&self, envelope: &Envelope) -> Result<(), BrokerError> {
        let body = codec::encode(envelope).map_err(|e| BrokerError::Publish(e.to_string()))?;
        self.channel
            .basic_publish(
                "",
                &self.queue,
                BasicPublishOptions::default(),
                &body,
                BasicProperties::default().with_delivery_mode(2),
            )
            .await
            .map_err(|e| BrokerError::Publish(e.to_string()))?
            .await
            .map_err(|e| BrokerError::Publish(e.to_string()))?;
        Ok(())
    }

    /// Long-running consume loop; `on_message` receives each delivery and
    /// must ack/nack it via the returned handle's methods.
    pub async fn consume<F>(&self, consumer_tag: &str, mut on_message: F) -> Result<(), BrokerError>
    where
        F: FnMut(Delivery),
    {
        let mut consumer = self
            .channel
            .basic_consume(
                &self.queue,
                consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| BrokerError::Consume(e.to_string()))?;

        while let Some(delivery) = consumer.next().await {
            match delivery {
                Ok(delivery) => on_message(Delivery {
                    delivery_tag: delivery.delivery_tag,
                    body: delivery.data.clone(),
                }),
                Err(e) => {
                    warn!(error = %e, "broker delivery failed; terminating consume loop");
                    return Err(BrokerError::Consume(e.to_string()));
                }
            }
        }
        Ok(())
    }

    /// Non-blocking single fetch.
    pub async fn get_one(&self) -> Result<Option<Delivery>, BrokerError> {
        let got = self
            .channel
            .basic_get(&self.queue, BasicGetOptions::default())
            .await
            .map_err(|e| BrokerError::Consume(e.to_string()))?;
        Ok(got.map(|message| Delivery {
            delivery_tag: message.delivery_tag,
            body: message.data,
        }))
    }

    pub async fn ack(&self, delivery_tag: u64) -> Result<(), BrokerError> {
        self.channel
            .basic_ack(delivery_tag, BasicAckOptions::default())
            .await
            .map_err(|e| BrokerError::Consume(e.to_string()))
    }

    pub async fn nack(&self, delivery_tag: u64, requeue: bool) -> Result<(), BrokerError> {
        self.channel
            .basic_nack(delivery_tag, BasicNackOptions { requeue, ..Default::default() })
            .await
            .map_err(|e| BrokerError::Consume(e.to_string()))
    }
}
