//! AWS SQS-backed [`QueueAdapter`].

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_sqs::types::MessageAttributeValue;
use aws_sdk_sqs::Client;

use super::{Attributes, AttributeValue, QueueAdapter, QueueError, ReceivedMessage, SendResponse};

/// Stateless per the contract: one client is constructed per call site
/// (cheap - it's a thin wrapper around a shared `aws_sdk_sqs::Client`).
#[derive(Clone)]
pub struct SqsQueueAdapter {
    client: Client,
}

impl SqsQueueAdapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the ambient AWS config, optionally overriding
    /// the endpoint (for local/test queues via `SQS_ENDPOINT_URL`).
    pub async fn from_env(endpoint_url: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(endpoint) = endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;
        Self::new(Client::new(&sdk_config))
    }

    async fn queue_url(&self, name: &str) -> Result<String, QueueError> {
        self.client
            .get_queue_url()
            .queue_name(name)
            .send()
            .await
            .map_err(|e| QueueError::NoSuchQueue(format!("'{name}': {e}")))?
            .queue_url
            .ok_or_else(|| QueueError::NoSuchQueue(name.to_string()))
    }
}

#[async_trait]
impl QueueAdapter for SqsQueueAdapter {
    async fn receive(
        &self,
        queue: &str,
        wait_seconds: u32,
        visibility_seconds: u32,
    ) -> Result<Vec<ReceivedMessage>, QueueError> {
        let url = self.queue_url(queue).await?;

        let response = self
            .client
            .receive_message()
            .queue_url(url)
            .max_number_of_messages(10)
            .wait_time_seconds(wait_seconds.min(20) as i32)
            .visibility_timeout(visibility_seconds as i32)
            .message_attribute_names("All")
            .send()
            .await
            .map_err(|e| QueueError::Other(e.to_string()))?;

        let messages = response
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|m| {
                let attributes = m
                    .message_attributes
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|(k, v)| {
                        v.string_value().map(|s| {
                            (
                                k,
                                AttributeValue {
                                    data_type: v.data_type().to_string(),
                                    string_value: s.to_string(),
                                },
                            )
                        })
                    })
                    .collect::<Attributes>();

                ReceivedMessage {
                    message_id: m.message_id.unwrap_or_default(),
                    receipt_handle: m.receipt_handle.unwrap_or_default(),
                    attributes,
                    body: m.body.unwrap_or_default(),
                }
            })
            .collect();

        Ok(messages)
    }

    async fn send(
        &self,
        queue: &str,
        attributes: Attributes,
        body: String,
    ) -> Result<SendResponse, QueueError> {
        let url = self.queue_url(queue).await?;

        let mut message_attributes = HashMap::new();
        for (key, value) in attributes {
            let attr = MessageAttributeValue::builder()
                .data_type(value.data_type)
                .string_value(value.string_value)
                .build()
                .map_err(|e| QueueError::Other(e.to_string()))?;
            message_attributes.insert(key, attr);
        }

        let response = self
            .client
            .send_message()
            .queue_url(url)
            .set_message_attributes(Some(message_attributes))
            .message_body(body)
            .send()
            .await
            .map_err(|e| QueueError::Other(e.to_string()))?;

        Ok(SendResponse {
            message_id: response.message_id.unwrap_or_default(),
            md5_of_body: response.md5_of_message_body.unwrap_or_default(),
        })
    }

    async fn delete(&self, queue: &str, receipt_handle: &str) -> Result<(), QueueError> {
        let url = self.queue_url(queue).await?;
        self.client
            .delete_message()
            .queue_url(url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| QueueError::Other(e.to_string()))?;
        Ok(())
    }

    async fn create_queue(&self, name: &str) -> Result<String, QueueError> {
        let response = self
            .client
            .create_queue()
            .queue_name(name)
            .send()
            .await
            .map_err(|e| QueueError::Other(e.to_string()))?;
        response
            .queue_url
            .ok_or_else(|| QueueError::Other(format!("no queue url returned for '{name}'")))
    }
}
