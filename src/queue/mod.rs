//! Queue Adapter contract: receive, send, delete, and create
//! named queue messages. [`sqs`] is the AWS SQS-backed implementation used
//! in production; tests use an in-memory fake (see `tests/common`).

pub mod sqs;

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

pub use sqs::SqsQueueAdapter;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue '{0}' does not exist")]
    NoSuchQueue(String),
    #[error("queue operation failed: {0}")]
    Other(String),
}

/// A typed message attribute value, as carried in both submission and
/// result messages.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeValue {
    pub data_type: String,
    pub string_value: String,
}

impl AttributeValue {
    pub fn string(value: impl Into<String>) -> Self {
        AttributeValue {
            data_type: "String".to_string(),
            string_value: value.into(),
        }
    }
}

pub type Attributes = HashMap<String, AttributeValue>;

/// One received message: its attributes, body, an opaque receipt handle
/// used for deletion, and the queue-assigned message id (used in error
/// context, e.g. `ResultPublishError`).
#[derive(Debug, Clone, PartialEq)]
pub struct ReceivedMessage {
    pub message_id: String,
    pub receipt_handle: String,
    pub attributes: Attributes,
    pub body: String,
}

/// The queue service's acknowledgement of a sent message: its assigned id
/// and the MD5 digest of the body it stored, used by the Result Verifier.
#[derive(Debug, Clone, PartialEq)]
pub struct SendResponse {
    pub message_id: String,
    pub md5_of_body: String,
}

#[async_trait]
pub trait QueueAdapter: Send + Sync {
    /// Poll `queue` for up to 10 messages, long-polling for `wait_seconds`
    /// (<= 20) and reserving each for `visibility_seconds`.
    async fn receive(
        &self,
        queue: &str,
        wait_seconds: u32,
        visibility_seconds: u32,
    ) -> Result<Vec<ReceivedMessage>, QueueError>;

    async fn send(
        &self,
        queue: &str,
        attributes: Attributes,
        body: String,
    ) -> Result<SendResponse, QueueError>;

    /// Idempotent by receipt handle.
    async fn delete(&self, queue: &str, receipt_handle: &str) -> Result<(), QueueError>;

    async fn create_queue(&self, name: &str) -> Result<String, QueueError>;
}
