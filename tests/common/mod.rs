//! In-memory fakes for the three named interfaces, grounded on the
//! original source's `conftest.py` fixtures (`mocked_dspace`, `test_client`):
//! a fake repository that recognizes a fixed set of collection handles and
//! fails in the same ways the real DSpace REST API would.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use dsw::object_store::{ObjectReader, OpenError};
use dsw::queue::{Attributes, QueueAdapter, QueueError, ReceivedMessage, SendResponse};
use dsw::repository::{
    CollectionRef, MetadataEntry, PostedBitstream, PostedItem, RepositoryClient,
    RepositoryClientError,
};

/// A single queue's messages, keyed by queue name.
#[derive(Default)]
pub struct FakeQueueAdapter {
    queues: Mutex<HashMap<String, Vec<ReceivedMessage>>>,
    next_id: Mutex<u64>,
}

impl FakeQueueAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, queue: &str, message: ReceivedMessage) {
        self.queues
            .lock()
            .unwrap()
            .entry(queue.to_string())
            .or_default()
            .push(message);
    }

    pub fn sent_to(&self, queue: &str) -> Vec<ReceivedMessage> {
        self.queues.lock().unwrap().get(queue).cloned().unwrap_or_default()
    }

    fn next_message_id(&self) -> String {
        let mut guard = self.next_id.lock().unwrap();
        *guard += 1;
        format!("msg-{}", *guard)
    }
}

#[async_trait]
impl QueueAdapter for FakeQueueAdapter {
    async fn receive(
        &self,
        queue: &str,
        _wait_seconds: u32,
        _visibility_seconds: u32,
    ) -> Result<Vec<ReceivedMessage>, QueueError> {
        Ok(self.queues.lock().unwrap().remove(queue).unwrap_or_default())
    }

    async fn send(
        &self,
        queue: &str,
        attributes: Attributes,
        body: String,
    ) -> Result<SendResponse, QueueError> {
        let digest = dsw::verify::digest_of(&serde_json::from_str(&body).unwrap());
        let message_id = self.next_message_id();
        self.queues.lock().unwrap().entry(queue.to_string()).or_default().push(ReceivedMessage {
            message_id: message_id.clone(),
            receipt_handle: message_id.clone(),
            attributes,
            body,
        });
        Ok(SendResponse {
            message_id,
            md5_of_body: digest,
        })
    }

    async fn delete(&self, queue: &str, receipt_handle: &str) -> Result<(), QueueError> {
        let mut queues = self.queues.lock().unwrap();
        if let Some(messages) = queues.get_mut(queue) {
            messages.retain(|m| m.receipt_handle != receipt_handle);
        }
        Ok(())
    }

    async fn create_queue(&self, name: &str) -> Result<String, QueueError> {
        self.queues.lock().unwrap().entry(name.to_string()).or_default();
        Ok(format!("fake://{name}"))
    }
}

/// Known collection handles, grounded on the fixture handles the original
/// test suite uses: a real collection, a 404, and a slow one that times out.
pub struct FakeRepositoryClient {
    pub posted_items: Mutex<Vec<String>>,
    pub posted_bitstreams: Mutex<Vec<String>>,
    pub deleted_items: Mutex<Vec<String>>,
    pub deleted_bitstreams: Mutex<Vec<String>>,
    next_item_id: Mutex<u64>,
    next_bitstream_id: Mutex<u64>,
}

impl Default for FakeRepositoryClient {
    fn default() -> Self {
        Self {
            posted_items: Mutex::new(Vec::new()),
            posted_bitstreams: Mutex::new(Vec::new()),
            deleted_items: Mutex::new(Vec::new()),
            deleted_bitstreams: Mutex::new(Vec::new()),
            next_item_id: Mutex::new(0),
            next_bitstream_id: Mutex::new(0),
        }
    }
}

impl FakeRepositoryClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RepositoryClient for FakeRepositoryClient {
    async fn login(&self) -> Result<(), RepositoryClientError> {
        Ok(())
    }

    async fn get_collection_by_handle(
        &self,
        handle: &str,
    ) -> Result<CollectionRef, RepositoryClientError> {
        match handle {
            "0000/not-a-collection" => Err(RepositoryClientError::HttpError {
                status: 404,
                body: "collection not found".to_string(),
            }),
            "0000/collection03" => Err(RepositoryClientError::Timeout),
            _ => Ok(CollectionRef {
                uuid: format!("collection-uuid-for-{handle}"),
            }),
        }
    }

    async fn create_item(
        &self,
        collection_uuid: &str,
        _metadata: &[MetadataEntry],
    ) -> Result<PostedItem, RepositoryClientError> {
        let mut guard = self.next_item_id.lock().unwrap();
        *guard += 1;
        let uuid = format!("item-{}", *guard);
        self.posted_items.lock().unwrap().push(uuid.clone());
        let _ = collection_uuid;
        Ok(PostedItem {
            uuid,
            handle: "0000/item01".to_string(),
            last_modified: "2021-09-01T05:06:07Z".to_string(),
        })
    }

    async fn attach_bitstream(
        &self,
        item_uuid: &str,
        name: &str,
        _description: Option<&str>,
        _content: Vec<u8>,
    ) -> Result<PostedBitstream, RepositoryClientError> {
        if name == "bad-bitstream.pdf" {
            return Err(RepositoryClientError::HttpError {
                status: 500,
                body: "could not store bitstream".to_string(),
            });
        }
        let mut guard = self.next_bitstream_id.lock().unwrap();
        *guard += 1;
        let uuid = format!("bitstream{:02}", *guard);
        self.posted_bitstreams.lock().unwrap().push(uuid.clone());
        let _ = item_uuid;
        Ok(PostedBitstream {
            uuid,
            checksum: serde_json::json!({"value": "abc123", "checkSumAlgorithm": "MD5"}),
        })
    }

    async fn delete_bitstream(&self, uuid: &str) -> Result<(), RepositoryClientError> {
        self.deleted_bitstreams.lock().unwrap().push(uuid.to_string());
        Ok(())
    }

    async fn delete_item(&self, uuid: &str) -> Result<(), RepositoryClientError> {
        self.deleted_items.lock().unwrap().push(uuid.to_string());
        Ok(())
    }
}

/// Resolves fixture paths from disk and fails for a literal "not found" URI,
/// matching the `tests/fixtures/nothing-here` path scenario 4 names.
pub struct FakeObjectReader;

#[async_trait]
impl ObjectReader for FakeObjectReader {
    async fn open(&self, uri: &str) -> Result<Vec<u8>, OpenError> {
        tokio::fs::read(uri).await.map_err(|_| OpenError::NotFound(uri.to_string()))
    }
}
