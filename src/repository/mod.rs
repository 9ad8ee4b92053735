//! Repository Client contract: the DSpace REST API, consumed as a
//! named interface. How it is constructed is irrelevant to the submission
//! pipeline provided it satisfies this trait; [`dspace`] is one concrete,
//! `reqwest`-backed implementation.

pub mod dspace;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use dspace::DSpaceClient;

/// Error returned by any repository call. The HTTP-error variant must
/// expose the remote body text so it can be carried into an error result
/// message's `DSpaceResponse` field; timeouts are reported distinctly so
/// `Submission::submit` can classify them as `DSpaceTimeout` rather than a
/// `*PostError`.
#[derive(Debug, Error)]
pub enum RepositoryClientError {
    #[error("request to the repository timed out")]
    Timeout,
    #[error("repository responded with status {status}: {body}")]
    HttpError { status: u16, body: String },
    #[error("repository request failed: {0}")]
    Other(String),
}

impl RepositoryClientError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RepositoryClientError::Timeout)
    }

    /// The remote error body, or `"N/A"` for non-HTTP errors.
    pub fn body(&self) -> &str {
        match self {
            RepositoryClientError::HttpError { body, .. } => body,
            _ => "N/A",
        }
    }
}

/// A single metadata key/value (optional language qualifier), consumed
/// verbatim by the repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub key: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// A reference to an existing collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionRef {
    pub uuid: String,
}

/// The item state after a successful `createItem` post.
#[derive(Debug, Clone, PartialEq)]
pub struct PostedItem {
    pub uuid: String,
    pub handle: String,
    pub last_modified: String,
}

/// The bitstream state after a successful `attachBitstream` post.
#[derive(Debug, Clone, PartialEq)]
pub struct PostedBitstream {
    pub uuid: String,
    pub checksum: serde_json::Value,
}

#[async_trait]
pub trait RepositoryClient: Send + Sync {
    /// Authenticate. Called once per batch; no retry (see Open Questions).
    async fn login(&self) -> Result<(), RepositoryClientError>;

    async fn get_collection_by_handle(
        &self,
        handle: &str,
    ) -> Result<CollectionRef, RepositoryClientError>;

    async fn create_item(
        &self,
        collection_uuid: &str,
        metadata: &[MetadataEntry],
    ) -> Result<PostedItem, RepositoryClientError>;

    async fn attach_bitstream(
        &self,
        item_uuid: &str,
        name: &str,
        description: Option<&str>,
        content: Vec<u8>,
    ) -> Result<PostedBitstream, RepositoryClientError>;

    async fn delete_bitstream(&self, uuid: &str) -> Result<(), RepositoryClientError>;

    async fn delete_item(&self, uuid: &str) -> Result<(), RepositoryClientError>;
}
