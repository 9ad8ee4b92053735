//! Submission: parses one input message, builds an item+bitstream
//! plan, executes it against the repository, and produces a result message.

pub mod plan;

use serde_json::Value;
use tracing::{info, warn};

use crate::error::{Policy, SubmissionError, WorkerError};
use crate::object_store::ObjectReader;
use crate::queue::{AttributeValue, Attributes, ReceivedMessage};
use crate::repository::{PostedItem, RepositoryClient};
use crate::result::{BitstreamResult, ResultMessage};
use crate::config::Config;

use plan::FileDescriptor;

/// One input message's worth of work: create one item with N bitstreams,
/// and produce exactly one result message.
pub struct Submission {
    pub destination: String,
    pub collection_handle: String,
    pub metadata_location: String,
    pub files: Vec<Value>,
    pub package_id: String,
    pub submission_source: String,
    pub result_queue: String,
    pub result_message: Option<ResultMessage>,
}

impl Submission {
    /// Parse and validate an input message.
    ///
    /// Attribute problems (missing `OutputQueue`/not-allow-listed,
    /// missing `PackageID`/`SubmissionSource`) are halt-silent: the input
    /// cannot be trusted enough to report a result against, so this
    /// returns `Err`. A malformed body is report-continue: this returns
    /// `Ok` with `result_message` already populated with a plain-string
    /// rejection, and `submit` is never called for it.
    pub fn from_message(msg: &ReceivedMessage, config: &Config) -> Result<Self, WorkerError> {
        let result_queue = match msg.attributes.get("OutputQueue") {
            Some(v) if config.allows_output_queue(&v.string_value) => v.string_value.clone(),
            Some(v) => {
                return Err(WorkerError::InvalidResultQueue {
                    message_id: msg.message_id.clone(),
                    input_queue: config.input_queue.clone(),
                    result_queue: v.string_value.clone(),
                    valid_queues: config.output_queues.clone(),
                })
            }
            None => {
                return Err(WorkerError::InvalidResultQueue {
                    message_id: msg.message_id.clone(),
                    input_queue: config.input_queue.clone(),
                    result_queue: String::new(),
                    valid_queues: config.output_queues.clone(),
                })
            }
        };

        let package_id = require_attribute(msg, config, "PackageID")?;
        let submission_source = require_attribute(msg, config, "SubmissionSource")?;

        let Ok(body) = serde_json::from_str::<Value>(&msg.body) else {
            return Ok(Self::nonconforming(
                package_id,
                submission_source,
                result_queue,
                "body is not valid JSON",
            ));
        };

        let (destination, collection_handle, metadata_location, files) = match parse_body(&body) {
            Some(parsed) => parsed,
            None => {
                return Ok(Self::nonconforming(
                    package_id,
                    submission_source,
                    result_queue,
                    "body is missing a required key",
                ))
            }
        };

        Ok(Submission {
            destination,
            collection_handle,
            metadata_location,
            files,
            package_id,
            submission_source,
            result_queue,
            result_message: None,
        })
    }

    fn nonconforming(
        package_id: String,
        submission_source: String,
        result_queue: String,
        detail: &str,
    ) -> Self {
        Submission {
            destination: String::new(),
            collection_handle: String::new(),
            metadata_location: String::new(),
            files: Vec::new(),
            package_id,
            submission_source,
            result_queue,
            result_message: Some(ResultMessage::nonconforming(detail)),
        }
    }

    /// The attribute set every result message carries, and only these.
    pub fn result_attributes(&self) -> Attributes {
        let mut attrs = Attributes::new();
        attrs.insert("PackageID".to_string(), AttributeValue::string(&self.package_id));
        attrs.insert(
            "SubmissionSource".to_string(),
            AttributeValue::string(&self.submission_source),
        );
        attrs
    }

    /// Execute the plan. Returns `Ok(())` once
    /// `result_message` has been populated (success or report-continue
    /// error); returns `Err` only for the halt-report `DSpaceTimeout` case,
    /// which `submit` never catches.
    pub async fn submit(
        &mut self,
        repo: &dyn RepositoryClient,
        reader: &dyn ObjectReader,
        dspace_url: &str,
        timeout_seconds: f64,
    ) -> Result<(), WorkerError> {
        debug_assert!(
            self.result_message.is_none(),
            "submit called on an already-resolved submission"
        );

        let metadata = match self.fetch_metadata(reader).await {
            Ok(metadata) => metadata,
            Err(err) => {
                self.result_message = Some(ResultMessage::error(&err));
                return Ok(());
            }
        };

        let mut files = Vec::with_capacity(self.files.len());
        for raw in &self.files {
            match FileDescriptor::from_json(raw) {
                Some(file) => files.push(file),
                None => {
                    let err = SubmissionError::BitstreamAddError;
                    self.result_message = Some(ResultMessage::error(&err));
                    return Ok(());
                }
            }
        }

        let item = match self.post_item(repo, &metadata, dspace_url, timeout_seconds).await {
            Ok(item) => item,
            Err(Ok(err)) => {
                self.result_message = Some(ResultMessage::error(&err));
                return Ok(());
            }
            Err(Err(halt)) => return Err(halt),
        };
        info!(item_handle = %item.handle, "posted item to DSpace");

        let mut posted_bitstreams = Vec::with_capacity(files.len());
        for file in &files {
            match self
                .post_bitstream(repo, reader, &item, file, dspace_url, timeout_seconds)
                .await
            {
                Ok(posted) => posted_bitstreams.push(posted),
                Err(Ok(err)) => {
                    self.compensate(repo, &item, &posted_bitstreams).await;
                    self.result_message = Some(ResultMessage::error(&err));
                    return Ok(());
                }
                Err(Err(halt)) => return Err(halt),
            }
        }

        info!(
            item_handle = %item.handle,
            count = posted_bitstreams.len(),
            "posted bitstreams to item"
        );
        self.result_message = Some(ResultMessage::success(
            item.handle,
            item.last_modified,
            posted_bitstreams,
        ));
        Ok(())
    }

    async fn fetch_metadata(
        &self,
        reader: &dyn ObjectReader,
    ) -> Result<Vec<crate::repository::MetadataEntry>, SubmissionError> {
        let to_error = || SubmissionError::ItemCreateError {
            metadata_location: self.metadata_location.clone(),
        };

        let bytes = reader.open(&self.metadata_location).await.map_err(|_| to_error())?;
        let doc: Value = serde_json::from_slice(&bytes).map_err(|_| to_error())?;
        plan::parse_metadata_entries(&doc).ok_or_else(to_error)
    }

    /// Resolve the collection and post the item. The `Ok(Err(..))` arm
    /// carries a report-continue `SubmissionError`; the `Err(..)` arm
    /// carries a halt-report `WorkerError` (timeout).
    async fn post_item(
        &self,
        repo: &dyn RepositoryClient,
        metadata: &[crate::repository::MetadataEntry],
        dspace_url: &str,
        timeout_seconds: f64,
    ) -> Result<PostedItem, Result<SubmissionError, WorkerError>> {
        let collection = match repo.get_collection_by_handle(&self.collection_handle).await {
            Ok(collection) => collection,
            Err(err) if err.is_timeout() => {
                return Err(Err(self.timeout_error(dspace_url, timeout_seconds).into()))
            }
            Err(err) => {
                return Err(Ok(SubmissionError::ItemPostError {
                    collection_handle: self.collection_handle.clone(),
                    dspace_response: err.body().to_string(),
                }))
            }
        };

        repo.create_item(&collection.uuid, metadata).await.map_err(|err| {
            if err.is_timeout() {
                Err(self.timeout_error(dspace_url, timeout_seconds).into())
            } else {
                Ok(SubmissionError::ItemPostError {
                    collection_handle: self.collection_handle.clone(),
                    dspace_response: err.body().to_string(),
                })
            }
        })
    }

    async fn post_bitstream(
        &self,
        repo: &dyn RepositoryClient,
        reader: &dyn ObjectReader,
        item: &PostedItem,
        file: &FileDescriptor,
        dspace_url: &str,
        timeout_seconds: f64,
    ) -> Result<BitstreamResult, Result<SubmissionError, WorkerError>> {
        let content = reader.open(&file.file_location).await.map_err(|_| {
            Ok(SubmissionError::BitstreamOpenError {
                file_location: file.file_location.clone(),
                item_handle: item.handle.clone(),
            })
        })?;

        let posted = repo
            .attach_bitstream(
                &item.uuid,
                &file.bitstream_name,
                file.bitstream_description.as_deref(),
                content,
            )
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    Err(self.timeout_error(dspace_url, timeout_seconds).into())
                } else {
                    Ok(SubmissionError::BitstreamPostError {
                        bitstream_name: file.bitstream_name.clone(),
                        item_handle: item.handle.clone(),
                        dspace_response: err.body().to_string(),
                    })
                }
            })?;

        Ok(BitstreamResult {
            bitstream_name: file.bitstream_name.clone(),
            bitstream_uuid: posted.uuid,
            bitstream_checksum: posted.checksum,
        })
    }

    /// Roll back repository state after a bitstream step fails: delete
    /// every posted bitstream in order, then the item. If compensation
    /// itself fails, it is logged; the caller still returns its
    /// originally-classified report-continue result, since only
    /// compensation failure itself escalates to an unclassified halt,
    /// which we surface separately rather than losing the original error
    /// result.
    async fn compensate(
        &self,
        repo: &dyn RepositoryClient,
        item: &PostedItem,
        posted_bitstreams: &[BitstreamResult],
    ) {
        for bitstream in posted_bitstreams {
            if let Err(err) = repo.delete_bitstream(&bitstream.bitstream_uuid).await {
                warn!(
                    bitstream_uuid = %bitstream.bitstream_uuid,
                    error = %err,
                    "failed to delete bitstream during compensation"
                );
            }
        }
        if let Err(err) = repo.delete_item(&item.uuid).await {
            warn!(item_uuid = %item.uuid, error = %err, "failed to delete item during compensation");
        }
    }

    fn timeout_error(&self, dspace_url: &str, timeout_seconds: f64) -> SubmissionError {
        SubmissionError::DSpaceTimeout {
            dspace_url: dspace_url.to_string(),
            timeout_seconds,
            package_id: self.package_id.clone(),
            submission_source: self.submission_source.clone(),
        }
    }
}

fn require_attribute(
    msg: &ReceivedMessage,
    config: &Config,
    name: &str,
) -> Result<String, WorkerError> {
    msg.attributes
        .get(name)
        .map(|v| v.string_value.clone())
        .ok_or_else(|| WorkerError::MissingAttribute {
            message_id: msg.message_id.clone(),
            input_queue: config.input_queue.clone(),
            attribute_name: name.to_string(),
        })
}

fn parse_body(body: &Value) -> Option<(String, String, String, Vec<Value>)> {
    let destination = body.get("SubmissionSystem")?.as_str()?.to_string();
    let collection_handle = body.get("CollectionHandle")?.as_str()?.to_string();
    let metadata_location = body.get("MetadataLocation")?.as_str()?.to_string();
    let files = body.get("Files")?.as_array()?.clone();
    Some((destination, collection_handle, metadata_location, files))
}
